//! [`SupportGraph`] – directed "who rests on whom" graph of a scene.
//!
//! Vertices are the accepted objects plus one background root at index `0`.
//! An edge `supporter → supported` records that the supported object's
//! settled pose rests on the supporter; its weight is the confidence
//! (committed hypothesis score) of that relation.
//!
//! The graph is always acyclic.  [`SupportGraph::add_edge`] refuses any edge
//! whose target can already reach its source, and any edge into the root,
//! with [`SceneError::SupportCycle`].
//!
//! # Example
//!
//! ```
//! use scenephys_kernel::support_graph::{EdgeWeightPolicy, SupportGraph};
//!
//! let mut graph = SupportGraph::new("background", EdgeWeightPolicy::Replace);
//! graph.add_vertex("plate");
//! graph.add_vertex("cup");
//! graph.add_edge("background", "plate", 0.9).unwrap();
//! graph.add_edge("plate", "cup", 0.8).unwrap();
//!
//! assert!(graph.reaches("background", "cup"));
//! assert!(graph.add_edge("cup", "plate", 0.5).is_err());
//! assert!(graph.is_acyclic());
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use scenephys_types::SceneError;
use serde::{Deserialize, Serialize};

/// Index of the background root vertex.
pub const ROOT: usize = 0;

// ────────────────────────────────────────────────────────────────────────────
// EdgeWeightPolicy
// ────────────────────────────────────────────────────────────────────────────

/// How an edge's weight combines with the weight the same supporter pair
/// carried in an earlier evaluation cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EdgeWeightPolicy {
    /// The newest score wins.
    #[default]
    Replace,
    /// Exponential smoothing: `factor · w_old + (1 − factor) · w_new`.
    Decay { factor: f64 },
}

impl EdgeWeightPolicy {
    pub fn combine(&self, previous: Option<f64>, new: f64) -> f64 {
        match (*self, previous) {
            (Self::Decay { factor }, Some(old)) => factor * old + (1.0 - factor) * new,
            _ => new,
        }
    }

    pub fn validate(&self) -> Result<(), SceneError> {
        match *self {
            Self::Decay { factor } if !(0.0..=1.0).contains(&factor) => Err(
                SceneError::InvalidConfig(format!("edge weight decay factor must lie in [0, 1], got {factor}")),
            ),
            _ => Ok(()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SupportGraph
// ────────────────────────────────────────────────────────────────────────────

/// Arena-backed support graph keyed by integer vertex indices.
#[derive(Debug, Clone, Serialize)]
pub struct SupportGraph {
    policy: EdgeWeightPolicy,
    /// Vertex labels; `labels[ROOT]` is the background.
    labels: Vec<String>,
    #[serde(skip)]
    index: BTreeMap<String, usize>,
    /// `outgoing[v]` maps each object supported by `v` to the edge weight.
    outgoing: Vec<BTreeMap<usize, f64>>,
    /// Last committed weight per `(supporter, supported)` label pair.  Kept
    /// across [`SupportGraph::clear`] so decaying weights survive rebuilds.
    #[serde(skip)]
    history: BTreeMap<(String, String), f64>,
}

impl SupportGraph {
    /// Create a graph holding only the background root.
    pub fn new(background_label: impl Into<String>, policy: EdgeWeightPolicy) -> Self {
        let background = background_label.into();
        Self {
            policy,
            labels: vec![background.clone()],
            index: BTreeMap::from([(background, ROOT)]),
            outgoing: vec![BTreeMap::new()],
            history: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> EdgeWeightPolicy {
        self.policy
    }

    pub fn root_label(&self) -> &str {
        &self.labels[ROOT]
    }

    /// Add `label` as a vertex (no-op if present) and return its index.
    pub fn add_vertex(&mut self, label: &str) -> usize {
        if let Some(&idx) = self.index.get(label) {
            return idx;
        }
        let idx = self.labels.len();
        self.labels.push(label.to_string());
        self.index.insert(label.to_string(), idx);
        self.outgoing.push(BTreeMap::new());
        idx
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Number of vertices, root included.
    pub fn vertex_count(&self) -> usize {
        self.labels.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.iter().map(BTreeMap::len).sum()
    }

    /// Check whether `supporter → supported` could be added without closing a
    /// cycle.
    ///
    /// # Errors
    ///
    /// [`SceneError::SupportCycle`] when `supported` is the root or already
    /// reaches `supporter` (a self-loop included).
    pub fn check_edge(&self, supporter: &str, supported: &str) -> Result<(), SceneError> {
        let closes_cycle = supported == self.root_label()
            || supporter == supported
            || self.reaches(supported, supporter);
        if closes_cycle {
            return Err(SceneError::SupportCycle {
                supporter: supporter.to_string(),
                supported: supported.to_string(),
            });
        }
        Ok(())
    }

    /// Add or re-weight the edge `supporter → supported`, creating missing
    /// vertices.  The stored weight follows the graph's
    /// [`EdgeWeightPolicy`] against the pair's previous weight.
    ///
    /// # Errors
    ///
    /// [`SceneError::SupportCycle`] as for [`SupportGraph::check_edge`]; the
    /// graph is left untouched.
    pub fn add_edge(&mut self, supporter: &str, supported: &str, weight: f64) -> Result<f64, SceneError> {
        self.check_edge(supporter, supported)?;
        let from = self.add_vertex(supporter);
        let to = self.add_vertex(supported);
        let key = (supporter.to_string(), supported.to_string());
        let previous = self.outgoing[from]
            .get(&to)
            .copied()
            .or_else(|| self.history.get(&key).copied());
        let combined = self.policy.combine(previous, weight);
        self.outgoing[from].insert(to, combined);
        self.history.insert(key, combined);
        Ok(combined)
    }

    /// Remove every edge into `label`.
    pub fn clear_incoming(&mut self, label: &str) {
        if let Some(to) = self.index_of(label) {
            for edges in &mut self.outgoing {
                edges.remove(&to);
            }
        }
    }

    /// Drop every vertex except the root.  Weight history is kept.
    pub fn clear(&mut self) {
        let background = self.labels[ROOT].clone();
        self.labels.truncate(1);
        self.index = BTreeMap::from([(background, ROOT)]);
        self.outgoing = vec![BTreeMap::new()];
    }

    /// Drop every vertex except the root, and all weight history.
    pub fn reset(&mut self) {
        self.clear();
        self.history.clear();
    }

    /// Weight of `supporter → supported`, if the edge exists.
    pub fn edge_weight(&self, supporter: &str, supported: &str) -> Option<f64> {
        let from = self.index_of(supporter)?;
        let to = self.index_of(supported)?;
        self.outgoing[from].get(&to).copied()
    }

    /// True when a directed path leads from `from` to `to` (every vertex
    /// reaches itself).  Breadth-first.
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        let (Some(start), Some(goal)) = (self.index_of(from), self.index_of(to)) else {
            return false;
        };
        let mut seen = vec![false; self.labels.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        while let Some(v) = queue.pop_front() {
            if v == goal {
                return true;
            }
            for &next in self.outgoing[v].keys() {
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Objects directly supporting `label`.
    pub fn supporters(&self, label: &str) -> BTreeSet<String> {
        let Some(to) = self.index_of(label) else {
            return BTreeSet::new();
        };
        self.outgoing
            .iter()
            .enumerate()
            .filter(|(_, edges)| edges.contains_key(&to))
            .map(|(from, _)| self.labels[from].clone())
            .collect()
    }

    /// Objects resting directly on `label`.
    pub fn children(&self, label: &str) -> BTreeSet<String> {
        self.index_of(label)
            .map(|from| {
                self.outgoing[from]
                    .keys()
                    .map(|&to| self.labels[to].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every object transitively resting on `label`, excluding `label`.
    pub fn descendants(&self, label: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut queue: VecDeque<String> = self.children(label).into_iter().collect();
        while let Some(next) = queue.pop_front() {
            if out.insert(next.clone()) {
                queue.extend(self.children(&next));
            }
        }
        out
    }

    /// Every edge as `(supporter, supported, weight)`, ordered by vertex
    /// index.
    pub fn edges(&self) -> Vec<(String, String, f64)> {
        self.outgoing
            .iter()
            .enumerate()
            .flat_map(|(from, edges)| {
                edges
                    .iter()
                    .map(move |(&to, &w)| (self.labels[from].clone(), self.labels[to].clone(), w))
            })
            .collect()
    }

    /// Kahn's algorithm: true when every vertex can be topologically ordered.
    pub fn is_acyclic(&self) -> bool {
        let mut in_degree = vec![0usize; self.labels.len()];
        for edges in &self.outgoing {
            for &to in edges.keys() {
                in_degree[to] += 1;
            }
        }
        let mut queue: VecDeque<usize> = (0..self.labels.len()).filter(|&v| in_degree[v] == 0).collect();
        let mut visited = 0;
        while let Some(v) = queue.pop_front() {
            visited += 1;
            for &to in self.outgoing[v].keys() {
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push_back(to);
                }
            }
        }
        visited == self.labels.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> SupportGraph {
        let mut g = SupportGraph::new("background", EdgeWeightPolicy::Replace);
        g.add_edge("background", "b", 0.9).unwrap();
        g.add_edge("b", "a", 0.8).unwrap();
        g
    }

    #[test]
    fn root_is_index_zero() {
        let g = SupportGraph::new("table", EdgeWeightPolicy::default());
        assert_eq!(g.index_of("table"), Some(ROOT));
        assert_eq!(g.root_label(), "table");
        assert_eq!(g.vertex_count(), 1);
    }

    #[test]
    fn add_vertex_is_idempotent() {
        let mut g = SupportGraph::new("background", EdgeWeightPolicy::Replace);
        let a = g.add_vertex("a");
        assert_eq!(g.add_vertex("a"), a);
        assert_eq!(g.vertex_count(), 2);
    }

    #[test]
    fn stack_edges_and_reachability() {
        let g = stack();
        assert!(g.reaches("background", "a"));
        assert!(!g.reaches("a", "background"));
        assert_eq!(g.supporters("a"), BTreeSet::from(["b".to_string()]));
        assert_eq!(g.children("background"), BTreeSet::from(["b".to_string()]));
        assert_eq!(
            g.descendants("background"),
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        assert!(g.edge_weight("a", "background").is_none());
        assert_eq!(g.edge_count(), 2);
    }

    // ── cycle guard ────────────────────────────────────────────────────────

    #[test]
    fn edge_closing_a_cycle_is_rejected_and_graph_untouched() {
        let mut g = stack();
        let before = g.edges();
        let err = g.add_edge("a", "b", 0.5).unwrap_err();
        assert_eq!(
            err,
            SceneError::SupportCycle {
                supporter: "a".into(),
                supported: "b".into()
            }
        );
        assert_eq!(g.edges(), before);
        assert!(g.is_acyclic());
    }

    #[test]
    fn self_loops_and_edges_into_root_are_rejected() {
        let mut g = stack();
        assert!(g.add_edge("a", "a", 0.5).is_err());
        assert!(g.add_edge("a", "background", 0.5).is_err());
        // Even an unconnected vertex may never support the root.
        assert!(g.add_edge("loose", "background", 0.5).is_err());
        assert!(!g.contains("loose"));
    }

    #[test]
    fn clear_incoming_detaches_vertex() {
        let mut g = stack();
        g.clear_incoming("a");
        assert!(g.supporters("a").is_empty());
        assert!(g.contains("a"));
        // With `b -> a` gone the reverse edge is legal.
        g.add_edge("a", "b", 0.5).unwrap();
        assert!(g.is_acyclic());
    }

    // ── weights ────────────────────────────────────────────────────────────

    #[test]
    fn replace_policy_keeps_newest_weight() {
        let mut g = stack();
        g.add_edge("b", "a", 0.3).unwrap();
        assert_eq!(g.edge_weight("b", "a"), Some(0.3));
    }

    #[test]
    fn decay_policy_smooths_across_rebuilds() {
        let mut g = SupportGraph::new("background", EdgeWeightPolicy::Decay { factor: 0.5 });
        g.add_edge("background", "a", 1.0).unwrap();
        g.clear();
        assert_eq!(g.vertex_count(), 1);
        let w = g.add_edge("background", "a", 0.0).unwrap();
        assert!((w - 0.5).abs() < 1e-12);

        g.reset();
        let w = g.add_edge("background", "a", 0.2).unwrap();
        assert!((w - 0.2).abs() < 1e-12);
    }

    #[test]
    fn decay_factor_is_validated() {
        assert!(EdgeWeightPolicy::Decay { factor: 1.5 }.validate().is_err());
        assert!(EdgeWeightPolicy::Decay { factor: 0.3 }.validate().is_ok());
        assert!(EdgeWeightPolicy::Replace.validate().is_ok());
    }

    #[test]
    fn acyclic_after_arbitrary_insertion_attempts() {
        let labels = ["a", "b", "c", "d"];
        let mut g = SupportGraph::new("background", EdgeWeightPolicy::Replace);
        for (i, from) in labels.iter().enumerate() {
            for (j, to) in labels.iter().enumerate() {
                let (s, t) = if (i + j) % 2 == 0 { (from, to) } else { (to, from) };
                let _ = g.add_edge(s, t, 0.5);
            }
        }
        assert!(g.is_acyclic());
    }
}
