//! Ring perception: ring bonds and the smallest ring through each of them.

use std::collections::{HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::mol::Molecule;

/// Shortest path from `from` to `to` that does not traverse `skip`.
fn shortest_path_avoiding(
    mol: &Molecule,
    from: NodeIndex,
    to: NodeIndex,
    skip: EdgeIndex,
) -> Option<Vec<NodeIndex>> {
    let graph = mol.graph();
    let mut parent: Vec<Option<NodeIndex>> = vec![None; graph.node_count()];
    let mut seen = vec![false; graph.node_count()];
    let mut queue = VecDeque::from([from]);
    seen[from.index()] = true;

    while let Some(node) = queue.pop_front() {
        if node == to {
            let mut path = vec![to];
            let mut cur = to;
            while let Some(p) = parent[cur.index()] {
                path.push(p);
                cur = p;
            }
            path.reverse();
            return Some(path);
        }
        for edge in graph.edges(node) {
            if edge.id() == skip {
                continue;
            }
            let next = if edge.source() == node { edge.target() } else { edge.source() };
            if !seen[next.index()] {
                seen[next.index()] = true;
                parent[next.index()] = Some(node);
                queue.push_back(next);
            }
        }
    }
    None
}

/// Ring perception result for one molecule.
#[derive(Debug, Clone, Default)]
pub struct RingInfo {
    ring_bonds: HashSet<EdgeIndex>,
    ring_atoms: HashSet<NodeIndex>,
    rings: Vec<Vec<NodeIndex>>,
}

impl RingInfo {
    pub fn perceive(mol: &Molecule) -> Self {
        let graph = mol.graph();
        let mut info = RingInfo::default();
        let mut seen_sets: HashSet<Vec<NodeIndex>> = HashSet::new();

        for edge in graph.edge_references() {
            let Some(path) = shortest_path_avoiding(mol, edge.source(), edge.target(), edge.id())
            else {
                continue;
            };
            info.ring_bonds.insert(edge.id());
            info.ring_atoms.insert(edge.source());
            info.ring_atoms.insert(edge.target());

            let mut key = path.clone();
            key.sort();
            if seen_sets.insert(key) {
                info.rings.push(path);
            }
        }

        info.rings.sort_by_key(|r| r.len());
        info
    }

    pub fn is_ring_bond(&self, edge: EdgeIndex) -> bool {
        self.ring_bonds.contains(&edge)
    }

    pub fn is_ring_atom(&self, atom: NodeIndex) -> bool {
        self.ring_atoms.contains(&atom)
    }

    /// Smallest ring through each ring bond, deduplicated, smallest first.
    /// Atoms are listed in ring order.
    pub fn rings(&self) -> &[Vec<NodeIndex>] {
        &self.rings
    }
}
