//! Kekulé assignment for aromatic systems.
//!
//! Lowercase atoms only describe a real structure when their aromatic bonds
//! can be split into alternating single and double bonds so that every atom
//! short one bonding unit receives exactly one double bond. That is a
//! perfect matching over those atoms, found here with augmenting paths.

use std::collections::VecDeque;

use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::mol::{BondOrder, Molecule};
use crate::valence::{allowed_valences, lowest_valence_at_least};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KekulizeError {
    /// Atoms that need a double bond but could not be given one.
    #[error("cannot kekulize aromatic system: {} atom(s) left without a double bond", .0.len())]
    Unkekulizable(Vec<NodeIndex>),
}

type Adjacency = Vec<Vec<(NodeIndex, EdgeIndex)>>;

/// Find a Kekulé structure for every aromatic system in `mol`.
///
/// Returns the aromatic bonds that become double bonds. Implicit hydrogens
/// must already be assigned. The molecule itself is left untouched; aromatic
/// bonds keep their notation for drawing.
pub fn kekulize(mol: &Molecule) -> Result<Vec<EdgeIndex>, KekulizeError> {
    let graph = mol.graph();
    let n = mol.atom_count();

    let mut adjacency: Adjacency = vec![Vec::new(); n];
    for edge in graph.edge_references() {
        if edge.weight().order == BondOrder::Aromatic {
            adjacency[edge.source().index()].push((edge.target(), edge.id()));
            adjacency[edge.target().index()].push((edge.source(), edge.id()));
        }
    }

    let components = aromatic_components(&adjacency);

    let needs_double: Vec<bool> = (0..n)
        .map(|i| !adjacency[i].is_empty() && needs_double_bond(mol, NodeIndex::new(i)))
        .collect();

    let mut matched: Vec<Option<EdgeIndex>> = vec![None; n];
    for component in &components {
        let candidates: Vec<NodeIndex> = component
            .iter()
            .copied()
            .filter(|v| needs_double[v.index()])
            .collect();

        for &start in &candidates {
            if matched[start.index()].is_none() {
                augment(mol, &adjacency, &needs_double, &mut matched, start);
            }
        }

        let unmatched: Vec<NodeIndex> = candidates
            .into_iter()
            .filter(|v| matched[v.index()].is_none())
            .collect();
        if !unmatched.is_empty() {
            return Err(KekulizeError::Unkekulizable(unmatched));
        }
    }

    let mut doubles: Vec<EdgeIndex> = matched.into_iter().flatten().collect();
    doubles.sort();
    doubles.dedup();
    Ok(doubles)
}

fn aromatic_components(adjacency: &Adjacency) -> Vec<Vec<NodeIndex>> {
    let mut seen = vec![false; adjacency.len()];
    let mut components = Vec::new();
    for root in 0..adjacency.len() {
        if adjacency[root].is_empty() || seen[root] {
            continue;
        }
        let mut stack = vec![NodeIndex::new(root)];
        let mut component = Vec::new();
        while let Some(v) = stack.pop() {
            if seen[v.index()] {
                continue;
            }
            seen[v.index()] = true;
            component.push(v);
            stack.extend(
                adjacency[v.index()]
                    .iter()
                    .map(|&(w, _)| w)
                    .filter(|w| !seen[w.index()]),
            );
        }
        components.push(component);
    }
    components
}

/// An atom needs a double bond when exactly one unit separates what it uses
/// from its next allowed valence. Atoms with no room (furan o, pyrrole [nH],
/// a fully substituted c) bring a lone pair or nothing at all.
fn needs_double_bond(mol: &Molecule, idx: NodeIndex) -> bool {
    let atom = mol.atom(idx);
    let valences = allowed_valences(atom.element, atom.charge);
    let used = mol.bond_order_sum(idx) + atom.total_h();
    matches!(lowest_valence_at_least(&valences, used), Some(target) if target - used == 1)
}

fn augment(
    mol: &Molecule,
    adjacency: &Adjacency,
    needs_double: &[bool],
    matched: &mut [Option<EdgeIndex>],
    start: NodeIndex,
) -> bool {
    let n = adjacency.len();
    let mut prev: Vec<Option<(NodeIndex, EdgeIndex)>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut queue = VecDeque::from([start]);
    visited[start.index()] = true;

    while let Some(u) = queue.pop_front() {
        for &(v, e) in &adjacency[u.index()] {
            if !needs_double[v.index()] || visited[v.index()] || matched[u.index()] == Some(e) {
                continue;
            }
            visited[v.index()] = true;
            prev[v.index()] = Some((u, e));

            let Some(mate_edge) = matched[v.index()] else {
                flip_path(matched, &prev, start, v);
                return true;
            };
            let Some((a, b)) = mol.graph().edge_endpoints(mate_edge) else {
                continue;
            };
            let w = if a == v { b } else { a };
            if !visited[w.index()] {
                visited[w.index()] = true;
                prev[w.index()] = Some((v, mate_edge));
                queue.push_back(w);
            }
        }
    }
    false
}

/// Walk back from `end` to `start`, swapping matched and unmatched edges.
fn flip_path(
    matched: &mut [Option<EdgeIndex>],
    prev: &[Option<(NodeIndex, EdgeIndex)>],
    start: NodeIndex,
    end: NodeIndex,
) {
    let mut cur = end;
    let mut take = true;
    while cur != start {
        let Some((p, e)) = prev[cur.index()] else {
            return;
        };
        if take {
            matched[cur.index()] = Some(e);
            matched[p.index()] = Some(e);
        }
        take = !take;
        cur = p;
    }
}
