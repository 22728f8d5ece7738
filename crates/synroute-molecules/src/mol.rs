//! In-memory molecular graph produced by the SMILES parser.

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::element::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chirality {
    None,
    CounterClockwise,
    Clockwise,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub isotope: Option<u16>,
    pub charge: i8,
    /// Hydrogen count written inside a bracket atom.
    pub explicit_h: Option<u8>,
    /// Hydrogens implied by normal valence (organic-subset atoms only).
    pub implicit_h: u8,
    pub bracket: bool,
    pub atom_class: Option<u16>,
    pub chirality: Chirality,
}

impl Atom {
    pub fn organic(element: Element, aromatic: bool) -> Self {
        Self {
            element,
            aromatic,
            isotope: None,
            charge: 0,
            explicit_h: None,
            implicit_h: 0,
            bracket: false,
            atom_class: None,
            chirality: Chirality::None,
        }
    }

    pub fn total_h(&self) -> u32 {
        u32::from(self.explicit_h.unwrap_or(0)) + u32::from(self.implicit_h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// Contribution to an atom's valence. Aromatic bonds count as one; the
    /// shared pi electron is added per atom by the valence model.
    pub fn valence_contribution(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondDirection {
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub order: BondOrder,
    pub direction: BondDirection,
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Self { order, direction: BondDirection::None }
    }
}

/// A parsed molecule. Node indices follow the order atoms appear in the input.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    graph: UnGraph<Atom, Bond>,
}

impl Molecule {
    pub fn new() -> Self {
        Self { graph: UnGraph::new_undirected() }
    }

    pub fn add_atom(&mut self, atom: Atom) -> NodeIndex {
        self.graph.add_node(atom)
    }

    pub fn add_bond(&mut self, a: NodeIndex, b: NodeIndex, bond: Bond) -> EdgeIndex {
        self.graph.add_edge(a, b, bond)
    }

    pub fn graph(&self) -> &UnGraph<Atom, Bond> {
        &self.graph
    }

    pub fn atom(&self, idx: NodeIndex) -> &Atom {
        &self.graph[idx]
    }

    pub fn atom_mut(&mut self, idx: NodeIndex) -> &mut Atom {
        &mut self.graph[idx]
    }

    pub fn atom_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn atoms(&self) -> impl Iterator<Item = (NodeIndex, &Atom)> {
        self.graph.node_indices().map(move |i| (i, &self.graph[i]))
    }

    /// Bonds as `(a, b, bond)` with `a < b`.
    pub fn bonds(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &Bond)> {
        self.graph.edge_references().map(|e| {
            let (a, b) = (e.source(), e.target());
            if a < b { (a, b, e.weight()) } else { (b, a, e.weight()) }
        })
    }

    pub fn bond_between(&self, a: NodeIndex, b: NodeIndex) -> Option<&Bond> {
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors(idx)
    }

    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.graph.neighbors(idx).count()
    }

    /// Sum of bond valence contributions around `idx`.
    pub fn bond_order_sum(&self, idx: NodeIndex) -> u32 {
        self.graph
            .edges(idx)
            .map(|e| u32::from(e.weight().order.valence_contribution()))
            .sum()
    }

    pub fn has_aromatic_bond(&self, idx: NodeIndex) -> bool {
        self.graph
            .edges(idx)
            .any(|e| e.weight().order == BondOrder::Aromatic)
    }

    /// Molecular formula in Hill order (C, H, then alphabetical).
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;

        let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();
        let mut hydrogens = 0u32;
        for (_, atom) in self.atoms() {
            if atom.element == Element::H {
                hydrogens += 1;
            } else if atom.element != Element::WILDCARD {
                *counts.entry(atom.element.symbol()).or_default() += 1;
            }
            hydrogens += atom.total_h();
        }

        let mut out = String::new();
        let mut push = |sym: &str, n: u32| {
            if n == 0 {
                return;
            }
            out.push_str(sym);
            if n > 1 {
                out.push_str(&n.to_string());
            }
        };
        if let Some(c) = counts.remove("C") {
            push("C", c);
            push("H", hydrogens);
        } else {
            counts.insert("H", hydrogens);
        }
        for (sym, n) in counts {
            push(sym, n);
        }
        out
    }
}
