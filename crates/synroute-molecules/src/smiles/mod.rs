//! SMILES parsing and validation.
//!
//! `parse_smiles` turns a line-notation string into a [`Molecule`] or explains
//! why it cannot. It covers OpenSMILES syntax (organic subset, bracket atoms,
//! branches, ring closures, disconnected components) and rejects the chemically
//! impossible cases a cheminformatics toolkit would: over-valent organic atoms,
//! aromatic atoms outside a ring, and aromatic systems with no Kekulé form.

mod error;
mod tokenizer;

pub use error::SmilesError;
pub use tokenizer::{tokenize, AtomToken, BondToken, Token};

use std::collections::BTreeMap;

use petgraph::graph::NodeIndex;
use tracing::debug;

use crate::kekulize::{kekulize, KekulizeError};
use crate::mol::{Atom, Bond, BondDirection, BondOrder, Molecule};
use crate::rings::RingInfo;
use crate::valence;

fn bond_from_token(tok: BondToken) -> Bond {
    match tok {
        BondToken::Single => Bond::new(BondOrder::Single),
        BondToken::Double => Bond::new(BondOrder::Double),
        BondToken::Triple => Bond::new(BondOrder::Triple),
        BondToken::Quadruple => Bond::new(BondOrder::Quadruple),
        BondToken::Aromatic => Bond::new(BondOrder::Aromatic),
        BondToken::Up => Bond { order: BondOrder::Single, direction: BondDirection::Up },
        BondToken::Down => Bond { order: BondOrder::Single, direction: BondDirection::Down },
    }
}

fn atom_from_token(tok: &AtomToken) -> Atom {
    Atom {
        element: tok.element,
        aromatic: tok.aromatic,
        isotope: tok.isotope,
        charge: tok.charge,
        explicit_h: tok.hcount,
        implicit_h: 0,
        bracket: tok.bracket,
        atom_class: tok.atom_class,
        chirality: tok.chirality,
    }
}

struct OpenRing {
    atom: NodeIndex,
    bond: Option<BondToken>,
}

struct OpenBranch {
    parent: NodeIndex,
    pos: usize,
    atoms_before: usize,
}

/// Graph construction state while walking the token stream.
struct Builder {
    mol: Molecule,
    positions: Vec<usize>,
    prev: Option<NodeIndex>,
    pending: Option<(BondToken, usize)>,
    branches: Vec<OpenBranch>,
    rings: BTreeMap<u8, OpenRing>,
}

impl Builder {
    fn new() -> Self {
        Self {
            mol: Molecule::new(),
            positions: Vec::new(),
            prev: None,
            pending: None,
            branches: Vec::new(),
            rings: BTreeMap::new(),
        }
    }

    fn default_bond(&self, a: NodeIndex, b: NodeIndex) -> Bond {
        if self.mol.atom(a).aromatic && self.mol.atom(b).aromatic {
            Bond::new(BondOrder::Aromatic)
        } else {
            Bond::new(BondOrder::Single)
        }
    }

    fn connect(&mut self, a: NodeIndex, b: NodeIndex, bond: Option<BondToken>, pos: usize) -> Result<(), SmilesError> {
        if self.mol.bond_between(a, b).is_some() {
            return Err(SmilesError::DuplicateBond { pos });
        }
        let bond = match bond {
            Some(tok) => bond_from_token(tok),
            None => self.default_bond(a, b),
        };
        self.mol.add_bond(a, b, bond);
        Ok(())
    }

    fn atom(&mut self, tok: &AtomToken) -> Result<(), SmilesError> {
        let idx = self.mol.add_atom(atom_from_token(tok));
        self.positions.push(tok.pos);
        match self.prev {
            Some(prev) => {
                let bond = self.pending.take().map(|(b, _)| b);
                self.connect(prev, idx, bond, tok.pos)?;
            }
            None => {
                if let Some((_, pos)) = self.pending {
                    return Err(SmilesError::BondWithoutAtom { pos });
                }
            }
        }
        self.prev = Some(idx);
        Ok(())
    }

    fn bond(&mut self, bond: BondToken, pos: usize) -> Result<(), SmilesError> {
        if self.prev.is_none() {
            return Err(SmilesError::BondWithoutAtom { pos });
        }
        if self.pending.is_some() {
            return Err(SmilesError::UnexpectedChar { pos, ch: bond_char(bond) });
        }
        self.pending = Some((bond, pos));
        Ok(())
    }

    fn ring_closure(&mut self, digit: u8, pos: usize) -> Result<(), SmilesError> {
        let Some(current) = self.prev else {
            return Err(SmilesError::RingWithoutAtom { digit, pos });
        };
        let bond = self.pending.take().map(|(b, _)| b);

        match self.rings.remove(&digit) {
            Some(open) => {
                if open.atom == current {
                    return Err(SmilesError::SelfBond { digit, pos });
                }
                let resolved = match (open.bond, bond) {
                    (Some(a), Some(b)) if bond_from_token(a).order != bond_from_token(b).order => {
                        return Err(SmilesError::RingBondConflict { digit });
                    }
                    (Some(a), _) => Some(a),
                    (None, b) => b,
                };
                self.connect(open.atom, current, resolved, pos)?;
            }
            None => {
                self.rings.insert(digit, OpenRing { atom: current, bond });
            }
        }
        Ok(())
    }

    fn open_branch(&mut self, pos: usize) -> Result<(), SmilesError> {
        let Some(parent) = self.prev else {
            return Err(SmilesError::BranchWithoutAtom { pos });
        };
        if let Some((_, bpos)) = self.pending {
            return Err(SmilesError::DanglingBond { pos: bpos });
        }
        self.branches.push(OpenBranch {
            parent,
            pos,
            atoms_before: self.mol.atom_count(),
        });
        Ok(())
    }

    fn close_branch(&mut self, pos: usize) -> Result<(), SmilesError> {
        let branch = self
            .branches
            .pop()
            .ok_or(SmilesError::UnmatchedParen { pos })?;
        if let Some((_, bpos)) = self.pending {
            return Err(SmilesError::DanglingBond { pos: bpos });
        }
        if self.mol.atom_count() == branch.atoms_before {
            return Err(SmilesError::EmptyBranch { pos: branch.pos });
        }
        self.prev = Some(branch.parent);
        Ok(())
    }

    fn dot(&mut self, pos: usize) -> Result<(), SmilesError> {
        if let Some((_, bpos)) = self.pending {
            return Err(SmilesError::DanglingBond { pos: bpos });
        }
        if self.prev.is_none() {
            return Err(SmilesError::UnexpectedChar { pos, ch: '.' });
        }
        self.prev = None;
        Ok(())
    }

    fn finish(mut self) -> Result<(Molecule, Vec<usize>), SmilesError> {
        if let Some((_, pos)) = self.pending {
            return Err(SmilesError::DanglingBond { pos });
        }
        if let Some(branch) = self.branches.first() {
            return Err(SmilesError::UnmatchedParen { pos: branch.pos });
        }
        if let Some((&digit, _)) = self.rings.iter().next() {
            return Err(SmilesError::UnclosedRing { digit });
        }
        if self.prev.is_none() {
            // Trailing '.' or nothing at all
            return Err(if self.mol.atom_count() == 0 {
                SmilesError::EmptyInput
            } else {
                SmilesError::UnexpectedEnd
            });
        }
        self.mol = demote_acyclic_aromatic_bonds(self.mol);
        Ok((self.mol, self.positions))
    }
}

fn bond_char(bond: BondToken) -> char {
    match bond {
        BondToken::Single => '-',
        BondToken::Double => '=',
        BondToken::Triple => '#',
        BondToken::Quadruple => '$',
        BondToken::Aromatic => ':',
        BondToken::Up => '/',
        BondToken::Down => '\\',
    }
}

/// Bonds between aromatic atoms that are not part of any ring are single
/// (the bond joining the two rings of biphenyl).
fn demote_acyclic_aromatic_bonds(mol: Molecule) -> Molecule {
    let rings = RingInfo::perceive(&mol);
    let graph = mol.graph();
    let mut out = Molecule::new();
    for (_, atom) in mol.atoms() {
        out.add_atom(atom.clone());
    }
    for edge in graph.edge_indices() {
        let Some((a, b)) = graph.edge_endpoints(edge) else {
            continue;
        };
        let mut bond = graph[edge];
        if bond.order == BondOrder::Aromatic && !rings.is_ring_bond(edge) {
            bond.order = BondOrder::Single;
        }
        out.add_bond(a, b, bond);
    }
    out
}

/// Parse and validate a SMILES string.
pub fn parse_smiles(input: &str) -> Result<Molecule, SmilesError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SmilesError::EmptyInput);
    }

    let tokens = tokenize(input)?;
    let mut builder = Builder::new();
    for token in &tokens {
        match token {
            Token::Atom(a) => builder.atom(a)?,
            Token::Bond { bond, pos } => builder.bond(*bond, *pos)?,
            Token::RingClosure { digit, pos } => builder.ring_closure(*digit, *pos)?,
            Token::OpenParen(pos) => builder.open_branch(*pos)?,
            Token::CloseParen(pos) => builder.close_branch(*pos)?,
            Token::Dot(pos) => builder.dot(*pos)?,
        }
    }
    let (mut mol, positions) = builder.finish()?;

    let rings = RingInfo::perceive(&mol);
    if let Some((idx, atom)) = mol
        .atoms()
        .find(|(idx, atom)| atom.aromatic && !rings.is_ring_atom(*idx))
    {
        return Err(SmilesError::AromaticOutsideRing {
            pos: positions[idx.index()],
            element: atom.element.symbol().to_string(),
        });
    }

    if let Err((idx, valence)) = valence::assign_implicit_hydrogens(&mut mol) {
        return Err(SmilesError::ValenceExceeded {
            pos: positions[idx],
            element: mol.atom(NodeIndex::new(idx)).element.symbol().to_string(),
            valence,
        });
    }

    if let Err(KekulizeError::Unkekulizable(unmatched)) = kekulize(&mol) {
        if let Some(&idx) = unmatched.iter().min() {
            return Err(SmilesError::Unkekulizable {
                pos: positions[idx.index()],
                element: mol.atom(idx).element.symbol().to_string(),
            });
        }
    }

    debug!(
        atoms = mol.atom_count(),
        bonds = mol.bond_count(),
        rings = rings.rings().len(),
        "parsed SMILES"
    );
    Ok(mol)
}
