//! Valence model: implicit hydrogens and the explicit-valence sanity check.

use crate::element::Element;
use crate::mol::{Atom, Molecule};

/// Allowed valences for `element` carrying `charge`, lowest first.
///
/// Charged atoms shift along the isoelectronic series: N+ behaves like C,
/// O- like F, C+/C- both lose one bonding slot, B- gains one.
pub fn allowed_valences(element: Element, charge: i8) -> Vec<u8> {
    let base = element.default_valences();
    if charge == 0 {
        return base.to_vec();
    }
    base.iter()
        .filter_map(|&v| {
            let v = v as i16;
            let q = charge as i16;
            let shifted = if element == Element::C {
                v - q.abs()
            } else if element == Element::B {
                v - q
            } else {
                v + q
            };
            (shifted >= 0).then_some(shifted as u8)
        })
        .collect()
}

/// Outcome of checking one atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValenceCheck {
    /// Valence is acceptable; carries the implicit hydrogen count.
    Ok(u8),
    /// Explicit valence exceeds every allowed valence.
    Exceeded(u32),
}

/// Checks one atom and computes its implicit hydrogens.
///
/// `bond_sum` is the sum of bond valence contributions (aromatic = 1);
/// `aromatic_bonded` is whether the atom takes part in aromatic bonds.
pub fn check_atom(atom: &Atom, bond_sum: u32, aromatic_bonded: bool) -> ValenceCheck {
    if atom.element == Element::WILDCARD {
        return ValenceCheck::Ok(0);
    }
    let valences = allowed_valences(atom.element, atom.charge);
    if valences.is_empty() {
        // Outside the organic subset: trust what was written.
        return ValenceCheck::Ok(0);
    }
    let max = valences.iter().copied().map(u32::from).max().unwrap_or(0);

    if atom.bracket {
        let explicit = bond_sum + u32::from(atom.explicit_h.unwrap_or(0));
        return if explicit > max {
            ValenceCheck::Exceeded(explicit)
        } else {
            ValenceCheck::Ok(0)
        };
    }

    let Some(target) = lowest_valence_at_least(&valences, bond_sum) else {
        return ValenceCheck::Exceeded(bond_sum);
    };
    let room = target - bond_sum;
    // An aromatic atom with room left donates one unit to the pi system
    // (benzene c, pyridine n); one without room brings a lone pair (furan o,
    // thiophene s).
    if atom.aromatic && aromatic_bonded && room > 0 {
        return ValenceCheck::Ok(hydrogens(room - 1));
    }
    ValenceCheck::Ok(hydrogens(room))
}

/// Smallest allowed valence that can hold `used` bonding units.
pub fn lowest_valence_at_least(valences: &[u8], used: u32) -> Option<u32> {
    valences.iter().map(|&v| u32::from(v)).find(|&v| v >= used)
}

// `room` never exceeds an allowed valence, which is itself a u8.
fn hydrogens(room: u32) -> u8 {
    u8::try_from(room).unwrap_or(u8::MAX)
}

/// Assigns implicit hydrogens in place. Returns the index of the first atom
/// whose valence is exceeded, together with that valence.
pub fn assign_implicit_hydrogens(mol: &mut Molecule) -> Result<(), (usize, u32)> {
    let indices: Vec<_> = mol.graph().node_indices().collect();
    for idx in indices {
        let bond_sum = mol.bond_order_sum(idx);
        let aromatic_bonded = mol.has_aromatic_bond(idx);
        match check_atom(mol.atom(idx), bond_sum, aromatic_bonded) {
            ValenceCheck::Ok(h) => mol.atom_mut(idx).implicit_h = h,
            ValenceCheck::Exceeded(v) => return Err((idx.index(), v)),
        }
    }
    Ok(())
}
