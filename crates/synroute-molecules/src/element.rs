//! Periodic table lookup.

use std::fmt;

const SYMBOLS: [&str; 119] = [
    "*", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S",
    "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge",
    "As", "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd",
    "In", "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd",
    "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg",
    "Tl", "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm",
    "Bk", "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn",
    "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

/// A chemical element identified by atomic number. Zero is the SMILES wildcard `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element(u8);

impl Element {
    pub const WILDCARD: Element = Element(0);
    pub const H: Element = Element(1);
    pub const B: Element = Element(5);
    pub const C: Element = Element(6);
    pub const N: Element = Element(7);
    pub const O: Element = Element(8);
    pub const F: Element = Element(9);
    pub const P: Element = Element(15);
    pub const S: Element = Element(16);
    pub const CL: Element = Element(17);
    pub const AS: Element = Element(33);
    pub const SE: Element = Element(34);
    pub const BR: Element = Element(35);
    pub const TE: Element = Element(52);
    pub const I: Element = Element(53);

    pub fn from_atomic_number(n: u8) -> Option<Self> {
        ((n as usize) < SYMBOLS.len()).then_some(Element(n))
    }

    /// Case-sensitive symbol lookup (`"Cl"`, not `"CL"`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOLS
            .iter()
            .position(|s| *s == symbol)
            .map(|i| Element(i as u8))
    }

    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        SYMBOLS[self.0 as usize]
    }

    /// Allowed valences for the SMILES organic subset, lowest first.
    /// Elements outside the subset return an empty slice.
    pub fn default_valences(self) -> &'static [u8] {
        match self.0 {
            5 => &[3],
            6 => &[4],
            7 | 15 => &[3, 5],
            8 => &[2],
            16 => &[2, 4, 6],
            9 | 17 | 35 | 53 => &[1],
            _ => &[],
        }
    }

    pub fn is_organic_subset(self) -> bool {
        !self.default_valences().is_empty()
    }

    /// Elements that may be written aromatic (lowercase) in SMILES.
    pub fn can_be_aromatic(self) -> bool {
        matches!(self.0, 0 | 5 | 6 | 7 | 8 | 15 | 16 | 33 | 34 | 52)
    }

    /// Depiction color, loosely following the Jmol/CPK palette.
    pub fn color(self) -> &'static str {
        match self.0 {
            7 => "#3050F8",
            8 => "#FF0D0D",
            9 | 17 => "#1FA01F",
            15 => "#FF8000",
            16 => "#C6A100",
            35 => "#A62929",
            53 => "#940094",
            5 => "#E08070",
            _ => "#222222",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
