use thiserror::Error;

/// Errors produced when parsing or validating a SMILES string.
///
/// Positions are zero-based character offsets into the trimmed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmilesError {
    #[error("empty SMILES string")]
    EmptyInput,

    #[error("unexpected end of SMILES")]
    UnexpectedEnd,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("unknown element '{text}' at position {pos}")]
    InvalidElement { pos: usize, text: String },

    #[error("element '{text}' at position {pos} cannot be aromatic")]
    InvalidAromatic { pos: usize, text: String },

    #[error("unclosed bracket atom starting at position {pos}")]
    UnclosedBracket { pos: usize },

    #[error("invalid charge at position {pos}")]
    InvalidCharge { pos: usize },

    #[error("isotope or atom class overflow at position {pos}")]
    NumberOverflow { pos: usize },

    #[error("unmatched parenthesis at position {pos}")]
    UnmatchedParen { pos: usize },

    #[error("empty branch at position {pos}")]
    EmptyBranch { pos: usize },

    #[error("branch at position {pos} has no preceding atom")]
    BranchWithoutAtom { pos: usize },

    #[error("bond at position {pos} has no preceding atom")]
    BondWithoutAtom { pos: usize },

    #[error("bond at position {pos} is not followed by an atom")]
    DanglingBond { pos: usize },

    #[error("ring closure {digit} at position {pos} has no preceding atom")]
    RingWithoutAtom { digit: u8, pos: usize },

    #[error("unclosed ring {digit}")]
    UnclosedRing { digit: u8 },

    #[error("conflicting bond types on ring closure {digit}")]
    RingBondConflict { digit: u8 },

    #[error("ring closure {digit} at position {pos} bonds an atom to itself")]
    SelfBond { digit: u8, pos: usize },

    #[error("duplicate bond at position {pos}")]
    DuplicateBond { pos: usize },

    #[error("explicit valence {valence} for {element} at position {pos} is greater than permitted")]
    ValenceExceeded { pos: usize, element: String, valence: u32 },

    #[error("non-ring atom {element} at position {pos} marked aromatic")]
    AromaticOutsideRing { pos: usize, element: String },

    #[error("can't kekulize aromatic {element} at position {pos}")]
    Unkekulizable { pos: usize, element: String },

    #[error("input is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },
}
