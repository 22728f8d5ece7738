use crate::element::Element;
use crate::mol::Chirality;
use crate::smiles::error::SmilesError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Atom(AtomToken),
    Bond { bond: BondToken, pos: usize },
    RingClosure { digit: u8, pos: usize },
    OpenParen(usize),
    CloseParen(usize),
    Dot(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomToken {
    pub element: Element,
    pub aromatic: bool,
    pub isotope: Option<u16>,
    pub chirality: Chirality,
    pub hcount: Option<u8>,
    pub charge: i8,
    pub atom_class: Option<u16>,
    pub bracket: bool,
    pub pos: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondToken {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
    Up,
    Down,
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, SmilesError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '[' => {
                let (tok, next) = parse_bracket_atom(&chars, i)?;
                tokens.push(Token::Atom(tok));
                i = next;
            }
            'B' | 'C' => {
                let two = match (c, chars.get(i + 1)) {
                    ('B', Some('r')) => Some(Element::BR),
                    ('C', Some('l')) => Some(Element::CL),
                    _ => None,
                };
                match two {
                    Some(e) => {
                        tokens.push(Token::Atom(bare_atom(e, false, i)));
                        i += 2;
                    }
                    None => {
                        let e = if c == 'B' { Element::B } else { Element::C };
                        tokens.push(Token::Atom(bare_atom(e, false, i)));
                        i += 1;
                    }
                }
            }
            'N' | 'O' | 'P' | 'S' | 'F' | 'I' => {
                let e = match c {
                    'N' => Element::N,
                    'O' => Element::O,
                    'P' => Element::P,
                    'S' => Element::S,
                    'F' => Element::F,
                    _ => Element::I,
                };
                tokens.push(Token::Atom(bare_atom(e, false, i)));
                i += 1;
            }
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                let e = match c {
                    'b' => Element::B,
                    'c' => Element::C,
                    'n' => Element::N,
                    'o' => Element::O,
                    'p' => Element::P,
                    _ => Element::S,
                };
                tokens.push(Token::Atom(bare_atom(e, true, i)));
                i += 1;
            }
            '*' => {
                tokens.push(Token::Atom(bare_atom(Element::WILDCARD, false, i)));
                i += 1;
            }
            '-' | '=' | '#' | '$' | ':' | '/' | '\\' => {
                let bond = match c {
                    '-' => BondToken::Single,
                    '=' => BondToken::Double,
                    '#' => BondToken::Triple,
                    '$' => BondToken::Quadruple,
                    ':' => BondToken::Aromatic,
                    '/' => BondToken::Up,
                    _ => BondToken::Down,
                };
                tokens.push(Token::Bond { bond, pos: i });
                i += 1;
            }
            '0'..='9' => {
                tokens.push(Token::RingClosure { digit: c as u8 - b'0', pos: i });
                i += 1;
            }
            '%' => {
                let d1 = chars.get(i + 1).and_then(|c| c.to_digit(10));
                let d2 = chars.get(i + 2).and_then(|c| c.to_digit(10));
                match (d1, d2) {
                    (Some(a), Some(b)) => {
                        tokens.push(Token::RingClosure { digit: (a * 10 + b) as u8, pos: i });
                        i += 3;
                    }
                    _ if i + 2 >= chars.len() => return Err(SmilesError::UnexpectedEnd),
                    _ => return Err(SmilesError::UnexpectedChar { pos: i, ch: '%' }),
                }
            }
            '(' => {
                tokens.push(Token::OpenParen(i));
                i += 1;
            }
            ')' => {
                tokens.push(Token::CloseParen(i));
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot(i));
                i += 1;
            }
            ch if ch.is_ascii_alphabetic() => {
                return Err(SmilesError::InvalidElement { pos: i, text: ch.to_string() });
            }
            ch => return Err(SmilesError::UnexpectedChar { pos: i, ch }),
        }
    }

    Ok(tokens)
}

fn bare_atom(element: Element, aromatic: bool, pos: usize) -> AtomToken {
    AtomToken {
        element,
        aromatic,
        isotope: None,
        chirality: Chirality::None,
        hcount: None,
        charge: 0,
        atom_class: None,
        bracket: false,
        pos,
    }
}

fn read_number(chars: &[char], i: &mut usize) -> Option<Result<u32, ()>> {
    let start = *i;
    let mut value: u32 = 0;
    while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        value = match value.checked_mul(10).and_then(|v| v.checked_add(d)) {
            Some(v) => v,
            None => return Some(Err(())),
        };
        *i += 1;
    }
    (*i > start).then_some(Ok(value))
}

/// Parses `[...]` starting at `start` (which must point at `[`).
/// Returns the token and the index just past `]`.
fn parse_bracket_atom(chars: &[char], start: usize) -> Result<(AtomToken, usize), SmilesError> {
    let close = chars[start..]
        .iter()
        .position(|&c| c == ']')
        .map(|off| start + off)
        .ok_or(SmilesError::UnclosedBracket { pos: start })?;
    let end_err = |i: usize| -> SmilesError {
        if i >= close {
            SmilesError::UnclosedBracket { pos: start }
        } else {
            SmilesError::UnexpectedChar { pos: i, ch: chars[i] }
        }
    };

    let mut i = start + 1;

    let isotope = match read_number(&chars[..close], &mut i) {
        Some(Ok(n)) => Some(u16::try_from(n).map_err(|_| SmilesError::NumberOverflow { pos: start + 1 })?),
        Some(Err(())) => return Err(SmilesError::NumberOverflow { pos: start + 1 }),
        None => None,
    };

    let (element, aromatic) = parse_bracket_symbol(chars, &mut i, close)?;

    let mut chirality = Chirality::None;
    if i < close && chars[i] == '@' {
        i += 1;
        if i < close && chars[i] == '@' {
            chirality = Chirality::Clockwise;
            i += 1;
        } else {
            chirality = Chirality::CounterClockwise;
            // Extended classes: @TH1, @AL2, @SP3, @TB12, @OH30
            if i + 1 < close {
                let class: String = chars[i..i + 2].iter().collect();
                if matches!(class.as_str(), "TH" | "AL" | "SP" | "TB" | "OH") {
                    i += 2;
                    if read_number(&chars[..close], &mut i).is_none() {
                        return Err(end_err(i));
                    }
                }
            }
        }
    }

    let mut hcount = None;
    if i < close && chars[i] == 'H' {
        i += 1;
        let n = match chars.get(i).and_then(|c| c.to_digit(10)) {
            Some(d) if i < close => {
                i += 1;
                d as u8
            }
            _ => 1,
        };
        hcount = Some(n);
    }

    let mut charge: i8 = 0;
    if i < close && (chars[i] == '+' || chars[i] == '-') {
        let sign = chars[i];
        let charge_pos = i;
        i += 1;
        let magnitude: u32 = match read_number(&chars[..close], &mut i) {
            Some(Ok(n)) => n,
            Some(Err(())) => return Err(SmilesError::InvalidCharge { pos: charge_pos }),
            None => {
                let mut n = 1;
                while i < close && chars[i] == sign {
                    n += 1;
                    i += 1;
                }
                n
            }
        };
        if magnitude > 15 {
            return Err(SmilesError::InvalidCharge { pos: charge_pos });
        }
        charge = if sign == '+' { magnitude as i8 } else { -(magnitude as i8) };
    }

    let mut atom_class = None;
    if i < close && chars[i] == ':' {
        i += 1;
        match read_number(&chars[..close], &mut i) {
            Some(Ok(n)) => {
                atom_class = Some(u16::try_from(n).map_err(|_| SmilesError::NumberOverflow { pos: i })?)
            }
            Some(Err(())) => return Err(SmilesError::NumberOverflow { pos: i }),
            None => return Err(end_err(i)),
        }
    }

    if i != close {
        return Err(end_err(i));
    }

    Ok((
        AtomToken {
            element,
            aromatic,
            isotope,
            chirality,
            hcount,
            charge,
            atom_class,
            bracket: true,
            pos: start,
        },
        close + 1,
    ))
}

fn parse_bracket_symbol(
    chars: &[char],
    i: &mut usize,
    close: usize,
) -> Result<(Element, bool), SmilesError> {
    let pos = *i;
    let Some(&first) = chars.get(pos).filter(|_| pos < close) else {
        return Err(SmilesError::UnclosedBracket { pos: pos.saturating_sub(1) });
    };

    if first == '*' {
        *i += 1;
        return Ok((Element::WILDCARD, false));
    }

    if first.is_ascii_lowercase() {
        // Two-letter aromatic symbols first: se, as, te
        if pos + 1 < close {
            let two: String = chars[pos..pos + 2].iter().collect();
            let elem = match two.as_str() {
                "se" => Some(Element::SE),
                "as" => Some(Element::AS),
                "te" => Some(Element::TE),
                _ => None,
            };
            if let Some(e) = elem {
                *i += 2;
                return Ok((e, true));
            }
        }
        let upper = first.to_ascii_uppercase().to_string();
        let element = Element::from_symbol(&upper)
            .ok_or_else(|| SmilesError::InvalidElement { pos, text: first.to_string() })?;
        if !element.can_be_aromatic() {
            return Err(SmilesError::InvalidAromatic { pos, text: first.to_string() });
        }
        *i += 1;
        return Ok((element, true));
    }

    if !first.is_ascii_uppercase() {
        return Err(SmilesError::UnexpectedChar { pos, ch: first });
    }

    if pos + 1 < close && chars[pos + 1].is_ascii_lowercase() {
        let two: String = chars[pos..pos + 2].iter().collect();
        if let Some(e) = Element::from_symbol(&two) {
            *i += 2;
            return Ok((e, false));
        }
    }
    let one = first.to_string();
    let element = Element::from_symbol(&one)
        .ok_or(SmilesError::InvalidElement { pos, text: one })?;
    *i += 1;
    Ok((element, false))
}
