//! IUPAC nucleotide ambiguity codes.
//!
//! Bases are represented as a 4-bit mask (A=1, C=2, G=4, T=8); every non-empty mask has
//! exactly one IUPAC letter.

use crate::NO_CALL_BASE;

const A: u8 = 0b0001;
const C: u8 = 0b0010;
const G: u8 = 0b0100;
const T: u8 = 0b1000;

/// Letters indexed by mask.
const CODES: [u8; 16] = [
    NO_CALL_BASE, // empty set
    b'A',
    b'C',
    b'M', // A/C
    b'G',
    b'R', // A/G
    b'S', // C/G
    b'V', // A/C/G
    b'T',
    b'W', // A/T
    b'Y', // C/T
    b'H', // A/C/T
    b'K', // G/T
    b'D', // A/G/T
    b'B', // C/G/T
    b'N',
];

/// Returns the set of canonical bases an IUPAC letter stands for, as a mask.
///
/// Unknown symbols (including gaps) yield an empty mask.
#[must_use]
pub const fn iupac_mask(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => A,
        b'C' => C,
        b'G' => G,
        b'T' | b'U' => T,
        b'M' => A | C,
        b'R' => A | G,
        b'W' => A | T,
        b'S' => C | G,
        b'Y' => C | T,
        b'K' => G | T,
        b'V' => A | C | G,
        b'H' => A | C | T,
        b'D' => A | G | T,
        b'B' => C | G | T,
        b'N' => A | C | G | T,
        _ => 0,
    }
}

/// Returns the IUPAC letter for a base mask; the empty mask maps to `N`.
#[must_use]
pub const fn ambiguity_code(mask: u8) -> u8 {
    CODES[(mask & 0b1111) as usize]
}

/// Collapses a set of bases into the single IUPAC code covering all of them.
///
/// # Examples
///
/// ```
/// use mapcons_dna::union_code;
///
/// assert_eq!(union_code([b'A', b'C']), b'M');
/// assert_eq!(union_code([b'A', b'T']), b'W');
/// assert_eq!(union_code([b'G']), b'G');
/// assert_eq!(union_code([]), b'N');
/// ```
#[must_use]
pub fn union_code(bases: impl IntoIterator<Item = u8>) -> u8 {
    ambiguity_code(bases.into_iter().fold(0, |mask, base| mask | iupac_mask(base)))
}
