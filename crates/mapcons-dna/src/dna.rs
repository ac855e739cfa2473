//! Complement and reverse complement of DNA sequences.

use crate::NO_CALL_BASE;

/// Complements a single DNA base, normalizing A/C/G/T to uppercase.
///
/// IUPAC ambiguity codes are complemented to the code of the complementary set
/// (e.g. `R` (A/G) becomes `Y` (C/T)); gaps and unknown symbols are returned unchanged.
#[inline]
#[must_use]
pub const fn complement_base(base: u8) -> u8 {
    match base {
        b'A' | b'a' => b'T',
        b'T' | b't' => b'A',
        b'C' | b'c' => b'G',
        b'G' | b'g' => b'C',
        b'R' => b'Y',
        b'Y' => b'R',
        b'K' => b'M',
        b'M' => b'K',
        b'B' => b'V',
        b'V' => b'B',
        b'D' => b'H',
        b'H' => b'D',
        b'n' => NO_CALL_BASE,
        _ => base,
    }
}

/// Reverse complements a DNA sequence.
///
/// # Examples
///
/// ```
/// use mapcons_dna::reverse_complement;
///
/// assert_eq!(reverse_complement(b"ACGT"), b"ACGT".to_vec());
/// assert_eq!(reverse_complement(b"AACN"), b"NGTT".to_vec());
/// assert_eq!(reverse_complement(b"acgt"), b"ACGT".to_vec());
/// ```
#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&base| complement_base(base)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b'A', b'T')]
    #[case(b'c', b'G')]
    #[case(b'N', b'N')]
    #[case(b'n', b'N')]
    #[case(b'R', b'Y')]
    #[case(b'S', b'S')]
    #[case(b'W', b'W')]
    #[case(b'-', b'-')]
    fn test_complement_base(#[case] base: u8, #[case] expected: u8) {
        assert_eq!(complement_base(base), expected);
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b""), Vec::<u8>::new());
        assert_eq!(reverse_complement(b"AAAC"), b"GTTT".to_vec());
        assert_eq!(reverse_complement(b"AC-GT"), b"AC-GT".to_vec());
        assert_eq!(reverse_complement(b"RAT"), b"ATY".to_vec());
    }
}
