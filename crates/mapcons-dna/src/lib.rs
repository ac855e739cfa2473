#![deny(unsafe_code)]

//! Nucleotide symbol utilities shared by the consensus engine.
//!
//! This crate provides:
//! - The six symbol slots used by pileup counts (gap, A, C, G, T, N)
//! - IUPAC ambiguity codes and the union of a set of bases into one code
//! - Complement and reverse-complement of DNA sequences

pub mod dna;
pub mod iupac;

pub use dna::{complement_base, reverse_complement};
pub use iupac::{ambiguity_code, iupac_mask, union_code};

/// No-call base character.
pub const NO_CALL_BASE: u8 = b'N';

/// Character used for a gap (deletion relative to the main sequence).
pub const GAP_BASE: u8 = b'-';

/// Number of symbol slots tallied per strand at a pileup position.
pub const SLOT_COUNT: usize = 6;

/// Slot holding gaps.
pub const GAP_SLOT: usize = 0;

/// Slot holding N and every other non-ACGT symbol.
pub const N_SLOT: usize = 5;

/// Per-strand symbol counts indexed by slot.
pub type SymbolCounts = [u32; SLOT_COUNT];

/// Returns the slot a base is tallied in.
///
/// Gaps map to [`GAP_SLOT`], A/C/G/T (either case) to slots 1-4 and everything else to
/// [`N_SLOT`].
///
/// # Examples
///
/// ```
/// use mapcons_dna::{slot_of, GAP_SLOT, N_SLOT};
///
/// assert_eq!(slot_of(b'-'), GAP_SLOT);
/// assert_eq!(slot_of(b'a'), 1);
/// assert_eq!(slot_of(b'T'), 4);
/// assert_eq!(slot_of(b'R'), N_SLOT);
/// ```
#[inline]
#[must_use]
pub const fn slot_of(base: u8) -> usize {
    match base {
        GAP_BASE => GAP_SLOT,
        b'A' | b'a' => 1,
        b'C' | b'c' => 2,
        b'G' | b'g' => 3,
        b'T' | b't' => 4,
        _ => N_SLOT,
    }
}

/// Returns the symbol represented by a slot.
///
/// # Panics
///
/// Panics if `slot >= SLOT_COUNT`.
#[inline]
#[must_use]
pub const fn base_of_slot(slot: usize) -> u8 {
    match slot {
        GAP_SLOT => GAP_BASE,
        1 => b'A',
        2 => b'C',
        3 => b'G',
        4 => b'T',
        N_SLOT => NO_CALL_BASE,
        _ => panic!("symbol slot out of range"),
    }
}
