//! Conflict resolution policies.
//!
//! Each policy is a pure function from the candidate symbols at a position to either a
//! gap or a single output symbol.

use mapcons_dna::union_code;

use crate::data_point::{ConsensusSymbol, PreVariant, UNRESOLVED};

/// How to collapse two or more candidate symbols into one consensus symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictResolution {
    /// Pick the candidate with the highest count; the first one seen wins ties
    #[default]
    Vote,
    /// Emit the IUPAC ambiguity code covering every candidate base
    Iupac,
    /// Emit `N` whenever there is more than one candidate
    ForcedN,
}

/// Outcome of resolving one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    /// The position is left out of the output
    Gap,
    /// The position contributes this symbol to the output
    Symbol(u8),
}

impl Resolved {
    /// Returns true for [`Resolved::Gap`].
    #[must_use]
    pub fn is_gap(self) -> bool {
        matches!(self, Self::Gap)
    }
}

impl ConflictResolution {
    /// Short name used in conflict annotations.
    #[must_use]
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Vote => "Vote",
            Self::Iupac => "Ambiguous",
            Self::ForcedN => "Unknown",
        }
    }

    /// Resolves the candidates at one position.
    ///
    /// No candidates resolve to `N`; a single candidate resolves to itself (possibly a gap).
    /// With two or more candidates only [`ConflictResolution::Vote`] can produce a gap.
    #[must_use]
    pub fn resolve(self, pre_variants: &[PreVariant]) -> Resolved {
        match pre_variants {
            [] => Resolved::Symbol(UNRESOLVED),
            [only] => as_resolved(only.symbol),
            _ => match self {
                Self::Vote => best_vote(pre_variants)
                    .map_or(Resolved::Symbol(UNRESOLVED), |pv| as_resolved(pv.symbol)),
                Self::Iupac => Resolved::Symbol(union_code(candidate_bases(pre_variants))),
                Self::ForcedN => Resolved::Symbol(UNRESOLVED),
            },
        }
    }
}

fn as_resolved(symbol: ConsensusSymbol) -> Resolved {
    match symbol {
        ConsensusSymbol::Gap => Resolved::Gap,
        ConsensusSymbol::Base(base) => Resolved::Symbol(base),
    }
}

fn candidate_bases(pre_variants: &[PreVariant]) -> impl Iterator<Item = u8> + '_ {
    pre_variants.iter().filter_map(|pv| match pv.symbol {
        ConsensusSymbol::Gap => None,
        ConsensusSymbol::Base(base) => Some(base),
    })
}

/// Candidate with the strictly highest count, keeping the earliest on ties.
fn best_vote(pre_variants: &[PreVariant]) -> Option<&PreVariant> {
    pre_variants.iter().fold(None, |best: Option<&PreVariant>, pv| match best {
        Some(current) if current.count >= pv.count => Some(current),
        _ => Some(pv),
    })
}
