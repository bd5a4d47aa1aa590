//! Random draws without replacement
//!
//! The selector never owns state: callers pass the pool and the set of items
//! to exclude. A name listed twice stays in the candidate list twice, so it
//! carries twice the weight in a draw.

use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;

/// Every candidate has been excluded; the caller decides how to reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Every candidate in the pool has already been used")]
pub struct PoolExhausted;

/// Candidates in `pool` that are not excluded, in pool order
pub fn eligible<'a>(pool: &'a [String], exclude: &HashSet<String>) -> Vec<&'a str> {
    pool.iter()
        .filter(|item| !exclude.contains(item.as_str()))
        .map(String::as_str)
        .collect()
}

/// Draw a word that has not been shown yet
///
/// When every word is excluded the draw falls back to the whole list without
/// touching `exclude`, so words repeat from then on. Returns `None` only for
/// an empty word list.
pub fn pick_word<'a, R: Rng + ?Sized>(
    rng: &mut R,
    words: &'a [String],
    exclude: &HashSet<String>,
) -> Option<&'a str> {
    eligible(words, exclude)
        .choose(rng)
        .copied()
        .or_else(|| words.choose(rng).map(String::as_str))
}

/// Draw a name that is not excluded
pub fn pick_name<'a, R: Rng + ?Sized>(
    rng: &mut R,
    names: &'a [String],
    exclude: &HashSet<String>,
) -> Result<&'a str, PoolExhausted> {
    eligible(names, exclude)
        .choose(rng)
        .copied()
        .ok_or(PoolExhausted)
}

/// Name to flash in a spin frame: one not drawn yet when possible
///
/// Frames are cosmetic, so an exhausted pool shows any name rather than
/// signalling [`PoolExhausted`]. Returns `None` only for an empty list.
pub fn pick_spin_name<'a, R: Rng + ?Sized>(
    rng: &mut R,
    names: &'a [String],
    exclude: &HashSet<String>,
) -> Option<&'a str> {
    match pick_name(rng, names, exclude) {
        Ok(name) => Some(name),
        Err(PoolExhausted) => names.choose(rng).map(String::as_str),
    }
}
