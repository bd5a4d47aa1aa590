use crate::error::{GameResult, SetupError};
use crate::selector::{self, PoolExhausted};
use rand::Rng;
use std::collections::HashSet;

/// Names and words already used, kept across rounds until the game ends
///
/// Invariant: `used_in_round` is a subset of `used_globally`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPools {
    pub used_in_round: HashSet<String>,
    pub used_globally: HashSet<String>,
    pub used_words: HashSet<String>,
}

impl SelectionPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget this round's picks; they stay in the global set
    pub fn begin_round(&mut self) {
        self.used_in_round.clear();
    }

    /// Draw the round's word, preferring words not shown yet
    pub fn draw_word<R: Rng + ?Sized>(&mut self, rng: &mut R, words: &[String]) -> GameResult<String> {
        let word = selector::pick_word(rng, words, &self.used_words).ok_or(SetupError::NoWords)?;
        if !self.used_words.insert(word.to_string()) {
            tracing::debug!("Every word has been shown, repeating {:?}", word);
        }
        Ok(word.to_string())
    }

    /// Draw a player not picked this round nor since the last global reset
    ///
    /// Exhaustion first resets the global set (keeping this round's picks
    /// excluded), then, if names are still exhausted, the round set too.
    pub fn draw_player<R: Rng + ?Sized>(&mut self, rng: &mut R, names: &[String]) -> GameResult<String> {
        if names.is_empty() {
            return Err(SetupError::NoNames.into());
        }

        let name = match self.pick_unused(rng, names) {
            Ok(name) => name,
            Err(PoolExhausted) => {
                self.reset_global();
                match self.pick_unused(rng, names) {
                    Ok(name) => name,
                    Err(PoolExhausted) => {
                        tracing::warn!("More players per round than names, allowing repeats");
                        self.used_in_round.clear();
                        self.used_globally.clear();
                        self.pick_unused(rng, names)
                            .map_err(|_| SetupError::NoNames)?
                    }
                }
            }
        };

        self.mark_used(&name);
        Ok(name)
    }

    /// Draw a replacement for `previous`, keeping `others` excluded
    ///
    /// The replacement differs from `previous` whenever there are more
    /// distinct names than selected players.
    pub fn draw_replacement<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        names: &[String],
        others: &[String],
        previous: &str,
    ) -> GameResult<String> {
        self.release(previous);

        let mut exclude: HashSet<String> = others.iter().cloned().collect();
        exclude.insert(previous.to_string());

        let mut with_global = exclude.clone();
        with_global.extend(self.used_globally.iter().cloned());

        let name = match selector::pick_name(rng, names, &with_global) {
            Ok(name) => name,
            Err(PoolExhausted) => {
                self.reset_global();
                match selector::pick_name(rng, names, &exclude) {
                    Ok(name) => name,
                    Err(PoolExhausted) => {
                        tracing::debug!("No other name available, {:?} may return", previous);
                        exclude.remove(previous);
                        selector::pick_name(rng, names, &exclude)
                            .map_err(|_| SetupError::NoNames)?
                    }
                }
            }
        };

        let name = name.to_string();
        self.mark_used(&name);
        Ok(name)
    }

    /// Return a name to both pools so it can be drawn again
    pub fn release(&mut self, name: &str) {
        self.used_in_round.remove(name);
        self.used_globally.remove(name);
    }

    /// Names a fresh draw must skip right now
    pub fn excluded_names(&self) -> HashSet<String> {
        self.used_in_round
            .union(&self.used_globally)
            .cloned()
            .collect()
    }

    fn pick_unused<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        names: &[String],
    ) -> Result<String, PoolExhausted> {
        selector::pick_name(rng, names, &self.excluded_names()).map(str::to_string)
    }

    fn mark_used(&mut self, name: &str) {
        self.used_in_round.insert(name.to_string());
        self.used_globally.insert(name.to_string());
    }

    fn reset_global(&mut self) {
        tracing::debug!(
            "All names used, resetting global pool ({} kept for this round)",
            self.used_in_round.len()
        );
        self.used_globally.clear();
        self.used_globally
            .extend(self.used_in_round.iter().cloned());
    }
}
