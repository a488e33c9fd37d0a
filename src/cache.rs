use std::collections::HashMap;

use crate::model::Match;
use crate::roster::Player;
use crate::source::MatchSource;

/// Run-scoped memo of fetched matches, keyed by match id. Roster members
/// mostly share lobbies, so the second player onward hits the cache instead
/// of the tracker. Rebuilt from empty every invocation.
#[derive(Debug, Default)]
pub struct MatchCache {
    entries: HashMap<String, Match>,
}

impl MatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls the adapter at most once per distinct match id. Failed fetches
    /// are not cached; asking for the same id again retries the adapter.
    pub fn get_or_fetch(
        &mut self,
        source: &dyn MatchSource,
        match_id: &str,
        requesting: Option<&Player>,
    ) -> Option<&Match> {
        if !self.entries.contains_key(match_id) {
            let fetched = source.fetch_match(match_id, requesting)?;
            self.entries.insert(match_id.to_string(), fetched);
        }
        self.entries.get(match_id)
    }

    pub fn get(&self, match_id: &str) -> Option<&Match> {
        self.entries.get(match_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every distinct match fetched this run, oldest first. Match ids break
    /// timestamp ties so the order is stable.
    pub fn matches_by_start_time(&self) -> Vec<&Match> {
        let mut all: Vec<&Match> = self.entries.values().collect();
        all.sort_by(|a, b| {
            a.metadata
                .start_time_ts
                .cmp(&b.metadata.start_time_ts)
                .then_with(|| a.metadata.match_id.cmp(&b.metadata.match_id))
        });
        all
    }
}
