use anyhow::Result;

use crate::model::Match;
use crate::roster::{Platform, Player};

/// One page of recent match ids for a player, newest first, plus the token
/// for the next page (`None` once history is exhausted).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchIdPage {
    pub ids: Vec<String>,
    pub next_token: Option<String>,
}

/// Outcome of an identity lookup. `activision_id` may legitimately be empty:
/// some handles carry no discriminator suffix, which is distinct from the
/// lookup failing outright.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub activision_id: String,
    pub platform: Platform,
}

/// Everything the pipeline needs from the stats site. All methods are
/// blocking; failures on the fetch paths surface as `None`/`Err` and the
/// caller decides whether to degrade or stop.
pub trait MatchSource {
    fn match_id_page(&self, player: &Player, page_token: Option<&str>) -> Result<MatchIdPage>;

    /// `None` means unavailable: network error, unknown id, or a payload
    /// that failed validation; the caller cannot tell these apart. With a
    /// requesting player the result is that player's team view; without one
    /// it is the full lobby.
    fn fetch_match(&self, match_id: &str, requesting: Option<&Player>) -> Option<Match>;

    fn resolve_identity(&self, gamertag: &str) -> Option<ResolvedIdentity>;

    /// Rolling last-7-days K/D as published on the player's profile page.
    fn recent_kd_ratio(&self, player: &Player) -> Option<f64>;
}
