use tracing::warn;

use crate::roster::Player;
use crate::source::MatchSource;

/// Hard cap on page fetches per player per run. With no checkpoint this is
/// the only bound on how far back history is pulled.
pub const MAX_PAGE_CALLS: usize = 5;

/// Walks the player's match history newest-first until the checkpoint id
/// shows up, pages run out, or the call budget is spent. The checkpoint
/// itself is excluded. Callers wanting chronological order reverse the
/// result.
pub fn discover_new_matches(
    source: &dyn MatchSource,
    player: &Player,
    checkpoint: Option<&str>,
) -> Vec<String> {
    let mut discovered = Vec::new();
    let mut page_token: Option<String> = None;

    for _ in 0..MAX_PAGE_CALLS {
        let page = match source.match_id_page(player, page_token.as_deref()) {
            Ok(page) => page,
            Err(err) => {
                // A failed page counts as "no more pages".
                warn!(gamertag = %player.gamertag, error = %err, "page fetch failed, stopping discovery");
                return discovered;
            }
        };
        for id in page.ids {
            if checkpoint.is_some_and(|last| last == id) {
                return discovered;
            }
            discovered.push(id);
        }
        match page.next_token {
            Some(token) => page_token = Some(token),
            None => return discovered,
        }
    }

    discovered
}
