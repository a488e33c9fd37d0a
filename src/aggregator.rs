use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cache::MatchCache;
use crate::discovery::discover_new_matches;
use crate::roster::{Player, Team};
use crate::rows;
use crate::sheets::{OVERALL_SHEET, SheetStore};
use crate::source::MatchSource;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamRunSummary {
    pub players_processed: usize,
    pub individual_rows: usize,
    pub team_rows: usize,
    pub matches_cached: usize,
    pub fetch_failures: usize,
}

/// One full ingest for a team: a per-player pass that streams individual
/// rows, then a single team pass over everything the per-player phase left
/// in the cache. The cache is created here and threaded through both phases
/// so the ordering dependency stays visible.
pub fn run_for_team(
    source: &dyn MatchSource,
    store: &dyn SheetStore,
    team: Team,
) -> Result<TeamRunSummary> {
    let mut cache = MatchCache::new();
    let mut summary = TeamRunSummary::default();

    for player in team.roster() {
        let appended = ingest_player(source, store, &mut cache, team, &player, &mut summary)?;
        summary.individual_rows += appended;
        summary.players_processed += 1;
    }

    summary.team_rows = append_team_rows(store, &cache, team)?;
    summary.matches_cached = cache.len();
    Ok(summary)
}

fn ingest_player(
    source: &dyn MatchSource,
    store: &dyn SheetStore,
    cache: &mut MatchCache,
    team: Team,
    player: &Player,
    summary: &mut TeamRunSummary,
) -> Result<usize> {
    let checkpoint = store
        .last_checkpoint(player, team)
        .with_context(|| format!("reading checkpoint for {}", player.name))?;
    let new_ids = discover_new_matches(source, player, checkpoint.as_deref());
    info!(
        player = %player.name,
        new_matches = new_ids.len(),
        checkpoint = ?checkpoint,
        "discovery complete"
    );

    let mut rows_out = Vec::new();
    // Discovery returns newest first; the sheet grows oldest first.
    for match_id in new_ids.iter().rev() {
        let Some(m) = cache.get_or_fetch(source, match_id, Some(player)) else {
            warn!(player = %player.name, match_id = %match_id, "match unavailable, skipping");
            summary.fetch_failures += 1;
            continue;
        };
        rows_out.push(rows::project_individual(m, player)?);
    }

    if rows_out.is_empty() {
        return Ok(0);
    }
    store
        .append_rows(team, &player.name, &rows_out)
        .with_context(|| format!("appending rows for {}", player.name))?;
    Ok(rows_out.len())
}

fn append_team_rows(store: &dyn SheetStore, cache: &MatchCache, team: Team) -> Result<usize> {
    let mut rows_out = Vec::new();
    for m in cache.matches_by_start_time() {
        // Solo queues and fill-lobby randoms do not make a team row.
        if rows::tracked_members(m, team) < 2 {
            continue;
        }
        rows_out.push(rows::project_team(m));
    }
    if rows_out.is_empty() {
        return Ok(0);
    }
    store
        .append_rows(team, OVERALL_SHEET, &rows_out)
        .context("appending team rows")?;
    Ok(rows_out.len())
}
