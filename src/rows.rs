use std::collections::BTreeSet;

use chrono::DateTime;
use thiserror::Error;

use crate::model::Match;
use crate::roster::{self, Player, Team};

pub const TIME_FORMAT: &str = "%m/%d/%Y %H:%M";

/// Label for participants outside the tracked pool. They still count toward
/// team aggregates, they just show up generically in the roster field.
pub const UNKNOWN_NAME: &str = "Unknown";

pub const ROSTER_DELIMITER: &str = "|";

#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    /// A player is expected to appear in their own match; a miss means the
    /// payload or the team view is broken, not that the player sat out.
    #[error("{gamertag} is not a participant of match {match_id}")]
    ParticipantNotFound { gamertag: String, match_id: String },
}

/// Individual row: `match_id, time, placement, kills, deaths, damage_done,
/// gulag_kills, gulag_deaths, roster, mode`.
pub fn project_individual(m: &Match, player: &Player) -> Result<Vec<String>, RowError> {
    let participant =
        m.participant(&player.gamertag)
            .ok_or_else(|| RowError::ParticipantNotFound {
                gamertag: player.gamertag.clone(),
                match_id: m.metadata.match_id.clone(),
            })?;
    let stats = &participant.stats;
    Ok(vec![
        m.metadata.match_id.clone(),
        format_start_time(m.metadata.start_time_ts),
        placement_field(stats.team_placement),
        stats.kills.to_string(),
        stats.deaths.to_string(),
        stats.damage_done.to_string(),
        stats.gulag_kills.to_string(),
        stats.gulag_deaths.to_string(),
        roster_field(m),
        m.metadata.mode_name.clone(),
    ])
}

/// Team row: `match_id, time, game_duration_sec, placement, kills, deaths,
/// damage_done, roster, mode, win, top_five`. Aggregates run over every
/// participant in the (already team-filtered) match.
pub fn project_team(m: &Match) -> Vec<String> {
    let participants = m.participants();
    let kills: u32 = participants.iter().map(|p| p.stats.kills).sum();
    let deaths: u32 = participants.iter().map(|p| p.stats.deaths).sum();
    let damage: u64 = participants.iter().map(|p| p.stats.damage_done as u64).sum();
    // Longest individual time stands in for game duration; teammates do not
    // necessarily finish at the same second.
    let duration = participants
        .iter()
        .map(|p| p.stats.time_played_sec)
        .max()
        .unwrap_or(0);
    let placement = participants.iter().find_map(|p| p.stats.team_placement);
    let win = matches!(placement, Some(1));
    let top_five = placement.is_some_and(|p| p <= 5);

    vec![
        m.metadata.match_id.clone(),
        format_start_time(m.metadata.start_time_ts),
        duration.to_string(),
        placement_field(placement),
        kills.to_string(),
        deaths.to_string(),
        damage.to_string(),
        roster_field(m),
        m.metadata.mode_name.clone(),
        flag_field(win),
        flag_field(top_five),
    ]
}

/// Deduplicated, alphabetically sorted internal names joined with `|`.
/// Sorting keeps the field identical no matter how the source ordered the
/// participants.
pub fn roster_field(m: &Match) -> String {
    let names: BTreeSet<&str> = m
        .participants()
        .iter()
        .map(|p| roster::internal_name_for(&p.gamertag).unwrap_or(UNKNOWN_NAME))
        .collect();
    names.into_iter().collect::<Vec<_>>().join(ROSTER_DELIMITER)
}

/// Distinct tracked members of `team` among the participants. The
/// orchestrator only emits a team row when this is at least two.
pub fn tracked_members(m: &Match, team: Team) -> usize {
    let tags: BTreeSet<&str> = m
        .participants()
        .iter()
        .map(|p| p.gamertag.as_str())
        .collect();
    team.roster()
        .iter()
        .filter(|player| tags.contains(player.gamertag.as_str()))
        .count()
}

pub fn format_start_time(start_time_ts: i64) -> String {
    DateTime::from_timestamp(start_time_ts, 0)
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

fn placement_field(placement: Option<u32>) -> String {
    placement.map(|p| p.to_string()).unwrap_or_default()
}

fn flag_field(flag: bool) -> String {
    if flag { "1" } else { "0" }.to_string()
}
