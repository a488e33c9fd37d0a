use std::thread;
use std::time::Duration;

use anyhow::{Result, bail};
use tracing::warn;

use crate::roster::Player;
use crate::source::MatchSource;

/// Pause between per-participant lookups. The tracker rate-limits and will
/// block clients that hammer the search endpoint.
pub const LOOKUP_DELAY: Duration = Duration::from_secs(3);

/// Everything one enemy-stats pass produces. Returned whole so the collector
/// stays reentrant; nothing accumulates outside this struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnemyKdReport {
    pub total_players: usize,
    pub resolved_players: usize,
    /// Rolling K/D of every resolved participant, in participant order.
    pub player_kd: Vec<f64>,
    /// Mean K/D per placement slot (non-empty slots only, in slot order),
    /// rounded to 2 decimals.
    pub team_kd: Vec<f64>,
    /// Placement slots the lobby had, per the match metadata.
    pub expected_teams: usize,
}

/// Resolves every participant of `match_id` and collects their rolling K/D,
/// bucketed by final placement. Identity and ratio lookups fail open (the
/// participant is skipped and only the counters show it); an unavailable
/// match yields an empty report with no lookups at all.
pub fn collect_enemy_kd(
    source: &dyn MatchSource,
    match_id: &str,
    lookup_delay: Duration,
) -> Result<EnemyKdReport> {
    let Some(m) = source.fetch_match(match_id, None) else {
        warn!(match_id, "match unavailable, nothing to aggregate");
        return Ok(EnemyKdReport::default());
    };

    let slots = m.metadata.team_count as usize;
    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); slots];
    let mut report = EnemyKdReport {
        expected_teams: slots,
        ..EnemyKdReport::default()
    };

    for participant in m.participants() {
        thread::sleep(lookup_delay);
        report.total_players += 1;

        let Some(placement) = participant.stats.team_placement else {
            bail!(
                "participant {} in match {match_id} has no team placement",
                participant.gamertag
            );
        };
        if placement == 0 || placement as usize > slots {
            bail!(
                "participant {} in match {match_id} has out-of-range placement {placement}",
                participant.gamertag
            );
        }

        let Some(identity) = source.resolve_identity(&participant.gamertag) else {
            warn!(gamertag = %participant.gamertag, "identity lookup failed, skipping");
            continue;
        };
        let lookup = Player {
            name: String::new(),
            gamertag: participant.gamertag.clone(),
            activision_id: identity.activision_id,
            platform: identity.platform,
        };
        let Some(kd) = source.recent_kd_ratio(&lookup) else {
            warn!(gamertag = %participant.gamertag, "recent k/d unavailable, skipping");
            continue;
        };

        report.resolved_players += 1;
        report.player_kd.push(kd);
        buckets[placement as usize - 1].push(kd);
    }

    for bucket in &buckets {
        if bucket.is_empty() {
            continue;
        }
        report.team_kd.push(round2(mean(bucket)));
    }

    Ok(report)
}

pub fn print_report(match_id: &str, report: &EnemyKdReport) {
    if report.player_kd.is_empty() || report.team_kd.is_empty() {
        println!("No enemy K/D data available for match {match_id}");
        return;
    }

    let min_kd = report.player_kd.iter().copied().fold(f64::INFINITY, f64::min);
    let max_kd = report
        .player_kd
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let avg_kd = round2(mean(&report.player_kd));
    let spread = round4(pstdev(&report.player_kd));
    let quartiles = quantiles_inclusive(&report.player_kd);
    let team_avg = round2(mean(&report.team_kd));

    println!();
    println!("Match {match_id} player stats");
    println!(
        "There is data for {}/{} players",
        report.resolved_players, report.total_players
    );
    println!("The average K/D for all players is {avg_kd} and the standard deviation is {spread}");
    println!("The lowest K/D is {min_kd}");
    println!("25% percentile: {}", quartiles[0]);
    println!("50% percentile: {}", quartiles[1]);
    println!("75% percentile: {}", quartiles[2]);
    println!("The best K/D is {max_kd}");
    println!();
    println!(
        "There is data for {} teams (expected {} teams)",
        report.team_kd.len(),
        report.expected_teams
    );
    println!("The average K/D of all teams is {team_avg}");
    for (idx, team_kd) in report.team_kd.iter().take(15).enumerate() {
        println!("Team #{}'s K/D is {team_kd}", idx + 1);
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (the lobby is the whole population, not a
/// sample of one).
fn pstdev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Quartile cut points with the inclusive method: the data is treated as the
/// full population and cut points interpolate between the order statistics.
fn quantiles_inclusive(values: &[f64]) -> [f64; 3] {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    match sorted.len() {
        0 => return [0.0; 3],
        1 => return [sorted[0]; 3],
        _ => {}
    }
    let m = sorted.len() - 1;
    let mut out = [0.0; 3];
    for (slot, i) in (1..=3usize).enumerate() {
        let j = i * m / 4;
        let delta = i * m - j * 4;
        out[slot] = (sorted[j] * (4 - delta) as f64 + sorted[j + 1] * delta as f64) / 4.0;
    }
    out
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
