use std::io::{self, BufRead, Write};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use wz_ledger::aggregator;
use wz_ledger::enemy_stats::{self, LOOKUP_DELAY};
use wz_ledger::roster::Team;
use wz_ledger::sheets::SheetsClient;
use wz_ledger::tracker::TrackerSource;

enum RunMode {
    TeamStats,
    EnemyStats,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let started = Instant::now();

    match prompt_run_mode(&mut input)? {
        RunMode::TeamStats => {
            let team = prompt_team(&mut input)?;
            println!();
            println!("Aggregating results for {}...", team.label());
            let source = TrackerSource::new()?;
            let store = SheetsClient::from_env()?;
            let summary = aggregator::run_for_team(&source, &store, team)?;
            println!(
                "Appended {} player rows and {} team rows across {} matches ({} unavailable)",
                summary.individual_rows,
                summary.team_rows,
                summary.matches_cached,
                summary.fetch_failures
            );
        }
        RunMode::EnemyStats => {
            let match_id = prompt_match_id(&mut input)?;
            let source = TrackerSource::new()?;
            let report = enemy_stats::collect_enemy_kd(&source, &match_id, LOOKUP_DELAY)?;
            enemy_stats::print_report(&match_id, &report);
        }
    }

    println!("Run took {:.1} seconds", started.elapsed().as_secs_f64());
    Ok(())
}

fn prompt_line(input: &mut impl BufRead, prompt: &str) -> Result<String> {
    println!("{prompt}");
    io::stdout().flush().ok();
    let mut line = String::new();
    input.read_line(&mut line).context("failed reading input")?;
    Ok(line.trim().to_string())
}

fn prompt_run_mode(input: &mut impl BufRead) -> Result<RunMode> {
    let choice = prompt_line(
        input,
        "What would you like to do?\n1: Fetch and upload team stats\n2: Pull stats about enemies in a match",
    )?;
    match choice.as_str() {
        "1" => Ok(RunMode::TeamStats),
        "2" => Ok(RunMode::EnemyStats),
        _ => bail!("please pick one of the valid options"),
    }
}

fn prompt_team(input: &mut impl BufRead) -> Result<Team> {
    let choice = prompt_line(
        input,
        "Select a team to pull stats for\n1: Night Owls\n2: The Sweats",
    )?;
    match choice.as_str() {
        "1" => Ok(Team::NightOwls),
        "2" => Ok(Team::Sweats),
        _ => bail!("please pick one of the valid options"),
    }
}

fn prompt_match_id(input: &mut impl BufRead) -> Result<String> {
    let match_id = prompt_line(input, "Enter the match id to pull enemy stats for")?;
    if match_id.is_empty() || !match_id.chars().all(|c| c.is_ascii_digit()) {
        bail!("the match id should be only numbers");
    }
    Ok(match_id)
}
