use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{Result, bail};

use wz_ledger::aggregator::run_for_team;
use wz_ledger::model::{Match, MatchMetadata, Participant, PlayerMatchStats};
use wz_ledger::roster::{Player, Team};
use wz_ledger::sheets::SheetStore;
use wz_ledger::source::{MatchIdPage, MatchSource, ResolvedIdentity};

fn lobby(match_id: &str, start_time_ts: i64, members: &[(&str, u32)]) -> Match {
    let participants = members
        .iter()
        .map(|(gamertag, placement)| Participant {
            gamertag: gamertag.to_string(),
            stats: PlayerMatchStats {
                kills: 2,
                deaths: 1,
                damage_done: 800,
                time_played_sec: 1200,
                team_placement: Some(*placement),
                ..PlayerMatchStats::default()
            },
        })
        .collect();
    Match::new(
        MatchMetadata {
            match_id: match_id.to_string(),
            mode_name: "Battle Royale Quads".to_string(),
            start_time_ts,
            player_count: members.len() as u32,
            team_count: 40,
        },
        participants,
    )
}

/// One scripted history page per player plus a fixed match table.
struct TeamSource {
    pages: HashMap<String, Vec<String>>,
    matches: HashMap<String, Match>,
    fetch_counts: RefCell<HashMap<String, usize>>,
}

impl TeamSource {
    fn new(pages: &[(&str, &[&str])], matches: Vec<Match>) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(tag, ids)| {
                    (
                        tag.to_string(),
                        ids.iter().map(|id| id.to_string()).collect(),
                    )
                })
                .collect(),
            matches: matches
                .into_iter()
                .map(|m| (m.metadata.match_id.clone(), m))
                .collect(),
            fetch_counts: RefCell::new(HashMap::new()),
        }
    }

    fn fetches_for(&self, match_id: &str) -> usize {
        self.fetch_counts
            .borrow()
            .get(match_id)
            .copied()
            .unwrap_or(0)
    }
}

impl MatchSource for TeamSource {
    fn match_id_page(&self, player: &Player, _page_token: Option<&str>) -> Result<MatchIdPage> {
        Ok(MatchIdPage {
            ids: self.pages.get(&player.gamertag).cloned().unwrap_or_default(),
            next_token: None,
        })
    }

    fn fetch_match(&self, match_id: &str, requesting: Option<&Player>) -> Option<Match> {
        assert!(requesting.is_some(), "team runs fetch the team view");
        *self
            .fetch_counts
            .borrow_mut()
            .entry(match_id.to_string())
            .or_insert(0) += 1;
        self.matches.get(match_id).cloned()
    }

    fn resolve_identity(&self, _gamertag: &str) -> Option<ResolvedIdentity> {
        None
    }

    fn recent_kd_ratio(&self, _player: &Player) -> Option<f64> {
        None
    }
}

#[derive(Default)]
struct RecordingStore {
    checkpoints: HashMap<String, String>,
    appended: RefCell<Vec<(String, Vec<Vec<String>>)>>,
    fail_appends: bool,
}

impl SheetStore for RecordingStore {
    fn last_checkpoint(&self, player: &Player, _team: Team) -> Result<Option<String>> {
        Ok(self.checkpoints.get(&player.name).cloned())
    }

    fn append_rows(&self, _team: Team, sheet: &str, rows: &[Vec<String>]) -> Result<()> {
        if self.fail_appends {
            bail!("quota exceeded");
        }
        self.appended
            .borrow_mut()
            .push((sheet.to_string(), rows.to_vec()));
        Ok(())
    }
}

fn scripted_run() -> (TeamSource, RecordingStore) {
    // Shared lobbies: M1 and M2 have two tracked members, M3 only one.
    // MX never resolves (a deleted or malformed match).
    let source = TeamSource::new(
        &[
            ("AdotRates", &["M2", "MX", "M3", "M1"]),
            ("DevTakesPoint", &["M2", "M1"]),
            ("mklutch", &[]),
            ("PistolPetey", &[]),
        ],
        vec![
            lobby("M1", 1_000, &[("AdotRates", 3), ("DevTakesPoint", 3)]),
            lobby("M2", 3_000, &[("AdotRates", 1), ("DevTakesPoint", 1)]),
            lobby("M3", 2_000, &[("AdotRates", 2), ("SomeStranger", 2)]),
        ],
    );
    (source, RecordingStore::default())
}

#[test]
fn run_streams_player_rows_then_one_team_batch() {
    let (source, store) = scripted_run();
    let summary = run_for_team(&source, &store, Team::NightOwls).expect("run should succeed");

    assert_eq!(summary.players_processed, 4);
    assert_eq!(summary.individual_rows, 5);
    assert_eq!(summary.team_rows, 2);
    assert_eq!(summary.matches_cached, 3);
    assert_eq!(summary.fetch_failures, 1);

    let appended = store.appended.borrow();
    let sheets: Vec<&str> = appended.iter().map(|(sheet, _)| sheet.as_str()).collect();
    // Players with nothing new make no append call at all.
    assert_eq!(sheets, vec!["Adam", "Devin", "Overall"]);

    // Per-player batches grow oldest first.
    let adam_ids: Vec<&str> = appended[0].1.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(adam_ids, vec!["M1", "M3", "M2"]);

    // The team batch covers only matches with two tracked members, by start
    // time, regardless of which player's discovery fetched them.
    let team_ids: Vec<&str> = appended[2].1.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(team_ids, vec!["M1", "M2"]);
}

#[test]
fn overlapping_histories_fetch_each_match_once() {
    let (source, store) = scripted_run();
    run_for_team(&source, &store, Team::NightOwls).expect("run should succeed");

    assert_eq!(source.fetches_for("M1"), 1);
    assert_eq!(source.fetches_for("M2"), 1);
    assert_eq!(source.fetches_for("M3"), 1);
    assert_eq!(source.fetches_for("MX"), 1);
}

#[test]
fn checkpoint_bounds_what_gets_appended() {
    let (source, mut store) = scripted_run();
    store.checkpoints.insert("Adam".to_string(), "M3".to_string());

    let summary = run_for_team(&source, &store, Team::NightOwls).expect("run should succeed");
    // Adam stops at M3, so only M2 (and the dead MX) are ahead of the
    // checkpoint; Devin still contributes both of his matches.
    assert_eq!(summary.individual_rows, 3);

    let appended = store.appended.borrow();
    let adam_ids: Vec<&str> = appended[0].1.iter().map(|row| row[0].as_str()).collect();
    assert_eq!(adam_ids, vec!["M2"]);
}

#[test]
fn append_failure_aborts_the_run() {
    let (source, mut store) = scripted_run();
    store.fail_appends = true;
    assert!(run_for_team(&source, &store, Team::NightOwls).is_err());
}
