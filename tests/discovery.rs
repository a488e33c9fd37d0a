use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use wz_ledger::discovery::{MAX_PAGE_CALLS, discover_new_matches};
use wz_ledger::model::Match;
use wz_ledger::roster::{Player, tracked_player};
use wz_ledger::source::{MatchIdPage, MatchSource, ResolvedIdentity};

/// Serves a scripted sequence of pages and counts how often it gets asked.
struct ScriptedSource {
    pages: RefCell<VecDeque<Result<MatchIdPage>>>,
    calls: Cell<usize>,
}

impl ScriptedSource {
    fn new(pages: Vec<Result<MatchIdPage>>) -> Self {
        Self {
            pages: RefCell::new(pages.into_iter().collect()),
            calls: Cell::new(0),
        }
    }
}

impl MatchSource for ScriptedSource {
    fn match_id_page(&self, _player: &Player, _page_token: Option<&str>) -> Result<MatchIdPage> {
        self.calls.set(self.calls.get() + 1);
        self.pages
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no more scripted pages")))
    }

    fn fetch_match(&self, _match_id: &str, _requesting: Option<&Player>) -> Option<Match> {
        None
    }

    fn resolve_identity(&self, _gamertag: &str) -> Option<ResolvedIdentity> {
        None
    }

    fn recent_kd_ratio(&self, _player: &Player) -> Option<f64> {
        None
    }
}

fn page(ids: &[&str], next_token: Option<&str>) -> Result<MatchIdPage> {
    Ok(MatchIdPage {
        ids: ids.iter().map(|id| id.to_string()).collect(),
        next_token: next_token.map(|t| t.to_string()),
    })
}

fn adam() -> Player {
    tracked_player("Adam").expect("roster player")
}

#[test]
fn checkpoint_mid_page_stops_without_further_calls() {
    let source = ScriptedSource::new(vec![
        page(&["103", "102", "101", "100", "99"], Some("t1")),
        page(&["98", "97"], None),
    ]);
    let found = discover_new_matches(&source, &adam(), Some("100"));
    assert_eq!(found, vec!["103", "102", "101"]);
    assert_eq!(source.calls.get(), 1);
}

#[test]
fn checkpoint_on_first_id_discovers_nothing() {
    let source = ScriptedSource::new(vec![page(&["55", "54", "53"], Some("t1"))]);
    let found = discover_new_matches(&source, &adam(), Some("55"));
    assert!(found.is_empty());
    assert_eq!(source.calls.get(), 1);
}

#[test]
fn no_checkpoint_collects_until_pages_run_out() {
    let source = ScriptedSource::new(vec![
        page(&["20", "19", "18"], Some("t1")),
        page(&["17", "16"], None),
    ]);
    let found = discover_new_matches(&source, &adam(), None);
    assert_eq!(found, vec!["20", "19", "18", "17", "16"]);
    assert_eq!(source.calls.get(), 2);
}

#[test]
fn page_budget_caps_the_walk() {
    let pages = (0..10)
        .map(|i| page(&[&format!("{}", 100 - i)], Some("more")))
        .collect();
    let source = ScriptedSource::new(pages);
    let found = discover_new_matches(&source, &adam(), None);
    assert_eq!(source.calls.get(), MAX_PAGE_CALLS);
    assert_eq!(found.len(), MAX_PAGE_CALLS);
    assert_eq!(found.first().map(String::as_str), Some("100"));
}

#[test]
fn failed_page_degrades_to_partial_results() {
    let source = ScriptedSource::new(vec![
        page(&["31", "30"], Some("t1")),
        Err(anyhow!("rate limited")),
        page(&["29"], None),
    ]);
    let found = discover_new_matches(&source, &adam(), None);
    assert_eq!(found, vec!["31", "30"]);
    assert_eq!(source.calls.get(), 2);
}
