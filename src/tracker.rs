use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::http_client::http_client;
use crate::model::{Match, MatchMetadata, Participant, PlayerMatchStats};
use crate::roster::{Platform, Player};
use crate::source::{MatchIdPage, MatchSource, ResolvedIdentity};

const MATCH_LIST_URL: &str = "https://api.tracker.gg/api/v1/warzone/matches/atvi";
const MATCH_URL: &str = "https://api.tracker.gg/api/v1/warzone/matches";
const SEARCH_URL: &str = "https://api.tracker.gg/api/v2/warzone/standard/search";
const PROFILE_URL: &str = "https://cod.tracker.gg/warzone/profile";

/// Modes that produce rows. Team-view fetches reject anything else so lobby
/// warmups and one-off playlists never reach the sheets.
const CORE_MODES: &[&str] = &[
    "Battle Royale Solos",
    "Battle Royale Duos",
    "Battle Royale Trios",
    "Battle Royale Quads",
];

pub struct TrackerSource {
    client: &'static Client,
}

impl TrackerSource {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
        })
    }

    fn get_text(&self, url: Url) -> Result<String> {
        let resp = self.client.get(url).send().context("request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            anyhow::bail!("http {status}");
        }
        Ok(body)
    }
}

impl MatchSource for TrackerSource {
    fn match_id_page(&self, player: &Player, page_token: Option<&str>) -> Result<MatchIdPage> {
        let url = match_list_url(player, page_token)?;
        let body = self
            .get_text(url)
            .with_context(|| format!("match list for {}", player.gamertag))?;
        parse_match_id_page(&body)
    }

    fn fetch_match(&self, match_id: &str, requesting: Option<&Player>) -> Option<Match> {
        debug!(match_id, "fetching match");
        let url = match match_url(match_id, requesting) {
            Ok(url) => url,
            Err(err) => {
                warn!(match_id, error = %err, "bad match url");
                return None;
            }
        };
        let body = match self.get_text(url) {
            Ok(body) => body,
            Err(err) => {
                warn!(match_id, error = %err, "match fetch failed");
                return None;
            }
        };
        let full = match parse_match_response(&body) {
            Ok(full) => full,
            Err(err) => {
                warn!(match_id, error = %err, "match payload rejected");
                return None;
            }
        };
        match requesting {
            Some(player) => {
                let view = team_view(full, player);
                if view.is_none() {
                    debug!(match_id, gamertag = %player.gamertag, "no team view for match");
                }
                view
            }
            None => Some(full),
        }
    }

    fn resolve_identity(&self, gamertag: &str) -> Option<ResolvedIdentity> {
        debug!(gamertag, "resolving identity");
        for platform in [Platform::Atvi, Platform::Battlenet] {
            let url = match search_url(gamertag, platform) {
                Ok(url) => url,
                Err(err) => {
                    warn!(gamertag, error = %err, "bad search url");
                    return None;
                }
            };
            let body = match self.get_text(url) {
                Ok(body) => body,
                Err(err) => {
                    warn!(gamertag, error = %err, "identity search failed");
                    return None;
                }
            };
            let candidates = match parse_search_candidates(&body) {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!(gamertag, error = %err, "search payload rejected");
                    return None;
                }
            };
            if candidates.is_empty() {
                continue;
            }
            return select_identity(gamertag, &candidates).map(|activision_id| ResolvedIdentity {
                activision_id,
                platform,
            });
        }
        None
    }

    fn recent_kd_ratio(&self, player: &Player) -> Option<f64> {
        debug!(gamertag = %player.gamertag, "fetching recent k/d");
        let url = match profile_url(player) {
            Ok(url) => url,
            Err(err) => {
                warn!(gamertag = %player.gamertag, error = %err, "bad profile url");
                return None;
            }
        };
        let body = match self.get_text(url) {
            Ok(body) => body,
            Err(err) => {
                warn!(gamertag = %player.gamertag, error = %err, "profile fetch failed");
                return None;
            }
        };
        parse_recent_kd_html(&body)
    }
}

fn match_list_url(player: &Player, page_token: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(MATCH_LIST_URL).context("invalid match list url")?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("match list url cannot be a base"))?
        .push(&player.full_handle());
    url.query_pairs_mut()
        .append_pair("type", "wz")
        .append_pair("next", page_token.unwrap_or("null"));
    Ok(url)
}

fn match_url(match_id: &str, requesting: Option<&Player>) -> Result<Url> {
    let mut url = Url::parse(MATCH_URL).context("invalid match url")?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("match url cannot be a base"))?
        .push(match_id);
    if let Some(player) = requesting {
        url.query_pairs_mut()
            .append_pair("handle", &player.gamertag);
    }
    Ok(url)
}

fn search_url(gamertag: &str, platform: Platform) -> Result<Url> {
    let mut url = Url::parse(SEARCH_URL).context("invalid search url")?;
    url.query_pairs_mut()
        .append_pair("platform", platform.as_str())
        .append_pair("query", gamertag)
        .append_pair("autocomplete", "true");
    Ok(url)
}

fn profile_url(player: &Player) -> Result<Url> {
    let mut url = Url::parse(PROFILE_URL).context("invalid profile url")?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("profile url cannot be a base"))?
        .push(player.platform.as_str())
        .push(&player.full_handle());
    url.set_query(Some("overview"));
    Ok(url)
}

// ---- match id pages ----

#[derive(Debug, Deserialize)]
struct MatchListEnvelope {
    data: MatchListData,
}

#[derive(Debug, Deserialize)]
struct MatchListData {
    #[serde(default)]
    matches: Vec<MatchStub>,
    #[serde(default)]
    metadata: PageMetadata,
}

#[derive(Debug, Deserialize, Default)]
struct PageMetadata {
    #[serde(default)]
    next: Value,
}

#[derive(Debug, Deserialize)]
struct MatchStub {
    #[serde(default)]
    attributes: StubAttributes,
}

#[derive(Debug, Deserialize, Default)]
struct StubAttributes {
    #[serde(default)]
    id: Value,
}

pub fn parse_match_id_page(raw: &str) -> Result<MatchIdPage> {
    let envelope: MatchListEnvelope =
        serde_json::from_str(raw).context("invalid match list json")?;
    let ids = envelope
        .data
        .matches
        .iter()
        .filter_map(|stub| value_to_token(&stub.attributes.id))
        .collect();
    let next_token = value_to_token(&envelope.data.metadata.next);
    Ok(MatchIdPage { ids, next_token })
}

// ---- full match payloads ----

#[derive(Debug, Deserialize)]
struct MatchEnvelope {
    data: RawMatch,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    #[serde(default)]
    attributes: RawMatchAttributes,
    metadata: RawMatchMetadata,
    #[serde(default)]
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize, Default)]
struct RawMatchAttributes {
    #[serde(default)]
    id: Value,
}

#[derive(Debug, Deserialize)]
struct RawMatchMetadata {
    #[serde(rename = "modeName", default)]
    mode_name: String,
    #[serde(default)]
    timestamp: i64,
    #[serde(rename = "playerCount", default)]
    player_count: u32,
    #[serde(rename = "teamCount", default)]
    team_count: u32,
}

#[derive(Debug, Deserialize, Default)]
struct RawSegment {
    #[serde(default)]
    metadata: RawSegmentMetadata,
    #[serde(default)]
    stats: RawSegmentStats,
}

#[derive(Debug, Deserialize, Default)]
struct RawSegmentMetadata {
    #[serde(rename = "platformUserHandle", default)]
    platform_user_handle: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawSegmentStats {
    #[serde(default)]
    kills: StatValue,
    #[serde(default)]
    deaths: StatValue,
    #[serde(rename = "gulagKills", default)]
    gulag_kills: StatValue,
    #[serde(rename = "gulagDeaths", default)]
    gulag_deaths: StatValue,
    #[serde(rename = "damageDone", default)]
    damage_done: StatValue,
    #[serde(rename = "timePlayed", default)]
    time_played: StatValue,
    #[serde(rename = "teamPlacement", default)]
    team_placement: StatValue,
}

#[derive(Debug, Deserialize, Default)]
struct StatValue {
    #[serde(default)]
    value: Option<f64>,
}

pub fn parse_match_response(raw: &str) -> Result<Match> {
    let envelope: MatchEnvelope = serde_json::from_str(raw).context("invalid match json")?;
    build_match(envelope.data)
}

fn build_match(raw: RawMatch) -> Result<Match> {
    // The id lives under `attributes`, everything else under `metadata`.
    let match_id = value_to_token(&raw.attributes.id).context("match payload missing id")?;
    let metadata = MatchMetadata {
        match_id,
        mode_name: raw.metadata.mode_name,
        start_time_ts: raw.metadata.timestamp,
        player_count: raw.metadata.player_count,
        team_count: raw.metadata.team_count,
    };
    let participants = raw
        .segments
        .into_iter()
        .filter_map(build_participant)
        .collect();
    Ok(Match::new(metadata, participants))
}

fn build_participant(segment: RawSegment) -> Option<Participant> {
    // Segments without a handle are spectator/summary entries.
    let gamertag = segment.metadata.platform_user_handle?;
    let stats = PlayerMatchStats {
        kills: stat_u32(&segment.stats.kills),
        deaths: stat_u32(&segment.stats.deaths),
        gulag_kills: stat_u32(&segment.stats.gulag_kills),
        gulag_deaths: stat_u32(&segment.stats.gulag_deaths),
        damage_done: stat_u32(&segment.stats.damage_done),
        time_played_sec: stat_u32(&segment.stats.time_played),
        team_placement: segment.stats.team_placement.value.map(|v| v as u32),
    };
    Some(Participant { gamertag, stats })
}

fn stat_u32(stat: &StatValue) -> u32 {
    stat.value.unwrap_or(0.0).max(0.0) as u32
}

/// Reduces a full lobby to the requesting player's team: everyone who shares
/// the requester's placement. `None` when the mode is out of scope or the
/// requester is missing from the payload.
fn team_view(full: Match, requesting: &Player) -> Option<Match> {
    if !CORE_MODES.contains(&full.metadata.mode_name.as_str()) {
        debug!(mode = %full.metadata.mode_name, "skipping non-core mode");
        return None;
    }
    let placement = full.participant(&requesting.gamertag)?.stats.team_placement;
    let allies: Vec<Participant> = full
        .participants()
        .iter()
        .filter(|p| p.stats.team_placement == placement)
        .cloned()
        .collect();
    Some(Match::new(full.metadata.clone(), allies))
}

// ---- identity search ----

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    data: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "platformUserIdentifier", default)]
    platform_user_identifier: Option<String>,
}

pub fn parse_search_candidates(raw: &str) -> Result<Vec<String>> {
    let envelope: SearchEnvelope = serde_json::from_str(raw).context("invalid search json")?;
    Ok(envelope
        .data
        .into_iter()
        .filter_map(|result| result.platform_user_identifier)
        .collect())
}

/// Picks the activision id for `tag` out of the search candidates.
/// Precedence: a lone candidate is trusted as-is, then a case-sensitive
/// handle match, then a unique case-insensitive one. An empty id means the
/// handle exists but carries no discriminator.
pub fn select_identity(tag: &str, candidates: &[String]) -> Option<String> {
    if tag.is_empty() || candidates.is_empty() {
        return None;
    }
    if let [only] = candidates {
        return Some(discriminator(only));
    }
    if let Some(exact) = candidates.iter().find(|c| handle(c) == tag) {
        return Some(discriminator(exact));
    }
    let lowered = tag.to_lowercase();
    let mut loose = candidates
        .iter()
        .filter(|c| handle(c).to_lowercase() == lowered);
    match (loose.next(), loose.next()) {
        (Some(only), None) => Some(discriminator(only)),
        _ => None,
    }
}

fn handle(candidate: &str) -> &str {
    candidate.split_once('#').map_or(candidate, |(h, _)| h)
}

fn discriminator(candidate: &str) -> String {
    candidate
        .split_once('#')
        .map(|(_, id)| id.to_string())
        .unwrap_or_default()
}

// ---- profile page ----

/// Lifts the rolling K/D out of the profile overview page: the stat block
/// headed "Last 7 Days" carries `div.numbers` entries pairing a name span
/// with a value span.
pub fn parse_recent_kd_html(html: &str) -> Option<f64> {
    let document = Html::parse_document(html);
    let any = Selector::parse("*").ok()?;
    let numbers = Selector::parse("div.numbers").ok()?;
    let name = Selector::parse("span.name").ok()?;
    let value = Selector::parse("span.value").ok()?;

    let header = document
        .select(&any)
        .find(|el| own_text_matches(el, "Last 7 Days"))?;

    // The numbers live in an enclosing section a level or two above the
    // header text, so climb a bounded number of ancestors.
    let mut scope = header;
    for _ in 0..3 {
        scope = scope.parent().and_then(ElementRef::wrap)?;
        if let Some(kd) = kd_from_scope(&scope, &numbers, &name, &value) {
            return Some(kd);
        }
    }
    None
}

fn own_text_matches(el: &ElementRef, needle: &str) -> bool {
    el.children()
        .filter_map(|node| node.value().as_text())
        .any(|text| text.trim() == needle)
}

fn kd_from_scope(
    scope: &ElementRef,
    numbers: &Selector,
    name: &Selector,
    value: &Selector,
) -> Option<f64> {
    for block in scope.select(numbers) {
        let label = block
            .select(name)
            .next()
            .map(|el| el.text().collect::<String>());
        if label.as_deref().map(str::trim) != Some("K/D Ratio") {
            continue;
        }
        let text = block.select(value).next()?.text().collect::<String>();
        return text.trim().parse::<f64>().ok();
    }
    None
}

fn value_to_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "null" {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
