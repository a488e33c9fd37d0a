use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::http_client::http_client;
use crate::roster::{Player, Team};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Tab that collects the per-team rows; each player gets a tab named after
/// their internal name.
pub const OVERALL_SHEET: &str = "Overall";

/// Checkpoint reads and whole-batch row appends. Appends are at-least-once:
/// nothing rolls back a partially persisted run, the next run just resumes
/// from whatever checkpoint landed.
pub trait SheetStore {
    fn last_checkpoint(&self, player: &Player, team: Team) -> Result<Option<String>>;

    fn append_rows(&self, team: Team, sheet: &str, rows: &[Vec<String>]) -> Result<()>;
}

pub struct SheetsClient {
    client: &'static Client,
    access_token: String,
}

impl SheetsClient {
    pub fn from_env() -> Result<Self> {
        let access_token =
            std::env::var("SHEETS_ACCESS_TOKEN").context("SHEETS_ACCESS_TOKEN is not set")?;
        Ok(Self {
            client: http_client()?,
            access_token,
        })
    }

    fn read_values(&self, team: Team, range: &str) -> Result<Vec<Vec<String>>> {
        let url = format!("{SHEETS_BASE_URL}/{}/values/{range}", team.sheet_id());
        let resp = self
            .client
            .get(url.as_str())
            .bearer_auth(&self.access_token)
            .send()
            .context("sheet read failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading sheet response")?;
        if !status.is_success() {
            anyhow::bail!("sheet read http {status}: {body}");
        }
        let value_range: ValueRange =
            serde_json::from_str(&body).context("invalid sheet values json")?;
        Ok(value_range.values)
    }
}

impl SheetStore for SheetsClient {
    fn last_checkpoint(&self, player: &Player, team: Team) -> Result<Option<String>> {
        let values = self
            .read_values(team, &player.name)
            .with_context(|| format!("reading sheet for {}", player.name))?;
        Ok(checkpoint_from_values(&values))
    }

    fn append_rows(&self, team: Team, sheet: &str, rows: &[Vec<String>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let url = format!("{SHEETS_BASE_URL}/{}/values/{sheet}:append", team.sheet_id());
        let resp = self
            .client
            .post(url.as_str())
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&AppendBody { values: rows })
            .send()
            .with_context(|| format!("appending to sheet {sheet}"))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            anyhow::bail!("sheet append http {status}: {body}");
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct AppendBody<'a> {
    values: &'a [Vec<String>],
}

/// Last row's first column, or `None` when the sheet has fewer than two rows
/// (header-only or empty), which means full-lookback discovery.
pub fn checkpoint_from_values(values: &[Vec<String>]) -> Option<String> {
    if values.len() < 2 {
        return None;
    }
    values.last()?.first().cloned()
}
