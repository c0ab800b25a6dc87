//! Google Sheets API client for appending rows to a spreadsheet.
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::oauth::SharedAccessTokenProvider;
use crate::ai::chat::TabularLog;
use crate::core::ChatError;

static SHEET_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").unwrap());
static SHEET_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{10,}$").unwrap());

/// Accepts either a full sheet URL like
/// `https://docs.google.com/spreadsheets/d/<id>/edit#gid=0` or the
/// bare spreadsheet ID.
pub fn parse_spreadsheet_id(url_or_id: &str) -> Result<String, ChatError> {
    let url_or_id = url_or_id.trim();
    if let Some(caps) = SHEET_URL_RE.captures(url_or_id) {
        return Ok(caps[1].to_string());
    }
    if SHEET_ID_RE.is_match(url_or_id) {
        return Ok(url_or_id.to_string());
    }
    Err(ChatError::Configuration(format!(
        "Not a Google Sheets URL or spreadsheet ID: {}",
        url_or_id
    )))
}

#[derive(Debug, Deserialize)]
pub struct UpdatesResponse {
    #[serde(rename = "updatedRange")]
    pub updated_range: Option<String>,
    #[serde(rename = "updatedRows")]
    pub updated_rows: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AppendResponse {
    #[serde(rename = "spreadsheetId")]
    pub spreadsheet_id: String,
    pub updates: Option<UpdatesResponse>,
}

/// Append rows after the last row of the table found at `range`.
/// Values are written as-is (`RAW`) so user text starting with `=`
/// is never evaluated as a formula.
pub async fn append_values(
    api_hostname: &str,
    access_token: &str,
    spreadsheet_id: &str,
    range: &str,
    rows: &[Vec<String>],
) -> Result<AppendResponse, anyhow::Error> {
    let url = format!(
        "{}/v4/spreadsheets/{}/values/{}:append?valueInputOption=RAW&insertDataOption=INSERT_ROWS",
        api_hostname.trim_end_matches("/"),
        spreadsheet_id,
        urlencoding::encode(range)
    );
    let res = Client::new()
        .post(&url)
        .bearer_auth(access_token)
        .timeout(Duration::from_secs(30))
        .json(&json!({
            "majorDimension": "ROWS",
            "values": rows,
        }))
        .send()
        .await?;
    let status = res.status();
    let text = res.text().await.unwrap_or_default();
    if !status.is_success() {
        anyhow::bail!("Append failed: {} ({})", status, text);
    }
    let resp: AppendResponse = serde_json::from_str(&text)?;
    Ok(resp)
}

/// The sheet every chat turn is mirrored to.
pub struct SheetsLog {
    api_hostname: String,
    spreadsheet_id: String,
    range: String,
    tokens: SharedAccessTokenProvider,
}

impl SheetsLog {
    pub fn new(
        api_hostname: &str,
        spreadsheet_id: &str,
        range: &str,
        tokens: SharedAccessTokenProvider,
    ) -> Self {
        Self {
            api_hostname: api_hostname.to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
            tokens,
        }
    }
}

#[async_trait]
impl TabularLog for SheetsLog {
    async fn append_rows(&self, rows: Vec<Vec<String>>) -> Result<(), ChatError> {
        let access_token = self.tokens.access_token().await?;
        let resp = append_values(
            &self.api_hostname,
            &access_token,
            &self.spreadsheet_id,
            &self.range,
            &rows,
        )
        .await
        .map_err(|e| ChatError::Logging(e.to_string()))?;

        if let Some(updates) = resp.updates {
            tracing::debug!(
                "Appended {} row(s) to {}",
                updates.updated_rows.unwrap_or_default(),
                updates.updated_range.unwrap_or_default()
            );
        }
        Ok(())
    }
}
