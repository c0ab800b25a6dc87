use std::env;
use std::fs;

use crate::ai::chat::{CompletionOptions, LogPolicy, RowFormat};
use crate::core::ChatError;
use crate::google::{ServiceAccountKey, parse_spreadsheet_id};

#[derive(Clone)]
pub struct AppConfig {
    pub openai_api_hostname: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub max_output_tokens: Option<u32>,
    pub system_message: String,
    pub spreadsheet_id: String,
    pub sheet_range: String,
    pub sheets_api_hostname: String,
    pub service_account: ServiceAccountKey,
    pub log_policy: LogPolicy,
    pub row_format: RowFormat,
}

impl AppConfig {
    /// Read the config from the process environment. Anything
    /// missing or malformed is a `ChatError::Configuration` and the
    /// caller is expected to stop.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChatError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| ChatError::Configuration(format!("Missing env var {}", key)))
        };

        let openai_api_key = required("OPENAI_API_KEY")?;
        let openai_api_hostname =
            var("SHEETCHAT_LLM_HOST").unwrap_or_else(|| "https://api.openai.com".to_string());
        let openai_model =
            var("SHEETCHAT_LLM_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        let max_output_tokens = match var("SHEETCHAT_MAX_OUTPUT_TOKENS") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        ChatError::Configuration(format!(
                            "SHEETCHAT_MAX_OUTPUT_TOKENS must be a positive integer, got {}",
                            raw
                        ))
                    })?,
            ),
            None => None,
        };
        let system_message = var("SHEETCHAT_SYSTEM_MESSAGE")
            .unwrap_or_else(|| "You are a helpful assistant.".to_string());

        let spreadsheet_id = parse_spreadsheet_id(&required("SHEETCHAT_SHEET_URL")?)?;
        let sheet_range = var("SHEETCHAT_SHEET_RANGE").unwrap_or_else(|| "A1".to_string());
        let sheets_api_hostname = var("SHEETCHAT_SHEETS_API_HOST")
            .unwrap_or_else(|| "https://sheets.googleapis.com".to_string());

        let service_account_json = match (
            var("GOOGLE_SERVICE_ACCOUNT_JSON"),
            var("GOOGLE_SERVICE_ACCOUNT_PATH"),
        ) {
            (Some(json), _) => json,
            (None, Some(path)) => fs::read_to_string(&path).map_err(|e| {
                ChatError::Configuration(format!(
                    "Could not read service account key {}: {}",
                    path, e
                ))
            })?,
            (None, None) => {
                return Err(ChatError::Configuration(String::from(
                    "Missing env var GOOGLE_SERVICE_ACCOUNT_JSON or GOOGLE_SERVICE_ACCOUNT_PATH",
                )));
            }
        };
        let service_account = ServiceAccountKey::from_json(&service_account_json)?;

        let log_policy = var("SHEETCHAT_LOG_POLICY")
            .map(|v| v.parse::<LogPolicy>())
            .transpose()?
            .unwrap_or_default();
        let row_format = var("SHEETCHAT_ROW_FORMAT")
            .map(|v| v.parse::<RowFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            openai_api_hostname,
            openai_api_key,
            openai_model,
            max_output_tokens,
            system_message,
            spreadsheet_id,
            sheet_range,
            sheets_api_hostname,
            service_account,
            log_policy,
            row_format,
        })
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            model: self.openai_model.clone(),
            max_output_tokens: self.max_output_tokens,
        }
    }
}
