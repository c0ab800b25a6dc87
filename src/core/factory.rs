use std::sync::Arc;

use crate::ai::chat::{
    Chat, ChatBuilder, CompletionOptions, LogPolicy, PersistenceLogger, RowFormat,
    SharedCompletionGateway, SharedTabularLog,
};
use crate::core::{AppConfig, ChatError};
use crate::google::{SHEETS_SCOPE, ServiceAccountAuth, SheetsLog};
use crate::openai::OpenAiGateway;

/// Everything needed to start a new chat session. Each session gets
/// its own transcript but shares the completion backend and the sheet.
#[derive(Clone)]
pub struct ChatFactory {
    gateway: SharedCompletionGateway,
    sheet_log: SharedTabularLog,
    options: CompletionOptions,
    system_message: String,
    log_policy: LogPolicy,
    row_format: RowFormat,
}

impl ChatFactory {
    pub fn new(
        gateway: SharedCompletionGateway,
        sheet_log: SharedTabularLog,
        options: CompletionOptions,
        system_message: &str,
    ) -> Self {
        Self {
            gateway,
            sheet_log,
            options,
            system_message: system_message.to_string(),
            log_policy: LogPolicy::default(),
            row_format: RowFormat::default(),
        }
    }

    /// Connects to the OpenAI compatible API and the Google Sheet
    /// named in the config. Fails if the service account key can't
    /// be used for signing.
    pub fn from_config(config: &AppConfig) -> Result<Self, ChatError> {
        let gateway = Arc::new(OpenAiGateway::new(
            &config.openai_api_hostname,
            &config.openai_api_key,
        ));
        let auth = ServiceAccountAuth::new(config.service_account.clone(), SHEETS_SCOPE)?;
        let sheet_log = Arc::new(SheetsLog::new(
            &config.sheets_api_hostname,
            &config.spreadsheet_id,
            &config.sheet_range,
            Arc::new(auth),
        ));

        tracing::debug!(
            "Logging chats to spreadsheet {} range {}",
            config.spreadsheet_id,
            config.sheet_range
        );

        Ok(Self::new(
            gateway,
            sheet_log,
            config.completion_options(),
            &config.system_message,
        )
        .with_log_policy(config.log_policy)
        .with_row_format(config.row_format))
    }

    pub fn with_log_policy(mut self, log_policy: LogPolicy) -> Self {
        self.log_policy = log_policy;
        self
    }

    pub fn with_row_format(mut self, row_format: RowFormat) -> Self {
        self.row_format = row_format;
        self
    }

    /// Start a session seeded with the system message. A random
    /// session ID is used when none is given.
    pub fn build(&self, session_id: Option<&str>) -> Result<Chat, ChatError> {
        let logger = PersistenceLogger::new(
            Arc::clone(&self.sheet_log),
            self.log_policy,
            self.row_format,
        );
        let mut builder = ChatBuilder::new(Arc::clone(&self.gateway), self.options.clone())
            .system_message(&self.system_message)
            .logger(logger);
        if let Some(id) = session_id {
            builder = builder.session_id(id);
        }
        builder.build()
    }
}
