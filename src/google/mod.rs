mod oauth;
pub use oauth::{
    AccessTokenProvider, SHEETS_SCOPE, ServiceAccountAuth, ServiceAccountKey,
    SharedAccessTokenProvider,
};
mod sheets;
pub use sheets::{SheetsLog, append_values, parse_spreadsheet_id};
