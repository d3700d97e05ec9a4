use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DashError {
    #[error("World Bank request failed: {0}")]
    WorldBankHttp(String),

    #[error("World Bank returned status {status}: {message}")]
    WorldBankStatus { status: u16, message: String },

    #[error("failed to decode World Bank response: {0}")]
    WorldBankDecode(String),

    #[error("invalid ISO3 country code: {0}")]
    InvalidIso3(String),

    #[error("invalid year range: {0}")]
    InvalidYearRange(String),

    #[error("unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("unknown country: {0}")]
    UnknownCountry(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config value: {0}")]
    InvalidConfig(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl DashError {
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            DashError::WorldBankHttp(_)
                | DashError::WorldBankStatus { .. }
                | DashError::WorldBankDecode(_)
        )
    }
}
