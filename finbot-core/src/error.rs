use thiserror::Error;

#[derive(Error, Debug)]
pub enum FinbotError {
    #[error("Bot error: {0}")]
    Bot(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    #[error("State error: {0}")]
    State(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A button payload that does not have the `key=value` / `key=id;label` shape expected for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Missing value for key: {0}")]
    MissingValue(String),

    #[error("Missing ';' separator in: {0}")]
    MissingSeparator(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

pub type Result<T> = std::result::Result<T, FinbotError>;
