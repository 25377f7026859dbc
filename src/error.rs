use thiserror::Error;

#[derive(Error, Debug)]
pub enum PimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("osascript not found. pim only runs on macOS.")]
    OsascriptMissing,

    #[error("AppleScript failed: {0}")]
    Script(String),

    #[error("Not authorized to control {0}. Allow it under System Settings > Privacy & Security > Automation.")]
    Permission(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Could not understand date: {0}")]
    InvalidDate(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PimError>;
