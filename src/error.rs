use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeMindError {
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    #[error("invalid value for `{key}`: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("failed to read configuration: {0}")]
    ConfigRead(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    #[error("home assistant returned {status} for {path}")]
    HomeAssistant { status: u16, path: String },

    #[error("content generation timed out after {secs}s")]
    GenerationTimeout { secs: u64 },
}

pub type Result<T> = std::result::Result<T, HomeMindError>;
