use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("malformed {entity} record: {reason}")]
    Malformed { entity: &'static str, reason: String },
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

impl GatewayError {
    pub(crate) fn malformed(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            entity,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment content is empty")]
    EmptyContent,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
