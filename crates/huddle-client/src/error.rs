use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// 401 from the server, or a protected call made while signed out.
    #[error("{0}")]
    Unauthorized(String),

    /// Any other non-success response; `message` is the server's `error` text.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// A 401-class failure ends the local session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}
