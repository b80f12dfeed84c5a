use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The author has deleted the source repository for this pull request.")]
    SourceRepositoryDeleted,
    #[error("{command} is not available right now")]
    CommandDisabled { command: &'static str },
    #[error("{command} is already running")]
    CommandBusy { command: &'static str },
    #[error("not found: {url}")]
    NotFound { url: String },
    #[error("Bitbucket returned {status} for {url}{}", message_suffix(.message))]
    Api {
        status: u16,
        url: String,
        message: Option<String>,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    #[error("presenter unavailable: {0}")]
    Presenter(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl Error {
    /// True for failures raised before any remote call was attempted.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::SourceRepositoryDeleted
                | Error::CommandDisabled { .. }
                | Error::CommandBusy { .. }
        )
    }
}
