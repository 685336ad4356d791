use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Database(#[from] sea_orm::DbErr),

  #[error("Telegram error: {0}")]
  Telegram(#[from] teloxide::RequestError),

  #[error("Download error: {0}")]
  Download(#[from] teloxide::DownloadError),

  #[error("Completion failed: {0:#}")]
  Completion(anyhow::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("User not found")]
  UserNotFound,

  #[error("Premium subscription required")]
  NotEntitled,

  #[error("Unrecognized option: {0}")]
  UnknownOption(String),

  #[error("{0}")]
  InvalidArgs(String),
}

impl Error {
  /// Text that is safe to show to a chat user.
  pub fn user_message(&self) -> String {
    match self {
      Error::Database(_)
      | Error::Telegram(_)
      | Error::Download(_)
      | Error::Completion(_)
      | Error::Io(_) => "Something went wrong, please try again later".into(),
      other => other.to_string(),
    }
  }

  /// Failures of an external service rather than of the request itself.
  pub fn is_external(&self) -> bool {
    matches!(
      self,
      Error::Database(_)
        | Error::Telegram(_)
        | Error::Download(_)
        | Error::Completion(_)
        | Error::Io(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
