//! Errors surfaced by the synchronization core.

use thiserror::Error;

use crate::cache::StoreError;
use crate::remote::RemoteError;

/// Failure of a resolution once every applicable fallback has been tried.
#[derive(Debug, Error)]
pub enum SyncError {
  /// Non-positive id. Rejected before the network or cache is touched.
  #[error("Invalid anime ID: {0}")]
  InvalidIdentity(i64),

  #[error("Network error: {0}")]
  RemoteUnavailable(String),

  #[error("{}", describe_status(*code, message))]
  RemoteRejected { code: u16, message: String },

  /// Online, the remote produced nothing usable, and nothing is cached.
  /// A status rejection keeps its own message.
  #[error("{}", describe_not_found(*id, cause.as_ref()))]
  NotFound {
    id: i64,
    #[source]
    cause: Option<RemoteError>,
  },

  #[error("Anime {0} not found in offline cache")]
  NotFoundOffline(i64),

  #[error("Empty response body")]
  EmptyResponse,

  #[error(transparent)]
  Storage(#[from] StoreError),
}

impl SyncError {
  /// HTTP status behind the failure, if the remote answered at all.
  pub fn status_code(&self) -> Option<u16> {
    match self {
      SyncError::RemoteRejected { code, .. } => Some(*code),
      SyncError::NotFound {
        cause: Some(RemoteError::Status { code, .. }),
        ..
      } => Some(*code),
      _ => None,
    }
  }

  /// Whether asking again later could plausibly succeed.
  pub fn is_retryable(&self) -> bool {
    match self {
      SyncError::InvalidIdentity(_) => false,
      SyncError::RemoteRejected { code, .. } => *code == 429 || *code >= 500,
      SyncError::Storage(_) => false,
      _ => true,
    }
  }
}

impl From<RemoteError> for SyncError {
  fn from(err: RemoteError) -> Self {
    match err {
      RemoteError::Transport(reason) | RemoteError::Decode(reason) => {
        SyncError::RemoteUnavailable(reason)
      }
      RemoteError::Status { code, message } => SyncError::RemoteRejected { code, message },
      RemoteError::EmptyBody => SyncError::EmptyResponse,
    }
  }
}

/// Human-readable message for a non-2xx status.
pub fn describe_status(code: u16, message: &str) -> String {
  match code {
    400 => "Bad Request - the anime ID was rejected by the API".to_string(),
    404 => "Anime not found on the remote API".to_string(),
    429 => "Rate limit exceeded. Please try again later.".to_string(),
    _ if message.is_empty() => format!("Request failed with status {}", code),
    _ => format!("Request failed: {} - {}", code, message),
  }
}

fn describe_not_found(id: i64, cause: Option<&RemoteError>) -> String {
  match cause {
    Some(RemoteError::Status { code, message }) => describe_status(*code, message),
    _ => format!("Anime not found with ID: {}", id),
  }
}

/// Reject ids the remote API can never know about.
pub fn validate_id(id: i64) -> Result<i64, SyncError> {
  if id <= 0 {
    return Err(SyncError::InvalidIdentity(id));
  }
  Ok(id)
}
