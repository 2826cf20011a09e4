//! Error types for the Jira bridge.

use thiserror::Error;

/// Message shown when provider settings cannot produce a usable client.
pub const URI_IS_INCORRECT: &str = "The JIRA URL format is incorrect.";
/// Pre-flight attachment validation messages.
pub const ISSUE_KEY_NOT_SPECIFIED: &str = "No issue key is specified.";
pub const FILE_NAME_NOT_SPECIFIED: &str = "No file name is specified.";
pub const INCORRECT_FILE_PATH: &str = "Incorrect file path.";
/// Appended to remote failures that look like an HTTP→HTTPS redirect.
pub const INCORRECT_PROTOCOL_HINT: &str =
  "\nPerhaps, you specified the HTTP protocol in the JIRA URL instead of HTTPS.";
/// Substring of a remote error message that indicates such a redirect.
pub const INCORRECT_PROTOCOL_MARKER: &str = "301";

#[derive(Error, Debug)]
pub enum Error {
  /// Missing or invalid connection settings.
  #[error("{0}")]
  Config(String),

  /// Project, issue type, or user absent on the remote side.
  #[error("{0}")]
  NotFound(String),

  /// Network, auth, or server failure; carries the remote message.
  #[error("{0}")]
  Remote(String),

  /// Caller-supplied input rejected before any remote call.
  #[error("{0}")]
  Validation(String),

  /// Field-schema lookup against a cache entry that was never populated.
  /// A precondition violation in the caller, not a remote failure.
  #[error("no cached field schema for {project}/{issue_type}/{field}")]
  SchemaMissing {
    project: String,
    issue_type: String,
    field: String,
  },
}

pub type Result<T> = std::result::Result<T, Error>;
