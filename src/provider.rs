//! The provider: issue creation orchestration and attachment upload.

use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::MetadataCache;
use crate::config::Config;
use crate::error::{
  Error, Result, FILE_NAME_NOT_SPECIFIED, INCORRECT_FILE_PATH, INCORRECT_PROTOCOL_HINT,
  INCORRECT_PROTOCOL_MARKER, ISSUE_KEY_NOT_SPECIFIED,
};
use crate::fields::FieldMapper;
use crate::remote::{JiraRemote, RemoteApi};
use crate::types::{CreatedIssue, FieldValue, Issue, IssueInput};

/// One provider per live connection: the remote client is acquired at
/// construction and the metadata cache lives exactly as long as the
/// provider. Rebuild the provider when credentials change.
///
/// Methods take `&mut self`; a provider shared across threads needs the
/// host's own mutex around it.
pub struct JiraProvider<R = JiraRemote> {
  remote: Arc<R>,
  cache: MetadataCache<R>,
  skip_versions: bool,
}

impl JiraProvider<JiraRemote> {
  /// Connect using settings and the secret from the environment.
  /// Incomplete or invalid settings fail here, not on first use.
  pub fn connect(config: &Config) -> Result<Self> {
    let secret = Config::get_api_secret()?;
    Self::connect_with_secret(config, &secret)
  }

  pub fn connect_with_secret(config: &Config, secret: &str) -> Result<Self> {
    let remote = JiraRemote::new(&config.jira, secret)?;
    Ok(Self::with_remote(remote, config.jira.skip_versions))
  }
}

impl<R: RemoteApi> JiraProvider<R> {
  /// Build a provider over any remote implementation (fakes in tests,
  /// alternative transports in hosts).
  pub fn with_remote(remote: R, skip_versions: bool) -> Self {
    let remote = Arc::new(remote);
    Self {
      cache: MetadataCache::new(Arc::clone(&remote)),
      remote,
      skip_versions,
    }
  }

  /// Keys of all projects visible to the connection.
  pub async fn project_keys(&mut self) -> Result<Vec<String>> {
    let stubs = self.cache.project_stubs().await?;
    Ok(stubs.into_iter().map(|p| p.key).collect())
  }

  /// Issue type names available in a project.
  pub async fn issue_type_names(&mut self, project_key: &str) -> Result<Vec<String>> {
    let project = self.cache.project(project_key).await?;
    Ok(project.issue_types.into_iter().map(|it| it.name).collect())
  }

  /// Create an issue: resolve the issue type, build the request, map the
  /// extra fields, submit once. No retries; the tracker creates issues
  /// atomically on its side.
  pub async fn create_issue(
    &mut self,
    project_key: &str,
    issue_type_name: &str,
    summary: &str,
    description: &str,
    extra_fields: &[(String, FieldValue)],
  ) -> Result<CreatedIssue> {
    let issue_type = self.cache.issue_type(project_key, issue_type_name).await?;

    let mut input = IssueInput::new(project_key, &issue_type, summary, description);
    FieldMapper::new(&mut self.cache, project_key, issue_type_name, self.skip_versions)
      .apply(&mut input, extra_fields)
      .await?;

    match self.remote.create_issue(&input).await {
      Ok(created) => {
        info!(key = %created.key, project = project_key, "created issue");
        Ok(created)
      }
      Err(Error::Remote(message)) => {
        error!(project = project_key, %message, "issue creation failed");
        // A 301 from the tracker usually means the URL was configured with
        // the wrong scheme and the server redirected to HTTPS.
        if message.contains(INCORRECT_PROTOCOL_MARKER) {
          Err(Error::Remote(format!("{}{}", message, INCORRECT_PROTOCOL_HINT)))
        } else {
          Err(Error::Remote(message))
        }
      }
      Err(other) => Err(other),
    }
  }

  /// Fetch an issue back by key, e.g. to verify what was filed.
  pub async fn issue(&self, key: &str) -> Result<Issue> {
    self.remote.issue(key).await
  }

  /// Attach in-memory content (test artifacts, execution logs) to an
  /// existing issue. Validates its inputs before any remote call.
  pub async fn attach_bytes(
    &self,
    issue_key: &str,
    file_name: &str,
    content: Vec<u8>,
  ) -> Result<()> {
    if issue_key.trim().is_empty() {
      return Err(Error::Validation(ISSUE_KEY_NOT_SPECIFIED.to_string()));
    }
    if file_name.trim().is_empty() {
      return Err(Error::Validation(FILE_NAME_NOT_SPECIFIED.to_string()));
    }

    self.remote.add_attachment(issue_key, file_name, content).await
  }

  /// Attach a file from disk to an existing issue.
  pub async fn attach_file(&self, issue_key: &str, path: &Path) -> Result<()> {
    if issue_key.trim().is_empty() {
      return Err(Error::Validation(ISSUE_KEY_NOT_SPECIFIED.to_string()));
    }
    if path.as_os_str().is_empty() || !path.is_file() {
      return Err(Error::Validation(INCORRECT_FILE_PATH.to_string()));
    }
    let file_name = path
      .file_name()
      .and_then(|name| name.to_str())
      .ok_or_else(|| Error::Validation(INCORRECT_FILE_PATH.to_string()))?;

    let content = tokio::fs::read(path)
      .await
      .map_err(|_| Error::Validation(INCORRECT_FILE_PATH.to_string()))?;

    self.remote.add_attachment(issue_key, file_name, content).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::remote::testing::FakeRemote;
  use std::io::Write;
  use std::sync::atomic::Ordering;

  fn provider() -> JiraProvider<FakeRemote> {
    JiraProvider::with_remote(FakeRemote::default(), false)
  }

  fn remote(provider: &JiraProvider<FakeRemote>) -> &FakeRemote {
    provider.remote.as_ref()
  }

  #[tokio::test]
  async fn test_create_issue_submits_mapped_request() {
    let mut provider = provider();

    let extra = vec![
      ("priority".to_string(), FieldValue::from("High")),
      ("components".to_string(), FieldValue::from("Backend")),
    ];
    let created = provider
      .create_issue("SPC", "Bug", "Crash on save", "steps to reproduce", &extra)
      .await
      .unwrap();

    assert_eq!(created.key, "SPC-1");

    let submitted = remote(&provider).submitted.lock().unwrap();
    let (_, input) = &submitted[0];
    assert_eq!(input.project_key(), Some("SPC"));
    assert_eq!(input.summary(), Some("Crash on save"));
    assert_eq!(
      input.field("issuetype").unwrap(),
      &serde_json::json!({ "id": "10004" })
    );
    assert_eq!(
      input.field("priority").unwrap(),
      &serde_json::json!({ "id": "1" })
    );
    assert_eq!(
      input.field("components").unwrap(),
      &serde_json::json!([{ "name": "Backend" }])
    );
  }

  #[tokio::test]
  async fn test_created_issue_round_trips() {
    let mut provider = provider();

    let created = provider
      .create_issue("SPC", "Bug", "Crash on save", "steps", &[])
      .await
      .unwrap();
    let fetched = provider.issue(&created.key).await.unwrap();

    assert_eq!(fetched.project_key, "SPC");
    assert_eq!(fetched.summary, "Crash on save");
  }

  #[tokio::test]
  async fn test_unknown_issue_type_is_not_found() {
    let mut provider = provider();

    let err = provider
      .create_issue("SPC", "Epic", "s", "d", &[])
      .await
      .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.to_string().contains("Epic"));
    assert_eq!(remote(&provider).calls.create_issue.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_failing_field_aborts_before_submission() {
    let mut provider = provider();

    let extra = vec![("assignee".to_string(), FieldValue::from("nobody"))];
    let err = provider
      .create_issue("SPC", "Bug", "s", "d", &extra)
      .await
      .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(remote(&provider).calls.create_issue.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_redirect_failure_gets_protocol_hint() {
    let mut provider = provider();
    *remote(&provider).fail_create.lock().unwrap() =
      Some("Server returned 301 Moved Permanently".to_string());

    let err = provider
      .create_issue("SPC", "Bug", "s", "d", &[])
      .await
      .unwrap_err();

    assert!(err.to_string().ends_with(INCORRECT_PROTOCOL_HINT));
  }

  #[tokio::test]
  async fn test_other_remote_failures_pass_through() {
    let mut provider = provider();
    *remote(&provider).fail_create.lock().unwrap() = Some("field is required".to_string());

    let err = provider
      .create_issue("SPC", "Bug", "s", "d", &[])
      .await
      .unwrap_err();

    assert_eq!(err.to_string(), "field is required");
  }

  #[tokio::test]
  async fn test_project_and_issue_type_listings() {
    let mut provider = provider();

    assert_eq!(provider.project_keys().await.unwrap(), vec!["SPC"]);
    assert_eq!(
      provider.issue_type_names("SPC").await.unwrap(),
      vec!["Bug", "Task"]
    );
  }

  #[tokio::test]
  async fn test_attach_requires_issue_key() {
    let provider = provider();

    let err = provider
      .attach_bytes("", "log.txt", b"log".to_vec())
      .await
      .unwrap_err();

    assert_eq!(err.to_string(), "No issue key is specified.");
    assert_eq!(remote(&provider).calls.add_attachment.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_attach_requires_file_name() {
    let provider = provider();

    let err = provider
      .attach_bytes("SPC-1", " ", b"log".to_vec())
      .await
      .unwrap_err();

    assert_eq!(err.to_string(), "No file name is specified.");
    assert_eq!(remote(&provider).calls.add_attachment.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_attach_bytes_uploads() {
    let provider = provider();

    provider
      .attach_bytes("SPC-1", "log.txt", b"execution log".to_vec())
      .await
      .unwrap();

    assert_eq!(remote(&provider).calls.add_attachment.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_attach_file_rejects_missing_path() {
    let provider = provider();

    let err = provider
      .attach_file("SPC-1", Path::new("/nonexistent/log.txt"))
      .await
      .unwrap_err();

    assert_eq!(err.to_string(), "Incorrect file path.");
    assert_eq!(remote(&provider).calls.add_attachment.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_attach_file_uploads_existing_file() {
    let provider = provider();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"execution log").unwrap();

    provider.attach_file("SPC-1", file.path()).await.unwrap();

    assert_eq!(remote(&provider).calls.add_attachment.load(Ordering::SeqCst), 1);
  }
}
