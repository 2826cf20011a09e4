//! Jira bridge: file bug reports into a Jira instance.
//!
//! The provider resolves create-issue metadata (cached for its lifetime),
//! maps generic extra-field values onto Jira's typed field inputs, creates
//! the issue through the `gouqi` client, and uploads attachments.
//!
//! ```no_run
//! use jira_bridge::{Config, FieldValue, JiraProvider};
//!
//! # async fn run() -> jira_bridge::Result<()> {
//! let config = Config::load(None)?;
//! let mut provider = JiraProvider::connect(&config)?;
//!
//! let extra = vec![
//!   ("priority".to_string(), FieldValue::from("High")),
//!   ("components".to_string(), FieldValue::from("Backend")),
//! ];
//! let created = provider
//!   .create_issue("SPC", "Bug", "Crash on save", "Steps to reproduce...", &extra)
//!   .await?;
//! provider
//!   .attach_bytes(&created.key, "execution.log", b"...".to_vec())
//!   .await?;
//! # Ok(())
//! # }
//! ```

pub mod api_types;
pub mod cache;
pub mod config;
pub mod error;
pub mod fields;
pub mod provider;
pub mod remote;
pub mod types;

pub use cache::MetadataCache;
pub use config::{Config, Deployment, JiraConfig};
pub use error::{Error, Result};
pub use provider::JiraProvider;
pub use remote::{JiraRemote, RemoteApi};
pub use types::{CreatedIssue, FieldValue, Issue, IssueInput, IssueType, Priority, Project};
