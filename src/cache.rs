//! In-memory metadata cache in front of the remote tracker.
//!
//! Project lookups, priorities, and create-issue field schemas are expensive
//! remote calls that don't change between consecutive issue creations, so
//! each is fetched at most once per provider lifetime. There is no TTL and
//! no invalidation: a provider is rebuilt (with a fresh cache) when the
//! connection settings change.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::remote::RemoteApi;
use crate::types::{FieldSchema, IssueType, IssueTypeFields, Priority, Project, ProjectStub};

pub struct MetadataCache<R> {
  remote: Arc<R>,
  all_projects: Option<Vec<ProjectStub>>,
  projects: HashMap<String, Project>,
  priorities: Option<Vec<Priority>>,
  /// project key → issue type name → field id → schema
  project_fields: HashMap<String, HashMap<String, IssueTypeFields>>,
}

impl<R: RemoteApi> MetadataCache<R> {
  pub fn new(remote: Arc<R>) -> Self {
    Self {
      remote,
      all_projects: None,
      projects: HashMap::new(),
      priorities: None,
      project_fields: HashMap::new(),
    }
  }

  pub fn remote(&self) -> &R {
    &self.remote
  }

  /// All projects visible to the connection, fetched once.
  pub async fn project_stubs(&mut self) -> Result<Vec<ProjectStub>> {
    if let Some(projects) = &self.all_projects {
      return Ok(projects.clone());
    }

    let projects = self.remote.all_projects().await?;
    debug!(count = projects.len(), "cached project list");
    self.all_projects = Some(projects.clone());
    Ok(projects)
  }

  /// Full project details, fetched once per key.
  pub async fn project(&mut self, key: &str) -> Result<Project> {
    if let Some(project) = self.projects.get(key) {
      return Ok(project.clone());
    }

    let project = self.remote.project(key).await?;
    debug!(key, "cached project");
    self.projects.insert(key.to_string(), project.clone());
    Ok(project)
  }

  /// Issue type resolved by name within a project.
  pub async fn issue_type(&mut self, project_key: &str, name: &str) -> Result<IssueType> {
    let project = self.project(project_key).await?;
    project
      .issue_types
      .into_iter()
      .find(|it| it.name == name)
      .ok_or_else(|| {
        Error::NotFound(format!(
          "Issue type '{}' is not found in project {}",
          name, project_key
        ))
      })
  }

  /// Instance-wide priority list, fetched once.
  pub async fn priorities(&mut self) -> Result<Vec<Priority>> {
    if let Some(priorities) = &self.priorities {
      return Ok(priorities.clone());
    }

    let priorities = self.remote.priorities().await?;
    debug!(count = priorities.len(), "cached priorities");
    self.priorities = Some(priorities.clone());
    Ok(priorities)
  }

  /// Priority matched by exact display name; None when no match exists.
  pub async fn priority_by_name(&mut self, name: &str) -> Result<Option<Priority>> {
    let priorities = self.priorities().await?;
    Ok(priorities.into_iter().find(|p| p.name == name))
  }

  /// Make sure field schemas are cached for every given project.
  ///
  /// Only the uncached keys go into the (single, batched) remote call. On
  /// failure the cache is left exactly as it was, so the next call retries
  /// the missing keys. A project's schemas are inserted whole: all of its
  /// issue types at once, or nothing.
  pub async fn ensure_field_schemas(&mut self, project_keys: &[&str]) -> Result<()> {
    let missing: Vec<String> = project_keys
      .iter()
      .filter(|key| !self.project_fields.contains_key(**key))
      .map(|key| key.to_string())
      .collect();

    if missing.is_empty() {
      return Ok(());
    }

    let fetched = self.remote.project_schemas(&missing).await?;
    for schemas in fetched {
      debug!(
        project = %schemas.project_key,
        issue_types = schemas.issue_types.len(),
        "cached field schemas"
      );
      self
        .project_fields
        .insert(schemas.project_key.clone(), schemas.issue_types);
    }

    Ok(())
  }

  /// Cached schema lookup. Missing entries are a caller error (run
  /// [`ensure_field_schemas`](Self::ensure_field_schemas) first), signaled
  /// distinctly from remote failures.
  pub fn field_schema(
    &self,
    project_key: &str,
    issue_type: &str,
    field: &str,
  ) -> Result<&FieldSchema> {
    self
      .project_fields
      .get(project_key)
      .and_then(|types| types.get(issue_type))
      .and_then(|fields| fields.get(field))
      .ok_or_else(|| Error::SchemaMissing {
        project: project_key.to_string(),
        issue_type: issue_type.to_string(),
        field: field.to_string(),
      })
  }
}
