//! Field classification and mapping for issue creation.
//!
//! Extra fields arrive as a generic name → raw value list and have to be
//! turned into the typed field inputs the tracker expects. A fixed set of
//! field names gets special handling; everything else is classified against
//! the cached create-issue metadata.

use serde_json::json;

use crate::cache::MetadataCache;
use crate::error::{Error, Result};
use crate::remote::RemoteApi;
use crate::types::{FieldValue, IssueInput};

pub const PRIORITY_FIELD: &str = "priority";
pub const COMPONENTS_FIELD: &str = "components";
pub const VERSIONS_FIELD: &str = "versions";
pub const FIX_VERSIONS_FIELD: &str = "fixVersions";
pub const ASSIGNEE_FIELD: &str = "assignee";
pub const REPORTER_FIELD: &str = "reporter";
pub const PARENT_FIELD: &str = "parent";
pub const RESOLUTION_FIELD: &str = "resolution";

/// Specially handled field names, in dispatch priority order. First match
/// wins and the comparison is case-sensitive; anything else falls through to
/// schema-driven classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialField {
  Priority,
  Components,
  Versions,
  FixVersions,
  Assignee,
  Reporter,
  Parent,
  Resolution,
}

impl SpecialField {
  fn for_name(name: &str) -> Option<Self> {
    match name {
      PRIORITY_FIELD => Some(Self::Priority),
      COMPONENTS_FIELD => Some(Self::Components),
      VERSIONS_FIELD => Some(Self::Versions),
      FIX_VERSIONS_FIELD => Some(Self::FixVersions),
      ASSIGNEE_FIELD => Some(Self::Assignee),
      REPORTER_FIELD => Some(Self::Reporter),
      PARENT_FIELD => Some(Self::Parent),
      RESOLUTION_FIELD => Some(Self::Resolution),
      _ => None,
    }
  }
}

// ============================================================================
// Classifier
// ============================================================================

/// Field restricted to a fixed set of option values. Requires the project's
/// schemas to be cached already.
pub fn is_predefined_value_field<R: RemoteApi>(
  cache: &MetadataCache<R>,
  project_key: &str,
  issue_type: &str,
  field: &str,
) -> Result<bool> {
  Ok(
    cache
      .field_schema(project_key, issue_type, field)?
      .has_predefined_values(),
  )
}

/// Field whose schema type tag is `array` (case-insensitive). Requires the
/// project's schemas to be cached already.
pub fn is_array_field<R: RemoteApi>(
  cache: &MetadataCache<R>,
  project_key: &str,
  issue_type: &str,
  field: &str,
) -> Result<bool> {
  Ok(cache.field_schema(project_key, issue_type, field)?.is_array())
}

// ============================================================================
// Mapper
// ============================================================================

/// Maps extra field values onto an [`IssueInput`] for one project × issue
/// type pair. Stops at the first failing field; nothing built after an
/// error ever reaches the request.
pub struct FieldMapper<'a, R> {
  cache: &'a mut MetadataCache<R>,
  project_key: &'a str,
  issue_type_name: &'a str,
  skip_versions: bool,
}

impl<'a, R: RemoteApi> FieldMapper<'a, R> {
  pub fn new(
    cache: &'a mut MetadataCache<R>,
    project_key: &'a str,
    issue_type_name: &'a str,
    skip_versions: bool,
  ) -> Self {
    Self {
      cache,
      project_key,
      issue_type_name,
      skip_versions,
    }
  }

  pub async fn apply(
    &mut self,
    input: &mut IssueInput,
    extra_fields: &[(String, FieldValue)],
  ) -> Result<()> {
    for (name, value) in extra_fields {
      self.apply_one(input, name, value).await?;
    }
    Ok(())
  }

  async fn apply_one(
    &mut self,
    input: &mut IssueInput,
    name: &str,
    value: &FieldValue,
  ) -> Result<()> {
    match SpecialField::for_name(name) {
      Some(SpecialField::Priority) => {
        let priority_name = expect_text(name, value)?;
        // An unmatched priority name sets nothing; the request goes out
        // without a priority rather than failing.
        if let Some(priority) = self.cache.priority_by_name(priority_name).await? {
          input.set_field(PRIORITY_FIELD, json!({ "id": priority.id }));
        }
        Ok(())
      }
      Some(SpecialField::Components) => self.set_single_name_list(input, name, value),
      Some(SpecialField::Versions) | Some(SpecialField::FixVersions) => {
        if self.skip_versions {
          return Ok(());
        }
        self.set_single_name_list(input, name, value)
      }
      Some(SpecialField::Assignee) | Some(SpecialField::Reporter) => {
        self.set_user_field(input, name, value).await
      }
      Some(SpecialField::Parent) => {
        let key = expect_text(name, value)?;
        input.set_field(PARENT_FIELD, json!({ "key": key }));
        Ok(())
      }
      Some(SpecialField::Resolution) => {
        let resolution = expect_text(name, value)?;
        input.set_field(RESOLUTION_FIELD, json!({ "name": resolution }));
        Ok(())
      }
      None => self.set_classified_field(input, name, value).await,
    }
  }

  /// Components and versions only ever carry a single caller value, wrapped
  /// as a one-element name list even though the target field is
  /// multi-valued. Callers depend on the single-value contract.
  fn set_single_name_list(
    &self,
    input: &mut IssueInput,
    name: &str,
    value: &FieldValue,
  ) -> Result<()> {
    let single = expect_text(name, value)?;
    input.set_field(name, json!([{ "name": single }]));
    Ok(())
  }

  async fn set_user_field(
    &mut self,
    input: &mut IssueInput,
    name: &str,
    value: &FieldValue,
  ) -> Result<()> {
    let username = expect_text(name, value)?;
    let not_found = || Error::NotFound(format!("{} user is not found", username));

    let user = self
      .cache
      .remote()
      .find_user(username)
      .await?
      .ok_or_else(not_found)?;

    // Prefer the classic name-based identity, fall back to accountId
    let identity = if let Some(user_name) = user.name {
      json!({ "name": user_name })
    } else if let Some(account_id) = user.account_id {
      json!({ "accountId": account_id })
    } else {
      return Err(not_found());
    };

    input.set_field(name, identity);
    Ok(())
  }

  async fn set_classified_field(
    &mut self,
    input: &mut IssueInput,
    name: &str,
    value: &FieldValue,
  ) -> Result<()> {
    self.cache.ensure_field_schemas(&[self.project_key]).await?;

    if is_predefined_value_field(self.cache, self.project_key, self.issue_type_name, name)? {
      let values = value.as_list().ok_or_else(|| {
        Error::Validation(format!("Field '{}' accepts a list of option values", name))
      })?;
      let options: Vec<serde_json::Value> =
        values.iter().map(|v| json!({ "value": v })).collect();
      input.set_field(name, serde_json::Value::Array(options));
    } else if is_array_field(self.cache, self.project_key, self.issue_type_name, name)? {
      let text = expect_text(name, value)?;
      let items: Vec<serde_json::Value> = text
        .split(',')
        .map(|item| serde_json::Value::String(item.trim().to_string()))
        .collect();
      input.set_field(name, serde_json::Value::Array(items));
    } else {
      input.set_field(name, value.to_json());
    }

    Ok(())
  }
}

fn expect_text<'v>(name: &str, value: &'v FieldValue) -> Result<&'v str> {
  value
    .as_text()
    .ok_or_else(|| Error::Validation(format!("Field '{}' expects a single text value", name)))
}
