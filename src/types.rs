use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Lightweight project reference as returned by the project list endpoint
#[derive(Debug, Clone)]
pub struct ProjectStub {
  pub key: String,
  pub name: String,
}

/// Full project details, fetched once per key and cached
#[derive(Debug, Clone)]
pub struct Project {
  pub key: String,
  pub name: String,
  pub issue_types: Vec<IssueType>,
  pub versions: Vec<String>,
  pub components: Vec<String>,
}

/// Issue type within a project (e.g. Bug, Story)
#[derive(Debug, Clone)]
pub struct IssueType {
  pub id: String,
  pub name: String,
  pub subtask: bool,
}

/// Priority as defined on the Jira instance
#[derive(Debug, Clone)]
pub struct Priority {
  pub id: String,
  pub name: String,
}

/// Create-issue metadata for a single field of a project × issue type pair
#[derive(Debug, Clone)]
pub struct FieldSchema {
  pub id: String,
  pub name: String,
  /// Type tag from the remote schema ("string", "array", "option", "user", ...)
  pub schema_type: String,
  /// Allowed option values; non-empty means the field only accepts these
  pub allowed_values: Vec<serde_json::Value>,
}

impl FieldSchema {
  /// Field restricted to a fixed set of option values
  pub fn has_predefined_values(&self) -> bool {
    !self.allowed_values.is_empty()
  }

  /// Field whose value is a list (case-insensitive compare, matching the
  /// remote schema's declared type string)
  pub fn is_array(&self) -> bool {
    self.schema_type.eq_ignore_ascii_case("array")
  }
}

/// Field schemas keyed by field id
pub type IssueTypeFields = HashMap<String, FieldSchema>;

/// All field schemas for one project: issue type name → field id → schema
#[derive(Debug, Clone)]
pub struct ProjectSchemas {
  pub project_key: String,
  pub issue_types: HashMap<String, IssueTypeFields>,
}

/// User as returned by the user-search endpoint. Server editions carry a
/// classic `name`; Cloud only exposes `account_id`.
#[derive(Debug, Clone)]
pub struct RemoteUser {
  pub name: Option<String>,
  pub account_id: Option<String>,
  pub display_name: String,
}

/// Identifier of a freshly created issue
#[derive(Debug, Clone)]
pub struct CreatedIssue {
  pub id: String,
  pub key: String,
}

/// Issue details, enough to verify what was filed
#[derive(Debug, Clone)]
pub struct Issue {
  pub key: String,
  pub project_key: String,
  pub summary: String,
  pub description: Option<String>,
  pub issue_type: String,
}

/// Issue-creation request as submitted to the remote tracker.
///
/// Built incrementally (base fields first, extra fields through the mapper)
/// and submitted exactly once. Serializes to the create-issue payload shape.
#[derive(Debug, Clone, Serialize)]
pub struct IssueInput {
  fields: BTreeMap<String, serde_json::Value>,
}

impl IssueInput {
  pub fn new(project_key: &str, issue_type: &IssueType, summary: &str, description: &str) -> Self {
    let mut fields = BTreeMap::new();
    fields.insert(
      "project".to_string(),
      serde_json::json!({ "key": project_key }),
    );
    fields.insert(
      "issuetype".to_string(),
      serde_json::json!({ "id": issue_type.id }),
    );
    fields.insert(
      "summary".to_string(),
      serde_json::Value::String(summary.to_string()),
    );
    fields.insert(
      "description".to_string(),
      serde_json::Value::String(description.to_string()),
    );
    IssueInput { fields }
  }

  pub fn set_field(&mut self, id: &str, value: serde_json::Value) {
    self.fields.insert(id.to_string(), value);
  }

  pub fn field(&self, id: &str) -> Option<&serde_json::Value> {
    self.fields.get(id)
  }

  /// Project key from the base fields, as submitted
  pub fn project_key(&self) -> Option<&str> {
    self.fields.get("project")?.get("key")?.as_str()
  }

  /// Summary from the base fields, as submitted
  pub fn summary(&self) -> Option<&str> {
    self.fields.get("summary")?.as_str()
  }
}

/// Raw value supplied by the caller for an extra field.
///
/// Values are never validated against the field schema up front; a type
/// mismatch surfaces as a mapping or remote-call failure.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
  Text(String),
  List(Vec<String>),
  /// Opaque structured value passed through unchanged
  Json(serde_json::Value),
}

impl FieldValue {
  pub fn as_text(&self) -> Option<&str> {
    match self {
      FieldValue::Text(s) => Some(s),
      FieldValue::Json(serde_json::Value::String(s)) => Some(s),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<Vec<String>> {
    match self {
      FieldValue::List(items) => Some(items.clone()),
      FieldValue::Json(serde_json::Value::Array(items)) => items
        .iter()
        .map(|v| v.as_str().map(String::from))
        .collect(),
      _ => None,
    }
  }

  pub fn to_json(&self) -> serde_json::Value {
    match self {
      FieldValue::Text(s) => serde_json::Value::String(s.clone()),
      FieldValue::List(items) => {
        serde_json::Value::Array(items.iter().cloned().map(serde_json::Value::String).collect())
      }
      FieldValue::Json(v) => v.clone(),
    }
  }
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self {
    FieldValue::Text(s.to_string())
  }
}

impl From<String> for FieldValue {
  fn from(s: String) -> Self {
    FieldValue::Text(s)
  }
}

impl From<Vec<String>> for FieldValue {
  fn from(items: Vec<String>) -> Self {
    FieldValue::List(items)
  }
}
