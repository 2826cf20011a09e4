//! Serde-deserializable types matching Jira API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on what the provider needs.

use serde::Deserialize;
use std::collections::HashMap;

use crate::types::{
  CreatedIssue, FieldSchema, Issue, IssueType, IssueTypeFields, Priority, Project, ProjectSchemas,
  ProjectStub, RemoteUser,
};

// ============================================================================
// Projects and priorities
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiProjectStub {
  pub key: String,
  #[serde(default)]
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiNamed {
  #[serde(default)]
  pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiIssueType {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub subtask: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApiProject {
  pub key: String,
  #[serde(default)]
  pub name: String,
  #[serde(rename = "issueTypes", default)]
  pub issue_types: Vec<ApiIssueType>,
  #[serde(default)]
  pub versions: Vec<ApiNamed>,
  #[serde(default)]
  pub components: Vec<ApiNamed>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPriority {
  pub id: String,
  pub name: String,
}

// ============================================================================
// Create-issue metadata
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFieldSchema {
  #[serde(rename = "type", default)]
  pub schema_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiFieldInfo {
  /// Present on the server-edition per-issue-type endpoint; the batched
  /// createmeta endpoint keys its fields map by id instead.
  #[serde(rename = "fieldId", default)]
  pub field_id: Option<String>,
  #[serde(default)]
  pub name: String,
  pub schema: Option<ApiFieldSchema>,
  #[serde(rename = "allowedValues", default)]
  pub allowed_values: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCimIssueType {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub fields: HashMap<String, ApiFieldInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCimProject {
  pub key: String,
  #[serde(default)]
  pub issuetypes: Vec<ApiCimIssueType>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCreateMetaResponse {
  #[serde(default)]
  pub projects: Vec<ApiCimProject>,
}

/// Paginated field list from the server-edition endpoint
/// `/issue/createmeta/{project}/issuetypes/{issueTypeId}`.
#[derive(Debug, Deserialize)]
pub struct ApiFieldsPage {
  #[serde(default)]
  pub values: Vec<ApiFieldInfo>,
  #[serde(rename = "startAt", default)]
  pub start_at: u64,
  #[serde(rename = "maxResults", default)]
  pub max_results: u64,
  #[serde(default)]
  pub total: u64,
  #[serde(rename = "isLast", default)]
  pub is_last: bool,
}

// ============================================================================
// Users, created issues, issue details
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiUser {
  pub name: Option<String>,
  #[serde(rename = "accountId")]
  pub account_id: Option<String>,
  #[serde(rename = "displayName", default)]
  pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiCreatedIssue {
  pub id: String,
  pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiIssueTypeRef {
  pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ApiIssueFields {
  #[serde(default)]
  pub summary: String,
  pub project: Option<ApiProjectStub>,
  #[serde(rename = "issuetype")]
  pub issue_type: Option<ApiIssueTypeRef>,
  // Description can be a plain string (API v2) or an ADF document (v3)
  pub description: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiIssue {
  pub key: String,
  #[serde(default)]
  pub fields: ApiIssueFields,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiProjectStub> for ProjectStub {
  fn from(p: ApiProjectStub) -> Self {
    ProjectStub {
      key: p.key,
      name: p.name,
    }
  }
}

impl From<ApiIssueType> for IssueType {
  fn from(t: ApiIssueType) -> Self {
    IssueType {
      id: t.id,
      name: t.name,
      subtask: t.subtask,
    }
  }
}

impl From<ApiProject> for Project {
  fn from(p: ApiProject) -> Self {
    Project {
      key: p.key,
      name: p.name,
      issue_types: p.issue_types.into_iter().map(IssueType::from).collect(),
      versions: p.versions.into_iter().map(|v| v.name).collect(),
      components: p.components.into_iter().map(|c| c.name).collect(),
    }
  }
}

impl From<ApiPriority> for Priority {
  fn from(p: ApiPriority) -> Self {
    Priority {
      id: p.id,
      name: p.name,
    }
  }
}

impl ApiFieldInfo {
  /// Convert to a domain schema. `fallback_id` is the key this field was
  /// stored under when the payload itself carries no fieldId.
  pub fn into_schema(self, fallback_id: &str) -> FieldSchema {
    FieldSchema {
      id: self.field_id.unwrap_or_else(|| fallback_id.to_string()),
      name: self.name,
      schema_type: self.schema.map(|s| s.schema_type).unwrap_or_default(),
      allowed_values: self.allowed_values,
    }
  }
}

impl From<ApiCimProject> for ProjectSchemas {
  fn from(p: ApiCimProject) -> Self {
    let issue_types = p
      .issuetypes
      .into_iter()
      .map(|it| {
        let fields: IssueTypeFields = it
          .fields
          .into_iter()
          .map(|(id, info)| {
            let schema = info.into_schema(&id);
            (id, schema)
          })
          .collect();
        (it.name, fields)
      })
      .collect();

    ProjectSchemas {
      project_key: p.key,
      issue_types,
    }
  }
}

impl From<ApiUser> for RemoteUser {
  fn from(u: ApiUser) -> Self {
    RemoteUser {
      name: u.name,
      account_id: u.account_id,
      display_name: u.display_name,
    }
  }
}

impl From<ApiCreatedIssue> for CreatedIssue {
  fn from(i: ApiCreatedIssue) -> Self {
    CreatedIssue { id: i.id, key: i.key }
  }
}

impl ApiIssue {
  pub fn into_issue(self) -> Issue {
    let f = self.fields;
    Issue {
      key: self.key,
      project_key: f.project.map(|p| p.key).unwrap_or_default(),
      summary: f.summary,
      description: f.description.as_ref().and_then(extract_description),
      issue_type: f.issue_type.map(|t| t.name).unwrap_or_default(),
    }
  }
}

// ============================================================================
// Helpers
// ============================================================================

/// Extract plain text description from Jira's ADF or plain text format
fn extract_description(value: &serde_json::Value) -> Option<String> {
  // If it's a string, return it directly (API v2)
  if let Some(s) = value.as_str() {
    return Some(s.to_string());
  }

  // If it's an ADF document (API v3), flatten the text nodes
  if let Some(content) = value.get("content").and_then(|v| v.as_array()) {
    let mut text = String::new();
    extract_adf_text(content, &mut text);
    if !text.is_empty() {
      return Some(text);
    }
  }

  None
}

/// Recursively extract text from ADF content
fn extract_adf_text(content: &[serde_json::Value], output: &mut String) {
  for node in content {
    if let Some(node_type) = node.get("type").and_then(|v| v.as_str()) {
      match node_type {
        "text" => {
          if let Some(text) = node.get("text").and_then(|v| v.as_str()) {
            output.push_str(text);
          }
        }
        "hardBreak" => {
          output.push('\n');
        }
        _ => {
          if let Some(children) = node.get("content").and_then(|v| v.as_array()) {
            extract_adf_text(children, output);
          }
          if node_type == "paragraph" || node_type == "heading" {
            output.push('\n');
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_createmeta_conversion() {
    let json = serde_json::json!({
      "projects": [{
        "key": "SPC",
        "issuetypes": [{
          "id": "10004",
          "name": "Bug",
          "fields": {
            "severity": {
              "name": "Severity",
              "schema": { "type": "option" },
              "allowedValues": [{ "value": "Blocker" }, { "value": "Minor" }]
            },
            "labels": {
              "name": "Labels",
              "schema": { "type": "array" }
            }
          }
        }]
      }]
    });

    let resp: ApiCreateMetaResponse = serde_json::from_value(json).unwrap();
    let schemas = ProjectSchemas::from(resp.projects.into_iter().next().unwrap());
    assert_eq!(schemas.project_key, "SPC");

    let bug = &schemas.issue_types["Bug"];
    assert!(bug["severity"].has_predefined_values());
    assert!(!bug["severity"].is_array());
    assert!(bug["labels"].is_array());
    assert!(!bug["labels"].has_predefined_values());
    assert_eq!(bug["labels"].id, "labels");
  }

  #[test]
  fn test_array_tag_is_case_insensitive() {
    let info = ApiFieldInfo {
      field_id: Some("customfield_10020".to_string()),
      name: "Sprints".to_string(),
      schema: Some(ApiFieldSchema {
        schema_type: "Array".to_string(),
      }),
      allowed_values: vec![],
    };
    assert!(info.into_schema("ignored").is_array());
  }

  #[test]
  fn test_issue_with_plain_description() {
    let json = serde_json::json!({
      "key": "SPC-7",
      "fields": {
        "summary": "Widget crashes",
        "project": { "key": "SPC", "name": "Space" },
        "issuetype": { "name": "Bug" },
        "description": "steps to reproduce"
      }
    });
    let issue: ApiIssue = serde_json::from_value(json).unwrap();
    let issue = issue.into_issue();
    assert_eq!(issue.project_key, "SPC");
    assert_eq!(issue.description.as_deref(), Some("steps to reproduce"));
  }

  #[test]
  fn test_issue_with_adf_description() {
    let json = serde_json::json!({
      "key": "SPC-8",
      "fields": {
        "summary": "x",
        "description": {
          "type": "doc",
          "content": [
            { "type": "paragraph", "content": [{ "type": "text", "text": "line one" }] }
          ]
        }
      }
    });
    let issue: ApiIssue = serde_json::from_value(json).unwrap();
    assert_eq!(issue.into_issue().description.as_deref(), Some("line one\n"));
  }
}
