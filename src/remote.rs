//! The remote seam: a narrow trait over the Jira endpoints the provider
//! needs, and the gouqi-backed implementation.

use async_trait::async_trait;
use base64::Engine;
use std::collections::HashMap;
use url::Url;

use crate::api_types::{
  ApiCreateMetaResponse, ApiCreatedIssue, ApiFieldsPage, ApiIssue, ApiPriority, ApiProject,
  ApiProjectStub, ApiUser,
};
use crate::config::{Deployment, JiraConfig};
use crate::error::{Error, Result, URI_IS_INCORRECT};
use crate::types::{
  CreatedIssue, Issue, IssueInput, IssueTypeFields, Priority, Project, ProjectSchemas,
  ProjectStub, RemoteUser,
};

/// Remote issue-tracking service as seen by the provider.
///
/// One method per endpoint the provider actually uses; everything else the
/// tracker offers stays out of scope. Implemented by [`JiraRemote`] for real
/// connections and by a fake in tests.
#[async_trait]
pub trait RemoteApi: Send + Sync {
  /// List all projects visible to the connection
  async fn all_projects(&self) -> Result<Vec<ProjectStub>>;

  /// Full project details, including its issue types
  async fn project(&self, key: &str) -> Result<Project>;

  /// All priorities defined on the instance
  async fn priorities(&self) -> Result<Vec<Priority>>;

  /// Create-issue field schemas for the given projects, one batched call.
  /// Each returned entry covers every issue type of its project.
  async fn project_schemas(&self, project_keys: &[String]) -> Result<Vec<ProjectSchemas>>;

  /// Search for a user by name or account identifier
  async fn find_user(&self, name: &str) -> Result<Option<RemoteUser>>;

  /// Submit a completed issue-creation request
  async fn create_issue(&self, input: &IssueInput) -> Result<CreatedIssue>;

  /// Fetch an issue back by key
  async fn issue(&self, key: &str) -> Result<Issue>;

  /// Upload an attachment to an existing issue
  async fn add_attachment(&self, issue_key: &str, file_name: &str, content: Vec<u8>)
    -> Result<()>;
}

/// Jira remote backed by the gouqi client.
///
/// All JSON endpoints go through gouqi's generic `get`/`post`; attachment
/// upload is multipart and goes straight through reqwest with the same
/// credentials.
#[derive(Clone)]
pub struct JiraRemote {
  client: gouqi::r#async::Jira,
  http: reqwest::Client,
  base_url: Url,
  auth_header: String,
  deployment: Deployment,
}

impl JiraRemote {
  pub fn new(config: &JiraConfig, secret: &str) -> Result<Self> {
    let base_url =
      Url::parse(&config.url).map_err(|_| Error::Config(URI_IS_INCORRECT.to_string()))?;

    // Basic auth when a login is configured, bearer token (PAT) otherwise
    let login = config.login.as_deref().filter(|l| !l.trim().is_empty());
    let (credentials, auth_header) = match login {
      Some(login) => (
        gouqi::Credentials::Basic(login.to_string(), secret.to_string()),
        format!(
          "Basic {}",
          base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", login, secret))
        ),
      ),
      None => (
        gouqi::Credentials::Bearer(secret.to_string()),
        format!("Bearer {}", secret),
      ),
    };

    let client = gouqi::r#async::Jira::new(&config.url, credentials)
      .map_err(|e| Error::Config(format!("Failed to create Jira client: {}", e)))?;

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self {
      client,
      http,
      base_url,
      auth_header,
      deployment: config.resolved_deployment(),
    })
  }

  /// Expanded create-issue metadata: field schemas arrive inline (Cloud and
  /// recent server editions).
  async fn project_schemas_expanded(&self, project_keys: &[String]) -> Result<Vec<ProjectSchemas>> {
    let endpoint = format!(
      "/issue/createmeta?projectKeys={}&expand=projects.issuetypes.fields",
      project_keys.join(",")
    );

    let response: ApiCreateMetaResponse = self
      .client
      .get("api", &endpoint)
      .await
      .map_err(|e| Error::Remote(format!("Failed to get issue creation metadata: {}", e)))?;

    Ok(response.projects.into_iter().map(ProjectSchemas::from).collect())
  }

  /// Server-edition metadata: the batched endpoint only lists issue types,
  /// field schemas come from a paginated per-issue-type endpoint. Any
  /// failure fails the whole batch so the cache never sees a half-populated
  /// project.
  async fn project_schemas_server(&self, project_keys: &[String]) -> Result<Vec<ProjectSchemas>> {
    let endpoint = format!("/issue/createmeta?projectKeys={}", project_keys.join(","));

    let response: ApiCreateMetaResponse = self
      .client
      .get("api", &endpoint)
      .await
      .map_err(|e| Error::Remote(format!("Failed to get issue creation metadata: {}", e)))?;

    let mut out = Vec::new();
    for cim_project in response.projects {
      let mut issue_types = HashMap::new();
      for issue_type in &cim_project.issuetypes {
        let fields = self.issue_type_fields(&cim_project.key, &issue_type.id).await?;
        issue_types.insert(issue_type.name.clone(), fields);
      }
      out.push(ProjectSchemas {
        project_key: cim_project.key,
        issue_types,
      });
    }

    Ok(out)
  }

  async fn issue_type_fields(
    &self,
    project_key: &str,
    issue_type_id: &str,
  ) -> Result<IssueTypeFields> {
    let mut fields = IssueTypeFields::new();
    let mut start_at = 0u64;
    let max_results = 50u64;

    loop {
      let endpoint = format!(
        "/issue/createmeta/{}/issuetypes/{}?startAt={}&maxResults={}",
        project_key, issue_type_id, start_at, max_results
      );

      let page: ApiFieldsPage = self
        .client
        .get("api", &endpoint)
        .await
        .map_err(|e| Error::Remote(format!("Failed to get issue type fields: {}", e)))?;

      let page_count = page.values.len() as u64;
      for info in page.values {
        let fallback = info.name.clone();
        let schema = info.into_schema(&fallback);
        fields.insert(schema.id.clone(), schema);
      }

      if page.is_last || start_at + page_count >= page.total {
        break;
      }
      start_at += max_results;
    }

    Ok(fields)
  }
}

#[async_trait]
impl RemoteApi for JiraRemote {
  async fn all_projects(&self) -> Result<Vec<ProjectStub>> {
    let projects: Vec<ApiProjectStub> = self
      .client
      .get("api", "/project")
      .await
      .map_err(|e| Error::Remote(format!("Failed to get projects: {}", e)))?;

    Ok(projects.into_iter().map(ProjectStub::from).collect())
  }

  async fn project(&self, key: &str) -> Result<Project> {
    let project: ApiProject = self
      .client
      .get("api", &format!("/project/{}", key))
      .await
      .map_err(|e| Error::Remote(format!("Failed to get project {}: {}", key, e)))?;

    Ok(project.into())
  }

  async fn priorities(&self) -> Result<Vec<Priority>> {
    let priorities: Vec<ApiPriority> = self
      .client
      .get("api", "/priority")
      .await
      .map_err(|e| Error::Remote(format!("Failed to get priorities: {}", e)))?;

    Ok(priorities.into_iter().map(Priority::from).collect())
  }

  async fn project_schemas(&self, project_keys: &[String]) -> Result<Vec<ProjectSchemas>> {
    match self.deployment {
      Deployment::Server => self.project_schemas_server(project_keys).await,
      _ => self.project_schemas_expanded(project_keys).await,
    }
  }

  async fn find_user(&self, name: &str) -> Result<Option<RemoteUser>> {
    // Cloud search is query-based, server editions still take username=
    let param = match self.deployment {
      Deployment::Cloud => "query",
      _ => "username",
    };
    let query = url::form_urlencoded::Serializer::new(String::new())
      .append_pair(param, name)
      .finish();

    let users: Vec<ApiUser> = self
      .client
      .get("api", &format!("/user/search?{}", query))
      .await
      .map_err(|e| Error::Remote(format!("Failed to search for user {}: {}", name, e)))?;

    Ok(users.into_iter().next().map(RemoteUser::from))
  }

  async fn create_issue(&self, input: &IssueInput) -> Result<CreatedIssue> {
    let created: ApiCreatedIssue = self
      .client
      .post("api", "/issue", input)
      .await
      .map_err(|e| Error::Remote(format!("Failed to create issue: {}", e)))?;

    Ok(created.into())
  }

  async fn issue(&self, key: &str) -> Result<Issue> {
    let issue: ApiIssue = self
      .client
      .get(
        "api",
        &format!("/issue/{}?fields=summary,description,project,issuetype", key),
      )
      .await
      .map_err(|e| Error::Remote(format!("Failed to get issue {}: {}", key, e)))?;

    Ok(issue.into_issue())
  }

  async fn add_attachment(
    &self,
    issue_key: &str,
    file_name: &str,
    content: Vec<u8>,
  ) -> Result<()> {
    let url = format!(
      "{}/rest/api/latest/issue/{}/attachments",
      self.base_url.as_str().trim_end_matches('/'),
      issue_key
    );

    let part = reqwest::multipart::Part::bytes(content).file_name(file_name.to_string());
    let form = reqwest::multipart::Form::new().part("file", part);

    let response = self
      .http
      .post(&url)
      .header("Authorization", &self.auth_header)
      .header("X-Atlassian-Token", "no-check")
      .multipart(form)
      .send()
      .await
      .map_err(|e| Error::Remote(format!("Failed to upload attachment: {}", e)))?;

    if !response.status().is_success() {
      return Err(Error::Remote(format!(
        "Failed to upload attachment to {}: {}",
        issue_key,
        response.status()
      )));
    }

    Ok(())
  }
}

// ============================================================================
// Test fake
// ============================================================================
