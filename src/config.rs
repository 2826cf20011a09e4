use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub jira: JiraConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
  /// Auto-detect based on URL: .atlassian.net = cloud, else server
  #[default]
  Auto,
  /// Jira Cloud - account-id based user identities, query-based user search
  Cloud,
  /// Jira Server / Data Center - username identities, per-issue-type field metadata
  Server,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
  pub url: String,
  /// Login for basic auth. When absent the secret is sent as a bearer token (PAT).
  pub login: Option<String>,
  #[serde(default)]
  pub deployment: Deployment,
  /// Drop `versions`/`fixVersions` extra fields instead of submitting them.
  /// Useful for projects that don't track versions but share issue templates.
  #[serde(default)]
  pub skip_versions: bool,
}

impl JiraConfig {
  /// Resolve `Deployment::Auto` against the configured URL.
  pub fn resolved_deployment(&self) -> Deployment {
    match self.deployment {
      Deployment::Auto => {
        if self.url.contains(".atlassian.net") {
          Deployment::Cloud
        } else {
          Deployment::Server
        }
      }
      other => other,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./jira-bridge.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/jira-bridge/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::Config(format!(
          "Config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(Error::Config(
        "No configuration file found. Create one at ~/.config/jira-bridge/config.yaml".to_string(),
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("jira-bridge.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("jira-bridge").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = serde_yaml::from_str(&contents).map_err(|e| {
      Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;

    Ok(config)
  }

  /// Get the Jira API secret (token or password) from environment variables.
  ///
  /// Checks JIRA_BRIDGE_TOKEN first, then JIRA_API_TOKEN as fallback.
  pub fn get_api_secret() -> Result<String> {
    std::env::var("JIRA_BRIDGE_TOKEN")
      .or_else(|_| std::env::var("JIRA_API_TOKEN"))
      .map_err(|_| {
        Error::Config(
          "Jira API token not found. Set JIRA_BRIDGE_TOKEN or JIRA_API_TOKEN environment variable."
            .to_string(),
        )
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config_with_url(url: &str) -> JiraConfig {
    JiraConfig {
      url: url.to_string(),
      login: None,
      deployment: Deployment::Auto,
      skip_versions: false,
    }
  }

  #[test]
  fn test_auto_detects_cloud() {
    let cfg = config_with_url("https://acme.atlassian.net");
    assert_eq!(cfg.resolved_deployment(), Deployment::Cloud);
  }

  #[test]
  fn test_auto_detects_server() {
    let cfg = config_with_url("https://jira.internal.example.com");
    assert_eq!(cfg.resolved_deployment(), Deployment::Server);
  }

  #[test]
  fn test_explicit_deployment_wins() {
    let mut cfg = config_with_url("https://acme.atlassian.net");
    cfg.deployment = Deployment::Server;
    assert_eq!(cfg.resolved_deployment(), Deployment::Server);
  }

  #[test]
  fn test_parse_yaml() {
    let yaml = r#"
jira:
  url: https://acme.atlassian.net
  login: bugs@acme.example
  skip_versions: true
"#;
    let cfg: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.jira.url, "https://acme.atlassian.net");
    assert_eq!(cfg.jira.login.as_deref(), Some("bugs@acme.example"));
    assert!(cfg.jira.skip_versions);
    assert_eq!(cfg.jira.deployment, Deployment::Auto);
  }
}
