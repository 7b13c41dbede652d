use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

/// Legacy variable the token service and its clients share the key through.
pub const INTERNAL_API_KEY_VAR: &str = "INTERNAL_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub git: GitConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// Internal token service.
#[derive(Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub internal_api_key: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

// Manual Debug impl to avoid leaking the internal API key
impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("internal_api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_pr_body")]
    pub default_pr_body: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GitBackend {
    /// External `git` executable.
    #[default]
    Cli,
    /// In-process libgit2.
    Libgit2,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GitConfig {
    #[serde(default)]
    pub backend: GitBackend,
    #[serde(default = "default_git_program")]
    pub program: String,
    #[serde(default = "default_git_timeout")]
    pub timeout_secs: u64,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_dir")]
    pub base_dir: PathBuf,
    /// Leave ephemeral checkouts on disk after a run.
    #[serde(default)]
    pub keep: bool,
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    "repo-pilot".to_string()
}

fn default_pr_body() -> String {
    "This PR was created automatically by the internal API service.".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

fn default_git_program() -> String {
    "git".to_string()
}

fn default_git_timeout() -> u64 {
    300
}

fn default_workspace_dir() -> PathBuf {
    std::env::temp_dir().join("repo-pilot-workspaces")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            internal_api_key: String::new(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            default_pr_body: default_pr_body(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            backend: GitBackend::default(),
            program: default_git_program(),
            timeout_secs: default_git_timeout(),
            author_name: None,
            author_email: None,
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            base_dir: default_workspace_dir(),
            keep: false,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GitHubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AppConfig {
    /// Load and validate the configuration.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Lowest precedence: the variable the token service itself reads
        if let Ok(key) = std::env::var(INTERNAL_API_KEY_VAR) {
            builder = builder
                .set_default("service.internal_api_key", key)
                .map_err(|e| AppError::Config(e.to_string()))?;
        }

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("repo-pilot").required(false));
        }

        // Environment variable overrides with REPO_PILOT_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("REPO_PILOT")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Startup checks. Nothing runs when these fail.
    pub fn validate(&self) -> Result<()> {
        if self.service.internal_api_key.trim().is_empty() {
            return Err(AppError::Config(format!(
                "{INTERNAL_API_KEY_VAR} environment variable not set. \
                 Set it with: export {INTERNAL_API_KEY_VAR}='your_static_key_here'"
            )));
        }
        if self.service.base_url.trim().is_empty() {
            return Err(AppError::Config("service.base_url must not be empty".to_string()));
        }
        if self.github.api_url.trim().is_empty() {
            return Err(AppError::Config("github.api_url must not be empty".to_string()));
        }
        Ok(())
    }
}
