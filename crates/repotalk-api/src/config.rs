use config::{Config as ConfigLoader, ConfigError, Environment, File, FileFormat};
use repotalk_assistant::{AssistantConfig, ClientConfig, RunPoller};
use repotalk_ingest::Workspace;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub assistant: AssistantSection,
    pub poll: PollConfig,
    pub workspace: WorkspaceConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantSection {
    pub name: String,
    pub model: String,
    /// System prompt uploaded at startup
    pub instructions_path: PathBuf,
    /// Delete and recreate an existing assistant with the same name
    pub recreate: bool,
}

impl Default for AssistantSection {
    fn default() -> Self {
        Self {
            name: "repo_talk_01".to_string(),
            model: "gpt-4o-mini".to_string(),
            instructions_path: PathBuf::from("./instructions.md"),
            recreate: false,
        }
    }
}

impl From<&AssistantSection> for AssistantConfig {
    fn from(section: &AssistantSection) -> Self {
        AssistantConfig::new(&section.name, &section.model)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        let poller = RunPoller::default();
        Self {
            interval_ms: poller.interval().as_millis() as u64,
            timeout_secs: poller.timeout().as_secs(),
        }
    }
}

impl From<&PollConfig> for RunPoller {
    fn from(config: &PollConfig) -> Self {
        RunPoller::new(
            Duration::from_millis(config.interval_ms),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub repos_dir: PathBuf,
    pub bundles_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            repos_dir: PathBuf::from("./repos"),
            bundles_dir: PathBuf::from("./bundles"),
        }
    }
}

impl From<&WorkspaceConfig> for Workspace {
    fn from(config: &WorkspaceConfig) -> Self {
        Workspace::new(&config.repos_dir, &config.bundles_dir)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set, `dev` otherwise)
    /// 3. Environment variables, e.g. `REPOTALK_SERVER__PORT=9000`
    ///
    /// `OPENAI_API_KEY` is required; `OPENAI_BASE_URL` is optional.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("REPOTALK")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.origins")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;

        cfg.openai_api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            ConfigError::Message("OPENAI_API_KEY environment variable is required".to_string())
        })?;
        cfg.openai_base_url = std::env::var("OPENAI_BASE_URL").ok().filter(|url| !url.is_empty());

        Ok(cfg)
    }

    /// Parse a TOML document on top of the defaults. Secrets are left empty.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn client_config(&self) -> ClientConfig {
        let client = ClientConfig::new(&self.openai_api_key);
        match &self.openai_base_url {
            Some(url) => client.with_base_url(url),
            None => client,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 3000

            [cors]
            enabled = true
            origins = ["http://localhost:5173"]

            [assistant]
            name = "repo_talk_test"
            model = "gpt-4o"
            recreate = true

            [poll]
            interval_ms = 50
            timeout_secs = 10

            [workspace]
            repos_dir = "/tmp/repos"
            bundles_dir = "/tmp/bundles"

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.cors.origins, vec!["http://localhost:5173"]);
        assert!(config.assistant.recreate);
        assert_eq!(config.logging.format, "json");

        let poller = RunPoller::from(&config.poll);
        assert_eq!(poller.interval(), Duration::from_millis(50));
        assert_eq!(poller.timeout(), Duration::from_secs(10));

        let workspace = Workspace::from(&config.workspace);
        assert_eq!(workspace.repos_dir(), std::path::Path::new("/tmp/repos"));
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = Config::from_toml("[server]\nport = 9000\n").unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.assistant.name, "repo_talk_01");
        assert_eq!(config.assistant.instructions_path, PathBuf::from("./instructions.md"));
        assert_eq!(config.poll.interval_ms, 300);
        assert_eq!(config.poll.timeout_secs, 600);
        assert_eq!(config.cors.origins, vec!["*"]);
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert!(config.openai_api_key.is_empty());
    }

    #[test]
    fn test_client_config_base_url() {
        let mut config = Config::default();
        config.openai_api_key = "sk-test".to_string();
        assert_eq!(config.client_config().base_url(), repotalk_assistant::config::OPENAI_API_BASE);

        config.openai_base_url = Some("http://localhost:1234/v1/".to_string());
        assert_eq!(config.client_config().base_url(), "http://localhost:1234/v1");
    }
}
