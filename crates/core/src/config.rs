use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub outreach: OutreachConfig,
    pub llm: LlmConfig,
    pub relay: RelayConfig,
    pub auth: AuthConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct OutreachConfig {
    pub default_subject: String,
    pub default_body_template: String,
    pub default_window_minutes: u64,
    pub default_poll_interval_secs: u64,
    /// Floor applied to caller-supplied poll intervals; sub-floor requests
    /// are rejected at the facade.
    pub min_poll_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
}

/// Outbound email relay: messages are POSTed to this webhook, signed with
/// the shared secret, by the HTTP relay provider.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub url: Option<String>,
    pub webhook_secret: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub token: Option<SecretString>,
    pub scopes: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Forces the scripted demo sequencer on or off. When unset, simulation
    /// engages automatically whenever no LLM api key is configured.
    pub force_offline: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub llm_api_key: Option<String>,
    pub relay_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub auth_token: Option<String>,
    pub force_offline: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8001 },
            outreach: OutreachConfig {
                default_subject: "Hackathon Invitation".to_string(),
                default_body_template: "Hi {{ name }}, we'd love to invite you.".to_string(),
                default_window_minutes: 30,
                default_poll_interval_secs: 20,
                min_poll_interval_secs: 1,
            },
            llm: LlmConfig { api_key: None, model: "gpt-3.5-turbo".to_string() },
            relay: RelayConfig { url: None, webhook_secret: None },
            auth: AuthConfig { token: None, scopes: Vec::new() },
            simulation: SimulationConfig { force_offline: None },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("concierge.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Whether runs should use the scripted demo sequencer instead of the
    /// real flow engine.
    pub fn offline(&self) -> bool {
        self.simulation.force_offline.unwrap_or_else(|| self.llm.api_key.is_none())
    }

    pub fn default_window(&self) -> Duration {
        Duration::from_secs(self.outreach.default_window_minutes * 60)
    }

    pub fn default_poll_interval(&self) -> Duration {
        Duration::from_secs(self.outreach.default_poll_interval_secs)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(outreach) = patch.outreach {
            if let Some(subject) = outreach.default_subject {
                self.outreach.default_subject = subject;
            }
            if let Some(template) = outreach.default_body_template {
                self.outreach.default_body_template = template;
            }
            if let Some(window) = outreach.default_window_minutes {
                self.outreach.default_window_minutes = window;
            }
            if let Some(poll) = outreach.default_poll_interval_secs {
                self.outreach.default_poll_interval_secs = poll;
            }
            if let Some(floor) = outreach.min_poll_interval_secs {
                self.outreach.min_poll_interval_secs = floor;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
        }

        if let Some(relay) = patch.relay {
            if let Some(url) = relay.url {
                self.relay.url = Some(url);
            }
            if let Some(webhook_secret) = relay.webhook_secret {
                self.relay.webhook_secret = Some(secret_value(webhook_secret));
            }
        }

        if let Some(auth) = patch.auth {
            if let Some(token) = auth.token {
                self.auth.token = Some(secret_value(token));
            }
            if let Some(scopes) = auth.scopes {
                self.auth.scopes = scopes;
            }
        }

        if let Some(simulation) = patch.simulation {
            if let Some(force_offline) = simulation.force_offline {
                self.simulation.force_offline = Some(force_offline);
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CONCIERGE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CONCIERGE_SERVER_PORT") {
            self.server.port = parse_u16("CONCIERGE_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_OUTREACH_DEFAULT_SUBJECT") {
            self.outreach.default_subject = value;
        }
        if let Some(value) = read_env("CONCIERGE_OUTREACH_DEFAULT_BODY_TEMPLATE") {
            self.outreach.default_body_template = value;
        }
        if let Some(value) = read_env("CONCIERGE_OUTREACH_DEFAULT_WINDOW_MINUTES") {
            self.outreach.default_window_minutes =
                parse_u64("CONCIERGE_OUTREACH_DEFAULT_WINDOW_MINUTES", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_OUTREACH_DEFAULT_POLL_INTERVAL_SECS") {
            self.outreach.default_poll_interval_secs =
                parse_u64("CONCIERGE_OUTREACH_DEFAULT_POLL_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("CONCIERGE_OUTREACH_MIN_POLL_INTERVAL_SECS") {
            self.outreach.min_poll_interval_secs =
                parse_u64("CONCIERGE_OUTREACH_MIN_POLL_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("CONCIERGE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CONCIERGE_LLM_MODEL") {
            self.llm.model = value;
        }

        if let Some(value) = read_env("CONCIERGE_RELAY_URL") {
            self.relay.url = Some(value);
        }
        if let Some(value) = read_env("CONCIERGE_RELAY_WEBHOOK_SECRET") {
            self.relay.webhook_secret = Some(secret_value(value));
        }

        if let Some(value) = read_env("CONCIERGE_AUTH_TOKEN") {
            self.auth.token = Some(secret_value(value));
        }
        if let Some(value) = read_env("CONCIERGE_AUTH_SCOPES") {
            self.auth.scopes =
                value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
        }

        if let Some(value) = read_env("CONCIERGE_OFFLINE") {
            self.simulation.force_offline = Some(parse_bool("CONCIERGE_OFFLINE", &value)?);
        }

        if let Some(value) = read_env("CONCIERGE_LOGGING_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("CONCIERGE_LOGGING_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(relay_url) = overrides.relay_url {
            self.relay.url = Some(relay_url);
        }
        if let Some(webhook_secret) = overrides.webhook_secret {
            self.relay.webhook_secret = Some(secret_value(webhook_secret));
        }
        if let Some(auth_token) = overrides.auth_token {
            self.auth.token = Some(secret_value(auth_token));
        }
        if let Some(force_offline) = overrides.force_offline {
            self.simulation.force_offline = Some(force_offline);
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port must be non-zero".to_string()));
        }

        if self.outreach.min_poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "outreach.min_poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.outreach.default_poll_interval_secs < self.outreach.min_poll_interval_secs {
            return Err(ConfigError::Validation(format!(
                "outreach.default_poll_interval_secs must be at least the floor of {}",
                self.outreach.min_poll_interval_secs
            )));
        }
        // A week-long window is already generous for reply polling.
        if self.outreach.default_window_minutes > 7 * 24 * 60 {
            return Err(ConfigError::Validation(
                "outreach.default_window_minutes must be at most one week".to_string(),
            ));
        }
        if self.outreach.default_subject.trim().is_empty() {
            return Err(ConfigError::Validation(
                "outreach.default_subject must not be empty".to_string(),
            ));
        }

        if let Some(url) = &self.relay.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Validation(
                    "relay.url must be an http(s) URL".to_string(),
                ));
            }
            if self.relay.webhook_secret.as_ref().map_or(true, |secret| {
                secret.expose_secret().is_empty()
            }) {
                return Err(ConfigError::Validation(
                    "relay.webhook_secret is required when relay.url is set".to_string(),
                ));
            }
        }

        if let Some(token) = &self.auth.token {
            if token.expose_secret().len() < 16 {
                return Err(ConfigError::Validation(
                    "auth.token must be at least 16 characters".to_string(),
                ));
            }
            if self.auth.scopes.is_empty() {
                return Err(ConfigError::Validation(
                    "auth.scopes must name at least one scope when auth.token is set".to_string(),
                ));
            }
        }

        self.logging.level.parse::<tracing::Level>().map_err(|_| {
            ConfigError::Validation(format!(
                "logging.level `{}` is not a valid tracing level",
                self.logging.level
            ))
        })?;

        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("concierge.toml"), PathBuf::from("config/concierge.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    outreach: Option<OutreachPatch>,
    llm: Option<LlmPatch>,
    relay: Option<RelayPatch>,
    auth: Option<AuthPatch>,
    simulation: Option<SimulationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct OutreachPatch {
    default_subject: Option<String>,
    default_body_template: Option<String>,
    default_window_minutes: Option<u64>,
    default_poll_interval_secs: Option<u64>,
    min_poll_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    api_key: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RelayPatch {
    url: Option<String>,
    webhook_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthPatch {
    token: Option<String>,
    scopes: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct SimulationPatch {
    force_offline: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};

    fn load_with(overrides: ConfigOverrides) -> Result<AppConfig, ConfigError> {
        AppConfig::load(LoadOptions {
            config_path: Some(std::path::PathBuf::from("/nonexistent/concierge.toml")),
            require_file: false,
            overrides,
        })
    }

    #[test]
    fn defaults_validate_and_report_offline_without_llm_key() {
        let config = load_with(ConfigOverrides::default()).expect("defaults should validate");
        assert!(config.offline(), "no api key means simulation mode");
        assert_eq!(config.default_window(), Duration::from_secs(30 * 60));
        assert_eq!(config.default_poll_interval(), Duration::from_secs(20));
    }

    #[test]
    fn llm_key_switches_off_simulation_unless_forced() {
        let with_key = load_with(ConfigOverrides {
            llm_api_key: Some("sk-test".to_string()),
            ..ConfigOverrides::default()
        })
        .expect("load");
        assert!(!with_key.offline());

        let forced = load_with(ConfigOverrides {
            llm_api_key: Some("sk-test".to_string()),
            force_offline: Some(true),
            ..ConfigOverrides::default()
        })
        .expect("load");
        assert!(forced.offline());
    }

    #[test]
    fn relay_url_requires_a_webhook_secret() {
        let result = load_with(ConfigOverrides {
            relay_url: Some("https://relay.example.com/send".to_string()),
            ..ConfigOverrides::default()
        });

        let message = result.err().expect("must fail validation").to_string();
        assert!(message.contains("relay.webhook_secret"));

        load_with(ConfigOverrides {
            relay_url: Some("https://relay.example.com/send".to_string()),
            webhook_secret: Some("shared-secret".to_string()),
            ..ConfigOverrides::default()
        })
        .expect("secret satisfies validation");
    }

    #[test]
    fn auth_token_requires_scopes_and_minimum_length() {
        let short = load_with(ConfigOverrides {
            auth_token: Some("short".to_string()),
            ..ConfigOverrides::default()
        });
        assert!(short.err().expect("short token rejected").to_string().contains("16 characters"));
    }

    #[test]
    fn config_file_patch_and_env_interpolation_apply() {
        std::env::set_var("CONCIERGE_TEST_SUBJECT", "Judge our hackathon");
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[outreach]\ndefault_subject = \"${{CONCIERGE_TEST_SUBJECT}}\"\ndefault_window_minutes = 5\n\n[auth]\ntoken = \"a-sufficiently-long-token\"\nscopes = [\"outreach:run\"]\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("file config should load");

        assert_eq!(config.outreach.default_subject, "Judge our hackathon");
        assert_eq!(config.outreach.default_window_minutes, 5);
        assert_eq!(config.auth.scopes, vec!["outreach:run".to_string()]);
        std::env::remove_var("CONCIERGE_TEST_SUBJECT");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some(std::path::PathBuf::from("/nonexistent/concierge.toml")),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn poll_interval_floor_is_enforced() {
        let mut config = AppConfig::default();
        config.outreach.min_poll_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.outreach.default_poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
