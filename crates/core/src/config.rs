use crate::transcript::ProviderKind;
use std::path::PathBuf;

pub const DEFAULT_MANIFEST: &str = "manifest.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_REPORT_DIR: &str = ".";
pub const DEFAULT_DIFF_BASE_URL: &str = "https://sul-dlss.github.io/whisper-pilot";
pub const DEFAULT_WHISPER_COMMAND: &str = "whisper";
pub const ENV_WHISPER_COMMAND: &str = "WHISPER_COMMAND";
pub const ENV_GOOGLE_SPEECH_ENDPOINT: &str = "GOOGLE_SPEECH_ENDPOINT";
pub const ENV_AWS_TRANSCRIBE_ENDPOINT: &str = "AWS_TRANSCRIBE_ENDPOINT";

/// Fully resolved settings for one benchmark invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub manifest: PathBuf,
    pub output_dir: PathBuf,
    pub report_dir: PathBuf,
    pub provider: ProviderKind,
    pub diff_base_url: String,
    pub whisper_command: String,
    /// Job API endpoint for the cloud providers; unused for the local one.
    pub endpoint: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown provider: {0} (expected whisper, google or aws)")]
    UnknownProvider(String),
    #[error("no endpoint configured for provider {0}")]
    MissingEndpoint(ProviderKind),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn parse_provider(value: &str) -> Result<ProviderKind, ConfigError> {
    ProviderKind::parse(value).ok_or_else(|| ConfigError::UnknownProvider(value.to_owned()))
}

/// Which env var carries the job endpoint for a cloud provider.
pub fn endpoint_env_key(kind: ProviderKind) -> Option<&'static str> {
    match kind {
        ProviderKind::Whisper => None,
        ProviderKind::Google => Some(ENV_GOOGLE_SPEECH_ENDPOINT),
        ProviderKind::Aws => Some(ENV_AWS_TRANSCRIBE_ENDPOINT),
    }
}

pub fn resolve_endpoint(
    cli_value: Option<String>,
    kind: ProviderKind,
    env: &impl Env,
) -> Result<Option<String>, ConfigError> {
    let Some(env_key) = endpoint_env_key(kind) else {
        return Ok(None);
    };
    resolve_optional_string(cli_value, env_key, env)
        .ok_or(ConfigError::MissingEndpoint(kind))
        .map(Some)
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_round_trip() {
        assert_eq!(parse_provider("whisper"), Ok(ProviderKind::Whisper));
        assert_eq!(parse_provider("google"), Ok(ProviderKind::Google));
        assert_eq!(parse_provider("aws"), Ok(ProviderKind::Aws));
        assert_eq!(
            parse_provider("azure"),
            Err(ConfigError::UnknownProvider("azure".to_owned()))
        );
    }

    #[test]
    fn local_provider_needs_no_endpoint() {
        let env = MapEnv::default();
        assert_eq!(resolve_endpoint(None, ProviderKind::Whisper, &env), Ok(None));
    }

    #[test]
    fn cloud_provider_without_endpoint_is_an_error() {
        let env = MapEnv::default();
        assert_eq!(
            resolve_endpoint(None, ProviderKind::Google, &env),
            Err(ConfigError::MissingEndpoint(ProviderKind::Google))
        );
    }

    #[test]
    fn endpoint_cli_takes_precedence_over_env() {
        let env = MapEnv::default().with_var(ENV_AWS_TRANSCRIBE_ENDPOINT, "https://env.test");
        let endpoint =
            resolve_endpoint(Some("https://cli.test".to_owned()), ProviderKind::Aws, &env);
        assert_eq!(endpoint, Ok(Some("https://cli.test".to_owned())));
    }

    #[test]
    fn endpoint_env_used_when_cli_missing() {
        let env = MapEnv::default().with_var(ENV_GOOGLE_SPEECH_ENDPOINT, "https://env.test");
        let endpoint = resolve_endpoint(None, ProviderKind::Google, &env);
        assert_eq!(endpoint, Ok(Some("https://env.test".to_owned())));
    }

    #[test]
    fn resolve_string_with_default_falls_back() {
        let env = MapEnv::default();
        let v = resolve_string_with_default(None, ENV_WHISPER_COMMAND, &env, "whisper");
        assert_eq!(v, "whisper");
    }
}
