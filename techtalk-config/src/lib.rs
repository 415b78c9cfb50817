//! Loader for Tech Talk configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, YAML files (in the order they
//! were attached), inline YAML snippets, then `TECHTALK__`-prefixed
//! environment variables (`TECHTALK__EMAIL__SMTP_PORT=2525`). After merging,
//! `${VAR}` placeholders in any string are expanded from the process
//! environment; unknown variables are left untouched.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "TECHTALK";

const DEFAULTS_YAML: &str = r#"
server:
  bind: "127.0.0.1:8000"
  cors_origins: ["http://localhost:3000"]
database:
  url: "sqlite://techtalk.db?mode=rwc"
llm:
  provider: openai
  model: "gpt-3.5-turbo"
  auth_token: "${OPENAI_API_KEY}"
fetch:
  user_agent: "Mozilla/5.0 (compatible; TechTalkBot/1.0)"
  timeout_secs: 10
  max_chars: 8000
email:
  smtp_server: "smtp.gmail.com"
  smtp_port: 587
  recipients: []
scheduler:
  enabled: true
  weekly_digest: "0 9 * * Mon"
  status_log: "0 8 * * *"
logging:
  format: text
  stderr: true
  filter: "info"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct TechTalkConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub fetch: FetchConfig,
    pub email: EmailConfig,
    pub scheduler: SchedulerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Openai {
        model: String,
        #[serde(default, deserialize_with = "lenient_string")]
        auth_token: String,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
    },
}

impl LlmConfig {
    /// The API key, or `None` when it is empty or still an unexpanded placeholder.
    pub fn api_key(&self) -> Option<&str> {
        match self {
            LlmConfig::Openai { auth_token, .. } => {
                let token = auth_token.trim();
                (!token.is_empty() && !token.contains("${")).then_some(token)
            }
        }
    }
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".into()
}

/// Outbound page fetch settings for URL analysis.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_chars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub password: Option<String>,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl EmailConfig {
    /// Recipients with surrounding whitespace removed and blanks dropped.
    pub fn recipient_list(&self) -> Vec<String> {
        self.recipients
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub weekly_digest: String,
    pub status_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub format: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    pub stderr: bool,
    pub filter: String,
}

// Typed env parsing turns numeric-looking secrets into numbers; accept both.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

enum Layer {
    File { path: PathBuf, required: bool },
    Yaml(String),
}

/// Builder hides the `config` crate wiring (defaults + YAML + env overrides).
pub struct TechTalkConfigLoader {
    layers: Vec<Layer>,
    env_prefix: String,
}

impl Default for TechTalkConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TechTalkConfigLoader {
    /// Start from the built-in defaults with `TECHTALK__` env overrides.
    ///
    /// ```
    /// use techtalk_config::TechTalkConfigLoader;
    ///
    /// let config = TechTalkConfigLoader::new()
    ///     .with_env_prefix("TECHTALK_DOCTEST_UNUSED")
    ///     .load()
    ///     .expect("defaults load");
    ///
    /// assert_eq!(config.server.bind, "127.0.0.1:8000");
    /// assert_eq!(config.fetch.timeout_secs, 10);
    /// assert_eq!(config.email.smtp_port, 587);
    /// ```
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.layers.push(Layer::File {
            path: path.as_ref().to_path_buf(),
            required: true,
        });
        self
    }

    /// Attach a file that is silently skipped when missing, so deployments can
    /// rely purely on environment variables.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.layers.push(Layer::File {
            path: path.as_ref().to_path_buf(),
            required: false,
        });
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use techtalk_config::{LlmConfig, TechTalkConfigLoader};
    ///
    /// let cfg = TechTalkConfigLoader::new()
    ///     .with_env_prefix("TECHTALK_DOCTEST_UNUSED")
    ///     .with_yaml_str(
    ///         r#"
    /// llm:
    ///   provider: openai
    ///   model: "gpt-4o-mini"
    ///   auth_token: "sk-test"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.llm.api_key(), Some("sk-test"));
    /// let LlmConfig::Openai { endpoint, .. } = &cfg.llm;
    /// assert_eq!(endpoint, "https://api.openai.com/v1");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.layers.push(Layer::Yaml(yaml.to_string()));
        self
    }

    /// Override the environment prefix (mainly for tests).
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    pub fn load(self) -> Result<TechTalkConfig, ConfigError> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULTS_YAML, FileFormat::Yaml));

        for layer in self.layers {
            builder = match layer {
                Layer::File { path, required } => {
                    builder.add_source(File::from(path.as_path()).required(required))
                }
                Layer::Yaml(yaml) => builder.add_source(File::from_str(&yaml, FileFormat::Yaml)),
            };
        }

        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("email.recipients")
                .with_list_parse_key("server.cors_origins"),
        );

        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: TechTalkConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("CITY", Some("Seoul")), ("GU", Some("Gangnam"))], || {
            let mut v = json!([
                "hello-$CITY",
                { "loc": "${CITY}-${GU}" },
                42,
                true,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["hello-Seoul", { "loc": "Seoul-Gangnam" }, 42, true, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${TECHTALK_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${TECHTALK_DOES_NOT_EXIST}"));
    }

    #[test]
    fn unexpanded_api_key_counts_as_missing() {
        let llm = LlmConfig::Openai {
            model: "gpt-3.5-turbo".into(),
            auth_token: "${OPENAI_API_KEY}".into(),
            endpoint: default_openai_endpoint(),
        };
        assert_eq!(llm.api_key(), None);
    }

    #[test]
    fn recipient_list_drops_blanks() {
        let email = EmailConfig {
            smtp_server: "smtp.example.com".into(),
            smtp_port: 587,
            username: None,
            password: None,
            sender: None,
            recipients: vec![" a@example.com ".into(), "".into(), "b@example.com".into()],
        };
        assert_eq!(email.recipient_list(), vec!["a@example.com", "b@example.com"]);
    }
}
