//! Configuration management for `deplabel`.
//!
//! Settings are read from layered sources, highest precedence first:
//! - Process environment
//! - A dotenv file (`.env` in the working directory, or `--env-file`)
//! - A YAML config file (`deplabel.yaml` in the working directory, or `--config`)
//! - Built-in defaults
//!
//! Every source speaks the same keys (`JIRA_BASE_URL`, `JIRA_CORE_JQL`, ...).
//! The YAML file also accepts the lowercase key without the `JIRA_` prefix
//! (`base_url`, `core_jql`) and YAML lists for list-valued keys. YAML list
//! items are kept whole; only plain string values are split on commas.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use deplabel_lib::links::{DEFAULT_IGNORED_LINK_NAMES, DEFAULT_LINK_NAMES};
use deplabel_lib::model::LinkDirection;
use deplabel_lib::{
    IgnoredStatusPolicy, LinkPolicy, Result, ScopeSelector, SyncError, SyncSettings,
    TrackedLabels,
};

use crate::jira::AuthMode;

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_CONFIG_FILE: &str = "deplabel.yaml";

pub const DEFAULT_DEPENDENCY_LABEL: &str = "DFS_CORE_Dependencies";
pub const DEFAULT_CORE_ISSUE_TYPES: &[&str] = &["Initiative", "Epic", "Story"];
pub const DEFAULT_LINK_DIRECTIONS: &[&str] = &["inward", "outward"];
pub const DEFAULT_IGNORED_STATUSES: &[&str] = &["Canceled"];
pub const DEFAULT_TOKEN_ENV_VAR: &str = "JIRA_PAT";
pub const DEFAULT_EMAIL_ENV_VAR: &str = "JIRA_EMAIL";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MAX_PAGES: u32 = 10_000;
pub const DEFAULT_AUDIT_DIR: &str = "audit_logs";

/// Where a layer of values came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerSource {
    Environment,
    DotEnv(PathBuf),
    File(PathBuf),
}

impl fmt::Display for LayerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => f.write_str("environment"),
            Self::DotEnv(path) => write!(f, "dotenv file {}", path.display()),
            Self::File(path) => write!(f, "config file {}", path.display()),
        }
    }
}

/// One raw setting as a layer supplied it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerValue {
    Text(String),
    /// A YAML sequence. Items may contain commas.
    List(Vec<String>),
}

impl LayerValue {
    fn is_blank(&self) -> bool {
        match self {
            Self::Text(value) => value.trim().is_empty(),
            Self::List(items) => items.iter().all(|item| item.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone)]
struct Layer {
    source: LayerSource,
    values: BTreeMap<String, LayerValue>,
}

/// Ordered key/value layers. Lookups return the first non-blank value.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    layers: Vec<Layer>,
}

impl ConfigLayers {
    /// No layers at all; every lookup misses.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the process environment, the dotenv file and the YAML file.
    ///
    /// Default file locations that do not exist are skipped. An explicitly
    /// requested file that does not exist is an error.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a file is missing, unreadable or malformed.
    pub fn load(env_file: Option<&Path>, config_file: Option<&Path>) -> Result<Self> {
        let layers = Self::empty().with_layer(LayerSource::Environment, std::env::vars());
        let layers = match locate(env_file, DEFAULT_ENV_FILE)? {
            Some(path) => {
                let values = read_dotenv(&path)?;
                layers.with_layer(LayerSource::DotEnv(path), values)
            }
            None => layers,
        };
        let layers = match locate(config_file, DEFAULT_CONFIG_FILE)? {
            Some(path) => {
                let values = read_yaml(&path)?;
                layers.with_values(LayerSource::File(path), values)
            }
            None => layers,
        };
        Ok(layers)
    }

    /// Append a lower-precedence layer of plain string values.
    #[must_use]
    pub fn with_layer<I, K, V>(self, source: LayerSource, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.with_values(
            source,
            values
                .into_iter()
                .map(|(key, value)| (key.into(), LayerValue::Text(value.into())))
                .collect(),
        )
    }

    /// Append a lower-precedence layer.
    #[must_use]
    pub fn with_values(mut self, source: LayerSource, values: BTreeMap<String, LayerValue>) -> Self {
        self.layers.push(Layer { source, values });
        self
    }

    /// First non-blank string value for `key`. A list value only answers
    /// list-valued settings.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.lookup(key) {
            Some((LayerValue::Text(value), _)) => Some(value),
            _ => None,
        }
    }

    /// Source of the value [`Self::get`] would return.
    #[must_use]
    pub fn source_of(&self, key: &str) -> Option<&LayerSource> {
        self.lookup(key).map(|(_, source)| source)
    }

    /// Layers in precedence order.
    pub fn sources(&self) -> impl Iterator<Item = &LayerSource> {
        self.layers.iter().map(|layer| &layer.source)
    }

    fn lookup(&self, key: &str) -> Option<(&LayerValue, &LayerSource)> {
        self.layers.iter().find_map(|layer| {
            layer
                .values
                .get(key)
                .filter(|value| !value.is_blank())
                .map(|value| (value, &layer.source))
        })
    }

    fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| value.trim().to_string())
    }

    fn list(&self, key: &str, default: &[&str]) -> Vec<String> {
        let values: Vec<String> = match self.lookup(key) {
            Some((LayerValue::Text(raw), _)) => split_list(raw),
            Some((LayerValue::List(items), _)) => items
                .iter()
                .map(String::as_str)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToString::to_string)
                .collect(),
            None => Vec::new(),
        };
        if values.is_empty() {
            default.iter().map(ToString::to_string).collect()
        } else {
            values
        }
    }

    fn parsed<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| {
                SyncError::Config(format!("{key} must be a non-negative integer, got '{}'", raw.trim()))
            }),
        }
    }
}

fn locate(explicit: Option<&Path>, default: &str) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(SyncError::Config(format!(
            "Config file not found: {}",
            path.display()
        ))),
        None => {
            let path = PathBuf::from(default);
            Ok(path.is_file().then_some(path))
        }
    }
}

fn read_dotenv(path: &Path) -> Result<BTreeMap<String, String>> {
    let entries = dotenvy::from_path_iter(path)
        .map_err(|e| SyncError::Config(format!("Failed to read {}: {e}", path.display())))?;
    entries
        .map(|entry| {
            entry.map_err(|e| SyncError::Config(format!("Failed to parse {}: {e}", path.display())))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YamlScalar {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for YamlScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YamlValue {
    List(Vec<YamlScalar>),
    Scalar(YamlScalar),
}

impl From<YamlValue> for LayerValue {
    fn from(value: YamlValue) -> Self {
        match value {
            YamlValue::Scalar(scalar) => Self::Text(scalar.to_string()),
            YamlValue::List(items) => Self::List(items.iter().map(ToString::to_string).collect()),
        }
    }
}

fn read_yaml(path: &Path) -> Result<BTreeMap<String, LayerValue>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| SyncError::Config(format!("Failed to read {}: {e}", path.display())))?;
    parse_yaml(&contents)
        .map_err(|e| SyncError::Config(format!("Failed to parse {}: {e}", path.display())))
}

fn parse_yaml(contents: &str) -> std::result::Result<BTreeMap<String, LayerValue>, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let raw: Option<BTreeMap<String, Option<YamlValue>>> = serde_yaml::from_str(contents)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| Some((normalize_key(&key), LayerValue::from(value?))))
        .collect())
}

/// `base_url` -> `JIRA_BASE_URL`; upper-case keys are taken verbatim.
fn normalize_key(key: &str) -> String {
    let key = key.trim();
    if key == key.to_uppercase() {
        key.to_string()
    } else {
        format!("JIRA_{}", key.to_uppercase())
    }
}

/// Comma separated, trimmed, empties dropped.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Connection settings for the Jira transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraSettings {
    pub base_url: Url,
    pub token_env_var: String,
    pub email_env_var: String,
    pub auth_mode: AuthMode,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl JiraSettings {
    #[must_use]
    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or_default()
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url_str(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}

/// Validated configuration for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jira: JiraSettings,
    pub sync: SyncSettings,
    pub audit_dir: PathBuf,
}

impl AppConfig {
    /// Resolve and validate every setting. No network access.
    ///
    /// # Errors
    ///
    /// Returns `Config` or `Validation` naming the first bad setting.
    pub fn from_layers(layers: &ConfigLayers) -> Result<Self> {
        let base_url = parse_base_url(layers.get("JIRA_BASE_URL"))?;
        let scope = ScopeSelector::from_parts(
            layers.get("JIRA_CORE_FILTER_ID"),
            layers.get("JIRA_CORE_JQL"),
        )?;

        let auth_mode = match layers.get("JIRA_AUTH_MODE") {
            Some(raw) => raw.parse()?,
            None => AuthMode::default(),
        };
        let timeout_seconds = layers.parsed("JIRA_REQUEST_TIMEOUT_SECONDS", DEFAULT_REQUEST_TIMEOUT_SECONDS)?;
        if timeout_seconds == 0 {
            return Err(SyncError::validation(
                "request_timeout_seconds",
                "must be at least 1",
            ));
        }
        let jira = JiraSettings {
            base_url,
            token_env_var: layers
                .string("JIRA_TOKEN_ENV_VAR")
                .unwrap_or_else(|| DEFAULT_TOKEN_ENV_VAR.to_string()),
            email_env_var: layers
                .string("JIRA_EMAIL_ENV_VAR")
                .unwrap_or_else(|| DEFAULT_EMAIL_ENV_VAR.to_string()),
            auth_mode,
            request_timeout: Duration::from_secs(timeout_seconds),
            max_retries: layers.parsed("JIRA_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
        };

        let canonical = layers
            .string("JIRA_DEPENDENCY_LABEL")
            .unwrap_or_else(|| DEFAULT_DEPENDENCY_LABEL.to_string());
        let labels = TrackedLabels::new(canonical, layers.list("JIRA_DEPENDENCY_LABEL_ALIASES", &[]))?;

        let directions = layers
            .list("JIRA_LINK_DIRECTIONS", DEFAULT_LINK_DIRECTIONS)
            .iter()
            .map(|raw| raw.parse::<LinkDirection>())
            .collect::<Result<Vec<_>>>()?;
        let links = LinkPolicy::new(
            &layers.list("JIRA_LINK_TYPE_IDS", &[]),
            &layers.list("JIRA_LINK_TYPES", DEFAULT_LINK_NAMES),
            &directions,
            &layers.list("JIRA_IGNORED_LINK_TYPE_IDS", &[]),
            &layers.list("JIRA_IGNORED_LINK_NAMES", DEFAULT_IGNORED_LINK_NAMES),
        )?;

        let mut sync = SyncSettings::new(scope, labels);
        sync.core_issue_types = layers.list("JIRA_CORE_ISSUE_TYPES", DEFAULT_CORE_ISSUE_TYPES);
        sync.ignored_statuses = layers.list("JIRA_IGNORED_STATUSES", DEFAULT_IGNORED_STATUSES);
        sync.links = links;
        sync.page_size = layers.parsed("JIRA_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        sync.max_pages = layers.parsed("JIRA_MAX_PAGES", DEFAULT_MAX_PAGES)?;
        sync.ignored_status_policy = match layers.get("JIRA_IGNORED_STATUS_POLICY") {
            Some(raw) => raw.parse::<IgnoredStatusPolicy>()?,
            None => IgnoredStatusPolicy::default(),
        };
        sync.validate()?;

        let audit_dir = layers
            .string("JIRA_AUDIT_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_AUDIT_DIR), PathBuf::from);

        Ok(Self {
            jira,
            sync,
            audit_dir,
        })
    }
}

fn parse_base_url(raw: Option<&str>) -> Result<Url> {
    let raw = raw
        .map(str::trim)
        .ok_or_else(|| SyncError::Config("Missing JIRA_BASE_URL.".to_string()))?;
    let url = Url::parse(raw)
        .map_err(|e| SyncError::Config(format!("JIRA_BASE_URL is not a valid URL ({e}): {raw}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(SyncError::Config(format!(
            "JIRA_BASE_URL must be an http(s) URL with a host: {raw}"
        )));
    }
    Ok(url)
}
