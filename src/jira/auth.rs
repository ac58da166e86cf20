//! Credential resolution.
//!
//! The token comes from the configured token variable (environment, `.env`
//! or config file), falling back to the password of the matching `machine`
//! entry in `~/.netrc` (`$NETRC` overrides the path).

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use deplabel_lib::{Result, SyncError};

use crate::config::{ConfigLayers, JiraSettings};

/// Requested authentication scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Basic for Atlassian Cloud hosts, bearer otherwise.
    #[default]
    Auto,
    Basic,
    Bearer,
}

impl AuthMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Basic => "basic",
            Self::Bearer => "bearer",
        }
    }

    /// Concrete scheme for `host`. Never returns `Auto`.
    #[must_use]
    pub fn resolve(self, host: &str) -> Self {
        match self {
            Self::Auto if host.to_lowercase().ends_with(".atlassian.net") => Self::Basic,
            Self::Auto => Self::Bearer,
            explicit => explicit,
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "basic" => Ok(Self::Basic),
            "bearer" => Ok(Self::Bearer),
            _ => Err(SyncError::Config(
                "JIRA_AUTH_MODE must be one of: auto, basic, bearer.".to_string(),
            )),
        }
    }
}

/// Resolved credentials.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { email: String, token: String },
    Bearer { token: String },
}

impl Credentials {
    #[must_use]
    pub const fn mode(&self) -> AuthMode {
        match self {
            Self::Basic { .. } => AuthMode::Basic,
            Self::Bearer { .. } => AuthMode::Bearer,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { email, .. } => f
                .debug_struct("Basic")
                .field("email", email)
                .field("token", &"<redacted>")
                .finish(),
            Self::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

/// Resolve credentials from the config layers and `~/.netrc`.
///
/// # Errors
///
/// Returns `Config` if no token is found, or if basic auth is selected and
/// the email variable is unset.
pub fn resolve_credentials(settings: &JiraSettings, layers: &ConfigLayers) -> Result<Credentials> {
    let netrc = netrc_path().and_then(|path| fs::read_to_string(path).ok());
    credentials_from(
        settings,
        |key| layers.get(key).map(ToString::to_string),
        netrc.as_deref(),
    )
}

fn credentials_from<F>(settings: &JiraSettings, lookup: F, netrc: Option<&str>) -> Result<Credentials>
where
    F: Fn(&str) -> Option<String>,
{
    let host = settings.host();
    let token = lookup(settings.token_env_var.as_str())
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| netrc.and_then(|contents| netrc_password(contents, host)))
        .ok_or_else(|| {
            SyncError::Config(format!(
                "Jira token not found. Set {} in the environment or .env, or add the token as the password for {host} in ~/.netrc.",
                settings.token_env_var
            ))
        })?;

    match settings.auth_mode.resolve(host) {
        AuthMode::Basic => {
            let email = lookup(settings.email_env_var.as_str())
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty())
                .ok_or_else(|| {
                    SyncError::Config(format!(
                        "Jira auth mode is basic, but {} is not set. Set your Jira account email for Cloud auth.",
                        settings.email_env_var
                    ))
                })?;
            Ok(Credentials::Basic { email, token })
        }
        _ => Ok(Credentials::Bearer { token }),
    }
}

fn netrc_path() -> Option<PathBuf> {
    std::env::var_os("NETRC")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".netrc")))
}

/// Password for `host` in netrc `contents`, falling back to a `default` entry.
#[must_use]
pub fn netrc_password(contents: &str, host: &str) -> Option<String> {
    #[derive(PartialEq)]
    enum Entry {
        None,
        Matching,
        Other,
        Default,
    }

    let mut tokens = contents.split_whitespace();
    let mut entry = Entry::None;
    let mut fallback = None;

    while let Some(token) = tokens.next() {
        match token {
            "machine" => {
                entry = match tokens.next() {
                    Some(name) if name.eq_ignore_ascii_case(host) => Entry::Matching,
                    _ => Entry::Other,
                };
            }
            "default" => entry = Entry::Default,
            "login" | "account" => {
                tokens.next();
            }
            "password" => {
                let password = tokens.next().filter(|value| !value.is_empty());
                match entry {
                    Entry::Matching => return password.map(ToString::to_string),
                    Entry::Default if fallback.is_none() => {
                        fallback = password.map(ToString::to_string);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use url::Url;

    fn settings(base_url: &str, mode: AuthMode) -> JiraSettings {
        JiraSettings {
            base_url: Url::parse(base_url).unwrap(),
            token_env_var: "JIRA_PAT".into(),
            email_env_var: "JIRA_EMAIL".into(),
            auth_mode: mode,
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    fn lookup(values: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = values
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_auto_mode_by_host() {
        assert_eq!(AuthMode::Auto.resolve("acme.atlassian.net"), AuthMode::Basic);
        assert_eq!(AuthMode::Auto.resolve("jira.acme.com"), AuthMode::Bearer);
        assert_eq!(AuthMode::Bearer.resolve("acme.atlassian.net"), AuthMode::Bearer);
        assert!("token".parse::<AuthMode>().is_err());
    }

    #[test]
    fn test_bearer_from_env_layer() {
        let settings = settings("https://jira.acme.com", AuthMode::Auto);
        let creds = credentials_from(&settings, lookup(&[("JIRA_PAT", " secret ")]), None).unwrap();
        assert_eq!(creds, Credentials::Bearer { token: "secret".into() });
    }

    #[test]
    fn test_basic_requires_email() {
        let settings = settings("https://acme.atlassian.net", AuthMode::Auto);
        let err = credentials_from(&settings, lookup(&[("JIRA_PAT", "secret")]), None).unwrap_err();
        assert!(err.to_string().contains("JIRA_EMAIL"));

        let creds = credentials_from(
            &settings,
            lookup(&[("JIRA_PAT", "secret"), ("JIRA_EMAIL", "me@acme.com")]),
            None,
        )
        .unwrap();
        assert_eq!(creds.mode(), AuthMode::Basic);
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn test_netrc_fallback() {
        let settings = settings("https://jira.acme.com", AuthMode::Bearer);
        let netrc = "machine other.com login a password wrong\nmachine jira.acme.com\n  login me\n  password fromnetrc\n";
        let creds = credentials_from(&settings, lookup(&[]), Some(netrc)).unwrap();
        assert_eq!(creds, Credentials::Bearer { token: "fromnetrc".into() });
    }

    #[test]
    fn test_missing_token_names_both_sources() {
        let settings = settings("https://jira.acme.com", AuthMode::Bearer);
        let err = credentials_from(&settings, lookup(&[]), Some("machine other.com password x")).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("JIRA_PAT"));
        assert!(message.contains(".netrc"));
    }

    #[test]
    fn test_netrc_default_entry() {
        let netrc = "default login anon password fallback\nmachine a.com password first";
        assert_eq!(netrc_password(netrc, "a.com").as_deref(), Some("first"));
        assert_eq!(netrc_password(netrc, "b.com").as_deref(), Some("fallback"));
        assert_eq!(netrc_password("", "b.com"), None);
    }
}
