//! Command implementations.

pub mod completions;
pub mod config;
pub mod scope;
pub mod sync;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::config::{AppConfig, ConfigLayers};
use crate::jira::{JiraClient, resolve_credentials};

/// Read every config layer and validate the result.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or a setting is invalid.
pub fn load_config(opts: &GlobalOpts) -> Result<(ConfigLayers, AppConfig)> {
    let layers = ConfigLayers::load(opts.env_file.as_deref(), opts.config.as_deref())?;
    let config = AppConfig::from_layers(&layers)?;
    tracing::debug!(
        base_url = %config.jira.base_url,
        scope = %config.sync.scope,
        "Loaded configuration"
    );
    Ok((layers, config))
}

/// Resolve credentials and build the Jira client.
///
/// # Errors
///
/// Returns an error if no token is available or the client cannot be built.
pub fn connect(config: &AppConfig, layers: &ConfigLayers) -> Result<JiraClient> {
    let credentials = resolve_credentials(&config.jira, layers)?;
    tracing::debug!(host = config.jira.host(), auth = %credentials.mode(), "Connecting to Jira");
    Ok(JiraClient::new(&config.jira, &credentials)?)
}
