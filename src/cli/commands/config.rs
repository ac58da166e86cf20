//! Config command implementation.

use anyhow::Result;

use super::load_config;
use crate::cli::GlobalOpts;
use crate::format::{ConfigView, format_config};

/// Print the resolved configuration. Credentials are never resolved here.
///
/// # Errors
///
/// Returns an error if a config file cannot be read or a setting is invalid.
pub fn execute(opts: &GlobalOpts) -> Result<()> {
    let (layers, config) = load_config(opts)?;
    let view = ConfigView::new(&config, &layers);

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("{}", format_config(&view));
    }
    Ok(())
}
