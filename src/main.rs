//! `deplabel` - keep the Jira dependency label in sync with core issue links.
//!
//! `sync` needs an explicit `--dry-run` or `--apply`; only `--apply` updates issues.

use deplabel::run;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
