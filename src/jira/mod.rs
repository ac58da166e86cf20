//! Jira REST transport for the reconciliation engine.

pub mod auth;
pub mod client;
pub mod retry;

pub use auth::{AuthMode, Credentials, netrc_password, resolve_credentials};
pub use client::{JiraClient, label_update_body};
pub use retry::RetryPolicy;
