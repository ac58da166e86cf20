//! Blocking Jira REST client.
//!
//! Cloud hosts (`*.atlassian.net`) are searched through the token-paginated
//! `GET /rest/api/3/search/jql`; Server and Data Center through the
//! offset-paginated `POST /rest/api/2/search`. Issue reads and label updates
//! use the matching API version.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use std::thread;

use deplabel_lib::{
    Issue, IssueTracker, LabelUpdate, PageCursor, PageRequest, PaginationStyle, Result,
    SearchBackend, SearchPage, SyncError,
};

use super::auth::Credentials;
use super::retry::{
    RetryPolicy, is_retryable_status, is_retryable_transport_error, parse_retry_after,
};
use crate::config::JiraSettings;

/// Longest slice of an error response body carried into the error message.
const ERROR_BODY_LIMIT: usize = 400;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenSearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    next_page_token: Option<String>,
    #[serde(default)]
    is_last: Option<bool>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OffsetSearchResponse {
    #[serde(default)]
    issues: Vec<Issue>,
    #[serde(default)]
    total: Option<u64>,
}

/// Jira implementation of [`IssueTracker`].
pub struct JiraClient {
    http: Client,
    base_url: String,
    style: PaginationStyle,
    retry: RetryPolicy,
    basic_auth: Option<(String, String)>,
}

impl JiraClient {
    /// Build a client for the configured host.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the token cannot be sent as a header, or
    /// `Transport` if the HTTP client cannot be built.
    pub fn new(settings: &JiraSettings, credentials: &Credentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let basic_auth = match credentials {
            Credentials::Bearer { token } => {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    SyncError::Config("Jira token contains characters not allowed in a header".into())
                })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                None
            }
            Credentials::Basic { email, token } => Some((email.clone(), token.clone())),
        };

        let http = Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| SyncError::transport("build HTTP client", None, e.to_string()))?;

        Ok(Self {
            http,
            base_url: settings.base_url_str(),
            style: PaginationStyle::for_host(settings.host()),
            retry: RetryPolicy::new(settings.max_retries),
            basic_auth,
        })
    }

    fn issue_api_base(&self) -> &'static str {
        match self.style {
            PaginationStyle::Token => "/rest/api/3",
            PaginationStyle::Offset => "/rest/api/2",
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.basic_auth {
            Some((email, token)) => request.basic_auth(email, Some(token)),
            None => request,
        }
    }

    /// Send a request, retrying transient failures, and return the body.
    fn send<F>(&self, operation: &str, build: F) -> Result<String>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0_u32;
        loop {
            attempt = attempt.saturating_add(1);
            match self.authorized(build()).send() {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().map_err(|e| {
                            SyncError::transport(operation, Some(status.as_u16()), e.to_string())
                        });
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().unwrap_or_default();
                    if self.retry.allows_retry_after(attempt) && is_retryable_status(status.as_u16()) {
                        let delay = self.retry.delay(attempt, retry_after);
                        tracing::warn!(operation, status = status.as_u16(), attempt, ?delay, "Retrying request");
                        thread::sleep(delay);
                        continue;
                    }

                    return Err(SyncError::transport(
                        operation,
                        Some(status.as_u16()),
                        truncate_body(&body),
                    ));
                }
                Err(error) => {
                    if self.retry.allows_retry_after(attempt) && is_retryable_transport_error(&error) {
                        let delay = self.retry.delay(attempt, None);
                        tracing::warn!(operation, attempt, ?delay, error = %error, "Retrying request");
                        thread::sleep(delay);
                        continue;
                    }
                    return Err(SyncError::transport(operation, None, error.to_string()));
                }
            }
        }
    }

    fn search_token(&self, request: &PageRequest<'_>, token: Option<&str>) -> Result<SearchPage> {
        let fields = request.fields.join(",");
        let max_results = request.max_results.to_string();
        let body = self.send("search", || {
            let mut params = vec![
                ("jql", request.jql),
                ("maxResults", max_results.as_str()),
                ("fields", fields.as_str()),
            ];
            if let Some(token) = token {
                params.push(("nextPageToken", token));
            }
            self.http.get(self.url("/rest/api/3/search/jql")).query(&params)
        })?;

        let response: TokenSearchResponse = serde_json::from_str(&body)?;
        let next_page_token = if response.is_last == Some(true) {
            None
        } else {
            response.next_page_token
        };
        Ok(SearchPage {
            issues: response.issues,
            total: response.total,
            next_page_token,
        })
    }

    fn search_offset(&self, request: &PageRequest<'_>, start_at: u64) -> Result<SearchPage> {
        let payload = json!({
            "jql": request.jql,
            "startAt": start_at,
            "maxResults": request.max_results,
            "fields": request.fields,
        });
        let body = self.send("search", || {
            self.http.post(self.url("/rest/api/2/search")).json(&payload)
        })?;

        let response: OffsetSearchResponse = serde_json::from_str(&body)?;
        Ok(SearchPage {
            issues: response.issues,
            total: response.total,
            next_page_token: None,
        })
    }
}

impl SearchBackend for JiraClient {
    fn search_page(&self, request: &PageRequest<'_>) -> Result<SearchPage> {
        match &request.cursor {
            PageCursor::Token(token) => self.search_token(request, token.as_deref()),
            PageCursor::Offset(start_at) => self.search_offset(request, *start_at),
        }
    }
}

impl IssueTracker for JiraClient {
    fn pagination_style(&self) -> PaginationStyle {
        self.style
    }

    fn get_issue(&self, key: &str, fields: &[&str]) -> Result<Issue> {
        let path = format!("{}/issue/{key}", self.issue_api_base());
        let fields = fields.join(",");
        let operation = format!("get issue {key}");
        let body = self
            .send(&operation, || {
                self.http
                    .get(self.url(&path))
                    .query(&[("fields", fields.as_str())])
            })
            .map_err(|err| match err {
                SyncError::Transport {
                    status: Some(status),
                    ..
                } if status == StatusCode::NOT_FOUND.as_u16() => SyncError::IssueNotFound {
                    key: key.to_string(),
                },
                other => other,
            })?;
        Ok(serde_json::from_str(&body)?)
    }

    fn update_labels(&self, key: &str, update: &LabelUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        let path = format!("{}/issue/{key}", self.issue_api_base());
        let payload = label_update_body(update);
        let operation = format!("update labels on {key}");
        self.send(&operation, || self.http.put(self.url(&path)).json(&payload))?;
        Ok(())
    }
}

/// `{"update":{"labels":[{"add":..},..,{"remove":..},..]}}`, each group sorted.
#[must_use]
pub fn label_update_body(update: &LabelUpdate) -> Value {
    let mut add = update.add.clone();
    add.sort();
    let mut remove = update.remove.clone();
    remove.sort();

    let operations: Vec<Value> = add
        .into_iter()
        .map(|label| json!({ "add": label }))
        .chain(remove.into_iter().map(|label| json!({ "remove": label })))
        .collect();
    json!({ "update": { "labels": operations } })
}

fn truncate_body(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_update_body_orders_adds_before_removes() {
        let update = LabelUpdate {
            add: vec!["b".into(), "a".into()],
            remove: vec!["z".into(), "y".into()],
        };
        assert_eq!(
            label_update_body(&update),
            json!({
                "update": {
                    "labels": [
                        { "add": "a" },
                        { "add": "b" },
                        { "remove": "y" },
                        { "remove": "z" }
                    ]
                }
            })
        );
    }

    #[test]
    fn test_token_response_is_last_ends_pagination() {
        let body = r#"{"issues":[{"key":"EXT-1","fields":{"labels":["x"]}}],"nextPageToken":"abc","isLast":true}"#;
        let response: TokenSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.issues.len(), 1);
        assert_eq!(response.is_last, Some(true));
        assert_eq!(response.issues[0].labels(), ["x"]);
    }

    #[test]
    fn test_offset_response_parses_links() {
        let body = r#"{
            "startAt": 0, "maxResults": 50, "total": 1,
            "issues": [{
                "id": "1", "key": "CORE-1",
                "fields": {
                    "issuetype": {"id": "6", "name": "Epic"},
                    "status": {"name": "Open"},
                    "labels": null,
                    "issuelinks": [{
                        "id": "77",
                        "type": {"id": "10000", "name": "Blocks", "inward": "is blocked by", "outward": "blocks"},
                        "outwardIssue": {"id": "2", "key": "EXT-1", "fields": {"status": {"name": "Open"}}}
                    }]
                }
            }]
        }"#;
        let response: OffsetSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.total, Some(1));
        let issue = &response.issues[0];
        assert_eq!(issue.issue_type_name(), "Epic");
        assert!(issue.labels().is_empty());
        assert_eq!(issue.links()[0].linked_key(), Some("EXT-1"));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(1000);
        assert_eq!(truncate_body(&long).len(), ERROR_BODY_LIMIT);
        assert_eq!(truncate_body("short"), "short");
    }
}
