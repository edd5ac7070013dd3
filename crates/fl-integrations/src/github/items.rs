use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use fl_core::types::{ErrorKind, FetchOutcome, Reference, ResolvedItem, StatusTag};

use super::client::{GitHubClient, GitHubError};
use super::discussions::{classify_discussion, fetch_discussion};
use super::endpoints;

pub const NOT_FOUND_MESSAGE: &str = "Issue not found.";
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit has been hit! Please try again later!";

/// Fetches one reference and classifies it into an issue, pull request or
/// discussion.
#[derive(Debug, Clone)]
pub struct ItemResolver {
    client: GitHubClient,
}

impl ItemResolver {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    /// Resolve a fully qualified reference.
    ///
    /// The discussion query is only tried when the issue lookup is a 404 and
    /// `allow_discussion_fallback` is set.
    pub async fn resolve(&self, reference: &Reference, allow_discussion_fallback: bool) -> FetchOutcome {
        let Some(owner) = reference.organisation() else {
            return FetchOutcome::failed(
                ErrorKind::Ambiguous,
                -1,
                "Organisation could not be resolved.",
            );
        };
        let repository = reference.repository();
        let number = reference.number();

        let url = endpoints::issue(self.client.api_base(), owner, repository, number);
        let fetched = match self.client.get(&url).await {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(%reference, error = %err, "issue lookup failed");
                return FetchOutcome::failed(ErrorKind::Transport, -1, "Could not reach GitHub.");
            }
        };

        match fetched.status {
            200..=299 => match serde_json::from_slice::<Value>(&fetched.body) {
                Ok(payload) => {
                    FetchOutcome::Resolved(item_from_payload(owner, repository, number, payload))
                }
                Err(err) => {
                    warn!(%reference, error = %err, "issue payload did not decode");
                    FetchOutcome::failed(ErrorKind::Transport, -1, "Malformed response from GitHub.")
                }
            },
            404 | 410 if allow_discussion_fallback => {
                self.resolve_discussion(owner, repository, number).await
            }
            404 | 410 => FetchOutcome::failed(ErrorKind::NotFound, 404, NOT_FOUND_MESSAGE),
            403 | 429 => {
                warn!(%reference, status = fetched.status, "rate limited by GitHub");
                FetchOutcome::failed(
                    ErrorKind::RateLimited,
                    i32::from(fetched.status),
                    RATE_LIMITED_MESSAGE,
                )
            }
            status => {
                warn!(%reference, status, "unexpected status from GitHub");
                FetchOutcome::failed(
                    ErrorKind::Transport,
                    i32::from(status),
                    format!("Unexpected response from GitHub ({status})."),
                )
            }
        }
    }

    /// Resolve a batch in order. References still missing an organisation
    /// are skipped rather than reported.
    pub async fn resolve_all(
        &self,
        references: &[Reference],
        allow_discussion_fallback: bool,
    ) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::with_capacity(references.len());
        for reference in references.iter().filter(|r| r.is_qualified()) {
            outcomes.push(self.resolve(reference, allow_discussion_fallback).await);
        }
        outcomes
    }

    async fn resolve_discussion(&self, owner: &str, repository: &str, number: u64) -> FetchOutcome {
        debug!(owner, repository, number, "falling back to discussion lookup");
        match fetch_discussion(&self.client, owner, repository, number).await {
            Ok(Some(discussion)) => FetchOutcome::Resolved(ResolvedItem {
                organisation: owner.to_string(),
                repository: repository.to_string(),
                number,
                canonical_url: str_field(&discussion, "url"),
                title: str_field(&discussion, "title"),
                status: classify_discussion(&discussion),
                raw_payload: None,
            }),
            Ok(None) => FetchOutcome::failed(ErrorKind::NotFound, -1, NOT_FOUND_MESSAGE),
            Err(err) => {
                let kind = match &err {
                    GitHubError::Transport(_) => ErrorKind::Transport,
                    _ => ErrorKind::NotFound,
                };
                debug!(owner, repository, number, error = %err, "discussion lookup failed");
                FetchOutcome::failed(kind, -1, NOT_FOUND_MESSAGE)
            }
        }
    }
}

/// Classify an issues-endpoint payload.
///
/// Pull requests are served by the issues endpoint too and carry a
/// `pull_request` object; its `merged_at` decides merged vs closed.
pub fn classify_issue(payload: &Value) -> StatusTag {
    let state = payload.get("state").and_then(Value::as_str);

    if let Some(pull) = pull_request_link(payload) {
        let merged = pull.get("merged_at").is_some_and(|v| !v.is_null());
        return if merged {
            StatusTag::PullRequestMerged
        } else if state == Some("closed") {
            StatusTag::PullRequestClosed
        } else if payload.get("draft").and_then(Value::as_bool).unwrap_or(false) {
            StatusTag::PullRequestDraft
        } else {
            StatusTag::PullRequestOpen
        };
    }

    if state == Some("open") {
        return StatusTag::IssueOpen;
    }
    match payload.get("state_reason").and_then(Value::as_str) {
        Some("not_planned") => StatusTag::IssueClosedUnplanned,
        Some("completed") => StatusTag::IssueClosedCompleted,
        _ => StatusTag::IssueClosed,
    }
}

fn pull_request_link(payload: &Value) -> Option<&Value> {
    payload.get("pull_request").filter(|v| !v.is_null())
}

fn item_from_payload(owner: &str, repository: &str, number: u64, payload: Value) -> ResolvedItem {
    let status = classify_issue(&payload);
    let canonical_url = pull_request_link(&payload)
        .and_then(|pull| pull.get("html_url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| str_field(&payload, "html_url"));

    ResolvedItem {
        organisation: owner.to_string(),
        repository: repository.to_string(),
        number,
        canonical_url,
        title: str_field(&payload, "title"),
        status,
        raw_payload: Some(Arc::new(payload)),
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merged_pull_request() {
        let payload = json!({
            "state": "closed",
            "pull_request": {"merged_at": "2024-01-01T00:00:00Z", "html_url": "https://github.com/a/b/pull/1"}
        });
        assert_eq!(classify_issue(&payload), StatusTag::PullRequestMerged);
    }

    #[test]
    fn closed_unmerged_pull_request() {
        let payload = json!({"state": "closed", "draft": true, "pull_request": {"merged_at": null}});
        assert_eq!(classify_issue(&payload), StatusTag::PullRequestClosed);
    }

    #[test]
    fn draft_pull_request() {
        let payload = json!({"state": "open", "draft": true, "pull_request": {"merged_at": null}});
        assert_eq!(classify_issue(&payload), StatusTag::PullRequestDraft);
    }

    #[test]
    fn open_pull_request() {
        let payload = json!({"state": "open", "draft": false, "pull_request": {"merged_at": null}});
        assert_eq!(classify_issue(&payload), StatusTag::PullRequestOpen);
    }

    #[test]
    fn open_issue() {
        assert_eq!(classify_issue(&json!({"state": "open"})), StatusTag::IssueOpen);
    }

    #[test]
    fn closed_issue_reasons() {
        assert_eq!(
            classify_issue(&json!({"state": "closed", "state_reason": "not_planned"})),
            StatusTag::IssueClosedUnplanned
        );
        assert_eq!(
            classify_issue(&json!({"state": "closed", "state_reason": "completed"})),
            StatusTag::IssueClosedCompleted
        );
        assert_eq!(
            classify_issue(&json!({"state": "closed", "state_reason": null})),
            StatusTag::IssueClosed
        );
    }

    #[test]
    fn null_pull_request_field_is_an_issue() {
        let payload = json!({"state": "open", "pull_request": null});
        assert_eq!(classify_issue(&payload), StatusTag::IssueOpen);
    }

    #[test]
    fn pull_request_url_wins_over_issue_url() {
        let payload = json!({
            "title": "Add thing",
            "state": "open",
            "html_url": "https://github.com/a/b/issues/5",
            "pull_request": {"merged_at": null, "html_url": "https://github.com/a/b/pull/5"}
        });
        let item = item_from_payload("a", "b", 5, payload);
        assert_eq!(item.canonical_url, "https://github.com/a/b/pull/5");
        assert_eq!(item.title, "Add thing");
        assert!(item.raw_payload.is_some());
    }
}
