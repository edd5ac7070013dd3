use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identity of an originating text unit (one source message).
pub type UnitId = u64;

/// Identity of a user or bot acting on a unit or a display.
pub type ActorId = u64;

// ---------------------------------------------------------------------------
// Reference
// ---------------------------------------------------------------------------

/// A parsed pointer to one forge item, e.g. `org/repo#123`.
///
/// Equality and hashing only consider `(organisation, repository, number)`.
/// The expand hint is presentation metadata and never takes part in
/// deduplication. Use [`Reference::same_presentation`] when the hint matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    organisation: Option<String>,
    repository: String,
    number: u64,
    #[serde(default)]
    expand_hint: bool,
}

impl Reference {
    pub fn new(organisation: Option<String>, repository: impl Into<String>, number: u64) -> Self {
        Self {
            organisation,
            repository: repository.into(),
            number,
            expand_hint: false,
        }
    }

    /// Shorthand for a fully qualified reference.
    pub fn qualified(organisation: impl Into<String>, repository: impl Into<String>, number: u64) -> Self {
        Self::new(Some(organisation.into()), repository, number)
    }

    pub fn organisation(&self) -> Option<&str> {
        self.organisation.as_deref()
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn expand_hint(&self) -> bool {
        self.expand_hint
    }

    pub fn is_qualified(&self) -> bool {
        self.organisation.is_some()
    }

    /// Copy of this reference with the expand hint replaced.
    pub fn with_expand_hint(&self, expand_hint: bool) -> Self {
        Self {
            expand_hint,
            ..self.clone()
        }
    }

    /// Copy of this reference completed with an organisation and a
    /// (possibly re-cased) repository name.
    pub fn qualify(&self, organisation: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            organisation: Some(organisation.into()),
            repository: repository.into(),
            number: self.number,
            expand_hint: self.expand_hint,
        }
    }

    /// Identity equality plus the expand hint.
    pub fn same_presentation(&self, other: &Reference) -> bool {
        self == other && self.expand_hint == other.expand_hint
    }
}

impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.organisation == other.organisation
            && self.repository == other.repository
            && self.number == other.number
    }
}

impl Eq for Reference {}

impl Hash for Reference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.organisation.hash(state);
        self.repository.hash(state);
        self.number.hash(state);
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.organisation {
            Some(org) => write!(f, "{}/{}#{}", org, self.repository, self.number),
            None => write!(f, "{}#{}", self.repository, self.number),
        }
    }
}

/// Compare two reference sequences element-wise, including expand hints.
pub fn same_reference_set(a: &[Reference], b: &[Reference]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_presentation(y))
}

// ---------------------------------------------------------------------------
// Item classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Issue,
    PullRequest,
    Discussion,
}

/// Presentation tag derived from an item's kind and upstream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTag {
    IssueOpen,
    IssueClosed,
    IssueClosedCompleted,
    IssueClosedUnplanned,
    PullRequestOpen,
    PullRequestClosed,
    PullRequestDraft,
    PullRequestMerged,
    DiscussionAnswered,
    DiscussionUnanswered,
}

impl StatusTag {
    pub fn kind(&self) -> ItemKind {
        match self {
            StatusTag::IssueOpen
            | StatusTag::IssueClosed
            | StatusTag::IssueClosedCompleted
            | StatusTag::IssueClosedUnplanned => ItemKind::Issue,
            StatusTag::PullRequestOpen
            | StatusTag::PullRequestClosed
            | StatusTag::PullRequestDraft
            | StatusTag::PullRequestMerged => ItemKind::PullRequest,
            StatusTag::DiscussionAnswered | StatusTag::DiscussionUnanswered => {
                ItemKind::Discussion
            }
        }
    }

    /// The state half of the tag: `open`, `merged`, `closed_unplanned`, ...
    pub fn status(&self) -> &'static str {
        match self {
            StatusTag::IssueOpen | StatusTag::PullRequestOpen => "open",
            StatusTag::IssueClosed | StatusTag::PullRequestClosed => "closed",
            StatusTag::IssueClosedCompleted => "closed_completed",
            StatusTag::IssueClosedUnplanned => "closed_unplanned",
            StatusTag::PullRequestDraft => "draft",
            StatusTag::PullRequestMerged => "merged",
            StatusTag::DiscussionAnswered => "answered",
            StatusTag::DiscussionUnanswered => "unanswered",
        }
    }

    /// Stable key used to look up the icon for this tag.
    pub fn icon_key(&self) -> &'static str {
        match self {
            StatusTag::IssueOpen => "issue_open",
            StatusTag::IssueClosed => "issue_closed",
            StatusTag::IssueClosedCompleted => "issue_closed_completed",
            StatusTag::IssueClosedUnplanned => "issue_closed_unplanned",
            StatusTag::PullRequestOpen => "pull_request_open",
            StatusTag::PullRequestClosed => "pull_request_closed",
            StatusTag::PullRequestDraft => "pull_request_draft",
            StatusTag::PullRequestMerged => "pull_request_merged",
            StatusTag::DiscussionAnswered => "discussion_answered",
            StatusTag::DiscussionUnanswered => "discussion_unanswered",
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch outcomes
// ---------------------------------------------------------------------------

/// A forge item that was fetched and classified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub organisation: String,
    pub repository: String,
    pub number: u64,
    pub canonical_url: String,
    pub title: String,
    pub status: StatusTag,
    /// Upstream payload, kept only while an expanded render may still be
    /// requested.
    #[serde(skip)]
    pub raw_payload: Option<Arc<serde_json::Value>>,
}

impl ResolvedItem {
    pub fn reference(&self) -> Reference {
        Reference::qualified(self.organisation.clone(), self.repository.clone(), self.number)
    }

    pub fn kind(&self) -> ItemKind {
        self.status.kind()
    }

    /// Drop the raw payload to bound memory in multi-item batches.
    pub fn without_payload(mut self) -> Self {
        self.raw_payload = None;
        self
    }
}

/// Error taxonomy shared by every layer of the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream reported the item does not exist.
    NotFound,
    /// Upstream refused the request because of its rate limit.
    RateLimited,
    /// Network failure, timeout, or an unexpected upstream status.
    Transport,
    /// The batch exceeded the reference cap.
    TooMany,
    /// A toggle token did not decode.
    InvalidToken,
    /// The organisation for a reference could not be inferred.
    Ambiguous,
}

/// Result of resolving one reference. Never partially populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchOutcome {
    Resolved(ResolvedItem),
    Failed {
        kind: ErrorKind,
        code: i32,
        message: String,
    },
}

impl FetchOutcome {
    pub fn failed(kind: ErrorKind, code: i32, message: impl Into<String>) -> Self {
        FetchOutcome::Failed {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, FetchOutcome::Resolved(_))
    }

    pub fn resolved(self) -> Option<ResolvedItem> {
        match self {
            FetchOutcome::Resolved(item) => Some(item),
            FetchOutcome::Failed { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Units, groups and features
// ---------------------------------------------------------------------------

/// Where a piece of text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitContext {
    pub unit_id: UnitId,
    /// Group (server/community) the unit belongs to, if any.
    pub group_id: Option<u64>,
    pub author_id: ActorId,
}

/// Per-group feature switches consulted by the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Fall back to the discussion query when an issue lookup is 404.
    DiscussionFallback,
    /// Extract full web URLs in addition to the short form.
    FullUrlLinks,
    /// Render a lone item expanded by default.
    ExpandSingleItem,
}

impl Feature {
    pub const ALL: [Feature; 3] = [
        Feature::DiscussionFallback,
        Feature::FullUrlLinks,
        Feature::ExpandSingleItem,
    ];

    /// Flag name as stored by the settings backend.
    pub fn flag_name(&self) -> &'static str {
        match self {
            Feature::DiscussionFallback => "GITHUB_AUTOLINK_DISCUSSIONS",
            Feature::FullUrlLinks => "GITHUB_EXPAND_ISSUE_LINKS",
            Feature::ExpandSingleItem => "GITHUB_AUTOLINK_ISSUE_SHOW_DESCRIPTION",
        }
    }
}

/// Opaque identity of a rendered display artifact, assigned by the caller
/// once the rendering has been delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayHandle(pub String);

impl DisplayHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn reference_identity_ignores_expand_hint() {
        let plain = Reference::qualified("python", "cpython", 1);
        let hinted = plain.with_expand_hint(true);

        assert_eq!(plain, hinted);
        assert!(!plain.same_presentation(&hinted));

        let set: HashSet<_> = [plain, hinted].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn reference_display() {
        assert_eq!(Reference::qualified("a", "b", 3).to_string(), "a/b#3");
        assert_eq!(Reference::new(None, "b", 3).to_string(), "b#3");
    }

    #[test]
    fn qualify_keeps_number_and_hint() {
        let r = Reference::new(None, "monty", 7).with_expand_hint(true);
        let q = r.qualify("onerandomusername", "Monty");
        assert_eq!(q.organisation(), Some("onerandomusername"));
        assert_eq!(q.repository(), "Monty");
        assert_eq!(q.number(), 7);
        assert!(q.expand_hint());
    }

    #[test]
    fn same_reference_set_checks_hints_and_order() {
        let a = vec![Reference::qualified("a", "b", 1), Reference::qualified("a", "b", 2)];
        let reordered = vec![a[1].clone(), a[0].clone()];
        let hinted = vec![a[0].with_expand_hint(true), a[1].clone()];

        assert!(same_reference_set(&a, &a.clone()));
        assert!(!same_reference_set(&a, &reordered));
        assert!(!same_reference_set(&a, &hinted));
    }

    #[test]
    fn status_tag_kind_and_keys() {
        assert_eq!(StatusTag::PullRequestMerged.kind(), ItemKind::PullRequest);
        assert_eq!(StatusTag::PullRequestMerged.status(), "merged");
        assert_eq!(StatusTag::IssueClosedUnplanned.icon_key(), "issue_closed_unplanned");
        assert_eq!(StatusTag::DiscussionAnswered.kind(), ItemKind::Discussion);
    }

    #[test]
    fn fetch_outcome_serde_is_tagged() {
        let failed = FetchOutcome::failed(ErrorKind::NotFound, 404, "Issue not found.");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["kind"], "not_found");
        assert_eq!(json["code"], 404);
    }

    #[test]
    fn without_payload_drops_raw_json() {
        let item = ResolvedItem {
            organisation: "a".into(),
            repository: "b".into(),
            number: 1,
            canonical_url: "https://github.com/a/b/issues/1".into(),
            title: "t".into(),
            status: StatusTag::IssueOpen,
            raw_payload: Some(Arc::new(serde_json::json!({"title": "t"}))),
        };
        assert!(item.clone().without_payload().raw_payload.is_none());
        assert_eq!(item.reference(), Reference::qualified("a", "b", 1));
    }
}
