//! Summary builder: the data a host needs to draw a link summary. Visual
//! rendering is the host's business.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use fl_core::config::Config;
use fl_core::types::{ActorId, FetchOutcome, ResolvedItem};

use crate::toggle::{ToggleState, ToggleToken};

pub const NO_DESCRIPTION: &str = "*No description provided.*";

// ---------------------------------------------------------------------------
// Presentation types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Author {
    pub login: String,
    pub url: String,
    pub avatar_url: String,
}

/// Detailed view of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedItem {
    pub title: String,
    pub url: String,
    pub author: Option<Author>,
    pub labels: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Content {
    Compact { lines: Vec<String> },
    Expanded(ExpandedItem),
}

impl Content {
    pub fn is_expanded(&self) -> bool {
        matches!(self, Content::Expanded(_))
    }

    /// Compact lines, if this is the compact view.
    pub fn lines(&self) -> Option<&[String]> {
        match self {
            Content::Compact { lines } => Some(lines),
            Content::Expanded(_) => None,
        }
    }
}

/// Interactive controls attached to a summary, rebuilt from scratch on every
/// render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum Control {
    Delete { owner_id: ActorId },
    Toggle { label: String, token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Presentation {
    pub content: Content,
    pub controls: Vec<Control>,
}

impl Presentation {
    pub fn toggle_token(&self) -> Option<&str> {
        self.controls.iter().find_map(|c| match c {
            Control::Toggle { token, .. } => Some(token.as_str()),
            Control::Delete { .. } => None,
        })
    }
}

// ---------------------------------------------------------------------------
// SummaryBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    config: Arc<Config>,
}

impl SummaryBuilder {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn compact_line(&self, item: &ResolvedItem) -> String {
        format!(
            "{} [\\(#{}\\) {}]({})",
            self.config.icon_for(item.status),
            item.number,
            item.title,
            item.canonical_url
        )
    }

    pub fn failure_line(code: i32, message: &str) -> String {
        format!(":x: [{code}] {message}")
    }

    /// One line per outcome. Failures are listed only with
    /// `show_errors_inline`.
    pub fn compact(&self, outcomes: &[FetchOutcome], show_errors_inline: bool) -> Content {
        let lines = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                FetchOutcome::Resolved(item) => Some(self.compact_line(item)),
                FetchOutcome::Failed { code, message, .. } if show_errors_inline => {
                    Some(Self::failure_line(*code, message))
                }
                FetchOutcome::Failed { .. } => None,
            })
            .collect();
        Content::Compact { lines }
    }

    /// Detailed view of `item`, if its payload was kept.
    pub fn expanded(&self, item: &ResolvedItem) -> Option<ExpandedItem> {
        let payload = item.raw_payload.as_deref()?;
        let limits = &self.config.linking;

        let author = payload.get("user").map(|user| Author {
            login: str_field(user, "login"),
            url: str_field(user, "html_url"),
            avatar_url: str_field(user, "avatar_url"),
        });

        let mut labels: Vec<&str> = payload
            .get("labels")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|label| label.get("name").and_then(Value::as_str))
            .collect();
        labels.sort_unstable();
        let labels = (!labels.is_empty()).then(|| truncate(&labels.join(", "), limits.labels_limit));

        let created_at = payload
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        let description = match payload.get("body").and_then(Value::as_str) {
            Some(body) if !body.trim().is_empty() => truncate(body, limits.description_limit),
            _ => NO_DESCRIPTION.to_string(),
        };

        Some(ExpandedItem {
            title: format!("{} {}", self.config.icon_for(item.status), item.title),
            url: item.canonical_url.clone(),
            author,
            labels,
            created_at,
            description,
        })
    }

    /// Expanded when asked for and possible, compact otherwise.
    pub fn content(&self, items: &[ResolvedItem], expand: bool) -> Content {
        if let [item] = items {
            if expand {
                if let Some(expanded) = self.expanded(item) {
                    return Content::Expanded(expanded);
                }
            }
        }
        Content::Compact {
            lines: items.iter().map(|item| self.compact_line(item)).collect(),
        }
    }

    /// A delete control for `owner_id`, plus a toggle when there is exactly
    /// one item and a toggle state.
    pub fn controls(
        &self,
        owner_id: ActorId,
        items: &[ResolvedItem],
        toggle: Option<ToggleState>,
    ) -> Vec<Control> {
        let mut controls = vec![Control::Delete { owner_id }];
        if let (Some(state), [item]) = (toggle, items) {
            controls.push(Control::Toggle {
                label: state.label().to_string(),
                token: ToggleToken::for_item(state, item).encode(),
            });
        }
        controls
    }

    pub fn present(
        &self,
        items: &[ResolvedItem],
        expand: bool,
        owner_id: ActorId,
        toggle: Option<ToggleState>,
    ) -> Presentation {
        Presentation {
            content: self.content(items, expand),
            controls: self.controls(owner_id, items, toggle),
        }
    }
}

/// Cut `text` to at most `limit` characters, marking the cut with `...`.
fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
