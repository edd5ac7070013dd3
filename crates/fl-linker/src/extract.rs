//! Reference extraction from free-form text.
//!
//! Two forms are recognised:
//! - short: `org/repo#123` or `repo#123`
//! - long: `https://github.com/org/repo/issues/123` (or `/pull/123`), only
//!   when full-URL links are enabled for the group
//!
//! Anything inside fenced code blocks or inline code spans is ignored.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use fl_core::types::Reference;

use crate::error::LinkError;

static CODE_REGION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```.*?```|`[^`]*`").expect("valid regex")
});

static SHORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"((?P<org>[a-zA-Z0-9][a-zA-Z0-9\-]{0,38})/)?(?P<repo>[\w\-\.]{1,100})#(?P<number>[0-9]+)",
    )
    .expect("valid regex")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https?://github\.com/(?P<org>[a-zA-Z0-9][a-zA-Z0-9\-]{0,38})/(?P<repo>[\w\-\.]{1,100})/(?P<kind>issues|pull)/(?P<number>[0-9]+)[^\s<>]*",
    )
    .expect("valid regex")
});

/// Blank out code regions so nothing inside them matches.
pub fn strip_code_regions(text: &str) -> String {
    CODE_REGION_RE.replace_all(text, " ").into_owned()
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceExtractor {
    max_references: usize,
}

impl ReferenceExtractor {
    pub fn new(max_references: usize) -> Self {
        Self { max_references }
    }

    pub fn max_references(&self) -> usize {
        self.max_references
    }

    /// Extract the distinct references in `text`, in first-seen order.
    ///
    /// Fails with [`LinkError::TooMany`] when more than `max_references`
    /// distinct references are present.
    pub fn extract(&self, text: &str, allow_full_urls: bool) -> Result<Vec<Reference>, LinkError> {
        let stripped = strip_code_regions(text);

        let short = SHORT_RE
            .captures_iter(&stripped)
            .filter_map(|caps| reference_from(&caps, false));
        let mut found: Vec<Reference> = short.collect();
        if allow_full_urls {
            found.extend(
                URL_RE
                    .captures_iter(&stripped)
                    .filter(is_bare_item_url)
                    .filter_map(|caps| reference_from(&caps, true)),
            );
        }

        let mut references = dedupe(found);
        if references.iter().filter(|r| r.expand_hint()).count() > 1 {
            references = references
                .into_iter()
                .map(|r| r.with_expand_hint(false))
                .collect();
        }

        if references.len() > self.max_references {
            debug!(
                count = references.len(),
                max = self.max_references,
                "too many references"
            );
            return Err(LinkError::TooMany {
                count: references.len(),
                max: self.max_references,
            });
        }
        Ok(references)
    }
}

fn reference_from(caps: &Captures<'_>, expand_hint: bool) -> Option<Reference> {
    let number = caps.name("number")?.as_str().parse::<u64>().ok()?;
    let repository = caps.name("repo")?.as_str().to_lowercase();
    let organisation = caps.name("org").map(|m| m.as_str().to_string());
    Some(Reference::new(organisation, repository, number).with_expand_hint(expand_hint))
}

/// The long form only counts when the number is the last path segment and
/// no query or fragment follows.
fn is_bare_item_url(caps: &Captures<'_>) -> bool {
    let (Some(whole), Some(number)) = (caps.get(0), caps.name("number")) else {
        return false;
    };
    let (rest, fragment) = whole.as_str().split_once('#').unwrap_or((whole.as_str(), ""));
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
    if !fragment.is_empty() || !query.is_empty() {
        return false;
    }
    path.trim_end_matches('/').rsplit('/').next() == Some(number.as_str())
}

fn dedupe(found: Vec<Reference>) -> Vec<Reference> {
    let mut positions: HashMap<Reference, usize> = HashMap::new();
    let mut unique: Vec<Reference> = Vec::new();
    for reference in found {
        match positions.get(&reference) {
            Some(&at) => {
                if reference.expand_hint() && !unique[at].expand_hint() {
                    unique[at] = unique[at].with_expand_hint(true);
                }
            }
            None => {
                positions.insert(reference.clone(), unique.len());
                unique.push(reference);
            }
        }
    }
    unique
}
