//! Expand/collapse toggle tokens.
//!
//! A token carries everything needed to act on a toggle press without any
//! server-side session: who owns the toggle, whether the item is currently
//! expanded, and which item it shows.
//!
//! `gh:issue-expand-v1:{owner_id}:{0|1}:{org}/{repo}#{number}`

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use fl_core::types::{ActorId, Reference, ResolvedItem};

use crate::error::LinkError;

pub const TOKEN_PREFIX: &str = "gh:issue-expand-v1:";

pub const COLLAPSE_REFUSED: &str = "Sorry, but you cannot collapse this issue!";

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^gh:issue-expand-v1:(?P<owner>[0-9]+):(?P<state>[01]):",
        r"(?P<org>[a-zA-Z0-9][a-zA-Z0-9\-]{0,38})/(?P<repo>[\w\-\.]{1,100})#(?P<number>[0-9]+)$",
    ))
    .expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleState {
    pub owner_id: ActorId,
    pub expanded: bool,
}

impl ToggleState {
    pub fn label(&self) -> &'static str {
        if self.expanded {
            "Show less"
        } else {
            "Show more"
        }
    }
}

/// What a press on the toggle by a given actor should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDecision {
    /// Flip the shared state.
    Flip,
    /// Show the expanded item privately to the actor; shared state untouched.
    Ephemeral,
    /// Only the owner may collapse.
    Refuse,
}

pub fn decide(state: &ToggleState, actor_id: ActorId) -> ToggleDecision {
    if actor_id == state.owner_id {
        ToggleDecision::Flip
    } else if state.expanded {
        ToggleDecision::Refuse
    } else {
        ToggleDecision::Ephemeral
    }
}

// ---------------------------------------------------------------------------
// ToggleToken
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleToken {
    pub state: ToggleState,
    pub reference: Reference,
}

impl ToggleToken {
    pub fn for_item(state: ToggleState, item: &ResolvedItem) -> Self {
        Self {
            state,
            reference: item.reference(),
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "{}{}:{}:{}/{}#{}",
            TOKEN_PREFIX,
            self.state.owner_id,
            u8::from(self.state.expanded),
            self.reference.organisation().unwrap_or_default(),
            self.reference.repository(),
            self.reference.number()
        )
    }

    pub fn decode(token: &str) -> Result<Self, LinkError> {
        let invalid = || LinkError::InvalidToken(token.to_string());
        let caps = TOKEN_RE.captures(token).ok_or_else(invalid)?;

        let owner_id = caps["owner"].parse::<ActorId>().map_err(|_| invalid())?;
        let number = caps["number"].parse::<u64>().map_err(|_| invalid())?;
        Ok(Self {
            state: ToggleState {
                owner_id,
                expanded: &caps["state"] == "1",
            },
            reference: Reference::qualified(&caps["org"], &caps["repo"], number),
        })
    }

    /// The token after `actor_id` flips it.
    pub fn flipped(&self, actor_id: ActorId) -> Self {
        Self {
            state: ToggleState {
                owner_id: actor_id,
                expanded: !self.state.expanded,
            },
            reference: self.reference.clone(),
        }
    }
}

impl fmt::Display for ToggleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(owner_id: ActorId, expanded: bool) -> ToggleToken {
        ToggleToken {
            state: ToggleState { owner_id, expanded },
            reference: Reference::qualified("python-discord", "Bot", 2041),
        }
    }

    #[test]
    fn encodes_wire_format() {
        assert_eq!(
            token(42, true).encode(),
            "gh:issue-expand-v1:42:1:python-discord/Bot#2041"
        );
        assert_eq!(
            token(7, false).to_string(),
            "gh:issue-expand-v1:7:0:python-discord/Bot#2041"
        );
    }

    #[test]
    fn decode_round_trips() {
        let original = token(42, true);
        let decoded = ToggleToken::decode(&original.encode()).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(decoded.reference.repository(), "Bot");
        assert_eq!(decoded.reference.organisation(), Some("python-discord"));
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in [
            "",
            "gh:issue-expand-v1:42:2:a/b#1",
            "gh:issue-expand-v2:42:1:a/b#1",
            "gh:issue-expand-v1:x:1:a/b#1",
            "gh:issue-expand-v1:42:1:a/b#1 trailing",
            "gh:issue-expand-v1:42:1:b#1",
            "gh:issue-expand-v1:99999999999999999999999:1:a/b#1",
        ] {
            let err = ToggleToken::decode(bad).unwrap_err();
            assert!(matches!(err, LinkError::InvalidToken(_)), "{bad}");
        }
    }

    #[test]
    fn only_owner_may_collapse() {
        let expanded = token(42, true).state;
        assert_eq!(decide(&expanded, 99), ToggleDecision::Refuse);
        assert_eq!(decide(&expanded, 42), ToggleDecision::Flip);

        let collapsed = token(42, false).state;
        assert_eq!(decide(&collapsed, 99), ToggleDecision::Ephemeral);
        assert_eq!(decide(&collapsed, 42), ToggleDecision::Flip);
    }

    #[test]
    fn flip_keeps_reference() {
        let flipped = token(42, true).flipped(42);
        assert!(!flipped.state.expanded);
        assert_eq!(flipped.state.owner_id, 42);
        assert_eq!(flipped.reference, token(42, true).reference);
        assert_eq!(flipped.state.label(), "Show more");
    }
}
