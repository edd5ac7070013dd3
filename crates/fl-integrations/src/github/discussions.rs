use serde_json::{json, Value};

use fl_core::types::StatusTag;

use super::client::{GitHubClient, Result};

const DISCUSSION_QUERY: &str = r#"
query getDiscussion($user: String!, $repository: String!, $number: Int!) {
    repository(followRenames: true, owner: $user, name: $repository) {
        discussion(number: $number) {
            id
            title
            answer {
                id
            }
            url
        }
    }
}
"#;

/// Look up a discussion by number. `Ok(None)` when the repository has no
/// such discussion.
pub async fn fetch_discussion(
    client: &GitHubClient,
    owner: &str,
    repository: &str,
    number: u64,
) -> Result<Option<Value>> {
    let data = client
        .graphql(
            DISCUSSION_QUERY,
            json!({
                "user": owner,
                "repository": repository,
                "number": number,
            }),
        )
        .await?;

    Ok(data
        .get("repository")
        .and_then(|repo| repo.get("discussion"))
        .filter(|d| !d.is_null())
        .cloned())
}

/// A discussion is answered once an answer comment is marked.
pub fn classify_discussion(discussion: &Value) -> StatusTag {
    match discussion.get("answer") {
        Some(answer) if !answer.is_null() => StatusTag::DiscussionAnswered,
        _ => StatusTag::DiscussionUnanswered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answered_discussion() {
        let d = json!({"title": "How?", "answer": {"id": "DC_1"}, "url": "https://github.com/a/b/discussions/1"});
        assert_eq!(classify_discussion(&d), StatusTag::DiscussionAnswered);
    }

    #[test]
    fn unanswered_discussion() {
        assert_eq!(
            classify_discussion(&json!({"answer": null})),
            StatusTag::DiscussionUnanswered
        );
        assert_eq!(classify_discussion(&json!({})), StatusTag::DiscussionUnanswered);
    }
}
