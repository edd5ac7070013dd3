use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use super::client::{GitHubClient, GitHubError, Result};
use super::endpoints;

#[derive(Debug, Deserialize)]
struct RepositorySummary {
    name: String,
}

/// Public repositories of one owner, keyed by lower-cased name.
#[derive(Debug, Clone, Default)]
pub struct RepositoryIndex {
    names: HashMap<String, String>,
}

impl RepositoryIndex {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .map(Into::into)
            .map(|name: String| (name.to_lowercase(), name))
            .collect();
        Self { names }
    }

    /// Canonical casing of `name`, if the owner has such a repository.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        self.names.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Fetch the first page of an owner's public repositories, trying the
/// organisation listing first and the user listing when no such
/// organisation exists.
pub async fn fetch_repository_index(client: &GitHubClient, owner: &str) -> Result<RepositoryIndex> {
    let mut fetched = client
        .get(&endpoints::org_repos(client.api_base(), owner))
        .await?;
    if fetched.status == 404 {
        debug!(owner, "not an organisation, trying user repositories");
        fetched = client
            .get(&endpoints::user_repos(client.api_base(), owner))
            .await?;
    }
    if !fetched.is_success() {
        return Err(GitHubError::Status {
            status: fetched.status,
        });
    }

    let repos: Vec<RepositorySummary> = serde_json::from_slice(&fetched.body)?;
    Ok(RepositoryIndex::from_names(repos.into_iter().map(|r| r.name)))
}
