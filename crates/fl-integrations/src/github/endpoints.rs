//! URL builders for the forge endpoints forgelink reads, plus the static
//! shape predicate that decides which cache tier a URL belongs to.

use urlencoding::encode;

/// Which cache tier a URL is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// `/orgs/{org}/repos` or `/users/{user}/repos`.
    RepositoryListing,
    /// Everything else (issues, pulls, users, ...).
    Item,
}

impl EndpointKind {
    pub fn of(url: &str) -> Self {
        let path = match reqwest::Url::parse(url) {
            Ok(parsed) => parsed.path().to_string(),
            Err(_) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
        };
        let segments: Vec<&str> = path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        match segments.as_slice() {
            [.., "orgs" | "users", _, "repos"] => EndpointKind::RepositoryListing,
            _ => EndpointKind::Item,
        }
    }
}

pub fn issue(api_base: &str, owner: &str, repository: &str, number: u64) -> String {
    format!(
        "{}/repos/{}/{}/issues/{}",
        api_base.trim_end_matches('/'),
        encode(owner),
        encode(repository),
        number
    )
}

pub fn org_repos(api_base: &str, org: &str) -> String {
    format!(
        "{}/orgs/{}/repos?per_page=100&type=public",
        api_base.trim_end_matches('/'),
        encode(org)
    )
}

pub fn user_repos(api_base: &str, user: &str) -> String {
    format!(
        "{}/users/{}/repos?per_page=100&type=public",
        api_base.trim_end_matches('/'),
        encode(user)
    )
}
