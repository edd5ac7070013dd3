#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fl_core::config::Config;
use fl_core::types::UnitContext;
use fl_integrations::github::client::GitHubClient;
use fl_integrations::github::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use fl_linker::features::StaticSettings;
use fl_linker::Linker;
use reqwest::header::{HeaderValue, ETAG};
use serde_json::{json, Value};

pub const API: &str = "https://api.github.com";

/// Answers from per-URL queues (the last answer repeats) and records every
/// request. Unknown URLs get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_json(&self, url: &str, status: u16, body: &Value, etag: Option<&str>) {
        let mut response = HttpResponse::new(status, serde_json::to_vec(body).unwrap());
        if let Some(etag) = etag {
            response
                .headers
                .insert(ETAG, HeaderValue::from_str(etag).unwrap());
        }
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn push_not_modified(&self, url: &str) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(HttpResponse::new(304, b""));
    }

    /// Serve an open issue at `org/repo#number`.
    pub fn serve_issue(&self, org: &str, repo: &str, number: u64, title: &str) {
        self.push_json(
            &issue_url(org, repo, number),
            200,
            &issue_payload(org, repo, number, title),
            Some(&format!("\"{org}-{repo}-{number}\"")),
        );
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        let response = match routes.get_mut(&url) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| HttpResponse::new(404, br#"{"message":"Not Found"}"#)))
    }
}

pub fn issue_url(org: &str, repo: &str, number: u64) -> String {
    format!("{API}/repos/{org}/{repo}/issues/{number}")
}

pub fn org_repos_url(org: &str) -> String {
    format!("{API}/orgs/{org}/repos?per_page=100&type=public")
}

pub fn issue_payload(org: &str, repo: &str, number: u64, title: &str) -> Value {
    json!({
        "title": title,
        "state": "open",
        "html_url": format!("https://github.com/{org}/{repo}/issues/{number}"),
        "user": {
            "login": "octocat",
            "html_url": "https://github.com/octocat",
            "avatar_url": "https://avatars.githubusercontent.com/u/1"
        },
        "labels": [{"name": "bug"}],
        "created_at": "2024-05-01T09:30:00Z",
        "body": "Steps to reproduce."
    })
}

pub fn linker(transport: &Arc<ScriptedTransport>, settings: StaticSettings) -> Linker {
    let config = Config::default();
    let client = GitHubClient::new(&config.github, &config.cache, Some("token"), transport.clone())
        .unwrap();
    Linker::new(Arc::new(config), client, Arc::new(settings))
}

pub fn ctx(unit_id: u64, author_id: u64) -> UnitContext {
    UnitContext {
        unit_id,
        group_id: Some(1),
        author_id,
    }
}
