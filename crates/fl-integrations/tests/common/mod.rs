#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fl_core::config::{CacheConfig, GitHubSettings};
use fl_integrations::github::client::GitHubClient;
use fl_integrations::github::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use reqwest::header::{HeaderValue, ETAG};
use serde_json::Value;

pub const API: &str = "https://api.github.com";
pub const GRAPHQL: &str = "https://api.github.com/graphql";

type Scripted = Result<HttpResponse, TransportError>;

/// In-memory transport answering from per-URL queues and recording every
/// request it sees. The last queued answer for a URL repeats; unknown URLs
/// get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, url: &str, response: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn push_json(&self, url: &str, status: u16, body: &Value, etag: Option<&str>) {
        let mut response = HttpResponse::new(status, serde_json::to_vec(body).unwrap());
        if let Some(etag) = etag {
            response
                .headers
                .insert(ETAG, HeaderValue::from_str(etag).unwrap());
        }
        self.push(url, Ok(response));
    }

    pub fn push_not_modified(&self, url: &str) {
        self.push(url, Ok(HttpResponse::new(304, b"")));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
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

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, url: &str) -> Scripted {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue.front().cloned().unwrap(),
            _ => Ok(HttpResponse::new(404, br#"{"message":"Not Found"}"#)),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.next_response(&url)
    }
}

pub fn client(transport: Arc<ScriptedTransport>) -> GitHubClient {
    GitHubClient::new(
        &GitHubSettings::default(),
        &CacheConfig::default(),
        Some("test-token"),
        transport,
    )
    .unwrap()
}

pub fn issue_url(owner: &str, repo: &str, number: u64) -> String {
    format!("{API}/repos/{owner}/{repo}/issues/{number}")
}
