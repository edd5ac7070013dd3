use std::sync::Arc;

use anyhow::Context;
use fl_core::config::Config;
use fl_core::types::{Feature, FetchOutcome, UnitContext};
use fl_integrations::github::transport::ReqwestTransport;
use fl_linker::features::StaticSettings;
use fl_linker::render::SummaryBuilder;
use fl_linker::Linker;

pub struct ResolveOptions {
    pub org: Option<String>,
    pub full_urls: bool,
    pub discussions: bool,
    pub json: bool,
}

impl ResolveOptions {
    fn settings(&self) -> StaticSettings {
        let mut settings = StaticSettings::new(self.org.clone());
        if self.full_urls {
            settings = settings.with_feature(Feature::FullUrlLinks);
        }
        if self.discussions {
            settings = settings.with_feature(Feature::DiscussionFallback);
        }
        settings
    }
}

/// Run the `resolve` subcommand: find references in `text`, resolve them
/// against GitHub and print one line per reference.
pub async fn run(config: Config, text: &str, options: ResolveOptions) -> anyhow::Result<()> {
    let transport = ReqwestTransport::new(config.github.request_timeout(), &config.github.user_agent)
        .context("failed to build HTTP client")?;
    let linker = Linker::from_config(config, Arc::new(transport), Arc::new(options.settings()))?;

    let ctx = UnitContext {
        unit_id: 0,
        group_id: None,
        author_id: 0,
    };
    let outcomes = linker.extract_and_resolve(text, &ctx).await?;
    tracing::debug!(stats = ?linker.cache_stats(), "resolve finished");

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }
    if outcomes.is_empty() {
        eprintln!("No references found.");
        return Ok(());
    }
    for line in summary_lines(linker.summary(), &outcomes) {
        println!("{line}");
    }
    Ok(())
}

fn summary_lines(summary: &SummaryBuilder, outcomes: &[FetchOutcome]) -> Vec<String> {
    summary
        .compact(outcomes, true)
        .lines()
        .map(<[String]>::to_vec)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::types::{ErrorKind, ResolvedItem, StatusTag};

    #[test]
    fn lines_include_failures() {
        let summary = SummaryBuilder::new(Arc::new(Config::default()));
        let outcomes = vec![
            FetchOutcome::Resolved(ResolvedItem {
                organisation: "rust-lang".into(),
                repository: "rust".into(),
                number: 1,
                canonical_url: "https://github.com/rust-lang/rust/pull/1".into(),
                title: "Initial".into(),
                status: StatusTag::PullRequestMerged,
                raw_payload: None,
            }),
            FetchOutcome::failed(ErrorKind::RateLimited, 403, "Rate limit has been hit!"),
        ];

        let lines = summary_lines(&summary, &outcomes);
        assert_eq!(
            lines,
            vec![
                r":pull_request_merged: [\(#1\) Initial](https://github.com/rust-lang/rust/pull/1)"
                    .to_string(),
                ":x: [403] Rate limit has been hit!".to_string(),
            ]
        );
    }

    #[test]
    fn flags_become_features() {
        let options = ResolveOptions {
            org: Some("rust-lang".into()),
            full_urls: true,
            discussions: false,
            json: false,
        };
        let debug = format!("{:?}", options.settings());
        assert!(debug.contains("FullUrlLinks"));
        assert!(!debug.contains("DiscussionFallback"));
        assert!(debug.contains("rust-lang"));
    }
}
