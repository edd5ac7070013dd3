use std::io::Write;

use fl_core::config::Config;
use fl_core::types::StatusTag;

#[test]
fn default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.general.log_level, "info");
    assert_eq!(cfg.github.api_base, "https://api.github.com");
    assert_eq!(cfg.github.graphql_url, "https://api.github.com/graphql");
    assert_eq!(cfg.github.request_timeout_secs, 20);
    assert_eq!(cfg.github.token_env, "GITHUB_TOKEN");
    assert_eq!(cfg.cache.item_ttl_secs, 86_400);
    assert_eq!(cfg.cache.index_ttl_secs, 1_800);
    assert_eq!(cfg.linking.max_references, 6);
    assert_eq!(cfg.linking.record_ttl_secs, 600);
    cfg.validate().expect("defaults validate");
}

#[test]
fn config_roundtrip() {
    let cfg = Config::default();
    let toml_str = cfg.to_toml().expect("serialize to toml");
    assert!(toml_str.contains("api.github.com"));

    let parsed: Config = toml::from_str(&toml_str).expect("parse toml back");
    assert_eq!(parsed.cache.item_ttl_secs, cfg.cache.item_ttl_secs);
    assert_eq!(parsed.linking.max_references, cfg.linking.max_references);
    parsed.validate().expect("config validates");
}

#[test]
fn config_partial_toml() {
    let partial = r#"
[linking]
max_references = 3

[icons]
pull_request_merged = "<:pull_merged:1>"
"#;
    let cfg: Config = toml::from_str(partial).expect("parse partial");
    assert_eq!(cfg.linking.max_references, 3);
    assert_eq!(cfg.linking.description_limit, 2700);
    assert_eq!(cfg.cache.index_ttl_secs, 1800);
    assert_eq!(cfg.icon_for(StatusTag::PullRequestMerged), "<:pull_merged:1>");
    assert_eq!(cfg.icon_for(StatusTag::IssueOpen), ":issue_open:");
    cfg.validate().expect("config validates");
}

#[test]
fn zero_cap_fails_validation() {
    let mut cfg = Config::default();
    cfg.linking.max_references = 0;
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("max_references"));
}

#[test]
fn non_http_api_base_fails_validation() {
    let mut cfg = Config::default();
    cfg.github.api_base = "ftp://example.com".to_string();
    let err = cfg.validate().expect_err("validation should fail");
    assert!(err.to_string().contains("github.api_base"));
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[cache]\nindex_ttl_secs = 60").unwrap();

    let cfg = Config::load_from(file.path()).expect("load from file");
    assert_eq!(cfg.cache.index_ttl_secs, 60);
    assert_eq!(cfg.cache.item_ttl_secs, 86_400);
}

#[test]
fn load_from_missing_file_is_io_error() {
    let err = Config::load_from("/definitely/not/here.toml").expect_err("missing file");
    assert!(err.to_string().starts_with("io:"));
}
