use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use insdc_bench::candidates::SraTemplate;
use insdc_bench::config::{Config, ConfigLoader};
use insdc_bench::error::BenchError;

#[test]
fn custom_config_merges_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("insdc-bench.json");
    fs::write(
        &path,
        r#"{
            "site": "pawsey",
            "api_endpoint": "https://custom.api.com/submit",
            "timeout": 600
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(config.site, "pawsey");
    assert_eq!(config.api_endpoint, "https://custom.api.com/submit");
    assert_eq!(config.timeout, 600);
    assert!(config.cleanup);
    assert_eq!(config.download_dir, Utf8PathBuf::from("./downloads"));
    assert_eq!(config.api_token(), None);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, BenchError::ConfigRead(_));
}

#[test]
fn malformed_json_is_a_parse_error() {
    assert_matches!(
        ConfigLoader::parse("{ site: pawsey"),
        Err(BenchError::ConfigParse(_))
    );
}

#[test]
fn template_override_is_validated() {
    let err = ConfigLoader::parse(r#"{"sra_template": {"key": "no-placeholder"}}"#).unwrap_err();
    assert_matches!(err, BenchError::InvalidTemplate(_));

    let config = ConfigLoader::parse(r#"{"sra_template": {"suffix": ".sralite"}}"#).unwrap();
    assert_eq!(config.sra_template.suffix, ".sralite");
    assert_eq!(config.sra_template.key, SraTemplate::default().key);
}

#[test]
fn defaults() {
    let config = Config::default();
    assert_eq!(config.site, "nci");
    assert_eq!(config.timeout, 300);
    assert_eq!(config.sample_interval_ms, 500);
    let token = Config {
        api_token: " secret ".to_string(),
        ..Config::default()
    };
    assert_eq!(token.api_token(), Some("secret"));
}
