use super::*;
use std::collections::HashMap;
use std::io::Write;

#[test]
fn test_defaults_match_stock_deployment() {
    let config = Config::default();
    assert_eq!(config.route.endpoint, "https://rxnmapper.ai/api/route");
    assert_eq!(config.depiction.size, 300);
    assert_eq!(config.depiction.max_smiles_len, 500);
    assert_eq!(config.page.default_smiles, "CC(=O)Oc1ccccc1C(=O)O");
    assert!(config.route.allowed_hosts.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::from_path_or_default(dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[server]
port = 9000

[route]
timeout_secs = 5
allowed_hosts = ["rxnmapper.ai"]
"#
    )
    .unwrap();

    let config = Config::from_path_or_default(file.path()).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.route.timeout(), Duration::from_secs(5));
    assert_eq!(config.route.connect_timeout(), Duration::from_secs(10));
    assert_eq!(config.route.allowed_hosts, vec!["rxnmapper.ai".to_string()]);
    assert_eq!(config.page, PageConfig::default());
}

#[test]
fn test_malformed_file_is_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[server\nport = ").unwrap();
    let err = Config::from_path_or_default(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
        ("SYNROUTE_HOST", "0.0.0.0"),
        ("SYNROUTE_PORT", "8080"),
        ("SYNROUTE_ROUTE_ENDPOINT", "http://localhost:7000/route"),
        ("SYNROUTE_ROUTE_TIMEOUT_SECS", "3"),
    ]
    .into_iter()
    .collect();

    let mut config = Config::default();
    config
        .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    assert_eq!(config.route.endpoint, "http://localhost:7000/route");
    assert_eq!(config.route.timeout_secs, 3);
}

#[test]
fn test_bad_port_override_is_rejected() {
    let mut config = Config::default();
    let err = config
        .apply_env_overrides(|k| (k == "SYNROUTE_PORT").then(|| "http".to_string()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnv { key: "SYNROUTE_PORT", .. }));
}

#[test]
fn test_zero_timeout_fails_validation() {
    let mut config = Config::default();
    config.route.timeout_secs = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.depiction.size = 10;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.depiction.max_smiles_len = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_max_smiles_len_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[depiction]\nmax_smiles_len = 120").unwrap();

    let config = Config::from_path_or_default(file.path()).unwrap();
    assert_eq!(config.depiction.max_smiles_len, 120);
    assert_eq!(config.depiction.size, 300);
}
