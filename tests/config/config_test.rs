//! Coverage for config parsing and path resolution.

use std::io::Write;

use chat_bridge::config::{
    config_dir, default_config_path, load_config, parse_config, AttachPolicy, BridgeConfig,
    Registration,
};

#[test]
fn default_values() {
    let config = BridgeConfig::default();
    assert_eq!(config.channels.attach_policy, AttachPolicy::Replace);
    assert_eq!(config.channels.registration, Registration::Lazy);
    assert_eq!(config.channels.prefix, "plugins.flutter.zendesk_chat_api");
    assert_eq!(config.stream.buffer, 64);
    assert!(config.validate().is_ok());
}

#[test]
fn parse_full_config() {
    let toml_str = r#"
[channels]
attach_policy = "reject"
registration = "eager"
prefix = "com.example.chat"

[stream]
buffer = 8
"#;
    let config = match parse_config(toml_str) {
        Ok(config) => config,
        Err(err) => panic!("full config should parse: {err}"),
    };
    assert_eq!(config.channels.attach_policy, AttachPolicy::Reject);
    assert_eq!(config.channels.registration, Registration::Eager);
    assert_eq!(config.channels.prefix, "com.example.chat");
    assert_eq!(config.stream.buffer, 8);
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config = parse_config("[channels]\nattach_policy = \"reject\"\n").expect("parse");
    assert_eq!(config.channels.registration, Registration::Lazy);
    assert_eq!(config.stream.buffer, 64);
}

#[test]
fn zero_buffer_is_rejected() {
    let result = parse_config("[stream]\nbuffer = 0\n");
    let err = result.expect_err("zero buffer should fail validation");
    assert!(err.to_string().contains("stream.buffer"));
}

#[test]
fn unknown_policy_is_rejected() {
    assert!(parse_config("[channels]\nattach_policy = \"queue\"\n").is_err());
}

#[test]
fn load_config_reads_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[stream]\nbuffer = 3").expect("write config");

    let config = load_config(file.path()).expect("config should load");
    assert_eq!(config.stream.buffer, 3);
}

#[test]
fn load_config_reports_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("missing.toml");

    let err = load_config(&path).expect_err("missing file should fail");
    assert!(err.to_string().contains("missing.toml"));
}

#[test]
fn config_renders_back_to_toml() {
    let rendered = toml::to_string(&BridgeConfig::default()).expect("render");
    let reparsed = parse_config(&rendered).expect("rendered config should parse");
    assert_eq!(reparsed, BridgeConfig::default());
}

#[test]
fn config_paths_resolve() {
    let dir = match config_dir() {
        Ok(path) => path,
        Err(err) => panic!("config dir should resolve: {err}"),
    };
    assert!(dir.ends_with(".chat-bridge"));

    let file = default_config_path().expect("default path");
    assert!(file.ends_with(".chat-bridge/config.toml"));
}
