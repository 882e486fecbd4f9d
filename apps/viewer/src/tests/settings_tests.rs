use super::*;
use std::collections::HashMap;

use shared::domain::ModeName;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_match_client_config() {
    let config = Settings::default().viewer_config();
    assert_eq!(config, ViewerConfig::default());
}

#[test]
fn file_overrides_only_present_keys() {
    let mut settings = Settings::default();
    settings
        .apply_file(
            r#"
server_url = "http://decoder.lan:9000"
page_size = 30
"#,
        )
        .expect("settings file");

    assert_eq!(settings.server_url, "http://decoder.lan:9000");
    assert_eq!(settings.page_size, 30);
    assert_eq!(settings.mode, DEFAULT_SESSION_MODE);
    assert_eq!(settings.request_timeout_secs, 10);
}

#[test]
fn env_wins_over_file() {
    let mut settings = Settings::default();
    settings
        .apply_file("mode = \"Scottie1\"\nrequest_timeout_secs = 3\n")
        .expect("settings file");
    settings.apply_env(env(&[
        ("VIEWER_MODE", "Robot36"),
        ("VIEWER_REQUEST_TIMEOUT_SECS", "soon"),
    ]));

    assert_eq!(settings.mode, "Robot36");
    assert_eq!(settings.request_timeout_secs, 3, "unparseable value is skipped");
    assert_eq!(
        settings.viewer_config().session_mode,
        ModeName::from("Robot36")
    );
}

#[test]
fn extra_modes_extend_builtin_table() {
    let mut settings = Settings::default();
    settings
        .apply_file(
            r#"
[modes]
PD120 = { width = 640, height = 496 }
Broken = { width = 0, height = 10 }
Typo = { width = 100000, height = 100000 }
"#,
        )
        .expect("settings file");

    let registry = settings.mode_registry();
    assert_eq!(
        registry.lookup(&"PD120".into()).expect("pd120"),
        Dimensions { width: 640, height: 496 }
    );
    assert!(!registry.contains(&"Broken".into()));
    assert!(!registry.contains(&"Typo".into()));
    assert!(registry.contains(&"Martin1".into()));
}

#[test]
fn rejects_malformed_file() {
    let mut settings = Settings::default();
    assert!(settings.apply_file("page_size = \"many\"").is_err());
    assert!(settings.apply_file("bind_addr = \"0.0.0.0\"").is_err());
    assert_eq!(settings, Settings::default());
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let settings = load_settings(Path::new("/nonexistent/viewer.toml"));
    assert!(settings.extra_modes.is_empty());
}
