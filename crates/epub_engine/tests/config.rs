use epub_engine::{ConfigError, EngineConfig, ExportOptions, DEFAULT_IMAGE_CONCURRENCY};
use pretty_assertions::assert_eq;

#[test]
fn defaults_match_the_documented_values() {
    let options = ExportOptions::default();
    assert_eq!(options.default_language, "zh-CN");
    assert_eq!(options.image_concurrency, DEFAULT_IMAGE_CONCURRENCY);

    let config = EngineConfig::new("out");
    assert_eq!(config.export, options);
    assert_eq!(config.output_dir.to_str(), Some("out"));
}

#[test]
fn partial_ron_keeps_defaults_for_missing_fields() {
    let options = ExportOptions::from_ron(r#"(default_language: "en-US")"#).unwrap();
    assert_eq!(
        options,
        ExportOptions {
            default_language: "en-US".to_string(),
            image_concurrency: DEFAULT_IMAGE_CONCURRENCY,
        }
    );
}

#[test]
fn options_survive_a_ron_round_trip() {
    let options = ExportOptions {
        default_language: "ja".to_string(),
        image_concurrency: 8,
    };
    let text = options.to_ron().unwrap();
    assert_eq!(ExportOptions::from_ron(&text).unwrap(), options);
}

#[test]
fn bad_ron_is_rejected() {
    assert!(matches!(
        ExportOptions::from_ron("(image_concurrency: 0)"),
        Err(ConfigError::ZeroConcurrency)
    ));
    assert!(matches!(
        ExportOptions::from_ron("(image_concurrency: \"many\")"),
        Err(ConfigError::Parse(_))
    ));
}
