//! Integration tests for loading and saving `BookmarkConfig` files.

use par_mark_config::{BookmarkConfig, ConfigError, LineEndLabel, NamedColor, Shape};
use tempfile::tempdir;

#[test]
fn load_missing_file_yields_defaults() {
    let temp = tempdir().unwrap();
    let config = BookmarkConfig::load_from(&temp.path().join("missing.yaml")).unwrap();
    assert_eq!(config, BookmarkConfig::default());
}

#[test]
fn load_blank_file_yields_defaults() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.yaml");
    std::fs::write(&path, "   \n").unwrap();

    let config = BookmarkConfig::load_from(&path).unwrap();
    assert_eq!(config, BookmarkConfig::default());
}

#[test]
fn save_and_load_roundtrip() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("nested").join("config.yaml");

    let config = BookmarkConfig {
        colors: vec![
            NamedColor::new("ink", "#101010"),
            NamedColor::new("paper", "#f0f0f0"),
        ],
        default_shape: Shape::Star,
        line_end_label: LineEndLabel::Inverse,
        max_group_name_length: 12,
        ..BookmarkConfig::default()
    };
    config.save_to(&path).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("yaml.tmp").exists());

    let loaded = BookmarkConfig::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn load_normalizes_palette_colors() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.yaml");
    std::fs::write(
        &path,
        "colors:\n  - name: sky\n    color: \"#ABF\"\n  - name: bogus\n    color: nope\n",
    )
    .unwrap();

    let config = BookmarkConfig::load_from(&path).unwrap();
    assert_eq!(config.colors, vec![NamedColor::new("sky", "#aabbff")]);
}

#[test]
fn load_corrupt_file_returns_parse_error() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.yaml");
    std::fs::write(&path, "colors: [[[").unwrap();

    let result = BookmarkConfig::load_from(&path);
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn unknown_shape_is_a_parse_error() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.yaml");
    std::fs::write(&path, "default_shape: triangle\n").unwrap();

    assert!(BookmarkConfig::load_from(&path).is_err());
}
