//! Configuration loading tests.

use std::io::Write;
use tabula_views::{ViewsConfig, ViewsConfigBuilder};
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = ViewsConfig::default();
    assert_eq!(*config.row_page_size_limit(), 200);
    assert_eq!(*config.slug_bytes(), 32);
    assert_eq!(*config.event_capacity(), 256);
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_file_with_partial_keys() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "row_page_size_limit = 50").unwrap();

    let config = ViewsConfig::from_file(file.path()).unwrap();
    assert_eq!(*config.row_page_size_limit(), 50);
    assert_eq!(*config.slug_bytes(), 32);
}

#[test]
fn test_from_file_missing() {
    let err = ViewsConfig::from_file("/definitely/not/here.toml").unwrap_err();
    assert!(err.message.contains("cannot read config"));
}

#[test]
fn test_invalid_values_rejected() {
    let err = ViewsConfig::from_toml_str("slug_bytes = 4").unwrap_err();
    assert!(err.message.contains("slug_bytes"));

    let err = ViewsConfig::from_toml_str("row_page_size_limit = 0").unwrap_err();
    assert!(err.message.contains("row_page_size_limit"));

    let err = ViewsConfig::from_toml_str("row_page_size_limit = \"many\"").unwrap_err();
    assert!(err.message.contains("invalid config"));
}

#[test]
fn test_builder_keeps_unset_defaults() {
    let config = ViewsConfigBuilder::default()
        .event_capacity(8usize)
        .build()
        .unwrap();
    assert_eq!(*config.event_capacity(), 8);
    assert_eq!(*config.row_page_size_limit(), 200);
}
