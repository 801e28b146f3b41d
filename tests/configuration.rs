// Configuration loading against the JSON fixtures.
use std::path::{Path, PathBuf};

use multiprofile::core::config::read_configuration_with;
use multiprofile::{BaseDirs, Configuration, ErrorKind, ProfileDefinition};

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn base_dirs() -> BaseDirs {
    BaseDirs {
        home: Some(PathBuf::from("/home/tester")),
        cache: Some(PathBuf::from("/home/tester/.cache")),
    }
}

fn expected(profile_path: impl Into<PathBuf>) -> Configuration {
    let mut config = Configuration::new(
        profile_path,
        vec![ProfileDefinition::new("test")
            .with_extension_file("extensions/foobar@example.org.xpi")
            .with_user_chrome_file("userChrome.css")
            .with_user_js_file("user.js")],
    );
    config.config_dir = fixtures();
    config
}

#[test]
fn profile_path_resolution() {
    let cases = [
        (
            "config-no-profile-path.json",
            PathBuf::from("/home/tester/.cache/multiprofile"),
        ),
        (
            "config-profile-path-from-home.json",
            PathBuf::from("/home/tester/.multiprofile"),
        ),
        (
            "config-profile-path-from-root.json",
            PathBuf::from("/tmp/multiprofile"),
        ),
        (
            "config-relative-profile-path.json",
            fixtures().join("multiprofile/profiles"),
        ),
    ];

    for (file, profile_path) in cases {
        let config = read_configuration_with(fixtures().join(file), &base_dirs())
            .unwrap_or_else(|e| panic!("{}: {}", file, e));
        assert_eq!(config, expected(profile_path), "{}", file);
        assert_eq!(config.config_dir, fixtures());
    }
}

#[test]
fn nonexistent_file_is_not_found() {
    let err = read_configuration_with(fixtures().join("config-nonexistent.json"), &base_dirs())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn invalid_files_are_config_errors() {
    for file in ["config-duplicate-labels.json", "config-malformed.json"] {
        let err = read_configuration_with(fixtures().join(file), &base_dirs()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid, "{}", file);
    }
}

#[test]
fn referenced_files_are_checked() {
    let config =
        read_configuration_with(fixtures().join("config-no-profile-path.json"), &base_dirs())
            .unwrap();
    config.check_files().unwrap();

    let mut broken = config.clone();
    broken.profiles[0].user_js_file = Some(PathBuf::from("missing.js"));
    let err = broken.check_files().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    assert!(err.to_string().contains("missing.js"));
}
