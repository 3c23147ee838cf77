use dataset_multiplier::config::{Config, Environment};
use dataset_multiplier::upload::PollPolicy;
use std::time::Duration;

#[test]
fn parse_example_config() {
    let raw = include_str!("../dataset-multiplier.example.toml");
    let cfg = Config::from_toml(raw, "example").expect("parse TOML");
    assert_eq!(cfg.api.environment, Environment::Development);
    assert_eq!(cfg.api.base_url().unwrap().as_str(), "http://localhost:8000/api/");
    assert_eq!(cfg.limits.max_upload_bytes, 100 * 1024 * 1024);
    assert_eq!(cfg.workflow.default_multiplier.get(), 5);
    assert!(!cfg.logging.json);

    let poll = PollPolicy::from(&cfg.polling);
    assert_eq!(poll.initial_interval, Duration::from_millis(500));
    assert_eq!(poll.deadline, Duration::from_secs(600));
}

#[test]
fn load_from_disk_and_switch_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset-multiplier.toml");
    std::fs::write(
        &path,
        "[api]\nenvironment = \"production\"\ndevelopment_url = \"http://localhost:8000/api\"\nproduction_url = \"https://prod.example.com/api\"\nrequest_timeout_secs = 60\n",
    )
    .unwrap();

    let cfg = Config::load(&path).unwrap();
    assert_eq!(cfg.api.environment, Environment::Production);
    assert_eq!(cfg.api.base_url().unwrap().as_str(), "https://prod.example.com/api/");
    assert_eq!(cfg.limits.accepted_extension, ".zip");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(&dir.path().join("nope.toml")).is_err());
}
