use danglewatch::cli::Cli;
use danglewatch::config::Config;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

#[test]
fn test_load_full_valid_config() {
    let file = write_config(
        r#"
        log_level = "debug"
        [paths]
        targets_file = "/etc/danglewatch/domains.txt"
        output_dir = "/var/lib/danglewatch/results"
        ledger_file = "/var/lib/danglewatch/seen.txt"
        baseline_marker = "/var/lib/danglewatch/.baseline"
        [scheduler]
        interval_seconds = 600
        error_cooldown_seconds = 30
        target_delay_ms = 500
        [source]
        url = "https://ct.example.net/"
        lookback_days = 7
        max_records = 100
        timeout_seconds = 10
        retry_attempts = 3
        retry_delay_seconds = 1
        [dns]
        resolver = "1.1.1.1:53"
        timeout_ms = 2000
        [probe]
        timeout_ms = 1500
        max_redirects = 3
        concurrency = 8
        [notification]
        hook = "/usr/local/bin/alert"
        timeout_seconds = 15
        [metrics]
        enabled = true
        listen_address = "0.0.0.0:9100"
    "#,
    );

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.paths.targets_file, PathBuf::from("/etc/danglewatch/domains.txt"));
    assert_eq!(config.paths.baseline_marker, PathBuf::from("/var/lib/danglewatch/.baseline"));
    assert_eq!(config.scheduler.interval(), Duration::from_secs(600));
    assert_eq!(config.scheduler.target_delay(), Duration::from_millis(500));
    assert_eq!(config.source.url, "https://ct.example.net/");
    assert_eq!(config.source.lookback_days, 7);
    assert_eq!(config.source.retry_attempts, 3);
    assert_eq!(config.dns.resolver, Some("1.1.1.1:53".to_string()));
    assert_eq!(config.probe.concurrency, 8);
    assert_eq!(config.notification.hook, Some(PathBuf::from("/usr/local/bin/alert")));
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.listen_address.port(), 9100);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let file = write_config(
        r#"
        [source]
        lookback_days = 5
    "#,
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = Config::load(&cli).unwrap();

    let defaults = Config::default();
    assert_eq!(config.source.lookback_days, 5);
    assert_eq!(config.source.max_records, defaults.source.max_records);
    assert_eq!(config.source.url, "https://crt.sh/");
    assert_eq!(config.scheduler, defaults.scheduler);
    assert_eq!(config.paths, defaults.paths);
}

#[test]
fn test_cli_arguments_override_file() {
    let file = write_config(
        r#"
        log_level = "warn"
        [paths]
        targets_file = "from-file.txt"
        [scheduler]
        interval_seconds = 900
    "#,
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        targets: Some(PathBuf::from("from-cli.txt")),
        interval: Some(60),
        ..Default::default()
    };
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.paths.targets_file, PathBuf::from("from-cli.txt"));
    assert_eq!(config.scheduler.interval_seconds, 60);
    assert_eq!(config.log_level, "warn");
}

#[test]
fn test_missing_explicit_config_file_is_an_error() {
    let cli = Cli {
        config: Some(PathBuf::from("/nonexistent/danglewatch.toml")),
        ..Default::default()
    };
    let err = Config::load(&cli).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config(
        r#"
        [source]
        retry_attempts = 5
    "#,
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    assert!(Config::load(&cli).is_err());
}

#[test]
fn test_malformed_toml_is_an_error() {
    let file = write_config("[scheduler\ninterval_seconds = ");
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    assert!(Config::load(&cli).is_err());
}
