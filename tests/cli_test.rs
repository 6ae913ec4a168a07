use std::io::Write;

use clap::Parser;
use serde_json::json;

use farecast::cli::{Cli, EXIT_FAILURE, EXIT_OK, run};
use farecast::runner::ExecutionMode;

fn no_env(_key: &str) -> Option<String> {
    None
}

fn channels_file(payload: serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{payload}").unwrap();
    file
}

fn one_channel() -> serde_json::Value {
    json!({ "telegram_bot_token": "123:abc", "telegram_channel_id": "@deals", "origin": "TLV" })
}

#[test]
fn source_is_required() {
    assert!(Cli::try_parse_from(["farecast"]).is_err());
}

#[test]
fn config_and_from_env_are_exclusive() {
    let result = Cli::try_parse_from(["farecast", "--config", "c.json", "--from-env"]);
    assert!(result.is_err());
}

#[test]
fn flags_parse() {
    let cli = Cli::try_parse_from(["farecast", "-c", "c.json", "-p", "--dry-run"]).unwrap();
    assert_eq!(cli.mode(), ExecutionMode::Parallel);
    assert!(cli.dry_run);
    assert_eq!(cli.log_level, "info");

    let cli = Cli::try_parse_from(["farecast", "--from-env"]).unwrap();
    assert_eq!(cli.mode(), ExecutionMode::Sequential);
    assert!(cli.config.is_none());
}

#[tokio::test]
async fn print_cron_exits_zero() {
    let file = channels_file(json!({ "channels": [one_channel()], "cron": "0 9 * * *" }));
    let path = file.path().to_str().unwrap();
    let cli = Cli::try_parse_from(["farecast", "--config", path, "--print-cron"]).unwrap();

    assert_eq!(run(&cli, no_env).await.unwrap(), EXIT_OK);
}

#[tokio::test]
async fn print_cron_without_cron_is_an_error() {
    let file = channels_file(json!([one_channel()]));
    let path = file.path().to_str().unwrap();
    let cli = Cli::try_parse_from(["farecast", "--config", path, "--print-cron"]).unwrap();

    let err = run(&cli, no_env).await.unwrap_err();
    assert!(err.to_string().contains("no cron expression"));
}

#[tokio::test]
async fn print_cron_reads_env_payload() {
    let payload = json!({ "channels": [one_channel()], "cron": "30 7 * * *" }).to_string();
    let cli = Cli::try_parse_from(["farecast", "--from-env", "--print-cron"]).unwrap();

    let code = run(&cli, |key| (key == "CHANNELS_CONFIG").then(|| payload.clone()))
        .await
        .unwrap();
    assert_eq!(code, EXIT_OK);
}

#[tokio::test]
async fn missing_config_file_is_an_error() {
    let cli = Cli::try_parse_from(["farecast", "--config", "/definitely/not/here.json"]).unwrap();
    let err = run(&cli, no_env).await.unwrap_err();
    assert!(format!("{err:#}").contains("not found"));
}

#[tokio::test]
async fn missing_env_payload_is_an_error() {
    let cli = Cli::try_parse_from(["farecast", "--from-env"]).unwrap();
    let err = run(&cli, no_env).await.unwrap_err();
    assert!(err.to_string().contains("CHANNELS_CONFIG"));
}

#[tokio::test]
async fn invalid_channel_is_an_error() {
    let file = channels_file(json!([{ "telegram_bot_token": "t", "telegram_channel_id": "c", "origin": "XX" }]));
    let path = file.path().to_str().unwrap();
    let cli = Cli::try_parse_from(["farecast", "--config", path]).unwrap();

    assert!(run(&cli, no_env).await.is_err());
}

#[tokio::test]
async fn failed_channel_exits_non_zero() {
    let file = channels_file(json!([one_channel()]));
    let path = file.path().to_str().unwrap();
    let cli = Cli::try_parse_from(["farecast", "--config", path, "--dry-run"]).unwrap();

    // No credentials in the environment, so the channel cannot be built.
    assert_eq!(run(&cli, no_env).await.unwrap(), EXIT_FAILURE);
}
