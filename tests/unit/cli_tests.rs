//! Unit tests for CLI argument parsing and validation

use clap::Parser;
use sheetledger::cli::{Cli, Commands, OutputFormat};
use sheetledger::config::RunMode;

#[test]
fn test_cli_sync_defaults() {
    let cli = Cli::try_parse_from(["sheetledger", "sync"]).unwrap();
    assert_eq!(cli.format, "pretty");
    assert!(!cli.no_progress);
    assert!(cli.config.is_none());

    let overrides = cli.command.overrides();
    assert_eq!(overrides.run_mode, None);
    assert_eq!(overrides.freeze, None);
    assert_eq!(overrides.chunk_size, None);
}

#[test]
fn test_cli_sync_with_options() {
    let cli = Cli::try_parse_from([
        "sheetledger",
        "sync",
        "--mode",
        "master",
        "--only-tab",
        "Prices",
        "--last-col",
        "j",
        "--no-freeze",
        "--chunk-size",
        "20",
        "--max-rows",
        "0",
        "--header-date",
        "2024-12-02",
    ])
    .unwrap();

    match &cli.command {
        Commands::Sync { mode, last_col, .. } => {
            assert_eq!(*mode, Some(RunMode::Master));
            assert_eq!(last_col.as_deref(), Some("J"));
        }
        _ => panic!("Expected Sync command"),
    }

    let overrides = cli.command.overrides();
    assert_eq!(overrides.only_tab.as_deref(), Some("Prices"));
    assert_eq!(overrides.freeze, Some(false));
    assert_eq!(overrides.chunk_size, Some(20));
    assert_eq!(overrides.max_rows, Some(0));
    assert_eq!(overrides.header_date.as_deref(), Some("2024-12-02"));
}

#[test]
fn test_cli_freeze_flags_conflict() {
    assert!(Cli::try_parse_from(["sheetledger", "sync", "--freeze", "--no-freeze"]).is_err());

    let cli = Cli::try_parse_from(["sheetledger", "sync", "--freeze"]).unwrap();
    assert_eq!(cli.command.overrides().freeze, Some(true));
}

#[test]
fn test_cli_rejects_invalid_values() {
    assert!(Cli::try_parse_from(["sheetledger", "sync", "--chunk-size", "0"]).is_err());
    assert!(Cli::try_parse_from(["sheetledger", "sync", "--mode", "everything"]).is_err());
    assert!(Cli::try_parse_from(["sheetledger", "freeze", "--last-col", "1A"]).is_err());
}

#[test]
fn test_cli_freeze_command() {
    let cli = Cli::try_parse_from(["sheetledger", "freeze", "--only-tab", "Prices", "--chunk-size", "100"]).unwrap();
    let overrides = cli.command.overrides();
    assert_eq!(overrides.only_tab.as_deref(), Some("Prices"));
    assert_eq!(overrides.chunk_size, Some(100));
    assert_eq!(overrides.run_mode, None);
}

#[test]
fn test_cli_select_command() {
    let cli = Cli::try_parse_from([
        "sheetledger",
        "select",
        "--prefix",
        "prices_",
        "--exclude",
        "prices_old",
        "--exclude",
        "prices_tmp",
    ])
    .unwrap();

    match cli.command {
        Commands::Select { prefix, exclude } => {
            assert_eq!(prefix, "prices_");
            assert_eq!(exclude, vec!["prices_old".to_string(), "prices_tmp".to_string()]);
        }
        _ => panic!("Expected Select command"),
    }
}

#[test]
fn test_cli_global_options() {
    let cli = Cli::try_parse_from([
        "sheetledger",
        "meta",
        "--config",
        "ledger.json",
        "--format",
        "json",
        "--no-progress",
        "-v",
    ])
    .unwrap();

    assert!(matches!(cli.command, Commands::Meta));
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("ledger.json")));
    assert!(cli.verbose);
    assert!(cli.no_progress);
    assert_eq!(OutputFormat::parse(&cli.format), Ok(OutputFormat::Json));
}
