// tests/config_run.rs
#![cfg(unix)]

use gogo_test_utils::{init_tracing, with_timeout};

use std::error::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use tempfile::tempdir;

use gogo::cli::CliArgs;
use gogo::config::load_and_validate;
use gogo::errors::GogoError;

type TestResult = Result<(), Box<dyn Error>>;

const GOGO_TOML: &str = r#"
[project]
gogo_dir = ".gogo"

[vars]
GREETING = "hello"

[gadget.greet]
phase = "simulate"
cwd = "."
commands = [
    "echo ${GREETING} > greet.txt",
    { command = "test -s greet.txt", comment = "check output" },
]
done_marker = "greet.done"
sources = ["input.txt"]
"#;

fn write_project(dir: &Path, toml: &str) -> std::io::Result<String> {
    let config = dir.join("Gogo.toml");
    fs::write(&config, toml)?;
    fs::write(dir.join("input.txt"), "stimulus")?;
    Ok(config.to_string_lossy().into_owned())
}

fn args(config: &str, extra: &[&str]) -> CliArgs {
    let mut argv = vec!["gogo", "--config", config];
    argv.extend_from_slice(extra);
    CliArgs::parse_from(argv)
}

#[tokio::test]
async fn runs_configured_gadget_then_skips_it_while_fresh() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = write_project(dir.path(), GOGO_TOML)?;

    with_timeout(gogo::run(args(&config, &["sim"]))).await?;
    assert_eq!(fs::read_to_string(dir.path().join("greet.txt"))?.trim(), "hello");
    assert!(dir.path().join("greet.done").exists());
    // The job script was flushed.
    assert!(!dir.path().join(".gogo/.greet.sh").exists());

    // Fresh marker: nothing runs, so the output is not recreated.
    fs::remove_file(dir.path().join("greet.txt"))?;
    with_timeout(gogo::run(args(&config, &["sim"]))).await?;
    assert!(!dir.path().join("greet.txt").exists());

    // A newer source makes it stale again; overrides reach the commands.
    let input = dir.path().join("input.txt");
    fs::write(&input, "new stimulus")?;
    let marker_mtime = fs::metadata(dir.path().join("greet.done"))?.modified()?;
    fs::File::options()
        .write(true)
        .open(&input)?
        .set_modified(marker_mtime + Duration::from_secs(1))?;
    with_timeout(gogo::run(args(&config, &["sim", "GREETING=bye"]))).await?;
    assert_eq!(fs::read_to_string(dir.path().join("greet.txt"))?.trim(), "bye");
    Ok(())
}

#[tokio::test]
async fn failing_command_fails_the_run_and_keeps_turds_with_noflush() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let toml = r#"
[gadget.broken]
phase = "vlog"
cwd = "."
commands = ["exit 4", "touch never.txt"]
log = "logs/broken.log"
"#;
    let config = write_project(dir.path(), toml)?;

    let err = with_timeout(gogo::run(args(&config, &["--noflush", "vlog"])))
        .await
        .err()
        .ok_or("expected failure")?;
    let gogo_err = err.downcast_ref::<GogoError>().ok_or("expected a GogoError")?;
    assert!(gogo_err.is_gadget_failure());
    assert!(err.to_string().starts_with("Gadget broken failed with exit status 4"));

    assert!(!dir.path().join("never.txt").exists());
    assert!(dir.path().join("logs/broken.log").exists());
    assert!(dir.path().join(".gogo/.broken.sh").exists());
    Ok(())
}

#[tokio::test]
async fn dry_run_executes_nothing() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = write_project(dir.path(), GOGO_TOML)?;

    with_timeout(gogo::run(args(&config, &["--dry-run", "sim"]))).await?;
    assert!(!dir.path().join("greet.txt").exists());
    assert!(!dir.path().join(".gogo").exists());
    Ok(())
}

#[test]
fn invalid_configs_are_rejected_before_anything_runs() -> TestResult {
    let dir = tempdir()?;
    let cases = [
        ("[gadget.x]\ncommands = [\"true\"]\n", "has no phase"),
        ("[gadget.x]\nphase = \"simulation\"\n", "unknown phase 'simulation'"),
        (
            "[unit.a]\ndir = \"a\"\nafter = [\"b\"]\n[unit.b]\ndir = \"b\"\nafter = [\"c\"]\n[unit.c]\ndir = \"c\"\nafter = [\"a\"]\n",
            "dependency cycle",
        ),
        ("[gadget.flush]\nphase = \"vlog\"\n", "built-in gadget name"),
    ];

    for (toml, expected) in cases {
        let config = dir.path().join("Gogo.toml");
        fs::write(&config, toml)?;
        match load_and_validate(&config) {
            Err(GogoError::ConfigError(msg)) => {
                assert!(msg.contains(expected), "'{msg}' does not mention '{expected}'")
            }
            other => panic!("expected a config error for {toml:?}, got {other:?}"),
        }
    }
    Ok(())
}
