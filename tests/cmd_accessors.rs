#![cfg(unix)]

mod common;
use crate::common::init_tracing;

use runcmd::Cmd;
use runcmd_test_utils::with_timeout;

#[test]
#[should_panic(expected = "cannot read stdout before the command has run")]
fn test_stdout_panics_before_run() {
    init_tracing();
    let cmd = Cmd::new("echo hi");
    let _ = cmd.stdout();
}

#[test]
#[should_panic(expected = "cannot read stderr before the command has run")]
fn test_stderr_panics_before_run() {
    init_tracing();
    let cmd = Cmd::new("echo hi");
    let _ = cmd.stderr();
}

#[test]
#[should_panic(expected = "cannot read combined output before the command has run")]
fn test_combined_panics_before_run() {
    init_tracing();
    let cmd = Cmd::new("echo hi");
    let _ = cmd.combined();
}

#[test]
#[should_panic(expected = "cannot read exit code before the command has run")]
fn test_exit_code_panics_before_run() {
    init_tracing();
    let cmd = Cmd::new("echo hi");
    let _ = cmd.exit_code();
}

#[test]
fn test_executed_is_false_before_run() {
    init_tracing();
    let cmd = Cmd::new("echo hi");
    assert!(!cmd.executed());
}

#[tokio::test]
#[should_panic(expected = "cannot run the same Cmd twice")]
async fn test_rerun_panics() {
    init_tracing();
    let mut cmd = Cmd::new("true");
    with_timeout(cmd.run()).await.unwrap();
    let _ = cmd.run().await;
}
