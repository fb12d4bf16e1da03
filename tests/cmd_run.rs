#![cfg(unix)]

mod common;
use crate::common::init_tracing;

use runcmd::{Cmd, RunError};
use runcmd_test_utils::capture::SharedWriter;
use runcmd_test_utils::with_timeout;

#[tokio::test]
async fn test_captures_stdout() {
    init_tracing();
    let mut cmd = Cmd::new("echo hello");
    with_timeout(cmd.run()).await.unwrap();

    assert!(cmd.executed());
    assert_eq!(cmd.stdout(), "hello\n");
    assert_eq!(cmd.stderr(), "");
    assert_eq!(cmd.exit_code(), 0);
}

#[tokio::test]
async fn test_captures_stderr() {
    init_tracing();
    let mut cmd = Cmd::new(">&2 echo hello");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout(), "");
    assert_eq!(cmd.stderr(), "hello\n");
}

#[tokio::test]
async fn test_nonzero_exit_is_not_an_error() {
    init_tracing();
    let mut cmd = Cmd::new("exit 120");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.exit_code(), 120);
}

#[tokio::test]
async fn test_combined_output_preserves_arrival_order() {
    init_tracing();
    let mut cmd = Cmd::new(">&2 echo first; sleep 0.2; echo second");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.combined(), "first\nsecond\n");
    assert_eq!(cmd.stdout(), "second\n");
    assert_eq!(cmd.stderr(), "first\n");
}

#[tokio::test]
async fn test_forwards_output_to_extra_writers() {
    init_tracing();
    let out = SharedWriter::new();
    let err = SharedWriter::new();
    let mut cmd = Cmd::new("echo out; >&2 echo err")
        .stdout_writer(out.clone())
        .stderr_writer(err.clone());
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(out.contents(), "out\n");
    assert_eq!(err.contents(), "err\n");
    // The internal buffers capture regardless of extra sinks.
    assert_eq!(cmd.stdout(), "out\n");
    assert_eq!(cmd.stderr(), "err\n");
}

#[tokio::test]
async fn test_inherits_parent_environment() {
    init_tracing();
    let mut cmd = Cmd::new("echo $PATH");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout(), format!("{}\n", std::env::var("PATH").unwrap()));
}

#[tokio::test]
async fn test_env_adds_variables() {
    init_tracing();
    let mut cmd = Cmd::new("echo $GREETING").env("GREETING", "hi");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout(), "hi\n");
}

#[tokio::test]
async fn test_env_last_value_wins() {
    init_tracing();
    let mut cmd = Cmd::new("echo $NAME").env("NAME", "one").env("NAME", "two");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout(), "two\n");
}

#[tokio::test]
async fn test_env_expands_references_at_set_time() {
    init_tracing();
    let mut cmd = Cmd::new("echo $B")
        .env("A", "alpha")
        .env("B", "${A}-beta")
        .env("A", "changed");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout(), "alpha-beta\n");
}

#[tokio::test]
async fn test_env_unknown_reference_expands_empty() {
    init_tracing();
    let mut cmd = Cmd::new("echo \"[$X]\"").env("X", "${RUNCMD_TEST_UNSET_VAR}");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout(), "[]\n");
}

#[tokio::test]
async fn test_env_clear_removes_inherited_variables() {
    init_tracing();
    let mut cmd = Cmd::new("echo \"[$PATH][$KEPT]\"").env_clear().env("KEPT", "yes");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout(), "[][yes]\n");
}

#[tokio::test]
async fn test_working_dir_changes_child_cwd() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Cmd::new("pwd").working_dir(dir.path());
    with_timeout(cmd.run()).await.unwrap();

    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(cmd.stdout().trim_end(), expected.to_str().unwrap());
}

#[tokio::test]
async fn test_missing_working_dir_fails_to_start() {
    init_tracing();
    let mut cmd = Cmd::new("echo hi").working_dir("/definitely/not/a/real/dir");
    let err = with_timeout(cmd.run()).await.unwrap_err();

    assert!(matches!(err, RunError::Start(_)), "got {err:?}");
    assert!(!cmd.executed());
}

#[tokio::test]
async fn test_shell_override_uses_given_interpreter() {
    init_tracing();
    let mut cmd = Cmd::new("echo $0").shell("/bin/bash", ["-c"]);
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout(), "/bin/bash\n");
}

#[tokio::test]
async fn test_raw_skips_the_shell() {
    init_tracing();
    let mut cmd = Cmd::raw("echo", ["$PATH"]);
    with_timeout(cmd.run()).await.unwrap();

    // Without a shell there is no expansion.
    assert_eq!(cmd.stdout(), "$PATH\n");
}

#[tokio::test]
async fn test_output_returns_stdout() {
    init_tracing();
    let out = with_timeout(runcmd::output("echo hi")).await.unwrap();

    assert_eq!(out, "hi\n");
}

#[tokio::test]
async fn test_output_rejects_stderr_writes() {
    init_tracing();
    let err = with_timeout(runcmd::output(">&2 echo oops")).await.unwrap_err();

    match err {
        RunError::Stderr(msg) => assert_eq!(msg, "oops\n"),
        other => panic!("expected Stderr, got {other:?}"),
    }
}

#[tokio::test]
async fn test_identity_with_current_uid_runs() {
    init_tracing();
    let uid = nix::unistd::getuid().as_raw();
    let mut cmd = Cmd::new("id -u").identity(runcmd::platform::Identity::uid(uid));
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout().trim_end(), uid.to_string());
}
