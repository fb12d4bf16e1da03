#![cfg(unix)]

mod common;
use crate::common::init_tracing;

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use runcmd::Cmd;
use runcmd_test_utils::with_timeout;

// Sole test in this binary: it mutates the process environment, which must
// not race environment reads in other tests.
#[tokio::test]
async fn test_non_utf8_env_entries_are_captured_lossily() {
    init_tracing();
    unsafe {
        std::env::set_var("RUNCMD_BAD_ENV", OsStr::from_bytes(b"\xffval"));
    }

    // Construction captures the ambient environment; a non-UTF-8 entry
    // must be decoded lossily, not abort the process.
    let mut cmd = Cmd::new("echo $RUNCMD_BAD_ENV");
    with_timeout(cmd.run()).await.unwrap();

    assert_eq!(cmd.stdout(), "\u{FFFD}val\n");
}
