pub use runcmd_test_utils::init_tracing;
