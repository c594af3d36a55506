mod lifecycle_test;
mod random_walk_test;

/// Route `log` output through the test harness (RUST_LOG=debug to see it)
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
