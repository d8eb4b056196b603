mod serializer_tests;

/// Route compiler logs to the test output (`RUST_LOG=jsonb_sql=debug`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
