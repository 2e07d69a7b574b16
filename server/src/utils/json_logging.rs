use tracing_subscriber::filter::LevelFilter;

/// Setup tracing with flattened JSON logs. The level defaults to `default_level`
/// and can be overridden with `RUST_LOG`.
pub fn setup_json_logging(default_level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .with_regex(false)
                .from_env_lossy(),
        )
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .init();
}
