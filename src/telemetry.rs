use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PINYIN_MATCH_LOG";

/// Install the global fmt subscriber. Logs go to stderr so they stay out of
/// the drill output; the level comes from `PINYIN_MATCH_LOG` (default `warn`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // a second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
