use tracing::Level;

/// Installs the global fmt subscriber. Call once, from the binary.
pub fn init(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}
