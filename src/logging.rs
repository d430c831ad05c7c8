// Verbose-gated logging

/// Target used for messages that only appear when `Verbose` is enabled
pub const VERBOSE_TARGET: &str = "sysgauge::verbose";

/// Emit an info-level event only when verbose logging is switched on.
///
/// The first argument is the verbose flag; the rest is passed straight to
/// `tracing::info!`.
#[macro_export]
macro_rules! verbose {
    ($enabled:expr, $($arg:tt)+) => {
        if $enabled {
            ::tracing::info!(target: $crate::logging::VERBOSE_TARGET, $($arg)+);
        }
    };
}
