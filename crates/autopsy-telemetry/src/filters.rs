//! Custom filters for telemetry data

use tracing::Level;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::layer::Filter;

/// Targets whose chatter is only interesting when something is wrong
const NOISY_TARGETS: &[&str] = &["hyper", "h2", "tower", "reqwest", "rustls", "mio", "want"];

/// Whether an event from `target` at `level` passes the dependency filter
pub fn dependency_allows(target: &str, level: &Level) -> bool {
    // Own crates, including the call logs and panic reports
    if target.starts_with("autopsy") {
        return true;
    }

    if NOISY_TARGETS.iter().any(|noisy| target.starts_with(noisy)) {
        return level <= &Level::WARN;
    }

    true
}

/// Create a filter that quiets noisy dependencies
pub fn create_dependency_filter<S>() -> impl Filter<S> {
    FilterFn::new(|metadata| dependency_allows(metadata.target(), metadata.level()))
}
