//! Client hints read from the machine running the CLI.

use ix_core::{ClientHints, HintsSource};

/// Hints for pages simulated on this host. Screen, viewport and navigation
/// timing have no host equivalent and stay absent.
#[derive(Debug, Clone, Default)]
pub struct HostHints;

impl HintsSource for HostHints {
    fn client_hints(&self) -> ClientHints {
        let locale = std::env::var("LANG").ok().and_then(|lang| locale_tag(&lang));
        ClientHints {
            languages: locale.iter().cloned().collect(),
            locale,
            timezone: iana_time_zone::get_timezone().ok(),
            hardware_concurrency: std::thread::available_parallelism()
                .ok()
                .and_then(|n| u32::try_from(n.get()).ok()),
            platform: Some(std::env::consts::OS.to_string()),
            ..ClientHints::default()
        }
    }
}

/// Turns a POSIX locale such as `en_US.UTF-8` into a language tag (`en-US`).
fn locale_tag(posix: &str) -> Option<String> {
    let base = posix.split(['.', '@']).next().unwrap_or_default();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}
