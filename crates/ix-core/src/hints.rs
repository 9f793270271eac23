//! One-shot snapshot of static page environment attributes.
//!
//! Every attribute is optional: hosts that cannot provide an API report `None`
//! and capture carries on without it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub avail_width: Option<u32>,
    pub avail_height: Option<u32>,
    pub color_depth: Option<u32>,
    pub pixel_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Page load timing, in milliseconds since navigation start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTiming {
    pub dom_content_loaded_ms: Option<u64>,
    pub load_event_ms: Option<u64>,
    pub response_end_ms: Option<u64>,
    pub navigation_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientHints {
    pub screen: ScreenInfo,
    pub viewport: ViewportInfo,
    pub locale: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    pub timezone: Option<String>,
    pub hardware_concurrency: Option<u32>,
    pub platform: Option<String>,
    pub navigation: NavigationTiming,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub effective_type: Option<String>,
    pub rtt_ms: Option<u32>,
    pub downlink_mbps: Option<f64>,
    pub save_data: Option<bool>,
}

/// Host capability that reads the environment snapshot.
pub trait HintsSource: Send {
    fn client_hints(&self) -> ClientHints;

    fn network_info(&self) -> NetworkInfo {
        NetworkInfo::default()
    }
}

/// Hints fixed at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticHints {
    pub hints: ClientHints,
    pub network: NetworkInfo,
}

impl HintsSource for StaticHints {
    fn client_hints(&self) -> ClientHints {
        self.hints.clone()
    }

    fn network_info(&self) -> NetworkInfo {
        self.network.clone()
    }
}
