use std::{str::FromStr, time::Duration};

use shared::Coordinate;

use crate::{
    bridge::{Overlay, RenderPolicy, RendererConfig},
    error::ConfigError,
    route_store::RetentionPolicy,
    source::{AccuracyTier, WatchOptions},
};

/// Lviv city centre, shown until the first real fix arrives.
pub const DEFAULT_FALLBACK: Coordinate = Coordinate::new(49.8397, 24.0297);

pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_MIN_DISTANCE_M: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub fallback_location: Coordinate,
    pub watch: WatchOptions,
    pub retention: RetentionPolicy,
    pub render_policy: RenderPolicy,
    pub renderer: RendererConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            fallback_location: DEFAULT_FALLBACK,
            watch: WatchOptions {
                accuracy: AccuracyTier::High,
                min_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
                min_distance_m: DEFAULT_MIN_DISTANCE_M,
            },
            retention: RetentionPolicy::Unbounded,
            render_policy: RenderPolicy::RecreateOnChange,
            renderer: RendererConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Defaults overridden by `TRACKER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(lat) = parse_var::<f64>(&lookup, "TRACKER_FALLBACK_LAT")? {
            config.fallback_location.lat = lat;
        }
        if let Some(lon) = parse_var::<f64>(&lookup, "TRACKER_FALLBACK_LON")? {
            config.fallback_location.lon = lon;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "TRACKER_MIN_INTERVAL_MS")? {
            config.watch.min_interval = Duration::from_millis(ms);
        }
        if let Some(meters) = parse_var::<f64>(&lookup, "TRACKER_MIN_DISTANCE_M")? {
            config.watch.min_distance_m = meters;
        }
        if let Some(max) = parse_var::<usize>(&lookup, "TRACKER_MAX_ROUTE_POINTS")? {
            // A zero-length window would accept samples and never show them.
            if max == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "TRACKER_MAX_ROUTE_POINTS",
                    value: "0".to_string(),
                });
            }
            config.retention = RetentionPolicy::KeepLast(max);
        }
        if let Some(policy) = parse_var::<RenderPolicy>(&lookup, "TRACKER_RENDER_POLICY")? {
            config.render_policy = policy;
        }
        if let Some(zoom) = parse_var::<u8>(&lookup, "TRACKER_MAP_ZOOM")? {
            config.renderer.zoom = zoom;
        }
        if let Some(raw) = lookup("TRACKER_OVERLAYS") {
            config.renderer.overlays = parse_overlays(&raw)?;
        }

        Ok(config)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
    }
}

/// JSON array of `{"name": .., "ring": [{"lat": .., "lon": ..}, ..]}`.
fn parse_overlays(raw: &str) -> Result<Vec<Overlay>, ConfigError> {
    serde_json::from_str(raw).map_err(|err| {
        tracing::debug!("TRACKER_OVERLAYS rejected: {err}");
        ConfigError::InvalidValue {
            key: "TRACKER_OVERLAYS",
            value: raw.to_string(),
        }
    })
}
