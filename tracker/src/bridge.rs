use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared::{Coordinate, Snapshot};
use tokio::sync::mpsc;

use crate::{
    error::BridgeError,
    template::{lat_lon_pairs, render_map_html, script_safe_json},
};

const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const DEFAULT_ATTRIBUTION: &str = "© OpenStreetMap contributors";

/// How snapshot changes reach a mounted renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPolicy {
    /// Reload the whole page whenever location or route changed. Simple, but
    /// renderer-local state such as a click marker is lost on every reload.
    RecreateOnChange,
    /// Load once, then send guarded update scripts.
    IncrementalPush,
}

impl FromStr for RenderPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recreate" | "recreate_on_change" => Ok(Self::RecreateOnChange),
            "incremental" | "incremental_push" => Ok(Self::IncrementalPush),
            other => Err(format!("unknown render policy {other:?}")),
        }
    }
}

/// A named polygon drawn under the route, with a popup label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub name: String,
    pub ring: Vec<Coordinate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub zoom: u8,
    pub max_zoom: u8,
    pub tile_url: String,
    pub attribution: String,
    pub overlays: Vec<Overlay>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            zoom: 13,
            max_zoom: 19,
            tile_url: DEFAULT_TILE_URL.to_string(),
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            overlays: Vec::new(),
        }
    }
}

/// Full page handed to a freshly created renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapPayload {
    pub html: String,
    /// Inputs the page was built from. Renderer-local interaction state is
    /// not part of it.
    #[serde(skip)]
    pub key: Snapshot,
}

/// Script evaluated inside an already loaded renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushCommand {
    pub script: String,
}

/// Everything that crosses into the sandbox. One-way, no replies.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RendererMessage {
    Load(BootstrapPayload),
    Inject(PushCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Dropped,
}

pub trait RendererChannel {
    /// Fire-and-forget. Must not block or retry.
    fn send(&mut self, message: RendererMessage) -> Delivery;
}

/// Renderer reached through a tokio channel; the receiving task is the
/// sandbox. A closed receiver drops every message.
#[derive(Debug, Clone)]
pub struct ChannelRenderer {
    tx: mpsc::UnboundedSender<RendererMessage>,
}

impl ChannelRenderer {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RendererMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RendererChannel for ChannelRenderer {
    fn send(&mut self, message: RendererMessage) -> Delivery {
        match self.tx.send(message) {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Dropped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererStatus {
    Unmounted,
    /// Page sent, ready signal not seen yet.
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Mounted,
    Recreated,
    Pushed,
    Unchanged,
    Dropped,
}

/// Keeps one renderer instance in step with the tracker's snapshots.
pub struct RenderBridge {
    policy: RenderPolicy,
    config: RendererConfig,
    status: RendererStatus,
    /// Snapshot the current page was built from.
    mounted: Option<Snapshot>,
    /// Last snapshot the renderer is known to have been sent.
    delivered: Option<Snapshot>,
    dropped: u64,
}

impl RenderBridge {
    pub fn new(policy: RenderPolicy, config: RendererConfig) -> Self {
        Self {
            policy,
            config,
            status: RendererStatus::Unmounted,
            mounted: None,
            delivered: None,
            dropped: 0,
        }
    }

    pub fn policy(&self) -> RenderPolicy {
        self.policy
    }

    pub fn status(&self) -> RendererStatus {
        self.status
    }

    /// Messages that found the renderer unavailable.
    pub fn dropped_pushes(&self) -> u64 {
        self.dropped
    }

    pub fn bootstrap(&self, snapshot: &Snapshot) -> Result<BootstrapPayload, BridgeError> {
        Ok(BootstrapPayload {
            html: render_map_html(snapshot, &self.config)?,
            key: snapshot.clone(),
        })
    }

    /// Guarded update script: a no-op until the page has created its
    /// polyline.
    pub fn push_command(&self, snapshot: &Snapshot) -> Result<PushCommand, BridgeError> {
        let route = script_safe_json(&lat_lon_pairs(snapshot))?;
        let location = script_safe_json(&snapshot.current_location.lat_lon())?;
        let script = format!(
            "(function () {{\n\
             \x20 if (!window.map || !window.routeLine) {{ return; }}\n\
             \x20 var route = {route};\n\
             \x20 var here = {location};\n\
             \x20 window.routeLine.setLatLngs(route);\n\
             \x20 if (window.locationMarker) {{ window.locationMarker.setLatLng(here); }}\n\
             \x20 if (route.length > 1) {{ window.map.fitBounds(window.routeLine.getBounds()); }}\n\
             \x20 else {{ window.map.panTo(here); }}\n\
             }})();\n\
             true;"
        );
        Ok(PushCommand { script })
    }

    /// Sends the bootstrap page, replacing whatever was mounted.
    pub fn mount(
        &mut self,
        snapshot: &Snapshot,
        channel: &mut dyn RendererChannel,
    ) -> Result<SyncOutcome, BridgeError> {
        let payload = self.bootstrap(snapshot)?;
        let outcome = match self.status {
            RendererStatus::Unmounted => SyncOutcome::Mounted,
            _ => SyncOutcome::Recreated,
        };

        match channel.send(RendererMessage::Load(payload)) {
            Delivery::Sent => {
                tracing::debug!(
                    "renderer {:?} with {} route points",
                    outcome,
                    snapshot.route.len()
                );
                self.status = RendererStatus::Loading;
                self.mounted = Some(snapshot.clone());
                self.delivered = Some(snapshot.clone());
                Ok(outcome)
            }
            Delivery::Dropped => {
                self.unmount();
                Ok(self.record_drop("renderer channel closed during mount"))
            }
        }
    }

    pub fn renderer_ready(&mut self) {
        match self.status {
            RendererStatus::Loading => {
                self.status = RendererStatus::Ready;
                tracing::debug!("renderer ready");
            }
            RendererStatus::Ready => {}
            RendererStatus::Unmounted => tracing::debug!("ready signal from unmounted renderer"),
        }
    }

    pub fn unmount(&mut self) {
        self.status = RendererStatus::Unmounted;
        self.mounted = None;
        self.delivered = None;
    }

    /// Fire-and-forget update. Dropped, never queued, when the renderer is
    /// not ready.
    pub fn push(
        &mut self,
        snapshot: &Snapshot,
        channel: &mut dyn RendererChannel,
    ) -> Result<SyncOutcome, BridgeError> {
        if self.status != RendererStatus::Ready {
            return Ok(self.record_drop("renderer not ready"));
        }

        let command = self.push_command(snapshot)?;
        match channel.send(RendererMessage::Inject(command)) {
            Delivery::Sent => {
                self.delivered = Some(snapshot.clone());
                Ok(SyncOutcome::Pushed)
            }
            Delivery::Dropped => Ok(self.record_drop("renderer channel closed")),
        }
    }

    /// Applies the configured policy to a new snapshot.
    pub fn sync(
        &mut self,
        snapshot: &Snapshot,
        channel: &mut dyn RendererChannel,
    ) -> Result<SyncOutcome, BridgeError> {
        if self.status == RendererStatus::Unmounted {
            return self.mount(snapshot, channel);
        }

        match self.policy {
            RenderPolicy::RecreateOnChange => {
                if self.mounted.as_ref() == Some(snapshot) {
                    Ok(SyncOutcome::Unchanged)
                } else {
                    self.mount(snapshot, channel)
                }
            }
            RenderPolicy::IncrementalPush => {
                if self.delivered.as_ref() == Some(snapshot) {
                    Ok(SyncOutcome::Unchanged)
                } else {
                    self.push(snapshot, channel)
                }
            }
        }
    }

    fn record_drop(&mut self, reason: &str) -> SyncOutcome {
        self.dropped += 1;
        tracing::debug!("renderer update dropped: {reason}");
        SyncOutcome::Dropped
    }
}
