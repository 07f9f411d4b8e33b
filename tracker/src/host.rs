use shared::{PermissionStatus, Snapshot, TrackingState};
use tokio::sync::mpsc;

use crate::{
    bridge::{RenderBridge, RendererChannel, SyncOutcome},
    config::TrackerConfig,
    controller::{SampleOutcome, TrackingController},
    source::{PositionSource, SampleEvent},
};

/// Inputs the host reacts to.
#[derive(Debug)]
pub enum HostMsg {
    ToggleTracking,
    ResetRoute,
    Sample(SampleEvent),
    /// The renderer finished loading its page and posted
    /// [`READY_SIGNAL`](crate::template::READY_SIGNAL).
    RendererReady,
    Unmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    Unmounted,
    /// The position source ended its stream; tracking is idle again.
    SourceClosed,
}

/// Wires a [`TrackingController`] to one renderer through a [`RenderBridge`].
pub struct Host<S, C> {
    controller: TrackingController<S>,
    bridge: RenderBridge,
    channel: C,
    mounted: bool,
    last_sync: Option<SyncOutcome>,
}

impl<S: PositionSource, C: RendererChannel> Host<S, C> {
    pub fn new(source: S, channel: C, config: &TrackerConfig) -> Self {
        Self {
            controller: TrackingController::new(source, config),
            bridge: RenderBridge::new(config.render_policy, config.renderer.clone()),
            channel,
            mounted: false,
            last_sync: None,
        }
    }

    pub fn controller(&self) -> &TrackingController<S> {
        &self.controller
    }

    pub fn bridge(&self) -> &RenderBridge {
        &self.bridge
    }

    pub fn state(&self) -> TrackingState {
        self.controller.state()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.controller.snapshot()
    }

    pub fn last_sync(&self) -> Option<SyncOutcome> {
        self.last_sync
    }

    /// Asks for location permission, then creates the renderer from the
    /// initial snapshot.
    pub async fn mount(&mut self) -> PermissionStatus {
        let status = self.controller.initialize().await;
        self.mounted = true;
        self.sync();
        status
    }

    pub async fn update(&mut self, msg: HostMsg) {
        match msg {
            HostMsg::ToggleTracking => self.toggle_tracking().await,
            HostMsg::ResetRoute => self.controller.reset(),
            HostMsg::Sample(event) => {
                if matches!(
                    self.controller.on_sample(event),
                    SampleOutcome::Ignored | SampleOutcome::Failed
                ) {
                    return;
                }
            }
            HostMsg::RendererReady => {
                self.bridge.renderer_ready();
                return;
            }
            HostMsg::Unmount => {
                self.unmount();
                return;
            }
        }
        self.sync();
    }

    async fn toggle_tracking(&mut self) {
        match self.controller.state() {
            TrackingState::Tracking => self.controller.stop(),
            TrackingState::Idle => {
                // Failure is already logged and leaves the controller idle.
                let _ = self.controller.start().await;
            }
        }
    }

    /// Same release path as stopping, plus renderer teardown.
    pub fn unmount(&mut self) {
        self.controller.stop();
        self.bridge.unmount();
        self.mounted = false;
        self.last_sync = None;
    }

    /// Feeds samples and inbox messages through [`Host::update`] until the
    /// host is unmounted (explicitly or by a closed inbox) or the source
    /// ends its stream.
    pub async fn run(&mut self, inbox: &mut mpsc::UnboundedReceiver<HostMsg>) -> RunExit {
        loop {
            let msg = tokio::select! {
                sample = self.controller.next_sample() => sample.map(HostMsg::Sample),
                msg = inbox.recv() => Some(msg.unwrap_or(HostMsg::Unmount)),
            };

            match msg {
                None => return RunExit::SourceClosed,
                Some(HostMsg::Unmount) => {
                    self.unmount();
                    return RunExit::Unmounted;
                }
                Some(msg) => self.update(msg).await,
            }
        }
    }

    fn sync(&mut self) {
        if !self.mounted {
            return;
        }
        let snapshot = self.controller.snapshot();
        match self.bridge.sync(&snapshot, &mut self.channel) {
            Ok(outcome) => self.last_sync = Some(outcome),
            Err(err) => tracing::warn!("failed to build renderer update: {err}"),
        }
    }
}
