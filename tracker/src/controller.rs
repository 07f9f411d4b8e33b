use shared::{Coordinate, PermissionStatus, Snapshot, TrackingState};

use crate::{
    config::TrackerConfig,
    error::TrackerError,
    permission::PermissionGate,
    route_store::RouteStore,
    source::{PositionSource, SampleEvent, Subscription, WatchOptions},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Location updated and the point extended the route.
    Appended,
    /// Location updated; the point repeated the last one.
    Duplicate,
    /// Arrived while idle, nothing changed.
    Ignored,
    /// Delivery error; nothing changed, the watch stays active.
    Failed,
}

/// Owns the location subscription, the current location and the route.
///
/// All mutation goes through `&mut self`, so the host task is the only
/// writer. Readers get [`Snapshot`] values.
pub struct TrackingController<S> {
    source: S,
    gate: PermissionGate,
    state: TrackingState,
    current_location: Coordinate,
    route: RouteStore,
    watch: WatchOptions,
    subscription: Option<Subscription>,
}

impl<S: PositionSource> TrackingController<S> {
    pub fn new(source: S, config: &TrackerConfig) -> Self {
        Self {
            source,
            gate: PermissionGate::new(),
            state: TrackingState::Idle,
            current_location: config.fallback_location,
            route: RouteStore::new(config.retention),
            watch: config.watch,
            subscription: None,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn permission(&self) -> PermissionStatus {
        self.gate.status()
    }

    pub fn current_location(&self) -> Coordinate {
        self.current_location
    }

    pub fn route_len(&self) -> usize {
        self.route.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            current_location: self.current_location,
            route: self.route.snapshot(),
        }
    }

    /// Resolves the permission gate and, when granted, adopts the device's
    /// current fix in place of the fallback location.
    pub async fn initialize(&mut self) -> PermissionStatus {
        let status = self.gate.request_access(&mut self.source).await;
        if status != PermissionStatus::Granted {
            return status;
        }

        match self.source.current_fix().await {
            Ok(fix) => {
                tracing::debug!("initial fix ({:.5}, {:.5})", fix.lat, fix.lon);
                self.current_location = fix;
            }
            Err(err) => tracing::warn!("no initial fix, keeping fallback location: {err}"),
        }
        status
    }

    pub async fn start(&mut self) -> Result<(), TrackerError> {
        match self.gate.status() {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => {
                tracing::debug!("start ignored, permission denied");
                return Err(TrackerError::PermissionDenied);
            }
            PermissionStatus::Unknown => {
                tracing::debug!("start ignored, initialize() has not run");
                return Err(TrackerError::PermissionUnresolved);
            }
        }
        if self.state == TrackingState::Tracking {
            return Ok(());
        }

        match self.source.subscribe(self.watch).await {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                self.state = TrackingState::Tracking;
                tracing::info!(
                    "tracking started (accuracy {:?}, every {:?} / {} m)",
                    self.watch.accuracy,
                    self.watch.min_interval,
                    self.watch.min_distance_m
                );
                Ok(())
            }
            Err(err) => {
                tracing::warn!("failed to subscribe to position updates: {err}");
                Err(TrackerError::Subscription(err))
            }
        }
    }

    /// Releases the subscription unconditionally. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }
        if self.state == TrackingState::Tracking {
            self.state = TrackingState::Idle;
            tracing::info!("tracking stopped with {} route points", self.route.len());
        }
    }

    pub fn reset(&mut self) {
        self.route.reset();
        tracing::debug!("route reset");
    }

    pub fn on_sample(&mut self, sample: SampleEvent) -> SampleOutcome {
        if self.state != TrackingState::Tracking {
            return SampleOutcome::Ignored;
        }

        match sample {
            Ok(coord) => {
                self.current_location = coord;
                if self.route.append(coord) {
                    SampleOutcome::Appended
                } else {
                    SampleOutcome::Duplicate
                }
            }
            Err(err) => {
                tracing::warn!("{err}");
                SampleOutcome::Failed
            }
        }
    }

    /// Next event from the active watch. Never resolves while idle, so it
    /// can sit in a `select!` next to other inputs. When the source closes
    /// its stream the controller stops itself and `None` is returned.
    pub async fn next_sample(&mut self) -> Option<SampleEvent> {
        let Some(subscription) = self.subscription.as_mut() else {
            return std::future::pending().await;
        };

        match subscription.recv().await {
            Some(event) => Some(event),
            None => {
                tracing::info!("position source closed its stream");
                self.stop();
                None
            }
        }
    }
}
