use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{Coordinate, PermissionStatus};
use tokio::sync::mpsc;

use crate::error::{SampleError, SourceError};

/// What a subscription yields per tick.
pub type SampleEvent = Result<Coordinate, SampleError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccuracyTier {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub accuracy: AccuracyTier,
    /// Minimum time between two emitted samples.
    pub min_interval: Duration,
    /// Minimum movement before a new sample is emitted.
    pub min_distance_m: f64,
}

/// Device location provider.
///
/// Implementations wrap the platform API (or a replayed track) and hand
/// samples to the caller through the returned [`Subscription`].
///
/// # Contract
/// - `request_access` may show a platform prompt; callers go through
///   [`crate::permission::PermissionGate`] so it happens at most once.
/// - `subscribe` must stop producing once the handle is cancelled or the
///   subscription is dropped.
#[async_trait]
pub trait PositionSource: Send {
    async fn request_access(&mut self) -> Result<PermissionStatus, SourceError>;

    async fn current_fix(&mut self) -> Result<Coordinate, SourceError>;

    async fn subscribe(&mut self, options: WatchOptions) -> Result<Subscription, SourceError>;
}

/// Cancels the underlying watch exactly once, either explicitly or on drop.
pub struct SubscriptionHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Handle with nothing to release, for sources that stop when the
    /// receiver is dropped.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Idempotent.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// An active watch: the sample stream plus the guard that ends it.
pub struct Subscription {
    samples: mpsc::UnboundedReceiver<SampleEvent>,
    handle: SubscriptionHandle,
}

impl Subscription {
    pub fn new(samples: mpsc::UnboundedReceiver<SampleEvent>, handle: SubscriptionHandle) -> Self {
        Self { samples, handle }
    }

    /// `None` once the source closed its side.
    pub async fn recv(&mut self) -> Option<SampleEvent> {
        self.samples.recv().await
    }

    pub fn cancel(&mut self) {
        self.handle.cancel();
        self.samples.close();
    }
}
