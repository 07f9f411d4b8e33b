#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracker::{
    Coordinate, PermissionStatus,
    error::{SampleError, SourceError},
    source::{PositionSource, SampleEvent, Subscription, SubscriptionHandle, WatchOptions},
};

/// Shared view of what the source did, kept by the test after the source
/// moved into a controller.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<RecorderState>>,
}

#[derive(Default)]
struct RecorderState {
    prompts: usize,
    subscriptions: usize,
    cancellations: usize,
    live: Option<mpsc::UnboundedSender<SampleEvent>>,
}

impl Recorder {
    pub fn prompts(&self) -> usize {
        self.inner.lock().unwrap().prompts
    }

    pub fn subscriptions(&self) -> usize {
        self.inner.lock().unwrap().subscriptions
    }

    pub fn cancellations(&self) -> usize {
        self.inner.lock().unwrap().cancellations
    }

    /// Emits through the open subscription; `false` once it is gone.
    pub fn emit(&self, event: SampleEvent) -> bool {
        match &self.inner.lock().unwrap().live {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

/// Position source driven entirely by the test.
pub struct ScriptedSource {
    pub permission: PermissionStatus,
    pub fix: Option<Coordinate>,
    pub fail_subscribe: bool,
    /// Queued into every new subscription.
    pub script: Vec<SampleEvent>,
    /// Close the stream after the script instead of keeping it open.
    pub close_after_script: bool,
    pub recorder: Recorder,
}

impl ScriptedSource {
    pub fn granted() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            fix: None,
            fail_subscribe: false,
            script: Vec::new(),
            close_after_script: false,
            recorder: Recorder::default(),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            ..Self::granted()
        }
    }

    pub fn with_script(mut self, samples: &[(f64, f64)]) -> Self {
        self.script = samples
            .iter()
            .map(|&(lat, lon)| Ok(Coordinate::new(lat, lon)))
            .collect();
        self.close_after_script = true;
        self
    }
}

#[async_trait]
impl PositionSource for ScriptedSource {
    async fn request_access(&mut self) -> Result<PermissionStatus, SourceError> {
        self.recorder.inner.lock().unwrap().prompts += 1;
        Ok(self.permission)
    }

    async fn current_fix(&mut self) -> Result<Coordinate, SourceError> {
        self.fix.ok_or(SourceError::NoFix)
    }

    async fn subscribe(&mut self, _options: WatchOptions) -> Result<Subscription, SourceError> {
        if self.fail_subscribe {
            return Err(SourceError::Subscribe("simulated failure".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        for event in &self.script {
            let _ = tx.send(event.clone());
        }

        let mut state = self.recorder.inner.lock().unwrap();
        state.subscriptions += 1;
        if !self.close_after_script {
            state.live = Some(tx);
        }
        drop(state);

        let recorder = self.recorder.clone();
        Ok(Subscription::new(
            rx,
            SubscriptionHandle::new(move || {
                let mut state = recorder.inner.lock().unwrap();
                state.cancellations += 1;
                state.live = None;
            }),
        ))
    }
}

pub fn c(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon)
}

pub fn sample(lat: f64, lon: f64) -> SampleEvent {
    Ok(Coordinate::new(lat, lon))
}

pub fn failed_sample() -> SampleEvent {
    Err(SampleError("gps timeout".into()))
}
