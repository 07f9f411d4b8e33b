use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    time::Duration,
};

use async_trait::async_trait;
use gpx::Waypoint;
use shared::{Coordinate, PermissionStatus};
use tokio::sync::mpsc;

use crate::{
    error::SourceError,
    geo::haversine_m,
    source::{PositionSource, Subscription, SubscriptionHandle, WatchOptions},
};

/// Shortest tick the replay honours; `tokio::time::interval` rejects zero.
const MIN_REPLAY_TICK: Duration = Duration::from_millis(1);

/// Position source that replays a recorded GPX track, one point per
/// `min_interval`, skipping points closer than `min_distance_m` to the last
/// emitted one.
#[derive(Debug, Clone)]
pub struct GpxReplaySource {
    points: Vec<Coordinate>,
    permission: PermissionStatus,
}

impl GpxReplaySource {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Track points first; falls back to route points, then waypoints.
    pub fn from_reader(reader: impl Read) -> Result<Self, SourceError> {
        let gpx = gpx::read(reader)?;

        let mut points: Vec<Coordinate> = gpx
            .tracks
            .iter()
            .flat_map(|track| track.segments.iter())
            .flat_map(|segment| segment.points.iter())
            .map(to_coordinate)
            .collect();
        if points.is_empty() {
            points = gpx
                .routes
                .iter()
                .flat_map(|route| route.points.iter())
                .map(to_coordinate)
                .collect();
        }
        if points.is_empty() {
            points = gpx.waypoints.iter().map(to_coordinate).collect();
        }

        tracing::debug!("loaded {} replay points", points.len());
        Ok(Self::from_points(points))
    }

    pub fn from_points(points: Vec<Coordinate>) -> Self {
        Self {
            points,
            permission: PermissionStatus::Granted,
        }
    }

    /// Answer given to the permission prompt.
    pub fn with_permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[async_trait]
impl PositionSource for GpxReplaySource {
    async fn request_access(&mut self) -> Result<PermissionStatus, SourceError> {
        Ok(self.permission)
    }

    async fn current_fix(&mut self) -> Result<Coordinate, SourceError> {
        self.points.first().copied().ok_or(SourceError::NoFix)
    }

    async fn subscribe(&mut self, options: WatchOptions) -> Result<Subscription, SourceError> {
        if self.permission != PermissionStatus::Granted {
            return Err(SourceError::Unavailable("location permission not granted".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let points = self.points.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(options.min_interval.max(MIN_REPLAY_TICK));
            let mut last_emitted: Option<Coordinate> = None;
            for point in points {
                ticker.tick().await;
                if let Some(prev) = last_emitted {
                    if haversine_m(prev, point) < options.min_distance_m {
                        continue;
                    }
                }
                if tx.send(Ok(point)).is_err() {
                    break;
                }
                last_emitted = Some(point);
            }
        });

        Ok(Subscription::new(
            rx,
            SubscriptionHandle::new(move || task.abort()),
        ))
    }
}

fn to_coordinate(waypoint: &Waypoint) -> Coordinate {
    let point = waypoint.point();
    Coordinate {
        lat: point.y(),
        lon: point.x(),
    }
}
