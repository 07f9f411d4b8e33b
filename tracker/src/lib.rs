pub mod bridge;
pub mod config;
pub mod controller;
pub mod error;
pub mod geo;
pub mod gpx_export;
pub mod host;
pub mod permission;
pub mod replay;
pub mod route_store;
pub mod source;
pub mod template;

pub use shared::{Coordinate, PermissionStatus, Route, RouteBounds, Snapshot, TrackingState};
