use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use shared::{Coordinate, Route};

use crate::error::ExportError;

const CREATOR: &str = "route_tracker";

pub fn encode_route_as_gpx(route: &Route) -> Result<Vec<u8>, ExportError> {
    let mut buffer = Vec::new();
    gpx::write(&route_to_gpx(route), &mut buffer)?;
    Ok(buffer)
}

pub fn write_route_gpx(route: &Route, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    gpx::write(&route_to_gpx(route), &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn route_to_gpx(route: &Route) -> Gpx {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };
    let mut track = Track {
        name: Some("recorded route".into()),
        ..Default::default()
    };

    let mut segment = TrackSegment::new();
    segment.points.extend(route.points().iter().map(to_waypoint));
    track.segments.push(segment);
    gpx.tracks.push(track);
    gpx
}

fn to_waypoint(coord: &Coordinate) -> Waypoint {
    Waypoint::new(Point::new(coord.lon, coord.lat))
}
