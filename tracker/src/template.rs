//! Bootstrap document loaded into the renderer web view.
//!
//! The page builds a Leaflet map from a single JSON blob substituted for
//! [`BOOT_PLACEHOLDER`]. It exposes `window.map`, `window.routeLine` and
//! `window.locationMarker`; incremental commands only touch those globals.
//!
//! Once built, the page announces [`READY_SIGNAL`] as a window event and
//! posts it to the embedder (`ReactNativeWebView.postMessage`, or the parent
//! frame). The embedder forwards it to the host as `HostMsg::RendererReady`.

use serde::Serialize;
use shared::Snapshot;

use crate::{bridge::RendererConfig, error::BridgeError};

pub const BOOT_PLACEHOLDER: &str = "/*__BOOT__*/null";
pub const READY_SIGNAL: &str = "renderer-ready";

pub const MAP_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <style>
    html, body { margin: 0; padding: 0; }
    #map { height: 100vh; width: 100vw; }
  </style>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
</head>
<body>
  <div id="map"></div>
  <script>
    var boot = /*__BOOT__*/null;

    window.map = L.map('map').setView(boot.center, boot.zoom);
    L.tileLayer(boot.tileUrl, {
      maxZoom: boot.maxZoom,
      attribution: boot.attribution
    }).addTo(window.map);

    boot.overlays.forEach(function (overlay) {
      L.polygon(overlay.ring).addTo(window.map).bindPopup(overlay.name);
    });

    window.locationMarker = L.circleMarker(boot.center, {
      radius: 7,
      color: '#ffffff',
      weight: 2,
      fillColor: '#1e88e5',
      fillOpacity: 1
    }).addTo(window.map);

    window.routeLine = L.polyline(boot.route, { color: '#1e88e5', weight: 4 }).addTo(window.map);
    if (boot.route.length > 1) {
      window.map.fitBounds(window.routeLine.getBounds());
    }

    // Renderer-local, lost whenever the page is reloaded.
    var clickPopup = L.popup();
    window.map.on('click', function (e) {
      L.marker(e.latlng).addTo(window.map)
        .bindPopup('Marker at ' + e.latlng.toString())
        .openPopup();
      clickPopup
        .setLatLng(e.latlng)
        .setContent('You clicked the map at ' + e.latlng.toString())
        .openOn(window.map);
    });

    window.dispatchEvent(new CustomEvent('renderer-ready'));
    if (window.ReactNativeWebView) {
      window.ReactNativeWebView.postMessage('renderer-ready');
    } else if (window.parent && window.parent !== window) {
      window.parent.postMessage('renderer-ready', '*');
    }
  </script>
</body>
</html>
"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BootData<'a> {
    center: [f64; 2],
    zoom: u8,
    max_zoom: u8,
    tile_url: &'a str,
    attribution: &'a str,
    route: Vec<[f64; 2]>,
    overlays: Vec<OverlayData<'a>>,
}

#[derive(Serialize)]
struct OverlayData<'a> {
    name: &'a str,
    ring: Vec<[f64; 2]>,
}

pub fn render_map_html(snapshot: &Snapshot, config: &RendererConfig) -> Result<String, BridgeError> {
    let boot = BootData {
        center: snapshot.current_location.lat_lon(),
        zoom: config.zoom,
        max_zoom: config.max_zoom,
        tile_url: &config.tile_url,
        attribution: &config.attribution,
        route: lat_lon_pairs(snapshot),
        overlays: config
            .overlays
            .iter()
            .map(|overlay| OverlayData {
                name: &overlay.name,
                ring: overlay.ring.iter().map(|c| c.lat_lon()).collect(),
            })
            .collect(),
    };
    let json = script_safe_json(&boot)?;
    Ok(MAP_HTML.replacen(BOOT_PLACEHOLDER, &json, 1))
}

pub(crate) fn lat_lon_pairs(snapshot: &Snapshot) -> Vec<[f64; 2]> {
    snapshot.route.points().iter().map(|c| c.lat_lon()).collect()
}

/// JSON that can sit inside a `<script>` element without terminating it.
pub(crate) fn script_safe_json(value: &impl Serialize) -> Result<String, BridgeError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}
