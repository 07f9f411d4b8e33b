use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracker::{
    PermissionStatus,
    bridge::{ChannelRenderer, RenderPolicy, RendererMessage},
    config::TrackerConfig,
    geo::route_distance_km,
    gpx_export::write_route_gpx,
    host::{Host, HostMsg, RunExit},
    replay::GpxReplaySource,
};

/// Replays a GPX track as the device position and streams the renderer
/// messages it produces to stdout, one JSON object per line.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// GPX file replayed as the position source
    track: PathBuf,
    /// recreate | incremental
    #[arg(long)]
    policy: Option<RenderPolicy>,
    /// Minimum time between replayed samples
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Minimum movement between replayed samples
    #[arg(long)]
    min_distance_m: Option<f64>,
    /// Answer the permission prompt with "deny"
    #[arg(long)]
    deny_permission: bool,
    /// Write the final bootstrap page here
    #[arg(long)]
    html_out: Option<PathBuf>,
    /// Export the recorded route as GPX here
    #[arg(long)]
    gpx_out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tracker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = TrackerConfig::from_env()?;
    if let Some(policy) = args.policy {
        config.render_policy = policy;
    }
    if let Some(ms) = args.interval_ms {
        config.watch.min_interval = Duration::from_millis(ms);
    }
    if let Some(meters) = args.min_distance_m {
        config.watch.min_distance_m = meters;
    }

    let permission = if args.deny_permission {
        PermissionStatus::Denied
    } else {
        PermissionStatus::Granted
    };
    let source = GpxReplaySource::from_file(&args.track)?.with_permission(permission);
    tracing::info!("replaying {} points from {}", source.len(), args.track.display());

    let (inbox_tx, mut inbox) = mpsc::unbounded_channel();
    let (channel, renderer_rx) = ChannelRenderer::new();
    tokio::spawn(run_sandbox(renderer_rx, inbox_tx.clone()));

    let ctrl_c_tx = inbox_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = ctrl_c_tx.send(HostMsg::Unmount);
        }
    });

    let mut host = Host::new(source, channel, &config);
    let status = host.mount().await;
    let exit = if status == PermissionStatus::Granted {
        inbox_tx.send(HostMsg::ToggleTracking)?;
        Some(host.run(&mut inbox).await)
    } else {
        tracing::warn!("location permission {status:?}, tracking disabled");
        None
    };

    let snapshot = host.snapshot();
    tracing::info!(
        "finished ({:?}): {} route points, {:.2} km, {} renderer updates dropped",
        exit,
        snapshot.route.len(),
        route_distance_km(&snapshot.route),
        host.bridge().dropped_pushes()
    );

    if let Some(path) = &args.html_out {
        let payload = host.bridge().bootstrap(&snapshot)?;
        std::fs::write(path, payload.html)?;
        tracing::info!("wrote bootstrap page to {}", path.display());
    }
    if let Some(path) = &args.gpx_out {
        write_route_gpx(&snapshot.route, path)?;
        tracing::info!("exported route to {}", path.display());
    }

    if exit != Some(RunExit::Unmounted) {
        host.unmount();
    }
    Ok(())
}

/// Stand-in for the web view: prints each message and reports readiness
/// after every page load.
async fn run_sandbox(
    mut messages: mpsc::UnboundedReceiver<RendererMessage>,
    host: mpsc::UnboundedSender<HostMsg>,
) {
    while let Some(message) = messages.recv().await {
        match serde_json::to_string(&message) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!("failed to encode renderer message: {err}"),
        }
        if matches!(message, RendererMessage::Load(_)) && host.send(HostMsg::RendererReady).is_err() {
            break;
        }
    }
}
