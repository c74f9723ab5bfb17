mod cli;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use topograph_core::{FilterState, SavePositionsRequest, SavedLayout, Snapshot, ViewerEvent};
use topograph_viewer::app::Viewer;
use topograph_viewer::feed::{spawn_reader, Incoming};
use topograph_viewer::graph::{Color, PerfState};
use topograph_viewer::render::{MemorySurface, SurfaceDump};
use topograph_viewer::util::config;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_writer(std::io::stderr).try_init();
}

#[derive(Serialize)]
struct LegendEntry {
    host: String,
    color: Color,
}

#[derive(Serialize)]
struct Report {
    surface: SurfaceDump,
    events: Vec<ViewerEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    save_request: Option<SavePositionsRequest>,
    legend: Vec<LegendEntry>,
    stats: PerfState,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let value: serde_json::Value = read_json(path)?;
    let (snapshot, skipped) = Snapshot::from_value_lenient(value)
        .with_context(|| format!("decode snapshot {}", path.display()))?;
    for reason in skipped {
        tracing::warn!(file = %path.display(), %reason, "skipped malformed snapshot record");
    }
    Ok(snapshot)
}

/// Feeds the viewer until every stream closed. Pending layouts advance
/// between batches instead of blocking on the channel.
fn run_feed(viewer: &mut Viewer<MemorySurface>, rx: &Receiver<Incoming>) {
    while viewer.closed_streams() == 0 {
        if viewer.st.is_layout_pending() {
            viewer.tick();
            viewer.pump(rx);
            continue;
        }
        let Ok(first) = rx.recv() else {
            break;
        };
        let mut batch = vec![first];
        batch.extend(rx.try_iter());
        viewer.pump_batch(batch);
    }
    viewer.finish_layout();
}

fn main() -> Result<()> {
    init_tracing();
    let args = cli::parse_args()?;

    let cfg = match &args.config {
        Some(path) => config::load_or_default_from_path(path),
        None => config::load_or_default(),
    };
    if args.write_config {
        match &args.config {
            Some(path) => config::save_to_path(&cfg, path)?,
            None => config::save(&cfg)?,
        }
        tracing::info!("viewer config written");
        if !args.stdin && args.snapshots.is_empty() {
            return Ok(());
        }
    }
    let mut viewer =
        Viewer::new(&cfg, MemorySurface::new()).context("invalid viewer configuration")?;

    if let Some(path) = &args.saved_layout {
        let layout: SavedLayout = read_json(path)?;
        viewer.on_saved_layout(layout);
    }
    if let Some(path) = &args.filters {
        let filters: FilterState = read_json(path)?;
        viewer.on_filter_change(filters);
    }

    for path in &args.snapshots {
        let snapshot = read_snapshot(path)?;
        viewer.on_snapshot(snapshot);
        viewer.finish_layout();
    }

    if args.stdin {
        let (tx, rx) = crossbeam_channel::unbounded();
        let reader = spawn_reader("stdin".to_string(), std::io::stdin(), tx);
        run_feed(&mut viewer, &rx);
        if reader.join().is_err() {
            tracing::warn!("stdin reader panicked");
        }
    }

    if let Some(query) = &args.search {
        viewer.on_search(query);
    }

    let events = viewer.drain_events();
    let report = Report {
        surface: viewer.surface.dump(),
        events,
        save_request: viewer.save_request(),
        legend: viewer
            .st
            .host_legend()
            .into_iter()
            .map(|(host, color)| LegendEntry { host, color })
            .collect(),
        stats: viewer.st.perf.clone(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    viewer.shutdown();
    Ok(())
}
