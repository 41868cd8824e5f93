use std::{fs::File, io::BufReader, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use clap::Args;
use tracing::info;
use wayfarer_core::{
    geometry::GeoPoint,
    guidance::{guidance_params::GuidanceParams, scheduler::GuidanceScheduler},
    position::PositionSample,
};
use wayfarer_speech::SpeechClient;
use wayfarer_valhalla::ValhallaClient;

use crate::{
    console::{ConsolePlayer, ConsoleSurface},
    parsers,
};

#[derive(Args)]
pub struct SimulateArgs {
    /// JSON array of recorded samples ({"lat", "lon", "acc", "time"})
    #[arg(short, long)]
    track: PathBuf,

    /// Destination as "lat,lng"
    #[arg(short, long, value_parser = parsers::parse_point)]
    destination: GeoPoint,

    /// Replay speed multiplier
    #[arg(short, long, value_parser = parsers::parse_speed, default_value_t = 1.0)]
    speed: f64,

    #[arg(long, value_parser = parsers::parse_positive_duration, default_value = "1s")]
    tick: jiff::SignedDuration,

    /// How long the console player takes per clip
    #[arg(long, value_parser = parsers::parse_duration, default_value = "2s")]
    clip_duration: jiff::SignedDuration,
}

pub fn read_track(path: &PathBuf) -> anyhow::Result<Vec<PositionSample>> {
    let file = File::open(path).with_context(|| format!("Cannot open track {path:?}"))?;
    let reader = BufReader::new(file);
    let mut samples: Vec<PositionSample> = serde_json::from_reader(reader)?;

    samples.sort_by_key(|sample| sample.timestamp);
    Ok(samples)
}

/// Waiting times between consecutive samples, scaled by `speed`.
pub fn replay_delays(samples: &[PositionSample], speed: f64) -> Vec<Duration> {
    samples
        .windows(2)
        .map(|pair| {
            pair[1]
                .timestamp
                .duration_since(pair[0].timestamp)
                .unsigned_abs()
                .div_f64(speed)
        })
        .collect()
}

pub async fn run(
    args: SimulateArgs,
    routing: ValhallaClient,
    speech: SpeechClient,
) -> anyhow::Result<()> {
    let track = read_track(&args.track)?;
    let Some(first) = track.first() else {
        bail!("Track {:?} has no samples", args.track);
    };

    let defaults = GuidanceParams::default();
    let tick = args.tick.unsigned_abs().div_f64(args.speed);
    if tick.is_zero() {
        bail!("Tick {} is too short for speed {}", args.tick, args.speed);
    }
    let params = GuidanceParams {
        tick_interval: tick,
        cue_gap: defaults.cue_gap.div_f64(args.speed),
        ..defaults
    };
    let player = ConsolePlayer::new(args.clip_duration.unsigned_abs().div_f64(args.speed));

    let (scheduler, handle) = GuidanceScheduler::new(
        params,
        Arc::new(routing),
        Arc::new(speech),
        Arc::new(player),
        ConsoleSurface::default(),
    );
    let scheduler = tokio::spawn(scheduler.run());

    info!(
        samples = track.len(),
        speed = args.speed,
        "Replaying track {:?}",
        args.track
    );

    handle.update_position(*first)?;
    handle.set_destination(args.destination)?;

    for (sample, delay) in track[1..].iter().zip(replay_delays(&track, args.speed)) {
        tokio::time::sleep(delay).await;
        handle.update_position(*sample)?;
    }

    // Let the last sample go through a tick and its cues play out
    tokio::time::sleep(tick * 2).await;
    handle.shutdown()?;
    scheduler.await?;

    info!("Replay finished");
    Ok(())
}
