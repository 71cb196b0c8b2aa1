/*
 *  main.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use anyhow::{bail, Context, Result};
use env_logger::Env;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use wled_icons::config::{self, Cli, Command, Config, PowerState};
use wled_icons::source::{BitmapSource, LaMetricClient, PixelArt, SvgSource};
use wled_icons::{FrameSource, RenderOptions, Rotation, Sequence, Supervisor, WledClient};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for SIGINT, SIGTERM or SIGHUP and logs which one arrived.
#[cfg(unix)]
async fn signal_handler() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Stopping playback.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Stopping playback.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Stopping playback.");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Stopping playback.");
    Ok(())
}

fn render_options(cli: &Cli, cfg: &Config) -> Result<RenderOptions> {
    Ok(RenderOptions {
        rotate: Rotation::from_degrees(cli.rotate)?,
        flip_h: cli.flip_h,
        flip_v: cli.flip_v,
        color: cli.color,
        fps: cfg.fps(),
        animate: !cli.no_animate,
    })
}

/// Turn a play command into a sequence; `None` for device commands.
async fn build_sequence(command: &Command, cli: &Cli, cfg: &Config) -> Result<Option<Sequence>> {
    let opts = render_options(cli, cfg)?;
    let brightness = cfg.brightness();
    let loops = cfg.loops()?;

    let sequence = match command {
        Command::Icon { ids, hold } => {
            let lametric = LaMetricClient::new(cfg.lametric_base_url(), cfg.lametric_timeout())?;
            if let [id] = ids.as_slice() {
                lametric.fetch(id).await?.to_sequence(&opts, brightness, loops)?
            } else {
                let hold = Duration::try_from_secs_f64(*hold)
                    .ok()
                    .filter(|h| !h.is_zero())
                    .context("--hold must be a positive number of seconds")?;
                // first frame of each icon, held in turn
                let stills = RenderOptions { animate: false, ..opts };
                let mut frames = Vec::with_capacity(ids.len());
                for id in ids {
                    match lametric.fetch(id).await.and_then(|icon| icon.render(&stills)) {
                        Ok(steps) => frames.extend(steps.into_iter().take(1).map(|s| s.frame)),
                        Err(e) => warn!("skipping icon {id}: {e}"),
                    }
                }
                if frames.is_empty() {
                    bail!("none of the requested icons could be loaded");
                }
                Sequence::slideshow(frames, hold, brightness, loops)?
            }
        }
        Command::Image { path } => BitmapSource::from_path(path)
            .with_context(|| format!("reading {}", path.display()))?
            .to_sequence(&opts, brightness, loops)?,
        Command::Svg { path } => SvgSource::from_path(path)
            .with_context(|| format!("reading {}", path.display()))?
            .to_sequence(&opts, brightness, loops)?,
        Command::Art { path } => PixelArt::from_path(path)
            .with_context(|| format!("reading {}", path.display()))?
            .to_sequence(&opts, brightness, loops)?,
        _ => return Ok(None),
    };
    Ok(Some(sequence))
}

/// Play on a fresh supervisor until the session exits or a signal arrives.
async fn play(client: WledClient, cfg: &Config, sequence: Sequence, host: &str) -> Result<()> {
    let supervisor = Supervisor::with_options(Arc::new(client), cfg.supervisor_options());
    let handle = supervisor.play(sequence, host).await?;

    tokio::select! {
        outcome = handle.wait() => {
            info!("session {} finished: {:?}", handle.id(), outcome);
        }
        res = signal_handler() => {
            res?;
            supervisor.stop().await;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let (cfg, cli) = config::load()?;

    // Initialize the logger, RUST_LOG wins over the configured level
    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} v.{} built {} ({})", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), BUILD_DATE, BUILD_PROFILE);

    if cli.dump_config {
        print!("{}", config::dump_config(&cfg)?);
        return Ok(());
    }

    let Some(command) = cli.command.as_ref() else {
        bail!("no command given, see --help");
    };

    let host = cfg.host()?.to_string();
    let client = WledClient::with_timeout(cfg.device_timeout())?;

    if let Some(sequence) = build_sequence(command, &cli, &cfg).await? {
        return play(client, &cfg, sequence, &host).await;
    }

    match command {
        Command::Clear => client.clear(&host).await?,
        Command::Power { state } => client.set_power(&host, *state == PowerState::On).await?,
        Command::Brightness { value } => client.set_brightness(&host, *value).await?,
        Command::State => {
            let state = client.state(&host).await?;
            println!("on: {}  brightness: {}", state.on, state.bri);
            for seg in &state.seg {
                println!("segment {}: {}..{}", seg.id, seg.start, seg.stop);
            }
        }
        _ => {}
    }
    info!("{host}: done");
    Ok(())
}
