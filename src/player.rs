/*
 *  player.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  Sequence player: frame timing loop with cooperative cancellation
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
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

use crate::constants::MAX_SLEEP_SLICE;
use crate::sequence::Sequence;
use crate::transport::FrameTransport;

/// Owner side of a cancellation token. Only the supervisor holds one.
#[derive(Debug)]
pub struct StopSignal(watch::Sender<bool>);

/// Read side handed to a player. Dropping the [`StopSignal`] also cancels.
#[derive(Debug, Clone)]
pub struct CancelToken(watch::Receiver<bool>);

pub fn cancel_pair() -> (StopSignal, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (StopSignal(tx), CancelToken(rx))
}

impl StopSignal {
    pub fn signal(&self) {
        self.0.send_replace(true);
    }

    pub fn is_signalled(&self) -> bool {
        *self.0.borrow()
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The loop count was exhausted
    Completed,
    /// The cancellation token was observed
    Cancelled,
}

/// Counters kept by one run, logged when it ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    pub frames_sent: u64,
    pub frames_failed: u64,
    pub loops_completed: u32,
}

/// Plays a [`Sequence`] against one target through a [`FrameTransport`].
///
/// Frames go out strictly in list order. Every frame's hold time is slept
/// in slices of at most `slice`, re-checking the cancel token after each,
/// so a stop request is honoured within one slice plus one in-flight send.
/// A failed send is logged and playback moves on to the next frame.
pub struct SequencePlayer<T: FrameTransport> {
    transport: Arc<T>,
    slice: Duration,
}

impl<T: FrameTransport> SequencePlayer<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_slice(transport, MAX_SLEEP_SLICE)
    }

    /// Slices are clamped to `1ms..=MAX_SLEEP_SLICE`.
    pub fn with_slice(transport: Arc<T>, slice: Duration) -> Self {
        let slice = slice.clamp(Duration::from_millis(1), MAX_SLEEP_SLICE);
        SequencePlayer { transport, slice }
    }

    pub fn slice(&self) -> Duration {
        self.slice
    }

    pub async fn run(&self, sequence: &Sequence, target: &str, cancel: &CancelToken) -> PlaybackOutcome {
        let (outcome, stats) = self.run_with_stats(sequence, target, cancel).await;
        info!(
            "{target}: playback {:?} after {} loop(s), {} frame(s) sent, {} failed",
            outcome, stats.loops_completed, stats.frames_sent, stats.frames_failed
        );
        outcome
    }

    pub async fn run_with_stats(
        &self,
        sequence: &Sequence,
        target: &str,
        cancel: &CancelToken,
    ) -> (PlaybackOutcome, PlaybackStats) {
        let mut stats = PlaybackStats::default();
        let brightness = sequence.brightness();
        let loops = sequence.loops();

        debug!(
            "{target}: playing {} frame(s), loops {}, brightness {}",
            sequence.len(), loops, brightness
        );

        loop {
            for (index, step) in sequence.steps().iter().enumerate() {
                if cancel.is_cancelled() {
                    return (PlaybackOutcome::Cancelled, stats);
                }

                match self.transport.send(target, &step.frame, brightness).await {
                    Ok(()) => stats.frames_sent += 1,
                    Err(e) => {
                        stats.frames_failed += 1;
                        warn!("{target}: frame {index} (loop {}) not delivered: {e}", stats.loops_completed + 1);
                    }
                }

                if self.hold(step.duration, cancel).await {
                    return (PlaybackOutcome::Cancelled, stats);
                }
            }

            stats.loops_completed = stats.loops_completed.saturating_add(1);
            if loops.is_exhausted(stats.loops_completed) {
                return (PlaybackOutcome::Completed, stats);
            }
        }
    }

    /// Sleep `duration` in slices. Returns true when cancelled part way.
    async fn hold(&self, duration: Duration, cancel: &CancelToken) -> bool {
        if duration.is_zero() {
            // zero-length frames must still let other tasks (and the supervisor) run
            tokio::task::yield_now().await;
            return false;
        }

        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep((deadline - now).min(self.slice)).await;
            if cancel.is_cancelled() {
                return true;
            }
        }
    }
}
