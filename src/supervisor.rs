/*
 *  supervisor.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  Playback supervisor: at most one sequence playing per instance
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
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{watch, Mutex as TokMutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::constants::{DEFAULT_STOP_WAIT, MAX_SLEEP_SLICE};
use crate::error::SequencerError;
use crate::player::{cancel_pair, CancelToken, PlaybackOutcome, SequencePlayer, StopSignal};
use crate::sequence::Sequence;
use crate::transport::FrameTransport;

/// Lifecycle of one playback session.
///
/// `Starting -> Running -> {Completing | Stopping} -> Exited`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Completing,
    Stopping,
    Exited,
}

impl SessionState {
    /// Starting or Running: the session may still send frames on its own accord.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Starting | SessionState::Running)
    }
}

/// Published on the session's watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub outcome: Option<PlaybackOutcome>,
}

/// Timing knobs for a [`Supervisor`].
#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    /// Sleep slice used by the players
    pub slice: Duration,
    /// Bound on waiting for a preempted session to exit
    pub stop_wait: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        SupervisorOptions { slice: MAX_SLEEP_SLICE, stop_wait: DEFAULT_STOP_WAIT }
    }
}

/// Caller's view of a session: identity plus a live status feed.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    target: String,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> SessionState {
        self.status.borrow().state
    }

    pub fn outcome(&self) -> Option<PlaybackOutcome> {
        self.status.borrow().outcome
    }

    /// Resolves once the session has exited, with its outcome.
    pub async fn wait(&self) -> Option<PlaybackOutcome> {
        let mut status = self.status.clone();
        let outcome = match status.wait_for(|s| s.state == SessionState::Exited).await {
            Ok(s) => s.outcome,
            Err(_) => None,
        };
        outcome
    }
}

/// One run of the player, owned exclusively by the supervisor.
struct PlaybackSession {
    id: u64,
    target: String,
    stop: StopSignal,
    status: Arc<watch::Sender<SessionStatus>>,
    task: JoinHandle<PlaybackOutcome>,
}

impl PlaybackSession {
    /// Running/Starting -> Stopping, then raise the cancel token.
    fn begin_stop(&self) {
        self.status.send_if_modified(|s| {
            if s.state.is_active() {
                s.state = SessionState::Stopping;
                true
            } else {
                false
            }
        });
        self.stop.signal();
    }
}

/// Single point of control over what a target device is showing.
///
/// `play` and `stop` are serialised by one lock, so "preempt the old
/// session, start the new one" is atomic with respect to other callers and
/// at most one session is ever Starting or Running. A preempted session is
/// given `stop_wait` to exit; if it overruns, a warning is logged, the
/// task is aborted and the new session starts regardless.
///
/// Use one supervisor per managed device.
pub struct Supervisor<T: FrameTransport> {
    transport: Arc<T>,
    options: SupervisorOptions,
    current: TokMutex<Option<PlaybackSession>>,
    next_id: AtomicU64,
}

impl<T: FrameTransport> Supervisor<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_options(transport, SupervisorOptions::default())
    }

    pub fn with_options(transport: Arc<T>, options: SupervisorOptions) -> Self {
        Supervisor {
            transport,
            options,
            current: TokMutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Validate, preempt whatever is playing, then start `sequence` on `target`.
    ///
    /// Malformed input is rejected before anything is stopped or started.
    pub async fn play(&self, sequence: Sequence, target: &str) -> Result<SessionHandle, SequencerError> {
        sequence.validate()?;
        let target = target.trim();
        if target.is_empty() {
            return Err(SequencerError::validation("target address is empty"));
        }

        let mut current = self.current.lock().await;
        self.preempt(&mut current).await;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (stop, token) = cancel_pair();
        let (status_tx, status_rx) = watch::channel(SessionStatus { state: SessionState::Starting, outcome: None });
        let status = Arc::new(status_tx);

        info!(
            "session {id}: {target} <- {} frame(s), loops {}, brightness {}",
            sequence.len(), sequence.loops(), sequence.brightness()
        );

        let task = tokio::spawn(run_session(
            SequencePlayer::with_slice(self.transport.clone(), self.options.slice),
            sequence,
            target.to_string(),
            token,
            status.clone(),
        ));

        *current = Some(PlaybackSession { id, target: target.to_string(), stop, status, task });

        Ok(SessionHandle { id, target: target.to_string(), status: status_rx })
    }

    /// Stop the active session, if any. Idempotent.
    pub async fn stop(&self) {
        let mut current = self.current.lock().await;
        self.preempt(&mut current).await;
    }

    /// Handle on the most recent session, whether or not it is still running.
    pub async fn current(&self) -> Option<SessionHandle> {
        let current = self.current.lock().await;
        current.as_ref().map(|s| SessionHandle {
            id: s.id,
            target: s.target.clone(),
            status: s.status.subscribe(),
        })
    }

    pub async fn is_playing(&self) -> bool {
        let current = self.current.lock().await;
        current.as_ref().is_some_and(|s| s.status.borrow().state.is_active())
    }

    /// Signal the held session and wait (bounded) for it to exit. Caller holds the lock.
    async fn preempt(&self, slot: &mut Option<PlaybackSession>) {
        let Some(mut session) = slot.take() else {
            return;
        };

        if session.task.is_finished() {
            debug!("session {}: already exited", session.id);
            return;
        }

        debug!("session {}: stopping", session.id);
        session.begin_stop();

        match timeout(self.options.stop_wait, &mut session.task).await {
            Ok(Ok(outcome)) => debug!("session {}: exited {:?}", session.id, outcome),
            Ok(Err(e)) => {
                warn!("session {}: task failed: {e}", session.id);
                mark_exited(&session.status, None);
            }
            Err(_) => {
                let err = SequencerError::PreemptionTimeout { session: session.id, waited: self.options.stop_wait };
                warn!("{err}; starting anyway");
                session.task.abort();
                mark_exited(&session.status, Some(PlaybackOutcome::Cancelled));
            }
        }
    }
}

impl<T: FrameTransport> Drop for Supervisor<T> {
    fn drop(&mut self) {
        // cannot await here; raising the token lets the player wind down by itself
        if let Some(session) = self.current.get_mut().as_ref() {
            session.begin_stop();
        }
    }
}

/// Body of a session task: Starting -> Running, play, then report the exit.
async fn run_session<T: FrameTransport>(
    player: SequencePlayer<T>,
    sequence: Sequence,
    target: String,
    token: CancelToken,
    status: Arc<watch::Sender<SessionStatus>>,
) -> PlaybackOutcome {
    status.send_if_modified(|s| {
        if s.state == SessionState::Starting {
            s.state = SessionState::Running;
            true
        } else {
            false
        }
    });

    let outcome = player.run(&sequence, &target, &token).await;

    if outcome == PlaybackOutcome::Completed {
        status.send_if_modified(|s| {
            if s.state == SessionState::Running {
                s.state = SessionState::Completing;
                true
            } else {
                false
            }
        });
    }
    mark_exited(&status, Some(outcome));
    outcome
}

fn mark_exited(status: &watch::Sender<SessionStatus>, outcome: Option<PlaybackOutcome>) {
    status.send_if_modified(|s| {
        if s.state == SessionState::Exited {
            return false;
        }
        s.state = SessionState::Exited;
        s.outcome = outcome;
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::{PixelFrame, Rgb};
    use crate::sequence::{FrameStep, LoopCount};
    use crate::transport::MockTransport;
    use tokio::time::{sleep, Instant};

    fn solid_sequence(color: Rgb, frames: usize, step: Duration, loops: LoopCount) -> Sequence {
        let steps = (0..frames).map(|_| FrameStep::new(PixelFrame::solid(color), step)).collect();
        Sequence::new(steps, 200, loops).unwrap()
    }

    #[test]
    fn test_session_state_activity() {
        assert!(SessionState::Starting.is_active());
        assert!(SessionState::Running.is_active());
        assert!(!SessionState::Stopping.is_active());
        assert!(!SessionState::Completing.is_active());
        assert!(!SessionState::Exited.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_without_session_is_noop() {
        let mock = MockTransport::new();
        let supervisor = Supervisor::new(Arc::new(mock.clone()));

        supervisor.stop().await;
        supervisor.stop().await;

        assert_eq!(mock.send_count(), 0);
        assert!(supervisor.current().await.is_none());
        assert!(!supervisor.is_playing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_runs_to_completion() {
        let mock = MockTransport::new();
        let supervisor = Supervisor::new(Arc::new(mock.clone()));
        let seq = solid_sequence(Rgb::new(1, 2, 3), 4, Duration::from_millis(100), LoopCount::ONCE);

        let handle = supervisor.play(seq, "matrix").await.unwrap();
        assert_eq!(handle.target(), "matrix");

        assert_eq!(handle.wait().await, Some(PlaybackOutcome::Completed));
        assert_eq!(handle.state(), SessionState::Exited);
        assert_eq!(mock.send_count(), 4);
        assert!(!supervisor.is_playing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completing_state_observed() {
        let mock = MockTransport::new();
        let supervisor = Supervisor::new(Arc::new(mock.clone()));
        let seq = solid_sequence(Rgb::new(9, 9, 9), 1, Duration::from_millis(10), LoopCount::ONCE);

        let handle = supervisor.play(seq, "matrix").await.unwrap();
        let mut status = handle.status.clone();
        let mut seen = vec![status.borrow_and_update().state];
        while status.changed().await.is_ok() {
            let state = status.borrow_and_update().state;
            seen.push(state);
            if state == SessionState::Exited {
                break;
            }
        }

        // watch only keeps the latest value, so intermediate states may be coalesced
        assert_eq!(seen.first(), Some(&SessionState::Starting));
        assert_eq!(seen.last(), Some(&SessionState::Exited));
        assert!(!seen.contains(&SessionState::Stopping));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_running_session() {
        let mock = MockTransport::new();
        let supervisor = Supervisor::new(Arc::new(mock.clone()));
        let seq = solid_sequence(Rgb::new(5, 5, 5), 2, Duration::from_millis(500), LoopCount::Infinite);

        let handle = supervisor.play(seq, "matrix").await.unwrap();
        sleep(Duration::from_millis(1200)).await;
        assert_eq!(handle.state(), SessionState::Running);
        assert!(supervisor.is_playing().await);

        supervisor.stop().await;

        assert_eq!(handle.state(), SessionState::Exited);
        assert_eq!(handle.outcome(), Some(PlaybackOutcome::Cancelled));
        let count = mock.send_count();
        sleep(Duration::from_secs(5)).await;
        assert_eq!(mock.send_count(), count);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_rejects_malformed_input() {
        let mock = MockTransport::new();
        let supervisor = Supervisor::new(Arc::new(mock.clone()));

        let seq = solid_sequence(Rgb::new(5, 5, 5), 1, Duration::ZERO, LoopCount::ONCE);
        let err = supervisor.play(seq, "   ").await.unwrap_err();
        assert!(matches!(err, SequencerError::Validation(_)));
        assert!(supervisor.current().await.is_none());
        assert_eq!(mock.send_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_play_leaves_current_running() {
        let mock = MockTransport::new();
        let supervisor = Supervisor::new(Arc::new(mock.clone()));
        let seq = solid_sequence(Rgb::new(5, 5, 5), 1, Duration::from_millis(100), LoopCount::Infinite);
        let handle = supervisor.play(seq.clone(), "matrix").await.unwrap();

        assert!(supervisor.play(seq, "").await.is_err());
        sleep(Duration::from_millis(300)).await;
        assert_eq!(handle.state(), SessionState::Running);
        supervisor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_preempt_signals_before_next_frame() {
        let mock = MockTransport::new();
        let supervisor = Supervisor::new(Arc::new(mock.clone()));
        let a = solid_sequence(Rgb::new(255, 0, 0), 3, Duration::from_millis(200), LoopCount::Infinite);
        let b = solid_sequence(Rgb::new(0, 0, 255), 3, Duration::from_millis(200), LoopCount::ONCE);

        let first = supervisor.play(a, "matrix").await.unwrap();
        sleep(Duration::from_millis(450)).await;
        let second = supervisor.play(b, "matrix").await.unwrap();

        // the old session is fully gone before the new one is handed back
        assert_eq!(first.state(), SessionState::Exited);
        assert_eq!(first.outcome(), Some(PlaybackOutcome::Cancelled));
        assert_ne!(first.id(), second.id());

        assert_eq!(second.wait().await, Some(PlaybackOutcome::Completed));
        let sent = mock.sent();
        let first_blue = sent.iter().position(|s| s.frame.pixels()[0] == Rgb::new(0, 0, 255)).unwrap();
        assert!(sent[first_blue..].iter().all(|s| s.frame.pixels()[0] == Rgb::new(0, 0, 255)));
        assert_eq!(sent.len() - first_blue, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_racing_plays_install_one_session() {
        let mock = MockTransport::new();
        let supervisor = Arc::new(Supervisor::new(Arc::new(mock.clone())));
        let red = solid_sequence(Rgb::new(255, 0, 0), 1, Duration::from_millis(100), LoopCount::Infinite);
        let green = solid_sequence(Rgb::new(0, 255, 0), 1, Duration::from_millis(100), LoopCount::Infinite);

        let (a, b) = tokio::join!(
            { let s = supervisor.clone(); async move { s.play(red, "matrix").await } },
            { let s = supervisor.clone(); async move { s.play(green, "matrix").await } },
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        sleep(Duration::from_millis(500)).await;

        let active: Vec<_> = [&a, &b].into_iter().filter(|h| h.state().is_active()).collect();
        assert_eq!(active.len(), 1);
        let (winner, loser) = if a.state().is_active() { (&a, &b) } else { (&b, &a) };
        assert_eq!(loser.state(), SessionState::Exited);
        assert_eq!(loser.outcome(), Some(PlaybackOutcome::Cancelled));
        assert_eq!(supervisor.current().await.map(|h| h.id()), Some(winner.id()));

        let winner_color = if winner.id() == a.id() { Rgb::new(255, 0, 0) } else { Rgb::new(0, 255, 0) };
        let sent = mock.sent();
        let first = sent.iter().position(|s| s.frame.pixels()[0] == winner_color).unwrap();
        assert!(sent[first..].iter().all(|s| s.frame.pixels()[0] == winner_color));
        assert!(sent.len() - first >= 5);

        supervisor.stop().await;
        assert!(!supervisor.is_playing().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_send_hits_stop_bound() {
        // a send that outlives the stop bound
        let mock = MockTransport::with_latency(Duration::from_secs(10));
        let options = SupervisorOptions { slice: MAX_SLEEP_SLICE, stop_wait: Duration::from_millis(300) };
        let supervisor = Supervisor::with_options(Arc::new(mock.clone()), options);
        let seq = solid_sequence(Rgb::new(1, 1, 1), 1, Duration::ZERO, LoopCount::ONCE);

        let stuck = supervisor.play(seq.clone(), "matrix").await.unwrap();
        sleep(Duration::from_millis(10)).await;

        let started = Instant::now();
        let next = supervisor.play(seq, "matrix").await.unwrap();
        let waited = started.elapsed();

        assert!(waited >= Duration::from_millis(300));
        assert!(waited < Duration::from_secs(1));
        assert_eq!(stuck.state(), SessionState::Exited);
        assert_eq!(stuck.outcome(), Some(PlaybackOutcome::Cancelled));
        assert!(next.state().is_active());
        supervisor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_player() {
        let mock = MockTransport::new();
        let supervisor = Supervisor::new(Arc::new(mock.clone()));
        let seq = solid_sequence(Rgb::new(1, 1, 1), 1, Duration::from_millis(100), LoopCount::Infinite);

        let handle = supervisor.play(seq, "matrix").await.unwrap();
        sleep(Duration::from_millis(250)).await;
        drop(supervisor);

        assert_eq!(handle.wait().await, Some(PlaybackOutcome::Cancelled));
    }
}
