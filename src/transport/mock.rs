/*
 *  transport/mock.rs
 *
 *  wled-icons - 8x8 matrix sequencer
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock frame transport for testing without a device
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

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::pixel::PixelFrame;
use crate::transport::FrameTransport;

/// One recorded call to [`MockTransport::send`].
#[derive(Debug, Clone)]
pub struct SentFrame {
    /// When the send started
    pub at: Instant,
    pub target: String,
    pub frame: PixelFrame,
    pub brightness: u8,
    /// Whether the simulated send succeeded
    pub ok: bool,
}

/// Internal state for the mock transport (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockTransportState {
    /// Every send, in call order
    pub sent: Vec<SentFrame>,

    /// Fail every send
    pub simulate_failure: bool,

    /// Fail only the sends with these (zero based) call indices
    pub fail_calls: HashSet<usize>,

    /// Simulated network time per send
    pub latency: Duration,
}

/// Mock transport for testing
///
/// Records every frame it is asked to send and can simulate failures and
/// slow devices. Clones share the same state, so a test can keep one
/// handle while the supervisor owns another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        let mock = Self::default();
        mock.lock().latency = latency;
        mock
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockTransportState> {
        // a panicking test thread must not hide the recorded frames from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn sent(&self) -> Vec<SentFrame> {
        self.lock().sent.clone()
    }

    pub fn send_count(&self) -> usize {
        self.lock().sent.len()
    }

    pub fn set_failure(&self, fail: bool) {
        self.lock().simulate_failure = fail;
    }

    pub fn fail_call(&self, index: usize) {
        self.lock().fail_calls.insert(index);
    }

    /// Reset recorded sends (useful between phases of a test)
    pub fn reset(&self) {
        self.lock().sent.clear();
    }
}

impl FrameTransport for MockTransport {
    async fn send(&self, target: &str, frame: &PixelFrame, brightness: u8) -> Result<(), TransportError> {
        let (ok, latency) = {
            let mut state = self.lock();
            let index = state.sent.len();
            let ok = !state.simulate_failure && !state.fail_calls.contains(&index);
            state.sent.push(SentFrame {
                at: Instant::now(),
                target: target.to_string(),
                frame: frame.clone(),
                brightness,
                ok,
            });
            (ok, state.latency)
        }; // Release lock before simulating the network

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if ok {
            Ok(())
        } else {
            Err(TransportError::Device("simulated send failure".to_string()))
        }
    }
}
