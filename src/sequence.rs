/*
 *  sequence.rs
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
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

use crate::constants::INFINITE_LOOPS;
use crate::error::SequencerError;
use crate::pixel::PixelFrame;

/// One frame and how long it stays up. A zero duration advances immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameStep {
    pub frame: PixelFrame,
    pub duration: Duration,
}

impl FrameStep {
    pub fn new(frame: PixelFrame, duration: Duration) -> Self {
        FrameStep { frame, duration }
    }
}

/// How many times the whole sequence is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    Finite(NonZeroU32),
    Infinite,
}

impl LoopCount {
    pub const ONCE: LoopCount = LoopCount::Finite(NonZeroU32::MIN);

    /// `-1` is infinite, `n >= 1` is finite, everything else is rejected.
    pub fn from_raw(raw: i64) -> Result<Self, SequencerError> {
        if raw == INFINITE_LOOPS {
            return Ok(LoopCount::Infinite);
        }
        u32::try_from(raw)
            .ok()
            .and_then(NonZeroU32::new)
            .map(LoopCount::Finite)
            .ok_or_else(|| {
                SequencerError::validation(format!(
                    "loop count must be {INFINITE_LOOPS} (infinite) or a positive integer, got {raw}"
                ))
            })
    }

    /// True once `completed` loops satisfy this count.
    pub fn is_exhausted(&self, completed: u32) -> bool {
        match self {
            LoopCount::Finite(n) => completed >= n.get(),
            LoopCount::Infinite => false,
        }
    }
}

impl fmt::Display for LoopCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopCount::Finite(n) => write!(f, "{n}"),
            LoopCount::Infinite => write!(f, "infinite"),
        }
    }
}

/// An ordered, non-empty animation (or a single still) plus its playback parameters.
///
/// Once handed to the supervisor a sequence is shared read-only with the player task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    steps: Vec<FrameStep>,
    brightness: u8,
    loops: LoopCount,
}

impl Sequence {
    pub fn new(steps: Vec<FrameStep>, brightness: u8, loops: LoopCount) -> Result<Self, SequencerError> {
        let sequence = Sequence { steps, brightness, loops };
        sequence.validate()?;
        Ok(sequence)
    }

    /// A single frame shown once.
    pub fn still(frame: PixelFrame, brightness: u8) -> Self {
        Sequence {
            steps: vec![FrameStep::new(frame, Duration::ZERO)],
            brightness,
            loops: LoopCount::ONCE,
        }
    }

    /// Each frame held for `hold`, in order.
    pub fn slideshow(
        frames: Vec<PixelFrame>,
        hold: Duration,
        brightness: u8,
        loops: LoopCount,
    ) -> Result<Self, SequencerError> {
        let steps = frames.into_iter().map(|f| FrameStep::new(f, hold)).collect();
        Self::new(steps, brightness, loops)
    }

    pub fn validate(&self) -> Result<(), SequencerError> {
        if self.steps.is_empty() {
            return Err(SequencerError::validation("sequence has no frames"));
        }
        Ok(())
    }

    /// Force a uniform frame duration of `1/fps`. `0` leaves durations alone.
    pub fn with_fps(mut self, fps: u32) -> Self {
        if fps > 0 {
            let delay = Duration::from_secs_f64(1.0 / fps as f64);
            self.steps.iter_mut().for_each(|s| s.duration = delay);
        }
        self
    }

    pub fn with_loops(mut self, loops: LoopCount) -> Self {
        self.loops = loops;
        self
    }

    pub fn steps(&self) -> &[FrameStep] {
        &self.steps
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn loops(&self) -> LoopCount {
        self.loops
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Duration of one pass over all steps.
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    /// One frame with no hold time: a still image. Repeating it only resends the same frame.
    pub fn is_static(&self) -> bool {
        matches!(self.steps.as_slice(), [step] if step.duration.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::Rgb;

    fn red() -> PixelFrame {
        PixelFrame::solid(Rgb::new(255, 0, 0))
    }

    #[test]
    fn test_loop_count_from_raw() {
        assert_eq!(LoopCount::from_raw(-1).unwrap(), LoopCount::Infinite);
        assert_eq!(LoopCount::from_raw(1).unwrap(), LoopCount::ONCE);
        assert_eq!(LoopCount::from_raw(3).unwrap(), LoopCount::Finite(NonZeroU32::new(3).unwrap()));
        assert!(LoopCount::from_raw(0).is_err());
        assert!(LoopCount::from_raw(-2).is_err());
        assert!(LoopCount::from_raw(i64::MAX).is_err());
    }

    #[test]
    fn test_loop_exhaustion() {
        let two = LoopCount::from_raw(2).unwrap();
        assert!(!two.is_exhausted(1));
        assert!(two.is_exhausted(2));
        assert!(!LoopCount::Infinite.is_exhausted(u32::MAX));
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let err = Sequence::new(Vec::new(), 255, LoopCount::ONCE).unwrap_err();
        assert!(matches!(err, SequencerError::Validation(_)));
        assert!(Sequence::slideshow(Vec::new(), Duration::from_secs(1), 255, LoopCount::ONCE).is_err());
    }

    #[test]
    fn test_still_is_static() {
        let seq = Sequence::still(red(), 80);
        assert!(seq.is_static());
        assert_eq!(seq.brightness(), 80);
        assert_eq!(seq.total_duration(), Duration::ZERO);
    }

    #[test]
    fn test_with_fps_overrides_durations() {
        let steps = vec![
            FrameStep::new(red(), Duration::from_millis(30)),
            FrameStep::new(red(), Duration::from_millis(500)),
        ];
        let seq = Sequence::new(steps, 255, LoopCount::ONCE).unwrap().with_fps(4);
        assert!(seq.steps().iter().all(|s| s.duration == Duration::from_millis(250)));
        assert_eq!(seq.total_duration(), Duration::from_millis(500));

        let untouched = seq.clone().with_fps(0);
        assert_eq!(untouched, seq);
    }

    #[test]
    fn test_slideshow_holds_each_frame() {
        let frames = vec![red(), PixelFrame::blank(), red()];
        let seq = Sequence::slideshow(frames, Duration::from_secs(1), 150, LoopCount::ONCE).unwrap();
        assert_eq!(seq.len(), 3);
        assert!(!seq.is_static());
        assert_eq!(seq.total_duration(), Duration::from_secs(3));
    }

    #[test]
    fn test_held_single_frame_is_not_static() {
        let steps = vec![FrameStep::new(red(), Duration::from_millis(200))];
        let seq = Sequence::new(steps, 255, LoopCount::Infinite).unwrap();
        assert!(!seq.is_static());

        let still = Sequence::still(red(), 255).with_loops(LoopCount::Infinite);
        assert!(still.is_static());
        assert_eq!(still.loops(), LoopCount::Infinite);
    }
}
