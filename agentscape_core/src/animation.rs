//! Sprite Animation Model.
//!
//! The current frame is a pure function of elapsed time: no frame counter
//! is stored anywhere, only the instant the sprite was created.

use agentscape_env::{AgentId, AgentState};
use std::time::Duration;

/// Default time each sprite frame stays on screen.
pub const FRAME_DURATION: Duration = Duration::from_millis(100);

/// Vertical bob amplitude in scene units.
pub const BOB_AMPLITUDE: f64 = 0.05;

/// Bob angular speed in radians per second.
pub const BOB_SPEED: f64 = 2.0;

pub const IDLE_GREEN: &str = "#4ade80";
pub const WORKING_ORANGE: &str = "#f97316";
pub const COMMUNICATING_BLUE: &str = "#3b82f6";

const IDLE_FRAMES: [u32; 3] = [0, 1, 2];
const WORKING_FRAMES: [u32; 4] = [0, 1, 2, 3];
const COMMUNICATING_FRAMES: [u32; 5] = [0, 1, 2, 3, 4];

/// Picks the frame for `now` from a cyclic frame set.
///
/// `index = floor(max(0, now - start) / frame_duration) mod len`.
/// Times before `start` show the first frame. A zero frame duration is
/// treated as one nanosecond.
///
/// # Panics
///
/// Panics if `frames` is empty.
pub fn frame<T: Copy>(frames: &[T], start: Duration, now: Duration, frame_duration: Duration) -> T {
    assert!(!frames.is_empty(), "frame set must not be empty");
    let elapsed = now.saturating_sub(start).as_nanos();
    let step = frame_duration.as_nanos().max(1);
    let index = (elapsed / step) % frames.len() as u128;
    frames[index as usize]
}

/// Frame set for a semantic state. Unknown states animate like idle.
pub fn frame_set(state: &AgentState) -> &'static [u32] {
    match state {
        AgentState::Working => &WORKING_FRAMES,
        AgentState::Communicating => &COMMUNICATING_FRAMES,
        AgentState::Idle | AgentState::Other(_) => &IDLE_FRAMES,
    }
}

/// Sprite color token for a semantic state. Unknown states are green.
pub fn color_for(state: &AgentState) -> &'static str {
    match state {
        AgentState::Working => WORKING_ORANGE,
        AgentState::Communicating => COMMUNICATING_BLUE,
        AgentState::Idle | AgentState::Other(_) => IDLE_GREEN,
    }
}

/// Vertical bob offset of a sprite; agents are phase-shifted by id.
pub fn bob_offset(elapsed: Duration, id: AgentId) -> f64 {
    (elapsed.as_secs_f64() * BOB_SPEED + id.get() as f64).sin() * BOB_AMPLITUDE
}

/// Per-agent animation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationState {
    /// Scene time the sprite was created; never reset
    pub anim_start: Duration,
}

impl AnimationState {
    pub fn new(anim_start: Duration) -> Self {
        Self { anim_start }
    }

    /// Current frame for the given state.
    pub fn frame(&self, state: &AgentState, now: Duration, frame_duration: Duration) -> u32 {
        frame(frame_set(state), self.anim_start, now, frame_duration)
    }

    /// Time since the sprite was created.
    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.anim_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_frame_cycles_and_wraps() {
        let frames = [0, 1, 2];
        assert_eq!(frame(&frames, ms(0), ms(0), ms(4)), 0);
        assert_eq!(frame(&frames, ms(0), ms(4), ms(4)), 1);
        assert_eq!(frame(&frames, ms(0), ms(8), ms(4)), 2);
        assert_eq!(frame(&frames, ms(0), ms(12), ms(4)), 0);
    }

    #[test]
    fn test_frame_before_start_is_first() {
        let frames = ['a', 'b'];
        assert_eq!(frame(&frames, ms(500), ms(100), ms(10)), 'a');
    }

    #[test]
    fn test_frame_zero_duration_does_not_divide_by_zero() {
        let frames = [0, 1];
        let _ = frame(&frames, ms(0), ms(5), Duration::ZERO);
    }

    #[test]
    #[should_panic(expected = "frame set must not be empty")]
    fn test_empty_frame_set_panics() {
        let frames: [u32; 0] = [];
        frame(&frames, ms(0), ms(0), ms(1));
    }

    #[test]
    fn test_frame_set_sizes() {
        assert_eq!(frame_set(&AgentState::Idle).len(), 3);
        assert_eq!(frame_set(&AgentState::Working).len(), 4);
        assert_eq!(frame_set(&AgentState::Communicating).len(), 5);
        assert_eq!(frame_set(&AgentState::from("moving")).len(), 3);
    }

    #[test]
    fn test_color_for() {
        assert_eq!(color_for(&AgentState::Idle), "#4ade80");
        assert_eq!(color_for(&AgentState::Working), "#f97316");
        assert_eq!(color_for(&AgentState::Communicating), "#3b82f6");
        assert_eq!(color_for(&AgentState::from("error")), "#4ade80");
    }

    #[test]
    fn test_animation_state_uses_state_frame_count() {
        let anim = AnimationState::new(ms(1000));
        // 5 frames at 100ms: 700ms in -> index 7 % 5 = 2
        assert_eq!(anim.frame(&AgentState::Communicating, ms(1700), FRAME_DURATION), 2);
        // 3 frames: 7 % 3 = 1
        assert_eq!(anim.frame(&AgentState::Idle, ms(1700), FRAME_DURATION), 1);
    }

    #[test]
    fn test_bob_offset_phase_by_id() {
        assert_relative_eq!(bob_offset(Duration::ZERO, AgentId(0)), 0.0);
        assert_relative_eq!(bob_offset(Duration::ZERO, AgentId(2)), 2.0f64.sin() * 0.05);
    }

    proptest! {
        #[test]
        fn prop_frame_is_member_of_set(start in 0u64..10_000, now in 0u64..100_000, dur in 1u64..500) {
            let frames = frame_set(&AgentState::Working);
            let f = frame(frames, ms(start), ms(now), ms(dur));
            prop_assert!(frames.contains(&f));
        }

        #[test]
        fn prop_bob_is_bounded(secs in 0.0f64..10_000.0, id in 0u32..1000) {
            let offset = bob_offset(Duration::from_secs_f64(secs), AgentId(id));
            prop_assert!(offset.abs() <= BOB_AMPLITUDE);
        }
    }
}
