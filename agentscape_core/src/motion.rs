//! Agent Motion Model - wander interpolation and arrival detection.
//!
//! Each agent eases toward a random target inside a bounding rectangle.
//! Motion is exponential decay toward the target (a fixed fraction of the
//! remaining distance per tick), so agents decelerate into their targets
//! without a separate easing curve.
//!
//! # Target Selection
//!
//! A new target is rolled when EITHER:
//! - the agent is within `tolerance` of its target, OR
//! - more than `dwell` has passed since the last roll
//!
//! whichever comes first.

use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 2D point in scene units.
pub type Vec2 = Vector2<f64>;

/// Fraction of the remaining distance covered per tick.
pub const WANDER_SPEED: f64 = 0.02;

/// Distance at which an agent counts as arrived.
pub const ARRIVAL_TOLERANCE: f64 = 0.1;

/// Maximum time an agent keeps the same target.
pub const DWELL: Duration = Duration::from_secs(3);

/// Moves `current` a `speed` fraction of the way toward `target`.
///
/// `next = current + speed * (target - current)`. The speed is not clamped;
/// values outside `(0, 1]` overshoot or move away and are the caller's
/// responsibility.
pub fn interpolate(current: &Vec2, target: &Vec2, speed: f64) -> Vec2 {
    current + (target - current) * speed
}

/// Returns true iff the Euclidean distance is at most `tolerance`.
pub fn reached(current: &Vec2, target: &Vec2, tolerance: f64) -> bool {
    (target - current).norm() <= tolerance
}

/// Axis-aligned rectangle that wander targets are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Creates bounds from two opposite corners (in any order).
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self {
            min: Vec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Vec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Creates bounds centred on the origin.
    pub fn centered(half_width: f64, half_height: f64) -> Self {
        Self::new(
            Vec2::new(-half_width, -half_height),
            Vec2::new(half_width, half_height),
        )
    }

    pub fn contains(&self, point: &Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Draws a point uniformly at random inside the rectangle.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.gen_range(self.min.x..=self.max.x),
            rng.gen_range(self.min.y..=self.max.y),
        )
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::centered(4.0, 2.5)
    }
}

/// Tuning for the wander policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WanderParams {
    pub speed: f64,
    pub tolerance: f64,
    pub dwell: Duration,
    pub bounds: Bounds,
}

impl Default for WanderParams {
    fn default() -> Self {
        Self {
            speed: WANDER_SPEED,
            tolerance: ARRIVAL_TOLERANCE,
            dwell: DWELL,
            bounds: Bounds::default(),
        }
    }
}

/// Per-agent motion record, owned by the scene and updated in place once
/// per running tick.
///
/// `current` only ever changes through [`interpolate`]; `target` only
/// changes when it was reached or the dwell expired.
#[derive(Debug, Clone)]
pub struct MotionState {
    /// Authoritative rendered position
    pub current: Vec2,

    /// Current wander destination
    pub target: Vec2,

    /// Scene time of the last target roll
    pub last_target_time: Duration,

    /// Number of targets rolled so far (the spawn target excluded)
    retargets: u64,

    rng: StdRng,
}

impl MotionState {
    /// Creates a motion state resting at `position`.
    ///
    /// The first step immediately rolls a real target since the agent is
    /// already "at" its spawn target.
    pub fn new(position: Vec2, now: Duration, rng: StdRng) -> Self {
        Self {
            current: position,
            target: position,
            last_target_time: now,
            retargets: 0,
            rng,
        }
    }

    /// Returns true if the target should be re-rolled at `now`.
    pub fn needs_target(&self, now: Duration, params: &WanderParams) -> bool {
        reached(&self.current, &self.target, params.tolerance)
            || now.saturating_sub(self.last_target_time) > params.dwell
    }

    /// Advances one tick: re-roll the target if due, then interpolate.
    ///
    /// Returns the new position.
    pub fn step(&mut self, now: Duration, params: &WanderParams) -> Vec2 {
        if self.needs_target(now, params) {
            self.target = params.bounds.sample(&mut self.rng);
            self.last_target_time = now;
            self.retargets += 1;
        }
        self.current = interpolate(&self.current, &self.target, params.speed);
        self.current
    }

    pub fn retargets(&self) -> u64 {
        self.retargets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_interpolate_moves_toward_target() {
        let next = interpolate(&Vec2::new(0.0, 0.0), &Vec2::new(10.0, 0.0), 0.1);
        assert!(next.x > 0.0);
        assert!(next.x < 10.0);
        assert_relative_eq!(next.x, 1.0);
        assert_relative_eq!(next.y, 0.0);
    }

    #[test]
    fn test_interpolate_zero_speed_is_identity() {
        let current = Vec2::new(1.5, -2.0);
        assert_eq!(interpolate(&current, &Vec2::new(9.0, 9.0), 0.0), current);
    }

    #[test]
    fn test_interpolate_full_speed_lands_on_target() {
        let target = Vec2::new(3.0, 4.0);
        assert_eq!(interpolate(&Vec2::zeros(), &target, 1.0), target);
    }

    #[test]
    fn test_reached_within_tolerance() {
        assert!(reached(&Vec2::new(9.99, 0.0), &Vec2::new(10.0, 0.0), 0.05));
        assert!(!reached(&Vec2::new(9.0, 0.0), &Vec2::new(10.0, 0.0), 0.5));
    }

    #[test]
    fn test_reached_boundary_is_inclusive() {
        // 3-4-5 triangle: distance is exactly 5
        assert!(reached(&Vec2::new(0.0, 0.0), &Vec2::new(3.0, 4.0), 5.0));
        assert!(!reached(&Vec2::new(0.0, 0.0), &Vec2::new(3.0, 4.0), 4.999));
    }

    #[test]
    fn test_bounds_normalize_corners() {
        let bounds = Bounds::new(Vec2::new(2.0, -1.0), Vec2::new(-2.0, 1.0));
        assert_eq!(bounds.min, Vec2::new(-2.0, -1.0));
        assert_eq!(bounds.max, Vec2::new(2.0, 1.0));
    }

    #[test]
    fn test_degenerate_bounds_sample_the_point() {
        let bounds = Bounds::new(Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0));
        assert_eq!(bounds.sample(&mut rng()), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_first_step_rolls_target() {
        let params = WanderParams::default();
        let mut motion = MotionState::new(Vec2::zeros(), Duration::ZERO, rng());

        motion.step(Duration::ZERO, &params);

        assert_eq!(motion.retargets(), 1);
        assert!(params.bounds.contains(&motion.target));
    }

    #[test]
    fn test_target_kept_until_dwell_expires() {
        let params = WanderParams {
            bounds: Bounds::centered(100.0, 100.0),
            ..Default::default()
        };
        let mut motion = MotionState::new(Vec2::zeros(), Duration::ZERO, rng());
        motion.step(Duration::ZERO, &params);
        let first_target = motion.target;
        // Far target: one 2% step can't reach it
        assert!(!reached(&motion.current, &first_target, params.tolerance));

        motion.step(Duration::from_secs(3), &params);
        assert_eq!(motion.target, first_target, "exactly dwell is not more than dwell");

        motion.step(Duration::from_millis(3001), &params);
        assert_eq!(motion.retargets(), 2);
        assert_eq!(motion.last_target_time, Duration::from_millis(3001));
    }

    #[test]
    fn test_target_rerolled_on_arrival() {
        let params = WanderParams {
            speed: 1.0,
            ..Default::default()
        };
        let mut motion = MotionState::new(Vec2::zeros(), Duration::ZERO, rng());

        // speed 1.0 lands on the target every step, so every step re-rolls
        motion.step(Duration::from_millis(16), &params);
        motion.step(Duration::from_millis(32), &params);
        motion.step(Duration::from_millis(48), &params);

        assert_eq!(motion.retargets(), 3);
        assert_eq!(motion.current, motion.target);
    }

    #[test]
    fn test_same_rng_same_trajectory() {
        let params = WanderParams::default();
        let mut a = MotionState::new(Vec2::zeros(), Duration::ZERO, rng());
        let mut b = MotionState::new(Vec2::zeros(), Duration::ZERO, rng());

        for i in 0..500u64 {
            let now = Duration::from_millis(i * 16);
            assert_eq!(a.step(now, &params), b.step(now, &params));
        }
    }

    proptest! {
        #[test]
        fn prop_interpolate_stays_between(
            cx in -100.0f64..100.0, cy in -100.0f64..100.0,
            tx in -100.0f64..100.0, ty in -100.0f64..100.0,
            speed in 0.001f64..0.999,
        ) {
            prop_assume!((cx - tx).abs() > 1e-6 && (cy - ty).abs() > 1e-6);
            let next = interpolate(&Vec2::new(cx, cy), &Vec2::new(tx, ty), speed);
            prop_assert!(next.x > cx.min(tx) && next.x < cx.max(tx));
            prop_assert!(next.y > cy.min(ty) && next.y < cy.max(ty));
        }

        #[test]
        fn prop_reached_matches_distance(
            cx in -10.0f64..10.0, cy in -10.0f64..10.0,
            tx in -10.0f64..10.0, ty in -10.0f64..10.0,
            tol in 0.0f64..5.0,
        ) {
            let d = ((tx - cx).powi(2) + (ty - cy).powi(2)).sqrt();
            prop_assume!((d - tol).abs() > 1e-9);
            prop_assert_eq!(reached(&Vec2::new(cx, cy), &Vec2::new(tx, ty), tol), d <= tol);
        }

        #[test]
        fn prop_wander_stays_in_bounds(seed in any::<u64>(), start_x in -4.0f64..4.0, start_y in -2.5f64..2.5) {
            let params = WanderParams::default();
            let mut motion = MotionState::new(Vec2::new(start_x, start_y), Duration::ZERO, StdRng::seed_from_u64(seed));
            for i in 0..300u64 {
                let pos = motion.step(Duration::from_millis(i * 16), &params);
                // Convex combination of in-bounds points stays in bounds
                prop_assert!(params.bounds.contains(&pos));
            }
        }
    }
}
