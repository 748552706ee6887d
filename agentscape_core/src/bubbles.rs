//! Message Bubble Queue - transient, timed annotations between agents.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──► Visible ──(elapsed ≥ duration - fade)──► FadingOut ──(elapsed ≥ duration)──► Removed
//! ```
//!
//! Bubbles are immutable once queued. Opacity and scale are recomputed from
//! the bubble's age whenever they are read.
//!
//! # Expiry
//!
//! Two independent paths remove a bubble:
//! - [`MessageQueue::complete_elapsed`]: per-bubble completion, fires the
//!   completion callback once for every bubble whose age reached its duration
//! - [`MessageQueue::cleanup`]: periodic sweep dropping anything strictly
//!   older than its duration, no callback
//!
//! Either one alone is enough; running both is harmless since whichever
//! runs second finds nothing left to do.

use crate::motion::Vec2;
use agentscape_env::{AgentId, AgentState};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Lifetime of a bubble when none (or zero) is given.
pub const DEFAULT_BUBBLE_DURATION: Duration = Duration::from_millis(3000);

/// Length of the fade-out at the end of a bubble's life.
pub const FADE_WINDOW: Duration = Duration::from_millis(500);

/// Interval between scale-in animation steps.
pub const SCALE_TICK: Duration = Duration::from_millis(16);

/// Progress added per scale-in step.
pub const SCALE_STEP: f64 = 0.1;

/// Cadence of the periodic sweep.
pub const CLEANUP_INTERVAL: Duration = Duration::from_millis(1000);

/// Maximum label width (ellipsis included) inside a bubble.
pub const BUBBLE_LABEL_MAX: usize = 30;

/// Height of a bubble above the midpoint of its two agents.
pub const BUBBLE_RISE: f64 = 0.8;

pub const ELLIPSIS: &str = "...";

/// Returns `text` unchanged if it has at most `max_len` characters,
/// otherwise its first `max_len` characters followed by `...`.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_len).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Like [`truncate`], but the result including the ellipsis fits in
/// `max_len` characters.
pub fn truncate_to_fit(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_len.saturating_sub(ELLIPSIS.len())).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Only communicating agents get speech bubbles.
pub fn should_show_bubble(state: &AgentState) -> bool {
    state.is_communicating()
}

/// Ease-out-back curve: `1 + c3·(x-1)³ + c1·(x-1)²`.
pub fn ease_out_back(x: f64) -> f64 {
    const C1: f64 = 1.70158;
    const C3: f64 = C1 + 1.0;
    1.0 + C3 * (x - 1.0).powi(3) + C1 * (x - 1.0).powi(2)
}

/// Scale after `steps` scale-in steps.
///
/// Starts at 0, follows [`ease_out_back`] sampled every [`SCALE_STEP`],
/// and settles at exactly 1 once progress reaches 1.
pub fn scale_at(steps: u64) -> f64 {
    if steps == 0 {
        return 0.0;
    }
    let progress = steps as f64 * SCALE_STEP;
    if progress >= 1.0 {
        1.0
    } else {
        ease_out_back(progress)
    }
}

/// Opacity at `elapsed` for a bubble living `duration` with a final fade
/// of `fade_window`.
pub fn fade_opacity(elapsed: Duration, duration: Duration, fade_window: Duration) -> f64 {
    if elapsed >= duration {
        return 0.0;
    }
    // The fade may start before creation when the bubble is shorter than
    // the window, so a short bubble is already partly faded at birth.
    let window = fade_window.as_secs_f64();
    let fade_start = duration.as_secs_f64() - window;
    let elapsed = elapsed.as_secs_f64();
    if elapsed < fade_start || window <= 0.0 {
        return 1.0;
    }
    let progress = (elapsed - fade_start) / window;
    (1.0 - progress).clamp(0.0, 1.0)
}

/// Opaque bubble identifier, assigned from a monotonic counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BubbleId(u64);

impl std::fmt::Display for BubbleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Where a bubble is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubblePhase {
    Visible,
    FadingOut,
    Expired,
}

/// A queued message between two agents.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBubble {
    pub id: BubbleId,
    pub from: AgentId,
    pub to: AgentId,

    /// Full text; truncation only happens when rendering
    pub message: String,

    /// Clock time the bubble was queued
    pub timestamp: Duration,

    /// Total lifetime
    pub duration: Duration,
}

impl MessageBubble {
    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.timestamp)
    }

    /// Reached its duration; due for completion.
    pub fn is_expired(&self, now: Duration) -> bool {
        self.elapsed(now) >= self.duration
    }

    /// Strictly past its duration; due for the sweep.
    pub fn is_stale(&self, now: Duration) -> bool {
        self.elapsed(now) > self.duration
    }

    pub fn phase(&self, now: Duration, fade_window: Duration) -> BubblePhase {
        let elapsed = self.elapsed(now);
        if elapsed >= self.duration {
            BubblePhase::Expired
        } else if elapsed >= self.duration.saturating_sub(fade_window) {
            BubblePhase::FadingOut
        } else {
            BubblePhase::Visible
        }
    }

    pub fn opacity(&self, now: Duration, fade_window: Duration) -> f64 {
        fade_opacity(self.elapsed(now), self.duration, fade_window)
    }

    pub fn scale(&self, now: Duration, scale_tick: Duration) -> f64 {
        let tick = scale_tick.as_nanos().max(1);
        let steps = self.elapsed(now).as_nanos() / tick;
        scale_at(u64::try_from(steps).unwrap_or(u64::MAX))
    }

    /// Text shown inside the bubble.
    pub fn label(&self) -> String {
        truncate_to_fit(&self.message, BUBBLE_LABEL_MAX)
    }

    /// Recipient line under the label.
    pub fn caption(&self) -> String {
        format!("→ Agent {}", self.to)
    }

    /// Midpoint of both agents raised by [`BUBBLE_RISE`]; `None` if either
    /// agent has no position.
    pub fn anchor(&self, positions: &HashMap<AgentId, Vec2>) -> Option<Vec2> {
        let from = positions.get(&self.from)?;
        let to = positions.get(&self.to)?;
        let mut mid = (from + to) * 0.5;
        mid.y += BUBBLE_RISE;
        Some(mid)
    }
}

/// Render-ready view of a bubble at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleView {
    pub id: BubbleId,
    pub from: AgentId,
    pub to: AgentId,
    pub label: String,
    pub caption: String,
    pub anchor: [f64; 2],
    pub opacity: f64,
    pub scale: f64,
    pub phase: BubblePhase,
}

/// Canned communication intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommunicationKind {
    Collaborate,
    Share,
    Request,
    Complete,
}

impl CommunicationKind {
    pub fn name(&self) -> &'static str {
        match self {
            CommunicationKind::Collaborate => "collaborate",
            CommunicationKind::Share => "share",
            CommunicationKind::Request => "request",
            CommunicationKind::Complete => "complete",
        }
    }

    /// Default bubble text for this intent.
    pub fn message(&self, from: AgentId, to: AgentId) -> String {
        match self {
            CommunicationKind::Collaborate => {
                format!("Agent {} wants to collaborate with Agent {}", from, to)
            }
            CommunicationKind::Share => format!("Agent {} has information to share", from),
            CommunicationKind::Request => {
                format!("Agent {} requests assistance from Agent {}", from, to)
            }
            CommunicationKind::Complete => format!("Agent {} completed a task", from),
        }
    }
}

impl std::str::FromStr for CommunicationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "collaborate" => Ok(CommunicationKind::Collaborate),
            "share" => Ok(CommunicationKind::Share),
            "request" => Ok(CommunicationKind::Request),
            "complete" => Ok(CommunicationKind::Complete),
            _ => Err(format!("Unknown communication kind: {}", s)),
        }
    }
}

/// Builds bubble text for an action.
///
/// An explicit `context` wins (`"{from}: {context}"`); otherwise the
/// action's template is used, and unknown actions read `"{from} is active"`.
pub fn communication_message(from: AgentId, to: AgentId, action: &str, context: Option<&str>) -> String {
    if let Some(context) = context {
        return format!("{}: {}", from, context);
    }
    match action.parse::<CommunicationKind>() {
        Ok(kind) => kind.message(from, to),
        Err(_) => format!("{} is active", from),
    }
}

/// Timing knobs for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BubbleTiming {
    pub default_duration: Duration,
    pub fade_window: Duration,
    pub scale_tick: Duration,
}

impl Default for BubbleTiming {
    fn default() -> Self {
        Self {
            default_duration: DEFAULT_BUBBLE_DURATION,
            fade_window: FADE_WINDOW,
            scale_tick: SCALE_TICK,
        }
    }
}

/// In-memory store of live bubbles, keyed and iterated in id order.
#[derive(Debug, Default)]
pub struct MessageQueue {
    bubbles: BTreeMap<BubbleId, MessageBubble>,
    next_id: u64,
    timing: BubbleTiming,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timing(timing: BubbleTiming) -> Self {
        Self {
            timing,
            ..Self::default()
        }
    }

    pub fn timing(&self) -> &BubbleTiming {
        &self.timing
    }

    /// Queues a bubble created at `now` and returns its id.
    ///
    /// A missing or zero `duration` uses the queue's default.
    pub fn add(
        &mut self,
        from: AgentId,
        to: AgentId,
        message: impl Into<String>,
        duration: Option<Duration>,
        now: Duration,
    ) -> BubbleId {
        let id = BubbleId(self.next_id);
        self.next_id += 1;

        let duration = duration
            .filter(|d| !d.is_zero())
            .unwrap_or(self.timing.default_duration);
        self.bubbles.insert(
            id,
            MessageBubble {
                id,
                from,
                to,
                message: message.into(),
                timestamp: now,
                duration,
            },
        );
        id
    }

    /// Queues a templated communication bubble with the default duration.
    pub fn announce(
        &mut self,
        from: AgentId,
        to: AgentId,
        action: &str,
        context: Option<&str>,
        now: Duration,
    ) -> BubbleId {
        let text = communication_message(from, to, action, context);
        self.add(from, to, text, None, now)
    }

    /// Removes a bubble. Absent ids are a no-op.
    pub fn remove(&mut self, id: BubbleId) -> Option<MessageBubble> {
        self.bubbles.remove(&id)
    }

    /// Drops every bubble without firing completions.
    pub fn clear(&mut self) {
        self.bubbles.clear();
    }

    pub fn get(&self, id: BubbleId) -> Option<&MessageBubble> {
        self.bubbles.get(&id)
    }

    /// Snapshot of all live bubbles in id order.
    pub fn list_all(&self) -> Vec<MessageBubble> {
        self.bubbles.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    /// Completes every bubble whose age reached its duration: each one is
    /// removed and handed to `on_complete` exactly once.
    pub fn complete_elapsed<F>(&mut self, now: Duration, mut on_complete: F) -> usize
    where
        F: FnMut(&MessageBubble),
    {
        let done: Vec<BubbleId> = self
            .bubbles
            .values()
            .filter(|b| b.is_expired(now))
            .map(|b| b.id)
            .collect();
        for id in &done {
            if let Some(bubble) = self.bubbles.remove(id) {
                on_complete(&bubble);
            }
        }
        done.len()
    }

    /// Sweep: removes bubbles strictly older than their own duration.
    ///
    /// Returns the removed ids.
    pub fn cleanup(&mut self, now: Duration) -> Vec<BubbleId> {
        let stale: Vec<BubbleId> = self
            .bubbles
            .values()
            .filter(|b| b.is_stale(now))
            .map(|b| b.id)
            .collect();
        for id in &stale {
            self.bubbles.remove(id);
        }
        stale
    }

    /// Drops bubbles whose endpoints no longer resolve to a position.
    pub fn retain_resolvable(&mut self, positions: &HashMap<AgentId, Vec2>) -> Vec<BubbleId> {
        let orphaned: Vec<BubbleId> = self
            .bubbles
            .values()
            .filter(|b| b.anchor(positions).is_none())
            .map(|b| b.id)
            .collect();
        for id in &orphaned {
            self.bubbles.remove(id);
        }
        orphaned
    }

    /// Render views for every bubble whose endpoints resolve.
    pub fn views(&self, now: Duration, positions: &HashMap<AgentId, Vec2>) -> Vec<BubbleView> {
        self.bubbles
            .values()
            .filter_map(|b| {
                let anchor = b.anchor(positions)?;
                Some(BubbleView {
                    id: b.id,
                    from: b.from,
                    to: b.to,
                    label: b.label(),
                    caption: b.caption(),
                    anchor: [anchor.x, anchor.y],
                    opacity: b.opacity(now, self.timing.fade_window),
                    scale: b.scale(now, self.timing.scale_tick),
                    phase: b.phase(now, self.timing.fade_window),
                })
            })
            .collect()
    }
}
