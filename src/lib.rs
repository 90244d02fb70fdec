//! Comic mini-game - drag-and-collide canvas game embedded in a comic
//!
//! Core modules:
//! - `sim`: Deterministic game logic (entities, drag, collisions, animation locks, transition)
//! - `renderer`: Draw command stream and the Canvas2D surface
//! - `engine`: Per-frame driver that owns the session and the completion hook

pub mod engine;
pub mod renderer;
pub mod sim;

pub use engine::{Engine, FrameOutcome, SessionToken};
pub use sim::{LevelError, LevelSpec};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Logical drawing surface size
    pub const GAME_WIDTH: f32 = 640.0;
    pub const GAME_HEIGHT: f32 = 1008.0;

    /// Default animation cadence (ms per frame)
    pub const DEFAULT_FRAME_MS: f64 = 100.0;
    /// Default background cross-fade duration
    pub const DEFAULT_FADE_MS: f64 = 500.0;

    /// Random target placement keeps this far away from entity start boxes
    pub const EXCLUSION_MARGIN: f32 = 40.0;
    /// Rejection sampling attempts before accepting a placement anyway
    pub const MAX_PLACEMENT_ATTEMPTS: u32 = 32;

    /// Upper bound on targets per level (all groups together)
    pub const MAX_TARGETS: usize = 256;
    /// Upper bound on decorative effects spawned by a transition
    pub const MAX_EFFECTS: usize = 64;
}

/// Canvas extent as a vector
#[inline]
pub fn canvas_size() -> Vec2 {
    Vec2::new(consts::GAME_WIDTH, consts::GAME_HEIGHT)
}

/// Elapsed milliseconds since an anchor, never negative
#[inline]
pub fn elapsed_since(anchor_ms: f64, now_ms: f64) -> f64 {
    (now_ms - anchor_ms).max(0.0)
}
