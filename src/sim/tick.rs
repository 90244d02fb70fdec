//! Per-tick simulation step
//!
//! A render tick is split around the draw pass: `advance` brings timed state
//! (animations, transition script) up to the tick time before drawing, and
//! `resolve` runs collision detection and the phase check after it.

use super::anim;
use super::collision::{self, Dispatch};
use super::state::Session;
use super::transition::{self, Phase};

/// Bring time-driven state up to `now_ms`. Call before drawing.
pub fn advance(session: &mut Session, now_ms: f64) {
    session.time_ms = now_ms;
    anim::advance(session, now_ms);
    transition::advance(session, now_ms);
}

/// Collisions and phase check. Call after drawing.
///
/// Returns the phase the render loop should act on: keep scheduling unless
/// it is `Done`.
pub fn resolve(session: &mut Session, now_ms: f64) -> Phase {
    let hits: Vec<Dispatch> = collision::detect(session, now_ms);
    if !hits.is_empty() {
        log::debug!("{} collision(s) resolved at {:.0}ms", hits.len(), now_ms);
    }
    transition::check_clear(session, now_ms);
    // A clear on this tick enters the first transition step right away
    transition::advance(session, now_ms);
    session.phase()
}
