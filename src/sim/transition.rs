//! Phase controller and transition step runner
//!
//! Once the last target is gone the session flips into its terminal phase
//! and the level's transition script runs, one step at a time. Every step
//! measures its progress from the tick on which it became current.

use glam::Vec2;
use rand::Rng;

use super::level::StepSpec;
use super::state::{FlightSprite, Session, TransitionEffect};
use crate::elapsed_since;

/// Session lifecycle as seen by the render loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Targets remain; input and collisions are live
    Active,
    /// All targets cleared, transition script running
    Transition,
    /// Script finished; stop scheduling and fire the completion hook
    Done,
}

/// Cursor over the transition script
#[derive(Debug, Clone)]
pub struct StepRunner {
    steps: Vec<StepSpec>,
    index: usize,
    /// Tick time the current step became current
    anchor_ms: f64,
    /// Whether the current step's entry actions ran
    entered: bool,
}

impl StepRunner {
    pub fn new(steps: Vec<StepSpec>, now_ms: f64) -> Self {
        Self {
            steps,
            index: 0,
            anchor_ms: now_ms,
            entered: false,
        }
    }

    pub fn current(&self) -> Option<&StepSpec> {
        self.steps.get(self.index)
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.index >= self.steps.len()
    }

    /// Index of the current step (equals the step count once done)
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    fn next_step(&mut self, now_ms: f64) {
        self.index += 1;
        self.anchor_ms = now_ms;
        self.entered = false;
    }
}

/// Flip into the terminal phase if every target is gone
///
/// Safe to call from any removal path; only the first successful call starts
/// the script. Returns true on that first call.
pub fn check_clear(session: &mut Session, now_ms: f64) -> bool {
    if session.is_cleared() || !session.all_targets_cleared() {
        return false;
    }
    if !session.mark_cleared() {
        return false;
    }

    session.runner = Some(StepRunner::new(session.level.transition.clone(), now_ms));
    log::info!(
        "All {} targets cleared at {:.0}ms, running {} transition steps",
        session.targets.len(),
        now_ms,
        session.level.transition.len()
    );
    true
}

/// Run the transition script up to `now_ms`
///
/// Steps that complete on this tick hand over to the next one immediately,
/// so zero-length steps chain within a single tick.
pub fn advance(session: &mut Session, now_ms: f64) {
    let Some(mut runner) = session.runner.take() else {
        return;
    };

    let was_done = runner.is_done();
    while let Some(step) = runner.steps.get(runner.index) {
        let elapsed = elapsed_since(runner.anchor_ms, now_ms);
        let first = !runner.entered;
        if first {
            log::info!("Transition step {}: {}", runner.index, step_name(step));
        }
        if !run_step(session, step, first, elapsed) {
            runner.entered = true;
            break;
        }
        runner.next_step(now_ms);
    }

    if runner.is_done() && !was_done {
        log::info!("Transition finished at {:.0}ms", now_ms);
    }
    session.runner = Some(runner);
}

fn step_name(step: &StepSpec) -> &'static str {
    match step {
        StepSpec::HideEntities => "hide entities",
        StepSpec::Delay { .. } => "delay",
        StepSpec::Fade { .. } => "fade",
        StepSpec::Flight { .. } => "flight",
        StepSpec::Specials { .. } => "specials",
    }
}

/// Apply one step at `elapsed` ms into it. Returns true once it completed.
fn run_step(session: &mut Session, step: &StepSpec, first: bool, elapsed: f64) -> bool {
    match step {
        StepSpec::HideEntities => {
            for entity in &mut session.entities {
                entity.visible = false;
                entity.dragging = false;
            }
            session.drag = None;
            true
        }

        StepSpec::Delay { ms } => elapsed >= *ms,

        StepSpec::Fade { to, duration_ms } => {
            if first {
                session.next_background = Some(to.clone());
                session.blend = 1.0;
            }
            let t = if *duration_ms > 0.0 {
                (elapsed / duration_ms).min(1.0)
            } else {
                1.0
            };
            session.blend = (1.0 - t) as f32;
            if t < 1.0 {
                return false;
            }
            session.background = to.clone();
            session.next_background = None;
            session.blend = 0.0;
            true
        }

        StepSpec::Flight { flight } => {
            let pos = flight.position_at(elapsed);
            if pos.x > session.level.canvas.x {
                session.flight = None;
                return true;
            }
            session.flight = Some(FlightSprite {
                sprite: flight.sprite.clone(),
                pos,
                size: flight.size,
            });
            false
        }

        StepSpec::Specials {
            count,
            size,
            frame_prefix,
            total_frames,
            frame_ms,
            duration_ms,
        } => {
            if !session.effects_spawned {
                spawn_effects(session, *count, *size, frame_prefix, *total_frames);
            }
            let reached = ((elapsed / frame_ms).floor() as u32).min(*total_frames);
            for effect in &mut session.effects {
                effect.frame = effect.frame.max(reached);
                effect.done = effect.frame >= effect.total_frames;
            }
            elapsed >= *duration_ms
        }
    }
}

/// Scatter the decorative effects. Guarded so it runs once per session.
fn spawn_effects(session: &mut Session, count: usize, size: Vec2, frame_prefix: &str, total_frames: u32) {
    session.effects_spawned = true;
    let room = (session.level.canvas - size).max(Vec2::ZERO);
    for _ in 0..count {
        let pos = room * Vec2::new(session.rng.random::<f32>(), session.rng.random::<f32>());
        session.effects.push(TransitionEffect {
            pos,
            size,
            frame_prefix: frame_prefix.to_string(),
            frame: 0,
            total_frames,
            done: false,
        });
    }
    log::debug!("Spawned {} '{}' effects", count, frame_prefix);
}
