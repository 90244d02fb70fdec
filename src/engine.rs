//! Render loop driver
//!
//! The engine owns at most one session at a time. The host calls `frame`
//! once per animation frame with the token it got from `start`; a token from
//! an earlier (finished or discarded) session is rejected without touching
//! anything. When the transition script ends the session is dropped and the
//! completion hook runs exactly once.

use crate::renderer::{Surface, draw_frame};
use crate::sim::{LevelError, LevelSpec, Phase, PointerEvent, Session, create_session, input, tick};

/// Identifies one started session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

/// What the host should do after a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Token does not belong to the running session; stop this loop
    Stale,
    /// Schedule the next frame
    Continue,
    /// Session finished and the completion hook ran; stop scheduling
    Finished,
}

type CompletionHook = Box<dyn FnOnce()>;

#[derive(Default)]
pub struct Engine {
    session: Option<Session>,
    generation: u64,
    on_complete: Option<CompletionHook>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `level`
    ///
    /// The level is validated and the session built before anything else
    /// changes; on error the engine keeps its previous state. A running
    /// session is discarded without firing its hook.
    pub fn start(
        &mut self,
        level: LevelSpec,
        seed: u64,
        on_complete: impl FnOnce() + 'static,
    ) -> Result<SessionToken, LevelError> {
        let session = create_session(level, seed)?;
        if self.session.is_some() {
            log::warn!("Starting a new session over a running one");
        }

        self.generation += 1;
        self.session = Some(session);
        self.on_complete = Some(Box::new(on_complete));
        Ok(SessionToken(self.generation))
    }

    /// Whether `token` belongs to the running session
    pub fn is_current(&self, token: SessionToken) -> bool {
        self.session.is_some() && token.0 == self.generation
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> Option<Phase> {
        self.session.as_ref().map(Session::phase)
    }

    /// Feed one pointer event. No session or no hit is a silent no-op.
    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        match self.session.as_mut() {
            Some(session) => input::handle(session, event),
            None => false,
        }
    }

    /// Run one render tick at `now_ms`
    pub fn frame(&mut self, token: SessionToken, now_ms: f64, surface: &mut impl Surface) -> FrameOutcome {
        if !self.is_current(token) {
            log::warn!("Ignoring frame for stale session {:?}", token);
            return FrameOutcome::Stale;
        }
        let Some(session) = self.session.as_mut() else {
            return FrameOutcome::Stale;
        };

        tick::advance(session, now_ms);
        draw_frame(session, surface);
        if tick::resolve(session, now_ms) != Phase::Done {
            return FrameOutcome::Continue;
        }

        self.finish(now_ms);
        FrameOutcome::Finished
    }

    /// Discard the running session without firing its hook
    pub fn reset(&mut self) {
        if self.session.take().is_some() {
            log::info!("Session {} discarded", self.generation);
        }
        self.on_complete = None;
        self.generation += 1;
    }

    fn finish(&mut self, now_ms: f64) {
        self.session = None;
        self.generation += 1;
        log::info!("Session finished at {:.0}ms", now_ms);
        if let Some(hook) = self.on_complete.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("session", &self.session.as_ref().map(|s| s.level.name.as_str()))
            .field("generation", &self.generation)
            .field("has_hook", &self.on_complete.is_some())
            .finish()
    }
}
