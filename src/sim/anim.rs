//! Animation-lock state machine
//!
//! A qualifying "animated" collision locks the entity and plays a fixed
//! frame sequence on it. Frame advancement is derived from the elapsed time
//! since the episode's anchor tick, so it does not depend on how often the
//! host calls us. When the last frame is reached the entity unlocks and the
//! captured target is removed.

use super::level::AnimSpec;
use super::state::{ControlledEntity, EntityId, Session};
use super::transition;
use crate::elapsed_since;

/// Per-entity animation state
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AnimState {
    #[default]
    Idle,
    Playing {
        /// Frame cursor, `0..=anim.total_frames`
        frame: u32,
        /// Tick time the episode started
        anchor_ms: f64,
        /// Target removed when the episode ends
        target: EntityId,
        anim: AnimSpec,
    },
}

impl AnimState {
    #[inline]
    pub fn is_playing(&self) -> bool {
        matches!(self, AnimState::Playing { .. })
    }

    /// Frame cursor while playing
    pub fn cursor(&self) -> Option<u32> {
        match self {
            AnimState::Playing { frame, .. } => Some(*frame),
            AnimState::Idle => None,
        }
    }

    /// Image id of the frame to draw while playing
    pub fn frame_image(&self) -> Option<String> {
        match self {
            AnimState::Playing { frame, anim, .. } => Some(anim.frame_image(*frame)),
            AnimState::Idle => None,
        }
    }
}

/// Idle -> Playing. Returns false (and changes nothing) if the entity is already playing.
pub fn start(entity: &mut ControlledEntity, target: EntityId, anim: &AnimSpec, now_ms: f64) -> bool {
    if entity.anim.is_playing() {
        return false;
    }
    entity.locked = true;
    entity.dragging = false;
    entity.anim = AnimState::Playing {
        frame: 0,
        anchor_ms: now_ms,
        target,
        anim: anim.clone(),
    };
    log::debug!("Entity {} locked, playing '{}' for target {}", entity.id, anim.frame_prefix, target);
    true
}

/// Move the frame cursor to `now_ms`. Returns the captured target once the episode ends.
fn step(entity: &mut ControlledEntity, now_ms: f64) -> Option<EntityId> {
    let AnimState::Playing {
        frame,
        anchor_ms,
        target,
        anim,
    } = &mut entity.anim
    else {
        return None;
    };

    let elapsed = elapsed_since(*anchor_ms, now_ms);
    let reached = ((elapsed / anim.frame_ms).floor() as u32).min(anim.total_frames);
    *frame = (*frame).max(reached);

    if *frame < anim.total_frames {
        return None;
    }

    let target = *target;
    entity.anim = AnimState::Idle;
    entity.locked = false;
    log::debug!("Entity {} unlocked after {:.0}ms", entity.id, elapsed);
    Some(target)
}

/// Advance every playing entity and finalize the episodes that ended
///
/// Finalized targets are retired and the clear condition is re-checked.
/// Returns the number of targets removed this tick.
pub fn advance(session: &mut Session, now_ms: f64) -> usize {
    let finished: Vec<EntityId> = session
        .entities
        .iter_mut()
        .filter_map(|e| step(e, now_ms))
        .collect();

    let mut removed = 0;
    for target_id in finished {
        if session.target_mut(target_id).is_some_and(|t| t.retire()) {
            removed += 1;
            transition::check_clear(session, now_ms);
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::LevelSpec;
    use crate::sim::state::create_session;
    use proptest::prelude::*;

    fn spec(total_frames: u32, frame_ms: f64) -> AnimSpec {
        AnimSpec {
            frame_prefix: "f".into(),
            total_frames,
            frame_ms,
        }
    }

    #[test]
    fn test_start_locks_once() {
        let mut session = create_session(LevelSpec::comic(), 1).unwrap();
        let entity = &mut session.entities[0];
        entity.dragging = true;

        assert!(start(entity, 4, &spec(10, 100.0), 500.0));
        assert!(entity.locked);
        assert!(!entity.dragging);
        assert_eq!(entity.anim.cursor(), Some(0));

        // A second trigger while playing is ignored, not queued
        assert!(!start(entity, 5, &spec(10, 100.0), 600.0));
        match &entity.anim {
            AnimState::Playing { target, anchor_ms, .. } => {
                assert_eq!(*target, 4);
                assert_eq!(*anchor_ms, 500.0);
            }
            AnimState::Idle => panic!("should still be playing"),
        }
    }

    #[test]
    fn test_cadence_follows_elapsed_time() {
        let mut session = create_session(LevelSpec::comic(), 1).unwrap();
        let entity = &mut session.entities[0];
        start(entity, 4, &spec(10, 100.0), 1000.0);

        assert_eq!(step(entity, 1099.0), None);
        assert_eq!(entity.anim.cursor(), Some(0));

        // A long gap between calls jumps straight to the right frame
        assert_eq!(step(entity, 1450.0), None);
        assert_eq!(entity.anim.cursor(), Some(4));

        assert_eq!(step(entity, 2000.0), Some(4));
        assert!(!entity.locked);
        assert_eq!(entity.anim, AnimState::Idle);
    }

    #[test]
    fn test_clock_going_backwards_keeps_cursor() {
        let mut session = create_session(LevelSpec::comic(), 1).unwrap();
        let entity = &mut session.entities[0];
        start(entity, 4, &spec(10, 100.0), 0.0);
        step(entity, 550.0);
        step(entity, 200.0);
        assert_eq!(entity.anim.cursor(), Some(5));
    }

    #[test]
    fn test_advance_finalizes_target() {
        let mut session = create_session(LevelSpec::comic(), 1).unwrap();
        let target_id = session.targets[0].id;
        session.targets[0].mark_dispatched();
        start(&mut session.entities[0], target_id, &spec(10, 100.0), 0.0);

        assert_eq!(advance(&mut session, 999.0), 0);
        assert!(session.target(target_id).unwrap().is_alive());

        assert_eq!(advance(&mut session, 1000.0), 1);
        assert!(!session.target(target_id).unwrap().is_alive());
        assert!(!session.entities[0].locked);
        assert_eq!(session.alive_count(), 8);
    }

    proptest! {
        #[test]
        fn prop_cursor_monotonic(mut times in prop::collection::vec(0.0f64..2000.0, 1..40)) {
            times.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let mut session = create_session(LevelSpec::comic(), 1).unwrap();
            let entity = &mut session.entities[0];
            start(entity, 4, &spec(10, 100.0), 0.0);

            let mut last = 0;
            for t in times {
                if step(entity, t).is_some() {
                    break;
                }
                let cursor = entity.anim.cursor().unwrap();
                prop_assert!(cursor >= last);
                prop_assert!(cursor <= 10);
                last = cursor;
            }
        }
    }
}
