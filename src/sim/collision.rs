//! Collision detection and dispatch
//!
//! Every tick outside the terminal phase, each free entity is tested against
//! the live overlap pool. A hit only counts when the pairing table has an
//! entry for the two kinds; the resolution then either locks the entity into
//! an animation or removes the target on the spot.

use super::anim;
use super::input;
use super::level::Resolution;
use super::state::{EntityId, Session};
use super::transition;

/// A collision that was accepted and resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Entity locked; target leaves the pool now, dies when the animation ends
    Animated { entity: EntityId, target: EntityId },
    /// Target removed immediately
    Instant { entity: EntityId, target: EntityId },
}

impl Dispatch {
    pub fn target(&self) -> EntityId {
        match *self {
            Dispatch::Animated { target, .. } | Dispatch::Instant { target, .. } => target,
        }
    }
}

/// Resolve one overlapping entity/target pair
///
/// Returns `None` without touching anything when the target was already
/// claimed, the entity is locked or hidden, or the kinds are not paired.
pub fn dispatch(session: &mut Session, entity_id: EntityId, target_id: EntityId, now_ms: f64) -> Option<Dispatch> {
    let entity = session.entity(entity_id)?;
    let target = session.target(target_id)?;
    if !entity.can_collide() || !target.in_overlap_pool() {
        return None;
    }
    let resolution = session.level.pairing(entity.kind, target.kind)?.clone();

    match resolution {
        Resolution::Animated { anim } => {
            let entity = session.entity_mut(entity_id)?;
            if !anim::start(entity, target_id, &anim, now_ms) {
                return None;
            }
            session.target_mut(target_id)?.mark_dispatched();
            input::cancel_drag_for(session, entity_id);
            log::debug!("Entity {} hit target {}: animated", entity_id, target_id);
            Some(Dispatch::Animated {
                entity: entity_id,
                target: target_id,
            })
        }
        Resolution::Instant => {
            let target = session.target_mut(target_id)?;
            target.mark_dispatched();
            target.retire();
            log::debug!("Entity {} hit target {}: removed", entity_id, target_id);
            transition::check_clear(session, now_ms);
            Some(Dispatch::Instant {
                entity: entity_id,
                target: target_id,
            })
        }
    }
}

/// Test all free entities against the overlap pool and resolve the hits
///
/// Entities are visited in store order. Once an entity is locked by an
/// animated hit, its remaining overlaps this tick are ignored and those
/// targets stay in the pool.
pub fn detect(session: &mut Session, now_ms: f64) -> Vec<Dispatch> {
    let mut hits = Vec::new();
    if session.is_cleared() {
        return hits;
    }

    for ei in 0..session.entities.len() {
        for ti in 0..session.targets.len() {
            let entity = &session.entities[ei];
            if !entity.can_collide() {
                break;
            }
            let target = &session.targets[ti];
            if !target.in_overlap_pool() || !entity.bounds.overlaps(entity.pos, &target.bounds, target.pos) {
                continue;
            }

            let (entity_id, target_id) = (entity.id, target.id);
            if let Some(hit) = dispatch(session, entity_id, target_id, now_ms) {
                hits.push(hit);
            }
            if session.is_cleared() {
                return hits;
            }
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::LevelSpec;
    use crate::sim::state::create_session;
    use glam::Vec2;

    fn comic() -> Session {
        create_session(LevelSpec::comic(), 21).unwrap()
    }

    /// Park every target far from the entity row, then drop the first few on `at`
    fn place_targets(session: &mut Session, kind: u32, count: usize, at: Vec2) -> Vec<EntityId> {
        for t in &mut session.targets {
            t.pos = Vec2::new(0.0, 0.0);
        }
        session
            .targets
            .iter_mut()
            .filter(|t| t.kind == kind)
            .take(count)
            .map(|t| {
                t.pos = at;
                t.id
            })
            .collect()
    }

    #[test]
    fn test_animated_hit_defers_removal() {
        let mut session = comic();
        let at = session.entities[0].pos + Vec2::new(10.0, 10.0);
        let ids = place_targets(&mut session, 1, 1, at);

        let hits = detect(&mut session, 100.0);
        assert_eq!(hits, vec![Dispatch::Animated { entity: 1, target: ids[0] }]);

        let target = session.target(ids[0]).unwrap();
        assert!(target.is_alive());
        assert!(!target.in_overlap_pool());
        assert!(session.entities[0].locked);

        // Overlap persists next tick but nothing is re-dispatched
        assert!(detect(&mut session, 116.0).is_empty());
    }

    #[test]
    fn test_instant_hit_removes_target() {
        let mut session = comic();
        let at = session.entities[1].pos + Vec2::new(5.0, 5.0);
        let ids = place_targets(&mut session, 2, 1, at);

        let hits = detect(&mut session, 0.0);
        assert_eq!(hits, vec![Dispatch::Instant { entity: 2, target: ids[0] }]);
        assert!(!session.target(ids[0]).unwrap().is_alive());
        assert!(!session.entities[1].locked);
        assert_eq!(session.alive_count(), 8);
    }

    #[test]
    fn test_unpaired_overlap_is_ignored() {
        let mut session = comic();
        // Kind 3 enemy on top of figure 1
        let at = session.entities[0].pos;
        let ids = place_targets(&mut session, 3, 1, at);

        assert!(detect(&mut session, 0.0).is_empty());
        assert!(session.target(ids[0]).unwrap().in_overlap_pool());
    }

    #[test]
    fn test_two_overlaps_same_tick_start_one_episode() {
        let mut session = comic();
        let at = session.entities[0].pos + Vec2::new(10.0, 10.0);
        let ids = place_targets(&mut session, 1, 2, at);

        let hits = detect(&mut session, 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].target(), ids[0]);
        // The second target stays claimable for later
        assert!(session.target(ids[1]).unwrap().in_overlap_pool());
    }

    #[test]
    fn test_dispatch_guards() {
        let mut session = comic();
        let target_id = session.targets[0].id;

        // Hidden entity
        session.entities[0].visible = false;
        assert_eq!(dispatch(&mut session, 1, target_id, 0.0), None);
        session.entities[0].visible = true;

        // Already claimed target
        session.targets[0].mark_dispatched();
        assert_eq!(dispatch(&mut session, 1, target_id, 0.0), None);
        assert!(!session.entities[0].locked);

        // Unknown ids
        assert_eq!(dispatch(&mut session, 99, target_id, 0.0), None);
    }

    #[test]
    fn test_animated_hit_cancels_drag() {
        let mut session = comic();
        let grab = session.entities[0].pos + Vec2::new(1.0, 1.0);
        input::press(&mut session, grab);
        let at = session.entities[0].pos;
        place_targets(&mut session, 1, 1, at);

        detect(&mut session, 0.0);
        assert!(session.drag.is_none());
        assert!(!session.entities[0].dragging);
    }

    #[test]
    fn test_no_detection_after_clear() {
        let mut session = comic();
        let at = session.entities[1].pos;
        place_targets(&mut session, 2, 1, at);
        session.mark_cleared();
        assert!(detect(&mut session, 0.0).is_empty());
    }
}
