//! Session state and entity store
//!
//! A `Session` is the single owner of everything that changes while the
//! mini-game runs. It is built once from a validated level and dropped when
//! the game hands control back to the comic.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::anim::AnimState;
use super::input::DragGrab;
use super::level::{EntitySpec, LevelError, LevelSpec, Placement, TargetGroup};
use super::shape::{Bounds, Visual};
use super::transition::{Phase, StepRunner};
use crate::consts::MAX_PLACEMENT_ATTEMPTS;

/// Entity/target identifier, unique within a session
pub type EntityId = u32;

/// A player-controlled figure
#[derive(Debug, Clone)]
pub struct ControlledEntity {
    pub id: EntityId,
    pub kind: u32,
    /// Anchor (top-left for boxes, center for circles)
    pub pos: Vec2,
    pub bounds: Bounds,
    pub visual: Visual,
    /// Set while an animation owns the entity
    pub locked: bool,
    pub visible: bool,
    /// Set while a pointer drag holds the entity
    pub dragging: bool,
    pub anim: AnimState,
}

impl ControlledEntity {
    fn from_spec(id: EntityId, spec: &EntitySpec) -> Self {
        Self {
            id,
            kind: spec.kind,
            pos: spec.pos,
            bounds: spec.bounds,
            visual: spec.visual.clone(),
            locked: false,
            visible: true,
            dragging: false,
            anim: AnimState::Idle,
        }
    }

    /// Whether a press may start dragging this entity
    #[inline]
    pub fn can_grab(&self) -> bool {
        !self.locked && self.visible
    }

    /// Whether this entity takes part in collision detection
    #[inline]
    pub fn can_collide(&self) -> bool {
        !self.locked && self.visible
    }
}

/// A removable object
#[derive(Debug, Clone)]
pub struct Target {
    pub id: EntityId,
    pub kind: u32,
    pub pos: Vec2,
    pub bounds: Bounds,
    pub visual: Visual,
    alive: bool,
    dispatched: bool,
}

impl Target {
    pub fn new(id: EntityId, kind: u32, pos: Vec2, bounds: Bounds, visual: Visual) -> Self {
        Self {
            id,
            kind,
            pos,
            bounds,
            visual,
            alive: true,
            dispatched: false,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// A collision has already been resolved (or is being resolved) for this target
    #[inline]
    pub fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    /// Alive and not claimed by any collision yet
    #[inline]
    pub fn in_overlap_pool(&self) -> bool {
        self.alive && !self.dispatched
    }

    /// Claim the target for one collision resolution. Returns false if it was already claimed.
    pub fn mark_dispatched(&mut self) -> bool {
        if self.dispatched {
            return false;
        }
        self.dispatched = true;
        true
    }

    /// Remove the target. Returns false if it was already gone.
    pub fn retire(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.dispatched = true;
        true
    }
}

/// Decorative frame animation spawned once all targets are gone
#[derive(Debug, Clone)]
pub struct TransitionEffect {
    pub pos: Vec2,
    pub size: Vec2,
    pub frame_prefix: String,
    pub frame: u32,
    pub total_frames: u32,
    pub done: bool,
}

impl TransitionEffect {
    /// Image id for the current frame
    pub fn frame_image(&self) -> String {
        format!("{}{}", self.frame_prefix, self.frame + 1)
    }
}

/// Sprite currently crossing the surface during a flight step
#[derive(Debug, Clone)]
pub struct FlightSprite {
    pub sprite: String,
    pub pos: Vec2,
    pub size: Vec2,
}

/// The whole mutable game context for one play-through
#[derive(Debug)]
pub struct Session {
    pub level: LevelSpec,
    pub entities: Vec<ControlledEntity>,
    pub targets: Vec<Target>,
    pub effects: Vec<TransitionEffect>,
    /// Background drawn at full strength (or at `blend` during a fade)
    pub background: String,
    /// Background being faded in, drawn at `1 - blend`
    pub next_background: Option<String>,
    /// Cross-fade factor, 1.0 = old background only
    pub blend: f32,
    pub flight: Option<FlightSprite>,
    pub drag: Option<DragGrab>,
    /// Tick time of the latest frame
    pub time_ms: f64,
    pub(crate) runner: Option<StepRunner>,
    pub(crate) effects_spawned: bool,
    pub(crate) rng: Pcg32,
    cleared: bool,
}

/// Build a session from a level definition
///
/// The level is validated first; on error nothing is created.
pub fn create_session(level: LevelSpec, seed: u64) -> Result<Session, LevelError> {
    level.validate()?;

    let mut rng = Pcg32::seed_from_u64(seed);
    let mut next_id: EntityId = 1;

    let entities: Vec<ControlledEntity> = level
        .entities
        .iter()
        .map(|spec| {
            let id = next_id;
            next_id += 1;
            let mut entity = ControlledEntity::from_spec(id, spec);
            entity.pos = entity.bounds.clamp_anchor(entity.pos, level.canvas);
            entity
        })
        .collect();

    let mut targets = Vec::with_capacity(level.target_count());
    for group in &level.targets {
        for i in 0..group.count {
            let pos = place_target(group, i, &entities, level.exclusion_margin, &mut rng);
            targets.push(Target::new(next_id, group.kind, pos, group.bounds, group.visual.clone()));
            next_id += 1;
        }
    }

    log::info!(
        "Session '{}' created: {} entities, {} targets (seed {})",
        level.name,
        entities.len(),
        targets.len(),
        seed
    );

    Ok(Session {
        background: level.background.clone(),
        level,
        entities,
        targets,
        effects: Vec::new(),
        next_background: None,
        blend: 1.0,
        flight: None,
        drag: None,
        time_ms: 0.0,
        runner: None,
        effects_spawned: false,
        rng,
        cleared: false,
    })
}

/// Anchor for the `index`-th target of a group
fn place_target(
    group: &TargetGroup,
    index: usize,
    entities: &[ControlledEntity],
    margin: f32,
    rng: &mut Pcg32,
) -> Vec2 {
    match &group.placement {
        Placement::Fixed { positions } => positions[index],
        Placement::Random { min, max } => {
            let mut pos = *min;
            for attempt in 0..MAX_PLACEMENT_ATTEMPTS {
                pos = *min + (*max - *min) * Vec2::new(rng.random::<f32>(), rng.random::<f32>());
                if !near_any_entity(&group.bounds, pos, entities, margin) {
                    return pos;
                }
                log::debug!("Target kind {} placement attempt {} too close to an entity", group.kind, attempt);
            }
            pos
        }
    }
}

/// Bounding boxes closer than `margin` on both axes
fn near_any_entity(bounds: &Bounds, pos: Vec2, entities: &[ControlledEntity], margin: f32) -> bool {
    let a_min = bounds.min_corner(pos) - Vec2::splat(margin);
    let a_max = bounds.min_corner(pos) + bounds.size() + Vec2::splat(margin);
    entities.iter().any(|e| {
        let b_min = e.bounds.min_corner(e.pos);
        let b_max = b_min + e.bounds.size();
        a_min.x < b_max.x && b_min.x < a_max.x && a_min.y < b_max.y && b_min.y < a_max.y
    })
}

impl Session {
    /// Terminal-phase flag (monotonic)
    #[inline]
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Flip into the terminal phase. Returns false if already cleared.
    pub(crate) fn mark_cleared(&mut self) -> bool {
        if self.cleared {
            return false;
        }
        self.cleared = true;
        true
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        if !self.cleared {
            Phase::Active
        } else if self.runner.as_ref().is_some_and(|r| r.is_done()) {
            Phase::Done
        } else {
            Phase::Transition
        }
    }

    /// Transition script progress, once the terminal phase started
    pub fn runner(&self) -> Option<&StepRunner> {
        self.runner.as_ref()
    }

    pub fn entity(&self, id: EntityId) -> Option<&ControlledEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut ControlledEntity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn target(&self, id: EntityId) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    pub fn target_mut(&mut self, id: EntityId) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.id == id)
    }

    /// Number of targets still alive
    pub fn alive_count(&self) -> usize {
        self.targets.iter().filter(|t| t.is_alive()).count()
    }

    pub fn all_targets_cleared(&self) -> bool {
        self.targets.iter().all(|t| !t.is_alive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::{LevelSpec, Placement};

    #[test]
    fn test_create_comic_session() {
        let session = create_session(LevelSpec::comic(), 7).unwrap();
        assert_eq!(session.entities.len(), 3);
        assert_eq!(session.targets.len(), 9);
        assert_eq!(session.alive_count(), 9);
        assert!(!session.is_cleared());
        assert_eq!(session.phase(), Phase::Active);
        assert_eq!(session.background, "bg-initial");
        assert_eq!(session.blend, 1.0);

        // Ids are unique and entities come first
        let mut ids: Vec<EntityId> = session.entities.iter().map(|e| e.id)
            .chain(session.targets.iter().map(|t| t.id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 12);
        assert_eq!(session.entities[0].id, 1);
    }

    #[test]
    fn test_random_placement_inside_region() {
        let session = create_session(LevelSpec::comic(), 42).unwrap();
        for t in &session.targets {
            assert!(t.pos.x >= 0.0 && t.pos.x <= 580.0);
            assert!(t.pos.y >= 0.0 && t.pos.y <= 748.0);
        }
    }

    #[test]
    fn test_placement_is_deterministic_per_seed() {
        let a = create_session(LevelSpec::hero(), 99).unwrap();
        let b = create_session(LevelSpec::hero(), 99).unwrap();
        let pa: Vec<Vec2> = a.targets.iter().map(|t| t.pos).collect();
        let pb: Vec<Vec2> = b.targets.iter().map(|t| t.pos).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_random_placement_respects_exclusion_margin() {
        let mut level = LevelSpec::comic();
        // Region straddling the entity row: half of it is excluded
        for group in &mut level.targets {
            group.placement = Placement::Random {
                min: Vec2::new(0.0, 600.0),
                max: Vec2::new(580.0, 940.0),
            };
        }
        let session = create_session(level, 3).unwrap();
        let margin = session.level.exclusion_margin;
        for t in &session.targets {
            assert!(!near_any_entity(&t.bounds, t.pos, &session.entities, margin));
        }
    }

    #[test]
    fn test_invalid_level_builds_nothing() {
        let mut level = LevelSpec::comic();
        level.pairings.clear();
        assert!(matches!(create_session(level, 1), Err(LevelError::NoPairings)));
    }

    #[test]
    fn test_target_alive_flips_once() {
        let mut t = Target::new(1, 1, Vec2::ZERO, Bounds::rect(10.0, 10.0), Visual::image("t"));
        assert!(t.in_overlap_pool());
        assert!(t.mark_dispatched());
        assert!(!t.mark_dispatched());
        assert!(!t.in_overlap_pool());
        assert!(t.is_alive());
        assert!(t.retire());
        assert!(!t.retire());
        assert!(!t.is_alive());
    }

    #[test]
    fn test_mark_cleared_is_monotonic() {
        let mut session = create_session(LevelSpec::shapes(), 5).unwrap();
        assert!(session.mark_cleared());
        assert!(!session.mark_cleared());
        assert!(session.is_cleared());
    }
}
