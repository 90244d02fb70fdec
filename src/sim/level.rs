//! Level definitions
//!
//! A level fixes everything a session needs up front: entity and target
//! counts, the pairing table, animation cadences and the scripted transition.
//! Levels are plain serde data so they can ship as JSON next to the comic.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::shape::{Bounds, ShapeKind, Visual};
use crate::consts::*;

/// Why a level definition was rejected
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level defines no controlled entities")]
    NoEntities,
    #[error("level defines no target groups")]
    NoTargets,
    #[error("target group {kind} has a count of zero")]
    EmptyTargetGroup { kind: u32 },
    #[error("target group {kind} expects {expected} fixed positions, got {got}")]
    PlacementMismatch { kind: u32, expected: usize, got: usize },
    #[error("target group {kind} has an empty random placement region")]
    InvalidPlacementRegion { kind: u32 },
    #[error("level defines no pairings")]
    NoPairings,
    #[error("pairing {entity_kind}->{target_kind} references a kind the level does not define")]
    UnknownPairingKind { entity_kind: u32, target_kind: u32 },
    #[error("pairing {entity_kind}->{target_kind} is defined twice")]
    DuplicatePairing { entity_kind: u32, target_kind: u32 },
    #[error("animation '{frame_prefix}' needs at least one frame and a positive frame duration")]
    InvalidAnimation { frame_prefix: String },
    #[error("entities and targets mix box and circle bounds")]
    MixedBoundsKinds,
    #[error("transition step {index} has a negative or non-finite duration")]
    InvalidDuration { index: usize },
    #[error("flight step {index} must move right at a positive speed")]
    InvalidFlight { index: usize },
    #[error("transition plays the special effects more than once")]
    DuplicateSpecials,
    #[error("target group {kind} asks for {count} targets, more than the level limit")]
    TooManyTargets { kind: u32, count: usize },
    #[error("transition asks for {count} special effects, more than the limit")]
    TooManyEffects { count: usize },
    #[error("entity or target of kind {kind} has a non-positive or non-finite size")]
    InvalidBounds { kind: u32 },
    #[error("failed to parse level: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read level: {0}")]
    Io(#[from] std::io::Error),
}

/// One player-controlled figure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpec {
    pub kind: u32,
    /// Start anchor (top-left for boxes, center for circles)
    pub pos: Vec2,
    pub bounds: Bounds,
    pub visual: Visual,
}

/// Where the targets of a group start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Placement {
    /// Exactly one anchor per target
    Fixed { positions: Vec<Vec2> },
    /// Anchors sampled uniformly in `[min, max]`
    Random { min: Vec2, max: Vec2 },
}

/// A fixed-size group of removable targets sharing a kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetGroup {
    pub kind: u32,
    pub count: usize,
    pub bounds: Bounds,
    pub visual: Visual,
    pub placement: Placement,
}

/// Frame sequence played on an entity while it is locked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimSpec {
    /// Frame images are `{frame_prefix}{n}` with n starting at 1
    pub frame_prefix: String,
    pub total_frames: u32,
    pub frame_ms: f64,
}

impl AnimSpec {
    /// Image id for a zero-based frame cursor
    pub fn frame_image(&self, frame: u32) -> String {
        let last = self.total_frames.saturating_sub(1);
        format!("{}{}", self.frame_prefix, frame.min(last) + 1)
    }

    /// Total play time of one episode
    pub fn duration_ms(&self) -> f64 {
        self.total_frames as f64 * self.frame_ms
    }
}

/// How a qualifying collision is resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Resolution {
    /// Target disappears on contact
    Instant,
    /// Entity plays a locked animation, target disappears when it ends
    Animated { anim: AnimSpec },
}

/// Entry of the pairing table: which entity kind reacts to which target kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pairing {
    pub entity_kind: u32,
    pub target_kind: u32,
    pub resolution: Resolution,
}

/// Sprite moving along `y = base + amplitude * sin(frequency * x + phase)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSpec {
    pub sprite: String,
    pub size: Vec2,
    /// Start x and base y
    pub start: Vec2,
    /// Horizontal speed (px/ms)
    pub speed: f32,
    pub amplitude: f32,
    /// Radians per px of horizontal travel
    pub frequency: f32,
    #[serde(default)]
    pub phase: f32,
}

impl FlightSpec {
    /// Sprite anchor after `elapsed_ms` of flight
    pub fn position_at(&self, elapsed_ms: f64) -> Vec2 {
        let x = self.start.x + self.speed * elapsed_ms as f32;
        let y = self.start.y + self.amplitude * (self.frequency * x + self.phase).sin();
        Vec2::new(x, y)
    }
}

/// One scripted step of the all-clear transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepSpec {
    /// Hide every controlled entity
    HideEntities,
    /// Wait
    Delay { ms: f64 },
    /// Cross-fade the current background into `to`
    Fade { to: String, duration_ms: f64 },
    /// Fly a sprite across the surface
    Flight { flight: FlightSpec },
    /// Decorative frame animations at random positions
    Specials {
        count: usize,
        size: Vec2,
        frame_prefix: String,
        total_frames: u32,
        frame_ms: f64,
        duration_ms: f64,
    },
}

fn default_canvas() -> Vec2 {
    crate::canvas_size()
}

fn default_margin() -> f32 {
    EXCLUSION_MARGIN
}

/// Complete level definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSpec {
    pub name: String,
    #[serde(default = "default_canvas")]
    pub canvas: Vec2,
    /// Background shown while targets remain
    pub background: String,
    pub entities: Vec<EntitySpec>,
    pub targets: Vec<TargetGroup>,
    pub pairings: Vec<Pairing>,
    #[serde(default)]
    pub transition: Vec<StepSpec>,
    /// Random target anchors stay this far from entity start boxes
    #[serde(default = "default_margin")]
    pub exclusion_margin: f32,
}

impl LevelSpec {
    /// Parse and validate a JSON level
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let level: LevelSpec = serde_json::from_str(json)?;
        level.validate()?;
        Ok(level)
    }

    /// Resolution for an entity/target kind pair, `None` if they don't react
    pub fn pairing(&self, entity_kind: u32, target_kind: u32) -> Option<&Resolution> {
        self.pairings
            .iter()
            .find(|p| p.entity_kind == entity_kind && p.target_kind == target_kind)
            .map(|p| &p.resolution)
    }

    /// Total number of targets across all groups
    pub fn target_count(&self) -> usize {
        self.targets.iter().fold(0, |total, g| total.saturating_add(g.count))
    }

    /// Check the level before any entity gets built
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.entities.is_empty() {
            return Err(LevelError::NoEntities);
        }
        if self.targets.is_empty() {
            return Err(LevelError::NoTargets);
        }

        if let Some(e) = self.entities.iter().find(|e| !e.bounds.is_valid()) {
            return Err(LevelError::InvalidBounds { kind: e.kind });
        }

        let mut total: usize = 0;
        for group in &self.targets {
            if group.count == 0 {
                return Err(LevelError::EmptyTargetGroup { kind: group.kind });
            }
            total = match total.checked_add(group.count) {
                Some(total) if total <= MAX_TARGETS => total,
                _ => {
                    return Err(LevelError::TooManyTargets {
                        kind: group.kind,
                        count: group.count,
                    });
                }
            };
            if !group.bounds.is_valid() {
                return Err(LevelError::InvalidBounds { kind: group.kind });
            }
            match &group.placement {
                Placement::Fixed { positions } if positions.len() != group.count => {
                    return Err(LevelError::PlacementMismatch {
                        kind: group.kind,
                        expected: group.count,
                        got: positions.len(),
                    });
                }
                Placement::Random { min, max } if min.x > max.x || min.y > max.y => {
                    return Err(LevelError::InvalidPlacementRegion { kind: group.kind });
                }
                _ => {}
            }
        }

        // One overlap test per session
        let first = self.entities[0].bounds;
        let mixed = self.entities.iter().map(|e| &e.bounds)
            .chain(self.targets.iter().map(|g| &g.bounds))
            .any(|b| !b.same_kind(&first));
        if mixed {
            return Err(LevelError::MixedBoundsKinds);
        }

        if self.pairings.is_empty() {
            return Err(LevelError::NoPairings);
        }
        let entity_kinds: HashSet<u32> = self.entities.iter().map(|e| e.kind).collect();
        let target_kinds: HashSet<u32> = self.targets.iter().map(|g| g.kind).collect();
        let mut seen = HashSet::new();
        for p in &self.pairings {
            if !entity_kinds.contains(&p.entity_kind) || !target_kinds.contains(&p.target_kind) {
                return Err(LevelError::UnknownPairingKind {
                    entity_kind: p.entity_kind,
                    target_kind: p.target_kind,
                });
            }
            if !seen.insert((p.entity_kind, p.target_kind)) {
                return Err(LevelError::DuplicatePairing {
                    entity_kind: p.entity_kind,
                    target_kind: p.target_kind,
                });
            }
            if let Resolution::Animated { anim } = &p.resolution {
                if anim.total_frames == 0 || !(anim.frame_ms > 0.0) {
                    return Err(LevelError::InvalidAnimation {
                        frame_prefix: anim.frame_prefix.clone(),
                    });
                }
            }
        }

        let mut specials = 0;
        for (index, step) in self.transition.iter().enumerate() {
            let duration_ok = |ms: f64| ms.is_finite() && ms >= 0.0;
            match step {
                StepSpec::HideEntities => {}
                StepSpec::Delay { ms } => {
                    if !duration_ok(*ms) {
                        return Err(LevelError::InvalidDuration { index });
                    }
                }
                StepSpec::Fade { duration_ms, .. } => {
                    if !duration_ok(*duration_ms) {
                        return Err(LevelError::InvalidDuration { index });
                    }
                }
                StepSpec::Flight { flight } => {
                    if !(flight.speed > 0.0) {
                        return Err(LevelError::InvalidFlight { index });
                    }
                }
                StepSpec::Specials {
                    count,
                    frame_prefix,
                    total_frames,
                    frame_ms,
                    duration_ms,
                    ..
                } => {
                    specials += 1;
                    if specials > 1 {
                        return Err(LevelError::DuplicateSpecials);
                    }
                    if *count > MAX_EFFECTS {
                        return Err(LevelError::TooManyEffects { count: *count });
                    }
                    if *total_frames == 0 || !(*frame_ms > 0.0) {
                        return Err(LevelError::InvalidAnimation {
                            frame_prefix: frame_prefix.clone(),
                        });
                    }
                    if !duration_ok(*duration_ms) {
                        return Err(LevelError::InvalidDuration { index });
                    }
                }
            }
        }

        Ok(())
    }

    /// Three figures along the bottom, nine enemies of three kinds.
    ///
    /// Figure 1 plays a ten frame attack before its enemy disappears, figures
    /// 2 and 3 remove theirs on contact. Clearing fades to the final
    /// background, then plays three special effects.
    ///
    /// The shipped page ran the effects during the fade and handed off 1000ms
    /// after the clear. Steps here run one after another, so the effects start
    /// once the fade is done and the hand-off comes at 1500ms.
    pub fn comic() -> Self {
        let (w, h) = (80.0, 80.0);
        let base_y = GAME_HEIGHT - h - 20.0;
        let entity = |kind: u32, visual: Visual| EntitySpec {
            kind,
            pos: Vec2::new(GAME_WIDTH * kind as f32 / 4.0 - w / 2.0, base_y),
            bounds: Bounds::rect(w, h),
            visual,
        };

        let (ew, eh) = (60.0, 60.0);
        let targets = (1..=3)
            .map(|kind| TargetGroup {
                kind,
                count: 3,
                bounds: Bounds::rect(ew, eh),
                visual: Visual::image(format!("enemy{kind}")),
                placement: Placement::Random {
                    min: Vec2::ZERO,
                    max: Vec2::new(GAME_WIDTH - ew, GAME_HEIGHT - eh - 200.0),
                },
            })
            .collect();

        Self {
            name: "comic".into(),
            canvas: crate::canvas_size(),
            background: "bg-initial".into(),
            entities: vec![
                entity(1, Visual::image("player1-frame1")),
                entity(2, Visual::image("player2")),
                entity(3, Visual::image("player3")),
            ],
            targets,
            pairings: vec![
                Pairing {
                    entity_kind: 1,
                    target_kind: 1,
                    resolution: Resolution::Animated {
                        anim: AnimSpec {
                            frame_prefix: "player1-frame".into(),
                            total_frames: 10,
                            frame_ms: DEFAULT_FRAME_MS,
                        },
                    },
                },
                Pairing { entity_kind: 2, target_kind: 2, resolution: Resolution::Instant },
                Pairing { entity_kind: 3, target_kind: 3, resolution: Resolution::Instant },
            ],
            transition: vec![
                StepSpec::Fade { to: "bg-final".into(), duration_ms: DEFAULT_FADE_MS },
                StepSpec::Specials {
                    count: 3,
                    size: Vec2::new(80.0, 80.0),
                    frame_prefix: "special-frame".into(),
                    total_frames: 8,
                    frame_ms: DEFAULT_FRAME_MS,
                    duration_ms: 1000.0,
                },
            ],
            exclusion_margin: EXCLUSION_MARGIN,
        }
    }

    /// One round hero against four enemies.
    ///
    /// Clearing hides the hero and runs the long scripted ending: three
    /// background fades with two sprite flights in between.
    pub fn hero() -> Self {
        let flight = |sprite: &str, base_y: f32, speed: f32, amplitude: f32, frequency: f32, phase: f32| {
            StepSpec::Flight {
                flight: FlightSpec {
                    sprite: sprite.into(),
                    size: Vec2::new(200.0, 200.0),
                    start: Vec2::new(-300.0, base_y),
                    speed,
                    amplitude,
                    frequency,
                    phase,
                },
            }
        };

        Self {
            name: "hero".into(),
            canvas: crate::canvas_size(),
            background: "game-bg1".into(),
            entities: vec![EntitySpec {
                kind: 1,
                pos: Vec2::new(300.0, 900.0),
                bounds: Bounds::circle(40.0),
                visual: Visual::image("hero"),
            }],
            targets: vec![TargetGroup {
                kind: 1,
                count: 4,
                bounds: Bounds::circle(25.0),
                visual: Visual::image("enemy"),
                placement: Placement::Random {
                    min: Vec2::new(50.0, 50.0),
                    max: Vec2::new(590.0, 550.0),
                },
            }],
            pairings: vec![Pairing {
                entity_kind: 1,
                target_kind: 1,
                resolution: Resolution::Animated {
                    anim: AnimSpec {
                        frame_prefix: "anim-".into(),
                        total_frames: 9,
                        frame_ms: DEFAULT_FRAME_MS,
                    },
                },
            }],
            transition: vec![
                StepSpec::Delay { ms: 500.0 },
                StepSpec::HideEntities,
                StepSpec::Fade { to: "game-bg2".into(), duration_ms: DEFAULT_FADE_MS },
                StepSpec::Delay { ms: 500.0 },
                // 1px and 0.5px per 60fps frame
                flight("sprite1", 500.0, 0.06, -100.0, 1.0 / 80.0, 0.0),
                StepSpec::Delay { ms: 300.0 },
                StepSpec::Fade { to: "game-bg3".into(), duration_ms: DEFAULT_FADE_MS },
                StepSpec::Delay { ms: 500.0 },
                flight("sprite2", 400.0, 0.03, 150.0, 0.06, 18.0),
                StepSpec::Delay { ms: 300.0 },
                StepSpec::Fade { to: "game-bg4".into(), duration_ms: DEFAULT_FADE_MS },
                StepSpec::Delay { ms: 1500.0 },
            ],
            exclusion_margin: EXCLUSION_MARGIN,
        }
    }

    /// Three translucent circles chasing black triangles, squares and diamonds.
    pub fn shapes() -> Self {
        let colors = ["#ff000080", "#0000ff80", "#00ff0080"];
        let kinds = [ShapeKind::Triangle, ShapeKind::Square, ShapeKind::Diamond];

        let entities = colors
            .iter()
            .enumerate()
            .map(|(i, color)| EntitySpec {
                kind: i as u32 + 1,
                pos: Vec2::new(GAME_WIDTH * (i as f32 + 1.0) / 4.0, GAME_HEIGHT - 100.0),
                bounds: Bounds::circle(50.0),
                visual: Visual::shape(ShapeKind::Circle, 50.0, *color),
            })
            .collect();

        let targets = kinds
            .iter()
            .enumerate()
            .map(|(i, shape)| TargetGroup {
                kind: i as u32 + 1,
                count: 2,
                bounds: Bounds::circle(30.0),
                visual: Visual::shape(*shape, 30.0, "#000"),
                placement: Placement::Random {
                    min: Vec2::new(30.0, 30.0),
                    max: Vec2::new(GAME_WIDTH - 30.0, GAME_HEIGHT - 300.0),
                },
            })
            .collect();

        let pairings = (1..=3)
            .map(|kind| Pairing {
                entity_kind: kind,
                target_kind: kind,
                resolution: Resolution::Instant,
            })
            .collect();

        Self {
            name: "shapes".into(),
            canvas: crate::canvas_size(),
            background: "bg-shapes".into(),
            entities,
            targets,
            pairings,
            transition: vec![
                StepSpec::Fade { to: "bg-final".into(), duration_ms: DEFAULT_FADE_MS },
                StepSpec::Delay { ms: 300.0 },
            ],
            exclusion_margin: EXCLUSION_MARGIN,
        }
    }

    /// Look up a built-in level by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "comic" => Some(Self::comic()),
            "hero" => Some(Self::hero()),
            "shapes" => Some(Self::shapes()),
            _ => None,
        }
    }
}
