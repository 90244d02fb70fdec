//! Deterministic game logic module
//!
//! All gameplay state lives here. This module must stay pure:
//! - Time only comes in as tick timestamps (ms)
//! - Seeded RNG only
//! - Stable iteration order (creation order)
//! - No rendering or platform dependencies

pub mod anim;
pub mod collision;
pub mod input;
pub mod level;
pub mod shape;
pub mod state;
pub mod tick;
pub mod transition;

pub use anim::AnimState;
pub use collision::Dispatch;
pub use input::{DragGrab, PointerEvent, PointerKind, SurfaceMapping};
pub use level::{
    AnimSpec, EntitySpec, FlightSpec, LevelError, LevelSpec, Pairing, Placement, Resolution,
    StepSpec, TargetGroup,
};
pub use shape::{Bounds, Shape, ShapeKind, Visual};
pub use state::{ControlledEntity, EntityId, Session, Target, TransitionEffect, create_session};
pub use tick::{advance, resolve};
pub use transition::{Phase, StepRunner};
