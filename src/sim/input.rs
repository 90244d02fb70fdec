//! Pointer interaction
//!
//! Press/move/release (mouse or touch) drive a single drag grab per session.
//! Events that hit nothing are silent no-ops.

use glam::Vec2;

use super::state::{EntityId, Session};

/// Kind of pointer event, mouse and touch alike
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// mousedown / touchstart
    Press,
    /// mousemove / touchmove
    Move,
    /// mouseup / mouseleave / touchend / touchcancel
    Release,
}

/// A pointer event already mapped into surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub pos: Vec2,
}

impl PointerEvent {
    pub fn press(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Press, pos: Vec2::new(x, y) }
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self { kind: PointerKind::Move, pos: Vec2::new(x, y) }
    }

    pub fn release() -> Self {
        Self { kind: PointerKind::Release, pos: Vec2::ZERO }
    }
}

/// Active drag: which entity, and where it was grabbed relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGrab {
    pub entity: EntityId,
    pub offset: Vec2,
}

/// Client (page) to surface coordinate mapping for a CSS-scaled canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMapping {
    /// Top-left of the canvas element in client coordinates
    pub rect_origin: Vec2,
    /// Displayed size of the canvas element
    pub rect_size: Vec2,
    /// Logical drawing surface size
    pub surface_size: Vec2,
}

impl SurfaceMapping {
    pub fn to_surface(&self, client: Vec2) -> Vec2 {
        let scale = self.surface_size / self.rect_size.max(Vec2::splat(f32::EPSILON));
        (client - self.rect_origin) * scale
    }
}

/// Idle -> Dragging. Returns the grabbed entity, `None` on a miss.
///
/// Later entities are drawn on top, so they are tested first. Locked or
/// hidden entities are skipped and the scan continues below them.
pub fn press(session: &mut Session, point: Vec2) -> Option<EntityId> {
    release(session);

    let hit = session
        .entities
        .iter_mut()
        .rev()
        .find(|e| e.can_grab() && e.bounds.contains(e.pos, point))?;

    hit.dragging = true;
    let grab = DragGrab {
        entity: hit.id,
        offset: point - hit.pos,
    };
    log::debug!("Grabbed entity {} at offset {:?}", grab.entity, grab.offset);
    session.drag = Some(grab);
    Some(grab.entity)
}

/// Move the grabbed entity so the grab point stays under the pointer.
/// Returns false when nothing moved.
pub fn drag_to(session: &mut Session, point: Vec2) -> bool {
    let Some(grab) = session.drag else {
        return false;
    };
    let canvas = session.level.canvas;

    let Some(entity) = session.entity_mut(grab.entity) else {
        session.drag = None;
        return false;
    };
    if !entity.can_grab() {
        // Lock or hide won; the grab is over
        entity.dragging = false;
        session.drag = None;
        return false;
    }

    entity.pos = entity.bounds.clamp_anchor(point - grab.offset, canvas);
    true
}

/// Dragging -> Idle. Idempotent; returns whether a grab was active.
pub fn release(session: &mut Session) -> bool {
    let Some(grab) = session.drag.take() else {
        return false;
    };
    if let Some(entity) = session.entity_mut(grab.entity) {
        entity.dragging = false;
    }
    true
}

/// Drop the grab if it holds `id` (used when an animation locks the entity)
pub fn cancel_drag_for(session: &mut Session, id: EntityId) {
    if session.drag.is_some_and(|g| g.entity == id) {
        release(session);
        log::debug!("Drag on entity {} cancelled by lock", id);
    }
}

/// Route one pointer event. Returns whether any state changed.
pub fn handle(session: &mut Session, event: PointerEvent) -> bool {
    match event.kind {
        PointerKind::Press => press(session, event.pos).is_some(),
        PointerKind::Move => drag_to(session, event.pos),
        PointerKind::Release => release(session),
    }
}
