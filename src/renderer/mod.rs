//! Frame composition
//!
//! `draw_frame` turns a session into an ordered stream of draw commands.
//! A `Surface` consumes them: the Canvas2D surface in the browser, a plain
//! `Vec` in tests and headless runs.

#[cfg(target_arch = "wasm32")]
pub mod canvas;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;

use glam::Vec2;

use crate::sim::{Session, Shape, Visual};

/// One drawing primitive, in surface coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Wipe the whole surface
    Clear { size: Vec2 },
    /// Host image stretched over `[pos, pos + size]`
    Image { id: String, pos: Vec2, size: Vec2, alpha: f32 },
    /// Filled circle
    Circle { center: Vec2, radius: f32, color: String },
    /// Filled closed polygon
    Polygon { points: Vec<Vec2>, color: String },
}

/// Something that can execute draw commands
pub trait Surface {
    fn draw(&mut self, cmd: DrawCommand);
}

/// Recording surface
impl Surface for Vec<DrawCommand> {
    fn draw(&mut self, cmd: DrawCommand) {
        self.push(cmd);
    }
}

/// Draw one frame of the session
///
/// Order: clear, background (cross-faded while a fade runs), alive targets
/// (not once cleared), visible entities, flight sprite, special effects.
pub fn draw_frame(session: &Session, surface: &mut impl Surface) {
    let size = session.level.canvas;
    surface.draw(DrawCommand::Clear { size });

    match &session.next_background {
        Some(next) => {
            draw_background(surface, &session.background, size, session.blend);
            draw_background(surface, next, size, 1.0 - session.blend);
        }
        None => draw_background(surface, &session.background, size, 1.0),
    }

    if !session.is_cleared() {
        for target in session.targets.iter().filter(|t| t.is_alive()) {
            let corner = target.bounds.min_corner(target.pos);
            draw_visual(surface, &target.visual, corner, target.bounds.size());
        }
    }

    for entity in session.entities.iter().filter(|e| e.visible) {
        let corner = entity.bounds.min_corner(entity.pos);
        let size = entity.bounds.size();
        match entity.anim.frame_image() {
            Some(id) => surface.draw(DrawCommand::Image { id, pos: corner, size, alpha: 1.0 }),
            None => draw_visual(surface, &entity.visual, corner, size),
        }
    }

    if let Some(flight) = &session.flight {
        surface.draw(DrawCommand::Image {
            id: flight.sprite.clone(),
            pos: flight.pos,
            size: flight.size,
            alpha: 1.0,
        });
    }

    for effect in session.effects.iter().filter(|e| !e.done) {
        surface.draw(DrawCommand::Image {
            id: effect.frame_image(),
            pos: effect.pos,
            size: effect.size,
            alpha: 1.0,
        });
    }
}

fn draw_background(surface: &mut impl Surface, id: &str, size: Vec2, alpha: f32) {
    surface.draw(DrawCommand::Image {
        id: id.to_string(),
        pos: Vec2::ZERO,
        size,
        alpha,
    });
}

/// Static look of an entity or target inside its bounding box
fn draw_visual(surface: &mut impl Surface, visual: &Visual, corner: Vec2, size: Vec2) {
    match visual {
        Visual::Image { id } => surface.draw(DrawCommand::Image {
            id: id.clone(),
            pos: corner,
            size,
            alpha: 1.0,
        }),
        Visual::Shape { shape } => draw_shape(surface, shape, corner + size / 2.0),
    }
}

fn draw_shape(surface: &mut impl Surface, shape: &Shape, center: Vec2) {
    match shape.polygon(center) {
        Some(points) => surface.draw(DrawCommand::Polygon {
            points,
            color: shape.color.clone(),
        }),
        None => surface.draw(DrawCommand::Circle {
            center,
            radius: shape.size,
            color: shape.color.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::{AnimSpec, LevelSpec};
    use crate::sim::state::create_session;
    use crate::sim::{anim, transition};

    fn image_ids(cmds: &[DrawCommand]) -> Vec<&str> {
        cmds.iter()
            .filter_map(|c| match c {
                DrawCommand::Image { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_draw_order() {
        let session = create_session(LevelSpec::comic(), 4).unwrap();
        let mut cmds: Vec<DrawCommand> = Vec::new();
        draw_frame(&session, &mut cmds);

        assert!(matches!(cmds[0], DrawCommand::Clear { .. }));
        let ids = image_ids(&cmds);
        assert_eq!(ids[0], "bg-initial");
        // 9 targets before the 3 figures
        assert!(ids[1..10].iter().all(|id| id.starts_with("enemy")));
        assert_eq!(&ids[10..], &["player1-frame1", "player2", "player3"]);
    }

    #[test]
    fn test_hidden_and_dead_are_skipped() {
        let mut session = create_session(LevelSpec::comic(), 4).unwrap();
        session.entities[1].visible = false;
        session.targets[0].retire();
        let mut cmds: Vec<DrawCommand> = Vec::new();
        draw_frame(&session, &mut cmds);

        let ids = image_ids(&cmds);
        assert_eq!(ids.len(), 1 + 8 + 2);
        assert!(!ids.contains(&"player2"));
    }

    #[test]
    fn test_playing_entity_draws_frame() {
        let mut session = create_session(LevelSpec::comic(), 4).unwrap();
        let anim = AnimSpec {
            frame_prefix: "player1-frame".into(),
            total_frames: 10,
            frame_ms: 100.0,
        };
        anim::start(&mut session.entities[0], 4, &anim, 0.0);
        anim::advance(&mut session, 350.0);

        let mut cmds: Vec<DrawCommand> = Vec::new();
        draw_frame(&session, &mut cmds);
        assert!(image_ids(&cmds).contains(&"player1-frame4"));
    }

    #[test]
    fn test_cross_fade_alphas() {
        let mut session = create_session(LevelSpec::comic(), 4).unwrap();
        for t in &mut session.targets {
            t.retire();
        }
        transition::check_clear(&mut session, 0.0);
        transition::advance(&mut session, 0.0);
        transition::advance(&mut session, 125.0);

        let mut cmds: Vec<DrawCommand> = Vec::new();
        draw_frame(&session, &mut cmds);
        match (&cmds[1], &cmds[2]) {
            (
                DrawCommand::Image { id: old, alpha: a, .. },
                DrawCommand::Image { id: new, alpha: b, .. },
            ) => {
                assert_eq!(old, "bg-initial");
                assert_eq!(new, "bg-final");
                assert!((a - 0.75).abs() < 1e-6);
                assert!((b - 0.25).abs() < 1e-6);
            }
            other => panic!("expected two backgrounds, got {other:?}"),
        }
        // Cleared: no targets drawn
        assert!(!image_ids(&cmds).iter().any(|id| id.starts_with("enemy")));
    }

    #[test]
    fn test_shapes_draw_as_primitives() {
        let session = create_session(LevelSpec::shapes(), 4).unwrap();
        let mut cmds: Vec<DrawCommand> = Vec::new();
        draw_frame(&session, &mut cmds);

        let circles = cmds.iter().filter(|c| matches!(c, DrawCommand::Circle { .. })).count();
        let polygons = cmds.iter().filter(|c| matches!(c, DrawCommand::Polygon { .. })).count();
        assert_eq!(circles, 3);
        assert_eq!(polygons, 6);

        // Entity circles are centered on their anchor
        let first_circle = cmds.iter().find_map(|c| match c {
            DrawCommand::Circle { center, .. } => Some(*center),
            _ => None,
        });
        assert_eq!(first_circle, Some(session.entities[0].pos));
    }
}
