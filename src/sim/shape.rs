//! Bounding shapes and drawable visuals
//!
//! Bounds decide hit-testing and overlap; visuals decide what gets drawn.
//! A rect is anchored at its top-left corner, a circle at its center.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Collision/hit-test extent of an entity or target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bounds {
    /// Axis-aligned box, anchor = top-left corner
    Rect { w: f32, h: f32 },
    /// Circle, anchor = center
    Circle { r: f32 },
}

impl Bounds {
    pub fn rect(w: f32, h: f32) -> Self {
        Bounds::Rect { w, h }
    }

    pub fn circle(r: f32) -> Self {
        Bounds::Circle { r }
    }

    /// True when both bounds use the same overlap test
    pub fn same_kind(&self, other: &Bounds) -> bool {
        matches!(
            (self, other),
            (Bounds::Rect { .. }, Bounds::Rect { .. }) | (Bounds::Circle { .. }, Bounds::Circle { .. })
        )
    }

    /// Positive, finite extent
    pub fn is_valid(&self) -> bool {
        match *self {
            Bounds::Rect { w, h } => w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0,
            Bounds::Circle { r } => r.is_finite() && r > 0.0,
        }
    }

    /// Extent of the axis-aligned bounding box
    pub fn size(&self) -> Vec2 {
        match *self {
            Bounds::Rect { w, h } => Vec2::new(w, h),
            Bounds::Circle { r } => Vec2::splat(r * 2.0),
        }
    }

    /// Offset from the bounding box's top-left corner to the anchor
    pub fn anchor_offset(&self) -> Vec2 {
        match *self {
            Bounds::Rect { .. } => Vec2::ZERO,
            Bounds::Circle { r } => Vec2::splat(r),
        }
    }

    /// Top-left corner of the bounding box for an anchor
    #[inline]
    pub fn min_corner(&self, anchor: Vec2) -> Vec2 {
        anchor - self.anchor_offset()
    }

    /// Geometric center for an anchor
    pub fn center(&self, anchor: Vec2) -> Vec2 {
        self.min_corner(anchor) + self.size() / 2.0
    }

    /// Clamp an anchor so the whole bounding box stays inside `[0, canvas]`
    ///
    /// The box corner ends up in `[0, canvas - size]` on both axes. A shape
    /// larger than the canvas pins to the origin.
    pub fn clamp_anchor(&self, anchor: Vec2, canvas: Vec2) -> Vec2 {
        let max = (canvas - self.size()).max(Vec2::ZERO);
        self.min_corner(anchor).clamp(Vec2::ZERO, max) + self.anchor_offset()
    }

    /// Point-in-shape test (rect edges inclusive, circle strict)
    pub fn contains(&self, anchor: Vec2, point: Vec2) -> bool {
        match *self {
            Bounds::Rect { w, h } => {
                point.x >= anchor.x
                    && point.x <= anchor.x + w
                    && point.y >= anchor.y
                    && point.y <= anchor.y + h
            }
            Bounds::Circle { r } => point.distance(anchor) < r,
        }
    }

    /// Overlap test between two anchored bounds
    ///
    /// Boxes that merely touch count as overlapping; circles must be closer
    /// than the sum of their radii.
    pub fn overlaps(&self, anchor: Vec2, other: &Bounds, other_anchor: Vec2) -> bool {
        match (*self, *other) {
            (Bounds::Rect { w: aw, h: ah }, Bounds::Rect { w: bw, h: bh }) => {
                let (a, b) = (anchor, other_anchor);
                !(a.x + aw < b.x || b.x + bw < a.x || a.y + ah < b.y || b.y + bh < a.y)
            }
            (Bounds::Circle { r: ar }, Bounds::Circle { r: br }) => {
                anchor.distance(other_anchor) < ar + br
            }
            (Bounds::Rect { w, h }, Bounds::Circle { r }) => {
                rect_circle_overlap(anchor, Vec2::new(w, h), other_anchor, r)
            }
            (Bounds::Circle { r }, Bounds::Rect { w, h }) => {
                rect_circle_overlap(other_anchor, Vec2::new(w, h), anchor, r)
            }
        }
    }
}

fn rect_circle_overlap(corner: Vec2, size: Vec2, center: Vec2, r: f32) -> bool {
    let closest = center.clamp(corner, corner + size);
    closest.distance(center) < r
}

/// Tag of a procedural shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Circle,
    Square,
    Triangle,
    Diamond,
}

/// A procedural shape: tag + half-extent + CSS color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub kind: ShapeKind,
    /// Radius for circles, half-extent for the polygons
    pub size: f32,
    pub color: String,
}

impl Shape {
    pub fn new(kind: ShapeKind, size: f32, color: impl Into<String>) -> Self {
        Self {
            kind,
            size,
            color: color.into(),
        }
    }

    /// Polygon outline around `center`, `None` for circles
    pub fn polygon(&self, center: Vec2) -> Option<Vec<Vec2>> {
        let s = self.size;
        let (x, y) = (center.x, center.y);
        match self.kind {
            ShapeKind::Circle => None,
            ShapeKind::Square => Some(vec![
                Vec2::new(x - s, y - s),
                Vec2::new(x + s, y - s),
                Vec2::new(x + s, y + s),
                Vec2::new(x - s, y + s),
            ]),
            ShapeKind::Triangle => Some(vec![
                Vec2::new(x, y - s),
                Vec2::new(x - s, y + s),
                Vec2::new(x + s, y + s),
            ]),
            ShapeKind::Diamond => Some(vec![
                Vec2::new(x, y - s),
                Vec2::new(x + s, y),
                Vec2::new(x, y + s),
                Vec2::new(x - s, y),
            ]),
        }
    }
}

/// What an entity or target looks like when idle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Visual {
    /// Host-provided image, drawn stretched over the bounding box
    Image { id: String },
    /// Procedural shape centered in the bounding box
    Shape { shape: Shape },
}

impl Visual {
    pub fn image(id: impl Into<String>) -> Self {
        Visual::Image { id: id.into() }
    }

    pub fn shape(kind: ShapeKind, size: f32, color: impl Into<String>) -> Self {
        Visual::Shape {
            shape: Shape::new(kind, size, color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_overlap_touching_edges() {
        let a = Bounds::rect(80.0, 80.0);
        let b = Bounds::rect(60.0, 60.0);
        // Touching right edge counts
        assert!(a.overlaps(Vec2::new(0.0, 0.0), &b, Vec2::new(80.0, 10.0)));
        // One pixel gap does not
        assert!(!a.overlaps(Vec2::new(0.0, 0.0), &b, Vec2::new(81.0, 10.0)));
    }

    #[test]
    fn test_circle_overlap_is_strict() {
        let a = Bounds::circle(40.0);
        let b = Bounds::circle(25.0);
        assert!(a.overlaps(Vec2::new(0.0, 0.0), &b, Vec2::new(64.0, 0.0)));
        assert!(!a.overlaps(Vec2::new(0.0, 0.0), &b, Vec2::new(65.0, 0.0)));
    }

    #[test]
    fn test_rect_circle_overlap() {
        let rect = Bounds::rect(10.0, 10.0);
        let circle = Bounds::circle(5.0);
        assert!(rect.overlaps(Vec2::ZERO, &circle, Vec2::new(14.0, 5.0)));
        assert!(circle.overlaps(Vec2::new(14.0, 5.0), &rect, Vec2::ZERO));
        assert!(!rect.overlaps(Vec2::ZERO, &circle, Vec2::new(16.0, 5.0)));
    }

    #[test]
    fn test_bounds_validity() {
        assert!(Bounds::rect(80.0, 80.0).is_valid());
        assert!(!Bounds::rect(-80.0, 80.0).is_valid());
        assert!(!Bounds::rect(80.0, 0.0).is_valid());
        assert!(!Bounds::circle(0.0).is_valid());
        assert!(!Bounds::circle(f32::NAN).is_valid());
    }

    #[test]
    fn test_contains() {
        let rect = Bounds::rect(80.0, 80.0);
        assert!(rect.contains(Vec2::new(100.0, 100.0), Vec2::new(180.0, 180.0)));
        assert!(!rect.contains(Vec2::new(100.0, 100.0), Vec2::new(181.0, 150.0)));

        let circle = Bounds::circle(40.0);
        assert!(circle.contains(Vec2::new(300.0, 900.0), Vec2::new(320.0, 920.0)));
        assert!(!circle.contains(Vec2::new(300.0, 900.0), Vec2::new(340.0, 900.0)));
    }

    #[test]
    fn test_clamp_anchor() {
        let canvas = Vec2::new(640.0, 1008.0);

        let rect = Bounds::rect(80.0, 80.0);
        assert_eq!(rect.clamp_anchor(Vec2::new(-5.0, 2000.0), canvas), Vec2::new(0.0, 928.0));

        let circle = Bounds::circle(40.0);
        assert_eq!(circle.clamp_anchor(Vec2::new(0.0, 1008.0), canvas), Vec2::new(40.0, 968.0));
        assert_eq!(circle.clamp_anchor(Vec2::new(300.0, 500.0), canvas), Vec2::new(300.0, 500.0));
    }

    #[test]
    fn test_center() {
        assert_eq!(Bounds::rect(80.0, 60.0).center(Vec2::new(10.0, 10.0)), Vec2::new(50.0, 40.0));
        assert_eq!(Bounds::circle(5.0).center(Vec2::new(10.0, 10.0)), Vec2::new(10.0, 10.0));
    }

    #[test]
    fn test_shape_polygons() {
        let center = Vec2::new(100.0, 100.0);
        assert!(Shape::new(ShapeKind::Circle, 50.0, "#ff000080").polygon(center).is_none());

        let tri = Shape::new(ShapeKind::Triangle, 30.0, "#000").polygon(center).unwrap();
        assert_eq!(tri.len(), 3);
        assert_eq!(tri[0], Vec2::new(100.0, 70.0));

        let diamond = Shape::new(ShapeKind::Diamond, 30.0, "#000").polygon(center).unwrap();
        assert_eq!(diamond[1], Vec2::new(130.0, 100.0));
    }

    #[test]
    fn test_visual_json() {
        let json = r##"{"type":"shape","shape":{"kind":"triangle","size":30.0,"color":"#000"}}"##;
        let visual: Visual = serde_json::from_str(json).unwrap();
        assert_eq!(visual, Visual::shape(ShapeKind::Triangle, 30.0, "#000"));

        let bounds: Bounds = serde_json::from_str(r#"{"kind":"circle","r":25.0}"#).unwrap();
        assert_eq!(bounds, Bounds::circle(25.0));
    }
}
