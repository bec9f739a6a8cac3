//! 2D hit geometry: circles, thick segments and convex polygons.
//!
//! Combatants are treated as points; `pad` widens every shape uniformly
//! so thin targets at the edge of an area still register.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

/// Geometry an ability occupies while it can hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HitShape {
    Circle {
        center: Vec2,
        radius: f32,
    },
    /// Line segment with thickness (swept projectiles, beams)
    Segment {
        start: Vec2,
        end: Vec2,
        half_thickness: f32,
    },
    /// Convex polygon, either winding
    Polygon { vertices: Vec<Vec2> },
}

impl HitShape {
    pub fn contains(&self, point: Vec2) -> bool {
        self.contains_padded(point, 0.0)
    }

    pub fn contains_padded(&self, point: Vec2, pad: f32) -> bool {
        let pad = pad.max(0.0);
        match self {
            HitShape::Circle { center, radius } => point.distance(*center) <= radius + pad,
            HitShape::Segment {
                start,
                end,
                half_thickness,
            } => distance_to_segment(point, *start, *end) <= half_thickness + pad,
            HitShape::Polygon { vertices } => {
                point_in_convex_polygon(point, vertices)
                    || (pad > 0.0 && distance_to_outline(point, vertices) <= pad)
            }
        }
    }

    /// Representative point (for logging and views)
    pub fn center(&self) -> Vec2 {
        match self {
            HitShape::Circle { center, .. } => *center,
            HitShape::Segment { end, .. } => *end,
            HitShape::Polygon { vertices } => {
                if vertices.is_empty() {
                    Vec2::ZERO
                } else {
                    vertices.iter().copied().sum::<Vec2>() / vertices.len() as f32
                }
            }
        }
    }
}

/// Shoelace sum `Σ (x_i * y_{i+1} - x_{i+1} * y_i)` over the closed ring.
/// Twice the signed area; negative means clockwise.
pub fn signed_area_sum(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    (0..n)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum()
}

pub fn is_clockwise(vertices: &[Vec2]) -> bool {
    signed_area_sum(vertices) < 0.0
}

/// Point-in-convex-polygon by edge-side test. Points on an edge count as inside.
pub fn point_in_convex_polygon(point: Vec2, vertices: &[Vec2]) -> bool {
    let area = signed_area_sum(vertices);
    if area == 0.0 {
        return false;
    }
    let orientation = area.signum();
    let n = vertices.len();
    (0..n).all(|i| {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        (b - a).perp_dot(point - a) * orientation >= 0.0
    })
}

/// Perpendicular distance from `point` to the segment `start..end`.
pub fn distance_to_segment(point: Vec2, start: Vec2, end: Vec2) -> f32 {
    let ab = end - start;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return point.distance(start);
    }
    let t = ((point - start).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(start + ab * t)
}

fn distance_to_outline(point: Vec2, vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| distance_to_segment(point, vertices[i], vertices[(i + 1) % n]))
        .fold(f32::INFINITY, f32::min)
}

/// Corners of a regular polygon. Vertex 0 points up at zero rotation;
/// positive rotation turns counter-clockwise.
pub fn regular_polygon(center: Vec2, radius: f32, rotation_deg: f32, sides: u32) -> Vec<Vec2> {
    let sides = sides.max(3);
    (0..sides)
        .map(|i| {
            let angle = i as f32 * std::f32::consts::TAU / sides as f32 - rotation_deg.to_radians();
            Vec2::new(center.x + radius * angle.sin(), center.y + radius * angle.cos())
        })
        .collect()
}

/// Placement rotation for a shape aimed along `direction`: the signed angle
/// from +Y to the aim, turned half a revolution so the shape faces away from
/// the caster, plus a per-shape offset.
pub fn placement_rotation_deg(direction: Vec2, offset_deg: f32) -> f32 {
    if direction.length_squared() <= f32::EPSILON {
        return offset_deg - 180.0;
    }
    (-direction.x).atan2(direction.y).to_degrees() - 180.0 + offset_deg
}
