//! Collision detection and response for circles against axis-aligned cells
//!
//! Balls are circles, bricks are grid-aligned rectangles and the world is a
//! box. Everything resolves through the closest-point-on-rectangle test
//! below plus component-wise wall reflection.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Distance below which the circle centre counts as inside the rectangle
const CENTER_INSIDE_EPSILON: f32 = 1e-4;

/// Contact between a circle and a single rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleHit {
    /// Unit normal pointing from the rectangle toward the ball
    pub normal: Vec2,
    /// Overlap depth (for position correction and tie-breaking)
    pub penetration: f32,
}

/// Axis-aligned rectangle in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// World box the balls bounce inside, from (0, 0) to (width, height)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Which walls a ball touched during wall resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallContact {
    pub x: bool,
    pub y: bool,
}

impl WallContact {
    pub fn any(&self) -> bool {
        self.x || self.y
    }
}

/// Circle vs rectangle overlap test
///
/// Uses the closest point on the rectangle to the circle centre. When the
/// centre is inside the rectangle the normal is the edge with the least
/// penetration, checked in left, right, top, bottom order so exact ties
/// resolve to the left edge.
pub fn circle_rect_collision(center: Vec2, radius: f32, rect: &Rect) -> Option<CircleHit> {
    let closest = center.clamp(rect.min, rect.max);
    let delta = center - closest;
    let dist_sq = delta.length_squared();

    if dist_sq > radius * radius {
        return None;
    }

    let dist = dist_sq.sqrt();
    if dist > CENTER_INSIDE_EPSILON {
        return Some(CircleHit {
            normal: delta / dist,
            penetration: radius - dist,
        });
    }

    // Degenerate: centre inside (or on) the rectangle
    let edges = [
        (center.x - rect.min.x, Vec2::new(-1.0, 0.0)),
        (rect.max.x - center.x, Vec2::new(1.0, 0.0)),
        (center.y - rect.min.y, Vec2::new(0.0, -1.0)),
        (rect.max.y - center.y, Vec2::new(0.0, 1.0)),
    ];
    let mut best = edges[0];
    for edge in &edges[1..] {
        if edge.0 < best.0 {
            best = *edge;
        }
    }

    Some(CircleHit {
        normal: best.1,
        penetration: best.0.max(0.0) + radius,
    })
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Clamp a ball inside the world and flip velocity on each penetrated axis
///
/// Axes are handled independently, so a ball in a corner reflects both
/// components with no corner-specific logic.
pub fn resolve_walls(
    pos: &mut Vec2,
    vel: &mut Vec2,
    radius: f32,
    bounds: &WorldBounds,
) -> WallContact {
    WallContact {
        x: resolve_axis(&mut pos.x, &mut vel.x, radius, bounds.width),
        y: resolve_axis(&mut pos.y, &mut vel.y, radius, bounds.height),
    }
}

fn resolve_axis(p: &mut f32, v: &mut f32, radius: f32, extent: f32) -> bool {
    if extent <= radius * 2.0 {
        // World narrower than the ball: pin to the middle
        let mid = extent * 0.5;
        let hit = *p != mid;
        *p = mid;
        return hit;
    }
    if *p < radius {
        *p = radius;
        *v = v.abs();
        true
    } else if *p > extent - radius {
        *p = extent - radius;
        *v = -v.abs();
        true
    } else {
        false
    }
}
