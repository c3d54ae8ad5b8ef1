use crate::coords::{Rect, Vec2};

/// A simple polygon given by its boundary vertices.
///
/// Winding order is not significant; containment uses ray casting, area uses
/// the absolute shoelace value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// Regular polygon approximating a circle. `segments` is clamped to a
    /// minimum of 8 so thin radii still produce a usable boundary.
    pub fn circle(center: Vec2, radius: f32, segments: usize) -> Self {
        let n = segments.max(8);
        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let theta = (i as f32 / n as f32) * core::f32::consts::TAU;
            points.push(Vec2::new(
                center.x + radius * theta.cos(),
                center.y + radius * theta.sin(),
            ));
        }
        Self { points }
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self { points: rect.normalized().corners().to_vec() }
    }

    #[inline]
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }

    /// Ray-casting point-in-polygon test. Degenerate polygons contain nothing.
    pub fn contains(&self, p: Vec2) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) {
                let intersect_x = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
                if p.x < intersect_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Shoelace area (positive regardless of winding).
    pub fn area(&self) -> f32 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area.abs() / 2.0
    }

    /// Axis-aligned bounding box, or `None` for degenerate polygons.
    pub fn bounds(&self) -> Option<Rect> {
        if self.is_degenerate() {
            return None;
        }
        let mut min = self.points[0];
        let mut max = self.points[0];
        for p in &self.points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Rect::new(min.x, min.y, max.x - min.x, max.y - min.y))
    }

    /// True if every corner of `rect`, and its center, lies inside.
    pub fn contains_rect(&self, rect: Rect) -> bool {
        rect.corners().iter().all(|&c| self.contains(c)) && self.contains(rect.center())
    }
}
