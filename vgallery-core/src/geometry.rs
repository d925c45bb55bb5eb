//! Ray and bounding-volume helpers used by camera picking and proximity checks.

use glam::{Quat, Vec3};

/// Half-line starting at `origin` heading along the normalized `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize_or_zero() }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Distance to the first intersection with a sphere, if any.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let to_center = center - self.origin;
        let along = to_center.dot(self.direction);
        let closest_sq = to_center.length_squared() - along * along;
        let radius_sq = radius * radius;
        if closest_sq > radius_sq {
            return None;
        }
        let half_chord = (radius_sq - closest_sq).sqrt();
        let near = along - half_chord;
        let far = along + half_chord;
        if far < 0.0 {
            None
        } else {
            Some(near.max(0.0))
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self { min: center - extents, max: center + extents }
    }

    /// Box enclosing an oriented box with the given half extents.
    pub fn from_oriented(center: Vec3, orientation: Quat, extents: Vec3) -> Self {
        let axes = [
            orientation * Vec3::X * extents.x,
            orientation * Vec3::Y * extents.y,
            orientation * Vec3::Z * extents.z,
        ];
        let reach = axes.iter().fold(Vec3::ZERO, |acc, axis| acc + axis.abs());
        Self::from_center_extents(center, reach)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Slab test. Returns the entry distance, or 0 when the origin is inside.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let inv = Vec3::new(
            if ray.direction.x != 0.0 { 1.0 / ray.direction.x } else { f32::INFINITY },
            if ray.direction.y != 0.0 { 1.0 / ray.direction.y } else { f32::INFINITY },
            if ray.direction.z != 0.0 { 1.0 / ray.direction.z } else { f32::INFINITY },
        );

        let t1 = (self.min - ray.origin) * inv;
        let t2 = (self.max - ray.origin) * inv;

        let lo = t1.min(t2);
        let hi = t1.max(t2);
        let tmin = lo.x.max(lo.y).max(lo.z);
        let tmax = hi.x.min(hi.y).min(hi.z);

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_hits_box_in_front_and_misses_box_behind() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let ahead = Aabb::from_center_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::splat(1.0));
        let behind = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 10.0), Vec3::splat(1.0));

        let hit = ahead.intersect_ray(&ray).unwrap();
        assert!((hit - 9.0).abs() < 1e-5);
        assert!(behind.intersect_ray(&ray).is_none());
    }

    #[test]
    fn ray_misses_box_to_the_side() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let side = Aabb::from_center_extents(Vec3::new(5.0, 0.0, -10.0), Vec3::splat(1.0));
        assert!(side.intersect_ray(&ray).is_none());
    }

    #[test]
    fn ray_from_inside_sphere_reports_zero() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        assert_eq!(ray.intersect_sphere(Vec3::ZERO, 2.0), Some(0.0));
        let far = ray.intersect_sphere(Vec3::new(10.0, 0.0, 0.0), 1.0).unwrap();
        assert!((far - 9.0).abs() < 1e-5);
        assert!(ray.intersect_sphere(Vec3::new(-10.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn rotated_box_grows_its_bounds() {
        let quarter = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let aabb = Aabb::from_oriented(Vec3::ZERO, quarter, Vec3::new(4.0, 1.0, 0.5));
        assert!((aabb.max.z - 4.0).abs() < 1e-4);
        assert!((aabb.max.x - 0.5).abs() < 1e-4);
    }
}
