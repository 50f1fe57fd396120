//! Mirror math for the water plane: planes, the mirrored camera and clip planes.

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::camera::{FlyCamera, WORLD_UP};

/// A plane `normal . x + d = 0`. Points with a positive signed distance lie on the kept side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    #[must_use]
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    /// Plane through `point` with the given normal.
    #[must_use]
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            d: -point.dot(normal),
        }
    }

    #[must_use]
    pub fn from_vec4(v: Vec4) -> Self {
        Self {
            normal: v.truncate(),
            d: v.w,
        }
    }

    #[must_use]
    pub fn as_vec4(&self) -> Vec4 {
        self.normal.extend(self.d)
    }

    /// Scales the plane so its normal has unit length.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let length = self.normal.length();
        if length <= f32::EPSILON {
            return *self;
        }
        Self {
            normal: self.normal / length,
            d: self.d / length,
        }
    }

    #[must_use]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    /// Transforms the plane by `m` (points map as `m * p`), using the inverse transpose.
    ///
    /// The result is left unnormalized so it stays exact in homogeneous clip space.
    #[must_use]
    pub fn transformed(&self, m: Mat4) -> Vec4 {
        m.inverse().transpose() * self.as_vec4()
    }
}

/// Horizontal water plane at `height`, facing up.
#[must_use]
pub fn water_plane(height: f32) -> Plane {
    Plane::new(WORLD_UP, -height)
}

/// Reflects `v` about a plane with unit normal `n`.
#[must_use]
pub fn reflect_direction(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Affine mirror across the plane through `plane_point` with normal `plane_normal`:
/// `p' = p - 2 (n·p + d) n`.
#[must_use]
pub fn reflection_matrix(plane_point: Vec3, plane_normal: Vec3) -> Mat4 {
    let n = plane_normal.normalize();
    let d = -plane_point.dot(n);
    // Householder reflection I - 2nnᵀ
    let linear = Mat3::IDENTITY - Mat3::from_cols(n * (2.0 * n.x), n * (2.0 * n.y), n * (2.0 * n.z));
    Mat4::from_cols(
        linear.x_axis.extend(0.0),
        linear.y_axis.extend(0.0),
        linear.z_axis.extend(0.0),
        (n * (-2.0 * d)).extend(1.0),
    )
}

/// Mirror matrix about the water plane at `height`.
#[must_use]
pub fn water_reflection_matrix(height: f32) -> Mat4 {
    reflection_matrix(Vec3::new(0.0, height, 0.0), WORLD_UP)
}

/// Everything the reflection pass and the water composite need about the mirrored view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionView {
    /// Camera mirrored below the water plane.
    pub camera: FlyCamera,
    pub view: Mat4,
    pub projection: Mat4,
    /// `projection * view`, handed to the water shader for projective lookups.
    pub view_projection: Mat4,
    /// The water plane in world space.
    pub world_plane: Plane,
    /// The water plane in the reflection camera's clip space.
    pub clip_plane: Vec4,
}

impl ReflectionView {
    /// Mirrors `camera` about the water plane and builds its matrices and clip plane.
    #[must_use]
    pub fn compute(
        camera: &FlyCamera,
        water_height: f32,
        aspect: f32,
        fov_y: f32,
        near: f32,
        far: f32,
    ) -> Self {
        let mirrored = camera.mirrored(water_height);
        let view = mirrored.view_matrix();
        let projection = FlyCamera::projection_matrix(fov_y, aspect, near, far);
        let view_projection = projection * view;
        let world_plane = water_plane(water_height);
        let clip_plane = world_plane.transformed(view_projection);

        Self {
            camera: mirrored,
            view,
            projection,
            view_projection,
            world_plane,
            clip_plane,
        }
    }

    /// Signed clip-plane distance of a world-space point as seen by the reflection camera.
    #[must_use]
    pub fn clip_distance(&self, world_point: Vec3) -> f32 {
        self.clip_plane
            .dot(self.view_projection * world_point.extend(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_through_origin_flips_y() {
        let mirrored = reflection_matrix(Vec3::ZERO, Vec3::Y).transform_point3(Vec3::new(1.0, 2.0, 3.0));
        assert!(mirrored.abs_diff_eq(Vec3::new(1.0, -2.0, 3.0), 1e-6));
    }

    #[test]
    fn test_mirror_tilted_plane() {
        let normal = Vec3::new(1.0, 1.0, 0.0);
        let mat = reflection_matrix(Vec3::ZERO, normal);
        let mirrored = mat.transform_point3(Vec3::new(1.0, 1.0, 5.0));
        assert!(mirrored.abs_diff_eq(Vec3::new(-1.0, -1.0, 5.0), 1e-5));
        // directions in the plane are unchanged
        let along = mat.transform_vector3(Vec3::new(1.0, -1.0, 0.0));
        assert!(along.abs_diff_eq(Vec3::new(1.0, -1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_water_reflection_at_height() {
        let mat = water_reflection_matrix(24.0);
        let reflected = mat.transform_point3(Vec3::new(-200.0, 50.0, 0.0));
        assert!((reflected.y - (-2.0)).abs() < 0.001);
    }

    #[test]
    fn test_mirroring_twice_is_identity() {
        let mat = reflection_matrix(Vec3::new(3.0, 7.0, -2.0), Vec3::new(0.2, 1.0, 0.4));
        assert!((mat * mat).abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn test_reflect_direction() {
        let v = Vec3::new(1.0, -1.0, 0.0).normalize();
        let r = reflect_direction(v, Vec3::Y);
        assert!(r.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0).normalize(), 1e-6));
    }

    #[test]
    fn test_plane_signed_distance() {
        let plane = water_plane(24.0);
        assert!((plane.signed_distance(Vec3::new(3.0, 30.0, -1.0)) - 6.0).abs() < 1e-6);
        assert!(plane.signed_distance(Vec3::new(0.0, 10.0, 0.0)) < 0.0);
    }

    #[test]
    fn test_plane_normalized() {
        let plane = Plane::new(Vec3::new(0.0, 2.0, 0.0), -48.0).normalized();
        assert_eq!(plane, water_plane(24.0));
    }

    #[test]
    fn test_scenario_start_position() {
        let camera = FlyCamera::new(Vec3::new(-200.0, 50.0, 0.0), Vec3::X).unwrap();
        let view = ReflectionView::compute(
            &camera,
            24.0,
            16.0 / 9.0,
            std::f32::consts::FRAC_PI_2,
            0.1,
            1000.0,
        );
        assert!(view
            .camera
            .position()
            .abs_diff_eq(Vec3::new(-200.0, -2.0, 0.0), 1e-5));
        assert!(view.camera.forward().abs_diff_eq(Vec3::X, 1e-6));
        assert_eq!(view.world_plane.as_vec4(), Vec4::new(0.0, 1.0, 0.0, -24.0));
    }

    #[test]
    fn test_clip_plane_keeps_geometry_above_water() {
        let camera = FlyCamera::new(Vec3::new(-200.0, 50.0, 0.0), Vec3::X).unwrap();
        let view = ReflectionView::compute(&camera, 24.0, 1.5, 1.2, 0.1, 1000.0);

        // Sign of the clip-space distance matches the world-space side
        let above = Vec3::new(0.0, 40.0, 10.0);
        let below = Vec3::new(0.0, 5.0, 10.0);
        assert!(view.clip_distance(above) > 0.0);
        assert!(view.clip_distance(below) < 0.0);

        // Magnitude is preserved as well
        let expected = view.world_plane.signed_distance(above);
        assert!((view.clip_distance(above) - expected).abs() < 1e-2);
    }

    #[test]
    fn test_clip_plane_roundtrip() {
        let camera = FlyCamera::new(Vec3::new(10.0, 70.0, -5.0), Vec3::new(1.0, -0.4, 0.3)).unwrap();
        let view = ReflectionView::compute(&camera, 24.0, 1.0, 1.0, 0.1, 1000.0);
        let back = view.view_projection.transpose() * view.clip_plane;
        assert!(back.abs_diff_eq(view.world_plane.as_vec4(), 1e-2));
    }
}
