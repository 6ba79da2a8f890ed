//! Orientation of particle quads.

use crate::BillboardMode;
use engine_core::Transform;
use glam::{Mat2, Vec2, Vec3};

/// Auxiliary axis for target-facing billboards. Scenes are authored Z-up.
pub const WORLD_UP: Vec3 = Vec3::Z;

/// Below this distance the legacy rotation has no stable direction and is skipped.
const LEGACY_MIN_DISTANCE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationStrategy {
    /// Quad stays in its local XY plane, scaled and translated only.
    Free,
    /// Quad spans the camera's right/up vectors.
    Billboard2D,
    /// Quad faces the reference target.
    Billboard3D,
    /// Quad is spun in its local plane toward the target.
    LegacyRotate,
}

impl OrientationStrategy {
    /// Orientation only engages when the target resolved (`tracking`) and the
    /// effect asked to follow it (`rotate`). Otherwise the configured mode is ignored.
    pub fn select(tracking: bool, rotate: bool, mode: BillboardMode) -> Self {
        if !(tracking && rotate) {
            return Self::Free;
        }
        match mode {
            BillboardMode::Billboard2D => Self::Billboard2D,
            BillboardMode::Billboard3D => Self::Billboard3D,
            BillboardMode::None => Self::LegacyRotate,
        }
    }
}

/// Camera right/up vectors in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub right: Vec3,
    pub up: Vec3,
}

impl Default for CameraBasis {
    fn default() -> Self {
        Self {
            right: Vec3::X,
            up: Vec3::Y,
        }
    }
}

impl CameraBasis {
    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            right: transform.right(),
            up: transform.up(),
        }
    }
}

/// Frame-wide inputs shared by every particle of an effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrientationInputs {
    pub camera: CameraBasis,
    pub target: Vec3,
}

/// Right/up basis of a quad at `position` facing `target`.
pub fn target_basis(position: Vec3, target: Vec3) -> (Vec3, Vec3) {
    let to_target = (target - position).normalize_or_zero();
    if to_target == Vec3::ZERO {
        return (Vec3::X, Vec3::Y);
    }
    let mut right = WORLD_UP.cross(to_target).normalize_or_zero();
    if right == Vec3::ZERO {
        // Target straight above or below.
        right = Vec3::X;
    }
    let up = to_target.cross(right).normalize_or_zero();
    (right, up)
}

/// In-plane rotation turning a quad toward the target.
pub fn legacy_rotation(position: Vec3, target: Vec3) -> Mat2 {
    let to_target = target - position;
    if to_target.length() <= LEGACY_MIN_DISTANCE {
        return Mat2::IDENTITY;
    }
    let dir = to_target.normalize();
    let angle = dir.x.atan2(dir.y);
    let (sin, cos) = angle.sin_cos();
    Mat2::from_cols(Vec2::new(cos, -sin), Vec2::new(sin, cos))
}

/// World position of a quad corner `offset` for a particle at `position`.
pub fn orient_vertex(
    strategy: OrientationStrategy,
    offset: Vec2,
    position: Vec3,
    scale: f32,
    inputs: &OrientationInputs,
) -> Vec3 {
    let scaled = offset * scale;
    match strategy {
        OrientationStrategy::Free => position + scaled.extend(0.0),
        OrientationStrategy::Billboard2D => {
            position + inputs.camera.right * scaled.x + inputs.camera.up * scaled.y
        }
        OrientationStrategy::Billboard3D => {
            let (right, up) = target_basis(position, inputs.target);
            position + right * scaled.x + up * scaled.y
        }
        OrientationStrategy::LegacyRotate => {
            position + (legacy_rotation(position, inputs.target) * scaled).extend(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn selection_tie_breaks() {
        use BillboardMode::*;
        use OrientationStrategy as S;
        assert_eq!(S::select(false, true, Billboard2D), S::Free);
        assert_eq!(S::select(true, false, Billboard3D), S::Free);
        assert_eq!(S::select(true, true, Billboard2D), S::Billboard2D);
        assert_eq!(S::select(true, true, Billboard3D), S::Billboard3D);
        assert_eq!(S::select(true, true, None), S::LegacyRotate);
    }

    #[test]
    fn free_scales_and_translates() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        let v = orient_vertex(OrientationStrategy::Free, Vec2::new(0.5, -0.5), p, 2.0, &Default::default());
        assert!(close(v, Vec3::new(2.0, 1.0, 3.0)));
    }

    #[test]
    fn billboard_2d_uses_camera_axes() {
        let inputs = OrientationInputs {
            camera: CameraBasis {
                right: Vec3::Y,
                up: Vec3::Z,
            },
            target: Vec3::new(100.0, 0.0, 0.0),
        };
        let v = orient_vertex(OrientationStrategy::Billboard2D, Vec2::new(1.0, 1.0), Vec3::ZERO, 0.5, &inputs);
        assert!(close(v, Vec3::new(0.0, 0.5, 0.5)));
    }

    #[test]
    fn billboard_3d_is_perpendicular_to_target() {
        let position = Vec3::new(1.0, 1.0, 0.0);
        let inputs = OrientationInputs {
            target: Vec3::new(5.0, -3.0, 2.0),
            ..Default::default()
        };
        let dir = (inputs.target - position).normalize();
        for offset in [Vec2::new(0.5, 0.5), Vec2::new(-0.5, 0.5), Vec2::new(0.5, -0.5)] {
            let v = orient_vertex(OrientationStrategy::Billboard3D, offset, position, 1.0, &inputs);
            assert!((v - position).dot(dir).abs() < 1e-5);
            assert!(((v - position).length() - offset.length()).abs() < 1e-5);
        }
    }

    #[test]
    fn billboard_3d_handles_target_overhead() {
        let (right, up) = target_basis(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0));
        assert!(right.is_normalized());
        assert!(up.is_normalized());
        assert!(right.dot(up).abs() < 1e-5);
    }

    #[test]
    fn legacy_rotation_turns_toward_target() {
        // Target along +Y: no rotation.
        let m = legacy_rotation(Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0));
        assert!((m * Vec2::X - Vec2::X).length() < 1e-5);

        // Target along +X: quarter turn.
        let m = legacy_rotation(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0));
        assert!((m * Vec2::X - Vec2::new(0.0, -1.0)).length() < 1e-5);

        // Too close: identity.
        assert_eq!(legacy_rotation(Vec3::ZERO, Vec3::new(0.05, 0.0, 0.0)), Mat2::IDENTITY);
    }
}
