//! CPU expansion of particles into triangle vertices.

use crate::{
    orient_vertex, sample_particle, EffectParameters, EmissionInputs, OrientationInputs,
    OrientationStrategy,
};
use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Vertex limit of one geometry expansion pass.
pub const MAX_GEOMETRY_VERTICES: u32 = 1023;

/// Vertices emitted per particle.
pub const VERTICES_PER_PRIMITIVE: u32 = 3;

/// One triangle per particle: (corner offset, uv). It circumscribes the unit
/// quad with its centroid at the origin; uv outside 0..1 is cut by the material.
pub const PARTICLE_CORNERS: [(Vec2, Vec2); VERTICES_PER_PRIMITIVE as usize] = [
    (Vec2::new(-1.5, -0.5), Vec2::new(-1.0, 0.0)),
    (Vec2::new(1.5, -0.5), Vec2::new(2.0, 0.0)),
    (Vec2::new(0.0, 1.0), Vec2::new(0.5, 1.5)),
];

/// Particle vertex for GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    /// RGB from the color ramp, A from the fade.
    pub color: [f32; 4],
    pub life: f32,
    pub texture_frame: u32,
}

/// Number of particles that fit in one expansion pass.
pub fn visible_particle_count(params: &EffectParameters) -> u32 {
    params
        .particle_count
        .min(MAX_GEOMETRY_VERTICES / VERTICES_PER_PRIMITIVE)
}

/// Expand every visible particle of an effect at `time` into one triangle each.
/// The result never exceeds `MAX_GEOMETRY_VERTICES`.
pub fn build_particle_vertices(
    params: &EffectParameters,
    time: f32,
    emission: &EmissionInputs<'_>,
    strategy: OrientationStrategy,
    orientation: &OrientationInputs,
) -> Vec<ParticleVertex> {
    let count = visible_particle_count(params);
    let mut vertices = Vec::with_capacity(count as usize * PARTICLE_CORNERS.len());
    for index in 0..count {
        let p = sample_particle(index, time, params, emission);
        let color = p.color.extend(p.alpha).to_array();
        for (corner, uv) in PARTICLE_CORNERS {
            let offset = corner * params.billboard_size;
            let position = orient_vertex(strategy, offset, p.position, p.scale, orientation);
            vertices.push(ParticleVertex {
                position: position.to_array(),
                uv: uv.to_array(),
                color,
                life: p.life,
                texture_frame: p.texture_frame,
            });
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatDepth;
    use glam::Vec3;

    #[test]
    fn vertex_budget_caps_particles() {
        let mut p = EffectParameters::default();
        assert_eq!(visible_particle_count(&p), 100);
        p.particle_count = 5000;
        assert_eq!(visible_particle_count(&p), 341);
    }

    #[test]
    fn vertex_budget_holds_for_large_counts() {
        let depth = FlatDepth::default();
        let emission = EmissionInputs {
            reference_position: None,
            depth: &depth,
        };
        for count in [340, 341, 342, 5000] {
            let params = EffectParameters {
                particle_count: count,
                ..Default::default()
            };
            let vertices = build_particle_vertices(
                &params,
                2.0,
                &emission,
                OrientationStrategy::Free,
                &OrientationInputs::default(),
            );
            assert!(vertices.len() <= MAX_GEOMETRY_VERTICES as usize, "{} particles", count);
        }
    }

    #[test]
    fn triangles_center_on_particle() {
        let depth = FlatDepth::default();
        let params = EffectParameters {
            particle_count: 3,
            ..Default::default()
        };
        let emission = EmissionInputs {
            reference_position: None,
            depth: &depth,
        };
        let vertices = build_particle_vertices(
            &params,
            1.25,
            &emission,
            OrientationStrategy::Free,
            &OrientationInputs::default(),
        );
        assert_eq!(vertices.len(), 9);

        let sample = sample_particle(1, 1.25, &params, &emission);
        let triangle = &vertices[3..6];
        let center = triangle
            .iter()
            .map(|v| Vec3::from_array(v.position))
            .sum::<Vec3>()
            / 3.0;
        assert!((center - sample.position).length() < 1e-4);
        assert!(triangle.iter().all(|v| (v.color[3] - sample.alpha).abs() < 1e-6));
    }

    #[test]
    fn vertex_is_plain_old_data() {
        let v = ParticleVertex::zeroed();
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), std::mem::size_of::<ParticleVertex>());
        assert_eq!(std::mem::size_of::<ParticleVertex>(), 44);
    }
}
