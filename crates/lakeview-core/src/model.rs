//! Terrain mesh data and per-part shader assignment.

use std::ops::Range;

use glam::Vec3;

use crate::error::{LakeviewError, Result};

/// Shader a mesh part is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderKind {
    /// Directional light, ambient term and distance fog.
    #[default]
    Lit,
    /// Writes normalized camera distance into the scene depth target.
    SceneDepth,
}

/// A terrain vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// A contiguous index range drawn with one shader.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub name: String,
    pub indices: Range<u32>,
    pub shader: ShaderKind,
}

/// A model made of mesh parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    parts: Vec<MeshPart>,
}

impl Model {
    #[must_use]
    pub fn new(parts: Vec<MeshPart>) -> Self {
        Self { parts }
    }

    #[must_use]
    pub fn parts(&self) -> &[MeshPart] {
        &self.parts
    }

    /// Assigns `shader` to every part until the returned guard is dropped.
    ///
    /// The previous assignment comes back on every exit path, including `?` returns.
    pub fn substitute(&mut self, shader: ShaderKind) -> ShaderSubstitution<'_> {
        let saved = self.parts.iter().map(|part| part.shader).collect();
        for part in &mut self.parts {
            part.shader = shader;
        }
        ShaderSubstitution { model: self, saved }
    }
}

/// Restores the shader of every part on drop.
#[derive(Debug)]
pub struct ShaderSubstitution<'a> {
    model: &'a mut Model,
    saved: Vec<ShaderKind>,
}

impl ShaderSubstitution<'_> {
    #[must_use]
    pub fn parts(&self) -> &[MeshPart] {
        self.model.parts()
    }
}

impl Drop for ShaderSubstitution<'_> {
    fn drop(&mut self) {
        for (part, shader) in self.model.parts.iter_mut().zip(&self.saved) {
            part.shader = *shader;
        }
    }
}

/// Indexed terrain geometry plus its part layout.
#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
    pub model: Model,
}

impl TerrainMesh {
    /// Builds a mesh, checking that every index and every part range is in bounds.
    pub fn new(vertices: Vec<TerrainVertex>, indices: Vec<u32>, model: Model) -> Result<Self> {
        if vertices.is_empty() || indices.is_empty() || indices.len() % 3 != 0 {
            return Err(LakeviewError::Config(format!(
                "terrain mesh needs whole triangles (got {} vertices, {} indices)",
                vertices.len(),
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(LakeviewError::Config(format!(
                "terrain index {bad} out of range for {} vertices",
                vertices.len()
            )));
        }
        for part in model.parts() {
            if part.indices.end as usize > indices.len() || part.indices.start > part.indices.end {
                return Err(LakeviewError::Config(format!(
                    "mesh part '{}' range {:?} exceeds {} indices",
                    part.name,
                    part.indices,
                    indices.len()
                )));
            }
        }
        Ok(Self {
            vertices,
            indices,
            model,
        })
    }

    /// A single-part mesh drawn with the lit shader.
    pub fn single_part(name: &str, vertices: Vec<TerrainVertex>, indices: Vec<u32>) -> Result<Self> {
        let count = u32::try_from(indices.len())
            .map_err(|_| LakeviewError::Config("terrain has too many indices".to_string()))?;
        let model = Model::new(vec![MeshPart {
            name: name.to_string(),
            indices: 0..count,
            shader: ShaderKind::Lit,
        }]);
        Self::new(vertices, indices, model)
    }

    /// Axis-aligned bounds of the vertices.
    #[must_use]
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), v| {
                let p = Vec3::from(v.position);
                (min.min(p), max.max(p))
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_part_model() -> Model {
        Model::new(vec![
            MeshPart {
                name: "ground".to_string(),
                indices: 0..3,
                shader: ShaderKind::Lit,
            },
            MeshPart {
                name: "rocks".to_string(),
                indices: 3..6,
                shader: ShaderKind::Lit,
            },
        ])
    }

    fn vertex(x: f32, y: f32, z: f32) -> TerrainVertex {
        TerrainVertex {
            position: [x, y, z],
            normal: [0.0, 1.0, 0.0],
        }
    }

    #[test]
    fn test_substitution_applies_and_restores() {
        let mut model = two_part_model();
        {
            let substituted = model.substitute(ShaderKind::SceneDepth);
            assert!(substituted
                .parts()
                .iter()
                .all(|p| p.shader == ShaderKind::SceneDepth));
        }
        assert!(model.parts().iter().all(|p| p.shader == ShaderKind::Lit));
    }

    #[test]
    fn test_substitution_restores_on_early_return() {
        fn draw_depth(model: &mut Model) -> std::result::Result<(), String> {
            let substituted = model.substitute(ShaderKind::SceneDepth);
            for part in substituted.parts() {
                if part.name == "rocks" {
                    return Err("device lost".to_string());
                }
            }
            Ok(())
        }

        let mut model = two_part_model();
        assert!(draw_depth(&mut model).is_err());
        assert_eq!(model, two_part_model());
    }

    #[test]
    fn test_substitution_keeps_mixed_assignments() {
        let mut model = two_part_model();
        model.parts[1].shader = ShaderKind::SceneDepth;
        let expected = model.clone();
        drop(model.substitute(ShaderKind::Lit));
        assert_eq!(model, expected);
    }

    #[test]
    fn test_mesh_validation() {
        let vertices = vec![vertex(0.0, 0.0, 0.0), vertex(1.0, 0.0, 0.0), vertex(0.0, 0.0, 1.0)];
        assert!(TerrainMesh::single_part("t", vertices.clone(), vec![0, 2, 1]).is_ok());
        assert!(TerrainMesh::single_part("t", vertices.clone(), vec![0, 2, 3]).is_err());
        assert!(TerrainMesh::single_part("t", vertices.clone(), vec![0, 2]).is_err());
        assert!(TerrainMesh::new(vertices, vec![0, 2, 1], two_part_model()).is_err());
    }

    #[test]
    fn test_bounds() {
        let mesh = TerrainMesh::single_part(
            "t",
            vec![vertex(-1.0, 2.0, 0.0), vertex(3.0, -4.0, 0.5), vertex(0.0, 0.0, 1.0)],
            vec![0, 1, 2],
        )
        .unwrap();
        let (min, max) = mesh.bounds();
        assert_eq!(min, Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(max, Vec3::new(3.0, 2.0, 1.0));
    }
}
