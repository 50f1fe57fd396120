//! Loading scene assets from disk, with procedural stand-ins for anything not given.

use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use lakeview_core::model::{MeshPart, Model, ShaderKind, TerrainMesh, TerrainVertex};
use lakeview_render::texture::ImageData;
use lakeview_render::SceneAssets;

use crate::args::Args;
use crate::error::{AppError, AppResult};

/// Sky face file stems in cube layer order (+X, -X, +Y, -Y, +Z, -Z).
pub const SKY_FACE_NAMES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

const SKY_FACE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Half the side length of the procedural terrain.
pub const TERRAIN_EXTENT: f32 = 400.0;
/// Samples per side of the procedural terrain.
pub const TERRAIN_RESOLUTION: u32 = 97;

const PROCEDURAL_MAP_SIZE: u32 = 128;
const PROCEDURAL_SKY_SIZE: u32 = 64;

/// Loads every asset named on the command line; unnamed ones are generated.
pub fn load_assets(args: &Args) -> AppResult<SceneAssets> {
    let terrain = match &args.terrain {
        Some(path) => load_terrain(path)?,
        None => {
            log::info!("no terrain given, generating a procedural basin");
            procedural_terrain()?
        }
    };
    let water_offset_map = match &args.water_dudv {
        Some(path) => load_image(path)?,
        None => procedural_offset_map(PROCEDURAL_MAP_SIZE),
    };
    let water_normal_map = match &args.water_normal {
        Some(path) => load_image(path)?,
        None => procedural_normal_map(PROCEDURAL_MAP_SIZE),
    };
    let sky_faces = match &args.sky {
        Some(dir) => load_sky(dir)?,
        None => procedural_sky(PROCEDURAL_SKY_SIZE),
    };

    Ok(SceneAssets {
        terrain,
        water_offset_map,
        water_normal_map,
        sky_faces,
    })
}

/// Loads a Wavefront OBJ terrain. Every object becomes one mesh part drawn lit;
/// objects without normals get smooth normals computed from their faces.
pub fn load_terrain(path: &Path) -> AppResult<TerrainMesh> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| AppError::Terrain {
        path: path.display().to_string(),
        source,
    })?;

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut parts = Vec::with_capacity(models.len());

    for model in models {
        let mesh = model.mesh;
        let base = vertices.len();
        let vertex_offset = u32::try_from(base)
            .map_err(|_| AppError::InvalidAsset(format!("{}: too many vertices", path.display())))?;
        let first_index = indices.len();

        let has_normals = mesh.normals.len() == mesh.positions.len();
        for (i, p) in mesh.positions.chunks_exact(3).enumerate() {
            let normal = if has_normals {
                [mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2]]
            } else {
                [0.0; 3]
            };
            vertices.push(TerrainVertex {
                position: [p[0], p[1], p[2]],
                normal,
            });
        }
        indices.extend(mesh.indices.iter().map(|i| i + vertex_offset));
        if !has_normals {
            compute_normals(&mut vertices[base..], &mesh.indices);
        }

        let range = u32::try_from(first_index)
            .ok()
            .zip(u32::try_from(indices.len()).ok())
            .ok_or_else(|| AppError::InvalidAsset(format!("{}: too many indices", path.display())))?;
        log::debug!(
            "terrain object '{}': {} vertices, {} triangles",
            model.name,
            mesh.positions.len() / 3,
            mesh.indices.len() / 3
        );
        parts.push(MeshPart {
            name: model.name,
            indices: range.0..range.1,
            shader: ShaderKind::Lit,
        });
    }

    let mesh = TerrainMesh::new(vertices, indices, Model::new(parts))?;
    log::info!(
        "loaded terrain {}: {} vertices, {} parts",
        path.display(),
        mesh.vertices.len(),
        mesh.model.parts().len()
    );
    Ok(mesh)
}

/// Area-weighted smooth normals. `indices` are local to `vertices`.
fn compute_normals(vertices: &mut [TerrainVertex], indices: &[u32]) {
    let mut sums = vec![Vec3::ZERO; vertices.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
            continue;
        }
        let pa = Vec3::from(vertices[a].position);
        let pb = Vec3::from(vertices[b].position);
        let pc = Vec3::from(vertices[c].position);
        let face = (pb - pa).cross(pc - pa);
        sums[a] += face;
        sums[b] += face;
        sums[c] += face;
    }
    for (vertex, sum) in vertices.iter_mut().zip(sums) {
        vertex.normal = sum.try_normalize().unwrap_or(Vec3::Y).into();
    }
}

/// Height of the procedural terrain: a basin under the water ringed by hills.
#[must_use]
pub fn terrain_height(x: f32, z: f32) -> f32 {
    let r = Vec2::new(x, z).length() / TERRAIN_EXTENT;
    let t = ((r - 0.3) / 0.65).clamp(0.0, 1.0);
    let rim = t * t * (3.0 - 2.0 * t);
    let bumps = 4.0 * (x * 0.021).sin() * (z * 0.017).cos() + 2.5 * ((x + z) * 0.043).sin();
    -12.0 + 120.0 * rim + bumps * (0.3 + rim)
}

/// Terrain built from [`terrain_height`] on a regular grid.
pub fn procedural_terrain() -> AppResult<TerrainMesh> {
    let n = TERRAIN_RESOLUTION;
    let step = 2.0 * TERRAIN_EXTENT / (n - 1) as f32;

    let mut vertices = Vec::with_capacity((n * n) as usize);
    for row in 0..n {
        for col in 0..n {
            let x = -TERRAIN_EXTENT + col as f32 * step;
            let z = -TERRAIN_EXTENT + row as f32 * step;
            vertices.push(TerrainVertex {
                position: [x, terrain_height(x, z), z],
                normal: [0.0, 1.0, 0.0],
            });
        }
    }

    let mut indices = Vec::with_capacity(((n - 1) * (n - 1) * 6) as usize);
    for row in 0..n - 1 {
        for col in 0..n - 1 {
            let i = row * n + col;
            // counter-clockwise seen from above
            indices.extend_from_slice(&[i, i + n, i + 1, i + 1, i + n, i + n + 1]);
        }
    }
    compute_normals(&mut vertices, &indices);

    Ok(TerrainMesh::single_part("procedural terrain", vertices, indices)?)
}

/// Loads any image format the `image` crate reads, as RGBA8.
pub fn load_image(path: &Path) -> AppResult<ImageData> {
    let image = image::open(path).map_err(|source| AppError::Image {
        path: path.display().to_string(),
        source,
    })?;
    log::debug!("loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(ImageData::from_image(&image))
}

/// Loads the six sky faces from `dir`. Faces must be square and equally sized.
pub fn load_sky(dir: &Path) -> AppResult<[ImageData; 6]> {
    let mut faces = Vec::with_capacity(6);
    for name in SKY_FACE_NAMES {
        let path = find_face(dir, name).ok_or_else(|| {
            AppError::InvalidAsset(format!("sky face '{name}' not found in {}", dir.display()))
        })?;
        faces.push(load_image(&path)?);
    }

    let size = faces[0].width;
    if faces.iter().any(|f| f.width != size || f.height != size) {
        return Err(AppError::InvalidAsset(format!(
            "sky faces in {} must be square and equally sized",
            dir.display()
        )));
    }
    faces
        .try_into()
        .map_err(|_| AppError::InvalidAsset("expected six sky faces".to_string()))
}

fn find_face(dir: &Path, name: &str) -> Option<PathBuf> {
    SKY_FACE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|path| path.is_file())
}

fn unit_to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Tileable DUDV map: red and green swirl around 0.5.
#[must_use]
pub fn procedural_offset_map(size: u32) -> ImageData {
    let n = size as f32;
    ImageData::from_fn(size, size, |x, y| {
        let u = x as f32 / n;
        let v = y as f32 / n;
        let du = 0.5 * (TAU * (2.0 * u + 3.0 * v)).sin() + 0.3 * (TAU * (5.0 * u - v)).cos();
        let dv = 0.5 * (TAU * (3.0 * u - 2.0 * v)).cos() + 0.3 * (TAU * (u + 4.0 * v)).sin();
        [
            unit_to_byte(0.5 + 0.5 * du / 0.8),
            unit_to_byte(0.5 + 0.5 * dv / 0.8),
            0,
            255,
        ]
    })
}

/// Tileable normal map of gentle ripples. Red holds x, green holds z and blue
/// holds the up component, each mapped from [-1, 1] to [0, 1].
#[must_use]
pub fn procedural_normal_map(size: u32) -> ImageData {
    let n = size as f32;
    ImageData::from_fn(size, size, |x, y| {
        let u = x as f32 / n;
        let v = y as f32 / n;
        let dhdu = 0.6 * (TAU * (3.0 * u + v)).cos() + 0.4 * (TAU * (u - 4.0 * v)).cos();
        let dhdv = 0.2 * (TAU * (3.0 * u + v)).cos() - 0.6 * (TAU * (u - 4.0 * v)).cos();
        let normal = Vec3::new(-dhdu, 1.0, -dhdv).normalize();
        [
            unit_to_byte(normal.x * 0.5 + 0.5),
            unit_to_byte(normal.z * 0.5 + 0.5),
            unit_to_byte(normal.y * 0.5 + 0.5),
            255,
        ]
    })
}

/// Direction through texel (`x`, `y`) of cube `face`, using the usual cube map
/// orientation (faces seen from inside, rows running down).
#[must_use]
pub fn cube_face_direction(face: usize, x: u32, y: u32, size: u32) -> Vec3 {
    let u = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
    let v = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;
    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };
    dir.normalize()
}

/// Sky fading from a pale horizon to a deep zenith, with dark ground below.
#[must_use]
pub fn procedural_sky(size: u32) -> [ImageData; 6] {
    let horizon = Vec3::new(0.78, 0.86, 0.95);
    let zenith = Vec3::new(0.25, 0.45, 0.82);
    let ground = Vec3::new(0.32, 0.36, 0.34);

    std::array::from_fn(|face| {
        ImageData::from_fn(size, size, |x, y| {
            let up = cube_face_direction(face, x, y, size).y;
            let color = if up >= 0.0 {
                horizon.lerp(zenith, up.sqrt())
            } else {
                horizon.lerp(ground, (-up * 4.0).min(1.0))
            };
            [
                unit_to_byte(color.x),
                unit_to_byte(color.y),
                unit_to_byte(color.z),
                255,
            ]
        })
    })
}
