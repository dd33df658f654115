use crate::AssetError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Content-addressed mesh id, derived from the mesh name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshHandle(pub u64);

impl MeshHandle {
    pub fn for_name(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        MeshHandle(u64::from_le_bytes(bytes))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Triangle list geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// +Y, or +Z when the normal is (nearly) vertical.
fn default_up(normal: Vec3) -> Vec3 {
    if normal.normalize_or_zero().y.abs() > 0.999 {
        Vec3::Z
    } else {
        Vec3::Y
    }
}

/// Parameters for a subdivided plane mesh.
///
/// The plane is the set of points `p` with `normal · p + distance = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneDesc {
    pub normal: Vec3,
    pub distance: f32,
    pub width: f32,
    pub height: f32,
    pub x_segments: u32,
    pub y_segments: u32,
    /// Emit the plane normal per vertex; zero normals otherwise.
    pub normals: bool,
    pub u_tile: f32,
    pub v_tile: f32,
    /// Direction of the plane's local Y axis. Projected onto the plane.
    pub up: Vec3,
}

impl PlaneDesc {
    pub fn new(normal: Vec3, distance: f32, width: f32, height: f32) -> Self {
        Self {
            normal,
            distance,
            width,
            height,
            x_segments: 1,
            y_segments: 1,
            normals: true,
            u_tile: 1.0,
            v_tile: 1.0,
            up: default_up(normal),
        }
    }

    pub fn segments(mut self, x: u32, y: u32) -> Self {
        self.x_segments = x;
        self.y_segments = y;
        self
    }

    pub fn tiling(mut self, u: f32, v: f32) -> Self {
        self.u_tile = u;
        self.v_tile = v;
        self
    }

    pub fn up(mut self, up: Vec3) -> Self {
        self.up = up;
        self
    }
}

/// Build a plane mesh. Triangles wind counter-clockwise seen from the
/// normal side.
pub fn build_plane(name: &str, desc: &PlaneDesc) -> Result<MeshData, AssetError> {
    if desc.x_segments == 0 || desc.y_segments == 0 {
        return Err(AssetError::InvalidPlane("segment counts must be non-zero"));
    }
    if !(desc.width > 0.0 && desc.height > 0.0) {
        return Err(AssetError::InvalidPlane("width and height must be positive"));
    }
    let normal = desc
        .normal
        .try_normalize()
        .ok_or(AssetError::InvalidPlane("normal must be non-zero"))?;
    let y_axis = (desc.up - normal * desc.up.dot(normal))
        .try_normalize()
        .ok_or(AssetError::InvalidPlane("up vector is parallel to the normal"))?;
    // (x, y, normal) is right-handed.
    let x_axis = y_axis.cross(normal);
    let origin = normal * -desc.distance;

    let xs = desc.x_segments;
    let ys = desc.y_segments;
    let x_step = desc.width / xs as f32;
    let y_step = desc.height / ys as f32;
    let half_w = desc.width * 0.5;
    let half_h = desc.height * 0.5;
    let vertex_normal = if desc.normals { normal } else { Vec3::ZERO };

    let mut vertices = Vec::with_capacity(((xs + 1) * (ys + 1)) as usize);
    for y in 0..=ys {
        for x in 0..=xs {
            let lx = x as f32 * x_step - half_w;
            let ly = y as f32 * y_step - half_h;
            let p = origin + x_axis * lx + y_axis * ly;
            vertices.push(MeshVertex {
                position: p.to_array(),
                normal: vertex_normal.to_array(),
                uv: [
                    x as f32 * desc.u_tile / xs as f32,
                    (ys - y) as f32 * desc.v_tile / ys as f32,
                ],
            });
        }
    }

    let row = xs + 1;
    let mut indices = Vec::with_capacity((xs * ys * 6) as usize);
    for y in 0..ys {
        for x in 0..xs {
            let i0 = y * row + x;
            let i1 = i0 + 1;
            let i2 = i0 + row + 1;
            let i3 = i0 + row;
            indices.extend_from_slice(&[i0, i1, i2, i0, i2, i3]);
        }
    }

    tracing::debug!(
        "built plane '{}' ({} vertices, {} triangles)",
        name,
        vertices.len(),
        indices.len() / 3
    );

    Ok(MeshData {
        name: name.to_string(),
        vertices,
        indices,
    })
}

/// Build an axis-aligned box centred on the origin.
pub fn build_box(name: &str, half_extents: Vec3) -> MeshData {
    let (hx, hy, hz) = (half_extents.x, half_extents.y, half_extents.z);
    // Each face: normal, then four corners counter-clockwise seen from outside.
    #[rustfmt::skip]
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        ([0.0, 0.0, 1.0],  [[-hx, -hy,  hz], [ hx, -hy,  hz], [ hx,  hy,  hz], [-hx,  hy,  hz]]),
        ([0.0, 0.0, -1.0], [[ hx, -hy, -hz], [-hx, -hy, -hz], [-hx,  hy, -hz], [ hx,  hy, -hz]]),
        ([1.0, 0.0, 0.0],  [[ hx, -hy,  hz], [ hx, -hy, -hz], [ hx,  hy, -hz], [ hx,  hy,  hz]]),
        ([-1.0, 0.0, 0.0], [[-hx, -hy, -hz], [-hx, -hy,  hz], [-hx,  hy,  hz], [-hx,  hy, -hz]]),
        ([0.0, 1.0, 0.0],  [[-hx,  hy,  hz], [ hx,  hy,  hz], [ hx,  hy, -hz], [-hx,  hy, -hz]]),
        ([0.0, -1.0, 0.0], [[-hx, -hy, -hz], [ hx, -hy, -hz], [ hx, -hy,  hz], [-hx, -hy,  hz]]),
    ];
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            vertices.push(MeshVertex {
                position: *corner,
                normal,
                uv,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshData {
        name: name.to_string(),
        vertices,
        indices,
    }
}

/// Registry of meshes by content-addressed handle.
#[derive(Debug, Clone, Default)]
pub struct MeshStore {
    meshes: BTreeMap<MeshHandle, MeshData>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh under its name. Names are unique.
    pub fn register(&mut self, mesh: MeshData) -> Result<MeshHandle, AssetError> {
        let handle = MeshHandle::for_name(&mesh.name);
        if self.meshes.contains_key(&handle) {
            return Err(AssetError::DuplicateMesh(mesh.name));
        }
        tracing::debug!("registered mesh '{}' as {:?}", mesh.name, handle);
        self.meshes.insert(handle, mesh);
        Ok(handle)
    }

    /// Build and register a plane mesh.
    pub fn create_plane(&mut self, name: &str, desc: &PlaneDesc) -> Result<MeshHandle, AssetError> {
        let mesh = build_plane(name, desc)?;
        self.register(mesh)
    }

    pub fn get(&self, handle: MeshHandle) -> Option<&MeshData> {
        self.meshes.get(&handle)
    }

    /// Handle of a registered mesh by name.
    pub fn handle_of(&self, name: &str) -> Result<MeshHandle, AssetError> {
        let handle = MeshHandle::for_name(name);
        if self.meshes.contains_key(&handle) {
            Ok(handle)
        } else {
            Err(AssetError::UnknownMesh(name.to_string()))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MeshHandle, &MeshData)> {
        self.meshes.iter().map(|(h, m)| (*h, m))
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(mesh: &MeshData, tri: usize) -> Vec3 {
        let i = &mesh.indices[tri * 3..tri * 3 + 3];
        let p = |k: u32| Vec3::from_array(mesh.vertices[k as usize].position);
        (p(i[1]) - p(i[0])).cross(p(i[2]) - p(i[0]))
    }

    fn ground_desc() -> PlaneDesc {
        PlaneDesc::new(Vec3::Y, 0.0, 1500.0, 1500.0)
            .segments(20, 20)
            .tiling(5.0, 5.0)
            .up(Vec3::Z)
    }

    #[test]
    fn plane_counts() {
        let mesh = build_plane("ground", &ground_desc()).unwrap();
        assert_eq!(mesh.vertices.len(), 21 * 21);
        assert_eq!(mesh.triangle_count(), 20 * 20 * 2);
    }

    #[test]
    fn plane_lies_on_plane_and_spans_size() {
        let mesh = build_plane("ground", &ground_desc()).unwrap();
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for v in &mesh.vertices {
            let p = Vec3::from_array(v.position);
            assert!(p.y.abs() < 1e-3);
            min = min.min(p);
            max = max.max(p);
        }
        assert!((max.x - min.x - 1500.0).abs() < 1e-2);
        assert!((max.z - min.z - 1500.0).abs() < 1e-2);
    }

    #[test]
    fn plane_offset_by_distance() {
        let desc = PlaneDesc::new(Vec3::Y, -10.0, 2.0, 2.0).up(Vec3::Z);
        let mesh = build_plane("raised", &desc).unwrap();
        for v in &mesh.vertices {
            assert!((v.position[1] - 10.0).abs() < 1e-4);
        }
    }

    #[test]
    fn default_up_avoids_the_normal() {
        let floor = PlaneDesc::new(Vec3::Y, -10.0, 2.0, 2.0);
        assert_eq!(floor.up, Vec3::Z);
        let mesh = build_plane("floor", &floor).unwrap();
        assert!(mesh.vertices.iter().all(|v| (v.position[1] - 10.0).abs() < 1e-4));

        let ceiling = PlaneDesc::new(Vec3::NEG_Y, 0.0, 2.0, 2.0);
        assert!(build_plane("ceiling", &ceiling).is_ok());

        let wall = PlaneDesc::new(Vec3::X, 0.0, 2.0, 2.0);
        assert_eq!(wall.up, Vec3::Y);
        assert!(build_plane("wall", &wall).is_ok());
    }

    #[test]
    fn plane_winds_toward_normal() {
        let mesh = build_plane("ground", &ground_desc()).unwrap();
        for tri in 0..mesh.triangle_count() {
            assert!(face_normal(&mesh, tri).dot(Vec3::Y) > 0.0);
        }
    }

    #[test]
    fn plane_tiling_reaches_tile_count() {
        let mesh = build_plane("ground", &ground_desc()).unwrap();
        let max_u = mesh.vertices.iter().map(|v| v.uv[0]).fold(0.0, f32::max);
        let max_v = mesh.vertices.iter().map(|v| v.uv[1]).fold(0.0, f32::max);
        assert!((max_u - 5.0).abs() < 1e-4);
        assert!((max_v - 5.0).abs() < 1e-4);
    }

    #[test]
    fn plane_without_normals() {
        let mut desc = ground_desc();
        desc.normals = false;
        let mesh = build_plane("flat", &desc).unwrap();
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0; 3]));
    }

    #[test]
    fn plane_rejects_bad_input() {
        let parallel = PlaneDesc::new(Vec3::Y, 0.0, 1.0, 1.0).up(Vec3::Y);
        assert!(matches!(
            build_plane("p", &parallel),
            Err(AssetError::InvalidPlane(_))
        ));
        let no_segments = PlaneDesc::new(Vec3::Y, 0.0, 1.0, 1.0).up(Vec3::Z).segments(0, 4);
        assert!(build_plane("p", &no_segments).is_err());
        let flat = PlaneDesc::new(Vec3::Y, 0.0, 0.0, 1.0).up(Vec3::Z);
        assert!(build_plane("p", &flat).is_err());
        let zero = PlaneDesc::new(Vec3::ZERO, 0.0, 1.0, 1.0);
        assert!(build_plane("p", &zero).is_err());
    }

    #[test]
    fn box_faces_point_outward() {
        let mesh = build_box("box", Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for tri in 0..mesh.triangle_count() {
            let i = mesh.indices[tri * 3] as usize;
            let n = Vec3::from_array(mesh.vertices[i].normal);
            assert!(face_normal(&mesh, tri).dot(n) > 0.0);
        }
    }

    #[test]
    fn store_is_content_addressed_by_name() {
        let mut store = MeshStore::new();
        let h = store.register(build_box("penguin.mesh", Vec3::ONE)).unwrap();
        assert_eq!(h, MeshHandle::for_name("penguin.mesh"));
        assert_eq!(store.handle_of("penguin.mesh").unwrap(), h);
        assert!(store.get(h).is_some());
    }

    #[test]
    fn store_rejects_duplicates_and_unknowns() {
        let mut store = MeshStore::new();
        store.create_plane("ground", &ground_desc()).unwrap();
        assert!(matches!(
            store.create_plane("ground", &ground_desc()),
            Err(AssetError::DuplicateMesh(_))
        ));
        assert!(matches!(
            store.handle_of("missing"),
            Err(AssetError::UnknownMesh(_))
        ));
        assert_eq!(store.len(), 1);
    }
}
