//! Logical face reconstruction
//!
//! The mesh only stores triangles. A pentagon or hexagon face is recovered
//! by growing a set of coplanar triangles that share vertices with the hit
//! triangle. No adjacency is precomputed; correctness rests on
//! `FACE_PLANE_TOLERANCE` matching the mesh precision.

use std::collections::BTreeSet;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::mesh::SphereMesh;
use super::polygon::PolygonKind;
use crate::consts::FACE_PLANE_TOLERANCE;

/// Stable face key: the smallest triangle index belonging to the face
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub u32);

/// A polygonal face reconstructed from coplanar triangles (sphere-local)
#[derive(Debug, Clone, PartialEq)]
pub struct MeshFace {
    pub id: FaceId,
    /// Sorted mesh vertex indices
    pub vertices: Vec<u32>,
    /// Sorted member triangle indices
    pub triangles: Vec<usize>,
    pub centroid: Vec3,
    /// Unit normal pointing away from the sphere center
    pub normal: Vec3,
    /// From the first vertex of the lowest-index member triangle to the centroid
    pub reference_edge: Vec3,
    /// `None` when the vertex count is neither 5 nor 6
    pub kind: Option<PolygonKind>,
}

impl MeshFace {
    pub fn side_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Reconstruct the face containing `triangle`.
///
/// Returns `None` for an out-of-range index or a zero-area seed triangle.
pub fn classify_face(mesh: &SphereMesh, triangle: usize) -> Option<MeshFace> {
    if triangle >= mesh.triangle_count() {
        return None;
    }
    let [a, b, c] = mesh.triangle_corners(triangle);
    let mut normal = (b - a).cross(c - a).normalize_or_zero();
    if normal == Vec3::ZERO {
        return None;
    }
    if normal.dot(a + b + c) < 0.0 {
        normal = -normal;
    }

    let triangles = mesh.triangles();
    let mut vertices: BTreeSet<u32> = triangles[triangle].iter().copied().collect();
    let mut members: BTreeSet<usize> = BTreeSet::from([triangle]);

    loop {
        let mut merged = false;
        for (tri, indices) in triangles.iter().enumerate() {
            if members.contains(&tri) || !indices.iter().any(|i| vertices.contains(i)) {
                continue;
            }
            let coplanar = indices
                .iter()
                .all(|&i| (mesh.vertex(i) - a).dot(normal).abs() <= FACE_PLANE_TOLERANCE);
            if coplanar {
                members.insert(tri);
                vertices.extend(indices.iter().copied());
                merged = true;
            }
        }
        if !merged {
            break;
        }
    }

    let centroid = vertices.iter().map(|&i| mesh.vertex(i)).sum::<Vec3>() / vertices.len() as f32;
    let first = *members.first()?;
    let reference_edge = centroid - mesh.vertex(triangles[first][0]);

    Some(MeshFace {
        id: FaceId(first as u32),
        kind: PolygonKind::from_sides(vertices.len()),
        vertices: vertices.into_iter().collect(),
        triangles: members.into_iter().collect(),
        centroid,
        normal,
        reference_edge,
    })
}

/// Every face of an immutable mesh, classified once
#[derive(Debug, Clone)]
pub struct FaceTable {
    /// Sorted by id
    faces: Vec<MeshFace>,
    /// Triangle index -> position in `faces`
    by_triangle: Vec<Option<usize>>,
}

impl FaceTable {
    pub fn build(mesh: &SphereMesh) -> Self {
        let mut faces: Vec<MeshFace> = Vec::new();
        let mut by_triangle = vec![None; mesh.triangle_count()];

        for tri in 0..mesh.triangle_count() {
            if by_triangle[tri].is_some() {
                continue;
            }
            if let Some(face) = classify_face(mesh, tri) {
                for &member in &face.triangles {
                    by_triangle[member] = Some(faces.len());
                }
                faces.push(face);
            }
        }

        let unknown = faces.iter().filter(|f| f.kind.is_none()).count();
        if unknown > 0 {
            log::warn!("{} of {} mesh faces are neither pentagons nor hexagons", unknown, faces.len());
        }
        log::debug!("Classified {} faces from {} triangles", faces.len(), mesh.triangle_count());

        Self { faces, by_triangle }
    }

    /// Face containing a triangle
    pub fn face_of(&self, triangle: usize) -> Option<&MeshFace> {
        let index = (*self.by_triangle.get(triangle)?)?;
        self.faces.get(index)
    }

    pub fn get(&self, id: FaceId) -> Option<&MeshFace> {
        self.faces
            .binary_search_by_key(&id, |f| f.id)
            .ok()
            .map(|i| &self.faces[i])
    }

    pub fn faces(&self) -> &[MeshFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MESH_RADIUS;

    fn table() -> (SphereMesh, FaceTable) {
        let mesh = SphereMesh::truncated_icosahedron(MESH_RADIUS);
        let table = FaceTable::build(&mesh);
        (mesh, table)
    }

    #[test]
    fn test_truncated_icosahedron_faces() {
        let (_, table) = table();
        assert_eq!(table.len(), 32);
        let pentagons = table
            .faces()
            .iter()
            .filter(|f| f.kind == Some(PolygonKind::Pentagon))
            .count();
        let hexagons = table
            .faces()
            .iter()
            .filter(|f| f.kind == Some(PolygonKind::Hexagon))
            .count();
        assert_eq!(pentagons, 12);
        assert_eq!(hexagons, 20);
    }

    #[test]
    fn test_vertex_count_matches_sides() {
        let (_, table) = table();
        for face in table.faces() {
            let kind = face.kind.unwrap();
            assert_eq!(face.side_count(), kind.sides());
            assert_eq!(face.triangles.len(), kind.sides() - 2);
        }
    }

    #[test]
    fn test_any_member_triangle_yields_same_face() {
        let (mesh, table) = table();
        for face in table.faces() {
            for &tri in &face.triangles {
                let again = classify_face(&mesh, tri).unwrap();
                assert_eq!(again.id, face.id);
                assert_eq!(again.vertices, face.vertices);
                assert!((again.reference_edge - face.reference_edge).length() < 1e-5);
                assert_eq!(table.face_of(tri).map(|f| f.id), Some(face.id));
            }
        }
    }

    #[test]
    fn test_face_frame_is_consistent() {
        let (_, table) = table();
        for face in table.faces() {
            assert!((face.normal.length() - 1.0).abs() < 1e-5);
            // Outward and aligned with the centroid direction
            assert!(face.normal.dot(face.centroid.normalize()) > 0.999);
            // Reference edge lies in the face plane
            assert!(face.reference_edge.dot(face.normal).abs() < 1e-3);
            assert!(face.reference_edge.length() > 0.5);
        }
    }

    #[test]
    fn test_pentagons_sit_farther_out_than_hexagons() {
        let (_, table) = table();
        let distance = |kind| {
            table
                .faces()
                .iter()
                .find(|f| f.kind == Some(kind))
                .map(|f| f.centroid.length())
                .unwrap()
        };
        assert!(distance(PolygonKind::Pentagon) > distance(PolygonKind::Hexagon));
    }

    #[test]
    fn test_get_by_id() {
        let (_, table) = table();
        for face in table.faces() {
            assert_eq!(table.get(face.id), Some(face));
        }
        assert!(table.get(FaceId(9999)).is_none());
    }

    #[test]
    fn test_non_polygon_face_is_unknown() {
        // Lone triangle: three vertices, no supported shape
        let mesh = SphereMesh::new(
            vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0)],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let face = classify_face(&mesh, 0).unwrap();
        assert_eq!(face.side_count(), 3);
        assert_eq!(face.kind, None);
        assert!(classify_face(&mesh, 1).is_none());
    }

    #[test]
    fn test_split_square_plus_apex_is_not_merged() {
        // A quad split in two triangles (coplanar) plus a tilted triangle
        let mesh = SphereMesh::new(
            vec![
                Vec3::new(-1.0, 2.0, -1.0),
                Vec3::new(1.0, 2.0, -1.0),
                Vec3::new(1.0, 2.0, 1.0),
                Vec3::new(-1.0, 2.0, 1.0),
                Vec3::new(0.0, 1.0, 3.0),
            ],
            vec![[0, 2, 1], [0, 3, 2], [3, 4, 2]],
        )
        .unwrap();
        let face = classify_face(&mesh, 0).unwrap();
        assert_eq!(face.triangles, vec![0, 1]);
        assert_eq!(face.vertices, vec![0, 1, 2, 3]);
        assert_eq!(face.kind, None);
        assert!(face.normal.dot(Vec3::Y) > 0.999);
    }
}
