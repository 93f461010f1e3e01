pub mod decimation;
pub mod normals;
pub mod reconstruction;
pub mod smoothing;

use nalgebra::{Matrix4, Point3, Vector3};
use std::collections::HashMap;

/// Indexed triangle surface.
///
/// Faces are wound counter-clockwise seen from outside, so face normals
/// computed with the right-hand rule point outward.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
    /// Per-vertex normals, parallel to `vertices` when present.
    pub normals: Option<Vec<Vector3<f64>>>,
}

impl SurfaceMesh {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Unnormalized face normal; its length is twice the face area.
    pub fn face_cross(&self, face: usize) -> Vector3<f64> {
        let [a, b, c] = self.faces[face];
        let (pa, pb, pc) = (self.vertices[a], self.vertices[b], self.vertices[c]);
        (pb - pa).cross(&(pc - pa))
    }

    pub fn face_normal(&self, face: usize) -> Vector3<f64> {
        let n = self.face_cross(face);
        let len = n.norm();
        if len > 0.0 {
            n / len
        } else {
            Vector3::zeros()
        }
    }

    pub fn area(&self) -> f64 {
        (0..self.faces.len())
            .map(|f| self.face_cross(f).norm() * 0.5)
            .sum()
    }

    /// Enclosed volume; positive when faces are wound outward.
    pub fn signed_volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|[a, b, c]| {
                let (pa, pb, pc) = (
                    self.vertices[*a].coords,
                    self.vertices[*b].coords,
                    self.vertices[*c].coords,
                );
                pa.dot(&pb.cross(&pc)) / 6.0
            })
            .sum()
    }

    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        let (mut min, mut max) = (first, first);
        for v in &self.vertices {
            min = min.inf(v);
            max = max.sup(v);
        }
        Some((min, max))
    }

    /// Applies a homogeneous transform to vertices and normals.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for v in &mut self.vertices {
            *v = matrix.transform_point(v);
        }
        if let Some(normals) = &mut self.normals {
            let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
            let normal_matrix = linear
                .try_inverse()
                .map(|inv| inv.transpose())
                .unwrap_or(linear);
            for n in normals.iter_mut() {
                let t = normal_matrix * *n;
                let len = t.norm();
                *n = if len > 0.0 { t / len } else { t };
            }
        }
    }

    /// Flips the winding of every face and negates the normals.
    pub fn reverse_orientation(&mut self) {
        for face in &mut self.faces {
            face.swap(1, 2);
        }
        if let Some(normals) = &mut self.normals {
            for n in normals.iter_mut() {
                *n = -*n;
            }
        }
    }

    /// Appends `other`, keeping both meshes' faces.
    pub fn append(&mut self, other: &SurfaceMesh) {
        let offset = self.vertices.len();
        let keep_normals = match (&self.normals, &other.normals) {
            (Some(_), Some(_)) => true,
            (None, Some(_)) => self.vertices.is_empty(),
            _ => false,
        };
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
        );
        if keep_normals {
            let mut normals = self.normals.take().unwrap_or_default();
            normals.extend(other.normals.iter().flatten().copied());
            self.normals = Some(normals);
        } else {
            self.normals = None;
        }
    }

    /// Vertex adjacency derived from the faces.
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); self.vertices.len()];
        for [a, b, c] in &self.faces {
            for (u, v) in [(*a, *b), (*b, *c), (*c, *a)] {
                if !neighbors[u].contains(&v) {
                    neighbors[u].push(v);
                }
                if !neighbors[v].contains(&u) {
                    neighbors[v].push(u);
                }
            }
        }
        neighbors
    }

    /// True when every edge is used by exactly two faces.
    ///
    /// Vertices at identical positions are treated as one, so meshes whose
    /// normals were split along feature edges still count as closed.
    pub fn is_closed(&self) -> bool {
        if self.faces.is_empty() {
            return false;
        }
        let mut welded: HashMap<[u64; 3], usize> = HashMap::new();
        let ids: Vec<usize> = self
            .vertices
            .iter()
            .map(|p| {
                let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
                let next = welded.len();
                *welded.entry(key).or_insert(next)
            })
            .collect();

        let mut edges: HashMap<(usize, usize), usize> = HashMap::new();
        for [a, b, c] in &self.faces {
            for (u, v) in [(ids[*a], ids[*b]), (ids[*b], ids[*c]), (ids[*c], ids[*a])] {
                *edges.entry((u.min(v), u.max(v))).or_insert(0) += 1;
            }
        }
        edges.values().all(|count| *count == 2)
    }

    /// Groups faces into edge-connected components.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let mut parent: Vec<usize> = (0..self.vertices.len()).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }
        for [a, b, c] in &self.faces {
            for (u, v) in [(*a, *b), (*b, *c)] {
                let (ru, rv) = (find(&mut parent, u), find(&mut parent, v));
                if ru != rv {
                    parent[ru] = rv;
                }
            }
        }
        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for (f, face) in self.faces.iter().enumerate() {
            let root = find(&mut parent, face[0]);
            groups.entry(root).or_default().push(f);
        }
        let mut components: Vec<Vec<usize>> = groups.into_values().collect();
        components.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
        components
    }

    /// Drops every component except the one with the most faces.
    pub fn keep_largest_component(&mut self) {
        let components = self.connected_components();
        if components.len() <= 1 {
            return;
        }
        let keep = &components[0];
        let faces = keep.iter().map(|f| self.faces[*f]).collect();
        self.faces = faces;
        self.remove_unused_vertices();
    }

    /// Removes vertices no face refers to and reindexes the faces.
    pub fn remove_unused_vertices(&mut self) {
        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut vertices = Vec::new();
        let mut normals = self.normals.as_ref().map(|_| Vec::new());
        for face in &mut self.faces {
            for idx in face.iter_mut() {
                if remap[*idx] == usize::MAX {
                    remap[*idx] = vertices.len();
                    vertices.push(self.vertices[*idx]);
                    if let (Some(out), Some(src)) = (&mut normals, &self.normals) {
                        out.push(src[*idx]);
                    }
                }
                *idx = remap[*idx];
            }
        }
        self.vertices = vertices;
        self.normals = normals;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::box_mesh;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_is_closed_and_outward() {
        let mesh = box_mesh(Point3::origin(), [2.0, 4.0, 6.0]);
        assert!(mesh.is_closed());
        assert_relative_eq!(mesh.signed_volume(), 48.0, epsilon = 1e-9);
        assert_relative_eq!(mesh.area(), 2.0 * (8.0 + 12.0 + 24.0), epsilon = 1e-9);
    }

    #[test]
    fn test_reverse_orientation_negates_volume() {
        let mut mesh = box_mesh(Point3::origin(), [1.0, 1.0, 1.0]);
        mesh.reverse_orientation();
        assert_relative_eq!(mesh.signed_volume(), -1.0, epsilon = 1e-9);
        assert!(mesh.is_closed());
    }

    #[test]
    fn test_open_mesh_is_not_closed() {
        let mut mesh = box_mesh(Point3::origin(), [1.0, 1.0, 1.0]);
        mesh.faces.pop();
        assert!(!mesh.is_closed());
    }

    #[test]
    fn test_keep_largest_component() {
        let mut mesh = box_mesh(Point3::origin(), [4.0, 4.0, 4.0]);
        let small = box_mesh(Point3::new(10.0, 0.0, 0.0), [1.0, 1.0, 1.0]);
        mesh.append(&small);
        mesh.append(&small);
        let components = mesh.connected_components();
        assert_eq!(components.len(), 3);
        mesh.keep_largest_component();
        assert_eq!(mesh.faces.len(), 12);
        assert_eq!(mesh.vertices.len(), 8);
        assert!(mesh.is_closed());
        let (_, max) = mesh.bounds().unwrap();
        assert_relative_eq!(max.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_translates_vertices() {
        let mut mesh = box_mesh(Point3::origin(), [2.0, 2.0, 2.0]);
        let m = Matrix4::new_translation(&Vector3::new(5.0, 0.0, -1.0));
        mesh.transform(&m);
        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(min.x, 4.0, epsilon = 1e-12);
        assert_relative_eq!(max.z, 0.0, epsilon = 1e-12);
    }
}
