use log::debug;
use nalgebra::Point3;

use super::SurfaceMesh;

/// Removes about `fraction` of the faces by collapsing short edges.
///
/// A collapse is only taken when it keeps the surface a 2-manifold of the
/// same genus (link condition), does not flip any surrounding face and
/// the edge is no longer than `max_edge`. Returns the number of faces removed.
pub fn decimate(mesh: &mut SurfaceMesh, fraction: f64, max_edge: f64) -> usize {
    let target = (mesh.faces.len() as f64 * fraction).floor() as usize;
    if target == 0 || mesh.faces.len() <= 4 {
        return 0;
    }

    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); mesh.vertices.len()];
    for (f, face) in mesh.faces.iter().enumerate() {
        for v in face {
            incident[*v].push(f);
        }
    }

    let mut edges: Vec<(f64, usize, usize)> = Vec::new();
    for [a, b, c] in &mesh.faces {
        for (u, v) in [(*a, *b), (*b, *c), (*c, *a)] {
            if u < v {
                edges.push(((mesh.vertices[u] - mesh.vertices[v]).norm(), u, v));
            }
        }
    }
    edges.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut alive = vec![true; mesh.faces.len()];
    let mut locked = vec![false; mesh.vertices.len()];
    let mut removed = 0;

    for (length, u, v) in edges {
        if removed >= target || length > max_edge {
            break;
        }
        if locked[u] || locked[v] {
            continue;
        }
        if !can_collapse(mesh, &incident, &alive, u, v) {
            continue;
        }

        let midpoint = Point3::from((mesh.vertices[u].coords + mesh.vertices[v].coords) * 0.5);
        let moved_from_v = std::mem::take(&mut incident[v]);
        for f in moved_from_v {
            if !alive[f] {
                continue;
            }
            if mesh.faces[f].contains(&u) {
                alive[f] = false;
                removed += 1;
            } else {
                for idx in mesh.faces[f].iter_mut() {
                    if *idx == v {
                        *idx = u;
                    }
                }
                incident[u].push(f);
            }
        }
        incident[u].retain(|f| alive[*f]);
        mesh.vertices[u] = midpoint;

        for f in &incident[u] {
            for w in mesh.faces[*f] {
                locked[w] = true;
            }
        }
        locked[v] = true;
    }

    if removed == 0 {
        return 0;
    }
    mesh.faces = mesh
        .faces
        .iter()
        .zip(alive.iter())
        .filter(|(_, keep)| **keep)
        .map(|(face, _)| *face)
        .collect();
    mesh.remove_unused_vertices();
    debug!("decimate: removed {} of {} requested faces", removed, target);
    removed
}

fn ring(mesh: &SurfaceMesh, incident: &[Vec<usize>], alive: &[bool], v: usize) -> Vec<usize> {
    let mut out = Vec::new();
    for f in &incident[v] {
        if !alive[*f] {
            continue;
        }
        for w in mesh.faces[*f] {
            if w != v && !out.contains(&w) {
                out.push(w);
            }
        }
    }
    out
}

fn can_collapse(
    mesh: &SurfaceMesh,
    incident: &[Vec<usize>],
    alive: &[bool],
    u: usize,
    v: usize,
) -> bool {
    let shared_faces: Vec<usize> = incident[u]
        .iter()
        .filter(|f| alive[**f] && mesh.faces[**f].contains(&v))
        .copied()
        .collect();
    if shared_faces.len() != 2 {
        return false;
    }

    // link condition: the one-rings of u and v share exactly the two
    // vertices opposite the collapsed edge
    let ring_u = ring(mesh, incident, alive, u);
    let ring_v = ring(mesh, incident, alive, v);
    let common = ring_u.iter().filter(|w| ring_v.contains(w)).count();
    if common != 2 {
        return false;
    }

    let midpoint = Point3::from((mesh.vertices[u].coords + mesh.vertices[v].coords) * 0.5);
    for x in [u, v] {
        for f in &incident[x] {
            if !alive[*f] || shared_faces.contains(f) {
                continue;
            }
            let before = mesh.face_cross(*f);
            let moved = mesh.faces[*f].map(|w| {
                if w == u || w == v {
                    midpoint
                } else {
                    mesh.vertices[w]
                }
            });
            let after = (moved[1] - moved[0]).cross(&(moved[2] - moved[0]));
            if before.dot(&after) <= 0.0 {
                return false;
            }
        }
    }
    true
}
