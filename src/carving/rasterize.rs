use log::debug;
use nalgebra::Point3;
use rayon::prelude::*;

use super::{Region, Stencil};
use crate::error::Result;
use crate::mesh::SurfaceMesh;
use crate::volume::ImageGeometry;

/// Voxels whose centers fall inside the oriented box.
pub fn rasterize_region(region: &Region, geometry: &ImageGeometry) -> Stencil {
    let mut stencil = Stencil::empty(geometry.clone());
    let [nx, ny, _] = geometry.dims;
    let slice_len = nx * ny;
    if slice_len == 0 {
        return stencil;
    }
    let to_physical = geometry.index_to_physical_matrix();

    stencil
        .data
        .par_chunks_mut(slice_len)
        .enumerate()
        .for_each(|(k, slice)| {
            for j in 0..ny {
                for i in 0..nx {
                    let p = to_physical.transform_point(&Point3::new(i as f64, j as f64, k as f64));
                    slice[i + j * nx] = region.contains(&p);
                }
            }
        });
    stencil
}

/// Voxels whose centers fall inside a closed mesh.
///
/// The mesh is moved into index space with the inverse grid transform, then
/// a ray is cast along k through every (i, j) column. Each triangle the ray
/// crosses contributes +1 or -1 by its projected winding; a voxel is inside
/// when the crossings below it do not cancel out. Triangles own their edges
/// and corners half-open, so a ray through a shared edge or vertex is
/// counted exactly once per sheet of surface.
pub fn rasterize_mesh(mesh: &SurfaceMesh, geometry: &ImageGeometry) -> Result<Stencil> {
    let to_index = geometry.physical_to_index_matrix()?;
    let mut stencil = Stencil::empty(geometry.clone());
    let [nx, ny, _] = geometry.dims;
    if mesh.is_empty() || geometry.voxel_count() == 0 {
        return Ok(stencil);
    }

    let vertices: Vec<Point3<f64>> = mesh
        .vertices
        .iter()
        .map(|v| to_index.transform_point(v))
        .collect();

    let mut columns: Vec<Vec<(f64, i32)>> = vec![Vec::new(); nx * ny];
    for [a, b, c] in &mesh.faces {
        let (pa, pb, pc) = (&vertices[*a], &vertices[*b], &vertices[*c]);
        let Some((i_lo, i_hi)) = column_range(pa.x.min(pb.x).min(pc.x), pa.x.max(pb.x).max(pc.x), nx) else {
            continue;
        };
        let Some((j_lo, j_hi)) = column_range(pa.y.min(pb.y).min(pc.y), pa.y.max(pb.y).max(pc.y), ny) else {
            continue;
        };
        for j in j_lo..=j_hi {
            for i in i_lo..=i_hi {
                if let Some(hit) = ray_z_crossing(pa, pb, pc, i as f64, j as f64) {
                    columns[i + j * nx].push(hit);
                }
            }
        }
    }

    // running winding number above each crossing
    columns.par_iter_mut().for_each(|hits| {
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut winding = 0;
        for hit in hits.iter_mut() {
            winding += hit.1;
            hit.1 = winding;
        }
    });

    stencil
        .data
        .par_chunks_mut(nx * ny)
        .enumerate()
        .for_each(|(k, slice)| {
            let depth = k as f64;
            for (cell, hits) in slice.iter_mut().zip(&columns) {
                let below = hits.partition_point(|(z, _)| *z < depth);
                *cell = below > 0 && hits[below - 1].1 != 0;
            }
        });

    debug!(
        "rasterize_mesh: {} triangles -> {} voxels",
        mesh.faces.len(),
        stencil.count_foreground()
    );
    Ok(stencil)
}

/// Integer column indices covered by `[lo, hi]`, clipped to `0..n`.
fn column_range(lo: f64, hi: f64, n: usize) -> Option<(usize, usize)> {
    let first = lo.ceil().max(0.0);
    let last = hi.floor().min(n as f64 - 1.0);
    if first > last {
        return None;
    }
    Some((first as usize, last as usize))
}

/// Height and winding sign of the +z ray through `(x0, y0)` crossing the
/// triangle, or `None` when the ray misses it or the triangle is edge-on.
fn ray_z_crossing(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    x0: f64,
    y0: f64,
) -> Option<(f64, i32)> {
    let d = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if d == 0.0 {
        return None;
    }
    let (sign, b, c) = if d > 0.0 { (1, b, c) } else { (-1, c, b) };

    let wa = edge_weight(b, c, x0, y0)?;
    let wb = edge_weight(c, a, x0, y0)?;
    let wc = edge_weight(a, b, x0, y0)?;
    let total = wa + wb + wc;
    if total <= 0.0 {
        return None;
    }
    Some(((a.z * wa + b.z * wb + c.z * wc) / total, sign))
}

/// Edge function of `(x0, y0)` against the directed edge `p -> q` of a
/// counter-clockwise triangle, or `None` when the point is outside.
///
/// A point exactly on the edge belongs to the triangle only when the edge
/// points down (-y), or runs along -x; the neighbor across the edge sees the
/// reverse direction and rejects it. The value is always evaluated from the
/// lexicographically smaller endpoint so both neighbors get the same bits.
fn edge_weight(p: &Point3<f64>, q: &Point3<f64>, x0: f64, y0: f64) -> Option<f64> {
    let forward = (p.x, p.y) < (q.x, q.y);
    let (s, t) = if forward { (p, q) } else { (q, p) };
    let canonical = (t.x - s.x) * (y0 - s.y) - (t.y - s.y) * (x0 - s.x);
    let value = if forward { canonical } else { -canonical };
    if value > 0.0 {
        return Some(value);
    }
    if value < 0.0 {
        return None;
    }
    let (dx, dy) = (q.x - p.x, q.y - p.y);
    (dy < 0.0 || (dy == 0.0 && dx < 0.0)).then_some(0.0)
}
