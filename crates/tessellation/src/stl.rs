//! Bit-exact STL export for triangle meshes.
//!
//! Binary layout: an 80-byte header, a little-endian `u32` triangle count,
//! then 50 bytes per triangle (3×f32 normal, 3×3×f32 vertices, u16 attribute
//! byte count, always zero). Normals are recomputed from vertex winding
//! rather than trusting the mesh's stored normals, so the export is
//! reproducible regardless of how the mesh was built.

use crate::TriangleMesh;

const STL_HEADER_TEXT: &str = "SolidType STL Export";

#[derive(Debug, Clone, thiserror::Error)]
pub enum StlError {
    #[error("mesh has no triangles")]
    EmptyMesh,
    #[error("triangle index {index} out of bounds (vertex count {vertex_count})")]
    IndexOutOfBounds { index: u32, vertex_count: usize },
}

fn validate(mesh: &TriangleMesh) -> Result<usize, StlError> {
    let tri_count = mesh.triangle_count();
    if tri_count == 0 {
        return Err(StlError::EmptyMesh);
    }
    let vertex_count = mesh.vertex_count();
    for &idx in &mesh.indices {
        if idx as usize >= vertex_count {
            return Err(StlError::IndexOutOfBounds { index: idx, vertex_count });
        }
    }
    Ok(tri_count)
}

fn triangle_vertex(mesh: &TriangleMesh, index: u32) -> [f32; 3] {
    let base = index as usize * 3;
    [mesh.positions[base], mesh.positions[base + 1], mesh.positions[base + 2]]
}

fn face_normal(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> [f32; 3] {
    let e1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
    let e2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];
    let cross = [
        e1[1] * e2[2] - e1[2] * e2[1],
        e1[2] * e2[0] - e1[0] * e2[2],
        e1[0] * e2[1] - e1[1] * e2[0],
    ];
    let len = (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
    if len < 1e-12 {
        [0.0, 0.0, 1.0]
    } else {
        [cross[0] / len, cross[1] / len, cross[2] / len]
    }
}

/// Export a mesh as a binary STL file.
///
/// File size is exactly `80 + 4 + 50 * triangle_count` bytes.
pub fn export_binary(mesh: &TriangleMesh) -> Result<Vec<u8>, StlError> {
    let tri_count = validate(mesh)?;

    let mut buf = Vec::with_capacity(80 + 4 + tri_count * 50);
    let header_bytes = STL_HEADER_TEXT.as_bytes();
    buf.extend_from_slice(&header_bytes[..header_bytes.len().min(80)]);
    buf.resize(80, 0u8);
    buf.extend_from_slice(&(tri_count as u32).to_le_bytes());

    for tri in mesh.indices.chunks(3) {
        let v0 = triangle_vertex(mesh, tri[0]);
        let v1 = triangle_vertex(mesh, tri[1]);
        let v2 = triangle_vertex(mesh, tri[2]);
        let normal = face_normal(v0, v1, v2);

        for component in normal {
            buf.extend_from_slice(&component.to_le_bytes());
        }
        for vertex in [v0, v1, v2] {
            for component in vertex {
                buf.extend_from_slice(&component.to_le_bytes());
            }
        }
        buf.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(buf)
}

/// Export a mesh as an ASCII STL file, with vertex and normal components
/// formatted to `precision` decimal places (spec default: 6).
pub fn export_ascii(mesh: &TriangleMesh, precision: usize) -> Result<String, StlError> {
    validate(mesh)?;

    let mut out = String::from("solid SolidTypeExport\n");

    for tri in mesh.indices.chunks(3) {
        let v0 = triangle_vertex(mesh, tri[0]);
        let v1 = triangle_vertex(mesh, tri[1]);
        let v2 = triangle_vertex(mesh, tri[2]);
        let normal = face_normal(v0, v1, v2);

        out.push_str(&format!(
            "  facet normal {:.p$} {:.p$} {:.p$}\n",
            normal[0], normal[1], normal[2], p = precision
        ));
        out.push_str("    outer loop\n");
        for vertex in [v0, v1, v2] {
            out.push_str(&format!(
                "      vertex {:.p$} {:.p$} {:.p$}\n",
                vertex[0], vertex[1], vertex[2], p = precision
            ));
        }
        out.push_str("    endloop\n");
        out.push_str("  endfacet\n");
    }

    out.push_str("endsolid SolidTypeExport\n");
    Ok(out)
}
