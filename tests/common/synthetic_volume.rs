use ndarray::{Array3, Array4};

/// Scalar ramp whose voxel `[x, y, z]` holds `x + nx * (y + ny * z)`.
pub fn ramp_u8(nx: usize, ny: usize, nz: usize) -> Array3<u8> {
    assert!(nx * ny * nz <= 256, "ramp must fit into u8");
    Array3::from_shape_fn((nz, ny, nx), |(z, y, x)| (x + nx * (y + ny * z)) as u8)
}

/// Three-component volume with distinct, non-collinear components.
pub fn rgb_f32(nx: usize, ny: usize, nz: usize) -> Array4<f32> {
    Array4::from_shape_fn((nz, ny, nx, 3), |(z, y, x, c)| match c {
        0 => x as f32,
        1 => (y * y) as f32,
        _ => z as f32 - 1.5,
    })
}

/// Label volume split into two labelled halves along x.
pub fn halves_u16(nx: usize, ny: usize, nz: usize) -> Array3<u16> {
    Array3::from_shape_fn((nz, ny, nx), |(_, _, x)| if x < nx / 2 { 1 } else { 2 })
}

pub fn assert_close(a: [f64; 3], b: [f64; 3], tol: f64) {
    for i in 0..3 {
        assert!((a[i] - b[i]).abs() < tol, "{a:?} != {b:?}");
    }
}
