/// Vertices beyond this count are never decoded.
pub const VERTEX_CAP: usize = 1_000_000;

/// The header scan decodes at most this many bytes of the file prefix.
pub const HEADER_SCAN_LIMIT: usize = 10 * 1024;

/// Zeroth-order spherical harmonic basis constant.
pub(crate) const SH_C0: f32 = 0.28209479177387814;

#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
pub(crate) fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}
