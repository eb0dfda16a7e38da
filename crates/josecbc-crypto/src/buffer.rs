//! Destination buffer sizing for `seal`/`open`

/// Return `buf` with length `n`, keeping its existing prefix.
///
/// The allocation is reused when `buf` already has capacity for `n` bytes;
/// otherwise it grows once. Bytes past the old length are zeroed. A smaller
/// `n` truncates.
pub fn resize(mut buf: Vec<u8>, n: usize) -> Vec<u8> {
    if buf.capacity() < n {
        tracing::trace!(from = buf.capacity(), to = n, "growing output buffer");
        buf.reserve_exact(n - buf.len());
    }
    buf.resize(n, 0);
    buf
}

/// Append `parts` to `dst` with a single sizing step.
pub fn append(dst: Vec<u8>, parts: &[&[u8]]) -> Vec<u8> {
    let start = dst.len();
    let total: usize = parts.iter().map(|p| p.len()).sum();
    let mut out = resize(dst, start + total);

    let mut offset = start;
    for part in parts {
        out[offset..offset + part.len()].copy_from_slice(part);
        offset += part.len();
    }
    out
}
