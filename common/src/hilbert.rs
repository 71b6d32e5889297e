//! Hilbert curve indexing for 3D grid points.

pub const MAX_ORDER: u32 = 21;

/// Position of `point` along a 3D Hilbert curve covering a cube of side
/// `2^order`. Coordinates are masked to `order` bits. `order` is clamped to
/// `1..=MAX_ORDER` so the result fits in 63 bits.
pub fn hilbert_index(point: [u32; 3], order: u32) -> u64 {
    let order = order.clamp(1, MAX_ORDER);
    let mask = (1u32 << order) - 1;
    let mut x = [point[0] & mask, point[1] & mask, point[2] & mask];

    // Inverse undo.
    let top = 1u32 << (order - 1);
    let mut q = top;
    while q > 1 {
        let p = q - 1;
        for i in 0..3 {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // Gray encode.
    for i in 1..3 {
        x[i] ^= x[i - 1];
    }
    let mut t = 0;
    q = top;
    while q > 1 {
        if x[2] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for value in x.iter_mut() {
        *value ^= t;
    }

    // Interleave the transposed bits, most significant first.
    let mut index = 0u64;
    for bit in (0..order).rev() {
        for value in x.iter() {
            index = (index << 1) | ((value >> bit) & 1) as u64;
        }
    }
    index
}

#[cfg(test)]
mod tests {
    use super::hilbert_index;

    #[test]
    fn order_one_visits_every_corner_once() {
        let mut seen = [false; 8];
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    let index = hilbert_index([x, y, z], 1) as usize;
                    assert!(!seen[index]);
                    seen[index] = true;
                }
            }
        }
        assert!(seen.iter().all(|&v| v));
        assert_eq!(hilbert_index([0, 0, 0], 1), 0);
    }
}
