//! MD4 message digest (RFC 1320).
//!
//! [`Md4::digest`] pads and finalizes a copy of the running state, so a
//! hasher can keep absorbing input after reporting an intermediate digest.

const BLOCK_LEN: usize = 64;

const INIT: [u32; 4] = [0x6745_2301, 0xefcd_ab89, 0x98ba_dcfe, 0x1032_5476];

const ROUND2: u32 = 0x5a82_7999;
const ROUND3: u32 = 0x6ed9_eba1;

/// Incremental MD4 hasher.
#[derive(Clone)]
pub struct Md4 {
    state: [u32; 4],
    buffer: [u8; BLOCK_LEN],
    buffered: usize,
    length: u64,
}

impl Default for Md4 {
    fn default() -> Self {
        Self::new()
    }
}

impl Md4 {
    pub fn new() -> Self {
        Self {
            state: INIT,
            buffer: [0u8; BLOCK_LEN],
            buffered: 0,
            length: 0,
        }
    }

    /// Absorbs `data`, compressing every full 64-byte block right away.
    pub fn update(&mut self, mut data: &[u8]) {
        self.length = self.length.wrapping_add(data.len() as u64);

        if self.buffered > 0 {
            let take = (BLOCK_LEN - self.buffered).min(data.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&data[..take]);
            self.buffered += take;
            data = &data[take..];
            if self.buffered < BLOCK_LEN {
                return;
            }
            let block = self.buffer;
            compress(&mut self.state, &block);
            self.buffered = 0;
        }

        let mut blocks = data.chunks_exact(BLOCK_LEN);
        for block in &mut blocks {
            compress(&mut self.state, block);
        }
        let rest = blocks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffered = rest.len();
    }

    /// Digest of everything absorbed so far.
    pub fn digest(&self) -> [u8; 16] {
        let mut tail = self.clone();
        let bit_len = self.length.wrapping_mul(8);

        let pad_len = if self.buffered < 56 {
            56 - self.buffered
        } else {
            BLOCK_LEN + 56 - self.buffered
        };
        let mut padding = [0u8; BLOCK_LEN];
        padding[0] = 0x80;
        tail.update(&padding[..pad_len]);
        tail.update(&bit_len.to_le_bytes());

        let mut out = [0u8; 16];
        for (chunk, word) in out.chunks_exact_mut(4).zip(tail.state.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Lowercase hex form of [`Md4::digest`].
    pub fn hexdigest(&self) -> String {
        hex::encode(self.digest())
    }
}

/// One-shot MD4 of `data`.
pub fn md4(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md4::new();
    hasher.update(data);
    hasher.digest()
}

fn compress(state: &mut [u32; 4], block: &[u8]) {
    let mut x = [0u32; 16];
    for (word, bytes) in x.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    let [mut a, mut b, mut c, mut d] = *state;

    let f = |x: u32, y: u32, z: u32| (x & y) | (!x & z);
    let g = |x: u32, y: u32, z: u32| (x & y) | (x & z) | (y & z);
    let h = |x: u32, y: u32, z: u32| x ^ y ^ z;

    for &k in &[0usize, 4, 8, 12] {
        a = a.wrapping_add(f(b, c, d)).wrapping_add(x[k]).rotate_left(3);
        d = d.wrapping_add(f(a, b, c)).wrapping_add(x[k + 1]).rotate_left(7);
        c = c.wrapping_add(f(d, a, b)).wrapping_add(x[k + 2]).rotate_left(11);
        b = b.wrapping_add(f(c, d, a)).wrapping_add(x[k + 3]).rotate_left(19);
    }

    for k in 0..4 {
        a = a.wrapping_add(g(b, c, d)).wrapping_add(x[k]).wrapping_add(ROUND2).rotate_left(3);
        d = d.wrapping_add(g(a, b, c)).wrapping_add(x[k + 4]).wrapping_add(ROUND2).rotate_left(5);
        c = c.wrapping_add(g(d, a, b)).wrapping_add(x[k + 8]).wrapping_add(ROUND2).rotate_left(9);
        b = b.wrapping_add(g(c, d, a)).wrapping_add(x[k + 12]).wrapping_add(ROUND2).rotate_left(13);
    }

    for &k in &[0usize, 2, 1, 3] {
        a = a.wrapping_add(h(b, c, d)).wrapping_add(x[k]).wrapping_add(ROUND3).rotate_left(3);
        d = d.wrapping_add(h(a, b, c)).wrapping_add(x[k + 8]).wrapping_add(ROUND3).rotate_left(9);
        c = c.wrapping_add(h(d, a, b)).wrapping_add(x[k + 4]).wrapping_add(ROUND3).rotate_left(11);
        b = b.wrapping_add(h(c, d, a)).wrapping_add(x[k + 12]).wrapping_add(ROUND3).rotate_left(15);
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
}
