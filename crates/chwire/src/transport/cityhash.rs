// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CityHash128, version 1.0.2.
//!
//! Block checksums use this exact revision; later CityHash releases changed
//! the short-input and tail mixing and produce different digests. Inputs are
//! read little-endian regardless of host byte order.

const K0: u64 = 0xc3a5_c85c_97cb_3127;
const K1: u64 = 0xb492_b66f_be98_f273;
const K2: u64 = 0x9ae1_6a3b_2f90_404f;
const K3: u64 = 0xc949_d7c7_509e_6557;
const K_MUL: u64 = 0x9ddf_ea08_eb38_2d69;

/// 128-bit digest as `(low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hash128 {
    pub low: u64,
    pub high: u64,
}

impl Hash128 {
    /// On-wire form: low half then high half, both little-endian.
    pub fn to_le_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.low.to_le_bytes());
        out[8..].copy_from_slice(&self.high.to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: [u8; 16]) -> Self {
        let mut low = [0u8; 8];
        let mut high = [0u8; 8];
        low.copy_from_slice(&bytes[..8]);
        high.copy_from_slice(&bytes[8..]);
        Self {
            low: u64::from_le_bytes(low),
            high: u64::from_le_bytes(high),
        }
    }
}

#[inline]
fn fetch64(s: &[u8], i: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&s[i..i + 8]);
    u64::from_le_bytes(b)
}

#[inline]
fn fetch32(s: &[u8], i: usize) -> u64 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&s[i..i + 4]);
    u64::from(u32::from_le_bytes(b))
}

#[inline]
fn shift_mix(v: u64) -> u64 {
    v ^ (v >> 47)
}

#[inline]
fn hash_len16(u: u64, v: u64) -> u64 {
    let mut a = (u ^ v).wrapping_mul(K_MUL);
    a ^= a >> 47;
    let mut b = (v ^ a).wrapping_mul(K_MUL);
    b ^= b >> 47;
    b.wrapping_mul(K_MUL)
}

fn hash_len0to16(s: &[u8]) -> u64 {
    let len = s.len();
    if len > 8 {
        let a = fetch64(s, 0);
        let b = fetch64(s, len - 8);
        return hash_len16(a, b.wrapping_add(len as u64).rotate_right(len as u32)) ^ b;
    }
    if len >= 4 {
        let a = fetch32(s, 0);
        return hash_len16((len as u64).wrapping_add(a << 3), fetch32(s, len - 4));
    }
    if len > 0 {
        let a = u64::from(s[0]);
        let b = u64::from(s[len >> 1]);
        let c = u64::from(s[len - 1]);
        let y = (a + (b << 8)) as u32;
        let z = (len as u64 + (c << 2)) as u32;
        return shift_mix(u64::from(y).wrapping_mul(K2) ^ u64::from(z).wrapping_mul(K3))
            .wrapping_mul(K2);
    }
    K2
}

/// `(a, b)` state update over 32 bytes starting at `s[i]`.
#[inline]
fn weak_hash_len32(s: &[u8], i: usize, mut a: u64, mut b: u64) -> (u64, u64) {
    let w = fetch64(s, i);
    let x = fetch64(s, i + 8);
    let y = fetch64(s, i + 16);
    let z = fetch64(s, i + 24);
    a = a.wrapping_add(w);
    b = b.wrapping_add(a).wrapping_add(z).rotate_right(21);
    let c = a;
    a = a.wrapping_add(x).wrapping_add(y);
    b = b.wrapping_add(a.rotate_right(44));
    (a.wrapping_add(z), b.wrapping_add(c))
}

/// Short inputs (under 128 bytes).
fn city_murmur(s: &[u8], seed: Hash128) -> Hash128 {
    let len = s.len();
    let mut a = seed.low;
    let mut b = seed.high;
    let mut c;
    let mut d;
    if len <= 16 {
        a = shift_mix(a.wrapping_mul(K1)).wrapping_mul(K1);
        c = b.wrapping_mul(K1).wrapping_add(hash_len0to16(s));
        d = shift_mix(a.wrapping_add(if len >= 8 { fetch64(s, 0) } else { c }));
    } else {
        c = hash_len16(fetch64(s, len - 8).wrapping_add(K1), a);
        d = hash_len16(b.wrapping_add(len as u64), c.wrapping_add(fetch64(s, len - 16)));
        a = a.wrapping_add(d);
        let mut i = 0;
        let mut left = len as isize - 16;
        while left > 0 {
            a ^= shift_mix(fetch64(s, i).wrapping_mul(K1)).wrapping_mul(K1);
            a = a.wrapping_mul(K1);
            b ^= a;
            c ^= shift_mix(fetch64(s, i + 8).wrapping_mul(K1)).wrapping_mul(K1);
            c = c.wrapping_mul(K1);
            d ^= c;
            i += 16;
            left -= 16;
        }
    }
    a = hash_len16(a, c);
    b = hash_len16(d, b);
    Hash128 {
        low: a ^ b,
        high: hash_len16(b, a),
    }
}

fn city_hash128_with_seed(s: &[u8], seed: Hash128) -> Hash128 {
    let mut len = s.len();
    if len < 128 {
        return city_murmur(s, seed);
    }

    let mut x = seed.low;
    let mut y = seed.high;
    let mut z = (len as u64).wrapping_mul(K1);
    let mut v0 = (y ^ K1).rotate_right(49).wrapping_mul(K1).wrapping_add(fetch64(s, 0));
    let mut v1 = v0.rotate_right(42).wrapping_mul(K1).wrapping_add(fetch64(s, 8));
    let mut w0 = y.wrapping_add(z).rotate_right(35).wrapping_mul(K1).wrapping_add(x);
    let mut w1 = x.wrapping_add(fetch64(s, 88)).rotate_right(53).wrapping_mul(K1);

    let mut i = 0;
    loop {
        for _ in 0..2 {
            x = x
                .wrapping_add(y)
                .wrapping_add(v0)
                .wrapping_add(fetch64(s, i + 16))
                .rotate_right(37)
                .wrapping_mul(K1);
            y = y
                .wrapping_add(v1)
                .wrapping_add(fetch64(s, i + 48))
                .rotate_right(42)
                .wrapping_mul(K1);
            x ^= w1;
            y ^= v0;
            z = (z ^ w0).rotate_right(33);
            (v0, v1) = weak_hash_len32(s, i, v1.wrapping_mul(K1), x.wrapping_add(w0));
            (w0, w1) = weak_hash_len32(s, i + 32, z.wrapping_add(w1), y);
            std::mem::swap(&mut z, &mut x);
            i += 64;
        }
        len -= 128;
        if len < 128 {
            break;
        }
    }

    y = y.wrapping_add(w0.rotate_right(37).wrapping_mul(K0)).wrapping_add(z);
    x = x.wrapping_add(v0.wrapping_add(z).rotate_right(49).wrapping_mul(K0));

    // Up to four 32-byte chunks from the end; they may overlap bytes the main
    // loop already consumed.
    let mut tail_done = 0;
    while tail_done < len {
        tail_done += 32;
        y = y.wrapping_sub(x).rotate_right(42).wrapping_mul(K0).wrapping_add(v1);
        w0 = w0.wrapping_add(fetch64(s, i + len - tail_done + 16));
        x = x.rotate_right(49).wrapping_mul(K0).wrapping_add(w0);
        w0 = w0.wrapping_add(v0);
        (v0, v1) = weak_hash_len32(s, i + len - tail_done, v0, v1);
    }

    x = hash_len16(x, v0);
    y = hash_len16(y, w0);
    Hash128 {
        low: hash_len16(x.wrapping_add(v1), w1).wrapping_add(y),
        high: hash_len16(x.wrapping_add(w1), y.wrapping_add(v1)),
    }
}

/// CityHash128 v1.0.2 of `data`.
pub fn city_hash128(data: &[u8]) -> Hash128 {
    let len = data.len();
    if len >= 16 {
        city_hash128_with_seed(
            &data[16..],
            Hash128 {
                low: fetch64(data, 0) ^ K3,
                high: fetch64(data, 8),
            },
        )
    } else if len >= 8 {
        city_hash128_with_seed(
            &[],
            Hash128 {
                low: fetch64(data, 0) ^ (len as u64).wrapping_mul(K0),
                high: fetch64(data, len - 8) ^ K1,
            },
        )
    } else {
        city_hash128_with_seed(data, Hash128 { low: K0, high: K1 })
    }
}
