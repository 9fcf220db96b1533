//! Generated upload payloads
//!
//! `PatternReader` is a bounded byte source used in place of a client upload:
//! it yields exactly `len` bytes of a fill pattern. The output is a pure
//! function of the pattern and the stream position, so it does not depend on
//! how the caller sizes its reads.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::io::{self, Read};

/// Fill pattern for generated payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillPattern {
    /// All zeros
    Zeros,
    /// All ones (0xFF)
    Ones,
    /// Pseudo-random data from a seeded generator
    Random(u64),
    /// Sequential bytes (0x00, 0x01, 0x02, ..., 0xFF, 0x00, ...)
    Sequential,
}

impl Default for FillPattern {
    fn default() -> Self {
        Self::Random(0)
    }
}

/// Reader producing `len` bytes of a `FillPattern`
pub struct PatternReader {
    pattern: FillPattern,
    remaining: u64,
    position: u64,
    rng: Xoshiro256PlusPlus,
    /// Random bytes generated but not yet handed out
    carry: [u8; 8],
    carry_len: usize,
}

impl PatternReader {
    pub fn new(pattern: FillPattern, len: u64) -> Self {
        let seed = match pattern {
            FillPattern::Random(seed) => seed,
            _ => 0,
        };
        Self {
            pattern,
            remaining: len,
            position: 0,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            carry: [0; 8],
            carry_len: 0,
        }
    }

    /// Bytes left to produce
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    fn fill_random(&mut self, out: &mut [u8]) {
        let mut filled = 0;

        let from_carry = self.carry_len.min(out.len());
        if from_carry > 0 {
            let start = 8 - self.carry_len;
            out[..from_carry].copy_from_slice(&self.carry[start..start + from_carry]);
            self.carry_len -= from_carry;
            filled = from_carry;
        }

        let mut words = out[filled..].chunks_exact_mut(8);
        for word in &mut words {
            word.copy_from_slice(&self.rng.next_u64().to_le_bytes());
        }
        let tail = words.into_remainder();
        if !tail.is_empty() {
            self.carry = self.rng.next_u64().to_le_bytes();
            tail.copy_from_slice(&self.carry[..tail.len()]);
            self.carry_len = 8 - tail.len();
        }
    }
}

impl Read for PatternReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        self.fill(&mut buf[..n]);
        self.remaining -= n as u64;
        Ok(n)
    }
}

impl PatternReader {
    /// Write the next `out.len()` pattern bytes, ignoring `remaining`
    fn fill(&mut self, out: &mut [u8]) {
        match self.pattern {
            FillPattern::Zeros => out.fill(0),
            FillPattern::Ones => out.fill(0xFF),
            FillPattern::Sequential => {
                for (i, byte) in out.iter_mut().enumerate() {
                    *byte = ((self.position + i as u64) % 256) as u8;
                }
            }
            FillPattern::Random(_) => self.fill_random(out),
        }
        self.position += out.len() as u64;
    }
}

/// The full payload a `PatternReader` would produce
pub fn pattern_bytes(pattern: FillPattern, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    PatternReader::new(pattern, len as u64).fill(&mut out);
    out
}
