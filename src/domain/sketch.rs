//! HyperLogLog cardinality sketch.
//!
//! Used for unique-visitor estimation where the counter store has no native sketch
//! type, and as the reference format for sketch backups. The byte encoding is
//!
//! ```text
//! "HLL" | format version (1) | precision | 2^precision registers (one byte each)
//! ```
//!
//! Sketches of different precision cannot be merged or restored into each other.

use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

/// Register-index bits; 2^14 registers gives ~0.81% standard error.
pub const DEFAULT_PRECISION: u8 = 14;

const MIN_PRECISION: u8 = 4;
const MAX_PRECISION: u8 = 18;
const MAGIC: &[u8; 3] = b"HLL";
const FORMAT_VERSION: u8 = 1;
const HEADER_LEN: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SketchError {
    #[error("unsupported sketch precision {0}")]
    UnsupportedPrecision(u8),

    #[error("incompatible sketch precision: expected {expected}, found {found}")]
    IncompatiblePrecision { expected: u8, found: u8 },

    #[error("malformed sketch bytes: {0}")]
    Malformed(&'static str),
}

#[derive(Clone, PartialEq, Eq)]
pub struct Sketch {
    precision: u8,
    registers: Vec<u8>,
}

impl Sketch {
    /// Creates an empty sketch with [`DEFAULT_PRECISION`].
    pub fn new() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            registers: vec![0; 1 << DEFAULT_PRECISION],
        }
    }

    /// Creates an empty sketch with `2^precision` registers.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::UnsupportedPrecision`] outside `4..=18`.
    pub fn with_precision(precision: u8) -> Result<Self, SketchError> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&precision) {
            return Err(SketchError::UnsupportedPrecision(precision));
        }

        Ok(Self {
            precision,
            registers: vec![0; 1 << precision],
        })
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&r| r == 0)
    }

    /// Adds an element. Returns true if the internal state changed.
    pub fn add(&mut self, element: &[u8]) -> bool {
        let hash = hash64(element);
        let p = u32::from(self.precision);

        let index = (hash >> (64 - p)) as usize;
        // The guard bit bounds the rank at 65 - p.
        let rest = (hash << p) | (1u64 << (p - 1));
        let rank = (rest.leading_zeros() + 1) as u8;

        if rank > self.registers[index] {
            self.registers[index] = rank;
            true
        } else {
            false
        }
    }

    /// Estimated number of distinct elements added so far.
    pub fn estimate(&self) -> u64 {
        let m = self.registers.len() as f64;

        let mut sum = 0.0;
        let mut zeros = 0usize;
        for &r in &self.registers {
            sum += 2f64.powi(-i32::from(r));
            if r == 0 {
                zeros += 1;
            }
        }

        let raw = alpha(self.registers.len()) * m * m / sum;

        let estimate = if raw <= 2.5 * m && zeros > 0 {
            m * (m / zeros as f64).ln()
        } else {
            raw
        };

        estimate.round() as u64
    }

    /// Folds `other` into `self` so the result estimates the union of both inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::IncompatiblePrecision`] if the precisions differ.
    pub fn merge(&mut self, other: &Sketch) -> Result<(), SketchError> {
        self.ensure_precision(other.precision)?;

        for (mine, theirs) in self.registers.iter_mut().zip(&other.registers) {
            *mine = (*mine).max(*theirs);
        }

        Ok(())
    }

    pub fn ensure_precision(&self, expected: u8) -> Result<(), SketchError> {
        if self.precision != expected {
            return Err(SketchError::IncompatiblePrecision {
                expected,
                found: self.precision,
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.registers.len());
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_VERSION);
        out.push(self.precision);
        out.extend_from_slice(&self.registers);
        out
    }

    /// Decodes bytes produced by [`Sketch::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::Malformed`] for truncated or foreign data and
    /// [`SketchError::UnsupportedPrecision`] for an out-of-range precision byte.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SketchError> {
        if bytes.len() < HEADER_LEN {
            return Err(SketchError::Malformed("truncated header"));
        }
        if &bytes[..3] != MAGIC {
            return Err(SketchError::Malformed("bad magic"));
        }
        if bytes[3] != FORMAT_VERSION {
            return Err(SketchError::Malformed("unknown format version"));
        }

        let precision = bytes[4];
        let mut sketch = Self::with_precision(precision)?;

        let registers = &bytes[HEADER_LEN..];
        if registers.len() != sketch.registers.len() {
            return Err(SketchError::Malformed("register count mismatch"));
        }

        let max_rank = 65 - precision;
        if registers.iter().any(|&r| r > max_rank) {
            return Err(SketchError::Malformed("register value out of range"));
        }

        sketch.registers.copy_from_slice(registers);
        Ok(sketch)
    }
}

impl Default for Sketch {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sketch")
            .field("precision", &self.precision)
            .field("estimate", &self.estimate())
            .finish()
    }
}

fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / m as f64),
    }
}

fn hash64(element: &[u8]) -> u64 {
    let digest = Sha256::digest(element);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}
