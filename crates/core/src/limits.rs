//! Size limits enforced on the feature universe and sparse storage.
//!
//! Resource overflow is always a fatal, aborting error: the
//! J counter is 32-bit and every CSR content vector is capped at
//! `2^32 - 1` entries. These limits are fixed at process start and are not
//! reconfigurable, matching the "frozen after stabilization" posture
//! applied elsewhere to similar hard ceilings.

use crate::error::Error;

/// Hard resource ceilings.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Maximum number of `J`'s (atomic + product) the engine may assign.
    pub max_j: u32,
    /// Maximum total non-zero entries in any single CSR content vector.
    pub max_csr_len: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_j: u32::MAX - 1, // reserve INVALID_J
            max_csr_len: (1u64 << 32) - 1,
        }
    }
}

impl Limits {
    /// Check that assigning one more `J` (bringing the counter to
    /// `next_j`) does not overflow.
    pub fn check_j(&self, next_j: u32) -> Result<(), Error> {
        if next_j as u64 > self.max_j as u64 {
            return Err(Error::JCounterExhausted(self.max_j));
        }
        Ok(())
    }

    /// Check that a CSR content vector of the given length is in bounds.
    pub fn check_csr_len(&self, len: u64) -> Result<(), Error> {
        if len > self.max_csr_len {
            return Err(Error::LengthOverflow { len });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_allow_normal_growth() {
        let limits = Limits::default();
        assert!(limits.check_j(1000).is_ok());
        assert!(limits.check_csr_len(1000).is_ok());
    }

    #[test]
    fn j_overflow_is_rejected() {
        let limits = Limits {
            max_j: 10,
            max_csr_len: u64::MAX,
        };
        assert!(limits.check_j(10).is_ok());
        assert!(limits.check_j(11).is_err());
    }
}
