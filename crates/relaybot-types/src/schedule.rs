//! Progressive token-budget schedule.
//!
//! The engine retries a completion with increasing token ceilings until the
//! reply is no longer truncated. The schedule is an arithmetic sequence
//! `(min, max, step)`, half-open like the original range semantics: the
//! ceilings are `min, min+step, ...` strictly below `max`, so a schedule of
//! `(256, 1024, 256)` attempts 256, 512, 768.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Ordered token ceilings attempted for one completion request.
///
/// Fixed per provider configuration; never mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSchedule {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl TokenSchedule {
    /// Build a validated schedule.
    ///
    /// # Errors
    ///
    /// Rejects `min > max`, `step == 0`, and `min == 0`.
    pub fn new(min: u32, max: u32, step: u32) -> Result<Self, ConfigError> {
        if min == 0 {
            return Err(ConfigError::InvalidSchedule(
                "token minimum must be positive".into(),
            ));
        }
        if min > max {
            return Err(ConfigError::InvalidSchedule(format!(
                "token minimum {min} exceeds maximum {max}"
            )));
        }
        if step == 0 {
            return Err(ConfigError::InvalidSchedule(
                "token increment must be positive".into(),
            ));
        }
        Ok(Self { min, max, step })
    }

    /// The ascending token ceilings, in attempt order.
    ///
    /// A degenerate schedule (`min == max`) still yields `min` once, so the
    /// engine always makes at least one call.
    pub fn ceilings(&self) -> impl Iterator<Item = u32> + use<> {
        let (min, max, step) = (self.min, self.max, self.step);
        let count = if min == max {
            1
        } else {
            ((max - min) as u64).div_ceil(step as u64)
        };
        (0..count).map(move |i| min + (i as u32) * step)
    }

    /// Number of attempts the schedule defines.
    pub fn attempts(&self) -> usize {
        self.ceilings().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceilings_half_open() {
        let schedule = TokenSchedule::new(256, 1024, 256).unwrap();
        let ceilings: Vec<u32> = schedule.ceilings().collect();
        assert_eq!(ceilings, vec![256, 512, 768]);
        assert_eq!(schedule.attempts(), 3);
    }

    #[test]
    fn test_ceilings_uneven_step() {
        let schedule = TokenSchedule::new(100, 350, 100).unwrap();
        let ceilings: Vec<u32> = schedule.ceilings().collect();
        // ceil((350-100)/100) = 3 attempts
        assert_eq!(ceilings, vec![100, 200, 300]);
    }

    #[test]
    fn test_degenerate_schedule_attempts_once() {
        let schedule = TokenSchedule::new(512, 512, 128).unwrap();
        let ceilings: Vec<u32> = schedule.ceilings().collect();
        assert_eq!(ceilings, vec![512]);
    }

    #[test]
    fn test_rejects_zero_step() {
        assert!(TokenSchedule::new(256, 1024, 0).is_err());
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert!(TokenSchedule::new(1024, 256, 256).is_err());
    }

    #[test]
    fn test_rejects_zero_min() {
        assert!(TokenSchedule::new(0, 1024, 256).is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let schedule = TokenSchedule::new(256, 1024, 256).unwrap();
        let json = serde_json::to_string(&schedule).unwrap();
        let parsed: TokenSchedule = serde_json::from_str(&json).unwrap();
        assert_eq!(schedule, parsed);
    }
}
