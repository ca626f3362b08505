//! Subject weight policy
//!
//! Weights are user-configured integers. The distributor only ever sees the
//! effective weight, which is always at least [`MIN_WEIGHT`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest weight a subject with pending topics can have
pub const MIN_WEIGHT: u64 = 1;

/// How configured weights turn into round-robin credits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMode {
    /// Use the configured weight as-is
    #[default]
    Direct,
    /// `weight * 10 + 3`, reproduces schedules generated by the old planner
    LegacyScaled,
}

impl WeightMode {
    /// Effective weight for a configured weight
    ///
    /// Zero and negative weights are clamped to [`MIN_WEIGHT`] so a subject
    /// with topics is never starved.
    pub fn effective_weight(&self, configured: i64) -> u64 {
        let base = clamp_weight(configured);
        match self {
            Self::Direct => base,
            Self::LegacyScaled => base.saturating_mul(10).saturating_add(3),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::LegacyScaled => "legacy_scaled",
        }
    }
}

impl fmt::Display for WeightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "legacy_scaled" | "legacy-scaled" | "legacy" => Ok(Self::LegacyScaled),
            _ => Err(format!(
                "Invalid weight mode '{s}'. Valid options: direct, legacy_scaled"
            )),
        }
    }
}

/// Clamp a configured weight to the minimum
pub fn clamp_weight(configured: i64) -> u64 {
    if configured < MIN_WEIGHT as i64 {
        MIN_WEIGHT
    } else {
        configured as u64
    }
}

/// Whether the configured weight needs clamping
pub fn is_clamped(configured: i64) -> bool {
    configured < MIN_WEIGHT as i64
}
