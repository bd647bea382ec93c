//! Tiered fallback policy for recognition engines.
//!
//! The fallback is an explicit finite-state machine rather than nested
//! error handling: each request walks `Primary -> Secondary -> Tertiary`
//! and stops at the first tier that yields at least one detection. A tier
//! is skipped when its engine is unavailable for the language, errors, or
//! returns zero detections. No tier is retried within one request.

use std::fmt;

/// One ranked engine tier in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTier {
    /// The neural multilingual engine.
    Primary,
    /// The classical engine.
    Secondary,
    /// The synthetic mock engine; by construction it cannot fail, so the
    /// state machine always terminates here at the latest.
    Tertiary,
}

impl FallbackTier {
    /// The tier every request starts at.
    pub const FIRST: FallbackTier = FallbackTier::Primary;

    /// Transition table: the tier to advance to when the current one
    /// produced no usable result. `None` after the tertiary tier.
    pub fn next(self) -> Option<FallbackTier> {
        match self {
            FallbackTier::Primary => Some(FallbackTier::Secondary),
            FallbackTier::Secondary => Some(FallbackTier::Tertiary),
            FallbackTier::Tertiary => None,
        }
    }

    /// Index of this tier into the pipeline's priority-ordered engine
    /// list.
    pub fn index(self) -> usize {
        match self {
            FallbackTier::Primary => 0,
            FallbackTier::Secondary => 1,
            FallbackTier::Tertiary => 2,
        }
    }
}

impl fmt::Display for FallbackTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FallbackTier::Primary => "primary",
            FallbackTier::Secondary => "secondary",
            FallbackTier::Tertiary => "tertiary",
        };
        f.write_str(name)
    }
}
