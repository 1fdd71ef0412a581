//! Incomplete-Cholesky preconditioner configuration
//!
//! The matting solver accepts a preconditioner strategy. This crate only
//! supports the incomplete-Cholesky one, tuned by a discard threshold and a
//! sequence of diagonal shifts that the solver tries in order until the
//! factorization succeeds.
//!
//! A strategy is an immutable value: the factory copies its inputs, so later
//! changes to the caller's variables never reach an already built strategy.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default discard threshold for fill-in entries
pub const DEFAULT_DISCARD_THRESHOLD: f64 = 1e-4;

/// Default shift sequence, tried first to last
pub const DEFAULT_SHIFTS: [f64; 12] = [
    0.0, 1e-4, 1e-3, 1e-2, 0.1, 0.5, 1.0, 10.0, 100.0, 1e3, 1e4, 1e5,
];

/// Numeric tuning for the incomplete-Cholesky factorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcholConfig {
    /// Entries smaller than this are dropped during factorization
    pub discard_threshold: f64,
    /// Regularization shifts, order significant
    pub shifts: Vec<f64>,
}

impl Default for IcholConfig {
    fn default() -> Self {
        Self {
            discard_threshold: DEFAULT_DISCARD_THRESHOLD,
            shifts: DEFAULT_SHIFTS.to_vec(),
        }
    }
}

/// Ready-to-use preconditioner strategy handed to the matting solver
///
/// Cloning is cheap (the shift list is shared and read-only), which lets the
/// tiled pipeline give every worker its own handle.
#[derive(Clone, PartialEq)]
pub struct IcholPreconditioner {
    discard_threshold: f64,
    shifts: Arc<[f64]>,
}

impl IcholPreconditioner {
    /// Build a strategy from an owned configuration
    #[must_use]
    pub fn from_config(config: IcholConfig) -> Self {
        Self {
            discard_threshold: config.discard_threshold,
            shifts: config.shifts.into(),
        }
    }

    /// Fill-in discard threshold
    #[must_use]
    pub fn discard_threshold(&self) -> f64 {
        self.discard_threshold
    }

    /// Shift sequence in the order the solver must try it
    #[must_use]
    pub fn shifts(&self) -> &[f64] {
        &self.shifts
    }

    /// Ordered shift attempts; the solver stops at the first shift for which
    /// the factorization converges
    pub fn shift_attempts(&self) -> impl Iterator<Item = f64> + '_ {
        self.shifts.iter().copied()
    }

    /// Copy of the configuration this strategy was built from
    #[must_use]
    pub fn config(&self) -> IcholConfig {
        IcholConfig {
            discard_threshold: self.discard_threshold,
            shifts: self.shifts.to_vec(),
        }
    }
}

impl Default for IcholPreconditioner {
    fn default() -> Self {
        Self::from_config(IcholConfig::default())
    }
}

impl fmt::Debug for IcholPreconditioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IcholPreconditioner")
            .field("discard_threshold", &self.discard_threshold)
            .field("shifts", &&*self.shifts)
            .finish()
    }
}

/// Builds preconditioner strategies from already validated numbers
pub struct PreconditionerFactory;

impl PreconditionerFactory {
    /// Bind a discard threshold and a shift sequence into a strategy
    ///
    /// Both arguments are copied; the factory performs no I/O and cannot fail.
    #[must_use]
    pub fn ichol(discard_threshold: f64, shifts: &[f64]) -> IcholPreconditioner {
        IcholPreconditioner {
            discard_threshold,
            shifts: Arc::from(shifts),
        }
    }
}
