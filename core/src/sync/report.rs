//! Run summary

use std::fmt;

use crate::error::SyncError;
use crate::secret::{Action, SecretTarget};

/// Exit code when no token could be obtained
pub const EXIT_FATAL: u8 = 1;

/// Exit code when at least one target failed
pub const EXIT_PARTIAL: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Succeeded {
    pub target: SecretTarget,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failed {
    pub target: SecretTarget,
    pub error: SyncError,
}

/// Per-target outcome of a run, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: Vec<Succeeded>,
    pub failed: Vec<Failed>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            EXIT_PARTIAL
        }
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.succeeded.len() + self.failed.len();
        if self.is_success() {
            writeln!(f, "all {} secrets reconciled", total)?;
        } else {
            writeln!(
                f,
                "partial failure: {} of {} secrets failed",
                self.failed.len(),
                total
            )?;
        }
        for ok in &self.succeeded {
            writeln!(f, "  {} ({}): {}", ok.target, ok.target.shape, ok.action.as_str())?;
        }
        for failed in &self.failed {
            writeln!(
                f,
                "  {} ({}): failed ({}): {}",
                failed.target,
                failed.target.shape,
                failed.error.error_key(),
                failed.error
            )?;
        }
        Ok(())
    }
}
