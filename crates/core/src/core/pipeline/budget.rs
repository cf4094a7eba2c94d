//! Rename register budget.
//!
//! Counts registers charged by renamed instructions that write a destination.
//! A charge is refused when the budget is exhausted (a stall, retried next
//! cycle); a release with nothing charged is an invariant violation.

use crate::common::SimError;

/// Physical register budget shared by all renamed instructions of one core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterBudget {
    limit: Option<usize>,
    in_use: usize,
}

impl RegisterBudget {
    /// Creates a budget of `total` registers. Zero means unlimited.
    pub const fn new(total: usize) -> Self {
        Self {
            limit: if total == 0 { None } else { Some(total) },
            in_use: 0,
        }
    }

    /// Registers currently charged.
    #[inline]
    pub const fn in_use(&self) -> usize {
        self.in_use
    }

    /// Registers still available, or `None` if unlimited.
    #[inline]
    pub fn available(&self) -> Option<usize> {
        self.limit.map(|l| l - self.in_use)
    }

    /// Returns true if one more register can be charged.
    #[inline]
    pub fn has_free(&self) -> bool {
        self.limit.is_none_or(|l| self.in_use < l)
    }

    /// Charges one register. Returns false, charging nothing, when exhausted.
    pub fn charge(&mut self) -> bool {
        if self.has_free() {
            self.in_use += 1;
            true
        } else {
            false
        }
    }

    /// Returns one register to the budget.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RegisterUnderflow`] if nothing is charged.
    pub fn release(&mut self) -> Result<(), SimError> {
        if self.in_use == 0 {
            return Err(SimError::RegisterUnderflow { in_use: 0 });
        }
        self.in_use -= 1;
        Ok(())
    }
}
