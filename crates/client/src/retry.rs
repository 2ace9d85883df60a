/// Counts send attempts for one request.
///
/// Only timeouts spend the budget; discarded replies never touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    max_attempts: u32,
    used: u32,
}

impl RetryBudget {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            used: 0,
        }
    }

    /// Takes one attempt. Returns `false` once the budget is exhausted.
    pub fn try_consume(&mut self) -> bool {
        if self.used >= self.max_attempts {
            return false;
        }
        self.used += 1;
        true
    }

    /// Attempts taken so far.
    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max_attempts
    }
}
