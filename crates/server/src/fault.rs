//! Fault injection for exercising client retry logic against a real server.
//!
//! Only chunk replies are affected; info replies are always sent promptly.

use std::time::Duration;

use rand::Rng;

/// Fault injection settings. The default injects nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaultConfig {
    /// Probability in `[0, 1]` of dropping a chunk reply.
    pub loss_rate: f64,
    /// Delay applied before sending each chunk reply.
    pub delay: Duration,
}

/// Applies a [`FaultConfig`] to outgoing chunk replies.
#[derive(Debug, Clone, Copy)]
pub struct FaultInjector {
    loss_rate: f64,
    delay: Duration,
}

impl FaultInjector {
    /// Creates an injector. `loss_rate` is clamped to `[0, 1]`; NaN disables loss.
    pub fn new(config: FaultConfig) -> Self {
        let loss_rate = if config.loss_rate.is_nan() {
            0.0
        } else {
            config.loss_rate.clamp(0.0, 1.0)
        };
        Self {
            loss_rate,
            delay: config.delay,
        }
    }

    /// Whether any fault is configured.
    pub fn is_active(&self) -> bool {
        self.loss_rate > 0.0 || !self.delay.is_zero()
    }

    /// Rolls the dice for one chunk reply.
    pub fn should_drop(&self) -> bool {
        self.loss_rate > 0.0 && rand::thread_rng().gen_bool(self.loss_rate)
    }

    /// Waits for the configured delay, if any.
    pub async fn delay(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}
