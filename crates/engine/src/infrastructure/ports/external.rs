//! External service ports.

use async_trait::async_trait;

use super::error::DiceError;

/// Resolves a dice expression such as `2d6+3` to a total.
///
/// This is the evaluator's suspension point for `roll(...)`: a host may
/// animate the roll or ask a player before answering.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiceRollerPort: Send + Sync {
    async fn roll(&self, expression: &str) -> Result<f64, DiceError>;
}
