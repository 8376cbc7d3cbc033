//! Dice roller backed by the random port.

use std::sync::Arc;

use async_trait::async_trait;
use questbound_domain::DiceFormula;

use crate::infrastructure::ports::{DiceError, DiceRollerPort, RandomPort};

/// Rolls `NdS+M` formulas. Plain numbers roll as themselves.
pub struct FormulaDiceRoller {
    random: Arc<dyn RandomPort>,
}

impl FormulaDiceRoller {
    pub fn new(random: Arc<dyn RandomPort>) -> Self {
        Self { random }
    }
}

#[async_trait]
impl DiceRollerPort for FormulaDiceRoller {
    async fn roll(&self, expression: &str) -> Result<f64, DiceError> {
        if let Ok(constant) = expression.trim().parse::<f64>() {
            return Ok(constant);
        }

        let formula =
            DiceFormula::parse(expression).map_err(|e| DiceError::invalid(expression, e))?;
        let result = formula.roll_with(|sides| self.random.gen_range(1, sides));

        tracing::debug!(
            formula = %result.formula,
            rolls = ?result.rolls,
            total = result.total,
            "Rolled dice"
        );
        Ok(f64::from(result.total))
    }
}
