//! Dice formula value objects and parsing
//!
//! Supports dice formulas like "1d20+5", "2d6-1", "1d100" as passed to the
//! QBScript `roll(...)` built-in. The roll itself takes an injected die
//! function so the domain stays free of an RNG.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error when parsing a dice formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    /// The formula string is empty
    #[error("Empty dice formula")]
    Empty,
    #[error("Invalid dice format: {0}")]
    InvalidFormat(String),
    /// Dice count must be at least 1
    #[error("Dice count must be at least 1")]
    InvalidDiceCount,
    /// Die size must be at least 2
    #[error("Die size must be at least 2")]
    InvalidDieSize,
    /// The modifier pushes a possible total outside `i32`
    #[error("Modifier value overflow")]
    ModifierOverflow,
}

/// A parsed dice formula like "2d6+3"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceFormula {
    /// Number of dice to roll (X in XdY)
    pub dice_count: u8,
    /// Size of each die (Y in XdY)
    pub die_size: u8,
    /// Modifier to add/subtract after rolling (+Z or -Z)
    pub modifier: i32,
}

impl DiceFormula {
    /// Parse `NdS`, `NdS+M`, `NdS-M` or `dS`. Whitespace and case are ignored.
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        if compact.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let (count, rest) = compact.split_once('d').ok_or_else(|| {
            DiceParseError::InvalidFormat(format!("expected NdS, got '{}'", compact))
        })?;
        let dice_count = match count {
            "" => 1,
            digits => parse_part::<u8>(digits, "dice count")?,
        };

        let split = rest.find(['+', '-']).filter(|at| *at > 0);
        let (sides, modifier) = match split {
            Some(at) => {
                let (sides, signed) = rest.split_at(at);
                (sides, parse_modifier(signed)?)
            }
            None => (rest, 0),
        };
        let die_size = parse_part::<u8>(sides, "die size")?;
        Self::new(dice_count, die_size, modifier)
    }

    /// Validated constructor. Every possible total must fit in `i32`.
    pub fn new(dice_count: u8, die_size: u8, modifier: i32) -> Result<Self, DiceParseError> {
        if dice_count == 0 {
            return Err(DiceParseError::InvalidDiceCount);
        }
        if die_size < 2 {
            return Err(DiceParseError::InvalidDieSize);
        }
        let highest = i32::from(dice_count) * i32::from(die_size);
        let lowest = i32::from(dice_count);
        if highest.checked_add(modifier).is_none() || lowest.checked_add(modifier).is_none() {
            return Err(DiceParseError::ModifierOverflow);
        }
        Ok(Self {
            dice_count,
            die_size,
            modifier,
        })
    }

    /// Lowest possible total
    pub fn min_roll(&self) -> i32 {
        i32::from(self.dice_count).saturating_add(self.modifier)
    }

    /// Highest possible total
    pub fn max_roll(&self) -> i32 {
        (i32::from(self.dice_count) * i32::from(self.die_size)).saturating_add(self.modifier)
    }

    /// Roll using `die`, which receives the die size and returns a face in `1..=size`.
    pub fn roll_with(&self, mut die: impl FnMut(i32) -> i32) -> DiceRollResult {
        let rolls: Vec<i32> = (0..self.dice_count)
            .map(|_| die(i32::from(self.die_size)).clamp(1, i32::from(self.die_size)))
            .collect();
        // At most 255 faces of 255, so only the modifier can overflow.
        let total = rolls.iter().sum::<i32>().saturating_add(self.modifier);
        DiceRollResult {
            formula: self.clone(),
            rolls,
            total,
        }
    }
}

fn parse_part<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, DiceParseError> {
    raw.parse()
        .map_err(|_| DiceParseError::InvalidFormat(format!("invalid {} '{}'", what, raw)))
}

/// A signed modifier. Well-formed digits outside `i32` are an overflow, not a format error.
fn parse_modifier(signed: &str) -> Result<i32, DiceParseError> {
    signed.parse().map_err(|_| {
        let digits = &signed[1..];
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            DiceParseError::ModifierOverflow
        } else {
            DiceParseError::InvalidFormat(format!("invalid modifier '{}'", signed))
        }
    })
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.dice_count, self.die_size)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

/// Result of rolling a [`DiceFormula`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiceRollResult {
    pub formula: DiceFormula,
    pub rolls: Vec<i32>,
    pub total: i32,
}
