//! Linear variable-to-color mapping.

use serde::{Deserialize, Serialize};

/// Maps one variable linearly onto a color channel.
///
/// `low` maps to 0 and `high` maps to 1. Values outside the range are not
/// clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMap {
    /// Index of the variable feeding this channel.
    pub variable: usize,
    pub low: f64,
    pub high: f64,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            variable: 0,
            low: 0.0,
            high: 1.0,
        }
    }
}

impl ChannelMap {
    #[inline]
    pub fn map(&self, values: &[f64]) -> f64 {
        (values[self.variable] - self.low) / (self.high - self.low)
    }
}

/// Red, green and blue channel mappings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorMap {
    #[serde(default)]
    pub red: ChannelMap,
    #[serde(default)]
    pub green: ChannelMap,
    #[serde(default)]
    pub blue: ChannelMap,
}

impl ColorMap {
    fn channels(&self) -> [(&'static str, &ChannelMap); 3] {
        [
            ("red", &self.red),
            ("green", &self.green),
            ("blue", &self.blue),
        ]
    }

    /// Check every channel against a point with `num_variables` values.
    pub fn validate(&self, num_variables: usize) -> Result<(), PaletteError> {
        for (channel, map) in self.channels() {
            if map.variable >= num_variables {
                return Err(PaletteError::VariableOutOfRange {
                    channel,
                    variable: map.variable,
                    num_variables,
                });
            }
            if map.low == map.high || !(map.high - map.low).is_finite() {
                return Err(PaletteError::DegenerateRange {
                    channel,
                    low: map.low,
                    high: map.high,
                });
            }
        }
        Ok(())
    }

    /// Color of a point. Callers validate first.
    #[inline]
    pub fn rgb(&self, values: &[f64]) -> [f64; 3] {
        [
            self.red.map(values),
            self.green.map(values),
            self.blue.map(values),
        ]
    }
}

/// Color map misuse.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaletteError {
    #[error("{channel} channel reads variable {variable}, but points have {num_variables}")]
    VariableOutOfRange {
        channel: &'static str,
        variable: usize,
        num_variables: usize,
    },
    #[error("{channel} channel range [{low}, {high}] is degenerate")]
    DegenerateRange {
        channel: &'static str,
        low: f64,
        high: f64,
    },
}
