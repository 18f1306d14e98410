//! Configuration types for chain solver runs.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ColorMap, InitialCondition, PaletteError};

/// Top-level solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Number of ranks in the chain.
    pub ranks: usize,
    /// Owned points per rank.
    pub num_grids: usize,
    /// Point spacing.
    pub dx: f64,
    /// Values stored per point.
    pub variables: usize,
    /// Operator applications to run.
    pub steps: u64,
    /// Initial condition applied at construction.
    pub initial: InitialCondition,
    /// Local operator applied every step.
    pub operator: OperatorKind,
    /// Ghost values at the ends of the chain.
    #[serde(default = "default_edge_ghost")]
    pub edge_ghost: EdgeGhost,
    /// Ordering of the exchange relative to interior work.
    #[serde(default)]
    pub schedule: ExchangeSchedule,
    /// Give up waiting for a neighbor after this many milliseconds.
    #[serde(default)]
    pub exchange_timeout_ms: Option<u64>,
    /// Variable-to-color mapping for the per-rank canvas.
    #[serde(default)]
    pub color_map: ColorMap,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            ranks: 4,
            num_grids: 64,
            dx: 1.0 / 256.0,
            variables: 1,
            steps: 100,
            initial: InitialCondition::default(),
            operator: OperatorKind::default(),
            edge_ghost: default_edge_ghost(),
            schedule: ExchangeSchedule::Overlapped,
            exchange_timeout_ms: None,
            color_map: ColorMap::default(),
        }
    }
}

/// Edge condition for configured runs. Zero-gradient keeps reference
/// operators mass-neutral at the chain ends.
fn default_edge_ghost() -> EdgeGhost {
    EdgeGhost::Mirror
}

/// Ghost value at a chain endpoint that has no neighbor on its outer side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EdgeGhost {
    /// Keep whatever the slot held before (zero after allocation).
    #[default]
    Stale,
    /// Copy the adjacent owned point (zero gradient).
    Mirror,
    /// Fill every variable with a fixed value.
    Constant { value: f64 },
    /// Close the chain into a ring: the last rank neighbors rank 0.
    Periodic,
}

/// When a started exchange is awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExchangeSchedule {
    /// Compute interior points while the exchange is in flight.
    #[default]
    Overlapped,
    /// Await the exchange before computing interior points.
    Blocking,
}

/// Built-in local operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperatorKind {
    /// Copy input to output.
    Identity,
    /// Explicit diffusion: u + coefficient * dt * (uL - 2u + uR) / dx^2.
    Diffusion { coefficient: f64, dt: f64 },
    /// First-order upwind advection with constant velocity.
    Advection { velocity: f64, dt: f64 },
    /// Value and centered derivative of a single variable: 1 -> 2 variables.
    Gradient,
}

impl OperatorKind {
    /// Variable count a configured run must start with, if restricted.
    pub fn required_input(&self) -> Option<usize> {
        match self {
            OperatorKind::Gradient => Some(1),
            _ => None,
        }
    }

    /// Variable count after one application to `num_input` variables.
    pub fn output_variables(&self, num_input: usize) -> usize {
        match self {
            OperatorKind::Gradient => 2,
            _ => num_input,
        }
    }
}

impl Default for OperatorKind {
    fn default() -> Self {
        OperatorKind::Diffusion {
            coefficient: 1.0,
            dt: 5e-6,
        }
    }
}

impl SolverConfig {
    /// Total number of points across all ranks.
    #[inline]
    pub fn total_points(&self) -> usize {
        self.ranks * self.num_grids
    }

    /// Exchange timeout, if any.
    pub fn exchange_timeout(&self) -> Option<Duration> {
        self.exchange_timeout_ms.map(Duration::from_millis)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: SolverConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ranks == 0 {
            return Err(ConfigError::InvalidRanks);
        }
        if self.num_grids == 0 {
            return Err(ConfigError::InvalidPointCount);
        }
        if !(self.dx.is_finite() && self.dx > 0.0) {
            return Err(ConfigError::InvalidSpacing(self.dx));
        }
        if self.variables == 0 {
            return Err(ConfigError::InvalidVariables);
        }
        match self.operator {
            OperatorKind::Identity | OperatorKind::Gradient => {}
            OperatorKind::Diffusion { dt, .. } | OperatorKind::Advection { dt, .. } => {
                if !(dt.is_finite() && dt > 0.0) {
                    return Err(ConfigError::InvalidTimeStep(dt));
                }
            }
        }
        if let Some(expected) = self.operator.required_input()
            && self.variables != expected
        {
            return Err(ConfigError::OperatorVariables {
                operator: self.operator.clone(),
                expected,
                found: self.variables,
            });
        }

        // Canvas rows are colorized before the first step and after each one.
        self.color_map.validate(self.variables)?;
        if self.steps > 0 {
            self.color_map
                .validate(self.operator.output_variables(self.variables))?;
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Rank count must be non-zero")]
    InvalidRanks,
    #[error("Points per rank must be non-zero")]
    InvalidPointCount,
    #[error("Point spacing must be positive and finite, got {0}")]
    InvalidSpacing(f64),
    #[error("Variable count must be non-zero")]
    InvalidVariables,
    #[error("Time step must be positive and finite, got {0}")]
    InvalidTimeStep(f64),
    #[error("Operator {operator:?} needs {expected} variables, config has {found}")]
    OperatorVariables {
        operator: OperatorKind,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Palette(#[from] PaletteError),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
