//! Initial conditions for chain solver runs.

use serde::{Deserialize, Serialize};

use crate::compute::StencilPoint;

/// Profile used to fill every variable of every owned point at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InitialCondition {
    /// Value equals the point's coordinate.
    Coordinate,
    /// Uniform value.
    Constant { value: f64 },
    /// Gaussian bump.
    Gaussian {
        /// Center coordinate.
        center: f64,
        /// Standard deviation.
        width: f64,
        /// Peak value.
        amplitude: f64,
    },
}

impl Default for InitialCondition {
    fn default() -> Self {
        InitialCondition::Gaussian {
            center: 0.5,
            width: 0.05,
            amplitude: 1.0,
        }
    }
}

impl InitialCondition {
    /// Profile value at coordinate `x`.
    pub fn value_at(&self, x: f64) -> f64 {
        match *self {
            InitialCondition::Coordinate => x,
            InitialCondition::Constant { value } => value,
            InitialCondition::Gaussian {
                center,
                width,
                amplitude,
            } => {
                let d = x - center;
                amplitude * (-d * d / (2.0 * width * width)).exp()
            }
        }
    }

    /// Write the profile into every output slot of a zero-input point.
    pub fn initialize(&self, point: &mut StencilPoint<'_>) {
        let value = self.value_at(point.x());
        point.output().fill(value);
    }
}
