//! Reference local operators.
//!
//! `identity`, `diffusion` and `advection` keep the variable count and treat
//! every variable independently. `gradient` reads variable 0 and always
//! produces two variables: the value and its centered derivative.

use crate::schema::OperatorKind;

use super::{Communicator, Grid, GridError, StencilPoint};

/// Copy input to output.
pub fn identity(point: &mut StencilPoint<'_>) {
    let input = point.input();
    point.output().copy_from_slice(input);
}

/// Explicit three-point diffusion step.
///
/// Stable for `coefficient * dt / dx^2 <= 0.5`.
pub fn diffusion(coefficient: f64, dt: f64, dx: f64) -> impl Fn(&mut StencilPoint<'_>) + Copy {
    let nu = coefficient * dt / (dx * dx);
    move |point: &mut StencilPoint<'_>| {
        for v in 0..point.num_output() {
            let u = point.input()[v];
            let l = point.left().input()[v];
            let r = point.right().input()[v];
            point.output()[v] = u + nu * (l - 2.0 * u + r);
        }
    }
}

/// First-order upwind advection with constant `velocity`.
///
/// Stable for `|velocity| * dt / dx <= 1`.
pub fn advection(velocity: f64, dt: f64, dx: f64) -> impl Fn(&mut StencilPoint<'_>) + Copy {
    let c = velocity * dt / dx;
    move |point: &mut StencilPoint<'_>| {
        for v in 0..point.num_output() {
            let u = point.input()[v];
            let flux = if c >= 0.0 {
                u - point.left().input()[v]
            } else {
                point.right().input()[v] - u
            };
            point.output()[v] = u - c * flux;
        }
    }
}

/// Value and centered first derivative of variable 0.
///
/// Accepts any input width, so repeated application recomputes the
/// derivative from the value it carried forward.
pub fn gradient(dx: f64) -> impl Fn(&mut StencilPoint<'_>) + Copy {
    let inv_2dx = 0.5 / dx;
    move |point: &mut StencilPoint<'_>| {
        let u = point.input()[0];
        let slope = (point.right().input()[0] - point.left().input()[0]) * inv_2dx;
        point.output().copy_from_slice(&[u, slope]);
    }
}

/// Apply a configured operator once.
pub fn apply_kind<C>(grid: &mut Grid<'_, C>, kind: &OperatorKind) -> Result<(), GridError>
where
    C: Communicator + ?Sized,
{
    let n = grid.num_variables();
    let dx = grid.dx();
    match *kind {
        OperatorKind::Identity => grid.apply_op(n, n, identity),
        OperatorKind::Diffusion { coefficient, dt } => {
            grid.apply_op(n, n, diffusion(coefficient, dt, dx))
        }
        OperatorKind::Advection { velocity, dt } => {
            grid.apply_op(n, n, advection(velocity, dt, dx))
        }
        OperatorKind::Gradient => grid.apply_op(n, kind.output_variables(n), gradient(dx)),
    }
}
