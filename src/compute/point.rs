//! Stencil point views handed to local operators.
//!
//! A view borrows one point of the input buffer, the matching slot of the
//! output buffer, and read-only views of the two adjacent input points. Views
//! live only for the duration of a single operator call.

/// Read-only view of a neighboring input point.
#[derive(Debug, Clone, Copy)]
pub struct NeighborView<'a> {
    x: f64,
    input: &'a [f64],
}

impl<'a> NeighborView<'a> {
    pub fn new(x: f64, input: &'a [f64]) -> Self {
        Self { x, input }
    }

    /// Neighbor with no input values, used while initializing.
    pub fn detached(x: f64) -> Self {
        Self { x, input: &[] }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn input(&self) -> &'a [f64] {
        self.input
    }
}

/// Mutable view of one grid point for a local operator.
#[derive(Debug)]
pub struct StencilPoint<'a> {
    x: f64,
    input: &'a [f64],
    output: &'a mut [f64],
    left: NeighborView<'a>,
    right: NeighborView<'a>,
}

impl<'a> StencilPoint<'a> {
    /// Create a view with detached neighbors at the point's own coordinate.
    pub fn new(x: f64, input: &'a [f64], output: &'a mut [f64]) -> Self {
        Self {
            x,
            input,
            output,
            left: NeighborView::detached(x),
            right: NeighborView::detached(x),
        }
    }

    /// Attach the left and right neighbors.
    pub fn with_neighbors(mut self, left: NeighborView<'a>, right: NeighborView<'a>) -> Self {
        self.left = left;
        self.right = right;
        self
    }

    /// Spatial coordinate of this point.
    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Input values of this point. Empty during initialization.
    #[inline]
    pub fn input(&self) -> &'a [f64] {
        self.input
    }

    /// Output slots the operator must fill.
    #[inline]
    pub fn output(&mut self) -> &mut [f64] {
        &mut *self.output
    }

    #[inline]
    pub fn num_input(&self) -> usize {
        self.input.len()
    }

    #[inline]
    pub fn num_output(&self) -> usize {
        self.output.len()
    }

    #[inline]
    pub fn left(&self) -> &NeighborView<'a> {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &NeighborView<'a> {
        &self.right
    }
}

/// Read-only neighbor with a compile-time variable count.
#[derive(Debug, Clone, Copy)]
pub struct FixedNeighbor<'a, const IN: usize> {
    x: f64,
    input: &'a [f64; IN],
}

impl<'a, const IN: usize> FixedNeighbor<'a, IN> {
    pub fn new(x: f64, input: &'a [f64; IN]) -> Self {
        Self { x, input }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn input(&self) -> &'a [f64; IN] {
        self.input
    }
}

/// Stencil view whose input and output widths are fixed at compile time.
#[derive(Debug)]
pub struct FixedPoint<'a, const IN: usize, const OUT: usize> {
    x: f64,
    input: &'a [f64; IN],
    output: &'a mut [f64; OUT],
    left: FixedNeighbor<'a, IN>,
    right: FixedNeighbor<'a, IN>,
}

impl<'a, const IN: usize, const OUT: usize> FixedPoint<'a, IN, OUT> {
    pub fn new(
        x: f64,
        input: &'a [f64; IN],
        output: &'a mut [f64; OUT],
        left: FixedNeighbor<'a, IN>,
        right: FixedNeighbor<'a, IN>,
    ) -> Self {
        Self {
            x,
            input,
            output,
            left,
            right,
        }
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn input(&self) -> &'a [f64; IN] {
        self.input
    }

    #[inline]
    pub fn output(&mut self) -> &mut [f64; OUT] {
        &mut *self.output
    }

    #[inline]
    pub fn left(&self) -> &FixedNeighbor<'a, IN> {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &FixedNeighbor<'a, IN> {
        &self.right
    }
}
