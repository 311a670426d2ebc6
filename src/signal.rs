//! Time-varying signal sources feeding a network.
use itertools::Itertools;
use nalgebra::DVector;

/// A source producing a vector value at a given simulated time.
///
/// Sources are pure: evaluating twice at the same time must produce the same
/// value, so a simulation can be reset and rerun without rebuilding them.
pub trait TimeVaryingSource {
    /// The dimensionality of the produced value.
    fn dims(&self) -> usize;

    /// Evaluate the source at time `t`, in seconds.
    fn evaluate(&self, t: f64) -> DVector<f64>;
}

/// A source holding a constant vector value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantSource {
    value: DVector<f64>,
}

impl ConstantSource {
    pub fn new(value: &[f64]) -> Self {
        ConstantSource {
            value: DVector::from_column_slice(value),
        }
    }
}

impl TimeVaryingSource for ConstantSource {
    fn dims(&self) -> usize {
        self.value.len()
    }

    fn evaluate(&self, _t: f64) -> DVector<f64> {
        self.value.clone()
    }
}

/// A source evaluating an arbitrary function of time.
pub struct FnSource<F>
where
    F: Fn(f64) -> DVector<f64>,
{
    dims: usize,
    f: F,
}

impl<F> FnSource<F>
where
    F: Fn(f64) -> DVector<f64>,
{
    pub fn new(dims: usize, f: F) -> Self {
        FnSource { dims, f }
    }
}

impl<F> TimeVaryingSource for FnSource<F>
where
    F: Fn(f64) -> DVector<f64>,
{
    fn dims(&self) -> usize {
        self.dims
    }

    fn evaluate(&self, t: f64) -> DVector<f64> {
        (self.f)(t)
    }
}

/// A scalar step function defined by a breakpoint table.
///
/// The value at time `t` is the value of the latest breakpoint whose time is
/// strictly less than `t`, or `0.0` before (and at) the earliest breakpoint.
/// The comparison is strict: evaluated exactly at a breakpoint, the function
/// still returns the previous segment's value.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseConstant {
    /// Breakpoints as (time, value) pairs, sorted by time descending.
    breakpoints: Vec<(f64, f64)>,
}

impl PiecewiseConstant {
    pub fn new(table: &[(f64, f64)]) -> Self {
        let breakpoints = table
            .iter()
            .copied()
            .sorted_by(|a, b| b.0.partial_cmp(&a.0).expect("Invalid breakpoint time"))
            .collect();
        PiecewiseConstant { breakpoints }
    }

    /// The value of the step function at time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        for &(time, value) in &self.breakpoints {
            if t > time {
                return value;
            }
        }
        0.0
    }
}

impl TimeVaryingSource for PiecewiseConstant {
    fn dims(&self) -> usize {
        1
    }

    fn evaluate(&self, t: f64) -> DVector<f64> {
        DVector::from_element(1, self.value_at(t))
    }
}
