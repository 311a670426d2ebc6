//! Module implementing the directed, filtered connections of a network.

use nalgebra::{DMatrix, DVector};

use crate::error::NefError;
use crate::network::{NodeRef, Terminal};

/// A pure function applied to a signal before the connection transform.
pub type DecodedFn = Box<dyn Fn(&DVector<f64>) -> DVector<f64>>;

/// A directed edge carrying a linearly transformed, low-pass filtered signal
/// from a source node to a destination terminal.
///
/// For an ensemble source, an optional nonlinear function is folded into the
/// decoding weights at construction time; for an input-node source, the
/// function is kept and evaluated at every step.
pub struct Connection {
    source: NodeRef,
    target: Terminal,
    /// Linear map from the pre-signal to the destination space, destination rows by source columns.
    transform: DMatrix<f64>,
    /// Function applied to the source value at runtime (input-node sources only).
    func: Option<DecodedFn>,
    /// Decoding weights of the source ensemble, one column per pre-signal dimension.
    decoders: Option<DMatrix<f64>>,
    /// The post-synaptic time constant of the low-pass filter, in seconds.
    pstc: f64,
    /// The filtered signal delivered to the destination.
    filtered: DVector<f64>,
}

impl Connection {
    /// Create a new connection with the specified parameters.
    /// Returns an error if the filter time constant is negative.
    ///
    /// The transform shape is validated against the connected nodes by the
    /// network, which knows their dimensionalities.
    pub fn build(
        source: NodeRef,
        target: Terminal,
        transform: DMatrix<f64>,
        func: Option<DecodedFn>,
        decoders: Option<DMatrix<f64>>,
        pstc: f64,
    ) -> Result<Self, NefError> {
        if pstc < 0.0 {
            return Err(NefError::InvalidParameter(
                "Post-synaptic time constant must be non-negative".to_string(),
            ));
        }
        let filtered = DVector::zeros(transform.nrows());
        Ok(Connection {
            source,
            target,
            transform,
            func,
            decoders,
            pstc,
            filtered,
        })
    }

    /// The pre-signal of the connection given the raw source value: the
    /// decoded spike output for an ensemble source, the (optionally
    /// function-mapped) node value for an input source.
    pub fn pre_signal(&self, source_value: &DVector<f64>) -> DVector<f64> {
        match &self.decoders {
            Some(decoders) => decoders.transpose() * source_value,
            None => match &self.func {
                Some(f) => f(source_value),
                None => source_value.clone(),
            },
        }
    }

    /// Advance the connection filter by `dt` seconds with the given pre-signal.
    pub fn step(&mut self, pre: &DVector<f64>, dt: f64) -> &DVector<f64> {
        let raw = &self.transform * pre;
        if self.pstc > 0.0 {
            let decay = (-dt / self.pstc).exp();
            self.filtered = &self.filtered * decay + raw * (1.0 - decay);
        } else {
            self.filtered = raw;
        }
        &self.filtered
    }

    /// Reset the filter state.
    pub fn reset(&mut self) {
        self.filtered.fill(0.0);
    }

    /// The filtered signal delivered to the destination.
    pub fn output(&self) -> &DVector<f64> {
        &self.filtered
    }

    /// Returns the source node of the connection.
    pub fn source(&self) -> NodeRef {
        self.source
    }

    /// Returns the destination terminal of the connection.
    pub fn target(&self) -> Terminal {
        self.target
    }

    /// Returns the filter time constant of the connection.
    pub fn pstc(&self) -> f64 {
        self.pstc
    }

    /// Returns the transform of the connection.
    pub fn transform(&self) -> &DMatrix<f64> {
        &self.transform
    }
}
