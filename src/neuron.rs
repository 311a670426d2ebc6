//! Module implementing the spiking leaky integrate-and-fire (LIF) neurons.

use serde::{Deserialize, Serialize};

use crate::error::NefError;
use crate::{FIRING_THRESHOLD, TAU_RC, TAU_REF};

/// Represents a spiking LIF neuron.
///
/// The neuron receives a normalized scalar input `x` (the dot product of its
/// encoder with the represented value, scaled by the ensemble radius) and
/// drives its membrane with the current `gain * x + bias`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LifNeuron {
    /// The gain applied to the normalized input.
    gain: f64,
    /// The background current of the neuron.
    bias: f64,
    /// The membrane potential, normalized so that the neuron fires at [FIRING_THRESHOLD].
    potential: f64,
    /// The remaining refractory time, in seconds.
    refractory: f64,
}

impl LifNeuron {
    pub fn new(gain: f64, bias: f64) -> Self {
        LifNeuron {
            gain,
            bias,
            potential: 0.0,
            refractory: 0.0,
        }
    }

    /// Create a neuron from its tuning curve: the represented value at which
    /// it starts firing (intercept) and its firing rate at the edge of the
    /// represented range (max_rate, in Hz).
    /// Returns an error if the intercept is not below 1 or the rate is non-positive.
    pub fn from_tuning(intercept: f64, max_rate: f64) -> Result<Self, NefError> {
        if max_rate <= 0.0 {
            return Err(NefError::InvalidParameter(
                "Maximum firing rate must be positive".to_string(),
            ));
        }
        if intercept >= 1.0 {
            return Err(NefError::InvalidParameter(
                "Intercept must be strictly less than 1".to_string(),
            ));
        }
        // Current at which the static rate curve reaches max_rate
        let j_max = 1.0 / (1.0 - ((TAU_REF - 1.0 / max_rate) / TAU_RC).exp());
        let gain = (j_max - 1.0) / (1.0 - intercept);
        let bias = 1.0 - gain * intercept;
        Ok(LifNeuron::new(gain, bias))
    }

    /// The input current for a normalized input `x`.
    pub fn current(&self, x: f64) -> f64 {
        self.gain * x + self.bias
    }

    /// The steady-state firing rate (in Hz) for a normalized input `x`.
    pub fn rate(&self, x: f64) -> f64 {
        Self::rate_from_current(self.current(x))
    }

    /// The steady-state firing rate (in Hz) for a constant input current.
    pub fn rate_from_current(current: f64) -> f64 {
        if current > FIRING_THRESHOLD {
            1.0 / (TAU_REF + TAU_RC * (1.0 + 1.0 / (current - FIRING_THRESHOLD)).ln())
        } else {
            0.0
        }
    }

    /// Advance the membrane state by `dt` seconds under the given input current.
    /// Returns `true` if the neuron fires during this step.
    pub fn step(&mut self, current: f64, dt: f64) -> bool {
        if self.refractory > 0.0 {
            self.refractory -= dt;
            if self.refractory < 0.0 {
                self.refractory = 0.0;
            }
            return false;
        }
        self.potential += dt * (current - self.potential) / TAU_RC;
        if self.potential < 0.0 {
            self.potential = 0.0;
        }
        if self.potential > FIRING_THRESHOLD {
            self.potential = 0.0;
            self.refractory = TAU_REF;
            return true;
        }
        false
    }

    /// Reset the membrane state to rest.
    pub fn reset(&mut self) {
        self.potential = 0.0;
        self.refractory = 0.0;
    }

    /// Returns the gain of the neuron.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Returns the bias current of the neuron.
    pub fn bias(&self) -> f64 {
        self.bias
    }
}
