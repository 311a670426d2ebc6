//! Probes recording node signals over simulated time.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::NefError;
use crate::network::NodeRef;

/// A passive sampling tap recording a node's signal at a fixed interval.
///
/// A probe is created before a run, populated during it, and read afterwards
/// through [Probe::data].
pub struct Probe {
    target: NodeRef,
    /// The sampling interval, in seconds.
    sample_every: f64,
    /// The time constant of the probe's own low-pass filter (0 for none), in seconds.
    pstc: f64,
    /// The connection feeding this probe, for decoded ensemble taps.
    conn: Option<usize>,
    filtered: DVector<f64>,
    /// Recorded samples, one inner vector per sample.
    data: Vec<Vec<f64>>,
    /// The simulated time at which the next sample is due.
    next_sample: f64,
}

impl Probe {
    /// Create a new probe with the specified parameters.
    /// Returns an error if the sampling interval is non-positive or the filter
    /// time constant is negative.
    pub fn build(
        target: NodeRef,
        dims: usize,
        sample_every: f64,
        pstc: f64,
        conn: Option<usize>,
    ) -> Result<Self, NefError> {
        if sample_every <= 0.0 {
            return Err(NefError::InvalidParameter(
                "Probe sampling interval must be positive".to_string(),
            ));
        }
        if pstc < 0.0 {
            return Err(NefError::InvalidParameter(
                "Probe filter time constant must be non-negative".to_string(),
            ));
        }
        Ok(Probe {
            target,
            sample_every,
            pstc,
            conn,
            filtered: DVector::zeros(dims),
            data: Vec::new(),
            next_sample: 0.0,
        })
    }

    /// Advance the probe by one simulation step: update the filter with the
    /// current value and record a sample if one is due at time `t`.
    pub fn step(&mut self, value: &DVector<f64>, t: f64, dt: f64) {
        if self.pstc > 0.0 {
            let decay = (-dt / self.pstc).exp();
            self.filtered = &self.filtered * decay + value * (1.0 - decay);
        } else {
            self.filtered.copy_from(value);
        }
        if t >= self.next_sample - 1e-9 {
            self.data.push(self.filtered.iter().copied().collect());
            self.next_sample += self.sample_every;
        }
    }

    /// The recorded samples, in sampling order.
    pub fn data(&self) -> &[Vec<f64>] {
        &self.data
    }

    /// The recorded samples of a single dimension.
    pub fn dimension(&self, dim: usize) -> Vec<f64> {
        self.data.iter().map(|sample| sample[dim]).collect()
    }

    /// The time axis of the recorded samples for a run of duration `t_final`:
    /// the i-th entry is `t_final * i / n` with `n` the number of samples.
    pub fn time_axis(&self, t_final: f64) -> Vec<f64> {
        let n = self.data.len();
        (0..n).map(|i| t_final * i as f64 / n as f64).collect()
    }

    /// Clear the recorded samples and the filter state.
    pub fn reset(&mut self) {
        self.filtered.fill(0.0);
        self.data.clear();
        self.next_sample = 0.0;
    }

    /// Returns the probed node.
    pub fn target(&self) -> NodeRef {
        self.target
    }

    /// The index of the connection feeding this probe, if any.
    pub fn conn(&self) -> Option<usize> {
        self.conn
    }

    /// Returns the sampling interval of the probe.
    pub fn sample_every(&self) -> f64 {
        self.sample_every
    }

    /// Save the recorded samples to a JSON file.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), NefError> {
        let file = File::create(path).map_err(|e| NefError::IOError(e.to_string()))?;
        let record = ProbeRecord {
            sample_every: self.sample_every,
            data: self.data.clone(),
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &record)
            .map_err(|e| NefError::IOError(e.to_string()))
    }
}

/// The serialized form of a probe's recording.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ProbeRecord {
    pub sample_every: f64,
    pub data: Vec<Vec<f64>>,
}

impl ProbeRecord {
    /// Load a recording from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, NefError> {
        let file = File::open(path).map_err(|e| NefError::IOError(e.to_string()))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| NefError::IOError(e.to_string()))
    }
}
