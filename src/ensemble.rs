//! Ensembles of LIF neurons jointly representing a low-dimensional signal.

use log;
use nalgebra::{DMatrix, DVector};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};
use rayon::prelude::*;

use crate::error::NefError;
use crate::neuron::LifNeuron;

/// Minimum number of neurons to parallelize the membrane updates.
pub const MIN_NEURONS_PAR: usize = 10;

/// Range of the sampled tuning-curve intercepts.
pub const LIM_INTERCEPTS: (f64, f64) = (-1.0, 1.0);
/// Range of the sampled maximum firing rates, in Hz.
pub const LIM_MAX_RATES: (f64, f64) = (200.0, 400.0);
/// Relative noise level used to regularize the decoder solve.
pub const DECODER_NOISE: f64 = 0.1;

/// A named population of spiking neurons representing a vector within a ball
/// of the given radius.
///
/// The tuning curves, encoders, and evaluation points are sampled once at
/// construction; afterwards only the membrane states mutate during a run.
pub struct Ensemble {
    name: String,
    neurons: Vec<LifNeuron>,
    /// Unit encoding vectors, one row per neuron.
    encoders: DMatrix<f64>,
    /// The expected magnitude bound of the represented values.
    radius: f64,
    dims: usize,
    /// Evaluation points used to solve for decoders, one row per point.
    eval_points: DMatrix<f64>,
    /// Static firing rates at the evaluation points, one column per neuron.
    activities: DMatrix<f64>,
    /// Spike output of the last step, scaled by the inverse time step.
    spikes: DVector<f64>,
}

impl Ensemble {
    /// Create an ensemble with randomly sampled tuning curves, encoders, and
    /// evaluation points. The sampling is fully determined by the seed.
    pub fn build(
        name: &str,
        num_neurons: usize,
        dims: usize,
        radius: f64,
        seed: u64,
        num_eval_points: usize,
    ) -> Result<Self, NefError> {
        if num_neurons == 0 || dims == 0 {
            return Err(NefError::InvalidParameter(
                "Ensembles must have at least one neuron and one dimension".to_string(),
            ));
        }
        if radius <= 0.0 {
            return Err(NefError::InvalidParameter(
                "Ensemble radius must be positive".to_string(),
            ));
        }
        if num_eval_points == 0 {
            return Err(NefError::InvalidParameter(
                "At least one evaluation point is required".to_string(),
            ));
        }

        let mut rng = ChaCha12Rng::seed_from_u64(seed);

        let intercept_dist = Uniform::new(LIM_INTERCEPTS.0, LIM_INTERCEPTS.1);
        let max_rate_dist = Uniform::new_inclusive(LIM_MAX_RATES.0, LIM_MAX_RATES.1);
        let neurons: Vec<LifNeuron> = (0..num_neurons)
            .map(|_| {
                LifNeuron::from_tuning(intercept_dist.sample(&mut rng), max_rate_dist.sample(&mut rng))
            })
            .collect::<Result<_, _>>()?;

        let encoders = DMatrix::from_fn(num_neurons, dims, |_, _| {
            StandardNormal.sample(&mut rng)
        });
        let encoders = normalize_rows(encoders, &mut rng);

        let eval_points = DMatrix::from_rows(
            &(0..num_eval_points)
                .map(|_| sample_in_ball(dims, radius, &mut rng).transpose())
                .collect::<Vec<_>>(),
        );

        let activities = DMatrix::from_fn(num_eval_points, num_neurons, |p, i| {
            let x = encoders.row(i).dot(&eval_points.row(p)) / radius;
            neurons[i].rate(x)
        });

        log::debug!(
            "Ensemble '{}' sampled: {} neurons, {} dimensions, radius {}",
            name,
            num_neurons,
            dims,
            radius
        );

        Ok(Ensemble {
            name: name.to_string(),
            neurons,
            encoders,
            radius,
            dims,
            eval_points,
            activities,
            spikes: DVector::zeros(num_neurons),
        })
    }

    /// Solve for the decoding weights of a function of the represented value.
    /// When no function is given, the identity is decoded.
    ///
    /// The solve is an L2-regularized least squares over the evaluation
    /// points, with the regularization scaled to a fraction of the highest
    /// static firing rate.
    pub fn decoders(
        &self,
        func: Option<&dyn Fn(&DVector<f64>) -> DVector<f64>>,
        out_dims: usize,
    ) -> Result<DMatrix<f64>, NefError> {
        let num_points = self.eval_points.nrows();
        let num_neurons = self.neurons.len();

        let mut targets = DMatrix::zeros(num_points, out_dims);
        for p in 0..num_points {
            let x = self.eval_points.row(p).transpose();
            let y = match func {
                Some(f) => f(&x),
                None => x,
            };
            if y.len() != out_dims {
                return Err(NefError::DimensionMismatch {
                    expected: out_dims,
                    actual: y.len(),
                });
            }
            targets.row_mut(p).copy_from(&y.transpose());
        }

        let sigma = DECODER_NOISE * self.activities.max();
        let gram = self.activities.transpose() * &self.activities
            + DMatrix::identity(num_neurons, num_neurons) * (num_points as f64 * sigma * sigma);
        let rhs = self.activities.transpose() * targets;

        let decoders = gram
            .cholesky()
            .ok_or_else(|| {
                NefError::DecoderSolve(format!(
                    "Cholesky factorization failed for ensemble '{}'",
                    self.name
                ))
            })?
            .solve(&rhs);

        log::debug!(
            "Solved {} decoding weights for ensemble '{}' ({} outputs)",
            num_neurons * out_dims,
            self.name,
            out_dims
        );
        Ok(decoders)
    }

    /// Advance all membranes by `dt` seconds under the given represented-space
    /// input, and update the spike output of the ensemble.
    pub fn step(&mut self, input: &DVector<f64>, dt: f64) {
        let enc = &self.encoders * input;
        let currents: Vec<f64> = self
            .neurons
            .iter()
            .enumerate()
            .map(|(i, neuron)| neuron.current(enc[i] / self.radius))
            .collect();

        let fired: Vec<bool> = if self.neurons.len() >= MIN_NEURONS_PAR {
            self.neurons
                .par_iter_mut()
                .zip(currents.par_iter())
                .map(|(neuron, &current)| neuron.step(current, dt))
                .collect()
        } else {
            self.neurons
                .iter_mut()
                .zip(currents.iter())
                .map(|(neuron, &current)| neuron.step(current, dt))
                .collect()
        };

        self.spikes = DVector::from_iterator(
            self.neurons.len(),
            fired.iter().map(|&f| if f { 1.0 / dt } else { 0.0 }),
        );
    }

    /// Reset the membrane states and the spike output.
    pub fn reset(&mut self) {
        self.neurons.iter_mut().for_each(|neuron| neuron.reset());
        self.spikes.fill(0.0);
    }

    /// The spike output of the last step, one entry per neuron.
    pub fn spikes(&self) -> &DVector<f64> {
        &self.spikes
    }

    /// Returns the name of the ensemble.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of neurons in the ensemble.
    pub fn num_neurons(&self) -> usize {
        self.neurons.len()
    }

    /// The dimensionality of the represented signal.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Returns the radius of the ensemble.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[cfg(test)]
    pub(crate) fn activities(&self) -> &DMatrix<f64> {
        &self.activities
    }

    #[cfg(test)]
    pub(crate) fn eval_points(&self) -> &DMatrix<f64> {
        &self.eval_points
    }
}

/// Normalize the rows of a matrix to unit norm, resampling degenerate rows.
fn normalize_rows<R: RngCore>(mut matrix: DMatrix<f64>, rng: &mut R) -> DMatrix<f64> {
    for i in 0..matrix.nrows() {
        let mut norm = matrix.row(i).norm();
        while norm < 1e-12 {
            for j in 0..matrix.ncols() {
                matrix[(i, j)] = StandardNormal.sample(rng);
            }
            norm = matrix.row(i).norm();
        }
        let mut row = matrix.row_mut(i);
        row /= norm;
    }
    matrix
}

/// Sample a point uniformly from the ball of the given radius.
fn sample_in_ball<R: RngCore>(dims: usize, radius: f64, rng: &mut R) -> DVector<f64> {
    let mut direction = DVector::from_fn(dims, |_, _| -> f64 { StandardNormal.sample(rng) });
    let mut norm = direction.norm();
    while norm < 1e-12 {
        direction = DVector::from_fn(dims, |_, _| -> f64 { StandardNormal.sample(rng) });
        norm = direction.norm();
    }
    let u: f64 = rng.gen();
    direction * (radius * u.powf(1.0 / dims as f64) / norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_deterministic() {
        let a = Ensemble::build("A", 30, 2, 1.5, 42, 100).unwrap();
        let b = Ensemble::build("A", 30, 2, 1.5, 42, 100).unwrap();
        assert_eq!(a.activities(), b.activities());
    }

    #[test]
    fn test_build_invalid() {
        assert!(Ensemble::build("A", 0, 2, 1.5, 0, 100).is_err());
        assert!(Ensemble::build("A", 30, 2, 0.0, 0, 100).is_err());
    }

    #[test]
    fn test_eval_points_within_radius() {
        let ensemble = Ensemble::build("A", 10, 3, 1.5, 7, 200).unwrap();
        for p in 0..ensemble.eval_points().nrows() {
            assert!(ensemble.eval_points().row(p).norm() <= 1.5 + 1e-12);
        }
    }

    #[test]
    fn test_identity_decode_accuracy() {
        let ensemble = Ensemble::build("A", 225, 2, 1.5, 42, 500).unwrap();
        let decoders = ensemble.decoders(None, 2).unwrap();
        let reconstruction = ensemble.activities() * decoders;
        let num_points = ensemble.eval_points().nrows() as f64;
        let rmse = ((&reconstruction - ensemble.eval_points()).norm_squared() / num_points).sqrt();
        // Decoding error stays a small fraction of the radius
        assert!(rmse < 0.15 * ensemble.radius(), "rmse = {}", rmse);
    }

    #[test]
    fn test_function_decode_dims() {
        let ensemble = Ensemble::build("A", 50, 2, 1.5, 42, 200).unwrap();
        let product = |x: &DVector<f64>| DVector::from_element(1, x[0] * x[1]);
        let decoders = ensemble.decoders(Some(&product), 1).unwrap();
        assert_eq!(decoders.nrows(), 50);
        assert_eq!(decoders.ncols(), 1);

        // A mismatched output dimensionality is rejected
        assert_eq!(
            ensemble.decoders(Some(&product), 2),
            Err(NefError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_step_spikes_scale() {
        let mut ensemble = Ensemble::build("A", 50, 1, 1.0, 42, 100).unwrap();
        let dt = 1e-3;
        let input = DVector::from_element(1, 1.0);
        let mut any_spike = false;
        for _ in 0..100 {
            ensemble.step(&input, dt);
            for i in 0..ensemble.num_neurons() {
                let s = ensemble.spikes()[i];
                assert!(s == 0.0 || s == 1.0 / dt);
                any_spike |= s > 0.0;
            }
        }
        // A constant drive at the edge of the range makes at least one neuron fire
        assert!(any_spike);
    }
}
