//! Network structure: named input nodes, ensembles, connections, and probes.

use std::collections::HashMap;

use log;
use nalgebra::{DMatrix, DVector};

use crate::config::SimConfig;
use crate::connection::{Connection, DecodedFn};
use crate::ensemble::Ensemble;
use crate::error::NefError;
use crate::probe::Probe;
use crate::signal::TimeVaryingSource;

/// A reference to a named node in a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    Input(usize),
    Ensemble(usize),
}

/// The destination of a connection: either a node's input or a probe tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Node(NodeRef),
    Probe(usize),
}

/// The identifier of a probe, returned by [Network::make_probe].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeId(usize);

/// A named signal source evaluated at every simulation step.
pub struct InputNode {
    name: String,
    source: Box<dyn TimeVaryingSource>,
    /// The output computed at the current simulated time.
    value: DVector<f64>,
}

impl InputNode {
    /// Returns the name of the node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dimensionality of the produced value.
    pub fn dims(&self) -> usize {
        self.source.dims()
    }
}

/// A named container of nodes, connections, and probes, and the simulation
/// loop advancing them.
///
/// The structure is fixed once built; running the network only mutates the
/// membrane states, the connection filters, and the probe buffers.
pub struct Network {
    name: String,
    config: SimConfig,
    inputs: Vec<InputNode>,
    ensembles: Vec<Ensemble>,
    connections: Vec<Connection>,
    probes: Vec<Probe>,
    names: HashMap<String, NodeRef>,
    /// The current simulated time, in seconds.
    time: f64,
}

impl Network {
    /// Create an empty network with the default configuration.
    pub fn new(name: &str) -> Self {
        Self::with_config(name, SimConfig::default())
    }

    /// Create an empty network with the specified configuration.
    pub fn with_config(name: &str, config: SimConfig) -> Self {
        Network {
            name: name.to_string(),
            config,
            inputs: Vec::new(),
            ensembles: Vec::new(),
            connections: Vec::new(),
            probes: Vec::new(),
            names: HashMap::new(),
            time: 0.0,
        }
    }

    /// Add a named input node producing the source's value at every step.
    /// Returns an error if the name is already used or the source is inconsistent.
    pub fn make_input(
        &mut self,
        name: &str,
        source: impl TimeVaryingSource + 'static,
    ) -> Result<(), NefError> {
        self.check_name(name)?;
        let value = source.evaluate(0.0);
        if value.len() != source.dims() {
            return Err(NefError::DimensionMismatch {
                expected: source.dims(),
                actual: value.len(),
            });
        }
        self.names
            .insert(name.to_string(), NodeRef::Input(self.inputs.len()));
        self.inputs.push(InputNode {
            name: name.to_string(),
            source: Box::new(source),
            value,
        });
        Ok(())
    }

    /// Add a named ensemble of `num_neurons` neurons representing a
    /// `dims`-dimensional signal within the given radius.
    pub fn make(
        &mut self,
        name: &str,
        num_neurons: usize,
        dims: usize,
        radius: f64,
    ) -> Result<(), NefError> {
        self.check_name(name)?;
        let seed = self.config.seed.wrapping_add(self.ensembles.len() as u64);
        let ensemble = Ensemble::build(
            name,
            num_neurons,
            dims,
            radius,
            seed,
            self.config.num_eval_points,
        )?;
        self.names
            .insert(name.to_string(), NodeRef::Ensemble(self.ensembles.len()));
        self.ensembles.push(ensemble);
        Ok(())
    }

    /// Connect two named nodes with a linear transform and a post-synaptic
    /// filter time constant.
    ///
    /// The transform maps the source space to the target space: one row per
    /// target dimension, one column per source dimension.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        transform: DMatrix<f64>,
        pstc: f64,
    ) -> Result<(), NefError> {
        self.connect_inner(source, target, None, transform, pstc)
    }

    /// Connect two named nodes, decoding a function of the source signal
    /// before the transform is applied.
    pub fn connect_func(
        &mut self,
        source: &str,
        target: &str,
        func: DecodedFn,
        transform: DMatrix<f64>,
        pstc: f64,
    ) -> Result<(), NefError> {
        self.connect_inner(source, target, Some(func), transform, pstc)
    }

    fn connect_inner(
        &mut self,
        source: &str,
        target: &str,
        func: Option<DecodedFn>,
        transform: DMatrix<f64>,
        pstc: f64,
    ) -> Result<(), NefError> {
        let source_ref = self.lookup(source)?;
        let target_ref = self.lookup(target)?;
        let target_idx = match target_ref {
            NodeRef::Ensemble(i) => i,
            NodeRef::Input(_) => {
                return Err(NefError::InvalidOperation(format!(
                    "Cannot connect into input node '{}'",
                    target
                )))
            }
        };

        let source_dims = self.node_dims(source_ref);
        let pre_dims = match &func {
            Some(f) => f(&DVector::zeros(source_dims)).len(),
            None => source_dims,
        };
        if transform.ncols() != pre_dims {
            return Err(NefError::DimensionMismatch {
                expected: pre_dims,
                actual: transform.ncols(),
            });
        }
        let target_dims = self.ensembles[target_idx].dims();
        if transform.nrows() != target_dims {
            return Err(NefError::DimensionMismatch {
                expected: target_dims,
                actual: transform.nrows(),
            });
        }

        // For an ensemble source the function is folded into the decoders;
        // for an input source it is evaluated at runtime.
        let (func, decoders) = match source_ref {
            NodeRef::Ensemble(i) => {
                let decoders = self.ensembles[i].decoders(func.as_deref(), pre_dims)?;
                (None, Some(decoders))
            }
            NodeRef::Input(_) => (func, None),
        };

        self.connections.push(Connection::build(
            source_ref,
            Terminal::Node(target_ref),
            transform,
            func,
            decoders,
            pstc,
        )?);
        log::debug!("Connected '{}' to '{}' in network '{}'", source, target, self.name);
        Ok(())
    }

    /// Attach a probe recording the named node's signal every `sample_every`
    /// seconds, filtered with the time constant `pstc`.
    ///
    /// Probing an ensemble attaches an internal decoded, filtered connection
    /// feeding the probe; probing an input node taps the value directly and
    /// filters it inside the probe.
    pub fn make_probe(
        &mut self,
        target: &str,
        sample_every: f64,
        pstc: f64,
    ) -> Result<ProbeId, NefError> {
        let target_ref = self.lookup(target)?;
        let probe_idx = self.probes.len();
        let probe = match target_ref {
            NodeRef::Input(i) => {
                Probe::build(target_ref, self.inputs[i].dims(), sample_every, pstc, None)?
            }
            NodeRef::Ensemble(i) => {
                let dims = self.ensembles[i].dims();
                let decoders = self.ensembles[i].decoders(None, dims)?;
                let conn_idx = self.connections.len();
                self.connections.push(Connection::build(
                    target_ref,
                    Terminal::Probe(probe_idx),
                    DMatrix::identity(dims, dims),
                    None,
                    Some(decoders),
                    pstc,
                )?);
                Probe::build(target_ref, dims, sample_every, 0.0, Some(conn_idx))?
            }
        };
        self.probes.push(probe);
        Ok(ProbeId(probe_idx))
    }

    /// Run the simulation for `t_final` seconds of simulated time, advancing
    /// from the current time. The call blocks until completion.
    pub fn run(&mut self, t_final: f64) -> Result<(), NefError> {
        if t_final <= 0.0 {
            return Err(NefError::InvalidParameter(
                "Simulation duration must be positive".to_string(),
            ));
        }
        log::info!("Starting simulation of network '{}'...", self.name);

        let dt = self.config.dt;
        let num_steps = (t_final / dt).round() as usize;

        // For logging purposes
        let start = self.time;
        let log_interval = t_final / 100.0;
        let mut last_log_time = start;

        for _ in 0..num_steps {
            let t = self.time;

            // Evaluate the input nodes at the current time
            for node in self.inputs.iter_mut() {
                node.value = node.source.evaluate(t);
            }

            // Compute the pre-signals from the previous step's node outputs
            let pres: Vec<DVector<f64>> = self
                .connections
                .iter()
                .map(|connection| {
                    let source_value = match connection.source() {
                        NodeRef::Input(i) => &self.inputs[i].value,
                        NodeRef::Ensemble(i) => self.ensembles[i].spikes(),
                    };
                    connection.pre_signal(source_value)
                })
                .collect();

            // Advance the connection filters and accumulate the ensemble inputs
            let mut accumulated: Vec<DVector<f64>> = self
                .ensembles
                .iter()
                .map(|ensemble| DVector::zeros(ensemble.dims()))
                .collect();
            for (connection, pre) in self.connections.iter_mut().zip(pres.iter()) {
                let target = connection.target();
                let output = connection.step(pre, dt);
                if let Terminal::Node(NodeRef::Ensemble(i)) = target {
                    accumulated[i] += output;
                }
            }

            // Advance the ensembles
            for (ensemble, input) in self.ensembles.iter_mut().zip(accumulated.iter()) {
                ensemble.step(input, dt);
            }

            // Update the probes
            for p in 0..self.probes.len() {
                let value = match self.probes[p].conn() {
                    Some(c) => self.connections[c].output().clone(),
                    None => match self.probes[p].target() {
                        NodeRef::Input(i) => self.inputs[i].value.clone(),
                        // Ensemble probes are always fed by a connection
                        NodeRef::Ensemble(_) => continue,
                    },
                };
                self.probes[p].step(&value, t, dt);
            }

            self.time += dt;

            if self.time - last_log_time >= log_interval {
                let progress = (self.time - start) / t_final * 100.0;
                log::debug!(
                    "Simulation progress: {:.2}% (Time: {:.3}/{:.3})",
                    progress,
                    self.time,
                    start + t_final
                );
                last_log_time = self.time;
            }
        }

        log::info!("Simulation completed successfully!");
        Ok(())
    }

    /// Reset the simulated time and all mutable state: membranes, connection
    /// filters, and probe buffers. The network structure is left untouched.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.inputs.iter_mut().for_each(|node| node.value.fill(0.0));
        self.ensembles.iter_mut().for_each(|ensemble| ensemble.reset());
        self.connections
            .iter_mut()
            .for_each(|connection| connection.reset());
        self.probes.iter_mut().for_each(|probe| probe.reset());
    }

    /// A reference to a probe created by [Network::make_probe].
    pub fn probe(&self, id: ProbeId) -> &Probe {
        &self.probes[id.0]
    }

    /// A reference to a named ensemble.
    /// Returns `None` if the name does not refer to an ensemble.
    pub fn ensemble_ref(&self, name: &str) -> Option<&Ensemble> {
        match self.names.get(name) {
            Some(&NodeRef::Ensemble(i)) => Some(&self.ensembles[i]),
            _ => None,
        }
    }

    /// Returns the name of the network.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration of the network.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The current simulated time, in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The number of input nodes in the network.
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// The number of ensembles in the network.
    pub fn num_ensembles(&self) -> usize {
        self.ensembles.len()
    }

    /// The number of connections in the network, probe taps included.
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    /// The number of probes in the network.
    pub fn num_probes(&self) -> usize {
        self.probes.len()
    }

    fn check_name(&self, name: &str) -> Result<(), NefError> {
        if self.names.contains_key(name) {
            return Err(NefError::DuplicateNode(name.to_string()));
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<NodeRef, NefError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| NefError::UnknownNode(name.to_string()))
    }

    fn node_dims(&self, node: NodeRef) -> usize {
        match node {
            NodeRef::Input(i) => self.inputs[i].dims(),
            NodeRef::Ensemble(i) => self.ensembles[i].dims(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::ConstantSource;
    use nalgebra::dmatrix;

    fn small_network() -> Network {
        let mut network = Network::new("test");
        network
            .make_input("stim", ConstantSource::new(&[0.5]))
            .unwrap();
        network.make("pop", 30, 2, 1.0).unwrap();
        network
    }

    #[test]
    fn test_duplicate_name() {
        let mut network = small_network();
        assert_eq!(
            network.make_input("stim", ConstantSource::new(&[1.0])),
            Err(NefError::DuplicateNode("stim".to_string()))
        );
        assert_eq!(
            network.make("pop", 10, 1, 1.0),
            Err(NefError::DuplicateNode("pop".to_string()))
        );
    }

    #[test]
    fn test_unknown_node() {
        let mut network = small_network();
        assert_eq!(
            network.connect("stim", "nowhere", dmatrix![1.0; 0.0], 0.01),
            Err(NefError::UnknownNode("nowhere".to_string()))
        );
        assert!(network.make_probe("nowhere", 0.01, 0.0).is_err());
    }

    #[test]
    fn test_connect_into_input_rejected() {
        let mut network = small_network();
        assert!(matches!(
            network.connect("pop", "stim", dmatrix![1.0, 0.0], 0.01),
            Err(NefError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_transform_shape_validated() {
        let mut network = small_network();
        // Target 'pop' is 2-dimensional: a 1x1 transform must be rejected
        assert_eq!(
            network.connect("stim", "pop", dmatrix![1.0], 0.01),
            Err(NefError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
        // Source 'stim' is 1-dimensional: a 2x2 transform must be rejected
        assert_eq!(
            network.connect("stim", "pop", dmatrix![1.0, 0.0; 0.0, 1.0], 0.01),
            Err(NefError::DimensionMismatch {
                expected: 1,
                actual: 2
            })
        );
        assert!(network
            .connect("stim", "pop", dmatrix![1.0; 0.0], 0.01)
            .is_ok());
    }

    #[test]
    fn test_probe_on_ensemble_adds_connection() {
        let mut network = small_network();
        assert_eq!(network.num_connections(), 0);
        network.make_probe("pop", 0.01, 0.02).unwrap();
        assert_eq!(network.num_connections(), 1);
        assert_eq!(network.num_probes(), 1);

        // Probing an input adds no connection
        network.make_probe("stim", 0.001, 0.001).unwrap();
        assert_eq!(network.num_connections(), 1);
        assert_eq!(network.num_probes(), 2);
    }

    #[test]
    fn test_run_records_samples() {
        let mut network = small_network();
        network
            .connect("stim", "pop", dmatrix![1.0; 0.0], 0.01)
            .unwrap();
        let stim_probe = network.make_probe("stim", 0.001, 0.0).unwrap();
        let pop_probe = network.make_probe("pop", 0.01, 0.02).unwrap();

        network.run(0.1).unwrap();
        assert_eq!(network.probe(stim_probe).data().len(), 100);
        assert_eq!(network.probe(pop_probe).data().len(), 10);
        assert!(network
            .probe(pop_probe)
            .data()
            .iter()
            .all(|sample| sample.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_run_invalid_duration() {
        let mut network = small_network();
        assert!(network.run(0.0).is_err());
        assert!(network.run(-1.0).is_err());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut network = small_network();
        let probe = network.make_probe("stim", 0.001, 0.0).unwrap();
        network.run(0.01).unwrap();
        assert!(network.time() > 0.0);
        assert!(!network.probe(probe).data().is_empty());

        network.reset();
        assert_eq!(network.time(), 0.0);
        assert!(network.probe(probe).data().is_empty());
    }
}
