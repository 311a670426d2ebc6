//! This crate provides tools for building and simulating small networks of
//! spiking neurons with the Neural Engineering Framework (NEF) in Rust.
//!
//! A network is a named container of input nodes (time-varying signal
//! sources) and ensembles (populations of leaky integrate-and-fire neurons
//! jointly representing a low-dimensional vector). Directed connections carry
//! a linearly transformed, low-pass filtered signal between nodes, optionally
//! decoding a nonlinear function of the source ensemble's state. Probes
//! record a node's signal over simulated time at a fixed sampling interval.
//!
//! # Building a Network
//!
//! ```rust
//! use rusty_nef::network::Network;
//! use rusty_nef::signal::ConstantSource;
//! use nalgebra::dmatrix;
//!
//! let mut network = Network::new("example");
//!
//! // A constant scalar source driving a 2-dimensional ensemble
//! network.make_input("stim", ConstantSource::new(&[0.5])).unwrap();
//! network.make("pop", 50, 2, 1.0).unwrap();
//! network.connect("stim", "pop", dmatrix![1.0; 0.0], 0.01).unwrap();
//!
//! assert_eq!(network.num_inputs(), 1);
//! assert_eq!(network.num_ensembles(), 1);
//! assert_eq!(network.num_connections(), 1);
//! ```
//!
//! # Running a Network
//!
//! ```rust
//! use rusty_nef::network::Network;
//! use rusty_nef::signal::ConstantSource;
//! use nalgebra::dmatrix;
//!
//! let mut network = Network::new("example");
//! network.make_input("stim", ConstantSource::new(&[0.5])).unwrap();
//! network.make("pop", 50, 1, 1.0).unwrap();
//! network.connect("stim", "pop", dmatrix![1.0], 0.01).unwrap();
//! let probe = network.make_probe("pop", 0.01, 0.02).unwrap();
//!
//! network.run(0.1).unwrap();
//! assert_eq!(network.probe(probe).data().len(), 10);
//! ```

pub mod config;
pub mod connection;
pub mod ensemble;
pub mod error;
pub mod network;
pub mod neuron;
pub mod plot;
pub mod probe;
pub mod signal;

/// The membrane time constant of the LIF neurons, in seconds.
pub const TAU_RC: f64 = 0.02;
/// The absolute refractory period of the LIF neurons, in seconds.
pub const TAU_REF: f64 = 0.002;
/// The nominal threshold for a neuron to fire.
pub const FIRING_THRESHOLD: f64 = 1.0;
