//! End-to-end test of the controlled integrator example network.

use nalgebra::{dmatrix, DVector};

use rusty_nef::config::SimConfig;
use rusty_nef::network::{Network, ProbeId};
use rusty_nef::plot::Plotter;
use rusty_nef::signal::{ConstantSource, PiecewiseConstant, TimeVaryingSource};

fn input_table() -> PiecewiseConstant {
    PiecewiseConstant::new(&[
        (0.2, 5.0),
        (0.3, 0.0),
        (0.44, -10.0),
        (0.54, 0.0),
        (0.8, 5.0),
        (0.9, 0.0),
    ])
}

fn feedback(x: &DVector<f64>) -> DVector<f64> {
    DVector::from_element(1, x[0] * x[1])
}

fn build_network(tau: f64) -> (Network, ProbeId, ProbeId) {
    let config = SimConfig::default().with_seed(42);
    let mut model = Network::with_config("Controlled Integrator", config);

    model.make_input("Input", input_table()).unwrap();
    model
        .make_input("Control", ConstantSource::new(&[1.0]))
        .unwrap();
    model.make("A", 225, 2, 1.5).unwrap();

    model
        .connect("Input", "A", dmatrix![tau; 0.0], tau)
        .unwrap();
    model
        .connect("Control", "A", dmatrix![0.0; 1.0], 0.005)
        .unwrap();
    model
        .connect_func("A", "A", Box::new(feedback), dmatrix![1.0; 0.0], tau)
        .unwrap();

    let input_probe = model.make_probe("Input", 0.001, 0.001).unwrap();
    let output_probe = model.make_probe("A", 0.01, 0.03).unwrap();

    (model, input_probe, output_probe)
}

#[test]
fn test_input_step_function() {
    let input = input_table();
    for t in [-1.0, 0.0, 0.1, 0.2] {
        assert_eq!(input.value_at(t), 0.0);
    }
    assert_eq!(input.value_at(0.2 + 1e-12), 5.0);
    assert_eq!(input.value_at(0.25), 5.0);
    assert_eq!(input.value_at(0.35), 0.0);
    assert_eq!(input.value_at(0.5), -10.0);
    assert_eq!(input.value_at(0.6), 0.0);
    assert_eq!(input.value_at(0.85), 5.0);
    assert_eq!(input.value_at(1.0), 0.0);
}

#[test]
fn test_input_step_function_is_stateless() {
    let input = input_table();
    let first = input.evaluate(0.5);
    let second = input.evaluate(0.5);
    assert_eq!(first, second);
    assert_eq!(first[0], -10.0);
}

#[test]
fn test_feedback_function() {
    assert_eq!(feedback(&DVector::from_vec(vec![2.0, 3.0]))[0], 6.0);
    assert_eq!(feedback(&DVector::from_vec(vec![-1.0, 4.0]))[0], -4.0);
    assert_eq!(feedback(&DVector::from_vec(vec![0.0, 7.0]))[0], 0.0);
}

#[test]
fn test_network_structure_before_run() {
    let (model, _, _) = build_network(0.1);
    assert_eq!(model.num_inputs(), 2);
    assert_eq!(model.num_ensembles(), 1);
    // Three explicit wirings plus the decoded tap feeding the output probe
    assert_eq!(model.num_connections(), 4);
    assert_eq!(model.num_probes(), 2);

    let ensemble = model.ensemble_ref("A").unwrap();
    assert_eq!(ensemble.num_neurons(), 225);
    assert_eq!(ensemble.dims(), 2);
    assert_eq!(ensemble.radius(), 1.5);
}

#[test]
fn test_run_and_time_axes() {
    let (mut model, input_probe, output_probe) = build_network(0.1);
    let t_final = 1.2;
    model.run(t_final).unwrap();

    let input = model.probe(input_probe);
    let output = model.probe(output_probe);
    assert_eq!(input.data().len(), 1200);
    assert_eq!(output.data().len(), 120);

    let axis = input.time_axis(t_final);
    assert_eq!(axis[0], 0.0);
    let n = input.data().len();
    for (i, &t) in axis.iter().enumerate() {
        assert!((t - t_final * i as f64 / n as f64).abs() < 1e-12);
    }

    assert!(output
        .data()
        .iter()
        .all(|sample| sample.iter().all(|v| v.is_finite())));
}

#[test]
fn test_integrator_tracks_input_pulses() {
    let (mut model, _, output_probe) = build_network(0.1);
    model.run(1.2).unwrap();
    let output = model.probe(output_probe);

    // After the +5 pulse over [0.2, 0.3] the integrated value is positive
    let after_positive_pulse = output.data()[35][0];
    assert!(
        after_positive_pulse > 0.1,
        "expected a positive integrated value, got {}",
        after_positive_pulse
    );

    // The -10 pulse over [0.44, 0.54] drives it well below zero
    let after_negative_pulse = output.data()[62][0];
    assert!(
        after_negative_pulse < -0.2,
        "expected a negative integrated value, got {}",
        after_negative_pulse
    );

    // The second dimension tracks the constant control signal
    let control_value = output.data()[50][1];
    assert!(
        control_value > 0.5,
        "expected the control dimension near 1, got {}",
        control_value
    );
}

#[test]
fn test_missing_plotting_capability_is_not_fatal() {
    let (mut model, input_probe, _) = build_network(0.1);
    model.run(0.05).unwrap();

    // The capability check reports a typed reason instead of failing the run
    let result = Plotter::detect_program("definitely-not-a-plotting-program");
    assert!(result.is_err());

    // The probed data is still available for later processing
    assert!(!model.probe(input_probe).data().is_empty());
}
