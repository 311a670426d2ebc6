//! A controlled integrator: a two-dimensional ensemble holding an integrated
//! value in its first dimension and a control signal in its second.
//!
//! The network implements the control law
//!
//! ```text
//!   a_dot(t) = control(t) * a(t) + tau * input(t)
//! ```
//!
//! with a recurrent connection decoding the product of the two represented
//! dimensions:
//!
//! ```text
//!                     .----.
//!                     v    |
//!      [Input] ----> (A) --'
//!                     ^
//!      [Control] ----'
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use nalgebra::{dmatrix, DVector};

use rusty_nef::config::SimConfig;
use rusty_nef::error::NefError;
use rusty_nef::network::{Network, ProbeId};
use rusty_nef::plot::{Panel, Plotter};
use rusty_nef::signal::{ConstantSource, PiecewiseConstant};

#[derive(Parser, Debug)]
struct Args {
    /// The recurrent time constant, in seconds
    #[arg(long, default_value = "0.1")]
    tau: f64,
    /// The simulated duration, in seconds
    #[arg(long, default_value = "1.2")]
    t_final: f64,
    /// The sampling interval of the output probe, in seconds
    #[arg(long, default_value = "0.01")]
    probe_dt: f64,
    /// The filter time constant of the output probe, in seconds
    #[arg(long, default_value = "0.03")]
    probe_tau: f64,
    /// The seed used for ensemble sampling
    #[arg(long, default_value = "42")]
    seed: u64,
    /// The output image path
    #[arg(long, default_value = "controlled_integrator.svg")]
    out: PathBuf,
}

/// The piecewise-constant drive of the integrator.
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

/// Build the controlled integrator: two inputs, one recurrently connected
/// ensemble, and probes on the input signal and the integrated value.
fn build_network(args: &Args) -> Result<(Network, ProbeId, ProbeId), NefError> {
    if args.tau <= 0.0 {
        return Err(NefError::InvalidParameter(
            "The recurrent time constant must be positive".to_string(),
        ));
    }

    let config = SimConfig::default().with_seed(args.seed);
    let mut model = Network::with_config("Controlled Integrator", config);

    model.make_input("Input", input_table())?;
    model.make_input("Control", ConstantSource::new(&[1.0]))?;

    model.make("A", 225, 2, 1.5)?;

    model.connect("Input", "A", dmatrix![args.tau; 0.0], args.tau)?;
    model.connect("Control", "A", dmatrix![0.0; 1.0], 0.005)?;
    // Feed the product of the integrated value and the control signal back
    // into the first dimension: a_dot = control * a + tau * input
    model.connect_func(
        "A",
        "A",
        Box::new(|x: &DVector<f64>| DVector::from_element(1, x[0] * x[1])),
        dmatrix![1.0; 0.0],
        args.tau,
    )?;

    let input_probe = model.make_probe("Input", 0.001, 0.001)?;
    let output_probe = model.make_probe("A", args.probe_dt, args.probe_tau)?;

    Ok((model, input_probe, output_probe))
}

/// Plot the two probed signals as vertically stacked panels. A missing
/// plotting capability is reported and skipped, never fatal.
fn plot_results(
    model: &Network,
    input_probe: ProbeId,
    output_probe: ProbeId,
    t_final: f64,
    out: &Path,
) {
    let plotter = match Plotter::detect() {
        Ok(plotter) => plotter,
        Err(e) => {
            log::warn!("{}", e);
            println!("Could not use the plotting capability: {}", e);
            return;
        }
    };

    let input = model.probe(input_probe);
    let output = model.probe(output_probe);
    let input_times = input.time_axis(t_final);
    let output_times = output.time_axis(t_final);
    let panels = [
        Panel {
            title: "Input",
            times: &input_times,
            data: input.data(),
        },
        Panel {
            title: "A",
            times: &output_times,
            data: output.data(),
        },
    ];
    match plotter.plot_stacked(&panels, out) {
        Ok(()) => log::info!("Plot written to {}", out.display()),
        Err(e) => {
            log::warn!("Plotting failed: {}", e);
            println!("Could not render the plot: {}", e);
        }
    }
}

fn main() -> Result<(), NefError> {
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{l} - {m}\n")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .build(Root::builder().appender("console").build(LevelFilter::Info))
        .map_err(|e| NefError::IOError(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| NefError::IOError(e.to_string()))?;

    let args = Args::parse();
    log::info!("{:?}", args);

    let (mut model, input_probe, output_probe) = build_network(&args)?;
    model.run(args.t_final)?;

    plot_results(&model, input_probe, output_probe, args.t_final, &args.out);
    Ok(())
}
