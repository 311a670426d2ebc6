//! Optional plotting of recorded signals through an external gnuplot process.
//!
//! Plotting is a capability the host may not have. [Plotter::detect] performs
//! the check once and returns a typed result; an unavailable capability is
//! reported to the caller, never raised as a fatal error.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::NefError;

/// The reason why the plotting capability is unavailable.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotUnavailable {
    pub reason: String,
}

impl fmt::Display for PlotUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Plotting capability unavailable: {}", self.reason)
    }
}

impl std::error::Error for PlotUnavailable {}

/// A single panel of a stacked line plot.
pub struct Panel<'a> {
    /// The panel title.
    pub title: &'a str,
    /// The time axis shared by the panel's series.
    pub times: &'a [f64],
    /// The recorded samples, one inner vector per time point.
    pub data: &'a [Vec<f64>],
}

/// A handle to a detected gnuplot executable.
pub struct Plotter {
    program: String,
}

impl Plotter {
    /// Check once for an available gnuplot executable.
    pub fn detect() -> Result<Self, PlotUnavailable> {
        Self::detect_program("gnuplot")
    }

    /// Check for a specific plotting executable.
    pub fn detect_program(program: &str) -> Result<Self, PlotUnavailable> {
        match Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => Ok(Plotter {
                program: program.to_string(),
            }),
            Ok(status) => Err(PlotUnavailable {
                reason: format!("'{}' exited with {}", program, status),
            }),
            Err(e) => Err(PlotUnavailable {
                reason: format!("'{}' could not be launched: {}", program, e),
            }),
        }
    }

    /// Render the panels as vertically stacked line plots into an SVG file.
    /// The data and script files are written next to the output and kept.
    pub fn plot_stacked(&self, panels: &[Panel], path: &Path) -> Result<(), NefError> {
        if panels.is_empty() {
            return Err(NefError::InvalidParameter(
                "At least one panel is required".to_string(),
            ));
        }
        for panel in panels {
            if panel.times.len() != panel.data.len() {
                return Err(NefError::DimensionMismatch {
                    expected: panel.times.len(),
                    actual: panel.data.len(),
                });
            }
        }

        let mut data_paths = Vec::with_capacity(panels.len());
        for (idx, panel) in panels.iter().enumerate() {
            let data_path = path.with_extension(format!("{}.dat", idx));
            let file = File::create(&data_path).map_err(|e| NefError::IOError(e.to_string()))?;
            let mut writer = BufWriter::new(file);
            for (t, sample) in panel.times.iter().zip(panel.data.iter()) {
                write!(writer, "{}", t).map_err(|e| NefError::IOError(e.to_string()))?;
                for value in sample {
                    write!(writer, " {}", value).map_err(|e| NefError::IOError(e.to_string()))?;
                }
                writeln!(writer).map_err(|e| NefError::IOError(e.to_string()))?;
            }
            data_paths.push(data_path);
        }

        let script_path = path.with_extension("gp");
        let file = File::create(&script_path).map_err(|e| NefError::IOError(e.to_string()))?;
        let mut script = BufWriter::new(file);
        writeln!(script, "set terminal svg size 800,600").map_err(|e| NefError::IOError(e.to_string()))?;
        writeln!(script, "set output '{}'", path.display())
            .map_err(|e| NefError::IOError(e.to_string()))?;
        writeln!(script, "set multiplot layout {},1", panels.len())
            .map_err(|e| NefError::IOError(e.to_string()))?;
        for (panel, data_path) in panels.iter().zip(data_paths.iter()) {
            let num_dims = panel.data.first().map_or(0, |sample| sample.len());
            write!(script, "plot").map_err(|e| NefError::IOError(e.to_string()))?;
            for dim in 0..num_dims {
                if dim > 0 {
                    write!(script, ",").map_err(|e| NefError::IOError(e.to_string()))?;
                }
                write!(
                    script,
                    " '{}' using 1:{} with lines title '{} [{}]'",
                    data_path.display(),
                    dim + 2,
                    panel.title,
                    dim
                )
                .map_err(|e| NefError::IOError(e.to_string()))?;
            }
            writeln!(script).map_err(|e| NefError::IOError(e.to_string()))?;
        }
        writeln!(script, "unset multiplot").map_err(|e| NefError::IOError(e.to_string()))?;
        script.flush().map_err(|e| NefError::IOError(e.to_string()))?;

        let status = Command::new(&self.program)
            .arg(&script_path)
            .status()
            .map_err(|e| NefError::IOError(e.to_string()))?;
        if !status.success() {
            return Err(NefError::IOError(format!(
                "'{}' exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_missing_program() {
        let result = Plotter::detect_program("definitely-not-a-plotting-program");
        assert!(result.is_err());
        let reason = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(reason.contains("could not be launched"));
    }

    #[test]
    fn test_plot_writes_data_and_script() {
        // `true` accepts the script argument and exits successfully, which
        // lets the file-writing path run without a gnuplot installation.
        let plotter = match Plotter::detect_program("true") {
            Ok(plotter) => plotter,
            Err(_) => return,
        };

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plot.svg");
        let times = vec![0.0, 0.1, 0.2];
        let data = vec![vec![0.0, 1.0], vec![0.5, 0.5], vec![1.0, 0.0]];
        let panels = [Panel {
            title: "signal",
            times: &times,
            data: &data,
        }];
        plotter.plot_stacked(&panels, &out).unwrap();

        assert!(out.with_extension("gp").exists());
        assert!(out.with_extension("0.dat").exists());
        let script = std::fs::read_to_string(out.with_extension("gp")).unwrap();
        assert!(script.contains("set multiplot layout 1,1"));
        assert!(script.contains("using 1:3"));
    }

    #[test]
    fn test_panel_length_mismatch() {
        let plotter = match Plotter::detect_program("true") {
            Ok(plotter) => plotter,
            Err(_) => return,
        };
        let dir = tempfile::tempdir().unwrap();
        let times = vec![0.0, 0.1];
        let data = vec![vec![0.0]];
        let panels = [Panel {
            title: "signal",
            times: &times,
            data: &data,
        }];
        assert_eq!(
            plotter.plot_stacked(&panels, &dir.path().join("plot.svg")),
            Err(NefError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        );
    }
}
