//! Command-line options of the `my-code-base` binary, parsed with `clap`.

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Time-series helpers for NetCDF files
#[derive(Parser, Debug)]
#[command(
    name = "my-code-base",
    version,
    about = "Decompose, deseasonalize and annually average variables of NetCDF files"
)]
#[command(group(
    ArgGroup::new("operation")
        .args(["decompose", "deseasonalize", "annual_mean", "rolling_decompose"])
        .multiple(false)
))]
pub struct Args {
    /// Path to the NetCDF file
    #[arg(short, long)]
    pub file: PathBuf,

    /// List all variables and dimensions in the NetCDF file
    #[arg(long)]
    pub list_vars: bool,

    /// Describe a specific variable (data type, shape, attributes and time range)
    #[arg(long)]
    pub describe: Option<String>,

    /// Split a variable into linear trend, monthly seasonality and residuals
    #[arg(long)]
    pub decompose: Option<String>,

    /// Remove the linear trend and the monthly seasonal cycle from a variable
    #[arg(long)]
    pub deseasonalize: Option<String>,

    /// Compute the day-weighted annual mean of a monthly variable
    #[arg(long)]
    pub annual_mean: Option<String>,

    /// Decompose a one-dimensional variable with a rolling-mean trend
    #[arg(long)]
    pub rolling_decompose: Option<String>,

    /// Number of steps per seasonal cycle for --rolling-decompose
    #[arg(long, default_value_t = 12)]
    pub freq: usize,

    /// Name of the time dimension
    #[arg(long, default_value = "time")]
    pub time_dim: String,

    /// Path to save the result as NetCDF. If not set, prints a summary to the terminal.
    #[arg(long, conflicts_with = "rolling_decompose")]
    pub output_netcdf: Option<PathBuf>,

    /// Path to save the result of --rolling-decompose as CSV
    #[arg(long, requires = "rolling_decompose")]
    pub output_csv: Option<PathBuf>,

    /// Append the short git commit hash to output file names
    #[arg(long, default_value_t = false)]
    pub add_hash: bool,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,
}

impl Args {
    /// Time-series operation requested on the command line, at most one
    #[must_use]
    pub fn operation(&self) -> Option<Operation<'_>> {
        if let Some(var) = &self.decompose {
            Some(Operation::Decompose(var))
        } else if let Some(var) = &self.deseasonalize {
            Some(Operation::Deseasonalize(var))
        } else if let Some(var) = &self.annual_mean {
            Some(Operation::AnnualMean(var))
        } else {
            self.rolling_decompose
                .as_deref()
                .map(|var| Operation::RollingDecompose(var, self.freq))
        }
    }
}

/// Time-series operation selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    Decompose(&'a str),
    Deseasonalize(&'a str),
    AnnualMean(&'a str),
    RollingDecompose(&'a str, usize),
}
