//! Entry point for the my-code-base command-line tool.
//! Handles CLI parsing, file loading, and dispatches operations like
//! decomposing a variable or printing metadata.

use clap::Parser;
use my_code_base::cli::{Args, Operation};
use my_code_base::metadata::{describe_variable, list_variables_and_dimensions, print_metadata};
use my_code_base::netcdf_io::read_timeseries;
use my_code_base::parallel::{ParallelConfig, ParallelInfo};
use my_code_base::provenance::{save, Save, SaveOptions};
use my_code_base::timeseries::{
    deseasonalize, rolling_decompose, seasonal_decompose, weighted_annual_mean,
};
use my_code_base::Result;
use std::path::Path;
use tracing::Level;

#[track_caller]
fn save_or_report<T: Save>(result: &T, output: Option<&Path>, options: SaveOptions, summary: &str) -> Result<()> {
    match output {
        Some(path) => {
            let written = save(result, path, options)?;
            println!("✅ Saved result to {}", written.display());
        }
        None => println!("{summary}"),
    }
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();

    println!(
        r#"
------------------------------------------------------------------
                         my-code-base
           time series helpers for NetCDF climate data
------------------------------------------------------------------
"#
    );

    let parallel_config = match args.threads {
        Some(n) => ParallelConfig::with_threads(n),
        None => ParallelConfig::default(),
    };
    parallel_config.setup_global_pool()?;
    if args.verbose {
        ParallelInfo::collect().print_info();
    }

    let file = netcdf::open(&args.file)?;
    println!("Successfully opened NetCDF file: {}", args.file.display());

    if args.list_vars {
        list_variables_and_dimensions(&file)?;
        return Ok(());
    }
    if let Some(var) = &args.describe {
        describe_variable(&file, var)?;
        return Ok(());
    }

    let options = SaveOptions {
        add_hash: args.add_hash,
    };
    let output = args.output_netcdf.as_deref();

    match args.operation() {
        Some(Operation::Decompose(var)) => {
            let ts = read_timeseries(&args.file, var, &args.time_dim)?;
            let result = seasonal_decompose(&ts)?;
            let summary = format!(
                "📈 Decomposed '{}' {:?} into trend, seasonality and residuals over {} time steps",
                var,
                ts.data.shape(),
                ts.times.len()
            );
            save_or_report(&result, output, options, &summary)?;
        }
        Some(Operation::Deseasonalize(var)) => {
            let ts = read_timeseries(&args.file, var, &args.time_dim)?;
            let result = deseasonalize(&ts)?;
            let summary = format!("📉 Deseasonalized '{}': {:?}", var, result.data.shape());
            save_or_report(&result, output, options, &summary)?;
        }
        Some(Operation::AnnualMean(var)) => {
            let ts = read_timeseries(&args.file, var, &args.time_dim)?;
            let result = weighted_annual_mean(&ts)?;
            let summary = match (result.years.first(), result.years.last()) {
                (Some(first), Some(last)) => {
                    format!("📅 Annual means of '{var}' for {first} to {last}: {:?}", result.data)
                }
                _ => format!("📅 No annual means for '{var}'"),
            };
            save_or_report(&result, output, options, &summary)?;
        }
        Some(Operation::RollingDecompose(var, freq)) => {
            let ts = read_timeseries(&args.file, var, &args.time_dim)?;
            let frame = rolling_decompose(&ts, freq)?;
            match args.output_csv.as_deref() {
                Some(path) => {
                    let written = save(&frame, path, options)?;
                    println!("✅ Saved result to {}", written.display());
                }
                None => print!("{}", frame.to_csv()),
            }
        }
        None => print_metadata(&file)?,
    }

    Ok(())
}
