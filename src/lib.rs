//! my-code-base: scientific helper routines for climate and ocean data
//!
//! A collection of small, independent tools that come up again and again when
//! analysing model output and observations: unit conversions, ocean
//! biogeochemistry, calendar-aware time-series processing, linear algebra on
//! labeled matrices, ensemble bookkeeping and data-side helpers for maps and
//! colormaps. Every saved artefact carries provenance metadata.
//!
//! ## Module Organization
//!
//! - [`units`]: pressure and temperature unit detection and conversion
//! - [`ocean`]: CO2 fugacity, temperature corrections and seawater properties
//! - [`timeseries`]: decomposition and day-weighted annual means
//! - [`linalg`]: matrix inversion and empirical covariance
//! - [`ensemble`]: member keys of model ensembles
//! - [`plot`]: colormaps, polar maps, overlap masking and axis alignment
//! - [`filehandling`]: duplicate removal from file lists
//! - [`provenance`]: `history` attributes and [`save`] with git commit tags
//! - [`netcdf_io`]: reading CF time series and writing datasets
//! - [`metadata`]: NetCDF file inspection
//! - [`parallel`]: parallel processing configuration
//! - [`errors`]: Centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use my_code_base::prelude::*;
//!
//! let ts = read_timeseries("sst.nc", "tos", "time").unwrap();
//! let annual = weighted_annual_mean(&ts).unwrap();
//! save(&annual, "tos_annual.nc", SaveOptions { add_hash: true }).unwrap();
//! ```

pub mod cli;
pub mod dataset;
pub mod ensemble;
pub mod errors;
pub mod filehandling;
pub mod linalg;
pub mod metadata;
pub mod netcdf_io;
pub mod ocean;
pub mod parallel;
pub mod plot;
pub mod provenance;
pub mod timeseries;
pub mod units;
pub mod utils;

pub use errors::{CodeBaseError, Result};
pub use provenance::{save, SaveOptions};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::dataset::{DataVariable, Dataset};
    pub use crate::ensemble::{Ensemble, KeyTemplate, MemberKey};
    pub use crate::errors::{CodeBaseError, Result};
    pub use crate::linalg::LabeledMatrix;
    pub use crate::netcdf_io::{read_timeseries, DatasetWriter};
    pub use crate::parallel::ParallelConfig;
    pub use crate::provenance::{save, History, Save, SaveOptions};
    pub use crate::timeseries::{
        deseasonalize, seasonal_decompose, weighted_annual_mean, Calendar, TimeSeries,
    };
}
