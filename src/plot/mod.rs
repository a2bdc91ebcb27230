//! Plotting helpers that produce data and definitions for a renderer
//!
//! Nothing in this module draws. Colormaps, map definitions, masked grids
//! and axis limits are computed here and can be saved as JSON through
//! [`crate::provenance::save`].
//!
//! # Organization
//!
//! - [`colors`]: hex/RGB/decimal color conversion
//! - [`colormap`]: linear segmented colormaps and ColorMoves XML import
//! - [`maps`]: polar stereographic map definitions
//! - [`overlap`]: masking of cells wrapping around polar maps
//! - [`align`]: twin-axis curve alignment

pub mod align;
pub mod colormap;
pub mod colors;
pub mod maps;
pub mod overlap;

pub use align::{align_curves, AxisLimits};
pub use colormap::{xml_to_cmap, LinearSegmentedColormap};
pub use colors::{hex_to_rgb, rgb_to_dec};
pub use maps::{FeatureKind, MapFeature, PolarMap, Pole};
pub use overlap::{z_masked_overlap, MaskedGrid, PolarStereographic};
