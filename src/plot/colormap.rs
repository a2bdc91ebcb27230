//! Linear segmented colormaps and ColorMoves/SciVisColor XML import
//!
//! A colormap is described per channel by anchor points `(x, y0, y1)`: `x`
//! is the position in `[0, 1]`, `y0` the value approached from below and
//! `y1` the value left from above. Between anchors the channel is linearly
//! interpolated.

use crate::errors::{CodeBaseError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Number of lookup table entries of colormaps read from XML
pub const DEFAULT_LUT_SIZE: usize = 256;

/// One anchor point of a color channel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x: f64,
    pub y0: f64,
    pub y1: f64,
}

/// Anchor points of the three color channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentData {
    pub red: Vec<Segment>,
    pub green: Vec<Segment>,
    pub blue: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSegmentedColormap {
    pub name: String,
    pub segments: SegmentData,
    /// Number of entries of the lookup table
    pub n: usize,
}

impl LinearSegmentedColormap {
    /// Build a colormap with continuous channels from positions and RGB colors.
    ///
    /// # Errors
    ///
    /// Returns an error if `positions` and `colors` differ in length or the
    /// positions do not start at 0 and end at 1.
    pub fn from_points(
        name: &str,
        positions: &[f64],
        colors: &[[f64; 3]],
        n: usize,
    ) -> Result<Self> {
        if positions.len() != colors.len() {
            return Err(CodeBaseError::InvalidColormap(
                "position length must be the same as colors".to_string(),
            ));
        }
        if positions.first() != Some(&0.0) || positions.last() != Some(&1.0) {
            return Err(CodeBaseError::InvalidColormap(
                "position must start with 0 and end with 1".to_string(),
            ));
        }
        if positions.windows(2).any(|w| w[1] < w[0]) {
            return Err(CodeBaseError::InvalidColormap(
                "positions must be increasing".to_string(),
            ));
        }

        let channel = |c: usize| -> Vec<Segment> {
            positions
                .iter()
                .zip(colors)
                .map(|(&x, rgb)| Segment {
                    x,
                    y0: rgb[c],
                    y1: rgb[c],
                })
                .collect()
        };

        Ok(Self {
            name: name.to_string(),
            segments: SegmentData {
                red: channel(0),
                green: channel(1),
                blue: channel(2),
            },
            n,
        })
    }

    /// RGB color at `x`; values outside `[0, 1]` are clipped.
    #[must_use]
    pub fn evaluate(&self, x: f64) -> [f64; 3] {
        let x = x.clamp(0.0, 1.0);
        [
            interpolate_channel(&self.segments.red, x),
            interpolate_channel(&self.segments.green, x),
            interpolate_channel(&self.segments.blue, x),
        ]
    }

    /// The `n` colors sampled evenly from 0 to 1
    #[must_use]
    pub fn lut(&self) -> Vec<[f64; 3]> {
        match self.n {
            0 => Vec::new(),
            1 => vec![self.evaluate(0.0)],
            n => (0..n)
                .map(|i| self.evaluate(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

fn interpolate_channel(segments: &[Segment], x: f64) -> f64 {
    let Some(upper) = segments.iter().position(|s| s.x >= x) else {
        return segments.last().map_or(f64::NAN, |s| s.y1);
    };
    if upper == 0 || segments[upper].x == x {
        // Exactly on an anchor the value above it wins, except at the end
        return if upper + 1 == segments.len() {
            segments[upper].y0
        } else {
            segments[upper].y1
        };
    }
    let (lo, hi) = (&segments[upper - 1], &segments[upper]);
    let frac = (x - lo.x) / (hi.x - lo.x);
    lo.y1 + frac * (hi.y0 - lo.y1)
}

/// Read `<Point x=".." r=".." g=".." b=".."/>` elements from an XML document.
///
/// # Errors
///
/// Returns an error if the XML is malformed or a point lacks an attribute.
pub fn parse_points(xml: &str) -> Result<(Vec<f64>, Vec<[f64; 3]>)> {
    let doc = roxmltree::Document::parse(xml)?;
    let mut positions = Vec::new();
    let mut colors = Vec::new();
    for node in doc.descendants().filter(|n| n.has_tag_name("Point")) {
        let attr = |key: &str| -> Result<f64> {
            node.attribute(key)
                .and_then(|v| v.trim().parse().ok())
                .ok_or_else(|| {
                    CodeBaseError::InvalidColormap(format!(
                        "Point element without a numeric '{key}' attribute"
                    ))
                })
        };
        positions.push(attr("x")?);
        colors.push([attr("r")?, attr("g")?, attr("b")?]);
    }
    debug!("Read {} colormap points", positions.len());
    Ok((positions, colors))
}

/// Load a ColorMoves/SciVisColor colormap XML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not describe a valid
/// colormap.
pub fn xml_to_cmap(path: impl AsRef<Path>) -> Result<LinearSegmentedColormap> {
    let content = fs::read_to_string(path.as_ref())?;
    let (positions, colors) = parse_points(&content)?;
    LinearSegmentedColormap::from_points("my_colormap", &positions, &colors, DEFAULT_LUT_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const XML: &str = r#"<ColorMaps>
  <ColorMap name="test" space="RGB">
    <Point x="0" o="1" r="0" g="0" b="1"/>
    <Point x="0.5" o="1" r="1" g="1" b="1"/>
    <Point x="1" o="1" r="1" g="0" b="0"/>
  </ColorMap>
</ColorMaps>"#;

    #[test]
    fn test_from_points_validation() {
        let colors = [[0.0; 3], [1.0; 3]];
        assert!(LinearSegmentedColormap::from_points("c", &[0.0], &colors, 8).is_err());
        assert!(LinearSegmentedColormap::from_points("c", &[0.1, 1.0], &colors, 8).is_err());
        assert!(LinearSegmentedColormap::from_points("c", &[0.0, 0.9], &colors, 8).is_err());
        assert!(LinearSegmentedColormap::from_points("c", &[0.0, 1.0], &colors, 8).is_ok());
    }

    #[test]
    fn test_evaluate_interpolates() {
        let (positions, colors) = parse_points(XML).unwrap();
        let cmap = LinearSegmentedColormap::from_points("t", &positions, &colors, 5).unwrap();
        assert_eq!(cmap.segments.red.len(), 3);
        assert_eq!(cmap.evaluate(0.0), [0.0, 0.0, 1.0]);
        assert_eq!(cmap.evaluate(0.5), [1.0, 1.0, 1.0]);
        assert_eq!(cmap.evaluate(1.0), [1.0, 0.0, 0.0]);
        let quarter = cmap.evaluate(0.25);
        assert_relative_eq!(quarter[0], 0.5);
        assert_relative_eq!(quarter[2], 1.0);
        assert_eq!(cmap.evaluate(2.0), cmap.evaluate(1.0));

        let lut = cmap.lut();
        assert_eq!(lut.len(), 5);
        assert_relative_eq!(lut[3][1], 0.5);
    }

    #[test]
    fn test_xml_to_cmap() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(XML.as_bytes()).unwrap();
        let cmap = xml_to_cmap(file.path()).unwrap();
        assert_eq!(cmap.name, "my_colormap");
        assert_eq!(cmap.n, 256);
        assert_eq!(cmap.lut().len(), 256);
    }

    #[test]
    fn test_xml_errors() {
        assert!(matches!(parse_points("<a>"), Err(CodeBaseError::XmlError(_))));
        assert!(parse_points(r#"<a><Point x="0" r="1" g="1"/></a>"#).is_err());
        let missing_end = r#"<a><Point x="0" r="1" g="1" b="1"/><Point x="0.5" r="0" g="0" b="0"/></a>"#;
        let (p, c) = parse_points(missing_end).unwrap();
        assert!(LinearSegmentedColormap::from_points("t", &p, &c, 4).is_err());
        assert!(matches!(xml_to_cmap("/nonexistent/cmap.xml"), Err(CodeBaseError::IoError(_))));
    }
}
