//! Polar stereographic map definitions
//!
//! A [`PolarMap`] collects what a renderer needs to draw a polar map: the
//! pole, the latitude range, the map features with their drawing order and a
//! circular boundary in axes coordinates. Nothing is rendered here; the
//! definition is serialised to JSON.

use crate::errors::{CodeBaseError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Drawing order of the ocean feature
pub const OCEAN_ZORDER: i32 = 0;
/// Drawing order of the land feature
pub const LAND_ZORDER: i32 = 2;
/// Drawing order of coastlines
pub const COASTLINES_ZORDER: i32 = 3;
/// Upper bound on meridians or parallels per gridline feature
pub const MAX_GRIDLINES: usize = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pole {
    North,
    South,
}

impl Pole {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
        }
    }

    /// Latitude range shown unless configured otherwise
    #[must_use]
    pub fn default_lat_limits(self) -> [f64; 2] {
        match self {
            Self::North => [50.0, 90.0],
            Self::South => [-90.0, -50.0],
        }
    }

    /// Name of the matching stereographic projection
    #[must_use]
    pub fn projection_name(self) -> &'static str {
        match self {
            Self::North => "NorthPolarStereo",
            Self::South => "SouthPolarStereo",
        }
    }
}

impl fmt::Display for Pole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Ocean,
    Land,
    Coastlines,
    Gridlines,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapFeature {
    pub kind: FeatureKind,
    pub zorder: i32,
    /// Meridians (degrees east), only for gridlines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub meridians: Vec<f64>,
    /// Parallels (degrees north), only for gridlines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parallels: Vec<f64>,
}

impl MapFeature {
    fn new(kind: FeatureKind, zorder: i32) -> Self {
        Self {
            kind,
            zorder,
            meridians: Vec::new(),
            parallels: Vec::new(),
        }
    }
}

/// Definition of a polar stereographic map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPolarMap")]
pub struct PolarMap {
    pole: Pole,
    lat_limits: [f64; 2],
    /// `[lon_min, lon_max, lat_min, lat_max]` in degrees
    extent: [f64; 4],
    features: Vec<MapFeature>,
    /// Closed circle in axes coordinates
    boundary: Vec<[f64; 2]>,
}

/// Unchecked form of [`PolarMap`] as read from JSON
#[derive(Deserialize)]
struct RawPolarMap {
    pole: Pole,
    lat_limits: [f64; 2],
    extent: [f64; 4],
    features: Vec<MapFeature>,
    boundary: Vec<[f64; 2]>,
}

impl TryFrom<RawPolarMap> for PolarMap {
    type Error = CodeBaseError;

    fn try_from(raw: RawPolarMap) -> Result<Self> {
        let mut map = Self::new(raw.pole);
        map.set_extent(raw.extent)?;
        if raw.lat_limits != [raw.extent[2], raw.extent[3]] {
            return Err(CodeBaseError::InvalidInput(format!(
                "Latitude limits {:?} do not match the extent {:?}",
                raw.lat_limits, raw.extent
            )));
        }
        if raw.boundary.len() < 2 {
            return Err(CodeBaseError::InvalidInput(
                "Map boundary needs at least two points".to_string(),
            ));
        }
        for feature in raw.features {
            map.add(feature);
        }
        map.boundary = raw.boundary;
        Ok(map)
    }
}

impl PolarMap {
    #[must_use]
    pub fn new(pole: Pole) -> Self {
        let [lat_min, lat_max] = pole.default_lat_limits();
        Self {
            pole,
            lat_limits: [lat_min, lat_max],
            extent: [-180.0, 180.0, lat_min, lat_max],
            features: Vec::new(),
            boundary: circle_boundary(100),
        }
    }

    #[must_use]
    pub fn pole(&self) -> Pole {
        self.pole
    }

    #[must_use]
    pub fn lat_limits(&self) -> [f64; 2] {
        self.lat_limits
    }

    /// Change the latitude range; the extent follows.
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is outside `[-90, 90]` or the limits are
    /// not increasing.
    pub fn set_lat_limits(&mut self, limits: [f64; 2]) -> Result<()> {
        let [lower, upper] = limits;
        if !(-90.0..=90.0).contains(&lower) || !(-90.0..=90.0).contains(&upper) || lower >= upper
        {
            return Err(CodeBaseError::InvalidInput(format!(
                "Invalid latitude limits [{lower}, {upper}]"
            )));
        }
        self.lat_limits = limits;
        self.extent = [-180.0, 180.0, lower, upper];
        Ok(())
    }

    #[must_use]
    pub fn extent(&self) -> [f64; 4] {
        self.extent
    }

    /// Set the map extent as `[lon_min, lon_max, lat_min, lat_max]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the ranges are empty or out of bounds.
    pub fn set_extent(&mut self, extent: [f64; 4]) -> Result<()> {
        let [lon_min, lon_max, lat_min, lat_max] = extent;
        if !(lon_min.is_finite() && lon_max.is_finite())
            || lon_min >= lon_max
            || lon_min < -180.0
            || lon_max > 360.0
        {
            return Err(CodeBaseError::InvalidInput(format!(
                "Invalid longitude range [{lon_min}, {lon_max}]"
            )));
        }
        self.set_lat_limits([lat_min, lat_max])?;
        self.extent = extent;
        Ok(())
    }

    #[must_use]
    pub fn features(&self) -> &[MapFeature] {
        &self.features
    }

    #[must_use]
    pub fn boundary(&self) -> &[[f64; 2]] {
        &self.boundary
    }

    fn add(&mut self, feature: MapFeature) -> &mut Self {
        self.features.retain(|f| f.kind != feature.kind);
        self.features.push(feature);
        self.features.sort_by_key(|f| f.zorder);
        self
    }

    /// Add the ocean feature, below everything else by default.
    pub fn add_ocean(&mut self, zorder: Option<i32>) -> &mut Self {
        self.add(MapFeature::new(FeatureKind::Ocean, zorder.unwrap_or(OCEAN_ZORDER)))
    }

    pub fn add_land(&mut self, zorder: Option<i32>) -> &mut Self {
        self.add(MapFeature::new(FeatureKind::Land, zorder.unwrap_or(LAND_ZORDER)))
    }

    pub fn add_coastlines(&mut self, zorder: Option<i32>) -> &mut Self {
        self.add(MapFeature::new(
            FeatureKind::Coastlines,
            zorder.unwrap_or(COASTLINES_ZORDER),
        ))
    }

    /// Add meridians every `lon_step` degrees and parallels every `lat_step`
    /// degrees inside the latitude limits, drawn on top of the coastlines.
    ///
    /// # Errors
    ///
    /// Returns an error if a step is not a positive finite number or yields
    /// more than [`MAX_GRIDLINES`] lines.
    pub fn add_gridlines(&mut self, lon_step: f64, lat_step: f64) -> Result<&mut Self> {
        let meridians = steps_within(-180.0, 180.0, lon_step)?
            .into_iter()
            .filter(|&lon| lon < 180.0)
            .collect();
        let [lower, upper] = self.lat_limits;
        let parallels = steps_within(lower, upper, lat_step)?
            .into_iter()
            .filter(|lat| lat.abs() < 90.0)
            .collect();
        let mut feature = MapFeature::new(FeatureKind::Gridlines, COASTLINES_ZORDER + 1);
        feature.meridians = meridians;
        feature.parallels = parallels;
        Ok(self.add(feature))
    }

    /// Ocean, land, coastlines and gridlines every 30° longitude and 10°
    /// latitude.
    ///
    /// # Errors
    ///
    /// See [`PolarMap::add_gridlines`].
    pub fn add_features(&mut self) -> Result<&mut Self> {
        self.add_ocean(None).add_land(None).add_coastlines(None);
        self.add_gridlines(30.0, 10.0)
    }

    /// Serialise the map definition.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Multiples of `step` inside `[lower, upper]`
fn steps_within(lower: f64, upper: f64, step: f64) -> Result<Vec<f64>> {
    if !(step.is_finite() && step > 0.0) {
        return Err(CodeBaseError::InvalidInput(format!(
            "Gridline spacing must be positive, got {step}"
        )));
    }
    let first = (lower / step).ceil();
    let last = (upper / step).floor();
    if last - first >= MAX_GRIDLINES as f64 {
        return Err(CodeBaseError::InvalidInput(format!(
            "Gridline spacing {step} gives more than {MAX_GRIDLINES} lines"
        )));
    }
    let first = first as i64;
    let last = last as i64;
    Ok((first..=last).map(|i| i as f64 * step).collect())
}

/// Circle of `n` points with radius 0.5 around the centre of the axes
fn circle_boundary(n: usize) -> Vec<[f64; 2]> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / (n - 1) as f64;
            [0.5 + 0.5 * theta.sin(), 0.5 + 0.5 * theta.cos()]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pole_and_default_limits() {
        let north = PolarMap::new(Pole::North);
        let south = PolarMap::new(Pole::South);
        assert_eq!(north.pole().name(), "north");
        assert_eq!(south.pole().to_string(), "south");
        assert_eq!(north.lat_limits(), [50.0, 90.0]);
        assert_eq!(south.lat_limits(), [-90.0, -50.0]);
        assert_eq!(Pole::South.projection_name(), "SouthPolarStereo");
    }

    #[test]
    fn test_set_lat_limits() {
        let mut map = PolarMap::new(Pole::North);
        map.set_lat_limits([30.0, 70.0]).unwrap();
        assert_eq!(map.lat_limits(), [30.0, 70.0]);
        assert_eq!(map.extent(), [-180.0, 180.0, 30.0, 70.0]);
        assert!(map.set_lat_limits([70.0, 30.0]).is_err());
        assert!(map.set_lat_limits([50.0, 95.0]).is_err());
        assert_eq!(map.lat_limits(), [30.0, 70.0]);
    }

    #[test]
    fn test_feature_zorders() {
        let mut map = PolarMap::new(Pole::South);
        map.add_coastlines(None).add_land(None).add_ocean(None);
        let order: Vec<(FeatureKind, i32)> = map.features().iter().map(|f| (f.kind, f.zorder)).collect();
        assert_eq!(
            order,
            vec![
                (FeatureKind::Ocean, 0),
                (FeatureKind::Land, 2),
                (FeatureKind::Coastlines, 3)
            ]
        );

        map.add_land(Some(5));
        assert_eq!(map.features().len(), 3);
        assert_eq!(map.features().last().unwrap().kind, FeatureKind::Land);
    }

    #[test]
    fn test_gridlines() {
        let mut map = PolarMap::new(Pole::North);
        map.add_features().unwrap();
        let grid = map
            .features()
            .iter()
            .find(|f| f.kind == FeatureKind::Gridlines)
            .unwrap();
        assert_eq!(grid.meridians.len(), 12);
        assert_eq!(grid.parallels, vec![50.0, 60.0, 70.0, 80.0]);
        assert!(map.add_gridlines(0.0, 10.0).is_err());
    }

    #[test]
    fn test_gridline_steps_must_be_finite_and_bounded() {
        let mut map = PolarMap::new(Pole::North);
        for (lon_step, lat_step) in [
            (f64::NAN, 10.0),
            (30.0, f64::NAN),
            (f64::INFINITY, 10.0),
            (-30.0, 10.0),
            (1e-12, 10.0),
            (30.0, 1e-9),
        ] {
            let err = map.add_gridlines(lon_step, lat_step).unwrap_err();
            assert!(matches!(err, CodeBaseError::InvalidInput(_)), "{lon_step}, {lat_step}");
        }
        assert!(map.features().is_empty());

        map.add_gridlines(0.5, 0.5).unwrap();
        let grid = &map.features()[0];
        assert_eq!(grid.meridians.len(), 720);
        assert_eq!(grid.parallels.len(), 80);
    }

    #[test]
    fn test_boundary_is_closed_circle() {
        let map = PolarMap::new(Pole::North);
        let boundary = map.boundary();
        let first = boundary[0];
        let last = boundary[boundary.len() - 1];
        assert!((first[0] - last[0]).abs() < 1e-12 && (first[1] - last[1]).abs() < 1e-12);
        for [x, y] in boundary {
            assert!((((x - 0.5).powi(2) + (y - 0.5).powi(2)).sqrt() - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_json_round_trip() {
        let mut map = PolarMap::new(Pole::South);
        map.add_ocean(None);
        let json = map.to_json().unwrap();
        assert!(json.contains("\"pole\": \"south\""));
        let back: PolarMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.pole(), Pole::South);
        assert_eq!(back.lat_limits(), map.lat_limits());
        assert_eq!(back.features(), map.features());
        assert_eq!(back.boundary().len(), 100);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let map = PolarMap::new(Pole::North);
        let mut value: serde_json::Value = serde_json::from_str(&map.to_json().unwrap()).unwrap();

        let mut bad = value.clone();
        bad["lat_limits"] = serde_json::json!([95.0, 50.0]);
        bad["extent"] = serde_json::json!([-180.0, 180.0, 95.0, 50.0]);
        assert!(serde_json::from_value::<PolarMap>(bad).is_err());

        let mut bad = value.clone();
        bad["extent"] = serde_json::json!([180.0, -180.0, 50.0, 90.0]);
        assert!(serde_json::from_value::<PolarMap>(bad).is_err());

        let mut bad = value.clone();
        bad["lat_limits"] = serde_json::json!([60.0, 90.0]);
        let err = serde_json::from_value::<PolarMap>(bad).unwrap_err();
        assert!(err.to_string().contains("do not match"), "{err}");

        let mut bad = value.clone();
        bad["boundary"] = serde_json::json!([]);
        assert!(serde_json::from_value::<PolarMap>(bad).is_err());

        // features come back sorted by drawing order
        value["features"] = serde_json::json!([
            {"kind": "coastlines", "zorder": 3},
            {"kind": "ocean", "zorder": 0}
        ]);
        let back: PolarMap = serde_json::from_value(value).unwrap();
        let kinds: Vec<FeatureKind> = back.features().iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FeatureKind::Ocean, FeatureKind::Coastlines]);
    }
}
