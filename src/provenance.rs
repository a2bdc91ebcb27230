//! Metadata tagging of saved artefacts
//!
//! Every artefact written through [`save`] records where it was produced: the
//! source file and line of the call site and the short hash of the current
//! git commit. The hash can optionally be appended to the file name, and
//! NetCDF outputs carry it in their `history` attribute.

use crate::dataset::Dataset;
use crate::errors::Result;
use crate::linalg::LabeledMatrix;
use crate::netcdf_io::DatasetWriter;
use crate::plot::{LinearSegmentedColormap, PolarMap};
use crate::timeseries::{AnnualMean, Decomposition, SeasonalFrame, TimeSeries};
use crate::utils::object_type_name;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Commit hash used when git cannot be asked
pub const UNKNOWN_COMMIT: &str = "unknown";

/// Accessor for the `history` entry of an attribute map
pub struct History<'a> {
    attributes: &'a mut BTreeMap<String, String>,
}

impl<'a> History<'a> {
    pub const KEY: &'static str = "history";

    /// Wrap `attributes`, creating an empty `history` entry if there is none.
    pub fn new(attributes: &'a mut BTreeMap<String, String>) -> Self {
        attributes.entry(Self::KEY.to_string()).or_default();
        Self { attributes }
    }

    /// Append a timestamped entry `YYYY-mm-dd HH:MM:SS: <msg>;`.
    pub fn add(&mut self, msg: &str) {
        let entry = format!("{}: {};", Utc::now().format("%Y-%m-%d %H:%M:%S"), msg);
        let history = self.attributes.entry(Self::KEY.to_string()).or_default();
        if !history.is_empty() {
            history.push(' ');
        }
        history.push_str(&entry);
        debug!("Wrote '{}' to history", entry);
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.attributes.get(Self::KEY).map_or("", String::as_str)
    }
}

/// Where and from which code version an artefact was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub relative_code_path: String,
    pub line_number: u32,
    pub git_commit: String,
}

impl Provenance {
    /// Capture the location of the caller and the current git commit.
    #[track_caller]
    #[must_use]
    pub fn capture() -> Self {
        Self::at(Location::caller())
    }

    #[must_use]
    pub fn at(location: &Location<'_>) -> Self {
        Self {
            relative_code_path: location.file().to_string(),
            line_number: location.line(),
            git_commit: git_commit_in(Path::new(".")),
        }
    }

    /// `<file>#<line> @git-commit:<hash>`
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "{}#{} @git-commit:{}",
            self.relative_code_path, self.line_number, self.git_commit
        )
    }
}

/// Short hash of the commit checked out at `dir`, [`UNKNOWN_COMMIT`] if git cannot tell.
fn git_commit_in(dir: &Path) -> String {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .current_dir(dir)
        .output();
    match output {
        Ok(out) if out.status.success() => {
            let hash = String::from_utf8_lossy(&out.stdout).trim().to_string();
            if hash.is_empty() {
                UNKNOWN_COMMIT.to_string()
            } else {
                hash
            }
        }
        Ok(out) => {
            warn!(
                "Could not determine git commit: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            );
            UNKNOWN_COMMIT.to_string()
        }
        Err(e) => {
            warn!("Could not run git: {}", e);
            UNKNOWN_COMMIT.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Append `_<commit>` to the file stem
    pub add_hash: bool,
}

/// Types that can be written to disk by [`save`]
pub trait Save {
    /// Write `self` to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save_to(&self, path: &Path, provenance: &Provenance) -> Result<()>;
}

/// Path with `suffix` inserted between the file stem and the extension.
#[must_use]
pub fn output_path(path: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(file_name)
}

/// Save `obj` with provenance metadata of the calling code.
///
/// Returns the path actually written, which carries the commit hash when
/// [`SaveOptions::add_hash`] is set.
///
/// # Errors
///
/// Returns an error if writing fails.
#[track_caller]
pub fn save<T: Save + ?Sized>(obj: &T, path: impl AsRef<Path>, options: SaveOptions) -> Result<PathBuf> {
    let provenance = Provenance::capture();
    let suffix = if options.add_hash {
        format!("_{}", provenance.git_commit)
    } else {
        String::new()
    };
    let path = output_path(path.as_ref(), &suffix);

    obj.save_to(&path, &provenance)?;
    info!(
        "Saved {} to {}, produced by {}",
        object_type_name::<T>(),
        path.display(),
        provenance.describe()
    );
    Ok(path)
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(content.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

impl Save for Dataset {
    fn save_to(&self, path: &Path, provenance: &Provenance) -> Result<()> {
        let mut ds = self.clone();
        ds.history()
            .add(&format!("File saved by {}", provenance.describe()));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        DatasetWriter::new(path).write(&ds)
    }
}

impl Save for TimeSeries {
    fn save_to(&self, path: &Path, provenance: &Provenance) -> Result<()> {
        self.to_dataset()?.save_to(path, provenance)
    }
}

impl Save for Decomposition {
    fn save_to(&self, path: &Path, provenance: &Provenance) -> Result<()> {
        self.to_dataset()?.save_to(path, provenance)
    }
}

impl Save for AnnualMean {
    fn save_to(&self, path: &Path, provenance: &Provenance) -> Result<()> {
        self.to_dataset()?.save_to(path, provenance)
    }
}

impl Save for SeasonalFrame {
    fn save_to(&self, path: &Path, _provenance: &Provenance) -> Result<()> {
        write_text(path, &self.to_csv())
    }
}

impl Save for LabeledMatrix {
    fn save_to(&self, path: &Path, _provenance: &Provenance) -> Result<()> {
        write_text(path, &self.to_csv())
    }
}

impl Save for PolarMap {
    fn save_to(&self, path: &Path, _provenance: &Provenance) -> Result<()> {
        write_json(path, self)
    }
}

impl Save for LinearSegmentedColormap {
    fn save_to(&self, path: &Path, _provenance: &Provenance) -> Result<()> {
        write_json(path, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::Pole;
    use crate::utils::log_capture::capture_warnings;
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_history_is_created_and_appended() {
        let mut attrs = BTreeMap::new();
        let mut history = History::new(&mut attrs);
        assert_eq!(history.as_str(), "");

        history.add("first");
        history.add("second");
        let text = history.as_str().to_string();
        assert!(text.ends_with(": second;"));
        let entries: Vec<&str> = text.split("; ").collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ends_with(": first"));
        // "YYYY-mm-dd HH:MM:SS: "
        assert_eq!(&entries[0][4..5], "-");
        assert_eq!(&entries[0][19..21], ": ");
    }

    #[test]
    fn test_existing_history_is_kept() {
        let mut attrs = BTreeMap::from([("history".to_string(), "created;".to_string())]);
        History::new(&mut attrs).add("edited");
        assert!(attrs["history"].starts_with("created; "));
    }

    #[test]
    fn test_capture_records_call_site() {
        let line = line!() + 1;
        let provenance = Provenance::capture();
        assert_eq!(provenance.line_number, line);
        assert!(provenance.relative_code_path.ends_with("provenance.rs"));
        assert!(!provenance.git_commit.is_empty());
        assert!(provenance
            .describe()
            .contains(&format!("provenance.rs#{line} @git-commit:")));
    }

    #[test]
    fn test_git_commit_falls_back_outside_a_repository() {
        let dir = TempDir::new().unwrap();
        let (commit, logs) = capture_warnings(|| git_commit_in(dir.path()));
        assert_eq!(commit, UNKNOWN_COMMIT);
        assert!(logs.contains("git"), "{logs}");

        let missing = dir.path().join("does-not-exist");
        let (commit, logs) = capture_warnings(|| git_commit_in(&missing));
        assert_eq!(commit, UNKNOWN_COMMIT);
        assert!(logs.contains("Could not run git"), "{logs}");
    }

    #[test]
    fn test_output_path_suffix() {
        assert_eq!(
            output_path(Path::new("/tmp/out/data.nc"), "_abc1234"),
            PathBuf::from("/tmp/out/data_abc1234.nc")
        );
        assert_eq!(output_path(Path::new("plain"), "_x"), PathBuf::from("plain_x"));
        assert_eq!(output_path(Path::new("a.csv"), ""), PathBuf::from("a.csv"));
    }

    #[test]
    fn test_save_csv_and_json() {
        let dir = TempDir::new().unwrap();
        let matrix = LabeledMatrix::new(
            array![[1.0, 2.0]],
            vec!["r".to_string()],
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();
        let written = save(&matrix, dir.path().join("cov.csv"), SaveOptions::default()).unwrap();
        assert_eq!(fs::read_to_string(&written).unwrap(), ",a,b\nr,1,2\n");

        let map = PolarMap::new(Pole::North);
        let written = save(&map, dir.path().join("map.json"), SaveOptions { add_hash: true }).unwrap();
        let name = written.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("map_") && name.ends_with(".json"));
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&written).unwrap()).unwrap();
        assert_eq!(json["pole"], "north");
    }
}
