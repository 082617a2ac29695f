//! Evaluation configuration.
//!
//! The configuration can be read from and written to JSON, YAML or TOML; [`EvaluationConfig::from_file`]
//! and [`EvaluationConfig::to_file`] pick the format from the file extension.
//!
//! ```
//! use nees::EvaluationConfig;
//!
//! let cfg = EvaluationConfig {
//!     snap_tolerance: 0.005,
//!     ..Default::default()
//! };
//! assert_eq!(cfg.symmetry_tolerance, 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{NeesError, Result};
use crate::linalg::InversionOptions;
use crate::state::{SNAP_TOLERANCE, SYMMETRY_TOLERANCE};

fn default_snap_tolerance() -> f64 {
    SNAP_TOLERANCE
}
fn default_symmetry_tolerance() -> f64 {
    SYMMETRY_TOLERANCE
}
fn default_min_reciprocal_condition() -> f64 {
    InversionOptions::default().min_reciprocal_condition
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Logging settings for the command line tool
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of off, error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            file: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Seconds within which an estimate time snaps onto a truth sample instead of interpolating.
    #[serde(default = "default_snap_tolerance")]
    pub snap_tolerance: f64,

    /// Largest absolute asymmetry accepted in a covariance when loading samples.
    #[serde(default = "default_symmetry_tolerance")]
    pub symmetry_tolerance: f64,

    /// Estimate covariances with σ_min / σ_max below this are treated as singular.
    #[serde(default = "default_min_reciprocal_condition")]
    pub min_reciprocal_condition: f64,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            snap_tolerance: default_snap_tolerance(),
            symmetry_tolerance: default_symmetry_tolerance(),
            min_reciprocal_condition: default_min_reciprocal_condition(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EvaluationConfig {
    /// Check that every tolerance is finite and non-negative, and that the reciprocal condition
    /// floor does not exceed 1.
    ///
    /// # Errors
    /// [`NeesError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        check_tolerance("snap_tolerance", self.snap_tolerance)?;
        check_tolerance("symmetry_tolerance", self.symmetry_tolerance)?;
        check_tolerance("min_reciprocal_condition", self.min_reciprocal_condition)?;
        if self.min_reciprocal_condition > 1.0 {
            return Err(NeesError::InvalidConfig {
                field: "min_reciprocal_condition",
                value: self.min_reciprocal_condition,
                reason: "must not exceed 1",
            });
        }
        Ok(())
    }
    fn validated(self) -> io::Result<Self> {
        self.validate()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(self)
    }
    pub fn inversion_options(&self) -> InversionOptions {
        InversionOptions {
            min_reciprocal_condition: self.min_reciprocal_condition,
        }
    }
    /// Write the configuration to a JSON file (pretty-printed).
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::other)
    }
    /// Read the configuration from a JSON file. Out-of-range tolerances are an `InvalidData` error.
    pub fn from_json<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let cfg: Self = serde_json::from_reader(file).map_err(io::Error::other)?;
        cfg.validated()
    }
    /// Write the configuration as YAML.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        let s = serde_yaml::to_string(self).map_err(io::Error::other)?;
        file.write_all(s.as_bytes())
    }
    /// Read the configuration from YAML.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let cfg: Self = serde_yaml::from_reader(file).map_err(io::Error::other)?;
        cfg.validated()
    }
    /// Write the configuration as TOML.
    pub fn to_toml<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut file = File::create(path)?;
        let s = toml::to_string(self).map_err(io::Error::other)?;
        file.write_all(s.as_bytes())
    }
    /// Read the configuration from TOML.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut s = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut s)?;
        let cfg: Self = toml::from_str(&s).map_err(io::Error::other)?;
        cfg.validated()
    }
    /// Generic write: choose format by file extension (.json/.yaml/.yml/.toml)
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let p = path.as_ref();
        match extension(p).as_deref() {
            Some("json") => self.to_json(p),
            Some("yaml") | Some("yml") => self.to_yaml(p),
            Some("toml") => self.to_toml(p),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unsupported file extension",
            )),
        }
    }
    /// Generic read: choose format by file extension (.json/.yaml/.yml/.toml)
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let p = path.as_ref();
        match extension(p).as_deref() {
            Some("json") => Self::from_json(p),
            Some("yaml") | Some("yml") => Self::from_yaml(p),
            Some("toml") => Self::from_toml(p),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "unsupported file extension",
            )),
        }
    }
}

fn check_tolerance(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(NeesError::InvalidConfig {
            field,
            value,
            reason: "must be finite and non-negative",
        });
    }
    Ok(())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn sample_cfg() -> EvaluationConfig {
        EvaluationConfig {
            snap_tolerance: 0.002,
            symmetry_tolerance: 1e-6,
            min_reciprocal_condition: 1e-12,
            logging: LoggingConfig {
                level: "debug".to_string(),
                file: Some(PathBuf::from("/tmp/nees.log")),
            },
        }
    }

    #[test]
    fn json_roundtrip() {
        let cfg = sample_cfg();
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("json");
        cfg.to_json(&path).unwrap();
        let loaded = EvaluationConfig::from_json(&path).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn yaml_and_yml_roundtrip() {
        let cfg = sample_cfg();
        let f = NamedTempFile::new().unwrap();
        for ext in ["yaml", "yml"] {
            let path = f.path().with_extension(ext);
            cfg.to_file(&path).unwrap();
            let loaded = EvaluationConfig::from_file(&path).unwrap();
            assert_eq!(cfg, loaded);
        }
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = sample_cfg();
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("toml");
        cfg.to_toml(&path).unwrap();
        let loaded = EvaluationConfig::from_toml(&path).unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("toml");
        std::fs::write(&path, "snap_tolerance = 0.01\n").unwrap();
        let loaded = EvaluationConfig::from_file(&path).unwrap();
        assert_eq!(loaded.snap_tolerance, 0.01);
        assert_eq!(loaded.symmetry_tolerance, SYMMETRY_TOLERANCE);
        assert_eq!(loaded.logging, LoggingConfig::default());
        assert_eq!(
            loaded.inversion_options().min_reciprocal_condition,
            InversionOptions::default().min_reciprocal_condition
        );
    }

    #[test]
    fn validate_rejects_bad_tolerances() {
        assert!(EvaluationConfig::default().validate().is_ok());

        let negative = EvaluationConfig {
            snap_tolerance: -1.0,
            ..Default::default()
        };
        match negative.validate() {
            Err(NeesError::InvalidConfig { field, value, .. }) => {
                assert_eq!(field, "snap_tolerance");
                assert_eq!(value, -1.0);
            }
            other => panic!("expected invalid config, got {other:?}"),
        }

        let nan = EvaluationConfig {
            symmetry_tolerance: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            nan.validate(),
            Err(NeesError::InvalidConfig {
                field: "symmetry_tolerance",
                ..
            })
        ));

        let too_strict = EvaluationConfig {
            min_reciprocal_condition: 2.0,
            ..Default::default()
        };
        assert!(too_strict.validate().is_err());
    }

    #[test]
    fn loading_rejects_bad_tolerances() {
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("toml");
        std::fs::write(&path, "snap_tolerance = -1.0\n").unwrap();
        let err = EvaluationConfig::from_file(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("snap_tolerance"));

        std::fs::write(&path, "snap_tolerance = nan\n").unwrap();
        let err = EvaluationConfig::from_toml(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let path = f.path().with_extension("json");
        std::fs::write(&path, r#"{"min_reciprocal_condition": -1e-12}"#).unwrap();
        let err = EvaluationConfig::from_json(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn unsupported_extension_error() {
        let cfg = sample_cfg();
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("txt");

        let result = cfg.to_file(&path);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);

        let result = EvaluationConfig::from_file(&path);
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidInput);
    }
}
