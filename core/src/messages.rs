//! Raw odometry records and CSV import/export.
//!
//! An [`OdometryRecord`] is the flat form in which trajectories arrive: a timestamp, a position, an
//! orientation quaternion, linear and angular velocity, and the 6×6 pose and twist covariances in row-major
//! order. Records are converted into [`StateSample`]s (quaternion to roll/pitch/yaw, covariance blocks on
//! the diagonal) with [`TryFrom`] or [`OdometryRecord::to_state`].
//!
//! ## CSV layout
//!
//! One header row, then one row per record. Columns are matched by name, so their order does not matter
//! and extra columns are ignored:
//! - `time` (seconds), or `sec` and `nanosec`
//! - `x`, `y`, `z`
//! - `qw`, `qx`, `qy`, `qz`
//! - `vx`, `vy`, `vz`, `wx`, `wy`, `wz`
//! - `pose_cov_0` .. `pose_cov_35` and `twist_cov_0` .. `twist_cov_35`

use nalgebra::{Matrix6, Vector3};
use serde::Deserialize;
use std::path::Path;

use crate::alignment::Trajectory;
use crate::error::{NeesError, Result};
use crate::state::{SYMMETRY_TOLERANCE, StateSample, StateVector, block_covariance};
use crate::{quaternion_to_euler, seconds};

/// Number of entries in a row-major 6×6 covariance
pub const COVARIANCE_ENTRIES: usize = 36;

/// Kinematic columns of a CSV row. The covariances are read separately by column name.
#[derive(Debug, Deserialize)]
struct KinematicRow {
    #[serde(default)]
    time: Option<f64>,
    #[serde(default)]
    sec: Option<i64>,
    #[serde(default)]
    nanosec: Option<u32>,
    x: f64,
    y: f64,
    z: f64,
    qw: f64,
    qx: f64,
    qy: f64,
    qz: f64,
    vx: f64,
    vy: f64,
    vz: f64,
    wx: f64,
    wy: f64,
    wz: f64,
}

/// A single pose and twist record with covariances
#[derive(Debug, Clone, PartialEq)]
pub struct OdometryRecord {
    /// Time in seconds
    pub timestamp: f64,
    pub position: Vector3<f64>,
    /// Orientation quaternion in (w, x, y, z) order
    pub orientation: [f64; 4],
    pub linear_velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    /// Row-major covariance of (x, y, z, roll, pitch, yaw)
    pub pose_covariance: [f64; COVARIANCE_ENTRIES],
    /// Row-major covariance of (vx, vy, vz, wx, wy, wz)
    pub twist_covariance: [f64; COVARIANCE_ENTRIES],
}

impl Default for OdometryRecord {
    fn default() -> Self {
        OdometryRecord {
            timestamp: 0.0,
            position: Vector3::zeros(),
            orientation: [1.0, 0.0, 0.0, 0.0],
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            pose_covariance: [0.0; COVARIANCE_ENTRIES],
            twist_covariance: [0.0; COVARIANCE_ENTRIES],
        }
    }
}

impl OdometryRecord {
    /// Convert to a state sample, checking the covariance symmetry with `tolerance`.
    ///
    /// # Errors
    /// [`NeesError::InvalidQuaternion`] for a zero-norm orientation, plus anything
    /// [`StateSample::with_symmetry_tolerance`] rejects.
    pub fn to_state(&self, tolerance: f64) -> Result<StateSample> {
        let [w, x, y, z] = self.orientation;
        let (roll, pitch, yaw) = quaternion_to_euler(w, x, y, z).ok_or(
            NeesError::InvalidQuaternion {
                timestamp: self.timestamp,
            },
        )?;
        let mean = StateVector::from_column_slice(&[
            self.position.x,
            self.position.y,
            self.position.z,
            roll,
            pitch,
            yaw,
            self.linear_velocity.x,
            self.linear_velocity.y,
            self.linear_velocity.z,
            self.angular_velocity.x,
            self.angular_velocity.y,
            self.angular_velocity.z,
        ]);
        let covariance = block_covariance(
            &Matrix6::from_row_slice(&self.pose_covariance),
            &Matrix6::from_row_slice(&self.twist_covariance),
        );
        StateSample::with_symmetry_tolerance(self.timestamp, mean, covariance, tolerance)
    }
    /// Reads a CSV file and returns a vector of `OdometryRecord` structs.
    ///
    /// # Arguments
    /// * `path` - Path to the CSV file to read.
    ///
    /// # Returns
    /// * `Ok(Vec<OdometryRecord>)` if successful.
    /// * `Err` if the file cannot be read or parsed, or a required column is missing.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let mut rdr = csv::Reader::from_path(path)?;
        let headers = rdr.headers()?.clone();
        if headers.iter().all(|h| h != "time")
            && !(headers.iter().any(|h| h == "sec") && headers.iter().any(|h| h == "nanosec"))
        {
            return Err(NeesError::MissingColumn("time".to_string()));
        }
        let pose_names = covariance_names("pose_cov");
        let twist_names = covariance_names("twist_cov");
        let pose_columns = covariance_columns(&headers, &pose_names)?;
        let twist_columns = covariance_columns(&headers, &twist_names)?;

        let mut records = Vec::new();
        for result in rdr.records() {
            let row = result?;
            let kinematic: KinematicRow = row.deserialize(Some(&headers))?;
            let timestamp = match (kinematic.time, kinematic.sec) {
                (Some(time), _) => time,
                (None, Some(sec)) => seconds(sec, kinematic.nanosec.unwrap_or(0)),
                (None, None) => return Err(NeesError::MissingColumn("time".to_string())),
            };
            records.push(OdometryRecord {
                timestamp,
                position: Vector3::new(kinematic.x, kinematic.y, kinematic.z),
                orientation: [kinematic.qw, kinematic.qx, kinematic.qy, kinematic.qz],
                linear_velocity: Vector3::new(kinematic.vx, kinematic.vy, kinematic.vz),
                angular_velocity: Vector3::new(kinematic.wx, kinematic.wy, kinematic.wz),
                pose_covariance: read_covariance(&row, &pose_columns, &pose_names)?,
                twist_covariance: read_covariance(&row, &twist_columns, &twist_names)?,
            });
        }
        Ok(records)
    }
    /// Writes a slice of `OdometryRecord`s to a CSV file in the layout [`OdometryRecord::from_csv`] reads.
    pub fn to_csv<P: AsRef<Path>>(records: &[Self], path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut header: Vec<String> = [
            "time", "x", "y", "z", "qw", "qx", "qy", "qz", "vx", "vy", "vz", "wx", "wy", "wz",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(covariance_names("pose_cov"));
        header.extend(covariance_names("twist_cov"));
        writer.write_record(&header)?;

        for record in records {
            let mut fields = vec![record.timestamp];
            fields.extend(record.position.iter());
            fields.extend(record.orientation);
            fields.extend(record.linear_velocity.iter());
            fields.extend(record.angular_velocity.iter());
            fields.extend(record.pose_covariance);
            fields.extend(record.twist_covariance);
            writer.write_record(fields.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl TryFrom<&OdometryRecord> for StateSample {
    type Error = NeesError;

    fn try_from(record: &OdometryRecord) -> Result<Self> {
        record.to_state(SYMMETRY_TOLERANCE)
    }
}

/// Load a CSV of odometry records as a validated, time-sorted trajectory.
///
/// Fails on the first malformed record or on timestamps that go backwards.
pub fn load_trajectory<P: AsRef<Path>>(path: P, symmetry_tolerance: f64) -> Result<Trajectory> {
    let samples = OdometryRecord::from_csv(path)?
        .iter()
        .map(|record| record.to_state(symmetry_tolerance))
        .collect::<Result<Vec<_>>>()?;
    Trajectory::new(samples)
}

fn covariance_names(prefix: &str) -> Vec<String> {
    (0..COVARIANCE_ENTRIES)
        .map(|i| format!("{prefix}_{i}"))
        .collect()
}

fn covariance_columns(
    headers: &csv::StringRecord,
    names: &[String],
) -> Result<[usize; COVARIANCE_ENTRIES]> {
    let mut columns = [0usize; COVARIANCE_ENTRIES];
    for (column, name) in columns.iter_mut().zip(names) {
        *column = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| NeesError::MissingColumn(name.clone()))?;
    }
    Ok(columns)
}

fn read_covariance(
    row: &csv::StringRecord,
    columns: &[usize; COVARIANCE_ENTRIES],
    names: &[String],
) -> Result<[f64; COVARIANCE_ENTRIES]> {
    let mut values = [0.0; COVARIANCE_ENTRIES];
    for (value, (&column, name)) in values.iter_mut().zip(columns.iter().zip(names)) {
        let field = row.get(column).unwrap_or("").trim();
        *value = field.parse().map_err(|_| NeesError::InvalidField {
            column: name.clone(),
            value: field.to_string(),
        })?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{PITCH, ROLL, VX, X, YAW};
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::FRAC_PI_4;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn diagonal(value: f64) -> [f64; COVARIANCE_ENTRIES] {
        let mut cov = [0.0; COVARIANCE_ENTRIES];
        for i in 0..6 {
            cov[i * 6 + i] = value;
        }
        cov
    }

    fn record(t: f64) -> OdometryRecord {
        OdometryRecord {
            timestamp: t,
            position: Vector3::new(1.0, 2.0, 3.0),
            orientation: [FRAC_PI_4.cos(), 0.0, 0.0, FRAC_PI_4.sin()],
            linear_velocity: Vector3::new(0.5, 0.0, 0.0),
            angular_velocity: Vector3::new(0.0, 0.0, 0.1),
            pose_covariance: diagonal(0.01),
            twist_covariance: diagonal(0.02),
        }
    }

    #[test]
    fn record_to_state() {
        let mut r = record(4.0);
        r.pose_covariance[1] = 0.001;
        r.pose_covariance[6] = 0.001;
        let state = StateSample::try_from(&r).unwrap();
        assert_eq!(state.timestamp(), 4.0);
        assert_eq!(state.mean()[X], 1.0);
        assert_approx_eq!(state.mean()[ROLL], 0.0, 1e-12);
        assert_approx_eq!(state.mean()[PITCH], 0.0, 1e-12);
        assert_approx_eq!(state.mean()[YAW], std::f64::consts::FRAC_PI_2, 1e-12);
        assert_eq!(state.mean()[VX], 0.5);
        let p = state.covariance();
        assert_eq!(p[(0, 0)], 0.01);
        assert_eq!(p[(0, 1)], 0.001);
        assert_eq!(p[(7, 7)], 0.02);
        assert_eq!(p[(0, 7)], 0.0);
    }
    #[test]
    fn record_rejects_zero_quaternion() {
        let mut r = record(1.0);
        r.orientation = [0.0; 4];
        assert!(matches!(
            StateSample::try_from(&r),
            Err(NeesError::InvalidQuaternion { timestamp }) if timestamp == 1.0
        ));
    }
    #[test]
    fn record_rejects_asymmetric_covariance() {
        let mut r = record(1.0);
        r.twist_covariance[1] = 0.5;
        assert!(matches!(
            StateSample::try_from(&r),
            Err(NeesError::NonSymmetricCovariance { .. })
        ));
    }
    #[test]
    fn csv_roundtrip() {
        let records = vec![record(0.0), record(0.5), record(1.0)];
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("csv");
        OdometryRecord::to_csv(&records, &path).unwrap();
        let loaded = OdometryRecord::from_csv(&path).unwrap();
        assert_eq!(loaded, records);
    }
    #[test]
    fn csv_with_split_timestamp() {
        let mut header: Vec<String> = [
            "sec", "nanosec", "x", "y", "z", "qw", "qx", "qy", "qz", "vx", "vy", "vz", "wx",
            "wy", "wz",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        header.extend(covariance_names("pose_cov"));
        header.extend(covariance_names("twist_cov"));
        let mut row = vec!["12".to_string(), "250000000".to_string()];
        row.extend(["0", "0", "0", "1", "0", "0", "0", "0", "0", "0", "0", "0", "0"].map(String::from));
        row.extend((0..2 * COVARIANCE_ENTRIES).map(|_| "0".to_string()));

        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "{}", header.join(",")).unwrap();
        writeln!(f, "{}", row.join(",")).unwrap();
        f.flush().unwrap();

        let loaded = OdometryRecord::from_csv(f.path()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_approx_eq!(loaded[0].timestamp, 12.25, 1e-12);
        assert_eq!(loaded[0].orientation, [1.0, 0.0, 0.0, 0.0]);
    }
    #[test]
    fn csv_missing_covariance_column() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "time,x,y,z,qw,qx,qy,qz,vx,vy,vz,wx,wy,wz").unwrap();
        writeln!(f, "0,0,0,0,1,0,0,0,0,0,0,0,0,0").unwrap();
        f.flush().unwrap();
        match OdometryRecord::from_csv(f.path()) {
            Err(NeesError::MissingColumn(name)) => assert_eq!(name, "pose_cov_0"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }
    #[test]
    fn csv_rejects_unparseable_covariance() {
        let records = vec![record(0.0)];
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("csv");
        OdometryRecord::to_csv(&records, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines: Vec<String> = text.lines().map(String::from).collect();
        let mut fields: Vec<String> = lines[1].split(',').map(String::from).collect();
        let column = 14 + 7; // pose_cov_7
        fields[column] = "abc".to_string();
        lines[1] = fields.join(",");
        std::fs::write(&path, lines.join("\n")).unwrap();
        match OdometryRecord::from_csv(&path) {
            Err(NeesError::InvalidField { column, value }) => {
                assert_eq!(column, "pose_cov_7");
                assert_eq!(value, "abc");
            }
            other => panic!("expected invalid field, got {other:?}"),
        }
    }
    #[test]
    fn csv_missing_time_column() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "x,y,z,qw,qx,qy,qz,vx,vy,vz,wx,wy,wz").unwrap();
        f.flush().unwrap();
        assert!(matches!(
            OdometryRecord::from_csv(f.path()),
            Err(NeesError::MissingColumn(name)) if name == "time"
        ));
    }
    #[test]
    fn load_trajectory_rejects_unsorted() {
        let records = vec![record(0.0), record(2.0), record(1.0)];
        let f = NamedTempFile::new().unwrap();
        let path = f.path().with_extension("csv");
        OdometryRecord::to_csv(&records, &path).unwrap();
        assert!(matches!(
            load_trajectory(&path, SYMMETRY_TOLERANCE),
            Err(NeesError::UnsortedTimestamps { index: 2, .. })
        ));
    }
}
