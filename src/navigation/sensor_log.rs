//! Persisted sensor log
//!
//! Plain text, one entry per line:
//! - `50.00` for a within-range distance sample
//! - `turn` for an obstacle turn
//! - a heading label (`East`, ...) written at offset zero on rollover,
//!   overwriting whatever was there; later entries continue from that point
//!
//! [`read_sweeps`] reads a finished log back as sweeps: the runs of distances
//! between turns.

use super::heading::Heading;
use crate::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

pub const TURN_MARKER: &str = "turn";

/// Line-oriented writer over a seekable sink
#[derive(Debug)]
pub struct SensorLog<W: Write + Seek> {
    writer: W,
}

impl SensorLog<File> {
    /// Open (create or truncate) the log file for reading and writing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| Error::LogFileOpen {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("Sensor log opened at {}", path.display());
        Ok(Self::new(file))
    }
}

impl<W: Write + Seek> SensorLog<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Append a distance sample with two decimals
    pub fn record_distance(&mut self, distance_cm: f64) -> Result<()> {
        writeln!(self.writer, "{:.2}", distance_cm)?;
        self.flush()
    }

    /// Append a turn marker
    pub fn record_turn(&mut self) -> Result<()> {
        writeln!(self.writer, "{}", TURN_MARKER)?;
        self.flush()
    }

    /// Rewind to the start and write the new heading label
    pub fn rewrite_heading(&mut self, heading: Heading) -> Result<()> {
        self.writer.seek(SeekFrom::Start(0))?;
        writeln!(self.writer, "{}", heading)?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Distances logged between two turns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sweep {
    /// Heading label written just before this sweep, if any
    pub heading: Option<Heading>,
    pub distances_cm: Vec<f64>,
}

/// Read a sensor log file back as sweeps
pub fn read_sweeps<P: AsRef<Path>>(path: P) -> Result<Vec<Sweep>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::LogFileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sweeps(BufReader::new(file))
}

/// Split log lines into sweeps at every `turn` marker and heading label.
///
/// Blank lines are skipped and sweeps without distances are dropped. A
/// heading label followed directly by a turn carries over to the next sweep.
pub fn parse_sweeps<R: BufRead>(reader: R) -> Result<Vec<Sweep>> {
    let mut sweeps = Vec::new();
    let mut current = Sweep::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let entry = line.trim();
        if entry.is_empty() {
            continue;
        }

        if entry.eq_ignore_ascii_case(TURN_MARKER) {
            if !current.distances_cm.is_empty() {
                sweeps.push(std::mem::take(&mut current));
            }
        } else if let Some(heading) = Heading::from_label(entry) {
            if !current.distances_cm.is_empty() {
                sweeps.push(std::mem::take(&mut current));
            }
            current.heading = Some(heading);
        } else {
            let distance = entry
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite() && *d >= 0.0)
                .ok_or_else(|| Error::LogFormat {
                    line: index + 1,
                    content: entry.to_string(),
                })?;
            current.distances_cm.push(distance);
        }
    }

    if !current.distances_cm.is_empty() {
        sweeps.push(current);
    }
    Ok(sweeps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn contents(log: SensorLog<Cursor<Vec<u8>>>) -> String {
        String::from_utf8(log.into_inner().into_inner()).unwrap()
    }

    #[test]
    fn test_append_lines() {
        let mut log = SensorLog::new(Cursor::new(Vec::new()));
        log.record_distance(50.0).unwrap();
        log.record_distance(61.256).unwrap();
        log.record_turn().unwrap();
        assert_eq!(contents(log), "50.00\n61.26\nturn\n");
    }

    #[test]
    fn test_rewrite_heading_overwrites_from_start() {
        let mut log = SensorLog::new(Cursor::new(Vec::new()));
        log.record_distance(12.0).unwrap();
        log.record_distance(34.0).unwrap();
        log.rewrite_heading(Heading::East).unwrap();
        log.record_distance(9.0).unwrap();

        // Later writes continue over the old bytes; the tail of "34.00\n" survives
        assert_eq!(contents(log), "East\n9.00\n0\n");
    }

    #[test]
    fn test_open_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensor_data.csv");
        std::fs::write(&path, "stale\n").unwrap();

        let mut log = SensorLog::open(&path).unwrap();
        log.record_turn().unwrap();
        drop(log);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "turn\n");
    }

    #[test]
    fn test_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("sensor_data.csv");
        let err = SensorLog::open(&path).unwrap_err();
        assert!(matches!(err, Error::LogFileOpen { .. }));
    }

    fn sweep(heading: Option<Heading>, distances_cm: &[f64]) -> Sweep {
        Sweep {
            heading,
            distances_cm: distances_cm.to_vec(),
        }
    }

    #[test]
    fn test_sweeps_split_at_turns() {
        let sweeps = parse_sweeps("50.00\n60.00\nturn\n40.00\n".as_bytes()).unwrap();
        assert_eq!(
            sweeps,
            vec![sweep(None, &[50.0, 60.0]), sweep(None, &[40.0])]
        );
    }

    #[test]
    fn test_sweeps_after_rollover() {
        let text = "East\n30.00\nturn\n50.00\nturn\n50.00\n";
        let sweeps = parse_sweeps(text.as_bytes()).unwrap();
        assert_eq!(
            sweeps,
            vec![
                sweep(Some(Heading::East), &[30.0]),
                sweep(None, &[50.0]),
                sweep(None, &[50.0]),
            ]
        );
    }

    #[test]
    fn test_empty_sweeps_dropped() {
        assert!(parse_sweeps("turn\nturn\n".as_bytes()).unwrap().is_empty());
        assert!(parse_sweeps("East\n\n".as_bytes()).unwrap().is_empty());

        // Heading survives a turn that closed nothing
        let sweeps = parse_sweeps("South\nturn\n12.50\n".as_bytes()).unwrap();
        assert_eq!(sweeps, vec![sweep(Some(Heading::South), &[12.5])]);
    }

    #[test]
    fn test_malformed_line_reported() {
        let err = parse_sweeps("50.00\nbanana\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::LogFormat { line: 2, ref content } if content == "banana"));
    }

    #[test]
    fn test_read_back_written_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensor_data.csv");

        let mut log = SensorLog::open(&path).unwrap();
        log.record_distance(20.0).unwrap();
        log.record_turn().unwrap();
        log.record_distance(35.5).unwrap();
        log.record_distance(36.25).unwrap();
        drop(log);

        let sweeps = read_sweeps(&path).unwrap();
        assert_eq!(
            sweeps,
            vec![sweep(None, &[20.0]), sweep(None, &[35.5, 36.25])]
        );
    }

    #[test]
    fn test_read_missing_log() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_sweeps(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, Error::LogFileOpen { .. }));
    }
}
