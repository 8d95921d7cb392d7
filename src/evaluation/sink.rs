//! Serialized output of metric rows.

use std::io::Write;

use anyhow::{Context, Result};
use parking_lot::Mutex;

/// Shared writer for `experiment \t metric \t entity \t value` rows.
///
/// Each row is formatted up front and written with a single `write_all`
/// under the lock, so concurrent emitters never interleave partial lines.
pub struct RowSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> RowSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Emit one row. An empty `entity` marks an aggregate.
    pub fn emit(&self, experiment: &str, metric: &str, entity: &str, value: f64) -> Result<()> {
        let row = format!("{experiment}\t{metric}\t{entity}\t{value:?}\n");
        let mut out = self.out.lock();
        out.write_all(row.as_bytes()).context("Failed to write metric row")
    }

    pub fn flush(&self) -> Result<()> {
        self.out.lock().flush().context("Failed to flush metric rows")
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_row_layout() -> Result<()> {
        let sink = RowSink::new(Vec::new());
        sink.emit("exp", "p10", "u1", 0.5)?;
        sink.emit("exp", "p10", "", 1.0)?;
        assert_eq!(String::from_utf8(sink.into_inner())?, "exp\tp10\tu1\t0.5\nexp\tp10\t\t1.0\n");
        Ok(())
    }

    #[test]
    fn test_concurrent_rows_stay_whole() -> Result<()> {
        let sink = RowSink::new(Vec::new());
        (0..2000)
            .into_par_iter()
            .try_for_each(|i| sink.emit("experiment", "metric", &format!("user{i}"), i as f64))?;

        let text = String::from_utf8(sink.into_inner())?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2000);
        for line in lines {
            let fields: Vec<&str> = line.split('\t').collect();
            assert_eq!(fields.len(), 4, "torn row: {line:?}");
            let i: f64 = fields[3].parse()?;
            assert_eq!(fields[2], format!("user{}", i as usize));
        }
        Ok(())
    }
}
