//! Text summaries and CSV export of run histories.
use crate::descent::DescentPoint;
use crate::error::LabResult;
use crate::training::TrainingState;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs::File;
use std::io;
use std::path::Path;

/// Flat CSV row for one dashboard epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrainingRow {
    pub epoch: u64,
    pub theta1: f64,
    pub theta2: f64,
    pub cost: f64,
    pub d_theta1: f64,
    pub d_theta2: f64,
    pub output: f64,
    pub error: f64,
    pub accuracy: f64,
}

impl From<&TrainingState> for TrainingRow {
    fn from(s: &TrainingState) -> Self {
        Self {
            epoch: s.epoch,
            theta1: s.weights.theta1,
            theta2: s.weights.theta2,
            cost: s.cost,
            d_theta1: s.gradients.d_theta1,
            d_theta2: s.gradients.d_theta2,
            output: s.output,
            error: s.error,
            accuracy: s.accuracy,
        }
    }
}

/// Write `rows` as CSV with a header line.
pub fn write_csv<W, T, I>(writer: W, rows: I) -> LabResult<()>
where
    W: io::Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_csv<P, T, I>(path: P, rows: I) -> LabResult<()>
where
    P: AsRef<Path>,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    write_csv(File::create(path)?, rows)
}

pub fn save_training_history<'a, P, I>(path: P, history: I) -> LabResult<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a TrainingState>,
{
    save_csv(path, history.into_iter().map(TrainingRow::from))
}

pub fn save_descent_history<'a, P, I>(path: P, history: I) -> LabResult<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a DescentPoint>,
{
    save_csv(path, history.into_iter().copied())
}

/// Small ASCII table: count, first, last, min and mean of `values`.
pub fn summary_table(title: &str, values: &[f64]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title} Summary Table:");
    let _ = writeln!(out, "+--------------+--------------+");
    let _ = writeln!(out, "| Statistic    | Value        |");
    let _ = writeln!(out, "+--------------+--------------+");
    if let (Some(first), Some(last)) = (values.first(), values.last()) {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let _ = writeln!(out, "| {:<12} | {:>12} |", "Samples", values.len());
        for (name, v) in [("First", first), ("Last", last), ("Min", &min), ("Mean", &mean)] {
            let _ = writeln!(out, "| {name:<12} | {v:>12.6} |");
        }
    } else {
        let _ = writeln!(out, "| {:<12} | {:>12} |", "Samples", 0);
    }
    let _ = write!(out, "+--------------+--------------+");
    out
}
