//! Empirical energy model backed by two calibrated CSV tables.
//!
//! Both files share one layout: a header line that is skipped, then one row
//! per line of the form `label, v1, v2, ...` where the label is skipped as
//! well. Lookups outside the loaded extent cost nothing rather than failing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::info;

use crate::error::{NemoError, NemoResult};

const MILLIVOLTS_PER_VOLT: f64 = 1000.0;
const THRESHOLD_BIN_MV: f64 = 100.0;
const VOLTAGE_BIN_MV: f64 = 50.0;

pub type EnergyRows = Vec<Vec<Option<f64>>>;

#[derive(Debug, Clone, Default)]
pub struct EnergyTable {
    synapse_rows: EnergyRows,
    neuron_rows: EnergyRows,
}

impl EnergyTable {
    pub fn new(synapse_rows: EnergyRows, neuron_rows: EnergyRows) -> Self {
        Self {
            synapse_rows,
            neuron_rows,
        }
    }

    pub fn from_csv_files(
        synapse_path: Option<&Path>,
        neuron_path: Option<&Path>,
    ) -> NemoResult<Self> {
        let synapse_rows = match synapse_path {
            Some(path) => load_energy_csv(path)?,
            None => Vec::new(),
        };

        let neuron_rows = match neuron_path {
            Some(path) => load_energy_csv(path)?,
            None => Vec::new(),
        };

        Ok(Self::new(synapse_rows, neuron_rows))
    }

    /// Energy of one synapse for one tick. Both indices are 1-based; weight 0
    /// or an inactive synapse (activity 0) therefore cost nothing.
    pub fn get_synapse_energy(&self, weight: i64, activity: i64) -> f64 {
        if weight < 1 || activity < 1 {
            return 0.0;
        }

        lookup(&self.synapse_rows, weight as usize - 1, activity as usize - 1)
    }

    /// Energy of one neuron for one tick, binned by threshold (100 mV rows) and
    /// membrane voltage (50 mV columns). Inputs are in volts.
    pub fn get_neuron_energy(&self, vth: f64, vn: f64) -> f64 {
        if self.neuron_rows.is_empty() {
            return 0.0;
        }

        let row = threshold_to_row(vth * MILLIVOLTS_PER_VOLT, self.neuron_rows.len());
        let num_cols = self.neuron_rows[row].len();

        if num_cols == 0 {
            return 0.0;
        }

        let col = voltage_to_col(vn * MILLIVOLTS_PER_VOLT, num_cols);
        lookup(&self.neuron_rows, row, col)
    }

    pub fn synapse_table_dims(&self) -> (usize, usize) {
        table_dims(&self.synapse_rows)
    }

    pub fn neuron_table_dims(&self) -> (usize, usize) {
        table_dims(&self.neuron_rows)
    }
}

fn lookup(rows: &EnergyRows, row: usize, col: usize) -> f64 {
    rows.get(row)
        .and_then(|cells| cells.get(col))
        .copied()
        .flatten()
        .unwrap_or(0.0)
}

fn table_dims(rows: &EnergyRows) -> (usize, usize) {
    (rows.len(), rows.iter().map(Vec::len).max().unwrap_or(0))
}

fn threshold_to_row(vth_mv: f64, num_rows: usize) -> usize {
    let bin = (vth_mv / THRESHOLD_BIN_MV).round();
    let bin = bin.max(1.0).min(num_rows as f64) as usize;
    bin - 1
}

fn voltage_to_col(vn_mv: f64, num_cols: usize) -> usize {
    let bin = (vn_mv / VOLTAGE_BIN_MV).floor();
    bin.max(0.0).min((num_cols - 1) as f64) as usize
}

pub fn load_energy_csv(path: &Path) -> NemoResult<EnergyRows> {
    let file = File::open(path).map_err(|err| {
        NemoError::EnergyTable(format!("failed to open {}: {}", path.display(), err))
    })?;

    let rows = parse_energy_csv(file).map_err(|err| match err {
        NemoError::EnergyTable(msg) => {
            NemoError::EnergyTable(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })?;

    info!(
        "loaded energy table from {} ({} rows)",
        path.display(),
        rows.len()
    );

    Ok(rows)
}

/// Parses one energy table. The header record and the label field of every
/// record are dropped; empty cells are kept as missing values.
pub fn parse_energy_csv<R: Read>(reader: R) -> NemoResult<EnergyRows> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();

    for result in csv_reader.records() {
        let record =
            result.map_err(|err| NemoError::EnergyTable(format!("malformed csv: {}", err)))?;
        let line_number = record.position().map_or(0, |position| position.line());

        if record.iter().all(str::is_empty) {
            continue;
        }

        let row = record
            .iter()
            .skip(1)
            .map(|cell| parse_cell(cell, line_number))
            .collect::<NemoResult<Vec<_>>>()?;

        rows.push(row);
    }

    if rows.is_empty() {
        return Err(NemoError::EnergyTable("table has no data rows".to_string()));
    }

    Ok(rows)
}

fn parse_cell(cell: &str, line_number: u64) -> NemoResult<Option<f64>> {
    if cell.is_empty() {
        return Ok(None);
    }

    cell.parse::<f64>().map(Some).map_err(|_| {
        NemoError::EnergyTable(format!(
            "invalid value '{}' on line {}",
            cell, line_number
        ))
    })
}
