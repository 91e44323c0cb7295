use std::path::PathBuf;

use chrono::NaiveDate;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::EngineConfig;
use crate::error::VoyageError;
use crate::pipeline::{VoyageContext, VoyageReport};
use crate::source::{events_from_frame, CsvSource, SourceFiles};
use crate::table::{
    eua_summary_frame, fueleu_summary_frame, legs_frame, reconciled_legs_frame, FileSink,
    OutputFormat, ResultSink,
};

#[pyclass]
pub struct VoyageModel {
    base_path: PathBuf,
    context: VoyageContext,
}

#[pymethods]
impl VoyageModel {
    /// Without `config_path` the standard config search applies.
    #[new]
    #[pyo3(signature = (base_path, config_path=None))]
    fn new(base_path: String, config_path: Option<String>) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => EngineConfig::load_from_file(&PathBuf::from(path))
                .map_err(VoyageError::from)?,
            None => EngineConfig::load(),
        };
        Ok(Self {
            base_path: PathBuf::from(base_path),
            context: VoyageContext::new(config),
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load events, ports, countries and vessel types from CSV files under
    /// the base path. Replaces anything loaded before.
    #[pyo3(signature = (events=None, ports=None, countries=None, vessel_types=None))]
    fn load(
        &mut self,
        events: Option<String>,
        ports: Option<String>,
        countries: Option<String>,
        vessel_types: Option<String>,
    ) -> PyResult<()> {
        let defaults = SourceFiles::default();
        let files = SourceFiles {
            events: events.unwrap_or(defaults.events),
            ports: ports.unwrap_or(defaults.ports),
            countries: countries.or(defaults.countries),
            vessel_types: vessel_types.or(defaults.vessel_types),
        };
        let source = CsvSource::new(&self.base_path)
            .with_files(files)
            .with_config(&self.context.config().source);
        self.context.reload(&source)?;
        Ok(())
    }

    /// Replace the phase events with an in-memory frame.
    fn load_events_frame(&mut self, df: PyDataFrame) -> PyResult<()> {
        let events = events_from_frame(&df.0, &self.context.config().source.timestamp_formats)?;
        self.context.set_events(events);
        Ok(())
    }

    /// Drop all loaded data.
    fn invalidate(&mut self) {
        self.context.invalidate();
    }

    fn vessels(&self) -> PyResult<Vec<String>> {
        Ok(self.context.vessels()?)
    }

    // ── Computation ─────────────────────────────────────────────────────────

    /// Compute EUAs and FuelEU figures for one vessel. Returns `None` when no
    /// legs fall in the date range.
    fn compute(
        &self,
        vessel: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> PyResult<Option<VoyageResult>> {
        let report = self.context.compute(vessel, from_date, to_date)?;
        Ok(report.map(|report| VoyageResult { report }))
    }
}

#[pyclass]
pub struct VoyageResult {
    report: VoyageReport,
}

#[pymethods]
impl VoyageResult {
    #[getter]
    fn vessel(&self) -> &str {
        &self.report.vessel
    }

    #[getter]
    fn total_co2(&self) -> f64 {
        self.report.eua.total_co2
    }

    #[getter]
    fn total_euas(&self) -> f64 {
        self.report.eua.total_euas
    }

    #[getter]
    fn penalty_eur(&self) -> f64 {
        self.report.fueleu.penalty_with_reallocation
    }

    #[getter]
    fn diagnostics(&self) -> Vec<String> {
        self.report.diagnostics.iter().map(|d| d.to_string()).collect()
    }

    fn legs(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(legs_frame(&self.report.legs)?))
    }

    fn reconciled_legs(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(reconciled_legs_frame(&self.report.reconciled_legs)?))
    }

    fn eua_summary(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(eua_summary_frame(&self.report.eua)?))
    }

    fn fueleu_summary(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(fueleu_summary_frame(&self.report.fueleu)?))
    }

    /// Write every table to `dir` as "csv" or "parquet".
    #[pyo3(signature = (dir, format="csv"))]
    fn write(&self, dir: String, format: &str) -> PyResult<()> {
        let format = match format {
            "csv" => OutputFormat::Csv,
            "parquet" => OutputFormat::Parquet,
            other => {
                return Err(PyValueError::new_err(format!(
                    "Unknown output format: {other}. Use 'csv' or 'parquet'."
                )))
            }
        };
        FileSink::new(dir, format).write_report(&self.report)?;
        Ok(())
    }
}
