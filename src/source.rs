//! Ingestion of phase events and reference tables into typed records.
//!
//! Files are read with every column as a string, header names trimmed, then
//! numeric columns are stripped and cast to `Float64` lazily. Rows are turned
//! into `PhaseEvent`s / `PortReference` entries afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use tracing::info;

use crate::config::SourceConfig;
use crate::error::VoyageError;
use crate::event::{Phase, PhaseEvent};
use crate::fuel::FuelType;
use crate::jurisdiction::{parse_eu_label, parse_yes, PortInfo, PortReference};
use crate::schema::{country, event, port, vessel};

/// Provider of the three inputs a `VoyageContext` is built from.
pub trait DataSource {
    fn load_events(&self) -> Result<Vec<PhaseEvent>, VoyageError>;
    fn load_ports(&self) -> Result<PortReference, VoyageError>;
    /// Vessel name → vessel type.
    fn load_vessel_types(&self) -> Result<HashMap<String, String>, VoyageError>;
}

/// File names under a `CsvSource` base path. Optional tables may be absent.
#[derive(Debug, Clone)]
pub struct SourceFiles {
    pub events: String,
    pub ports: String,
    pub countries: Option<String>,
    pub vessel_types: Option<String>,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            events: "vessel_reports.csv".to_string(),
            ports: "port_name_list.csv".to_string(),
            countries: Some("country_code_list.csv".to_string()),
            vessel_types: Some("vessel_types.csv".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvSource {
    pub base_path: PathBuf,
    pub files: SourceFiles,
    pub timestamp_formats: Vec<String>,
}

impl CsvSource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            files: SourceFiles::default(),
            timestamp_formats: SourceConfig::default().timestamp_formats,
        }
    }

    pub fn with_files(mut self, files: SourceFiles) -> Self {
        self.files = files;
        self
    }

    pub fn with_config(mut self, config: &SourceConfig) -> Self {
        self.timestamp_formats = config.timestamp_formats.clone();
        self
    }

    fn read_csv_as_strings(&self, filename: &str) -> Result<DataFrame, VoyageError> {
        read_csv_as_strings(&self.base_path.join(filename))
    }

    /// Optional tables that are configured but missing on disk are skipped.
    fn optional_file(&self, filename: Option<&str>) -> Option<PathBuf> {
        filename
            .map(|f| self.base_path.join(f))
            .filter(|p| p.exists())
    }
}

impl DataSource for CsvSource {
    fn load_events(&self) -> Result<Vec<PhaseEvent>, VoyageError> {
        let df = self.read_csv_as_strings(&self.files.events)?;
        let events = events_from_frame(&df, &self.timestamp_formats)?;
        info!(file = %self.files.events, rows = events.len(), "Read phase events");
        Ok(events)
    }

    fn load_ports(&self) -> Result<PortReference, VoyageError> {
        let df = self.read_csv_as_strings(&self.files.ports)?;
        let mut refs = ports_from_frame(&df)?;
        if let Some(path) = self.optional_file(self.files.countries.as_deref()) {
            let countries = read_csv_as_strings(&path)?;
            add_countries_from_frame(&mut refs, &countries)?;
        }
        info!(file = %self.files.ports, ports = refs.len(), "Read port reference");
        Ok(refs)
    }

    fn load_vessel_types(&self) -> Result<HashMap<String, String>, VoyageError> {
        match self.optional_file(self.files.vessel_types.as_deref()) {
            Some(path) => vessel_types_from_frame(&read_csv_as_strings(&path)?),
            None => Ok(HashMap::new()),
        }
    }
}

/// Read a CSV with every column as String and trimmed header names.
pub fn read_csv_as_strings(path: &Path) -> Result<DataFrame, VoyageError> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    Ok(df)
}

pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), VoyageError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(VoyageError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Cast to Float64; string columns are whitespace-stripped first and
/// unparseable values become null.
fn float_expr(df: &DataFrame, name: &str) -> Result<Expr, VoyageError> {
    let expr = if df.column(name)?.dtype() == &DataType::String {
        col(name)
            .str()
            .strip_chars(lit(" \t\r\n"))
            .cast(DataType::Float64)
    } else {
        col(name).cast(DataType::Float64)
    };
    Ok(expr)
}

/// Parse with each format in turn, full timestamps first, then date-only
/// formats at midnight.
pub fn parse_timestamp(value: &str, formats: &[String]) -> Option<NaiveDateTime> {
    let value = value.trim();
    formats
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            formats
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Typed phase events from a frame holding the event columns.
///
/// Numeric columns may be strings or numbers. `phase_end_date` may be a
/// string or a datetime column; every value must parse.
pub fn events_from_frame(
    df: &DataFrame,
    timestamp_formats: &[String],
) -> Result<Vec<PhaseEvent>, VoyageError> {
    require_columns(df, &event::REQUIRED)?;

    let mut casts = vec![float_expr(df, event::CARGO_MT)?];
    for name in event::ROB.iter().chain(event::BDN.iter()) {
        casts.push(float_expr(df, name)?);
    }
    if df.column(event::PHASE_END_DATE)?.dtype() != &DataType::String {
        casts.push(col(event::PHASE_END_DATE).cast(DataType::String));
    }
    let frame = df.clone().lazy().with_columns(casts).collect()?;

    let vessel_name = frame.column(event::VESSEL_NAME)?.str()?;
    let phase = frame.column(event::PHASE)?.str()?;
    let phase_end_date = frame.column(event::PHASE_END_DATE)?.str()?;
    let start_port = frame.column(event::START_PORT)?.str()?;
    let end_port = frame.column(event::END_PORT)?.str()?;
    let cargo = frame.column(event::CARGO_MT)?.f64()?;
    let mut rob = Vec::with_capacity(FuelType::ALL.len());
    let mut bdn = Vec::with_capacity(FuelType::ALL.len());
    for fuel in FuelType::ALL {
        rob.push(frame.column(event::ROB[fuel.index()])?.f64()?);
        bdn.push(frame.column(event::BDN[fuel.index()])?.f64()?);
    }

    let mut events = Vec::with_capacity(frame.height());
    for row in 0..frame.height() {
        let Some(name) = non_blank(vessel_name.get(row)) else {
            return Err(VoyageError::InvalidData(format!(
                "row {row}: missing {}",
                event::VESSEL_NAME
            )));
        };
        let raw_date = phase_end_date.get(row).unwrap_or("");
        let when = parse_timestamp(raw_date, timestamp_formats).ok_or_else(|| {
            VoyageError::InvalidTimestamp {
                row,
                value: raw_date.to_string(),
            }
        })?;

        let mut e = PhaseEvent::new(name, Phase::parse(phase.get(row).unwrap_or("")), when);
        e.start_port = non_blank(start_port.get(row));
        e.end_port = non_blank(end_port.get(row));
        e.cargo_mt = cargo.get(row);
        for fuel in FuelType::ALL {
            e.rob[fuel] = rob[fuel.index()].get(row);
            e.bdn[fuel] = bdn[fuel.index()].get(row);
        }
        events.push(e);
    }
    Ok(events)
}

pub fn ports_from_frame(df: &DataFrame) -> Result<PortReference, VoyageError> {
    require_columns(df, &[port::PORT_CODE, port::EU_PORTS, port::OMR])?;
    let codes = df.column(port::PORT_CODE)?.str()?;
    let eu = df.column(port::EU_PORTS)?.str()?;
    let omr = df.column(port::OMR)?.str()?;
    let countries = match df.column(port::COUNTRY) {
        Ok(c) => Some(c.str()?),
        Err(_) => None,
    };

    let mut refs = PortReference::new();
    for row in 0..df.height() {
        let Some(code) = non_blank(codes.get(row)) else {
            continue;
        };
        refs.insert_port(
            code,
            PortInfo {
                eu: eu.get(row).and_then(parse_eu_label),
                omr: omr.get(row).is_some_and(parse_yes),
                country: countries.and_then(|c| non_blank(c.get(row))),
            },
        );
    }
    Ok(refs)
}

/// Country names and, when the optional code column is present, two-letter
/// country codes with their EU status.
pub fn add_countries_from_frame(refs: &mut PortReference, df: &DataFrame) -> Result<(), VoyageError> {
    require_columns(df, &[country::COUNTRY, country::EU_STATUS])?;
    let names = df.column(country::COUNTRY)?.str()?;
    let status = df.column(country::EU_STATUS)?.str()?;
    let codes = match df.column(country::COUNTRY_CODE) {
        Ok(c) => Some(c.str()?),
        Err(_) => None,
    };
    for row in 0..df.height() {
        let Some(eu) = status.get(row).and_then(parse_eu_label) else {
            continue;
        };
        if let Some(name) = non_blank(names.get(row)) {
            refs.insert_country(name, eu);
        }
        if let Some(code) = codes.and_then(|c| non_blank(c.get(row))) {
            refs.insert_country_code(code, eu);
        }
    }
    Ok(())
}

pub fn vessel_types_from_frame(df: &DataFrame) -> Result<HashMap<String, String>, VoyageError> {
    require_columns(df, &[vessel::VESSEL_NAME, vessel::VESSEL_TYPE])?;
    let names = df.column(vessel::VESSEL_NAME)?.str()?;
    let types = df.column(vessel::VESSEL_TYPE)?.str()?;
    let mut out = HashMap::new();
    for row in 0..df.height() {
        if let (Some(name), Some(kind)) = (non_blank(names.get(row)), non_blank(types.get(row))) {
            out.insert(name, kind);
        }
    }
    Ok(out)
}
