//! DataFrame rendering of reports and the file sink.

use std::fs::{self, File};
use std::path::PathBuf;

use polars::prelude::*;
use tracing::info;

use crate::error::VoyageError;
use crate::fuel::{round3, FuelType};
use crate::fueleu::FuelEuSummary;
use crate::legs::Leg;
use crate::pipeline::{EuaSummary, VoyageReport};
use crate::schema::{
    event, eua_summary, fueleu_summary, leg, pooled, reallocated, DATE_FORMAT,
};

fn floats(name: &str, legs: &[Leg], f: impl Fn(&Leg) -> f64) -> Column {
    let values: Vec<f64> = legs.iter().map(f).collect();
    Column::new(name.into(), &values)
}

fn opt_floats(name: &str, legs: &[Leg], f: impl Fn(&Leg) -> Option<f64>) -> Column {
    let values: Vec<Option<f64>> = legs.iter().map(f).collect();
    Column::new(name.into(), &values)
}

fn strings(name: &str, legs: &[Leg], f: impl Fn(&Leg) -> Option<String>) -> Column {
    let values: Vec<Option<String>> = legs.iter().map(f).collect();
    Column::new(name.into(), &values)
}

fn milestone_columns(legs: &[Leg]) -> Vec<Column> {
    vec![
        strings(leg::PHASE_END_DATE, legs, |l| {
            Some(l.phase_end_date.format(DATE_FORMAT).to_string())
        }),
        strings(leg::PHASE, legs, |l| Some(l.phase.to_string())),
        strings(leg::PORT, legs, |l| l.port.clone()),
    ]
}

/// Extracted, reconciled legs before cargo collapse.
pub fn reconciled_legs_frame(legs: &[Leg]) -> Result<DataFrame, VoyageError> {
    let mut columns = milestone_columns(legs);
    columns.push(opt_floats(leg::CARGO_MT, legs, |l| l.cargo_mt));
    for fuel in FuelType::ALL {
        columns.push(opt_floats(event::ROB[fuel.index()], legs, |l| l.rob[fuel]));
    }
    for fuel in FuelType::ALL {
        columns.push(opt_floats(event::BDN[fuel.index()], legs, |l| l.bdn[fuel]));
    }
    for fuel in FuelType::ALL {
        columns.push(opt_floats(leg::CAL_CON[fuel.index()], legs, |l| l.consumption[fuel]));
    }
    Ok(DataFrame::new(columns)?)
}

/// Final compliance table: jurisdiction, EUAs and both FuelEU views per leg.
/// Soundings and deliveries are the reconciled values.
pub fn legs_frame(legs: &[Leg]) -> Result<DataFrame, VoyageError> {
    let mut columns = milestone_columns(legs);
    columns.push(strings(leg::START_PORT, legs, |l| l.start_port.clone()));
    columns.push(strings(leg::END_PORT, legs, |l| l.end_port.clone()));
    columns.push(strings(leg::COUNTRY_CODE, legs, |l| {
        Some(l.jurisdiction.country_code().to_string())
    }));
    columns.push(strings(leg::OMR, legs, |l| Some(l.jurisdiction.omr_label().to_string())));
    columns.push(opt_floats(leg::CARGO_MT, legs, |l| l.cargo_mt));
    for fuel in FuelType::ALL {
        columns.push(opt_floats(event::ROB[fuel.index()], legs, |l| l.rob[fuel]));
    }
    for fuel in FuelType::ALL {
        columns.push(opt_floats(event::BDN[fuel.index()], legs, |l| l.bdn[fuel]));
    }
    for fuel in FuelType::ALL {
        columns.push(opt_floats(leg::CAL_CON[fuel.index()], legs, |l| l.consumption[fuel]));
    }
    columns.push(floats(leg::CARBON_EMITTED, legs, |l| l.carbon_emitted));
    columns.push(strings(leg::CATEGORY, legs, |l| Some(l.category.to_string())));
    columns.push(floats(leg::EUAS, legs, |l| l.euas));

    for fuel in FuelType::ALL {
        columns.push(floats(leg::CAL_FUELEU_CON[fuel.index()], legs, |l| {
            l.pooled.applicable_consumption[fuel]
        }));
    }
    columns.extend([
        floats(pooled::ENERGY, legs, |l| l.pooled.energy),
        floats(pooled::WTW_CO2EQ, legs, |l| l.pooled.wtw_co2eq),
        floats(pooled::CUMULATIVE_ENERGY, legs, |l| l.pooled.cumulative_energy),
        floats(pooled::CUMULATIVE_WTW_CO2EQ, legs, |l| l.pooled.cumulative_wtw_co2eq),
        floats(pooled::GHG_INTENSITY, legs, |l| l.pooled.ghg_intensity),
        floats(pooled::COMPLIANCE_BALANCE, legs, |l| l.pooled.compliance_balance),
        floats(pooled::PENALTY, legs, |l| l.pooled.penalty),
        floats(reallocated::TOTAL_ENERGY, legs, |l| l.reallocated.total_energy),
        floats(reallocated::APPLICABLE_ENERGY, legs, |l| l.reallocated.applicable_energy),
    ]);
    for fuel in FuelType::ALL {
        columns.push(floats(reallocated::EFFICIENT_ENERGY[fuel.index()], legs, |l| {
            l.reallocated.efficient_energy[fuel]
        }));
    }
    columns.extend([
        floats(reallocated::GHG_INTENSITY, legs, |l| l.reallocated.ghg_intensity),
        floats(reallocated::COMPLIANCE_BALANCE, legs, |l| l.reallocated.compliance_balance),
        floats(reallocated::PENALTY, legs, |l| l.reallocated.penalty),
        floats(reallocated::CUMULATIVE_COMPLIANCE_BALANCE, legs, |l| {
            l.reallocated.cumulative_balance
        }),
        floats(reallocated::CUMULATIVE_PENALTY, legs, |l| l.reallocated.cumulative_penalty),
    ]);
    Ok(DataFrame::new(columns)?)
}

pub fn eua_summary_frame(summary: &EuaSummary) -> Result<DataFrame, VoyageError> {
    let from = [summary.period_start.format(DATE_FORMAT).to_string()];
    let to = [summary.period_end.format(DATE_FORMAT).to_string()];
    Ok(DataFrame::new(vec![
        Column::new(eua_summary::FROM.into(), &from),
        Column::new(eua_summary::TO.into(), &to),
        Column::new(eua_summary::CO2_EMITTED.into(), &[round3(summary.total_co2)]),
        Column::new(eua_summary::EUAS.into(), &[round3(summary.total_euas)]),
    ])?)
}

pub fn fueleu_summary_frame(summary: &FuelEuSummary) -> Result<DataFrame, VoyageError> {
    let b = &summary.breakdown;
    let values = [
        (fueleu_summary::BALANCE_WITHOUT, summary.balance_without_reallocation),
        (fueleu_summary::PENALTY_WITHOUT, summary.penalty_without_reallocation),
        (fueleu_summary::BALANCE_WITH, summary.balance_with_reallocation),
        (fueleu_summary::PENALTY_WITH, summary.penalty_with_reallocation),
        (fueleu_summary::WTT, b.wtt),
        (fueleu_summary::TTW, b.ttw),
        (fueleu_summary::GHG_INTS_ACT, b.ghg_intensity_actual),
        (fueleu_summary::GHG_INTS_TAR, b.ghg_intensity_target),
        (fueleu_summary::CB_DEF, b.cb_def),
        (fueleu_summary::BREAKDOWN_PENALTY, b.penalty),
    ];
    let columns = values
        .iter()
        .map(|(name, v)| Column::new((*name).into(), &[round3(*v)]))
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Destination for computed reports.
pub trait ResultSink {
    fn write_report(&self, report: &VoyageReport) -> Result<(), VoyageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

/// Writes each report table to `<dir>/<vessel>_<table>.<ext>`.
#[derive(Debug, Clone)]
pub struct FileSink {
    pub dir: PathBuf,
    pub format: OutputFormat,
}

pub const TABLES: [&str; 4] = ["legs_reconciled", "legs", "eua_summary", "fueleu_summary"];

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn path_for(&self, vessel: &str, table: &str) -> PathBuf {
        let stem: String = vessel
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir
            .join(format!("{stem}_{table}.{}", self.format.extension()))
    }

    fn write_frame(&self, mut df: DataFrame, path: PathBuf) -> Result<(), VoyageError> {
        let mut file = File::create(&path)?;
        match self.format {
            OutputFormat::Csv => {
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .finish(&mut df)?;
            }
            OutputFormat::Parquet => {
                ParquetWriter::new(&mut file).finish(&mut df)?;
            }
        }
        info!(path = %path.display(), rows = df.height(), "Wrote table");
        Ok(())
    }
}

impl ResultSink for FileSink {
    fn write_report(&self, report: &VoyageReport) -> Result<(), VoyageError> {
        fs::create_dir_all(&self.dir)?;
        let frames = [
            reconciled_legs_frame(&report.reconciled_legs)?,
            legs_frame(&report.legs)?,
            eua_summary_frame(&report.eua)?,
            fueleu_summary_frame(&report.fueleu)?,
        ];
        for (table, df) in TABLES.iter().zip(frames) {
            self.write_frame(df, self.path_for(&report.vessel, table))?;
        }
        Ok(())
    }
}
