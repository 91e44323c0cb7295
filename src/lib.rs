//! EU ETS allowance and FuelEU Maritime penalty computation from vessel
//! port-call telemetry.

pub mod config;
pub mod consumption;
pub mod error;
pub mod eua;
pub mod event;
pub mod fuel;
pub mod fueleu;
pub mod jurisdiction;
pub mod legs;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod table;

#[cfg(feature = "python")]
mod python;

pub use config::EngineConfig;
pub use error::VoyageError;
pub use event::{EventLog, Phase, PhaseEvent};
pub use fuel::{FuelType, PerFuel};
pub use jurisdiction::{Category, Jurisdiction, PortReference};
pub use legs::Leg;
pub use pipeline::{compute_voyage, Diagnostic, EuaSummary, VoyageContext, VoyageReport};
pub use source::{CsvSource, DataSource};
pub use table::{FileSink, OutputFormat, ResultSink};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Events
    let event = PyModule::new(m.py(), "event")?;
    event.add("VESSEL_NAME", schema::event::VESSEL_NAME)?;
    event.add("PHASE", schema::event::PHASE)?;
    event.add("PHASE_END_DATE", schema::event::PHASE_END_DATE)?;
    event.add("START_PORT", schema::event::START_PORT)?;
    event.add("END_PORT", schema::event::END_PORT)?;
    event.add("CARGO_MT", schema::event::CARGO_MT)?;
    event.add("ROB", schema::event::ROB.to_vec())?;
    event.add("BDN", schema::event::BDN.to_vec())?;
    m.add_submodule(&event)?;

    // Phase
    let phase = PyModule::new(m.py(), "phase")?;
    phase.add("ALL_FAST", schema::phase::ALL_FAST)?;
    phase.add("LAST_LINE", schema::phase::LAST_LINE)?;
    phase.add("EOSP", schema::phase::EOSP)?;
    m.add_submodule(&phase)?;

    // Reference tables
    let port = PyModule::new(m.py(), "port")?;
    port.add("PORT_CODE", schema::port::PORT_CODE)?;
    port.add("EU_PORTS", schema::port::EU_PORTS)?;
    port.add("OMR", schema::port::OMR)?;
    port.add("COUNTRY", schema::port::COUNTRY)?;
    m.add_submodule(&port)?;

    let country = PyModule::new(m.py(), "country")?;
    country.add("COUNTRY", schema::country::COUNTRY)?;
    country.add("EU_STATUS", schema::country::EU_STATUS)?;
    country.add("COUNTRY_CODE", schema::country::COUNTRY_CODE)?;
    m.add_submodule(&country)?;

    let vessel = PyModule::new(m.py(), "vessel")?;
    vessel.add("VESSEL_NAME", schema::vessel::VESSEL_NAME)?;
    vessel.add("VESSEL_TYPE", schema::vessel::VESSEL_TYPE)?;
    m.add_submodule(&vessel)?;

    // Leg table
    let leg = PyModule::new(m.py(), "leg")?;
    leg.add("PHASE_END_DATE", schema::leg::PHASE_END_DATE)?;
    leg.add("PHASE", schema::leg::PHASE)?;
    leg.add("PORT", schema::leg::PORT)?;
    leg.add("START_PORT", schema::leg::START_PORT)?;
    leg.add("END_PORT", schema::leg::END_PORT)?;
    leg.add("CARGO_MT", schema::leg::CARGO_MT)?;
    leg.add("CAL_CON", schema::leg::CAL_CON.to_vec())?;
    leg.add("COUNTRY_CODE", schema::leg::COUNTRY_CODE)?;
    leg.add("OMR", schema::leg::OMR)?;
    leg.add("CARBON_EMITTED", schema::leg::CARBON_EMITTED)?;
    leg.add("CATEGORY", schema::leg::CATEGORY)?;
    leg.add("EUAS", schema::leg::EUAS)?;
    leg.add("CAL_FUELEU_CON", schema::leg::CAL_FUELEU_CON.to_vec())?;
    m.add_submodule(&leg)?;

    let pooled = PyModule::new(m.py(), "pooled")?;
    pooled.add("ENERGY", schema::pooled::ENERGY)?;
    pooled.add("WTW_CO2EQ", schema::pooled::WTW_CO2EQ)?;
    pooled.add("GHG_INTENSITY", schema::pooled::GHG_INTENSITY)?;
    pooled.add("COMPLIANCE_BALANCE", schema::pooled::COMPLIANCE_BALANCE)?;
    pooled.add("PENALTY", schema::pooled::PENALTY)?;
    m.add_submodule(&pooled)?;

    let reallocated = PyModule::new(m.py(), "reallocated")?;
    reallocated.add("APPLICABLE_ENERGY", schema::reallocated::APPLICABLE_ENERGY)?;
    reallocated.add("GHG_INTENSITY", schema::reallocated::GHG_INTENSITY)?;
    reallocated.add(
        "CUMULATIVE_COMPLIANCE_BALANCE",
        schema::reallocated::CUMULATIVE_COMPLIANCE_BALANCE,
    )?;
    reallocated.add("CUMULATIVE_PENALTY", schema::reallocated::CUMULATIVE_PENALTY)?;
    m.add_submodule(&reallocated)?;

    // Summaries
    let eua_summary = PyModule::new(m.py(), "eua_summary")?;
    eua_summary.add("FROM", schema::eua_summary::FROM)?;
    eua_summary.add("TO", schema::eua_summary::TO)?;
    eua_summary.add("CO2_EMITTED", schema::eua_summary::CO2_EMITTED)?;
    eua_summary.add("EUAS", schema::eua_summary::EUAS)?;
    m.add_submodule(&eua_summary)?;

    let fueleu_summary = PyModule::new(m.py(), "fueleu_summary")?;
    fueleu_summary.add("BALANCE_WITHOUT", schema::fueleu_summary::BALANCE_WITHOUT)?;
    fueleu_summary.add("PENALTY_WITHOUT", schema::fueleu_summary::PENALTY_WITHOUT)?;
    fueleu_summary.add("BALANCE_WITH", schema::fueleu_summary::BALANCE_WITH)?;
    fueleu_summary.add("PENALTY_WITH", schema::fueleu_summary::PENALTY_WITH)?;
    fueleu_summary.add("GHG_INTS_ACT", schema::fueleu_summary::GHG_INTS_ACT)?;
    fueleu_summary.add("CB_DEF", schema::fueleu_summary::CB_DEF)?;
    m.add_submodule(&fueleu_summary)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    m.add_class::<python::VoyageModel>()?;
    m.add_class::<python::VoyageResult>()?;
    add_schema_exports(m)?;
    Ok(())
}
