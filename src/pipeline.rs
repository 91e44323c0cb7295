//! End-to-end voyage computation over a reusable in-memory context.

use std::collections::HashMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::consumption::reconcile;
use crate::error::VoyageError;
use crate::eua::apply_euas;
use crate::event::{EventLog, PhaseEvent};
use crate::fuel::{round3, FuelType};
use crate::fueleu::{apply_pooled, apply_reallocated, FuelEuSummary};
use crate::jurisdiction::{classify, PortReference};
use crate::legs::{collapse_cargo_neutral, extract_legs, Leg};
use crate::source::DataSource;

/// Recoverable data-quality findings, reported next to the results.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Port absent from the reference; treated as Non-EU.
    UnmappedPort { port: String },
    /// Vessel absent from the type registry; container rules not applied.
    MissingVesselType { vessel: String },
    NegativeConsumption { leg: usize, fuel: FuelType, consumption: f64 },
    ExtremeNegativeConsumption { leg: usize, fuel: FuelType, consumption: f64 },
    BunkerReattributed { leg: usize, fuel: FuelType, borrowed: f64 },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnmappedPort { port } => write!(f, "port '{port}' not in reference, treated as Non-EU"),
            Self::MissingVesselType { vessel } => write!(f, "no vessel type for '{vessel}'"),
            Self::NegativeConsumption { leg, fuel, consumption } => {
                write!(f, "negative {fuel} consumption {consumption} at leg {leg}")
            }
            Self::ExtremeNegativeConsumption { leg, fuel, consumption } => {
                write!(f, "extremely negative {fuel} consumption {consumption} at leg {leg}")
            }
            Self::BunkerReattributed { leg, fuel, borrowed } => {
                write!(f, "{fuel} bunker delivery {borrowed} re-attributed to leg {leg}")
            }
        }
    }
}

/// Period totals for EU ETS, 3 dp.
#[derive(Debug, Clone, PartialEq)]
pub struct EuaSummary {
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,
    pub total_co2: f64,
    pub total_euas: f64,
}

impl EuaSummary {
    /// `None` for an empty leg set.
    pub fn from_legs(legs: &[Leg]) -> Option<Self> {
        let period_start = legs.iter().map(|l| l.phase_end_date).min()?;
        let period_end = legs.iter().map(|l| l.phase_end_date).max()?;
        Some(Self {
            period_start,
            period_end,
            total_co2: round3(legs.iter().map(|l| l.carbon_emitted).sum()),
            total_euas: round3(legs.iter().map(|l| l.euas).sum()),
        })
    }
}

/// Everything computed for one (vessel, date range) query.
#[derive(Debug, Clone, PartialEq)]
pub struct VoyageReport {
    pub vessel: String,
    pub vessel_type: Option<String>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Extracted and reconciled legs before cargo-neutral collapse.
    pub reconciled_legs: Vec<Leg>,
    /// Final legs with jurisdiction, EUAs and FuelEU figures.
    pub legs: Vec<Leg>,
    pub eua: EuaSummary,
    pub fueleu: FuelEuSummary,
    pub diagnostics: Vec<Diagnostic>,
}

/// Loaded reference data and telemetry, shared read-only across queries.
///
/// Data is normalized once on load. `reload` re-reads everything from a
/// source; `invalidate` drops it so stale data can never be computed on.
#[derive(Debug, Clone, Default)]
pub struct VoyageContext {
    config: EngineConfig,
    events: Option<EventLog>,
    ports: Option<PortReference>,
    vessel_types: HashMap<String, String>,
    generation: u64,
}

impl VoyageContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn from_source(source: &dyn DataSource, config: EngineConfig) -> Result<Self, VoyageError> {
        let mut ctx = Self::new(config);
        ctx.reload(source)?;
        Ok(ctx)
    }

    /// Replace all loaded data with a fresh read from `source`.
    pub fn reload(&mut self, source: &dyn DataSource) -> Result<(), VoyageError> {
        let events = source.load_events()?;
        let ports = source.load_ports()?;
        let vessel_types = source.load_vessel_types()?;

        self.set_events(events);
        self.set_ports(ports);
        self.set_vessel_types(vessel_types);
        info!(generation = self.generation, "Reloaded voyage context");
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.events = None;
        self.ports = None;
        self.vessel_types.clear();
        self.generation += 1;
    }

    pub fn set_events(&mut self, events: Vec<PhaseEvent>) {
        let log = EventLog::normalize(events);
        info!(events = log.len(), "Loaded phase events");
        self.events = Some(log);
        self.generation += 1;
    }

    pub fn set_ports(&mut self, ports: PortReference) {
        info!(ports = ports.len(), "Loaded port reference");
        self.ports = Some(ports);
        self.generation += 1;
    }

    pub fn set_vessel_types(&mut self, vessel_types: HashMap<String, String>) {
        self.vessel_types = vessel_types;
        self.generation += 1;
    }

    /// Bumped on every data change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn event_log(&self) -> Result<&EventLog, VoyageError> {
        self.events
            .as_ref()
            .ok_or_else(|| VoyageError::NotLoaded("events".into()))
    }

    pub fn ports(&self) -> Result<&PortReference, VoyageError> {
        self.ports
            .as_ref()
            .ok_or_else(|| VoyageError::NotLoaded("ports".into()))
    }

    pub fn vessel_type(&self, vessel: &str) -> Option<&str> {
        self.vessel_types.get(vessel).map(String::as_str)
    }

    /// Vessel names with events, sorted.
    pub fn vessels(&self) -> Result<Vec<String>, VoyageError> {
        Ok(self.event_log()?.vessels().map(str::to_string).collect())
    }

    pub fn compute(
        &self,
        vessel: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Option<VoyageReport>, VoyageError> {
        compute_voyage(self, vessel, from, to)
    }
}

/// Run the whole pipeline for one vessel and date range.
///
/// Returns `Ok(None)` when the window holds no legs.
pub fn compute_voyage(
    ctx: &VoyageContext,
    vessel: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Option<VoyageReport>, VoyageError> {
    if from > to {
        return Err(VoyageError::InvalidData(format!(
            "date range ends before it starts: {from} > {to}"
        )));
    }
    let events = ctx.event_log()?.events(vessel);
    let ports = ctx.ports()?;
    let config = ctx.config();
    let reconcile_options = config.reconciliation.options();

    let legs = extract_legs(events, from, to);
    if legs.is_empty() {
        info!(vessel, %from, %to, "No legs in window");
        return Ok(None);
    }

    // Diagnostics of the pre-collapse pass are superseded by the final pass.
    let reconciled = reconcile(&legs, events, &reconcile_options, &mut Vec::new());

    let mut diagnostics = Vec::new();
    let vessel_type = ctx.vessel_type(vessel).map(str::to_string);
    if vessel_type.is_none() {
        warn!(vessel, "Vessel type not found, container rules not applied");
        diagnostics.push(Diagnostic::MissingVesselType {
            vessel: vessel.to_string(),
        });
    }

    let collapsed = collapse_cargo_neutral(
        &reconciled,
        vessel_type.as_deref(),
        &config.collapse.rules(),
    );
    if collapsed.is_empty() {
        info!(vessel, %from, %to, "No legs left after collapsing port calls");
        return Ok(None);
    }

    let legs = reconcile(&collapsed, events, &reconcile_options, &mut diagnostics);
    let legs = classify(&legs, ports, config.jurisdiction.include_omr, &mut diagnostics);
    let legs = apply_euas(&legs);
    let legs = apply_pooled(&legs);
    let legs = apply_reallocated(&legs);

    let Some(eua) = EuaSummary::from_legs(&legs) else {
        return Ok(None);
    };
    let fueleu = FuelEuSummary::from_legs(&legs);
    info!(
        vessel,
        legs = legs.len(),
        total_co2 = eua.total_co2,
        total_euas = eua.total_euas,
        penalty = fueleu.penalty_with_reallocation,
        "Computed voyage"
    );

    Ok(Some(VoyageReport {
        vessel: vessel.to_string(),
        vessel_type,
        from,
        to,
        reconciled_legs: reconciled,
        legs,
        eua,
        fueleu,
        diagnostics,
    }))
}
