//! Voyage legs: milestone extraction and removal of cargo-neutral port calls.

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::event::{Phase, PhaseEvent};
use crate::fueleu::{PooledEnergy, ReallocatedEnergy};
use crate::fuel::PerFuel;
use crate::jurisdiction::{Category, Jurisdiction};

/// One arrival (ALL FAST) or departure (LAST LINE) milestone selected for analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub phase_end_date: NaiveDateTime,
    pub phase: Phase,
    /// Facility code the milestone is attributed to (the event's start port).
    pub port: Option<String>,
    pub start_port: Option<String>,
    pub end_port: Option<String>,
    pub cargo_mt: Option<f64>,
    pub rob: PerFuel<Option<f64>>,
    /// Bunker quantity as recorded on the milestone event itself.
    pub raw_bdn: PerFuel<Option<f64>>,
    /// Bunker quantity attributed to this leg by reconciliation.
    pub bdn: PerFuel<Option<f64>>,
    /// Consumption since the previous leg; `None` on the first leg.
    pub consumption: PerFuel<Option<f64>>,
    pub jurisdiction: Jurisdiction,
    pub category: Category,
    pub carbon_emitted: f64,
    pub euas: f64,
    pub pooled: PooledEnergy,
    pub reallocated: ReallocatedEnergy,
}

impl Leg {
    pub fn from_event(event: &PhaseEvent) -> Self {
        Self {
            phase_end_date: event.phase_end_date,
            phase: event.phase.clone(),
            port: event.start_port.clone(),
            start_port: event.start_port.clone(),
            end_port: event.end_port.clone(),
            cargo_mt: event.cargo_mt,
            rob: event.rob,
            raw_bdn: event.bdn,
            bdn: event.bdn,
            consumption: PerFuel::splat(None),
            jurisdiction: Jurisdiction::default(),
            category: Category::Start,
            carbon_emitted: 0.0,
            euas: 0.0,
            pooled: PooledEnergy::default(),
            reallocated: ReallocatedEnergy::default(),
        }
    }

    /// Consumption with missing values counted as zero.
    pub fn consumption_or_zero(&self) -> PerFuel<f64> {
        self.consumption.map(|_, c| c.unwrap_or(0.0))
    }
}

/// Exact-duplicate key: timestamp, phase, both ports and all ROB/BDN readings.
#[derive(PartialEq, Eq, Hash)]
struct DedupKey {
    phase_end_date: NaiveDateTime,
    phase: Phase,
    start_port: Option<String>,
    end_port: Option<String>,
    readings: [Option<u64>; 8],
}

impl DedupKey {
    fn of(event: &PhaseEvent) -> Self {
        let mut readings = [None; 8];
        for (i, v) in event.rob.0.iter().chain(event.bdn.0.iter()).enumerate() {
            readings[i] = v.map(canonical_bits);
        }
        Self {
            phase_end_date: event.phase_end_date,
            phase: event.phase.clone(),
            start_port: event.start_port.clone(),
            end_port: event.end_port.clone(),
            readings,
        }
    }
}

fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else if v.is_nan() {
        f64::NAN.to_bits()
    } else {
        v.to_bits()
    }
}

/// Select the ALL FAST / LAST LINE milestones of one vessel whose date falls
/// within `[from, to]` (both inclusive, compared by calendar date).
///
/// `events` are the vessel's normalized events. The result is ascending by
/// timestamp with exact duplicates removed (first occurrence kept). An empty
/// result means the window holds no data.
pub fn extract_legs(events: &[PhaseEvent], from: NaiveDate, to: NaiveDate) -> Vec<Leg> {
    let mut selected: Vec<&PhaseEvent> = events
        .iter()
        .filter(|e| e.phase.is_milestone())
        .filter(|e| {
            let day = e.phase_end_date.date();
            day >= from && day <= to
        })
        .collect();
    selected.sort_by_key(|e| e.phase_end_date);

    let mut seen = HashSet::new();
    let legs: Vec<Leg> = selected
        .into_iter()
        .filter(|e| seen.insert(DedupKey::of(e)))
        .map(Leg::from_event)
        .collect();

    debug!(legs = legs.len(), %from, %to, "Extracted legs");
    legs
}

/// Rules for dropping port calls that carry no jurisdictional meaning.
#[derive(Debug, Clone)]
pub struct CollapseRules {
    /// Case-insensitive marker in the vessel type that enables the port exclusion.
    pub container_keyword: String,
    /// Ports never treated as legs for container vessels.
    pub container_excluded_ports: Vec<String>,
}

impl Default for CollapseRules {
    fn default() -> Self {
        Self {
            container_keyword: "container".to_string(),
            container_excluded_ports: vec!["MAPTM".to_string(), "EGPSE".to_string()],
        }
    }
}

impl CollapseRules {
    fn applies_to(&self, vessel_type: Option<&str>) -> bool {
        let keyword = self.container_keyword.to_lowercase();
        !keyword.is_empty()
            && vessel_type.is_some_and(|t| t.to_lowercase().contains(&keyword))
    }
}

/// Remove adjacent (ALL FAST, LAST LINE) pairs with identical cargo, and for
/// container vessels every leg at an excluded port.
///
/// Consumption on the returned legs is stale: the caller must reconcile the
/// collapsed sequence again.
pub fn collapse_cargo_neutral(
    legs: &[Leg],
    vessel_type: Option<&str>,
    rules: &CollapseRules,
) -> Vec<Leg> {
    let mut remove = vec![false; legs.len()];

    let mut i = 0;
    while i + 1 < legs.len() {
        let (arrival, departure) = (&legs[i], &legs[i + 1]);
        if arrival.phase == Phase::AllFast && departure.phase == Phase::LastLine {
            if same_cargo(arrival.cargo_mt, departure.cargo_mt) {
                remove[i] = true;
                remove[i + 1] = true;
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    let pairs = remove.iter().filter(|r| **r).count() / 2;

    let mut excluded = 0;
    if rules.applies_to(vessel_type) {
        for (leg, flag) in legs.iter().zip(remove.iter_mut()) {
            let hit = leg.port.as_deref().is_some_and(|p| {
                rules
                    .container_excluded_ports
                    .iter()
                    .any(|x| x.eq_ignore_ascii_case(p))
            });
            if hit && !*flag {
                *flag = true;
                excluded += 1;
            }
        }
    }

    let kept: Vec<Leg> = legs
        .iter()
        .zip(remove.iter())
        .filter(|(_, r)| !**r)
        .map(|(leg, _)| leg.clone())
        .collect();

    info!(
        before = legs.len(),
        after = kept.len(),
        cargo_neutral_pairs = pairs,
        excluded_ports = excluded,
        "Collapsed cargo-neutral port calls"
    );
    kept
}

/// Cargo equality with missing values never matching.
fn same_cargo(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}
