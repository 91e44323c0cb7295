//! Per-leg fuel consumption from tank soundings and bunkering.
//!
//! Consumption over a leg is a mass balance:
//!
//! ```text
//! con[i] = rob[i-1] + bdn[i] - rob[i]
//! ```
//!
//! How `bdn[i]` is attributed is the reconciliation strategy. A negative
//! result usually means a bunker delivery was recorded on a neighbouring row;
//! the optional repair pass re-attributes it.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::event::PhaseEvent;
use crate::fuel::{FuelType, PerFuel};
use crate::legs::Leg;
use crate::pipeline::Diagnostic;

/// How bunker quantities are attributed to a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Sum the bunkering of every raw event in `(prev leg, this leg]`.
    #[default]
    WindowSum,
    /// Use only the bunker quantity recorded on the leg's own event.
    Shift,
}

/// Where the repair pass looks for a bunker delivery to borrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairPolicy {
    #[default]
    Disabled,
    /// First raw event strictly after the leg with a positive delivery.
    Forward,
    /// Latest raw event strictly before the leg with a positive delivery.
    Backward,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    pub strategy: ReconcileStrategy,
    pub repair: RepairPolicy,
    /// Consumption below this is reported even when no repair applies.
    pub extreme_negative_threshold: f64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            strategy: ReconcileStrategy::WindowSum,
            repair: RepairPolicy::Disabled,
            extreme_negative_threshold: -1000.0,
        }
    }
}

/// Recompute bunkering and consumption for every leg from scratch.
///
/// `raw` holds all normalized events of the vessel, sorted by timestamp. The
/// first leg has no predecessor: its consumption stays `None` and its bunker
/// figure stays as recorded.
pub fn reconcile(
    legs: &[Leg],
    raw: &[PhaseEvent],
    options: &ReconcileOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Leg> {
    let mut out: Vec<Leg> = legs.to_vec();
    if let Some(first) = out.first_mut() {
        first.bdn = first.raw_bdn;
        first.consumption = PerFuel::splat(None);
    }

    for i in 1..out.len() {
        let prev_rob = out[i - 1].rob;
        let prev_at = out[i - 1].phase_end_date;
        let leg = &mut out[i];

        for fuel in FuelType::ALL {
            let bdn = match options.strategy {
                ReconcileStrategy::WindowSum => {
                    Some(window_bunkering(raw, fuel, prev_at, leg.phase_end_date))
                }
                ReconcileStrategy::Shift => leg.raw_bdn[fuel],
            };
            leg.bdn[fuel] = bdn;
            leg.consumption[fuel] = mass_balance(prev_rob[fuel], bdn, leg.rob[fuel]);

            repair_leg(i, leg, prev_rob[fuel], fuel, raw, options, diagnostics);
        }
    }

    out
}

fn mass_balance(prev_rob: Option<f64>, bdn: Option<f64>, rob: Option<f64>) -> Option<f64> {
    Some(prev_rob? + bdn? - rob?)
}

/// Bunkering recorded on raw events with `after < phase_end_date <= until`.
/// Missing values are skipped; an empty window sums to zero.
pub fn window_bunkering(
    raw: &[PhaseEvent],
    fuel: FuelType,
    after: chrono::NaiveDateTime,
    until: chrono::NaiveDateTime,
) -> f64 {
    raw.iter()
        .filter(|e| e.phase_end_date > after && e.phase_end_date <= until)
        .filter_map(|e| e.bdn[fuel])
        .filter(|v| !v.is_nan())
        .sum()
}

fn repair_leg(
    index: usize,
    leg: &mut Leg,
    prev_rob: Option<f64>,
    fuel: FuelType,
    raw: &[PhaseEvent],
    options: &ReconcileOptions,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(consumption) = leg.consumption[fuel] else {
        return;
    };
    if consumption >= 0.0 {
        return;
    }

    let no_bunkering = leg.bdn[fuel].map_or(true, |b| b == 0.0);
    if !no_bunkering || options.repair == RepairPolicy::Disabled {
        if consumption < options.extreme_negative_threshold {
            warn!(leg = index, %fuel, consumption, "Extremely negative consumption");
            diagnostics.push(Diagnostic::ExtremeNegativeConsumption {
                leg: index,
                fuel,
                consumption,
            });
        } else {
            warn!(leg = index, %fuel, consumption, "Negative consumption");
            diagnostics.push(Diagnostic::NegativeConsumption {
                leg: index,
                fuel,
                consumption,
            });
        }
        return;
    }

    match find_delivery(raw, fuel, leg.phase_end_date, options.repair) {
        Some(borrowed) => {
            leg.bdn[fuel] = Some(borrowed);
            leg.consumption[fuel] = mass_balance(prev_rob, Some(borrowed), leg.rob[fuel]);
            info!(leg = index, %fuel, borrowed, "Re-attributed bunker delivery");
            diagnostics.push(Diagnostic::BunkerReattributed {
                leg: index,
                fuel,
                borrowed,
            });
        }
        None => {
            warn!(leg = index, %fuel, consumption, "No bunker delivery found to re-attribute");
            diagnostics.push(Diagnostic::NegativeConsumption {
                leg: index,
                fuel,
                consumption,
            });
        }
    }
}

fn find_delivery(
    raw: &[PhaseEvent],
    fuel: FuelType,
    at: chrono::NaiveDateTime,
    policy: RepairPolicy,
) -> Option<f64> {
    let positive = |e: &&PhaseEvent| e.bdn[fuel].is_some_and(|b| b > 0.0);
    match policy {
        RepairPolicy::Disabled => None,
        RepairPolicy::Forward => raw
            .iter()
            .filter(|e| e.phase_end_date > at)
            .find(positive)
            .and_then(|e| e.bdn[fuel]),
        RepairPolicy::Backward => raw
            .iter()
            .filter(|e| e.phase_end_date < at)
            .filter(positive)
            .last()
            .and_then(|e| e.bdn[fuel]),
    }
}
