//! Raw phase events and the per-vessel cleaning pass that precedes leg extraction.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::fuel::PerFuel;
use crate::schema::phase;

/// Width of a facility code; longer port strings carry a descriptive suffix.
pub const PORT_CODE_LEN: usize = 5;

/// Vessel phase after trimming and upper-casing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Phase {
    AllFast,
    LastLine,
    Eosp,
    Other(String),
}

impl Phase {
    /// Normalize free-text phase labels (case and surrounding whitespace vary).
    pub fn parse(raw: &str) -> Self {
        let label = raw.trim().to_uppercase();
        match label.as_str() {
            phase::ALL_FAST => Self::AllFast,
            phase::LAST_LINE => Self::LastLine,
            phase::EOSP => Self::Eosp,
            _ => Self::Other(label),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::AllFast => phase::ALL_FAST,
            Self::LastLine => phase::LAST_LINE,
            Self::Eosp => phase::EOSP,
            Self::Other(label) => label,
        }
    }

    /// Arrival or departure milestone, i.e. a leg candidate.
    pub fn is_milestone(&self) -> bool {
        matches!(self, Self::AllFast | Self::LastLine)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded phase transition of a vessel.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseEvent {
    pub vessel_name: String,
    pub phase: Phase,
    pub phase_end_date: NaiveDateTime,
    pub start_port: Option<String>,
    pub end_port: Option<String>,
    pub cargo_mt: Option<f64>,
    /// Remaining on board at phase end.
    pub rob: PerFuel<Option<f64>>,
    /// Bunkered during this event.
    pub bdn: PerFuel<Option<f64>>,
}

impl PhaseEvent {
    pub fn new(vessel_name: impl Into<String>, phase: Phase, phase_end_date: NaiveDateTime) -> Self {
        Self {
            vessel_name: vessel_name.into(),
            phase,
            phase_end_date,
            start_port: None,
            end_port: None,
            cargo_mt: None,
            rob: PerFuel::splat(None),
            bdn: PerFuel::splat(None),
        }
    }
}

/// Normalized events grouped by vessel, each group ascending by `phase_end_date`.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    by_vessel: BTreeMap<String, Vec<PhaseEvent>>,
}

impl EventLog {
    /// Clean a raw event population.
    ///
    /// Order of operations:
    ///   1. ALL FAST rows without a start port take their end port
    ///   2. both ports are cut to the facility code
    ///   3. events are grouped per vessel and stably sorted by timestamp
    ///   4. cargo recorded at EOSP is carried onto the bracketing LAST LINE / ALL FAST
    pub fn normalize(events: Vec<PhaseEvent>) -> Self {
        let mut by_vessel: BTreeMap<String, Vec<PhaseEvent>> = BTreeMap::new();

        for mut event in events {
            event.start_port = clean_port(event.start_port.take());
            event.end_port = clean_port(event.end_port.take());
            if event.phase == Phase::AllFast && event.start_port.is_none() {
                event.start_port = event.end_port.clone();
            }
            by_vessel
                .entry(event.vessel_name.clone())
                .or_default()
                .push(event);
        }

        for (vessel, events) in by_vessel.iter_mut() {
            // Vec::sort_by_key is stable: ties keep their input order.
            events.sort_by_key(|e| e.phase_end_date);
            let filled = backfill_cargo(events);
            debug!(vessel = %vessel, events = events.len(), cargo_backfilled = filled, "Normalized vessel events");
        }

        Self { by_vessel }
    }

    pub fn events(&self, vessel: &str) -> &[PhaseEvent] {
        self.by_vessel.get(vessel).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn vessels(&self) -> impl Iterator<Item = &str> {
        self.by_vessel.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_vessel.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_vessel.is_empty()
    }
}

fn clean_port(port: Option<String>) -> Option<String> {
    let port = port?;
    let trimmed = port.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(PORT_CODE_LEN).collect())
}

fn is_missing_cargo(cargo: Option<f64>) -> bool {
    match cargo {
        None => true,
        Some(v) => v == 0.0 || v.is_nan(),
    }
}

/// Propagate the EOSP cargo figure onto the nearest preceding LAST LINE and the
/// nearest following ALL FAST when those carry no cargo. Returns the number of
/// rows filled. `events` must already be sorted.
fn backfill_cargo(events: &mut [PhaseEvent]) -> usize {
    let mut filled = 0;
    let eosp_rows: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.phase == Phase::Eosp)
        .map(|(i, _)| i)
        .collect();

    for idx in eosp_rows {
        let at = events[idx].phase_end_date;
        let cargo = events[idx].cargo_mt;

        let before = events
            .iter()
            .rposition(|e| e.phase == Phase::LastLine && e.phase_end_date < at);
        let after = events
            .iter()
            .position(|e| e.phase == Phase::AllFast && e.phase_end_date > at);

        for target in [before, after].into_iter().flatten() {
            if is_missing_cargo(events[target].cargo_mt) {
                events[target].cargo_mt = cargo;
                filled += 1;
            }
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn event(phase: &str, when: NaiveDateTime, cargo: Option<f64>) -> PhaseEvent {
        let mut e = PhaseEvent::new("MV TEST", Phase::parse(phase), when);
        e.start_port = Some("NLRTM".into());
        e.cargo_mt = cargo;
        e
    }

    #[test]
    fn phase_labels_are_trimmed_and_uppercased() {
        assert_eq!(Phase::parse("  all fast "), Phase::AllFast);
        assert_eq!(Phase::parse("Last Line"), Phase::LastLine);
        assert_eq!(Phase::parse("eosp"), Phase::Eosp);
        assert_eq!(Phase::parse(" cosp"), Phase::Other("COSP".into()));
    }

    #[test]
    fn all_fast_falls_back_to_end_port_and_codes_are_truncated() {
        let mut af = PhaseEvent::new("MV TEST", Phase::AllFast, at(1, 0));
        af.end_port = Some("SGSIN Singapore Anchorage".into());
        let mut ll = PhaseEvent::new("MV TEST", Phase::LastLine, at(2, 0));
        ll.end_port = Some("NLRTM".into());

        let log = EventLog::normalize(vec![af, ll]);
        let events = log.events("MV TEST");
        assert_eq!(events[0].start_port.as_deref(), Some("SGSIN"));
        assert_eq!(events[0].end_port.as_deref(), Some("SGSIN"));
        // Only ALL FAST rows take the fallback.
        assert_eq!(events[1].start_port, None);
    }

    #[test]
    fn events_are_sorted_per_vessel_with_stable_ties() {
        let mut a = event("ALL FAST", at(3, 0), Some(1.0));
        let b = event("LAST LINE", at(1, 0), Some(2.0));
        let mut c = event("EOSP", at(3, 0), Some(3.0));
        a.start_port = Some("AAAAA".into());
        c.start_port = Some("CCCCC".into());
        let mut other = event("ALL FAST", at(1, 0), None);
        other.vessel_name = "MV OTHER".into();

        let log = EventLog::normalize(vec![a, b, c, other]);
        let ports: Vec<_> = log
            .events("MV TEST")
            .iter()
            .map(|e| e.start_port.clone().unwrap())
            .collect();
        assert_eq!(ports, vec!["NLRTM", "AAAAA", "CCCCC"]);
        assert_eq!(log.events("MV OTHER").len(), 1);
        assert_eq!(log.vessels().collect::<Vec<_>>(), vec!["MV OTHER", "MV TEST"]);
    }

    #[test]
    fn eosp_cargo_fills_only_nearest_bracketing_milestones() {
        let events = vec![
            event("LAST LINE", at(1, 0), None),
            event("LAST LINE", at(2, 0), Some(0.0)),
            event("EOSP", at(3, 0), Some(5000.0)),
            event("ALL FAST", at(4, 0), None),
            event("ALL FAST", at(5, 0), None),
        ];
        let log = EventLog::normalize(events);
        let cargo: Vec<_> = log.events("MV TEST").iter().map(|e| e.cargo_mt).collect();
        assert_eq!(
            cargo,
            vec![None, Some(5000.0), Some(5000.0), Some(5000.0), None]
        );
    }

    #[test]
    fn eosp_backfill_keeps_existing_cargo() {
        let events = vec![
            event("LAST LINE", at(1, 0), Some(1200.0)),
            event("EOSP", at(2, 0), Some(5000.0)),
            event("ALL FAST", at(3, 0), Some(4800.0)),
        ];
        let log = EventLog::normalize(events);
        let cargo: Vec<_> = log.events("MV TEST").iter().map(|e| e.cargo_mt).collect();
        assert_eq!(cargo, vec![Some(1200.0), Some(5000.0), Some(4800.0)]);
    }
}
