//! EU membership / outermost-region lookup and the boundary category of each leg.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::legs::Leg;
use crate::pipeline::Diagnostic;
use crate::schema::membership;

/// Reference flags for one port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// `None` when the port row leaves the EU flag blank.
    pub eu: Option<bool>,
    pub omr: bool,
    pub country: Option<String>,
}

/// Port → EU / OMR reference, with country name and country code → EU fallbacks.
#[derive(Debug, Clone, Default)]
pub struct PortReference {
    ports: HashMap<String, PortInfo>,
    countries: HashMap<String, bool>,
    /// Keyed by the two-letter UN/LOCODE country prefix.
    country_codes: HashMap<String, bool>,
}

impl PortReference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_port(&mut self, code: impl Into<String>, info: PortInfo) {
        self.ports.insert(code.into().trim().to_uppercase(), info);
    }

    pub fn insert_country(&mut self, country: impl Into<String>, eu: bool) {
        self.countries.insert(country.into().trim().to_uppercase(), eu);
    }

    pub fn insert_country_code(&mut self, code: impl Into<String>, eu: bool) {
        self.country_codes.insert(code.into().trim().to_uppercase(), eu);
    }

    /// Convenience for the common "EU"/"Non-EU", "Yes"/"No" labels.
    pub fn with_port(mut self, code: &str, eu_label: &str, omr_label: &str) -> Self {
        self.insert_port(
            code,
            PortInfo {
                eu: parse_eu_label(eu_label),
                omr: parse_yes(omr_label),
                country: None,
            },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Resolve a port to `(eu, omr)`.
    ///
    /// A port row with a blank EU flag falls back to its country name, then to
    /// the country code prefix of the port. A port with no row at all resolves
    /// through its country code prefix as a mainland port. `None` when neither
    /// source knows the membership.
    pub fn lookup(&self, port: &str) -> Option<(bool, bool)> {
        let key = port.trim().to_uppercase();
        let Some(info) = self.ports.get(&key) else {
            return self.code_membership(&key).map(|eu| (eu, false));
        };
        let eu = match info.eu {
            Some(eu) => eu,
            None => info
                .country
                .as_ref()
                .and_then(|c| self.countries.get(&c.trim().to_uppercase()).copied())
                .or_else(|| self.code_membership(&key))?,
        };
        Some((eu, info.omr))
    }

    fn code_membership(&self, port: &str) -> Option<bool> {
        self.country_codes.get(&state_code(port)?).copied()
    }
}

/// Two-letter UN/LOCODE country prefix of a port code, uppercased.
pub fn state_code(port: &str) -> Option<String> {
    let prefix: String = port.trim().chars().take(2).collect();
    (prefix.chars().count() == 2 && prefix.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| prefix.to_ascii_uppercase())
}

/// Parse an EU flag label; unrecognized labels are unknown.
pub fn parse_eu_label(label: &str) -> Option<bool> {
    let label = label.trim();
    if label.eq_ignore_ascii_case(membership::EU) {
        Some(true)
    } else if label.eq_ignore_ascii_case(membership::NON_EU)
        || label.eq_ignore_ascii_case("NON EU")
        || label.eq_ignore_ascii_case("NONEU")
    {
        Some(false)
    } else {
        None
    }
}

pub fn parse_yes(label: &str) -> bool {
    let label = label.trim();
    label.eq_ignore_ascii_case(membership::YES) || label.eq_ignore_ascii_case("Y")
}

/// Resolved jurisdiction of a leg.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Jurisdiction {
    pub eu: bool,
    pub omr: bool,
    /// False when the port was missing from the reference and defaulted to Non-EU.
    pub mapped: bool,
    /// Country prefix of the port code, e.g. "ES" for both ESALG and ESLPA.
    pub state: Option<String>,
}

impl Jurisdiction {
    /// Value of the leg table's `Country Code` column.
    pub fn country_code(&self) -> &'static str {
        if self.eu {
            membership::EU
        } else {
            membership::NON_EU
        }
    }

    pub fn omr_label(&self) -> &'static str {
        if self.omr {
            membership::YES
        } else {
            membership::NO
        }
    }

    pub fn is_mainland_eu(&self) -> bool {
        self.eu && !self.omr
    }

    pub fn is_omr_eu(&self) -> bool {
        self.eu && self.omr
    }

    /// Same member state, judged by the country prefix of both port codes.
    /// Unknown on either side counts as different.
    pub fn same_state(&self, other: &Jurisdiction) -> bool {
        matches!((&self.state, &other.state), (Some(a), Some(b)) if a == b)
    }
}

/// Boundary classification of the transition from the previous leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Start,
    Outbound,
    Inbound,
    Bound,
    NonEu,
    OmrEu,
    EuOmr,
    NonEuOmr,
    OmrNonEu,
    Omr,
    Unknown,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Outbound => "Outbound",
            Self::Inbound => "Inbound",
            Self::Bound => "Bound",
            Self::NonEu => "Non-EU",
            Self::OmrEu => "OMR-EU",
            Self::EuOmr => "EU-OMR",
            Self::NonEuOmr => "NonEU-OMR",
            Self::OmrNonEu => "OMR-NonEU",
            Self::Omr => "OMR",
            Self::Unknown => "Unknown",
        }
    }

    /// Share of a leg counted towards FuelEU: full within the EU, half across its boundary.
    pub fn fueleu_share(self) -> f64 {
        match self {
            Self::Bound => 1.0,
            Self::Inbound
            | Self::Outbound
            | Self::EuOmr
            | Self::OmrEu
            | Self::NonEuOmr
            | Self::OmrNonEu => 0.5,
            Self::Start | Self::NonEu | Self::Omr | Self::Unknown => 0.0,
        }
    }

    /// Boundary category of the move from `prev` to `curr`. First matching row wins.
    pub fn between(prev: &Jurisdiction, curr: &Jurisdiction) -> Self {
        match (prev.eu, prev.omr, curr.eu, curr.omr) {
            (true, false, false, _) => Self::Outbound,
            // Non-EU into the EU, mainland or OMR alike; this shadows NonEU-OMR.
            (false, _, true, _) => Self::Inbound,
            (true, false, true, false) => Self::Bound,
            (false, _, false, _) => Self::NonEu,
            (true, true, true, false) => Self::OmrEu,
            (true, false, true, true) => Self::EuOmr,
            (true, true, false, false) => Self::OmrNonEu,
            (true, true, true, true) => Self::Omr,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attach jurisdiction and boundary category to every leg.
///
/// Unmapped ports default to Non-EU / OMR No and are reported once per port.
/// With `include_omr` off every port is treated as mainland.
pub fn classify(
    legs: &[Leg],
    ports: &PortReference,
    include_omr: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<Leg> {
    let mut out: Vec<Leg> = legs.to_vec();
    let mut reported: Vec<String> = Vec::new();

    for leg in out.iter_mut() {
        let resolved = leg.port.as_deref().and_then(|p| ports.lookup(p));
        let state = leg.port.as_deref().and_then(state_code);
        leg.jurisdiction = match resolved {
            Some((eu, omr)) => Jurisdiction {
                eu,
                omr: include_omr && omr,
                mapped: true,
                state,
            },
            None => {
                let port = leg.port.clone().unwrap_or_default();
                if !reported.contains(&port) {
                    warn!(port = %port, "Port missing from reference, treating as Non-EU");
                    diagnostics.push(Diagnostic::UnmappedPort { port: port.clone() });
                    reported.push(port);
                }
                Jurisdiction {
                    state,
                    ..Jurisdiction::default()
                }
            }
        };
    }

    for i in 0..out.len() {
        out[i].category = match i {
            0 => Category::Start,
            _ => Category::between(&out[i - 1].jurisdiction, &out[i].jurisdiction),
        };
        debug!(leg = i, category = %out[i].category, "Classified leg");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Phase, PhaseEvent};
    use chrono::NaiveDate;

    fn j(eu: bool, omr: bool) -> Jurisdiction {
        Jurisdiction { eu, omr, mapped: true, state: None }
    }

    fn legs_at(ports: &[&str]) -> Vec<Leg> {
        let when = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        ports
            .iter()
            .map(|p| {
                let mut e = PhaseEvent::new("MV TEST", Phase::AllFast, when);
                e.start_port = Some((*p).into());
                Leg::from_event(&e)
            })
            .collect()
    }

    #[test]
    fn category_table_first_match() {
        let eu = j(true, false);
        let omr = j(true, true);
        let non = j(false, false);
        let non_omr = j(false, true);

        assert_eq!(Category::between(&eu, &non), Category::Outbound);
        assert_eq!(Category::between(&eu, &non_omr), Category::Outbound);
        assert_eq!(Category::between(&non, &eu), Category::Inbound);
        assert_eq!(Category::between(&non, &omr), Category::Inbound);
        assert_eq!(Category::between(&eu, &eu), Category::Bound);
        assert_eq!(Category::between(&non, &non), Category::NonEu);
        assert_eq!(Category::between(&omr, &eu), Category::OmrEu);
        assert_eq!(Category::between(&eu, &omr), Category::EuOmr);
        assert_eq!(Category::between(&omr, &non), Category::OmrNonEu);
        assert_eq!(Category::between(&omr, &omr), Category::Omr);
        assert_eq!(Category::between(&omr, &non_omr), Category::Unknown);
    }

    #[test]
    fn fueleu_shares() {
        assert_eq!(Category::Bound.fueleu_share(), 1.0);
        assert_eq!(Category::Inbound.fueleu_share(), 0.5);
        assert_eq!(Category::OmrNonEu.fueleu_share(), 0.5);
        assert_eq!(Category::NonEu.fueleu_share(), 0.0);
        assert_eq!(Category::Omr.fueleu_share(), 0.0);
        assert_eq!(Category::Start.fueleu_share(), 0.0);
    }

    #[test]
    fn lookup_falls_back_to_country() {
        let mut refs = PortReference::new().with_port("NLRTM", "EU", "No");
        refs.insert_port(
            "ESLPA",
            PortInfo { eu: None, omr: true, country: Some("Spain".into()) },
        );
        refs.insert_port(
            "XXXXX",
            PortInfo { eu: None, omr: false, country: Some("Atlantis".into()) },
        );
        refs.insert_country("SPAIN", true);

        assert_eq!(refs.lookup("nlrtm"), Some((true, false)));
        assert_eq!(refs.lookup("ESLPA"), Some((true, true)));
        assert_eq!(refs.lookup("XXXXX"), None);
        assert_eq!(refs.lookup("SGSIN"), None);
    }

    #[test]
    fn unknown_port_resolves_through_country_code() {
        let mut refs = PortReference::new().with_port("ESLPA", "EU", "Yes");
        refs.insert_port("PTFNC", PortInfo { eu: None, omr: true, country: None });
        refs.insert_country_code("de", true);
        refs.insert_country_code("PT", true);
        refs.insert_country_code("US", false);

        assert_eq!(refs.lookup("DEHAM"), Some((true, false)));
        assert_eq!(refs.lookup(" usHOU"), Some((false, false)));
        assert_eq!(refs.lookup("PTFNC"), Some((true, true)));
        assert_eq!(refs.lookup("ESLPA"), Some((true, true)));
        assert_eq!(refs.lookup("CNSHA"), None);
        assert_eq!(refs.lookup("1"), None);
    }

    #[test]
    fn state_codes() {
        assert_eq!(state_code("frrun"), Some("FR".to_string()));
        assert_eq!(state_code(" ESLPA "), Some("ES".to_string()));
        assert_eq!(state_code("E"), None);
        assert_eq!(state_code("12345"), None);
    }

    #[test]
    fn classify_records_state_and_reports_true_misses() {
        let mut refs = PortReference::new().with_port("NLRTM", "EU", "No");
        refs.insert_country_code("DE", true);
        let mut diagnostics = Vec::new();
        let legs = classify(&legs_at(&["NLRTM", "DEHAM", "CNSHA"]), &refs, true, &mut diagnostics);

        assert_eq!(
            legs[1].jurisdiction,
            Jurisdiction { eu: true, omr: false, mapped: true, state: Some("DE".into()) }
        );
        assert_eq!(legs[1].category, Category::Bound);
        assert!(!legs[2].jurisdiction.mapped);
        assert_eq!(legs[2].jurisdiction.state.as_deref(), Some("CN"));
        assert_eq!(
            diagnostics,
            vec![Diagnostic::UnmappedPort { port: "CNSHA".into() }]
        );
    }

    #[test]
    fn omr_switch_off_treats_outermost_regions_as_mainland() {
        let refs = PortReference::new()
            .with_port("ESLPA", "EU", "Yes")
            .with_port("ESALG", "EU", "No");
        let legs = legs_at(&["ESLPA", "ESALG"]);

        let with = classify(&legs, &refs, true, &mut Vec::new());
        assert!(with[0].jurisdiction.is_omr_eu());
        assert_eq!(with[1].category, Category::OmrEu);

        let without = classify(&legs, &refs, false, &mut Vec::new());
        assert!(without[0].jurisdiction.is_mainland_eu());
        assert_eq!(without[0].jurisdiction.omr_label(), "No");
        assert_eq!(without[1].category, Category::Bound);
    }

    #[test]
    fn eu_labels() {
        assert_eq!(parse_eu_label(" eu "), Some(true));
        assert_eq!(parse_eu_label("Non-EU"), Some(false));
        assert_eq!(parse_eu_label(""), None);
        assert!(parse_yes("YES"));
        assert!(!parse_yes("No"));
    }
}
