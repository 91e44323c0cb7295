//! EU ETS allowances per leg.
//!
//! A leg whose port equals the previous leg's port is consumption at berth;
//! otherwise it is a voyage between two ports. Both cases are decided by
//! first-match rule lists over the jurisdiction of the surrounding legs.

use tracing::debug;

use crate::fuel::{round3, PerFuel, EUA_PHASE_IN};
use crate::jurisdiction::Jurisdiction;
use crate::legs::Leg;

/// Tonnes CO2 for a leg's consumption, missing values counted as zero.
pub fn carbon_emitted(consumption: &PerFuel<f64>) -> f64 {
    round3(
        consumption
            .iter()
            .map(|(fuel, tonnes)| tonnes * fuel.emission_factor())
            .sum(),
    )
}

fn full(carbon: f64) -> f64 {
    round3(carbon * EUA_PHASE_IN)
}

fn half(carbon: f64) -> f64 {
    round3(carbon * EUA_PHASE_IN * 0.5)
}

/// Neighbourhood of leg `i`, out-of-range positions are `None`.
struct Window<'a> {
    curr: &'a Jurisdiction,
    prev: &'a Jurisdiction,
    two_back: Option<&'a Jurisdiction>,
    next: Option<&'a Jurisdiction>,
}

/// Allowances for leg `i` (`i >= 1`) of a classified leg sequence.
pub fn euas_for(legs: &[Leg], i: usize) -> f64 {
    if i == 0 || i >= legs.len() {
        return 0.0;
    }
    let carbon = legs[i].carbon_emitted;
    let window = Window {
        curr: &legs[i].jurisdiction,
        prev: &legs[i - 1].jurisdiction,
        two_back: i.checked_sub(2).and_then(|j| legs.get(j)).map(|l| &l.jurisdiction),
        next: legs.get(i + 1).map(|l| &l.jurisdiction),
    };

    let same_port = matches!(
        (&legs[i].port, &legs[i - 1].port),
        (Some(a), Some(b)) if a == b
    );
    if same_port {
        at_berth(&window, carbon)
    } else {
        on_voyage(&window, carbon)
    }
}

fn at_berth(w: &Window<'_>, carbon: f64) -> f64 {
    let curr = w.curr;

    // Mainland berth right after (or right before) an OMR call of the same state.
    if curr.is_mainland_eu() {
        if let Some(two_back) = w.two_back.filter(|j| j.is_omr_eu()) {
            return if curr.same_state(two_back) { 0.0 } else { full(carbon) };
        }
        if let Some(next) = w.next.filter(|j| j.is_omr_eu()) {
            return if curr.same_state(next) { 0.0 } else { full(carbon) };
        }
    }
    if !curr.eu && !w.prev.eu {
        return 0.0;
    }
    if curr.is_omr_eu() && w.prev.is_omr_eu() {
        return 0.0;
    }
    full(carbon)
}

fn on_voyage(w: &Window<'_>, carbon: f64) -> f64 {
    let (curr, prev) = (w.curr, w.prev);

    if curr.is_mainland_eu() && prev.is_mainland_eu() {
        return full(carbon);
    }
    if curr.is_mainland_eu() && prev.is_omr_eu() && curr.same_state(prev) {
        return 0.0;
    }
    if curr.is_mainland_eu() && !prev.eu {
        return half(carbon);
    }
    if !curr.eu && prev.is_mainland_eu() {
        return half(carbon);
    }
    if !curr.eu && !prev.eu {
        return 0.0;
    }
    if curr.is_omr_eu() && prev.is_omr_eu() {
        return if curr.same_state(prev) { 0.0 } else { full(carbon) };
    }
    if (curr.is_omr_eu() && !prev.eu) || (!curr.eu && prev.is_omr_eu()) {
        return half(carbon);
    }
    0.0
}

/// Fill `Carbon emitted` and `EUAs` on every leg. The first leg is always zero.
pub fn apply_euas(legs: &[Leg]) -> Vec<Leg> {
    let mut out: Vec<Leg> = legs.to_vec();
    for leg in out.iter_mut() {
        leg.carbon_emitted = carbon_emitted(&leg.consumption_or_zero());
    }
    if let Some(first) = out.first_mut() {
        first.carbon_emitted = 0.0;
    }

    let euas: Vec<f64> = (0..out.len()).map(|i| euas_for(&out, i)).collect();
    for (i, (leg, eua)) in out.iter_mut().zip(euas).enumerate() {
        leg.euas = eua;
        debug!(leg = i, carbon = leg.carbon_emitted, euas = eua, "EUAs");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Phase, PhaseEvent};
    use crate::fuel::FuelType;
    use crate::jurisdiction::state_code;
    use chrono::NaiveDate;

    fn leg(port: &str, eu: bool, omr: bool, carbon: f64) -> Leg {
        let when = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut e = PhaseEvent::new("MV TEST", Phase::AllFast, when);
        e.start_port = Some(port.into());
        let mut leg = Leg::from_event(&e);
        leg.jurisdiction = Jurisdiction { eu, omr, mapped: true, state: state_code(port) };
        leg.carbon_emitted = carbon;
        leg
    }

    #[test]
    fn carbon_uses_emission_factors_and_rounds() {
        let mut con = PerFuel::splat(0.0);
        con[FuelType::Hfo] = 10.0;
        con[FuelType::Lng] = 2.0;
        assert_eq!(carbon_emitted(&con), 36.64);
    }

    #[test]
    fn first_leg_is_zero() {
        let legs = vec![leg("NLRTM", true, false, 100.0)];
        assert_eq!(euas_for(&legs, 0), 0.0);
    }

    #[test]
    fn voyage_rates() {
        let carbon = 124.56;
        let cases = [
            // (prev eu, prev omr, curr eu, curr omr, expected)
            (true, false, true, false, round3(carbon * 0.7)),
            (true, true, true, false, 0.0),
            (false, false, true, false, round3(carbon * 0.7 * 0.5)),
            (true, false, false, false, round3(carbon * 0.7 * 0.5)),
            (false, false, false, false, 0.0),
            (true, true, true, true, 0.0),
            (false, false, true, true, round3(carbon * 0.7 * 0.5)),
            (true, true, false, false, round3(carbon * 0.7 * 0.5)),
        ];
        // Both ports in the same state, so OMR crossings stay domestic.
        for (pe, po, ce, co, expected) in cases {
            let legs = vec![leg("ESLPA", pe, po, 0.0), leg("ESALG", ce, co, carbon)];
            assert_eq!(euas_for(&legs, 1), expected, "{pe} {po} -> {ce} {co}");
        }
    }

    #[test]
    fn omr_crossings_compare_port_country_prefixes() {
        // Réunion to Funchal: OMR to OMR of another state.
        let legs = vec![leg("FRRUN", true, true, 0.0), leg("PTFNC", true, true, 100.0)];
        assert_eq!(euas_for(&legs, 1), 70.0);

        // Réunion to Rotterdam skips the same-state exemption and matches no
        // later rule.
        let legs = vec![leg("FRRUN", true, true, 0.0), leg("NLRTM", true, false, 100.0)];
        assert_eq!(euas_for(&legs, 1), 0.0);

        // Same state on both sides stays exempt.
        let legs = vec![leg("FRRUN", true, true, 0.0), leg("FRLEH", true, false, 100.0)];
        assert_eq!(euas_for(&legs, 1), 0.0);
        let legs = vec![leg("PTFNC", true, true, 0.0), leg("PTPDL", true, true, 100.0)];
        assert_eq!(euas_for(&legs, 1), 0.0);
    }

    #[test]
    fn inbound_half_rate_is_exact() {
        let legs = vec![leg("SGSIN", false, false, 0.0), leg("NLRTM", true, false, 124.56)];
        assert_eq!(euas_for(&legs, 1), 43.596);
    }

    #[test]
    fn berth_rates() {
        let carbon = 50.0;
        // Non-EU berth.
        let legs = vec![leg("SGSIN", false, false, 0.0), leg("SGSIN", false, false, carbon)];
        assert_eq!(euas_for(&legs, 1), 0.0);

        // OMR berth.
        let legs = vec![leg("ESLPA", true, true, 0.0), leg("ESLPA", true, true, carbon)];
        assert_eq!(euas_for(&legs, 1), 0.0);

        // Mainland berth after an OMR call two legs back.
        let legs = vec![
            leg("ESLPA", true, true, 0.0),
            leg("ESALG", true, false, 0.0),
            leg("ESALG", true, false, carbon),
        ];
        assert_eq!(euas_for(&legs, 2), 0.0);

        // Same, but the OMR call two back belongs to another state.
        let legs = vec![
            leg("FRRUN", true, true, 0.0),
            leg("ESALG", true, false, 0.0),
            leg("ESALG", true, false, carbon),
        ];
        assert_eq!(euas_for(&legs, 2), 35.0);

        // Mainland berth followed by an OMR call of the same state.
        let legs = vec![
            leg("NLRTM", true, false, 0.0),
            leg("ESALG", true, false, 0.0),
            leg("ESALG", true, false, carbon),
            leg("ESLPA", true, true, 0.0),
        ];
        assert_eq!(euas_for(&legs, 2), 0.0);

        // Followed by an OMR call of another state.
        let legs = vec![
            leg("NLRTM", true, false, 0.0),
            leg("ESALG", true, false, 0.0),
            leg("ESALG", true, false, carbon),
            leg("PTFNC", true, true, 0.0),
        ];
        assert_eq!(euas_for(&legs, 2), 35.0);

        // Mainland berth with no OMR around.
        let legs = vec![leg("NLRTM", true, false, 0.0), leg("NLRTM", true, false, carbon)];
        assert_eq!(euas_for(&legs, 1), 35.0);
    }

    #[test]
    fn apply_sets_carbon_and_zero_first_leg() {
        let mut a = leg("SGSIN", false, false, 0.0);
        a.consumption = PerFuel::splat(None);
        let mut b = leg("NLRTM", true, false, 0.0);
        b.consumption = PerFuel::splat(Some(0.0));
        b.consumption[FuelType::Hfo] = Some(40.0);

        let out = apply_euas(&[a, b]);
        assert_eq!(out[0].euas, 0.0);
        assert_eq!(out[0].carbon_emitted, 0.0);
        assert_eq!(out[1].carbon_emitted, 124.56);
        assert_eq!(out[1].euas, 43.596);
    }
}
