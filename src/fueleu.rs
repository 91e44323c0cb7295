//! FuelEU Maritime GHG intensity, compliance balance and penalty.
//!
//! Two allocation policies run over the same classified legs:
//!
//! - pooled: every fuel is counted at the leg's category share and the
//!   intensity develops over the cumulative totals;
//! - reallocated: the leg's applicable energy is filled with the cleanest
//!   fuels first (LNG, MGO, LFO, HFO) and balance/penalty accumulate per leg.
//!
//! Every division is guarded; degenerate inputs produce 0 or the target
//! intensity, never NaN.

use tracing::debug;

use crate::fuel::{
    finite_or, round3, FuelType, PerFuel, PENALTY_RATE_EUR, TARGET_GHG_INTENSITY,
    VLSFO_REFERENCE_ENERGY,
};
use crate::legs::Leg;

/// Per-leg FuelEU figures without reallocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PooledEnergy {
    /// Consumption counted towards FuelEU (category share applied, 3 dp).
    pub applicable_consumption: PerFuel<f64>,
    pub energy: f64,
    pub wtw_co2eq: f64,
    pub cumulative_energy: f64,
    pub cumulative_wtw_co2eq: f64,
    /// Developing intensity over the cumulative totals.
    pub ghg_intensity: f64,
    pub compliance_balance: f64,
    pub penalty: f64,
}

/// Per-leg FuelEU figures with preferential fuel reallocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReallocatedEnergy {
    pub total_energy: f64,
    pub applicable_energy: f64,
    pub efficient_energy: PerFuel<f64>,
    pub ghg_intensity: f64,
    pub compliance_balance: f64,
    pub penalty: f64,
    pub cumulative_balance: f64,
    pub cumulative_penalty: f64,
}

/// `|balance| * 2400 / (intensity * 41000)`, zero when intensity is zero.
pub fn penalty_eur(balance: f64, intensity: f64) -> f64 {
    if intensity == 0.0 {
        return 0.0;
    }
    finite_or(
        (balance * PENALTY_RATE_EUR / (intensity * VLSFO_REFERENCE_ENERGY)).abs(),
        0.0,
    )
}

fn raw_energy(consumption: &PerFuel<f64>) -> PerFuel<f64> {
    consumption.map(|fuel, tonnes| tonnes * fuel.lcv())
}

/// Fill the pooled FuelEU fields on every leg.
pub fn apply_pooled(legs: &[Leg]) -> Vec<Leg> {
    let mut out: Vec<Leg> = legs.to_vec();
    let mut cumulative_energy = 0.0;
    let mut cumulative_co2 = 0.0;

    for (i, leg) in out.iter_mut().enumerate() {
        let share = if i == 0 { 0.0 } else { leg.category.fueleu_share() };
        let applicable = leg
            .consumption_or_zero()
            .map(|_, tonnes| round3(tonnes * share));

        let energy: f64 = applicable.iter().map(|(f, t)| t * f.lcv()).sum();
        let co2: f64 = applicable.iter().map(|(f, t)| t * f.wtw_factor()).sum();
        cumulative_energy += energy;
        cumulative_co2 += co2;

        let intensity = if cumulative_energy == 0.0 {
            0.0
        } else {
            finite_or(cumulative_co2 / cumulative_energy * 1e6, 0.0)
        };
        let balance = finite_or((TARGET_GHG_INTENSITY - intensity) * cumulative_energy, 0.0);

        leg.pooled = PooledEnergy {
            applicable_consumption: applicable,
            energy,
            wtw_co2eq: co2,
            cumulative_energy,
            cumulative_wtw_co2eq: cumulative_co2,
            ghg_intensity: intensity,
            compliance_balance: balance,
            penalty: penalty_eur(balance, intensity),
        };
    }
    out
}

/// Greedy fill of `budget` from each fuel's energy, cleanest fuel first.
/// Each fuel contributes `max(0, min(remaining, its energy))`.
pub fn allocate_preferential(budget: f64, energy: &PerFuel<f64>) -> PerFuel<f64> {
    let mut allocated = PerFuel::splat(0.0);
    let mut remaining = budget;
    for fuel in FuelType::PREFERENCE {
        let take = remaining.min(energy[fuel]).max(0.0);
        allocated[fuel] = take;
        remaining -= take;
    }
    allocated
}

/// Intensity of an allocation; the target when nothing applies.
fn allocated_intensity(allocated: &PerFuel<f64>, applicable: f64) -> f64 {
    if applicable <= 0.0 {
        return TARGET_GHG_INTENSITY;
    }
    let weighted: f64 = allocated.iter().map(|(f, e)| e * f.ghg_intensity()).sum();
    let intensity = weighted / applicable;
    if !intensity.is_finite() || intensity == 0.0 {
        TARGET_GHG_INTENSITY
    } else {
        intensity
    }
}

/// Fill the reallocated FuelEU fields on every leg.
pub fn apply_reallocated(legs: &[Leg]) -> Vec<Leg> {
    let mut out: Vec<Leg> = legs.to_vec();
    let mut cumulative_balance = 0.0;
    let mut cumulative_penalty = 0.0;

    for (i, leg) in out.iter_mut().enumerate() {
        let share = if i == 0 { 0.0 } else { leg.category.fueleu_share() };
        let energy = raw_energy(&leg.consumption_or_zero());
        let total_energy: f64 = energy.0.iter().sum();
        let applicable_energy = total_energy * share;

        let efficient = allocate_preferential(applicable_energy, &energy);
        let intensity = allocated_intensity(&efficient, applicable_energy);
        let balance = finite_or((TARGET_GHG_INTENSITY - intensity) * applicable_energy, 0.0);
        let penalty = penalty_eur(balance, intensity);
        cumulative_balance += balance;
        cumulative_penalty += penalty;

        debug!(leg = i, applicable_energy, intensity, balance, "Reallocated FuelEU");
        leg.reallocated = ReallocatedEnergy {
            total_energy,
            applicable_energy,
            efficient_energy: efficient,
            ghg_intensity: intensity,
            compliance_balance: balance,
            penalty,
            cumulative_balance,
            cumulative_penalty,
        };
    }
    out
}

/// WtT / TtW breakdown over the period's applicable HFO, LFO and MGO.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntensityBreakdown {
    pub wtt: f64,
    pub ttw: f64,
    pub ghg_intensity_actual: f64,
    pub ghg_intensity_target: f64,
    /// Deficit against the target, reported as a negative balance.
    pub cb_def: f64,
    pub penalty: f64,
}

/// Target used by the breakdown (2025 reference value with full precision).
pub const BREAKDOWN_TARGET_INTENSITY: f64 = 89.3368;

struct BreakdownFactors {
    fuel: FuelType,
    co2_eqv: f64,
    lcv: f64,
    ttw: f64,
}

const BREAKDOWN_FACTORS: [BreakdownFactors; 3] = [
    BreakdownFactors { fuel: FuelType::Hfo, co2_eqv: 13.5, lcv: 0.0405, ttw: 3.16889 },
    BreakdownFactors { fuel: FuelType::Lfo, co2_eqv: 13.2, lcv: 0.041, ttw: 3.20589 },
    BreakdownFactors { fuel: FuelType::Mgo, co2_eqv: 14.4, lcv: 0.0427, ttw: 3.26089 },
];

impl IntensityBreakdown {
    pub fn from_legs(legs: &[Leg]) -> Self {
        let mut totals = PerFuel::splat(0.0);
        for leg in legs {
            for (fuel, tonnes) in leg.pooled.applicable_consumption.iter() {
                totals[fuel] += tonnes;
            }
        }

        let mut wtt_sum = 0.0;
        let mut energy = 0.0;
        let mut ttw_sum = 0.0;
        for f in &BREAKDOWN_FACTORS {
            // grams
            let grams = round3(totals[f.fuel]) * 1e6;
            wtt_sum += grams * f.co2_eqv * f.lcv;
            energy += grams * f.lcv;
            ttw_sum += grams * f.ttw;
        }

        let (wtt, ttw) = if energy == 0.0 {
            (0.0, 0.0)
        } else {
            (finite_or(wtt_sum / energy, 0.0), finite_or(ttw_sum / energy, 0.0))
        };
        let actual = wtt + ttw;
        let deficit = if energy == 0.0 {
            0.0
        } else {
            (actual - BREAKDOWN_TARGET_INTENSITY).abs() * energy
        };

        Self {
            wtt: round3(wtt),
            ttw: round3(ttw),
            ghg_intensity_actual: round3(actual),
            ghg_intensity_target: round3(BREAKDOWN_TARGET_INTENSITY),
            cb_def: 0.0 - round3(deficit),
            penalty: round3(penalty_eur(deficit, actual)),
        }
    }
}

/// Period totals reported for FuelEU, taken from the last leg, 3 dp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuelEuSummary {
    pub balance_without_reallocation: f64,
    pub penalty_without_reallocation: f64,
    pub balance_with_reallocation: f64,
    pub penalty_with_reallocation: f64,
    pub breakdown: IntensityBreakdown,
}

impl FuelEuSummary {
    pub fn from_legs(legs: &[Leg]) -> Self {
        let Some(last) = legs.last() else {
            return Self::default();
        };
        Self {
            balance_without_reallocation: round3(last.pooled.compliance_balance),
            penalty_without_reallocation: round3(last.pooled.penalty),
            balance_with_reallocation: round3(last.reallocated.cumulative_balance),
            penalty_with_reallocation: round3(last.reallocated.cumulative_penalty),
            breakdown: IntensityBreakdown::from_legs(legs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Phase, PhaseEvent};
    use crate::jurisdiction::Category;
    use chrono::NaiveDate;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * b.abs().max(1.0)
    }

    fn leg(category: Category, hfo: f64, lng: f64) -> Leg {
        let when = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut leg = Leg::from_event(&PhaseEvent::new("MV TEST", Phase::AllFast, when));
        leg.category = category;
        leg.consumption = PerFuel::splat(Some(0.0));
        leg.consumption[FuelType::Hfo] = Some(hfo);
        leg.consumption[FuelType::Lng] = Some(lng);
        leg
    }

    #[test]
    fn all_zero_consumption_is_neutral() {
        let legs = vec![
            leg(Category::Start, 0.0, 0.0),
            leg(Category::Bound, 0.0, 0.0),
            leg(Category::Inbound, 0.0, 0.0),
        ];
        let legs = apply_reallocated(&apply_pooled(&legs));
        let summary = FuelEuSummary::from_legs(&legs);
        assert_eq!(summary.balance_without_reallocation, 0.0);
        assert_eq!(summary.penalty_without_reallocation, 0.0);
        assert_eq!(summary.balance_with_reallocation, 0.0);
        assert_eq!(summary.penalty_with_reallocation, 0.0);
        assert_eq!(summary.breakdown.penalty, 0.0);
        assert!(legs.iter().all(|l| l.reallocated.ghg_intensity == TARGET_GHG_INTENSITY));
    }

    #[test]
    fn pooled_hfo_bound_leg() {
        let legs = apply_pooled(&[leg(Category::Start, 5.0, 0.0), leg(Category::Bound, 100.0, 0.0)]);
        let p = &legs[1].pooled;
        assert_eq!(legs[0].pooled.energy, 0.0);
        assert!(close(p.energy, 4_050_000.0));
        let intensity = 3.71564 / 40500.0 * 1e6;
        assert!(close(p.ghg_intensity, intensity));
        let balance = (89.34 - intensity) * 4_050_000.0;
        assert!(balance < 0.0);
        assert!(close(p.compliance_balance, balance));
        assert!(close(p.penalty, (balance * 2400.0 / (intensity * 41000.0)).abs()));
    }

    #[test]
    fn pooled_counts_boundary_legs_at_half_and_non_eu_not_at_all() {
        let legs = apply_pooled(&[
            leg(Category::Start, 0.0, 0.0),
            leg(Category::Outbound, 10.0, 0.0),
            leg(Category::NonEu, 50.0, 0.0),
        ]);
        assert_eq!(legs[1].pooled.applicable_consumption[FuelType::Hfo], 5.0);
        assert_eq!(legs[2].pooled.applicable_consumption[FuelType::Hfo], 0.0);
        assert_eq!(legs[2].pooled.cumulative_energy, legs[1].pooled.cumulative_energy);
    }

    #[test]
    fn preferential_allocation_is_greedy_and_capped() {
        let mut energy = PerFuel::splat(0.0);
        energy[FuelType::Hfo] = 100.0;
        energy[FuelType::Mgo] = 30.0;
        energy[FuelType::Lng] = 50.0;

        let alloc = allocate_preferential(90.0, &energy);
        assert_eq!(alloc[FuelType::Lng], 50.0);
        assert_eq!(alloc[FuelType::Mgo], 30.0);
        assert_eq!(alloc[FuelType::Lfo], 0.0);
        assert_eq!(alloc[FuelType::Hfo], 10.0);

        let none = allocate_preferential(-5.0, &energy);
        assert_eq!(none, PerFuel::splat(0.0));
    }

    #[test]
    fn reallocation_prefers_lng_on_half_legs() {
        // 10 t HFO + 10 t LNG on an inbound leg: half the energy applies and
        // LNG alone covers more than that budget.
        let legs = apply_reallocated(&[leg(Category::Start, 0.0, 0.0), leg(Category::Inbound, 10.0, 10.0)]);
        let r = &legs[1].reallocated;
        let total = 10.0 * 40500.0 + 10.0 * 49100.0;
        assert!(close(r.total_energy, total));
        assert!(close(r.applicable_energy, total / 2.0));
        assert!(close(r.efficient_energy[FuelType::Lng], total / 2.0));
        assert_eq!(r.efficient_energy[FuelType::Hfo], 0.0);
        assert!(close(r.ghg_intensity, 75.176));
        assert!(r.compliance_balance > 0.0);
        assert!(close(r.cumulative_penalty, r.penalty));
    }

    #[test]
    fn reallocated_totals_accumulate_per_leg() {
        let legs = apply_reallocated(&[
            leg(Category::Start, 0.0, 0.0),
            leg(Category::Bound, 20.0, 0.0),
            leg(Category::Bound, 30.0, 0.0),
        ]);
        let sum_balance = legs[1].reallocated.compliance_balance + legs[2].reallocated.compliance_balance;
        let sum_penalty = legs[1].reallocated.penalty + legs[2].reallocated.penalty;
        assert!(close(legs[2].reallocated.cumulative_balance, sum_balance));
        assert!(close(legs[2].reallocated.cumulative_penalty, sum_penalty));
    }

    #[test]
    fn breakdown_for_pure_hfo() {
        let legs = apply_pooled(&[leg(Category::Start, 0.0, 0.0), leg(Category::Bound, 100.0, 0.0)]);
        let b = IntensityBreakdown::from_legs(&legs);
        assert_eq!(b.wtt, 13.5);
        assert!(close(b.ttw, round3(3.16889 / 0.0405)));
        assert!(b.cb_def <= 0.0);
        assert_eq!(b.ghg_intensity_target, 89.337);
    }

    #[test]
    fn penalty_guard() {
        assert_eq!(penalty_eur(1000.0, 0.0), 0.0);
        assert_eq!(penalty_eur(f64::NAN, 90.0), 0.0);
    }
}
