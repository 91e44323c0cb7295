//! Fuel types and the fixed regulatory constants attached to them.

use std::fmt;
use std::ops::{Index, IndexMut};

/// Marine fuel types tracked per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FuelType {
    Hfo,
    Lfo,
    Mgo,
    Lng,
}

impl FuelType {
    /// Column order used by every per-fuel array in the crate.
    pub const ALL: [FuelType; 4] = [Self::Hfo, Self::Lfo, Self::Mgo, Self::Lng];

    /// Preferential allocation order for FuelEU reallocation, best GHG intensity first.
    pub const PREFERENCE: [FuelType; 4] = [Self::Lng, Self::Mgo, Self::Lfo, Self::Hfo];

    pub fn index(self) -> usize {
        match self {
            Self::Hfo => 0,
            Self::Lfo => 1,
            Self::Mgo => 2,
            Self::Lng => 3,
        }
    }

    /// Tonnes CO2 per tonne fuel (EU ETS).
    pub fn emission_factor(self) -> f64 {
        match self {
            Self::Hfo => 3.114,
            Self::Lfo => 3.151,
            Self::Mgo => 3.206,
            Self::Lng => 2.75,
        }
    }

    /// Lower calorific value, used as-is as the energy multiplier.
    pub fn lcv(self) -> f64 {
        match self {
            Self::Hfo => 40500.0,
            Self::Lfo => 41000.0,
            Self::Mgo => 42700.0,
            Self::Lng => 49100.0,
        }
    }

    /// Well-to-wake CO2-equivalent per tonne fuel.
    pub fn wtw_factor(self) -> f64 {
        match self {
            Self::Hfo => 3.71564,
            Self::Lfo => 3.74709,
            Self::Mgo => 3.87577,
            Self::Lng => 3.69113,
        }
    }

    /// Actual GHG intensity of the fuel in gCO2eq/MJ.
    pub fn ghg_intensity(self) -> f64 {
        match self {
            Self::Hfo => 91.744,
            Self::Lfo => 91.392,
            Self::Mgo => 90.767,
            Self::Lng => 75.176,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Hfo => "HFO",
            Self::Lfo => "LFO",
            Self::Mgo => "MGO",
            Self::Lng => "LNG",
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// FuelEU 2025 target GHG intensity, gCO2eq/MJ.
pub const TARGET_GHG_INTENSITY: f64 = 89.34;

/// FuelEU penalty rate, EUR per tonne VLSFO-equivalent.
pub const PENALTY_RATE_EUR: f64 = 2400.0;

/// Reference energy density of VLSFO used by the penalty formula.
pub const VLSFO_REFERENCE_ENERGY: f64 = 41000.0;

/// Share of emissions surrendered as EUAs for the current phase-in year.
pub const EUA_PHASE_IN: f64 = 0.7;

/// A fixed array of values, one per fuel type, indexed by `FuelType`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerFuel<T>(pub [T; 4]);

impl<T: Copy> PerFuel<T> {
    pub fn splat(value: T) -> Self {
        Self([value; 4])
    }

    pub fn iter(&self) -> impl Iterator<Item = (FuelType, T)> + '_ {
        FuelType::ALL.iter().map(move |&fuel| (fuel, self[fuel]))
    }

    pub fn map<U>(&self, mut f: impl FnMut(FuelType, T) -> U) -> PerFuel<U> {
        PerFuel(FuelType::ALL.map(|fuel| f(fuel, self[fuel])))
    }
}

impl<T> Index<FuelType> for PerFuel<T> {
    type Output = T;

    fn index(&self, fuel: FuelType) -> &T {
        &self.0[fuel.index()]
    }
}

impl<T> IndexMut<FuelType> for PerFuel<T> {
    fn index_mut(&mut self, fuel: FuelType) -> &mut T {
        &mut self.0[fuel.index()]
    }
}

/// Round half away from zero to 3 decimals.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Replace NaN/Infinity with `fallback`.
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_fuel_index_follows_fuel_order() {
        let mut values = PerFuel::splat(0.0);
        values[FuelType::Mgo] = 2.5;
        assert_eq!(values.0, [0.0, 0.0, 2.5, 0.0]);
        assert_eq!(values[FuelType::Mgo], 2.5);
    }

    #[test]
    fn fuel_intensity_matches_wtw_over_lcv() {
        for fuel in FuelType::ALL {
            let derived = fuel.wtw_factor() / fuel.lcv() * 1e6;
            assert!((derived - fuel.ghg_intensity()).abs() < 0.01, "{fuel}");
        }
    }

    #[test]
    fn round3_and_finite_guard() {
        assert_eq!(round3(43.5964), 43.596);
        assert_eq!(round3(-2.0004), -2.0);
        assert_eq!(finite_or(f64::NAN, 89.34), 89.34);
        assert_eq!(finite_or(f64::INFINITY, 0.0), 0.0);
        assert_eq!(finite_or(1.5, 0.0), 1.5);
    }
}
