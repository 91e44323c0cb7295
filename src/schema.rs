/// Column-name constants for voyage-tracekit tables.
/// Single source of truth - exported to Python via PyO3.

// ── Phase event columns ─────────────────────────────────────────────────────
pub mod event {
    pub const VESSEL_NAME: &str = "vessel_name";
    pub const PHASE: &str = "phase";
    pub const PHASE_END_DATE: &str = "phase_end_date";
    pub const START_PORT: &str = "start_port";
    pub const END_PORT: &str = "end_port";
    pub const CARGO_MT: &str = "cargo_mt";

    pub const HFO_ROB: &str = "hfo_rob";
    pub const LFO_ROB: &str = "lfo_rob";
    pub const MGO_ROB: &str = "mgo_rob";
    pub const LNG_ROB: &str = "lng_rob";

    pub const HFO_BDN: &str = "hfo_bdn";
    pub const LFO_BDN: &str = "lfo_bdn";
    pub const MGO_BDN: &str = "mgo_bdn";
    pub const LNG_BDN: &str = "lng_bdn";

    /// Indexed the same as `FuelType::ALL`.
    pub const ROB: [&str; 4] = [HFO_ROB, LFO_ROB, MGO_ROB, LNG_ROB];
    pub const BDN: [&str; 4] = [HFO_BDN, LFO_BDN, MGO_BDN, LNG_BDN];

    pub const REQUIRED: [&str; 14] = [
        VESSEL_NAME,
        PHASE,
        PHASE_END_DATE,
        START_PORT,
        END_PORT,
        CARGO_MT,
        HFO_ROB,
        LFO_ROB,
        MGO_ROB,
        LNG_ROB,
        HFO_BDN,
        LFO_BDN,
        MGO_BDN,
        LNG_BDN,
    ];
}

// ── Phase values ────────────────────────────────────────────────────────────
pub mod phase {
    pub const ALL_FAST: &str = "ALL FAST";
    pub const LAST_LINE: &str = "LAST LINE";
    pub const EOSP: &str = "EOSP";
}

// ── Port reference columns ──────────────────────────────────────────────────
pub mod port {
    pub const PORT_CODE: &str = "Port Code";
    pub const EU_PORTS: &str = "EU Ports";
    pub const OMR: &str = "OMR";
    pub const COUNTRY: &str = "Country";
}

// ── Country reference columns ───────────────────────────────────────────────
pub mod country {
    pub const COUNTRY: &str = "Country";
    pub const EU_STATUS: &str = "EU Status";
    /// Optional. Two-letter UN/LOCODE prefix matched against unlisted ports.
    pub const COUNTRY_CODE: &str = "Country Code";
}

// ── Vessel type reference columns ───────────────────────────────────────────
pub mod vessel {
    pub const VESSEL_NAME: &str = "vessel_name";
    pub const VESSEL_TYPE: &str = "vessel_type";
}

// ── Jurisdiction values ─────────────────────────────────────────────────────
pub mod membership {
    pub const EU: &str = "EU";
    pub const NON_EU: &str = "Non-EU";
    pub const YES: &str = "Yes";
    pub const NO: &str = "No";
}

// ── Leg table columns ───────────────────────────────────────────────────────
pub mod leg {
    pub const PHASE_END_DATE: &str = "phase_end_date";
    pub const PHASE: &str = "phase";
    pub const PORT: &str = "port";
    pub const START_PORT: &str = "start_port";
    pub const END_PORT: &str = "end_port";
    pub const CARGO_MT: &str = "cargo_mt";

    pub const CAL_HFO_CON: &str = "cal_hfo_con";
    pub const CAL_LFO_CON: &str = "cal_lfo_con";
    pub const CAL_MGO_CON: &str = "cal_mgo_con";
    pub const CAL_LNG_CON: &str = "cal_lng_con";
    pub const CAL_CON: [&str; 4] = [CAL_HFO_CON, CAL_LFO_CON, CAL_MGO_CON, CAL_LNG_CON];

    pub const COUNTRY_CODE: &str = "Country Code";
    pub const OMR: &str = "OMR";
    pub const CARBON_EMITTED: &str = "Carbon emitted";
    pub const CATEGORY: &str = "Category";
    pub const EUAS: &str = "EUAs";

    pub const CAL_FUELEU_CON: [&str; 4] = [
        "cal_FuelEU_hfo_con",
        "cal_FuelEU_lfo_con",
        "cal_FuelEU_mgo_con",
        "cal_FuelEU_lng_con",
    ];
}

// ── FuelEU leg columns (pooled, no reallocation) ────────────────────────────
pub mod pooled {
    pub const ENERGY: &str = "Energy";
    pub const WTW_CO2EQ: &str = "WtW CO2eq";
    pub const CUMULATIVE_ENERGY: &str = "Cumulative Energy";
    pub const CUMULATIVE_WTW_CO2EQ: &str = "Cumulative WtW CO2eq";
    pub const GHG_INTENSITY: &str = "GHG Intensity";
    pub const COMPLIANCE_BALANCE: &str = "Compliance Balance";
    pub const PENALTY: &str = "Penalty";
}

// ── FuelEU leg columns (with reallocation) ──────────────────────────────────
pub mod reallocated {
    pub const TOTAL_ENERGY: &str = "Total Energy";
    pub const APPLICABLE_ENERGY: &str = "Applicable Energy";
    pub const EFFICIENT_ENERGY: [&str; 4] = [
        "HFO Efficient Energy",
        "LFO Efficient Energy",
        "MGO Efficient Energy",
        "LNG Efficient Energy",
    ];
    pub const GHG_INTENSITY: &str = "GHG Intensity (Reallocated)";
    pub const COMPLIANCE_BALANCE: &str = "Compliance Balance (Reallocated)";
    pub const PENALTY: &str = "Penalty (Reallocated)";
    pub const CUMULATIVE_COMPLIANCE_BALANCE: &str = "Cumulative Compliance Balance";
    pub const CUMULATIVE_PENALTY: &str = "Cumulative Penalty";
}

// ── EUA summary columns ─────────────────────────────────────────────────────
pub mod eua_summary {
    pub const FROM: &str = "From";
    pub const TO: &str = "To";
    pub const CO2_EMITTED: &str = "CO2 Emitted (mt)";
    pub const EUAS: &str = "EUAs";
}

// ── FuelEU summary columns ──────────────────────────────────────────────────
pub mod fueleu_summary {
    pub const BALANCE_WITHOUT: &str = "Compliance Balance (without reallocation)";
    pub const PENALTY_WITHOUT: &str = "Penalty EUR (without reallocation)";
    pub const BALANCE_WITH: &str = "Compliance Balance (with reallocation)";
    pub const PENALTY_WITH: &str = "Penalty EUR (with reallocation)";
    pub const WTT: &str = "WtT";
    pub const TTW: &str = "TtW";
    pub const GHG_INTS_ACT: &str = "GHG_Ints_Act";
    pub const GHG_INTS_TAR: &str = "GHG_Ints_Tar";
    pub const CB_DEF: &str = "CB_Def";
    pub const BREAKDOWN_PENALTY: &str = "Penalty (EUR)";
}

/// Timestamp rendering used in every produced table.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
