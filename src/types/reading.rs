//! Structured energy readings.
//!
//! One [`EnergyReading`] is produced per parsed telegram. Readings carry
//! no identity across telegrams; consumers keep their own last-known
//! values if they need staleness semantics.

/// Typed measurement record extracted from a single P1 telegram.
///
/// Every field is populated from its OBIS data line when the telegram
/// contains one and left at `0.0` otherwise. Cumulative `kWh` fields are
/// monotonic meter counters; `kW` fields are instantaneous rates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnergyReading {
    /// Cumulative consumption, tariff 1 (kWh) — OBIS 1.8.1
    pub consumption_tariff1: f64,
    /// Cumulative consumption, tariff 2 (kWh) — OBIS 1.8.2
    pub consumption_tariff2: f64,
    /// Cumulative consumption, both tariffs summed (kWh)
    pub consumption_total: f64,

    /// Cumulative feed-in, tariff 1 (kWh) — OBIS 2.8.1
    pub feed_in_tariff1: f64,
    /// Cumulative feed-in, tariff 2 (kWh) — OBIS 2.8.2
    pub feed_in_tariff2: f64,
    /// Cumulative feed-in, both tariffs summed (kWh)
    pub feed_in_total: f64,

    /// Instantaneous consumption (kW) — OBIS 1.7.0
    pub current_consumption: f64,
    /// Instantaneous feed-in (kW) — OBIS 2.7.0
    pub current_feed_in: f64,

    /// Instantaneous power drawn on phase L1 (kW) — OBIS 21.7.0
    pub phase_consumption_l1: f64,
    /// Instantaneous power drawn on phase L2 (kW) — OBIS 41.7.0
    pub phase_consumption_l2: f64,
    /// Instantaneous power drawn on phase L3 (kW) — OBIS 61.7.0
    pub phase_consumption_l3: f64,

    /// Instantaneous power fed back on phase L1 (kW) — OBIS 22.7.0
    pub phase_feed_in_l1: f64,
    /// Instantaneous power fed back on phase L2 (kW) — OBIS 42.7.0
    pub phase_feed_in_l2: f64,
    /// Instantaneous power fed back on phase L3 (kW) — OBIS 62.7.0
    pub phase_feed_in_l3: f64,
}

impl EnergyReading {
    /// Fill in the summed totals from the tariff counters.
    ///
    /// Plain f64 addition; summation artifacts are passed through rather
    /// than rounded away.
    pub(crate) fn derive_totals(&mut self) {
        self.consumption_total = self.consumption_tariff1 + self.consumption_tariff2;
        self.feed_in_total = self.feed_in_tariff1 + self.feed_in_tariff2;
    }
}
