//! OBIS reference codes recognised in P1 data lines.
//!
//! Dispatch from a code to its destination field is a static table scan:
//! supporting another meter quantity means adding a row, not a branch.

use std::fmt;

use super::EnergyReading;

/// Unit suffix a data line value must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Cumulative energy counter (`*kWh`)
    KilowattHour,
    /// Instantaneous power (`*kW`)
    Kilowatt,
}

impl Unit {
    /// The suffix literal as it appears on the wire, without the `*`.
    pub const fn suffix(self) -> &'static str {
        match self {
            Unit::KilowattHour => "kWh",
            Unit::Kilowatt => "kW",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// One row of the OBIS dispatch table.
pub(crate) struct ObisMapping {
    /// Code prefix, as seen after the medium/channel marker is dropped.
    pub code: &'static [u8],
    /// Expected unit suffix for the value.
    pub unit: Unit,
    /// Destination field on the reading.
    pub field: fn(&mut EnergyReading) -> &mut f64,
}

/// Known OBIS codes in lookup order.
///
/// Lines whose code is not listed here are silently ignored.
pub(crate) static OBIS_TABLE: &[ObisMapping] = &[
    // Cumulative tariff counters (kWh)
    ObisMapping {
        code: b"1.8.1",
        unit: Unit::KilowattHour,
        field: |r| &mut r.consumption_tariff1,
    },
    ObisMapping {
        code: b"1.8.2",
        unit: Unit::KilowattHour,
        field: |r| &mut r.consumption_tariff2,
    },
    ObisMapping {
        code: b"2.8.1",
        unit: Unit::KilowattHour,
        field: |r| &mut r.feed_in_tariff1,
    },
    ObisMapping {
        code: b"2.8.2",
        unit: Unit::KilowattHour,
        field: |r| &mut r.feed_in_tariff2,
    },
    // Instantaneous power, both directions (kW)
    ObisMapping {
        code: b"1.7.0",
        unit: Unit::Kilowatt,
        field: |r| &mut r.current_consumption,
    },
    ObisMapping {
        code: b"2.7.0",
        unit: Unit::Kilowatt,
        field: |r| &mut r.current_feed_in,
    },
    // Per-phase instantaneous power (kW)
    ObisMapping {
        code: b"21.7.0",
        unit: Unit::Kilowatt,
        field: |r| &mut r.phase_consumption_l1,
    },
    ObisMapping {
        code: b"41.7.0",
        unit: Unit::Kilowatt,
        field: |r| &mut r.phase_consumption_l2,
    },
    ObisMapping {
        code: b"61.7.0",
        unit: Unit::Kilowatt,
        field: |r| &mut r.phase_consumption_l3,
    },
    ObisMapping {
        code: b"22.7.0",
        unit: Unit::Kilowatt,
        field: |r| &mut r.phase_feed_in_l1,
    },
    ObisMapping {
        code: b"42.7.0",
        unit: Unit::Kilowatt,
        field: |r| &mut r.phase_feed_in_l2,
    },
    ObisMapping {
        code: b"62.7.0",
        unit: Unit::Kilowatt,
        field: |r| &mut r.phase_feed_in_l3,
    },
];

/// Find the table row whose code prefixes `line`.
pub(crate) fn lookup(line: &[u8]) -> Option<&'static ObisMapping> {
    OBIS_TABLE.iter().find(|mapping| line.starts_with(mapping.code))
}
