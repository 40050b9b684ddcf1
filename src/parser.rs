//! P1 telegram field parser.
//!
//! This module turns one complete telegram frame into a structured
//! [`EnergyReading`]. Extraction is best-effort: a bad data line yields a
//! [`FieldError`] and leaves its field at zero, it never aborts the rest
//! of the telegram.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::bytes::Regex;

use crate::error::FieldError;
use crate::types::{obis, EnergyReading, Unit};

/// Shortest byte length a data line can have after control bytes are
/// stripped; anything shorter is not a data line.
const MIN_DATA_LINE_LEN: usize = 10;

/// Width of the medium/channel marker in front of the OBIS code (`1-0:`).
const LINE_PREFIX_LEN: usize = 4;

fn kwh_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([0-9]*(?:\.[0-9]+)?)\*kWh").expect("kWh extractor pattern is valid")
    })
}

fn kw_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"([0-9]*(?:\.[0-9]+)?)\*kW").expect("kW extractor pattern is valid")
    })
}

/// Parse one telegram frame into a reading plus per-line errors.
///
/// Lines whose OBIS code is unknown are silently ignored, so a telegram
/// without a single known data line yields an all-zero reading and an
/// empty error list. Tariff totals are derived by plain summation after
/// the line pass.
///
/// # Example
///
/// ```rust,ignore
/// let (reading, errors) = parse_telegram(&frame);
/// if errors.is_empty() {
///     println!("drawing {} kW", reading.current_consumption);
/// }
/// ```
pub fn parse_telegram(telegram: &[u8]) -> (EnergyReading, Vec<FieldError>) {
    let mut reading = EnergyReading::default();
    let mut errors = Vec::new();

    for raw_line in telegram.split(|&b| b == b'\n') {
        let line = raw_line.strip_suffix(b"\r").unwrap_or(raw_line);
        let line: Cow<'_, [u8]> = if line.contains(&0) {
            Cow::Owned(line.iter().copied().filter(|&b| b != 0).collect())
        } else {
            Cow::Borrowed(line)
        };

        if line.len() < MIN_DATA_LINE_LEN {
            continue;
        }

        // `1-0:` medium/channel marker, not used for dispatch
        let line = &line[LINE_PREFIX_LEN..];

        if let Some(mapping) = obis::lookup(line) {
            match extract_value(line, mapping) {
                Ok(value) => *(mapping.field)(&mut reading) = value,
                Err(err) => errors.push(err),
            }
        }
    }

    reading.derive_totals();
    (reading, errors)
}

/// Pull the `value*unit` numeral out of a matched data line.
fn extract_value(line: &[u8], mapping: &obis::ObisMapping) -> Result<f64, FieldError> {
    let pattern = match mapping.unit {
        Unit::KilowattHour => kwh_pattern(),
        Unit::Kilowatt => kw_pattern(),
    };

    let rest = &line[mapping.code.len()..];
    let captures = pattern.captures(rest).ok_or_else(|| FieldError::ValueNotFound {
        line: String::from_utf8_lossy(line).into_owned(),
        unit: mapping.unit,
    })?;

    let value = captures.get(1).map(|m| m.as_bytes()).unwrap_or_default();
    let value = String::from_utf8_lossy(value);
    value.parse::<f64>().map_err(|err| FieldError::InvalidNumber {
        line: String::from_utf8_lossy(line).into_owned(),
        value: value.clone().into_owned(),
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINGLE_PHASE: &[u8] = b"/ISK5\\2M550T-1012\r\n\r\n\
1-3:0.2.8(50)\r\n\
0-0:1.0.0(210314191643W)\r\n\
0-0:96.1.1(4530303434303037333936383235323137)\r\n\
1-0:1.8.1(013977.847*kWh)\r\n\
1-0:1.8.2(014745.839*kWh)\r\n\
1-0:2.8.1(000000.000*kWh)\r\n\
1-0:2.8.2(000000.000*kWh)\r\n\
0-0:96.14.0(0002)\r\n\
1-0:1.7.0(00.167*kW)\r\n\
1-0:2.7.0(00.000*kW)\r\n\
0-0:96.7.21(00005)\r\n\
0-0:96.7.9(00003)\r\n\
1-0:32.32.0(00001)\r\n\
0-0:96.13.0()\r\n\
!8F46";

    const WITH_FEED_IN: &[u8] = b"/KFM5KAIFA-METER\r\n\r\n\
1-3:0.2.8(42)\r\n\
0-0:1.0.0(210314191643W)\r\n\
1-0:1.8.1(002536.701*kWh)\r\n\
1-0:1.8.2(001830.239*kWh)\r\n\
1-0:2.8.1(000406.811*kWh)\r\n\
1-0:2.8.2(001032.602*kWh)\r\n\
0-0:96.14.0(0001)\r\n\
1-0:1.7.0(00.000*kW)\r\n\
1-0:2.7.0(01.161*kW)\r\n\
1-0:21.7.0(00.000*kW)\r\n\
1-0:22.7.0(01.161*kW)\r\n\
!A1B2";

    const THREE_PHASE: &[u8] = b"/Ene5\\T210-D ESMR5.0\r\n\r\n\
1-0:1.8.1(000002.835*kWh)\r\n\
1-0:1.8.2(000004.785*kWh)\r\n\
1-0:2.8.1(000000.000*kWh)\r\n\
1-0:2.8.2(000003.485*kWh)\r\n\
1-0:1.7.0(00.058*kW)\r\n\
1-0:2.7.0(00.000*kW)\r\n\
1-0:21.7.0(00.000*kW)\r\n\
1-0:41.7.0(00.000*kW)\r\n\
1-0:61.7.0(00.207*kW)\r\n\
1-0:22.7.0(00.000*kW)\r\n\
1-0:42.7.0(00.144*kW)\r\n\
1-0:62.7.0(00.000*kW)\r\n\
!F00D";

    #[test]
    fn test_parse_single_phase_telegram() {
        let (reading, errors) = parse_telegram(SINGLE_PHASE);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(
            reading,
            EnergyReading {
                consumption_tariff1: 13977.847,
                consumption_tariff2: 14745.839,
                consumption_total: 28723.686,
                current_consumption: 0.167,
                ..EnergyReading::default()
            }
        );
    }

    #[test]
    fn test_parse_telegram_with_feed_in() {
        let (reading, errors) = parse_telegram(WITH_FEED_IN);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(
            reading,
            EnergyReading {
                consumption_tariff1: 2536.701,
                consumption_tariff2: 1830.239,
                consumption_total: 2536.701 + 1830.239,
                feed_in_tariff1: 406.811,
                feed_in_tariff2: 1032.602,
                feed_in_total: 406.811 + 1032.602,
                current_feed_in: 1.161,
                phase_feed_in_l1: 1.161,
                ..EnergyReading::default()
            }
        );
        // Raw f64 summation is passed through, artifacts included.
        assert_eq!(reading.consumption_total, 4366.9400000000005);
    }

    #[test]
    fn test_parse_three_phase_telegram() {
        let (reading, errors) = parse_telegram(THREE_PHASE);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(
            reading,
            EnergyReading {
                consumption_tariff1: 2.835,
                consumption_tariff2: 4.785,
                consumption_total: 2.835 + 4.785,
                feed_in_tariff2: 3.485,
                feed_in_total: 3.485,
                current_consumption: 0.058,
                phase_consumption_l3: 0.207,
                phase_feed_in_l2: 0.144,
                ..EnergyReading::default()
            }
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = parse_telegram(WITH_FEED_IN);
        let second = parse_telegram(WITH_FEED_IN);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_code_is_ignored() {
        let telegram = b"/ISK5\\2M550T-1012\r\n\r\n\
1-0:1.8.1(013977.847*kWh)\r\n\
1-0:3.8.1(000123.456*kWh)\r\n\
!8F46";
        let (reading, errors) = parse_telegram(telegram);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(reading.consumption_tariff1, 13977.847);
        assert_eq!(reading.consumption_total, 13977.847);
    }

    #[test]
    fn test_malformed_value_only_affects_its_field() {
        let telegram = b"/ISK5\\2M550T-1012\r\n\r\n\
1-0:1.8.1(banana*kWh)\r\n\
1-0:1.8.2(014745.839*kWh)\r\n\
!8F46";
        let (reading, errors) = parse_telegram(telegram);

        assert_eq!(reading.consumption_tariff1, 0.0);
        assert_eq!(reading.consumption_tariff2, 14745.839);
        assert_eq!(reading.consumption_total, 14745.839);

        assert_eq!(errors.len(), 1);
        match &errors[0] {
            FieldError::InvalidNumber { line, .. } => assert!(line.contains("1.8.1")),
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_unit_is_an_error() {
        let telegram = b"/ISK5\\2M550T-1012\r\n\r\n\
1-0:1.8.1(000123.456*kW)\r\n\
!8F46";
        let (reading, errors) = parse_telegram(telegram);

        assert_eq!(reading.consumption_tariff1, 0.0);
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            FieldError::ValueNotFound { line, unit } => {
                assert!(line.contains("1.8.1"));
                assert_eq!(*unit, Unit::KilowattHour);
            }
            other => panic!("expected ValueNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_nul_bytes_are_stripped() {
        let telegram = b"/ISK5\\2M550T-1012\r\n\r\n\
1-0:1.8.1(0139\x0077.847*kWh)\r\n\
1-0:1.8.2(014745.839*kWh)\x00\x00\r\n\
!8F46";
        let (reading, errors) = parse_telegram(telegram);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(reading.consumption_tariff1, 13977.847);
        assert_eq!(reading.consumption_tariff2, 14745.839);
    }

    #[test]
    fn test_short_lines_are_skipped() {
        // 9 bytes: would carry an OBIS code but is below the data-line
        // minimum, so it must not be dispatched.
        let telegram = b"/IS\r\n1-0:1.8.1\r\n1.8.1(1)\r\n!8F46";
        let (reading, errors) = parse_telegram(telegram);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(reading, EnergyReading::default());
    }

    #[test]
    fn test_empty_telegram_yields_zero_reading() {
        let (reading, errors) = parse_telegram(b"");

        assert!(errors.is_empty());
        assert_eq!(reading, EnergyReading::default());
    }

    #[test]
    fn test_value_without_fraction() {
        let telegram = b"/ISK5\\2M550T-1012\r\n\r\n1-0:1.8.1(013977*kWh)\r\n!8F46";
        let (reading, errors) = parse_telegram(telegram);

        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert_eq!(reading.consumption_tariff1, 13977.0);
    }
}
