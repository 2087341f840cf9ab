//! Parsing of verbatim UTM coordinate strings such as `"9N 300457 5884632"`.

use sims_core::ResolvedCoordinate;

/// EPSG base for WGS 84 / UTM northern-hemisphere zones (`32601`..=`32660`).
const NORTHERN_SRID_BASE: i32 = 32_600;
/// EPSG base for WGS 84 / UTM southern-hemisphere zones (`32701`..=`32760`).
const SOUTHERN_SRID_BASE: i32 = 32_700;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hemisphere {
    North,
    South,
}

/// Parses `"<zone>[N|S] <easting> <northing>"` into a [`ResolvedCoordinate`].
///
/// Tokens are whitespace separated and there must be exactly three. A zone
/// without a hemisphere letter is northern. Returns `None` for empty input,
/// a zone outside `1..=60`, any other hemisphere letter, or an easting or
/// northing that is not a finite non-negative number.
#[must_use]
pub fn parse_utm(verbatim: &str) -> Option<ResolvedCoordinate> {
    let mut tokens = verbatim.split_whitespace();
    let zone_token = tokens.next()?;
    let easting_token = tokens.next()?;
    let northing_token = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }

    let (zone, hemisphere) = parse_zone(zone_token)?;
    let easting = parse_distance(easting_token)?;
    let northing = parse_distance(northing_token)?;

    Some(ResolvedCoordinate {
        easting,
        northing,
        zone_srid: zone_srid(zone, hemisphere),
    })
}

fn zone_srid(zone: i32, hemisphere: Hemisphere) -> i32 {
    match hemisphere {
        Hemisphere::North => NORTHERN_SRID_BASE + zone,
        Hemisphere::South => SOUTHERN_SRID_BASE + zone,
    }
}

/// Splits `"9N"` into `(9, North)`. Digits must be one or two ASCII digits.
fn parse_zone(token: &str) -> Option<(i32, Hemisphere)> {
    let (digits, hemisphere) = match token.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => {
            let hemisphere = match c.to_ascii_uppercase() {
                'N' => Hemisphere::North,
                'S' => Hemisphere::South,
                _ => return None,
            };
            (&token[..idx], hemisphere)
        }
        _ => (token, Hemisphere::North),
    };

    if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let zone: i32 = digits.parse().ok()?;
    (1..=60).contains(&zone).then_some((zone, hemisphere))
}

/// Easting or northing in metres. An explicit `+` sign is accepted; a
/// negative distance is not.
fn parse_distance(token: &str) -> Option<f64> {
    if token.starts_with('-') {
        return None;
    }
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_northern_zone_with_letter() {
        let coord = parse_utm("9N 300457 5884632").unwrap();
        assert_eq!(coord.zone_srid, 32609);
        assert!((coord.easting - 300_457.0).abs() < f64::EPSILON);
        assert!((coord.northing - 5_884_632.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_southern_zone() {
        let coord = parse_utm("33S 500000 4649776").unwrap();
        assert_eq!(coord.zone_srid, 32733);
    }

    #[test]
    fn zone_without_letter_is_northern() {
        assert_eq!(parse_utm("10 500000 5400000").unwrap().zone_srid, 32610);
    }

    #[test]
    fn hemisphere_letter_is_case_insensitive() {
        assert_eq!(parse_utm("9n 1 2").unwrap().zone_srid, 32609);
        assert_eq!(parse_utm("9s 1 2").unwrap().zone_srid, 32709);
    }

    #[test]
    fn every_zone_maps_to_a_distinct_srid_per_hemisphere() {
        for zone in 1..=60 {
            let north = parse_utm(&format!("{zone}N 100 200")).unwrap();
            let south = parse_utm(&format!("{zone}S 100 200")).unwrap();
            assert_eq!(north.zone_srid, 32_600 + zone);
            assert_eq!(south.zone_srid, 32_700 + zone);
            assert!((north.easting - 100.0).abs() < f64::EPSILON);
            assert!((south.northing - 200.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn accepts_decimal_values_and_extra_whitespace() {
        let coord = parse_utm("  11N   512345.5\t5432100.25 ").unwrap();
        assert_eq!(coord.zone_srid, 32611);
        assert!((coord.easting - 512_345.5).abs() < f64::EPSILON);
        assert!((coord.northing - 5_432_100.25).abs() < f64::EPSILON);
    }

    #[test]
    fn accepts_explicit_plus_sign_on_distances() {
        let coord = parse_utm("9N +300457 +5884632").unwrap();
        assert_eq!(coord.zone_srid, 32609);
        assert!((coord.easting - 300_457.0).abs() < f64::EPSILON);
        assert!((coord.northing - 5_884_632.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_empty_and_blank_input() {
        assert!(parse_utm("").is_none());
        assert!(parse_utm("   ").is_none());
    }

    #[test]
    fn rejects_missing_tokens() {
        assert!(parse_utm("9N").is_none());
        assert!(parse_utm("9N 300457").is_none());
    }

    #[test]
    fn rejects_extra_tokens() {
        assert!(parse_utm("9N 300457 5884632 12").is_none());
    }

    #[test]
    fn rejects_non_numeric_tokens() {
        assert!(parse_utm("9N east 5884632").is_none());
        assert!(parse_utm("9N 300457 north").is_none());
        assert!(parse_utm("9N NaN 5884632").is_none());
        assert!(parse_utm("9N inf 5884632").is_none());
        assert!(parse_utm("9N -300457 5884632").is_none());
        assert!(parse_utm("9N 300457 -0").is_none());
        assert!(parse_utm("9N +inf 5884632").is_none());
    }

    #[test]
    fn rejects_out_of_range_or_malformed_zones() {
        assert!(parse_utm("0N 1 2").is_none());
        assert!(parse_utm("61N 1 2").is_none());
        assert!(parse_utm("100 1 2").is_none());
        assert!(parse_utm("N 1 2").is_none());
        assert!(parse_utm("9X 1 2").is_none());
        assert!(parse_utm("-9N 1 2").is_none());
    }
}
