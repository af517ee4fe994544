//! Property tests for the decimal degree and rational DMS conversions.
#![expect(
    clippy::float_arithmetic,
    reason = "round trips are checked within a tolerance"
)]

use mapmark_core::coord::{
    GpsReference, RATIONAL_TOLERANCE, SECONDS_DENOMINATOR, from_rational, to_rational,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn latitude_survives_a_round_trip(latitude in -90.0_f64..=90.0) {
        let reference = GpsReference::for_latitude(latitude);
        let decoded = from_rational(to_rational(latitude), reference).expect("valid denominators");
        prop_assert!((decoded - latitude).abs() <= RATIONAL_TOLERANCE);
    }

    #[test]
    fn longitude_survives_a_round_trip(longitude in -180.0_f64..=180.0) {
        let reference = GpsReference::for_longitude(longitude);
        let decoded = from_rational(to_rational(longitude), reference).expect("valid denominators");
        prop_assert!((decoded - longitude).abs() <= RATIONAL_TOLERANCE);
    }

    #[test]
    fn terms_stay_in_range(degrees in -180.0_f64..=180.0) {
        let value = to_rational(degrees);
        prop_assert_eq!(value.degrees.denominator, 1);
        prop_assert_eq!(value.minutes.denominator, 1);
        prop_assert_eq!(value.seconds.denominator, SECONDS_DENOMINATOR);
        prop_assert!(value.minutes.numerator < 60);
        prop_assert!(value.seconds.numerator < 60 * SECONDS_DENOMINATOR);
        prop_assert!(value.degrees.numerator <= 180);
    }
}
