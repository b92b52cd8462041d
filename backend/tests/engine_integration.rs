mod support;

use chrono::{Datelike, Duration, Timelike};
use proptest::prelude::*;

use salah::error::PrayerError;
use salah::models::{CalculationMethod, GeoCoordinate, Prayer};
use salah::services::{
    qibla_direction, EngineConfig, HighLatitudeFallback, PrayerEngine, ScheduleSource,
};
use support::{at, date, offset_hours};

#[test]
fn test_every_method_produces_an_ordered_schedule_in_mecca() {
    let engine = PrayerEngine::default();
    for method in CalculationMethod::ALL {
        let schedule = engine
            .compute_schedule(date(2024, 3, 20), &GeoCoordinate::MECCA, method, offset_hours(3))
            .unwrap();

        let times: Vec<_> = schedule.iter().map(|(_, t)| t).collect();
        assert!(
            times.windows(2).all(|w| w[0] < w[1]),
            "{} is not strictly ordered",
            method
        );
        assert!(!schedule.is_adjusted(), "{} should not need a fallback", method);
        assert_eq!(schedule.method(), method);
    }
}

#[test]
fn test_a_year_in_london_keeps_its_order() {
    let engine = PrayerEngine::default();
    let london = GeoCoordinate::new(51.5074, -0.1278).unwrap();
    let mut day = date(2024, 1, 1);

    while day.year() == 2024 {
        let schedule = engine
            .compute_schedule(day, &london, CalculationMethod::MuslimWorldLeague, offset_hours(0))
            .unwrap();
        let times: Vec<_> = schedule.iter().map(|(_, t)| t).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]), "unordered on {}", day);
        day += Duration::days(1);
    }
}

#[test]
fn test_summer_fallback_depends_on_configuration() {
    let london = GeoCoordinate::new(51.5074, -0.1278).unwrap();
    let midsummer = date(2024, 6, 21);

    let nearest = PrayerEngine::default()
        .compute_schedule(midsummer, &london, CalculationMethod::MuslimWorldLeague, offset_hours(1))
        .unwrap();
    let anomaly = nearest.anomaly().expect("twilight never ends in June");
    assert_eq!(anomaly.prayers, vec![Prayer::Fajr, Prayer::Isha]);

    let reject = PrayerEngine::new(EngineConfig {
        fallback: HighLatitudeFallback::Reject,
        ..Default::default()
    });
    let err = reject
        .compute_schedule(midsummer, &london, CalculationMethod::MuslimWorldLeague, offset_hours(1))
        .unwrap_err();
    match err {
        PrayerError::AstronomicalAnomaly { prayers, .. } => {
            assert_eq!(prayers, vec![Prayer::Fajr, Prayer::Isha]);
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[tokio::test]
async fn test_upcoming_prayer_through_a_day() {
    let engine = PrayerEngine::default();
    let tz = offset_hours(3);
    let day = date(2024, 1, 1);
    let method = CalculationMethod::UmmAlQura;
    let schedule = engine
        .compute_schedule(day, &GeoCoordinate::MECCA, method, tz)
        .unwrap();

    let mut previous = None;
    for minute in (0..24 * 60).step_by(17) {
        let now = at(tz, day, minute / 60, minute % 60);
        let upcoming = engine
            .upcoming_prayer(now, &GeoCoordinate::MECCA, method, tz)
            .await
            .unwrap();

        assert!(upcoming.at > now);
        assert!(upcoming.minutes_remaining >= 0);
        if !upcoming.is_tomorrow {
            assert_eq!(upcoming.at, schedule.time(upcoming.prayer));
        } else {
            assert_eq!(upcoming.prayer, Prayer::Fajr);
            assert!(now >= schedule.time(Prayer::Isha));
        }
        if let Some(prev) = previous {
            assert!(upcoming.prayer.index() >= prev || upcoming.is_tomorrow);
        }
        previous = Some(upcoming.prayer.index());
    }
}

#[test]
fn test_qibla_is_consistent_with_coordinate_validation() {
    assert!(qibla_direction(&GeoCoordinate::MECCA).is_ok());
    let jakarta = GeoCoordinate::new(-6.2088, 106.8456).unwrap();
    let bearing = qibla_direction(&jakarta).unwrap().bearing;
    assert!((295.0..296.0).contains(&bearing), "bearing {}", bearing);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_schedule_is_strictly_ordered(
        lat in -89.0f64..89.0,
        lng in -180.0f64..180.0,
        day_offset in 0i64..3650,
        method_index in 0usize..CalculationMethod::ALL.len(),
    ) {
        let coordinate = GeoCoordinate::new(lat, lng).unwrap();
        let method = CalculationMethod::ALL[method_index];
        let day = date(2020, 1, 1) + Duration::days(day_offset);
        let tz = coordinate.nominal_utc_offset();

        let schedule = PrayerEngine::default()
            .compute_schedule(day, &coordinate, method, tz)
            .unwrap();

        let times: Vec<_> = schedule.iter().map(|(_, t)| t).collect();
        prop_assert!(times.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(times.iter().all(|t| t.second() == 0));

        // Solar noon stays near 12:00 at the longitude's nominal offset.
        let dhuhr = schedule.time(Prayer::Dhuhr);
        let midday = at(tz, day, 12, 0);
        prop_assert!((dhuhr - midday).num_minutes().abs() < 60);
    }
}
