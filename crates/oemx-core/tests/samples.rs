mod common;

use common::MockTransport;
use oemx_core::driver::{CtdDriver, DriverError, DriverOptions, MountConfiguration, RestartNeeded};
use oemx_core::science::{compute_sound_speed, STANDARD_CONDUCTIVITY};
use std::time::Duration;

fn driver(primary: usize, secondary: usize, offset: f64) -> CtdDriver<MockTransport> {
    let options = DriverOptions {
        conductivity_offset: offset,
        ..DriverOptions::default()
    };
    let mounts = MountConfiguration::new(primary, secondary).unwrap();
    CtdDriver::with_options(MockTransport::new(), mounts, options)
}

fn feed(ctd: &mut CtdDriver<MockTransport>, line: &str) {
    ctd.transport_mut().push_rx(line);
}

#[test]
fn test_full_line_at_standard_seawater() {
    let mut ctd = driver(2, 1, 0.0);
    feed(&mut ctd, " 42.914 0.000 15.000\r\n");

    let m = ctd.have_new_data().unwrap();
    assert_eq!(m.conductivity, STANDARD_CONDUCTIVITY);
    assert_eq!(m.pressure, 0.0);
    assert_eq!(m.temperature, 15.0);
    assert!((m.salinity - 35.0).abs() < 1e-4);
    assert!((m.sound_speed - compute_sound_speed(m.salinity, 0.0, 15.0)).abs() < 1e-9);
    assert_eq!(ctd.measurement(), &m);
}

#[test]
fn test_short_mounts_keep_previous_channels() {
    let mut ctd = driver(1, 1, 0.0);
    feed(&mut ctd, " 40.0 12.5\r\n");

    let m = ctd.have_new_data().unwrap();
    assert_eq!(m.conductivity, 40.0);
    assert_eq!(m.pressure, 12.5);
    assert_eq!(m.temperature, 0.0);
    assert!(m.salinity >= 0.0);

    let mut ctd = driver(1, 0, 0.0);
    feed(&mut ctd, " 0.5\r\n");
    let m = ctd.have_new_data().unwrap();
    assert_eq!(m.conductivity, 0.5);
    assert!(m.salinity >= 0.0);
}

#[test]
fn test_salinity_never_negative() {
    let mut ctd = driver(2, 1, 0.0);
    feed(&mut ctd, " 0.000 0.000 0.000\r\n");
    let m = ctd.have_new_data().unwrap();
    assert_eq!(m.salinity, 0.0);
    assert!((m.sound_speed - 1402.388).abs() < 1e-3);
}

#[test]
fn test_conductivity_offset_only_feeds_salinity() {
    let mut ctd = driver(2, 1, 0.5);
    feed(&mut ctd, " 42.414 0.000 15.000\r\n");
    let m = ctd.have_new_data().unwrap();
    assert_eq!(m.conductivity, 42.414);
    assert!((m.salinity - 35.0).abs() < 1e-4);
}

#[test]
fn test_field_count_mismatch_leaves_measurement() {
    let mut ctd = driver(2, 1, 0.0);
    feed(&mut ctd, " 42.914 10.0 15.0\r\n");
    let before = ctd.have_new_data().unwrap();

    feed(&mut ctd, " 41.0 11.0\r\n");
    let err = ctd.have_new_data().unwrap_err();
    assert!(matches!(err, DriverError::ParseMiss { expected: 3, found: 2 }));
    assert!(!err.is_fatal());

    feed(&mut ctd, " 41.0 11.0 14.0 9.0\r\n");
    assert!(matches!(
        ctd.have_new_data(),
        Err(DriverError::ParseMiss { expected: 3, found: 4 })
    ));

    feed(&mut ctd, ">\r\n");
    assert!(matches!(
        ctd.have_new_data(),
        Err(DriverError::ParseMiss { found: 0, .. })
    ));

    assert_eq!(ctd.measurement(), &before);
}

#[test]
fn test_overlong_line_is_skipped() {
    let mut ctd = driver(2, 1, 0.0);
    feed(&mut ctd, &format!("{}\r\n", " 1.000".repeat(7)));

    let err = ctd.have_new_data().unwrap_err();
    assert!(matches!(err, DriverError::LineOverflow { limit: 32 }));
    assert!(!err.is_fatal());
}

#[test]
fn test_overlong_line_tail_is_not_a_sample() {
    let mut ctd = driver(2, 1, 0.0);
    feed(&mut ctd, " 42.914 10.0 15.0\r\n");
    let before = ctd.have_new_data().unwrap();

    // The tail alone would scan as a valid three-field line
    feed(&mut ctd, &format!("{} 41.0 10.0 15.0\r\n", "E".repeat(32)));
    feed(&mut ctd, " 40.0 20.0 12.0\r\n");

    assert!(matches!(
        ctd.have_new_data(),
        Err(DriverError::LineOverflow { .. })
    ));
    assert_eq!(ctd.measurement(), &before);

    let m = ctd.have_new_data().unwrap();
    assert_eq!(m.conductivity, 40.0);
    assert_eq!(m.pressure, 20.0);
    assert_eq!(m.temperature, 12.0);
}

#[test]
fn test_overlong_line_without_terminator() {
    let mut ctd = driver(2, 1, 0.0);
    feed(&mut ctd, &"9".repeat(70));

    assert!(matches!(
        ctd.have_new_data(),
        Err(DriverError::LineOverflow { .. })
    ));
    // Everything buffered was dropped with the line
    assert!(matches!(ctd.have_new_data(), Err(DriverError::IoFailure(_))));
}

#[test]
fn test_zero_byte_read_is_fatal() {
    let mut ctd = driver(2, 1, 0.0);
    ctd.transport_mut().hang_up = true;

    let err = ctd.have_new_data().unwrap_err();
    assert!(matches!(err, DriverError::IoFailure(_)));
    assert!(err.is_fatal());

    let restart = RestartNeeded::from(err);
    assert_eq!(restart.message, "I/O error");
    assert_eq!(restart.backoff, Duration::from_secs(5));
}
