//! Behavioural tests for writing photo positions.

use mapmark_exif::{Axis, ExifError, read_gps, write_gps};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

mod support;
use support::assert_close;

#[fixture]
fn photo() -> RefCell<Vec<u8>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn written() -> RefCell<Option<Result<Vec<u8>, ExifError>>> {
    RefCell::new(None)
}

#[given("a JPEG without EXIF data")]
fn given_plain(#[from(photo)] photo: &RefCell<Vec<u8>>) {
    *photo.borrow_mut() = support::plain_jpeg();
}

#[given("a JPEG tagged at {lat}, {lon}")]
fn given_tagged(#[from(photo)] photo: &RefCell<Vec<u8>>, lat: f64, lon: f64) {
    let tagged = write_gps(&support::plain_jpeg(), lat, lon).expect("fixture writes");
    *photo.borrow_mut() = tagged;
}

#[when("I write the position {lat}, {lon}")]
fn when_write(
    #[from(photo)] photo: &RefCell<Vec<u8>>,
    #[from(written)] written: &RefCell<Option<Result<Vec<u8>, ExifError>>>,
    lat: f64,
    lon: f64,
) {
    *written.borrow_mut() = Some(write_gps(&photo.borrow(), lat, lon));
}

#[then("reading the new image returns {lat}, {lon}")]
fn then_reads_back(
    #[from(written)] written: &RefCell<Option<Result<Vec<u8>, ExifError>>>,
    lat: f64,
    lon: f64,
) {
    let borrowed = written.borrow();
    let bytes = borrowed
        .as_ref()
        .expect("write attempted")
        .as_ref()
        .expect("write succeeded");
    let position = read_gps(bytes).expect("reads").expect("has position");
    assert_close(position.latitude, lat);
    assert_close(position.longitude, lon);
}

#[then("the original image still has no position")]
fn then_original_untouched(#[from(photo)] photo: &RefCell<Vec<u8>>) {
    assert_eq!(read_gps(&photo.borrow()).expect("reads"), None);
}

#[then("the write fails because the latitude is out of range")]
fn then_out_of_range(#[from(written)] written: &RefCell<Option<Result<Vec<u8>, ExifError>>>) {
    let borrowed = written.borrow();
    let err = borrowed
        .as_ref()
        .expect("write attempted")
        .as_ref()
        .expect_err("write rejected");
    assert!(matches!(
        err,
        ExifError::CoordinateOutOfRange {
            axis: Axis::Latitude,
            ..
        }
    ));
}

#[scenario(path = "tests/features/geotag.feature", index = 0)]
fn scenario_plain_photo(
    photo: RefCell<Vec<u8>>,
    written: RefCell<Option<Result<Vec<u8>, ExifError>>>,
) {
    let _ = (photo, written);
}

#[scenario(path = "tests/features/geotag.feature", index = 1)]
fn scenario_tagged_photo(
    photo: RefCell<Vec<u8>>,
    written: RefCell<Option<Result<Vec<u8>, ExifError>>>,
) {
    let _ = (photo, written);
}

#[scenario(path = "tests/features/geotag.feature", index = 2)]
fn scenario_out_of_range(
    photo: RefCell<Vec<u8>>,
    written: RefCell<Option<Result<Vec<u8>, ExifError>>>,
) {
    let _ = (photo, written);
}
