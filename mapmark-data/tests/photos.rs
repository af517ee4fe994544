//! Integration tests for loading and saving photo geotags.

use std::sync::Arc;

use mapmark_core::GpsPosition;
use mapmark_data::{
    PhotoError, PhotoGeotag, load_geotags, load_geotags_concurrently, save_geotag, save_geotags,
};
use mapmark_exif::{read_gps, write_gps};
use mapmark_fs::{Folder, MemoryFolder};
use rstest::{fixture, rstest};

mod support;

use support::{assert_close, block_on, plain_jpeg};

#[fixture]
fn album() -> MemoryFolder {
    let tagged = write_gps(&plain_jpeg(), 51.5, -0.125).expect("fixture writes");
    MemoryFolder::new()
        .with_file("beach.JPG", tagged)
        .with_file("garden.jpeg", plain_jpeg())
        .with_file("notes.txt", b"not a photo".to_vec())
}

#[rstest]
fn loads_positions_and_reports_missing_gps(album: MemoryFolder) {
    let records = load_geotags(&album).expect("lists");
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["beach.JPG", "garden.jpeg"]);
    let beach = records
        .first()
        .and_then(|r| r.geotag.position())
        .expect("beach is located");
    assert_close(beach.latitude, 51.5, 3e-7);
    assert_close(beach.longitude, -0.125, 3e-7);
    assert!(matches!(
        records.get(1).map(|r| &r.geotag),
        Some(PhotoGeotag::MissingGps)
    ));
}

#[rstest]
fn concurrent_load_matches_sequential_order(album: MemoryFolder) {
    let records = block_on(load_geotags_concurrently(Arc::new(album))).expect("lists");
    let located: Vec<_> = records
        .iter()
        .map(|r| (r.name.as_str(), r.geotag.position().is_some()))
        .collect();
    assert_eq!(located, [("beach.JPG", true), ("garden.jpeg", false)]);
}

#[rstest]
fn saving_replaces_the_photo(album: MemoryFolder) {
    save_geotag(&album, "garden.jpeg", GpsPosition::new(-33.75, 151.0)).expect("saves");
    let bytes = album.read("garden.jpeg").expect("still present");
    let position = read_gps(&bytes).expect("decodes").expect("now located");
    assert_close(position.latitude, -33.75, 3e-7);
    assert_close(position.longitude, 151.0, 3e-7);
}

#[rstest]
fn failed_save_leaves_the_file_untouched() {
    let folder = MemoryFolder::new().with_file("fake.jpg", b"GIF89a".to_vec());
    let err = save_geotag(&folder, "fake.jpg", GpsPosition::new(1.0, 2.0)).expect_err("rejected");
    assert!(matches!(err, PhotoError::Exif { .. }));
    assert_eq!(folder.read("fake.jpg").expect("present"), b"GIF89a");
}

#[rstest]
fn last_edit_for_a_photo_wins(album: MemoryFolder) {
    let folder = Arc::new(album);
    let outcomes = block_on(save_geotags(
        Arc::clone(&folder),
        vec![
            ("garden.jpeg".to_owned(), GpsPosition::new(10.0, 20.0)),
            ("missing.jpg".to_owned(), GpsPosition::new(0.0, 0.0)),
            ("garden.jpeg".to_owned(), GpsPosition::new(-5.0, -6.0)),
        ],
    ));
    let names: Vec<_> = outcomes.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, ["garden.jpeg", "missing.jpg"]);
    assert!(outcomes.first().is_some_and(|o| o.result.is_ok()));
    assert!(matches!(
        outcomes.get(1).map(|o| &o.result),
        Some(Err(PhotoError::Read { .. }))
    ));
    let bytes = folder.read("garden.jpeg").expect("present");
    let position = read_gps(&bytes).expect("decodes").expect("located");
    assert_close(position.latitude, -5.0, 3e-7);
    assert_close(position.longitude, -6.0, 3e-7);
}
