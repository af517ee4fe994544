//! Tests for the directory-backed folder.

use std::fs;

use camino::Utf8PathBuf;
use mapmark_fs::{CapFolder, Folder, STAGING_SUFFIX};
use rstest::{fixture, rstest};
use tempfile::TempDir;

#[fixture]
fn populated() -> (TempDir, CapFolder) {
    let temp = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf-8 temp path");
    fs::write(root.join("roads.shp"), [1, 2, 3]).expect("write shp");
    fs::write(root.join("IMG_0001.JPG"), [0xFF, 0xD8]).expect("write jpg");
    fs::create_dir(root.join("nested")).expect("create dir");
    let folder = CapFolder::open(&root).expect("open folder");
    (temp, folder)
}

#[rstest]
fn lists_regular_files_only(populated: (TempDir, CapFolder)) {
    let (_temp, folder) = populated;
    assert_eq!(
        folder.file_names().expect("lists"),
        ["IMG_0001.JPG", "roads.shp"]
    );
}

#[rstest]
fn replace_swaps_contents_without_leaving_staging_files(populated: (TempDir, CapFolder)) {
    let (temp, folder) = populated;
    folder.replace("IMG_0001.JPG", &[0xFF, 0xD8, 0xFF, 0xD9]).expect("replaces");
    assert_eq!(
        folder.read("IMG_0001.JPG").expect("reads"),
        [0xFF, 0xD8, 0xFF, 0xD9]
    );
    let staging = temp.path().join(format!("IMG_0001.JPG{STAGING_SUFFIX}"));
    assert!(!staging.exists());
}

#[rstest]
fn refuses_names_outside_the_folder(populated: (TempDir, CapFolder)) {
    let (_temp, folder) = populated;
    assert!(folder.read("../roads.shp").is_err());
    assert!(folder.replace("nested/evil.jpg", &[0]).is_err());
}

#[rstest]
fn contains_distinguishes_files_from_directories(populated: (TempDir, CapFolder)) {
    let (_temp, folder) = populated;
    assert!(folder.contains("roads.shp").expect("stat"));
    assert!(!folder.contains("nested").expect("stat"));
    assert!(!folder.contains("roads.dbf").expect("stat"));
}
