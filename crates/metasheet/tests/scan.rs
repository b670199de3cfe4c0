//! Folder scans in both modes

use std::fs;

use metasheet::{scan, Error, ScanMode};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn touch(dir: &TempDir, name: &str) {
    fs::write(dir.path().join(name), b"").unwrap();
}

#[test]
fn test_strict_scan_ignores_other_extensions() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "notes.txt");
    touch(&dir, "metadata_A_20230505.xlsx");
    touch(&dir, "~$metadata_A_20230505.xlsx");

    let groups = scan(dir.path(), ScanMode::Strict).unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].key.to_string(), "A_20230505");
    assert_eq!(groups[0].files.len(), 1);
}

#[test]
fn test_strict_scan_fails_on_foreign_name() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "notes.txt");
    touch(&dir, "metadata_A_20230505.xlsx");
    touch(&dir, "badname.xlsx");

    match scan(dir.path(), ScanMode::Strict) {
        Err(Error::FilenameFormat { names }) => assert_eq!(names, vec!["badname.xlsx"]),
        other => panic!("expected a file name error, got {:?}", other),
    }
}

#[test]
fn test_lenient_scan_groups_anything() {
    let dir = TempDir::new().unwrap();
    touch(&dir, "badname_20230505.xlsx");
    touch(&dir, "Badname 20230505.xls");
    touch(&dir, "metadata_A_20230505.xlsx");

    let groups = scan(dir.path(), ScanMode::Lenient).unwrap();
    let keys: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
    assert_eq!(keys, vec!["a_20230505", "badname_20230505"]);
    assert_eq!(groups[1].files.len(), 2);
}

#[test]
fn test_scan_input_errors() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        scan(&dir.path().join("missing"), ScanMode::Strict),
        Err(Error::InputNotFound(_))
    ));
    touch(&dir, "file.xlsx");
    assert!(matches!(
        scan(&dir.path().join("file.xlsx"), ScanMode::Strict),
        Err(Error::NotADirectory(_))
    ));
    let empty = TempDir::new().unwrap();
    assert!(matches!(scan(empty.path(), ScanMode::Lenient), Err(Error::NoInputFiles(_))));
}
