use std::collections::BTreeSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use tempfile::tempdir;
use treezip::{Archiver, Compression, Error, ErrorCode, ErrorKind};

// ============================================================================
// Helper Functions
// ============================================================================

/// Entry names of an archive, sorted (walk order is filesystem order)
fn entry_names(archive: &Path) -> BTreeSet<String> {
    let file = fs::File::open(archive).unwrap();
    let zip = zip::ZipArchive::new(file).unwrap();
    zip.file_names().map(str::to_owned).collect()
}

fn read_entry(archive: &Path, name: &str) -> Vec<u8> {
    let file = fs::File::open(archive).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut content = Vec::new();
    entry.read_to_end(&mut content).unwrap();
    content
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// proj/{a.txt, sub/, src/{main.rs, deep/x.bin}}
fn make_project(root: &Path) -> std::path::PathBuf {
    let proj = root.join("proj");
    fs::create_dir_all(proj.join("sub")).unwrap();
    fs::create_dir_all(proj.join("src/deep")).unwrap();
    fs::write(proj.join("a.txt"), b"A").unwrap();
    fs::write(proj.join("src/main.rs"), b"fn main() {}").unwrap();
    fs::write(proj.join("src/deep/x.bin"), [7u8; 5000]).unwrap();
    proj
}

// ============================================================================
// compress
// ============================================================================

#[test]
fn test_single_file_at_archive_root() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    fs::write(&file, b"hello").unwrap();
    let archive = dir.path().join("notes.zip");

    let report = Archiver::new(&archive).compress(&file).unwrap();

    assert_eq!(report.files_added, 1);
    assert_eq!(report.dirs_added, 0);
    assert_eq!(report.bytes_read, 5);
    assert_eq!(entry_names(&archive), set(&["notes.txt"]));
    assert_eq!(read_entry(&archive, "notes.txt"), b"hello");
}

#[test]
fn test_directory_nested_under_base_name() {
    let dir = tempdir().unwrap();
    let proj = make_project(dir.path());
    let archive = dir.path().join("proj.zip");

    let report = Archiver::new(&archive).compress(&proj).unwrap();

    // Non-empty directories have no entry of their own
    assert_eq!(
        entry_names(&archive),
        set(&["proj/a.txt", "proj/sub/", "proj/src/main.rs", "proj/src/deep/x.bin"])
    );
    assert_eq!(report.files_added, 3);
    assert_eq!(report.dirs_added, 1);
    assert_eq!(report.bytes_read, 1 + 12 + 5000);
    assert_eq!(read_entry(&archive, "proj/src/deep/x.bin"), vec![7u8; 5000]);
}

#[test]
fn test_empty_directory_source() {
    let dir = tempdir().unwrap();
    let empty = dir.path().join("empty");
    fs::create_dir(&empty).unwrap();
    let archive = dir.path().join("empty.zip");

    Archiver::new(&archive).compress(&empty).unwrap();

    assert_eq!(entry_names(&archive), set(&["empty/"]));
    let file = fs::File::open(&archive).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    assert!(zip.by_name("empty/").unwrap().is_dir());
}

#[test]
fn test_creates_archive_parent_directories() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, b"A").unwrap();
    let archive = dir.path().join("x/y/z/out.zip");

    Archiver::new(&archive).compress(&file).unwrap();

    assert!(archive.is_file());
}

#[test]
fn test_stored_compression() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, b"stored payload").unwrap();
    let archive = dir.path().join("a.zip");

    Archiver::new(&archive)
        .compression(Compression::Stored)
        .compress(&file)
        .unwrap();

    let mut zip = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
    let entry = zip.by_name("a.txt").unwrap();
    assert_eq!(entry.compression(), zip::CompressionMethod::Stored);
}

#[test]
fn test_deflate_level() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, "repeat ".repeat(1000)).unwrap();
    let archive = dir.path().join("a.zip");

    Archiver::new(&archive)
        .compression(Compression::Deflated { level: Some(9) })
        .compress(&file)
        .unwrap();

    let mut zip = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
    let entry = zip.by_name("a.txt").unwrap();
    assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
    assert!(entry.compressed_size() < entry.size());
}

#[test]
fn test_missing_source_creates_nothing() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("out/never.zip");

    let err = Archiver::new(&archive)
        .compress(dir.path().join("missing"))
        .unwrap_err();

    assert!(matches!(err, Error::PathNotFound { .. }));
    assert_eq!(err.code(), ErrorCode::FileNotExist);
    assert!(err.is_caller_fixable());
    assert!(!archive.exists());
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_self_overwrite_rejected() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("only_copy.dat");
    fs::write(&file, b"precious").unwrap();

    let err = Archiver::new(&file).compress(&file).unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(err.code(), ErrorCode::FilePathError);
    assert_eq!(fs::read(&file).unwrap(), b"precious");
}

#[test]
fn test_empty_arguments_rejected() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, b"A").unwrap();

    let err = Archiver::new("").compress(&file).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = Archiver::new(dir.path().join("a.zip"))
        .compress("")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_aborts() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let proj = dir.path().join("proj");
    fs::create_dir(&proj).unwrap();
    let locked = proj.join("locked.txt");
    fs::write(&locked, b"secret").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to test there.
    if fs::File::open(&locked).is_ok() {
        return;
    }

    let archive = dir.path().join("proj.zip");
    let err = Archiver::new(&archive).compress(&proj).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Compression);
    assert_eq!(err.code(), ErrorCode::CompressFileError);
    // Partial archive is left in place
    assert!(archive.exists());
}

#[cfg(unix)]
#[test]
fn test_symlink_cycle_aborts() {
    let dir = tempdir().unwrap();
    let proj = dir.path().join("proj");
    fs::create_dir_all(proj.join("nested")).unwrap();
    std::os::unix::fs::symlink(&proj, proj.join("nested/loop")).unwrap();
    let archive = dir.path().join("out.zip");

    let err = Archiver::new(&archive).compress(&proj).unwrap_err();

    match &err {
        Error::Compression { path, .. } => assert!(path.ends_with("loop")),
        other => panic!("expected Compression, got {:?}", other),
    }
    assert_eq!(err.code(), ErrorCode::CompressFileError);
}

// ============================================================================
// compress_many
// ============================================================================

#[test]
fn test_many_sources_are_siblings() {
    let dir = tempdir().unwrap();
    let proj = make_project(dir.path());
    let loose = dir.path().join("README");
    fs::write(&loose, b"read me").unwrap();
    let empty = dir.path().join("empty");
    fs::create_dir(&empty).unwrap();
    let archive = dir.path().join("bundle.zip");

    let report = Archiver::new(&archive)
        .compress_many(&[&proj, &loose, &empty])
        .unwrap();

    assert_eq!(
        entry_names(&archive),
        set(&[
            "proj/a.txt",
            "proj/sub/",
            "proj/src/main.rs",
            "proj/src/deep/x.bin",
            "README",
            "empty/",
        ])
    );
    assert_eq!(report.files_added, 4);
    assert_eq!(report.dirs_added, 2);
}

#[test]
fn test_many_missing_source_fails_before_writing() {
    let dir = tempdir().unwrap();
    let present = dir.path().join("present.txt");
    fs::write(&present, b"here").unwrap();
    let archive = dir.path().join("bundle.zip");

    let err = Archiver::new(&archive)
        .compress_many(&[present, dir.path().join("absent.txt")])
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(err.code(), ErrorCode::FilePathError);
    assert!(!archive.exists());
}

#[test]
fn test_many_empty_source_rejected() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("bundle.zip");

    let err = Archiver::new(&archive)
        .compress_many(&[Path::new("")])
        .unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert!(!archive.exists());
}

#[test]
fn test_many_self_overwrite_rejected() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("data.zip");
    fs::write(&file, b"not really a zip").unwrap();

    let err = Archiver::new(&file).compress_many(&[&file]).unwrap_err();

    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(fs::read(&file).unwrap(), b"not really a zip");
}

#[test]
fn test_many_colliding_names_fail() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("one");
    let second = dir.path().join("two");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();
    fs::write(first.join("same.txt"), b"1").unwrap();
    fs::write(second.join("same.txt"), b"2").unwrap();
    let archive = dir.path().join("clash.zip");

    let err = Archiver::new(&archive)
        .compress_many(&[first.join("same.txt"), second.join("same.txt")])
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Compression);
}

#[test]
fn test_many_with_no_sources_writes_empty_archive() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("empty.zip");
    let sources: [&Path; 0] = [];

    let report = Archiver::new(&archive).compress_many(&sources).unwrap();

    assert_eq!(report.files_added, 0);
    assert!(entry_names(&archive).is_empty());
}
