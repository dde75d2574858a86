//! End-to-end runs of `process_directory` over temporary directories.

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use datestamp_core::{
    extract_capture_timestamp, process_directory, Extraction, FileOutcome, FileReport,
    NotFoundReason, ProcessOptions, RunSummary,
};
use tempfile::TempDir;

const TIFF_ASCII: u16 = 2;
const TIFF_LONG: u16 = 4;

fn ascii_payload(s: &str) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.push(0);
    while v.len() < 4 {
        v.push(0);
    }
    v
}

/// Bytes an ASCII value occupies outside its IFD entry.
fn out_of_line_len(s: &str) -> u32 {
    let n = ascii_payload(s).len() as u32;
    if n > 4 {
        n
    } else {
        0
    }
}

fn ifd_len(entries: usize) -> u32 {
    2 + 12 * entries as u32 + 4
}

fn write_ifd(out: &mut Vec<u8>, ascii: &[(u16, &str)], data_offset: u32, pointer: Option<u32>) {
    let mut data = Vec::new();
    let mut entries: Vec<(u16, Vec<u8>)> = Vec::new();
    for &(tag, s) in ascii {
        let payload = ascii_payload(s);
        let mut entry = Vec::new();
        entry.extend_from_slice(&tag.to_le_bytes());
        entry.extend_from_slice(&TIFF_ASCII.to_le_bytes());
        entry.extend_from_slice(&((s.len() + 1) as u32).to_le_bytes());
        if payload.len() == 4 {
            entry.extend_from_slice(&payload);
        } else {
            entry.extend_from_slice(&(data_offset + data.len() as u32).to_le_bytes());
            data.extend_from_slice(&payload);
        }
        entries.push((tag, entry));
    }
    if let Some(target) = pointer {
        let mut entry = Vec::new();
        entry.extend_from_slice(&0x8769u16.to_le_bytes());
        entry.extend_from_slice(&TIFF_LONG.to_le_bytes());
        entry.extend_from_slice(&1u32.to_le_bytes());
        entry.extend_from_slice(&target.to_le_bytes());
        entries.push((0x8769, entry));
    }
    // IFD entries are sorted by tag.
    entries.sort_by_key(|(tag, _)| *tag);

    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (_, entry) in &entries {
        out.extend_from_slice(entry);
    }
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&data);
}

/// Little-endian TIFF block: IFD0 holds `ifd0_ascii` entries plus a pointer
/// to an Exif IFD holding `exif_ascii` entries.
fn tiff_block(ifd0_ascii: &[(u16, &str)], exif_ascii: &[(u16, &str)]) -> Vec<u8> {
    let ifd0_offset = 8u32;
    let ifd0_data_offset = ifd0_offset + ifd_len(ifd0_ascii.len() + 1);
    let ifd0_data: u32 = ifd0_ascii.iter().map(|(_, s)| out_of_line_len(s)).sum();
    let exif_offset = ifd0_data_offset + ifd0_data;
    let exif_data_offset = exif_offset + ifd_len(exif_ascii.len());

    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&ifd0_offset.to_le_bytes());

    write_ifd(&mut out, ifd0_ascii, ifd0_data_offset, Some(exif_offset));
    assert_eq!(out.len() as u32, exif_offset);
    write_ifd(&mut out, exif_ascii, exif_data_offset, None);
    out
}

/// Minimal JPEG: SOI, APP1 Exif segment, EOI.
fn jpeg_with_tiff(tiff: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
    out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(tiff);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

fn jpeg_with_capture_date(date: &str) -> Vec<u8> {
    jpeg_with_tiff(&tiff_block(&[(0x010F, "TestCam")], &[(0x9003, date)]))
}

/// 1x1 PNG with no eXIf chunk.
fn png_without_metadata() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG header
        0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
        0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1
        0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44,
        0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8, 0xFF, 0xFF, 0x3F, 0x00, 0x05, 0xFE, 0x02, 0xFE, 0xDC,
        0xCC, 0x59, 0xE7, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

fn run(dir: &Path) -> (RunSummary, Vec<FileReport>) {
    let reports = RefCell::new(Vec::new());
    let options = ProcessOptions {
        directory: dir.to_path_buf(),
    };
    let summary = process_directory(&options, &|r: &FileReport| reports.borrow_mut().push(r.clone()))
        .expect("directory is valid");
    (summary, reports.into_inner())
}

fn names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn extracts_capture_date_from_jpeg() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.jpg");
    fs::write(&path, jpeg_with_capture_date("2023:07:04 10:15:30")).unwrap();

    let ts = extract_capture_timestamp(&path).timestamp().unwrap();
    assert_eq!(ts.prefix(), "2023-07-04_10-15-30");

    // The handle is released, so the file can be renamed right away.
    fs::rename(&path, dir.path().join("moved.jpg")).unwrap();
}

#[test]
fn ignores_other_date_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edited.jpg");
    let tiff = tiff_block(
        &[(0x0132, "2020:01:01 00:00:00")],
        &[(0x9004, "2020:01:01 00:00:00")],
    );
    fs::write(&path, jpeg_with_tiff(&tiff)).unwrap();

    assert_eq!(
        extract_capture_timestamp(&path),
        Extraction::NotFound(NotFoundReason::NoCaptureField)
    );
}

#[test]
fn invalid_capture_date_is_not_found() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.jpg");
    fs::write(&path, jpeg_with_capture_date("2023:13:45 10:15:30")).unwrap();

    assert_eq!(
        extract_capture_timestamp(&path),
        Extraction::NotFound(NotFoundReason::InvalidTimestamp)
    );
}

#[test]
fn renames_and_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let bytes = jpeg_with_capture_date("2023:07:04 10:15:30");
    fs::write(dir.path().join("vacation.jpg"), &bytes).unwrap();

    let (summary, reports) = run(dir.path());
    assert_eq!(summary.renamed, 1);
    assert_eq!(
        reports,
        vec![FileReport {
            file_name: "vacation.jpg".into(),
            outcome: FileOutcome::Renamed {
                new_name: "2023-07-04_10-15-30-vacation.jpg".into()
            },
        }]
    );
    assert_eq!(names(dir.path()), vec!["2023-07-04_10-15-30-vacation.jpg"]);
    let after = fs::read(dir.path().join("2023-07-04_10-15-30-vacation.jpg")).unwrap();
    assert_eq!(after, bytes);

    let (summary, reports) = run(dir.path());
    assert_eq!(summary.renamed, 0);
    assert_eq!(summary.already_prefixed, 1);
    assert_eq!(reports[0].outcome, FileOutcome::AlreadyPrefixed);
    assert_eq!(names(dir.path()), vec!["2023-07-04_10-15-30-vacation.jpg"]);
}

#[test]
fn skips_image_without_metadata() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("scan.png"), png_without_metadata()).unwrap();

    let (summary, reports) = run(dir.path());
    assert_eq!(summary.renamed, 0);
    assert_eq!(summary.no_capture_date, 1);
    assert_eq!(
        reports[0].outcome,
        FileOutcome::NoCaptureDate {
            reason: NotFoundReason::NoMetadata
        }
    );
    assert_eq!(names(dir.path()), vec!["scan.png"]);
}

#[test]
fn corrupt_file_does_not_stop_run() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("corrupt.jpg"), b"").unwrap();
    fs::write(dir.path().join("good.jpg"), jpeg_with_capture_date("2001:02:03 04:05:06")).unwrap();

    let (summary, reports) = run(dir.path());
    assert_eq!(summary.renamed, 1);
    assert_eq!(summary.no_capture_date, 1);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].file_name, "corrupt.jpg");
    assert_eq!(
        reports[0].outcome,
        FileOutcome::NoCaptureDate {
            reason: NotFoundReason::UnsupportedFormat
        }
    );
    assert_eq!(
        names(dir.path()),
        vec!["2001-02-03_04-05-06-good.jpg", "corrupt.jpg"]
    );
}

#[test]
fn skips_hidden_files_and_directories() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".thumbnail.jpg"), jpeg_with_capture_date("2023:07:04 10:15:30")).unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();

    let (summary, reports) = run(dir.path());
    assert!(reports.is_empty());
    assert_eq!(summary, RunSummary { directory: dir.path().to_path_buf(), ..Default::default() });
    assert_eq!(names(dir.path()), vec![".thumbnail.jpg", "nested"]);
}

#[test]
fn empty_directory() {
    let dir = TempDir::new().unwrap();
    let (summary, reports) = run(dir.path());
    assert_eq!(summary.renamed, 0);
    assert!(reports.is_empty());
}

#[test]
fn collision_is_reported_and_run_continues() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.jpg"), jpeg_with_capture_date("2023:07:04 10:15:30")).unwrap();
    fs::write(dir.path().join("b.jpg"), jpeg_with_capture_date("2022:01:01 00:00:00")).unwrap();
    // Occupies the name a.jpg would be renamed to.
    fs::write(dir.path().join("2023-07-04_10-15-30-a.jpg"), b"unrelated").unwrap();

    let (summary, reports) = run(dir.path());
    assert_eq!(summary.renamed, 1);
    assert_eq!(summary.failed, 1);

    let failed = reports.iter().find(|r| r.file_name == "a.jpg").unwrap();
    assert!(matches!(failed.outcome, FileOutcome::RenameFailed { ref error } if error.contains("already exists")));
    assert_eq!(fs::read(dir.path().join("2023-07-04_10-15-30-a.jpg")).unwrap(), b"unrelated");
    assert!(dir.path().join("a.jpg").exists());
    assert!(dir.path().join("2022-01-01_00-00-00-b.jpg").exists());
}

#[test]
fn summary_serializes_to_json() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("scan.png"), png_without_metadata()).unwrap();

    let (summary, reports) = run(dir.path());
    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["renamed"], 0);
    assert_eq!(value["no_capture_date"], 1);

    let report = serde_json::to_value(&reports[0]).unwrap();
    assert_eq!(report["file_name"], "scan.png");
    assert_eq!(report["outcome"], "no_capture_date");
    assert_eq!(report["reason"], "no_metadata");
}
