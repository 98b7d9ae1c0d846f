use std::path::Path;

use approx::assert_relative_eq;
use image::{Rgba, RgbaImage};
use scratch_view::data::loader::LoadOptions;
use scratch_view::export::{MarkerStyle, MarkRecord, read_mark_data};
use scratch_view::marks::MarkId;
use scratch_view::session::Opened;
use scratch_view::{Error, Session};

/// Instrument export: three approach rows, then 0..=20 µm in 10 µm steps.
const EXPORT: &str = "\
x,fIn,fSet
0,9000,10000
0,9500,10000
0,10000,10000
256,20000,15000
512,15000,20000
";

fn write_inputs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let csv = dir.join("M1402_5-60_1.csv");
    std::fs::write(&csv, EXPORT).unwrap();
    let png = dir.join("5-60.png");
    RgbaImage::from_pixel(200, 50, Rgba([30, 30, 30, 255]))
        .save(&png)
        .unwrap();
    (png, csv)
}

#[test]
fn full_analysis_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (png, csv) = write_inputs(dir.path());
    let opts = LoadOptions::default();

    let mut session = Session::new();
    assert_eq!(session.open(&png, &opts).unwrap(), Opened::Image);
    assert_eq!(session.open(&csv, &opts).unwrap(), Opened::Data);

    // Normalised samples are [(0,10),(10,20),(20,15)] in (µm, N).
    let forces = &session.dataset().unwrap().forces;
    assert_eq!(forces.len(), 3);
    assert_relative_eq!(forces.force_at(5.0), 15.0, epsilon = 1e-9);
    assert_relative_eq!(forces.force_at(-5.0), 10.0, epsilon = 1e-9);
    assert_relative_eq!(forces.force_at(25.0), 15.0, epsilon = 1e-9);

    assert!(matches!(session.mark(110.0, 25.0), Err(Error::CalibrationNotSet)));

    session.define_origin(100.0, 25.0, 1.0);
    let reading = session.query(110.0, 25.0).unwrap();
    assert_relative_eq!(reading.position, 10.0, epsilon = 1e-9);
    assert_relative_eq!(reading.force, 20.0, epsilon = 1e-9);

    let first = session.mark(110.0, 25.0).unwrap().clone();
    assert_eq!(first.force, reading.force);
    let second = session.mark(115.0, 30.0).unwrap().id;
    session.mark(105.0, 20.0).unwrap();
    assert_eq!(session.marks().last().unwrap().position, 5.0);

    session.remove_mark(second).unwrap();
    assert!(session.marks().iter().all(|m| m.id != second));
    assert!(matches!(
        session.remove_mark(second),
        Err(Error::MarkNotFound(MarkId(2)))
    ));
    assert_eq!(session.marks().len(), 2);

    let (img_out, data_out) = session.default_export_paths();
    let img_out = img_out.unwrap();
    let data_out = data_out.unwrap();
    assert_eq!(img_out, dir.path().join("5-60_marks.png"));
    assert_eq!(data_out, dir.path().join("M1402_5-60_1_marks.csv"));

    let style = MarkerStyle::default();
    session.save_image(&img_out, &style).unwrap();
    session.save_marks(&data_out).unwrap();

    let annotated = image::open(&img_out).unwrap().to_rgba8();
    assert_eq!(annotated.dimensions(), (200, 50));
    assert_eq!(*annotated.get_pixel(110, 25), style.mark_color);
    assert_eq!(*annotated.get_pixel(60, 45), Rgba([30, 30, 30, 255]));

    let records = read_mark_data(&data_out).unwrap();
    let expected: Vec<MarkRecord> = session.marks().iter().map(MarkRecord::from).collect();
    assert_eq!(records, expected);
    assert_eq!(records[0].label, "1");
    assert_eq!(records[1].label, "3");
}

#[test]
fn malformed_data_creates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("bad.csv");
    std::fs::write(&csv, "x,fIn\n0,1\n10,2\n5,3\n").unwrap();

    let mut session = Session::new();
    let err = session.open(&csv, &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, Error::MalformedData(_)));
    assert!(session.dataset().is_none());
}

#[test]
fn failed_save_leaves_no_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let (png, csv) = write_inputs(dir.path());
    let mut session = Session::new();
    session.open(&png, &LoadOptions::default()).unwrap();
    session.open(&csv, &LoadOptions::default()).unwrap();
    session.define_origin(100.0, 25.0, 1.0);
    session.mark(110.0, 25.0).unwrap();

    let target = dir.path().join("no-such-dir").join("marks.png");
    assert!(matches!(
        session.save_image(&target, &MarkerStyle::default()),
        Err(Error::Io { .. })
    ));
    assert!(!target.exists());
}

#[test]
fn marks_file_is_suggested_beside_the_data_file() {
    let images = tempfile::tempdir().unwrap();
    let exports = tempfile::tempdir().unwrap();
    let (png, _) = write_inputs(images.path());
    let (_, csv) = write_inputs(exports.path());

    let mut session = Session::new();
    session.open(&png, &LoadOptions::default()).unwrap();
    session.open(&csv, &LoadOptions::default()).unwrap();

    let (img_out, data_out) = session.default_export_paths();
    assert_eq!(img_out, Some(images.path().join("5-60_marks.png")));
    assert_eq!(data_out, Some(exports.path().join("M1402_5-60_1_marks.csv")));

    let mut data_only = Session::new();
    data_only.open(&csv, &LoadOptions::default()).unwrap();
    assert_eq!(
        data_only.default_export_paths(),
        (None, Some(exports.path().join("M1402_5-60_1_marks.csv")))
    );
}
