//! Integration tests for loading cascades in the interchange and native formats.

use bzip2::write::BzEncoder;
use bzip2::Compression;
use cascade_detect::{
    interchange::{load_cascade, write_cascade},
    CascadeClassifier, Detector, DetectorConfig, Error, FrameBuffers, RgbaFrame,
};
use std::io::Write;
use std::path::PathBuf;

fn cascades_dir() -> Option<PathBuf> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("cascades");
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

const TWO_STAGE: &str = r#"{
    "size": [12, 12],
    "tilted": 1,
    "complexClassifiers": [
        {
            "threshold": -0.2,
            "simpleClassifiers": [
                { "tilted": 0, "threshold": 0.01, "left_val": -0.5, "right_val": 0.5,
                  "features": [[0, 0, 6, 12, -1], [6, 0, 6, 12, 1]] }
            ]
        },
        {
            "threshold": 0.3,
            "simpleClassifiers": [
                { "tilted": 1, "threshold": -0.02, "left_val": 0.1, "right_val": 0.9,
                  "features": [[6, 0, 4, 4, -1], [6, 2, 2, 2, 4]] },
                { "tilted": 0, "threshold": 0.0, "left_val": 0.2, "right_val": -0.1,
                  "features": [[2, 2, 8, 4, 1], [2, 6, 8, 4, -1]] }
            ]
        }
    ]
}"#;

#[test]
fn compressed_and_plain_files_match() {
    let dir = tempfile::tempdir().unwrap();

    let plain = dir.path().join("two_stage.json");
    std::fs::write(&plain, TWO_STAGE).unwrap();

    let compressed = dir.path().join("two_stage.json.bz2");
    let mut encoder = BzEncoder::new(std::fs::File::create(&compressed).unwrap(), Compression::default());
    encoder.write_all(TWO_STAGE.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let a = load_cascade(&plain).unwrap();
    let b = load_cascade(&compressed).unwrap();
    assert_eq!(a, b);

    assert_eq!(a.window_size(), (12, 12));
    assert_eq!(a.num_stages(), 2);
    assert_eq!(a.num_stumps(), 3);
    assert_eq!(a.num_features(), 6);
    assert!(a.is_tilted());
}

#[test]
fn rewritten_file_loads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("two_stage.json");
    std::fs::write(&source, TWO_STAGE).unwrap();
    let cascade = load_cascade(&source).unwrap();

    let rewritten = dir.path().join("rewritten.json");
    write_cascade(&cascade, std::fs::File::create(&rewritten).unwrap()).unwrap();

    // The writer uses the current key names
    let text = std::fs::read_to_string(&rewritten).unwrap();
    assert!(text.contains("\"stages\""));
    assert!(text.contains("\"leftVal\""));
    assert_eq!(load_cascade(&rewritten).unwrap(), cascade);
}

#[test]
fn out_of_window_feature_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{ "size": [8, 8], "stages": [ { "threshold": 0, "stumps": [
            { "threshold": 0, "leftVal": 0, "rightVal": 1, "features": [[4, 0, 6, 8, 1]] }
        ] } ] }"#,
    )
    .unwrap();

    assert!(matches!(load_cascade(&path), Err(Error::InvalidCascade(_))));
}

#[test]
fn missing_and_malformed_files() {
    let dir = tempfile::tempdir().unwrap();

    assert!(matches!(load_cascade(dir.path().join("absent.json")), Err(Error::Io(_))));

    let garbage = dir.path().join("garbage.json");
    std::fs::write(&garbage, "{ not json").unwrap();
    assert!(matches!(load_cascade(&garbage), Err(Error::Json(_))));

    let native = dir.path().join("garbage.bin");
    std::fs::write(&native, [0xffu8; 3]).unwrap();
    assert!(CascadeClassifier::load(&native).is_err());
}

#[test]
fn frontal_face_cascade() {
    let Some(dir) = cascades_dir() else {
        eprintln!("Skipping test: cascades directory not found");
        return;
    };

    let path = dir.join("haarcascade_frontalface_alt.json");
    if !path.exists() {
        eprintln!("Skipping test: cascade file not found");
        return;
    }

    let cascade = load_cascade(&path).expect("Failed to load cascade");
    assert_eq!(cascade.window_size(), (20, 20));
    assert!(cascade.num_stages() > 10);
    println!(
        "frontalface_alt: {} stages, {} stumps, {} features",
        cascade.num_stages(),
        cascade.num_stumps(),
        cascade.num_features()
    );

    let detector = Detector::new(cascade, DetectorConfig::default()).unwrap();
    let frame: Vec<u8> = (0..320 * 240 * 4).map(|i| (i / 4 % 251) as u8).collect();
    let found = detector
        .detect(&RgbaFrame::new(&frame, 320, 240), &mut FrameBuffers::new())
        .unwrap();
    for d in &found {
        assert!(d.rect.x >= 0.0 && d.rect.y >= 0.0);
        assert!(d.rect.right() <= 320.0 && d.rect.bottom() <= 240.0);
    }
}
