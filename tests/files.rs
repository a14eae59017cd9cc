use std::path::{Path, PathBuf};

use pcd_codec::color::transcode_for;
use pcd_codec::{Encoding, PointCloud};

const ENCODINGS: [Encoding; 3] = [
    Encoding::Ascii,
    Encoding::Binary,
    Encoding::BinaryCompressed,
];

fn sample_files() -> Vec<PathBuf> {
    let files = glob::glob("tests/data/*.pcd")
        .unwrap()
        .map(|entry| entry.unwrap())
        .collect::<Vec<_>>();
    assert!(!files.is_empty(), "no sample file found");
    files
}

fn sample(name: &str) -> PointCloud {
    pcd_codec::parse(Path::new("tests/data").join(name)).unwrap()
}

#[test]
fn test_every_sample_parses() {
    for path in sample_files() {
        let cloud = pcd_codec::parse(&path).unwrap();
        cloud.check_columns().unwrap();
        assert!(cloud.num_points() > 0, "{}", path.display());
        assert_eq!(cloud.num_points(), cloud.header().points, "{}", path.display());
    }
}

#[test]
fn test_every_sample_survives_every_encoding() {
    let dir = tempfile::tempdir().unwrap();
    for path in sample_files() {
        let cloud = pcd_codec::parse(&path).unwrap();
        for encoding in ENCODINGS {
            let out = dir.path().join(format!("out_{}.pcd", encoding));
            pcd_codec::write(&out, &cloud, encoding).unwrap();

            let read_back = pcd_codec::parse(&out).unwrap();
            let written = transcode_for(&cloud, encoding);
            assert_eq!(read_back.fields(), written.fields(), "{}", path.display());
            assert_eq!(
                read_back.columns(),
                written.columns(),
                "{} as {}",
                path.display(),
                encoding
            );
            assert_eq!(read_back.positions(), cloud.positions());
        }
    }
}

#[test]
fn test_ascii_sample() {
    let cloud = sample("xyz_label_ascii.pcd");
    assert_eq!(cloud.header().encoding, Encoding::Ascii);
    assert_eq!(cloud.field_names(), vec!["x", "y", "z", "label"]);
    assert_eq!(cloud.labels_or_zeros(), vec![0, 1, 2, 1]);
    assert_eq!(&cloud.positions()[6..9], &[-0.25, 1e-3, 7.5]);
    assert!(!cloud.has_rgb());
}

#[test]
fn test_binary_sample() {
    let cloud = sample("xyz_rgb_binary.pcd");
    assert_eq!(cloud.num_points(), 3);
    assert_eq!(cloud.positions()[..3], [0.5, 1.5, -2.0]);
    assert_eq!(cloud.labels_or_zeros(), vec![0, 0, 0]);

    assert!(cloud.has_rgb());
    let rgb = cloud.rgb_triples().unwrap();
    assert_eq!(rgb.len(), 9);
    assert_eq!(rgb[0], 1.0);
    assert!((rgb[1] - 128.0 / 255.0).abs() < 1e-6);
    assert_eq!(&rgb[2..6], &[0.0, 0.0, 0.0, 1.0]);
    assert!(rgb.iter().all(|c| (0.0..=1.0).contains(c)));
}

#[test]
fn test_compressed_sample() {
    let cloud = sample("xyz_intensity_compressed.pcd");
    assert_eq!(cloud.header().encoding, Encoding::BinaryCompressed);
    assert_eq!(cloud.num_points(), 5);

    let intensity = cloud.find_field("INTENSITY").unwrap();
    assert_eq!(
        cloud.column(intensity).unwrap().values::<u16>().unwrap(),
        &[0, 10, 20, 30, 40]
    );
    assert_eq!(cloud.field_as_double("ring").unwrap(), vec![0.0, 1.0, 0.0, 1.0, 0.0]);
    assert_eq!(cloud.field_as_float(0).unwrap(), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
}

#[test]
fn test_organized_sample() {
    let cloud = sample("organized_normals_ascii.pcd");
    assert_eq!(cloud.header().width, 2);
    assert_eq!(cloud.header().height, 2);
    assert_eq!(cloud.num_points(), 4);

    let normal = cloud.find_field("normal").unwrap();
    assert_eq!(cloud.fields()[normal].count, 3);
    assert_eq!(cloud.column(normal).unwrap().len(), 12);

    let rgb = cloud.rgb_triples().unwrap();
    assert_eq!(&rgb[..3], &[1.0, 0.0, 0.0]);

    // written as a single row
    let mut bytes = Vec::new();
    pcd_codec::write_to(&mut bytes, &cloud, &Default::default()).unwrap();
    let read_back = pcd_codec::read_from(&mut bytes.as_slice()).unwrap();
    assert_eq!(read_back.header().width, 4);
    assert_eq!(read_back.header().height, 1);
    assert_eq!(read_back.field_names(), vec!["x", "y", "z", "normal", "rgb"]);
    assert_eq!(read_back.rgb_triples(), cloud.rgb_triples());
}
