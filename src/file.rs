//! Reading and writing whole PCD files.
//!
//! Files are read and written in one go: the payload is held in memory
//! for both operations.

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use crate::cloud::PointCloud;
use crate::color;
use crate::header::{Encoding, PcdHeader};
use crate::payload;

/// How a cloud gets written
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct WriteOptions {
    encoding: Encoding,
    transcode_colors: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            encoding: Encoding::Binary,
            transcode_colors: true,
        }
    }
}

impl WriteOptions {
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Whether colors are converted to the layout of the encoding, see [`color::transcode_for`]
    pub fn transcodes_colors(&self) -> bool {
        self.transcode_colors
    }
}

/// Builder for [`WriteOptions`]
#[derive(Debug, Default, Copy, Clone)]
pub struct WriteOptionsBuilder {
    options: WriteOptions,
}

impl WriteOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: Default::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.options.encoding = encoding;
        self
    }

    pub fn with_color_transcoding(mut self, transcode_colors: bool) -> Self {
        self.options.transcode_colors = transcode_colors;
        self
    }

    pub fn build(self) -> WriteOptions {
        self.options
    }
}

/// Reads a complete PCD file, header and points, from `src`
pub fn read_from<R: BufRead>(src: &mut R) -> crate::Result<PointCloud> {
    let header = PcdHeader::read_from(src)?;
    let mut data = Vec::new();
    src.read_to_end(&mut data)?;

    let columns = payload::decode(&header, &data)?;
    let mut cloud = PointCloud::from_parts(header, columns)?;
    let num_points = cloud.num_points();
    if cloud.header().points != num_points {
        cloud.header_mut().points = num_points;
    }

    log::debug!(
        "read {} points of {} fields, {} ({} payload bytes)",
        num_points,
        cloud.fields().len(),
        cloud.header().encoding,
        data.len()
    );
    Ok(cloud)
}

/// Reads the PCD file at `path`
pub fn parse<P: AsRef<Path>>(path: P) -> crate::Result<PointCloud> {
    let path = path.as_ref();
    log::debug!("parsing {}", path.display());
    let mut src = BufReader::new(File::open(path)?);
    read_from(&mut src)
}

/// Writes `cloud` to `dst`, header then points
pub fn write_to<W: Write>(
    dst: &mut W,
    cloud: &PointCloud,
    options: &WriteOptions,
) -> crate::Result<()> {
    cloud.check_columns()?;

    let encoding = options.encoding;
    let cloud = if options.transcode_colors {
        color::transcode_for(cloud, encoding)
    } else {
        Cow::Borrowed(cloud)
    };

    let num_points = cloud.num_points();
    cloud.header().write_to(dst, num_points, encoding)?;
    payload::encode(&cloud, encoding, dst)?;
    log::debug!(
        "wrote {} points of {} fields, {}",
        num_points,
        cloud.fields().len(),
        encoding
    );
    Ok(())
}

/// Writes `cloud` to the file at `path` with `encoding`, see [`write_with_options`]
pub fn write<P: AsRef<Path>>(path: P, cloud: &PointCloud, encoding: Encoding) -> crate::Result<()> {
    let options = WriteOptionsBuilder::new().with_encoding(encoding).build();
    write_with_options(path, cloud, &options)
}

/// Writes `cloud` to the file at `path`, replacing it.
///
/// The file is encoded in memory first, nothing is written if encoding fails.
pub fn write_with_options<P: AsRef<Path>>(
    path: P,
    cloud: &PointCloud,
    options: &WriteOptions,
) -> crate::Result<()> {
    let path = path.as_ref();
    let mut buffer = Vec::new();
    write_to(&mut buffer, cloud, options)?;
    fs::write(path, &buffer)?;
    log::debug!("{} bytes written to {}", buffer.len(), path.display());
    Ok(())
}

/// Replaces the `label` field of the file at `path`, adding it if needed.
///
/// The file is rewritten with `encoding`, or with its own encoding when `None`.
pub fn update_labels<P: AsRef<Path>>(
    path: P,
    labels: &[u32],
    encoding: Option<Encoding>,
) -> crate::Result<()> {
    let path = path.as_ref();
    let mut cloud = parse(path)?;
    let encoding = encoding.unwrap_or(cloud.header().encoding);
    cloud.set_labels(labels);
    write(path, &cloud, encoding)
}

/// Rewrites the file at `path` with `encoding`
pub fn convert_format<P: AsRef<Path>>(path: P, encoding: Encoding) -> crate::Result<()> {
    let path = path.as_ref();
    let cloud = parse(path)?;
    log::debug!(
        "converting {} from {} to {}",
        path.display(),
        cloud.header().encoding,
        encoding
    );
    write(path, &cloud, encoding)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::PcdError;
    use crate::field::Column;

    const SCENARIO: &str = "VERSION 0.7\n\
                            FIELDS x y z label\n\
                            SIZE 4 4 4 4\n\
                            TYPE F F F U\n\
                            COUNT 1 1 1 1\n\
                            WIDTH 2\n\
                            HEIGHT 1\n\
                            VIEWPOINT 0 0 0 1 0 0 0\n\
                            POINTS 2\n\
                            DATA ascii\n\
                            1.0 2.0 3.0 0\n\
                            4.0 5.0 6.0 1\n";

    fn read_str(s: &str) -> crate::Result<PointCloud> {
        read_from(&mut s.as_bytes())
    }

    #[test]
    fn test_read_ascii_scenario() {
        let cloud = read_str(SCENARIO).unwrap();
        assert_eq!(cloud.num_points(), 2);
        assert_eq!(cloud.positions(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(cloud.labels_or_zeros(), vec![0, 1]);
        assert_eq!(cloud.field_as_float(3).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_point_count_follows_the_data() {
        let cloud = read_str(&SCENARIO.replace("POINTS 2", "POINTS 5")).unwrap();
        assert_eq!(cloud.header().points, 2);
    }

    #[test]
    fn test_write_then_read_every_encoding() {
        let original = read_str(SCENARIO).unwrap();
        for encoding in [Encoding::Ascii, Encoding::Binary, Encoding::BinaryCompressed] {
            let options = WriteOptionsBuilder::new().with_encoding(encoding).build();
            let mut bytes = Vec::new();
            write_to(&mut bytes, &original, &options).unwrap();

            let cloud = read_from(&mut bytes.as_slice()).unwrap();
            assert_eq!(cloud.header().encoding, encoding);
            assert_eq!(cloud.columns(), original.columns());
        }
    }

    #[test]
    fn test_colors_follow_the_encoding() {
        let mut cloud = read_str(SCENARIO).unwrap();
        cloud.push_field(
            "rgb",
            Column::from(vec![f32::from_bits(0x00FF_8000), f32::from_bits(0x0000_00FF)]),
        );

        let ascii = WriteOptionsBuilder::new().with_encoding(Encoding::Ascii).build();
        let mut bytes = Vec::new();
        write_to(&mut bytes, &cloud, &ascii).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("FIELDS x y z label r g b\n"), "{}", text);
        assert!(text.ends_with("1 2 3 0 255 128 0\n4 5 6 1 0 0 255\n"), "{}", text);

        let read_back = read_from(&mut text.as_bytes()).unwrap();
        let mut bytes = Vec::new();
        write_to(&mut bytes, &read_back, &WriteOptions::default()).unwrap();
        let binary = read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(binary, {
            let mut expected = cloud.clone();
            expected.header_mut().encoding = Encoding::Binary;
            expected.header_mut().width = 2;
            expected
        });
    }

    #[test]
    fn test_colors_kept_without_transcoding() {
        let mut cloud = read_str(SCENARIO).unwrap();
        cloud.push_field("rgb", Column::from(vec![1.0f32, 2.0]));
        let options = WriteOptionsBuilder::new()
            .with_encoding(Encoding::Ascii)
            .with_color_transcoding(false)
            .build();
        assert!(!options.transcodes_colors());

        let mut bytes = Vec::new();
        write_to(&mut bytes, &cloud, &options).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("FIELDS x y z label rgb\n"));
    }

    #[test]
    fn test_inconsistent_cloud_is_not_written() {
        let mut cloud = read_str(SCENARIO).unwrap();
        cloud.column_mut(0).unwrap().resize(3);
        let mut bytes = Vec::new();
        let result = write_to(&mut bytes, &cloud, &WriteOptions::default());
        assert!(matches!(result, Err(PcdError::InconsistentColumns(_))));
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_default_options() {
        let options = WriteOptions::default();
        assert_eq!(options.encoding(), Encoding::Binary);
        assert!(options.transcodes_colors());
        assert_eq!(WriteOptionsBuilder::new().build(), options);
    }
}
