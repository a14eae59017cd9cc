//! The text header of PCD files.
//!
//! ```text
//! # .PCD v0.7 - Point Cloud Data file format
//! VERSION 0.7
//! FIELDS x y z rgb
//! SIZE 4 4 4 4
//! TYPE F F F F
//! COUNT 1 1 1 1
//! WIDTH 213
//! HEIGHT 1
//! VIEWPOINT 0 0 0 1 0 0 0
//! POINTS 213
//! DATA ascii
//! ```
//!
//! Parsing is tolerant: unknown keys, blank lines and comments are skipped and
//! fields missing a SIZE, TYPE or COUNT entry get `4`, `F` and `1`.
//! Only a missing `DATA` line, or an unknown encoding in it, is an error.

use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use crate::errors::PcdError;
use crate::field::{FieldInfo, FieldKind};

pub const HEADER_COMMENT: &str = "# .PCD v0.7 - Point Cloud Data file format";
pub const DEFAULT_VERSION: &str = "0.7";
pub const DEFAULT_VIEWPOINT: &str = "0 0 0 1 0 0 0";

const DEFAULT_SIZE: usize = 4;
const DEFAULT_KIND: FieldKind = FieldKind::Float;
const DEFAULT_COUNT: usize = 1;

/// How the points are stored after the header
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Encoding {
    /// One text line per point
    Ascii,
    /// Raw little endian values, point after point
    Binary,
    /// LZF compressed raw values, field after field
    BinaryCompressed,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Ascii => "ascii",
            Encoding::Binary => "binary",
            Encoding::BinaryCompressed => "binary_compressed",
        }
    }

    pub fn is_binary(self) -> bool {
        self != Encoding::Ascii
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = PcdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascii" => Ok(Encoding::Ascii),
            "binary" => Ok(Encoding::Binary),
            "binary_compressed" => Ok(Encoding::BinaryCompressed),
            _ => Err(PcdError::UnsupportedEncoding(s.to_string())),
        }
    }
}

/// Header of a PCD file
#[derive(Debug, Clone, PartialEq)]
pub struct PcdHeader {
    pub version: String,
    pub fields: Vec<FieldInfo>,
    pub width: u64,
    pub height: u64,
    /// The seven numbers of the VIEWPOINT line, as written
    pub viewpoint: String,
    /// Number of points declared, WIDTH * HEIGHT when there is no POINTS line
    pub points: usize,
    pub encoding: Encoding,
}

impl Default for PcdHeader {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            fields: vec![],
            width: 0,
            height: 1,
            viewpoint: DEFAULT_VIEWPOINT.to_string(),
            points: 0,
            encoding: Encoding::Ascii,
        }
    }
}

/// Parses the leading run of values that parse, like reading a stream until it fails
fn parse_all<T: FromStr>(values: &str) -> Vec<T> {
    values
        .split_whitespace()
        .map_while(|token| token.parse().ok())
        .collect()
}

/// One space before each entry
fn joined<F: Fn(&FieldInfo) -> String>(fields: &[FieldInfo], entry: F) -> String {
    fields.iter().map(|field| format!(" {}", entry(field))).collect()
}

fn parse_first<T: FromStr>(values: &str, key: &str) -> Option<T> {
    let value = values.split_whitespace().next()?.parse().ok();
    if value.is_none() {
        log::warn!("ignoring unparseable {} value {:?}", key, values.trim());
    }
    value
}

impl PcdHeader {
    /// Index of the first field named `name`, ignoring case
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.is_named(name))
    }

    /// Number of bytes of one point in the binary encoding
    pub fn point_byte_size(&self) -> usize {
        self.fields
            .iter()
            .map(FieldInfo::point_byte_size)
            .fold(0, usize::saturating_add)
    }

    pub fn add_field<S: Into<String>>(
        &mut self,
        name: S,
        byte_size: usize,
        kind: FieldKind,
        count: usize,
    ) -> usize {
        self.fields.push(FieldInfo::new(name, byte_size, kind, count));
        self.fields.len() - 1
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// Reads the header lines, up to and including the `DATA` line.
    ///
    /// `src` is left positioned on the first byte of the payload.
    pub fn read_from<R: BufRead>(src: &mut R) -> crate::Result<Self> {
        let mut header = PcdHeader::default();
        let mut names: Vec<String> = vec![];
        let mut sizes: Vec<usize> = vec![];
        let mut kinds: Vec<char> = vec![];
        let mut counts: Vec<usize> = vec![];
        let mut encoding = None;
        let mut points = None;

        let mut raw_line = Vec::new();
        while encoding.is_none() {
            raw_line.clear();
            if src.read_until(b'\n', &mut raw_line)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&raw_line);
            let line = line.trim_end_matches(|c| c == '\n' || c == '\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let trimmed = line.trim_start();
            let (key, values) = match trimmed.find(char::is_whitespace) {
                Some(end) => (&trimmed[..end], &trimmed[end..]),
                None => (trimmed, ""),
            };

            match key {
                "VERSION" => {
                    if let Some(version) = values.split_whitespace().next() {
                        header.version = version.to_string();
                    }
                }
                "FIELDS" => names.extend(values.split_whitespace().map(str::to_string)),
                "SIZE" => sizes.extend(parse_all::<usize>(values)),
                "TYPE" => kinds.extend(values.chars().filter(|c| !c.is_whitespace())),
                "COUNT" => counts.extend(parse_all::<usize>(values)),
                "WIDTH" => {
                    if let Some(width) = parse_first(values, key) {
                        header.width = width;
                    }
                }
                "HEIGHT" => {
                    if let Some(height) = parse_first(values, key) {
                        header.height = height;
                    }
                }
                "VIEWPOINT" => {
                    header.viewpoint = values.strip_prefix(' ').unwrap_or(values).to_string();
                }
                "POINTS" => {
                    if let Some(value) = parse_first(values, key) {
                        points = Some(value);
                    }
                }
                "DATA" => {
                    let name = values.split_whitespace().next().unwrap_or("");
                    encoding = Some(name.parse::<Encoding>()?);
                }
                _ => log::debug!("skipping unknown header line {:?}", line),
            }
        }

        header.encoding = encoding
            .ok_or_else(|| PcdError::HeaderMalformed("missing DATA line".to_string()))?;
        header.points = match points {
            Some(points) => points,
            None => {
                let points = header.width.saturating_mul(header.height);
                log::debug!("no POINTS line, using WIDTH * HEIGHT = {}", points);
                usize::try_from(points).unwrap_or(usize::MAX)
            }
        };

        for (i, name) in names.into_iter().enumerate() {
            let byte_size = sizes.get(i).copied().unwrap_or(DEFAULT_SIZE);
            let kind = match kinds.get(i) {
                Some(&code) => FieldKind::from_code(code).unwrap_or_else(|| {
                    log::warn!("unknown TYPE '{}' for field '{}', using F", code, name);
                    DEFAULT_KIND
                }),
                None => DEFAULT_KIND,
            };
            let count = match counts.get(i).copied() {
                Some(0) => {
                    log::warn!("COUNT 0 for field '{}', using 1", name);
                    DEFAULT_COUNT
                }
                Some(count) => count,
                None => DEFAULT_COUNT,
            };
            header.fields.push(FieldInfo::new(name, byte_size, kind, count));
        }

        Ok(header)
    }

    /// Writes the header for `num_points` points stored with `encoding`.
    ///
    /// WIDTH and POINTS are always `num_points`, HEIGHT is always 1.
    pub fn write_to<W: Write>(
        &self,
        dst: &mut W,
        num_points: usize,
        encoding: Encoding,
    ) -> std::io::Result<()> {
        let fields = &self.fields;
        writeln!(dst, "{}", HEADER_COMMENT)?;
        writeln!(dst, "VERSION {}", self.version)?;
        writeln!(dst, "FIELDS{}", joined(fields, |field| field.name.clone()))?;
        writeln!(dst, "SIZE{}", joined(fields, |field| field.byte_size.to_string()))?;
        writeln!(dst, "TYPE{}", joined(fields, |field| field.kind.to_string()))?;
        writeln!(dst, "COUNT{}", joined(fields, |field| field.count.to_string()))?;
        writeln!(dst, "WIDTH {}", num_points)?;
        writeln!(dst, "HEIGHT 1")?;
        writeln!(dst, "VIEWPOINT {}", self.viewpoint)?;
        writeln!(dst, "POINTS {}", num_points)?;
        writeln!(dst, "DATA {}", encoding)?;
        Ok(())
    }
}
