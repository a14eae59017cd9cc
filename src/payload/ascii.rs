//! One text line per point, one whitespace separated token per element.

use std::io::{self, Write};

use crate::cloud::PointCloud;
use crate::field::Column;
use crate::header::PcdHeader;

use super::empty_columns;

/// Decodes at most `header.points` rows, or every row when no point is declared
pub(super) fn decode(header: &PcdHeader, payload: &[u8]) -> Vec<Column> {
    let mut columns = empty_columns(header);
    let text = String::from_utf8_lossy(payload);
    let max_rows = match header.points {
        0 => usize::MAX,
        points => points,
    };

    let mut rows = 0;
    let mut padded_rows = 0;
    let mut dropped_rows = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if rows == max_rows {
            dropped_rows += 1;
            continue;
        }

        let mut tokens = line.split_whitespace();
        let mut padded = false;
        for (field, column) in header.fields.iter().zip(columns.iter_mut()) {
            for _ in 0..field.count {
                match tokens.next() {
                    Some(token) => column.push_token(token),
                    None => {
                        column.push_default();
                        padded = true;
                    }
                }
            }
        }
        if padded {
            padded_rows += 1;
        }
        rows += 1;
    }

    if padded_rows > 0 {
        log::warn!(
            "{} ascii rows had fewer values than fields, padded with zeros",
            padded_rows
        );
    }
    if dropped_rows > 0 {
        log::warn!(
            "POINTS is {}, the {} ascii rows after them are ignored",
            header.points,
            dropped_rows
        );
    }
    if rows < header.points {
        log::warn!("POINTS is {} but only {} ascii rows found", header.points, rows);
    }
    columns
}

pub(super) fn encode<W: Write>(cloud: &PointCloud, dst: &mut W) -> io::Result<()> {
    let mut line = String::new();
    for point in 0..cloud.num_points() {
        line.clear();
        for (field, column) in cloud.fields().iter().zip(cloud.columns()) {
            for element in 0..field.count {
                if !line.is_empty() {
                    line.push(' ');
                }
                column.format_into(point * field.count + element, &mut line);
            }
        }
        line.push('\n');
        dst.write_all(line.as_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::FieldKind;

    fn xyz_label_header(points: usize) -> PcdHeader {
        let mut header = PcdHeader::default();
        header.add_field("x", 4, FieldKind::Float, 1);
        header.add_field("y", 4, FieldKind::Float, 1);
        header.add_field("z", 4, FieldKind::Float, 1);
        header.add_field("label", 4, FieldKind::Unsigned, 1);
        header.points = points;
        header
    }

    #[test]
    fn test_decode_rows() {
        let columns = decode(&xyz_label_header(2), b"1.0 2.0 3.0 0\n4.0 5.0 6.0 1\n");
        assert_eq!(columns[0].values::<f32>().unwrap(), &[1.0, 4.0]);
        assert_eq!(columns[2].values::<f32>().unwrap(), &[3.0, 6.0]);
        assert_eq!(columns[3].values::<u32>().unwrap(), &[0, 1]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let columns = decode(&xyz_label_header(3), b"1 2 3 4\n5 6\n\n7 8 9 10\n");
        for column in columns.iter() {
            assert_eq!(column.len(), 3);
        }
        assert_eq!(columns[2].values::<f32>().unwrap(), &[3.0, 0.0, 9.0]);
        assert_eq!(columns[3].values::<u32>().unwrap(), &[4, 0, 10]);
    }

    #[test]
    fn test_rows_beyond_points_are_ignored() {
        let columns = decode(&xyz_label_header(1), b"1 2 3 4\n5 6 7 8\n");
        assert_eq!(columns[0].len(), 1);
    }

    #[test]
    fn test_every_row_without_points() {
        let columns = decode(&xyz_label_header(0), b"1 2 3 4\n5 6 7 8\n\n9 10 11 12\n");
        assert_eq!(columns[0].values::<f32>().unwrap(), &[1.0, 5.0, 9.0]);
        assert_eq!(columns[3].values::<u32>().unwrap(), &[4, 8, 12]);

        assert!(decode(&xyz_label_header(0), b"")[0].is_empty());
    }

    #[test]
    fn test_bad_tokens_become_zero() {
        let columns = decode(&xyz_label_header(1), b"1 nan? 3 x\r\n");
        assert_eq!(columns[1].values::<f32>().unwrap(), &[0.0]);
        assert_eq!(columns[3].values::<u32>().unwrap(), &[0]);
    }

    #[test]
    fn test_encode_multi_element_fields() {
        let mut header = PcdHeader::default();
        header.add_field("x", 4, FieldKind::Float, 1);
        header.add_field("hist", 2, FieldKind::Signed, 2);
        let cloud = PointCloud::from_parts(
            header,
            vec![
                Column::from(vec![0.5f32, -1.25]),
                Column::from(vec![1i16, -2, 3, 4]),
            ],
        )
        .unwrap();

        let mut out = Vec::new();
        encode(&cloud, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0.5 1 -2\n-1.25 3 4\n");
    }
}
