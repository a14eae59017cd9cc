//! Raw little endian values, point after point.

use std::io::{self, Write};

use crate::cloud::PointCloud;
use crate::field::Column;
use crate::header::PcdHeader;

use super::{empty_columns, read_element};

pub(super) fn decode(header: &PcdHeader, payload: &[u8]) -> io::Result<Vec<Column>> {
    let point_size = header.point_byte_size();
    let available = payload.len().checked_div(point_size).unwrap_or(0);
    let num_points = if available < header.points {
        log::warn!(
            "binary payload holds {} of the {} points declared, truncating",
            available,
            header.points
        );
        available
    } else {
        header.points
    };

    let mut columns = empty_columns(header);
    let mut src = payload;
    for _ in 0..num_points {
        for (field, column) in header.fields.iter().zip(columns.iter_mut()) {
            for _ in 0..field.count {
                read_element(field, column, &mut src)?;
            }
        }
    }
    Ok(columns)
}

pub(super) fn encode<W: Write>(cloud: &PointCloud, dst: &mut W) -> io::Result<()> {
    for point in 0..cloud.num_points() {
        for (field, column) in cloud.fields().iter().zip(cloud.columns()) {
            for element in 0..field.count {
                column.write_le(point * field.count + element, dst)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::field::FieldKind;

    fn header(points: usize) -> PcdHeader {
        let mut header = PcdHeader::default();
        header.add_field("x", 4, FieldKind::Float, 1);
        header.add_field("i", 2, FieldKind::Unsigned, 1);
        header.add_field("t", 8, FieldKind::Signed, 1);
        header.points = points;
        header
    }

    fn point(x: f32, i: u16, t: i64) -> Vec<u8> {
        let mut bytes = x.to_le_bytes().to_vec();
        bytes.extend_from_slice(&i.to_le_bytes());
        bytes.extend_from_slice(&t.to_le_bytes());
        bytes
    }

    #[test]
    fn test_decode_point_major() {
        let mut payload = point(1.5, 7, -3);
        payload.extend(point(-2.0, 65535, 1 << 40));

        let columns = decode(&header(2), &payload).unwrap();
        assert_eq!(columns[0].values::<f32>().unwrap(), &[1.5, -2.0]);
        assert_eq!(columns[1].values::<u16>().unwrap(), &[7, 65535]);
        assert_eq!(
            columns[2].values::<f32>().unwrap(),
            &[-3.0, (1u64 << 40) as f32]
        );
    }

    #[test]
    fn test_short_payload_is_truncated() {
        let mut payload = point(1.0, 1, 1);
        payload.extend_from_slice(&[0u8; 5]);
        let columns = decode(&header(2), &payload).unwrap();
        for column in columns.iter() {
            assert_eq!(column.len(), 1);
        }
    }

    #[test]
    fn test_encode_point_major() {
        let mut header = PcdHeader::default();
        header.add_field("a", 1, FieldKind::Unsigned, 1);
        header.add_field("b", 2, FieldKind::Signed, 1);
        let cloud = PointCloud::from_parts(
            header,
            vec![Column::from(vec![1u8, 2]), Column::from(vec![-1i16, 0x0102])],
        )
        .unwrap();

        let mut out = Vec::new();
        encode(&cloud, &mut out).unwrap();
        assert_eq!(out, vec![1, 0xFF, 0xFF, 2, 0x02, 0x01]);
    }
}
