//! Decoding and encoding of the data that follows the header.
//!
//! All three encodings go through the same columnar representation, one
//! [`Column`] per field holding `count` values per point.

use std::io::{self, Read, Write};

use crate::cloud::PointCloud;
use crate::field::{create_column_for, read_unmapped, Column, FieldInfo};
use crate::header::{Encoding, PcdHeader};

mod ascii;
mod binary;
mod compressed;

/// Decodes `payload` according to the header encoding.
///
/// The returned columns all hold the same number of points, which may be
/// less than `header.points` if the payload is short.
pub(crate) fn decode(header: &PcdHeader, payload: &[u8]) -> crate::Result<Vec<Column>> {
    match header.encoding {
        Encoding::Ascii => Ok(ascii::decode(header, payload)),
        Encoding::Binary => Ok(binary::decode(header, payload)?),
        Encoding::BinaryCompressed => compressed::decode(header, payload),
    }
}

/// Encodes the points of `cloud` with `encoding`, the header is not written
pub(crate) fn encode<W: Write>(
    cloud: &PointCloud,
    encoding: Encoding,
    dst: &mut W,
) -> crate::Result<()> {
    match encoding {
        Encoding::Ascii => ascii::encode(cloud, dst)?,
        Encoding::Binary => binary::encode(cloud, dst)?,
        Encoding::BinaryCompressed => compressed::encode(cloud, dst)?,
    }
    Ok(())
}

fn empty_columns(header: &PcdHeader) -> Vec<Column> {
    header.fields.iter().map(create_column_for).collect()
}

/// Reads one little endian element of `field` into `column`
#[inline]
fn read_element<R: Read>(field: &FieldInfo, column: &mut Column, src: &mut R) -> io::Result<()> {
    if field.scalar_type().is_some() {
        column.push_le(src)
    } else {
        let value = read_unmapped(field, src)?;
        column.push_f64(value);
        Ok(())
    }
}
