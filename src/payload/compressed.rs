//! LZF compressed values, field after field.
//!
//! ```text
//! u32 LE  compressed length
//! u32 LE  uncompressed length
//! [u8]    LZF block
//! ```
//!
//! Once decompressed, field `i` occupies `size * count * points` contiguous bytes,
//! starting right after the bytes of field `i - 1`.

use std::io::{self, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::cloud::PointCloud;
use crate::errors::{LzfError, PcdError};
use crate::field::{create_column_for, Column, FieldInfo};
use crate::header::PcdHeader;
use crate::lzf;

use super::read_element;

const LENGTHS_SIZE: usize = 8;

/// Decodes the block of one field
fn decode_field(field: &FieldInfo, mut block: &[u8], num_points: usize) -> io::Result<Column> {
    let mut column = create_column_for(field);
    for _ in 0..num_points * field.count {
        read_element(field, &mut column, &mut block)?;
    }
    Ok(column)
}

/// Start and end of the block of each field in the decompressed buffer,
/// `None` if the layout does not fit in memory
fn field_ranges(fields: &[FieldInfo], num_points: usize) -> Option<Vec<(usize, usize)>> {
    let mut start = 0usize;
    fields
        .iter()
        .map(|field| {
            let end = field
                .byte_size
                .checked_mul(field.count)?
                .checked_mul(num_points)?
                .checked_add(start)?;
            let range = (start, end);
            start = end;
            Some(range)
        })
        .collect()
}

pub(super) fn decode(header: &PcdHeader, payload: &[u8]) -> crate::Result<Vec<Column>> {
    let mut src = payload;
    let truncated = |_| PcdError::DecompressionFailed(LzfError::TruncatedInput {
        position: payload.len(),
    });
    let compressed_len = src.read_u32::<LittleEndian>().map_err(truncated)? as usize;
    let uncompressed_len = src.read_u32::<LittleEndian>().map_err(truncated)? as usize;

    let block = src.get(..compressed_len).ok_or_else(|| {
        PcdError::DecompressionFailed(LzfError::TruncatedInput {
            position: LENGTHS_SIZE + src.len(),
        })
    })?;
    let raw = lzf::decompress(block, uncompressed_len).map_err(PcdError::DecompressionFailed)?;

    let ranges = field_ranges(&header.fields, header.points).ok_or_else(|| {
        PcdError::HeaderMalformed(format!(
            "{} points of {} bytes do not fit in memory",
            header.points,
            header.point_byte_size()
        ))
    })?;
    let expected = ranges.last().map_or(0, |&(_, end)| end);
    if raw.len() < expected {
        return Err(PcdError::PayloadSizeMismatch {
            expected,
            actual: raw.len(),
        });
    }
    if raw.len() > expected {
        log::warn!(
            "decompressed payload is {} bytes, {} are used",
            raw.len(),
            expected
        );
    }

    let columns = decode_fields(header, &raw, &ranges)?;
    Ok(columns)
}

#[cfg(not(feature = "parallel"))]
fn decode_fields(
    header: &PcdHeader,
    raw: &[u8],
    ranges: &[(usize, usize)],
) -> io::Result<Vec<Column>> {
    header
        .fields
        .iter()
        .zip(ranges)
        .map(|(field, &(start, end))| decode_field(field, &raw[start..end], header.points))
        .collect()
}

/// Each field block is decoded in its own task
#[cfg(feature = "parallel")]
fn decode_fields(
    header: &PcdHeader,
    raw: &[u8],
    ranges: &[(usize, usize)],
) -> io::Result<Vec<Column>> {
    use rayon::iter::{IntoParallelIterator, ParallelIterator};

    let blocks = header.fields.iter().zip(ranges).collect::<Vec<_>>();
    blocks
        .into_par_iter()
        .map(|(field, &(start, end))| decode_field(field, &raw[start..end], header.points))
        .collect()
}

/// Little endian bytes of all the values of one column
fn column_bytes(column: &Column) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(column.len() * column.scalar_type().byte_size());
    column.write_all_le(&mut bytes)?;
    Ok(bytes)
}

#[cfg(not(feature = "parallel"))]
fn field_major_bytes(cloud: &PointCloud) -> io::Result<Vec<u8>> {
    let blocks = cloud
        .columns()
        .iter()
        .map(column_bytes)
        .collect::<io::Result<Vec<_>>>()?;
    Ok(blocks.concat())
}

#[cfg(feature = "parallel")]
fn field_major_bytes(cloud: &PointCloud) -> io::Result<Vec<u8>> {
    use rayon::iter::{IntoParallelIterator, ParallelIterator};

    let blocks = cloud
        .columns()
        .into_par_iter()
        .map(column_bytes)
        .collect::<Vec<io::Result<Vec<u8>>>>();

    let mut raw = Vec::new();
    for block in blocks {
        raw.extend_from_slice(&block?);
    }
    Ok(raw)
}

/// Field major bytes of the cloud, compressed and prefixed with both lengths
pub(super) fn encode<W: Write>(cloud: &PointCloud, dst: &mut W) -> crate::Result<()> {
    let raw = field_major_bytes(cloud)?;
    let compressed = lzf::compress(&raw).map_err(PcdError::CompressionFailed)?;

    let length = |len: usize| {
        u32::try_from(len).map_err(|_| PcdError::CompressionFailed(LzfError::InputTooLarge(len)))
    };
    dst.write_u32::<LittleEndian>(length(compressed.len())?)?;
    dst.write_u32::<LittleEndian>(length(raw.len())?)?;
    dst.write_all(&compressed)?;

    log::debug!(
        "binary_compressed: {} bytes of points stored in {}",
        raw.len(),
        compressed.len()
    );
    Ok(())
}
