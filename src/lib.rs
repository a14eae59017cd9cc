//! Reader and writer of PCD (Point Cloud Data) files.
//!
//! A PCD file is a text header describing the fields of the points
//! followed by the points themselves, in one of three encodings:
//!
//! - `ascii`: one line of text per point
//! - `binary`: raw little endian values, point after point
//! - `binary_compressed`: raw values, field after field, compressed with [`lzf`]
//!
//! Files are decoded into a [`PointCloud`], which holds one typed [`Column`] per field.
//!
//! # Examples
//!
//! ```
//! use pcd_codec::{Column, Encoding, PcdError, PointCloud};
//!
//! # fn main() -> Result<(), PcdError> {
//! let mut cloud = PointCloud::default();
//! cloud.push_field("x", Column::from(vec![1.0f32, 4.0]));
//! cloud.push_field("y", Column::from(vec![2.0f32, 5.0]));
//! cloud.push_field("z", Column::from(vec![3.0f32, 6.0]));
//! cloud.set_labels(&[0, 1]);
//!
//! // Here we use a Vec but a path and pcd_codec::write will work just fine
//! let mut output = Vec::new();
//! let options = pcd_codec::WriteOptionsBuilder::new()
//!     .with_encoding(Encoding::BinaryCompressed)
//!     .build();
//! pcd_codec::write_to(&mut output, &cloud, &options)?;
//!
//! let read_back = pcd_codec::read_from(&mut output.as_slice())?;
//! assert_eq!(read_back.positions(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(read_back.labels_or_zeros(), vec![0, 1]);
//! # Ok(())
//! # }
//! ```
//!
//! Files on disk are handled by [`parse`], [`write`], [`update_labels`] and [`convert_format`].
//!
//! # Colors
//!
//! When writing, colors are converted to the layout usual for the encoding:
//! separate `r g b` fields for ascii, a packed `rgb` field for the binary
//! encodings. See the [`color`] module.
//!
//! # Parallelism
//!
//! This crate has an optional feature 'parallel'.
//! When using this feature, the field blocks of `binary_compressed` payloads
//! are decoded and encoded using multiple threads.

pub(crate) mod payload;

pub mod cloud;
pub mod color;
pub mod errors;
pub mod field;
pub mod file;
pub mod header;
pub mod lzf;

pub use cloud::PointCloud;
pub use errors::{LzfError, PcdError};
pub use field::{Column, FieldInfo, FieldKind, Scalar, ScalarType};
pub use file::{
    convert_format, parse, read_from, update_labels, write, write_to, write_with_options,
    WriteOptions, WriteOptionsBuilder,
};
pub use header::{Encoding, PcdHeader};

pub type Result<T> = std::result::Result<T, PcdError>;
