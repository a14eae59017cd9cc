//! Typed field metadata and the columnar value store built on it.
//!
//! Every field of a PCD header owns one [`Column`], a contiguous vector of one
//! of the eight numeric types a PCD field can hold. The [`Scalar`] trait carries
//! everything that depends on the numeric type (wire reading and writing, text
//! parsing and formatting, conversions), so the per-column code is written once.

use std::fmt::{self, Display, LowerExp, Write as FmtWrite};
use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_traits::AsPrimitive;

/// Kind of the values of a field, the `TYPE` header entry
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FieldKind {
    /// `I`
    Signed,
    /// `U`
    Unsigned,
    /// `F`
    Float,
}

impl FieldKind {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'I' => Some(FieldKind::Signed),
            'U' => Some(FieldKind::Unsigned),
            'F' => Some(FieldKind::Float),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            FieldKind::Signed => 'I',
            FieldKind::Unsigned => 'U',
            FieldKind::Float => 'F',
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// In-memory representation of a column
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    /// Maps a `(TYPE, SIZE)` pair of the header to its representation.
    ///
    /// Returns `None` for pairs outside the PCD field universe, like 8 byte integers.
    pub fn from_layout(kind: FieldKind, byte_size: usize) -> Option<Self> {
        use FieldKind::*;
        match (kind, byte_size) {
            (Signed, 1) => Some(ScalarType::I8),
            (Signed, 2) => Some(ScalarType::I16),
            (Signed, 4) => Some(ScalarType::I32),
            (Unsigned, 1) => Some(ScalarType::U8),
            (Unsigned, 2) => Some(ScalarType::U16),
            (Unsigned, 4) => Some(ScalarType::U32),
            (Float, 4) => Some(ScalarType::F32),
            (Float, 8) => Some(ScalarType::F64),
            _ => None,
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            ScalarType::I8 | ScalarType::I16 | ScalarType::I32 => FieldKind::Signed,
            ScalarType::U8 | ScalarType::U16 | ScalarType::U32 => FieldKind::Unsigned,
            ScalarType::F32 | ScalarType::F64 => FieldKind::Float,
        }
    }
}

/// Description of one field (dimension) of the points
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    /// Size in bytes of one element, 1, 2, 4 or 8
    pub byte_size: usize,
    pub kind: FieldKind,
    /// Number of elements per point
    pub count: usize,
}

impl FieldInfo {
    pub fn new<S: Into<String>>(name: S, byte_size: usize, kind: FieldKind, count: usize) -> Self {
        Self {
            name: name.into(),
            byte_size,
            kind,
            count,
        }
    }

    /// A single element field stored as `scalar_type`
    pub fn of_type<S: Into<String>>(name: S, scalar_type: ScalarType) -> Self {
        Self::new(name, scalar_type.byte_size(), scalar_type.kind(), 1)
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        ScalarType::from_layout(self.kind, self.byte_size)
    }

    /// Number of bytes this field takes in one point
    pub fn point_byte_size(&self) -> usize {
        self.byte_size.saturating_mul(self.count)
    }

    /// Case insensitive name comparison
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Creates the empty column able to hold the values of `field`.
///
/// Layouts that [`ScalarType::from_layout`] does not map (8 byte integers,
/// 1 or 2 byte floats) are stored in a f32 column. This keeps files using
/// such fields readable, the values are converted when decoded.
pub fn create_column_for(field: &FieldInfo) -> Column {
    match field.scalar_type() {
        Some(scalar_type) => Column::new(scalar_type),
        None => {
            log::warn!(
                "field '{}' ({} {}) has no matching representation, storing it as F 4",
                field.name,
                field.kind,
                field.byte_size
            );
            Column::F32(Vec::new())
        }
    }
}

/// Reads one element of a field whose layout has no representation.
///
/// 8 byte integers are read as such, anything else has no meaningful value.
pub(crate) fn read_unmapped<R: Read>(field: &FieldInfo, src: &mut R) -> io::Result<f64> {
    let value = match (field.kind, field.byte_size) {
        (FieldKind::Signed, 8) => src.read_i64::<LittleEndian>()? as f64,
        (FieldKind::Unsigned, 8) => src.read_u64::<LittleEndian>()? as f64,
        (_, size) => {
            io::copy(&mut src.take(size as u64), &mut io::sink())?;
            0.0
        }
    };
    Ok(value)
}

/// Numeric types a [`Column`] can hold
pub trait Scalar:
    Copy
    + Default
    + PartialEq
    + fmt::Debug
    + AsPrimitive<f32>
    + AsPrimitive<f64>
    + AsPrimitive<u32>
    + Send
    + Sync
    + 'static
{
    const SCALAR_TYPE: ScalarType;

    fn read_le<R: Read>(src: &mut R) -> io::Result<Self>;
    fn write_le<W: Write>(self, dst: &mut W) -> io::Result<()>;

    /// Parses an ascii token, `None` if it is not a number
    fn parse_token(token: &str) -> Option<Self>;
    /// Appends the ascii representation, exact enough to parse back the same value
    fn format_into(self, out: &mut String);

    fn from_f64(value: f64) -> Self;

    fn into_column(values: Vec<Self>) -> Column;
    fn values_of(column: &Column) -> Option<&[Self]>;
    fn values_of_mut(column: &mut Column) -> Option<&mut Vec<Self>>;
}

macro_rules! scalar_io {
    (byte $read:ident, $write:ident) => {
        fn read_le<R: Read>(src: &mut R) -> io::Result<Self> {
            src.$read()
        }

        fn write_le<W: Write>(self, dst: &mut W) -> io::Result<()> {
            dst.$write(self)
        }
    };
    ($read:ident, $write:ident) => {
        fn read_le<R: Read>(src: &mut R) -> io::Result<Self> {
            src.$read::<LittleEndian>()
        }

        fn write_le<W: Write>(self, dst: &mut W) -> io::Result<()> {
            dst.$write::<LittleEndian>(self)
        }
    };
}

macro_rules! scalar_column {
    ($variant:ident) => {
        const SCALAR_TYPE: ScalarType = ScalarType::$variant;

        fn into_column(values: Vec<Self>) -> Column {
            Column::$variant(values)
        }

        fn values_of(column: &Column) -> Option<&[Self]> {
            match column {
                Column::$variant(values) => Some(values),
                _ => None,
            }
        }

        fn values_of_mut(column: &mut Column) -> Option<&mut Vec<Self>> {
            match column {
                Column::$variant(values) => Some(values),
                _ => None,
            }
        }
    };
}

macro_rules! impl_integer_scalar {
    ($ty:ty, $variant:ident, $($io:tt)*) => {
        impl Scalar for $ty {
            scalar_column!($variant);
            scalar_io!($($io)*);

            fn parse_token(token: &str) -> Option<Self> {
                // negative values wrap into unsigned types, like strtoul does
                token
                    .parse::<i64>()
                    .map(|v| v as $ty)
                    .ok()
                    .or_else(|| token.parse::<f64>().ok().map(|v| v as $ty))
            }

            fn format_into(self, out: &mut String) {
                let _ = write!(out, "{}", self);
            }

            fn from_f64(value: f64) -> Self {
                value as $ty
            }
        }
    };
}

macro_rules! impl_float_scalar {
    ($ty:ty, $variant:ident, $($io:tt)*) => {
        impl Scalar for $ty {
            scalar_column!($variant);
            scalar_io!($($io)*);

            fn parse_token(token: &str) -> Option<Self> {
                token.parse::<$ty>().ok()
            }

            fn format_into(self, out: &mut String) {
                format_float(self, f64::from(self), out);
            }

            fn from_f64(value: f64) -> Self {
                value as $ty
            }
        }
    };
}

/// Shortest representation that parses back to the same value, in
/// exponential notation for very small or very large magnitudes
/// (packed colors reinterpreted as floats are often subnormal).
fn format_float<T: Display + LowerExp>(value: T, as_f64: f64, out: &mut String) {
    let magnitude = as_f64.abs();
    let _ = if magnitude == 0.0 || !magnitude.is_finite() || (1e-5..1e16).contains(&magnitude) {
        write!(out, "{}", value)
    } else {
        write!(out, "{:e}", value)
    };
}

impl_integer_scalar!(i8, I8, byte read_i8, write_i8);
impl_integer_scalar!(u8, U8, byte read_u8, write_u8);
impl_integer_scalar!(i16, I16, read_i16, write_i16);
impl_integer_scalar!(u16, U16, read_u16, write_u16);
impl_integer_scalar!(i32, I32, read_i32, write_i32);
impl_integer_scalar!(u32, U32, read_u32, write_u32);
impl_float_scalar!(f32, F32, read_f32, write_f32);
impl_float_scalar!(f64, F64, read_f64, write_f64);

/// Values of one field, for all points, stored contiguously.
///
/// A field with `count > 1` stores its `count` elements of a point next to each other.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// Runs `$body` with `$values` bound to the vector inside `$column`, whatever its type
macro_rules! with_values {
    ($column:expr, $values:ident => $body:expr) => {
        match $column {
            Column::I8($values) => $body,
            Column::U8($values) => $body,
            Column::I16($values) => $body,
            Column::U16($values) => $body,
            Column::I32($values) => $body,
            Column::U32($values) => $body,
            Column::F32($values) => $body,
            Column::F64($values) => $body,
        }
    };
}

fn cast_all<S: Scalar, D: Scalar>(values: &[S]) -> Vec<D> {
    values
        .iter()
        .map(|v| D::from_f64(AsPrimitive::<f64>::as_(*v)))
        .collect()
}

impl Column {
    pub fn new(scalar_type: ScalarType) -> Self {
        Self::with_capacity(scalar_type, 0)
    }

    pub fn with_capacity(scalar_type: ScalarType, capacity: usize) -> Self {
        match scalar_type {
            ScalarType::I8 => Column::I8(Vec::with_capacity(capacity)),
            ScalarType::U8 => Column::U8(Vec::with_capacity(capacity)),
            ScalarType::I16 => Column::I16(Vec::with_capacity(capacity)),
            ScalarType::U16 => Column::U16(Vec::with_capacity(capacity)),
            ScalarType::I32 => Column::I32(Vec::with_capacity(capacity)),
            ScalarType::U32 => Column::U32(Vec::with_capacity(capacity)),
            ScalarType::F32 => Column::F32(Vec::with_capacity(capacity)),
            ScalarType::F64 => Column::F64(Vec::with_capacity(capacity)),
        }
    }

    /// Converts `values` into a column of `scalar_type`
    pub fn from_u32s(scalar_type: ScalarType, values: &[u32]) -> Self {
        match scalar_type {
            ScalarType::U32 => Column::U32(values.to_vec()),
            ScalarType::I8 => Column::I8(cast_all(values)),
            ScalarType::U8 => Column::U8(cast_all(values)),
            ScalarType::I16 => Column::I16(cast_all(values)),
            ScalarType::U16 => Column::U16(cast_all(values)),
            ScalarType::I32 => Column::I32(cast_all(values)),
            ScalarType::F32 => Column::F32(cast_all(values)),
            ScalarType::F64 => Column::F64(cast_all(values)),
        }
    }

    pub fn scalar_type(&self) -> ScalarType {
        with_values!(self, values => element_type(values))
    }

    pub fn len(&self) -> usize {
        with_values!(self, values => values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed view of the values, `None` if `T` is not the column type
    pub fn values<T: Scalar>(&self) -> Option<&[T]> {
        T::values_of(self)
    }

    pub fn values_mut<T: Scalar>(&mut self) -> Option<&mut Vec<T>> {
        T::values_of_mut(self)
    }

    pub fn get_f32(&self, index: usize) -> Option<f32> {
        with_values!(self, values => values.get(index).map(|v| AsPrimitive::<f32>::as_(*v)))
    }

    pub fn get_f64(&self, index: usize) -> Option<f64> {
        with_values!(self, values => values.get(index).map(|v| AsPrimitive::<f64>::as_(*v)))
    }

    pub fn get_u32(&self, index: usize) -> Option<u32> {
        with_values!(self, values => values.get(index).map(|v| AsPrimitive::<u32>::as_(*v)))
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        with_values!(self, values => values.iter().map(|v| AsPrimitive::<f32>::as_(*v)).collect())
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        with_values!(self, values => values.iter().map(|v| AsPrimitive::<f64>::as_(*v)).collect())
    }

    pub fn push_default(&mut self) {
        with_values!(self, values => values.push(Default::default()))
    }

    pub fn push_f64(&mut self, value: f64) {
        with_values!(self, values => values.push(Scalar::from_f64(value)))
    }

    /// Pushes the parsed token, or the zero value if it does not parse
    pub fn push_token(&mut self, token: &str) {
        with_values!(self, values => values.push(Scalar::parse_token(token).unwrap_or_default()))
    }

    /// Reads one little endian value and pushes it
    pub fn push_le<R: Read>(&mut self, src: &mut R) -> io::Result<()> {
        with_values!(self, values => {
            values.push(Scalar::read_le(src)?);
            Ok(())
        })
    }

    pub fn write_le<W: Write>(&self, index: usize, dst: &mut W) -> io::Result<()> {
        with_values!(self, values => match values.get(index) {
            Some(value) => value.write_le(dst),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("no value at index {}", index),
            )),
        })
    }

    /// Writes every value, little endian, one after the other
    pub fn write_all_le<W: Write>(&self, dst: &mut W) -> io::Result<()> {
        with_values!(self, values => {
            for value in values.iter() {
                value.write_le(dst)?;
            }
            Ok(())
        })
    }

    /// Appends the text form of the value at `index`, nothing if it does not exist
    pub fn format_into(&self, index: usize, out: &mut String) {
        with_values!(self, values => {
            if let Some(value) = values.get(index) {
                value.format_into(out);
            }
        })
    }

    /// Shortens or zero extends the column to `len` values
    pub fn resize(&mut self, len: usize) {
        with_values!(self, values => values.resize(len, Default::default()))
    }
}

fn element_type<T: Scalar>(_: &[T]) -> ScalarType {
    T::SCALAR_TYPE
}

macro_rules! impl_column_from_vec {
    ($($ty:ty),*) => {
        $(
            impl From<Vec<$ty>> for Column {
                fn from(values: Vec<$ty>) -> Self {
                    <$ty as Scalar>::into_column(values)
                }
            }
        )*
    };
}

impl_column_from_vec!(i8, u8, i16, u16, i32, u32, f32, f64);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_layout_mapping() {
        assert_eq!(
            ScalarType::from_layout(FieldKind::Unsigned, 1),
            Some(ScalarType::U8)
        );
        assert_eq!(
            ScalarType::from_layout(FieldKind::Float, 8),
            Some(ScalarType::F64)
        );
        assert_eq!(ScalarType::from_layout(FieldKind::Signed, 8), None);
        assert_eq!(ScalarType::from_layout(FieldKind::Float, 2), None);
    }

    #[test]
    fn test_create_column_for() {
        let label = FieldInfo::new("label", 4, FieldKind::Unsigned, 1);
        assert_eq!(create_column_for(&label).scalar_type(), ScalarType::U32);

        let r = FieldInfo::new("r", 1, FieldKind::Unsigned, 1);
        assert_eq!(create_column_for(&r).scalar_type(), ScalarType::U8);

        let x = FieldInfo::new("x", 4, FieldKind::Float, 1);
        assert_eq!(create_column_for(&x).scalar_type(), ScalarType::F32);

        let timestamp = FieldInfo::new("timestamp", 8, FieldKind::Unsigned, 1);
        assert_eq!(create_column_for(&timestamp).scalar_type(), ScalarType::F32);
    }

    #[test]
    fn test_point_byte_size() {
        let normal = FieldInfo::new("normal", 4, FieldKind::Float, 3);
        assert_eq!(normal.point_byte_size(), 12);
    }

    #[test]
    fn test_push_token_recovers_zero() {
        let mut column = Column::new(ScalarType::I16);
        column.push_token("-12");
        column.push_token("banana");
        column.push_token("7.0");
        assert_eq!(column.values::<i16>().unwrap(), &[-12, 0, 7]);

        let mut column = Column::new(ScalarType::F64);
        column.push_token("1e-3");
        column.push_token("");
        assert_eq!(column.values::<f64>().unwrap(), &[1e-3, 0.0]);
    }

    #[test]
    fn test_unsigned_tokens_wrap() {
        let mut column = Column::new(ScalarType::U32);
        column.push_token("4294967295");
        column.push_token("-1");
        assert_eq!(column.values::<u32>().unwrap(), &[u32::MAX, u32::MAX]);
    }

    #[test]
    fn test_float_text_is_exact() {
        let values = [
            0.1f32,
            -3.25,
            f32::from_bits(0x00FF_8000),
            f32::MAX,
            f32::MIN_POSITIVE,
            1.0e-7,
            0.0,
        ];
        for value in values.iter() {
            let mut text = String::new();
            value.format_into(&mut text);
            assert_eq!(
                f32::parse_token(&text).unwrap().to_bits(),
                value.to_bits(),
                "{}",
                text
            );
        }

        let mut text = String::new();
        f32::from_bits(0x00FF_8000).format_into(&mut text);
        assert!(text.contains('e'), "{}", text);
    }

    #[test]
    fn test_le_round_trip_of_one_value() {
        let column = Column::from(vec![0x1234u16, 0xBEEF]);
        let mut bytes = Vec::new();
        column.write_le(1, &mut bytes).unwrap();
        assert_eq!(bytes, vec![0xEF, 0xBE]);

        let mut decoded = Column::new(ScalarType::U16);
        decoded.push_le(&mut bytes.as_slice()).unwrap();
        assert_eq!(decoded.values::<u16>().unwrap(), &[0xBEEF]);
        assert!(column.write_le(2, &mut bytes).is_err());
    }

    #[test]
    fn test_unmapped_values() {
        let field = FieldInfo::new("t", 8, FieldKind::Signed, 1);
        let bytes = (-5i64).to_le_bytes();
        assert_eq!(read_unmapped(&field, &mut &bytes[..]).unwrap(), -5.0);

        let field = FieldInfo::new("h", 2, FieldKind::Float, 1);
        let mut src = &[1u8, 2, 3][..];
        assert_eq!(read_unmapped(&field, &mut src).unwrap(), 0.0);
        assert_eq!(src, &[3]);
    }

    #[test]
    fn test_from_u32s_keeps_type() {
        let column = Column::from_u32s(ScalarType::U16, &[1, 2, 70000]);
        assert_eq!(column.scalar_type(), ScalarType::U16);
        assert_eq!(column.values::<u16>().unwrap(), &[1, 2, 65535]);
    }
}
