//! Color layouts.
//!
//! PCD files store colors either packed in a single 32 bit field (`rgb`,
//! usually a float whose bits are `0x00RRGGBB`) or as three `U 1` fields
//! `r`, `g` and `b`. Text files are easier to read and edit with separate
//! channels, binary ones are smaller with packed colors, so the writer converts
//! between the two with [`transcode_for`].

use std::borrow::Cow;

use crate::cloud::PointCloud;
use crate::field::{Column, FieldInfo, FieldKind, ScalarType};
use crate::header::Encoding;

#[inline]
pub fn pack_channels(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

#[inline]
pub fn unpack_channels(packed: u32) -> (u8, u8, u8) {
    (
        ((packed >> 16) & 0xFF) as u8,
        ((packed >> 8) & 0xFF) as u8,
        (packed & 0xFF) as u8,
    )
}

fn is_single(field: &FieldInfo, scalar_type: ScalarType) -> bool {
    field.count == 1 && field.scalar_type() == Some(scalar_type)
}

/// Index of the first single field named `name` and of type `scalar_type`
fn find_typed(cloud: &PointCloud, name: &str, scalar_type: ScalarType) -> Option<usize> {
    cloud
        .fields()
        .iter()
        .position(|field| field.is_named(name) && is_single(field, scalar_type))
}

/// Index of a single `F 4` field named `rgb`
fn packed_float_rgb(cloud: &PointCloud) -> Option<usize> {
    find_typed(cloud, "rgb", ScalarType::F32)
}

/// Indices of single `U 1` fields named `r`, `g` and `b`
fn channel_fields(cloud: &PointCloud) -> Option<[usize; 3]> {
    let mut indices = [0; 3];
    for (slot, name) in indices.iter_mut().zip(["r", "g", "b"]) {
        *slot = find_typed(cloud, name, ScalarType::U8)?;
    }
    Some(indices)
}

/// Replaces a packed float `rgb` field with `r`, `g` and `b` `U 1` fields at its position
pub fn unpack_rgb(cloud: &PointCloud) -> Cow<'_, PointCloud> {
    let index = match packed_float_rgb(cloud) {
        Some(index) => index,
        None => return Cow::Borrowed(cloud),
    };
    let packed = match cloud.columns()[index].values::<f32>() {
        Some(values) => values,
        None => return Cow::Borrowed(cloud),
    };

    let mut r = Vec::with_capacity(packed.len());
    let mut g = Vec::with_capacity(packed.len());
    let mut b = Vec::with_capacity(packed.len());
    for value in packed {
        let (red, green, blue) = unpack_channels(value.to_bits());
        r.push(red);
        g.push(green);
        b.push(blue);
    }

    let mut header = cloud.header().clone();
    header.fields.splice(
        index..=index,
        ["r", "g", "b"]
            .iter()
            .map(|name| FieldInfo::of_type(*name, ScalarType::U8)),
    );
    let mut columns = cloud.columns().to_vec();
    columns.splice(
        index..=index,
        vec![Column::from(r), Column::from(g), Column::from(b)],
    );

    log::debug!("unpacked rgb of {} points into r g b", packed.len());
    Cow::Owned(PointCloud::from_parts_unchecked(header, columns))
}

/// Merges `r`, `g` and `b` `U 1` fields into a packed float `rgb` field at the position of `r`
pub fn pack_rgb(cloud: &PointCloud) -> Cow<'_, PointCloud> {
    let [r_index, g_index, b_index] = match channel_fields(cloud) {
        Some(indices) => indices,
        None => return Cow::Borrowed(cloud),
    };
    if cloud.find_field("rgb").is_some() {
        log::debug!("cloud has both rgb and r g b fields, colors are left as they are");
        return Cow::Borrowed(cloud);
    }
    let (r, g, b) = match (
        cloud.columns()[r_index].values::<u8>(),
        cloud.columns()[g_index].values::<u8>(),
        cloud.columns()[b_index].values::<u8>(),
    ) {
        (Some(r), Some(g), Some(b)) => (r, g, b),
        _ => return Cow::Borrowed(cloud),
    };

    let mut packed: Vec<f32> = r
        .iter()
        .zip(g)
        .zip(b)
        .map(|((r, g), b)| f32::from_bits(pack_channels(*r, *g, *b)))
        .collect();

    let mut header = cloud.header().clone();
    header.fields.clear();
    let mut columns = Vec::with_capacity(cloud.columns().len() - 2);
    for (index, (field, column)) in cloud.fields().iter().zip(cloud.columns()).enumerate() {
        if index == r_index {
            header.fields.push(FieldInfo::new("rgb", 4, FieldKind::Float, 1));
            columns.push(Column::from(std::mem::take(&mut packed)));
        } else if index != g_index && index != b_index {
            header.fields.push(field.clone());
            columns.push(column.clone());
        }
    }

    log::debug!("packed r g b of {} points into rgb", cloud.num_points());
    Cow::Owned(PointCloud::from_parts_unchecked(header, columns))
}

/// The color layout written with `encoding`: separate channels for text, packed otherwise
pub fn transcode_for(cloud: &PointCloud, encoding: Encoding) -> Cow<'_, PointCloud> {
    match encoding {
        Encoding::Ascii => unpack_rgb(cloud),
        Encoding::Binary | Encoding::BinaryCompressed => pack_rgb(cloud),
    }
}

/// Index of the packed color field, `rgb` first then `rgba`, when it is `F 4` or `U 4`
fn packed_color_field(cloud: &PointCloud) -> Option<usize> {
    let packed = |name: &str| {
        cloud.fields().iter().position(|field| {
            field.is_named(name)
                && matches!(
                    field.scalar_type(),
                    Some(ScalarType::F32) | Some(ScalarType::U32)
                )
        })
    };
    packed("rgb").or_else(|| packed("rgba"))
}

/// Read-only color view, for display
impl PointCloud {
    /// Whether [`rgb_triples`](Self::rgb_triples) has something to return
    pub fn has_rgb(&self) -> bool {
        let has_channels = ["r", "g", "b"]
            .iter()
            .all(|name| self.find_field(name).is_some());
        has_channels || packed_color_field(self).is_some()
    }

    /// Interleaved `r, g, b` of every point, each in `[0, 1]`.
    ///
    /// Separate `r`, `g`, `b` fields take precedence. Their values are divided by
    /// 255 when any of them is above 1. Otherwise the packed `rgb` (or `rgba`)
    /// field is used.
    pub fn rgb_triples(&self) -> Option<Vec<f32>> {
        if let (Some(r), Some(g), Some(b)) = (
            self.find_field("r"),
            self.find_field("g"),
            self.find_field("b"),
        ) {
            let channels = [
                self.first_elements(r),
                self.first_elements(g),
                self.first_elements(b),
            ];
            let max = channels
                .iter()
                .flatten()
                .fold(0.0f32, |max, value| max.max(*value));
            let divisor = if max > 1.0 { 255.0 } else { 1.0 };

            let colors = (0..self.num_points())
                .flat_map(|point| {
                    channels.iter().map(move |channel| {
                        (channel.get(point).copied().unwrap_or(0.0) / divisor).clamp(0.0, 1.0)
                    })
                })
                .collect();
            return Some(colors);
        }

        let index = packed_color_field(self)?;
        let count = self.fields()[index].count.max(1);
        let packed: Vec<u32> = match &self.columns()[index] {
            Column::F32(values) => values.iter().step_by(count).map(|v| v.to_bits()).collect(),
            Column::U32(values) => values.iter().step_by(count).copied().collect(),
            _ => return None,
        };
        let colors = packed
            .into_iter()
            .flat_map(|packed| {
                let (r, g, b) = unpack_channels(packed);
                [r, g, b].map(|channel| f32::from(channel) / 255.0)
            })
            .collect();
        Some(colors)
    }
}
