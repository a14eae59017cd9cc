//! The in-memory point cloud: a header and one column per field.

use crate::errors::PcdError;
use crate::field::{create_column_for, Column, FieldInfo, FieldKind, ScalarType};
use crate::header::PcdHeader;

/// A decoded PCD file, or one being assembled before a write.
///
/// There is exactly one [`Column`] per field of the header, and every column
/// holds `count` values for each point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    header: PcdHeader,
    columns: Vec<Column>,
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new(PcdHeader::default())
    }
}

/// Rewrites a field without representation of its own to the `F 4` of its column
fn store_as_column(field: &mut FieldInfo) {
    if field.scalar_type().is_none() {
        field.byte_size = ScalarType::F32.byte_size();
        field.kind = FieldKind::Float;
    }
}

impl PointCloud {
    /// Creates a cloud with an empty column for each field of the header
    pub fn new(mut header: PcdHeader) -> Self {
        let columns = header.fields.iter().map(create_column_for).collect();
        header.fields.iter_mut().for_each(store_as_column);
        Self { header, columns }
    }

    /// Assembles a cloud from existing columns, checking that they agree with the fields.
    ///
    /// Fields whose layout has no representation of their own are expected in a
    /// f32 column and are rewritten to `F 4`.
    pub fn from_parts(mut header: PcdHeader, columns: Vec<Column>) -> crate::Result<Self> {
        if header.fields.len() != columns.len() {
            return Err(PcdError::InconsistentColumns(format!(
                "{} fields but {} columns",
                header.fields.len(),
                columns.len()
            )));
        }
        header.fields.iter_mut().for_each(store_as_column);

        let cloud = Self { header, columns };
        cloud.check_columns()?;
        Ok(cloud)
    }

    pub(crate) fn from_parts_unchecked(header: PcdHeader, columns: Vec<Column>) -> Self {
        debug_assert_eq!(header.fields.len(), columns.len());
        Self { header, columns }
    }

    /// Verifies that every column has the type of its field and holds `count`
    /// values for the same number of points
    pub fn check_columns(&self) -> crate::Result<()> {
        let num_points = self.num_points();
        for (field, column) in self.header.fields.iter().zip(self.columns.iter()) {
            if field.scalar_type() != Some(column.scalar_type()) {
                return Err(PcdError::InconsistentColumns(format!(
                    "field '{}' is {} {} but its column holds {:?}",
                    field.name,
                    field.kind,
                    field.byte_size,
                    column.scalar_type()
                )));
            }
            let expected = num_points * field.count;
            if column.len() != expected {
                return Err(PcdError::InconsistentColumns(format!(
                    "field '{}' has {} values, expected {} ({} points x {})",
                    field.name,
                    column.len(),
                    expected,
                    num_points,
                    field.count
                )));
            }
        }
        Ok(())
    }

    pub fn header(&self) -> &PcdHeader {
        &self.header
    }

    pub(crate) fn header_mut(&mut self) -> &mut PcdHeader {
        &mut self.header
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.header.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.header.field_names()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_mut(&mut self, index: usize) -> Option<&mut Column> {
        self.columns.get_mut(index)
    }

    pub fn into_parts(self) -> (PcdHeader, Vec<Column>) {
        (self.header, self.columns)
    }

    pub fn set_viewpoint<S: Into<String>>(&mut self, viewpoint: S) {
        self.header.viewpoint = viewpoint.into();
    }

    /// Index of the first field named `name`, ignoring case
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.header.find_field(name)
    }

    /// Number of points, as held by the columns
    pub fn num_points(&self) -> usize {
        match (self.header.fields.first(), self.columns.first()) {
            (Some(field), Some(column)) => column.len() / field.count.max(1),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_points() == 0
    }

    /// Appends a field with an empty column, returns its index
    pub fn add_field<S: Into<String>>(
        &mut self,
        name: S,
        byte_size: usize,
        kind: FieldKind,
        count: usize,
    ) -> usize {
        let index = self.header.add_field(name, byte_size, kind, count);
        let field = &mut self.header.fields[index];
        self.columns.push(create_column_for(field));
        store_as_column(field);
        index
    }

    /// Appends a single element field holding `column`, returns its index
    pub fn push_field<S: Into<String>>(&mut self, name: S, column: Column) -> usize {
        self.header
            .fields
            .push(FieldInfo::of_type(name, column.scalar_type()));
        self.columns.push(column);
        self.columns.len() - 1
    }

    /// Value of the first element of the field at `index`, for every point
    pub(crate) fn first_elements(&self, index: usize) -> Vec<f32> {
        let count = self.header.fields[index].count.max(1);
        let column = &self.columns[index];
        (0..column.len() / count)
            .filter_map(|point| column.get_f32(point * count))
            .collect()
    }

    /// Interleaved `x, y, z` of every point, empty if one of them is missing
    pub fn positions(&self) -> Vec<f32> {
        let (x, y, z) = match (
            self.find_field("x"),
            self.find_field("y"),
            self.find_field("z"),
        ) {
            (Some(x), Some(y), Some(z)) => (
                self.first_elements(x),
                self.first_elements(y),
                self.first_elements(z),
            ),
            _ => return vec![],
        };

        x.iter()
            .zip(y.iter())
            .zip(z.iter())
            .flat_map(|((x, y), z)| [*x, *y, *z])
            .collect()
    }

    /// The `label` of every point, zeros if there is no such field
    pub fn labels_or_zeros(&self) -> Vec<u32> {
        match self.find_field("label") {
            Some(index) => {
                let count = self.header.fields[index].count.max(1);
                let column = &self.columns[index];
                (0..column.len() / count)
                    .filter_map(|point| column.get_u32(point * count))
                    .collect()
            }
            None => vec![0; self.num_points()],
        }
    }

    /// Replaces the values of the `label` field, adding it as `U 4` if needed.
    ///
    /// `labels` is truncated or zero extended to the number of points,
    /// an existing label column keeps its type.
    pub fn set_labels(&mut self, labels: &[u32]) {
        let num_points = if self.columns.is_empty() {
            labels.len()
        } else {
            self.num_points()
        };
        if labels.len() != num_points {
            log::warn!(
                "{} labels given for {} points, the labels are {}",
                labels.len(),
                num_points,
                if labels.len() > num_points { "truncated" } else { "zero extended" }
            );
        }
        let labels = &labels[..labels.len().min(num_points)];

        match self.find_field("label") {
            Some(index) => {
                let field = &mut self.header.fields[index];
                let scalar_type = field.scalar_type().unwrap_or(ScalarType::F32);
                let mut column = Column::from_u32s(scalar_type, labels);
                column.resize(num_points);
                field.count = 1;
                self.columns[index] = column;
            }
            None => {
                let mut column = Column::from(labels.to_vec());
                column.resize(num_points);
                self.push_field("label", column);
            }
        }
    }

    /// All the values of the field at `index` converted to f32
    pub fn field_as_float(&self, index: usize) -> Option<Vec<f32>> {
        self.columns.get(index).map(Column::to_f32_vec)
    }

    /// All the values of the field named `name` converted to f64
    pub fn field_as_double(&self, name: &str) -> Option<Vec<f64>> {
        self.find_field(name)
            .map(|index| self.columns[index].to_f64_vec())
    }
}
