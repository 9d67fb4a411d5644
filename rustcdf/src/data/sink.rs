use std::collections::BTreeMap;

use gcxcore::errors::LayoutError;

use crate::data::meta::ragged_index_name;
use crate::errors::DataError;

/// Write access for conversion results. Vectors are declared with their
/// final capacity before any data arrives, writes land at explicit offsets
/// and may never exceed the declared capacity. Ragged variables carry a
/// paired index variable that receives the start offset of every row
/// appended through [`ChromatogramSink::write_ragged_array`].
pub trait ChromatogramSink {
    fn declare_vector(&mut self, name: &str, capacity: usize) -> Result<(), DataError>;

    fn write_scalar(&mut self, name: &str, value: f64) -> Result<(), DataError>;

    fn write_vector(&mut self, name: &str, offset: usize, values: &[f64]) -> Result<(), DataError>;

    /// Append one row of a ragged variable. `index` holds the absolute
    /// start offsets to record in the paired index variable, `values` the
    /// flat data appended after everything written so far.
    fn write_ragged_array(
        &mut self,
        name: &str,
        index: &[i64],
        values: &[f64],
    ) -> Result<(), DataError>;
}

#[derive(Clone, Debug)]
struct SinkVector {
    values: Vec<f64>,
    capacity: usize,
    cursor: usize,
}

/// Sink keeping everything in process memory, the reference backend for
/// tests and for callers that post-process results directly.
#[derive(Clone, Debug, Default)]
pub struct InMemorySink {
    scalars: BTreeMap<String, f64>,
    vectors: BTreeMap<String, SinkVector>,
    index_arrays: BTreeMap<String, Vec<i64>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        InMemorySink::default()
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.scalars.get(name).copied()
    }

    pub fn vector(&self, name: &str) -> Option<&[f64]> {
        self.vectors.get(name).map(|vector| vector.values.as_slice())
    }

    pub fn index_array(&self, name: &str) -> Option<&[i64]> {
        self.index_arrays.get(name).map(|index| index.as_slice())
    }

    /// Declared capacity of a vector.
    pub fn capacity(&self, name: &str) -> Option<usize> {
        self.vectors.get(name).map(|vector| vector.capacity)
    }

    /// Number of values written so far, the high-water mark over all
    /// writes.
    pub fn written(&self, name: &str) -> Option<usize> {
        self.vectors.get(name).map(|vector| vector.cursor)
    }

    pub fn vector_names(&self) -> Vec<String> {
        self.vectors.keys().cloned().collect()
    }

    pub fn scalar_names(&self) -> Vec<String> {
        self.scalars.keys().cloned().collect()
    }

    fn vector_mut(&mut self, name: &str) -> Result<&mut SinkVector, DataError> {
        self.vectors
            .get_mut(name)
            .ok_or_else(|| DataError::UndeclaredVariable(name.to_string()))
    }

    fn checked_write(
        name: &str,
        vector: &mut SinkVector,
        offset: usize,
        values: &[f64],
    ) -> Result<(), DataError> {
        if offset + values.len() > vector.capacity {
            return Err(LayoutError::OffsetOutOfBounds {
                name: name.to_string(),
                offset,
                len: values.len(),
                capacity: vector.capacity,
            }
            .into());
        }
        vector.values[offset..offset + values.len()].copy_from_slice(values);
        vector.cursor = vector.cursor.max(offset + values.len());
        Ok(())
    }
}

impl ChromatogramSink for InMemorySink {
    fn declare_vector(&mut self, name: &str, capacity: usize) -> Result<(), DataError> {
        self.vectors.insert(
            name.to_string(),
            SinkVector {
                values: vec![0.0; capacity],
                capacity,
                cursor: 0,
            },
        );
        Ok(())
    }

    fn write_scalar(&mut self, name: &str, value: f64) -> Result<(), DataError> {
        self.scalars.insert(name.to_string(), value);
        Ok(())
    }

    fn write_vector(&mut self, name: &str, offset: usize, values: &[f64]) -> Result<(), DataError> {
        let vector = self.vector_mut(name)?;
        Self::checked_write(name, vector, offset, values)
    }

    fn write_ragged_array(
        &mut self,
        name: &str,
        index: &[i64],
        values: &[f64],
    ) -> Result<(), DataError> {
        let index_name =
            ragged_index_name(name).ok_or_else(|| DataError::UnknownRaggedPairing(name.to_string()))?;

        let vector = self.vector_mut(name)?;
        let offset = vector.cursor;
        Self::checked_write(name, vector, offset, values)?;

        self.index_arrays
            .entry(index_name.to_string())
            .or_default()
            .extend_from_slice(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::meta::{MASS_VALUES, SCAN_INDEX, SECOND_COLUMN_SCAN_INDEX, TOTAL_INTENSITY_2D};
    use gcxcore::errors::GcxError;

    #[test]
    fn scalars_are_stored_by_name() {
        let mut sink = InMemorySink::new();
        sink.write_scalar("scan_rate", 50.0).unwrap();
        assert_eq!(sink.scalar("scan_rate"), Some(50.0));
        assert_eq!(sink.scalar("other"), None);
    }

    #[test]
    fn vector_writes_land_at_their_offset() {
        let mut sink = InMemorySink::new();
        sink.declare_vector("values", 5).unwrap();
        sink.write_vector("values", 0, &[1.0, 2.0]).unwrap();
        sink.write_vector("values", 2, &[3.0, 4.0, 5.0]).unwrap();
        assert_eq!(sink.vector("values").unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(sink.written("values"), Some(5));
        assert_eq!(sink.capacity("values"), Some(5));
    }

    #[test]
    fn undeclared_vectors_are_rejected() {
        let mut sink = InMemorySink::new();
        assert!(matches!(
            sink.write_vector("values", 0, &[1.0]),
            Err(DataError::UndeclaredVariable(_))
        ));
    }

    #[test]
    fn writes_past_capacity_are_fatal() {
        let mut sink = InMemorySink::new();
        sink.declare_vector("values", 3).unwrap();
        let result = sink.write_vector("values", 2, &[1.0, 2.0]);
        assert!(matches!(
            result,
            Err(DataError::Core(GcxError::Layout(LayoutError::OffsetOutOfBounds {
                offset: 2,
                len: 2,
                capacity: 3,
                ..
            })))
        ));
    }

    #[test]
    fn write_at_exact_capacity_boundary_fills_the_vector() {
        let mut sink = InMemorySink::new();
        sink.declare_vector("values", 2).unwrap();
        sink.write_vector("values", 0, &[1.0, 2.0]).unwrap();
        assert_eq!(sink.written("values"), Some(2));
    }

    #[test]
    fn ragged_rows_append_and_record_offsets() {
        let mut sink = InMemorySink::new();
        sink.declare_vector(MASS_VALUES, 5).unwrap();
        sink.write_ragged_array(MASS_VALUES, &[0, 2], &[60.0, 61.0, 70.0])
            .unwrap();
        sink.write_ragged_array(MASS_VALUES, &[3], &[80.0, 81.0]).unwrap();

        assert_eq!(
            sink.vector(MASS_VALUES).unwrap(),
            &[60.0, 61.0, 70.0, 80.0, 81.0]
        );
        assert_eq!(sink.index_array(SCAN_INDEX).unwrap(), &[0, 2, 3]);
    }

    #[test]
    fn ragged_rows_respect_capacity() {
        let mut sink = InMemorySink::new();
        sink.declare_vector(TOTAL_INTENSITY_2D, 2).unwrap();
        sink.write_ragged_array(TOTAL_INTENSITY_2D, &[0], &[1.0, 2.0]).unwrap();
        assert!(matches!(
            sink.write_ragged_array(TOTAL_INTENSITY_2D, &[2], &[3.0]),
            Err(DataError::Core(GcxError::Layout(
                LayoutError::OffsetOutOfBounds { .. }
            )))
        ));
        // the failed row left no trace in the index
        assert_eq!(sink.index_array(SECOND_COLUMN_SCAN_INDEX).unwrap(), &[0]);
    }

    #[test]
    fn unpaired_ragged_variables_are_rejected() {
        let mut sink = InMemorySink::new();
        sink.declare_vector("free_form", 4).unwrap();
        assert!(matches!(
            sink.write_ragged_array("free_form", &[0], &[1.0]),
            Err(DataError::UnknownRaggedPairing(_))
        ));
    }
}
