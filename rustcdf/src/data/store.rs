use std::collections::BTreeMap;

use gcxcore::data::spectrum::Scan;
use ordered_float::OrderedFloat;

use crate::errors::DataError;

/// Number of scans read from a store per request when streaming a whole
/// chromatogram.
pub const SCAN_CHUNK: usize = 512;

/// Read access to stored chromatograms. A store addresses chromatograms by
/// id and serves scans in acquisition order, everything above it streams in
/// bounded chunks and never asks for a whole run at once unless it has to.
pub trait ScanStore {
    fn chromatogram_ids(&self) -> Vec<String>;

    fn scan_count(&self, id: &str) -> Result<usize, DataError>;

    fn scan(&self, id: &str, index: usize) -> Result<Scan, DataError>;

    /// Scans `start..start + count`, the full range must exist.
    fn scan_range(&self, id: &str, start: usize, count: usize) -> Result<Vec<Scan>, DataError>;

    fn scalar(&self, id: &str, name: &str) -> Result<f64, DataError>;

    fn vector(&self, id: &str, name: &str) -> Result<Vec<f64>, DataError>;

    /// Total number of mass/intensity points over all scans.
    fn total_point_count(&self, id: &str) -> Result<usize, DataError>;

    /// Smallest and largest mass over all scans of the given chromatograms.
    fn global_min_max_mass(&self, ids: &[String]) -> Result<(f64, f64), DataError>;
}

/// One stored chromatogram, its scan stream plus named scalar and vector
/// variables.
#[derive(Clone, Debug, Default)]
pub struct StoredChromatogram {
    pub scans: Vec<Scan>,
    pub scalars: BTreeMap<String, f64>,
    pub vectors: BTreeMap<String, Vec<f64>>,
}

impl StoredChromatogram {
    pub fn new(scans: Vec<Scan>) -> Self {
        StoredChromatogram {
            scans,
            scalars: BTreeMap::new(),
            vectors: BTreeMap::new(),
        }
    }

    pub fn with_scalar(mut self, name: &str, value: f64) -> Self {
        self.scalars.insert(name.to_string(), value);
        self
    }

    pub fn with_vector(mut self, name: &str, values: Vec<f64>) -> Self {
        self.vectors.insert(name.to_string(), values);
        self
    }
}

/// Store serving chromatograms straight from process memory. The backing
/// map is ordered so id listings are deterministic.
#[derive(Clone, Debug, Default)]
pub struct InMemoryScanStore {
    chromatograms: BTreeMap<String, StoredChromatogram>,
}

impl InMemoryScanStore {
    pub fn new() -> Self {
        InMemoryScanStore::default()
    }

    pub fn insert(&mut self, id: &str, chromatogram: StoredChromatogram) {
        self.chromatograms.insert(id.to_string(), chromatogram);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.chromatograms.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.chromatograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromatograms.is_empty()
    }

    fn stored(&self, id: &str) -> Result<&StoredChromatogram, DataError> {
        self.chromatograms
            .get(id)
            .ok_or_else(|| DataError::ChromatogramNotFound(id.to_string()))
    }
}

impl ScanStore for InMemoryScanStore {
    fn chromatogram_ids(&self) -> Vec<String> {
        self.chromatograms.keys().cloned().collect()
    }

    fn scan_count(&self, id: &str) -> Result<usize, DataError> {
        Ok(self.stored(id)?.scans.len())
    }

    fn scan(&self, id: &str, index: usize) -> Result<Scan, DataError> {
        let stored = self.stored(id)?;
        stored
            .scans
            .get(index)
            .cloned()
            .ok_or_else(|| DataError::ScanOutOfRange {
                id: id.to_string(),
                index,
                count: stored.scans.len(),
            })
    }

    fn scan_range(&self, id: &str, start: usize, count: usize) -> Result<Vec<Scan>, DataError> {
        let stored = self.stored(id)?;
        let end = start + count;
        if end > stored.scans.len() {
            return Err(DataError::ScanOutOfRange {
                id: id.to_string(),
                index: end.saturating_sub(1),
                count: stored.scans.len(),
            });
        }
        Ok(stored.scans[start..end].to_vec())
    }

    fn scalar(&self, id: &str, name: &str) -> Result<f64, DataError> {
        self.stored(id)?
            .scalars
            .get(name)
            .copied()
            .ok_or_else(|| DataError::MissingScalar {
                id: id.to_string(),
                name: name.to_string(),
            })
    }

    fn vector(&self, id: &str, name: &str) -> Result<Vec<f64>, DataError> {
        self.stored(id)?
            .vectors
            .get(name)
            .cloned()
            .ok_or_else(|| DataError::MissingVariable {
                id: id.to_string(),
                name: name.to_string(),
            })
    }

    fn total_point_count(&self, id: &str) -> Result<usize, DataError> {
        Ok(self
            .stored(id)?
            .scans
            .iter()
            .map(|scan| scan.spectrum.len())
            .sum())
    }

    fn global_min_max_mass(&self, ids: &[String]) -> Result<(f64, f64), DataError> {
        let mut min = OrderedFloat(f64::INFINITY);
        let mut max = OrderedFloat(f64::NEG_INFINITY);
        let mut seen = false;

        for id in ids {
            for scan in self.stored(id)?.scans.iter() {
                for &mass in scan.spectrum.mass.iter() {
                    min = min.min(OrderedFloat(mass));
                    max = max.max(OrderedFloat(mass));
                    seen = true;
                }
            }
        }

        if !seen {
            return Err(DataError::EmptyMassRange(ids.to_vec()));
        }
        Ok((min.0, max.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::meta::{MODULATION_TIME, SCAN_RATE, TOTAL_INTENSITY};
    use gcxcore::data::spectrum::MassSpectrum;

    fn store() -> InMemoryScanStore {
        let scans = vec![
            Scan::new(0, 0.0, MassSpectrum::new(vec![60.0, 70.0], vec![1.0, 2.0])),
            Scan::new(1, 0.5, MassSpectrum::new(vec![55.0], vec![4.0])),
            Scan::new(2, 1.0, MassSpectrum::new(vec![90.0, 95.0], vec![3.0, 3.0])),
        ];
        let chromatogram = StoredChromatogram::new(scans)
            .with_scalar(SCAN_RATE, 2.0)
            .with_scalar(MODULATION_TIME, 1.0)
            .with_vector(TOTAL_INTENSITY, vec![3.0, 4.0, 6.0]);

        let mut store = InMemoryScanStore::new();
        store.insert("run_1", chromatogram);
        store
    }

    #[test]
    fn scans_are_served_by_index_and_range() {
        let store = store();
        assert_eq!(store.scan_count("run_1").unwrap(), 3);
        assert_eq!(store.scan("run_1", 1).unwrap().acquisition_time, 0.5);

        let range = store.scan_range("run_1", 1, 2).unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].index, 1);
        assert_eq!(range[1].index, 2);
    }

    #[test]
    fn out_of_range_requests_are_errors() {
        let store = store();
        assert!(matches!(
            store.scan("run_1", 3),
            Err(DataError::ScanOutOfRange { index: 3, count: 3, .. })
        ));
        assert!(matches!(
            store.scan_range("run_1", 2, 2),
            Err(DataError::ScanOutOfRange { .. })
        ));
    }

    #[test]
    fn unknown_ids_are_errors() {
        let store = store();
        assert!(matches!(
            store.scan_count("nope"),
            Err(DataError::ChromatogramNotFound(_))
        ));
    }

    #[test]
    fn scalars_and_vectors_resolve_by_name() {
        let store = store();
        assert_eq!(store.scalar("run_1", SCAN_RATE).unwrap(), 2.0);
        assert_eq!(
            store.vector("run_1", TOTAL_INTENSITY).unwrap(),
            vec![3.0, 4.0, 6.0]
        );
        assert!(matches!(
            store.scalar("run_1", "unheard_of"),
            Err(DataError::MissingScalar { .. })
        ));
        assert!(matches!(
            store.vector("run_1", "unheard_of"),
            Err(DataError::MissingVariable { .. })
        ));
    }

    #[test]
    fn point_count_sums_all_scans() {
        assert_eq!(store().total_point_count("run_1").unwrap(), 5);
    }

    #[test]
    fn mass_range_spans_all_sources() {
        let mut store = store();
        let second = StoredChromatogram::new(vec![Scan::new(
            0,
            0.0,
            MassSpectrum::new(vec![40.0, 120.0], vec![1.0, 1.0]),
        )]);
        store.insert("run_2", second);

        let ids = vec!["run_1".to_string(), "run_2".to_string()];
        assert_eq!(store.global_min_max_mass(&ids).unwrap(), (40.0, 120.0));

        let one = vec!["run_1".to_string()];
        assert_eq!(store.global_min_max_mass(&one).unwrap(), (55.0, 95.0));
    }

    #[test]
    fn empty_sources_have_no_mass_range() {
        let mut store = InMemoryScanStore::new();
        store.insert("empty", StoredChromatogram::default());
        let ids = vec!["empty".to_string()];
        assert!(matches!(
            store.global_min_max_mass(&ids),
            Err(DataError::EmptyMassRange(_))
        ));
    }
}
