use std::collections::BTreeMap;
use std::collections::VecDeque;

use crate::algorithm::binning::MassBinner;
use crate::data::spectrum::{DenseSpectrum, SparseSpectrum};
use crate::errors::{CacheError, GcxError, LayoutError};
use crate::gcxgc::chromatogram::Chromatogram1D;

/// Storage backend for materialized modulation lines. Implementations own
/// eviction, the cache above only asks for lines by index and hands over
/// freshly built ones.
pub trait LineStore {
    fn get(&mut self, index: usize) -> Result<Option<Vec<SparseSpectrum>>, CacheError>;

    fn put(&mut self, index: usize, line: &[SparseSpectrum]) -> Result<(), CacheError>;

    fn clear(&mut self) -> Result<(), CacheError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory line store with optional FIFO eviction. With `capacity` of
/// `None` every line ever built is kept, otherwise the oldest lines are
/// evicted once the bound is reached.
#[derive(Clone, Debug, Default)]
pub struct MemoryLineStore {
    capacity: Option<usize>,
    lines: BTreeMap<usize, Vec<SparseSpectrum>>,
    order: VecDeque<usize>,
}

impl MemoryLineStore {
    pub fn new(capacity: Option<usize>) -> Self {
        MemoryLineStore {
            capacity,
            lines: BTreeMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lines.contains_key(&index)
    }
}

impl LineStore for MemoryLineStore {
    fn get(&mut self, index: usize) -> Result<Option<Vec<SparseSpectrum>>, CacheError> {
        Ok(self.lines.get(&index).cloned())
    }

    fn put(&mut self, index: usize, line: &[SparseSpectrum]) -> Result<(), CacheError> {
        if self.capacity == Some(0) {
            return Ok(());
        }
        if self.lines.contains_key(&index) {
            self.lines.insert(index, line.to_vec());
            return Ok(());
        }
        if let Some(capacity) = self.capacity {
            while self.lines.len() >= capacity {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.lines.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
        self.lines.insert(index, line.to_vec());
        self.order.push_back(index);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        self.lines.clear();
        self.order.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.lines.len()
    }
}

/// Line-oriented access to a chromatogram's 2D layout.
///
/// Scans are grouped into modulation lines on demand, binned to sparse
/// spectra and optionally kept in a [`LineStore`] so repeated accesses skip
/// the binning work. Dense rows are expanded from the sparse lines when
/// asked for. The trailing partial line of a run is served like any other
/// line, just shorter.
#[derive(Debug)]
pub struct ScanlineCache<S: LineStore> {
    chromatogram: Chromatogram1D,
    binner: MassBinner,
    average_overlaps: bool,
    fill_value: f64,
    cache_modulations: bool,
    scans_per_modulation: usize,
    store: S,
}

impl ScanlineCache<MemoryLineStore> {
    /// Cache backed by unbounded in-process memory.
    pub fn new(
        chromatogram: Chromatogram1D,
        binner: MassBinner,
        average_overlaps: bool,
        fill_value: f64,
        cache_modulations: bool,
    ) -> Result<Self, GcxError> {
        ScanlineCache::with_store(
            chromatogram,
            binner,
            average_overlaps,
            fill_value,
            cache_modulations,
            MemoryLineStore::new(None),
        )
    }
}

impl<S: LineStore> ScanlineCache<S> {
    pub fn with_store(
        chromatogram: Chromatogram1D,
        binner: MassBinner,
        average_overlaps: bool,
        fill_value: f64,
        cache_modulations: bool,
        store: S,
    ) -> Result<Self, GcxError> {
        let scans_per_modulation = chromatogram.scans_per_modulation()?;
        Ok(ScanlineCache {
            chromatogram,
            binner,
            average_overlaps,
            fill_value,
            cache_modulations,
            scans_per_modulation,
            store,
        })
    }

    pub fn chromatogram(&self) -> &Chromatogram1D {
        &self.chromatogram
    }

    pub fn binner(&self) -> &MassBinner {
        &self.binner
    }

    pub fn scans_per_modulation(&self) -> usize {
        self.scans_per_modulation
    }

    /// Number of addressable lines, the trailing partial line included.
    pub fn scan_line_count(&self) -> usize {
        self.chromatogram.scan_count().div_ceil(self.scans_per_modulation)
    }

    /// Width of a dense row, the number of mass bins.
    pub fn bins_size(&self) -> usize {
        self.binner.num_bins()
    }

    pub fn cache_modulations(&self) -> bool {
        self.cache_modulations
    }

    /// Number of lines currently held by the store.
    pub fn cached_line_count(&self) -> usize {
        self.store.len()
    }

    /// One modulation line as sparse spectra, one entry per scan.
    pub fn scanline_sparse(&mut self, index: usize) -> Result<Vec<SparseSpectrum>, GcxError> {
        let count = self.scan_line_count();
        if index >= count {
            return Err(LayoutError::LineOutOfRange { index, count }.into());
        }

        if self.cache_modulations {
            if let Some(line) = self.store.get(index)? {
                return Ok(line);
            }
        }

        let line = self
            .chromatogram
            .modulation_line(index)?
            .to_sparse(&self.binner, self.average_overlaps)?;

        if self.cache_modulations {
            self.store.put(index, &line)?;
            log::debug!("materialized scan line {} with {} scans", index, line.len());
        }
        Ok(line)
    }

    /// One modulation line as dense rows over the full bin layout.
    pub fn scanline(&mut self, index: usize) -> Result<Vec<DenseSpectrum>, GcxError> {
        let sparse = self.scanline_sparse(index)?;
        sparse
            .iter()
            .map(|spectrum| {
                spectrum
                    .to_dense(&self.binner, self.fill_value)
                    .map_err(GcxError::from)
            })
            .collect()
    }

    /// Drop every materialized line from the store.
    pub fn clear(&mut self) -> Result<(), GcxError> {
        self.store.clear().map_err(GcxError::from)
    }
}
