use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::io;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use gcxcore::data::spectrum::SparseSpectrum;
use gcxcore::errors::CacheError;
use gcxcore::gcxgc::scanline::LineStore;

const COMPRESSION_LEVEL: i32 = 3;

/// Compresses a byte array using ZSTD
///
/// # Arguments
///
/// * `decompressed_data` - A byte slice that holds the decompressed data
/// * `compression_level` - The ZSTD compression level
///
/// # Returns
///
/// * `compressed_data` - A vector of u8 that holds the compressed data
///
pub fn zstd_compress(decompressed_data: &[u8], compression_level: i32) -> io::Result<Vec<u8>> {
    let mut encoder = zstd::Encoder::new(Vec::new(), compression_level)?;
    encoder.write_all(decompressed_data)?;
    let compressed_data = encoder.finish()?;
    Ok(compressed_data)
}

/// Decompresses a ZSTD compressed byte array
///
/// # Arguments
///
/// * `compressed_data` - A byte slice that holds the compressed data
///
/// # Returns
///
/// * `decompressed_data` - A vector of u8 that holds the decompressed data
///
pub fn zstd_decompress(compressed_data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = zstd::Decoder::new(compressed_data)?;
    let mut decompressed_data = Vec::new();
    decoder.read_to_end(&mut decompressed_data)?;
    Ok(decompressed_data)
}

/// Line store spilling materialized modulation lines to compressed files,
/// one file per line. Lets scanline caches of large runs stay bounded in
/// memory while repeated line accesses skip re-binning.
///
/// The store tracks only lines it wrote itself, the directory is left in
/// place on drop and owned by the caller.
#[derive(Debug)]
pub struct DiskLineStore {
    directory: PathBuf,
    capacity: Option<usize>,
    present: BTreeSet<usize>,
    order: VecDeque<usize>,
}

impl DiskLineStore {
    /// # Arguments
    ///
    /// * `directory` - directory for the line files, created when missing.
    /// * `capacity` - maximum number of lines kept, `None` for unbounded.
    pub fn new(directory: impl AsRef<Path>, capacity: Option<usize>) -> io::Result<Self> {
        fs::create_dir_all(directory.as_ref())?;
        Ok(DiskLineStore {
            directory: directory.as_ref().to_path_buf(),
            capacity,
            present: BTreeSet::new(),
            order: VecDeque::new(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    fn line_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("line_{}.bin.zst", index))
    }
}

impl LineStore for DiskLineStore {
    fn get(&mut self, index: usize) -> Result<Option<Vec<SparseSpectrum>>, CacheError> {
        if !self.present.contains(&index) {
            return Ok(None);
        }
        let compressed = fs::read(self.line_path(index))?;
        let raw = zstd_decompress(&compressed)?;
        let (line, _): (Vec<SparseSpectrum>, usize) =
            bincode::decode_from_slice(&raw, bincode::config::standard())?;
        Ok(Some(line))
    }

    fn put(&mut self, index: usize, line: &[SparseSpectrum]) -> Result<(), CacheError> {
        if self.capacity == Some(0) {
            return Ok(());
        }

        let encoded = bincode::encode_to_vec(line, bincode::config::standard())?;
        let compressed = zstd_compress(&encoded, COMPRESSION_LEVEL)?;

        if self.present.contains(&index) {
            fs::write(self.line_path(index), compressed)?;
            return Ok(());
        }

        if let Some(capacity) = self.capacity {
            while self.present.len() >= capacity {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.present.remove(&oldest);
                        fs::remove_file(self.line_path(oldest))?;
                    }
                    None => break,
                }
            }
        }

        fs::write(self.line_path(index), compressed)?;
        self.present.insert(index);
        self.order.push_back(index);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), CacheError> {
        for index in std::mem::take(&mut self.present) {
            fs::remove_file(self.line_path(index))?;
        }
        self.order.clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.present.len()
    }
}
