use gcxcore::algorithm::binning::{MassBinner, RoundingPolicy};
use gcxcore::algorithm::modulation::{segment, DEFAULT_DELTA_TOLERANCE};
use gcxcore::algorithm::statistics::ChannelStatistics;
use gcxcore::data::spectrum::Binnable;
use gcxcore::gcxgc::timing::TimelineMapper;
use serde::{Deserialize, Serialize};

use crate::convert::order::natural_sorted;
use crate::data::dataset::ChromatogramDataset;
use crate::data::meta::{
    FIRST_COLUMN_ELUTION_TIME, INTENSITY_VALUES, MASS_VALUES, MEAN_INTENSITY_VALUES,
    MODULATION_TIME, SCAN_ACQUISITION_TIME, SCAN_RATE, SD_INTENSITY_VALUES,
    SECOND_COLUMN_ELUTION_TIME, TOTAL_INTENSITY, TOTAL_INTENSITY_1D, TOTAL_INTENSITY_2D,
    VAR_INTENSITY_VALUES,
};
use crate::data::sink::ChromatogramSink;
use crate::data::store::{ScanStore, SCAN_CHUNK};
use crate::errors::DataError;

/// Settings of one conversion.
///
/// Explicit `scan_rate` and `modulation_time` override anything stored with
/// the data. `mass_range` restricts binning to a window and drops points
/// outside it, by default the global range over all sources is used.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub scan_rate: Option<f64>,
    pub modulation_time: Option<f64>,
    pub mass_resolution: f64,
    pub rounding_policy: RoundingPolicy,
    pub average_overlaps: bool,
    pub mass_range: Option<(f64, f64)>,
    pub fill_value: f64,
    pub delta_tolerance: f64,
    pub estimate_missing_modulation: bool,
    pub progress_every: usize,
    pub num_threads: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            scan_rate: None,
            modulation_time: None,
            mass_resolution: 1.0,
            rounding_policy: RoundingPolicy::Down,
            average_overlaps: false,
            mass_range: None,
            fill_value: 0.0,
            delta_tolerance: DEFAULT_DELTA_TOLERANCE,
            estimate_missing_modulation: false,
            progress_every: 5000,
            num_threads: 4,
        }
    }
}

/// What one conversion produced.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConversionSummary {
    pub name: String,
    pub sources: Vec<String>,
    pub scan_rate: f64,
    pub modulation_time: f64,
    pub scans_per_modulation: usize,
    pub scan_count: usize,
    pub point_count: usize,
    pub modulation_count: usize,
    pub truncated_scans: usize,
    pub bins_size: usize,
}

// the stored TIC is used as-is when its length matches, a missing or
// malformed vector is tolerated and recomputed from the spectra in-pass
fn stored_total_intensity<S: ScanStore>(
    store: &S,
    id: &str,
    count: usize,
) -> Result<Option<Vec<f64>>, DataError> {
    match store.vector(id, TOTAL_INTENSITY) {
        Ok(values) if values.len() == count => Ok(Some(values)),
        Ok(values) => {
            log::warn!(
                "total intensity of '{}' has {} entries for {} scans, recomputing from intensity values",
                id,
                values.len(),
                count
            );
            Ok(None)
        }
        Err(DataError::MissingVariable { .. }) => {
            log::warn!(
                "total intensity missing from '{}', recomputing from intensity values",
                id
            );
            Ok(None)
        }
        Err(error) => Err(error),
    }
}

/// Convert one chromatogram from its source files into the 2D layout.
///
/// Sources are concatenated in natural name order and streamed in bounded
/// chunks through a single forward pass that writes scan times, both
/// elution time axes, the flattened mass/intensity data and the per-scan
/// TIC. Acquisition parameters are resolved from the first source. After
/// the pass the concatenated TIC is segmented into the modulation raster
/// and the per-channel moments are written.
///
/// # Arguments
///
/// * `store` - store holding the source chromatograms.
/// * `name` - name of the converted chromatogram.
/// * `sources` - source ids, any order.
/// * `sink` - sink receiving the converted variables.
/// * `config` - conversion settings.
pub fn convert_chromatograms<S: ScanStore, K: ChromatogramSink>(
    store: &S,
    name: &str,
    sources: &[String],
    sink: &mut K,
    config: &ConversionConfig,
) -> Result<ConversionSummary, DataError> {
    if sources.is_empty() {
        return Err(DataError::NoSources(name.to_string()));
    }
    let ordered = natural_sorted(sources);

    // acquisition parameters come from the first source in natural order
    let first = ChromatogramDataset::new(store, &ordered[0]);
    let meta = first.resolve_meta(
        config.scan_rate,
        config.modulation_time,
        config.estimate_missing_modulation,
        config.delta_tolerance,
    )?;
    let scans_per_modulation = meta.scans_per_modulation;

    let mut total_scans = 0usize;
    let mut total_points = 0usize;
    for id in ordered.iter() {
        let dataset = ChromatogramDataset::new(store, id);
        total_scans += dataset.scan_count()?;
        total_points += dataset.point_count()?;
    }

    let (min_mass, max_mass) = match config.mass_range {
        Some(range) => range,
        None => store.global_min_max_mass(&ordered)?,
    };
    let binner = MassBinner::new(
        min_mass,
        max_mass,
        config.mass_resolution,
        config.rounding_policy,
    )?;
    let bins_size = binner.num_bins();

    sink.declare_vector(SCAN_ACQUISITION_TIME, total_scans)?;
    sink.declare_vector(FIRST_COLUMN_ELUTION_TIME, total_scans)?;
    sink.declare_vector(SECOND_COLUMN_ELUTION_TIME, total_scans)?;
    sink.declare_vector(TOTAL_INTENSITY, total_scans)?;
    sink.declare_vector(MASS_VALUES, total_points)?;
    sink.declare_vector(INTENSITY_VALUES, total_points)?;

    let mut mapper = TimelineMapper::new(meta.modulation_time)?;
    let mut statistics = ChannelStatistics::new(bins_size);
    let mut all_tic: Vec<f64> = Vec::with_capacity(total_scans);

    let mut scan_offset = 0usize;
    let mut point_offset = 0usize;

    for id in ordered.iter() {
        let count = store.scan_count(id)?;
        let stored_tic = stored_total_intensity(store, id, count)?;
        mapper.begin_source();

        let mut start = 0usize;
        while start < count {
            let len = SCAN_CHUNK.min(count - start);
            let scans = store.scan_range(id, start, len)?;

            let mut acquisition_buf = Vec::with_capacity(len);
            let mut first_column_buf = Vec::with_capacity(len);
            let mut second_column_buf = Vec::with_capacity(len);
            let mut tic_buf = Vec::with_capacity(len);
            let mut offsets_buf: Vec<i64> = Vec::with_capacity(len);
            let mut mass_buf: Vec<f64> = Vec::new();
            let mut intensity_buf: Vec<f64> = Vec::new();

            for (position, scan) in scans.iter().enumerate() {
                let timing = mapper.step(scan.acquisition_time)?;
                acquisition_buf.push(timing.global_scan_time);
                first_column_buf.push(timing.first_column_time);
                second_column_buf.push(timing.second_column_time);

                let spectrum = match config.mass_range {
                    Some((low, high)) => {
                        scan.spectrum.filter_ranged(low, high, 0.0, f64::INFINITY)
                    }
                    None => scan.spectrum.clone(),
                };

                let tic = match stored_tic.as_ref() {
                    Some(values) => values[start + position],
                    None => spectrum.tic(),
                };
                tic_buf.push(tic);
                all_tic.push(tic);

                offsets_buf.push((point_offset + mass_buf.len()) as i64);
                mass_buf.extend_from_slice(&spectrum.mass);
                intensity_buf.extend_from_slice(&spectrum.intensity);

                let dense =
                    spectrum.to_dense(&binner, config.average_overlaps, config.fill_value)?;
                statistics.accumulate_spectrum(&dense);

                let scan_number = scan_offset + start + position + 1;
                if config.progress_every > 0 && scan_number % config.progress_every == 0 {
                    log::info!(
                        "converted {} of {} scans of '{}'",
                        scan_number,
                        total_scans,
                        name
                    );
                }
            }

            sink.write_vector(SCAN_ACQUISITION_TIME, scan_offset + start, &acquisition_buf)?;
            sink.write_vector(
                FIRST_COLUMN_ELUTION_TIME,
                scan_offset + start,
                &first_column_buf,
            )?;
            sink.write_vector(
                SECOND_COLUMN_ELUTION_TIME,
                scan_offset + start,
                &second_column_buf,
            )?;
            sink.write_vector(TOTAL_INTENSITY, scan_offset + start, &tic_buf)?;
            sink.write_ragged_array(MASS_VALUES, &offsets_buf, &mass_buf)?;
            sink.write_vector(INTENSITY_VALUES, point_offset, &intensity_buf)?;

            point_offset += mass_buf.len();
            start += len;
        }
        scan_offset += count;
    }

    // segment the concatenated TIC into the modulation raster
    let lines = segment(&all_tic, scans_per_modulation);
    let modulation_count = lines.len();
    let truncated_scans = all_tic.len() - modulation_count * scans_per_modulation;

    sink.declare_vector(TOTAL_INTENSITY_2D, modulation_count * scans_per_modulation)?;
    sink.declare_vector(TOTAL_INTENSITY_1D, modulation_count)?;

    for (index, line) in lines.iter().enumerate() {
        let line_start = (index * scans_per_modulation) as i64;
        sink.write_ragged_array(TOTAL_INTENSITY_2D, &[line_start], line)?;
    }
    let line_tic: Vec<f64> = lines.iter().map(|line| line.iter().sum()).collect();
    sink.write_vector(TOTAL_INTENSITY_1D, 0, &line_tic)?;

    let moments = statistics.finalize();
    sink.declare_vector(MEAN_INTENSITY_VALUES, bins_size)?;
    sink.declare_vector(VAR_INTENSITY_VALUES, bins_size)?;
    sink.declare_vector(SD_INTENSITY_VALUES, bins_size)?;
    sink.write_vector(MEAN_INTENSITY_VALUES, 0, &moments.mean)?;
    sink.write_vector(VAR_INTENSITY_VALUES, 0, &moments.variance)?;
    sink.write_vector(SD_INTENSITY_VALUES, 0, &moments.standard_deviation)?;

    sink.write_scalar(SCAN_RATE, meta.scan_rate)?;
    sink.write_scalar(MODULATION_TIME, meta.modulation_time)?;

    Ok(ConversionSummary {
        name: name.to_string(),
        sources: ordered,
        scan_rate: meta.scan_rate,
        modulation_time: meta.modulation_time,
        scans_per_modulation,
        scan_count: scan_offset,
        point_count: point_offset,
        modulation_count,
        truncated_scans,
        bins_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::meta::{SCAN_INDEX, SECOND_COLUMN_SCAN_INDEX};
    use crate::data::sink::InMemorySink;
    use crate::data::store::{InMemoryScanStore, StoredChromatogram};
    use gcxcore::data::spectrum::{MassSpectrum, Scan};
    use gcxcore::errors::{ConfigurationError, GcxError};

    // each scan carries two points so ragged offsets advance by two
    fn scan(index: usize, time: f64, base: f64) -> Scan {
        Scan::new(
            index,
            time,
            MassSpectrum::new(vec![60.2, 80.7], vec![base, base * 2.0]),
        )
    }

    fn two_part_store() -> InMemoryScanStore {
        let part2 = StoredChromatogram::new(vec![
            scan(0, 0.0, 1.0),
            scan(1, 1.0, 2.0),
            scan(2, 2.0, 3.0),
        ])
        .with_scalar(SCAN_RATE, 1.0)
        .with_scalar(MODULATION_TIME, 1.0);
        let part10 =
            StoredChromatogram::new(vec![scan(0, 0.0, 4.0), scan(1, 1.0, 5.0)]);

        let mut store = InMemoryScanStore::new();
        store.insert("part2", part2);
        store.insert("part10", part10);
        store
    }

    fn sources() -> Vec<String> {
        // deliberately unordered, conversion must natural-sort
        vec!["part10".to_string(), "part2".to_string()]
    }

    #[test]
    fn sources_concatenate_in_natural_order() {
        let store = two_part_store();
        let mut sink = InMemorySink::new();
        let summary = convert_chromatograms(
            &store,
            "sample",
            &sources(),
            &mut sink,
            &ConversionConfig::default(),
        )
        .unwrap();

        assert_eq!(summary.sources, vec!["part2".to_string(), "part10".to_string()]);
        assert_eq!(summary.scan_count, 5);
        assert_eq!(summary.point_count, 10);
        assert_eq!(summary.scans_per_modulation, 1);
        assert_eq!(summary.modulation_count, 5);
        assert_eq!(summary.truncated_scans, 0);

        // global scan times of the second part continue after the first
        assert_eq!(
            sink.vector(SCAN_ACQUISITION_TIME).unwrap(),
            &[0.0, 1.0, 2.0, 2.0, 3.0]
        );
        assert_eq!(
            sink.vector(FIRST_COLUMN_ELUTION_TIME).unwrap(),
            &[0.0, 1.0, 2.0, 2.0, 3.0]
        );
        assert_eq!(
            sink.vector(SECOND_COLUMN_ELUTION_TIME).unwrap(),
            &[0.0, 0.0, 0.0, 0.0, 0.0]
        );

        // flattened points follow the concatenation order
        assert_eq!(sink.index_array(SCAN_INDEX).unwrap(), &[0, 2, 4, 6, 8]);
        assert_eq!(
            sink.vector(MASS_VALUES).unwrap(),
            &[60.2, 80.7, 60.2, 80.7, 60.2, 80.7, 60.2, 80.7, 60.2, 80.7]
        );
        assert_eq!(
            sink.vector(INTENSITY_VALUES).unwrap(),
            &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0, 4.0, 8.0, 5.0, 10.0]
        );

        assert_eq!(
            sink.vector(TOTAL_INTENSITY).unwrap(),
            &[3.0, 6.0, 9.0, 12.0, 15.0]
        );
        assert_eq!(sink.scalar(SCAN_RATE), Some(1.0));
        assert_eq!(sink.scalar(MODULATION_TIME), Some(1.0));
    }

    #[test]
    fn modulation_raster_covers_complete_lines() {
        let store = two_part_store();
        let mut sink = InMemorySink::new();
        convert_chromatograms(
            &store,
            "sample",
            &sources(),
            &mut sink,
            &ConversionConfig::default(),
        )
        .unwrap();

        // one scan per modulation, so the raster mirrors the TIC
        assert_eq!(
            sink.vector(TOTAL_INTENSITY_2D).unwrap(),
            &[3.0, 6.0, 9.0, 12.0, 15.0]
        );
        assert_eq!(
            sink.index_array(SECOND_COLUMN_SCAN_INDEX).unwrap(),
            &[0, 1, 2, 3, 4]
        );
        assert_eq!(
            sink.vector(TOTAL_INTENSITY_1D).unwrap(),
            &[3.0, 6.0, 9.0, 12.0, 15.0]
        );
    }

    fn seven_scan_store() -> InMemoryScanStore {
        let scans = (0..7).map(|i| scan(i, i as f64, (i + 1) as f64)).collect();
        let chromatogram = StoredChromatogram::new(scans)
            .with_scalar(SCAN_RATE, 1.0)
            .with_scalar(MODULATION_TIME, 3.0);
        let mut store = InMemoryScanStore::new();
        store.insert("run", chromatogram);
        store
    }

    #[test]
    fn trailing_scans_are_dropped_from_the_raster_only() {
        let store = seven_scan_store();
        let mut sink = InMemorySink::new();
        let summary = convert_chromatograms(
            &store,
            "sample",
            &["run".to_string()],
            &mut sink,
            &ConversionConfig::default(),
        )
        .unwrap();

        assert_eq!(summary.scans_per_modulation, 3);
        assert_eq!(summary.modulation_count, 2);
        assert_eq!(summary.truncated_scans, 1);

        // per-scan vectors keep all seven scans
        assert_eq!(sink.written(SCAN_ACQUISITION_TIME), Some(7));
        assert_eq!(
            sink.vector(FIRST_COLUMN_ELUTION_TIME).unwrap(),
            &[0.0, 0.0, 0.0, 3.0, 3.0, 3.0, 6.0]
        );
        assert_eq!(
            sink.vector(SECOND_COLUMN_ELUTION_TIME).unwrap(),
            &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0]
        );

        // the raster holds only the two complete lines
        assert_eq!(
            sink.vector(TOTAL_INTENSITY_2D).unwrap(),
            &[3.0, 6.0, 9.0, 12.0, 15.0, 18.0]
        );
        assert_eq!(sink.index_array(SECOND_COLUMN_SCAN_INDEX).unwrap(), &[0, 3]);
        assert_eq!(sink.vector(TOTAL_INTENSITY_1D).unwrap(), &[18.0, 45.0]);
    }

    #[test]
    fn channel_moments_match_a_direct_computation() {
        let scans: Vec<Scan> = (0..4)
            .map(|i| {
                Scan::new(
                    i,
                    i as f64,
                    MassSpectrum::new(vec![60.5], vec![(i + 1) as f64]),
                )
            })
            .collect();
        let chromatogram = StoredChromatogram::new(scans)
            .with_scalar(SCAN_RATE, 1.0)
            .with_scalar(MODULATION_TIME, 2.0);
        let mut store = InMemoryScanStore::new();
        store.insert("run", chromatogram);

        let mut sink = InMemorySink::new();
        convert_chromatograms(
            &store,
            "sample",
            &["run".to_string()],
            &mut sink,
            &ConversionConfig::default(),
        )
        .unwrap();

        // range [60.5, 60.5] spans two nominal bins, all signal in bin 0
        let mean = sink.vector(MEAN_INTENSITY_VALUES).unwrap();
        let variance = sink.vector(VAR_INTENSITY_VALUES).unwrap();
        let sd = sink.vector(SD_INTENSITY_VALUES).unwrap();
        assert_eq!(mean.len(), 2);
        assert!((mean[0] - 2.5).abs() < 1e-12);
        assert_eq!(mean[1], 0.0);
        assert!((variance[0] - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(variance[1], 0.0);
        assert!((sd[0] - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn stored_total_intensity_wins() {
        let scans = (0..3).map(|i| scan(i, i as f64, 1.0)).collect();
        let chromatogram = StoredChromatogram::new(scans)
            .with_scalar(SCAN_RATE, 1.0)
            .with_scalar(MODULATION_TIME, 1.0)
            .with_vector(TOTAL_INTENSITY, vec![7.0, 8.0, 9.0]);
        let mut store = InMemoryScanStore::new();
        store.insert("run", chromatogram);

        let mut sink = InMemorySink::new();
        convert_chromatograms(
            &store,
            "sample",
            &["run".to_string()],
            &mut sink,
            &ConversionConfig::default(),
        )
        .unwrap();
        assert_eq!(sink.vector(TOTAL_INTENSITY).unwrap(), &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn missing_modulation_time_is_fatal() {
        let scans = (0..3).map(|i| scan(i, i as f64, 1.0)).collect();
        let chromatogram = StoredChromatogram::new(scans).with_scalar(SCAN_RATE, 1.0);
        let mut store = InMemoryScanStore::new();
        store.insert("run", chromatogram);

        let mut sink = InMemorySink::new();
        let result = convert_chromatograms(
            &store,
            "sample",
            &["run".to_string()],
            &mut sink,
            &ConversionConfig::default(),
        );
        assert!(matches!(
            result,
            Err(DataError::Core(GcxError::Configuration(
                ConfigurationError::MissingScalar(_)
            )))
        ));
    }

    #[test]
    fn empty_source_lists_are_rejected() {
        let store = InMemoryScanStore::new();
        let mut sink = InMemorySink::new();
        assert!(matches!(
            convert_chromatograms(&store, "sample", &[], &mut sink, &ConversionConfig::default()),
            Err(DataError::NoSources(_))
        ));
    }

    #[test]
    fn mass_range_restricts_points_and_bins() {
        let scans: Vec<Scan> = (0..2)
            .map(|i| {
                Scan::new(
                    i,
                    i as f64,
                    MassSpectrum::new(vec![50.5, 65.5, 99.5], vec![1.0, 2.0, 3.0]),
                )
            })
            .collect();
        let chromatogram = StoredChromatogram::new(scans)
            .with_scalar(SCAN_RATE, 1.0)
            .with_scalar(MODULATION_TIME, 1.0);
        let mut store = InMemoryScanStore::new();
        store.insert("run", chromatogram);

        let config = ConversionConfig {
            mass_range: Some((60.0, 70.0)),
            ..ConversionConfig::default()
        };
        let mut sink = InMemorySink::new();
        let summary =
            convert_chromatograms(&store, "sample", &["run".to_string()], &mut sink, &config)
                .unwrap();

        assert_eq!(summary.point_count, 2);
        assert_eq!(summary.bins_size, 11);
        // capacity was declared from the unfiltered totals, writes stop early
        assert_eq!(sink.capacity(MASS_VALUES), Some(6));
        assert_eq!(sink.written(MASS_VALUES), Some(2));
        assert_eq!(&sink.vector(MASS_VALUES).unwrap()[..2], &[65.5, 65.5]);
        assert_eq!(sink.index_array(SCAN_INDEX).unwrap(), &[0, 1]);
        // recomputed TIC reflects the filtered points
        assert_eq!(sink.vector(TOTAL_INTENSITY).unwrap(), &[2.0, 2.0]);
    }
}
