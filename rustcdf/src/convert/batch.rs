use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::convert::pipeline::{convert_chromatograms, ConversionConfig, ConversionSummary};
use crate::data::sink::InMemorySink;
use crate::data::store::ScanStore;
use crate::errors::DataError;

/// One conversion task, a chromatogram name and its source ids.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversionJob {
    pub name: String,
    pub sources: Vec<String>,
}

impl ConversionJob {
    pub fn new(name: &str, sources: Vec<String>) -> Self {
        ConversionJob {
            name: name.to_string(),
            sources,
        }
    }
}

/// A finished conversion, the summary plus the sink holding its variables.
#[derive(Clone, Debug)]
pub struct CompletedConversion {
    pub summary: ConversionSummary,
    pub sink: InMemorySink,
}

/// Convert a batch of chromatograms over a thread pool.
///
/// Every job writes into its own sink, a failed conversion yields no
/// result data. Results come back in job order.
///
/// # Arguments
///
/// * `store` - store holding all source chromatograms.
/// * `jobs` - conversion tasks.
/// * `config` - settings shared by all jobs, `num_threads` sizes the pool.
pub fn convert_batch<S: ScanStore + Sync>(
    store: &S,
    jobs: &[ConversionJob],
    config: &ConversionConfig,
) -> Vec<(String, Result<CompletedConversion, DataError>)> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build()
        .unwrap();
    pool.install(|| {
        jobs.par_iter()
            .map(|job| {
                let mut sink = InMemorySink::new();
                let result =
                    convert_chromatograms(store, &job.name, &job.sources, &mut sink, config)
                        .map(|summary| CompletedConversion { summary, sink });
                (job.name.clone(), result)
            })
            .collect()
    })
}

/// Per-chromatogram entry of a [`BatchReport`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChromatogramReport {
    pub name: String,
    pub success: bool,
    pub summary: Option<ConversionSummary>,
    pub error: Option<String>,
}

/// Outcome of a whole batch in serializable form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchReport {
    pub chromatograms: Vec<ChromatogramReport>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.chromatograms.iter().filter(|entry| entry.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.chromatograms.len() - self.success_count()
    }

    pub fn to_json(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Condense batch results into a report, errors rendered as text.
pub fn batch_report(
    results: &[(String, Result<CompletedConversion, DataError>)],
) -> BatchReport {
    let chromatograms = results
        .iter()
        .map(|(name, result)| match result {
            Ok(completed) => ChromatogramReport {
                name: name.clone(),
                success: true,
                summary: Some(completed.summary.clone()),
                error: None,
            },
            Err(error) => ChromatogramReport {
                name: name.clone(),
                success: false,
                summary: None,
                error: Some(error.to_string()),
            },
        })
        .collect();
    BatchReport { chromatograms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::meta::{MODULATION_TIME, SCAN_RATE, TOTAL_INTENSITY_1D};
    use crate::data::store::{InMemoryScanStore, StoredChromatogram};
    use gcxcore::data::spectrum::{MassSpectrum, Scan};

    fn store_with_run() -> InMemoryScanStore {
        let scans = (0..4)
            .map(|i| {
                Scan::new(
                    i,
                    i as f64,
                    MassSpectrum::new(vec![60.2, 80.7], vec![1.0, 2.0]),
                )
            })
            .collect();
        let chromatogram = StoredChromatogram::new(scans)
            .with_scalar(SCAN_RATE, 1.0)
            .with_scalar(MODULATION_TIME, 2.0);
        let mut store = InMemoryScanStore::new();
        store.insert("run", chromatogram);
        store
    }

    fn mixed_jobs() -> Vec<ConversionJob> {
        vec![
            ConversionJob::new("good", vec!["run".to_string()]),
            ConversionJob::new("broken", vec!["ghost".to_string()]),
        ]
    }

    #[test]
    fn batch_keeps_job_order_and_isolates_failures() {
        let store = store_with_run();
        let results = convert_batch(&store, &mixed_jobs(), &ConversionConfig::default());

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, "good");
        assert_eq!(results[1].0, "broken");

        let completed = results[0].1.as_ref().unwrap();
        assert_eq!(completed.summary.scan_count, 4);
        assert_eq!(completed.summary.modulation_count, 2);
        assert_eq!(
            completed.sink.vector(TOTAL_INTENSITY_1D).unwrap(),
            &[6.0, 6.0]
        );

        assert!(matches!(
            results[1].1,
            Err(DataError::ChromatogramNotFound(_))
        ));
    }

    #[test]
    fn report_counts_successes_and_failures() {
        let store = store_with_run();
        let results = convert_batch(&store, &mixed_jobs(), &ConversionConfig::default());
        let report = batch_report(&results);

        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert!(report.chromatograms[0].summary.is_some());
        assert!(report.chromatograms[0].error.is_none());
        assert!(report.chromatograms[1].summary.is_none());
        assert!(report.chromatograms[1].error.as_ref().unwrap().contains("ghost"));
    }

    #[test]
    fn report_serializes_to_json() {
        let store = store_with_run();
        let results = convert_batch(&store, &mixed_jobs(), &ConversionConfig::default());
        let json = batch_report(&results).to_json().unwrap();

        assert!(json.contains("\"good\""));
        assert!(json.contains("\"broken\""));
        assert!(json.contains("\"success\": true"));
        assert!(json.contains("\"success\": false"));
    }
}
