use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::pipeline::{CropDecision, ProcessResult};

/// Batch processing statistics and progress tracking
pub struct BatchProcessor {
    pub total_files: usize,
    pub processed_count: AtomicUsize,
    pub start_time: Instant,
}

impl BatchProcessor {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            processed_count: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    /// Increment processed count and return current count
    pub fn increment(&self) -> usize {
        self.processed_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get current progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_files == 0 {
            1.0
        } else {
            (self.processed_count.load(Ordering::Relaxed) as f64) / (self.total_files as f64)
        }
    }

    /// Get estimated time remaining
    pub fn eta(&self) -> Option<Duration> {
        let processed = self.processed_count.load(Ordering::Relaxed);
        if processed == 0 {
            return None;
        }

        let remaining = self.total_files.saturating_sub(processed);
        if remaining == 0 {
            return Some(Duration::ZERO);
        }

        let time_per_item = self.start_time.elapsed() / processed as u32;
        Some(time_per_item * remaining as u32)
    }
}

/// Process multiple files in parallel on the current rayon pool.
///
/// Results come back in input order regardless of completion order.
pub fn process_files_parallel<T, F, P>(files: &[PathBuf], process_fn: F, progress_callback: P) -> Vec<T>
where
    T: Send,
    F: Fn(&Path) -> T + Send + Sync,
    P: Fn(usize, f64, Option<Duration>) + Send + Sync,
{
    let processor = BatchProcessor::new(files.len());

    files
        .par_iter()
        .map(|file_path| {
            let result = process_fn(file_path);

            let completed = processor.increment();
            progress_callback(completed, processor.progress(), processor.eta());

            result
        })
        .collect()
}

/// How many images ended up with each kind of crop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionCounts {
    pub not_needed: usize,
    pub centered: usize,
    pub subject_aware: usize,
    pub truncated: usize,
}

/// Results of one batch, in input order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<ProcessResult>,
    pub total_duration: Duration,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.successful()
    }

    /// Output filenames of successful images, in input order.
    pub fn successful_filenames(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| r.output_filename.clone())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ProcessResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn decision_counts(&self) -> DecisionCounts {
        let mut counts = DecisionCounts::default();
        for decision in self.results.iter().filter_map(|r| r.decision.as_ref()) {
            match decision {
                CropDecision::NotNeeded { .. } => counts.not_needed += 1,
                CropDecision::Centered { .. } => counts.centered += 1,
                CropDecision::SubjectAware { .. } => counts.subject_aware += 1,
            }
            if decision.truncated() {
                counts.truncated += 1;
            }
        }
        counts
    }

    pub fn average_time(&self) -> Duration {
        if self.results.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.results.iter().map(|r| r.processing_time).sum();
        sum / self.results.len() as u32
    }
}
