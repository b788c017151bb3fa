//! Pipeline timing metrics.
//!
//! Keeps a rolling window of recent timings per stage so the shutdown
//! report reflects current behavior rather than the whole session.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Samples kept per stage.
const WINDOW: usize = 100;

/// Pipeline stages that get timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Audio,
    Vision,
    Llm,
    Total,
}

impl Stage {
    const ALL: [Stage; 4] = [Stage::Audio, Stage::Vision, Stage::Llm, Stage::Total];

    fn index(self) -> usize {
        match self {
            Stage::Audio => 0,
            Stage::Vision => 1,
            Stage::Llm => 2,
            Stage::Total => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Audio => "audio_processing",
            Stage::Vision => "vision_processing",
            Stage::Llm => "llm_response",
            Stage::Total => "total_response",
        }
    }
}

/// One line of the shutdown report.
#[derive(Debug, Clone, Copy)]
pub struct StageReport {
    pub stage: Stage,
    pub average: f64,
    pub latest: f64,
    pub count: usize,
}

/// Rolling per-stage timing monitor.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    samples: Mutex<[VecDeque<f64>; 4]>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one timing sample in seconds.
    pub fn record(&self, stage: Stage, seconds: f64) {
        let mut samples = self.samples.lock();
        let window = &mut samples[stage.index()];
        window.push_back(seconds);
        while window.len() > WINDOW {
            window.pop_front();
        }
    }

    /// Average of the rolling window for a stage, if any samples exist.
    pub fn average(&self, stage: Stage) -> Option<f64> {
        let samples = self.samples.lock();
        let window = &samples[stage.index()];
        if window.is_empty() { None } else { Some(window.iter().sum::<f64>() / window.len() as f64) }
    }

    /// Report for every stage that has samples.
    pub fn report(&self) -> Vec<StageReport> {
        let samples = self.samples.lock();

        Stage::ALL
            .iter()
            .filter_map(|&stage| {
                let window = &samples[stage.index()];
                let latest = *window.back()?;
                Some(StageReport { stage, average: window.iter().sum::<f64>() / window.len() as f64, latest, count: window.len() })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_recorded_samples() {
        let monitor = PerformanceMonitor::new();
        monitor.record(Stage::Llm, 1.0);
        monitor.record(Stage::Llm, 3.0);
        assert_eq!(monitor.average(Stage::Llm), Some(2.0));
        assert_eq!(monitor.average(Stage::Audio), None);
    }

    #[test]
    fn window_is_bounded() {
        let monitor = PerformanceMonitor::new();
        for i in 0..250 {
            monitor.record(Stage::Audio, i as f64);
        }
        let report = monitor.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].count, 100);
        // Oldest samples (0..150) were evicted
        assert!(report[0].average >= 150.0);
        assert_eq!(report[0].latest, 249.0);
    }

    #[test]
    fn report_skips_empty_stages() {
        let monitor = PerformanceMonitor::new();
        monitor.record(Stage::Total, 0.5);
        let report = monitor.report();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].stage, Stage::Total);
    }
}
