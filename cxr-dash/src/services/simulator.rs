//! Local simulation generator
//!
//! Fabricates a plausible classification when the classification service is
//! unavailable, so the dashboard stays usable end-to-end without a backend.
//! Every result it produces carries `is_simulated = true`.

use cxr_common::events::ClassificationLabel;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::info;

use crate::models::ClassificationResult;

/// Confidence band for simulated results (percent)
pub const SIMULATED_CONFIDENCE_BAND: RangeInclusive<f64> = 85.0..=95.0;

#[derive(Debug, Clone)]
pub struct LocalSimulator {
    delay: Duration,
}

impl LocalSimulator {
    /// `delay` preserves perceived latency before the result is returned
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Wait the simulated processing delay, then generate a result
    pub async fn simulate(&self) -> ClassificationResult {
        tokio::time::sleep(self.delay).await;

        let result = Self::generate(&mut rand::thread_rng());
        info!(
            label = %result.label(),
            confidence = result.confidence(),
            "Simulated classification generated"
        );
        result
    }

    /// Uniform label, uniform confidence within the band
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> ClassificationResult {
        let label = if rng.gen_bool(0.5) {
            ClassificationLabel::Pneumonia
        } else {
            ClassificationLabel::Normal
        };
        let confidence = rng.gen_range(SIMULATED_CONFIDENCE_BAND);

        ClassificationResult::simulated(label, confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_generated_results_are_flagged_and_in_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let result = LocalSimulator::generate(&mut rng);
            assert!(result.is_simulated());
            assert!(SIMULATED_CONFIDENCE_BAND.contains(&result.confidence()));
        }
    }

    #[test]
    fn test_label_distribution_is_roughly_uniform() {
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 10_000;
        let pneumonia = (0..trials)
            .filter(|_| LocalSimulator::generate(&mut rng).label() == ClassificationLabel::Pneumonia)
            .count();

        let share = pneumonia as f64 / trials as f64;
        assert!((0.45..=0.55).contains(&share), "pneumonia share was {}", share);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulate_waits_for_delay() {
        let simulator = LocalSimulator::new(Duration::from_millis(1_500));
        let start = tokio::time::Instant::now();

        let result = simulator.simulate().await;

        assert!(start.elapsed() >= Duration::from_millis(1_500));
        assert!(result.is_simulated());
    }
}
