//! Output smoothing for model predictions

use crate::config::SmoothingMode;

/// Exponentially weighted smoothing state.
///
/// The first value passes through; later values follow
/// `s = alpha * raw + (1 - alpha) * prior`. State belongs to one model
/// generation and is dropped when the generation changes.
#[derive(Debug, Clone)]
pub struct Smoother {
    mode: SmoothingMode,
    alpha: f64,
    generation: Option<u64>,
    prior: Option<f64>,
}

impl Smoother {
    /// Create a smoother. `alpha` is clamped to (0, 1].
    pub fn new(mode: SmoothingMode, alpha: f64) -> Self {
        let alpha = if alpha.is_finite() { alpha.clamp(f64::EPSILON, 1.0) } else { 1.0 };
        Self {
            mode,
            alpha,
            generation: None,
            prior: None,
        }
    }

    /// Blend a raw prediction from the given model generation
    pub fn apply(&mut self, generation: u64, raw: f64) -> f64 {
        if self.mode == SmoothingMode::None {
            return raw;
        }

        if self.generation != Some(generation) {
            self.generation = Some(generation);
            self.prior = None;
        }

        let smoothed = match self.prior {
            Some(prior) => self.alpha * raw + (1.0 - self.alpha) * prior,
            None => raw,
        };
        self.prior = Some(smoothed);
        smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_mode_passes_through() {
        let mut s = Smoother::new(SmoothingMode::None, 0.1);
        assert_eq!(s.apply(1, 5.0), 5.0);
        assert_eq!(s.apply(1, -5.0), -5.0);
    }

    #[test]
    fn test_ewm_recurrence() {
        let mut s = Smoother::new(SmoothingMode::Ewm, 0.1);
        assert_eq!(s.apply(1, 10.0), 10.0);
        let second = s.apply(1, 0.0);
        assert!((second - 9.0).abs() < 1e-12);
        let third = s.apply(1, 0.0);
        assert!((third - 8.1).abs() < 1e-12);
    }

    #[test]
    fn test_generation_change_resets_prior() {
        let mut s = Smoother::new(SmoothingMode::Ewm, 0.5);
        s.apply(1, 10.0);
        assert_eq!(s.apply(2, 2.0), 2.0);
        assert!((s.apply(2, 4.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_is_clamped() {
        let mut s = Smoother::new(SmoothingMode::Ewm, 7.0);
        s.apply(1, 1.0);
        assert_eq!(s.apply(1, 3.0), 3.0);

        let mut s = Smoother::new(SmoothingMode::Ewm, f64::NAN);
        s.apply(1, 1.0);
        assert_eq!(s.apply(1, 3.0), 3.0);
    }
}
