//! Biquad filter (high-pass, low-pass)
//!
//! Mono, one instance per voice, fixed for the voice's lifetime.
//! Coefficients follow the RBJ cookbook.

use crate::note::FilterSpec;
use std::f32::consts::PI;

/// Filter type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
}

/// Convert a resonance given in decibels to a linear Q factor
pub fn resonance_db(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Biquad filter implementation
#[derive(Debug, Clone)]
pub struct Filter {
    filter_type: FilterType,
    sample_rate: f32,
    cutoff: f32,    // Hz
    resonance: f32, // Q factor

    // Biquad coefficients
    a0: f32,
    a1: f32,
    a2: f32,
    b1: f32,
    b2: f32,

    // State variables
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Filter {
    /// Create a new filter
    pub fn new(sample_rate: f32, filter_type: FilterType, cutoff: f32, resonance: f32) -> Self {
        let mut filter = Self {
            filter_type,
            sample_rate,
            cutoff: 1000.0,
            resonance: 0.707, // Butterworth Q
            a0: 1.0,
            a1: 0.0,
            a2: 0.0,
            b1: 0.0,
            b2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        filter.cutoff = filter.clamp_cutoff(cutoff);
        filter.resonance = resonance.clamp(0.1, 20.0);
        filter.calculate_coefficients();
        filter
    }

    /// Build the filter a note asks for
    pub fn from_spec(spec: &FilterSpec, sample_rate: f32) -> Self {
        Self::new(sample_rate, spec.filter_type, spec.cutoff, spec.q)
    }

    fn clamp_cutoff(&self, cutoff: f32) -> f32 {
        let ceiling = (self.sample_rate * 0.49).min(20000.0);
        cutoff.clamp(20.0, ceiling.max(20.0))
    }

    /// Calculate biquad coefficients based on current parameters
    fn calculate_coefficients(&mut self) {
        let omega = 2.0 * PI * self.cutoff / self.sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * self.resonance);

        let (b0, b1, b2) = match self.filter_type {
            FilterType::LowPass => (
                (1.0 - cos_omega) / 2.0,
                1.0 - cos_omega,
                (1.0 - cos_omega) / 2.0,
            ),
            FilterType::HighPass => (
                (1.0 + cos_omega) / 2.0,
                -(1.0 + cos_omega),
                (1.0 + cos_omega) / 2.0,
            ),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        self.a0 = b0 / a0;
        self.a1 = b1 / a0;
        self.a2 = b2 / a0;
        self.b1 = a1 / a0;
        self.b2 = a2 / a0;
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.a0 * input + self.a1 * self.x1 + self.a2 * self.x2
            - self.b1 * self.y1
            - self.b2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}
