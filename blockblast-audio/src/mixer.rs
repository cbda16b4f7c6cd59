//! Mixer implementation - master, sfx and music buses
//!
//! Every gain change glides toward its target with a first-order time
//! constant, so toggling a bus never produces a click.

use crate::note::Bus;

/// Gain that approaches its target exponentially, one step per sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedGain {
    current: f32,
    target: f32,
    /// Per-sample retention factor; 0 jumps straight to the target
    coeff: f32,
}

impl SmoothedGain {
    pub fn new(level: f32) -> Self {
        Self {
            current: level,
            target: level,
            coeff: 0.0,
        }
    }

    /// Glide toward `target`, covering ~63% of the distance every `time_constant` seconds
    ///
    /// A time constant of zero (or less) applies the level immediately.
    pub fn set_target(&mut self, target: f32, time_constant: f64, sample_rate: f32) {
        self.target = target;
        if time_constant <= 0.0 {
            self.current = target;
            self.coeff = 0.0;
        } else {
            self.coeff = (-1.0 / (time_constant * sample_rate as f64)).exp() as f32;
        }
    }

    /// Advance one sample and return the gain to apply
    #[inline(always)]
    pub fn next(&mut self) -> f32 {
        self.current = self.target + (self.current - self.target) * self.coeff;
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

/// Three-node gain graph: master fed by the sfx and music buses
pub struct MixerGraph {
    sample_rate: f32,
    master: SmoothedGain,
    sfx: SmoothedGain,
    music: SmoothedGain,
}

impl MixerGraph {
    /// Create a mixer with every gain at zero
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
            master: SmoothedGain::new(0.0),
            sfx: SmoothedGain::new(0.0),
            music: SmoothedGain::new(0.0),
        }
    }

    /// Set a bus level, interpolated over `time_constant` seconds
    pub fn set_bus_level(&mut self, bus: Bus, level: f32, time_constant: f64) {
        if !level.is_finite() {
            return;
        }
        let level = level.clamp(0.0, 2.0);
        let sample_rate = self.sample_rate;
        self.bus_mut(bus).set_target(level, time_constant, sample_rate);
    }

    /// Set the master level immediately
    pub fn set_master_level(&mut self, level: f32) {
        if !level.is_finite() {
            return;
        }
        self.master.set_target(level.clamp(0.0, 2.0), 0.0, self.sample_rate);
    }

    /// Current (smoothed) gain of a bus
    pub fn bus_level(&self, bus: Bus) -> f32 {
        match bus {
            Bus::Sfx => self.sfx.current(),
            Bus::Music => self.music.current(),
        }
    }

    /// Level a bus is heading toward
    pub fn bus_target(&self, bus: Bus) -> f32 {
        match bus {
            Bus::Sfx => self.sfx.target(),
            Bus::Music => self.music.target(),
        }
    }

    pub fn master_level(&self) -> f32 {
        self.master.current()
    }

    fn bus_mut(&mut self, bus: Bus) -> &mut SmoothedGain {
        match bus {
            Bus::Sfx => &mut self.sfx,
            Bus::Music => &mut self.music,
        }
    }

    /// Mix one frame of bus input into a single output sample
    #[inline]
    pub fn mix(&mut self, sfx: f32, music: f32) -> f32 {
        let sfx = sfx * self.sfx.next();
        let music = music * self.music.next();
        soft_clip((sfx + music) * self.master.next())
    }
}

/// Soft clip threshold
const SOFT_CLIP_THRESHOLD: f32 = 0.75;
/// Soft clip ceiling
const SOFT_CLIP_CEILING: f32 = 0.89;

/// Gentle soft clipper for the master output
///
/// Transparent below the threshold. Stacked chords and overlapping effects
/// can sum past full scale since voices are never limited; this keeps the
/// result below the ceiling without hard clipping.
#[inline(always)]
fn soft_clip(x: f32) -> f32 {
    let abs_x = x.abs();

    if abs_x <= SOFT_CLIP_THRESHOLD {
        return x;
    }

    let sign = x.signum();
    let knee_width = SOFT_CLIP_CEILING - SOFT_CLIP_THRESHOLD;
    let over = abs_x - SOFT_CLIP_THRESHOLD;
    let ratio = over / knee_width;

    // Asymptotic approach to ceiling
    let compressed = SOFT_CLIP_THRESHOLD + knee_width * (1.0 - (-ratio * 3.0).exp());
    sign * compressed.min(SOFT_CLIP_CEILING)
}
