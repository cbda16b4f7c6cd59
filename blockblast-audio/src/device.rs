//! Output device - opens the hardware stream that drives the engine
//!
//! `AudioBackend` is the seam between the facade and the hardware; the cpal
//! implementation lives here, tests substitute their own.

use crate::clock::{Clock, DeviceClock};
use crate::engine::{AudioCommand, EngineState};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::Receiver;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while opening the output device
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Failed to get audio config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to create audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start audio: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Unsupported sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("Failed to start music scheduler: {0}")]
    Scheduler(#[from] std::io::Error),
}

/// A running output and the clock it advances
pub struct OpenedOutput {
    pub clock: Arc<dyn Clock>,
    pub sample_rate: u32,
    /// Keeps the hardware stream alive; `None` for headless outputs
    pub stream: Option<cpal::Stream>,
}

/// Something that can render engine commands
pub trait AudioBackend {
    /// Start rendering; the backend owns `commands` from here on
    fn open(&mut self, commands: Receiver<AudioCommand>) -> Result<OpenedOutput, AudioError>;
}

/// Default host, default output device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl AudioBackend for CpalBackend {
    fn open(&mut self, commands: Receiver<AudioCommand>) -> Result<OpenedOutput, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let supported = device.default_output_config()?;

        let sample_rate = supported.sample_rate().0;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            channels = config.channels,
            format = ?sample_format,
            "Opening audio output"
        );

        let frames = Arc::new(AtomicU64::new(0));
        let engine = EngineState::new(sample_rate, frames.clone());

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, engine, commands)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, engine, commands)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, engine, commands)?,
            other => return Err(AudioError::UnsupportedFormat(other)),
        };
        stream.play()?;

        Ok(OpenedOutput {
            clock: Arc::new(DeviceClock::new(frames, sample_rate)),
            sample_rate,
            stream: Some(stream),
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: EngineState,
    commands: Receiver<AudioCommand>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    // Float scratch for integer devices; grown only if the host asks for a bigger block
    let mut scratch = vec![0.0f32; 16384];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            engine.drain(&commands);
            if scratch.len() < data.len() {
                scratch.resize(data.len(), 0.0);
            }
            let block = &mut scratch[..data.len()];
            engine.process(block, channels);
            for (out, sample) in data.iter_mut().zip(block.iter()) {
                *out = <T as Sample>::from_sample(*sample);
            }
        },
        |err| {
            tracing::error!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok(stream)
}
