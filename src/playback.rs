//! Plays an engine through the default output device.

use crate::context::DeviceConfig;
use crate::engine::ThereminEngine;
use crate::error::ThereminError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, StreamConfig};
use std::sync::{Arc, Mutex};

fn unavailable(e: impl std::fmt::Display) -> ThereminError {
    ThereminError::DeviceUnavailable(e.to_string())
}

fn default_device() -> Result<cpal::Device, ThereminError> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| unavailable("no output device available"))
}

/// A running output stream pulling audio from an engine.
pub struct Playback {
    stream: cpal::Stream,
    engine: Arc<Mutex<ThereminEngine>>,
}

impl Playback {
    /// The format of the default output device, for constructing the engine.
    pub fn default_device_config() -> Result<DeviceConfig, ThereminError> {
        let config = default_device()?
            .default_output_config()
            .map_err(unavailable)?;
        Ok(DeviceConfig {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        })
    }

    /// Opens the default device at the engine's format and starts streaming.
    pub fn start(engine: Arc<Mutex<ThereminEngine>>) -> Result<Self, ThereminError> {
        let device = default_device()?;
        let supported = device.default_output_config().map_err(unavailable)?;
        let device_config = engine
            .lock()
            .map_err(|_| unavailable("engine lock poisoned"))?
            .device_config();
        let config = StreamConfig {
            channels: device_config.channels,
            sample_rate: cpal::SampleRate(device_config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, engine.clone())?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, engine.clone())?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, engine.clone())?,
            sample_format => {
                return Err(unavailable(format!(
                    "unsupported sample format: {}",
                    sample_format
                )));
            }
        };
        stream.play().map_err(unavailable)?;
        log::info!(
            "playback started: {} Hz, {} channels, {}",
            device_config.sample_rate,
            device_config.channels,
            supported.sample_format()
        );
        Ok(Self { stream, engine })
    }

    /// Stops the stream and then closes the engine.
    ///
    /// The stream is dropped first, so no render callback can run against a
    /// closed engine.
    pub fn shutdown(self) -> Result<(), ThereminError> {
        let Playback { stream, engine } = self;
        if let Err(e) = stream.pause() {
            log::warn!("failed to pause output stream: {}", e);
        }
        drop(stream);
        engine
            .lock()
            .map_err(|_| unavailable("engine lock poisoned"))?
            .close();
        Ok(())
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    engine: Arc<Mutex<ThereminEngine>>,
) -> Result<cpal::Stream, ThereminError>
where
    T: Sample + FromSample<f32> + cpal::SizedSample,
{
    let mut scratch: Vec<f32> = Vec::new();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                scratch.resize(data.len(), 0.0);
                match engine.lock() {
                    Ok(mut engine) => engine.render(&mut scratch),
                    Err(_) => scratch.fill(0.0),
                }
                for (out, &sample) in data.iter_mut().zip(&scratch) {
                    *out = T::from_sample(sample);
                }
            },
            |err| log::warn!("audio stream error: {}", err),
            None,
        )
        .map_err(unavailable)
}
