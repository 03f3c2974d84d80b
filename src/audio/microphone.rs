//! Microphone capture through cpal
//!
//! `cpal::Stream` cannot cross threads, so each acquisition owns its stream
//! on a dedicated thread that lives until the device is released.

use async_trait::async_trait;
use bytes::Bytes;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use log::{error, info, warn};
use std::sync::mpsc as std_mpsc;
use tokio::sync::{mpsc, oneshot};

use super::device::{AudioFormat, CaptureDevice, CaptureStream, DeviceHandle};
use super::recording::CaptureError;
use super::wav::samples_to_pcm16;

/// The system microphone, or a named input device
#[derive(Debug, Clone, Default)]
pub struct Microphone {
    device_name: Option<String>,
}

impl Microphone {
    pub fn named(device_name: impl Into<String>) -> Self {
        Self {
            device_name: Some(device_name.into()),
        }
    }
}

struct MicrophoneHandle {
    stop: Option<std_mpsc::Sender<()>>,
}

impl DeviceHandle for MicrophoneHandle {
    fn release(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The capture thread also exits when the sender is dropped.
            let _ = stop.send(());
        }
    }
}

#[async_trait]
impl CaptureDevice for Microphone {
    fn device_name(&self) -> String {
        self.device_name.clone().unwrap_or_else(|| "Default Microphone".to_string())
    }

    async fn acquire(&self) -> Result<CaptureStream, CaptureError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let device_name = self.device_name.clone();

        std::thread::Builder::new()
            .name("microphone-capture".to_string())
            .spawn(move || {
                let stream = match open_input_stream(device_name.as_deref(), chunk_tx) {
                    Ok((stream, format)) => {
                        let _ = ready_tx.send(Ok(format));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let _ = stop_rx.recv();
                drop(stream);
                info!("Microphone released");
            })
            .map_err(|e| CaptureError::DeviceUnavailable(format!("failed to spawn capture thread: {}", e)))?;

        let format = ready_rx
            .await
            .map_err(|_| CaptureError::DeviceUnavailable("capture thread exited".to_string()))??;

        info!(
            "Microphone acquired: {} Hz, {} channel(s)",
            format.sample_rate, format.channels
        );
        Ok(CaptureStream::new(
            format,
            chunk_rx,
            Box::new(MicrophoneHandle { stop: Some(stop_tx) }),
        ))
    }
}

fn open_input_stream(
    device_name: Option<&str>,
    chunk_tx: mpsc::UnboundedSender<Bytes>,
) -> Result<(cpal::Stream, AudioFormat), CaptureError> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::DeviceUnavailable(format!("cannot enumerate input devices: {}", e)))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| CaptureError::DeviceUnavailable(format!("input device '{}' not found", name)))?,
        None => host
            .default_input_device()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no input device available".to_string()))?,
    };

    let supported = device.default_input_config().map_err(|e| match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable(e.to_string())
        }
        _ => CaptureError::DeviceAccessDenied(e.to_string()),
    })?;

    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let format = AudioFormat::mono(config.sample_rate.0);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, chunk_tx),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, chunk_tx),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, chunk_tx),
        other => {
            return Err(CaptureError::DeviceUnavailable(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(|e| match e {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable(e.to_string()),
        _ => CaptureError::DeviceAccessDenied(e.to_string()),
    })?;

    stream.play().map_err(|e| match e {
        cpal::PlayStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable(e.to_string()),
        _ => CaptureError::DeviceAccessDenied(e.to_string()),
    })?;

    Ok((stream, format))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    chunk_tx: mpsc::UnboundedSender<Bytes>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<f32> = data.iter().map(|&s| f32::from_sample_(s)).collect();
            if chunk_tx.send(samples_to_pcm16(&samples, channels)).is_err() {
                warn!("Dropping audio chunk: capture session already finished");
            }
        },
        |err| error!("Audio input stream error: {}", err),
        None,
    )
}
