//! Default-microphone capture through cpal.
//!
//! The cpal stream lives on its own thread for the lifetime of one
//! recording: cpal streams are not `Send` on every backend, and the
//! coordination runtime must not own one. The audio callback downmixes to
//! mono and forwards each callback's frames over an unbounded channel; the
//! runtime side resamples to the requested rate and slices fixed chunks.
//!
//! A device can be chosen by name. An unknown name falls back to the host's
//! default input device with a warning.

use crate::{
    CaptureDevice, CaptureFormat, CaptureStream, CoreResult, DictationError,
    audio::Resampler,
};

use std::{collections::VecDeque, panic::Location, thread::JoinHandle};

use cpal::{
    StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use error_location::ErrorLocation;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

/// Captures from a named input device, or the host's default one.
#[derive(Debug, Default)]
pub struct CpalCaptureDevice {
    device_name: Option<String>,
}

impl CpalCaptureDevice {
    /// Bind to the input device called `device_name`, or the default input
    /// device when `None`.
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    /// Requested input device name, if any.
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }
}

impl CaptureDevice for CpalCaptureDevice {
    type Stream = CpalCaptureStream;

    #[instrument(skip(self), fields(device = self.device_name.as_deref().unwrap_or("default")))]
    async fn open(&self, format: &CaptureFormat) -> CoreResult<CpalCaptureStream> {
        if format.channels != 1 {
            return Err(DictationError::DeviceError {
                reason: format!("Only mono capture is supported, got {} channels", format.channels),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let device_name = self.device_name.clone();

        let worker = std::thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || run_stream(device_name, frames_tx, ready_tx, stop_rx))
            .map_err(|source| DictationError::ThreadSpawn {
                name: "audio-capture".to_string(),
                source,
                location: ErrorLocation::from(Location::caller()),
            })?;

        let mut stream = CpalCaptureStream {
            frames_rx,
            native: Vec::new(),
            pending: VecDeque::new(),
            resampler: None,
            chunk_frames: format.chunk_frames,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        };

        let device_rate = ready_rx.await.map_err(|_| DictationError::DeviceError {
            reason: "Capture thread exited before the stream started".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })??;

        if device_rate != format.sample_rate {
            stream.resampler = Some(Resampler::new(device_rate, format.sample_rate)?);
            debug!(
                input_rate = device_rate,
                output_rate = format.sample_rate,
                "Resampler configured"
            );
        }

        info!(device_rate, "Audio capture started");
        Ok(stream)
    }
}

/// Open capture stream. Dropping it stops the device and joins its thread.
pub struct CpalCaptureStream {
    frames_rx: mpsc::UnboundedReceiver<Vec<f32>>,
    native: Vec<f32>,
    pending: VecDeque<f32>,
    resampler: Option<Resampler>,
    chunk_frames: usize,
    stop_tx: Option<std::sync::mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl CpalCaptureStream {
    fn ingest(&mut self, frames: Vec<f32>) -> CoreResult<()> {
        let Some(resampler) = self.resampler.as_mut() else {
            self.pending.extend(frames);
            return Ok(());
        };

        self.native.extend(frames);
        let block = resampler.block_frames();
        let mut consumed = 0;

        while self.native.len() - consumed >= block {
            let out = resampler.process_block(&self.native[consumed..consumed + block])?;
            self.pending.extend(out.iter().copied());
            consumed += block;
        }

        self.native.drain(..consumed);
        Ok(())
    }
}

impl CaptureStream for CpalCaptureStream {
    async fn read_chunk(&mut self) -> CoreResult<Vec<i16>> {
        while self.pending.len() < self.chunk_frames {
            let frames = self
                .frames_rx
                .recv()
                .await
                .ok_or_else(|| DictationError::DeviceError {
                    reason: "Capture stream closed".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                })?;
            self.ingest(frames)?;
        }

        Ok(self
            .pending
            .drain(..self.chunk_frames)
            .map(to_i16)
            .collect())
    }
}

impl Drop for CpalCaptureStream {
    fn drop(&mut self) {
        // Closing the channel wakes the capture thread.
        drop(self.stop_tx.take());

        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("Audio capture thread panicked");
        }

        info!("Audio capture stopped");
    }
}

fn run_stream(
    device_name: Option<String>,
    frames_tx: mpsc::UnboundedSender<Vec<f32>>,
    ready_tx: oneshot::Sender<CoreResult<u32>>,
    stop_rx: std::sync::mpsc::Receiver<()>,
) {
    let stream = match build_stream(device_name.as_deref(), frames_tx) {
        Ok((stream, rate)) => {
            let _ = ready_tx.send(Ok(rate));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    // Blocks until the owning CpalCaptureStream is dropped.
    let _ = stop_rx.recv();
    drop(stream);
}

#[track_caller]
fn select_input_device(host: &cpal::Host, wanted: Option<&str>) -> CoreResult<cpal::Device> {
    if let Some(wanted) = wanted {
        match host.input_devices() {
            Ok(devices) => {
                let named = devices.map(|device| (input_device_name(&device), device));
                if let Some(device) = find_by_name(named, wanted) {
                    return Ok(device);
                }
                warn!(device = wanted, "Input device not found, using the default device");
            }
            Err(e) => {
                warn!(
                    device = wanted,
                    "Failed to list input devices, using the default device: {}", e
                );
            }
        }
    }

    host.default_input_device()
        .ok_or(DictationError::NoMicrophoneFound {
            location: ErrorLocation::from(Location::caller()),
        })
}

#[allow(deprecated)]
fn input_device_name(device: &cpal::Device) -> Option<String> {
    device.name().ok()
}

/// First candidate whose name equals `wanted`, ignoring ASCII case and
/// surrounding whitespace.
pub(crate) fn find_by_name<T>(
    candidates: impl IntoIterator<Item = (Option<String>, T)>,
    wanted: &str,
) -> Option<T> {
    let wanted = wanted.trim();
    candidates
        .into_iter()
        .find(|(name, _)| {
            name.as_deref()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case(wanted))
        })
        .map(|(_, candidate)| candidate)
}

#[track_caller]
fn build_stream(
    device_name: Option<&str>,
    frames_tx: mpsc::UnboundedSender<Vec<f32>>,
) -> CoreResult<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = select_input_device(&host, device_name)?;

    let supported = device
        .default_input_config()
        .map_err(|e| DictationError::DeviceError {
            reason: format!("Failed to get config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let config: StreamConfig = supported.into();
    let channels = usize::from(config.channels.max(1));
    let rate = config.sample_rate;

    debug!(
        device_id = ?device.id(),
        sample_rate = rate,
        channels = channels,
        "Opening input stream"
    );

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = data
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                    .collect();
                // The receiver is gone once the recording has been dropped.
                let _ = frames_tx.send(mono);
            },
            |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| DictationError::DeviceError {
            reason: format!("Failed to build stream: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    stream.play().map_err(|e| DictationError::DeviceError {
        reason: format!("Failed to start stream: {}", e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    Ok((stream, rate))
}

pub(crate) fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}
