use crate::{CoreResult, DictationError};

use std::panic::Location;

use audioadapter_buffers::direct::InterleavedSlice;
use error_location::ErrorLocation;
use rubato::{Fft, FixedSync, Resampler as RubatoResampler};
use tracing::{debug, instrument};

/// Input frames consumed per resampling block.
pub(crate) const RESAMPLER_BLOCK_FRAMES: usize = 1024;

/// Streaming mono resampler fed one fixed-size block at a time.
pub struct Resampler {
    resampler: Fft<f32>,
    input_rate: u32,
    output_rate: u32,
    block_frames: usize,
    output_block: Vec<f32>,
}

impl Resampler {
    #[track_caller]
    #[instrument]
    pub fn new(input_rate: u32, output_rate: u32) -> CoreResult<Self> {
        let block_frames = RESAMPLER_BLOCK_FRAMES;
        let sub_chunks = 2; // Sub-chunks for processing

        let resampler = Fft::<f32>::new(
            input_rate as usize,  // sample_rate_input
            output_rate as usize, // sample_rate_output
            block_frames,         // chunk_size
            sub_chunks,           // sub_chunks
            1,                    // nbr_channels (mono)
            FixedSync::Input,     // fixed
        )
        .map_err(|e| DictationError::ResamplingError {
            reason: format!("Failed to create resampler: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let output_block = vec![0.0f32; resampler.output_frames_max()];

        debug!(
            input_rate = input_rate,
            output_rate = output_rate,
            block_frames = block_frames,
            "Resampler initialized"
        );

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            block_frames,
            output_block,
        })
    }

    /// Frames [`process_block`](Self::process_block) expects per call.
    pub fn block_frames(&self) -> usize {
        self.block_frames
    }

    /// Resample exactly [`block_frames`](Self::block_frames) input frames.
    #[track_caller]
    pub fn process_block(&mut self, block: &[f32]) -> CoreResult<&[f32]> {
        if block.len() != self.block_frames {
            return Err(DictationError::ResamplingError {
                reason: format!(
                    "Expected {} frames, got {} ({} Hz -> {} Hz)",
                    self.block_frames,
                    block.len(),
                    self.input_rate,
                    self.output_rate
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let input_adapter = InterleavedSlice::new(block, 1, self.block_frames).map_err(|e| {
            DictationError::ResamplingError {
                reason: format!("Failed to create input adapter: {}", e),
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let output_frames = self.output_block.len();
        let mut output_adapter =
            InterleavedSlice::new_mut(&mut self.output_block, 1, output_frames).map_err(|e| {
                DictationError::ResamplingError {
                    reason: format!("Failed to create output adapter: {}", e),
                    location: ErrorLocation::from(Location::caller()),
                }
            })?;

        let (_input_frames, output_frames_written) = self
            .resampler
            .process_into_buffer(&input_adapter, &mut output_adapter, None)
            .map_err(|e| DictationError::ResamplingError {
                reason: format!("Resampling failed: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(&self.output_block[..output_frames_written])
    }
}
