/// Streaming decoder using Symphonia
use crate::error::{AudioError, Result};
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use tracing::debug;

/// Decoded audio chunk: interleaved stereo f32 in `[-1.0, 1.0]`
#[derive(Debug, Clone, PartialEq)]
pub struct PcmChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmChunk {
    /// Stereo frames in the chunk
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }
}

/// Decoder for one stream
///
/// Supports whatever the enabled symphonia features can demux and decode
/// (MP3, AAC/MP4, FLAC, Vorbis, WAV, ...).
pub struct StreamDecoder {
    /// Format reader (container parser)
    format: Box<dyn FormatReader>,
    /// Audio decoder
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    duration: Option<Duration>,
    /// Frames decoded since the start (or the last seek target)
    position_frames: u64,
}

impl StreamDecoder {
    /// Probe `source` and prepare its default track
    ///
    /// `mime_type` is only a hint for the probe.
    pub fn open(source: Box<dyn MediaSource>, mime_type: Option<&str>) -> Result<Self> {
        let mss = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        if let Some(mime) = mime_type {
            hint.mime_type(mime);
            if let Some(ext) = extension_for_mime(mime) {
                hint.with_extension(ext);
            }
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions {
                    enable_gapless: true,
                    ..Default::default()
                },
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::Symphonia(format!("Failed to probe stream: {}", e)))?;

        let format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| AudioError::DecodeError("No audio tracks found".to_string()))?;

        let sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let track_id = track.id;
        let duration = track
            .codec_params
            .n_frames
            .map(|n| Duration::from_secs_f64(n as f64 / sample_rate as f64));

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Symphonia(format!("Failed to create decoder: {}", e)))?;

        debug!(sample_rate, ?duration, "Opened stream");
        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            duration,
            position_frames: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn position(&self) -> Duration {
        Duration::from_secs_f64(self.position_frames as f64 / self.sample_rate as f64)
    }

    /// Decode the next packet; `None` at end of stream
    pub fn next_chunk(&mut self) -> Result<Option<PcmChunk>> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                // Corrupt packet: skip it
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!(error = e, "Skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);

            let samples = to_stereo(buffer.samples(), channels);
            self.position_frames += (samples.len() / 2) as u64;
            return Ok(Some(PcmChunk {
                samples,
                sample_rate: self.sample_rate,
            }));
        }
    }

    /// Seek to `position`; returns where decoding actually resumes
    pub fn seek(&mut self, position: Duration) -> Result<Duration> {
        let seeked = self.format.seek(
            SeekMode::Accurate,
            SeekTo::Time {
                time: Time::from(position.as_secs_f64()),
                track_id: Some(self.track_id),
            },
        )?;
        self.decoder.reset();
        self.position_frames = seeked.actual_ts;
        Ok(self.position())
    }
}

/// Interleaved stereo from interleaved `channels`-channel samples
///
/// Mono is duplicated; beyond two channels only front left/right are kept.
fn to_stereo(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        2 => samples.iter().map(|s| s.clamp(-1.0, 1.0)).collect(),
        n => samples
            .chunks_exact(n)
            .flat_map(|frame| [frame[0].clamp(-1.0, 1.0), frame[1].clamp(-1.0, 1.0)])
            .collect(),
    }
}

fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    match essence {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/mp4" | "audio/aac" | "audio/x-m4a" => Some("m4a"),
        "audio/webm" => Some("webm"),
        "audio/ogg" => Some("ogg"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
        _ => None,
    }
}
