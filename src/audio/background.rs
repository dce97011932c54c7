//! Background track loading
//!
//! Fetch (HTTP or local file), decode with symphonia, and resample to the
//! graph rate. Native loads run on a worker thread and are polled each frame
//! (fire-and-poll); WASM hands in bytes fetched by the page.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;

#[cfg(not(target_arch = "wasm32"))]
use std::sync::mpsc::{channel, Receiver, TryRecvError};

/// Decoded interleaved PCM (one or two channels)
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
}

impl PcmBuffer {
    /// Wrap interleaved samples. Channel counts above two are not mixed down
    /// here; use [`PcmBuffer::from_interleaved`] for arbitrary layouts.
    pub fn new(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            channels: channels.clamp(1, 2),
            samples,
        }
    }

    /// Build from any interleaved layout, keeping the first two channels
    pub fn from_interleaved(sample_rate: u32, channels: usize, samples: &[f32]) -> Self {
        let channels = channels.max(1);
        if channels <= 2 {
            return Self::new(sample_rate, channels as u16, samples.to_vec());
        }
        let kept = samples
            .chunks_exact(channels)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect();
        Self::new(sample_rate, 2, kept)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.max(1) as f64
    }

    /// Stereo frame at `index` (mono is duplicated)
    pub fn frame(&self, index: usize) -> Option<(f32, f32)> {
        if self.channels == 1 {
            self.samples.get(index).map(|&s| (s, s))
        } else {
            let base = index * 2;
            match (self.samples.get(base), self.samples.get(base + 1)) {
                (Some(&l), Some(&r)) => Some((l, r)),
                _ => None,
            }
        }
    }

    /// Linear-interpolation resample to `target_rate`
    pub fn resampled(&self, target_rate: u32) -> PcmBuffer {
        if target_rate == self.sample_rate || self.frames() == 0 || target_rate == 0 {
            return PcmBuffer::new(target_rate.max(1), self.channels, self.samples.clone());
        }

        let channels = self.channels as usize;
        let in_frames = self.frames();
        let step = self.sample_rate as f64 / target_rate as f64;
        let out_frames = ((in_frames as f64) / step).floor().max(1.0) as usize;
        let mut out = Vec::with_capacity(out_frames * channels);

        for i in 0..out_frames {
            let pos = i as f64 * step;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let next = (idx + 1).min(in_frames - 1);
            for ch in 0..channels {
                let a = self.samples[idx * channels + ch];
                let b = self.samples[next * channels + ch];
                out.push(a + (b - a) * frac);
            }
        }

        PcmBuffer::new(target_rate, self.channels, out)
    }
}

/// Decode a compressed audio stream
///
/// `hint` is a file extension (`"mp3"`, `"wav"`, ...) used to speed up probing.
pub fn decode(bytes: Vec<u8>, hint: Option<&str>) -> Result<PcmBuffer, AudioError> {
    let mut probe_hint = Hint::new();
    if let Some(ext) = hint {
        probe_hint.with_extension(ext);
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), MediaSourceStreamOptions::default());
    let probed = symphonia::default::get_probe()
        .format(&probe_hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::Decode(format!("probe failed: {e}")))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Decode("no audio track".into()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("decoder init failed: {e}")))?;

    let mut sample_rate = params.sample_rate.unwrap_or(0);
    let mut channels = params.channels.map(|c| c.count()).unwrap_or(0);
    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();

                // SampleBuffer capacity counts samples across all channels
                let needed = decoded.capacity() as u64;
                let needed_samples = needed as usize * channels;
                if sample_buf.as_ref().map_or(true, |buf| buf.capacity() < needed_samples) {
                    sample_buf = Some(SampleBuffer::new(needed, spec));
                }
                if let Some(buf) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            // Corrupt packet: skip it, keep the rest of the stream
            Err(SymphoniaError::DecodeError(e)) => log::debug!("Skipping bad packet: {}", e),
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        }
    }

    if sample_rate == 0 || channels == 0 || samples.is_empty() {
        return Err(AudioError::Decode("stream contained no audio".into()));
    }

    Ok(PcmBuffer::from_interleaved(sample_rate, channels, &samples))
}

/// File extension of a URL or path, used as the decode hint
pub fn extension_hint(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

/// Fetch raw bytes from `http(s)://` or the filesystem
#[cfg(not(target_arch = "wasm32"))]
pub fn fetch(url: &str) -> Result<Vec<u8>, AudioError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let response = ureq::get(url)
            .call()
            .map_err(|e| AudioError::Fetch(e.to_string()))?;
        let mut bytes = Vec::new();
        std::io::Read::read_to_end(&mut response.into_reader(), &mut bytes)?;
        Ok(bytes)
    } else {
        Ok(std::fs::read(url)?)
    }
}

/// Fetch, decode and resample in one step
#[cfg(not(target_arch = "wasm32"))]
pub fn load(url: &str, target_rate: u32) -> Result<PcmBuffer, AudioError> {
    let bytes = fetch(url)?;
    let hint = extension_hint(url);
    let pcm = decode(bytes, hint.as_deref())?;
    Ok(pcm.resampled(target_rate))
}

/// A background load running on a worker thread
#[cfg(not(target_arch = "wasm32"))]
pub struct PendingLoad {
    receiver: Receiver<Result<PcmBuffer, AudioError>>,
    url: String,
}

#[cfg(not(target_arch = "wasm32"))]
impl PendingLoad {
    /// Start loading `url` on a worker thread
    pub fn spawn(url: String, target_rate: u32) -> Self {
        let (sender, receiver) = channel();
        let worker_url = url.clone();

        std::thread::spawn(move || {
            let result = load(&worker_url, target_rate);
            let _ = sender.send(result);
        });

        Self { receiver, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Non-blocking check. `None` while still loading.
    pub fn poll(&mut self) -> Option<Result<PcmBuffer, AudioError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            // Worker panicked or dropped sender
            Err(TryRecvError::Disconnected) => {
                Some(Err(AudioError::Fetch("loader thread exited".into())))
            }
        }
    }

    /// Block until the load finishes
    pub fn wait(self) -> Result<PcmBuffer, AudioError> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(AudioError::Fetch("loader thread exited".into())))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Minimal 16-bit PCM WAV file
    pub(crate) fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_decode_wav() {
        let samples: Vec<i16> = (0..2000).map(|i| if i % 2 == 0 { 16384 } else { -16384 }).collect();
        let pcm = decode(wav_bytes(8000, 2, &samples), Some("wav")).unwrap();
        assert_eq!(pcm.sample_rate(), 8000);
        assert_eq!(pcm.channels(), 2);
        assert_eq!(pcm.frames(), 1000);
        let (l, r) = pcm.frame(0).unwrap();
        assert!((l - 0.5).abs() < 1e-3);
        assert!((r + 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode(b"definitely not audio".to_vec(), Some("mp3"));
        assert!(matches!(result, Err(AudioError::Decode(_))));
    }

    #[test]
    fn test_mono_frames_duplicate() {
        let pcm = PcmBuffer::new(100, 1, vec![0.1, 0.2]);
        assert_eq!(pcm.frame(1), Some((0.2, 0.2)));
        assert_eq!(pcm.frame(2), None);
        assert!((pcm.duration() - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_extra_channels_are_dropped() {
        let pcm = PcmBuffer::from_interleaved(100, 4, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(pcm.channels(), 2);
        assert_eq!(pcm.frame(0), Some((1.0, 2.0)));
        assert_eq!(pcm.frame(1), Some((5.0, 6.0)));
    }

    #[test]
    fn test_resample_doubles_frames() {
        let pcm = PcmBuffer::new(100, 1, vec![0.0, 1.0, 0.0, 1.0]);
        let up = pcm.resampled(200);
        assert_eq!(up.sample_rate(), 200);
        assert_eq!(up.frames(), 8);
        assert_eq!(up.frame(1), Some((0.5, 0.5)));
        assert_eq!(up.frame(2), Some((1.0, 1.0)));
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let pcm = PcmBuffer::new(44100, 2, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(pcm.resampled(44100), pcm);
    }

    #[test]
    fn test_ogg_vorbis_decoder_registered() {
        use symphonia::core::codecs::{CODEC_TYPE_MP3, CODEC_TYPE_VORBIS};
        let codecs = symphonia::default::get_codecs();
        assert!(codecs.get_codec(CODEC_TYPE_VORBIS).is_some());
        assert!(codecs.get_codec(CODEC_TYPE_MP3).is_some());
    }

    #[test]
    fn test_extension_hint() {
        assert_eq!(
            extension_hint("https://cdn.example.com/video/upload/v1/Aeroplane_qjim7e.mp3").as_deref(),
            Some("mp3")
        );
        assert_eq!(extension_hint("assets/flight.OGG?cache=1").as_deref(), Some("ogg"));
        assert_eq!(extension_hint("https://example.com/stream"), None);
        assert_eq!(extension_hint("track."), None);
    }

    #[test]
    fn test_pending_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("flight.wav");
        std::fs::write(&path, wav_bytes(22050, 1, &[8192; 2205])).unwrap();

        let pending = PendingLoad::spawn(path.to_string_lossy().to_string(), 44100);
        let pcm = pending.wait().unwrap();
        assert_eq!(pcm.sample_rate(), 44100);
        assert_eq!(pcm.channels(), 1);
        assert_eq!(pcm.frames(), 4410);
    }

    #[test]
    fn test_pending_load_missing_file() {
        let pending = PendingLoad::spawn("/nonexistent/flight.mp3".into(), 44100);
        assert!(matches!(pending.wait(), Err(AudioError::Io(_))));
    }
}
