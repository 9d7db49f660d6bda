// ---------------- Native audio (cpal + symphonia) ----------------
//
// Clips are decoded to mono at the device rate on a worker thread, cached by
// path, then mixed by the cpal callback thread. A clip is "playing" while the
// mixer still holds it or its decode is pending.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tsne_core::{AudioBackend, PlaybackError};

const CLIP_GAIN: f32 = 0.5;
const CLIP_CACHE_LIMIT: usize = 256;

type ClipCache = Arc<Mutex<HashMap<PathBuf, Arc<[f32]>>>>;

struct ActiveClip {
    id: u64,
    samples: Arc<[f32]>,
    cursor: usize,
}

#[derive(Default)]
struct Mixer {
    clips: Vec<ActiveClip>,
    /// Clips whose decode has not finished yet.
    pending: Vec<u64>,
}

impl Mixer {
    fn next_sample(&mut self) -> f32 {
        let mut acc = 0.0f32;
        let mut i = 0usize;
        while i < self.clips.len() {
            let clip = &mut self.clips[i];
            acc += clip.samples[clip.cursor] * CLIP_GAIN;
            clip.cursor += 1;
            if clip.cursor >= clip.samples.len() {
                self.clips.swap_remove(i);
                continue;
            }
            i += 1;
        }
        acc.tanh()
    }

    fn push(&mut self, id: u64, samples: Arc<[f32]>) {
        if !samples.is_empty() {
            self.clips.push(ActiveClip {
                id,
                samples,
                cursor: 0,
            });
        }
    }

    /// Hand a decoded clip to a pending id. Returns false if it was stopped meanwhile.
    fn fulfil(&mut self, id: u64, samples: Arc<[f32]>) -> bool {
        let Some(pos) = self.pending.iter().position(|p| *p == id) else {
            return false;
        };
        self.pending.swap_remove(pos);
        self.push(id, samples);
        true
    }

    fn remove(&mut self, id: u64) {
        self.pending.retain(|p| *p != id);
        self.clips.retain(|c| c.id != id);
    }

    fn contains(&self, id: u64) -> bool {
        self.pending.contains(&id) || self.clips.iter().any(|c| c.id == id)
    }
}

struct Output {
    _stream: cpal::Stream,
    mixer: Arc<Mutex<Mixer>>,
    sample_rate: u32,
}

/// Plays clips through the default output device, or stays silent when none exists.
pub struct NativeAudio {
    output: Option<Output>,
    cache: ClipCache,
    max_clip_secs: f32,
    next_id: u64,
}

impl NativeAudio {
    pub fn new(max_clip_secs: f32) -> Self {
        let output = match open_output() {
            Ok(o) => {
                log::info!("[audio] output at {} Hz", o.sample_rate);
                Some(o)
            }
            Err(e) => {
                log::warn!("[audio] no output device, running silent: {:#}", e);
                None
            }
        };
        Self {
            output,
            cache: ClipCache::default(),
            max_clip_secs,
            next_id: 0,
        }
    }

    /// A backend that never touches an audio device.
    pub fn silent(max_clip_secs: f32) -> Self {
        Self {
            output: None,
            cache: ClipCache::default(),
            max_clip_secs,
            next_id: 0,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.output.is_none()
    }
}

impl AudioBackend for NativeAudio {
    type Handle = u64;

    fn start(&mut self, media: &str) -> Result<u64, PlaybackError> {
        let path = Path::new(media);
        if !path.is_file() {
            return Err(PlaybackError::Unresolvable(media.to_owned()));
        }
        let id = self.next_id;
        self.next_id += 1;
        let Some(output) = &self.output else {
            return Ok(id);
        };

        let cached = self
            .cache
            .lock()
            .map_err(|_| PlaybackError::Output("clip cache lock poisoned".to_owned()))?
            .get(path)
            .cloned();
        let mut mixer = output
            .mixer
            .lock()
            .map_err(|_| PlaybackError::Output("mixer lock poisoned".to_owned()))?;
        if let Some(samples) = cached {
            mixer.push(id, samples);
            return Ok(id);
        }
        mixer.pending.push(id);
        drop(mixer);

        let job = DecodeJob {
            id,
            path: path.to_path_buf(),
            target_rate: output.sample_rate,
            max_secs: self.max_clip_secs,
        };
        let mixer = Arc::clone(&output.mixer);
        let cache = Arc::clone(&self.cache);
        std::thread::Builder::new()
            .name("clip-decode".to_owned())
            .spawn(move || job.run(&mixer, &cache))
            .map_err(|e| {
                if let Ok(mut m) = output.mixer.lock() {
                    m.remove(id);
                }
                PlaybackError::Output(format!("cannot spawn decoder: {e}"))
            })?;
        Ok(id)
    }

    fn is_playing(&self, handle: &u64) -> bool {
        match &self.output {
            // Silent clips run until the scheduler's grace ceiling.
            None => true,
            Some(o) => o.mixer.lock().map(|m| m.contains(*handle)).unwrap_or(false),
        }
    }

    fn stop(&mut self, handle: &u64) {
        if let Some(o) = &self.output {
            if let Ok(mut m) = o.mixer.lock() {
                m.remove(*handle);
            }
        }
    }
}

struct DecodeJob {
    id: u64,
    path: PathBuf,
    target_rate: u32,
    max_secs: f32,
}

impl DecodeJob {
    /// Decode, cache and hand the clip to the mixer. On failure the pending
    /// id is dropped so the scheduler reclaims its slot on the next tick.
    fn run(self, mixer: &Mutex<Mixer>, cache: &Mutex<HashMap<PathBuf, Arc<[f32]>>>) {
        let samples = match decode_clip(&self.path, self.target_rate, self.max_secs) {
            Ok(samples) if !samples.is_empty() => Arc::<[f32]>::from(samples),
            Ok(_) => {
                self.abandon(mixer, "no audio frames".to_owned());
                return;
            }
            Err(e) => {
                self.abandon(mixer, format!("{e:#}"));
                return;
            }
        };
        if let Ok(mut c) = cache.lock() {
            if c.len() >= CLIP_CACHE_LIMIT {
                c.clear();
            }
            c.insert(self.path.clone(), Arc::clone(&samples));
        }
        if let Ok(mut m) = mixer.lock() {
            if !m.fulfil(self.id, samples) {
                log::debug!("[audio] {} stopped before decode finished", self.path.display());
            }
        }
    }

    fn abandon(&self, mixer: &Mutex<Mixer>, reason: String) {
        let err = PlaybackError::Decode {
            media: self.path.display().to_string(),
            reason,
        };
        log::warn!("[audio] {}", err);
        if let Ok(mut m) = mixer.lock() {
            m.remove(self.id);
        }
    }
}

fn open_output() -> Result<Output> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;
    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let mixer = Arc::new(Mutex::new(Mixer::default()));

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => {
            build_stream::<f32>(&device, &config.into(), channels, Arc::clone(&mixer))
        }
        cpal::SampleFormat::I16 => {
            build_stream::<i16>(&device, &config.into(), channels, Arc::clone(&mixer))
        }
        cpal::SampleFormat::U16 => {
            build_stream::<u16>(&device, &config.into(), channels, Arc::clone(&mixer))
        }
        other => anyhow::bail!("unsupported sample format {other:?}"),
    }?;
    stream.play().context("failed to start output stream")?;
    Ok(Output {
        _stream: stream,
        mixer,
        sample_rate,
    })
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mixer: Arc<Mutex<Mixer>>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let err_fn = |err| log::error!("[audio] stream error: {}", err);
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut guard = mixer.lock().ok();
            for frame in data.chunks_mut(channels.max(1)) {
                let s = guard.as_mut().map_or(0.0, |m| m.next_sample());
                let v = T::from_sample(s);
                for out in frame.iter_mut() {
                    *out = v;
                }
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

/// Decode up to `max_secs` of `path` to mono at `target_rate`.
pub fn decode_clip(path: &Path, target_rate: u32, max_secs: f32) -> Result<Vec<f32>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        hint.with_extension(ext);
    }
    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .context("Failed to probe audio format")?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .context("No default audio track found")?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let channels = codec_params.channels.map_or(1, |c| c.count()).max(1);
    let source_rate = codec_params.sample_rate.unwrap_or(44100);
    let limit = (max_secs.max(0.0) * source_rate as f32) as usize * channels;

    let mut sample_buf: Option<SampleBuffer<f32>> = None;
    let mut interleaved = Vec::new();
    while interleaved.len() < limit {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e).context("Failed to read packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(audio_buf) => {
                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(audio_buf.capacity() as u64, *audio_buf.spec())
                });
                buf.copy_interleaved_ref(audio_buf);
                interleaved.extend_from_slice(buf.samples());
            }
            Err(symphonia::core::errors::Error::DecodeError(_)) => {}
            Err(e) => return Err(e).context("Failed to decode packet"),
        }
    }
    interleaved.truncate(limit);

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok(resample_linear(&mono, source_rate, target_rate))
}

fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let output_len = (samples.len() as f64 / ratio) as usize;
    (0..output_len)
        .filter_map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            match (samples.get(idx), samples.get(idx + 1)) {
                (Some(a), Some(b)) => Some(a * (1.0 - frac) + b * frac),
                (Some(a), None) => Some(*a),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_identity_and_ratio() {
        let samples = vec![0.0, 0.5, 1.0, 0.5];
        assert_eq!(resample_linear(&samples, 44100, 44100), samples);
        assert_eq!(resample_linear(&samples, 44100, 22050).len(), 2);
        let up = resample_linear(&[0.0, 1.0], 22050, 44100);
        assert_eq!(up.len(), 4);
        assert!((up[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mixer_drops_clips_when_exhausted() {
        let mut mixer = Mixer::default();
        mixer.push(7, vec![0.2f32, 0.2].into());
        assert!(mixer.contains(7));
        assert!(mixer.next_sample() > 0.0);
        mixer.next_sample();
        assert!(!mixer.contains(7));
        assert_eq!(mixer.next_sample(), 0.0);
    }

    #[test]
    fn pending_clip_counts_as_playing_until_fulfilled() {
        let mut mixer = Mixer::default();
        mixer.pending.push(3);
        assert!(mixer.contains(3));
        assert_eq!(mixer.next_sample(), 0.0);
        assert!(mixer.fulfil(3, vec![0.5f32; 4].into()));
        assert!(mixer.pending.is_empty());
        assert!(mixer.contains(3));
    }

    #[test]
    fn stopped_pending_clip_is_never_mixed() {
        let mut mixer = Mixer::default();
        mixer.pending.push(4);
        mixer.remove(4);
        assert!(!mixer.fulfil(4, vec![0.5f32; 4].into()));
        assert!(!mixer.contains(4));
    }

    fn write_wav(path: &Path, rate: u32, samples: &[i16]) {
        let data_len = (samples.len() * 2) as u32;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&rate.to_le_bytes());
        bytes.extend_from_slice(&(rate * 2).to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn decode_job_caches_and_fills_pending_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8000, &[8000i16; 800]);

        let mixer = Mutex::new(Mixer::default());
        let cache = Mutex::new(HashMap::new());
        mixer.lock().unwrap().pending.push(1);
        DecodeJob {
            id: 1,
            path: path.clone(),
            target_rate: 8000,
            max_secs: 1.0,
        }
        .run(&mixer, &cache);

        let m = mixer.lock().unwrap();
        assert!(m.pending.is_empty());
        assert!(m.contains(1));
        assert!(cache.lock().unwrap().get(&path).is_some_and(|c| !c.is_empty()));
    }

    #[test]
    fn failed_decode_job_releases_its_slot() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not audio at all").unwrap();
        let mixer = Mutex::new(Mixer::default());
        let cache = Mutex::new(HashMap::new());
        mixer.lock().unwrap().pending.push(2);
        DecodeJob {
            id: 2,
            path: file.path().to_path_buf(),
            target_rate: 44100,
            max_secs: 1.0,
        }
        .run(&mixer, &cache);

        assert!(!mixer.lock().unwrap().contains(2));
        assert!(cache.lock().unwrap().is_empty());
    }

    #[test]
    fn silent_backend_rejects_missing_files() {
        let mut audio = NativeAudio::silent(1.0);
        assert!(matches!(
            audio.start("/definitely/not/here.wav"),
            Err(PlaybackError::Unresolvable(_))
        ));
    }

    #[test]
    fn silent_backend_accepts_existing_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut audio = NativeAudio::silent(1.0);
        let media = file.path().to_string_lossy().into_owned();
        let handle = audio.start(&media).unwrap();
        assert!(audio.is_playing(&handle));
        assert!(audio.is_silent());
    }

    #[test]
    fn garbage_files_fail_to_decode() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not audio at all").unwrap();
        assert!(decode_clip(file.path(), 44100, 1.0).is_err());
    }
}
