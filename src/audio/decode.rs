use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::signal::AudioSignal;
use crate::error::{MasterError, Result};

/// Decode an audio file at its native sample rate, keeping every channel.
pub fn decode_audio(path: &Path) -> Result<AudioSignal> {
    let file = std::fs::File::open(path).map_err(|e| {
        MasterError::Load(format!("cannot open {}: {}", path.display(), e))
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| MasterError::Load(format!("cannot probe {}: {}", path.display(), e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| MasterError::Load(format!("no audio track in {}", path.display())))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| MasterError::Load("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| MasterError::Load(format!("no decoder: {}", e)))?;

    // Sized from the first decoded buffer, not the container header
    let mut channels: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        append_planar(&mut channels, sample_buf.samples(), spec.channels.count())?;
    }

    if channels.first().map_or(true, |c| c.is_empty()) {
        return Err(MasterError::Load(format!(
            "{} decoded to zero samples",
            path.display()
        )));
    }

    log::info!(
        "Decoded audio: {} frames x {} ch, {}Hz, {:.1}s",
        channels[0].len(),
        channels.len(),
        sample_rate,
        channels[0].len() as f32 / sample_rate as f32
    );

    AudioSignal::new(channels, sample_rate)
}

/// De-interleave one decoded buffer onto the planar output. The first
/// buffer fixes the channel count; later buffers must agree with it.
fn append_planar(channels: &mut Vec<Vec<f32>>, interleaved: &[f32], count: usize) -> Result<()> {
    if count == 0 {
        return Err(MasterError::Load("decoded buffer has no channels".into()));
    }
    if channels.is_empty() {
        channels.resize(count, Vec::new());
    } else if channels.len() != count {
        return Err(MasterError::Load(format!(
            "channel count changed mid-stream from {} to {}",
            channels.len(),
            count
        )));
    }

    for frame in interleaved.chunks_exact(count) {
        for (ch, &s) in frame.iter().enumerate() {
            channels[ch].push(s);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::{write_wav, WavFormat};

    #[test]
    fn first_buffer_fixes_channel_count() {
        let mut channels = Vec::new();
        append_planar(&mut channels, &[0.1, 0.2, 0.3, 0.4], 2).unwrap();
        append_planar(&mut channels, &[0.5, 0.6], 2).unwrap();
        assert_eq!(channels, vec![vec![0.1, 0.3, 0.5], vec![0.2, 0.4, 0.6]]);

        let err = append_planar(&mut channels, &[0.7, 0.8, 0.9], 3).unwrap_err();
        assert!(err.to_string().contains("from 2 to 3"), "{}", err);
        assert_eq!(channels[0].len(), 3);
    }

    #[test]
    fn decodes_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let left: Vec<f32> = (0..4800).map(|i| (i as f32 / 4800.0) - 0.5).collect();
        let right: Vec<f32> = left.iter().map(|s| -s * 0.5).collect();
        write_wav(&path, &[left.clone(), right.clone()], 48000, WavFormat::Float32).unwrap();

        let signal = decode_audio(&path).unwrap();
        assert_eq!(signal.channel_count(), 2);
        assert_eq!(signal.sample_rate(), 48000);
        assert_eq!(signal.channels()[0], left);
        assert_eq!(signal.channels()[1], right);
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = decode_audio(&dir.path().join("absent.wav")).unwrap_err();
        assert!(matches!(err, MasterError::Load(_)));
    }
}
