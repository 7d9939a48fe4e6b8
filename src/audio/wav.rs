use std::path::Path;

use crate::error::Result;

/// PCM layouts the mastering chain writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavFormat {
    /// 32-bit IEEE float, the primary intermediate and output format.
    Float32,
    /// 24-bit integer PCM, used when normalization falls back.
    Pcm24,
}

pub fn write_wav(
    path: &Path,
    channels: &[Vec<f32>],
    sample_rate: u32,
    format: WavFormat,
) -> Result<()> {
    let (bits_per_sample, sample_format) = match format {
        WavFormat::Float32 => (32, hound::SampleFormat::Float),
        WavFormat::Pcm24 => (24, hound::SampleFormat::Int),
    };
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample,
        sample_format,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let frames = channels.first().map_or(0, |c| c.len());
    const PCM24_MAX: f32 = 8_388_607.0;

    for i in 0..frames {
        for ch in channels {
            match format {
                WavFormat::Float32 => writer.write_sample(ch[i])?,
                WavFormat::Pcm24 => {
                    let v = (ch[i].clamp(-1.0, 1.0) * PCM24_MAX).round() as i32;
                    writer.write_sample(v)?
                }
            }
        }
    }

    writer.finalize()?;
    log::debug!(
        "Wrote {} frames x {} ch ({:?}) to {}",
        frames,
        channels.len(),
        format,
        path.display()
    );
    Ok(())
}
