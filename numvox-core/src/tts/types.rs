use anyhow::{Context, Result};
use std::io::Cursor;

/// What a provider is asked to say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    /// Free-form delivery instruction ("calm", "excited" ...). Providers that
    /// cannot steer delivery ignore it.
    pub style: Option<String>,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: None,
        }
    }

    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = style;
        self
    }
}

/// Audio data returned from TTS synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioData {
    /// A complete WAV container, written as-is.
    Wav(Vec<u8>),
    /// Raw signed 16-bit little-endian PCM.
    Pcm {
        pcm_data: Vec<u8>,
        sample_rate: u32,
        channels: u16,
    },
}

impl AudioData {
    pub fn pcm(pcm_data: Vec<u8>, sample_rate: u32, channels: u16) -> Self {
        Self::Pcm {
            pcm_data,
            sample_rate,
            channels,
        }
    }

    /// Bytes of a WAV file holding this audio.
    pub fn into_wav_bytes(self) -> Result<Vec<u8>> {
        match self {
            AudioData::Wav(bytes) => Ok(bytes),
            AudioData::Pcm {
                pcm_data,
                sample_rate,
                channels,
            } => encode_wav(&pcm_data, sample_rate, channels),
        }
    }
}

fn encode_wav(pcm_data: &[u8], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to start WAV writer")?;
        for sample in pcm_data.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([sample[0], sample[1]]))
                .context("Failed to write WAV sample")?;
        }
        writer.finalize().context("Failed to finalize WAV data")?;
    }
    Ok(cursor.into_inner())
}

/// Voice configuration for TTS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language_code: String,
    pub category: Option<String>,
}
