//! Canonical 44-byte WAV (RIFF/PCM) header used to make every clip playable
//! on its own.
//!
//! See: <http://soundfile.sapp.org/doc/WaveFormat/>

/// Size of the WAV header in bytes (RIFF + fmt + data chunk headers).
pub const WAV_HEADER_SIZE: usize = 44;

/// Byte offset of the RIFF chunk size field.
const RIFF_SIZE_OFFSET: usize = 4;

/// Byte offset of the fmt subchunk.
const FMT_OFFSET: usize = 12;

/// Byte offset of the data subchunk header.
const DATA_OFFSET: usize = 36;

/// Byte offset of the data chunk size field.
const DATA_SIZE_OFFSET: usize = 40;

/// RIFF chunk size minus data size: everything after the RIFF size field
/// except the samples.
const RIFF_SIZE_OVERHEAD: u32 = WAV_HEADER_SIZE as u32 - 8;

/// Size of the fmt chunk data (16 bytes for PCM).
const FMT_CHUNK_SIZE: u32 = 16;

/// Audio format code for PCM (uncompressed).
const FORMAT_PCM: u16 = 1;

/// Sample layout described by a WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Bits per sample.
    pub bits_per_sample: u16,
}

impl WavFormat {
    /// Bytes per frame (one sample for every channel).
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample / 8)
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate
            .saturating_mul(u32::from(self.block_align()))
    }
}

/// Builds a complete header for `data_size` bytes of PCM samples.
///
/// All multi-byte fields are little-endian.
pub fn header_bytes(format: &WavFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let mut header = [0u8; WAV_HEADER_SIZE];

    // RIFF container header
    header[0..4].copy_from_slice(b"RIFF");
    header[RIFF_SIZE_OFFSET..RIFF_SIZE_OFFSET + 4]
        .copy_from_slice(&data_size.saturating_add(RIFF_SIZE_OVERHEAD).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    // fmt subchunk (format specification)
    header[FMT_OFFSET..FMT_OFFSET + 4].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
    header[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    // data subchunk header
    header[DATA_OFFSET..DATA_OFFSET + 4].copy_from_slice(b"data");
    header[DATA_SIZE_OFFSET..DATA_SIZE_OFFSET + 4].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// A decoded canonical WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    /// Declared RIFF chunk size.
    pub riff_size: u32,
    /// Declared audio format code (1 = PCM).
    pub audio_format: u16,
    /// Sample layout.
    pub format: WavFormat,
    /// Declared byte rate.
    pub byte_rate: u32,
    /// Declared block alignment.
    pub block_align: u16,
    /// Declared number of sample bytes following the header.
    pub data_size: u32,
}

impl WavHeader {
    /// Parses the canonical 44-byte header at the start of `bytes`.
    ///
    /// Returns `None` if the buffer is too short or the chunk tags don't match.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..WAV_HEADER_SIZE)?;
        if &header[0..4] != b"RIFF"
            || &header[8..12] != b"WAVE"
            || &header[FMT_OFFSET..FMT_OFFSET + 4] != b"fmt "
            || &header[DATA_OFFSET..DATA_OFFSET + 4] != b"data"
        {
            return None;
        }

        Some(Self {
            riff_size: read_u32(header, RIFF_SIZE_OFFSET),
            audio_format: read_u16(header, 20),
            format: WavFormat {
                channels: read_u16(header, 22),
                sample_rate: read_u32(header, 24),
                bits_per_sample: read_u16(header, 34),
            },
            byte_rate: read_u32(header, 28),
            block_align: read_u16(header, 32),
            data_size: read_u32(header, DATA_SIZE_OFFSET),
        })
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONO_8K: WavFormat = WavFormat {
        sample_rate: 8000,
        channels: 1,
        bits_per_sample: 8,
    };

    #[test]
    fn test_header_bytes_mono_8bit() {
        let header = header_bytes(&MONO_8K, 8000);

        let mut expected = Vec::new();
        expected.extend_from_slice(b"RIFF");
        expected.extend_from_slice(&8036u32.to_le_bytes());
        expected.extend_from_slice(b"WAVE");
        expected.extend_from_slice(b"fmt ");
        expected.extend_from_slice(&16u32.to_le_bytes());
        expected.extend_from_slice(&1u16.to_le_bytes());
        expected.extend_from_slice(&1u16.to_le_bytes());
        expected.extend_from_slice(&8000u32.to_le_bytes());
        expected.extend_from_slice(&8000u32.to_le_bytes());
        expected.extend_from_slice(&1u16.to_le_bytes());
        expected.extend_from_slice(&8u16.to_le_bytes());
        expected.extend_from_slice(b"data");
        expected.extend_from_slice(&8000u32.to_le_bytes());

        assert_eq!(header.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_header_stereo_16bit_rates() {
        let format = WavFormat {
            sample_rate: 44100,
            channels: 2,
            bits_per_sample: 16,
        };
        let header = header_bytes(&format, 176_400);

        // Channels at offset 22, sample rate at 24
        assert_eq!(u16::from_le_bytes([header[22], header[23]]), 2);
        assert_eq!(read_u32(&header, 24), 44100);

        // Byte rate = sample_rate * channels * bytes_per_sample
        assert_eq!(read_u32(&header, 28), 44100 * 2 * 2);

        // Block align = channels * bytes_per_sample
        assert_eq!(u16::from_le_bytes([header[32], header[33]]), 4);
    }

    #[test]
    fn test_parse_header() {
        let header = header_bytes(&MONO_8K, 8000);
        let parsed = WavHeader::parse(&header).unwrap();

        assert_eq!(parsed.riff_size, 8000 + 36);
        assert_eq!(parsed.audio_format, 1);
        assert_eq!(parsed.format, MONO_8K);
        assert_eq!(parsed.byte_rate, 8000);
        assert_eq!(parsed.block_align, 1);
        assert_eq!(parsed.data_size, 8000);
    }

    #[test]
    fn test_parse_rejects_short_or_foreign_data() {
        let header = header_bytes(&MONO_8K, 8000);
        assert!(WavHeader::parse(&header[..40]).is_none());

        let mut corrupted = header;
        corrupted[0..4].copy_from_slice(b"RIFX");
        assert!(WavHeader::parse(&corrupted).is_none());

        assert!(WavHeader::parse(b"").is_none());
    }

    #[test]
    fn test_header_never_panics_on_extreme_values() {
        let format = WavFormat {
            sample_rate: u32::MAX,
            channels: u16::MAX,
            bits_per_sample: 64,
        };
        let header = header_bytes(&format, u32::MAX);
        let parsed = WavHeader::parse(&header).unwrap();
        assert_eq!(parsed.riff_size, u32::MAX);
        assert_eq!(parsed.byte_rate, u32::MAX);
    }
}
