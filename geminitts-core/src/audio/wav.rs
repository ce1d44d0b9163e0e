use std::io::{self, Cursor, Read, Seek, Write};
use std::path::PathBuf;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use thiserror::Error;
use tracing::{debug, warn};

/// Linear PCM layout of a raw audio buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

/// What the Gemini TTS models return: 24 kHz, 16-bit signed, mono.
pub const GEMINI_PCM_FORMAT: PcmFormat = PcmFormat {
    sample_rate: 24_000,
    bits_per_sample: 16,
    channels: 1,
};

impl From<PcmFormat> for WavSpec {
    fn from(format: PcmFormat) -> Self {
        WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
            sample_format: SampleFormat::Int,
        }
    }
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("at least one WAV source is required")]
    NoSources,

    #[error("failed to open WAV source #{index}: {source}")]
    Open {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to decode WAV source #{index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: hound::Error,
    },

    #[error("failed to read WAV source #{index}: {source}")]
    Read {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path:?}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to write WAV output: {0}")]
    Encode(#[from] hound::Error),
}

/// Outcome of a concatenation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatSummary {
    /// Format of the output, taken from the first source.
    pub spec: WavSpec,
    pub sources: usize,
    /// Indices of sources whose format differs from the first one.
    pub mismatched: Vec<usize>,
    pub data_bytes: usize,
}

impl ConcatSummary {
    pub fn formats_match(&self) -> bool {
        self.mismatched.is_empty()
    }
}

/// Prepends a WAV header describing `format` to raw little-endian PCM.
/// A trailing partial sample is dropped.
pub fn wrap_pcm(pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, AudioError> {
    let spec = WavSpec::from(format);
    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        let leftover = write_raw_samples(&mut writer, spec, pcm)?;
        if leftover > 0 {
            warn!(leftover, "Dropping trailing bytes that do not form a whole sample");
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Concatenates WAV streams into `output`.
///
/// The first source's format is used for the output header and the sample
/// data of every source is appended back-to-back in that format. Sources
/// with a different format still contribute their data; they are listed in
/// [`ConcatSummary::mismatched`]. Each source is dropped as soon as its data
/// has been copied.
pub fn concat<R, W, I>(sources: I, output: W) -> Result<ConcatSummary, AudioError>
where
    R: Read,
    W: Write + Seek,
    I: IntoIterator<Item = io::Result<R>>,
{
    let mut sources = sources.into_iter();
    let first = sources.next().ok_or(AudioError::NoSources)?;
    let (spec, first_data) = read_source(0, first)?;

    let mut writer = WavWriter::new(output, spec)?;
    let mut pending = first_data;
    let mut data_bytes = pending.len();
    let mut mismatched = Vec::new();
    let mut count = 1;

    let leftover = write_raw_samples(&mut writer, spec, &pending)?;
    pending.drain(..pending.len() - leftover);

    for (index, source) in sources.enumerate().map(|(i, s)| (i + 1, s)) {
        let (source_spec, data) = read_source(index, source)?;
        if !same_format(&spec, &source_spec) {
            mismatched.push(index);
        }
        data_bytes += data.len();
        count += 1;

        pending.extend_from_slice(&data);
        let leftover = write_raw_samples(&mut writer, spec, &pending)?;
        pending.drain(..pending.len() - leftover);
    }

    writer.finalize()?;

    if !mismatched.is_empty() {
        warn!(
            ?mismatched,
            "Input files have different formats; using the first file's format for output"
        );
    }
    debug!(sources = count, data_bytes, "Concatenated WAV sources");

    Ok(ConcatSummary {
        spec,
        sources: count,
        mismatched,
        data_bytes,
    })
}

/// In-memory variant of [`concat`].
pub fn concat_bytes<B: AsRef<[u8]>>(sources: &[B]) -> Result<(Vec<u8>, ConcatSummary), AudioError> {
    let mut output = Cursor::new(Vec::new());
    let summary = concat(
        sources.iter().map(|s| Ok(Cursor::new(s.as_ref()))),
        &mut output,
    )?;
    Ok((output.into_inner(), summary))
}

fn same_format(a: &WavSpec, b: &WavSpec) -> bool {
    a.sample_rate == b.sample_rate
        && a.bits_per_sample == b.bits_per_sample
        && a.channels == b.channels
}

fn bytes_per_sample(spec: &WavSpec) -> usize {
    (spec.bits_per_sample as usize).div_ceil(8)
}

/// Reads the header and the raw sample bytes of one source.
fn read_source<R: Read>(index: usize, source: io::Result<R>) -> Result<(WavSpec, Vec<u8>), AudioError> {
    let source = source.map_err(|source| AudioError::Open { index, source })?;
    let reader = WavReader::new(source).map_err(|source| AudioError::Decode { index, source })?;
    let spec = reader.spec();
    let expected = reader.len() as usize * bytes_per_sample(&spec);

    let mut data = Vec::with_capacity(expected);
    reader
        .into_inner()
        .take(expected as u64)
        .read_to_end(&mut data)
        .map_err(|source| AudioError::Read { index, source })?;

    if data.len() < expected {
        warn!(
            index,
            expected,
            actual = data.len(),
            "WAV source is shorter than its header claims"
        );
    }

    Ok((spec, data))
}

/// Writes as many whole samples of `bytes` as possible, interpreted in
/// `spec`. Returns the number of trailing bytes that were not written.
fn write_raw_samples<W: Write + Seek>(
    writer: &mut WavWriter<W>,
    spec: WavSpec,
    bytes: &[u8],
) -> Result<usize, AudioError> {
    let width = bytes_per_sample(&spec);
    if width == 0 {
        return Err(AudioError::UnsupportedFormat("0-bit samples".to_string()));
    }
    let mut chunks = bytes.chunks_exact(width);

    match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => {
            for c in &mut chunks {
                writer.write_sample((c[0] as i16 - 128) as i8)?;
            }
        }
        (SampleFormat::Int, 16) => {
            for c in &mut chunks {
                writer.write_sample(i16::from_le_bytes([c[0], c[1]]))?;
            }
        }
        (SampleFormat::Int, 24) => {
            for c in &mut chunks {
                let sign = if c[2] & 0x80 != 0 { 0xFF } else { 0x00 };
                writer.write_sample(i32::from_le_bytes([c[0], c[1], c[2], sign]))?;
            }
        }
        (SampleFormat::Int, 32) => {
            for c in &mut chunks {
                writer.write_sample(i32::from_le_bytes([c[0], c[1], c[2], c[3]]))?;
            }
        }
        (SampleFormat::Float, 32) => {
            for c in &mut chunks {
                writer.write_sample(f32::from_le_bytes([c[0], c[1], c[2], c[3]]))?;
            }
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!(
                "{bits}-bit {format:?}"
            )))
        }
    }

    Ok(chunks.remainder().len())
}
