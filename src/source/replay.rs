//! Replay files: a validated header followed by length-framed,
//! zstd-compressed session messages. [`ReplayFeeder`] plays one back
//! through the session; [`ReplayWriter`] records one.
//!
//! Frame length prefix: one byte for lengths under 254; `254` then a u16;
//! `255` then a u32. All integers little-endian.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use zstd::bulk::{Compressor, Decompressor};

use crate::error::{CorruptionError, FormatError, SessionError};
use crate::protocol::{PROTOCOL_VERSION, PROTOCOL_VERSION_MIN, REPLAY_FILE_ID};
use crate::source::{FeedState, SourceFeeder, UnderrunPolicy};

/// Plays back a recorded session message stream from disk.
pub struct ReplayFeeder {
    path: PathBuf,
    /// `None` once the file ends or a read fails; the feeder then reports
    /// end-of-stream until the session resets it.
    file: Option<BufReader<File>>,
    decompressor: Decompressor<'static>,
    /// Playback rate is `2^speed_exponent`; 0 is realtime.
    speed_exponent: f64,
}

impl std::fmt::Debug for ReplayFeeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayFeeder")
            .field("path", &self.path)
            .field("speed_exponent", &self.speed_exponent)
            .finish_non_exhaustive()
    }
}

impl ReplayFeeder {
    /// Opens a replay and validates its header.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let file = open_and_validate(&path)?;
        let decompressor = Decompressor::new()?;
        Ok(Self {
            path,
            file: Some(file),
            decompressor,
            speed_exponent: 0.0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn speed_exponent(&self) -> f64 {
        self.speed_exponent
    }

    /// Sets playback rate to `2^exponent`. Negative slows down, positive
    /// speeds up.
    pub fn set_speed_exponent(&mut self, exponent: f64) {
        self.speed_exponent = exponent;
    }

    fn read_frame_len(file: &mut BufReader<File>) -> io::Result<usize> {
        let mut byte = [0u8; 1];
        file.read_exact(&mut byte)?;
        match byte[0] {
            254 => {
                let mut len = [0u8; 2];
                file.read_exact(&mut len)?;
                Ok(u16::from_le_bytes(len) as usize)
            }
            255 => {
                let mut len = [0u8; 4];
                file.read_exact(&mut len)?;
                Ok(u32::from_le_bytes(len) as usize)
            }
            small => Ok(small as usize),
        }
    }
}

impl SourceFeeder for ReplayFeeder {
    fn next_message(&mut self) -> Result<FeedState, SessionError> {
        let Some(file) = self.file.as_mut() else {
            return Ok(FeedState::EndOfStream);
        };

        // Any read failure mid-stream, including a clean EOF, closes the
        // file; a truncated final frame just ends playback early.
        let frame_len = match Self::read_frame_len(file) {
            Ok(len) => len,
            Err(_) => {
                self.file = None;
                return Ok(FeedState::EndOfStream);
            }
        };
        if frame_len == 0 {
            self.file = None;
            return Err(CorruptionError::EmptyReplayFrame.into());
        }

        let mut payload = vec![0u8; frame_len];
        if file.read_exact(&mut payload).is_err() {
            self.file = None;
            return Ok(FeedState::EndOfStream);
        }

        let upper_bound = Decompressor::<'static>::upper_bound(&payload).ok_or_else(|| {
            SessionError::DecompressionFailed {
                payload_size: payload.len(),
            }
        })?;
        let message = self
            .decompressor
            .decompress(&payload, upper_bound)
            .map_err(|_| SessionError::DecompressionFailed {
                payload_size: payload.len(),
            })?;
        Ok(FeedState::Message(message))
    }

    fn underrun_policy(&self) -> UnderrunPolicy {
        UnderrunPolicy::Pause
    }

    fn scale_time_advance(&mut self, advance: u32) -> u32 {
        if self.speed_exponent == 0.0 {
            return advance;
        }
        (advance as f64 * self.speed_exponent.exp2()).round() as u32
    }

    /// A session reset with rewind loops the replay: reopen from the top
    /// and revalidate the header.
    fn on_session_reset(&mut self, rewind: bool) -> Result<(), SessionError> {
        if rewind {
            self.file = Some(open_and_validate(&self.path)?);
        }
        Ok(())
    }
}

fn open_and_validate(path: &Path) -> Result<BufReader<File>, SessionError> {
    let mut file = BufReader::new(File::open(path)?);
    let mut header = [0u8; 6];
    if let Err(err) = file.read_exact(&mut header) {
        return if err.kind() == io::ErrorKind::UnexpectedEof {
            Err(FormatError::TruncatedHeader.into())
        } else {
            Err(err.into())
        };
    }

    let file_id = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    if file_id != REPLAY_FILE_ID {
        return Err(FormatError::BadFileId { found: file_id }.into());
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if !(PROTOCOL_VERSION_MIN..=PROTOCOL_VERSION).contains(&version) {
        return Err(FormatError::UnsupportedVersion {
            version,
            min: PROTOCOL_VERSION_MIN,
            max: PROTOCOL_VERSION,
        }
        .into());
    }
    Ok(file)
}

/// Records session messages to a replay file, one compressed frame per
/// message.
pub struct ReplayWriter {
    file: BufWriter<File>,
    compressor: Compressor<'static>,
}

impl ReplayWriter {
    /// Creates the file and writes the header at the current protocol
    /// version.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(&REPLAY_FILE_ID.to_le_bytes())?;
        file.write_all(&PROTOCOL_VERSION.to_le_bytes())?;
        let compressor = Compressor::new(zstd::DEFAULT_COMPRESSION_LEVEL)?;
        Ok(Self { file, compressor })
    }

    pub fn write_message(&mut self, message: &[u8]) -> Result<(), SessionError> {
        let compressed =
            self.compressor
                .compress(message)
                .map_err(|_| SessionError::CompressionFailed {
                    payload_size: message.len(),
                })?;

        let len = compressed.len();
        if len < 254 {
            self.file.write_all(&[len as u8])?;
        } else if len <= u16::MAX as usize {
            self.file.write_all(&[254])?;
            self.file.write_all(&(len as u16).to_le_bytes())?;
        } else {
            self.file.write_all(&[255])?;
            self.file.write_all(&(len as u32).to_le_bytes())?;
        }
        self.file.write_all(&compressed)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), SessionError> {
        self.file.flush()?;
        Ok(())
    }
}
