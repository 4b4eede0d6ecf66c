//! Canonical encoding for trace log records.
//!
//! Uses postcard for byte-stable encoding. Each record on disk is a
//! frame: a u32 big-endian length followed by the postcard bytes, so a
//! reader can skip or seek to frames without decoding what it skips.

use serde::{Deserialize, Serialize};
use std::io::{self, Read, Seek, SeekFrom, Write};

use rewind816_core::{CoreError, CoreResult};

/// Largest frame a log may carry
///
/// A worst-case checkpoint over the full 24-bit address space stays well
/// under this; anything larger is a corrupted length prefix, and the
/// reader must not trust it with an allocation.
pub const MAX_FRAME_LEN: u32 = 1 << 28;

/// Trait for canonical serialization
pub trait CanonicalEncode: Serialize {
    /// Encode to canonical bytes
    ///
    /// # Errors
    ///
    /// Returns error if the value cannot be encoded
    fn encode(&self) -> CoreResult<Vec<u8>> {
        postcard::to_allocvec(self).map_err(CoreError::from)
    }
}

/// Trait for canonical deserialization
pub trait CanonicalDecode<'de>: Deserialize<'de> {
    /// Decode from canonical bytes
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid encoding
    fn decode(data: &'de [u8]) -> CoreResult<Self>
    where
        Self: Sized,
    {
        postcard::from_bytes(data).map_err(CoreError::from)
    }
}

impl<'de, T: Deserialize<'de>> CanonicalDecode<'de> for T {}

/// Frame writer for streaming records
pub struct FrameWriter<W> {
    writer: W,
    written: u64,
}

impl<W: Write> FrameWriter<W> {
    /// Create a new frame writer
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Bytes written so far
    #[must_use]
    pub fn position(&self) -> u64 {
        self.written
    }

    /// Write one framed record, returning its starting offset
    ///
    /// # Errors
    ///
    /// Returns error if encoding or the underlying write fails
    pub fn write_frame<T: CanonicalEncode>(&mut self, value: &T) -> CoreResult<u64> {
        let offset = self.written;
        let bytes = value.encode()?;
        let len = u32::try_from(bytes.len())
            .ok()
            .filter(|&len| len <= MAX_FRAME_LEN)
            .ok_or_else(|| CoreError::Format {
                reason: format!("record of {} bytes exceeds frame limit", bytes.len()),
            })?;
        self.writer.write_all(&len.to_be_bytes())?;
        self.writer.write_all(&bytes)?;
        self.written += 4 + u64::from(len);
        Ok(offset)
    }

    /// Flush the underlying writer
    ///
    /// # Errors
    ///
    /// Returns error if the flush fails
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Frame reader for streaming records
pub struct FrameReader<R> {
    reader: R,
    position: u64,
}

impl<R: Read> FrameReader<R> {
    /// Create a new frame reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
        }
    }

    /// Read the next framed record, or `None` at a clean end of stream
    ///
    /// The length prefix is bounds-checked against [`MAX_FRAME_LEN`]
    /// before any buffer is allocated.
    ///
    /// # Errors
    ///
    /// Returns error on a torn or oversized frame or invalid encoding
    pub fn read_frame<T: for<'de> Deserialize<'de>>(&mut self) -> CoreResult<Option<T>> {
        let offset = self.position;
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let len = u32::from_be_bytes(len_bytes);
        if len > MAX_FRAME_LEN {
            return Err(CoreError::Format {
                reason: format!("frame of {} bytes at offset {} exceeds frame limit", len, offset),
            });
        }
        let mut buffer = vec![0u8; len as usize];
        self.reader
            .read_exact(&mut buffer)
            .map_err(|_| CoreError::Truncated { offset })?;
        self.position = offset + 4 + u64::from(len);

        postcard::from_bytes(&buffer).map_err(CoreError::from).map(Some)
    }

    /// Access the inner reader
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }
}

impl<R: Read + Seek> FrameReader<R> {
    /// Seek to a byte offset and read the frame starting there
    ///
    /// # Errors
    ///
    /// Returns error if the offset is past the end or the frame is torn
    pub fn read_frame_at<T: for<'de> Deserialize<'de>>(&mut self, offset: u64) -> CoreResult<T> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.position = offset;
        self.read_frame()?.ok_or(CoreError::Truncated { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct TestRecord {
        a: u64,
        b: String,
        c: Vec<u32>,
    }

    impl CanonicalEncode for TestRecord {}

    #[test]
    fn test_frame_roundtrip() {
        let original = TestRecord {
            a: 42,
            b: "hello".to_string(),
            c: vec![1, 2, 3],
        };

        let mut buffer = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buffer);
            writer.write_frame(&original).unwrap();
        }

        let mut reader = FrameReader::new(buffer.as_slice());
        let decoded: TestRecord = reader.read_frame().unwrap().unwrap();
        assert_eq!(original, decoded);
        assert!(reader.read_frame::<TestRecord>().unwrap().is_none());
    }

    #[test]
    fn test_write_frame_reports_offsets() {
        let mut writer = FrameWriter::new(Vec::new());
        let first = TestRecord {
            a: 1,
            b: "x".to_string(),
            c: vec![],
        };
        let o1 = writer.write_frame(&first).unwrap();
        let o2 = writer.write_frame(&first).unwrap();
        assert_eq!(o1, 0);
        assert_eq!(o2, writer.position() / 2);
    }

    #[test]
    fn test_read_frame_at() {
        let mut buffer = Vec::new();
        let offsets;
        {
            let mut writer = FrameWriter::new(&mut buffer);
            let r1 = TestRecord {
                a: 1,
                b: "first".to_string(),
                c: vec![10],
            };
            let r2 = TestRecord {
                a: 2,
                b: "second".to_string(),
                c: vec![20],
            };
            offsets = (
                writer.write_frame(&r1).unwrap(),
                writer.write_frame(&r2).unwrap(),
            );
        }

        let mut reader = FrameReader::new(Cursor::new(buffer));
        let second: TestRecord = reader.read_frame_at(offsets.1).unwrap();
        assert_eq!(second.a, 2);
        let first: TestRecord = reader.read_frame_at(offsets.0).unwrap();
        assert_eq!(first.a, 1);
    }

    #[test]
    fn test_torn_frame() {
        // Length prefix promises more bytes than follow.
        let bytes = [0u8, 0, 0, 9, 1, 2];
        let mut reader = FrameReader::new(bytes.as_slice());
        let result = reader.read_frame::<TestRecord>();
        assert_eq!(result, Err(CoreError::Truncated { offset: 0 }));
    }

    #[test]
    fn test_torn_frame_reports_stream_offset() {
        let mut buffer = Vec::new();
        let torn_at;
        {
            let mut writer = FrameWriter::new(&mut buffer);
            writer
                .write_frame(&TestRecord {
                    a: 1,
                    b: "ok".to_string(),
                    c: vec![],
                })
                .unwrap();
            torn_at = writer.position();
        }
        buffer.extend_from_slice(&[0, 0, 0, 9, 1, 2]);

        let mut reader = FrameReader::new(buffer.as_slice());
        assert!(reader.read_frame::<TestRecord>().unwrap().is_some());
        let result = reader.read_frame::<TestRecord>();
        assert_eq!(result, Err(CoreError::Truncated { offset: torn_at }));
    }

    #[test]
    fn test_oversized_length_prefix_rejected_without_allocating() {
        // A corrupted prefix claiming 4 GiB must fail fast.
        let bytes = [0xFFu8, 0xFF, 0xFF, 0xFF, 0, 0];
        let mut reader = FrameReader::new(bytes.as_slice());
        let result = reader.read_frame::<TestRecord>();
        assert!(matches!(result, Err(CoreError::Format { .. })));
    }

    proptest! {
        #[test]
        fn prop_frame_stream_roundtrip(values: Vec<u64>) {
            let records: Vec<TestRecord> = values
                .into_iter()
                .map(|v| TestRecord {
                    a: v,
                    b: format!("r{}", v),
                    c: vec![v as u32],
                })
                .collect();

            let mut buffer = Vec::new();
            {
                let mut writer = FrameWriter::new(&mut buffer);
                for r in &records {
                    writer.write_frame(r).unwrap();
                }
            }

            let mut reader = FrameReader::new(buffer.as_slice());
            let mut decoded = Vec::new();
            while let Some(r) = reader.read_frame::<TestRecord>().unwrap() {
                decoded.push(r);
            }
            prop_assert_eq!(records, decoded);
        }
    }
}
