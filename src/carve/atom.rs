//! Atom carver - Copies an open container out of the stream.
//!
//! While a file is open every stream byte passes through [`AtomCarver::feed`].
//! The carver keeps the last six bytes it was fed and recognises a chunk
//! header when they read `00 LL 'd' 'a' 't' 'a'`. `LL` is taken as the chunk
//! length and exactly `LL + 3` further bytes are pulled from the reader and
//! copied verbatim. After each chunk a five byte peek decides whether another
//! `data` chunk follows; if not, the container is complete.
//!
//! The single-byte length and the `+ 3` are kept exactly as observed on the
//! recovered media so carved output stays byte-identical to earlier tool runs.

use std::io::{Read, Seek};

use crate::error::Result;
use crate::reader::ChunkedReader;
use crate::sink::Sink;

/// Chunk tag following the null byte and the length byte
pub const DATA_TAG: &[u8; 4] = b"data";

/// Size of the trailing window
pub const WINDOW_LEN: usize = 6;

/// Bytes read per chunk beyond the length byte's value
pub const CHUNK_EXTRA: usize = 3;

/// Lookahead used to decide whether another chunk follows
pub const PEEK_LEN: usize = 5;

/// What one fed byte did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomStep {
    /// Plain container byte, copied through
    Copied,
    /// A chunk was copied and another one follows
    Chunk { length: u8, read: usize },
    /// A chunk was copied and no further chunk follows; the file is done
    Finished { length: u8, read: usize },
}

/// Carving state for one open file
#[derive(Debug, Clone)]
pub struct AtomCarver {
    window: [u8; WINDOW_LEN],
    chunks: u64,
}

impl AtomCarver {
    /// Start with a zeroed window
    pub fn new() -> Self {
        Self {
            window: [0; WINDOW_LEN],
            chunks: 0,
        }
    }

    /// Number of chunks copied so far
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// The last six fed bytes, oldest first
    pub fn window(&self) -> &[u8; WINDOW_LEN] {
        &self.window
    }

    fn at_chunk_header(&self) -> bool {
        self.window[0] == 0x00 && &self.window[2..] == DATA_TAG
    }

    /// Feed the byte the controller just read. Writes it (and any chunk
    /// payload) to `sink`.
    pub fn feed<R, S>(
        &mut self,
        byte: u8,
        reader: &mut ChunkedReader<R>,
        sink: &mut S,
    ) -> Result<AtomStep>
    where
        R: Read + Seek,
        S: Sink + ?Sized,
    {
        self.window.copy_within(1.., 0);
        self.window[WINDOW_LEN - 1] = byte;

        if !self.at_chunk_header() {
            sink.write(&[byte])?;
            return Ok(AtomStep::Copied);
        }

        let length = self.window[1];
        let payload = reader.read(length as usize + CHUNK_EXTRA)?;
        let read = payload.len();

        sink.write(&[byte])?;
        sink.write(payload)?;
        self.chunks += 1;

        tracing::debug!(
            offset = reader.position(),
            length,
            read,
            "Found data chunk"
        );

        let next = reader.peek(PEEK_LEN)?;
        if next.len() == PEEK_LEN && &next[1..] == DATA_TAG {
            Ok(AtomStep::Chunk { length, read })
        } else {
            Ok(AtomStep::Finished { length, read })
        }
    }
}

impl Default for AtomCarver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(stream: &[u8]) -> (Vec<u8>, Vec<AtomStep>, u64) {
        let mut reader = ChunkedReader::new(Cursor::new(stream.to_vec()), 512);
        let mut out = Vec::new();
        let mut steps = Vec::new();
        let mut carver = AtomCarver::new();

        while let Some(b) = reader.read_one().unwrap() {
            let step = carver.feed(b, &mut reader, &mut out).unwrap();
            steps.push(step);
            if matches!(step, AtomStep::Finished { .. }) {
                break;
            }
        }
        (out, steps, reader.position())
    }

    #[test]
    fn test_plain_bytes_are_copied() {
        let (out, steps, _) = run(b"abcdefgh");
        assert_eq!(out, b"abcdefgh");
        assert!(steps.iter().all(|s| *s == AtomStep::Copied));
    }

    #[test]
    fn test_single_chunk_then_end() {
        let mut stream = b"ftyp".to_vec();
        stream.extend_from_slice(&[0x00, 0x05]);
        stream.extend_from_slice(b"data");
        stream.extend_from_slice(b"PAYLOADX"); // 5 + 3 bytes
        stream.extend_from_slice(b"zzzzzzz");

        let (out, steps, pos) = run(&stream);
        let expected_len = 4 + 6 + 8;
        assert_eq!(out, &stream[..expected_len]);
        assert_eq!(pos, expected_len as u64);
        assert_eq!(
            *steps.last().unwrap(),
            AtomStep::Finished { length: 5, read: 8 }
        );
    }

    #[test]
    fn test_continued_file_finds_later_header() {
        let mut stream = vec![0x00, 0x01];
        stream.extend_from_slice(b"data");
        stream.extend_from_slice(b"abc\x00"); // 1 + 3 bytes
        // Peek sees "\x02data": carving continues, but the window never held
        // the null before 0x02, so this header is copied as plain bytes.
        stream.extend_from_slice(&[0x02]);
        stream.extend_from_slice(b"data");
        stream.extend_from_slice(b"efg");
        stream.extend_from_slice(&[0x00, 0x03]);
        stream.extend_from_slice(b"data");
        stream.extend_from_slice(b"hijklm"); // 3 + 3 bytes
        stream.extend_from_slice(b"end..");

        let (out, steps, _) = run(&stream);
        let chunks: Vec<_> = steps
            .iter()
            .filter(|s| !matches!(s, AtomStep::Copied))
            .copied()
            .collect();
        assert_eq!(
            chunks,
            vec![
                AtomStep::Chunk { length: 1, read: 4 },
                AtomStep::Finished { length: 3, read: 6 },
            ]
        );
        assert_eq!(out, &stream[..stream.len() - 5]);
    }

    #[test]
    fn test_peek_wants_data_at_offset_one() {
        // After the first chunk the next bytes are "Qdata..." -> continue.
        let mut stream = vec![0x00, 0x00];
        stream.extend_from_slice(b"data");
        stream.extend_from_slice(b"xyz"); // 0 + 3 bytes
        stream.extend_from_slice(b"Qdata");

        let mut reader = ChunkedReader::new(Cursor::new(stream.clone()), 512);
        let mut carver = AtomCarver::new();
        let mut out = Vec::new();
        let mut last = AtomStep::Copied;
        for _ in 0..6 {
            let b = reader.read_one().unwrap().unwrap();
            last = carver.feed(b, &mut reader, &mut out).unwrap();
        }
        assert_eq!(last, AtomStep::Chunk { length: 0, read: 3 });
        assert_eq!(carver.chunks(), 1);
    }

    #[test]
    fn test_truncated_chunk_at_end_of_stream() {
        let mut stream = vec![0x00, 0xFF];
        stream.extend_from_slice(b"data");
        stream.extend_from_slice(b"short");

        let (out, steps, _) = run(&stream);
        assert_eq!(out, stream);
        assert_eq!(
            *steps.last().unwrap(),
            AtomStep::Finished {
                length: 0xFF,
                read: 5
            }
        );
    }

    #[test]
    fn test_header_needs_leading_null() {
        let mut stream = vec![0x01, 0x05];
        stream.extend_from_slice(b"data");
        stream.extend_from_slice(b"more");
        let (out, steps, _) = run(&stream);
        assert_eq!(out, stream);
        assert!(steps.iter().all(|s| *s == AtomStep::Copied));
    }
}
