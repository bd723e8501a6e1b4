//! Incremental decoding of concatenated JSON records
//!
//! `go list -json` prints one JSON object per result, back to back, with no
//! enclosing array. `RecordDecoder` reads that output in chunks and yields
//! one record at a time, keeping only the bytes of the record being parsed.
//!
//! ```text
//! Streaming ──(complete value)──▶ yield record ──▶ Streaming
//!     │
//!     ├──(reader exhausted, only whitespace left)──▶ Finished
//!     └──(syntax error / truncated record)─────────▶ Failed
//! ```

use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::DecodeError;

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    Streaming,
    Finished,
    Failed,
}

/// Yields `T` records from an async byte stream
#[derive(Debug)]
pub struct RecordDecoder<R, T> {
    reader: R,
    buf: Vec<u8>,
    /// Stream offset of the record currently being parsed
    consumed: usize,
    reader_done: bool,
    state: DecoderState,
    _record: PhantomData<fn() -> T>,
}

enum Attempt<T> {
    Record(T, usize),
    NeedMore,
    Empty,
    Invalid(serde_json::Error),
}

impl<R, T> RecordDecoder<R, T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            consumed: 0,
            reader_done: false,
            state: DecoderState::Streaming,
            _record: PhantomData,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Next record, `Ok(None)` at a clean end of stream.
    ///
    /// After an error the decoder stays failed and keeps returning `Ok(None)`.
    pub async fn next_record(&mut self) -> Result<Option<T>, DecodeError> {
        if self.state != DecoderState::Streaming {
            return Ok(None);
        }

        loop {
            match self.attempt() {
                Attempt::Record(record, end) => {
                    self.buf.drain(..end);
                    self.consumed += end;
                    return Ok(Some(record));
                }
                Attempt::Invalid(source) => {
                    self.state = DecoderState::Failed;
                    return Err(DecodeError::Syntax {
                        offset: self.consumed,
                        source,
                    });
                }
                Attempt::Empty if self.reader_done => {
                    self.state = DecoderState::Finished;
                    return Ok(None);
                }
                Attempt::NeedMore if self.reader_done => {
                    self.state = DecoderState::Failed;
                    return Err(DecodeError::Truncated {
                        pending: self.buf.len(),
                    });
                }
                Attempt::Empty | Attempt::NeedMore => {}
            }

            if let Err(err) = self.fill().await {
                self.state = DecoderState::Failed;
                return Err(err);
            }
        }
    }

    /// Decode every remaining record.
    pub async fn collect_all(mut self) -> Result<Vec<T>, DecodeError> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Give the reader back, e.g. to drain what is left of a failed stream.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn attempt(&self) -> Attempt<T> {
        let mut stream = serde_json::Deserializer::from_slice(&self.buf).into_iter::<T>();
        match stream.next() {
            Some(Ok(record)) => Attempt::Record(record, stream.byte_offset()),
            Some(Err(err)) if err.is_eof() => Attempt::NeedMore,
            Some(Err(err)) => Attempt::Invalid(err),
            None => Attempt::Empty,
        }
    }

    async fn fill(&mut self) -> Result<(), DecodeError> {
        let start = self.buf.len();
        self.buf.resize(start + CHUNK_SIZE, 0);
        let read = self.reader.read(&mut self.buf[start..]).await;
        match read {
            Ok(n) => {
                self.buf.truncate(start + n);
                if n == 0 {
                    self.reader_done = true;
                }
                Ok(())
            }
            Err(err) => {
                self.buf.truncate(start);
                Err(DecodeError::Io(err))
            }
        }
    }
}
