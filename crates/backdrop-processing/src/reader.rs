//! Blocking, size-capped reader over a source

use std::cell::RefCell;
use std::io::{self, BufRead, Read};
use std::rc::Rc;

use backdrop_storage::SourceError;

use crate::error::TransformError;

/// First failure seen while reading a source.
///
/// Decoders only get to see an `io::Error` (libjpeg not even that), so the
/// typed cause is kept here for the caller to report.
#[derive(Clone, Default)]
pub struct SourceFailure(Rc<RefCell<Option<TransformError>>>);

impl SourceFailure {
    fn record(&self, error: TransformError) {
        let mut slot = self.0.borrow_mut();
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    pub fn take(&self) -> Option<TransformError> {
        self.0.borrow_mut().take()
    }
}

/// Wraps the bridged source stream for the decoder.
///
/// Fails instead of handing out data past `max_bytes`. Errors coming out of
/// the source are recorded in the shared [`SourceFailure`].
pub struct SourceReader<R> {
    inner: R,
    consumed: usize,
    max_bytes: usize,
    failure: SourceFailure,
}

impl<R: BufRead> SourceReader<R> {
    pub fn new(inner: R, max_bytes: usize, failure: SourceFailure) -> Self {
        SourceReader {
            inner,
            consumed: 0,
            max_bytes,
            failure,
        }
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl<R: BufRead> BufRead for SourceReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let available = match self.inner.fill_buf() {
            Ok(available) => available,
            Err(e) => {
                // Never UnexpectedEof: libjpeg would take that as a short file
                self.failure.record(source_error(e));
                return Err(io::Error::other("source read failed"));
            }
        };

        if self.consumed + available.len() > self.max_bytes {
            self.failure.record(TransformError::SourceTooLarge {
                limit: self.max_bytes,
            });
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "source exceeds size limit",
            ));
        }

        Ok(available)
    }

    fn consume(&mut self, amt: usize) {
        self.consumed += amt;
        self.inner.consume(amt);
    }
}

impl<R: BufRead> Read for SourceReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

/// Recover the [`SourceError`] carried inside a bridged read error.
fn source_error(err: io::Error) -> TransformError {
    let kind = err.kind();
    match err.into_inner() {
        Some(inner) => match inner.downcast::<SourceError>() {
            Ok(source) => TransformError::Source(*source),
            Err(other) => TransformError::Internal(format!("Failed to read source: {}", other)),
        },
        None => TransformError::Internal(format!("Failed to read source: {}", kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields `data`, then fails with `error`
    struct FailingRead {
        data: Vec<u8>,
        error: Option<SourceError>,
    }

    impl Read for FailingRead {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            if !self.data.is_empty() {
                let n = self.data.len().min(out.len());
                out[..n].copy_from_slice(&self.data[..n]);
                self.data.drain(..n);
                return Ok(n);
            }
            match self.error.take() {
                Some(e) => Err(io::Error::other(e)),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn test_reads_through_under_the_cap() {
        let failure = SourceFailure::default();
        let mut reader = SourceReader::new(&b"abcdef"[..], 6, failure.clone());

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();

        assert_eq!(out, b"abcdef");
        assert_eq!(reader.consumed(), 6);
        assert!(failure.take().is_none());
    }

    #[test]
    fn test_cap_is_recorded_as_source_too_large() {
        let failure = SourceFailure::default();
        let data = vec![0u8; 64];
        let inner = io::BufReader::with_capacity(8, &data[..]);
        let mut reader = SourceReader::new(inner, 20, failure.clone());

        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
        assert!(matches!(
            failure.take(),
            Some(TransformError::SourceTooLarge { limit: 20 })
        ));
    }

    #[test]
    fn test_source_error_is_recovered() {
        let failure = SourceFailure::default();
        let inner = io::BufReader::new(FailingRead {
            data: b"partial".to_vec(),
            error: Some(SourceError::UpstreamUnavailable("reset".to_string())),
        });
        let mut reader = SourceReader::new(inner, 1024, failure.clone());

        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
        assert_eq!(out, b"partial");
        assert!(matches!(
            failure.take(),
            Some(TransformError::Source(SourceError::UpstreamUnavailable(_)))
        ));
    }

    #[test]
    fn test_first_failure_wins() {
        let failure = SourceFailure::default();
        failure.record(TransformError::SourceTooLarge { limit: 1 });
        failure.record(TransformError::Internal("later".to_string()));

        assert!(matches!(
            failure.take(),
            Some(TransformError::SourceTooLarge { limit: 1 })
        ));
        assert!(failure.take().is_none());
    }
}
