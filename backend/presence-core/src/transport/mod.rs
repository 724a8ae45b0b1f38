//! Byte-stream transport to the chat client's local IPC endpoint.
//!
//! A [`Connector`] finds and opens the endpoint; a [`Transport`] wraps the
//! opened stream with fully-resolved reads and writes and an idempotent
//! close. Nothing here knows about frames or JSON.
//!
//! Two back-ends exist, picked at compile time through [`PlatformConnector`]:
//! unix domain sockets everywhere but Windows, named pipes on Windows.

pub mod endpoint;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

pub use endpoint::{EndpointResolver, EndpointSource};
#[cfg(unix)]
pub use unix::UnixSocketConnector;
#[cfg(windows)]
pub use windows::NamedPipeConnector;

use crate::error::transport::TransportError;

use std::future::Future;
use std::io::{Error as IoError, ErrorKind};

use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[cfg(unix)]
pub type PlatformConnector = UnixSocketConnector;
#[cfg(windows)]
pub type PlatformConnector = NamedPipeConnector;

/// Opens a fresh stream to the daemon.
///
/// The connection manager is written against this trait only; tests plug in
/// in-memory streams.
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Try every candidate endpoint in order and return the first that accepts.
    fn connect(&self) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;
}

/// An open connection. Reads and writes either complete fully or fail.
#[derive(Debug)]
pub struct Transport<S> {
    stream: Option<S>,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Fill `buf` completely.
    ///
    /// # Errors
    ///
    /// [`TransportError::Closed`] if the peer hung up before `buf` was full,
    /// [`TransportError::Read`] on any other I/O failure.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::closed("read on a closed transport"))?;

        match stream.read_exact(buf).await {
            Ok(_) => {
                trace!("Read {} bytes", buf.len());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(TransportError::closed(
                format!("peer closed the stream while {} bytes were expected", buf.len()),
            )),
            Err(e) => Err(TransportError::read(&e)),
        }
    }

    /// Write all of `buf` and flush.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| TransportError::closed("write on a closed transport"))?;

        stream
            .write_all(buf)
            .await
            .map_err(|e| TransportError::write(&e))?;
        stream.flush().await.map_err(|e| TransportError::write(&e))?;

        trace!("Wrote {} bytes", buf.len());
        Ok(())
    }

    /// Shut the stream down. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Ignoring error while shutting down transport: {e}");
            }
            debug!("Transport closed");
        }
    }
}

/// Nobody listening at the endpoint, as opposed to an endpoint that exists
/// but cannot be used.
pub(crate) fn is_refusal(error: &IoError) -> bool {
    matches!(
        error.kind(),
        ErrorKind::NotFound | ErrorKind::ConnectionRefused
    )
}
