use crate::error::transport::TransportError;
use crate::transport::{Connector, EndpointResolver, is_refusal};

use log::{debug, info, trace, warn};
use tokio::net::UnixStream;

/// Connects to `{base}/discord-ipc-{0..9}` domain sockets.
#[derive(Debug, Clone)]
pub struct UnixSocketConnector {
    resolver: EndpointResolver,
}

impl UnixSocketConnector {
    pub fn new(resolver: EndpointResolver) -> Self {
        Self { resolver }
    }
}

impl Connector for UnixSocketConnector {
    type Stream = UnixStream;

    async fn connect(&self) -> Result<UnixStream, TransportError> {
        let mut failure = None;

        for path in self.resolver.candidates() {
            trace!("Attempting to connect to socket: {}", path.display());

            match UnixStream::connect(&path).await {
                Ok(stream) => {
                    info!("Connected to IPC socket {}", path.display());
                    return Ok(stream);
                }
                Err(e) if is_refusal(&e) => {
                    debug!("Failed to connect to {}: {e}", path.display());
                }
                Err(e) => {
                    warn!("Socket {} is unusable: {e}", path.display());
                    failure.get_or_insert_with(|| {
                        TransportError::connect(path.display().to_string(), &e)
                    });
                }
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }

        Err(TransportError::no_endpoint(format!(
            "no IPC socket accepted a connection in {} ({})",
            self.resolver.base_dir().display(),
            self.resolver.source()
        )))
    }
}
