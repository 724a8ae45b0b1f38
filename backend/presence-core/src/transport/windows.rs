use crate::error::transport::TransportError;
use crate::transport::{Connector, EndpointResolver, is_refusal};

use log::{debug, info, trace, warn};
use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeClient};

/// Connects to `\\?\pipe\discord-ipc-{0..9}` named pipes.
#[derive(Debug, Clone)]
pub struct NamedPipeConnector {
    resolver: EndpointResolver,
}

impl NamedPipeConnector {
    pub fn new(resolver: EndpointResolver) -> Self {
        Self { resolver }
    }
}

impl Connector for NamedPipeConnector {
    type Stream = NamedPipeClient;

    async fn connect(&self) -> Result<NamedPipeClient, TransportError> {
        let mut failure = None;

        for name in self.resolver.pipe_names() {
            trace!("Attempting to connect to pipe: {name}");

            match ClientOptions::new().open(&name) {
                Ok(client) => {
                    info!("Connected to IPC pipe {name}");
                    return Ok(client);
                }
                Err(e) if is_refusal(&e) => {
                    debug!("Failed to connect to {name}: {e}");
                }
                Err(e) => {
                    warn!("Pipe {name} is unusable: {e}");
                    failure.get_or_insert_with(|| TransportError::connect(name.clone(), &e));
                }
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }

        Err(TransportError::no_endpoint(
            "no IPC pipe accepted a connection. Is the chat client running?",
        ))
    }
}
