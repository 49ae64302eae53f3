//! Node sessions backed by [`node_client::NodeClient`].
//!
//! Each session owns at most one client, created on dial and torn down on
//! close. Mempool queries are tagged with the latest era; the node only
//! uses the tag to pick the id encoding.

use async_trait::async_trait;
use futures::StreamExt;
use ledger_era::{Era, TxId};
use node_client::{ClientError, NodeAddress, NodeClient, SubmitResult};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::domain::types::NodeTarget;
use crate::ports::{ErrorStream, NodeSession, SessionError, SessionFactory, SubmitResponse};

/// Makes one [`NodeClient`] session per request.
#[derive(Debug, Clone, Copy)]
pub struct NodeClientSessions {
    network_magic: u32,
}

impl NodeClientSessions {
    pub fn new(network_magic: u32) -> Self {
        Self { network_magic }
    }
}

impl SessionFactory for NodeClientSessions {
    fn create(&self) -> Box<dyn NodeSession> {
        Box::new(NodeClientSession {
            network_magic: self.network_magic,
            client: None,
        })
    }
}

struct NodeClientSession {
    network_magic: u32,
    client: Option<NodeClient>,
}

impl NodeClientSession {
    fn client(&mut self) -> Result<&mut NodeClient, SessionError> {
        self.client
            .as_mut()
            .ok_or_else(|| SessionError::Transport("session is not connected".into()))
    }
}

#[async_trait]
impl NodeSession for NodeClientSession {
    async fn dial(&mut self, target: &NodeTarget) -> Result<(), SessionError> {
        let address = node_address(target);
        let client = NodeClient::connect(&address, u64::from(self.network_magic))
            .await
            .map_err(|e| {
                SessionError::Dial(format!("{} socket {}: {}", address.transport(), target, e))
            })?;
        debug!(node = %target, version = client.version(), "Node session open");
        self.client = Some(client);
        Ok(())
    }

    fn take_errors(&mut self) -> Option<ErrorStream> {
        let errors = self.client.as_mut()?.take_errors()?;
        Some(ReceiverStream::new(errors).map(SessionError::from).boxed())
    }

    async fn submit_tx(&mut self, era: Era, tx: &[u8]) -> Result<SubmitResponse, SessionError> {
        match self.client()?.submit_tx(era.index(), tx).await? {
            SubmitResult::Accepted => Ok(SubmitResponse::Accepted),
            SubmitResult::Rejected { reason } => Ok(SubmitResponse::Rejected {
                reason_cbor: reason,
            }),
        }
    }

    async fn has_tx(&mut self, tx_id: &TxId) -> Result<bool, SessionError> {
        let found = self
            .client()?
            .has_tx(Era::LATEST.index(), *tx_id.as_bytes())
            .await?;
        Ok(found)
    }

    fn close(&mut self) {
        if let Some(client) = self.client.as_mut() {
            client.close();
        }
    }
}

fn node_address(target: &NodeTarget) -> NodeAddress {
    match target {
        NodeTarget::Unix(path) => NodeAddress::Unix(path.clone()),
        NodeTarget::Tcp { host, port } => NodeAddress::Tcp {
            host: host.clone(),
            port: *port,
        },
    }
}

impl From<ClientError> for SessionError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::ConnectionClosed => SessionError::Closed,
            other => SessionError::Transport(other.to_string()),
        }
    }
}
