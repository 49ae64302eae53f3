//! Transport connections to the node.

use std::fmt;
use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::ClientError;

pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where the node listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAddress {
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

impl NodeAddress {
    pub fn transport(&self) -> &'static str {
        match self {
            NodeAddress::Unix(_) => "unix",
            NodeAddress::Tcp { .. } => "tcp",
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeAddress::Unix(path) => write!(f, "unix:{}", path.display()),
            NodeAddress::Tcp { host, port } => write!(f, "tcp:{}:{}", host, port),
        }
    }
}

/// Opens a bearer and splits it into owned halves.
pub async fn connect(address: &NodeAddress) -> Result<(BoxedReader, BoxedWriter), ClientError> {
    debug!(address = %address, "Connecting to node");
    match address {
        #[cfg(unix)]
        NodeAddress::Unix(path) => {
            let stream = tokio::net::UnixStream::connect(path).await?;
            let (reader, writer) = stream.into_split();
            Ok((Box::new(reader), Box::new(writer)))
        }
        #[cfg(not(unix))]
        NodeAddress::Unix(path) => Err(ClientError::Io(format!(
            "unix sockets are not supported on this platform: {}",
            path.display()
        ))),
        NodeAddress::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port)).await?;
            stream.set_nodelay(true)?;
            let (reader, writer) = stream.into_split();
            Ok((Box::new(reader), Box::new(writer)))
        }
    }
}
