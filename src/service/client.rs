use futures::{SinkExt, StreamExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;
use tracing::{debug, instrument};

use crate::core::codec::ResponseCodec;
use crate::core::package::Package;
use crate::error::{IndexerError, Result};
use crate::protocol::message::{Command, Request, Response};

/// Line-protocol client for a package index server.
///
/// Requests are sent one at a time; every call waits for its status line.
pub struct Client {
    framed: Framed<TcpStream, ResponseCodec>,
}

impl Client {
    /// Connect to a server
    #[instrument(skip(addr))]
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        debug!(peer = ?stream.peer_addr().ok(), "Connected");
        Ok(Self {
            framed: Framed::new(stream, ResponseCodec::new()),
        })
    }

    /// Send a request and wait for its response
    pub async fn send(&mut self, request: &Request) -> Result<Response> {
        self.framed.send(request).await?;
        self.receive().await
    }

    /// Send `line` verbatim (it should end with a newline) and wait for the response
    pub async fn send_raw(&mut self, line: &str) -> Result<Response> {
        self.framed.send(line).await?;
        self.receive().await
    }

    pub async fn index<I, S>(&mut self, name: &str, deps: I) -> Result<Response>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request = Request::new(Command::Index, Package::with_deps(name, deps));
        self.send(&request).await
    }

    pub async fn remove(&mut self, name: &str) -> Result<Response> {
        self.send(&Request::new(Command::Remove, Package::new(name)))
            .await
    }

    pub async fn query(&mut self, name: &str) -> Result<Response> {
        self.send(&Request::new(Command::Query, Package::new(name)))
            .await
    }

    async fn receive(&mut self) -> Result<Response> {
        self.framed
            .next()
            .await
            .ok_or(IndexerError::ConnectionClosed)?
    }
}
