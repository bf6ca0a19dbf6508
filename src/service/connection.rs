//! Per-connection request/response loop.
//!
//! ```text
//! AWAITING_LINE -> DECODING -> DISPATCHING -> ENCODING -> WRITING -> AWAITING_LINE
//!       |
//!       +-- end of stream / transport failure --> CLOSED
//! ```

use crate::core::codec::{Frame, LineCodec};
use crate::error::IndexerError;
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::message::Response;
use crate::service::reporter::ErrorReporter;
use crate::utils::metrics::{Metrics, Timer};

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;
use tracing::{debug, info, instrument};

/// Everything a connection task shares with the rest of the server
#[derive(Clone)]
pub struct ConnectionContext {
    pub dispatcher: Arc<Dispatcher>,
    pub reporter: ErrorReporter,
    pub metrics: Arc<Metrics>,
    pub max_line_length: usize,
}

/// Serve one client until it closes the stream or the transport fails.
///
/// Requests are answered strictly in arrival order. Malformed or unknown
/// requests are answered with `ERROR` and the loop carries on; read and write
/// failures are reported and end this connection only. The stream is dropped,
/// and so closed, on every exit path.
#[instrument(skip_all, fields(peer = %peer))]
pub async fn serve_connection<S>(stream: S, peer: String, ctx: ConnectionContext)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, LineCodec::with_max_length(ctx.max_line_length));
    ctx.metrics.connection_established();
    debug!("Connection opened");

    while let Some(frame) = framed.next().await {
        let response = match frame {
            Ok(Frame::Line(line)) => {
                info!(bytes = line.len(), message = %line.escape_debug(), "[RECV]");
                ctx.metrics.message_received(line.len() as u64);

                let _timer = Timer::start("request");
                let (response, err) = ctx.dispatcher.respond(&line);
                if let Some(e) = err {
                    ctx.metrics.protocol_error();
                    ctx.reporter.report(e).await;
                }
                response
            }
            Ok(Frame::Oversized(limit)) => {
                ctx.metrics.protocol_error();
                ctx.reporter
                    .report(IndexerError::LineTooLong { limit })
                    .await;
                Response::Error
            }
            Ok(Frame::Malformed) => {
                ctx.metrics.protocol_error();
                ctx.reporter.report(IndexerError::MalformedMessage).await;
                Response::Error
            }
            // Framed yields nothing further once the transport has failed
            Err(e) => {
                ctx.metrics.transport_error();
                ctx.reporter.report(e).await;
                break;
            }
        };

        if let Err(e) = framed.send(response).await {
            ctx.metrics.transport_error();
            ctx.reporter.report(e).await;
            break;
        }

        let wire = response.as_wire();
        info!(bytes = wire.len(), message = %wire.escape_debug(), "[SEND]");
        ctx.metrics.message_sent(wire.len() as u64);
    }

    ctx.metrics.connection_closed();
    debug!("Connection closed");
}
