//! TCP listener speaking the framed protocol.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::protocol::{split_frame, SchemaRegistry, StaticRegistry};
use crate::server::handler::{handle_frame, RequestHandler};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

/// Run the server loop on an existing listener (e.g. from bind("127.0.0.1:0"))
/// with the built-in layouts.
pub async fn run_server_on_listener<H: RequestHandler>(
    handler: Arc<H>,
    listener: TcpListener,
) -> Result<()> {
    run_server_on_listener_with_registry(handler, Arc::new(StaticRegistry), listener).await
}

/// Run the server loop, decoding and encoding with `registry`. ApiVersions
/// replies advertise the ranges `registry` serves.
pub async fn run_server_on_listener_with_registry<H, S>(
    handler: Arc<H>,
    registry: Arc<S>,
    listener: TcpListener,
) -> Result<()>
where
    H: RequestHandler,
    S: SchemaRegistry + 'static,
{
    let addr = listener.local_addr()?;
    info!("txnwire listening on {}", addr);
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(x) => x,
            Err(e) => {
                error!("accept error: {}", e);
                continue;
            }
        };
        let handler = Arc::clone(&handler);
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(handler, registry, stream).await {
                error!("connection {} error: {}", peer, e);
            }
        });
    }
}

/// Bind `config.listen_addr` and serve.
pub async fn run_server<H: RequestHandler>(handler: Arc<H>, config: &ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(&config.listen_addr).await?;
    run_server_on_listener(handler, listener).await
}

async fn handle_connection<H, S>(handler: Arc<H>, registry: Arc<S>, mut stream: TcpStream) -> Result<()>
where
    H: RequestHandler,
    S: SchemaRegistry,
{
    let mut read_buf = BytesMut::with_capacity(4096);
    loop {
        read_buf.reserve(4096);
        let n = stream.read_buf(&mut read_buf).await?;
        if n == 0 {
            break;
        }
        // Oversized declared lengths fail here and close the connection.
        while let Some(frame) = split_frame(&mut read_buf)? {
            let response = handle_frame(handler.as_ref(), registry.as_ref(), &frame)?;
            stream.write_all(&response).await?;
            stream.flush().await?;
        }
    }
    Ok(())
}
