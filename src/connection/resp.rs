//! `StoreConnector` over the Redis RESP2 protocol.

use super::{StoreConnection, StoreConnector};
use crate::core::{Endpoint, Result, SaveError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use redis_protocol::codec::Resp2;
use redis_protocol::resp2::types::BytesFrame;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tokio_util::codec::Framed;
use tracing::debug;

/// Connects to Redis-compatible servers over TCP
#[derive(Debug, Clone, Default)]
pub struct RespConnector {
    command_timeout: Option<Duration>,
}

impl RespConnector {
    pub fn new(command_timeout: Option<Duration>) -> Self {
        Self { command_timeout }
    }
}

#[async_trait]
impl StoreConnector for RespConnector {
    type Connection = RespConnection;

    async fn connect(&self, endpoint: &Endpoint, timeout: Duration) -> Result<RespConnection> {
        let socket = match time::timeout(timeout, TcpStream::connect(endpoint.as_str())).await {
            Ok(Ok(socket)) => socket,
            Ok(Err(err)) => return Err(SaveError::connect(endpoint, err)),
            Err(_) => {
                return Err(SaveError::connect(
                    endpoint,
                    format!("timed out after {}", humantime::format_duration(timeout)),
                ));
            }
        };
        socket.set_nodelay(true).ok();
        debug!(endpoint = %endpoint, "connected");

        Ok(RespConnection {
            endpoint: endpoint.clone(),
            framed: Framed::new(socket, Resp2::default()),
            command_timeout: self.command_timeout,
        })
    }
}

/// A single RESP connection. The socket is closed when this is dropped.
pub struct RespConnection {
    endpoint: Endpoint,
    framed: Framed<TcpStream, Resp2>,
    command_timeout: Option<Duration>,
}

impl RespConnection {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn round_trip(&mut self, args: &[&str]) -> Result<BytesFrame> {
        let endpoint = &self.endpoint;
        let framed = &mut self.framed;
        let request = command_frame(args);

        let exchange = async {
            framed
                .send(request)
                .await
                .map_err(|err| SaveError::protocol(endpoint, format!("send failed: {err}")))?;
            match framed.next().await {
                Some(Ok(frame)) => Ok(frame),
                Some(Err(err)) => Err(SaveError::protocol(endpoint, format!("recv failed: {err}"))),
                None => Err(SaveError::protocol(endpoint, "connection closed")),
            }
        };

        match self.command_timeout {
            Some(limit) => time::timeout(limit, exchange).await.map_err(|_| {
                SaveError::protocol(endpoint, format!("{} timed out", args.join(" ")))
            })?,
            None => exchange.await,
        }
    }
}

#[async_trait]
impl StoreConnection for RespConnection {
    async fn read_last_save(&mut self) -> Result<i64> {
        let resp = self.round_trip(&["LASTSAVE"]).await?;
        parse_integer_reply(&self.endpoint, resp)
    }

    async fn trigger_save(&mut self) -> Result<()> {
        let resp = self.round_trip(&["BGSAVE"]).await?;
        parse_status_reply(&self.endpoint, resp)
    }

    async fn disable_auto_save(&mut self) -> Result<()> {
        let resp = self.round_trip(&["CONFIG", "SET", "save", ""]).await?;
        parse_status_reply(&self.endpoint, resp)
    }
}

/// Build a RESP command as an array of bulk strings.
fn command_frame(args: &[&str]) -> BytesFrame {
    BytesFrame::Array(
        args.iter()
            .map(|arg| BytesFrame::BulkString(Bytes::copy_from_slice(arg.as_bytes())))
            .collect(),
    )
}

fn parse_integer_reply(endpoint: &Endpoint, resp: BytesFrame) -> Result<i64> {
    match resp {
        BytesFrame::Integer(value) => Ok(value),
        BytesFrame::BulkString(bytes) | BytesFrame::SimpleString(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            text.trim().parse::<i64>().map_err(|_| {
                SaveError::protocol(endpoint, format!("LASTSAVE reply {text:?} is not an integer"))
            })
        }
        BytesFrame::Error(err) => Err(SaveError::protocol(endpoint, err.to_string())),
        other => Err(SaveError::protocol(
            endpoint,
            format!("unexpected LASTSAVE reply: {other:?}"),
        )),
    }
}

/// Any status reply is success; BGSAVE answers with a sentence, CONFIG SET with `OK`.
fn parse_status_reply(endpoint: &Endpoint, resp: BytesFrame) -> Result<()> {
    match resp {
        BytesFrame::SimpleString(_) | BytesFrame::BulkString(_) => Ok(()),
        BytesFrame::Error(err) => Err(SaveError::protocol(endpoint, err.to_string())),
        other => Err(SaveError::protocol(endpoint, format!("unexpected reply: {other:?}"))),
    }
}
