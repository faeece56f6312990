//! Owns the TCP connection: connect/close, and the split framed read/write halves.

use std::time::Duration;

use actix::io::FramedWrite;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tracing::instrument;

use crate::codec::Codec;
use crate::error::Error;
use crate::packet::Packet;

pub type PacketReader = FramedRead<ReadHalf<TcpStream>, Codec>;
pub type PacketWriter = FramedWrite<Packet, WriteHalf<TcpStream>, Codec>;

/// Opens a TCP connection to `host:port`, failing with [`Error::ConnectFailed`] on refusal or
/// [`Error::ConnectTimedOut`] if the handshake doesn't complete within `connect_timeout`.
#[instrument(skip(connect_timeout))]
pub async fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<TcpStream, Error> {
    let addr = format!("{host}:{port}");

    match timeout(connect_timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(Error::ConnectFailed {
            host: host.to_string(),
            port,
            source,
        }),
        Err(_) => Err(Error::ConnectTimedOut {
            host: host.to_string(),
            port,
            timeout: connect_timeout,
        }),
    }
}

/// Splits a connected stream into its framed read/write halves.
pub fn split(stream: TcpStream) -> (ReadHalf<TcpStream>, WriteHalf<TcpStream>) {
    tokio::io::split(stream)
}

#[cfg(test)]
mod test {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connect_succeeds_against_a_live_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let _ = listener.accept().await.unwrap();
        });

        let stream = connect(&addr.ip().to_string(), addr.port(), Duration::from_secs(1))
            .await
            .unwrap();
        drop(stream);
        accept.await.unwrap();
    }

    #[tokio::test]
    async fn connect_fails_when_nothing_is_listening() {
        // port 0 never accepts; binding then immediately dropping frees the port but nothing
        // listens there afterwards, so the connect attempt is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = connect(&addr.ip().to_string(), addr.port(), Duration::from_secs(1)).await;
        assert!(result.is_err());
    }
}
