use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, error, info, instrument, warn};

use crate::codec::FrameCodec;
use crate::commands::executable::Executable;
use crate::commands::{Command, CommandParserError};
use crate::config::Config;
use crate::connection::Connection;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind((config.bind, config.port)).await?;
    let store = Store::new();

    serve(listener, store, FrameCodec::new(config.max_frame_size)).await
}

/// Accepts connections forever, serving each one from its own task. All connections share
/// `store`.
pub async fn serve(listener: TcpListener, store: Store, codec: FrameCodec) -> Result<(), Error> {
    info!("Server listening on {}", listener.local_addr()?);

    loop {
        let (socket, client_address) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                continue;
            }
        };
        let store = store.clone();
        let codec = codec.clone();
        info!("Accepted connection from {:?}", client_address);

        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, client_address, store, codec).await {
                error!("Connection terminated: {}", e);
            }
        });
    }
}

/// Serves a single client until it closes the stream. Replies are written in the order the
/// commands were received. A malformed frame or an I/O failure ends the connection with an error.
#[instrument(
    name = "connection",
    skip_all,
    fields(connection_id, client_address = %client_address)
)]
pub async fn handle_connection<T>(
    stream: T,
    client_address: SocketAddr,
    store: Store,
    codec: FrameCodec,
) -> Result<(), Error>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut conn = Connection::with_codec(stream, codec);

    tracing::Span::current().record("connection_id", conn.id.to_string());

    while let Some(frame) = conn.read_frame().await? {
        debug!("Received frame from client: {}", frame);

        let res = match Command::try_from(frame) {
            Ok(cmd) => cmd.exec(store.clone())?,
            Err(CommandParserError::UnknownCommand { command }) => {
                warn!("Unknown command: {}", command);
                continue;
            }
            // Empty arrays carry no command.
            Err(CommandParserError::EndOfStream) => continue,
            Err(e) if e.is_protocol_error() => return Err(e.into()),
            Err(e) => Frame::Error(e.to_string()),
        };

        debug!("Sending response to client: {}", res);
        conn.write_frame(res).await?;
    }

    info!("Connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::task::JoinHandle;

    fn spawn_connection(store: Store) -> (DuplexStream, JoinHandle<Result<(), Error>>) {
        let (client, server) = duplex(1024);
        let address = "127.0.0.1:50000".parse().unwrap();
        let handle = tokio::spawn(handle_connection(
            server,
            address,
            store,
            FrameCodec::default(),
        ));
        (client, handle)
    }

    async fn read_exact(client: &mut DuplexStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        client.read_exact(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn replies_in_order() {
        let (mut client, handle) = spawn_connection(Store::new());

        client
            .write_all(b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n$5\r\nhello\r\n")
            .await
            .unwrap();

        let expected = b"+PONG\r\n$5\r\nhello\r\n";
        assert_eq!(read_exact(&mut client, expected.len()).await, expected);

        drop(client);
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn frame_split_across_writes() {
        let (mut client, _handle) = spawn_connection(Store::new());

        client.write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nf").await.unwrap();
        client.flush().await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"oo\r\n$3\r\nbar\r\n").await.unwrap();

        assert_eq!(read_exact(&mut client, 5).await, b"+OK\r\n");
    }

    #[tokio::test]
    async fn unknown_command_gets_no_reply() {
        let (mut client, _handle) = spawn_connection(Store::new());

        client
            .write_all(b"*1\r\n$7\r\nCOMMAND\r\n*0\r\n*1\r\n$4\r\nPING\r\n")
            .await
            .unwrap();

        assert_eq!(read_exact(&mut client, 7).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn wrong_arguments_get_an_error_reply() {
        let (mut client, _handle) = spawn_connection(Store::new());

        client
            .write_all(b"*1\r\n$3\r\nGET\r\n*1\r\n$4\r\nPING\r\n")
            .await
            .unwrap();

        let expected = b"-ERR wrong number of arguments for 'get' command\r\n+PONG\r\n";
        assert_eq!(read_exact(&mut client, expected.len()).await, expected);
    }

    #[tokio::test]
    async fn malformed_frame_closes_connection() {
        let (mut client, handle) = spawn_connection(Store::new());

        client.write_all(b"*1\r\n$2\r\nPING\r\n").await.unwrap();

        assert!(handle.await.unwrap().is_err());

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn non_array_frame_closes_connection() {
        let (mut client, handle) = spawn_connection(Store::new());

        client.write_all(b"+PING\r\n").await.unwrap();

        assert!(handle.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn premature_end_of_stream() {
        let (mut client, handle) = spawn_connection(Store::new());

        client.write_all(b"*2\r\n$3\r\nGET\r\n").await.unwrap();
        client.shutdown().await.unwrap();

        assert!(handle.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn connections_share_the_store() {
        let store = Store::new();
        let (mut first, _first_handle) = spawn_connection(store.clone());
        let (mut second, _second_handle) = spawn_connection(store.clone());

        first
            .write_all(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
            .await
            .unwrap();
        assert_eq!(read_exact(&mut first, 5).await, b"+OK\r\n");

        second
            .write_all(b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n")
            .await
            .unwrap();
        assert_eq!(read_exact(&mut second, 9).await, b"$3\r\nbar\r\n");
    }
}
