use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::FrameCodec;
use crate::frame::{Error, Frame};

/// A client connection over any byte stream. Frames are decoded from, and replies encoded to, the
/// underlying stream by [`FrameCodec`].
pub struct Connection<T = TcpStream> {
    pub id: Uuid,
    // Data is read from the stream into the read buffer of the framed transport. When a frame is
    // parsed, the corresponding data is removed from the buffer.
    frames: Framed<T, FrameCodec>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: T) -> Connection<T> {
        Self::with_codec(stream, FrameCodec::default())
    }

    pub fn with_codec(stream: T, codec: FrameCodec) -> Connection<T> {
        Connection {
            id: Uuid::new_v4(),
            // Allocate the buffer with 4kb of capacity.
            frames: Framed::with_capacity(stream, codec, 4096),
        }
    }

    /// Reads the next frame. `Ok(None)` means the peer closed the stream cleanly, in between
    /// frames. Closing it in the middle of a frame is an error.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        self.frames.next().await.transpose()
    }

    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), Error> {
        self.frames.send(frame).await
    }
}
