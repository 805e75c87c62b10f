use futures_util::{SinkExt, StreamExt};
use signal_protocol::ClientFrame;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::MaybeTlsStream;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A bare WebSocket client speaking `ClientFrame` JSON, used by integration
/// tests to stand in for a browser-side synth or controller.
pub struct MockSignalClient {
    write: futures_util::stream::SplitSink<WsStream, Message>,
    read: futures_util::stream::SplitStream<WsStream>,
}

impl MockSignalClient {
    pub async fn connect(url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (write, read) = ws_stream.split();
        Ok(Self { write, read })
    }

    pub async fn send(&mut self, frame: &ClientFrame) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(frame)?;
        self.write.send(Message::Text(json.into())).await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<ClientFrame, Box<dyn std::error::Error>> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) => return Err("connection closed by server".into()),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
                None => return Err("connection stream ended".into()),
            }
        }
    }

    /// Waits up to `timeout` for a frame matching `predicate`, discarding
    /// any that don't match — useful when a test expects one of several
    /// notification frames in an undetermined order.
    pub async fn recv_matching(
        &mut self,
        timeout: std::time::Duration,
        mut predicate: impl FnMut(&ClientFrame) -> bool,
    ) -> Result<ClientFrame, Box<dyn std::error::Error>> {
        tokio::time::timeout(timeout, async {
            loop {
                let frame = self.recv().await?;
                if predicate(&frame) {
                    return Ok(frame);
                }
            }
        })
        .await?
    }

    pub async fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.write.send(Message::Close(None)).await?;
        Ok(())
    }
}
