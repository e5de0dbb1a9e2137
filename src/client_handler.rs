use anyhow::Context;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info};

use crate::dispatcher::Dispatcher;
use crate::protocol::{self, Frame, Inbound};

/// Serve one websocket connection until the peer leaves or sends a malformed frame.
///
/// Messages are handled one at a time: a reply is sent before the next frame is read.
/// Closing the connection never touches game state.
pub async fn handle_connection<S>(mut ws: S, dispatcher: Dispatcher)
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    info!("Start listening");
    if let Err(e) = serve(&mut ws, &dispatcher).await {
        error!("{e:#}");
    }
    // Peer may already be gone
    let _ = ws.close().await;
    info!("Exit handler");
}

async fn serve<S>(ws: &mut S, dispatcher: &Dispatcher) -> anyhow::Result<()>
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    while let Some(text) = next_text(ws).await? {
        debug!("< {text}");

        let Some(inbound) = decode(&text)? else {
            continue;
        };

        let reply = match dispatcher.dispatch(inbound).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("{e:#}");
                continue;
            }
        };

        if let Some(outbound) = reply {
            let json = protocol::encode(&outbound)?;
            ws.send(Message::Text(json.clone().into()))
                .await
                .context("could not send reply")?;
            debug!("> {json}");
        }
    }
    Ok(())
}

/// Next text payload, or `None` once the connection is closed.
async fn next_text<S>(ws: &mut S) -> anyhow::Result<Option<String>>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    loop {
        let message = match ws.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                info!("Connection closed ({e})");
                return Ok(None);
            }
            None => {
                info!("Connection closed");
                return Ok(None);
            }
        };

        match message {
            Message::Text(text) => return Ok(Some(text.as_str().to_owned())),
            Message::Binary(data) => {
                let text = String::from_utf8(data.to_vec())
                    .context("malformed message: binary frame is not UTF-8")?;
                return Ok(Some(text));
            }
            Message::Close(_) => {
                info!("Connection closed by peer");
                return Ok(None);
            }
            // ping, pong and raw frames
            _ => {}
        }
    }
}

/// `None` for a well-formed message of unknown type, which is only logged.
fn decode(text: &str) -> anyhow::Result<Option<Inbound>> {
    match protocol::decode(text).context("malformed message")? {
        Frame::Message(inbound) => Ok(Some(inbound)),
        Frame::Unknown(value) => {
            error!("Unknown message type:\n{value}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::io::DuplexStream;
    use tokio_tungstenite::tungstenite::protocol::Role;
    use tokio_tungstenite::WebSocketStream;

    use super::*;
    use crate::agent::{AgentKind, BaselineFactory};
    use crate::session_registry::SessionRegistry;

    async fn connected() -> (WebSocketStream<DuplexStream>, Dispatcher, tokio::task::JoinHandle<()>) {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let factory = Arc::new(BaselineFactory::new(AgentKind::FirstFree, None));
        let dispatcher = Dispatcher::new(Arc::new(SessionRegistry::new(factory)));

        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let handler = tokio::spawn(handle_connection(server, dispatcher.clone()));
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        (client, dispatcher, handler)
    }

    async fn send(client: &mut WebSocketStream<DuplexStream>, text: &str) {
        client
            .send(Message::Text(text.to_owned().into()))
            .await
            .unwrap();
    }

    async fn recv_text(client: &mut WebSocketStream<DuplexStream>) -> String {
        loop {
            match client.next().await.unwrap().unwrap() {
                Message::Text(text) => return text.as_str().to_owned(),
                Message::Close(_) => panic!("connection closed"),
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn replies_in_order() {
        let (mut client, _, _handler) = connected().await;

        send(&mut client, r#"{"type":"start","game":"g1","player":1,"grid":[2,2]}"#).await;
        assert_eq!(
            recv_text(&mut client).await,
            r#"{"type":"action","action":[0,0,"h"]}"#
        );

        send(
            &mut client,
            r#"{"type":"action","game":"g1","nextplayer":2,"row":0,"column":0,"orientation":"h"}"#,
        )
        .await;
        send(
            &mut client,
            r#"{"type":"action","game":"g1","nextplayer":1,"row":1,"column":0,"orientation":"h"}"#,
        )
        .await;
        assert_eq!(
            recv_text(&mut client).await,
            r#"{"type":"action","action":[0,1,"h"]}"#
        );
    }

    #[tokio::test]
    async fn unknown_type_keeps_connection_open() {
        let (mut client, _, _handler) = connected().await;

        send(&mut client, r#"{"type":"hello","game":"g1"}"#).await;
        send(&mut client, r#"{"type":"start","game":"g1","player":1,"grid":[1,1]}"#).await;
        assert_eq!(
            recv_text(&mut client).await,
            r#"{"type":"action","action":[0,0,"h"]}"#
        );
    }

    #[tokio::test]
    async fn malformed_frame_ends_connection() {
        let (mut client, dispatcher, handler) = connected().await;

        send(&mut client, r#"{"type":"start","game":"g1","player":2,"grid":[1,1]}"#).await;
        send(&mut client, "{not json").await;

        handler.await.unwrap();
        // game state survives the broken connection
        let session = dispatcher.registry().lookup("g1").unwrap();
        assert!(!session.is_ended());
    }

    #[tokio::test]
    async fn close_leaves_sessions_untouched() {
        let (mut client, dispatcher, handler) = connected().await;

        send(&mut client, r#"{"type":"start","game":"g1","player":2,"grid":[1,1]}"#).await;
        client.close(None).await.unwrap();

        handler.await.unwrap();
        assert_eq!(dispatcher.registry().len(), 1);
        assert!(!dispatcher.registry().lookup("g1").unwrap().is_ended());
    }
}
