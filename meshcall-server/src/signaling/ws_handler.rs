use crate::hub::HubCommand;
use crate::signaling::{SignalingService, encode_event};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use meshcall_core::{ClientEvent, ParticipantId, ServerEvent};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, service))
}

async fn handle_socket(socket: WebSocket, service: SignalingService) {
    let id = ParticipantId::new();
    info!("New WebSocket connection: {}", id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Queue the greeting before the socket becomes visible to broadcasts so it is
    // always the first frame the client reads.
    let greeting = [
        ServerEvent::Welcome { id: id.clone() },
        ServerEvent::IceConfig {
            ice_servers: service.ice_servers(),
        },
    ];
    for event in &greeting {
        if let Some(text) = encode_event(event) {
            let _ = tx.send(Message::Text(text));
        }
    }
    service.add_connection(id.clone(), tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let id = id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => {
                            debug!("{} -> {:?}", id, event);
                            if !service.submit(HubCommand::from_client(id.clone(), event)).await {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid frame from {}: {}", id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_connection(&id);
    service.submit(HubCommand::Disconnect { id: id.clone() }).await;
    info!("WebSocket disconnected: {}", id);
}
