use crate::config::CallConfig;
use crate::coordinator::{PeerSessionCoordinator, RemoteStream};
use crate::error::{CallError, Result};
use crate::signaling::{SignalingChannel, SignalingClient};
use crate::transport::{
    LinkEvent, LocalMedia, MediaHandle, TransportFactory, WebRtcTransportFactory,
};
use async_trait::async_trait;
use meshcall_core::{ChatMessage, ClientEvent, Participant, ParticipantId, ServerEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Acquires the local camera/microphone before anything else happens.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Fails with [`CallError::MediaAccessDenied`] when the user refuses.
    async fn acquire(&self) -> Result<LocalMedia>;
}

/// Joins without sending any media.
pub struct ReceiveOnly;

#[async_trait]
impl MediaProvider for ReceiveOnly {
    async fn acquire(&self) -> Result<LocalMedia> {
        Ok(LocalMedia::receive_only())
    }
}

/// Presentation hooks. Called from the orchestrator's task; keep them quick.
pub trait CallObserver: Send + Sync {
    fn on_remote_stream_established(
        &self,
        id: &ParticipantId,
        display_name: &str,
        media: &MediaHandle,
    );

    fn on_remote_participant_removed(&self, id: &ParticipantId);

    fn on_chat_message(&self, _chat: &ChatMessage) {}

    fn on_participants_changed(&self, _participants: &[Participant]) {}
}

#[derive(Debug)]
pub enum CallCommand {
    Chat(ChatMessage),
    Leave,
}

/// Cloneable control surface for a running call.
#[derive(Clone)]
pub struct CallHandle {
    display_name: String,
    commands: mpsc::UnboundedSender<CallCommand>,
}

impl CallHandle {
    /// Returns the message as sent so the caller can show it locally.
    pub fn send_chat(&self, message: impl Into<String>) -> Result<ChatMessage> {
        let chat = ChatMessage::text(self.display_name.clone(), message);
        self.submit(CallCommand::Chat(chat.clone()))?;
        Ok(chat)
    }

    /// Relay a transcribed or translated utterance.
    pub fn send_speech(
        &self,
        message: impl Into<String>,
        audio_url: Option<String>,
    ) -> Result<ChatMessage> {
        let chat = ChatMessage::speech(self.display_name.clone(), message, audio_url);
        self.submit(CallCommand::Chat(chat.clone()))?;
        Ok(chat)
    }

    pub fn leave(&self) -> Result<()> {
        self.submit(CallCommand::Leave)
    }

    fn submit(&self, command: CallCommand) -> Result<()> {
        self.commands.send(command).map_err(|_| CallError::Closed)
    }
}

/// Owns one participant's session: signaling, the coordinator and the observer.
pub struct CallOrchestrator {
    display_name: String,
    channel: SignalingChannel,
    coordinator: PeerSessionCoordinator,
    link_events: mpsc::UnboundedReceiver<LinkEvent>,
    commands: mpsc::UnboundedReceiver<CallCommand>,
    observer: Arc<dyn CallObserver>,
}

impl CallOrchestrator {
    /// Acquire media, connect to the server and wire up webrtc transports.
    ///
    /// Media denial aborts before any signaling connection is opened.
    pub async fn join(
        config: CallConfig,
        media: &dyn MediaProvider,
        observer: Arc<dyn CallObserver>,
    ) -> Result<(Self, CallHandle)> {
        let local_media = media.acquire().await?;
        let factory = Arc::new(WebRtcTransportFactory::new(local_media));
        let channel = SignalingClient::connect(&config.server_url).await?;
        Ok(Self::new(config, factory, channel, observer))
    }

    pub fn new(
        config: CallConfig,
        factory: Arc<dyn TransportFactory>,
        channel: SignalingChannel,
        observer: Arc<dyn CallObserver>,
    ) -> (Self, CallHandle) {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let coordinator = PeerSessionCoordinator::new(
            config.display_name.clone(),
            factory,
            config.transport.ice_servers,
            channel.outbox.clone(),
            link_tx,
        );

        let handle = CallHandle {
            display_name: config.display_name.clone(),
            commands: command_tx,
        };

        let orchestrator = Self {
            display_name: config.display_name,
            channel,
            coordinator,
            link_events: link_rx,
            commands: command_rx,
            observer,
        };

        (orchestrator, handle)
    }

    /// Announce ourselves and process events until we leave or the server
    /// goes away. Every link is closed on exit.
    pub async fn run(mut self) -> Result<()> {
        self.channel.send(ClientEvent::NewUser {
            name: self.display_name.clone(),
        })?;
        info!("Joined as {}", self.display_name);

        loop {
            tokio::select! {
                event = self.channel.inbox.recv() => {
                    match event {
                        Some(event) => self.handle_server_event(event).await,
                        None => {
                            info!("Signaling channel closed");
                            break;
                        }
                    }
                }
                Some(event) = self.link_events.recv() => {
                    if let Some(stream) = self.coordinator.handle_link_event(event) {
                        self.announce_stream(stream);
                    }
                }
                command = self.commands.recv() => {
                    match command {
                        Some(CallCommand::Chat(chat)) => {
                            if let Err(e) = self.channel.send(ClientEvent::Chat(chat)) {
                                warn!("Failed to send chat: {}", e);
                            }
                        }
                        Some(CallCommand::Leave) | None => {
                            info!("Leaving call");
                            break;
                        }
                    }
                }
            }
        }

        let CallOrchestrator {
            channel,
            mut coordinator,
            ..
        } = self;
        coordinator.close_all().await;
        // the coordinator holds an outbox clone; the writer only drains once it is gone
        drop(coordinator);
        channel.close().await;
        Ok(())
    }

    async fn handle_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Welcome { id } => self.coordinator.set_local_id(id).await,
            ServerEvent::IceConfig { ice_servers } => self.coordinator.set_ice_servers(ice_servers),
            ServerEvent::Users(users) => {
                self.observer.on_participants_changed(&users);
                self.coordinator.handle_users(&users).await;
            }
            ServerEvent::Offer { from, offer, name } => {
                self.coordinator.handle_offer(from, name, offer).await
            }
            ServerEvent::Answer { from, answer } => {
                self.coordinator.handle_answer(from, answer).await
            }
            ServerEvent::Candidate { from, candidate } => {
                self.coordinator.handle_candidate(from, candidate).await
            }
            ServerEvent::Chat(chat) => self.observer.on_chat_message(&chat),
            ServerEvent::UserDisconnected(id) => {
                if self.coordinator.handle_participant_left(&id).await {
                    self.observer.on_remote_participant_removed(&id);
                } else {
                    debug!("{} left without a link", id);
                }
            }
        }
    }

    fn announce_stream(&self, stream: RemoteStream) {
        self.observer.on_remote_stream_established(
            &stream.remote,
            &stream.display_name,
            &stream.media,
        );
    }
}
