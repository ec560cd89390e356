use crate::hub::HubCommand;
use crate::registry::ParticipantRegistry;
use crate::relay::{NegotiationKind, SignalingRelay};
use crate::signaling::SignalingOutput;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Capacity of the command queue between socket tasks and the hub.
pub const HUB_CHANNEL_CAPACITY: usize = 256;

/// Single consumer of every registry and relay operation.
///
/// Commands are applied one at a time, so each `join`, `leave` and relay is
/// atomic with respect to the others without any locking.
pub struct Hub {
    registry: ParticipantRegistry,
    relay: SignalingRelay,
    command_rx: mpsc::Receiver<HubCommand>,
}

impl Hub {
    pub fn new(
        command_rx: mpsc::Receiver<HubCommand>,
        signaling: Arc<dyn SignalingOutput>,
    ) -> Self {
        Self {
            registry: ParticipantRegistry::new(signaling.clone()),
            relay: SignalingRelay::new(signaling),
            command_rx,
        }
    }

    pub async fn run(mut self) {
        info!("Hub event loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            if let HubCommand::Shutdown = cmd {
                info!("Hub received shutdown");
                break;
            }
            self.handle_command(cmd).await;
        }

        self.registry.clear();
        info!("Hub event loop finished");
    }

    async fn handle_command(&mut self, cmd: HubCommand) {
        match cmd {
            HubCommand::NewUser { id, name } => {
                self.registry.join(id, name).await;
            }

            HubCommand::Negotiation {
                kind,
                from,
                target,
                payload,
                name,
            } => {
                let sender_name = match kind {
                    NegotiationKind::Offer => self
                        .registry
                        .display_name(&from)
                        .map(str::to_owned)
                        .or(name),
                    _ => None,
                };
                self.relay
                    .relay(kind, from, &target, payload, sender_name)
                    .await;
            }

            HubCommand::Chat { from, chat } => {
                self.relay.broadcast_chat(&from, chat).await;
            }

            HubCommand::Disconnect { id } => {
                self.registry.leave(&id).await;
            }

            HubCommand::Shutdown => {}
        }
    }
}
