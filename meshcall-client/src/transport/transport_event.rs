use meshcall_core::{IceCandidate, IceServerConfig, ParticipantId};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use webrtc::track::track_remote::TrackRemote;

/// Generation number of a peer link.
///
/// A remote id can be linked, torn down and linked again; events are matched on
/// this id so late callbacks from an old link never touch its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Unknown,
}

/// A remote media track as handed to presentation.
#[derive(Clone)]
pub struct MediaHandle {
    pub stream_id: String,
    pub track_id: String,
    pub kind: MediaKind,
    /// Present when the track comes from a real peer connection.
    pub track: Option<Arc<TrackRemote>>,
}

impl fmt::Debug for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandle")
            .field("stream_id", &self.stream_id)
            .field("track_id", &self.track_id)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Something a transport observed on its own, outside any signaling message.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    LocalCandidate {
        remote: ParticipantId,
        link: LinkId,
        candidate: IceCandidate,
    },
    RemoteTrack {
        remote: ParticipantId,
        link: LinkId,
        media: MediaHandle,
    },
    StateChanged {
        remote: ParticipantId,
        link: LinkId,
        state: TransportState,
    },
}

impl LinkEvent {
    pub fn remote(&self) -> &ParticipantId {
        match self {
            LinkEvent::LocalCandidate { remote, .. }
            | LinkEvent::RemoteTrack { remote, .. }
            | LinkEvent::StateChanged { remote, .. } => remote,
        }
    }

    pub fn link(&self) -> LinkId {
        match self {
            LinkEvent::LocalCandidate { link, .. }
            | LinkEvent::RemoteTrack { link, .. }
            | LinkEvent::StateChanged { link, .. } => *link,
        }
    }
}

/// Everything a transport needs to know about the link it serves.
#[derive(Clone)]
pub struct LinkContext {
    pub remote: ParticipantId,
    pub link: LinkId,
    /// Whether this side sends the offer.
    pub initiator: bool,
    pub ice_servers: Vec<IceServerConfig>,
    pub events: mpsc::UnboundedSender<LinkEvent>,
    /// Cancelled when the link closes; callbacks stop forwarding from then on.
    pub cancel: CancellationToken,
}

impl LinkContext {
    pub fn emit_candidate(&self, candidate: IceCandidate) {
        self.emit(LinkEvent::LocalCandidate {
            remote: self.remote.clone(),
            link: self.link,
            candidate,
        });
    }

    pub fn emit_track(&self, media: MediaHandle) {
        self.emit(LinkEvent::RemoteTrack {
            remote: self.remote.clone(),
            link: self.link,
            media,
        });
    }

    pub fn emit_state(&self, state: TransportState) {
        self.emit(LinkEvent::StateChanged {
            remote: self.remote.clone(),
            link: self.link,
            state,
        });
    }

    fn emit(&self, event: LinkEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        let _ = self.events.send(event);
    }
}
