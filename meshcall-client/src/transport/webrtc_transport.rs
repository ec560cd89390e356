use crate::transport::{
    LinkContext, MediaHandle, MediaKind, PeerTransport, TransportFactory, TransportState,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use meshcall_core::{IceCandidate, IceServerConfig, ParticipantId, SdpKind, SessionDescription};
use std::sync::Arc;
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Local camera/microphone tracks attached to every peer connection.
///
/// Empty means the participant only receives.
#[derive(Clone, Default)]
pub struct LocalMedia {
    pub tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
}

impl LocalMedia {
    pub fn receive_only() -> Self {
        Self::default()
    }

    pub fn is_receive_only(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Builds a webrtc-rs peer connection per link.
pub struct WebRtcTransportFactory {
    media: LocalMedia,
}

impl WebRtcTransportFactory {
    pub fn new(media: LocalMedia) -> Self {
        Self { media }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(&self, ctx: LinkContext) -> Result<Box<dyn PeerTransport>> {
        let transport = WebRtcTransport::new(ctx, &self.media).await?;
        Ok(Box::new(transport))
    }
}

pub struct WebRtcTransport {
    pub remote: ParticipantId,
    pub peer_connection: Arc<RTCPeerConnection>,
}

impl WebRtcTransport {
    pub async fn new(ctx: LinkContext, media: &LocalMedia) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ctx.ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );

        for track in &media.tracks {
            peer_connection
                .add_track(Arc::clone(track))
                .await
                .context("Failed to attach local track")?;
        }

        // Without local tracks the offer still needs m-lines to receive on.
        // The answering side gets its transceivers from the remote offer.
        if media.is_receive_only() && ctx.initiator {
            for kind in [RTPCodecType::Audio, RTPCodecType::Video] {
                peer_connection
                    .add_transceiver_from_kind(
                        kind,
                        Some(RTCRtpTransceiverInit {
                            direction: RTCRtpTransceiverDirection::Recvonly,
                            send_encodings: vec![],
                        }),
                    )
                    .await?;
            }
        }

        let state_ctx = ctx.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                info!(
                    "Peer connection state changed for {} {}: {:?}",
                    state_ctx.remote, state_ctx.link, s
                );
                state_ctx.emit_state(to_transport_state(s));
                Box::pin(async {})
            },
        ));

        let ice_ctx = ctx.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            if let Some(candidate) = c {
                match candidate.to_json() {
                    Ok(init) => ice_ctx.emit_candidate(from_candidate_init(init)),
                    Err(e) => debug!("Failed to serialize local candidate: {}", e),
                }
            }
            Box::pin(async {})
        }));

        let remote = ctx.remote.clone();
        let track_ctx = ctx;
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let kind = match track.kind() {
                    RTPCodecType::Audio => MediaKind::Audio,
                    RTPCodecType::Video => MediaKind::Video,
                    _ => MediaKind::Unknown,
                };
                debug!(
                    "Remote {:?} track from {} {}",
                    kind, track_ctx.remote, track_ctx.link
                );
                track_ctx.emit_track(MediaHandle {
                    stream_id: track.stream_id(),
                    track_id: track.id(),
                    kind,
                    track: Some(track),
                });
                Box::pin(async {})
            },
        ));

        Ok(Self {
            remote,
            peer_connection,
        })
    }
}

#[async_trait]
impl PeerTransport for WebRtcTransport {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let desc = match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpKind::Answer => RTCSessionDescription::answer(desc.sdp)?,
            SdpKind::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
            SdpKind::Rollback => bail!("rollback descriptions are not supported"),
        };
        self.peer_connection.set_remote_description(desc).await?;
        Ok(())
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_candidate_init(candidate))
            .await
            .context("Failed to add remote candidate")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

fn to_rtc_ice_server(server: &IceServerConfig) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
    }
}

fn to_transport_state(state: RTCPeerConnectionState) -> TransportState {
    match state {
        RTCPeerConnectionState::Connecting => TransportState::Connecting,
        RTCPeerConnectionState::Connected => TransportState::Connected,
        RTCPeerConnectionState::Disconnected => TransportState::Disconnected,
        RTCPeerConnectionState::Failed => TransportState::Failed,
        RTCPeerConnectionState::Closed => TransportState::Closed,
        _ => TransportState::New,
    }
}

fn from_candidate_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_candidate_init(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}
