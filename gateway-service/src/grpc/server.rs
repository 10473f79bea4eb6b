/// gRPC server implementation for the gateway service
///
/// Implements all RPCs from agent_gateway.proto:
/// - SessionService: Register, Login, RefreshAccessToken
/// - AgentService: Chat (bidirectional stream relayed to the agent backend)
///
/// The chat relay runs two pump tasks per call, one per direction, plus a
/// driver that joins both and logs the outcome. The handler itself returns
/// the response stream immediately; the access guard has already
/// authenticated the caller by the time `chat` runs.
use crate::db::CheckpointStore;
use crate::error::GatewayError;
use crate::middleware::{auth_context, AuthContext};
use crate::services::SessionManager;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Request, Response, Status, Streaming};
use tracing::{info, warn};

// Import generated protobuf types
pub mod agentgate {
    pub mod v1 {
        tonic::include_proto!("agentgate.v1");
    }
}

use agentgate::v1::agent_service_client::AgentServiceClient;
use agentgate::v1::agent_service_server::AgentService;
use agentgate::v1::session_service_server::SessionService;
use agentgate::v1::{
    ChatAnswer, ChatQuery, LoginRequest, LoginResponse, RefreshAccessTokenRequest,
    RefreshAccessTokenResponse, RegisterRequest, RegisterResponse,
};

/// Size of the per-direction relay buffers. The chat protocol is
/// query/answer lockstep, so a small buffer only has to absorb bursts.
const RELAY_BUFFER: usize = 16;

/// Session RPCs: register, login, access-token renewal
pub struct SessionGrpc {
    sessions: SessionManager,
}

impl SessionGrpc {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }
}

#[tonic::async_trait]
impl SessionService for SessionGrpc {
    /// Register a new user with username, password, and email
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> std::result::Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();

        let user = self
            .sessions
            .register(&req.username, &req.email, &req.password)
            .await?;

        Ok(Response::new(RegisterResponse {
            user_id: user.id,
            username: user.username,
        }))
    }

    /// Authenticate with username and password, issuing a token pair
    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> std::result::Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();

        let tokens = self.sessions.login(&req.username, &req.password).await?;

        Ok(Response::new(LoginResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
        }))
    }

    /// Exchange a refresh token for a fresh access token
    async fn refresh_access_token(
        &self,
        request: Request<RefreshAccessTokenRequest>,
    ) -> std::result::Result<Response<RefreshAccessTokenResponse>, Status> {
        let req = request.into_inner();

        let renewed = self.sessions.refresh_access_token(&req.refresh_token).await?;

        Ok(Response::new(RefreshAccessTokenResponse {
            access_token: renewed.access_token,
            expires_at: renewed.expires_at,
        }))
    }
}

/// Chat stream relay: bridges the client's duplex stream to the agent
/// backend's duplex stream
pub struct AgentRelay {
    agent: Channel,
    checkpoints: Arc<dyn CheckpointStore>,
}

impl AgentRelay {
    /// Create a relay that dials `agent_endpoint` lazily on first use
    pub fn new(agent_endpoint: &str, checkpoints: Arc<dyn CheckpointStore>) -> crate::Result<Self> {
        let agent = Channel::from_shared(agent_endpoint.to_string())
            .map_err(|e| GatewayError::Internal(format!("Invalid agent endpoint: {}", e)))?
            .connect_lazy();

        Ok(Self { agent, checkpoints })
    }
}

#[tonic::async_trait]
impl AgentService for AgentRelay {
    type ChatStream = ReceiverStream<std::result::Result<ChatAnswer, Status>>;

    async fn chat(
        &self,
        request: Request<Streaming<ChatQuery>>,
    ) -> std::result::Result<Response<Self::ChatStream>, Status> {
        let ctx = auth_context(&request)?;
        let inbound = request.into_inner();

        // Open the backend stream before spawning anything: if the agent is
        // unreachable the client gets Unavailable and no state changes.
        let (to_agent_tx, to_agent_rx) = mpsc::channel::<ChatQuery>(RELAY_BUFFER);
        let mut agent = AgentServiceClient::new(self.agent.clone());
        let from_agent = match agent
            .chat(Request::new(ReceiverStream::new(to_agent_rx)))
            .await
        {
            Ok(response) => response.into_inner(),
            Err(status) => {
                warn!(
                    user_id = ctx.user_id,
                    error = %status,
                    "Agent backend unreachable, rejecting chat"
                );
                return Err(GatewayError::BackendUnavailable(status.to_string()).into());
            }
        };

        let (to_client_tx, to_client_rx) = mpsc::channel(RELAY_BUFFER);

        info!(user_id = ctx.user_id, username = %ctx.username, "Chat relay opened");
        spawn_relay(
            ctx,
            self.checkpoints.clone(),
            inbound,
            to_agent_tx,
            from_agent,
            to_client_tx,
        );

        Ok(Response::new(ReceiverStream::new(to_client_rx)))
    }
}

/// Spawn the two relay pumps and a driver that waits for both
///
/// Join semantics: neither direction is aborted when the other finishes.
/// The uplink ends on client half-close or a dead backend stream; the
/// downlink ends on backend completion, backend error, or a gone client.
/// Whichever direction fails first gets its error to the client, because
/// the error is pushed into the client channel as it is observed.
fn spawn_relay(
    ctx: AuthContext,
    checkpoints: Arc<dyn CheckpointStore>,
    mut inbound: Streaming<ChatQuery>,
    to_agent_tx: mpsc::Sender<ChatQuery>,
    mut from_agent: Streaming<ChatAnswer>,
    to_client_tx: mpsc::Sender<std::result::Result<ChatAnswer, Status>>,
) {
    let user_id = ctx.user_id;

    // Uplink: client -> agent, checkpointing every query as it passes.
    let uplink_client_tx = to_client_tx.clone();
    let uplink = tokio::spawn(async move {
        loop {
            match inbound.message().await {
                Ok(Some(query)) => {
                    // Checkpoint before forwarding. A failed write must not
                    // interrupt the conversation.
                    if let Err(e) = checkpoints
                        .upsert(ctx.user_id, &query.conversation_id, &query.query_text)
                        .await
                    {
                        warn!(user_id = ctx.user_id, error = %e, "Checkpoint write failed");
                    }

                    if to_agent_tx.send(query).await.is_err() {
                        // Backend call ended; the downlink reports why.
                        break Ok(());
                    }
                }
                // Client half-closed: dropping to_agent_tx half-closes the
                // backend stream in turn.
                Ok(None) => break Ok(()),
                Err(status) => {
                    let _ = uplink_client_tx.send(Err(status.clone())).await;
                    break Err(GatewayError::TransportFailure(status.to_string()));
                }
            }
        }
    });

    // Downlink: agent -> client. Also watches for the client receiver
    // going away so a silent backend cannot strand the task.
    let downlink = tokio::spawn(async move {
        loop {
            tokio::select! {
                message = from_agent.message() => match message {
                    Ok(Some(answer)) => {
                        if to_client_tx.send(Ok(answer)).await.is_err() {
                            break Ok(());
                        }
                    }
                    Ok(None) => break Ok(()),
                    Err(status) => {
                        let _ = to_client_tx.send(Err(status.clone())).await;
                        break Err(GatewayError::TransportFailure(status.to_string()));
                    }
                },
                _ = to_client_tx.closed() => break Ok(()),
            }
        }
    });

    // Driver: wait for both directions, then log how the relay ended.
    tokio::spawn(async move {
        let (uplink_outcome, downlink_outcome) = tokio::join!(uplink, downlink);
        let uplink_outcome = task_outcome(uplink_outcome);
        let downlink_outcome = task_outcome(downlink_outcome);

        match (&uplink_outcome, &downlink_outcome) {
            (Ok(()), Ok(())) => {
                info!(user_id, "Chat relay completed");
            }
            _ => {
                warn!(
                    user_id,
                    uplink_error = ?uplink_outcome.err(),
                    downlink_error = ?downlink_outcome.err(),
                    "Chat relay ended with error"
                );
            }
        }
    });
}

/// Collapse a join result into the pump outcome, treating a panicked pump
/// as an internal error
fn task_outcome(
    joined: std::result::Result<crate::Result<()>, tokio::task::JoinError>,
) -> crate::Result<()> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => Err(GatewayError::Internal(format!("Relay task panicked: {}", e))),
    }
}
