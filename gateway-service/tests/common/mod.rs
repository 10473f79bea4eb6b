//! Test fixtures and utilities for gateway integration tests
//!
//! Boots the real gRPC stack (access guard included) on an ephemeral port
//! with in-memory stores, plus scripted agent backends to relay against.
//! No Postgres and no fixed ports, so every test is hermetic.
#![allow(dead_code)]

use async_trait::async_trait;
use auth_tokens::TokenCodec;
use chrono::Utc;
use gateway_service::db::{CheckpointStore, UserStore};
use gateway_service::error::{GatewayError, Result as GatewayResult};
use gateway_service::grpc::agentgate::v1::agent_service_client::AgentServiceClient;
use gateway_service::grpc::agentgate::v1::agent_service_server::{
    AgentService, AgentServiceServer,
};
use gateway_service::grpc::agentgate::v1::session_service_client::SessionServiceClient;
use gateway_service::grpc::agentgate::v1::session_service_server::SessionServiceServer;
use gateway_service::grpc::agentgate::v1::{ChatAnswer, ChatQuery, LoginRequest, RegisterRequest};
use gateway_service::grpc::{AgentRelay, SessionGrpc};
use gateway_service::middleware::AccessGuardLayer;
use gateway_service::models::{ConversationCheckpoint, User};
use gateway_service::services::SessionManager;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::transport::{Channel, Server};
use tonic::{Request, Response, Status, Streaming};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "integration-test-password";

// ============================================
// In-memory stores
// ============================================

#[derive(Default)]
pub struct InMemoryUserStore {
    inner: Mutex<UserStoreInner>,
}

#[derive(Default)]
struct UserStoreInner {
    next_id: i64,
    users: HashMap<i64, User>,
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> GatewayResult<User> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .users
            .values()
            .any(|u| u.username == username || u.email == email)
        {
            return Err(GatewayError::AlreadyExists);
        }
        inner.next_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.next_id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> GatewayResult<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn set_refresh_token(&self, user_id: i64, refresh_token: &str) -> GatewayResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.get_mut(&user_id) {
            user.refresh_token = Some(refresh_token.to_string());
        }
        Ok(())
    }

    async fn get_refresh_token(&self, user_id: i64) -> GatewayResult<Option<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .get(&user_id)
            .and_then(|u| u.refresh_token.clone()))
    }
}

impl InMemoryUserStore {
    /// Look up a user id by username, for assertions
    pub fn user_id(&self, username: &str) -> Option<i64> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .values()
            .find(|u| u.username == username)
            .map(|u| u.id)
    }
}

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    rows: Mutex<HashMap<(i64, String), ConversationCheckpoint>>,
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn upsert(&self, user_id: i64, conversation_id: &str, title: &str) -> GatewayResult<()> {
        let mut rows = self.rows.lock().unwrap();
        rows.insert(
            (user_id, conversation_id.to_string()),
            ConversationCheckpoint {
                user_id,
                conversation_id: conversation_id.to_string(),
                title: title.to_string(),
                sampled_at: Utc::now(),
            },
        );
        Ok(())
    }
}

impl InMemoryCheckpointStore {
    pub fn snapshot(&self) -> Vec<ConversationCheckpoint> {
        let rows = self.rows.lock().unwrap();
        rows.values().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().unwrap().is_empty()
    }
}

// ============================================
// Gateway under test
// ============================================

pub struct TestGateway {
    pub addr: SocketAddr,
    pub users: Arc<InMemoryUserStore>,
    pub checkpoints: Arc<InMemoryCheckpointStore>,
}

/// Boot the full gateway stack against the given agent endpoint
pub async fn boot_gateway(agent_endpoint: &str) -> TestGateway {
    let users = Arc::new(InMemoryUserStore::default());
    let checkpoints = Arc::new(InMemoryCheckpointStore::default());

    let codec = TokenCodec::new(TEST_SECRET);
    let sessions = SessionManager::new(users.clone(), codec.clone());
    let session_grpc = SessionGrpc::new(sessions);
    let relay = AgentRelay::new(agent_endpoint, checkpoints.clone()).expect("valid agent endpoint");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind gateway port");
    let addr = listener.local_addr().unwrap();
    let incoming = TcpListenerStream::new(listener);

    tokio::spawn(async move {
        Server::builder()
            .layer(AccessGuardLayer::new(codec))
            .add_service(SessionServiceServer::new(session_grpc))
            .add_service(AgentServiceServer::new(relay))
            .serve_with_incoming(incoming)
            .await
            .expect("start test gateway");
    });

    TestGateway {
        addr,
        users,
        checkpoints,
    }
}

// ============================================
// Scripted agent backends
// ============================================

/// Agent that answers "hello" with "hi" and echoes everything else
#[derive(Clone, Default)]
pub struct ScriptedAgent;

#[tonic::async_trait]
impl AgentService for ScriptedAgent {
    type ChatStream = ReceiverStream<Result<ChatAnswer, Status>>;

    async fn chat(
        &self,
        request: Request<Streaming<ChatQuery>>,
    ) -> Result<Response<Self::ChatStream>, Status> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(8);

        tokio::spawn(async move {
            while let Ok(Some(query)) = inbound.message().await {
                let answer_text = if query.query_text == "hello" {
                    "hi".to_string()
                } else {
                    format!("echo: {}", query.query_text)
                };
                if tx.send(Ok(ChatAnswer { answer_text })).await.is_err() {
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

/// Agent that answers the first query normally, then fails the stream
#[derive(Clone, Default)]
pub struct FailingAgent;

#[tonic::async_trait]
impl AgentService for FailingAgent {
    type ChatStream = ReceiverStream<Result<ChatAnswer, Status>>;

    async fn chat(
        &self,
        request: Request<Streaming<ChatQuery>>,
    ) -> Result<Response<Self::ChatStream>, Status> {
        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(8);

        tokio::spawn(async move {
            let mut answered = 0usize;
            while let Ok(Some(query)) = inbound.message().await {
                answered += 1;
                if answered == 1 {
                    let answer = ChatAnswer {
                        answer_text: format!("echo: {}", query.query_text),
                    };
                    if tx.send(Ok(answer)).await.is_err() {
                        break;
                    }
                } else {
                    let _ = tx
                        .send(Err(Status::internal("agent backend exploded")))
                        .await;
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

async fn serve_agent<S: AgentService>(svc: S) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind agent port");
    let addr = listener.local_addr().unwrap();
    let incoming = TcpListenerStream::new(listener);

    tokio::spawn(async move {
        Server::builder()
            .add_service(AgentServiceServer::new(svc))
            .serve_with_incoming(incoming)
            .await
            .expect("start mock agent");
    });

    addr
}

pub async fn spawn_scripted_agent() -> SocketAddr {
    serve_agent(ScriptedAgent).await
}

pub async fn spawn_failing_agent() -> SocketAddr {
    serve_agent(FailingAgent).await
}

/// Grab an address nothing is listening on
pub async fn unused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind probe port");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

// ============================================
// Client helpers
// ============================================

pub type SessionClient = SessionServiceClient<Channel>;
pub type AgentClient = AgentServiceClient<Channel>;

pub async fn session_client(addr: SocketAddr) -> SessionClient {
    SessionServiceClient::connect(format!("http://{}", addr))
        .await
        .expect("connect session client")
}

pub async fn agent_client(addr: SocketAddr) -> AgentClient {
    AgentServiceClient::connect(format!("http://{}", addr))
        .await
        .expect("connect agent client")
}

/// Register and log in a fresh user, returning (access, refresh) tokens
pub async fn register_and_login(client: &mut SessionClient, username: &str) -> (String, String) {
    client
        .register(RegisterRequest {
            username: username.to_string(),
            password: TEST_PASSWORD.to_string(),
            email: format!("{}@example.com", username),
        })
        .await
        .expect("register");

    let login = client
        .login(LoginRequest {
            username: username.to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await
        .expect("login")
        .into_inner();

    (login.access_token, login.refresh_token)
}

/// Open an authenticated chat stream
///
/// Returns the sender feeding the request stream (drop it to half-close)
/// and the answer stream.
pub async fn open_chat(
    client: &mut AgentClient,
    access_token: &str,
) -> Result<(mpsc::Sender<ChatQuery>, Streaming<ChatAnswer>), Status> {
    let (tx, rx) = mpsc::channel(8);
    let mut request = Request::new(ReceiverStream::new(rx));
    request.metadata_mut().insert(
        "access_token",
        access_token.parse().expect("token is valid metadata"),
    );

    let response = client.chat(request).await?;
    Ok((tx, response.into_inner()))
}

/// A chat query in the shape the CLI sends
pub fn query(call_id: i64, text: &str) -> ChatQuery {
    query_in("default", call_id, text)
}

pub fn query_in(conversation_id: &str, call_id: i64, text: &str) -> ChatQuery {
    ChatQuery {
        call_id,
        conversation_id: conversation_id.to_string(),
        query_text: text.to_string(),
    }
}

/// Receive the next answer, failing the test on timeout or stream error
pub async fn recv_answer(stream: &mut Streaming<ChatAnswer>) -> ChatAnswer {
    tokio::time::timeout(Duration::from_secs(5), stream.message())
        .await
        .expect("answer within deadline")
        .expect("stream healthy")
        .expect("stream still open")
}

/// Expect the stream to end cleanly
pub async fn expect_clean_end(stream: &mut Streaming<ChatAnswer>) {
    let end = tokio::time::timeout(Duration::from_secs(5), stream.message())
        .await
        .expect("stream end within deadline")
        .expect("stream healthy");
    assert!(end.is_none(), "expected clean end of stream");
}

/// Expect the stream to fail, returning the status
pub async fn expect_stream_error(stream: &mut Streaming<ChatAnswer>) -> Status {
    match tokio::time::timeout(Duration::from_secs(5), stream.message()).await {
        Ok(Err(status)) => status,
        Ok(Ok(message)) => panic!("expected stream error, got {:?}", message),
        Err(_) => panic!("no stream error within deadline"),
    }
}
