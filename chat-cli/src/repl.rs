//! Login prompt and the lockstep chat REPL
//!
//! The chat loop is strictly lockstep: each prompt line becomes one
//! `ChatQuery`, and the loop waits for its answer before prompting
//! again. Typing `quit` or `exit` (exact match after trimming) closes
//! the send side without forwarding the marker; end-of-input on stdin
//! behaves the same way.

use crate::agentgate::v1::agent_service_client::AgentServiceClient;
use crate::agentgate::v1::session_service_client::SessionServiceClient;
use crate::agentgate::v1::{ChatAnswer, ChatQuery, LoginRequest, LoginResponse, RegisterRequest};
use crate::interceptor::AccessTokenInterceptor;
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::Channel;
use tonic::{Request, Status};

/// Chat inputs that end the session instead of being forwarded
const END_MARKERS: [&str; 2] = ["quit", "exit"];

const QUERY_BUFFER: usize = 8;

/// The agent client with credential injection attached
pub type AuthedAgentClient =
    AgentServiceClient<InterceptedService<Channel, AccessTokenInterceptor>>;

pub type LineReader = Lines<BufReader<Stdin>>;

/// Line reader over stdin shared by all the interactive prompts
pub fn stdin_lines() -> LineReader {
    BufReader::new(tokio::io::stdin()).lines()
}

fn is_end_marker(line: &str) -> bool {
    END_MARKERS.contains(&line)
}

/// Read one line, trimmed; `None` means stdin closed
async fn read_trimmed(lines: &mut LineReader) -> Result<Option<String>> {
    let line = lines.next_line().await.context("Reading input failed")?;
    Ok(line.map(|l| l.trim().to_string()))
}

async fn read_prompted(lines: &mut LineReader, text: &str) -> Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    read_trimmed(lines).await
}

async fn prompt(lines: &mut LineReader, text: &str) -> Result<String> {
    read_prompted(lines, text)
        .await?
        .context("Input ended at a prompt")
}

/// Run the login / register prompt until a login succeeds
///
/// Registration reports its outcome and returns to the prompt rather
/// than logging the new user in; only a login hands out credentials.
pub async fn login_prompt(
    client: &mut SessionServiceClient<Channel>,
    lines: &mut LineReader,
) -> Result<LoginResponse> {
    loop {
        println!("Do you want to (l)ogin or (r)egister?");
        let choice = read_trimmed(lines)
            .await?
            .context("Input ended before login")?;

        match choice.as_str() {
            "l" => {
                let username = prompt(lines, "Username: ").await?;
                let password = prompt(lines, "Password: ").await?;

                match client.login(LoginRequest { username, password }).await {
                    Ok(response) => {
                        println!("Login successful.");
                        return Ok(response.into_inner());
                    }
                    Err(status) => println!("Login failed: {}", status.message()),
                }
            }
            "r" => {
                let username = prompt(lines, "Choose a username: ").await?;
                let password = prompt(lines, "Choose a password: ").await?;
                let email = prompt(lines, "Choose an email: ").await?;

                let request = RegisterRequest {
                    username,
                    password,
                    email,
                };
                match client.register(request).await {
                    Ok(response) => println!(
                        "Registered {}. Log in to start chatting.",
                        response.into_inner().username
                    ),
                    Err(status) => println!("Registration failed: {}", status.message()),
                }
            }
            _ => println!("Please answer 'l' or 'r'."),
        }
    }
}

/// Drive the chat loop until the user quits or the stream ends
pub async fn chat_loop(
    agent: &mut AuthedAgentClient,
    conversation_id: &str,
    lines: &mut LineReader,
) -> Result<()> {
    let (tx, rx) = mpsc::channel(QUERY_BUFFER);
    let response = agent
        .chat(Request::new(ReceiverStream::new(rx)))
        .await
        .context("Could not open the chat stream")?;
    let mut answers = response.into_inner();

    println!("Connected. Ask away; 'quit' or 'exit' ends the session.");

    let mut call_id = 0i64;
    loop {
        let Some(line) = read_prompted(lines, "> ").await? else {
            break;
        };
        if line.is_empty() {
            continue;
        }
        if is_end_marker(&line) {
            break;
        }

        call_id += 1;
        let query = ChatQuery {
            call_id,
            conversation_id: conversation_id.to_string(),
            query_text: line,
        };

        if tx.send(query).await.is_err() {
            // The relay dropped the request stream; the answer side says why.
            report_stream_end(answers.message().await);
            return Ok(());
        }

        match answers.message().await {
            Ok(Some(answer)) => println!("agent: {}", answer.answer_text),
            end => {
                report_stream_end(end);
                return Ok(());
            }
        }
    }

    // Half-close our side and let the relay wind down.
    drop(tx);
    if let Ok(Some(answer)) = answers.message().await {
        // Lockstep means nothing should be in flight, but don't eat it.
        println!("agent: {}", answer.answer_text);
    }
    Ok(())
}

fn report_stream_end(end: std::result::Result<Option<ChatAnswer>, Status>) {
    match end {
        Ok(_) => println!("The gateway closed the conversation."),
        Err(status) => println!("Chat failed: {}", status.message()),
    }
}
