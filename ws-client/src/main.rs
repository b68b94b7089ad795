use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

mod api;
mod auth;

use api::ApiClient;
use auth::{login, AuthenticatedUser, UserCredentials};
use ws_client::{
    ChatObserver, NotificationObserver, ReconnectConfig, TransportManager, TransportState,
};

#[derive(Parser)]
#[command(name = "ws-test-client")]
#[command(about = "WebSocket delivery integration testing tool")]
struct Cli {
    /// Base URL of the backend (e.g., http://localhost:4000)
    #[arg(long)]
    base_url: String,

    /// User 1 credentials (format: email:password) - the event recipient
    #[arg(long)]
    user1: String,

    /// User 2 credentials (format: email:password) - the event trigger
    #[arg(long)]
    user2: String,

    /// Test scenario to run
    #[arg(long, value_enum)]
    scenario: ScenarioChoice,

    /// Enable verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum ScenarioChoice {
    /// Connect, reach OPEN, disconnect - no data created
    ConnectionTest,
    /// User 2 comments on user 1's post; user 1 expects a live notification
    CommentNotification,
    /// User 2 sends a direct message; user 1 expects a live chat event
    ChatMessage,
    /// Run every scenario in order
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }

    println!("{}", "=== SETUP PHASE ===".bright_white().bold());

    let user1_creds = UserCredentials::parse(&cli.user1)?;
    let user2_creds = UserCredentials::parse(&cli.user2)?;

    println!("{} Authenticating users...", "→".blue());
    let client = reqwest::Client::new();
    let user1 = login(&client, &cli.base_url, &user1_creds).await?;
    let user2 = login(&client, &cli.base_url, &user2_creds).await?;

    println!("{} User 1 authenticated (ID: {})", "✓".green(), user1.user_id);
    println!("{} User 2 authenticated (ID: {})", "✓".green(), user2.user_id);

    let api_client = ApiClient::new(client, cli.base_url.clone());
    let ws_url = websocket_url(&cli.base_url);

    match cli.scenario {
        ScenarioChoice::ConnectionTest => {
            connection_test(&ws_url, &user1).await?;
        }
        ScenarioChoice::CommentNotification => {
            comment_notification(&api_client, &ws_url, &user1, &user2).await?;
        }
        ScenarioChoice::ChatMessage => {
            chat_message(&api_client, &ws_url, &user1, &user2).await?;
        }
        ScenarioChoice::All => {
            connection_test(&ws_url, &user1).await?;
            comment_notification(&api_client, &ws_url, &user1, &user2).await?;
            chat_message(&api_client, &ws_url, &user1, &user2).await?;
        }
    }

    println!("\n{}", "All scenarios passed".green().bold());
    Ok(())
}

fn websocket_url(base_url: &str) -> String {
    let ws_base = base_url
        .replacen("https://", "wss://", 1)
        .replacen("http://", "ws://", 1);
    format!("{ws_base}/ws")
}

async fn connect(ws_url: &str, user: &AuthenticatedUser) -> Result<Arc<TransportManager>> {
    let manager = TransportManager::new(ReconnectConfig::default());
    manager.connect(ws_url.to_string(), Some(user.cookie_header()));
    manager
        .wait_for_state(TransportState::Open, Duration::from_secs(10))
        .await?;
    Ok(manager)
}

async fn wait_for_event(
    rx: &mut mpsc::UnboundedReceiver<Value>,
    description: &str,
) -> Result<Value> {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .with_context(|| format!("Timeout waiting for {description}"))?
        .with_context(|| format!("Channel closed waiting for {description}"))
}

async fn connection_test(ws_url: &str, user1: &AuthenticatedUser) -> Result<()> {
    println!("\n{}", "=== CONNECTION TEST ===".bright_white().bold());

    let manager = connect(ws_url, user1).await?;
    println!("{} Transport reached OPEN", "✓".green());

    manager.disconnect();
    anyhow::ensure!(manager.state() == TransportState::Disconnected);
    println!("{} Disconnect returned to DISCONNECTED", "✓".green());

    Ok(())
}

async fn comment_notification(
    api_client: &ApiClient,
    ws_url: &str,
    user1: &AuthenticatedUser,
    user2: &AuthenticatedUser,
) -> Result<()> {
    println!("\n{}", "=== COMMENT NOTIFICATION ===".bright_white().bold());

    println!("{} Creating subtable and post as user 1...", "→".blue());
    let subtable_name = format!("wstest-{}", uuid::Uuid::new_v4().simple());
    let subtable = api_client.create_subtable(user1, &subtable_name).await?;
    let subtable_id = require_id(&subtable, "subtable")?;
    let post = api_client
        .create_post(user1, &subtable_id, "Live delivery test post")
        .await?;
    let post_id = require_id(&post, "post")?;

    let manager = connect(ws_url, user1).await?;
    println!("{} User 1 connected", "✓".green());

    let (tx, mut rx) = mpsc::unbounded_channel();
    manager.subscribe(NotificationObserver::new(move |notification| {
        let _ = tx.send(notification.clone());
    }));

    println!("{} User 2 commenting on the post...", "→".blue());
    api_client
        .create_comment(user2, &post_id, "a live reply")
        .await?;

    let notification = wait_for_event(&mut rx, "NEW_COMMENT_NOTIFICATION").await?;
    anyhow::ensure!(
        notification["recipient_id"] == Value::String(user1.user_id.clone()),
        "notification targeted the wrong recipient"
    );
    println!(
        "{} User 1 received live notification: {}",
        "✓".green(),
        notification["content"].as_str().unwrap_or("<no content>")
    );

    manager.disconnect();
    Ok(())
}

async fn chat_message(
    api_client: &ApiClient,
    ws_url: &str,
    user1: &AuthenticatedUser,
    user2: &AuthenticatedUser,
) -> Result<()> {
    println!("\n{}", "=== CHAT MESSAGE ===".bright_white().bold());

    let manager = connect(ws_url, user1).await?;
    println!("{} User 1 connected", "✓".green());

    let (tx, mut rx) = mpsc::unbounded_channel();
    manager.subscribe(ChatObserver::new(move |message| {
        let _ = tx.send(message.clone());
    }));

    println!("{} User 2 sending a direct message...", "→".blue());
    api_client
        .send_message(user2, &user1.user_id, "hello over the live channel")
        .await?;

    let message = wait_for_event(&mut rx, "NEW_CHAT_MESSAGE").await?;
    anyhow::ensure!(
        message["body"] == Value::String("hello over the live channel".to_string()),
        "chat message body did not round-trip"
    );
    println!("{} User 1 received live chat message", "✓".green());

    manager.disconnect();
    Ok(())
}

fn require_id(entity: &Value, label: &str) -> Result<String> {
    entity["id"]
        .as_str()
        .map(str::to_string)
        .with_context(|| format!("No id in created {label}"))
}
