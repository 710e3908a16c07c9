use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use mindmate_core::{AppConfig, AppState};
use mindmate_models::account::AccountKind;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SECRET: &str = "gateway-test-secret-gateway-test-secret";

struct TestGateway {
    addr: SocketAddr,
    state: AppState,
}

impl TestGateway {
    async fn start() -> anyhow::Result<Self> {
        let db = mindmate_db::create_pool("sqlite::memory:", 1).await?;
        mindmate_db::run_migrations(&db).await?;
        for (id, name) in [(1_i64, "ada"), (2, "bob")] {
            mindmate_db::accounts::create_account(
                &db,
                id,
                AccountKind::User,
                name,
                &format!("{name}@example.com"),
            )
            .await?;
        }

        let state = AppState::new(
            db,
            AppConfig {
                jwt_secret: SECRET.to_string(),
                allowed_origins: Vec::new(),
            },
        );
        let app = mindmate_ws::gateway_router().with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { addr, state })
    }

    async fn open(&self) -> anyhow::Result<Client> {
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{}/socket", self.addr))
            .await
            .context("connect")?;
        Ok(client)
    }

    async fn connect_as(&self, identity: i64) -> anyhow::Result<Client> {
        let mut client = self.open().await?;
        let token = mindmate_core::auth::create_token(identity, SECRET, 3600)?;
        send_json(&mut client, json!({ "auth": { "token": token } })).await?;
        let frame = next_json(&mut client).await?;
        anyhow::ensure!(frame["event"] == "connected", "unexpected frame {frame}");
        anyhow::ensure!(frame["data"]["id"] == identity.to_string());
        Ok(client)
    }
}

async fn send_json(client: &mut Client, value: Value) -> anyhow::Result<()> {
    client.send(WsMessage::text(value.to_string())).await?;
    Ok(())
}

/// Next JSON text frame, skipping pings.
async fn next_json(client: &mut Client) -> anyhow::Result<Value> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .context("timed out waiting for frame")?
            .context("stream ended")??;
        match msg {
            WsMessage::Text(text) => return Ok(serde_json::from_str(text.as_str())?),
            WsMessage::Close(frame) => anyhow::bail!("closed: {frame:?}"),
            _ => continue,
        }
    }
}

async fn expect_rejection(client: &mut Client, message: &str) -> anyhow::Result<()> {
    let frame = next_json(client).await?;
    assert_eq!(frame["event"], "connect_error");
    assert_eq!(frame["data"]["message"], message);

    let close = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await?
        .context("stream ended before close")??;
    match close {
        WsMessage::Close(Some(frame)) => assert_eq!(frame.code, CloseCode::from(4001)),
        other => panic!("expected close frame, got {other:?}"),
    }
    Ok(())
}

async fn no_frame_within(client: &mut Client, wait: Duration) -> bool {
    loop {
        match tokio::time::timeout(wait, client.next()).await {
            Err(_) => return true,
            Ok(Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_)))) => continue,
            Ok(_) => return false,
        }
    }
}

#[tokio::test]
async fn missing_token_is_rejected_with_close_code() -> anyhow::Result<()> {
    let gateway = TestGateway::start().await?;
    let mut client = gateway.open().await?;
    send_json(&mut client, json!({ "auth": {} })).await?;
    expect_rejection(&mut client, "No token provided").await?;
    assert_eq!(gateway.state.channels.channel_count(), 0);
    Ok(())
}

#[tokio::test]
async fn bad_and_expired_tokens_are_rejected() -> anyhow::Result<()> {
    let gateway = TestGateway::start().await?;

    let mut client = gateway.open().await?;
    send_json(&mut client, json!({ "auth": { "token": "garbage" } })).await?;
    expect_rejection(&mut client, "Invalid token").await?;

    let now = chrono::Utc::now().timestamp() as usize;
    let expired = mindmate_core::auth::encode_claims(
        &mindmate_core::auth::Claims {
            sub: 1,
            iat: now - 7200,
            exp: now - 3600,
        },
        SECRET,
    )?;
    let mut client = gateway.open().await?;
    send_json(&mut client, json!({ "auth": { "token": expired } })).await?;
    expect_rejection(&mut client, "Invalid token").await?;

    assert_eq!(gateway.state.channels.subscriber_count("1"), 0);
    Ok(())
}

#[tokio::test]
async fn admitted_connection_joins_its_identity_channel() -> anyhow::Result<()> {
    let gateway = TestGateway::start().await?;
    let client = gateway.connect_as(1).await?;
    assert_eq!(gateway.state.channels.subscriber_count("1"), 1);

    drop(client);
    for _ in 0..50 {
        if gateway.state.channels.subscriber_count("1") == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(gateway.state.channels.channel_count(), 0);
    Ok(())
}

#[tokio::test]
async fn both_tabs_of_an_identity_receive_the_message() -> anyhow::Result<()> {
    let gateway = TestGateway::start().await?;
    let mut tab_one = gateway.connect_as(2).await?;
    let mut tab_two = gateway.connect_as(2).await?;
    let mut sender = gateway.connect_as(1).await?;

    send_json(
        &mut sender,
        json!({
            "event": "send_message",
            "data": { "receiver": "2", "receiverType": "User", "message": "hello" }
        }),
    )
    .await?;

    for tab in [&mut tab_one, &mut tab_two] {
        let frame = next_json(tab).await?;
        assert_eq!(frame["event"], "receive_message");
        assert_eq!(frame["data"]["sender"], "1");
        assert_eq!(frame["data"]["receiverType"], "user");
        assert_eq!(frame["data"]["message"], "hello");
    }
    let echo = next_json(&mut sender).await?;
    assert_eq!(echo["data"]["receiver"], "2");
    Ok(())
}

#[tokio::test]
async fn unknown_events_and_blank_bodies_are_ignored() -> anyhow::Result<()> {
    let gateway = TestGateway::start().await?;
    let mut receiver = gateway.connect_as(2).await?;
    let mut sender = gateway.connect_as(1).await?;

    send_json(&mut sender, json!({ "event": "typing", "data": {} })).await?;
    sender.send(WsMessage::text("not json")).await?;
    send_json(
        &mut sender,
        json!({ "event": "send_message", "data": { "receiver": "2", "message": "   " } }),
    )
    .await?;
    assert!(no_frame_within(&mut receiver, Duration::from_millis(300)).await);

    send_json(
        &mut sender,
        json!({ "event": "send_message", "data": { "receiver": "2", "message": "still here" } }),
    )
    .await?;
    let frame = next_json(&mut receiver).await?;
    assert_eq!(frame["data"]["message"], "still here");

    let stored = mindmate_db::messages::get_conversation(&gateway.state.db, 1, 2).await?;
    assert_eq!(stored.len(), 1);
    Ok(())
}
