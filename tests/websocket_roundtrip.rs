//! End-to-end tests against a real WebSocket server on an ephemeral port.

use anyhow::{Context, bail};
use bytes::Bytes;
use camfeed::wire::FrameMessageBuilder;
use camfeed::{ConnectionState, FeedConfig, FeedConnection, WsConnector};
use futures::{SinkExt, StreamExt};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(10);

fn jpeg() -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 200, 10])))
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    buf.into_inner()
}

fn two_cameras(frame_number: i64) -> Bytes {
    FrameMessageBuilder::new(frame_number)
        .camera("cam_0", 1, 1, 3, jpeg())
        .camera("cam_1", 1, 1, 3, jpeg())
        .build()
}

fn ack(frame_number: i64) -> String {
    format!(r#"{{"type":"acknowledgment","frame_number":{frame_number}}}"#)
}

async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> anyhow::Result<String> {
    while let Some(message) = ws.next().await {
        match message? {
            Message::Text(text) => return Ok(text.as_str().to_owned()),
            Message::Close(_) => bail!("client closed the connection"),
            _ => continue,
        }
    }
    bail!("connection ended")
}

async fn listen() -> anyhow::Result<(TcpListener, FeedConfig)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let config = FeedConfig {
        reconnect_base_delay_ms: 50,
        reconnect_max_delay_ms: 200,
        ..FeedConfig::with_url(format!("ws://{addr}/websocket/connect"))
    };
    Ok((listener, config))
}

#[tokio::test]
async fn frames_are_published_and_acknowledged() -> anyhow::Result<()> {
    let (listener, config) = listen().await?;
    let greeting = config.greeting.clone();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut ws = tokio_tungstenite::accept_async(stream).await?;
        let mut received = vec![next_text(&mut ws).await?];

        ws.send(Message::Text(r#"{"type":"recording_info","is_recording":true}"#.to_string().into()))
            .await?;
        ws.send(Message::Binary(two_cameras(42))).await?;
        received.push(next_text(&mut ws).await?);

        // Footer disagrees with the header: must be dropped without an ack
        let corrupt = FrameMessageBuilder::new(99).camera("cam_0", 1, 1, 3, jpeg()).footer_cameras(4).build();
        ws.send(Message::Binary(corrupt)).await?;
        ws.send(Message::Binary(two_cameras(43))).await?;
        received.push(next_text(&mut ws).await?);

        ws.close(None).await?;
        anyhow::Ok(received)
    });

    let mut feed = FeedConnection::new(config, WsConnector)?;
    let mut messages = Box::pin(feed.server_messages());
    let mut bitmaps = feed.bitmap_receiver();
    feed.connect();

    let recording = timeout(WAIT, messages.next()).await?.context("server message")?;
    assert_eq!(recording.kind(), "recording_info");

    timeout(WAIT, bitmaps.wait_for(|latest| latest.frame_number == Some(43))).await??;
    let latest = feed.bitmaps();
    assert_eq!(latest.camera_ids(), ["cam_0", "cam_1"]);
    assert_eq!(latest.get("cam_1").map(|bitmap| bitmap.width()), Some(1));

    let received = timeout(WAIT, server).await???;
    assert_eq!(received, [greeting, ack(42), ack(43)]);

    feed.disconnect().await;
    assert_eq!(feed.state(), ConnectionState::Disconnected);
    assert_eq!(feed.live_bitmaps(), 0);
    Ok(())
}

#[tokio::test]
async fn reconnects_and_greets_again_after_server_close() -> anyhow::Result<()> {
    let (listener, config) = listen().await?;

    let server = tokio::spawn(async move {
        let mut greetings = Vec::new();
        for _ in 0..2 {
            let (stream, _) = listener.accept().await?;
            let mut ws = tokio_tungstenite::accept_async(stream).await?;
            greetings.push(next_text(&mut ws).await?);
            ws.close(None).await?;
        }
        anyhow::Ok(greetings)
    });

    let mut feed = FeedConnection::new(config, WsConnector)?;
    feed.connect();

    let greetings = timeout(WAIT, server).await???;
    assert_eq!(greetings.len(), 2);
    assert_eq!(greetings[0], greetings[1]);

    feed.disconnect().await;
    Ok(())
}

#[tokio::test]
async fn unreachable_backend_exhausts_attempts() -> anyhow::Result<()> {
    let (listener, config) = listen().await?;
    drop(listener);

    let config = FeedConfig { max_reconnect_attempts: 3, ..config };
    let mut feed = FeedConnection::new(config, WsConnector)?;
    let mut state = feed.state_receiver();
    feed.connect();

    let exhausted = timeout(WAIT, state.wait_for(|s| matches!(s, ConnectionState::Exhausted { .. })))
        .await??
        .clone();
    assert_eq!(exhausted, ConnectionState::Exhausted { attempts: 3 });

    feed.disconnect().await;
    Ok(())
}
