//! Gateway example with a pre-registered session
//!
//! Run with: cargo run --example gateway [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example gateway                    # binds to 0.0.0.0:5050
//!   cargo run --example gateway 127.0.0.1:6000     # binds to 127.0.0.1:6000
//!
//! ## Talking to it
//!
//! With websocat:
//!   websocat ws://localhost:5050/ws/
//!   > {"type":"start","streamKey":"my_key","title":"Hello","streamerId":1}
//!   > hi everyone
//!
//! With curl:
//!   curl localhost:5050/api/streams
//!   curl localhost:5050/api/stream/status
//!
//! ## Publishing media
//!
//! The gateway only signals. Push audio/video to the media server using the
//! RTMP URL returned by `POST /api/streams/start`:
//!   ffmpeg -re -i input.mp4 -c copy -f flv rtmp://localhost/live/my_key

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streamnet::protocol::StartStream;
use streamnet::{GatewayConfig, GatewayServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamnet=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = match std::env::args().nth(1) {
        Some(addr) => addr.parse()?,
        None => "0.0.0.0:5050".parse()?,
    };

    let server = GatewayServer::new(
        GatewayConfig::default()
            .bind(addr)
            .bind_sessions_to_connections(true),
    )?;

    // A session that is live before anyone connects
    let session = server.coordinator().start_session(
        StartStream {
            stream_key: "demo".into(),
            title: Some("Demo stream".into()),
            streamer_id: 1,
            thumbnail: None,
        },
        None,
    )?;
    println!(
        "Session '{}' live, publish to {}",
        session.stream_key,
        server.coordinator().config().rtmp_url(&session.stream_key)
    );
    println!("Realtime endpoint: ws://{}/ws/", addr);

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
