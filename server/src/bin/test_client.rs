use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use shared::{decode, encode, Event, Target};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::interval;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Headless player: follows the board and clicks the centre of a known target
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// WebSocket URL of the server
    #[clap(short, long, default_value = "ws://127.0.0.1:5000")]
    url: String,
    /// Number of clicks to send before leaving
    #[clap(short, long, default_value_t = 10)]
    clicks: u32,
    /// Delay between clicks in milliseconds
    #[clap(short, long, default_value_t = 1000)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("Connecting to {}", args.url);
    let (ws_stream, _) = connect_async(args.url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut targets: BTreeMap<u16, Target> = BTreeMap::new();
    let mut click_timer = interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut clicks_sent = 0;

    while clicks_sent < args.clicks {
        tokio::select! {
            message = read.next() => {
                match message {
                    Some(Ok(Message::Binary(data))) => match decode(&data) {
                        Ok(Event::NewTarget(target)) => {
                            targets.insert(target.id, target);
                        }
                        Ok(Event::Hit { target_id }) => {
                            targets.remove(&target_id);
                        }
                        Ok(Event::Score { score }) => info!("Score: {}", score),
                        Ok(Event::OnlineCount { count }) => info!("Players online: {}", count),
                        Ok(Event::Click { .. }) => warn!("Server echoed a click"),
                        Err(e) => warn!("Undecodable frame: {}", e),
                    },
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        info!("Server closed the connection");
                        return Ok(());
                    }
                }
            }
            _ = click_timer.tick() => {
                if let Some(target) = targets.values().next() {
                    let (x, y) = target.center();
                    info!("Clicking target {} at ({}, {})", target.id, x, y);
                    write.send(Message::Binary(encode(&Event::Click { x, y }))).await?;
                    clicks_sent += 1;
                }
            }
        }
    }

    write.send(Message::Close(None)).await?;
    info!("Test client finished after {} clicks", clicks_sent);

    Ok(())
}
