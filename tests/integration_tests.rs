//! Integration tests for the arcade server
//!
//! These tests drive the session handler the way the event loop does, and run
//! a real server on a loopback port for the transport paths.

use futures_util::{SinkExt, StreamExt};
use server::client_manager::{ClientId, Outbound};
use server::config::Config;
use server::network::Server;
use server::session::Arcade;
use shared::{decode, encode, Event, Target};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_test::assert_ok;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Inbox = mpsc::UnboundedReceiver<Outbound>;
type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests round trip for every event in the vocabulary
    #[test]
    fn every_event_round_trips() {
        let events = [
            Event::OnlineCount { count: 2 },
            Event::Score { score: 1 },
            Event::NewTarget(Target::new(10, 5, 5, 20, 20)),
            Event::Hit { target_id: 10 },
            Event::Click { x: 10, y: 10 },
        ];

        for event in events {
            let bytes = encode(&event);
            assert_eq!(bytes.len() % 2, 0);
            assert_eq!(decode(&bytes).unwrap(), event);
        }
    }

    /// Tests that the wire form is the little-endian word sequence
    #[test]
    fn hit_frame_bytes() {
        assert_eq!(encode(&Event::Hit { target_id: 0x0203 }), vec![3, 0, 3, 2]);
    }
}

/// GAME SCENARIO TESTS
mod scenario_tests {
    use super::*;

    fn arcade_with_two_targets() -> Arcade {
        let mut arcade = Arcade::new(&Config::default());
        arcade.game_mut().insert(Target::new(10, 5, 5, 20, 20));
        arcade.game_mut().insert(Target::new(20, 100, 100, 20, 20));
        arcade
    }

    fn join(arcade: &mut Arcade) -> (ClientId, Inbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        (arcade.connect(tx), rx)
    }

    /// Tests a click inside target 10 claiming it for the clicker only
    #[test]
    fn click_claims_target() {
        let mut arcade = arcade_with_two_targets();
        let (clicker, mut clicker_rx) = join(&mut arcade);
        let (other, mut other_rx) = join(&mut arcade);
        drain(&mut clicker_rx);
        drain(&mut other_rx);

        arcade.handle_frame(clicker, &encode(&Event::Click { x: 10, y: 10 }));

        let clicker_events = drain(&mut clicker_rx);
        assert!(clicker_events.contains(&Event::Hit { target_id: 10 }));
        assert!(clicker_events.contains(&Event::Score { score: 1 }));
        assert_eq!(drain(&mut other_rx), vec![Event::Hit { target_id: 10 }]);

        assert_eq!(arcade.score_of(clicker), Some(1));
        assert_eq!(arcade.score_of(other), Some(0));
        assert_eq!(arcade.targets(), vec![Target::new(20, 100, 100, 20, 20)]);
    }

    /// Tests that a late joiner sees exactly the live board first
    #[test]
    fn third_client_receives_snapshot_first() {
        let mut arcade = arcade_with_two_targets();
        let (first, _rx1) = join(&mut arcade);
        let (_second, _rx2) = join(&mut arcade);
        let (_third, mut rx3) = join(&mut arcade);

        // An incremental event after the third client joined
        arcade.click(first, 110, 110);

        let events = drain(&mut rx3);
        assert_eq!(
            events,
            vec![
                Event::OnlineCount { count: 3 },
                Event::NewTarget(Target::new(10, 5, 5, 20, 20)),
                Event::NewTarget(Target::new(20, 100, 100, 20, 20)),
                Event::Hit { target_id: 20 },
            ]
        );
    }

    /// Tests the idle, probe, evict sequence
    #[test]
    fn silent_client_is_probed_then_evicted() {
        let config = Config::default();
        let mut arcade = Arcade::new(&config);
        let (silent, mut silent_rx) = join(&mut arcade);
        let (responsive, mut responsive_rx) = join(&mut arcade);
        drain(&mut silent_rx);
        drain(&mut responsive_rx);

        let first_tick = Instant::now() + config.ping_timeout() + Duration::from_secs(1);
        assert!(arcade.liveness_tick(first_tick).is_empty());
        assert_eq!(silent_rx.try_recv().unwrap(), Outbound::Ping);
        assert_eq!(responsive_rx.try_recv().unwrap(), Outbound::Ping);

        arcade.pong(responsive);

        let second_tick = first_tick + config.liveness_interval();
        assert_eq!(arcade.liveness_tick(second_tick), vec![silent]);
        assert_eq!(arcade.online_count(), 1);
        assert_eq!(
            drain(&mut responsive_rx),
            vec![Event::OnlineCount { count: 1 }]
        );
    }

    /// Tests that capacity holds across any number of hits and spawn ticks
    #[test]
    fn board_never_exceeds_capacity() {
        let config = Config::default();
        let mut arcade = Arcade::new(&config);
        arcade.seed();
        let (player, _rx) = join(&mut arcade);

        for _ in 0..50 {
            if let Some(target) = arcade.targets().first().copied() {
                let (x, y) = target.center();
                arcade.click(player, x, y);
            }
            arcade.spawn_tick();
            assert!(arcade.targets().len() <= config.max_targets);
        }
        assert!(arcade.score_of(player).unwrap() > 0);
    }

    fn drain(rx: &mut Inbox) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(outbound) = rx.try_recv() {
            if let Outbound::Frame(bytes) = outbound {
                events.push(decode(&bytes).unwrap());
            }
        }
        events
    }
}

/// WEBSOCKET TRANSPORT TESTS
mod websocket_tests {
    use super::*;

    fn loopback_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Config::default()
        }
    }

    async fn start(config: Config, targets: &[Target]) -> String {
        let mut arcade = Arcade::new(&config);
        for target in targets {
            arcade.game_mut().insert(*target);
        }

        let server = Server::with_arcade(config, arcade).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());

        format!("ws://{}", addr)
    }

    async fn next_event(socket: &mut ClientSocket) -> Event {
        loop {
            let message = timeout(Duration::from_secs(3), socket.next())
                .await
                .expect("timed out waiting for event")
                .expect("connection closed")
                .expect("read error");

            if let Message::Binary(data) = message {
                return decode(&data).unwrap();
            }
        }
    }

    /// Tests connect, snapshot and a winning click over a real socket
    #[tokio::test]
    async fn click_over_websocket() {
        let url = start(
            loopback_config(),
            &[
                Target::new(10, 5, 5, 20, 20),
                Target::new(20, 100, 100, 20, 20),
            ],
        )
        .await;

        let (mut socket, _) = connect_async(url.as_str()).await.unwrap();

        assert_eq!(next_event(&mut socket).await, Event::OnlineCount { count: 1 });
        assert_eq!(
            next_event(&mut socket).await,
            Event::NewTarget(Target::new(10, 5, 5, 20, 20))
        );
        assert_eq!(
            next_event(&mut socket).await,
            Event::NewTarget(Target::new(20, 100, 100, 20, 20))
        );

        socket
            .send(Message::Binary(encode(&Event::Click { x: 10, y: 10 })))
            .await
            .unwrap();

        assert_eq!(next_event(&mut socket).await, Event::Score { score: 1 });
        assert_eq!(next_event(&mut socket).await, Event::Hit { target_id: 10 });
    }

    /// Tests that malformed frames do not close the connection
    #[tokio::test]
    async fn malformed_frame_keeps_connection() {
        let url = start(loopback_config(), &[Target::new(10, 5, 5, 20, 20)]).await;
        let (mut socket, _) = connect_async(url.as_str()).await.unwrap();
        next_event(&mut socket).await;
        next_event(&mut socket).await;

        assert_ok!(socket.send(Message::Binary(vec![4, 0, 10])).await);
        assert_ok!(socket.send(Message::Binary(vec![99, 0])).await);
        socket
            .send(Message::Binary(encode(&Event::Click { x: 10, y: 10 })))
            .await
            .unwrap();

        assert_eq!(next_event(&mut socket).await, Event::Score { score: 1 });
    }

    /// Tests that other players learn about a departure
    #[tokio::test]
    async fn disconnect_updates_online_count() {
        let url = start(loopback_config(), &[]).await;

        let (mut stayer, _) = connect_async(url.as_str()).await.unwrap();
        assert_eq!(next_event(&mut stayer).await, Event::OnlineCount { count: 1 });

        let (mut leaver, _) = connect_async(url.as_str()).await.unwrap();
        assert_eq!(next_event(&mut stayer).await, Event::OnlineCount { count: 2 });

        leaver.close(None).await.unwrap();

        assert_eq!(next_event(&mut stayer).await, Event::OnlineCount { count: 1 });
    }

    /// Tests eviction of a peer that never answers pings
    #[tokio::test]
    async fn unresponsive_peer_is_evicted() {
        let config = Config {
            ping_timeout_ms: 50,
            liveness_interval_ms: 100,
            ..loopback_config()
        };
        let url = start(config, &[]).await;

        // Never polled, so it never answers a ping
        let (_silent, _) = connect_async(url.as_str()).await.unwrap();
        let (mut watcher, _) = connect_async(url.as_str()).await.unwrap();

        let mut seen_both = false;
        loop {
            match next_event(&mut watcher).await {
                Event::OnlineCount { count: 2 } => seen_both = true,
                Event::OnlineCount { count: 1 } if seen_both => break,
                _ => {}
            }
        }
    }
}
