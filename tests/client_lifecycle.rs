//! Integration tests driving the real `Client` actor against a loopback fixture server playing
//! the Asterisk side, covering the literal end-to-end scenarios in SPEC_FULL §8.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ami_client::callback::Immediate;
use ami_client::codec::Codec;
use ami_client::{Client, ClientConfig, Error, Packet, Repeat};
use futures::{SinkExt, TryStreamExt};
use tokio::net::TcpListener;
use tokio_util::codec::{FramedRead, FramedWrite};

async fn fixture_listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig::builder()
        .host(addr.ip().to_string())
        .port(addr.port())
        .username("user")
        .secret("secret")
        .ping_delay(Duration::ZERO)
        .reconnect_timeout(Duration::ZERO)
        .build()
}

fn banner_packet() -> Packet {
    let mut banner = Packet::new();
    banner.insert("Banner", "Asterisk Call Manager/5.0.1");
    banner
}

fn accepted_login_reply() -> Packet {
    let mut reply = Packet::new();
    reply.insert("Response", "Success");
    reply.insert("Message", "Authentication accepted");
    reply
}

/// Accepts one connection off `listener`, sends the banner, reads the `Login` action, and replies
/// with the given packet. Returns the split halves so the caller can keep driving the fixture.
/// Takes `&TcpListener` (rather than consuming it) so a test can simulate a reconnect by calling
/// `accept()` again on the same bound socket instead of racing a rebind of the same port.
async fn accept_and_login(
    listener: &TcpListener,
    login_reply: Packet,
) -> (FramedRead<tokio::net::tcp::OwnedReadHalf, Codec>, FramedWrite<tokio::net::tcp::OwnedWriteHalf, Codec>) {
    let (stream, _) = listener.accept().await.unwrap();
    let (read, write) = stream.into_split();
    let mut read = FramedRead::new(read, Codec::new());
    let mut write = FramedWrite::new(write, Codec::new());

    write.send(banner_packet()).await.unwrap();
    let _login = read.try_next().await.unwrap().unwrap();
    write.send(login_reply).await.unwrap();

    (read, write)
}

#[actix_rt::test]
async fn login_ok_then_idle_auto_close() {
    let (listener, addr) = fixture_listener().await;

    let server = tokio::spawn(async move {
        let (_read, _write) = accept_and_login(&listener, accepted_login_reply()).await;
        // No further traffic: the client has no subscriptions or actions, so it should
        // auto-close on its own without the fixture doing anything else.
    });

    let client = Client::new(config_for(addr));
    let result = tokio::time::timeout(Duration::from_secs(5), client.connect())
        .await
        .expect("connect() should resolve once the client idles out");

    assert!(result.is_ok(), "expected a clean idle close, got {result:?}");
    server.await.unwrap();
}

#[actix_rt::test]
async fn login_rejected_surfaces_auth_failed() {
    let (listener, addr) = fixture_listener().await;

    let mut rejected = Packet::new();
    rejected.insert("Response", "Error");
    rejected.insert("Message", "Authentication failed");

    let server = tokio::spawn(async move {
        let (_read, _write) = accept_and_login(&listener, rejected).await;
    });

    let client = Client::new(config_for(addr));
    let result = tokio::time::timeout(Duration::from_secs(5), client.connect())
        .await
        .expect("connect() should resolve once login is rejected");

    assert!(matches!(result, Err(Error::AuthFailed(_))));
    server.await.unwrap();
}

#[actix_rt::test]
async fn simple_action_invokes_its_callback_once() {
    let (listener, addr) = fixture_listener().await;

    let server = tokio::spawn(async move {
        let (mut read, mut write) = accept_and_login(&listener, accepted_login_reply()).await;

        let action = read.try_next().await.unwrap().unwrap();
        assert_eq!(action.get_str("Action"), Some("Ping"));
        let id = action.get_str("ActionID").unwrap().to_string();

        let mut response = Packet::new();
        response.insert("Response", "Success");
        response.insert("ActionID", id);
        response.insert("Ping", "Pong");
        write.send(response).await.unwrap();
    });

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();

    let client = Client::new(config_for(addr));
    client.create_action(
        Packet::action("Ping"),
        Some(Immediate::new(move |_packet: Packet| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })),
        Repeat::None,
    );

    let result = tokio::time::timeout(Duration::from_secs(5), client.connect())
        .await
        .expect("connect() should resolve once the action's entry is removed and the client idles");

    assert!(result.is_ok(), "expected a clean idle close, got {result:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    server.await.unwrap();
}

#[actix_rt::test]
async fn event_list_action_invokes_its_callback_for_every_packet() {
    let (listener, addr) = fixture_listener().await;

    let server = tokio::spawn(async move {
        let (mut read, mut write) = accept_and_login(&listener, accepted_login_reply()).await;

        let action = read.try_next().await.unwrap().unwrap();
        assert_eq!(action.get_str("Action"), Some("CoreShowChannels"));
        let id = action.get_str("ActionID").unwrap().to_string();

        let mut accept = Packet::new();
        accept.insert("Response", "Success");
        accept.insert("EventList", "start");
        accept.insert("ActionID", id.clone());
        write.send(accept).await.unwrap();

        for channel in ["SIP/100-1", "SIP/200-1"] {
            let mut event = Packet::new();
            event.insert("Event", "CoreShowChannel");
            event.insert("ActionID", id.clone());
            event.insert("Channel", channel);
            write.send(event).await.unwrap();
        }

        let mut complete = Packet::new();
        complete.insert("Event", "CoreShowChannelsComplete");
        complete.insert("ActionID", id);
        write.send(complete).await.unwrap();
    });

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();

    let client = Client::new(config_for(addr));
    client.create_action(
        Packet::action("CoreShowChannels"),
        Some(Immediate::new(move |_packet: Packet| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        })),
        Repeat::None,
    );

    let result = tokio::time::timeout(Duration::from_secs(5), client.connect())
        .await
        .expect("connect() should resolve once the event list completes and the client idles");

    assert!(result.is_ok(), "expected a clean idle close, got {result:?}");
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    server.await.unwrap();
}

#[actix_rt::test]
async fn shutdown_mid_stream_reconnects_and_replays_periodic_actions() {
    let (listener, addr) = fixture_listener().await;
    let config = ClientConfig::builder()
        .host(addr.ip().to_string())
        .port(addr.port())
        .username("user")
        .secret("secret")
        .ping_delay(Duration::ZERO)
        .reconnect_timeout(Duration::from_millis(20))
        .build();

    let server = tokio::spawn(async move {
        let (_read, mut write) = accept_and_login(&listener, accepted_login_reply()).await;

        // The client's periodic `Status` action should have been submitted before we tear the
        // first connection down; we don't need to read it, just force a reconnect.
        let mut shutdown = Packet::new();
        shutdown.insert("Event", "Shutdown");
        write.send(shutdown).await.unwrap();
        drop(write);

        // Second connection, off the same listening socket: the periodic action must be
        // resubmitted after re-login.
        let (mut read, mut write) = accept_and_login(&listener, accepted_login_reply()).await;

        let replayed = tokio::time::timeout(Duration::from_secs(5), read.try_next())
            .await
            .expect("the periodic action should be replayed after reconnect")
            .unwrap()
            .unwrap();
        assert_eq!(replayed.get_str("Action"), Some("Status"));

        let mut response = Packet::new();
        response.insert("Response", "Success");
        response.insert("ActionID", replayed.get_str("ActionID").unwrap());
        write.send(response).await.unwrap();
    });

    let client = Client::new(config);
    client.create_action(Packet::action("Status"), None::<Immediate<fn(Packet)>>, Repeat::Periodic(Duration::from_secs(60)));

    // This client never idles out on its own (the periodic action is never removed), so we just
    // confirm the reconnect-and-replay sequence happens within a bounded window.
    let _ = tokio::time::timeout(Duration::from_secs(5), client.connect()).await;

    server.await.unwrap();
}
