
use signal_relay_server::protocol::ServerMessage;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use test_helpers::{create_test_server, DirectClient};
use tokio::sync::Barrier;

/// Concurrent joins to one code must produce exactly one channel and one
/// `peer-joined` per ordered pair of members.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_share_one_channel() {
    let server = create_test_server();
    let attempts = 16usize;
    let barrier = Arc::new(Barrier::new(attempts));

    let mut handles = Vec::new();
    for _ in 0..attempts {
        let server_clone = server.clone();
        let barrier_clone = barrier.clone();
        handles.push(tokio::spawn(async move {
            let mut client = DirectClient::connect(&server_clone, 64);
            barrier_clone.wait().await;
            client
                .send(&server_clone, r#"{"type":"join","code":"SAME01"}"#)
                .await;
            client
        }));
    }

    let mut clients = Vec::new();
    for handle in handles {
        clients.push(handle.await.unwrap());
    }

    assert_eq!(server.registry().channel_count(), 1);
    assert_eq!(server.registry().members_of("SAME01").len(), attempts);

    // Each member hears about exactly the peers that joined after it.
    let mut announced_pairs = 0usize;
    for client in &mut clients {
        let own_id = client.session.id();
        let peers: Vec<_> = client
            .drain()
            .into_iter()
            .filter_map(|message| match message {
                ServerMessage::PeerJoined { peer_id } => Some(peer_id),
                _ => None,
            })
            .collect();
        let unique: HashSet<_> = peers.iter().copied().collect();
        assert_eq!(unique.len(), peers.len(), "no duplicate announcements");
        assert!(!unique.contains(&own_id), "never announced to itself");
        announced_pairs += peers.len();
    }
    assert_eq!(announced_pairs, attempts * (attempts - 1) / 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_join_and_close_leaves_registry_empty() {
    let server = create_test_server();
    let attempts = 12usize;
    let barrier = Arc::new(Barrier::new(attempts));

    let mut handles = Vec::new();
    for i in 0..attempts {
        let server_clone = server.clone();
        let barrier_clone = barrier.clone();
        handles.push(tokio::spawn(async move {
            let mut client = DirectClient::connect(&server_clone, 64);
            let code = format!("room{}", i % 3);
            barrier_clone.wait().await;
            client
                .send(&server_clone, &format!(r#"{{"type":"join","code":"{code}"}}"#))
                .await;
            tokio::task::yield_now().await;
            server_clone.unregister_client(&mut client.session);
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    assert!(server.registry().is_empty());
    assert_eq!(server.status().connections, 0);
    let snapshot = server.metrics().snapshot();
    assert_eq!(snapshot.channels.joins, attempts as u64);
    assert_eq!(snapshot.channels.leaves, attempts as u64);
    assert_eq!(
        snapshot.channels.channels_created,
        snapshot.channels.channels_deleted
    );
}

/// Broadcasts racing with departures never deliver to a closed member.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_broadcast_racing_departure_skips_closed_members() {
    let server = create_test_server();
    let mut sender = DirectClient::connect(&server, 256);
    sender
        .send(&server, r#"{"type":"join","code":"race"}"#)
        .await;

    let mut leavers = Vec::new();
    for _ in 0..8 {
        let mut client = DirectClient::connect(&server, 256);
        client.send(&server, r#"{"type":"join","code":"race"}"#).await;
        leavers.push(client);
    }

    let barrier = Arc::new(Barrier::new(2));
    let server_clone = server.clone();
    let barrier_clone = barrier.clone();
    let broadcaster = tokio::spawn(async move {
        barrier_clone.wait().await;
        for i in 0..50 {
            sender
                .send(&server_clone, &format!(r#"{{"payload":{i}}}"#))
                .await;
        }
        sender
    });

    barrier.wait().await;
    for client in &mut leavers {
        server.unregister_client(&mut client.session);
    }
    let _sender = broadcaster.await.unwrap();

    for client in &mut leavers {
        client.drain();
        assert!(!client.session.handle().is_open());
        assert!(client.receiver.try_recv().is_err());
    }
    assert_eq!(server.registry().members_of("race").len(), 1);
}

/// Joins and departures racing on one channel: no member sees a peer's
/// `peer-left` before its `peer-joined`, or either notice twice.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_join_and_leave_notifications_keep_per_peer_order() {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Seen {
        Joined,
        Left,
    }

    let server = create_test_server();
    let mut observer = DirectClient::connect(&server, 1024);
    observer
        .send(&server, r#"{"type":"join","code":"ORDERED"}"#)
        .await;

    let attempts = 16usize;
    let barrier = Arc::new(Barrier::new(attempts));
    let mut handles = Vec::new();
    for _ in 0..attempts {
        let server_clone = server.clone();
        let barrier_clone = barrier.clone();
        handles.push(tokio::spawn(async move {
            let mut client = DirectClient::connect(&server_clone, 1024);
            barrier_clone.wait().await;
            client
                .send(&server_clone, r#"{"type":"join","code":"ORDERED"}"#)
                .await;
            tokio::task::yield_now().await;
            server_clone.unregister_client(&mut client.session);
            client
        }));
    }

    let mut clients = Vec::new();
    for handle in handles {
        clients.push(handle.await.unwrap());
    }

    let check = |client: &mut DirectClient| {
        let mut seen: HashMap<_, Seen> = HashMap::new();
        let mut joins = 0usize;
        for message in client.drain() {
            match message {
                ServerMessage::PeerJoined { peer_id } => {
                    let previous = seen.insert(peer_id, Seen::Joined);
                    assert_eq!(previous, None, "peer-joined for {peer_id} after a prior notice");
                    joins += 1;
                }
                ServerMessage::PeerLeft { peer_id } => {
                    let previous = seen.insert(peer_id, Seen::Left);
                    assert_ne!(previous, Some(Seen::Left), "duplicate peer-left for {peer_id}");
                }
                _ => {}
            }
        }
        (seen, joins)
    };

    for client in &mut clients {
        check(client);
    }

    // The observer joined first and outlived everyone, so each peer went joined then left.
    let (seen, joins) = check(&mut observer);
    assert_eq!(joins, attempts);
    assert_eq!(seen.len(), attempts);
    assert!(seen.values().all(|state| *state == Seen::Left));
    assert_eq!(server.registry().members_of("ORDERED").len(), 1);
}
