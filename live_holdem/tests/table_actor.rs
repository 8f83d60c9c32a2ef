/// Integration tests for table actors and the table registry
///
/// Players are stood in by plain channels: each test holds the receiving
/// end of a player's outbound queue and inspects what the table pushed.
use std::{sync::Arc, time::Duration};

use live_holdem::{
    TableConfig, TableManager,
    entities::{Action, Phase, Player, TableView},
    game::showdown::RandomWinner,
    liveness::StopSignal,
    messages::ServerMessage,
    table::{PlayerConnection, TableActor, TableHandle, TableMessage, TableResponse},
};
use tokio::sync::mpsc;

fn spawn_table(config: TableConfig) -> TableHandle {
    let (actor, handle) = TableActor::new("t1".to_string(), config, Arc::new(RandomWinner));
    tokio::spawn(actor.run());
    handle
}

fn connection(capacity: usize) -> (PlayerConnection, mpsc::Receiver<ServerMessage>) {
    let (tx, rx) = mpsc::channel(capacity);
    (PlayerConnection::new(tx, StopSignal::new()), rx)
}

fn player(id: &str) -> Player {
    Player::new(id.to_string(), format!("Player {id}"), 1000)
}

/// Everything queued so far, oldest first.
fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

fn last_state(messages: &[ServerMessage]) -> TableView {
    messages
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::GameState(view) => Some((**view).clone()),
            _ => None,
        })
        .expect("no game state pushed")
}

async fn wait_for(handle: &TableHandle, pred: impl Fn(&live_holdem::table::TableStatus) -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !pred(&handle.status()) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("table never reached the expected status");
}

#[tokio::test]
async fn test_second_join_starts_the_hand() {
    let handle = spawn_table(TableConfig::default());
    let (c0, mut rx0) = connection(16);
    let (c1, mut rx1) = connection(16);

    assert_eq!(handle.join(player("p0"), c0).await, TableResponse::Seated(0));
    assert_eq!(handle.join(player("p1"), c1).await, TableResponse::Seated(1));

    let view0 = last_state(&drain(&mut rx0));
    assert_eq!(view0.phase, Phase::Preflop);
    assert_eq!(view0.pot, 15);
    assert!(view0.your_turn);

    let messages1 = drain(&mut rx1);
    assert!(matches!(messages1[0], ServerMessage::Welcome(_)));
    let view1 = last_state(&messages1);
    assert!(!view1.your_turn);
    assert_eq!(view1.players[1].hole_cards.len(), 2);
    assert!(view1.players[0].hole_cards.is_empty());

    let (c2, _rx2) = connection(16);
    assert_eq!(
        handle.join(player("p2"), c2).await,
        TableResponse::HandInProgress
    );
}

#[tokio::test]
async fn test_rejected_action_reports_rule() {
    let handle = spawn_table(TableConfig::default());
    let (c0, _rx0) = connection(16);
    let (c1, _rx1) = connection(16);
    handle.join(player("p0"), c0).await;
    handle.join(player("p1"), c1).await;

    let response = handle.take_action("p1", Action::Fold).await;
    assert_eq!(response.error_message(), Some("Not your turn.".to_string()));
    assert_eq!(handle.take_action("p0", Action::Call).await, TableResponse::Success);
    assert_eq!(handle.status().phase, Phase::Flop);
}

#[tokio::test]
async fn test_chat_reaches_everyone() {
    let config = TableConfig {
        min_players: 3,
        ..TableConfig::default()
    };
    let handle = spawn_table(config);
    let (c0, mut rx0) = connection(16);
    let (c1, mut rx1) = connection(16);
    handle.join(player("p0"), c0).await;
    handle.join(player("p1"), c1).await;

    handle.chat("p0", "gl hf".to_string()).await.unwrap();
    // A view request round-trips through the inbox behind the chat.
    assert!(handle.view("p0").await.is_some());
    assert!(handle.view("ghost").await.is_none());

    for rx in [&mut rx0, &mut rx1] {
        let chat = drain(rx).into_iter().find_map(|m| match m {
            ServerMessage::Chat(chat) => Some(chat),
            _ => None,
        });
        let chat = chat.expect("chat not delivered");
        assert_eq!(chat.player_id, "p0");
        assert_eq!(chat.player_name, "Player p0");
        assert_eq!(chat.message, "gl hf");
    }
}

#[tokio::test]
async fn test_showdown_restarts_after_delay() {
    let config = TableConfig {
        showdown_delay_ms: 50,
        ..TableConfig::default()
    };
    let handle = spawn_table(config);
    let (c0, mut rx0) = connection(32);
    let (c1, _rx1) = connection(32);
    handle.join(player("p0"), c0).await;
    handle.join(player("p1"), c1).await;
    assert_eq!(handle.status().hand_number, 1);

    assert_eq!(handle.take_action("p0", Action::Fold).await, TableResponse::Success);
    assert_eq!(handle.status().phase, Phase::Showdown);

    let winner = drain(&mut rx0).into_iter().find_map(|m| match m {
        ServerMessage::Winner(winner) => Some(winner),
        _ => None,
    });
    let winner = winner.expect("winner not announced");
    assert_eq!(winner.player_id, "p1");
    assert_eq!(winner.amount, 15);

    wait_for(&handle, |status| status.hand_number == 2).await;
    assert_eq!(handle.status().phase, Phase::Preflop);
}

#[tokio::test]
async fn test_stale_restart_is_ignored() {
    let handle = spawn_table(TableConfig::default());
    let (c0, _rx0) = connection(16);
    let (c1, _rx1) = connection(16);
    handle.join(player("p0"), c0).await;
    handle.join(player("p1"), c1).await;

    // Hand 1 is still being bet, so a restart for it is stale.
    handle
        .send(TableMessage::RestartRound { hand_number: 1 })
        .await
        .unwrap();
    assert!(handle.view("p0").await.is_some());

    let status = handle.status();
    assert_eq!(status.hand_number, 1);
    assert_eq!(status.phase, Phase::Preflop);
}

#[tokio::test]
async fn test_failed_push_disconnects_only_that_player() {
    let config = TableConfig {
        min_players: 3,
        ..TableConfig::default()
    };
    let handle = spawn_table(config);
    let (c0, mut rx0) = connection(32);
    let (c1, mut rx1) = connection(32);
    let (c2, rx2) = connection(32);
    let stop2 = c2.stop.clone();
    handle.join(player("p0"), c0).await;
    handle.join(player("p1"), c1).await;
    handle.join(player("p2"), c2).await;
    assert_eq!(handle.status().phase, Phase::Preflop);
    drain(&mut rx0);
    drain(&mut rx1);

    // p2 posted the small blind; its connection goes away.
    drop(rx2);
    assert_eq!(handle.take_action("p1", Action::Call).await, TableResponse::Success);

    assert!(stop2.is_triggered());
    for rx in [&mut rx0, &mut rx1] {
        let messages = drain(rx);
        // Survivors got the pass p2 failed in, then the post-cleanup table.
        assert!(messages.len() >= 2);
        let view = last_state(&messages);
        assert_eq!(view.players.len(), 2);
        assert_eq!(view.phase, Phase::Flop);
        assert_eq!(view.pot, 25);
    }
    assert_eq!(handle.status().seated, 2);
}

#[tokio::test]
async fn test_failed_push_below_two_players_resets() {
    let handle = spawn_table(TableConfig::default());
    let (c0, mut rx0) = connection(32);
    let (c1, rx1) = connection(32);
    handle.join(player("p0"), c0).await;
    handle.join(player("p1"), c1).await;
    drain(&mut rx0);

    drop(rx1);
    assert_eq!(handle.take_action("p0", Action::Call).await, TableResponse::Success);

    let view = last_state(&drain(&mut rx0));
    assert_eq!(view.phase, Phase::Waiting);
    assert_eq!(view.players.len(), 1);
    assert_eq!(view.pot, 0);

    let status = handle.status();
    assert_eq!(status.phase, Phase::Waiting);
    assert!(status.is_open());
}

#[tokio::test]
async fn test_full_queue_counts_as_disconnect() {
    let handle = spawn_table(TableConfig::default());
    // Room for the welcome only; the state push that follows overflows.
    let (conn, _rx) = connection(1);
    let stop = conn.stop.clone();

    assert_eq!(handle.join(player("p0"), conn).await, TableResponse::Seated(0));
    assert!(stop.is_triggered());
    assert_eq!(handle.status().seated, 0);
}

#[tokio::test]
async fn test_disconnect_frees_the_seat() {
    let handle = spawn_table(TableConfig::default());
    let (c0, mut rx0) = connection(16);
    let (c1, _rx1) = connection(16);
    handle.join(player("p0"), c0).await;
    handle.join(player("p1"), c1).await;

    handle.disconnect("p1").await.unwrap();
    assert!(handle.view("p1").await.is_none());

    let view = last_state(&drain(&mut rx0));
    assert_eq!(view.players.len(), 1);
    assert_eq!(view.phase, Phase::Waiting);
}

// === Registry ===

#[tokio::test]
async fn test_concurrent_joins_all_get_seats() {
    let manager = Arc::new(TableManager::new(
        TableConfig::default(),
        Arc::new(RandomWinner),
    ));

    let mut tasks = Vec::new();
    for i in 0..20 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            let (conn, rx) = connection(64);
            loop {
                let table = manager.find_or_create().await;
                let response = table.join(player(&format!("p{i}")), conn.clone()).await;
                match response {
                    TableResponse::Seated(_) => return (table.table_id().to_string(), rx),
                    r if r.is_retryable() => continue,
                    other => panic!("unexpected join response {other:?}"),
                }
            }
        }));
    }

    let mut receivers = Vec::new();
    for task in tasks {
        receivers.push(task.await.unwrap());
    }

    let statuses = manager.statuses().await;
    assert_eq!(statuses.iter().map(|s| s.seated).sum::<usize>(), 20);
    assert!(statuses.iter().all(|s| s.seated <= s.max_players));
    assert_eq!(statuses.len(), manager.table_count().await);
}

#[tokio::test]
async fn test_registry_skips_tables_mid_hand() {
    let manager = TableManager::new(TableConfig::default(), Arc::new(RandomWinner));
    let first = manager.find_or_create().await;
    let (c0, _rx0) = connection(16);
    let (c1, _rx1) = connection(16);
    first.join(player("p0"), c0).await;
    first.join(player("p1"), c1).await;

    let second = manager.find_or_create().await;
    assert_ne!(first.table_id(), second.table_id());
    assert_eq!(manager.table_count().await, 2);
}
