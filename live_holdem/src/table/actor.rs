//! Table actor implementation with async message handling.
//!
//! The actor is the only owner of its [`Table`]. Messages are handled one
//! at a time, so a join, an action, a cleanup pass and the broadcast that
//! follows it always see a single consistent version of the table.

use super::{
    config::TableConfig,
    messages::{PlayerConnection, TableMessage, TableResponse, TableStatus},
};
use crate::{
    game::{
        HandProgress, Table,
        entities::{Action, Phase, Player, PlayerId, TableId, TableView},
        showdown::WinnerResolver,
    },
    net::messages::{ChatNotice, ServerMessage, Welcome, WinnerNotice},
};
use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::sync::{mpsc, oneshot, watch};

/// Inbox depth for each table actor.
const INBOX_CAPACITY: usize = 100;

/// Table actor handle for sending messages
#[derive(Clone, Debug)]
pub struct TableHandle {
    sender: mpsc::Sender<TableMessage>,
    table_id: TableId,
    status: watch::Receiver<TableStatus>,
}

impl TableHandle {
    /// Create a new table handle
    pub fn new(
        sender: mpsc::Sender<TableMessage>,
        table_id: TableId,
        status: watch::Receiver<TableStatus>,
    ) -> Self {
        Self {
            sender,
            table_id,
            status,
        }
    }

    /// Get table ID
    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    /// Latest status published by the actor.
    pub fn status(&self) -> TableStatus {
        self.status.borrow().clone()
    }

    /// Whether the actor has stopped taking messages.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the table
    pub async fn send(&self, message: TableMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .await
            .map_err(|_| "Table is closed".to_string())
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<TableResponse>) -> TableMessage,
    ) -> TableResponse {
        let (tx, rx) = oneshot::channel();
        if let Err(e) = self.send(build(tx)).await {
            return TableResponse::Error(e);
        }
        rx.await
            .unwrap_or_else(|_| TableResponse::Error("Table is closed".to_string()))
    }

    /// Seat `player` and register the connection the table pushes to.
    pub async fn join(&self, player: Player, connection: PlayerConnection) -> TableResponse {
        self.request(|response| TableMessage::Join {
            player,
            connection,
            response,
        })
        .await
    }

    pub async fn take_action(&self, player_id: &str, action: Action) -> TableResponse {
        let player_id = player_id.to_string();
        self.request(|response| TableMessage::TakeAction {
            player_id,
            action,
            response,
        })
        .await
    }

    pub async fn chat(&self, player_id: &str, message: String) -> Result<(), String> {
        self.send(TableMessage::Chat {
            player_id: player_id.to_string(),
            message,
        })
        .await
    }

    pub async fn disconnect(&self, player_id: &str) -> Result<(), String> {
        self.send(TableMessage::Disconnect {
            player_id: player_id.to_string(),
        })
        .await
    }

    /// The table as `player_id` sees it, if they are seated.
    pub async fn view(&self, player_id: &str) -> Option<TableView> {
        let (tx, rx) = oneshot::channel();
        self.send(TableMessage::GetView {
            player_id: player_id.to_string(),
            response: tx,
        })
        .await
        .ok()?;
        rx.await.ok().flatten()
    }

    pub async fn close(&self) -> TableResponse {
        self.request(|response| TableMessage::Close {
            if_idle: false,
            response,
        })
        .await
    }

    /// Closes the table only if nobody is seated.
    pub async fn close_if_idle(&self) -> TableResponse {
        self.request(|response| TableMessage::Close {
            if_idle: true,
            response,
        })
        .await
    }
}

/// Table actor managing a single poker table
pub struct TableActor {
    /// Table ID
    id: TableId,

    /// Table configuration
    config: TableConfig,

    /// Roster, board and betting state
    table: Table,

    /// Showdown strategy
    resolver: Arc<dyn WinnerResolver>,

    /// Message inbox
    inbox: mpsc::Receiver<TableMessage>,

    /// Used by restart timers. Weak, so pending timers don't keep an
    /// abandoned table alive.
    timer_sender: mpsc::WeakSender<TableMessage>,

    /// Outbound queues of seated players
    connections: HashMap<PlayerId, PlayerConnection>,

    /// Status feed for the registry
    status: watch::Sender<TableStatus>,

    /// When the roster last became empty
    idle_since: Option<Instant>,

    /// Is table closed
    is_closed: bool,
}

impl TableActor {
    /// Create a new table actor
    ///
    /// # Arguments
    ///
    /// * `id` - Table ID
    /// * `config` - Table configuration
    /// * `resolver` - Showdown strategy
    ///
    /// # Returns
    ///
    /// * `(TableActor, TableHandle)` - Actor and handle for sending messages
    pub fn new(
        id: TableId,
        config: TableConfig,
        resolver: Arc<dyn WinnerResolver>,
    ) -> (Self, TableHandle) {
        let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);
        let table = Table::new(
            id.clone(),
            config.blinds(),
            config.max_players,
            config.min_players,
        );
        let idle_since = Some(Instant::now());
        let (status, status_rx) = watch::channel(TableStatus {
            phase: Phase::Waiting,
            seated: 0,
            connected: 0,
            max_players: config.max_players,
            hand_number: 0,
            idle_since,
            closed: false,
        });

        let actor = Self {
            id: id.clone(),
            config,
            table,
            resolver,
            inbox,
            timer_sender: sender.downgrade(),
            connections: HashMap::new(),
            status,
            idle_since,
            is_closed: false,
        };

        let handle = TableHandle::new(sender, id, status_rx);

        (actor, handle)
    }

    /// Run the table actor event loop
    pub async fn run(mut self) {
        log::info!(
            "Table {} starting ({} seats, blinds {})",
            self.id,
            self.config.max_players,
            self.config.blinds()
        );

        // Handlers that reply publish status before answering, so a caller
        // never sees a status older than its own request.
        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message);
            self.publish_status();

            if self.is_closed {
                break;
            }
        }

        for (_, connection) in self.connections.drain() {
            connection.stop.trigger();
        }
        self.is_closed = true;
        self.publish_status();
        log::info!("Table {} closed", self.id);
    }

    /// Handle a table message
    fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Join {
                player,
                connection,
                response,
            } => {
                let result = self.handle_join(player, connection);
                self.publish_status();
                let _ = response.send(result);
            }

            TableMessage::TakeAction {
                player_id,
                action,
                response,
            } => {
                let result = self.handle_action(&player_id, action);
                self.publish_status();
                let _ = response.send(result);
            }

            TableMessage::Chat { player_id, message } => {
                self.handle_chat(&player_id, message);
            }

            TableMessage::Disconnect { player_id } => {
                self.handle_disconnect(&player_id);
            }

            TableMessage::RestartRound { hand_number } => {
                self.handle_restart(hand_number);
            }

            TableMessage::GetView {
                player_id,
                response,
            } => {
                let view = self
                    .table
                    .player(&player_id)
                    .map(|_| self.table.view_for(&player_id));
                let _ = response.send(view);
            }

            TableMessage::Close { if_idle, response } => {
                if if_idle && !self.table.is_empty() {
                    let _ = response.send(TableResponse::Error("Table is not idle".to_string()));
                    return;
                }
                self.is_closed = true;
                self.publish_status();
                let _ = response.send(TableResponse::Success);
            }
        }
    }

    fn handle_join(&mut self, player: Player, connection: PlayerConnection) -> TableResponse {
        let player_id = player.id.clone();
        let player_name = player.name.clone();

        let seat = match self.table.seat(player) {
            Ok(seat) => seat,
            Err(e) => {
                log::debug!("Table {}: refused seat to {}: {}", self.id, player_id, e);
                return e.into();
            }
        };
        self.connections.insert(player_id.clone(), connection);
        self.push(
            &player_id,
            ServerMessage::Welcome(Welcome {
                player_id: player_id.clone(),
                player_name,
                table_id: self.id.clone(),
            }),
        );

        if self.table.phase() == Phase::Waiting
            && self.table.connected_count() >= self.config.min_players
        {
            let progress = self.table.start_round(self.resolver.as_ref());
            self.handle_progress(progress);
        }
        self.broadcast_state();

        TableResponse::Seated(seat)
    }

    fn handle_action(&mut self, player_id: &str, action: Action) -> TableResponse {
        match self
            .table
            .take_action(player_id, action, self.resolver.as_ref())
        {
            Ok(progress) => {
                self.handle_progress(progress);
                self.broadcast_state();
                TableResponse::Success
            }
            Err(e) => {
                log::debug!(
                    "Table {}: rejected {} from {}: {}",
                    self.id,
                    action,
                    player_id,
                    e
                );
                e.into()
            }
        }
    }

    fn handle_chat(&mut self, player_id: &str, message: String) {
        let Some(player) = self.table.player(player_id).filter(|p| p.connected) else {
            log::debug!("Table {}: chat from unseated {}", self.id, player_id);
            return;
        };
        let notice = ChatNotice {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            message,
        };
        self.push_to_all(&ServerMessage::Chat(notice));
        // A failed chat push may have disconnected someone.
        self.broadcast_if_departed();
    }

    fn handle_disconnect(&mut self, player_id: &str) {
        if self.table.mark_disconnected(player_id) {
            if let Some(connection) = self.connections.get(player_id) {
                connection.stop.trigger();
            }
            self.broadcast_state();
        }
    }

    fn handle_restart(&mut self, hand_number: u64) {
        if self.table.phase() != Phase::Showdown || self.table.hand_number() != hand_number {
            log::debug!(
                "Table {}: ignoring stale restart for hand #{}",
                self.id,
                hand_number
            );
            return;
        }
        let progress = self.table.start_round(self.resolver.as_ref());
        self.handle_progress(progress);
        self.broadcast_state();
    }

    /// Announces showdown results and arms the restart timer.
    fn handle_progress(&mut self, progress: HandProgress) {
        match progress {
            HandProgress::Showdown(awards) => {
                for award in &awards {
                    self.push_to_all(&ServerMessage::Winner(WinnerNotice::from(award)));
                }
                self.schedule_restart();
            }
            HandProgress::StreetDealt(phase) => {
                log::debug!("Table {}: dealt {}", self.id, phase);
            }
            HandProgress::Waiting | HandProgress::InProgress => {}
        }
    }

    fn schedule_restart(&self) {
        let hand_number = self.table.hand_number();
        let delay = self.config.showdown_delay();
        let sender = self.timer_sender.clone();
        log::info!(
            "Table {}: hand #{} over, next hand in {:?}",
            self.id,
            hand_number,
            delay
        );
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = sender.upgrade() {
                let _ = sender
                    .send(TableMessage::RestartRound { hand_number })
                    .await;
            }
        });
    }

    /// Queues `message` for one player. A full or closed queue counts as a
    /// lost connection.
    fn push(&mut self, player_id: &str, message: ServerMessage) -> bool {
        let result = match self.connections.get(player_id) {
            Some(connection) => connection.outbound.try_send(message),
            None => return false,
        };
        match result {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                log::warn!(
                    "Table {}: outbound queue for {} is full, disconnecting",
                    self.id,
                    player_id
                );
                self.fail_connection(player_id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                log::debug!(
                    "Table {}: connection for {} is gone",
                    self.id,
                    player_id
                );
                self.fail_connection(player_id);
                false
            }
        }
    }

    fn push_to_all(&mut self, message: &ServerMessage) {
        for player_id in self.connected_ids() {
            self.push(&player_id, message.clone());
        }
    }

    fn fail_connection(&mut self, player_id: &str) {
        self.table.mark_disconnected(player_id);
        if let Some(connection) = self.connections.get(player_id) {
            connection.stop.trigger();
        }
    }

    fn connected_ids(&self) -> Vec<PlayerId> {
        self.table
            .players()
            .iter()
            .filter(|p| p.connected)
            .map(|p| p.id.clone())
            .collect()
    }

    fn broadcast_if_departed(&mut self) {
        if self.table.connected_count() < self.table.players().len() {
            self.broadcast_state();
        }
    }

    /// Pushes every connected player their own view, then prunes whoever
    /// dropped along the way. Repeats until a pass loses nobody, so the
    /// survivors always end up holding the post-cleanup table.
    fn broadcast_state(&mut self) {
        loop {
            for player_id in self.connected_ids() {
                let view = self.table.view_for(&player_id);
                self.push(&player_id, ServerMessage::GameState(Box::new(view)));
            }

            let report = self.table.prune_disconnected();
            if report.removed.is_empty() {
                break;
            }
            for player_id in &report.removed {
                if let Some(connection) = self.connections.remove(player_id) {
                    connection.stop.trigger();
                }
            }
            if !report.reset_to_waiting && self.table.phase().is_betting() {
                let progress = self
                    .table
                    .resume_after_departure(self.resolver.as_ref());
                self.handle_progress(progress);
            }
        }
    }

    fn publish_status(&mut self) {
        match (self.table.is_empty(), self.idle_since) {
            (true, None) => self.idle_since = Some(Instant::now()),
            (false, Some(_)) => self.idle_since = None,
            _ => {}
        }
        self.status.send_replace(TableStatus {
            phase: self.table.phase(),
            seated: self.table.players().len(),
            connected: self.table.connected_count(),
            max_players: self.config.max_players,
            hand_number: self.table.hand_number(),
            idle_since: self.idle_since,
            closed: self.is_closed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::showdown::RandomWinner;
    use crate::net::liveness::StopSignal;

    fn spawn_table(config: TableConfig) -> TableHandle {
        let (actor, handle) = TableActor::new("t1".to_string(), config, Arc::new(RandomWinner));
        tokio::spawn(actor.run());
        handle
    }

    fn connection(capacity: usize) -> (PlayerConnection, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (PlayerConnection::new(tx, StopSignal::new()), rx)
    }

    #[tokio::test]
    async fn test_join_sends_welcome_then_state() {
        let handle = spawn_table(TableConfig::default());
        let (conn, mut rx) = connection(8);
        let response = handle
            .join(Player::new("p1".into(), "Alice".into(), 1000), conn)
            .await;
        assert_eq!(response, TableResponse::Seated(0));

        match rx.recv().await {
            Some(ServerMessage::Welcome(welcome)) => {
                assert_eq!(welcome.player_id, "p1");
                assert_eq!(welcome.table_id, "t1");
            }
            other => panic!("expected welcome, got {other:?}"),
        }
        match rx.recv().await {
            Some(ServerMessage::GameState(view)) => {
                assert_eq!(view.phase, Phase::Waiting);
                assert_eq!(view.players.len(), 1);
            }
            other => panic!("expected state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_tracks_roster() {
        let handle = spawn_table(TableConfig::default());
        assert!(handle.status().is_open());
        assert!(handle.status().idle_since.is_some());

        let (conn, _rx) = connection(8);
        handle
            .join(Player::new("p1".into(), "Alice".into(), 1000), conn)
            .await;
        let status = handle.status();
        assert_eq!(status.seated, 1);
        assert!(status.idle_since.is_none());
    }

    #[tokio::test]
    async fn test_close_stops_connections() {
        let handle = spawn_table(TableConfig::default());
        let (conn, _rx) = connection(8);
        let stop = conn.stop.clone();
        handle
            .join(Player::new("p1".into(), "Alice".into(), 1000), conn)
            .await;

        assert_eq!(handle.close().await, TableResponse::Success);
        tokio::time::timeout(std::time::Duration::from_secs(1), stop.triggered())
            .await
            .unwrap();
        assert!(handle.status().closed);
    }
}
