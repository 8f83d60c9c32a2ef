//! Table manager for spawning and managing multiple table actors.

use super::{
    actor::{TableActor, TableHandle},
    config::TableConfig,
    messages::TableStatus,
};
use crate::game::{
    entities::{TableId, generate_id},
    showdown::WinnerResolver,
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;

/// Directory of live tables.
///
/// The directory lock is only ever held while scanning or updating the map.
/// Table state is read through each handle's status feed, never by
/// messaging a table, so this lock and a table's inbox are never held
/// together.
pub struct TableManager {
    /// Settings every new table starts with
    config: TableConfig,

    /// Showdown strategy shared by all tables
    resolver: Arc<dyn WinnerResolver>,

    /// Active table handles
    tables: Arc<RwLock<HashMap<TableId, TableHandle>>>,
}

impl TableManager {
    /// Create a new table manager
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration applied to every table
    /// * `resolver` - Winner resolution strategy
    ///
    /// # Returns
    ///
    /// * `TableManager` - New table manager instance
    pub fn new(config: TableConfig, resolver: Arc<dyn WinnerResolver>) -> Self {
        Self {
            config,
            resolver,
            tables: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Returns a waiting table with a free seat, creating one if none
    /// exists.
    pub async fn find_or_create(&self) -> TableHandle {
        let mut tables = self.tables.write().await;
        tables.retain(|_, handle| !handle.is_closed());

        if let Some(handle) = tables.values().find(|handle| handle.status().is_open()) {
            return handle.clone();
        }

        let handle = self.spawn_table();
        tables.insert(handle.table_id().to_string(), handle.clone());
        handle
    }

    /// Create and spawn a new table
    pub async fn create_table(&self) -> TableHandle {
        let handle = self.spawn_table();
        self.tables
            .write()
            .await
            .insert(handle.table_id().to_string(), handle.clone());
        handle
    }

    fn spawn_table(&self) -> TableHandle {
        let table_id = generate_id();
        let (actor, handle) =
            TableActor::new(table_id.clone(), self.config.clone(), self.resolver.clone());
        tokio::spawn(actor.run());
        log::info!("Created and spawned table {}", table_id);
        handle
    }

    /// Get table handle by ID
    pub async fn get_table(&self, table_id: &str) -> Option<TableHandle> {
        self.tables.read().await.get(table_id).cloned()
    }

    /// Number of registered tables
    pub async fn table_count(&self) -> usize {
        self.tables.read().await.len()
    }

    /// Latest status of every registered table
    pub async fn statuses(&self) -> Vec<TableStatus> {
        self.tables
            .read()
            .await
            .values()
            .map(TableHandle::status)
            .collect()
    }

    /// Close a table and remove it from the directory
    pub async fn close_table(&self, table_id: &str) -> Result<(), String> {
        let handle = self
            .tables
            .write()
            .await
            .remove(table_id)
            .ok_or_else(|| format!("Table {} not found", table_id))?;

        let response = handle.close().await;
        if let Some(err) = response.error_message() {
            return Err(err);
        }
        log::info!("Closed table {}", table_id);
        Ok(())
    }

    /// Closes and forgets tables that have sat empty for at least
    /// `max_idle`. Returns how many were reclaimed.
    pub async fn reclaim_idle(&self, max_idle: Duration) -> usize {
        let candidates: Vec<TableHandle> = self
            .tables
            .read()
            .await
            .values()
            .filter(|handle| {
                handle
                    .status()
                    .idle_since
                    .is_some_and(|since| since.elapsed() >= max_idle)
            })
            .cloned()
            .collect();

        let mut reclaimed = 0;
        for handle in candidates {
            // The table refuses if someone sat down since the scan.
            if handle.close_if_idle().await.is_success() {
                self.tables.write().await.remove(handle.table_id());
                log::info!("Reclaimed idle table {}", handle.table_id());
                reclaimed += 1;
            }
        }
        reclaimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::showdown::RandomWinner;

    fn manager() -> TableManager {
        TableManager::new(TableConfig::default(), Arc::new(RandomWinner))
    }

    #[tokio::test]
    async fn test_find_or_create_reuses_open_table() {
        let manager = manager();
        let first = manager.find_or_create().await;
        let second = manager.find_or_create().await;
        assert_eq!(first.table_id(), second.table_id());
        assert_eq!(manager.table_count().await, 1);
    }

    #[tokio::test]
    async fn test_close_table() {
        let manager = manager();
        let handle = manager.create_table().await;
        manager.close_table(handle.table_id()).await.unwrap();
        assert_eq!(manager.table_count().await, 0);
        assert!(manager.get_table(handle.table_id()).await.is_none());
        assert!(manager.close_table("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_reclaim_idle_empty_tables() {
        let manager = manager();
        manager.create_table().await;
        manager.create_table().await;
        assert_eq!(manager.reclaim_idle(Duration::from_secs(3600)).await, 0);
        assert_eq!(manager.reclaim_idle(Duration::ZERO).await, 2);
        assert_eq!(manager.table_count().await, 0);
    }
}
