use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info};

use crate::store::StoreError;

/// Opens and closes raw connections to the credential store.
///
/// The pool is generic over this seam so tests can drive it with an
/// in-memory manager instead of a live Postgres.
#[async_trait]
pub trait ManageConnection: Send + Sync {
    type Connection: Send;

    async fn connect(&self) -> Result<Self::Connection, StoreError>;
    async fn close(&self, conn: Self::Connection);
}

/// Bounded, reusable set of live store connections.
///
/// `min` connections are opened eagerly at construction and kept warm; up
/// to `max` may be checked out at once. When the pool is saturated,
/// `acquire` waits instead of rejecting, bounding concurrent load on the
/// store.
pub struct StorePool<M: ManageConnection> {
    manager: M,
    permits: Semaphore,
    idle: Mutex<Vec<M::Connection>>,
}

impl<M: ManageConnection> StorePool<M> {
    /// Establish the pool, opening `min` warm connections up front.
    ///
    /// Fails with [`StoreError::Setup`] if the store is unreachable or
    /// rejects our credentials.
    pub async fn connect(manager: M, min: u32, max: u32) -> Result<Self, StoreError> {
        let max = max.max(1);
        let min = min.min(max);
        let mut idle = Vec::with_capacity(min as usize);
        for _ in 0..min {
            idle.push(manager.connect().await?);
        }
        info!(min, max, "store pool established");
        Ok(Self {
            manager,
            permits: Semaphore::new(max as usize),
            idle: Mutex::new(idle),
        })
    }

    /// Check a connection out of the pool, waiting while all `max` are in
    /// use. Connections beyond the warm set are opened lazily on demand.
    pub async fn acquire(&self) -> Result<PooledSession<'_, M>, StoreError> {
        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| StoreError::PoolClosed)?;

        // Holding a permit means we are within the `max` bound, so a miss
        // on the idle set allows opening a fresh connection.
        let reused = self.idle.lock().expect("pool mutex poisoned").pop();
        let conn = match reused {
            Some(conn) => conn,
            None => self.manager.connect().await?,
        };
        debug!("store connection checked out");
        Ok(PooledSession {
            conn: Some(conn),
            pool: self,
            _permit: permit,
        })
    }

    /// Close the pool: pending and future `acquire` calls fail with
    /// [`StoreError::PoolClosed`] and all idle connections are closed.
    pub async fn shutdown(&self) {
        self.permits.close();
        let drained: Vec<M::Connection> = {
            let mut idle = self.idle.lock().expect("pool mutex poisoned");
            idle.drain(..).collect()
        };
        for conn in drained {
            self.manager.close(conn).await;
        }
        info!("store pool shut down");
    }

    #[cfg(test)]
    fn idle_count(&self) -> usize {
        self.idle.lock().unwrap().len()
    }
}

/// One checked-out connection, scoped to a single logical operation.
///
/// Derefs to the raw connection. Transaction discipline rides on the
/// connection itself: begin a transaction on the session and commit
/// explicitly; a transaction dropped on an error path rolls back before
/// the connection is handed out again. The connection always returns to
/// the pool when the session drops, on every exit path.
pub struct PooledSession<'a, M: ManageConnection> {
    conn: Option<M::Connection>,
    pool: &'a StorePool<M>,
    _permit: SemaphorePermit<'a>,
}

impl<M: ManageConnection> Deref for PooledSession<'_, M> {
    type Target = M::Connection;

    fn deref(&self) -> &M::Connection {
        // `conn` is only taken in drop.
        self.conn.as_ref().expect("session connection missing")
    }
}

impl<M: ManageConnection> DerefMut for PooledSession<'_, M> {
    fn deref_mut(&mut self) -> &mut M::Connection {
        self.conn.as_mut().expect("session connection missing")
    }
}

impl<M: ManageConnection> Drop for PooledSession<'_, M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Ok(mut idle) = self.pool.idle.lock() {
                idle.push(conn);
                debug!("store connection returned to pool");
            }
        }
    }
}
