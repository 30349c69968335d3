use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::driver::{Connection, ConnectionSource, IsolationLevel, Statement};
use crate::error::{BoxError, SqlStreamsError};

struct Shared {
    in_use: AtomicBool,
    connection: Mutex<Box<dyn Connection>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Box<dyn Connection>> {
        match self.connection.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Hands out one physical connection to at most one user at a time.
///
/// A second checkout while the first lease is open fails immediately with a
/// `StateError`; it never waits. Closing a lease returns the connection rather than
/// closing it: pending work is rolled back and auto-commit is restored.
#[derive(Clone)]
pub struct SingleConnectionSource {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SingleConnectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleConnectionSource")
            .field("in_use", &self.in_use())
            .finish()
    }
}

impl SingleConnectionSource {
    #[must_use]
    pub fn new(connection: Box<dyn Connection>) -> Self {
        Self {
            shared: Arc::new(Shared {
                in_use: AtomicBool::new(false),
                connection: Mutex::new(connection),
            }),
        }
    }

    /// Lease the connection.
    ///
    /// # Errors
    /// `StateError("Connection already in use")` if a lease is outstanding.
    pub fn checkout(&self) -> Result<LeasedConnection, SqlStreamsError> {
        if self.shared.in_use.swap(true, Ordering::AcqRel) {
            return Err(SqlStreamsError::state("Connection already in use"));
        }
        tracing::debug!("leased single connection");
        Ok(LeasedConnection {
            shared: Arc::clone(&self.shared),
            released: false,
        })
    }

    #[must_use]
    pub fn in_use(&self) -> bool {
        self.shared.in_use.load(Ordering::Acquire)
    }
}

impl ConnectionSource for SingleConnectionSource {
    fn get_connection(&self) -> Result<Box<dyn Connection>, SqlStreamsError> {
        Ok(Box::new(self.checkout()?))
    }

    /// Closes the physical connection.
    fn close(&self) -> Result<(), SqlStreamsError> {
        let mut conn = self.shared.lock();
        if conn.is_closed() {
            return Ok(());
        }
        conn.close()?;
        tracing::debug!("closed single connection");
        Ok(())
    }
}

/// Exclusive use of a [`SingleConnectionSource`]'s connection.
///
/// Every call except `close` and `is_closed` goes straight to the physical
/// connection. Dropping an unreleased lease releases it.
pub struct LeasedConnection {
    shared: Arc<Shared>,
    released: bool,
}

impl std::fmt::Debug for LeasedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeasedConnection")
            .field("released", &self.released)
            .finish()
    }
}

// Errors coming back through the lease keep the driver error as their source.
fn wrap(err: BoxError) -> BoxError {
    SqlStreamsError::from(err).into_box()
}

impl LeasedConnection {
    fn with_conn<R>(
        &self,
        f: impl FnOnce(&mut dyn Connection) -> Result<R, BoxError>,
    ) -> Result<R, BoxError> {
        if self.released {
            return Err(SqlStreamsError::state("connection lease already released").into_box());
        }
        let mut conn = self.shared.lock();
        f(&mut **conn).map_err(wrap)
    }

    fn release(&mut self) -> Result<(), BoxError> {
        if self.released {
            return Ok(());
        }
        let result = {
            let mut conn = self.shared.lock();
            let rolled_back = match conn.auto_commit() {
                Ok(true) => Ok(()),
                Ok(false) => conn.rollback(),
                Err(e) => Err(e),
            };
            let restored = conn.set_auto_commit(true);
            rolled_back.and(restored)
        };
        self.released = true;
        self.shared.in_use.store(false, Ordering::Release);
        tracing::debug!("returned single connection");
        result.map_err(wrap)
    }
}

impl Connection for LeasedConnection {
    fn prepare(&mut self, sql: &str) -> Result<Box<dyn Statement>, BoxError> {
        self.with_conn(|c| c.prepare(sql))
    }

    fn auto_commit(&self) -> Result<bool, BoxError> {
        self.with_conn(|c| c.auto_commit())
    }

    fn set_auto_commit(&mut self, auto_commit: bool) -> Result<(), BoxError> {
        self.with_conn(|c| c.set_auto_commit(auto_commit))
    }

    fn set_isolation_level(&mut self, level: IsolationLevel) -> Result<(), BoxError> {
        self.with_conn(|c| c.set_isolation_level(level))
    }

    fn commit(&mut self) -> Result<(), BoxError> {
        self.with_conn(|c| c.commit())
    }

    fn rollback(&mut self) -> Result<(), BoxError> {
        self.with_conn(|c| c.rollback())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        self.release()
    }

    fn is_closed(&self) -> bool {
        !self.shared.in_use.load(Ordering::Acquire)
    }
}

impl Drop for LeasedConnection {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "failed to return single connection");
        }
    }
}
