use std::sync::atomic::{AtomicU64, Ordering};

use tessera_lib::ExecTx;
use tessera_lib_core::{Error, Result};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    NotStarted,
    InProgress,
    Committed,
    RolledBack,
}

/// The session's transaction object.
///
/// A read-only transaction begins lazily on first use; an explicit BEGIN
/// replaces it. The statement cancellation flag lives here and is shared
/// with the execution side through [`ExecTx`].
#[derive(Debug)]
pub struct Transaction {
    session_id: u64,
    state: TxState,
    mode: AccessMode,
    exec: ExecTx,
}

impl Transaction {
    pub fn new(session_id: u64) -> Transaction {
        Transaction {
            session_id,
            state: TxState::NotStarted,
            mode: AccessMode::ReadOnly,
            exec: ExecTx::new(session_id, 0),
        }
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == TxState::InProgress
    }

    /// Explicit BEGIN.
    pub fn begin(&mut self, mode: AccessMode) -> Result<()> {
        if self.is_in_progress() {
            return Err(Error::BadArgument("transaction already in progress".into()));
        }
        self.start(mode);
        Ok(())
    }

    /// Implicit read-only begin used by statements outside an explicit
    /// transaction.
    pub fn begin_implicit(&mut self) {
        if !self.is_in_progress() {
            self.start(AccessMode::ReadOnly);
        }
    }

    fn start(&mut self, mode: AccessMode) {
        let id = NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed);
        self.mode = mode;
        self.state = TxState::InProgress;
        self.exec = ExecTx::new(self.session_id, id);
    }

    pub fn commit(&mut self) -> Result<()> {
        if !self.is_in_progress() {
            return Err(Error::BadArgument("no transaction in progress".into()));
        }
        self.state = TxState::Committed;
        Ok(())
    }

    pub fn rollback(&mut self) -> Result<()> {
        if !self.is_in_progress() {
            return Err(Error::BadArgument("no transaction in progress".into()));
        }
        self.state = TxState::RolledBack;
        Ok(())
    }

    /// Raise the statement cancellation flag; polled at scan loop headers.
    pub fn cancel_statement(&self) {
        self.exec.cancel_token().cancel();
    }

    pub fn is_canceled_statement(&self) -> bool {
        self.exec.cancel_token().is_canceled()
    }

    /// Execution-side view handed to the driver.
    pub fn exec_tx(&self) -> &ExecTx {
        &self.exec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lazy_read_only_begin() {
        let mut tx = Transaction::new(7);
        assert_eq!(tx.state(), TxState::NotStarted);

        tx.begin_implicit();
        assert!(tx.is_in_progress());
        assert_eq!(tx.mode(), AccessMode::ReadOnly);

        // A second implicit begin is a no-op.
        tx.begin_implicit();
        assert!(tx.is_in_progress());

        tx.commit().unwrap();
        assert_eq!(tx.state(), TxState::Committed);
        assert!(tx.commit().is_err());
    }

    #[test]
    fn explicit_begin_rejects_nesting() {
        let mut tx = Transaction::new(7);
        tx.begin(AccessMode::ReadWrite).unwrap();
        assert!(tx.begin(AccessMode::ReadOnly).is_err());
        tx.rollback().unwrap();
        tx.begin(AccessMode::ReadOnly).unwrap();
        assert!(tx.is_in_progress());
    }

    #[test]
    fn cancellation_reaches_the_exec_view() {
        let tx = Transaction::new(7);
        assert!(!tx.is_canceled_statement());
        tx.cancel_statement();
        assert!(tx.is_canceled_statement());
        assert!(tx.exec_tx().check_canceled().is_err());
    }
}
