use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tessera_lib_core::{Error, Result};

/// Shared cancellation flag for one statement.
///
/// The owner (the session's transaction) raises it; long scans poll it at
/// their loop headers and unwind with [`Error::Canceled`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Execution-side view of the enclosing transaction.
#[derive(Debug, Clone, Default)]
pub struct ExecTx {
    pub session_id: u64,
    pub transaction_id: u64,
    cancel: CancelToken,
}

impl ExecTx {
    pub fn new(session_id: u64, transaction_id: u64) -> ExecTx {
        ExecTx {
            session_id,
            transaction_id,
            cancel: CancelToken::new(),
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn check_canceled(&self) -> Result<()> {
        if self.cancel.is_canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }
}
