//! Server-side state around the execution runtime: authenticated sessions,
//! their transactions and privileges, the persistent user list, and the
//! replication handoff queue.

pub mod admission;
pub mod manager;
pub mod password_file;
pub mod privilege;
pub mod replication;
pub mod session;
pub mod transaction;
pub mod user;

pub use manager::Manager;
pub use session::{Session, SessionId};
pub use transaction::Transaction;
pub use user::{UserCategory, UserEntry, UserId, UserList};
