use tessera_lib_core::{Error, Result};
use tracing::{info, warn};

use crate::manager::Manager;
use crate::session::Session;

/// Interactive callers get this many tries at authentication.
pub const MAX_ATTEMPTS: usize = 3;

/// Where the gate reads `(user, password)` pairs from: the wire handshake,
/// a terminal prompt, or fixed tool arguments.
pub trait CredentialSource {
    fn read_credentials(&mut self) -> Result<(String, String)>;

    /// Interactive sources are re-prompted on authentication failures.
    fn is_interactive(&self) -> bool {
        false
    }
}

/// Single-shot credentials for scripted callers.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    pub user: String,
    pub password: String,
}

impl CredentialSource for StaticCredentials {
    fn read_credentials(&mut self) -> Result<(String, String)> {
        Ok((self.user.clone(), self.password.clone()))
    }
}

/// Session admission: verify the caller and create the session bound to the
/// requested database.
///
/// Only authentication-class failures are retried, and only for interactive
/// sources; everything else surfaces immediately. The verifier itself is
/// stateless, the retry policy lives here.
pub fn admit(
    manager: &Manager,
    source: &mut dyn CredentialSource,
    database: &str,
) -> Result<Session> {
    if !manager.is_available() {
        return Err(Error::ServerNotAvailable);
    }

    let attempts = if source.is_interactive() {
        MAX_ATTEMPTS
    } else {
        1
    };

    for attempt in 1..=attempts {
        let (user, password) = source.read_credentials()?;
        match manager.verify_password(&user, &password) {
            Ok(entry) => {
                let mut session = Session::new(database);
                if let Some(entry) = entry {
                    session.set_user(user, &entry);
                }
                info!(session = session.id(), database, "session admitted");
                return Ok(session);
            }
            Err(cause) if cause.is_authentication() && attempt < attempts => {
                warn!(%cause, attempt, "authentication failed, retrying");
            }
            Err(cause) => {
                manager.report_fatal(&cause);
                return Err(cause);
            }
        }
    }
    Err(Error::AuthorizationFailed)
}

/// Privileged admission variant used by shutdown: the verified identity
/// must be a super-user when password management is enabled.
pub fn admit_shutdown(manager: &Manager, source: &mut dyn CredentialSource) -> Result<()> {
    if !manager.is_available() {
        return Err(Error::ServerNotAvailable);
    }
    let (user, password) = source.read_credentials()?;
    match manager.verify_password(&user, &password)? {
        None => Ok(()),
        Some(entry) if entry.is_super_user() => Ok(()),
        Some(_) => Err(Error::AuthorizationFailed),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::manager::ServerConfig;
    use crate::password_file::PasswordFile;
    use crate::user::{Md5Digest, UserCategory, UserEntry, UserList};

    struct Scripted {
        answers: VecDeque<(String, String)>,
        interactive: bool,
    }

    impl Scripted {
        fn new(answers: &[(&str, &str)], interactive: bool) -> Scripted {
            Scripted {
                answers: answers
                    .iter()
                    .map(|(u, p)| (u.to_string(), p.to_string()))
                    .collect(),
                interactive,
            }
        }
    }

    impl CredentialSource for Scripted {
        fn read_credentials(&mut self) -> Result<(String, String)> {
            self.answers
                .pop_front()
                .ok_or(Error::ConnectionRanOut)
        }

        fn is_interactive(&self) -> bool {
            self.interactive
        }
    }

    fn manager_with_users(dir: &std::path::Path) -> Manager {
        let path = dir.join("passwd");
        let list = UserList::new();
        list.add(
            "alice",
            UserEntry::new(Md5Digest::of("pw"), 1, UserCategory::DbUser),
            false,
        )
        .unwrap();
        list.add(
            "root",
            UserEntry::new(Md5Digest::of("admin"), 0, UserCategory::SuperUser),
            false,
        )
        .unwrap();
        list.save(&PasswordFile::new(&path)).unwrap();

        Manager::initialize(&ServerConfig {
            password_file: Some(path),
        })
        .unwrap()
    }

    #[test]
    fn interactive_callers_get_three_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_users(dir.path());

        let mut source = Scripted::new(
            &[("alice", "wrong"), ("alice", "worse"), ("Alice", "pw")],
            true,
        );
        let session = admit(&manager, &mut source, "db").unwrap();
        assert_eq!(session.user_id(), Some(1));
        assert!(!session.is_super_user());
    }

    #[test]
    fn scripted_callers_get_one_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_users(dir.path());

        let mut source = Scripted::new(&[("alice", "wrong"), ("alice", "pw")], false);
        assert!(matches!(
            admit(&manager, &mut source, "db"),
            Err(Error::AuthorizationFailed)
        ));
    }

    #[test]
    fn unavailable_server_rejects_admission() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_users(dir.path());
        manager.set_available(false);

        let mut source = Scripted::new(&[("alice", "pw")], false);
        assert!(matches!(
            admit(&manager, &mut source, "db"),
            Err(Error::ServerNotAvailable)
        ));
    }

    #[test]
    fn shutdown_requires_super_user() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager_with_users(dir.path());

        let mut alice = Scripted::new(&[("alice", "pw")], false);
        assert!(matches!(
            admit_shutdown(&manager, &mut alice),
            Err(Error::AuthorizationFailed)
        ));

        let mut root = Scripted::new(&[("root", "admin")], false);
        admit_shutdown(&manager, &mut root).unwrap();
    }
}
