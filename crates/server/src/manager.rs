use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use tessera_lib_core::{Error, Result};
use tracing::{error, info};

use crate::password_file::PasswordFile;
use crate::session::Session;
use crate::user::{UserEntry, UserList};

/// Server-side configuration consumed at initialization.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Password management is enabled iff a path is configured.
    pub password_file: Option<PathBuf>,
}

/// Owner of the process-wide singletons: the user list, its password file,
/// and the availability flag every admission consults.
#[derive(Debug)]
pub struct Manager {
    password_file: Option<PasswordFile>,
    user_list: Option<UserList>,
    available: AtomicBool,
}

impl Manager {
    /// Initialize once at startup. A leftover backup file from an
    /// interrupted persist is rolled back before the list is loaded.
    pub fn initialize(config: &ServerConfig) -> Result<Manager> {
        let (password_file, user_list) = match &config.password_file {
            Some(path) => {
                PasswordFile::revert_backup_file(path)?;
                let file = PasswordFile::new(path);
                let list = file.get_user_list()?;
                (Some(file), Some(list))
            }
            None => (None, None),
        };
        Ok(Manager {
            password_file,
            user_list,
            available: AtomicBool::new(true),
        })
    }

    pub fn is_password_enabled(&self) -> bool {
        self.user_list.is_some()
    }

    pub fn user_list(&self) -> Option<&UserList> {
        self.user_list.as_ref()
    }

    pub fn password_file(&self) -> Option<&PasswordFile> {
        self.password_file.as_ref()
    }

    /// Resolve a session's effective identity.
    ///
    /// With password management disabled any supplied name is logged and
    /// ignored for backward compatibility, and no identity is attached.
    pub fn verify_password(&self, name: &str, password: &str) -> Result<Option<UserEntry>> {
        match &self.user_list {
            None => {
                if !name.is_empty() {
                    info!(name, "password management is disabled; user name ignored");
                }
                Ok(None)
            }
            Some(list) => list.verify_password(name, password).map(Some),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Route an unrecoverable error: fatal kinds flip the process-wide
    /// flag (logged once) so new admissions fail fast.
    pub fn report_fatal(&self, cause: &Error) {
        if cause.is_fatal() && self.available.swap(false, Ordering::AcqRel) {
            error!(%cause, "server became unavailable");
        }
    }

    /// Shutdown teardown: refuse new work and drop session bookkeeping.
    pub fn terminate(&self) {
        self.set_available(false);
        Session::clear_availability();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_password_management_ignores_names() {
        let manager = Manager::initialize(&ServerConfig::default()).unwrap();
        assert!(!manager.is_password_enabled());
        assert!(manager.verify_password("anyone", "pw").unwrap().is_none());
        assert!(manager.verify_password("", "").unwrap().is_none());
    }

    #[test]
    fn fatal_errors_poison_availability_once() {
        let manager = Manager::initialize(&ServerConfig::default()).unwrap();
        assert!(manager.is_available());

        manager.report_fatal(&Error::Canceled);
        assert!(manager.is_available());

        manager.report_fatal(&Error::MemoryExhaust);
        assert!(!manager.is_available());
    }
}
