use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use ahash::AHashMap;
use parking_lot::RwLock;
use tessera_lib_core::{Error, Result};
use unicase::UniCase;

use crate::password_file::{self, PasswordFile};

pub type UserId = i32;

/// Administrative authority carried by a user record.
///
/// `Invalid` marks a corrupt password record; the entry is kept so its id is
/// never handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCategory {
    SuperUser,
    DbUser,
    OsUser,
    Invalid,
}

impl UserCategory {
    pub fn from_code(code: i32) -> Option<UserCategory> {
        match code {
            0 => Some(UserCategory::SuperUser),
            1 => Some(UserCategory::DbUser),
            2 => Some(UserCategory::OsUser),
            9999 => Some(UserCategory::Invalid),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            UserCategory::SuperUser => 0,
            UserCategory::DbUser => 1,
            UserCategory::OsUser => 2,
            UserCategory::Invalid => 9999,
        }
    }
}

/// MD5 password digest in its canonical 32-hex-character form.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Md5Digest([u8; 16]);

impl Md5Digest {
    pub const HEX_LENGTH: usize = 32;

    pub fn of(text: &str) -> Md5Digest {
        Md5Digest(md5::compute(text.as_bytes()).0)
    }

    pub fn from_hex(hex: &str) -> Option<Md5Digest> {
        if hex.len() != Md5Digest::HEX_LENGTH {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(hex.get(i * 2..i * 2 + 2)?, 16).ok()?;
        }
        Some(Md5Digest(bytes))
    }

    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Md5Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print digest material.
        f.write_str("Md5Digest(..)")
    }
}

/// One authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntry {
    password: Md5Digest,
    id: UserId,
    category: UserCategory,
}

impl UserEntry {
    pub fn new(password: Md5Digest, id: UserId, category: UserCategory) -> UserEntry {
        UserEntry {
            password,
            id,
            category,
        }
    }

    pub fn invalid(id: UserId) -> UserEntry {
        UserEntry {
            password: Md5Digest::of(""),
            id,
            category: UserCategory::Invalid,
        }
    }

    pub fn check(&self, password: &str) -> bool {
        Md5Digest::of(password) == self.password
    }

    pub fn password(&self) -> Md5Digest {
        self.password
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn category(&self) -> UserCategory {
        self.category
    }

    pub fn is_super_user(&self) -> bool {
        self.category == UserCategory::SuperUser
    }

    pub fn is_invalid(&self) -> bool {
        self.category == UserCategory::Invalid
    }
}

#[derive(Debug, Default)]
struct Inner {
    by_name: AHashMap<UniCase<String>, UserEntry>,
    by_id: BTreeMap<UserId, String>,
}

impl Inner {
    fn insert(&mut self, name: String, entry: UserEntry, no_check: bool) -> Result<()> {
        if !no_check {
            password_file::check_user_name(&name)?;
            if self.by_name.contains_key(&UniCase::new(name.clone())) {
                return Err(Error::DuplicateName(name));
            }
            if self.by_id.contains_key(&entry.id) {
                return Err(Error::DuplicateId(entry.id));
            }
        }
        self.by_id.insert(entry.id, name.clone());
        self.by_name.insert(UniCase::new(name), entry);
        Ok(())
    }

    fn erase(&mut self, name: &str, id: UserId) {
        self.by_name.remove(&UniCase::new(name.to_owned()));
        self.by_id.remove(&id);
    }
}

/// Dual-indexed user registry: case-insensitive name to entry, id to name.
///
/// Reads run concurrently; every mutating operation takes the write lock and
/// persists to the password file before it returns, so the file and the map
/// only ever diverge inside a crash window the auto-recoverer undoes.
#[derive(Debug, Default)]
pub struct UserList {
    inner: RwLock<Inner>,
}

impl UserList {
    pub fn new() -> UserList {
        UserList::default()
    }

    /// Register an entry. `no_check` skips name validation and duplicate
    /// detection and is reserved for the password-file loader.
    pub fn add(&self, name: impl Into<String>, entry: UserEntry, no_check: bool) -> Result<()> {
        self.inner.write().insert(name.into(), entry, no_check)
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<UserEntry> {
        self.inner
            .read()
            .by_name
            .get(&UniCase::new(name.to_owned()))
            .cloned()
    }

    /// Next entry in id order after `id`; scan entry point for tools.
    pub fn get_next(&self, id: Option<UserId>) -> Option<(String, UserEntry)> {
        let inner = self.inner.read();
        let start = match id {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };
        let (_, name) = inner.by_id.range((start, Bound::Unbounded)).next()?;
        let entry = inner.by_name.get(&UniCase::new(name.clone()))?.clone();
        Some((name.clone(), entry))
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_name.is_empty()
    }

    fn next_free_id(inner: &Inner) -> UserId {
        inner
            .by_id
            .keys()
            .next_back()
            .map_or(1, |max| max.saturating_add(1))
    }

    /// Add a user and persist the whole list.
    pub fn add_user(
        &self,
        file: &PasswordFile,
        name: &str,
        password: &str,
        id: Option<UserId>,
    ) -> Result<UserId> {
        let mut inner = self.inner.write();
        let id = id.unwrap_or_else(|| UserList::next_free_id(&inner));
        let entry = UserEntry::new(Md5Digest::of(password), id, UserCategory::DbUser);
        inner.insert(name.to_owned(), entry, false)?;
        if let Err(error) = UserList::persist(&inner, file) {
            inner.erase(name, id);
            return Err(error);
        }
        Ok(id)
    }

    /// Remove a user and persist. `revoke` is invoked with the dropped id so
    /// the caller can cascade privilege revocation across databases.
    pub fn delete_user(
        &self,
        file: &PasswordFile,
        name: &str,
        mut revoke: Option<&mut dyn FnMut(UserId)>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        let entry = inner
            .by_name
            .get(&UniCase::new(name.to_owned()))
            .cloned()
            .ok_or_else(|| Error::UserNotFound(name.to_owned()))?;
        let stored_name = inner.by_id.get(&entry.id).cloned().unwrap_or_else(|| name.to_owned());

        inner.erase(&stored_name, entry.id);
        if let Err(error) = UserList::persist(&inner, file) {
            let _ = inner.insert(stored_name, entry, true);
            return Err(error);
        }
        if let Some(revoke) = revoke.as_mut() {
            revoke(entry.id);
        }
        Ok(())
    }

    /// Replace a user's digest and persist.
    pub fn change_password(&self, file: &PasswordFile, name: &str, password: &str) -> Result<()> {
        let mut inner = self.inner.write();
        let key = UniCase::new(name.to_owned());
        let previous = inner
            .by_name
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::UserNotFound(name.to_owned()))?;
        if previous.is_invalid() {
            return Err(Error::AuthorizationFailed);
        }

        let mut updated = previous.clone();
        updated.password = Md5Digest::of(password);
        inner.by_name.insert(key.clone(), updated);

        if let Err(error) = UserList::persist(&inner, file) {
            inner.by_name.insert(key, previous);
            return Err(error);
        }
        Ok(())
    }

    /// Resolve a session's effective identity.
    pub fn verify_password(&self, name: &str, password: &str) -> Result<UserEntry> {
        if name.is_empty() {
            return Err(Error::UserRequired);
        }
        let entry = self
            .get(name)
            .ok_or_else(|| Error::UserNotFound(name.to_owned()))?;
        if entry.is_invalid() || !entry.check(password) {
            return Err(Error::AuthorizationFailed);
        }
        Ok(entry)
    }

    fn persist(inner: &Inner, file: &PasswordFile) -> Result<()> {
        let mut recoverer = file.auto_recoverer();
        recoverer.save_old()?;
        recoverer.open()?;
        for (id, name) in &inner.by_id {
            let entry = inner
                .by_name
                .get(&UniCase::new(name.clone()))
                .ok_or_else(|| Error::unexpected(format!("id {id} without a name entry")))?;
            recoverer.write_entry(name, entry)?;
        }
        recoverer.close()?;
        recoverer.drop_old()?;
        Ok(())
    }

    /// Persist the current contents; entry point for tools that edited the
    /// list through `add`.
    pub fn save(&self, file: &PasswordFile) -> Result<()> {
        let inner = self.inner.write();
        UserList::persist(&inner, file)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let list = UserList::new();
        list.add("alice", UserEntry::new(Md5Digest::of("pw"), 1, UserCategory::DbUser), false)
            .unwrap();

        assert!(list.get("Alice").is_some());
        assert!(list.get("ALICE").is_some());
        assert!(list.get("bob").is_none());
    }

    #[test]
    fn duplicate_names_and_ids_are_rejected() {
        let list = UserList::new();
        list.add("alice", UserEntry::new(Md5Digest::of("pw"), 1, UserCategory::DbUser), false)
            .unwrap();

        let same_name = list.add(
            "ALICE",
            UserEntry::new(Md5Digest::of("x"), 2, UserCategory::DbUser),
            false,
        );
        assert!(matches!(same_name, Err(Error::DuplicateName(_))));

        let same_id = list.add(
            "bob",
            UserEntry::new(Md5Digest::of("x"), 1, UserCategory::DbUser),
            false,
        );
        assert!(matches!(same_id, Err(Error::DuplicateId(1))));
    }

    #[test]
    fn verify_password_outcomes() {
        let list = UserList::new();
        list.add("alice", UserEntry::new(Md5Digest::of("pw"), 1, UserCategory::DbUser), false)
            .unwrap();

        let entry = list.verify_password("Alice", "pw").unwrap();
        assert_eq!(entry.id(), 1);

        assert!(matches!(
            list.verify_password("alice", "PW"),
            Err(Error::AuthorizationFailed)
        ));
        assert!(matches!(
            list.verify_password("mallory", "pw"),
            Err(Error::UserNotFound(_))
        ));
        assert!(matches!(
            list.verify_password("", "pw"),
            Err(Error::UserRequired)
        ));
    }

    #[test]
    fn invalid_entries_never_authenticate() {
        let list = UserList::new();
        list.add("ghost", UserEntry::invalid(9), false).unwrap();

        assert!(matches!(
            list.verify_password("ghost", ""),
            Err(Error::AuthorizationFailed)
        ));
    }

    #[test]
    fn get_next_scans_in_id_order() {
        let list = UserList::new();
        for (name, id) in [("c", 30), ("a", 10), ("b", 20)] {
            list.add(name, UserEntry::new(Md5Digest::of(""), id, UserCategory::DbUser), false)
                .unwrap();
        }

        let (first, entry) = list.get_next(None).unwrap();
        assert_eq!((first.as_str(), entry.id()), ("a", 10));
        let (second, _) = list.get_next(Some(10)).unwrap();
        assert_eq!(second, "b");
        assert!(list.get_next(Some(30)).is_none());
    }

    #[test]
    fn digest_hex_roundtrip() {
        let digest = Md5Digest::of("secret");
        let hex = digest.to_hex();
        assert_eq!(hex.len(), Md5Digest::HEX_LENGTH);
        assert_eq!(Md5Digest::from_hex(&hex), Some(digest));
        assert_eq!(Md5Digest::from_hex("zz"), None);
    }
}
