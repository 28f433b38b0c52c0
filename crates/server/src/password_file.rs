use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tessera_lib_core::{Error, Result};
use tracing::{error, info};

use crate::user::{Md5Digest, UserCategory, UserEntry, UserList};

const BUFFER_SIZE: usize = 4096;
const MAX_USER_NAME_LENGTH: usize = 16;
const BACKUP_SUFFIX: &str = "_BAK";
const SEPARATOR: char = ':';

/// Character classes of the password-file grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
enum CharClass {
    Unused = 0,
    UserName,
    NameAndPassword,
    IdNameAndPassword,
    FieldSeparator,
    MemberSeparator,
    RecordTerminator,
}

#[rustfmt::skip]
static CHAR_CLASS: [CharClass; 128] = {
    use CharClass::{
        Unused as X, UserName as U, NameAndPassword as P, IdNameAndPassword as I,
        FieldSeparator as F, MemberSeparator as M, RecordTerminator as T,
    };
    [
        //00-0F
        X, X, X, X, X, X, X, X, X, X, T, X, X, T, X, X,
        //10-1F
        X, X, X, X, X, X, X, X, X, X, X, X, X, X, X, X,
        //20-2F
        X, U, X, U, U, U, U, U, U, U, U, U, M, X, X, X,
        //30-3F
        I, I, I, I, I, I, I, I, I, I, F, U, U, U, U, U,
        //40-4F
        U, P, P, P, P, P, P, P, P, P, P, P, P, P, P, P,
        //50-5F
        P, P, P, P, P, P, P, P, P, P, P, U, U, U, U, U,
        //60-6F
        U, P, P, P, P, P, P, P, P, P, P, P, P, P, P, P,
        //70-7F
        P, P, P, P, P, P, P, P, P, P, P, U, U, U, U, X,
    ]
};

/// Parser states; one record is one walk from `Novice` to `Terminator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
enum ParseState {
    Novice = 0,
    UserName,
    Separator1,
    Password,
    BadPassword,
    Separator2,
    Id,
    Separator3,
    Category,
    Separator4,
    Member,
    MemberSeparator,
    Terminator,
    Error,
}

#[rustfmt::skip]
static AUTOMATON: [[ParseState; 7]; 14] = {
    use ParseState::{
        Novice as O, UserName as U, Separator1 as S1, Password as P, BadPassword as BP,
        Separator2 as S2, Id as I, Separator3 as S3, Category as C, Separator4 as S4,
        Member as M, MemberSeparator as MS, Terminator as T, Error as E,
    };
    [
        //x  U   P   I   F   M   T
        [E, U,  U,  U,  E,  E,  O ], // Novice
        [E, U,  U,  U,  S1, E,  E ], // UserName
        [E, E,  P,  P,  S2, E,  E ], // Separator1
        [E, BP, P,  P,  S2, E,  E ], // Password
        [E, BP, BP, BP, S2, E,  E ], // BadPassword
        [E, E,  E,  I,  E,  E,  E ], // Separator2
        [E, E,  E,  I,  S3, E,  E ], // Id
        [E, E,  E,  C,  S4, E,  E ], // Separator3
        [E, E,  E,  C,  S4, E,  E ], // Category
        [E, M,  M,  M,  E,  E,  T ], // Separator4
        [E, M,  M,  M,  E,  MS, T ], // Member
        [E, M,  M,  M,  E,  E,  E ], // MemberSeparator
        [E, E,  E,  E,  E,  E,  E ], // Terminator
        [E, E,  E,  E,  E,  E,  E ], // Error
    ]
};

#[derive(Debug, Default)]
struct RawRecord {
    name: (usize, usize),
    password: Option<(usize, usize)>,
    id: Option<(usize, usize)>,
    category: Option<(usize, usize)>,
    bad_password: bool,
}

enum RecordScan {
    Complete { consumed: usize, record: RawRecord },
    /// The buffer ran out mid-record; parsing may restart at `restart`
    /// after a refill.
    Incomplete { restart: usize },
}

/// Scan one record out of `buffer`. Bytes with the high bit set are passed
/// through without advancing the automaton, the way the original reader
/// treats them.
fn scan_record(buffer: &[u8]) -> Result<RecordScan> {
    let mut state = ParseState::Novice;
    let mut record = RawRecord::default();

    for (position, &byte) in buffer.iter().enumerate() {
        if byte & 0x80 != 0 {
            continue;
        }
        state = AUTOMATON[state as usize][CHAR_CLASS[byte as usize] as usize];
        match state {
            ParseState::Novice => {
                record.name.0 = position + 1;
                record.name.1 = record.name.0;
            }
            ParseState::UserName => record.name.1 = position + 1,
            ParseState::Separator1 => record.password = Some((position + 1, position + 1)),
            ParseState::Password => {
                if let Some(password) = &mut record.password {
                    password.1 = position + 1;
                }
            }
            ParseState::BadPassword => {
                record.bad_password = true;
                if let Some(password) = &mut record.password {
                    password.1 = position + 1;
                }
            }
            ParseState::Separator2 => record.id = Some((position + 1, position + 1)),
            ParseState::Id => {
                if let Some(id) = &mut record.id {
                    id.1 = position + 1;
                }
            }
            ParseState::Separator3 => {
                if !record.bad_password {
                    record.category = Some((position + 1, position + 1));
                }
            }
            ParseState::Category => {
                if !record.bad_password {
                    if let Some(category) = &mut record.category {
                        category.1 = position + 1;
                    }
                }
            }
            ParseState::Separator4 | ParseState::Member | ParseState::MemberSeparator => {}
            ParseState::Terminator => {
                return Ok(RecordScan::Complete {
                    consumed: position + 1,
                    record,
                });
            }
            ParseState::Error => {
                error!(code = byte, "bad character in password file");
                return Err(Error::BadPasswordFile);
            }
        }
    }
    Ok(RecordScan::Incomplete {
        restart: record.name.0,
    })
}

/// Validate a user name against the grammar's name character classes.
///
/// Called before any user is added.
pub fn check_user_name(name: &str) -> Result<()> {
    if name.is_empty() {
        info!("empty user name");
        return Err(Error::UserRequired);
    }
    if name.chars().count() > MAX_USER_NAME_LENGTH {
        info!(name, "too long user name");
        return Err(Error::TooLongUserName(name.to_owned()));
    }
    for ch in name.chars() {
        let valid = (ch as u32) < 0x80
            && matches!(
                CHAR_CLASS[ch as usize],
                CharClass::UserName | CharClass::NameAndPassword | CharClass::IdNameAndPassword
            );
        if !valid {
            info!(name, "invalid character in user name");
            return Err(Error::InvalidUserName(name.to_owned()));
        }
    }
    Ok(())
}

fn io_error(path: &Path, source: std::io::Error) -> Error {
    match source.kind() {
        std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_owned()),
        std::io::ErrorKind::PermissionDenied => Error::PermissionDenied(path.to_owned()),
        _ => Error::library(source),
    }
}

/// The persistent authenticated-identity store.
#[derive(Debug, Clone)]
pub struct PasswordFile {
    path: PathBuf,
}

impl PasswordFile {
    pub fn new(path: impl Into<PathBuf>) -> PasswordFile {
        PasswordFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(BACKUP_SUFFIX);
        PathBuf::from(name)
    }

    /// Roll a leftover backup sibling back over the file. Run at startup:
    /// a surviving backup means the last persist died between save and
    /// drop, and the backup is the committed snapshot.
    pub fn revert_backup_file(path: &Path) -> Result<()> {
        let backup = PasswordFile::backup_path(path);
        if backup.exists() {
            info!(?path, "reverting password file from backup");
            fs::rename(&backup, path).map_err(|e| io_error(path, e))?;
        }
        Ok(())
    }

    /// Parse the whole file into a fresh user list.
    pub fn get_user_list(&self) -> Result<UserList> {
        let mut file = File::open(&self.path).map_err(|e| io_error(&self.path, e))?;
        let list = UserList::new();

        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut top = 0usize;
        let mut tail = 0usize;
        let mut eof = false;

        loop {
            // Refill unless plenty of unprocessed bytes remain.
            if !eof && tail - top <= BUFFER_SIZE / 2 {
                buffer.copy_within(top..tail, 0);
                tail -= top;
                top = 0;
                let read = file
                    .read(&mut buffer[tail..])
                    .map_err(|e| io_error(&self.path, e))?;
                if read < BUFFER_SIZE - tail {
                    eof = true;
                }
                tail += read;
            }
            if top == tail {
                break;
            }

            match scan_record(&buffer[top..tail])? {
                RecordScan::Complete { consumed, record } => {
                    let entry_name;
                    let entry;
                    {
                        let slice = &buffer[top..tail];
                        entry_name = String::from_utf8_lossy(
                            &slice[record.name.0..record.name.1],
                        )
                        .into_owned();
                        entry = PasswordFile::build_entry(slice, &record)?;
                    }
                    list.add(entry_name, entry, false)?;
                    top += consumed;
                }
                RecordScan::Incomplete { restart } => {
                    if restart == 0 {
                        error!("invalid entry in password file");
                        return Err(Error::BadPasswordFile);
                    }
                    top += restart;
                }
            }
        }
        Ok(list)
    }

    fn build_entry(slice: &[u8], record: &RawRecord) -> Result<UserEntry> {
        let field = |range: (usize, usize)| String::from_utf8_lossy(&slice[range.0..range.1]);

        let id: i32 = {
            let range = record.id.ok_or(Error::BadPasswordFile)?;
            field(range).parse().map_err(|_| {
                error!("id field of password record is not a number");
                Error::BadPasswordFile
            })?
        };

        // A bad password field demotes the record but keeps the id out of
        // circulation.
        if record.bad_password {
            return Ok(UserEntry::invalid(id));
        }
        let Some(category_range) = record.category else {
            return Ok(UserEntry::invalid(id));
        };

        let category_code: i32 = field(category_range).parse().map_err(|_| {
            error!("category field of password record is not a number");
            Error::BadPasswordFile
        })?;
        let Some(category) = UserCategory::from_code(category_code) else {
            error!(category_code, "unsupported category in password record");
            return Err(Error::BadPasswordFile);
        };

        let password_text = record.password.map(field).unwrap_or_default();
        let digest = if password_text.is_empty() {
            Some(Md5Digest::of(""))
        } else {
            Md5Digest::from_hex(&password_text)
        };
        Ok(match digest {
            Some(digest) => UserEntry::new(digest, id, category),
            // Not an MD5 image (e.g. the literal NP of an invalid record).
            None => UserEntry::invalid(id),
        })
    }

    pub fn auto_recoverer(&self) -> AutoRecoverer<'_> {
        AutoRecoverer {
            file: self,
            saved: None,
            stage: Stage::Initial,
            writer: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Initial,
    Opened,
    Closed,
    Dropped,
}

/// Drives the replace-then-rename persistence sequence and restores the
/// previous snapshot if dropped before `drop_old`.
pub struct AutoRecoverer<'a> {
    file: &'a PasswordFile,
    saved: Option<PathBuf>,
    stage: Stage,
    writer: Option<BufWriter<File>>,
}

impl AutoRecoverer<'_> {
    /// Move the current file aside as `<path>_BAK`.
    pub fn save_old(&mut self) -> Result<()> {
        let path = &self.file.path;
        if path.exists() {
            let backup = PasswordFile::backup_path(path);
            fs::rename(path, &backup).map_err(|e| io_error(path, e))?;
            self.saved = Some(backup);
        }
        Ok(())
    }

    /// Create the replacement file, exclusive.
    pub fn open(&mut self) -> Result<()> {
        let path = &self.file.path;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| io_error(path, e))?;
        self.writer = Some(BufWriter::new(file));
        self.stage = Stage::Opened;
        Ok(())
    }

    /// Append one record: `name:password:id:category:\n`.
    pub fn write_entry(&mut self, name: &str, entry: &UserEntry) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::unexpected("password file is not open for writing"))?;

        let mut line = String::with_capacity(BUFFER_SIZE.min(name.len() + 64));
        line.push_str(name);
        line.push(SEPARATOR);
        if entry.is_invalid() {
            line.push_str("NP");
        } else {
            line.push_str(&entry.password().to_hex());
        }
        line.push(SEPARATOR);
        line.push_str(&entry.id().to_string());
        line.push(SEPARATOR);
        if entry.is_invalid() {
            line.push('1');
        } else {
            line.push_str(&entry.category().code().to_string());
        }
        line.push(SEPARATOR);
        line.push('\n');

        writer
            .write_all(line.as_bytes())
            .map_err(|e| io_error(&self.file.path, e))
    }

    /// Flush and close the replacement file, syncing it to disk.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| io_error(&self.file.path, e))?;
            writer
                .into_inner()
                .map_err(|e| Error::library(e.into_error()))?
                .sync_all()
                .map_err(|e| io_error(&self.file.path, e))?;
        }
        self.stage = Stage::Closed;
        Ok(())
    }

    /// Commit: remove the backup. From here the new content is the
    /// snapshot of record.
    pub fn drop_old(&mut self) -> Result<()> {
        if let Some(backup) = self.saved.take() {
            fs::remove_file(&backup).map_err(|e| io_error(&backup, e))?;
        }
        self.stage = Stage::Dropped;
        Ok(())
    }

    fn recover(&mut self) {
        if self.stage == Stage::Dropped {
            return;
        }
        // Close a half-written replacement first.
        self.writer = None;
        match self.saved.take() {
            Some(backup) => {
                let _ = fs::rename(&backup, &self.file.path);
            }
            None => {
                // No previous snapshot existed; drop the partial file.
                if self.stage != Stage::Initial {
                    let _ = fs::remove_file(&self.file.path);
                }
            }
        }
    }
}

impl Drop for AutoRecoverer<'_> {
    fn drop(&mut self) {
        self.recover();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn temp_file() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("passwd");
        (dir, path)
    }

    #[test]
    fn reads_a_well_formed_record() {
        let (_dir, path) = temp_file();
        let digest = Md5Digest::of("x").to_hex();
        fs::write(&path, format!("bob:{digest}:2:0:\n")).unwrap();

        let list = PasswordFile::new(&path).get_user_list().unwrap();
        let entry = list.get("bob").unwrap();
        assert_eq!(entry.id(), 2);
        assert!(entry.is_super_user());
        assert!(entry.check("x"));
    }

    #[test]
    fn empty_password_field_means_md5_of_empty_string() {
        let (_dir, path) = temp_file();
        fs::write(&path, "carl::3:1:\n").unwrap();

        let list = PasswordFile::new(&path).get_user_list().unwrap();
        let entry = list.get("carl").unwrap();
        assert!(entry.check(""));
        assert!(!entry.check("pw"));
    }

    #[test]
    fn malformed_password_demotes_to_invalid_but_keeps_id() {
        let (_dir, path) = temp_file();
        fs::write(&path, "ghost:NP:9:1:\n").unwrap();

        let list = PasswordFile::new(&path).get_user_list().unwrap();
        let entry = list.get("ghost").unwrap();
        assert!(entry.is_invalid());
        assert_eq!(entry.id(), 9);

        // The id stays reserved.
        assert!(
            list.add("newbie", UserEntry::new(Md5Digest::of(""), 9, UserCategory::DbUser), false)
                .is_err()
        );
    }

    #[test]
    fn illegal_character_fails() {
        let (_dir, path) = temp_file();
        fs::write(&path, "al ice:abc:1:1:\n").unwrap();

        assert!(matches!(
            PasswordFile::new(&path).get_user_list(),
            Err(Error::BadPasswordFile)
        ));
    }

    #[test]
    fn trailing_partial_record_fails_but_trailing_newlines_pass() {
        let (_dir, path) = temp_file();
        let digest = Md5Digest::of("x").to_hex();

        fs::write(&path, format!("bob:{digest}:2:0:\n\n\n")).unwrap();
        assert_eq!(PasswordFile::new(&path).get_user_list().unwrap().len(), 1);

        fs::write(&path, format!("bob:{digest}:2:0:")).unwrap();
        assert!(matches!(
            PasswordFile::new(&path).get_user_list(),
            Err(Error::BadPasswordFile)
        ));
    }

    #[test]
    fn refills_across_the_buffer_boundary() {
        let (_dir, path) = temp_file();
        let digest = Md5Digest::of("pw").to_hex();
        let mut content = String::new();
        for i in 0..200 {
            content.push_str(&format!("user{i:04}:{digest}:{}:1:\n", i + 1));
        }
        assert!(content.len() > BUFFER_SIZE);
        fs::write(&path, content).unwrap();

        let list = PasswordFile::new(&path).get_user_list().unwrap();
        assert_eq!(list.len(), 200);
        assert_eq!(list.get("user0199").unwrap().id(), 200);
    }

    #[test]
    fn missing_file_reports_file_not_found() {
        let (_dir, path) = temp_file();
        assert!(matches!(
            PasswordFile::new(&path).get_user_list(),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn user_name_validation() {
        assert!(check_user_name("alice").is_ok());
        assert!(check_user_name("UPPER_case09").is_ok());
        assert!(check_user_name("dot.name").is_err()); // '.' is outside the name classes
        assert!(check_user_name("with!bang").is_ok());
        assert!(matches!(check_user_name(""), Err(Error::UserRequired)));
        assert!(matches!(
            check_user_name("seventeen-chars-x"),
            Err(Error::TooLongUserName(_))
        ));
        assert!(matches!(
            check_user_name("has space"),
            Err(Error::InvalidUserName(_))
        ));
        assert!(matches!(
            check_user_name("colon:name"),
            Err(Error::InvalidUserName(_))
        ));
    }
}
