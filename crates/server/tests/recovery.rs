use std::fs;

use tessera_server::manager::{Manager, ServerConfig};
use tessera_server::password_file::PasswordFile;
use tessera_server::user::{Md5Digest, UserCategory, UserEntry, UserList};

fn seeded_list() -> UserList {
    let list = UserList::new();
    list.add(
        "root",
        UserEntry::new(Md5Digest::of("admin"), 0, UserCategory::SuperUser),
        false,
    )
    .unwrap();
    list.add(
        "alice",
        UserEntry::new(Md5Digest::of("pw"), 1, UserCategory::DbUser),
        false,
    )
    .unwrap();
    list
}

#[test]
fn persisted_list_reloads_identically() {
    let dir = tempfile::tempdir().unwrap();
    let file = PasswordFile::new(dir.path().join("passwd"));

    let list = seeded_list();
    list.add("ghost", UserEntry::invalid(9), false).unwrap();
    list.save(&file).unwrap();

    let reloaded = file.get_user_list().unwrap();
    assert_eq!(reloaded.len(), 3);
    assert!(reloaded.get("root").unwrap().is_super_user());
    assert!(reloaded.get("alice").unwrap().check("pw"));
    let ghost = reloaded.get("ghost").unwrap();
    assert!(ghost.is_invalid());
    assert_eq!(ghost.id(), 9);
}

#[test]
fn dropped_recoverer_restores_the_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passwd");
    let file = PasswordFile::new(&path);

    seeded_list().save(&file).unwrap();
    let before = fs::read(&path).unwrap();

    // A persist that dies after writing but before committing.
    {
        let mut recoverer = file.auto_recoverer();
        recoverer.save_old().unwrap();
        recoverer.open().unwrap();
        recoverer
            .write_entry(
                "intruder",
                &UserEntry::new(Md5Digest::of("x"), 99, UserCategory::DbUser),
            )
            .unwrap();
        // Dropped here: no close, no drop_old.
    }

    assert_eq!(fs::read(&path).unwrap(), before);
    assert!(!path.with_file_name("passwd_BAK").exists());
}

#[test]
fn startup_reverts_a_leftover_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passwd");
    let file = PasswordFile::new(&path);

    seeded_list().save(&file).unwrap();
    let committed = fs::read(&path).unwrap();

    // Fake the crash window by hand: old content parked as _BAK, a torn
    // replacement in place.
    let backup = dir.path().join("passwd_BAK");
    fs::rename(&path, &backup).unwrap();
    fs::write(&path, "torn:").unwrap();

    let manager = Manager::initialize(&ServerConfig {
        password_file: Some(path.clone()),
    })
    .unwrap();

    assert_eq!(fs::read(&path).unwrap(), committed);
    let list = manager.user_list().unwrap();
    assert!(list.get("alice").is_some());
    assert!(list.get("torn").is_none());
}

#[test]
fn add_delete_and_change_password_persist_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("passwd");
    let file = PasswordFile::new(&path);

    let list = seeded_list();
    list.save(&file).unwrap();

    let id = list.add_user(&file, "bob", "secret", None).unwrap();
    assert_eq!(id, 2);
    list.change_password(&file, "alice", "rotated").unwrap();

    let mut revoked = Vec::new();
    list.delete_user(&file, "root", Some(&mut |id| revoked.push(id)))
        .unwrap();
    assert_eq!(revoked, vec![0]);

    let reloaded = PasswordFile::new(&path).get_user_list().unwrap();
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.get("bob").unwrap().check("secret"));
    assert!(reloaded.get("alice").unwrap().check("rotated"));
    assert!(reloaded.get("root").is_none());
}
