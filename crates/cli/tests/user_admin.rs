use assert_cmd::Command;

fn tessera() -> Command {
    Command::cargo_bin("tessera").unwrap()
}

#[test]
fn useradd_bootstraps_the_file_and_users_lists_it() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("passwd");

    tessera()
        .args(["useradd", "alice", "--password", "pw"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success();

    tessera()
        .args(["users"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success()
        .stdout("alice:1:1\n");
}

#[test]
fn duplicate_user_fails_with_exit_code_one() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("passwd");

    tessera()
        .args(["useradd", "alice", "--password", "pw"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success();

    tessera()
        .args(["useradd", "ALICE", "--password", "other"])
        .arg("--file")
        .arg(&file)
        .assert()
        .code(1);
}

#[test]
fn verify_checks_the_stored_digest() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("passwd");

    tessera()
        .args(["useradd", "alice", "--password", "pw"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success();

    tessera()
        .args(["verify", "--user", "alice", "--password", "pw"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success();

    tessera()
        .args(["verify", "--user", "alice", "--password", "PW"])
        .arg("--file")
        .arg(&file)
        .assert()
        .code(1);
}

#[test]
fn passwd_rotates_the_digest() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("passwd");

    tessera()
        .args(["useradd", "alice", "--password", "old"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success();

    tessera()
        .args(["passwd", "alice", "--password", "new"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success();

    tessera()
        .args(["verify", "--user", "alice", "--password", "new"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success();
    tessera()
        .args(["verify", "--user", "alice", "--password", "old"])
        .arg("--file")
        .arg(&file)
        .assert()
        .code(1);
}

#[test]
fn userdel_removes_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("passwd");

    for (name, id) in [("alice", "1"), ("bob", "2")] {
        tessera()
            .args(["useradd", name, "--password", "pw", "--id", id])
            .arg("--file")
            .arg(&file)
            .assert()
            .success();
    }

    tessera()
        .args(["userdel", "alice"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success();

    tessera()
        .args(["users"])
        .arg("--file")
        .arg(&file)
        .assert()
        .success()
        .stdout("bob:2:1\n");

    tessera()
        .args(["userdel", "mallory"])
        .arg("--file")
        .arg(&file)
        .assert()
        .code(1);
}

#[test]
fn missing_file_fails_for_non_bootstrap_commands() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("nonexistent");

    tessera()
        .args(["userdel", "alice"])
        .arg("--file")
        .arg(&file)
        .assert()
        .code(1);
}
