use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tessera_lib_core::Result;
use tessera_server::password_file::PasswordFile;
use tessera_server::user::{UserId, UserList};

#[derive(Debug, Parser)]
#[command(name = "tessera")]
#[command(about = "tessera server administration", long_about = None, version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(name = "useradd", about = "add a user to the password file")]
    UserAdd(UserAddArgs),
    #[command(name = "userdel", about = "remove a user from the password file")]
    UserDel(UserDelArgs),
    #[command(name = "passwd", about = "change a user's password")]
    Passwd(PasswdArgs),
    #[command(name = "users", about = "list users in id order")]
    Users(UsersArgs),
    #[command(name = "verify", about = "authenticate against the password file")]
    Verify(VerifyArgs),
}

#[derive(Debug, Parser)]
pub struct UserAddArgs {
    /// user name
    pub name: String,
    /// password file path
    #[arg(short, long)]
    pub file: PathBuf,
    /// explicit user id (next free id when omitted)
    #[arg(long)]
    pub id: Option<UserId>,
    /// password; prompted for when omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Debug, Parser)]
pub struct UserDelArgs {
    /// user name
    pub name: String,
    /// password file path
    #[arg(short, long)]
    pub file: PathBuf,
}

#[derive(Debug, Parser)]
pub struct PasswdArgs {
    /// user name
    pub name: String,
    /// password file path
    #[arg(short, long)]
    pub file: PathBuf,
    /// new password; prompted for when omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Debug, Parser)]
pub struct UsersArgs {
    /// password file path
    #[arg(short, long)]
    pub file: PathBuf,
}

#[derive(Debug, Parser)]
pub struct VerifyArgs {
    /// password file path
    #[arg(short, long)]
    pub file: PathBuf,
    /// user name; prompted for when omitted
    #[arg(short, long)]
    pub user: Option<String>,
    /// password; switches to a single non-interactive attempt
    #[arg(long)]
    pub password: Option<String>,
}

/// Load the user list behind a password file, rolling back a leftover
/// backup first. A missing file is an empty list, so the first `useradd`
/// bootstraps it.
pub fn load_list(path: &Path) -> Result<UserList> {
    PasswordFile::revert_backup_file(path)?;
    if path.exists() {
        PasswordFile::new(path).get_user_list()
    } else {
        Ok(UserList::new())
    }
}
