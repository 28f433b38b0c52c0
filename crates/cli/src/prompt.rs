use console::Term;
use tessera_lib_core::{Error, Result};

fn ask(term: &Term, prompt: &str) -> Result<String> {
    term.write_str(prompt).map_err(Error::library)?;
    term.read_secure_line().map_err(Error::library)
}

/// Prompt for a password without echo.
pub fn password(prompt: &str) -> Result<String> {
    ask(&Term::stderr(), prompt)
}

/// Prompt twice for a new password and require both entries to match.
pub fn new_password() -> Result<String> {
    let term = Term::stderr();
    let first = ask(&term, "New password: ")?;
    let second = ask(&term, "Retype new password: ")?;
    if first != second {
        return Err(Error::BadArgument("passwords do not match".into()));
    }
    Ok(first)
}

/// Prompt for a user name, with echo.
pub fn user_name() -> Result<String> {
    let term = Term::stderr();
    term.write_str("User: ").map_err(Error::library)?;
    term.read_line().map_err(Error::library)
}
