use tessera_lib_core::Result;
use tessera_server::admission::{self, CredentialSource, StaticCredentials};
use tessera_server::manager::{Manager, ServerConfig};

use crate::commands::VerifyArgs;
use crate::prompt;

/// Terminal-backed credential source; admission re-prompts it up to three
/// times on authentication failures.
struct ConsoleCredentials {
    user: Option<String>,
}

impl CredentialSource for ConsoleCredentials {
    fn read_credentials(&mut self) -> Result<(String, String)> {
        let user = match &self.user {
            Some(user) => user.clone(),
            None => prompt::user_name()?,
        };
        let password = prompt::password("Password: ")?;
        Ok((user, password))
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

pub fn run(args: &VerifyArgs) -> Result<()> {
    let manager = Manager::initialize(&ServerConfig {
        password_file: Some(args.file.clone()),
    })?;

    let session = match &args.password {
        Some(password) => {
            let mut source = StaticCredentials {
                user: args.user.clone().unwrap_or_default(),
                password: password.clone(),
            };
            admission::admit(&manager, &mut source, "DefaultDB")?
        }
        None => {
            let mut source = ConsoleCredentials {
                user: args.user.clone(),
            };
            admission::admit(&manager, &mut source, "DefaultDB")?
        }
    };

    match session.user_id() {
        Some(id) => println!("ok: {} (id {id})", session.user_name()),
        None => println!("ok: password management is disabled"),
    }
    Ok(())
}
