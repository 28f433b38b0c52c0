use tessera_lib_core::Result;
use tessera_server::password_file::PasswordFile;

use crate::commands::{PasswdArgs, load_list};
use crate::prompt;

pub fn run(args: &PasswdArgs) -> Result<()> {
    let list = load_list(&args.file)?;
    let password = match &args.password {
        Some(password) => password.clone(),
        None => prompt::new_password()?,
    };

    let file = PasswordFile::new(&args.file);
    list.change_password(&file, &args.name, &password)?;
    println!("password changed for {}", args.name);
    Ok(())
}
