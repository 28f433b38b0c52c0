use tessera_lib_core::Result;
use tessera_server::password_file::PasswordFile;

use crate::commands::{UserAddArgs, load_list};
use crate::prompt;

pub fn run(args: &UserAddArgs) -> Result<()> {
    let list = load_list(&args.file)?;
    let password = match &args.password {
        Some(password) => password.clone(),
        None => prompt::new_password()?,
    };

    let file = PasswordFile::new(&args.file);
    let id = list.add_user(&file, &args.name, &password, args.id)?;
    println!("added {} (id {id})", args.name);
    Ok(())
}
