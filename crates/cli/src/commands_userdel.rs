use tessera_lib_core::Result;
use tessera_server::password_file::PasswordFile;

use crate::commands::{UserDelArgs, load_list};

pub fn run(args: &UserDelArgs) -> Result<()> {
    let list = load_list(&args.file)?;
    let file = PasswordFile::new(&args.file);
    list.delete_user(&file, &args.name, None)?;
    println!("removed {}", args.name);
    Ok(())
}
