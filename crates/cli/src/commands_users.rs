use tessera_lib_core::Result;

use crate::commands::{UsersArgs, load_list};

pub fn run(args: &UsersArgs) -> Result<()> {
    let list = load_list(&args.file)?;

    let mut cursor = None;
    while let Some((name, entry)) = list.get_next(cursor) {
        println!("{name}:{}:{}", entry.id(), entry.category().code());
        cursor = Some(entry.id());
    }
    Ok(())
}
