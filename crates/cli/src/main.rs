use clap::Parser;

mod commands;
mod commands_passwd;
mod commands_useradd;
mod commands_userdel;
mod commands_users;
mod commands_verify;
mod prompt;

pub fn main() {
    let cli = commands::Cli::parse();
    let result = match cli.command {
        commands::Commands::UserAdd(args) => commands_useradd::run(&args),
        commands::Commands::UserDel(args) => commands_userdel::run(&args),
        commands::Commands::Passwd(args) => commands_passwd::run(&args),
        commands::Commands::Users(args) => commands_users::run(&args),
        commands::Commands::Verify(args) => commands_verify::run(&args),
    };

    std::process::exit(match result {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("tessera: {error}");
            1
        }
    });
}
