use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(
        about = "Create the database schema and exit",
        long_about = "Create the database file and the fixed schema if missing, optionally reset the lookup dictionaries, then exit without serving."
    )]
    InitDb {
        #[arg(long, default_value_t = false, help = "Also reset the default dictionaries")]
        seed: bool,
    },
}
