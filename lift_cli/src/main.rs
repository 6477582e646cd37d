use clap::{Parser, Subcommand, ValueEnum};
use lift_core::config::DB_FILE_NAME;
use lift_core::service;
use lift_core::*;
use std::path::PathBuf;

mod display;
mod menu;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Personal workout log for sessions and sets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log in as this user instead of being prompted
    #[arg(long, short, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu (default)
    Menu,

    /// Start a new session, ending any open one
    Start {
        /// Free-text notes for the session
        #[arg(long)]
        notes: Option<String>,
    },

    /// Log sets into the active session, e.g. "bench press: 135x5, 155x3"
    Add {
        entry: String,

        /// How single-rep sets are flagged as tested 1RM
        #[arg(long, value_enum, default_value_t = OneRm::Ask)]
        one_rm: OneRm,
    },

    /// Show the sets of the active session
    Show,

    /// Show max weight and tested 1RM for an exercise
    Stats { exercise: String },

    /// List all sessions, newest first
    Sessions,

    /// End the active session
    End,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OneRm {
    /// Prompt for every single-rep set
    Ask,
    /// Flag every single-rep set
    Yes,
    /// Never flag
    No,
}

fn main() -> Result<()> {
    // Logs go to stderr; keep them quiet unless asked for
    lift_core::logging::init_with_level("warn");

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let mut store = Store::open(&data_dir.join(DB_FILE_NAME), &config.storage)?;

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => menu::run(&mut store, cli.user.as_deref(), &config.display),
        command => {
            let user = match cli.user.as_deref() {
                Some(name) => service::login(&mut store, name)?,
                None => menu::login_interactive(&mut store)?.ok_or(Error::InvalidUsername)?,
            };
            run_command(&mut store, &user, command, &config)
        }
    }
}

fn run_command(store: &mut Store, user: &User, command: Commands, config: &Config) -> Result<()> {
    let unit = config.display.weight_unit.as_str();

    match command {
        Commands::Menu => return menu::run(store, Some(&user.username), &config.display),
        Commands::Start { notes } => {
            let started = service::start_session(store, user.id, notes.as_deref())?;
            display::started(&started);
        }
        Commands::Add { entry, one_rm } => {
            let added = service::add_sets_from_entry(store, user.id, &entry, |exercise, weight| {
                match one_rm {
                    OneRm::Ask => menu::ask_one_rep_max(exercise, weight, unit),
                    OneRm::Yes => true,
                    OneRm::No => false,
                }
            })?;
            display::added(&added);
        }
        Commands::Show => match service::current_session_sets(store, user.id)? {
            Some((session_id, sets)) => display::session_sets(session_id, &sets, unit),
            None => println!("No active session."),
        },
        Commands::Stats { exercise } => match exercise_stats(store.conn(), user.id, &exercise) {
            Ok(stats) => display::stats(&stats, unit),
            Err(e @ Error::NoData { .. }) => println!("{}", e),
            Err(e) => return Err(e),
        },
        Commands::Sessions => display::sessions(&service::list_sessions(store, user.id)?),
        Commands::End => {
            let ended = service::end_active_session(store, user.id)?;
            display::ended(ended.as_ref());
        }
    }

    Ok(())
}
