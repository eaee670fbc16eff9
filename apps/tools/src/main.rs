use anyhow::Result;
use clap::{Parser, Subcommand};
use lifecycle::load_settings;
use shared::DeviceIdentity;
use storage::{ConfigStore, IdentityStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lelamp-tools")]
struct Cli {
    /// Config record to operate on; defaults to the configured location.
    #[arg(long)]
    config_path: Option<std::path::PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the saved id and port as JSON.
    Show,
    /// Print where the config record lives.
    Path,
    /// Save id and port without calibrating.
    Set {
        #[arg(long)]
        id: String,
        #[arg(long)]
        port: String,
    },
}

fn main() -> Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = ConfigStore::new(cli.config_path.unwrap_or(settings.config_path));

    match cli.command {
        Command::Show => {
            let stored = store.load();
            println!("{}", serde_json::to_string_pretty(&stored)?);
        }
        Command::Path => {
            println!("{}", store.path().display());
        }
        Command::Set { id, port } => {
            let identity = DeviceIdentity::new(id, port)?;
            store.save(&identity)?;
            println!(
                "saved id={} port={} to {}",
                identity.id(),
                identity.port(),
                store.path().display()
            );
        }
    }

    Ok(())
}
