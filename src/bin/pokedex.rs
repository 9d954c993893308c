use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use clap::{Parser, Subcommand, ValueEnum};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use pokedex::config::ConfigLoader;
use pokedex::domain::PokemonId;
use pokedex::error::DexError;
use pokedex::output::{JsonOutput, OutputMode};
use pokedex::provider::{DataProvider, Notifier};
use pokedex::service::{HttpSearchService, SearchService, Transport};
use pokedex::storage::FileStorage;

#[derive(Parser)]
#[command(name = "pokedex")]
#[command(about = "Fetch pokemon by identifier and catch them into a local collection")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true)]
    transport: Option<TransportArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum TransportArg {
    Normal,
    Stubbed,
    AuthFailure,
    Logging,
}

impl From<TransportArg> for Transport {
    fn from(value: TransportArg) -> Self {
        match value {
            TransportArg::Normal => Transport::Normal,
            TransportArg::Stubbed => Transport::Stubbed,
            TransportArg::AuthFailure => Transport::AuthFailure,
            TransportArg::Logging => Transport::Logging,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch a pokemon and show it without catching")]
    Search { identifier: String },
    #[command(about = "Fetch a pokemon and commit it to the collection")]
    Catch { identifier: String },
    #[command(about = "List the caught collection in directory order")]
    List,
    #[command(about = "Show a caught pokemon by identifier")]
    Info { identifier: String },
    #[command(about = "Show the collection directory (sections by letter)")]
    Directory,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(dex) = report.downcast_ref::<DexError>() {
            return ExitCode::from(map_exit_code(dex));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DexError) -> u8 {
    match error {
        DexError::NotFound(_) => 2,
        DexError::InvalidIdentifier(_) => 2,
        DexError::RemoteStatus { .. } | DexError::Transport(_) | DexError::Decode(_) => 3,
        _ => 1,
    }
}

struct ChannelNotifier {
    tx: Sender<Option<String>>,
}

impl Notifier for ChannelNotifier {
    fn data_received(&self, error_message: Option<String>) {
        let _ = self.tx.send(error_message);
    }
}

struct Session {
    provider: DataProvider,
    outcomes: Receiver<Option<String>>,
}

impl Session {
    fn new(cli: &Cli) -> miette::Result<Self> {
        let mut resolved = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
        if let Some(transport) = cli.transport {
            resolved.transport = transport.into();
        }

        let service: Arc<dyn SearchService> = Arc::new(
            HttpSearchService::with_options(
                resolved.transport,
                &resolved.base_url,
                resolved.timeout_secs,
            )
            .into_diagnostic()?,
        );
        let storage = FileStorage::new().into_diagnostic()?;
        let provider = DataProvider::new(service, Box::new(storage));
        provider.start();

        let (tx, outcomes) = channel();
        provider.set_notifier(Box::new(ChannelNotifier { tx }));

        Ok(Self { provider, outcomes })
    }

    /// Run one search and block until its outcome arrives. Returns the
    /// delivered error message, if any.
    fn search(&self, id: PokemonId) -> miette::Result<Option<String>> {
        self.provider.search(id);
        self.outcomes
            .recv()
            .map_err(|_| miette::Report::msg("search outcome channel closed"))
    }

    /// Commit the staged pokemon. The commit outcome is delivered before
    /// `catch_pokemon` returns, so the channel tells a save failure apart
    /// from a no-op with nothing staged.
    fn catch(&self) -> miette::Result<Option<pokedex::domain::LocalPokemon>> {
        let caught = self.provider.catch_pokemon();
        match self.outcomes.try_recv() {
            Ok(Some(message)) => Err(miette::Report::msg(message)),
            Ok(None) | Err(_) => Ok(caught),
        }
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let session = Session::new(&cli)?;

    match &cli.command {
        Some(Commands::Search { identifier }) => {
            let id: PokemonId = identifier.parse().into_diagnostic()?;
            run_search(&session, id, output_mode)
        }
        Some(Commands::Catch { identifier }) => {
            let id: PokemonId = identifier.parse().into_diagnostic()?;
            run_catch(&session, id, output_mode)
        }
        Some(Commands::List) => run_list(&session, output_mode),
        Some(Commands::Info { identifier }) => {
            let id: PokemonId = identifier.parse().into_diagnostic()?;
            run_info(&session, id, output_mode)
        }
        Some(Commands::Directory) => run_directory(&session, output_mode),
        None => run_interactive(&session),
    }
}

fn run_search(session: &Session, id: PokemonId, output_mode: OutputMode) -> miette::Result<()> {
    if let Some(message) = session.search(id)? {
        return Err(miette::Report::msg(message));
    }
    let found = session
        .provider
        .pokemon()
        .ok_or_else(|| miette::Report::msg("search completed without a staged pokemon"))?;
    match output_mode {
        OutputMode::NonInteractive => {
            JsonOutput::print_screen(&found).into_diagnostic()?;
            Ok(())
        }
        OutputMode::Interactive => print_found(session),
    }
}

fn run_catch(session: &Session, id: PokemonId, output_mode: OutputMode) -> miette::Result<()> {
    if let Some(message) = session.search(id)? {
        return Err(miette::Report::msg(message));
    }
    let Some(caught) = session.catch()? else {
        return Err(miette::Report::msg("catch failed: nothing staged"));
    };
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_pokemon(&caught).into_diagnostic()?,
        OutputMode::Interactive => println!("caught {} (#{})", caught.name, caught.id),
    }
    Ok(())
}

fn run_list(session: &Session, output_mode: OutputMode) -> miette::Result<()> {
    let pokemons = session.provider.pokemons();
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_pokemons(&pokemons).into_diagnostic()?,
        OutputMode::Interactive => {
            if pokemons.is_empty() {
                println!("no pokemon caught yet");
            }
            for pokemon in &pokemons {
                println!("#{:>5} {} ({})", pokemon.id, pokemon.name, pokemon.species);
            }
        }
    }
    Ok(())
}

fn run_info(session: &Session, id: PokemonId, output_mode: OutputMode) -> miette::Result<()> {
    let pokemons = session.provider.pokemons();
    let Some(pokemon) = pokemons.iter().find(|p| p.id == id.value()) else {
        return Err(miette::Report::msg(format!(
            "pokemon {id} is not in the collection"
        )));
    };
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_pokemon(pokemon).into_diagnostic()?,
        OutputMode::Interactive => {
            println!(
                "#{} {}: species {}, weight {}, height {}, caught {}",
                pokemon.id,
                pokemon.name,
                pokemon.species,
                pokemon.weight,
                pokemon.height,
                pokemon.caught_at
            );
        }
    }
    Ok(())
}

fn run_directory(session: &Session, output_mode: OutputMode) -> miette::Result<()> {
    let directory = session.provider.directory();
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_directory(&directory).into_diagnostic()?,
        OutputMode::Interactive => {
            println!("{} pokemon in the directory", directory.total);
            for section in &directory.sections {
                println!("{}: {}", section.letter, section.entries.join(", "));
            }
        }
    }
    Ok(())
}

/// Prompt loop against one live provider, so search results stay staged
/// across commands until caught or superseded.
fn run_interactive(session: &Session) -> miette::Result<()> {
    println!("pokedex commands: search <id>, catch, new, list, info <id>, dex, quit");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().into_diagnostic()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).into_diagnostic()? == 0 {
            return Ok(());
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let argument = parts.next();

        let result = match command {
            "search" => interactive_search(session, argument),
            "catch" => session.catch().map(|caught| match caught {
                Some(caught) => println!("caught {} (#{})", caught.name, caught.id),
                None => println!("nothing to catch"),
            }),
            "new" => {
                println!("{}", session.provider.new_species());
                Ok(())
            }
            "list" => run_list(session, OutputMode::Interactive),
            "info" => match argument {
                Some(value) => value
                    .parse::<PokemonId>()
                    .into_diagnostic()
                    .and_then(|id| run_info(session, id, OutputMode::Interactive)),
                None => Err(miette::Report::msg("info requires an identifier")),
            },
            "dex" => run_directory(session, OutputMode::Interactive),
            "quit" | "exit" => return Ok(()),
            _ => Err(miette::Report::msg(format!("unknown command: {command}"))),
        };
        if let Err(report) = result {
            eprintln!("{report}");
        }
    }
}

fn interactive_search(session: &Session, argument: Option<&str>) -> miette::Result<()> {
    let Some(value) = argument else {
        return Err(miette::Report::msg("search requires an identifier"));
    };
    let id: PokemonId = value.parse().into_diagnostic()?;
    match session.search(id)? {
        Some(message) => {
            println!("{message}");
            Ok(())
        }
        None => print_found(session),
    }
}

fn print_found(session: &Session) -> miette::Result<()> {
    let Some(found) = session.provider.pokemon() else {
        return Ok(());
    };
    let tag = if session.provider.new_species() {
        " (new species!)"
    } else {
        ""
    };
    println!(
        "found {}: weight {}, height {}{}",
        found.name, found.weight, found.height, tag
    );
    Ok(())
}
