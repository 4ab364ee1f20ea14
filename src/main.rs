use clap::Parser;
use issuemirror::cli::{commands, Cli, Commands};
use issuemirror::{logging, MirrorError};

fn main() {
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {err}");
    }

    let root = cli.root.as_ref();
    let result = match &cli.command {
        Commands::Init { owner, repo } => commands::init::execute(root, owner.clone(), repo.clone()),
        Commands::Pull(args) => commands::pull::execute(root, args),
        Commands::Push(args) => commands::push::execute(root, args),
        Commands::Sync(args) => commands::sync::execute(root, args),
        Commands::Status => commands::status::execute(root),
        Commands::List(args) => commands::list::execute(root, args),
        Commands::New(args) => commands::new::execute(root, args),
        Commands::Close(args) => commands::close::execute(root, args),
        Commands::Reopen { id } => commands::reopen::execute(root, id),
        Commands::View(args) => commands::view::execute(root, args),
        Commands::Diff(args) => commands::diff::execute(root, args),
        Commands::Comment(args) => commands::comment::execute(root, args),
    };

    if let Err(err) = result {
        handle_error(&err);
    }
}

fn handle_error(err: &MirrorError) -> ! {
    eprintln!("Error: {err}");
    if let Some(suggestion) = err.suggestion() {
        eprintln!("Hint: {suggestion}");
    }
    std::process::exit(err.exit_code());
}
