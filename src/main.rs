use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::select;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use treewatch::{RecursiveWatcher, Settings, WatchError, WatchOptions};

#[derive(Parser)]
#[command(name = "treewatch")]
#[command(about = "Watch directory trees and print file system events", version)]
struct Cli {
    /// Settings file to use instead of the nearest .treewatch/settings.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .treewatch/settings.toml with default values
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Config,

    /// Watch paths and print events until killed
    ///
    /// Append /... to a directory to watch everything below it.
    Watch {
        /// Paths to watch
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Report entries that already exist below recursive roots
        #[arg(long)]
        send_create: bool,

        /// Event channel capacity (overrides config)
        #[arg(long)]
        buffer: Option<usize>,

        /// Exit after printing this many events
        #[arg(long)]
        count: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    treewatch::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { force } => {
            let path = Settings::init_config_file(force)
                .map_err(|e| anyhow::anyhow!("{e}"))
                .context("failed to write configuration")?;
            println!("Created configuration file at: {}", path.display());
            Ok(())
        }

        Commands::Config => {
            let toml_str =
                toml::to_string_pretty(&settings).context("failed to render configuration")?;
            println!("{toml_str}");
            Ok(())
        }

        Commands::Watch {
            paths,
            send_create,
            buffer,
            count,
        } => {
            let options = WatchOptions::new().send_create(send_create || settings.watch.send_create);
            let capacity = buffer.unwrap_or(settings.watch.buffer_size);
            watch(&paths, options, capacity, count)
        }
    }
}

fn watch(paths: &[PathBuf], options: WatchOptions, capacity: usize, count: Option<usize>) -> Result<()> {
    let watcher = Arc::new(RecursiveWatcher::with_capacity(capacity).context("failed to start watcher")?);

    // Consume before adding: with send_create, adding blocks until events are read
    let printer = {
        let watcher = Arc::clone(&watcher);
        thread::spawn(move || print_events(&watcher, count))
    };

    for path in paths {
        let path = std::path::absolute(path)
            .with_context(|| format!("invalid path {}", path.display()))?;
        match watcher.add_with(&path, options.clone()) {
            Ok(()) => {}
            // --count reached while still adding
            Err(WatchError::Closed) => break,
            Err(e) => return Err(e).with_context(|| format!("failed to watch {}", path.display())),
        }
    }

    if printer.join().is_err() {
        anyhow::bail!("event printer panicked");
    }
    watcher.close().context("failed to close watcher")
}

/// Print events until the watcher closes or `count` events were printed.
fn print_events(watcher: &RecursiveWatcher, count: Option<usize>) {
    let events = watcher.events();
    let errors = watcher.errors();
    let mut printed = 0;

    loop {
        select! {
            recv(events) -> msg => match msg {
                Ok(event) => {
                    println!("{event}");
                    printed += 1;
                    if count.is_some_and(|n| printed >= n) {
                        break;
                    }
                }
                Err(_) => break,
            },
            recv(errors) -> msg => match msg {
                Ok(e) => tracing::error!("[watch] {e}"),
                Err(_) => break,
            },
        }
    }

    if let Err(e) = watcher.close() {
        tracing::error!("[watch] failed to close watcher: {e}");
    }
}
