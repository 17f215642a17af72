mod cli;
mod error;
mod logging;
mod view;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use gudang_config::Config;
use gudang_library::error::ErrorKind as LibraryErrorKind;
use gudang_library::{Library, Upload};
use gudang_metadata::{Database, Repository};
use gudang_storage::backend::LocalBackend;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbosity());
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        // Already explained to the user.
        Err(err) if matches!(&*err, ErrorKind::Rejected(_)) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let backend = LocalBackend::new("videos", &config.storage_dir).or_raise(|| ErrorKind::Storage)?;
    if let Some(parent) = config.database.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Metadata)?;
    }
    let db = Database::connect(&config.database).await.or_raise(|| ErrorKind::Metadata)?;
    let library = Library::new(Arc::new(backend), Repository::from(&db));

    let result = match cli.command {
        Command::Upload { file, name } => upload(&library, &config, &file, name).await,
        Command::List => list(&library, &config).await,
        Command::Show { filename } => show(&library, &config, &filename).await,
        Command::Delete { filename } => delete(&library, &filename).await,
        Command::Verify { prune } => verify(&library, prune).await,
    };
    db.close().await;
    result
}

async fn upload(library: &Library, config: &Config, file: &Path, name: Option<String>) -> Result<()> {
    let Some(name) = name.or_else(|| file.file_name().map(|n| n.to_string_lossy().into_owned())) else {
        return reject(format!("{} does not name a file", file.display()));
    };
    if !config.is_allowed_extension(&name) {
        return reject(format!(
            "{name:?} is not an accepted video type (expected one of: {})",
            config.extensions.join(", ")
        ));
    }

    let mut source = tokio::fs::File::open(file).await.or_raise(|| ErrorKind::Input(file.to_path_buf()))?;
    let metadata = source.metadata().await.or_raise(|| ErrorKind::Input(file.to_path_buf()))?;
    if !metadata.is_file() {
        return reject(format!("{} is not a regular file", file.display()));
    }

    let upload = Upload::new(name, &mut source).with_declared_size(metadata.len());
    match library.store(upload).await {
        Ok(ingested) => {
            println!("{}", ingested.message());
            print!("{}", view::video(&ingested.record, config));
            Ok(())
        },
        Err(err) => match &*err {
            LibraryErrorKind::Duplicate(name) => reject(format!("Video {name:?} already exists")),
            LibraryErrorKind::InvalidName(name) => reject(format!("{name:?} can't be used as a video name")),
            _ => Err(err.raise(ErrorKind::Command("upload"))),
        },
    }
}

async fn list(library: &Library, config: &Config) -> Result<()> {
    let videos = library.list().await.or_raise(|| ErrorKind::Command("list"))?;
    print!("{}", view::videos(&videos, config));
    Ok(())
}

async fn show(library: &Library, config: &Config, filename: &str) -> Result<()> {
    match library.get(filename).await.or_raise(|| ErrorKind::Command("show"))? {
        Some(record) => {
            print!("{}", view::video(&record, config));
            Ok(())
        },
        None => reject(format!("No video named {filename:?}")),
    }
}

async fn delete(library: &Library, filename: &str) -> Result<()> {
    let removal = match library.remove(filename).await {
        Ok(removal) => removal,
        Err(err) => match &*err {
            LibraryErrorKind::InvalidName(name) => return reject(format!("{name:?} can't be used as a video name")),
            _ => return Err(err.raise(ErrorKind::Command("delete"))),
        },
    };
    match (removal.record_deleted, removal.file_deleted) {
        (true, true) => println!("Video {filename:?} deleted"),
        (true, false) => println!("Video {filename:?} deleted (its file was already gone)"),
        (false, true) => println!("Deleted stray file {filename:?} (it had no metadata)"),
        (false, false) => println!("No video named {filename:?}; nothing to delete"),
    }
    Ok(())
}

async fn verify(library: &Library, prune: bool) -> Result<()> {
    let report = library.reconcile().await.or_raise(|| ErrorKind::Command("verify"))?;
    print!("{}", view::report(&report));
    if prune {
        let deleted: Vec<PathBuf> = library.prune(&report).await.or_raise(|| ErrorKind::Command("prune"))?;
        for path in &deleted {
            println!("deleted {}", path.display());
        }
    }
    Ok(())
}

fn reject(message: String) -> Result<()> {
    eprintln!("{message}");
    exn::bail!(ErrorKind::Rejected(message))
}
