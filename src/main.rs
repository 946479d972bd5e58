use std::fs::File;
use std::io::{self, copy, BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use log::error;
use time::format_description::well_known::Rfc3339;

use gridstream::{Error, FileMetadata, Grid, ReadOptions, StoreConfig, WriteOptions};
use store::sql::SqlStore;

mod cli;
use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::Select;

fn select(select: &Select) -> ReadOptions {
    ReadOptions {
        id: select.id.clone().map(Into::into),
        filename: select.filename.clone(),
        ..ReadOptions::default()
    }
}

fn print_file(file: &FileMetadata) -> Result<(), Error> {
    println!("id:           {}", file.id);
    println!("root:         {}", file.root);
    println!("filename:     {}", file.filename.as_deref().unwrap_or("-"));
    println!("length:       {}", file.length);
    println!("chunk_size:   {}", file.chunk_size);
    println!("chunks:       {}", file.chunk_count());
    println!("checksum:     {}", file.checksum);
    println!("upload_date:  {}", file.upload_date.format(&Rfc3339)?);
    println!("content_type: {}", file.content_type.as_deref().unwrap_or("-"));
    if !file.aliases.is_empty() {
        println!("aliases:      {}", file.aliases.join(", "));
    }
    for (key, value) in &file.metadata {
        println!("metadata:     {} = {}", key, value);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut config = match &cli.config {
        None => StoreConfig::default(),
        Some(path) => StoreConfig::from_toml(&std::fs::read_to_string(path)?)?,
    };
    if let Some(root) = cli.root {
        config.root = root;
    }

    let store = SqlStore::open(Some(&cli.db))?;
    let grid = Grid::new(&store, config)?;

    match cli.command {
        Commands::Put {
            path,
            filename,
            chunk_size,
            content_type,
            alias,
        } => {
            let filename = filename.or_else(|| {
                path.file_name()
                    .filter(|_| path.as_os_str() != "-")
                    .map(|name| name.to_string_lossy().into_owned())
            });
            let options = WriteOptions {
                filename,
                chunk_size,
                content_type,
                aliases: alias,
                ..WriteOptions::default()
            };

            let mut upload = grid.create_write(options)?;
            let pumped = if path.as_os_str() == "-" {
                upload.write_from(&mut io::stdin().lock())
            } else {
                File::open(&path)
                    .map_err(Error::from)
                    .and_then(|mut f| upload.write_from(&mut f))
            };

            // Chunks without a record are never reconciled, drop them on any failure
            match pumped.and_then(|_| upload.end()) {
                Ok(file) => println!("{}", file.id),
                Err(e) => {
                    upload.abort()?;
                    return Err(e);
                }
            }
        }
        Commands::Get {
            select: sel,
            start,
            end,
            out,
        } => {
            let options = ReadOptions {
                range_start: start,
                range_end: end,
                ..select(&sel)
            };
            let mut download = grid.create_read(&options)?;

            let mut writer: Box<dyn Write> = match out {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(BufWriter::new(io::stdout().lock())),
            };
            copy(&mut download, &mut writer)?;
            writer.flush()?;
        }
        Commands::Stat { select: sel } => {
            let file = grid.find_one(&select(&sel))?.ok_or(Error::NotFound)?;
            print_file(&file)?;
        }
        Commands::Ls => {
            for file in grid.list(None)? {
                println!(
                    "{}\t{}\t{}",
                    file.id,
                    file.length,
                    file.filename.as_deref().unwrap_or("-")
                );
            }
        }
        Commands::Rm { select: sel } => {
            if !grid.remove(&select(&sel))? {
                return Err(Error::NotFound);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
