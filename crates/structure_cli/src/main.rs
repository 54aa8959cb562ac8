//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open (or create) a structure store and seed the built-in structures.
//! - Print a deterministic summary for quick local sanity checks.
//!
//! Without a database path the store lives in memory.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use structure_core::{
    AllowAllPermissions, FactoryConfig, InMemoryContentTypeCache, LogEventSink, StructureService,
};

#[derive(Debug, Parser)]
#[command(version, about = "Seed and list a structure store")]
struct Args {
    /// SQLite file to open or create.
    db_path: Option<PathBuf>,

    /// Absolute directory for rolling log files.
    #[arg(long, value_name = "ABS_DIR")]
    log_dir: Option<String>,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(log_dir) = args.log_dir.as_deref() {
        structure_core::init_logging(structure_core::default_log_level(), log_dir)?;
    }

    let conn = match args.db_path.as_ref() {
        Some(path) => structure_core::open_db(path)?,
        None => structure_core::open_db_in_memory()?,
    };

    let service = StructureService::sqlite(
        &conn,
        AllowAllPermissions,
        Arc::new(InMemoryContentTypeCache::new()),
        Arc::new(LogEventSink),
        FactoryConfig::default(),
    );

    let seeded = service.create_default_structures()?;
    log::info!("event=cli_seed module=cli status=ok seeded={seeded}");

    println!("structure_core version={}", structure_core::core_version());
    println!("seeded_defaults={seeded}");
    for structure in service.structures_for_user(None, false, false)? {
        println!(
            "{}\t{:?}\t{}",
            structure.velocity_var_name, structure.structure_type, structure.name
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Args;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_path_and_log_dir() {
        let args = Args::try_parse_from(["structure_cli", "store.db", "--log-dir", "/tmp/logs"])
            .unwrap();
        assert_eq!(args.db_path, Some(PathBuf::from("store.db")));
        assert_eq!(args.log_dir.as_deref(), Some("/tmp/logs"));

        let bare = Args::try_parse_from(["structure_cli"]).unwrap();
        assert!(bare.db_path.is_none());
        assert!(bare.log_dir.is_none());
    }

    #[test]
    fn rejects_unknown_options_and_extra_paths() {
        assert!(Args::try_parse_from(["structure_cli", "--verbose"]).is_err());
        assert!(Args::try_parse_from(["structure_cli", "a.db", "b.db"]).is_err());
        assert!(Args::try_parse_from(["structure_cli", "--log-dir"]).is_err());
    }
}
