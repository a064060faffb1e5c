//! Project join-point model CLI.
//!
//! Provides the `acm` binary for maintaining a project model file across
//! builds: `merge` folds one translation unit's model into the project
//! model, `dump`, `select` and `stats` inspect a model file.
//!
//! Reads configuration from environment variables:
//! - `ACM_PROJECT`: project model file used when `--project` is omitted
//! - `ACM_MODEL_VERSION`: version stamped into written models (default:
//!   the tool version)

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;

use acm_core::{DefaultPolicy, JoinPointType, ProjectModel};
use acm_storage::{update_project, ModelStore, StorageError, XmlFileStore};

/// Project join-point model tools.
#[derive(Parser)]
#[command(name = "acm", about = "Project join-point model tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Merge a translation unit model into the project model.
    Merge {
        /// Project model file (default: $ACM_PROJECT).
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Translation unit model file.
        unit: PathBuf,
    },

    /// Print a model as an indented tree.
    Dump {
        /// Model file.
        file: PathBuf,
    },

    /// List the join points of the given kinds.
    Select {
        /// Model file.
        file: PathBuf,

        /// Kind or family name (Function, Class, Code, Any, ...).
        #[arg(short, long = "kind", required = true)]
        kinds: Vec<String>,

        /// Include classes and aspects not seen in any translation unit.
        #[arg(long)]
        all: bool,
    },

    /// Print live node counts per kind as JSON.
    Stats {
        /// Model file.
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Merge { project, unit } => run_merge(project, &unit),
        Commands::Dump { file } => run_dump(&file),
        Commands::Select { file, kinds, all } => run_select(&file, &kinds, all),
        Commands::Stats { file } => run_stats(&file),
    };
    process::exit(exit_code);
}

/// Exit code for a storage failure: 3 for I/O, 1 for everything else.
fn exit_code(e: &StorageError) -> i32 {
    match e {
        StorageError::Io(_) | StorageError::NotFound(_) => 3,
        _ => 1,
    }
}

fn model_version() -> String {
    std::env::var("ACM_MODEL_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string())
}

fn load(path: &Path) -> Result<ProjectModel, i32> {
    let mut model = ProjectModel::new();
    XmlFileStore::new(path).load(&mut model).map_err(|e| {
        eprintln!("Error: failed to load '{}': {}", path.display(), e);
        exit_code(&e)
    })?;
    Ok(model)
}

/// Execute the merge subcommand.
///
/// Returns exit code: 0 = success, 1 = malformed model, 2 = no project
/// file given, 3 = I/O error.
fn run_merge(project: Option<PathBuf>, unit: &Path) -> i32 {
    let project = match project.or_else(|| std::env::var_os("ACM_PROJECT").map(PathBuf::from)) {
        Some(p) => p,
        None => {
            eprintln!("Error: no project file given (use --project or set ACM_PROJECT)");
            return 2;
        }
    };

    let mut tu = match load(unit) {
        Ok(m) => m,
        Err(code) => return code,
    };

    let version = model_version();
    let mut store = XmlFileStore::new(&project);
    info!(project = %project.display(), unit = %unit.display(), "merging");
    match update_project(&mut store, &mut tu, &version, &mut DefaultPolicy) {
        Ok(outcome) => {
            let json = serde_json::to_string_pretty(&outcome).unwrap_or_else(|e| {
                format!("{{\"error\": \"failed to serialize result: {}\"}}", e)
            });
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: failed to update '{}': {}", project.display(), e);
            exit_code(&e)
        }
    }
}

fn run_dump(file: &Path) -> i32 {
    match load(file) {
        Ok(model) => {
            print!("{}", model.dump());
            0
        }
        Err(code) => code,
    }
}

/// Union of the masks named in `names`.
fn parse_mask(names: &[String]) -> Result<JoinPointType, String> {
    names.iter().try_fold(JoinPointType::NONE, |mask, name| {
        JoinPointType::from_name(name)
            .map(|m| mask | m)
            .ok_or_else(|| format!("unknown kind '{}'", name))
    })
}

fn run_select(file: &Path, kinds: &[String], all: bool) -> i32 {
    let mask = match parse_mask(kinds) {
        Ok(mask) => mask,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 2;
        }
    };
    let model = match load(file) {
        Ok(m) => m,
        Err(code) => return code,
    };
    for id in model.select(mask, !all) {
        match model.data(id).ok().and_then(|d| d.jpid()) {
            Some(jpid) => println!("{}\t{}", jpid, model.key(id)),
            None => println!("-\t{}", model.key(id)),
        }
    }
    0
}

fn run_stats(file: &Path) -> i32 {
    let model = match load(file) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let mut counts = serde_json::Map::new();
    for (kind, n) in model.census() {
        counts.insert(kind.type_str().to_string(), n.into());
    }
    let stats = serde_json::json!({
        "version": model.version(),
        "nodes": counts,
        "jpids": model.jpids().high_water(),
    });
    let json = serde_json::to_string_pretty(&stats)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize stats: {}\"}}", e));
    println!("{}", json);
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use acm_core::Kind;

    #[test]
    fn parses_merge_command() {
        let cli = Cli::try_parse_from(["acm", "merge", "--project", "p.acp", "tu.acm"]).unwrap();
        match cli.command {
            Commands::Merge { project, unit } => {
                assert_eq!(project, Some(PathBuf::from("p.acp")));
                assert_eq!(unit, PathBuf::from("tu.acm"));
            }
            _ => panic!("expected merge"),
        }
    }

    #[test]
    fn select_requires_a_kind() {
        assert!(Cli::try_parse_from(["acm", "select", "p.acp"]).is_err());
        let cli =
            Cli::try_parse_from(["acm", "select", "p.acp", "-k", "Function", "--kind", "Class"])
                .unwrap();
        match cli.command {
            Commands::Select { kinds, all, .. } => {
                assert_eq!(kinds, vec!["Function", "Class"]);
                assert!(!all);
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn mask_from_kind_and_family_names() {
        let mask = parse_mask(&["Function".to_string(), "Access".to_string()]).unwrap();
        assert!(mask.contains(Kind::Function));
        assert!(mask.contains(Kind::Call));
        assert!(!mask.contains(Kind::Class));
        assert!(parse_mask(&["Gadget".to_string()]).is_err());
    }

    #[test]
    fn storage_errors_map_to_exit_codes() {
        let io = StorageError::Io(std::io::Error::other("disk"));
        assert_eq!(exit_code(&io), 3);
        assert_eq!(exit_code(&StorageError::MissingIds), 1);
    }
}
