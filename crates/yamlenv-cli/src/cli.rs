//! yamlenv CLI - inspect config files and launch programs under them
//!
//! Usage:
//!   yamlenv check config.yml
//!   yamlenv dump config.yml --format env
//!   yamlenv get config.yml DATABASE_HOST
//!   yamlenv set config.yml DATABASE_HOST db.internal
//!   yamlenv run config.yml -- ./server --port 8080

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use yamlenv_core::env::check_var;
use yamlenv_core::{Configuration, InitOutcome, Loader, DEFAULT_SENTINEL};

/// yamlenv - Load YAML key/value files into the process environment
#[derive(Parser)]
#[command(name = "yamlenv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that config files parse
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the configuration in another format
    Dump {
        /// Configuration file
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = DumpFormat::Yaml)]
        format: DumpFormat,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the value a key would get in the environment
    Get {
        /// Configuration file
        file: PathBuf,

        /// Variable name
        key: String,

        /// Default value if the key is not in the file
        #[arg(short, long)]
        default: Option<String>,
    },

    /// Set a key in the config file, creating the file if needed
    Set {
        /// Configuration file
        file: PathBuf,

        /// Variable name
        key: String,

        /// Variable value
        value: String,
    },

    /// Load the file into the environment (unless the sentinel is set) and run a program
    Run {
        /// Configuration file
        file: PathBuf,

        /// Variable whose presence means the environment is already configured
        #[arg(long, default_value = DEFAULT_SENTINEL)]
        sentinel: String,

        /// Program and arguments to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DumpFormat {
    Yaml,
    Json,
    Env,
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Check { files } => cmd_check(files),
        Commands::Dump {
            file,
            format,
            output,
        } => cmd_dump(&file, format, output),
        Commands::Get { file, key, default } => cmd_get(&file, &key, default),
        Commands::Set { file, key, value } => cmd_set(&file, key, value),
        Commands::Run {
            file,
            sentinel,
            command,
        } => cmd_run(&file, sentinel, &command),
    }
}

/// Log to stderr, filtered by RUST_LOG (default `info`)
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Already installed when embedded in another binary
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(file: &Path) -> Result<Configuration, String> {
    Configuration::load(file).map_err(|e| format!("Failed to load {}: {}", file.display(), e))
}

fn cmd_check(files: Vec<PathBuf>) -> ExitCode {
    let mut all_valid = true;

    for file in files {
        match Configuration::load(&file) {
            Ok(config) => {
                println!(
                    "{} {}: {} entries",
                    "✓".green(),
                    file.display(),
                    config.len()
                );
            }
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn cmd_dump(file: &Path, format: DumpFormat, output: Option<PathBuf>) -> ExitCode {
    let config = match load_config(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let result = match format {
        DumpFormat::Yaml => config.to_yaml(),
        DumpFormat::Json => config.to_json().map(|json| json + "\n"),
        DumpFormat::Env => Ok(config.to_dotenv()),
    };

    match result {
        Ok(content) => {
            if let Some(output_path) = output {
                if let Err(e) = std::fs::write(&output_path, &content) {
                    eprintln!("{}: {}", "Error writing file".red(), e);
                    return ExitCode::from(2);
                }
                eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
            } else {
                print!("{}", content);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_get(file: &Path, key: &str, default: Option<String>) -> ExitCode {
    let config = match load_config(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    match (config.get(key), default) {
        (Some(value), _) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        (None, Some(default_val)) => {
            println!("{}", default_val);
            ExitCode::SUCCESS
        }
        (None, None) => {
            eprintln!("{}: Key '{}' not found", "Error".red(), key);
            ExitCode::from(1)
        }
    }
}

fn cmd_set(file: &Path, key: String, value: String) -> ExitCode {
    // Keys `run` would reject never reach the file
    if let Err(e) = check_var(&key, &value) {
        eprintln!("{}: {}", "Error".red(), e);
        return ExitCode::from(1);
    }

    let mut config = if file.exists() {
        match load_config(file) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}", e.red());
                return ExitCode::from(2);
            }
        }
    } else {
        Configuration::default()
    };

    config.set(key.as_str(), value);

    if let Err(e) = config.save(file) {
        eprintln!("{}: {}", "Error writing file".red(), e);
        return ExitCode::from(2);
    }
    eprintln!("{} Set {} in {}", "✓".green(), key, file.display());
    ExitCode::SUCCESS
}

/// Configure the real environment, then hand over to the program
///
/// Configuration must succeed or the program is never started.
fn cmd_run(file: &Path, sentinel: String, command: &[String]) -> ExitCode {
    let mut loader = Loader::system().with_sentinel(sentinel);

    match loader.init_environment(file) {
        Ok(InitOutcome::Applied { count }) => {
            log::debug!("Applied {} entries from {}", count, file.display());
        }
        Ok(InitOutcome::Skipped { .. }) => {}
        // The loader logs the full error at `error` level
        Err(e) => {
            log::debug!("Not starting {:?}: {:?}", command, e.kind);
            return ExitCode::from(1);
        }
    }

    let Some((program, args)) = command.split_first() else {
        eprintln!("{}: No program given", "Error".red());
        return ExitCode::from(2);
    };

    match std::process::Command::new(program).args(args).status() {
        Ok(status) => match status.code() {
            Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
            // Terminated by a signal
            None => ExitCode::from(1),
        },
        Err(e) => {
            eprintln!("{}: Failed to start {}: {}", "Error".red(), program, e);
            ExitCode::from(127)
        }
    }
}
