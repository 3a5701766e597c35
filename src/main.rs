//! PMU CLI
//!
//! Entry point for the `pmu` command-line tool.

use clap::{Parser, Subcommand};
use pmu::composer::{PackageManager, SystemComposer};
use pmu::config::ProjectConfig;
use pmu::graph::CollectOptions;
use pmu::manifest::Manifest;
use std::env;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "pmu")]
#[command(about = "Mono-repository package management utility", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Blend the mono-repository dependencies into each project
    Blend {
        /// Blend dev requirements
        #[arg(long, short = 'D')]
        dev: bool,

        /// Blend both require and require-dev
        #[arg(long)]
        all: bool,

        /// Only blend projects that require the mono-repository package
        #[arg(long = "self")]
        self_only: bool,

        /// Dot-delimited JSON path to blend (escape literal dots as "\.")
        #[arg(long = "json-path")]
        json_path: Option<String>,

        /// Literal value to write instead of reading the root manifest
        #[arg(long)]
        value: Option<String>,

        /// Write dependencies and pointer segments that do not exist yet
        #[arg(long)]
        force: bool,

        /// Projects to blend (default: all)
        projects: Vec<String>,
    },

    /// Check that cross-project imports are declared as dependencies
    #[command(name = "check-dependencies")]
    CheckDependencies {
        /// Base directory of the monorepo (default: current directory)
        #[arg(long = "working-directory", short = 'w')]
        working_directory: Option<PathBuf>,
    },

    /// Output the graph of dependencies in the DOT format
    Graph {
        /// Projects to generate the graph for (default: all)
        projects: Vec<String>,
    },

    /// Link mono-repository projects as local path repositories
    Link {
        /// Path to the monorepo root (default: current directory)
        path: Option<PathBuf>,

        /// Directory of the invoking project (default: current directory)
        #[arg(long = "working-directory", short = 'w')]
        working_directory: Option<PathBuf>,
    },

    /// Execute a composer command on every package of the monorepo
    All {
        /// Stop at the first project whose command exits nonzero
        #[arg(long)]
        stop_on_failure: bool,

        /// The composer command and its arguments
        #[arg(trailing_var_arg = true, required = true)]
        args: Vec<String>,
    },

    /// Run a composer command inside one project: `pmu <project> <cmd...>`
    #[command(external_subcommand)]
    Project(Vec<String>),
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Blend {
            dev,
            all,
            self_only,
            json_path,
            value,
            force,
            projects,
        } => run_blend(pmu::BlendOptions {
            dev,
            all,
            self_only,
            json_path,
            value,
            force,
            projects,
        }),
        Commands::CheckDependencies { working_directory } => run_check(working_directory),
        Commands::Graph { projects } => run_graph(projects),
        Commands::Link {
            path,
            working_directory,
        } => run_link(path, working_directory),
        Commands::All {
            stop_on_failure,
            args,
        } => run_all(stop_on_failure, &args),
        Commands::Project(args) => run_project(&args),
    };

    process::exit(code);
}

/// Load the monorepo config from the composer.json in `base_dir`
fn load_config(base_dir: &Path) -> Result<(Manifest, ProjectConfig), String> {
    let root_path = base_dir.join("composer.json");
    let root = Manifest::read(&root_path).map_err(|e| e.to_string())?;
    let config = ProjectConfig::load(&root, base_dir).map_err(|e| e.to_string())?;
    Ok((root, config))
}

fn current_dir() -> Result<PathBuf, String> {
    env::current_dir().map_err(|e| format!("Cannot determine the working directory: {e}"))
}

fn run_blend(options: pmu::BlendOptions) -> i32 {
    if options.value.is_some() && options.json_path.is_none() && !options.self_only {
        eprintln!("--value requires --json-path or --self.");
        return 1;
    }

    let base_dir = match current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let (root, config) = match load_config(&base_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    match pmu::blend(&config, &root, &options) {
        Ok(report) => {
            for message in &report.messages {
                println!("{message}");
            }
            i32::from(report.failed)
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn run_check(working_directory: Option<PathBuf>) -> i32 {
    let base_dir = match working_directory.map_or_else(current_dir, Ok) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let (_, config) = match load_config(&base_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let options = CollectOptions {
        compute_class_map: true,
        include_dev: true,
        projects: None,
    };
    let data = match pmu::collect(&config, &options) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    match pmu::audit(&config, &data) {
        Ok(violations) if violations.is_empty() => {
            println!("All your projects dependencies are declared as \"require\" or \"require_dev\"");
            0
        }
        Ok(violations) => {
            for violation in &violations {
                println!("{}", violation.message());
            }
            1
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn run_graph(projects: Vec<String>) -> i32 {
    let base_dir = match current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let (_, config) = match load_config(&base_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let options = CollectOptions {
        compute_class_map: false,
        include_dev: false,
        projects: (!projects.is_empty()).then_some(projects),
    };

    match pmu::collect(&config, &options) {
        Ok(data) => {
            println!("{}", data.to_dot());
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn run_link(path: Option<PathBuf>, working_directory: Option<PathBuf>) -> i32 {
    let wd = match working_directory.map_or_else(current_dir, Ok) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let monorepo_dir = match path {
        Some(p) if p.is_relative() => wd.join(p),
        Some(p) => p,
        None => wd.clone(),
    };

    let root_path = monorepo_dir.join("composer.json");
    let root = match Manifest::read(&root_path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let invoking_path = wd.join("composer.json");
    let invoking = match Manifest::read(&invoking_path) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let config = match ProjectConfig::load_for(&root, &monorepo_dir, Some(&invoking)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    match pmu::link::link(&config, &invoking_path, &SystemComposer::new()) {
        Ok(report) => report.update_exit,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}

fn run_all(stop_on_failure: bool, args: &[String]) -> i32 {
    let base_dir = match current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let (_, config) = match load_config(&base_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let composer = SystemComposer::new();
    let mut exit_code = 0;

    for project in &config.projects {
        let dir = config
            .manifest_files
            .get(project)
            .and_then(|p| p.parent().map(Path::to_path_buf));

        let Some(dir) = dir.filter(|d| d.is_dir()) else {
            println!("Package \"{project}\" could not be found.");
            exit_code = 1;
            continue;
        };

        println!("Execute \"{}\" on \"{project}\"", args.join(" "));

        match composer.run(&dir, args) {
            Ok(code) if code != 0 => {
                if exit_code == 0 {
                    exit_code = code;
                }
                if stop_on_failure {
                    return exit_code;
                }
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("{e}");
                if stop_on_failure {
                    return 1;
                }
                exit_code = 1;
            }
        }
    }

    exit_code
}

fn run_project(args: &[String]) -> i32 {
    let Some((project, rest)) = args.split_first() else {
        eprintln!("No project given.");
        return 1;
    };

    let base_dir = match current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let (_, config) = match load_config(&base_dir) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{e}");
            return 1;
        }
    };

    let Some(dir) = config
        .manifest_files
        .get(project)
        .and_then(|p| p.parent().map(Path::to_path_buf))
    else {
        eprintln!("Package \"{project}\" could not be found.");
        return 1;
    };

    if rest.first().map(String::as_str) == Some("--cwd") {
        println!("{}", dir.display());
        return 0;
    }

    match SystemComposer::new().run(&dir, rest) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}
