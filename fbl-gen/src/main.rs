use anyhow::{bail, Result};
use std::{fmt::Display, path::PathBuf};

use fbl::*;

use clap::{Parser, ValueEnum};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Verbosity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Parser)]
struct Args {
    /// AST JSON file written by the front end
    #[clap(value_parser)]
    ast: PathBuf,

    /// Typemap JSON file overlaid on the built-in Fortran library
    #[clap(short, long, value_parser)]
    typemaps: Option<PathBuf>,

    /// Directory the C++ and Fortran sources are written to
    #[clap(short, long, value_parser, default_value = ".")]
    output_directory: PathBuf,

    /// Bind config JSON file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Name of the Fortran module, overriding the config and the AST
    #[clap(short, long, value_parser)]
    module: Option<String>,

    /// Only generate the flat bind(C) interface, without proxy types
    #[clap(long, action)]
    no_proxy: bool,

    /// Bind a final procedure to release objects going out of scope
    #[clap(long, action)]
    finalize: bool,

    /// Verbosity of the output
    #[clap(short, long, arg_enum, value_parser)]
    verbosity: Option<Verbosity>,
}

impl Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verbosity::Trace => {
                write!(f, "trace")
            }
            Verbosity::Debug => {
                write!(f, "debug")
            }
            Verbosity::Info => {
                write!(f, "info")
            }
            Verbosity::Warn => {
                write!(f, "warn")
            }
            Verbosity::Error => {
                write!(f, "error")
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.verbosity {
        Some(v) => fbl_util::init_log_with_filter(&v.to_string()),
        None => fbl_util::init_log(),
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(module) = args.module {
        config.module_name = module;
    }
    if args.no_proxy {
        config.proxy_classes = false;
    }
    if args.finalize {
        config.finalizers = true;
    }

    let ast = read_ast(&args.ast)?;
    let typemaps = load_typemaps(args.typemaps.as_deref())?;

    let module = bind(&ast, &typemaps, &args.output_directory, &config)?;
    for diagnostic in &module.diagnostics {
        eprintln!("{diagnostic}");
    }

    if module.has_errors() {
        bail!("failed to generate module {}", module.name);
    }

    println!(
        "{}: {} bindings written to {}",
        module.name,
        module.bindings.len(),
        args.output_directory.display()
    );

    Ok(())
}
