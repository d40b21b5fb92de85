use std::{ops::Deref, path::Path};

use env_logger::fmt::Color;
use log::Level;

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

pub enum Error {
    Any(Box<dyn std::error::Error + 'static>),
    Compare,
}

impl<E> From<E> for Error
where
    E: std::error::Error + 'static,
{
    fn from(e: E) -> Self {
        Error::Any(Box::new(e))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Any(e) => write!(f, "{e:?}"),
            Error::Compare => write!(f, "Comparison failed"),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(feature = "telemetry")]
pub fn run_test<F>(closure: F) -> Result<(), Error>
where
    F: FnOnce() -> Result<(), Error>,
{
    use opentelemetry::global;
    use tracing::{error, span};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::Registry;

    global::set_text_map_propagator(opentelemetry_jaeger::Propagator::new());
    let tracer = opentelemetry_jaeger::new_pipeline()
        .install_simple()
        .map_err(|e| Error::Any(Box::new(e)))?;

    let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    let subscriber = Registry::default().with(telemetry);

    let res = tracing::subscriber::with_default(subscriber, || {
        let root = span!(tracing::Level::TRACE, "fabble_test");
        let _enter = root.enter();

        closure()
    });
    global::shutdown_tracer_provider();

    res.map_err(|err| {
        error!("{err}");
        if let Error::Any(ref err) = err {
            for e in source_iter(err.deref()) {
                error!("  because: {e}")
            }
        }

        err
    })
}

/// Run `closure` with logging initialized, printing the whole error chain if it fails
#[cfg(not(feature = "telemetry"))]
pub fn run_test<F>(closure: F) -> Result<(), Error>
where
    F: FnOnce() -> Result<(), Error>,
{
    use tracing::error;

    init_log();

    let res = closure();

    res.map_err(|err| {
        error!("{err}");

        if let Error::Any(ref err) = err {
            for e in source_iter(err.deref()) {
                error!("  because: {e}")
            }
        }

        err
    })
}

/// Initialize env_logger with a compact, colored format. Safe to call more than once.
pub fn init_log() {
    init_log_with_filter("warn")
}

pub fn init_log_with_filter(default_filter: &str) {
    use std::io::Write;

    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format(|buf, record| -> Result<(), std::io::Error> {
            let mut level_style = buf.style();
            match record.level() {
                Level::Trace => level_style.set_color(Color::Blue),
                Level::Debug => level_style.set_color(Color::White),
                Level::Info => level_style.set_color(Color::Cyan),
                Level::Warn => level_style.set_color(Color::Yellow),
                Level::Error => level_style.set_color(Color::Red),
            };

            writeln!(
                buf,
                "{} [{}:{}] {}",
                level_style.value(record.level()),
                record.file().unwrap_or(""),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .try_init();
}

/// Line-diff `left` against `right`, printing the diff and failing if they differ
pub fn compare(left: &str, right: &str) -> Result<(), Error> {
    use colored::Colorize;
    let diff = TextDiff::from_lines(left, right);

    let mut same = true;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Delete => {
                same = false;
                print!("{}", format!("-| {change}").color(colored::Color::Red));
            }
            ChangeTag::Insert => {
                same = false;
                print!("{}", format!("+| {change}").color(colored::Color::Green));
            }
            ChangeTag::Equal => {
                print!("{}", format!(" | {change}").color(colored::Color::BrightBlack));
            }
        };
    }

    if same {
        Ok(())
    } else {
        println!();
        Err(Error::Compare)
    }
}

pub fn source_iter(
    error: &(impl std::error::Error + ?Sized),
) -> impl Iterator<Item = &(dyn std::error::Error + 'static)> {
    SourceIter {
        current: error.source(),
    }
}

pub struct SourceIter<'a> {
    current: Option<&'a (dyn std::error::Error + 'static)>,
}

impl<'a> Iterator for SourceIter<'a> {
    type Item = &'a (dyn std::error::Error + 'static);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current;
        self.current = self.current.and_then(std::error::Error::source);
        current
    }
}

#[derive(Debug)]
pub struct Trace(pub backtrace::Backtrace);

impl Trace {
    pub fn new() -> Trace {
        Trace(backtrace::Backtrace::new())
    }
}

impl Default for Trace {
    fn default() -> Self {
        Trace::new()
    }
}

impl std::fmt::Display for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match std::env::var("RUST_BACKTRACE") {
            Ok(value) if value == "1" => {
                write!(f, "Backtrace:\n{:?}", self.0)
            }
            _ => Ok(()),
        }
    }
}

impl std::error::Error for Trace {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// JSON config shared between the fbl frontend and the fbl-gen binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindConfig {
    /// Name of the generated Fortran module. The C shim is written to `<module_name>_wrap.cxx`. If empty, the name
    /// stored in the AST is used.
    pub module_name: String,
    /// Generate derived types with bound procedures for classes. When false only the flat `bind(C)` interface is
    /// emitted, and it is made public.
    pub proxy_classes: bool,
    /// Bind a `final` procedure that destroys the C++ object when a proxy goes out of scope
    pub finalizers: bool,
    /// Prefix for the C-linkage shim functions
    pub wrapper_prefix: String,
    /// Prefix for the Fortran proxy routines of class members and overloaded functions. Other free functions are
    /// named after the function itself.
    pub proxy_prefix: String,
    /// Extra modules to `use` at the top of the generated module
    pub imports: Vec<String>,
}

impl Default for BindConfig {
    fn default() -> Self {
        BindConfig {
            module_name: String::new(),
            proxy_classes: true,
            finalizers: false,
            wrapper_prefix: "swigc_".to_string(),
            proxy_prefix: "swigf_".to_string(),
            imports: Vec::new(),
        }
    }
}

pub fn write_bind_config(
    path: impl AsRef<Path>,
    bind_config: &BindConfig,
) -> Result<(), Box<dyn std::error::Error + 'static + Send + Sync>> {
    std::fs::write(path.as_ref(), serde_json::to_string_pretty(&bind_config)?)?;
    Ok(())
}

pub fn read_bind_config(
    path: impl AsRef<Path>,
) -> Result<BindConfig, Box<dyn std::error::Error + 'static + Send + Sync>> {
    let s = std::fs::read_to_string(path)?;
    let config = serde_json::from_str::<BindConfig>(&s)?;
    Ok(config)
}
