use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

pub use fbl_ast::{read_ast, read_typemaps, TypemapSource, TypemapTable, AST};
pub use fbl_util::{read_bind_config, BindConfig};
pub use fbl_write::{diagnostic::Diagnostic, diagnostic::DiagnosticKind, generate, Binding, GeneratedModule};

pub mod error;
pub use error::Error;

/// The built-in Fortran typemap library, overlaid with the typemaps in `path` if one is given
pub fn load_typemaps(path: Option<&Path>) -> Result<TypemapTable, Error> {
    let mut typemaps = TypemapTable::fortran();
    if let Some(path) = path {
        let user = read_typemaps(path)?;
        debug!("read {} typemaps from {}", user.len(), path.display());
        typemaps.extend(user);
    }
    Ok(typemaps)
}

pub fn load_config(path: Option<&Path>) -> Result<BindConfig, Error> {
    match path {
        Some(path) => read_bind_config(path).map_err(|source| Error::FailedToReadConfig {
            path: path.display().to_string(),
            source,
        }),
        None => Ok(BindConfig::default()),
    }
}

/// Generate the bindings for `ast` and write `<module>_wrap.cxx` and `<module>.f90` to `output_directory`.
///
/// The files are written even if some declarations failed with hard errors, check
/// [`GeneratedModule::has_errors`] on the returned module.
pub fn bind(
    ast: &AST,
    typemaps: &dyn TypemapSource,
    output_directory: impl AsRef<Path>,
    config: &BindConfig,
) -> Result<GeneratedModule, Error> {
    let module = generate(ast, typemaps, config)?;
    debug!(
        "C SOURCE:\n--------\n{}--------\n\nFORTRAN SOURCE:\n--------\n{}--------",
        module.c_source, module.fortran_source
    );

    let (c_path, f_path) = write_module(&module, output_directory)?;
    info!("wrote {} and {}", c_path.display(), f_path.display());

    if module.has_errors() {
        warn!(
            "{} declarations of module {} could not be generated",
            module.diagnostics.iter().filter(|d| d.kind.is_error()).count(),
            module.name
        );
    }

    Ok(module)
}

/// Write the two sources of `module` to `output_directory`, returning the paths of the C and Fortran files
pub fn write_module(module: &GeneratedModule, output_directory: impl AsRef<Path>) -> Result<(PathBuf, PathBuf), Error> {
    let output_directory = output_directory.as_ref();
    let to_err = |path: &Path| {
        let path = path.display().to_string();
        move |source: std::io::Error| Error::FailedToWriteOutput { path, source }
    };

    std::fs::create_dir_all(output_directory).map_err(to_err(output_directory))?;

    let c_path = output_directory.join(module.c_file_name());
    std::fs::write(&c_path, &module.c_source).map_err(to_err(&c_path))?;

    let f_path = output_directory.join(module.fortran_file_name());
    std::fs::write(&f_path, &module.fortran_source).map_err(to_err(&f_path))?;

    Ok((c_path, f_path))
}
