//! Turn an [`AST`] into a C-linkage shim source and a Fortran module that binds it.
//!
//! Generation is a single pass over the AST items in declaration order. Each declaration goes through the shim
//! emitter ([`shim`]) and then the proxy emitter ([`proxy`]). Classes are bracketed by
//! [`begin_class`](Generator::begin_class) and [`end_class`](Generator::end_class), which own everything scoped to
//! one class. All code comes from typemaps found through the [`Resolver`].

use fbl_ast::{ClassDecl, DeclarationNode, Item, TypemapSource, AST};
use fbl_util::BindConfig;
use tracing::{debug, error, instrument};

pub mod class;
pub mod classname;
pub mod diagnostic;
pub mod error;
pub mod module;
pub mod overload;
pub mod proxy;
pub mod resolve;
pub mod shim;
pub mod subst;
pub mod symbols;

use class::ClassContext;
use diagnostic::{Diagnostic, DiagnosticKind};
use error::Error;
use module::ModuleOutput;
use overload::OverloadRegistry;
use proxy::EmissionMode;
use resolve::Resolver;
use symbols::SymbolTable;

type Result<T, E = Error> = std::result::Result<T, E>;

/// What was generated for one declaration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    /// The C++ name of the declaration
    pub name: String,
    /// Fortran name of the owning class, if any
    pub class: Option<String>,
    pub wrapper_name: String,
    /// `None` when proxies are disabled
    pub proxy_name: Option<String>,
}

#[derive(Debug)]
pub struct GeneratedModule {
    pub name: String,
    pub c_source: String,
    pub fortran_source: String,
    pub diagnostics: Vec<Diagnostic>,
    pub bindings: Vec<Binding>,
}

impl GeneratedModule {
    /// Did any declaration fail with a hard error? The sources are still complete for everything else.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.is_error())
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    pub fn c_file_name(&self) -> String {
        format!("{}_wrap.cxx", self.name)
    }

    pub fn fortran_file_name(&self) -> String {
        format!("{}.f90", self.name)
    }
}

pub struct Generator<'a> {
    pub(crate) ast: &'a AST,
    pub(crate) config: BindConfig,
    pub(crate) module_name: String,
    pub(crate) resolver: Resolver<'a>,
    pub(crate) function_symbols: SymbolTable,
    pub(crate) class_symbols: SymbolTable,
    pub(crate) module_overloads: OverloadRegistry,
    pub(crate) output: ModuleOutput,
    pub(crate) bindings: Vec<Binding>,
}

impl<'a> Generator<'a> {
    pub fn new(ast: &'a AST, typemaps: &'a dyn TypemapSource, config: &BindConfig) -> Generator<'a> {
        let module_name = if config.module_name.is_empty() {
            ast.name().to_string()
        } else {
            config.module_name.clone()
        };

        Generator {
            ast,
            config: config.clone(),
            module_name,
            resolver: Resolver::new(ast, typemaps),
            function_symbols: SymbolTable::new(),
            class_symbols: SymbolTable::new(),
            module_overloads: OverloadRegistry::new(),
            output: ModuleOutput::new(ast, config),
            bindings: Vec::new(),
        }
    }

    /// Generate every item of the AST in declaration order
    #[instrument(level = "trace", skip(self))]
    pub fn run(&mut self) -> Result<()> {
        let ast = self.ast;
        for item in ast.items() {
            let result = match item {
                Item::Function(function) => self.emit_function(function, None).map_err(|e| {
                    if e.is_skip() {
                        e
                    } else {
                        Error::FailedToGenerateFunction {
                            name: function.name().to_string(),
                            source: Box::new(e),
                        }
                    }
                }),
                Item::Class(id) => self.emit_class(ast.class(*id)),
                Item::Enum(id) => {
                    let enm = ast.enm(*id);
                    self.emit_enum(enm).map_err(|e| Error::FailedToGenerateEnum {
                        name: enm.name().to_string(),
                        source: Box::new(e),
                    })
                }
            };

            match result {
                Err(e) if e.is_skip() => debug!("skipped: {e}"),
                Err(e) => {
                    error!("{e}");
                    return Err(e);
                }
                Ok(()) => (),
            }
        }

        Ok(())
    }

    /// Splice in the module-level tables and serialize the output streams
    pub fn finish(mut self) -> Result<GeneratedModule> {
        self.write_module_tables()?;

        let c_source = self.output.c_source();
        let fortran_source = self.output.fortran_source(&self.module_name);

        Ok(GeneratedModule {
            name: self.module_name,
            c_source,
            fortran_source,
            diagnostics: self.resolver.diagnostics.into_vec(),
            bindings: self.bindings,
        })
    }

    /// Run the shim and proxy emitters for one declaration. `class` is the context of the class being generated,
    /// if the declaration is a member.
    #[instrument(level = "trace", skip(self, node, class), fields(name = node.name()))]
    pub fn emit_function(&mut self, node: &DeclarationNode, mut class: Option<&mut ClassContext<'a>>) -> Result<()> {
        let class_decl: Option<&'a ClassDecl> = class.as_ref().map(|c| c.class);
        if node.kind().is_member() && class_decl.is_none() {
            return Err(Error::MemberOutsideClass(node.name().to_string()));
        }

        let shim = self.emit_shim(node, class_decl)?;
        self.output.c_wrapper.push_str(&shim.wrapper_body);
        self.output.f_interfaces.push_str(&shim.interface_decl);

        let proxy_name = if self.config.proxy_classes {
            let mode = EmissionMode::for_kind(node.kind());
            let proxy = self.emit_proxy(node, mode, &shim, class.as_deref_mut())?;
            self.output.f_proxies.push_str(&proxy.routine);

            if let (EmissionMode::Destructor, true, Some(ctx)) = (mode, self.config.finalizers, class) {
                self.emit_finalizer(ctx, &shim)?;
            }

            Some(proxy.proxy_name)
        } else {
            self.output.f_public.push_str(&format!(" public :: {}\n", shim.wrapper_name));
            None
        };

        self.bindings.push(Binding {
            name: node.name().to_string(),
            class: class_decl.map(|c| c.public_name()),
            wrapper_name: shim.wrapper_name,
            proxy_name,
        });

        Ok(())
    }
}

/// Generate the shim and Fortran module for `ast` in one go
pub fn generate(ast: &AST, typemaps: &dyn TypemapSource, config: &BindConfig) -> Result<GeneratedModule> {
    let mut generator = Generator::new(ast, typemaps, config);
    generator.run()?;
    generator.finish()
}
