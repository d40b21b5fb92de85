use std::fmt::Write;

use fbl_ast::{
    AccessorRole, ClassDecl, DeclKind, DeclarationNode, Parameter, QualType, SourceLocation, TypeRef, Typemap,
    TypemapAttachments,
};
use tracing::instrument;

use crate::diagnostic::DiagnosticKind;
use crate::error::Error;
use crate::module::write_code;
use crate::resolve::Warn;
use crate::subst::substitute;
use crate::Generator;
type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything the proxy emitter needs to know about a generated shim
#[derive(Debug, Clone)]
pub struct ShimOutput {
    pub wrapper_name: String,
    /// The name the shim is bound to in the `bind(C)` interface
    pub linkage_name: String,
    pub interface_decl: String,
    pub wrapper_body: String,
    pub is_subroutine: bool,
    /// Shim arguments (`fargN`) in call order. Zero-input parameters have none.
    pub arguments: Vec<String>,
    /// The parameters the shim was generated from, with the implicit `self` first for members that take one
    pub parameters: Vec<Parameter>,
    /// Per parameter, the parameter's own typemaps plus its resolved `in` typemap
    pub attachments: Vec<TypemapAttachments>,
    pub result: QualType,
}

impl ShimOutput {
    pub fn is_zero_input(&self, index: usize) -> bool {
        self.attachments
            .get(index)
            .and_then(|a| a.get("in"))
            .map(Typemap::is_zero_input)
            .unwrap_or(false)
    }
}

/// How a C++ value is held in a local variable of the shim
struct LocalType {
    qual_type: QualType,
    /// The local is a pointer to the declared value and must be dereferenced to pass it on
    deref: bool,
}

impl<'a> Generator<'a> {
    /// Local type for a parameter: references and classes passed by value are held through pointers, and
    /// top-level `const` is dropped so the local can be assigned
    fn parameter_local_type(&self, qual_type: &QualType) -> LocalType {
        let resolved = self
            .ast
            .resolve_typedefs(qual_type)
            .unwrap_or_else(|_| qual_type.clone());

        match resolved.type_ref() {
            TypeRef::LValueReference(pointee) | TypeRef::RValueReference(pointee) => LocalType {
                qual_type: QualType::pointer((**pointee).clone()),
                deref: true,
            },
            TypeRef::Pointer(_) => LocalType {
                qual_type: qual_type.strip_qualifiers(),
                deref: false,
            },
            _ if self.is_class_like(&resolved) => LocalType {
                qual_type: QualType::pointer(qual_type.clone()),
                deref: true,
            },
            _ => LocalType {
                qual_type: qual_type.strip_qualifiers(),
                deref: false,
            },
        }
    }

    /// Local type for the result: references are held through pointers, everything else by value
    fn result_local_type(&self, qual_type: &QualType) -> LocalType {
        let resolved = self
            .ast
            .resolve_typedefs(qual_type)
            .unwrap_or_else(|_| qual_type.clone());

        match resolved.type_ref() {
            TypeRef::LValueReference(pointee) | TypeRef::RValueReference(pointee) => LocalType {
                qual_type: QualType::pointer((**pointee).clone()),
                deref: true,
            },
            _ => LocalType {
                qual_type: qual_type.strip_qualifiers(),
                deref: false,
            },
        }
    }

    fn is_class_like(&self, qual_type: &QualType) -> bool {
        self.ast
            .categorize(qual_type)
            .map(|c| c.is_class_like())
            .unwrap_or(false)
    }

    /// Generate the C-linkage wrapper for `node` and the `bind(C)` interface describing it to Fortran.
    ///
    /// Fails with [`Error::DuplicateSymbol`] (after reporting it) if a non-overloaded wrapper of the same name was
    /// already generated. Missing typemaps are reported and replaced by placeholders.
    #[instrument(level = "trace", skip(self, node, class), fields(name = node.name()))]
    pub fn emit_shim(&mut self, node: &DeclarationNode, class: Option<&ClassDecl>) -> Result<ShimOutput> {
        let location = node.location().clone();
        let wrapper_name = format!(
            "{}{}{}",
            self.config.wrapper_prefix,
            node.sym_name(class),
            node.overload().unwrap_or("")
        );

        if !node.is_overloaded() {
            if let Err(previous) = self.function_symbols.register(&wrapper_name, &location) {
                self.resolver.diagnostics_mut().report(
                    DiagnosticKind::DuplicateSymbol,
                    &location,
                    format!("\"{wrapper_name}\" is already defined at {previous}"),
                );
                return Err(Error::DuplicateSymbol {
                    name: wrapper_name,
                    location,
                    previous,
                });
            }
        }

        let result = node.effective_result(class);
        let parameters = node.effective_parameters(class);
        let owner = if node.features().new_object { "1" } else { "0" };

        let ctype_out = self.code("ctype", &result, None, Some("out"), &location);
        let is_subroutine = ctype_out == "void";

        let attachments = self
            .resolver
            .attach("in", &parameters, Warn::MissingTemplate, &location);

        let mut locals = String::new();
        let mut c_args = Vec::new();
        let mut im_decls = Vec::new();
        let mut arguments = Vec::new();
        let mut input = String::new();
        let mut check = String::new();
        let mut argout = String::new();
        let mut cleanup = String::new();
        let mut local_types = Vec::new();

        // cleanup code is needed by `check` and `out`, so gather it first
        for (i, (p, att)) in parameters.iter().zip(attachments.iter()).enumerate() {
            let n = i + 1;
            if let Some(tm) = self.resolver.resolve("freearg", p.qual_type(), Some(att), Warn::Silent, None, &location) {
                let local = self.parameter_local_type(p.qual_type());
                let code = substitute(tm.code(), &parameter_replacements(n, &local, p.qual_type(), att));
                write_code(&mut cleanup, &code, "")?;
            }
        }

        for (i, (p, att)) in parameters.iter().zip(attachments.iter()).enumerate() {
            let n = i + 1;
            let local = self.parameter_local_type(p.qual_type());
            writeln!(locals, "  {} arg{n} ;", local.qual_type)?;

            let in_tm = self.resolver.resolve("in", p.qual_type(), Some(att), Warn::MissingTemplate, None, &location);
            let zero_input = in_tm.as_ref().map(Typemap::is_zero_input).unwrap_or(false);

            if !zero_input {
                let farg = format!("farg{n}");
                let ctype = self.code("ctype", p.qual_type(), Some(att), None, &location);
                let imtype = self.code("imtype", p.qual_type(), Some(att), None, &location);
                c_args.push(format!("{ctype} {farg}"));
                im_decls.push(format!("{imtype} :: {farg}"));
                arguments.push(farg);
            }

            let mut replacements = parameter_replacements(n, &local, p.qual_type(), att);
            if let Some(tm) = in_tm {
                write_code(&mut input, &substitute(tm.code(), &replacements), "  ")?;
            }

            replacements.push(("$cleanup", cleanup.trim_end().to_string()));
            if let Some(tm) = self.resolver.resolve("check", p.qual_type(), Some(att), Warn::Silent, None, &location) {
                write_code(&mut check, &substitute(tm.code(), &replacements), "  ")?;
            }
            if let Some(tm) = self.resolver.resolve("argout", p.qual_type(), Some(att), Warn::Silent, None, &location) {
                write_code(&mut argout, &substitute(tm.code(), &replacements), "  ")?;
            }

            local_types.push(local);
        }

        let result_local = self.result_local_type(&result);
        let action = match node.action() {
            Some(action) => action.to_string(),
            None => default_action(node, class, &local_types, &result, &result_local)?,
        };
        let action = match &node.features().exception {
            Some(exception) => substitute(exception, &[("$action", action.trim_end())]),
            None => action,
        };

        let mut output = String::new();
        if !result.is_void() {
            let out = self.code("out", &result, None, None, &location);
            let basetype = result.strip_all().to_string();
            let ltype = result_local.qual_type.to_string();
            output = substitute(
                &out,
                &[
                    ("$result", "fresult"),
                    ("$1", "result"),
                    ("$1_ltype", ltype.as_str()),
                    ("$1_basetype", basetype.as_str()),
                    ("$owner", owner),
                    ("$cleanup", cleanup.trim_end()),
                ],
            );
        }

        // wrapper
        let mut body = String::new();
        writeln!(
            body,
            "SWIGEXPORT {ctype_out} {wrapper_name}({}) {{",
            c_args.join(", ")
        )?;
        if !is_subroutine {
            writeln!(body, "  {ctype_out} fresult ;")?;
        }
        body.push_str(&locals);
        if !result.is_void() {
            writeln!(body, "  {} result ;", result_local.qual_type)?;
        }
        writeln!(body)?;
        body.push_str(&input);
        body.push_str(&check);
        write_code(&mut body, &action, "  ")?;
        write_code(&mut body, &output, "  ")?;
        body.push_str(&argout);
        write_code(&mut body, &cleanup, "  ")?;
        if !is_subroutine {
            writeln!(body, "  return ({ctype_out})fresult;")?;
        }
        writeln!(body, "}}\n")?;

        // interface
        let mut interface = String::new();
        let kind = if is_subroutine { "subroutine" } else { "function" };
        writeln!(interface, "{kind} {wrapper_name}({}) &", arguments.join(", "))?;
        if is_subroutine {
            writeln!(interface, "bind(C, name=\"{wrapper_name}\")")?;
        } else {
            writeln!(interface, "bind(C, name=\"{wrapper_name}\") &")?;
            writeln!(interface, "result(fresult)")?;
        }
        writeln!(interface, "use, intrinsic :: ISO_C_BINDING")?;
        for decl in &im_decls {
            writeln!(interface, "{decl}")?;
        }
        if !is_subroutine {
            let imtype_out = self.code("imtype", &result, None, Some("out"), &location);
            writeln!(interface, "{imtype_out} :: fresult")?;
        }
        writeln!(interface, "end {kind}")?;

        Ok(ShimOutput {
            linkage_name: wrapper_name.clone(),
            wrapper_name,
            interface_decl: interface,
            wrapper_body: body,
            is_subroutine,
            arguments,
            parameters,
            attachments,
            result,
        })
    }

    /// Code of a required typemap. Misses come back as the placeholder.
    fn code(
        &mut self,
        op: &str,
        qual_type: &QualType,
        attached: Option<&TypemapAttachments>,
        suffix: Option<&str>,
        location: &SourceLocation,
    ) -> String {
        self.resolver
            .resolve(op, qual_type, attached, Warn::MissingTemplate, suffix, location)
            .map(|tm| tm.code().to_string())
            .unwrap_or_default()
    }
}

fn parameter_replacements(
    n: usize,
    local: &LocalType,
    qual_type: &QualType,
    attachments: &TypemapAttachments,
) -> Vec<(&'static str, String)> {
    let zero_input = attachments.get("in").map(Typemap::is_zero_input).unwrap_or(false);
    vec![
        ("$input", if zero_input { String::new() } else { format!("farg{n}") }),
        ("$1", format!("arg{n}")),
        ("$1_ltype", local.qual_type.to_string()),
        ("$1_basetype", qual_type.strip_all().to_string()),
    ]
}

/// The C++ statement invoking the entity when the front end did not supply one. `locals` are the parameter
/// locals in order, `self` first for members that take one.
fn default_action(
    node: &DeclarationNode,
    class: Option<&ClassDecl>,
    locals: &[LocalType],
    result: &QualType,
    result_local: &LocalType,
) -> Result<String> {
    let class_name = || {
        class
            .map(|c| c.name().to_string())
            .ok_or_else(|| Error::MemberOutsideClass(node.name().to_string()))
    };

    let first_arg = if node.kind().has_self() { 2 } else { 1 };
    let args = locals
        .iter()
        .enumerate()
        .skip(first_arg - 1)
        .map(|(i, l)| if l.deref { format!("*arg{}", i + 1) } else { format!("arg{}", i + 1) })
        .collect::<Vec<_>>();

    let member = node.name().rsplit("::").next().unwrap_or(node.name());
    let call = match node.kind() {
        DeclKind::FreeFunction => format!("{}({})", node.name(), args.join(", ")),
        DeclKind::Constructor => format!("new {}({})", class_name()?, args.join(", ")),
        DeclKind::Destructor => return Ok("delete arg1;".to_string()),
        DeclKind::Method { .. } => format!("arg1->{member}({})", args.join(", ")),
        DeclKind::Accessor {
            field,
            role: AccessorRole::Get,
        } => format!("arg1->{field}"),
        DeclKind::Accessor {
            field,
            role: AccessorRole::Set,
        } => {
            let value = args.first().cloned().unwrap_or_default();
            return Ok(format!("arg1->{field} = {value};"));
        }
    };

    Ok(if result.is_void() {
        format!("{call};")
    } else if result_local.deref {
        format!("result = ({}) &{call};", result_local.qual_type)
    } else {
        format!("result = {call};")
    })
}
