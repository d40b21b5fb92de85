use fbl_ast::{QualType, SourceLocation, TypeCategory};
use tracing::warn;

use crate::diagnostic::DiagnosticKind;
use crate::resolve::{placeholder_name, Resolver};
use crate::subst::substitute;

/// The token replaced by the Fortran name of a class or enum
pub const FCLASSNAME: &str = "$fclassname";

/// Kind used for anonymous enums and enums the AST does not declare
pub const ENUM_FALLBACK: &str = "C_INT";

impl<'a> Resolver<'a> {
    /// Replace `$fclassname` in `text` with the Fortran name for the class or enum `qual_type` refers to.
    ///
    /// Returns `None` if `text` has no `$fclassname` to substitute. Types that are neither a registered class
    /// nor an enum get an opaque placeholder name and an `unknown-class-type` diagnostic.
    pub fn substitute_class_name(
        &mut self,
        qual_type: &QualType,
        text: &str,
        location: &SourceLocation,
    ) -> Option<String> {
        if !text.contains(FCLASSNAME) {
            return None;
        }

        let resolved = match self.ast.resolve_typedefs(qual_type) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("{e}");
                qual_type.clone()
            }
        };
        let stripped = resolved.strip_all();

        let name = match self.ast.categorize(&stripped) {
            Ok(TypeCategory::Enum(enm)) => enm.marker().unwrap_or_else(|| ENUM_FALLBACK.to_string()),
            Ok(TypeCategory::UnknownEnum(_)) => ENUM_FALLBACK.to_string(),
            Ok(TypeCategory::Class(class)) => class.public_name(),
            _ => {
                let marker = placeholder_name(&stripped);
                self.diagnostics.report(
                    DiagnosticKind::UnknownClassType,
                    location,
                    format!("\"{qual_type}\" is not a known class, using opaque type {marker}"),
                );
                if !self.opaque_types.contains(&marker) {
                    self.opaque_types.push(marker.clone());
                }
                marker
            }
        };

        Some(substitute(text, &[(FCLASSNAME, &name)]))
    }
}
