mod common;

use common::{compare, run_test, widget_ast, Error};
use fbl_ast::{AccessorRole, ClassDecl, DeclKind, DeclarationNode, Features, QualType, Typemap, TypemapTable, AST};
use fbl_util::BindConfig;
use fbl_write::{diagnostic::DiagnosticKind, generate};

#[test]
fn write_free_function() -> Result<(), Error> {
    run_test(|| {
        let mut ast = AST::new("scaling");
        ast.add_function(
            DeclarationNode::function("scale")
                .with_parameter("factor", "double".parse()?)
                .with_parameter("count", QualType::int())
                .with_result("double".parse()?),
        );

        let module = generate(&ast, &TypemapTable::fortran(), &BindConfig::default())?;
        assert!(!module.has_errors());
        assert_eq!(module.fortran_file_name(), "scaling.f90");
        assert_eq!(module.c_file_name(), "scaling_wrap.cxx");

        compare(
            &module.fortran_source,
            concat!(
                "module scaling\n",
                " use, intrinsic :: ISO_C_BINDING\n",
                " implicit none\n",
                " private\n",
                "\n",
                " public :: scale\n",
                "\n",
                " interface\n",
                "function swigc_scale(farg1, farg2) &\n",
                "bind(C, name=\"swigc_scale\") &\n",
                "result(fresult)\n",
                "use, intrinsic :: ISO_C_BINDING\n",
                "real(C_DOUBLE), value :: farg1\n",
                "integer(C_INT), value :: farg2\n",
                "real(C_DOUBLE) :: fresult\n",
                "end function\n",
                " end interface\n",
                "\n",
                "contains\n",
                "function scale(factor, count) &\n",
                "result(swig_result)\n",
                "use, intrinsic :: ISO_C_BINDING\n",
                "real(C_DOUBLE) :: swig_result\n",
                "real(C_DOUBLE), intent(in) :: factor\n",
                "integer(C_INT), intent(in) :: count\n",
                "swig_result = swigc_scale(factor, count)\n",
                "end function\n",
                "\n",
                "\n",
                "end module scaling\n",
            ),
        )?;

        assert!(module.c_source.contains("  result = scale(arg1, arg2);\n"));
        assert!(module.c_source.contains("extern \"C\" {\n\nSWIGEXPORT double swigc_scale(double farg1, int farg2) {\n"));
        Ok(())
    })
}

#[test]
fn write_class_with_overloads() -> Result<(), Error> {
    run_test(|| {
        let ast = widget_ast()?;
        let config = BindConfig {
            finalizers: true,
            ..Default::default()
        };
        let module = generate(&ast, &TypemapTable::fortran(), &config)?;
        assert!(!module.has_errors());

        assert!(module.fortran_source.contains(concat!(
            " public :: Widget\n",
            "\n",
            " type :: Widget\n",
            "  type(C_PTR), public :: swigptr = C_NULL_PTR\n",
            " contains\n",
            "  procedure :: create => swigf_new_Widget\n",
            "  procedure, private :: f_A => swigf_Widget_compute_A\n",
            "  procedure, private :: f_B => swigf_Widget_compute_B\n",
            "  procedure :: reset => swigf_Widget_reset\n",
            "  procedure :: release => swigf_delete_Widget\n",
            "  generic :: compute => f_A, f_B\n",
            "  final :: swigf_final_Widget\n",
            " end type Widget\n",
        )));

        // constructors fill in the object passed as the first argument
        assert!(module.fortran_source.contains(concat!(
            "subroutine swigf_new_Widget(self)\n",
            "use, intrinsic :: ISO_C_BINDING\n",
            "class(Widget), intent(inout) :: self\n",
            "self%swigptr = swigc_new_Widget()\n",
            "end subroutine\n",
        )));

        assert!(module.fortran_source.contains(concat!(
            "function swigf_Widget_compute_A(self, x) &\n",
            "result(swig_result)\n",
            "use, intrinsic :: ISO_C_BINDING\n",
            "integer(C_INT) :: swig_result\n",
            "class(Widget), intent(in) :: self\n",
            "integer(C_INT), intent(in) :: x\n",
            "swig_result = swigc_Widget_compute_A(self%swigptr, x)\n",
            "end function\n",
        )));

        assert!(module.fortran_source.contains(concat!(
            "subroutine swigf_Widget_reset(self)\n",
            "use, intrinsic :: ISO_C_BINDING\n",
            "class(Widget), intent(in) :: self\n",
            "call swigc_Widget_reset(self%swigptr)\n",
            "end subroutine\n",
        )));

        assert!(module.fortran_source.contains(concat!(
            "subroutine swigf_delete_Widget(self)\n",
            "use, intrinsic :: ISO_C_BINDING\n",
            "class(Widget), intent(inout) :: self\n",
            "call swigc_delete_Widget(self%swigptr)\n",
            "self%swigptr = C_NULL_PTR\n",
            "end subroutine\n",
            "\n",
            "subroutine swigf_final_Widget(self)\n",
            "use, intrinsic :: ISO_C_BINDING\n",
            "type(Widget) :: self\n",
            "call swigc_delete_Widget(self%swigptr)\n",
            "self%swigptr = C_NULL_PTR\n",
            "end subroutine\n",
        )));

        assert!(module.c_source.starts_with("#include \"widget.hpp\"\n"));
        assert!(module.c_source.contains("  result = new Widget();\n"));
        assert!(module.c_source.contains("  delete arg1;\n"));
        assert!(module.c_source.contains("  result = arg1->f(arg2);\n"));

        let names = module
            .bindings
            .iter()
            .map(|b| b.wrapper_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            [
                "swigc_new_Widget",
                "swigc_Widget_compute_A",
                "swigc_Widget_compute_B",
                "swigc_Widget_reset",
                "swigc_delete_Widget",
            ]
        );
        Ok(())
    })
}

#[test]
fn overloaded_free_functions_share_an_interface() -> Result<(), Error> {
    run_test(|| {
        let mut ast = AST::new("overloads");
        ast.add_function(
            DeclarationNode::function("compute")
                .with_overload("_B")
                .with_parameter("x", "double".parse()?),
        );
        ast.add_function(
            DeclarationNode::function("compute")
                .with_overload("_A")
                .with_parameter("x", QualType::int()),
        );
        ast.add_function(DeclarationNode::function("reset"));

        let module = generate(&ast, &TypemapTable::fortran(), &BindConfig::default())?;

        assert!(module.fortran_source.contains(concat!(
            " public :: reset\n",
            "\n",
            " public :: compute\n",
            " interface compute\n",
            "  module procedure swigf_compute_B, swigf_compute_A\n",
            " end interface\n",
        )));
        assert!(module.fortran_source.contains("subroutine swigf_compute_B(x)\n"));
        assert!(module.fortran_source.contains("subroutine reset()\n"));
        assert!(module.c_source.contains("SWIGEXPORT void swigc_compute_A(int farg1) {\n"));
        Ok(())
    })
}

#[test]
fn duplicate_functions_are_reported_once() -> Result<(), Error> {
    run_test(|| {
        let mut ast = AST::new("dups");
        ast.add_function(DeclarationNode::function("reset"));
        ast.add_function(DeclarationNode::function("reset"));
        ast.add_function(DeclarationNode::function("other"));

        let module = generate(&ast, &TypemapTable::fortran(), &BindConfig::default())?;

        assert!(module.has_errors());
        assert_eq!(module.count(DiagnosticKind::DuplicateSymbol), 1);
        assert_eq!(module.c_source.matches("SWIGEXPORT void swigc_reset(").count(), 1);
        assert_eq!(module.fortran_source.matches("subroutine reset()").count(), 1);
        // generation carries on after the duplicate
        assert!(module.c_source.contains("SWIGEXPORT void swigc_other("));
        assert_eq!(module.bindings.len(), 2);
        Ok(())
    })
}

#[test]
fn missing_typemaps_give_stable_placeholders() -> Result<(), Error> {
    run_test(|| {
        let mut ast = AST::new("missing");
        ast.add_function(DeclarationNode::function("fill").with_parameter("data", "double * *".parse()?));

        let tm = TypemapTable::fortran();
        let first = generate(&ast, &tm, &BindConfig::default())?;
        let second = generate(&ast, &tm, &BindConfig::default())?;

        assert!(first.count(DiagnosticKind::MissingTemplate) > 0);
        assert!(!first.has_errors());
        assert!(first.c_source.contains("SWIGTYPE_p_p_double"));
        assert_eq!(first.c_source, second.c_source);
        assert_eq!(first.fortran_source, second.fortran_source);
        assert_eq!(first.diagnostics, second.diagnostics);
        Ok(())
    })
}

#[test]
fn unknown_classes_become_opaque_types() -> Result<(), Error> {
    run_test(|| {
        let mut ast = AST::new("opaque");
        ast.add_function(DeclarationNode::function("use_gadget").with_parameter("g", "Gadget *".parse()?));

        let module = generate(&ast, &TypemapTable::fortran(), &BindConfig::default())?;

        assert_eq!(module.count(DiagnosticKind::UnknownClassType), 1);
        assert!(module.fortran_source.contains(concat!(
            " type, public :: SWIGTYPE_Gadget\n",
            "  type(C_PTR), public :: swigptr = C_NULL_PTR\n",
            " end type SWIGTYPE_Gadget\n",
        )));
        assert!(module.fortran_source.contains("class(SWIGTYPE_Gadget), intent(in) :: g\n"));
        assert!(module.fortran_source.contains("call swigc_use_gadget(g%swigptr)\n"));
        Ok(())
    })
}

#[test]
fn flat_interface_without_proxies() -> Result<(), Error> {
    run_test(|| {
        let mut ast = widget_ast()?;
        ast.add_function(DeclarationNode::function("reset"));
        let config = BindConfig {
            proxy_classes: false,
            ..Default::default()
        };
        let module = generate(&ast, &TypemapTable::fortran(), &config)?;

        assert!(!module.fortran_source.contains("contains"));
        assert!(!module.fortran_source.contains(" type :: Widget"));
        assert!(module.fortran_source.contains(" public :: swigc_new_Widget\n"));
        assert!(module.fortran_source.contains(" public :: swigc_reset\n"));
        assert!(module.bindings.iter().all(|b| b.proxy_name.is_none()));
        Ok(())
    })
}

#[test]
fn new_objects_pass_ownership() -> Result<(), Error> {
    run_test(|| {
        let mut ast = AST::new("owned");
        ast.add_class(ClassDecl::new("Widget"));
        ast.add_function(
            DeclarationNode::function("make")
                .with_result("Widget *".parse()?)
                .with_features(Features {
                    new_object: true,
                    ..Default::default()
                }),
        );
        ast.add_function(DeclarationNode::function("peek").with_result("Widget *".parse()?));

        let mut tm = TypemapTable::fortran();
        tm.insert_spelling("out", "Widget *", Typemap::new("$result = wrap($1, $owner);"))?;
        tm.insert_spelling(
            "fout",
            "Widget *",
            Typemap::new("$result%swigptr = $imcall\ncall set_owner($result, $owner)"),
        )?;
        let module = generate(&ast, &tm, &BindConfig::default())?;

        assert!(module.c_source.contains(concat!(
            "  result = make();\n",
            "  fresult = wrap(result, 1);\n",
        )));
        assert!(module.c_source.contains(concat!(
            "  result = peek();\n",
            "  fresult = wrap(result, 0);\n",
        )));
        assert!(module.fortran_source.contains(concat!(
            "swig_result%swigptr = swigc_make()\n",
            "call set_owner(swig_result, .true.)\n",
        )));
        assert!(module.fortran_source.contains(concat!(
            "swig_result%swigptr = swigc_peek()\n",
            "call set_owner(swig_result, .false.)\n",
        )));
        Ok(())
    })
}

#[test]
fn accessors_get_and_set_fields() -> Result<(), Error> {
    run_test(|| {
        let mut ast = AST::new("points");
        ast.add_class(
            ClassDecl::new("Point")
                .with_member(
                    DeclarationNode::new(
                        "x",
                        DeclKind::Accessor {
                            field: "x".to_string(),
                            role: AccessorRole::Get,
                        },
                    )
                    .with_result("double".parse()?),
                )
                .with_member(
                    DeclarationNode::new(
                        "x",
                        DeclKind::Accessor {
                            field: "x".to_string(),
                            role: AccessorRole::Set,
                        },
                    )
                    .with_parameter("x", "double".parse()?),
                ),
        );

        let module = generate(&ast, &TypemapTable::fortran(), &BindConfig::default())?;
        assert!(!module.has_errors());

        assert!(module.fortran_source.contains(concat!(
            " contains\n",
            "  procedure :: get_x => swigf_Point_x_get\n",
            "  procedure :: set_x => swigf_Point_x_set\n",
            " end type Point\n",
        )));
        assert!(module.c_source.contains(concat!(
            "SWIGEXPORT double swigc_Point_x_get(const void * farg1) {\n",
            "  double fresult ;\n",
            "  const Point * arg1 ;\n",
            "  double result ;\n",
            "\n",
            "  arg1 = (const Point *)farg1;\n",
            "  result = arg1->x;\n",
            "  fresult = result;\n",
            "  return (double)fresult;\n",
            "}\n",
        )));
        assert!(module.c_source.contains(concat!(
            "SWIGEXPORT void swigc_Point_x_set(void * farg1, double farg2) {\n",
            "  Point * arg1 ;\n",
            "  double arg2 ;\n",
            "\n",
            "  arg1 = (Point *)farg1;\n",
            "  arg2 = (double)farg2;\n",
            "  arg1->x = arg2;\n",
            "}\n",
        )));
        assert!(module.fortran_source.contains(concat!(
            "subroutine swigf_Point_x_set(self, x)\n",
            "use, intrinsic :: ISO_C_BINDING\n",
            "class(Point), intent(in) :: self\n",
            "real(C_DOUBLE), intent(in) :: x\n",
            "call swigc_Point_x_set(self%swigptr, x)\n",
            "end subroutine\n",
        )));
        Ok(())
    })
}

#[test]
fn undeclared_enums_are_plain_integers() -> Result<(), Error> {
    run_test(|| {
        let mut ast = AST::new("colors");
        ast.add_function(
            DeclarationNode::function("paint")
                .with_parameter("c", "enum Color".parse()?)
                .with_result("enum Color".parse()?),
        );

        let module = generate(&ast, &TypemapTable::fortran(), &BindConfig::default())?;

        assert_eq!(module.count(DiagnosticKind::UnknownClassType), 0);
        assert!(!module.fortran_source.contains("SWIGTYPE_Color"));
        assert!(module.fortran_source.contains(concat!(
            "integer(kind(C_INT)) :: swig_result\n",
            "integer(kind(C_INT)), intent(in) :: c\n",
            "swig_result = swigc_paint(c)\n",
        )));
        assert!(module.c_source.contains("SWIGEXPORT int swigc_paint(int farg1) {\n"));
        assert!(module.c_source.contains("  fresult = (int)result;\n"));
        Ok(())
    })
}
