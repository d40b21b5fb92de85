use fbl_ast::{ClassDecl, DeclKind, DeclarationNode, QualType, AST};

pub(crate) use fbl_util::{compare, run_test, Error};

/// A class with a constructor, an overloaded method, a plain method and a destructor
pub(crate) fn widget_ast() -> Result<AST, Error> {
    let mut ast = AST::new("widgets");
    ast.add_include("widget.hpp");
    ast.add_class(
        ClassDecl::new("Widget")
            .with_member(DeclarationNode::new("Widget", DeclKind::Constructor))
            .with_member(
                DeclarationNode::method("f")
                    .with_rename("compute")
                    .with_overload("_A")
                    .with_parameter("x", QualType::int())
                    .with_result(QualType::int()),
            )
            .with_member(
                DeclarationNode::method("f")
                    .with_rename("compute")
                    .with_overload("_B")
                    .with_parameter("x", "double".parse()?)
                    .with_result("double".parse()?),
            )
            .with_member(DeclarationNode::method("reset"))
            .with_member(DeclarationNode::new("~Widget", DeclKind::Destructor)),
    );
    Ok(ast)
}
