//! A small stencil dialect lowered to C++.
//!
//! Exercises the whole pipeline on one tree: node construction with
//! symbol collection, a checking visitor, a folding transformer and the
//! templated C++ generator.

use std::sync::Arc;

use stencil_ir::codegen::FormatterRegistry;
use stencil_ir::traverse::find_kind;
use stencil_ir::visit::rewrite_children;
use stencil_ir::{
    Context, DuplicatePolicy, FieldType, FormatTemplate, IrError, Node, NodeType, Rewrite,
    TemplatedGenerator, TeraTemplate, Transformer, TreeRef, Value, Visitor,
};

struct Lir {
    literal: Arc<NodeType>,
    binop: Arc<NodeType>,
    offset: Arc<NodeType>,
    field_access: Arc<NodeType>,
    assign: Arc<NodeType>,
    field_decl: Arc<NodeType>,
    indent: Arc<NodeType>,
    loop_: Arc<NodeType>,
    fun: Arc<NodeType>,
}

fn lir() -> Lir {
    let expr = NodeType::new("Expr").build().unwrap();
    let literal = NodeType::new("Literal")
        .extends(&expr)
        .field("value", FieldType::Int)
        .build()
        .unwrap();
    let binop = NodeType::new("BinaryOp")
        .extends(&expr)
        .field("left", FieldType::node("Expr"))
        .field("right", FieldType::node("Expr"))
        .field("op", FieldType::Str)
        .build()
        .unwrap();
    let offset = NodeType::new("Offset")
        .field("i", FieldType::Int)
        .field("j", FieldType::Int)
        .frozen()
        .build()
        .unwrap();
    let field_access = NodeType::new("FieldAccess")
        .extends(&expr)
        .field("name", FieldType::SymbolRef)
        .field("offset", FieldType::node("Offset"))
        .build()
        .unwrap();
    let assign = NodeType::new("AssignStmt")
        .field("left", FieldType::node("FieldAccess"))
        .field("right", FieldType::node("Expr"))
        .build()
        .unwrap();
    let field_decl = NodeType::new("FieldDecl")
        .field("name", FieldType::symbol())
        .build()
        .unwrap();
    let indent = NodeType::new("Indent")
        .field("left", FieldType::Int)
        .field("right", FieldType::Int)
        .build()
        .unwrap();
    let loop_ = NodeType::new("HorizontalLoop")
        .field("i_indent", FieldType::node("Indent"))
        .field("j_indent", FieldType::node("Indent"))
        .field("body", FieldType::list(FieldType::node("AssignStmt")))
        .build()
        .unwrap();
    let fun = NodeType::new("Fun")
        .field("name", FieldType::Str)
        .field("params", FieldType::list(FieldType::node("FieldDecl")))
        .field("horizontal_loops", FieldType::list(FieldType::node("HorizontalLoop")))
        .symbol_scope(DuplicatePolicy::Reject)
        .build()
        .unwrap();
    Lir {
        literal,
        binop,
        offset,
        field_access,
        assign,
        field_decl,
        indent,
        loop_,
        fun,
    }
}

impl Lir {
    fn lit(&self, value: i64) -> Node {
        Node::build(&self.literal).set("value", value).finish().unwrap()
    }

    fn bin(&self, left: Node, op: &str, right: Node) -> Node {
        Node::build(&self.binop)
            .set("left", left)
            .set("op", op)
            .set("right", right)
            .finish()
            .unwrap()
    }

    fn access(&self, name: &str, i: i64, j: i64) -> Node {
        let offset = Node::build(&self.offset)
            .set("i", i)
            .set("j", j)
            .finish()
            .unwrap();
        Node::build(&self.field_access)
            .set("name", name)
            .set("offset", offset)
            .finish()
            .unwrap()
    }

    fn assign(&self, left: Node, right: Node) -> Node {
        Node::build(&self.assign)
            .set("left", left)
            .set("right", right)
            .finish()
            .unwrap()
    }

    fn indent(&self, left: i64, right: i64) -> Node {
        Node::build(&self.indent)
            .set("left", left)
            .set("right", right)
            .finish()
            .unwrap()
    }

    fn decl(&self, name: &str) -> Node {
        Node::build(&self.field_decl).set("name", name).finish().unwrap()
    }

    /// `out = in[i+1] + in[i-1] - (1+1) * in`, looping over the interior.
    fn laplacian(&self) -> Node {
        let rhs = self.bin(
            self.bin(self.access("in", 1, 0), "+", self.access("in", -1, 0)),
            "-",
            self.bin(
                self.bin(self.lit(1), "+", self.lit(1)),
                "*",
                self.access("in", 0, 0),
            ),
        );
        let body = vec![self.assign(self.access("out", 0, 0), rhs)];
        let horizontal_loop = Node::build(&self.loop_)
            .set("i_indent", self.indent(1, 1))
            .set("j_indent", self.indent(1, 1))
            .set("body", body)
            .finish()
            .unwrap();
        Node::build(&self.fun)
            .set("name", "lap")
            .set("params", vec![self.decl("out"), self.decl("in")])
            .set("horizontal_loops", vec![horizontal_loop])
            .finish()
            .unwrap()
    }
}

fn cpp_generator() -> TemplatedGenerator {
    let fmt = |source: &str| FormatTemplate::new(source).unwrap();
    let horizontal_loop = TeraTemplate::new(
        "for(std::size_t i = {{ _this_node.i_indent.left }}; i < domain[0] - {{ _this_node.i_indent.right }}; ++i) {
    for(std::size_t j = {{ _this_node.j_indent.left }}; j < domain[1] - {{ _this_node.j_indent.right }}; ++j) {
        {{ body | join(sep=\"\") }}
    }
}",
    )
    .unwrap();
    let fun = TeraTemplate::new(
        "void {{ name }}(Domain domain, {{ params | join(sep=\", \") }}) {
{{ horizontal_loops | join(sep=\"\") }}
}",
    )
    .unwrap();

    TemplatedGenerator::builder("lir_to_cpp")
        .template("Literal", fmt("{value}"))
        .template("BinaryOp", fmt("({left}{op}{right})"))
        .template("Offset", fmt("[i+{i}][j+{j}]"))
        .template("FieldAccess", fmt("{name}{offset}"))
        .template("AssignStmt", fmt("{left} = {right};"))
        .template("FieldDecl", fmt("Field& {name}"))
        .template("HorizontalLoop", horizontal_loop)
        .template("Fun", fun)
        .build()
}

// ─── Passes ───────────────────────────────────────────────────────

/// Rejects assignments whose left-hand side is read at an offset.
struct CheckAssignments;

impl Visitor for CheckAssignments {
    type Output = ();

    fn visit_kind(
        &mut self,
        kind: &str,
        node: &Node,
        _ctx: &Context,
    ) -> Option<stencil_ir::Result<()>> {
        if kind != "AssignStmt" {
            return None;
        }
        let offset = node
            .get("left")
            .and_then(Value::as_node)
            .and_then(|left| left.get("offset"))
            .and_then(Value::as_node)?;
        let zero = ["i", "j"]
            .iter()
            .all(|axis| offset.get(axis).and_then(Value::as_int) == Some(0));
        Some(if zero {
            Ok(())
        } else {
            Err(IrError::validation(
                "AssignStmt",
                "left",
                "left-hand side of an assignment must not have an offset",
            ))
        })
    }
}

/// Every field access must name a declared parameter.
fn check_refs(fun: &Node) -> stencil_ir::Result<()> {
    let table = fun.symbol_table().unwrap_or_default();
    for access in find_kind(fun, "FieldAccess") {
        if let Some(Value::Ref(name)) = access.get("name") {
            name.resolve(&table)?;
        }
    }
    Ok(())
}

/// Folds `+` and `*` between two literals.
struct FoldLiterals {
    literal: Arc<NodeType>,
}

impl FoldLiterals {
    fn fold(&mut self, node: &Arc<Node>, ctx: &Context) -> stencil_ir::visit::Transformed {
        let rewritten = rewrite_children(self, Value::Node(Arc::clone(node)), ctx)?;
        let folded = rewritten.as_node().and_then(|op| {
            let operand = |name: &str| {
                op.get(name)
                    .and_then(Value::as_node)
                    .filter(|n| n.is_a("Literal"))
                    .and_then(|n| n.get("value"))
                    .and_then(Value::as_int)
            };
            match (operand("left"), op.get("op").and_then(Value::as_str), operand("right")) {
                (Some(l), Some("+"), Some(r)) => Some(l + r),
                (Some(l), Some("*"), Some(r)) => Some(l * r),
                _ => None,
            }
        });
        match folded {
            Some(value) => {
                let literal = Node::build(&self.literal).set("value", value).finish()?;
                Ok(Rewrite::Replace(literal.into()))
            }
            None => Ok(Rewrite::Replace(rewritten)),
        }
    }
}

impl Transformer for FoldLiterals {
    fn transform_kind(
        &mut self,
        kind: &str,
        node: &Arc<Node>,
        ctx: &Context,
    ) -> Option<stencil_ir::visit::Transformed> {
        (kind == "BinaryOp").then(|| self.fold(node, ctx))
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[test]
fn test_fun_collects_parameters() {
    let lir = lir();
    let fun = lir.laplacian();
    let table = fun.symbol_table().unwrap();
    assert_eq!(table.names().collect::<Vec<_>>(), vec!["in", "out"]);
    assert!(fun.lookup("out").unwrap().is_a("FieldDecl"));
    check_refs(&fun).unwrap();
    CheckAssignments
        .visit(TreeRef::Node(&fun), &Context::new())
        .unwrap();
}

#[test]
fn test_duplicate_parameters_rejected() {
    let lir = lir();
    let err = Node::build(&lir.fun)
        .set("name", "dup")
        .set("params", vec![lir.decl("a"), lir.decl("a")])
        .set("horizontal_loops", Value::List(Vec::new()))
        .finish()
        .unwrap_err();
    assert!(matches!(err, IrError::DuplicateSymbol { .. }));
}

#[test]
fn test_unbound_field_reported() {
    let lir = lir();
    let body = vec![lir.assign(lir.access("out", 0, 0), lir.access("tmp", 0, 0))];
    let horizontal_loop = Node::build(&lir.loop_)
        .set("i_indent", lir.indent(0, 0))
        .set("j_indent", lir.indent(0, 0))
        .set("body", body)
        .finish()
        .unwrap();
    let fun = Node::build(&lir.fun)
        .set("name", "copy")
        .set("params", vec![lir.decl("out")])
        .set("horizontal_loops", vec![horizontal_loop])
        .finish()
        .unwrap();
    assert_eq!(
        check_refs(&fun).unwrap_err(),
        IrError::UnboundSymbol { name: "tmp".into() }
    );
}

#[test]
fn test_offset_on_assignment_target_rejected() {
    let lir = lir();
    let stmt = lir.assign(lir.access("out", 1, 0), lir.lit(0));
    let err = CheckAssignments
        .visit(TreeRef::Node(&stmt), &Context::new())
        .unwrap_err();
    assert!(err.to_string().contains("must not have an offset"));
}

#[test]
fn test_expression_rendering() {
    let lir = lir();
    let expr = lir.bin(lir.access("in", 1, 0), "+", lir.lit(3));
    let out = cpp_generator().apply(&expr, &Context::new()).unwrap();
    insta::assert_snapshot!(out.into_text(), @"(in[i+1][j+0]+3)");
}

#[test]
fn test_unfolded_laplacian() {
    let lir = lir();
    let code = cpp_generator()
        .apply(&lir.laplacian(), &Context::new())
        .unwrap()
        .into_text();
    assert!(code.contains("((1+1)*in[i+0][j+0])"));
}

#[test]
fn test_laplacian_to_cpp() {
    let lir = lir();
    let mut folder = FoldLiterals {
        literal: Arc::clone(&lir.literal),
    };
    let folded = folder
        .visit(Value::from(lir.laplacian()), &Context::new())
        .unwrap()
        .into_value()
        .unwrap();
    let fun = folded.as_node().unwrap();
    assert_eq!(fun.symbol_table().unwrap().len(), 2);

    let code = cpp_generator()
        .apply(fun, &Context::new())
        .unwrap()
        .into_text();
    let code = FormatterRegistry::new().format("cpp", &code, false).unwrap();

    insta::assert_snapshot!(code, @r###"
    void lap(Domain domain, Field& out, Field& in) {
    for(std::size_t i = 1; i < domain[0] - 1; ++i) {
        for(std::size_t j = 1; j < domain[1] - 1; ++j) {
            out[i+0][j+0] = ((in[i+1][j+0]+in[i+-1][j+0])-(2*in[i+0][j+0]));
        }
    }
    }
    "###);
}

#[test]
fn test_indent_has_no_template() {
    let lir = lir();
    let indent = lir.indent(1, 2);
    let out = cpp_generator().apply(&indent, &Context::new()).unwrap();
    assert_eq!(out.into_text(), "");

    let strict = TemplatedGenerator::builder("strict_cpp")
        .extends(&cpp_generator())
        .strict()
        .build();
    assert_eq!(
        strict.apply(&indent, &Context::new()).unwrap_err(),
        IrError::UnresolvedTemplate {
            kind: "Indent".into(),
            generator: "strict_cpp".into(),
        }
    );
    // Loops read their indents from the node itself, so the unrendered
    // children fail only in strict mode.
    assert!(strict.apply(&lir.laplacian(), &Context::new()).is_err());
}
