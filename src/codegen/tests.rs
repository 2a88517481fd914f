use std::sync::Arc;

use super::*;
use crate::error::IrError;
use crate::node::{FieldType, Node, NodeType, Value};
use crate::visit::Context;

struct Dialect {
    literal: Arc<NodeType>,
    binop: Arc<NodeType>,
}

fn dialect() -> Dialect {
    let expr = NodeType::new("Expr").build().unwrap();
    let literal = NodeType::new("Literal")
        .extends(&expr)
        .field("value", FieldType::Int)
        .field("note_", FieldType::optional(FieldType::Str))
        .build()
        .unwrap();
    let binop = NodeType::new("BinaryOp")
        .extends(&expr)
        .field("left", FieldType::node("Expr"))
        .field("right", FieldType::node("Expr"))
        .field("op", FieldType::Str)
        .build()
        .unwrap();
    Dialect { literal, binop }
}

impl Dialect {
    fn lit(&self, value: i64) -> Node {
        Node::build(&self.literal)
            .set("value", value)
            .finish()
            .unwrap()
    }

    fn add(&self, left: Node, right: Node) -> Node {
        Node::build(&self.binop)
            .set("left", left)
            .set("right", right)
            .set("op", "+")
            .finish()
            .unwrap()
    }
}

fn fmt(source: &str) -> FormatTemplate {
    FormatTemplate::new(source).unwrap()
}

fn expr_generator() -> TemplatedGenerator {
    TemplatedGenerator::builder("expr")
        .template("Literal", fmt("{value}"))
        .template("BinaryOp", fmt("({left}{op}{right})"))
        .build()
}

fn text(rendered: Rendered) -> String {
    rendered.into_text()
}

// ─── Resolution ───────────────────────────────────────────────────

#[test]
fn test_literal_renders_value() {
    let d = dialect();
    let out = expr_generator().apply(&d.lit(42), &Context::new()).unwrap();
    assert_eq!(out, Rendered::Text("42".into()));
}

#[test]
fn test_children_render_before_parent() {
    let d = dialect();
    let tree = d.add(d.lit(1), d.lit(2));
    let out = expr_generator().apply(&tree, &Context::new()).unwrap();
    assert_eq!(text(out), "(1+2)");
}

#[test]
fn test_template_found_through_ancestry() {
    let base = NodeType::new("Base").build().unwrap();
    let mid = NodeType::new("Mid").extends(&base).build().unwrap();
    let leaf = NodeType::new("Leaf")
        .extends(&mid)
        .field("x", FieldType::Int)
        .build()
        .unwrap();
    let generator = TemplatedGenerator::builder("g")
        .template("Base", fmt("base"))
        .template("Mid", fmt("mid {x}"))
        .build();
    let node = Node::build(&leaf).set("x", 7i64).finish().unwrap();

    assert_eq!(text(generator.apply(&node, &Context::new()).unwrap()), "mid 7");
    let (kind, _) = generator.get_template(&node).unwrap();
    assert_eq!(kind, "Mid");
}

#[test]
fn test_missing_template_renders_empty() {
    let d = dialect();
    let generator = TemplatedGenerator::builder("bare").build();
    let out = generator.apply(&d.lit(1), &Context::new()).unwrap();
    assert_eq!(out, Rendered::Text(String::new()));
    assert_eq!(generator.missing_template(), MissingTemplate::Empty);
}

#[test]
fn test_missing_template_strict() {
    let d = dialect();
    let generator = TemplatedGenerator::builder("bare").strict().build();
    let err = generator.apply(&d.lit(1), &Context::new()).unwrap_err();
    assert_eq!(
        err,
        IrError::UnresolvedTemplate {
            kind: "Literal".into(),
            generator: "bare".into(),
        }
    );
}

#[test]
fn test_template_errors_propagate() {
    let d = dialect();
    let generator = TemplatedGenerator::builder("g")
        .template("Literal", fmt("{nope}"))
        .build();
    let err = generator.apply(&d.lit(1), &Context::new()).unwrap_err();
    assert_eq!(err, IrError::Template("no value for field 'nope'".into()));
}

// ─── Handlers and inheritance ─────────────────────────────────────

#[test]
fn test_handler_takes_precedence_over_template() {
    let d = dialect();
    let generator = TemplatedGenerator::builder("g")
        .template("Literal", fmt("{value}"))
        .handler("BinaryOp", |generator, node, ctx| {
            let children = generator.transform_children(node, ctx)?;
            Ok(Rendered::Text(format!(
                "{} {} {}",
                children["left"], children["op"], children["right"]
            )))
        })
        .build();
    let tree = d.add(d.lit(1), d.lit(2));
    assert_eq!(text(generator.apply(&tree, &Context::new()).unwrap()), "1 + 2");
}

#[test]
fn test_handler_on_parent_kind() {
    let d = dialect();
    let generator = TemplatedGenerator::builder("g")
        .template("Literal", fmt("{value}"))
        .handler("Expr", |_, node, _| Ok(Rendered::from(node.kind())))
        .build();
    assert_eq!(text(generator.apply(&d.lit(3), &Context::new()).unwrap()), "Literal");
}

#[test]
fn test_extends_inherits_and_overrides() {
    let d = dialect();
    let parent = expr_generator();
    let child = TemplatedGenerator::builder("child")
        .extends(&parent)
        .template("Literal", fmt("L{value}"))
        .build();
    let tree = d.add(d.lit(1), d.lit(2));

    assert_eq!(text(child.apply(&tree, &Context::new()).unwrap()), "(L1+L2)");
    assert_eq!(text(parent.apply(&tree, &Context::new()).unwrap()), "(1+2)");
}

#[test]
fn test_extends_handlers_only_drops_templates() {
    let d = dialect();
    let parent = TemplatedGenerator::builder("parent")
        .template("BinaryOp", fmt("({left}{op}{right})"))
        .handler("Literal", |_, _, _| Ok(Rendered::from("x")))
        .build();
    let child = TemplatedGenerator::builder("child")
        .extends_handlers_only(&parent)
        .strict()
        .build();

    assert_eq!(text(child.apply(&d.lit(1), &Context::new()).unwrap()), "x");
    let tree = d.add(d.lit(1), d.lit(2));
    assert!(matches!(
        child.apply(&tree, &Context::new()),
        Err(IrError::UnresolvedTemplate { .. })
    ));
}

// ─── Values and context ───────────────────────────────────────────

#[test]
fn test_collections_keep_their_shape() {
    let d = dialect();
    let generator = expr_generator();
    let list = Value::from(vec![d.lit(1), d.lit(2)]);
    assert_eq!(
        generator.apply(&list, &Context::new()).unwrap(),
        Rendered::List(vec!["1".into(), "2".into()])
    );

    let map = Value::Map([("a".to_string(), Value::from(d.lit(5)))].into());
    let out = generator.apply(&map, &Context::new()).unwrap();
    assert_eq!(out.as_map().unwrap()["a"], Rendered::from("5"));
}

#[test]
fn test_leaf_dumper_override() {
    let d = dialect();
    let generator = TemplatedGenerator::builder("g")
        .template("Literal", fmt("{value}"))
        .leaf_dumper(|v| format!("<{}>", v))
        .build();
    assert_eq!(text(generator.apply(&d.lit(1), &Context::new()).unwrap()), "<1>");
    assert_eq!(
        text(generator.apply(&Value::Str("s".into()), &Context::new()).unwrap()),
        "<s>"
    );
}

#[test]
fn test_raw_attributes_and_kwargs_visible() {
    let d = dialect();
    let generator = TemplatedGenerator::builder("g")
        .template("Literal", fmt("{value}{note_}{suffix}"))
        .build();
    let node = Node::build(&d.literal)
        .set("value", 4i64)
        .set("note_", "u")
        .finish()
        .unwrap();
    let ctx = Context::new().with("suffix", ";");
    assert_eq!(text(generator.apply(&node, &ctx).unwrap()), "4u;");
}

#[test]
fn test_render_context_names() {
    let d = dialect();
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let generator = TemplatedGenerator::builder("named")
        .template(
            "Literal",
            FnTemplate::new(move |scope| {
                sink.lock().unwrap().extend(scope.names());
                let node = scope.lookup("_this_node").map(|s| s.text()).unwrap_or_default();
                let generator = scope
                    .lookup("_this_generator")
                    .map(|s| s.text())
                    .unwrap_or_default();
                Ok(format!("{} by {}", node.split('(').next().unwrap_or(""), generator))
            }),
        )
        .build();
    let ctx = Context::new().with("depth", 1i64);

    assert_eq!(
        text(generator.apply(&d.lit(1), &ctx).unwrap()),
        "Literal by named"
    );
    let names = seen.lock().unwrap().clone();
    for expected in ["_this_node", "_this_generator", "_children", "_attrs", "value", "note_", "depth"] {
        assert!(names.iter().any(|n| n == expected), "missing {expected}");
    }
}

#[test]
fn test_substitution_template() {
    let d = dialect();
    let generator = TemplatedGenerator::builder("g")
        .template("Literal", fmt("{value}"))
        .template("BinaryOp", SubstitutionTemplate::new("$left $op ${right} $$"))
        .build();
    let tree = d.add(d.lit(1), d.lit(2));
    assert_eq!(text(generator.apply(&tree, &Context::new()).unwrap()), "1 + 2 $");
}

#[test]
fn test_substitution_errors() {
    let ctx = Context::new().with("a", 1i64);
    let err = SubstitutionTemplate::new("$b").render(&ctx).unwrap_err();
    assert_eq!(err, IrError::Template("no value for placeholder 'b'".into()));
    let err = SubstitutionTemplate::new("cost: $5").render(&ctx).unwrap_err();
    assert_eq!(err, IrError::Template("invalid placeholder at offset 6".into()));
}

#[test]
fn test_tera_template() {
    let d = dialect();
    let generator = TemplatedGenerator::builder("g")
        .template("Literal", fmt("{value}"))
        .template(
            "BinaryOp",
            TeraTemplate::new("{{ left }}{{ op }}{{ right }}{{ suffix }} /* {{ _this_node.kind }} */")
                .unwrap(),
        )
        .build();
    let tree = d.add(d.lit(1), d.lit(2));
    let ctx = Context::new().with("suffix", ";");
    assert_eq!(
        text(generator.apply(&tree, &ctx).unwrap()),
        "1+2; /* BinaryOp */"
    );
}

#[test]
fn test_tera_syntax_error_reported_early() {
    assert!(matches!(
        TeraTemplate::new("{% for x in %}"),
        Err(IrError::Template(_))
    ));
}

#[test]
fn test_templates_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("literal.fmt");
    std::fs::write(&path, "<{value}>").unwrap();

    let d = dialect();
    let generator = TemplatedGenerator::builder("g")
        .template("Literal", FormatTemplate::from_file(&path).unwrap())
        .build();
    assert_eq!(text(generator.apply(&d.lit(9), &Context::new()).unwrap()), "<9>");

    let missing = dir.path().join("missing.fmt");
    assert!(matches!(
        SubstitutionTemplate::from_file(&missing),
        Err(IrError::Io { .. })
    ));
}

#[test]
fn test_apply_all_keeps_order() {
    let d = dialect();
    let roots: Vec<Arc<Node>> = (0..8).map(|i| Arc::new(d.lit(i))).collect();
    let out = expr_generator().apply_all(&roots, &Context::new()).unwrap();
    let texts: Vec<String> = out.into_iter().map(Rendered::into_text).collect();
    assert_eq!(texts, vec!["0", "1", "2", "3", "4", "5", "6", "7"]);
}

#[test]
fn test_rendered_display() {
    let list = Rendered::List(vec!["a".into(), "b".into()]);
    assert_eq!(list.to_string(), "a\nb");
    assert_eq!(Value::from(list), Value::list([Value::from("a"), Value::from("b")]));
}

// ─── Formatters ───────────────────────────────────────────────────

fn upper(source: &str) -> crate::error::Result<String> {
    Ok(source.to_uppercase())
}

fn broken(_: &str) -> crate::error::Result<String> {
    Err(IrError::Template("bad input".into()))
}

#[test]
fn test_formatter_registry() {
    let mut registry = FormatterRegistry::new();
    registry.register("shout", upper).unwrap();
    assert_eq!(registry.format("shout", "int x;", false).unwrap(), "INT X;");
    assert_eq!(registry.languages().collect::<Vec<_>>(), vec!["shout"]);

    let err = registry.register("shout", upper).unwrap_err();
    assert!(matches!(err, IrError::Config(_)));
}

#[test]
fn test_missing_formatter_falls_back() {
    let mut registry = FormatterRegistry::new();
    registry.register("broken", broken).unwrap();

    assert_eq!(registry.format("cpp", "int x;", false).unwrap(), "int x;");
    assert_eq!(registry.format("broken", "int x;", false).unwrap(), "int x;");

    assert!(matches!(
        registry.format("cpp", "int x;", true),
        Err(IrError::FormatterUnavailable { .. })
    ));
    match registry.format("broken", "int x;", true) {
        Err(IrError::FormatterUnavailable { language, reason }) => {
            assert_eq!(language, "broken");
            assert!(reason.contains("bad input"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_command_formatter() {
    let clang = CommandFormatter::clang_format(Some("LLVM"))
        .fallback_style("Google")
        .sort_includes();
    assert_eq!(clang.program(), "clang-format");
    assert_eq!(
        clang.args(),
        &["--style=LLVM", "--fallback-style=Google", "--sort-includes"]
    );

    let missing = CommandFormatter::new("cpp", "definitely-not-a-formatter-4821", &[]);
    assert!(matches!(
        missing.format("int x;"),
        Err(IrError::FormatterUnavailable { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_command_formatter_pipes_through_program() {
    let cat = CommandFormatter::new("text", "cat", &[]);
    assert_eq!(cat.format("int x;\n").unwrap(), "int x;\n");
}

// ─── Text helpers ─────────────────────────────────────────────────

#[test]
fn test_text_block_indentation() {
    let mut block = TextBlock::new();
    block.append("void f() {");
    block.indented(1, |b| {
        b.append("int x;");
        b.empty_line(1);
        b.append("x = 1;");
    });
    block.append("}");
    assert_eq!(block.text(), "void f() {\n    int x;\n\n    x = 1;\n}");
    assert_eq!(block.len(), 5);
    assert_eq!(block.indent_level(), 0);
}

#[test]
fn test_text_block_update_indent_and_dedent() {
    let mut block = TextBlock::with_indent(0, 2, '-');
    block
        .append("a")
        .append_with_indent("b", 1)
        .append_with_indent("c", -1);
    block.dedent(3);
    assert_eq!(block.lines(), &["a", "--b", "c"]);
    assert_eq!(block.indent_level(), 0);
}

#[test]
fn test_text_block_extend_dedented() {
    let mut block = TextBlock::new();
    block.indent(1);
    block.extend_dedented("    if (x) {\n        y();\n\n    }");
    assert_eq!(
        block.text(),
        "    if (x) {\n        y();\n    \n    }"
    );
}

#[test]
fn test_text_block_custom_end_line() {
    let mut block = TextBlock::new().end_line("\r\n");
    block.extend(["a", "b"]);
    assert_eq!(block.to_string(), "a\r\nb");
}

#[test]
fn test_case_styles() {
    let name = Name::new(["first", "second", "UPPER", "Title"]);
    assert_eq!(name.as_case(CaseStyle::Concatenated), "firstseconduppertitle");
    assert_eq!(name.as_case(CaseStyle::Canonical), "first second upper title");
    assert_eq!(name.as_case(CaseStyle::Camel), "firstSecondUpperTitle");
    assert_eq!(name.as_case(CaseStyle::Pascal), "FirstSecondUpperTitle");
    assert_eq!(name.as_case(CaseStyle::Snake), "first_second_upper_title");
    assert_eq!(name.as_case(CaseStyle::Kebab), "first-second-upper-title");
}

#[test]
fn test_case_splitting() {
    let words = |name: &str, style: CaseStyle| Name::from_string(name, style).unwrap().words().to_vec();
    assert_eq!(words("parseHTTPResponse", CaseStyle::Camel), vec!["parse", "http", "response"]);
    assert_eq!(words("FieldAccess", CaseStyle::Pascal), vec!["field", "access"]);
    assert_eq!(words("field_access", CaseStyle::Snake), vec!["field", "access"]);
    assert_eq!(words("field-access", CaseStyle::Kebab), vec!["field", "access"]);
    assert_eq!(words("  field   access ", CaseStyle::Canonical), vec!["field", "access"]);

    assert!(Name::from_string("fieldaccess", CaseStyle::Concatenated).is_err());
    assert_eq!(
        CaseStyle::convert("horizontal_loop", CaseStyle::Snake, CaseStyle::Pascal).unwrap(),
        "HorizontalLoop"
    );
    assert_eq!("kebab".parse::<CaseStyle>().unwrap(), CaseStyle::Kebab);
}
