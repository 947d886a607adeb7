//! Tree fixtures for refdelta-core tests

use crate::model::{Location, NodeId};
use crate::tree::{NodeSpec, Tree, TreeBuilder};
use crate::{compute_diff, DiffResult};

/// A tree holding one empty top-level type.
pub fn single_type(name: &str) -> Tree {
    let mut builder = TreeBuilder::new();
    builder.add(NodeSpec::type_decl(name));
    builder.build().unwrap()
}

pub fn empty_tree() -> Tree {
    TreeBuilder::new().build().unwrap()
}

/// `T.foo(int)` renamed to `T.bar(int)` with an identical body.
pub fn rename_scenario() -> (Tree, Tree) {
    let body = ["return", "x", "+", "1"];

    let mut before = TreeBuilder::new();
    let t = before.add(NodeSpec::type_decl("T"));
    before.add(NodeSpec::method("foo", ["int"]).within(t).with_body(body));

    let mut after = TreeBuilder::new();
    let t = after.add(NodeSpec::type_decl("T"));
    after.add(NodeSpec::method("bar", ["int"]).within(t).with_body(body));

    (before.build().unwrap(), after.build().unwrap())
}

/// The tail of `M.process()` extracted into `M.extracted()`.
pub fn extract_scenario() -> (Tree, Tree) {
    let mut before = TreeBuilder::new();
    let m = before.add(NodeSpec::type_decl("M"));
    before.add(
        NodeSpec::method("process", Vec::<String>::new())
            .within(m)
            .with_body(["a", "b", "c", "d", "e", "f"]),
    );

    let mut after = TreeBuilder::new();
    let m = after.add(NodeSpec::type_decl("M"));
    after.add(
        NodeSpec::method("process", Vec::<String>::new())
            .within(m)
            .with_body(["a", "b", "call(extracted)"]),
    );
    after.add(
        NodeSpec::method("extracted", Vec::<String>::new())
            .within(m)
            .with_body(["c", "d", "e", "f"]),
    );

    (before.build().unwrap(), after.build().unwrap())
}

/// Field `x` pulled up from `Sub` into its supertype `Base`.
pub fn pull_up_scenario() -> (Tree, Tree) {
    let mut before = TreeBuilder::new();
    let base = before.add(NodeSpec::type_decl("Base"));
    let sub = before.add(NodeSpec::type_decl("Sub"));
    before.add(NodeSpec::field("x").within(sub));
    before.add_supertype(sub, base);

    let mut after = TreeBuilder::new();
    let base = after.add(NodeSpec::type_decl("Base"));
    after.add(NodeSpec::field("x").within(base));
    let sub = after.add(NodeSpec::type_decl("Sub"));
    after.add_supertype(sub, base);

    (before.build().unwrap(), after.build().unwrap())
}

/// Rename, extract and pull-up units side by side, with the top-level units
/// inserted in `order` (a permutation of `0..3`).
pub fn mixed_scenario(order: &[usize]) -> (Tree, Tree) {
    let mut before = TreeBuilder::new();
    let mut after = TreeBuilder::new();

    for &unit in order {
        match unit {
            0 => {
                let body = ["return", "x", "+", "1"];
                let t = before.add(NodeSpec::type_decl("T"));
                before.add(NodeSpec::method("foo", ["int"]).within(t).with_body(body));
                let t = after.add(NodeSpec::type_decl("T"));
                after.add(NodeSpec::method("bar", ["int"]).within(t).with_body(body));
            }
            1 => {
                let m = before.add(NodeSpec::type_decl("M"));
                before.add(
                    NodeSpec::method("process", Vec::<String>::new())
                        .within(m)
                        .with_body(["a", "b", "c", "d", "e", "f"]),
                );
                let m = after.add(NodeSpec::type_decl("M"));
                after.add(
                    NodeSpec::method("process", Vec::<String>::new())
                        .within(m)
                        .with_body(["a", "b", "call(extracted)"]),
                );
                after.add(
                    NodeSpec::method("extracted", Vec::<String>::new())
                        .within(m)
                        .with_body(["c", "d", "e", "f"]),
                );
            }
            2 => {
                let base = before.add(NodeSpec::type_decl("Base"));
                let sub = before.add(NodeSpec::type_decl("Sub"));
                before.add(NodeSpec::field("x").within(sub));
                before.add_supertype(sub, base);
                let base = after.add(NodeSpec::type_decl("Base"));
                after.add(NodeSpec::field("x").within(base));
                let sub = after.add(NodeSpec::type_decl("Sub"));
                after.add_supertype(sub, base);
            }
            other => panic!("unknown scenario unit {other}"),
        }
    }

    (before.build().unwrap(), after.build().unwrap())
}

/// A tree exercising namespaces, nesting, inheritance, overloads, anonymous
/// units and duplicate qualified names.
pub fn shapes_tree() -> Tree {
    shapes_tree_at("src/geo/Shapes.java", 0)
}

/// [`shapes_tree`] with every location in `file` and shifted by `offset` bytes.
pub fn shapes_tree_at(file: &str, offset: u32) -> Tree {
    let at = |line: u32| Location {
        file_path: file.into(),
        line_start: Some(line),
        line_end: Some(line + 2),
        byte_start: Some(offset + line * 40),
        byte_end: Some(offset + line * 40 + 80),
    };

    let mut builder = TreeBuilder::new();
    let drawable = builder.add(NodeSpec::interface("Drawable").in_namespace("geo").at(at(1)));
    builder.add(NodeSpec::method("draw", ["Canvas"]).within(drawable).at(at(2)));

    let shape = builder.add(NodeSpec::type_decl("Shape").in_namespace("geo").at(at(4)));
    builder.add(NodeSpec::field("name").within(shape).at(at(5)));
    builder.add(
        NodeSpec::method("describe", Vec::<String>::new())
            .within(shape)
            .with_body(["return", "name"])
            .at(at(6)),
    );

    let circle = builder.add(NodeSpec::type_decl("Circle").in_namespace("geo").at(at(10)));
    builder.add(NodeSpec::field("radius").within(circle).at(at(11)));
    builder.add(
        NodeSpec::method("area", Vec::<String>::new())
            .within(circle)
            .with_body(["return", "PI", "*", "radius", "*", "radius"])
            .at(at(12)),
    );
    builder.add(
        NodeSpec::method("scale", ["double"])
            .within(circle)
            .with_body(["radius", "*=", "factor"])
            .at(at(13)),
    );
    builder.add(
        NodeSpec::method("scale", ["int"])
            .within(circle)
            .with_body(["call(scale)", "factor"])
            .at(at(14)),
    );
    let listener = builder.add(
        NodeSpec::new(crate::model::NodeKind::Anonymous, "Circle$1")
            .within(circle)
            .with_body(["onResize", "call(area)"])
            .at(at(15)),
    );
    builder.add(
        NodeSpec::method("run", Vec::<String>::new())
            .within(listener)
            .with_body(["call(area)"])
            .at(at(16)),
    );

    // Same qualified name twice: excluded from exact matching.
    builder.add(NodeSpec::type_decl("Util").in_namespace("geo").with_body(["a"]).at(at(20)));
    builder.add(NodeSpec::type_decl("Util").in_namespace("geo").with_body(["b"]).at(at(30)));

    builder.add_supertype(shape, drawable);
    builder.add_supertype(circle, shape);

    builder.build().unwrap()
}

/// Diff with defaults and return the canonical descriptions.
pub fn describe(before: &Tree, after: &Tree) -> Vec<String> {
    compute_diff(before, after).descriptions()
}

/// Panics if any id appears in more than one match on either side.
pub fn assert_injective(result: &DiffResult) {
    let mut befores: Vec<NodeId> = result.matches.iter().map(|m| m.before).collect();
    let mut afters: Vec<NodeId> = result.matches.iter().map(|m| m.after).collect();
    befores.sort();
    afters.sort();
    let before_count = befores.len();
    let after_count = afters.len();
    befores.dedup();
    afters.dedup();
    assert_eq!(befores.len(), before_count, "a before node is matched twice");
    assert_eq!(afters.len(), after_count, "an after node is matched twice");
}
