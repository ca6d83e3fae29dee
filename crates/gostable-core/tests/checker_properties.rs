//! End-to-end checks of the dispatcher against hand-built trees.
//!
//! Each test builds a small unit with [`TreeBuilder`], types the receivers it
//! cares about in a [`TypeTable`] and runs the built-in policy over it.

use gostable_core::{
    run, NoTypes, PolicyTable, RuleId, Severity, SyntaxTree, TreeBuilder, TypeExpr, TypeIdentity,
    TypeTable, Violation, MONGO_PACKAGE, OPTIONS_PACKAGE,
};

fn bson(name: &str) -> Option<TypeExpr> {
    Some(TypeExpr::qualified("bson", name))
}

fn check(tree: &SyntaxTree, types: &TypeTable) -> Vec<Violation> {
    run(&PolicyTable::stable_api_v1(), tree, types)
}

fn codes(violations: &[Violation]) -> Vec<&str> {
    violations.iter().map(|v| v.code.as_str()).collect()
}

// ── Function bans ──

#[test]
fn banned_call_reported_once_regardless_of_arguments() {
    let mut b = TreeBuilder::new();
    let coll = b.ident("coll");
    let bare = b.method_call(coll, "Distinct", vec![]);
    let coll2 = b.ident("coll");
    let ctx = b.ident("ctx");
    let field = b.string("age");
    let filter = b.literal(bson("D"), vec![]);
    let with_args = b.method_call(coll2, "Distinct", vec![ctx, field, filter]);
    let body = b.scope(vec![bare, with_args]);
    b.file("distinct.go", vec![body]);
    let tree = b.finish();

    let mut types = TypeTable::new();
    types.insert_type(coll, TypeIdentity::pointer_to(MONGO_PACKAGE, "Collection"));
    types.insert_type(coll2, TypeIdentity::named(MONGO_PACKAGE, "Collection"));

    let violations = check(&tree, &types);
    assert_eq!(codes(&violations), vec!["GS001", "GS001"]);
    assert_eq!(violations[0].location.line, tree.span(bare).line);
    assert_eq!(violations[1].location.line, tree.span(with_args).line);
    assert_eq!(
        violations[0].message,
        "use of Collection.Distinct is not supported by the MongoDB Stable API"
    );
    assert_eq!(violations[0].location.file.to_str(), Some("distinct.go"));
}

#[test]
fn unresolved_receivers_are_never_reported() {
    let mut b = TreeBuilder::new();
    let coll = b.ident("coll");
    let call = b.method_call(coll, "Distinct", vec![]);
    let body = b.scope(vec![call]);
    b.file("distinct.go", vec![body]);
    let tree = b.finish();

    assert!(run(&PolicyTable::stable_api_v1(), &tree, &NoTypes).is_empty());
}

#[test]
fn options_setter_chain_is_reported() {
    let mut b = TreeBuilder::new();
    let pkg = b.ident("options");
    let find = b.member(pkg, "Find");
    let ctor = b.call(find, vec![]);
    let flag = b.ident("true");
    let setter = b.method_call(ctor, "SetNoCursorTimeout", vec![flag]);
    let body = b.scope(vec![setter]);
    b.file("find.go", vec![body]);
    let tree = b.finish();

    let types = TypeTable::new()
        .with_package(pkg, OPTIONS_PACKAGE)
        .with_type(ctor, TypeIdentity::pointer_to(OPTIONS_PACKAGE, "FindOptions"));

    let violations = check(&tree, &types);
    assert_eq!(codes(&violations), vec!["GS001"]);
    assert_eq!(
        violations[0].message,
        "use of FindOptions.SetNoCursorTimeout is not supported by the MongoDB Stable API"
    );
}

// ── Field bans ──

#[test]
fn each_banned_field_reported_once() {
    let mut b = TreeBuilder::new();
    let one = b.number("1");
    let max = b.field("Max", one);
    let two = b.number("2");
    let limit = b.field("Limit", two);
    let yes = b.ident("true");
    let return_key = b.field("ReturnKey", yes);
    let lit = b.literal(
        Some(TypeExpr::qualified("options", "FindOneOptions")),
        vec![max, limit, return_key],
    );
    let opts = b.address_of(lit);
    let decl = b.define("opts", opts);
    let body = b.scope(vec![decl]);
    b.file("findone.go", vec![body]);
    let tree = b.finish();

    let types =
        TypeTable::new().with_type(lit, TypeIdentity::named(OPTIONS_PACKAGE, "FindOneOptions"));

    let violations = check(&tree, &types);
    assert_eq!(codes(&violations), vec!["GS002", "GS002"]);
    assert_eq!(violations[0].location.line, tree.span(max).line);
    assert_eq!(violations[1].location.line, tree.span(return_key).line);
    assert_eq!(
        violations[1].message,
        "FindOneOptions.ReturnKey is not supported by the MongoDB Stable API"
    );
}

#[test]
fn allowed_fields_only_is_clean() {
    let mut b = TreeBuilder::new();
    let two = b.number("2");
    let limit = b.field("Limit", two);
    let lit = b.literal(Some(TypeExpr::qualified("options", "FindOptions")), vec![limit]);
    b.file("find.go", vec![lit]);
    let tree = b.finish();

    let types = TypeTable::new().with_type(lit, TypeIdentity::named(OPTIONS_PACKAGE, "FindOptions"));
    assert!(check(&tree, &types).is_empty());
}

// ── Literal substrings ──

#[test]
fn exact_stage_literal_reported_once() {
    let mut b = TreeBuilder::new();
    let lit = b.string("$currentOp");
    let decl = b.define("stage", lit);
    b.file("ops.go", vec![decl]);
    let tree = b.finish();

    let violations = run(&PolicyTable::stable_api_v1(), &tree, &NoTypes);
    assert_eq!(codes(&violations), vec!["GS003"]);
    assert_eq!(
        violations[0].message,
        "Aggregation stage '$currentOp' is not supported by the MongoDB Stable API"
    );
}

#[test]
fn embedded_stage_name_is_reported_as_substring_match() {
    let mut b = TreeBuilder::new();
    let lit = b.string("prefix$currentOpsuffix");
    let decl = b.define("stage", lit);
    b.file("ops.go", vec![decl]);
    let tree = b.finish();

    let violations = run(&PolicyTable::stable_api_v1(), &tree, &NoTypes);
    assert_eq!(codes(&violations), vec!["GS003"]);
}

// ── Pipelines ──

fn aggregate_with(b: &mut TreeBuilder, nested_key: &str) -> (SyntaxTree, TypeTable) {
    let coll = b.ident("coll");
    let ctx = b.ident("ctx");
    let one = b.number("1");
    let op = b.pair(nested_key, one);
    let acc = b.literal(bson("M"), vec![op]);
    let total = b.pair("total", acc);
    let group_doc = b.literal(bson("M"), vec![total]);
    let group = b.pair("$group", group_doc);
    let stage = b.literal(bson("M"), vec![group]);
    let pipeline = b.literal(Some(TypeExpr::qualified("mongo", "Pipeline")), vec![stage]);
    let call = b.method_call(coll, "Aggregate", vec![ctx, pipeline]);
    let body = b.scope(vec![call]);
    b.file("agg.go", vec![body]);

    let types = TypeTable::new().with_type(coll, TypeIdentity::pointer_to(MONGO_PACKAGE, "Collection"));
    (std::mem::take(b).finish(), types)
}

#[test]
fn group_with_sum_reports_banned_operator() {
    let mut b = TreeBuilder::new();
    let (tree, types) = aggregate_with(&mut b, "$sum");

    let violations = check(&tree, &types);
    assert_eq!(codes(&violations), vec!["GS004"]);
    assert_eq!(
        violations[0].message,
        "Operator '$sum' in stage '$group' is not supported by the MongoDB Stable API"
    );
}

#[test]
fn group_with_unlisted_operator_is_clean() {
    let mut b = TreeBuilder::new();
    let (tree, types) = aggregate_with(&mut b, "$max");

    assert!(check(&tree, &types).is_empty());
}

#[test]
fn stage_key_found_twice_is_reported_once() {
    let mut b = TreeBuilder::new();
    let coll = b.ident("coll");
    let empty = b.literal(bson("D"), vec![]);
    let search = b.entry("$search", empty);
    let stage = b.literal(bson("D"), vec![search]);
    let pipeline = b.literal(Some(TypeExpr::qualified("mongo", "Pipeline")), vec![stage]);
    let call = b.method_call(coll, "Aggregate", vec![pipeline]);
    b.file("search.go", vec![call]);
    let tree = b.finish();

    let types = TypeTable::new().with_type(coll, TypeIdentity::pointer_to(MONGO_PACKAGE, "Collection"));
    let violations = check(&tree, &types);
    assert_eq!(codes(&violations), vec!["GS003"]);
}

// ── Commands ──

fn run_command(traced: bool) -> (SyntaxTree, TypeTable, gostable_core::NodeId) {
    let mut b = TreeBuilder::new();
    let users = b.string("users");
    let element = b.entry("distinct", users);
    let age = b.string("age");
    let key = b.entry("key", age);
    let cmd_lit = b.literal(bson("D"), vec![element, key]);

    let db = b.ident("db");
    let ctx = b.ident("ctx");
    let mut statements = Vec::new();
    let arg = if traced {
        statements.push(b.define("cmd", cmd_lit));
        b.ident("cmd")
    } else {
        cmd_lit
    };
    let call = b.method_call(db, "RunCommand", vec![ctx, arg]);
    statements.push(call);
    let body = b.scope(statements);
    b.file("cmd.go", vec![body]);
    let tree = b.finish();

    let types = TypeTable::new().with_type(db, TypeIdentity::pointer_to(MONGO_PACKAGE, "Database"));
    (tree, types, element)
}

#[test]
fn traced_command_matches_inline_command() {
    let (traced_tree, traced_types, traced_element) = run_command(true);
    let (inline_tree, inline_types, inline_element) = run_command(false);

    let traced = check(&traced_tree, &traced_types);
    let inline = check(&inline_tree, &inline_types);

    for (violations, tree, element) in [
        (&traced, &traced_tree, traced_element),
        (&inline, &inline_tree, inline_element),
    ] {
        let unsupported: Vec<&Violation> = violations
            .iter()
            .filter(|v| v.rule == RuleId::UnsupportedCommand)
            .collect();
        assert_eq!(unsupported.len(), 1);
        assert_eq!(unsupported[0].location.line, tree.span(element).line);
        assert_eq!(
            unsupported[0].message,
            "Command 'distinct' is not supported by the MongoDB Stable API"
        );

        let review: Vec<&Violation> = violations
            .iter()
            .filter(|v| v.rule == RuleId::CommandReview)
            .collect();
        assert_eq!(review.len(), 1);
        assert_eq!(review[0].severity, Severity::Warning);
    }

    let strip = |v: &[Violation]| {
        v.iter()
            .map(|v| (v.code.clone(), v.message.clone()))
            .collect::<Vec<_>>()
    };
    let mut traced_pairs = strip(&traced);
    let mut inline_pairs = strip(&inline);
    traced_pairs.sort();
    inline_pairs.sort();
    assert_eq!(traced_pairs, inline_pairs);
}

#[test]
fn stable_command_only_needs_review() {
    let mut b = TreeBuilder::new();
    let one = b.number("1");
    let ping = b.pair("ping", one);
    let cmd = b.literal(bson("M"), vec![ping]);
    let db = b.ident("db");
    let call = b.method_call(db, "RunCommandCursor", vec![cmd]);
    b.file("ping.go", vec![call]);
    let tree = b.finish();

    let types = TypeTable::new().with_type(db, TypeIdentity::named(MONGO_PACKAGE, "Database"));
    let violations = check(&tree, &types);
    assert_eq!(codes(&violations), vec!["GS006"]);
    assert!(!violations[0].severity.eq(&Severity::Error));
}

// ── Constants ──

#[test]
fn tailable_cursor_constant_is_reported() {
    let mut b = TreeBuilder::new();
    let pkg = b.ident("options");
    let constant = b.member(pkg, "TailableAwait");
    let other_pkg = b.ident("options");
    let allowed = b.member(other_pkg, "NonTailable");
    b.file("cursor.go", vec![constant, allowed]);
    let tree = b.finish();

    let types = TypeTable::new()
        .with_package(pkg, OPTIONS_PACKAGE)
        .with_package(other_pkg, OPTIONS_PACKAGE);
    let violations = check(&tree, &types);
    assert_eq!(codes(&violations), vec!["GS007"]);
    assert_eq!(
        violations[0].message,
        "CursorType.TailableAwait is not supported by the MongoDB Stable API"
    );
    assert_eq!(
        violations[0].suggestion.as_ref().map(|s| s.message.as_str()),
        Some("use a non-tailable cursor (options.NonTailable) instead")
    );
}

// ── Ordering ──

#[test]
fn runs_are_idempotent_and_sorted() {
    let (tree, types, _) = run_command(true);
    let first = check(&tree, &types);
    let second = check(&tree, &types);
    assert_eq!(first, second);

    let positions: Vec<(usize, usize)> = first
        .iter()
        .map(|v| (v.location.line, v.location.column))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
}

#[test]
fn violations_across_files_are_grouped_by_file() {
    let mut b = TreeBuilder::new();
    let late = b.string("$search");
    b.file("z.go", vec![late]);
    let early = b.string("$indexStats");
    b.file("a.go", vec![early]);
    let tree = b.finish();

    let violations = run(&PolicyTable::stable_api_v1(), &tree, &NoTypes);
    let files: Vec<_> = violations
        .iter()
        .map(|v| v.location.file.to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["a.go", "z.go"]);
}
