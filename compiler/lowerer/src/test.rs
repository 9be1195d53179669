use crate::lower;
use ast::{BareExpr, DefValue, Expr, Literal, Package, Top};
use diagnostics::{Diagnostic, Reporter};
use num_bigint::BigInt;
use span::{FileName, SourceMap};

struct Lowered {
    top: Top,
    diagnostics: Vec<Diagnostic>,
}

fn lower_files(files: &[(&str, &str)]) -> Lowered {
    let mut map = SourceMap::default();
    let reporter = Reporter::new();
    let mut top = Top::default();

    for (name, source) in files {
        let index = map.add(FileName::from(*name), (*source).to_owned());
        let cst = parser::parse(map.file_mut(index), &reporter);
        lower(&cst, map.file(index), &map, &mut top, &reporter);
    }

    Lowered { top, diagnostics: reporter.into_diagnostics() }
}

fn lower_one(source: &str) -> Lowered {
    lower_files(&[("test", source)])
}

fn assert_clean(lowered: &Lowered) {
    assert!(
        lowered.diagnostics.is_empty(),
        "unexpected diagnostics:\n{}",
        lowered
            .diagnostics
            .iter()
            .map(|diagnostic| diagnostic.message.clone())
            .collect::<Vec<_>>()
            .join("\n"),
    );
}

fn package<'a>(lowered: &'a Lowered, name: &str) -> &'a Package {
    lowered
        .top
        .packages
        .get(name)
        .unwrap_or_else(|| panic!("no package '{name}'"))
}

fn def<'a>(lowered: &'a Lowered, package_name: &str, name: &str) -> &'a DefValue {
    for file in &package(lowered, package_name).files {
        if let Some(value) = file.content.defs.get(name) {
            return value;
        }
    }
    panic!("no definition '{name}' in package '{package_name}'")
}

fn has_error(lowered: &Lowered, fragment: &str) -> bool {
    lowered
        .diagnostics
        .iter()
        .any(|diagnostic| diagnostic.message.contains(fragment))
}

fn as_integer(expr: &Expr) -> &BigInt {
    match &expr.bare {
        BareExpr::Literal(Literal::Integer(value)) => value,
        other => panic!("expected an integer literal, got {other:?}"),
    }
}

#[test]
fn a_single_definition_lands_in_the_filename_package() {
    let lowered = lower_one("def x = 1\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "x@test").body;
    assert_eq!(as_integer(body), &BigInt::from(1));

    assert!(package(&lowered, "test").exports.defs.is_empty());
}

#[test]
fn duplicate_definitions_are_reported() {
    let lowered = lower_one("package p\n\ndef x = 1\ndef x = 2\n");
    assert!(has_error(&lowered, "definition 'x' was previously defined at"));
    // the surviving definition is the first one, under its qualified name
    assert_eq!(as_integer(&def(&lowered, "p", "x@p").body), &BigInt::from(1));
}

#[test]
fn tuple_members_get_accessors() {
    let lowered = lower_one("tuple Pair = First: Integer, Second: String\n");
    assert_clean(&lowered);

    for name in [
        "Pair@test",
        "getPairFirst@test",
        "setPairFirst@test",
        "editPairFirst@test",
        "getPairSecond@test",
        "setPairSecond@test",
        "editPairSecond@test",
    ] {
        let _ = def(&lowered, "test", name);
    }

    assert!(package(&lowered, "test").package.types.contains_key("Pair"));
}

#[test]
fn accessor_shapes() {
    let lowered = lower_one("tuple Pair = First: Integer, Second: String\n");

    // get: λ_. Get #0
    let get = &def(&lowered, "test", "getPairFirst@test").body;
    assert!(get.flags & ast::FLAG_SYNTHETIC != 0);
    let BareExpr::Lambda { name, body, .. } = &get.bare else { panic!("get is not a lambda") };
    assert_eq!(name, "_");
    let BareExpr::Get { field, .. } = &body.bare else { panic!("get does not project") };
    assert_eq!(*field, 0);

    // set: λFirst. λ_x. scope over the constructor
    let set = &def(&lowered, "test", "setPairFirst@test").body;
    let BareExpr::Lambda { name, body, .. } = &set.bare else { panic!("set is not a lambda") };
    assert_eq!(name, "First");
    let BareExpr::Lambda { name, body, .. } = &body.bare else { panic!("set is not curried") };
    assert_eq!(name, "_ x");
    let BareExpr::DefMap(scope) = &body.bare else { panic!("set has no member scope") };
    // the replaced slot reads the parameter, the kept slot projects
    assert!(matches!(
        &scope.defs.get("_ a0002").unwrap().body.bare,
        BareExpr::VarRef(name) if name == "First",
    ));
    assert!(matches!(
        &scope.defs.get("_ a0001").unwrap().body.bare,
        BareExpr::Get { field: 1, .. },
    ));

    // edit: λfnFirst. λ_x. scope where the edited slot applies fnFirst
    let edit = &def(&lowered, "test", "editPairFirst@test").body;
    let BareExpr::Lambda { name, body, .. } = &edit.bare else { panic!("edit is not a lambda") };
    assert_eq!(name, "fnFirst");
    let BareExpr::Lambda { body, .. } = &body.bare else { panic!("edit is not curried") };
    let BareExpr::DefMap(scope) = &body.bare else { panic!("edit has no member scope") };
    let BareExpr::App(function, _) = &scope.defs.get("_ a0002").unwrap().body.bare else {
        panic!("edited slot is not an application")
    };
    assert!(matches!(&function.bare, BareExpr::VarRef(name) if name == "fnFirst"));
}

#[test]
fn if_lowers_to_a_boolean_match() {
    let lowered = lower_one("def t = if true then 1 else 2\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "t@test").body;
    let BareExpr::Match(lowered_match) = &body.bare else { panic!("not a match") };

    assert_eq!(lowered_match.args.len(), 1);
    assert!(matches!(
        &lowered_match.args[0].bare,
        BareExpr::VarRef(name) if name == "true",
    ));

    assert_eq!(lowered_match.patterns.len(), 2);
    assert_eq!(lowered_match.patterns[0].pattern.name, "True@wake");
    assert_eq!(as_integer(&lowered_match.patterns[0].body), &BigInt::from(1));
    assert_eq!(lowered_match.patterns[1].pattern.name, "False@wake");
    assert_eq!(as_integer(&lowered_match.patterns[1].body), &BigInt::from(2));
}

#[test]
fn wildcard_parameters_get_fresh_internal_names() {
    let lowered = lower_one("def f _ _ = 0\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "f@test").body;
    let BareExpr::Lambda { name, body, .. } = &body.bare else { panic!("not a lambda") };
    assert_eq!(name, "_ 1");
    let BareExpr::Lambda { name, body, .. } = &body.bare else { panic!("not curried") };
    assert_eq!(name, "_ 2");
    assert_eq!(as_integer(body), &BigInt::from(0));
}

#[test]
fn holes_lift_into_outer_lambdas_in_source_order() {
    let lowered = lower_one("def add = (_ + _)\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "add@test").body;
    let BareExpr::Lambda { name, body, .. } = &body.bare else { panic!("no outer binder") };
    assert_eq!(name, "_ 1");
    let BareExpr::Lambda { name, body, .. } = &body.bare else { panic!("no second binder") };
    assert_eq!(name, "_ 2");

    // (binary + _1) _2
    let BareExpr::App(function, argument) = &body.bare else { panic!("body is not app") };
    assert!(matches!(&argument.bare, BareExpr::VarRef(name) if name == "_ 2"));
    let BareExpr::App(operator, first) = &function.bare else { panic!("no inner app") };
    assert!(matches!(&operator.bare, BareExpr::VarRef(name) if name == "binary +"));
    assert!(matches!(&first.bare, BareExpr::VarRef(name) if name == "_ 1"));
}

#[test]
fn already_lifted_lambdas_are_not_revisited() {
    // the hole belongs to the inner parentheses, not the outer definition
    let lowered = lower_one("def apply = (\\f f (_ + 1))\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "apply@test").body;
    let BareExpr::Lambda { name, .. } = &body.bare else { panic!("not a lambda") };
    assert_eq!(name, "f");
}

#[test]
fn package_merge_is_commutative() {
    let a = ("a", "package p\nexport def x = 1\n");
    let b = ("b", "package p\ndef y = 2\n");

    let forward = lower_files(&[a, b]);
    let backward = lower_files(&[b, a]);
    assert_clean(&forward);
    assert_clean(&backward);

    let names = |lowered: &Lowered| {
        let package = package(lowered, "p");
        let mut defs: Vec<String> = package
            .files
            .iter()
            .flat_map(|file| file.content.defs.keys().cloned())
            .collect();
        defs.sort();
        let mut exports: Vec<String> = package.exports.defs.keys().cloned().collect();
        exports.sort();
        let mut locals: Vec<String> = package.package.defs.keys().cloned().collect();
        locals.sort();
        (defs, exports, locals)
    };

    assert_eq!(names(&forward), names(&backward));
}

#[test]
fn cross_file_duplicates_within_a_package_are_reported() {
    let lowered = lower_files(&[
        ("a", "package p\ndef x = 1\n"),
        ("b", "package p\ndef x = 2\n"),
    ]);
    assert!(has_error(&lowered, "'x' was previously defined at"));
}

#[test]
fn default_import_is_the_wake_package() {
    let lowered = lower_one("def x = 1\n");
    let file = &package(&lowered, "test").files[0];
    assert_eq!(file.content.imports.import_all, vec!["wake".to_owned()]);
}

#[test]
fn explicit_imports_suppress_the_default() {
    let lowered = lower_one("from base import map\ndef x = 1\n");
    assert_clean(&lowered);

    let file = &package(&lowered, "test").files[0];
    assert!(file.content.imports.import_all.is_empty());
    assert_eq!(file.content.imports.mixed.get("map").unwrap().qualified, "map@base");
}

#[test]
fn renamed_and_kinded_imports() {
    let lowered = lower_one("from base import def a b=c\n");
    assert_clean(&lowered);

    let imports = &package(&lowered, "test").files[0].content.imports;
    assert_eq!(imports.defs.get("a").unwrap().qualified, "a@base");
    assert_eq!(imports.defs.get("b").unwrap().qualified, "c@base");
}

#[test]
fn operator_imports_without_arity_get_the_op_prefix() {
    let lowered = lower_one("from base import +\n");
    assert_clean(&lowered);

    let imports = &package(&lowered, "test").files[0].content.imports;
    assert_eq!(imports.mixed.get("op +").unwrap().qualified, "op +@base");
}

#[test]
fn duplicate_imports_are_reported() {
    let lowered = lower_one("from base import a a\n");
    assert!(has_error(&lowered, "symbol 'a' was previously imported at"));
}

#[test]
fn renaming_across_symbol_kinds_requires_an_arity() {
    let lowered = lower_one("from base import a = +\n");
    assert!(has_error(&lowered, "keyword 'binary' or 'unary' required"));
}

#[test]
fn export_requires_a_kind() {
    let lowered = lower_one("from base export a\n");
    assert!(has_error(&lowered, "must be followed by 'def', 'type', or 'topic'"));
}

#[test]
fn operator_exports_require_an_arity() {
    let lowered = lower_one("from base export def +\n");
    assert!(has_error(&lowered, "must specify 'unary' or 'binary'"));
}

#[test]
fn a_reexport_can_coexist_with_its_definition() {
    let lowered = lower_one("package p\nfrom p export def x\ndef x = 1\n");
    assert_clean(&lowered);
}

#[test]
fn topics_are_recorded_per_file() {
    let lowered = lower_one("topic jobs: List String\n");
    assert_clean(&lowered);
    assert!(package(&lowered, "test").files[0].topics.contains_key("jobs"));
}

#[test]
fn topic_names_must_be_lower_case() {
    let lowered = lower_one("topic Jobs: List String\n");
    assert!(has_error(&lowered, "topic identifier 'Jobs' is not lower-case"));
}

#[test]
fn duplicate_topics_are_reported() {
    let lowered = lower_one("topic t: A\ntopic t: B\n");
    assert!(has_error(&lowered, "topic 't' was previously defined at"));
}

#[test]
fn data_constructors_become_curried_construct_definitions() {
    let lowered = lower_one("data Tree a =\n    Leaf\n    Node a a\n");
    assert_clean(&lowered);

    let leaf = &def(&lowered, "test", "Leaf@test").body;
    assert!(matches!(&leaf.bare, BareExpr::Construct { index: 0, .. }));

    let node = &def(&lowered, "test", "Node@test").body;
    let BareExpr::Lambda { name, body, .. } = &node.bare else { panic!("Node not curried") };
    assert_eq!(name, "_");
    let BareExpr::Lambda { body, .. } = &body.bare else { panic!("Node not fully curried") };
    let BareExpr::Construct { sum, index } = &body.bare else { panic!("not a construct") };
    assert_eq!(sum.name, "Tree");
    assert_eq!(*index, 1);
    assert_eq!(sum.members[*index].index, *index);
}

#[test]
fn lower_case_data_types_are_rejected() {
    let lowered = lower_one("data tree = Leaf\n");
    assert!(has_error(&lowered, "data type 'tree' must be upper-case or operator"));
}

#[test]
fn duplicate_type_arguments_are_rejected() {
    let lowered = lower_one("data Pair a a = Two a a\n");
    assert!(has_error(&lowered, "type argument 'a' occurs more than once"));
}

#[test]
fn pattern_arguments_lift_into_a_match() {
    let lowered = lower_one("tuple Pair = First: Integer, Second: Integer\ndef first (Pair a b) = a\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "first@test").body;
    let BareExpr::Lambda { name, body, .. } = &body.bare else { panic!("not a lambda") };
    assert_eq!(name, "_ 0");
    let BareExpr::Match(lifted) = &body.bare else { panic!("not a match") };
    assert!(matches!(&lifted.args[0].bare, BareExpr::VarRef(name) if name == "_ 0"));
    assert_eq!(lifted.patterns[0].pattern.name, "Pair");
}

#[test]
fn extraction_bindings_destructure_into_top_level_names() {
    let lowered = lower_one("tuple Pair = First: Integer, Second: Integer\ndef Pair a b = p\n");

    for name in ["_ extract 8@test", "a@test", "b@test"] {
        let _ = def(&lowered, "test", name);
    }

    let a = &def(&lowered, "test", "a@test").body;
    let BareExpr::Match(destructure) = &a.bare else { panic!("not a destructuring match") };
    assert_eq!(destructure.patterns[0].pattern.name, "Pair");
    assert!(matches!(
        &destructure.patterns[0].body.bare,
        BareExpr::VarRef(name) if name == "_a",
    ));
}

#[test]
fn literal_patterns_become_comparison_guards() {
    let lowered = lower_one("def m = match x\n    1 = a\n    _ = b\n");

    let body = &def(&lowered, "test", "m@test").body;
    let BareExpr::Match(lowered_match) = &body.bare else { panic!("not a match") };

    let arm = &lowered_match.patterns[0];
    assert_eq!(arm.pattern.name, "_ k0");

    let guard = arm.guard.as_ref().expect("no guard synthesized");
    let BareExpr::Match(comparison) = &guard.bare else { panic!("guard is not a match") };
    assert_eq!(comparison.patterns[0].pattern.name, "LT@wake");
    assert_eq!(comparison.patterns[1].pattern.name, "GT@wake");
    assert_eq!(comparison.patterns[2].pattern.name, "EQ@wake");
    assert!(matches!(
        &comparison.patterns[2].body.bare,
        BareExpr::VarRef(name) if name == "True@wake",
    ));

    // integer literals compare with icmp
    fn contains_prim(expr: &Expr, name: &str) -> bool {
        match &expr.bare {
            BareExpr::Prim(prim) => prim == name,
            BareExpr::App(function, argument) => {
                contains_prim(function, name) || contains_prim(argument, name)
            }
            BareExpr::Lambda { body, .. } => contains_prim(body, name),
            _ => false,
        }
    }
    assert!(contains_prim(&comparison.args[0], "icmp"));

    // the second arm has no literals and thus no guard
    assert!(lowered_match.patterns[1].guard.is_none());
}

#[test]
fn require_lowers_to_a_flagged_match() {
    let lowered = lower_one("def x =\n    require Pass y = z\n    y\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "x@test").body;
    let BareExpr::Match(lowered_match) = &body.bare else { panic!("not a match") };
    assert!(lowered_match.is_require);
    assert!(lowered_match.otherwise.is_none());
    assert_eq!(lowered_match.patterns[0].pattern.name, "Pass");
}

#[test]
fn require_else_becomes_the_otherwise_branch() {
    let lowered = lower_one("def x =\n    require Pass y = z\n    else w\n    y\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "x@test").body;
    let BareExpr::Match(lowered_match) = &body.bare else { panic!("not a match") };
    assert!(lowered_match.otherwise.is_some());
}

#[test]
fn targets_memoize_through_a_companion_table() {
    let lowered = lower_one("target build a \\ b = a\n");
    assert_clean(&lowered);

    let table = &def(&lowered, "test", "table build@test").body;
    let BareExpr::App(function, argument) = &table.bare else { panic!("table is not an app") };
    let BareExpr::Lambda { body, .. } = &function.bare else { panic!("table fn not a lambda") };
    assert!(matches!(&body.bare, BareExpr::Prim(name) if name == "tnew"));
    assert!(matches!(&argument.bare, BareExpr::Literal(Literal::Str(_))));

    // the definition itself becomes λa. λb. tget-chain
    let body = &def(&lowered, "test", "build@test").body;
    let BareExpr::Lambda { name, body, .. } = &body.bare else { panic!("not a lambda") };
    assert_eq!(name, "a");
    let BareExpr::Lambda { name, body, .. } = &body.bare else { panic!("cache arg missing") };
    assert_eq!(name, "b");
    assert!(matches!(&body.bare, BareExpr::App(..)));
}

#[test]
fn targets_need_a_hashed_argument() {
    let lowered = lower_one("target x = 1\n");
    assert!(has_error(&lowered, "target definition must have at least one hashed argument"));
}

#[test]
fn publishes_append_to_the_topic() {
    let lowered = lower_one("publish info = 1\npublish info = 2\n");
    assert_clean(&lowered);

    let file = &package(&lowered, "test").files[0];
    assert_eq!(file.content.publishes.get("info").unwrap().len(), 2);
}

#[test]
fn publishes_may_not_be_functions() {
    let lowered = lower_one("publish info x = 1\n");
    assert!(has_error(&lowered, "publish definition may not be a function"));
}

#[test]
fn package_names_may_not_be_builtin_or_redefined() {
    let lowered = lower_one("package builtin\n");
    assert!(has_error(&lowered, "package name 'builtin' is illegal"));

    let lowered = lower_one("package a\npackage b\ndef x = 1\n");
    assert!(has_error(&lowered, "package name redefined from 'a' to 'b'"));
    let _ = def(&lowered, "a", "x@a");
}

#[test]
fn interpolation_joins_pieces_with_concatenation() {
    let lowered = lower_one("def s = \"a{x}b\"\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "s@test").body;
    // ((binary ^ ((binary ^ "a") x)) "b")
    let BareExpr::App(function, piece) = &body.bare else { panic!("not an app") };
    assert!(matches!(
        &piece.bare,
        BareExpr::Literal(Literal::Str(value)) if value == "b",
    ));
    let BareExpr::App(operator, _) = &function.bare else { panic!("no operator app") };
    assert!(matches!(&operator.bare, BareExpr::VarRef(name) if name == "binary ^"));
}

#[test]
fn here_is_the_directory_of_the_file() {
    let lowered = lower_files(&[("dir/test.wake", "def d = here\n")]);
    let body = &def(&lowered, "dir/test.wake", "d@dir/test.wake").body;
    assert!(matches!(
        &body.bare,
        BareExpr::Literal(Literal::Str(value)) if value == "dir",
    ));
}

#[test]
fn globals_are_collected_across_packages() {
    let lowered = lower_one("global def g = 1\nglobal data G = MkG\n");
    assert_clean(&lowered);

    assert!(lowered.top.globals.defs.contains_key("g"));
    assert!(lowered.top.globals.types.contains_key("G"));
}

#[test]
fn exported_definitions_land_in_the_export_table() {
    let lowered = lower_one("package p\nexport def e = 1\n");
    assert_clean(&lowered);

    let exports = &package(&lowered, "p").exports;
    assert_eq!(exports.defs.get("e").unwrap().qualified, "e@p");
}

#[test]
fn typed_arguments_bind_through_an_ascription_scope() {
    let lowered = lower_one("def f (x: Integer) = x\n");
    assert_clean(&lowered);

    let body = &def(&lowered, "test", "f@test").body;
    let BareExpr::Lambda { name, body, .. } = &body.bare else { panic!("not a lambda") };
    assert_eq!(name, "x");
    let BareExpr::DefMap(scope) = &body.bare else { panic!("no ascription scope") };
    assert!(scope.defs.contains_key("_type x"));
}
