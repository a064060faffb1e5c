//! End-to-end merge scenarios: several translation-unit models folded into
//! one project model, including re-merges after a file changed.

use acm_core::merge::{DefaultPolicy, Merger};
use acm_core::{JoinPointType, Kind, NodeId, ProjectModel, SourceLocKind};
use proptest::prelude::*;

// ---- Test helpers ----

/// A translation unit `file` that defines `struct Foo { void bar(); }`
/// itself.
fn foo_unit(file: &str, time: i32) -> ProjectModel {
    let mut m = ProjectModel::new();
    m.set_version("1.0");
    let root = m.new_root().unwrap();
    let tu = m.new_tunit(file, time).unwrap();
    let foo = m.new_name(root, Kind::Class, "Foo").unwrap();
    m.assign_jpid(foo).unwrap();
    m.new_source(foo, tu, SourceLocKind::Def, 1, 3).unwrap();
    m.insert_into(foo, "tunits", tu).unwrap();
    let bar = m.new_name(foo, Kind::Function, "bar").unwrap();
    m.assign_jpid(bar).unwrap();
    m.new_source(bar, tu, SourceLocKind::Decl, 2, 1).unwrap();
    m.insert_into(bar, "tunits", tu).unwrap();
    m
}

fn sources_of(m: &ProjectModel, id: NodeId) -> Vec<String> {
    m.slot_ids(id, "source")
        .unwrap()
        .into_iter()
        .map(|s| m.key(s).to_string())
        .collect()
}

fn live(m: &ProjectModel, kind: Kind) -> Vec<NodeId> {
    m.select(kind.mask(), false)
}

/// Project where class `C` lives in `a.h` and `c.h`, and its member `m`
/// is declared in `a.h` and defined in `a.cc`.
fn header_project() -> ProjectModel {
    let mut m = ProjectModel::new();
    let root = m.new_root().unwrap();
    let ah = m.new_header("a.h", 100).unwrap();
    let ch = m.new_header("c.h", 100).unwrap();
    let acc = m.new_tunit("a.cc", 100).unwrap();
    let c = m.new_name(root, Kind::Class, "C").unwrap();
    m.assign_jpid(c).unwrap();
    m.new_source(c, ah, SourceLocKind::Def, 1, 5).unwrap();
    m.new_source(c, ch, SourceLocKind::Def, 1, 5).unwrap();
    let method = m.new_name(c, Kind::Function, "m").unwrap();
    m.assign_jpid(method).unwrap();
    m.new_source(method, ah, SourceLocKind::Decl, 3, 1).unwrap();
    m.new_source(method, acc, SourceLocKind::Def, 10, 4).unwrap();
    m
}

/// Translation unit that saw `a.h` at `time` and nothing else.
fn touches_a_h(time: i32) -> ProjectModel {
    let mut m = ProjectModel::new();
    m.new_root().unwrap();
    m.new_header("a.h", time).unwrap();
    m
}

// ---- Scenarios ----

#[test]
fn two_units_declaring_the_same_class() {
    let mut prj = ProjectModel::new();
    prj.merge(&mut foo_unit("a.cc", 1));
    prj.merge(&mut foo_unit("b.cc", 1));

    let classes = live(&prj, Kind::Class);
    assert_eq!(classes.len(), 1);
    assert_eq!(prj.key(classes[0]), "Class|Foo|");

    let functions = live(&prj, Kind::Function);
    assert_eq!(functions.len(), 1);
    assert_eq!(prj.node(functions[0]).unwrap().parent(), Some(classes[0]));

    assert_eq!(
        sources_of(&prj, classes[0]),
        vec!["Source|1|TUnit|a.cc|1|", "Source|1|TUnit|b.cc|1|"]
    );
    assert_eq!(sources_of(&prj, functions[0]).len(), 2);
    assert_eq!(prj.slot_ids(classes[0], "tunits").unwrap().len(), 2);
}

#[test]
fn member_losing_declaration_in_modified_header() {
    let mut prj = header_project();
    let method = prj.find(Kind::Function.mask(), "Function|m|-|0|-|").unwrap();
    let class = prj.find(Kind::Class.mask(), "Class|C|").unwrap();

    let mut tu = touches_a_h(200);
    let mut policy = DefaultPolicy;
    let mut merger = Merger::new(&mut prj, &mut tu, &mut policy);
    merger.init_change_set();
    assert_eq!(merger.modified_files().len(), 1);
    assert!(!merger.source_cleanup());
    // C's a.h source, then m with both of its sources.
    assert_eq!(merger.stats().deleted, 4);
    drop(merger);

    assert!(prj.node(method).unwrap().is_deleted());
    assert!(!prj.node(class).unwrap().is_deleted());
    assert_eq!(sources_of(&prj, class), vec!["Source|1|Header|c.h|1|"]);
    assert!(live(&prj, Kind::Function).is_empty());
}

#[test]
fn remerge_after_header_change_brings_member_back() {
    let mut prj = header_project();
    let old_jpid = prj
        .data(prj.find(Kind::Function.mask(), "Function|m|-|0|-|").unwrap())
        .unwrap()
        .jpid();

    let mut tu = ProjectModel::new();
    let root = tu.new_root().unwrap();
    let ah = tu.new_header("a.h", 200).unwrap();
    let c = tu.new_name(root, Kind::Class, "C").unwrap();
    tu.new_source(c, ah, SourceLocKind::Def, 1, 6).unwrap();
    let method = tu.new_name(c, Kind::Function, "m").unwrap();
    tu.assign_jpid(method).unwrap();
    tu.new_source(method, ah, SourceLocKind::Decl, 4, 1).unwrap();

    let stats = prj.merge(&mut tu);
    assert_eq!(stats.modified_files, 1);

    let functions = live(&prj, Kind::Function);
    assert_eq!(functions.len(), 1);
    assert_eq!(sources_of(&prj, functions[0]), vec!["Source|2|Header|a.h|4|"]);
    let new_jpid = prj.data(functions[0]).unwrap().jpid();
    assert!(new_jpid.is_some());
    assert_ne!(new_jpid, old_jpid);
    // The translation unit learns the jpid chosen by the project.
    assert_eq!(tu.data(method).unwrap().jpid(), new_jpid);

    let ah_prj = prj.find(JoinPointType::FILE, "Header|a.h|").unwrap();
    assert_eq!(prj.data(ah_prj).unwrap().file().unwrap().time, 200);
}

#[test]
fn merging_the_same_unit_twice_changes_nothing() {
    let mut prj = ProjectModel::new();
    prj.merge(&mut foo_unit("a.cc", 1));
    let first = prj.dump();

    let stats = prj.merge(&mut foo_unit("a.cc", 1));
    assert_eq!(stats.copied, 0);
    assert_eq!(stats.deleted, 0);
    assert_eq!(stats.modified_files, 0);
    assert_eq!(prj.dump(), first);
}

#[test]
fn census_counts_live_nodes() {
    let mut prj = ProjectModel::new();
    prj.merge(&mut foo_unit("a.cc", 1));
    prj.merge(&mut foo_unit("b.cc", 1));
    let census = prj.census();
    assert_eq!(census.get(&Kind::Class), Some(&1));
    assert_eq!(census.get(&Kind::Function), Some(&1));
    assert_eq!(census.get(&Kind::TUnit), Some(&2));
    assert_eq!(census.get(&Kind::Source), Some(&4));
}

// ---- Properties ----

fn unit_with_functions(file: &str, names: &[String]) -> ProjectModel {
    let mut m = ProjectModel::new();
    let root = m.new_root().unwrap();
    let tu = m.new_tunit(file, 1).unwrap();
    for (line, name) in names.iter().enumerate() {
        let f = m.new_name(root, Kind::Function, name).unwrap();
        m.assign_jpid(f).unwrap();
        m.new_source(f, tu, SourceLocKind::Def, line as i32 + 1, 1).unwrap();
    }
    m
}

proptest! {
    #[test]
    fn one_project_node_per_key(
        units in prop::collection::vec(
            prop::collection::btree_set("[a-e]{1,2}", 0..6),
            1..5,
        )
    ) {
        let mut prj = ProjectModel::new();
        let mut expected = std::collections::BTreeSet::new();
        for (i, names) in units.iter().enumerate() {
            let names: Vec<String> = names.iter().cloned().collect();
            expected.extend(names.iter().map(|n| format!("Function|{n}|-|0|-|")));
            prj.merge(&mut unit_with_functions(&format!("u{i}.cc"), &names));
        }

        let keys: std::collections::BTreeSet<String> = live(&prj, Kind::Function)
            .into_iter()
            .map(|id| prj.key(id).to_string())
            .collect();
        prop_assert_eq!(&keys, &expected);
        prop_assert_eq!(live(&prj, Kind::Function).len(), expected.len());

        let mut jpids: Vec<u32> = live(&prj, Kind::Function)
            .into_iter()
            .filter_map(|id| prj.data(id).unwrap().jpid())
            .collect();
        jpids.sort_unstable();
        jpids.dedup();
        prop_assert_eq!(jpids.len(), expected.len());
    }
}
