//! Save and reload through the XML document: identity, reference
//! topology and the jpid allocator must survive, and the file store must
//! only touch the disk when the document changes.

use acm_core::{JoinPointType, Kind, NodeId, ProjectModel, Scalar, SourceLocKind};
use acm_storage::{
    read_model, update_project, write_model, ModelStore, WriteOptions, XmlFileStore,
};

// ---- Test helpers ----

/// One line per live node: kind, key, every scalar and every reference
/// (by target key), in document order.
fn fingerprint(m: &ProjectModel) -> Vec<String> {
    m.tree_order()
        .into_iter()
        .map(|id| {
            let node = m.node(id).unwrap();
            let mut line = format!("{} {}", node.kind(), m.key(id));
            for field in node.data().scalar_fields() {
                line.push_str(&format!(" {}={:?}", field.name, field.value));
            }
            for (name, slot) in node.data().slot_list() {
                if !slot.is_owned() {
                    let targets: Vec<&str> = slot.ids().into_iter().map(|t| m.key(t)).collect();
                    line.push_str(&format!(" {name}->{targets:?}"));
                }
            }
            line
        })
        .collect()
}

fn reload(m: &mut ProjectModel) -> ProjectModel {
    let text = write_model(m, &WriteOptions::default()).unwrap();
    let mut loaded = ProjectModel::new();
    read_model(&text, &mut loaded).unwrap();
    loaded
}

fn by_key(m: &ProjectModel, mask: JoinPointType, key: &str) -> NodeId {
    m.find(mask, key)
        .unwrap_or_else(|| panic!("no node with key {key}"))
}

/// Mutually calling functions and mutually referring classes.
fn cyclic_model() -> ProjectModel {
    let mut m = ProjectModel::new();
    m.set_version("3.1");
    let root = m.new_root().unwrap();
    let tu = m.new_tunit("cycle.cc", 42).unwrap();

    let a = m.new_name(root, Kind::Class, "A").unwrap();
    let b = m.new_name(root, Kind::Class, "B").unwrap();
    for class in [a, b] {
        m.assign_jpid(class).unwrap();
        m.new_source(class, tu, SourceLocKind::Def, 1, 1).unwrap();
        m.insert_into(class, "tunits", tu).unwrap();
    }
    m.insert_into(a, "bases", b).unwrap();
    m.insert_into(b, "derived", a).unwrap();
    m.insert_into(b, "bases", a).unwrap();

    let f = m.new_name(a, Kind::Function, "f").unwrap();
    let g = m.new_name(b, Kind::Function, "g").unwrap();
    let int = m.new_type("int");
    m.set_slot(f, "result_type", Some(int)).unwrap();
    m.set_scalar(g, "variadic_args", Some(Scalar::Bool(true))).unwrap();
    m.insert_into(f, "calls", g).unwrap();
    m.insert_into(g, "calls", f).unwrap();
    m.set_slot(g, "static_in", Some(b)).unwrap();
    for function in [f, g] {
        m.assign_jpid(function).unwrap();
    }

    let call = m.new_code(f, Kind::Call, 3).unwrap();
    m.assign_jpid(call).unwrap();
    m.set_slot(call, "target", Some(g)).unwrap();
    m
}

// ---- Scenarios ----

#[test]
fn introduction_keeps_its_named_slice() {
    let mut m = ProjectModel::new();
    let root = m.new_root().unwrap();
    let slice = m.new_name(root, Kind::ClassSlice, "Logging").unwrap();
    let aspect = m.new_name(root, Kind::Aspect, "Tracer").unwrap();
    m.assign_jpid(aspect).unwrap();
    let intro = m.create(Kind::Introduction).unwrap();
    m.set_scalar(intro, "lid", Some(Scalar::Int(0))).unwrap();
    m.assign_jpid(intro).unwrap();
    m.set_slot(intro, "named_slice", Some(slice)).unwrap();
    m.insert_into(aspect, "intros", intro).unwrap();

    let loaded = reload(&mut m);

    let aspect = by_key(&loaded, Kind::Aspect.mask(), "Aspect|Tracer|");
    let intros = loaded.slot_ids(aspect, "intros").unwrap();
    assert_eq!(intros.len(), 1);
    let target = loaded
        .data(intros[0])
        .unwrap()
        .as_introduction()
        .unwrap()
        .named_slice
        .unwrap();
    assert_eq!(loaded.key(target), "ClassSlice|Logging|");
    assert_eq!(target, by_key(&loaded, Kind::ClassSlice.mask(), "ClassSlice|Logging|"));
    assert_eq!(loaded.node(intros[0]).unwrap().parent(), Some(aspect));
}

#[test]
fn cyclic_references_survive_reload() {
    let mut m = cyclic_model();
    let loaded = reload(&mut m);

    assert_eq!(fingerprint(&loaded), fingerprint(&m));
    assert_eq!(loaded.version(), "3.1");

    let f = by_key(&loaded, Kind::Function.mask(), "Function|f|-|0|-|");
    let g = by_key(&loaded, Kind::Function.mask(), "Function|g|-|0|Class|B|");
    assert_eq!(loaded.slot_ids(f, "calls").unwrap(), vec![g]);
    assert_eq!(loaded.slot_ids(g, "calls").unwrap(), vec![f]);
    assert!(loaded.data(g).unwrap().as_function().unwrap().variadic_args);
}

#[test]
fn second_save_of_reloaded_model_is_identical() {
    let mut m = cyclic_model();
    let first = write_model(&mut m, &WriteOptions::default()).unwrap();
    let mut loaded = ProjectModel::new();
    read_model(&first, &mut loaded).unwrap();
    let second = write_model(&mut loaded, &WriteOptions::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn reloaded_allocator_never_reissues_a_jpid() {
    let mut m = cyclic_model();
    let used: Vec<u32> = m
        .select(JoinPointType::ANY, false)
        .into_iter()
        .filter_map(|id| m.data(id).unwrap().jpid())
        .collect();

    let mut loaded = reload(&mut m);
    let fresh = loaded.alloc_jpid();
    assert!(!used.contains(&fresh));
    assert_eq!(fresh as usize, used.len());
}

#[test]
fn file_store_skips_unchanged_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.acp");
    let mut store = XmlFileStore::new(&path);

    let mut m = cyclic_model();
    assert!(store.save(&mut m).unwrap());

    let mut reopened = XmlFileStore::new(&path);
    let mut loaded = ProjectModel::new();
    reopened.load(&mut loaded).unwrap();
    assert_eq!(fingerprint(&loaded), fingerprint(&m));
    assert!(!reopened.save(&mut loaded).unwrap());

    loaded.set_version("3.2");
    assert!(reopened.save(&mut loaded).unwrap());
    assert!(std::fs::read_to_string(&path).unwrap().contains(r#"version="3.2""#));
}

#[test]
fn corrupt_file_leaves_model_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("project.acp");
    std::fs::write(&path, "<ac-model ids=\"1\"><files><TUnit id=\"0\"").unwrap();

    let mut m = cyclic_model();
    let mut store = XmlFileStore::new(&path);
    assert!(store.load(&mut m).is_err());
    assert!(m.is_empty());
}

#[test]
fn project_file_accumulates_units() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = XmlFileStore::new(dir.path().join("project.acp"));

    for (file, name) in [("a.cc", "alpha"), ("b.cc", "beta"), ("a.cc", "alpha")] {
        let mut tu = ProjectModel::new();
        let root = tu.new_root().unwrap();
        let unit = tu.new_tunit(file, 1).unwrap();
        let f = tu.new_name(root, Kind::Function, name).unwrap();
        tu.assign_jpid(f).unwrap();
        tu.new_source(f, unit, SourceLocKind::Def, 1, 1).unwrap();
        update_project(&mut store, &mut tu, "1.0", &mut acm_core::DefaultPolicy).unwrap();
    }

    let mut prj = ProjectModel::new();
    store.load(&mut prj).unwrap();
    let census = prj.census();
    assert_eq!(census.get(&Kind::Function), Some(&2));
    assert_eq!(census.get(&Kind::TUnit), Some(&2));
}
