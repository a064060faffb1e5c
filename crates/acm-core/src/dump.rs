//! Human-readable dump of a model tree, for debugging and the `dump`
//! command.

use std::fmt::Write;

use crate::attrs::Slot;
use crate::container::Container;
use crate::id::NodeId;
use crate::model::ProjectModel;

impl ProjectModel {
    /// Renders the live tree: one line per node with its kind, key and
    /// jpid, owned slots as nested sections and references as `->` lines.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Model version={:?}", self.version());
        self.dump_container(&mut out, 1, "files", self.files());
        if let Some(root) = self.root() {
            let _ = writeln!(out, "  root:");
            self.dump_node(&mut out, 2, root);
        }
        self.dump_container(&mut out, 1, "speculations", self.speculations());
        out
    }

    fn dump_container(&self, out: &mut String, depth: usize, name: &str, c: &Container) {
        if c.is_empty() {
            return;
        }
        let _ = writeln!(out, "{}{name}:", "  ".repeat(depth));
        for id in c.iter() {
            self.dump_node(out, depth + 1, id);
        }
    }

    fn dump_node(&self, out: &mut String, depth: usize, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        if node.is_deleted() {
            return;
        }
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}{} {:?}", node.kind(), self.key(id));
        if let Some(jpid) = node.data().jpid() {
            let _ = write!(out, " jpid={jpid}");
        }
        out.push('\n');

        for (name, slot) in node.data().slot_list() {
            match slot {
                Slot::Owned(Some(child)) => {
                    let _ = writeln!(out, "{indent}  {name}:");
                    self.dump_node(out, depth + 2, child);
                }
                Slot::OwnedMany(c) => self.dump_container(out, depth + 1, name, c),
                Slot::Link(Some(target)) => {
                    let _ = writeln!(out, "{indent}  {name} -> {}", self.key(target));
                }
                Slot::Links(c) if !c.is_empty() => {
                    let keys: Vec<&str> = c.iter().map(|t| self.key(t)).collect();
                    let _ = writeln!(out, "{indent}  {name} -> [{}]", keys.join(", "));
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::kind::Kind;
    use crate::model::ProjectModel;
    use crate::types::SourceLocKind;

    #[test]
    fn dump_small_model() {
        let mut m = ProjectModel::new();
        m.set_version("2.3");
        let root = m.new_root().unwrap();
        let tu = m.new_tunit("a.cc", 1).unwrap();
        let f = m.new_name(root, Kind::Function, "f").unwrap();
        m.assign_jpid(f).unwrap();
        m.new_source(f, tu, SourceLocKind::Def, 4, 2).unwrap();
        m.insert_into(f, "tunits", tu).unwrap();

        insta::assert_snapshot!(m.dump(), @r###"
        Model version="2.3"
          files:
            TUnit "TUnit|a.cc|"
          root:
            Namespace "Namespace|::|"
              children:
                Function "Function|f|-|0|-|" jpid=0
                  source:
                    Source "Source|1|TUnit|a.cc|4|"
                      file -> TUnit|a.cc|
                  tunits -> [TUnit|a.cc|]
        "###);
    }
}
