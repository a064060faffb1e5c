//! Conflict hooks consulted while merging.

use tracing::warn;

use crate::attrs::Scalar;
use crate::id::NodeId;
use crate::kind::Kind;

/// Where an attribute conflict was found. `me` and `that` are `None` for
/// attributes of the model itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSite {
    pub kind: Kind,
    pub me: Option<NodeId>,
    pub that: Option<NodeId>,
    pub attr: &'static str,
}

/// Decides what happens when the project model (`me`) and a translation
/// unit model (`that`) disagree on a non-key attribute.
///
/// The jpid attribute never reaches these hooks when both sides carry one:
/// the project's jpid is kept and written back onto the translation unit
/// node.
pub trait MergePolicy {
    /// Returns true if the project value should be overwritten.
    fn merge_attr(&mut self, _site: &AttrSite, _mine: &Scalar, _theirs: &Scalar) -> bool {
        true
    }

    /// An optional attribute is set only in the project model. The project
    /// value is kept.
    fn merge_attr_only_in_me(&mut self, site: &AttrSite) {
        warn!(
            kind = %site.kind,
            attr = site.attr,
            me = ?site.me,
            that = ?site.that,
            "attribute only in project model"
        );
    }

    /// An optional attribute is set only in the translation unit model. The
    /// project value is kept.
    fn merge_attr_only_in_that(&mut self, site: &AttrSite) {
        warn!(
            kind = %site.kind,
            attr = site.attr,
            me = ?site.me,
            that = ?site.that,
            "attribute only in translation unit model"
        );
    }
}

/// Overwrite on conflict and log one-sided attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl MergePolicy for DefaultPolicy {}

/// Keeps every project value and records what differed.
#[derive(Debug, Clone, Default)]
pub struct KeepProject {
    pub conflicts: Vec<AttrSite>,
}

impl MergePolicy for KeepProject {
    fn merge_attr(&mut self, site: &AttrSite, _mine: &Scalar, _theirs: &Scalar) -> bool {
        self.conflicts.push(*site);
        false
    }
}
