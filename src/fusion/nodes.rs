//! Same-as driven node merging (eq-sym, eq-rep-s, eq-rep-o)
//!
//! Each focus node absorbs every node it is declared `owl:sameAs`. The
//! absorbed node is recorded in the [`AliasMap`] and every fact mentioning
//! it is rewritten onto the focus node, so no alias survives in the store.

use tracing::{debug, trace};

use crate::core::vocab;
use crate::error::FusionResult;
use crate::fusion::consistency;
use crate::fusion::identity::AliasMap;
use crate::fusion::scope::Scope;
use crate::store::Store;
use crate::term::Term;

#[derive(Debug, Default)]
pub struct NodeMergeEngine {
    merges: usize,
}

impl NodeMergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total merges performed by this engine
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// Merge every focus node with its `sameAs` partners
    ///
    /// Focus nodes are visited in ascending order; a node already merged
    /// into another focus node is skipped. Returns the number of merges.
    pub fn run(&mut self, store: &mut Store, scope: &Scope, aliases: &mut AliasMap) -> FusionResult<usize> {
        let mut merged = 0;
        for focus in scope.sorted_focus_nodes() {
            if aliases.is_alias(&focus) {
                continue;
            }
            aliases.ensure(&focus);
            merged += self.merge_focus(store, scope, aliases, &focus)?;
        }
        if merged > 0 {
            debug!(merged, aliases = aliases.alias_count(), "merged focus nodes");
        }
        Ok(merged)
    }

    fn merge_focus(
        &mut self,
        store: &mut Store,
        scope: &Scope,
        aliases: &mut AliasMap,
        focus: &Term,
    ) -> FusionResult<usize> {
        let v = vocab();
        let mut merged = 0;

        loop {
            for other in store.subjects(&v.same_as, focus) {
                store.delete(&other, &v.same_as, focus);
                if other == *focus {
                    continue;
                }
                consistency::check_identity(store, focus, &other)?;
                store.insert(focus, &v.same_as, &other);
            }

            let partners = store.objects(focus, &v.same_as);
            if partners.is_empty() {
                break;
            }

            for other in partners {
                store.delete(focus, &v.same_as, &other);
                if other == *focus {
                    continue;
                }
                if other.is_literal() {
                    debug!(node = %focus, literal = %other, "dropping sameAs to a literal");
                    continue;
                }
                consistency::check_identity(store, focus, &other)?;

                aliases.record(focus, &other);
                let moved = store.replace_term(&other, focus, false);
                trace!(canonical = %focus, alias = %other, facts = moved, "merged node");
                merged += 1;
            }

            consistency::check_classes(store, scope.target_classes.iter())?;
        }

        self.merges += merged;
        Ok(merged)
    }
}
