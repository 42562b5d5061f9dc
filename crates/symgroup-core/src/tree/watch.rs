//! Watch-tree synchronisation.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{NodeFlags, NodeKind, SymbolGroup, TreeScope, WATCH_ROOT};
use crate::dumpers::typename::is_pointer_type;
use crate::error::{Result, SymbolGroupError};

/// Counts of a [`SymbolGroup::synchronize_watches`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSyncReport
{
    pub added: usize,
    pub removed: usize,
    /// Expressions that could not be evaluated (now error nodes)
    pub failed: usize,
}

impl SymbolGroup
{
    /// Bring the watch tree in line with the IDE's `iname → expression` list.
    ///
    /// Watches whose iname disappeared or whose expression changed are
    /// removed; expanded pointer watches are collapsed since the pointee may
    /// have moved; new or changed watches are added. An expression the engine
    /// cannot evaluate becomes an error node so the IDE still gets a record.
    ///
    /// Inames may be given with or without the `watch.` prefix.
    ///
    /// ## Errors
    ///
    /// [`SymbolGroupError::NoContext`] if called on a locals tree, engine
    /// errors if a stale watch cannot be removed.
    pub fn synchronize_watches(&mut self, watches: &[(String, String)]) -> Result<WatchSyncReport>
    {
        if self.scope() != &TreeScope::Watches {
            return Err(SymbolGroupError::NoContext("watches in a locals tree".to_string()));
        }
        let prefix = format!("{WATCH_ROOT}.");
        let wanted: HashMap<&str, &str> = watches
            .iter()
            .map(|(iname, expression)| {
                (
                    iname.strip_prefix(&prefix).unwrap_or(iname.as_str()),
                    expression.as_str(),
                )
            })
            .collect();

        let mut report = WatchSyncReport::default();
        for id in self.top_level() {
            let node = self.node(id);
            if node.flags().contains(NodeFlags::ADDITIONAL_SYMBOL) {
                continue;
            }
            let keep = wanted.get(node.iname.as_str()) == Some(&node.name.as_str());
            if !keep {
                debug!("Removing watch {} ({})", node.iname, node.name);
                self.remove_node(id)?;
                report.removed += 1;
                continue;
            }
            let expanded_pointer = matches!(&node.kind, NodeKind::Real(real)
                if real.is_expanded() && is_pointer_type(&real.entry.type_name));
            if expanded_pointer {
                self.collapse(id)?;
            }
        }

        let mut existing: Vec<String> = self.top_level().iter().map(|id| self.node(*id).iname.clone()).collect();
        existing.sort();
        for (iname, expression) in watches {
            let segment = iname.strip_prefix(&prefix).unwrap_or(iname.as_str());
            if existing.binary_search_by(|e| e.as_str().cmp(segment)).is_ok() {
                continue;
            }
            let root = self.root();
            match self.append_symbol(expression, expression.clone(), segment.to_string(), NodeFlags::WATCH) {
                Ok(_) => report.added += 1,
                Err(e) => {
                    warn!("Cannot evaluate watch '{expression}': {e}");
                    self.add_error_node(root, segment.to_string(), expression.clone(), e.to_string());
                    report.failed += 1;
                }
            }
        }
        debug!(
            "Watches synchronised: {} added, {} removed, {} failed",
            report.added, report.removed, report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::engine::simulated::SimulatedProcess;
    use crate::engine::DebugTarget;
    use crate::types::ThreadId;

    fn watches() -> SymbolGroup
    {
        let mut process = SimulatedProcess::new(8);
        let a = process.alloc_bytes(&[5, 0, 0, 0]);
        process.add_frame(ThreadId(1), 0, "main", &[("a", "int", a)]);
        let mut target = process.into_target();
        SymbolGroup::create_watches(target.watch_group().unwrap())
    }

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)>
    {
        list.iter().map(|(i, e)| ((*i).to_string(), (*e).to_string())).collect()
    }

    #[test]
    fn test_add_and_remove_watches()
    {
        let mut group = watches();
        let report = group.synchronize_watches(&pairs(&[("watch.0", "a")])).unwrap();
        assert_eq!(report.added, 1);
        let id = group.find("watch.0").unwrap();
        assert_eq!(group.node(id).name, "a");

        let report = group.synchronize_watches(&[]).unwrap();
        assert_eq!(report.removed, 1);
        assert!(group.find("watch.0").is_none());
        group.verify_indices().unwrap();
    }

    #[test]
    fn test_changed_expression_is_replaced()
    {
        let mut group = watches();
        group.synchronize_watches(&pairs(&[("watch.0", "a")])).unwrap();
        let report = group.synchronize_watches(&pairs(&[("watch.0", "missing")])).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.failed, 1);
        let id = group.find("watch.0").unwrap();
        assert!(matches!(group.node(id).kind, NodeKind::Error(_)));
    }

    #[test]
    fn test_unchanged_watch_is_kept()
    {
        let mut group = watches();
        group.synchronize_watches(&pairs(&[("watch.0", "a")])).unwrap();
        let before = group.find("watch.0").unwrap();
        let report = group.synchronize_watches(&pairs(&[("watch.0", "a")])).unwrap();
        assert_eq!(report, WatchSyncReport::default());
        assert_eq!(group.find("watch.0"), Some(before));
    }
}
