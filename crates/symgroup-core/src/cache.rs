//! Session-scoped caches.
//!
//! Library information (major version, core module, namespace) is derived
//! from the loaded module list the first time a dumper asks for it. Resolved
//! type names are memoised alongside. Both are dropped when a module is
//! loaded or the session restarts.

use std::collections::HashMap;

use once_cell::unsync::OnceCell;
use tracing::{debug, info};

use crate::engine::DebugTarget;
use symgroup_utils::DumpSettings;

/// What the dumpers need to know about the inspected library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryInfo
{
    /// Major version (4, 5 or 6); 5 if nothing could be detected
    pub major_version: u32,
    /// Name of the core module, e.g. `Qt5Cored`
    pub core_module: Option<String>,
    /// Namespace the library was built in (empty for none)
    pub namespace: String,
}

impl LibraryInfo
{
    /// Detect the library version from module names. A configured version
    /// takes precedence over detection.
    #[must_use]
    pub fn detect(modules: &[String], settings: &DumpSettings) -> Self
    {
        let detected = modules.iter().find_map(|module| {
            let base = module
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(module)
                .trim_end_matches(".dll")
                .trim_end_matches(".so");
            let version = match base {
                "Qt5Core" | "Qt5Cored" => 5,
                "QtCore4" | "QtCored4" => 4,
                "Qt6Core" | "Qt6Cored" => 6,
                _ => return None,
            };
            Some((version, base.to_string()))
        });
        let (major_version, core_module) = match detected {
            Some((version, module)) => (version, Some(module)),
            None => (5, None),
        };
        Self {
            major_version: settings.library_major_version.unwrap_or(major_version),
            core_module,
            namespace: settings.library_namespace.clone(),
        }
    }

    /// Qualify a library type name with the namespace, e.g. `ns::QString`.
    #[must_use]
    pub fn qualify(&self, type_name: &str) -> String
    {
        if self.namespace.is_empty() {
            type_name.to_string()
        } else {
            format!("{}::{type_name}", self.namespace)
        }
    }
}

/// Caches that live as long as the debuggee's module list is unchanged.
#[derive(Debug, Default)]
pub struct SessionCache
{
    library: OnceCell<LibraryInfo>,
    resolved_types: HashMap<String, Option<String>>,
}

impl SessionCache
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Library information, detected on first use.
    pub fn library(&self, target: &dyn DebugTarget, settings: &DumpSettings) -> &LibraryInfo
    {
        self.library.get_or_init(|| {
            let info = LibraryInfo::detect(&target.modules(), settings);
            info!(
                "Library major version {} (core module {:?})",
                info.major_version, info.core_module
            );
            info
        })
    }

    /// Module-qualified type name, resolved through the engine once.
    pub fn resolve_type(&mut self, target: &dyn DebugTarget, type_name: &str, module: Option<&str>) -> Option<String>
    {
        if let Some(cached) = self.resolved_types.get(type_name) {
            return cached.clone();
        }
        let resolved = target.resolve_type(type_name, module).ok();
        debug!("Resolved type {type_name} -> {resolved:?}");
        self.resolved_types.insert(type_name.to_string(), resolved.clone());
        resolved
    }

    /// Forget everything (module load, session restart).
    pub fn reset(&mut self)
    {
        debug!("Resetting session caches");
        self.library = OnceCell::new();
        self.resolved_types.clear();
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn modules(names: &[&str]) -> Vec<String>
    {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    #[test]
    fn test_detect_versions()
    {
        let settings = DumpSettings::default();
        assert_eq!(LibraryInfo::detect(&modules(&["kernel32", "Qt5Cored"]), &settings).major_version, 5);
        assert_eq!(LibraryInfo::detect(&modules(&["QtCore4.dll"]), &settings).major_version, 4);
        let info = LibraryInfo::detect(&modules(&["Qt6Core"]), &settings);
        assert_eq!(info.major_version, 6);
        assert_eq!(info.core_module.as_deref(), Some("Qt6Core"));
        assert_eq!(LibraryInfo::detect(&[], &settings).core_module, None);
    }

    #[test]
    fn test_configured_version_wins()
    {
        let settings = DumpSettings {
            library_major_version: Some(4),
            library_namespace: "ns".to_string(),
            ..DumpSettings::default()
        };
        let info = LibraryInfo::detect(&modules(&["Qt5Core"]), &settings);
        assert_eq!(info.major_version, 4);
        assert_eq!(info.qualify("QString"), "ns::QString");
    }

    #[test]
    fn test_reset_redetects()
    {
        let target = crate::engine::SimulatedProcess::new(8).into_target();
        let mut cache = SessionCache::new();
        let settings = DumpSettings::default();
        assert_eq!(cache.library(&target, &settings).core_module, None);
        target.load_module("QtCore4");
        assert_eq!(cache.library(&target, &settings).major_version, 5);
        cache.reset();
        assert_eq!(cache.library(&target, &settings).major_version, 4);
    }
}
