use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;

/// `name.module.ext`, the CSS Modules filename convention.
static MODULE_FILENAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.module\.\w+$").unwrap());

type PathPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// When a file without an explicit `module` query is compiled in module mode.
#[derive(Clone, Default)]
pub enum ModulePolicy {
    /// Every style file is a module.
    Always,
    /// Only files whose query asks for it.
    Never,
    /// `*.module.<ext>` files and component-file style blocks.
    #[default]
    ByFilenameConvention,
    /// Caller-supplied decision over the file path.
    Custom(PathPredicate),
}

impl ModulePolicy {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        ModulePolicy::Custom(Arc::new(predicate))
    }

    pub fn applies(&self, path: &str) -> bool {
        match self {
            ModulePolicy::Always => true,
            ModulePolicy::Never => false,
            ModulePolicy::ByFilenameConvention => {
                matches_module_filename(path) || is_component_file(path)
            }
            ModulePolicy::Custom(predicate) => predicate(path),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModulePolicy::Always => "always",
            ModulePolicy::Never => "never",
            ModulePolicy::ByFilenameConvention => "convention",
            ModulePolicy::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for ModulePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn matches_module_filename(path: &str) -> bool {
    MODULE_FILENAME.is_match(path)
}

/// Single-file components whose `<style>` blocks are always module-eligible.
pub fn is_component_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("vue"))
}
