pub mod naming;
pub mod policy;
pub mod rules;
pub mod stage;
pub mod variables;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Serialize, Serializer};

use crate::config::BuildConfig;
use naming::class_exports;
use policy::is_component_file;
use stage::{
    InjectionOptions, Pipeline, PostcssPlugin, PostprocessorOptions, PreprocessorOptions,
    ScopeOptions, Stage, StageKind,
};

/// Stylesheet family a file is compiled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleLanguage {
    /// Plain CSS: goes straight to scope extraction.
    Css,
    /// Less: compiled to CSS first, with the variable table injected.
    Less,
}

impl StyleLanguage {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "css" => Some(StyleLanguage::Css),
            "less" => Some(StyleLanguage::Less),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleLanguage::Css => "css",
            StyleLanguage::Less => "less",
        }
    }

    /// Stage kinds a file of this language passes through, in order.
    pub fn stage_kinds(&self) -> &'static [StageKind] {
        match self {
            StyleLanguage::Css => &[
                StageKind::StyleInjection,
                StageKind::ScopeExtraction,
                StageKind::PostprocessorStage,
            ],
            StyleLanguage::Less => &[
                StageKind::StyleInjection,
                StageKind::ScopeExtraction,
                StageKind::PreprocessorStage,
                StageKind::PostprocessorStage,
            ],
        }
    }
}

impl fmt::Display for StyleLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource query attached to a file path, e.g. the
/// `vue&type=style&index=0&lang=less&module` a component loader produces for
/// one `<style>` block. Keys without `=` have an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Parse a query string. A leading `?` is optional; pairs with an empty
    /// key are dropped rather than rejected.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let pairs = raw
            .split('&')
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let key = key.trim();
                if key.is_empty() {
                    None
                } else {
                    Some((key.to_string(), value.trim().to_string()))
                }
            })
            .collect();
        Self { pairs }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            f.write_str(key)?;
            if !value.is_empty() {
                write!(f, "={value}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A file (or component style block) handed to the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile<'s> {
    pub path: String,
    pub query: Query,
    /// Stylesheet text; only needed to list generated class names.
    pub content: Option<&'s str>,
}

impl<'s> SourceFile<'s> {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Query::default(),
            content: None,
        }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = query;
        self
    }

    pub fn with_content(mut self, content: &'s str) -> Self {
        self.content = Some(content);
        self
    }
}

/// Decide which stylesheet family `file` belongs to, if any.
///
/// `.css` and `.less` go by extension. A component file only counts when its
/// query names a style block (`type=style`); the block's `lang` picks the
/// family and defaults to CSS.
pub fn classify(file: &SourceFile<'_>) -> Option<StyleLanguage> {
    let ext = Path::new(&file.path).extension()?.to_str()?;
    if is_component_file(&file.path) {
        if file.query.get("type") != Some("style") {
            return None;
        }
        return match file.query.get("lang") {
            None | Some("") => Some(StyleLanguage::Css),
            Some(lang) => StyleLanguage::from_name(lang),
        };
    }
    StyleLanguage::from_name(ext)
}

/// Module mode: requested by the query, or granted by the configured policy.
pub fn is_module_mode(file: &SourceFile<'_>, config: &BuildConfig) -> bool {
    file.query.contains_key("module") || config.module_policy().applies(&file.path)
}

/// Assemble the stage chain for one file.
///
/// Unrecognized files get an empty pipeline, which tells the host to skip
/// them. The returned pipeline borrows the variable table from `config`.
pub fn build_pipeline<'a>(file: &SourceFile<'_>, config: &'a BuildConfig) -> Pipeline<'a> {
    let Some(language) = classify(file) else {
        return Pipeline::empty();
    };
    let module_mode = is_module_mode(file, config);

    let mut stages = Vec::with_capacity(4);
    stages.push(Stage::StyleInjection(InjectionOptions {
        mode: config.inject(),
    }));
    stages.push(Stage::ScopeExtraction(scope_options(
        file,
        language,
        module_mode,
        config,
    )));
    if language == StyleLanguage::Less {
        stages.push(Stage::Preprocessor(PreprocessorOptions {
            language,
            global_vars: config.variables(),
            math: config.math(),
            javascript_enabled: config.javascript_enabled(),
        }));
    }
    stages.push(Stage::Postprocessor(PostprocessorOptions {
        plugins: vec![PostcssPlugin::Autoprefixer, PostcssPlugin::DeepSelector],
        targets: config.targets().to_vec(),
    }));

    Pipeline::from_stages(stages)
}

fn scope_options(
    file: &SourceFile<'_>,
    language: StyleLanguage,
    module_mode: bool,
    config: &BuildConfig,
) -> ScopeOptions {
    let template = config.local_ident_name();

    let exports = match (module_mode, file.content) {
        (true, Some(content)) => {
            class_exports(content, language, &file.path, template, config.hash_salt())
        }
        _ => BTreeMap::new(),
    };

    // A bare `module` attribute binds the default name; `module="x"` binds x.
    let export_name = if module_mode && is_component_file(&file.path) {
        match file.query.get("module") {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => Some(config.export_name().to_string()),
        }
    } else {
        None
    };

    // Everything after scope extraction also runs on imported files.
    let import_loaders = language.stage_kinds().len() - 2;

    ScopeOptions {
        module_mode,
        local_ident_name: template.as_str().to_string(),
        import_loaders,
        export_name,
        exports,
    }
}
