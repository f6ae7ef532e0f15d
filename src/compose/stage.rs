use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compose::StyleLanguage;
use crate::compose::variables::VariableTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    StyleInjection,
    ScopeExtraction,
    PreprocessorStage,
    PostprocessorStage,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::StyleInjection => "style-injection",
            StageKind::ScopeExtraction => "scope-extraction",
            StageKind::PreprocessorStage => "preprocessor-stage",
            StageKind::PostprocessorStage => "postprocessor-stage",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How compiled CSS reaches the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InjectMode {
    /// Inserted at runtime through `<style>` tags.
    #[default]
    StyleTag,
    /// Written to a separate stylesheet asset.
    Extract,
}

impl InjectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjectMode::StyleTag => "style-tag",
            InjectMode::Extract => "extract",
        }
    }
}

/// Less `math` option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MathMode {
    #[default]
    Always,
    ParensDivision,
    Parens,
    Strict,
}

impl MathMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MathMode::Always => "always",
            MathMode::ParensDivision => "parens-division",
            MathMode::Parens => "parens",
            MathMode::Strict => "strict",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostcssPlugin {
    Autoprefixer,
    DeepSelector,
}

impl PostcssPlugin {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostcssPlugin::Autoprefixer => "autoprefixer",
            PostcssPlugin::DeepSelector => "deep-selector",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InjectionOptions {
    pub mode: InjectMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeOptions {
    pub module_mode: bool,
    pub local_ident_name: String,
    /// Stages that run on `@import`ed files before this one.
    pub import_loaders: usize,
    /// Binding the class map is exposed under in a component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
    /// Local class name to generated identifier. Empty unless module mode is
    /// on and the file content was supplied.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub exports: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreprocessorOptions<'a> {
    pub language: StyleLanguage,
    pub global_vars: &'a VariableTable,
    pub math: MathMode,
    pub javascript_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostprocessorOptions {
    pub plugins: Vec<PostcssPlugin>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Stage<'a> {
    StyleInjection(InjectionOptions),
    ScopeExtraction(ScopeOptions),
    #[serde(rename = "preprocessor-stage")]
    Preprocessor(PreprocessorOptions<'a>),
    #[serde(rename = "postprocessor-stage")]
    Postprocessor(PostprocessorOptions),
}

impl Stage<'_> {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::StyleInjection(_) => StageKind::StyleInjection,
            Stage::ScopeExtraction(_) => StageKind::ScopeExtraction,
            Stage::Preprocessor(_) => StageKind::PreprocessorStage,
            Stage::Postprocessor(_) => StageKind::PostprocessorStage,
        }
    }
}

impl fmt::Display for Stage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())?;
        match self {
            Stage::StyleInjection(opts) => write!(f, " ({})", opts.mode.as_str()),
            Stage::ScopeExtraction(opts) => {
                if opts.module_mode {
                    write!(f, " (module, {}", opts.local_ident_name)?;
                    if !opts.exports.is_empty() {
                        write!(f, ", {} classes", opts.exports.len())?;
                    }
                    write!(f, ")")
                } else {
                    write!(f, " (global)")
                }
            }
            Stage::Preprocessor(opts) => write!(
                f,
                " ({}, {} variables, math={})",
                opts.language,
                opts.global_vars.len(),
                opts.math.as_str()
            ),
            Stage::Postprocessor(opts) => {
                let names: Vec<&str> = opts.plugins.iter().map(PostcssPlugin::as_str).collect();
                write!(f, " ({})", names.join(", "))
            }
        }
    }
}

/// Ordered stage chain for one file. Only the composer builds these, which
/// keeps the order fixed: injection, scope extraction, preprocessor,
/// postprocessor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Pipeline<'a> {
    stages: Vec<Stage<'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    pub(crate) fn from_stages(stages: Vec<Stage<'a>>) -> Self {
        debug_assert!(
            stages.windows(2).all(|w| w[0].kind() < w[1].kind()),
            "pipeline stages out of order"
        );
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage<'a>] {
        &self.stages
    }

    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn scope(&self) -> Option<&ScopeOptions> {
        self.stages.iter().find_map(|s| match s {
            Stage::ScopeExtraction(opts) => Some(opts),
            _ => None,
        })
    }

    pub fn preprocessor(&self) -> Option<&PreprocessorOptions<'a>> {
        self.stages.iter().find_map(|s| match s {
            Stage::Preprocessor(opts) => Some(opts),
            _ => None,
        })
    }

    pub fn postprocessor(&self) -> Option<&PostprocessorOptions> {
        self.stages.iter().find_map(|s| match s {
            Stage::Postprocessor(opts) => Some(opts),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_kind_order_matches_chain() {
        assert!(StageKind::StyleInjection < StageKind::ScopeExtraction);
        assert!(StageKind::ScopeExtraction < StageKind::PreprocessorStage);
        assert!(StageKind::PreprocessorStage < StageKind::PostprocessorStage);
    }

    #[test]
    fn stage_serializes_with_kind_tag() {
        let table = VariableTable::builder().set("gap", "4px").build();
        let stage = Stage::Preprocessor(PreprocessorOptions {
            language: StyleLanguage::Less,
            global_vars: &table,
            math: MathMode::ParensDivision,
            javascript_enabled: true,
        });
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["kind"], "preprocessor-stage");
        assert_eq!(json["language"], "less");
        assert_eq!(json["global_vars"]["gap"], "4px");
        assert_eq!(json["math"], "parens-division");
    }

    #[test]
    fn scope_omits_empty_exports() {
        let stage = Stage::ScopeExtraction(ScopeOptions {
            module_mode: false,
            local_ident_name: "[local]".to_string(),
            import_loaders: 1,
            export_name: None,
            exports: BTreeMap::new(),
        });
        let json = serde_json::to_value(&stage).unwrap();
        assert_eq!(json["kind"], "scope-extraction");
        assert!(json.get("exports").is_none());
        assert!(json.get("export_name").is_none());
    }

    #[test]
    fn stage_display() {
        let stage = Stage::Postprocessor(PostprocessorOptions {
            plugins: vec![PostcssPlugin::Autoprefixer, PostcssPlugin::DeepSelector],
            targets: vec![],
        });
        assert_eq!(
            stage.to_string(),
            "postprocessor-stage (autoprefixer, deep-selector)"
        );
        let stage = Stage::StyleInjection(InjectionOptions {
            mode: InjectMode::Extract,
        });
        assert_eq!(stage.to_string(), "style-injection (extract)");
    }

    #[test]
    fn empty_pipeline() {
        let pipeline = Pipeline::empty();
        assert!(pipeline.is_empty());
        assert!(pipeline.scope().is_none());
        assert_eq!(serde_json::to_string(&pipeline).unwrap(), "[]");
    }
}
