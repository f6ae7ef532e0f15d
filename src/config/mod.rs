use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSetBuilder};
use serde::Deserialize;
use serde_yml::Value;

use crate::compose::naming::{DEFAULT_LOCAL_IDENT_NAME, NamingTemplate};
use crate::compose::policy::ModulePolicy;
use crate::compose::stage::{InjectMode, MathMode};
use crate::compose::variables::VariableTable;
use crate::selector::ArgumentCapture;

pub const CONFIG_FILE_NAME: &str = ".stylechain.yml";

const DEFAULT_EXPORT_NAME: &str = "$style";

/// Resolved build configuration.
///
/// Constructed once at build start and then shared by reference; nothing in
/// the crate mutates it afterwards.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    variables: VariableTable,
    local_ident_name: NamingTemplate,
    hash_salt: String,
    export_name: String,
    module_policy: ModulePolicy,
    inject: InjectMode,
    math: MathMode,
    javascript_enabled: bool,
    targets: Vec<String>,
    capture: ArgumentCapture,
    head_scripts: Vec<String>,
    inline_script: String,
    environment: Option<String>,
    excludes: Vec<String>,
    config_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            variables: VariableTable::default(),
            local_ident_name: NamingTemplate::default(),
            hash_salt: String::new(),
            export_name: DEFAULT_EXPORT_NAME.to_string(),
            module_policy: ModulePolicy::default(),
            inject: InjectMode::default(),
            math: MathMode::default(),
            javascript_enabled: true,
            targets: Vec::new(),
            capture: ArgumentCapture::default(),
            head_scripts: Vec::new(),
            inline_script: String::new(),
            environment: None,
            excludes: Vec::new(),
            config_dir: None,
        }
    }
}

impl BuildConfig {
    pub fn with_variables(mut self, variables: VariableTable) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_module_policy(mut self, policy: ModulePolicy) -> Self {
        self.module_policy = policy;
        self
    }

    pub fn with_capture(mut self, capture: ArgumentCapture) -> Self {
        self.capture = capture;
        self
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn local_ident_name(&self) -> &NamingTemplate {
        &self.local_ident_name
    }

    pub fn hash_salt(&self) -> &str {
        &self.hash_salt
    }

    pub fn export_name(&self) -> &str {
        &self.export_name
    }

    pub fn module_policy(&self) -> &ModulePolicy {
        &self.module_policy
    }

    pub fn inject(&self) -> InjectMode {
        self.inject
    }

    pub fn math(&self) -> MathMode {
        self.math
    }

    pub fn javascript_enabled(&self) -> bool {
        self.javascript_enabled
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn capture(&self) -> ArgumentCapture {
        self.capture
    }

    /// Externally hosted scripts to place in the document head.
    pub fn head_scripts(&self) -> &[String] {
        &self.head_scripts
    }

    /// Inline script fragment; empty when none is configured or the file
    /// could not be read.
    pub fn inline_script(&self) -> &str {
        &self.inline_script
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Exclude globs applied during file discovery.
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// JSON view of the resolved configuration, for `--print-config`.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "config_dir": self.config_dir.as_ref().map(|d| d.display().to_string()),
            "environment": self.environment,
            "variables": self.variables,
            "modules": {
                "auto": self.module_policy.name(),
                "local_ident_name": self.local_ident_name.as_str(),
                "hash_salt": self.hash_salt,
                "export_name": self.export_name,
            },
            "less": {
                "math": self.math,
                "javascript_enabled": self.javascript_enabled,
            },
            "inject": self.inject,
            "targets": self.targets,
            "deep_selector": { "capture": self.capture },
            "head_scripts": self.head_scripts,
            "inline_script_bytes": self.inline_script.len(),
            "exclude": self.excludes,
        })
    }
}

/// Build-time overrides layered on top of the config file.
#[derive(Debug, Default, Clone)]
pub struct LoadOptions {
    /// Name of an `environments:` entry to overlay.
    pub environment: Option<String>,
    /// `--define KEY=VALUE` pairs; applied after everything else.
    pub defines: Vec<(String, String)>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    variables: BTreeMap<String, Value>,
    environments: BTreeMap<String, RawEnvironment>,
    inline_script: Option<PathBuf>,
    head_scripts: Vec<String>,
    modules: RawModules,
    less: RawLess,
    inject: InjectMode,
    targets: Vec<String>,
    deep_selector: RawDeepSelector,
    exclude: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEnvironment {
    variables: BTreeMap<String, Value>,
    inline_script: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawModules {
    auto: Option<RawAutoPolicy>,
    local_ident_name: Option<String>,
    hash_salt: String,
    export_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAutoPolicy {
    Flag(bool),
    Named(String),
    Patterns(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLess {
    math: MathMode,
    javascript_enabled: bool,
}

impl Default for RawLess {
    fn default() -> Self {
        Self {
            math: MathMode::default(),
            javascript_enabled: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDeepSelector {
    capture: ArgumentCapture,
}

/// Load config from the given path, or look for `.stylechain.yml` in
/// `target_dir` (falling back to the current directory). A missing file
/// yields the defaults; an unreadable or malformed one is an error.
pub fn load_config(
    path: Option<&Path>,
    target_dir: Option<&Path>,
    options: &LoadOptions,
) -> Result<BuildConfig> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => target_dir
            .unwrap_or_else(|| Path::new("."))
            .join(CONFIG_FILE_NAME),
    };

    if !config_path.exists() {
        log::debug!("no config at {}, using defaults", config_path.display());
        return build_config(RawConfig::default(), None, options);
    }

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("failed to read config {}", config_path.display()))?;
    let raw: RawConfig = if contents.trim().is_empty() {
        RawConfig::default()
    } else {
        serde_yml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?
    };

    let config_dir = config_path
        .parent()
        .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
        .map(Path::to_path_buf);
    build_config(raw, config_dir, options)
}

fn build_config(
    raw: RawConfig,
    config_dir: Option<PathBuf>,
    options: &LoadOptions,
) -> Result<BuildConfig> {
    let mut variables = VariableTable::builder().layer(literal_entries(&raw.variables));
    let mut inline_script_path = raw.inline_script;

    if let Some(name) = options.environment.as_deref() {
        match raw.environments.get(name) {
            Some(env) => {
                variables = variables.layer(literal_entries(&env.variables));
                if env.inline_script.is_some() {
                    inline_script_path = env.inline_script.clone();
                }
            }
            None => log::warn!("environment `{name}` is not defined in the config"),
        }
    }
    variables = variables.layer(options.defines.iter().map(|(k, v)| (k, v.clone())));

    let inline_script = inline_script_path
        .map(|p| match &config_dir {
            Some(dir) if p.is_relative() => dir.join(p),
            _ => p,
        })
        .map(|p| load_inline_script(&p))
        .unwrap_or_default();

    Ok(BuildConfig {
        variables: variables.build(),
        local_ident_name: NamingTemplate::parse(
            raw.modules
                .local_ident_name
                .as_deref()
                .unwrap_or(DEFAULT_LOCAL_IDENT_NAME),
        ),
        hash_salt: raw.modules.hash_salt,
        export_name: raw
            .modules
            .export_name
            .unwrap_or_else(|| DEFAULT_EXPORT_NAME.to_string()),
        module_policy: module_policy(raw.modules.auto)?,
        inject: raw.inject,
        math: raw.less.math,
        javascript_enabled: raw.less.javascript_enabled,
        targets: raw.targets,
        capture: raw.deep_selector.capture,
        head_scripts: raw.head_scripts,
        inline_script,
        environment: options.environment.clone(),
        excludes: raw.exclude,
        config_dir,
    })
}

fn module_policy(raw: Option<RawAutoPolicy>) -> Result<ModulePolicy> {
    let policy = match raw {
        None | Some(RawAutoPolicy::Flag(true)) => ModulePolicy::ByFilenameConvention,
        Some(RawAutoPolicy::Flag(false)) => ModulePolicy::Never,
        Some(RawAutoPolicy::Named(name)) => match name.as_str() {
            "always" => ModulePolicy::Always,
            "never" => ModulePolicy::Never,
            "convention" | "auto" => ModulePolicy::ByFilenameConvention,
            other => {
                log::warn!("unknown modules.auto value `{other}`, using `convention`");
                ModulePolicy::ByFilenameConvention
            }
        },
        Some(RawAutoPolicy::Patterns(patterns)) => {
            let mut builder = GlobSetBuilder::new();
            for pattern in &patterns {
                let glob = Glob::new(pattern)
                    .with_context(|| format!("invalid modules.auto pattern: {pattern}"))?;
                builder.add(glob);
            }
            let set = builder.build().context("failed to build modules.auto patterns")?;
            ModulePolicy::custom(move |path| set.is_match(path))
        }
    };
    Ok(policy)
}

/// Read the inline script fragment. Absent or unreadable files give an
/// empty fragment.
pub fn load_inline_script(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

fn literal_entries(map: &BTreeMap<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .filter_map(|(name, value)| match value_to_literal(value) {
            Some(literal) => Some((name.clone(), literal)),
            None => {
                log::warn!("variable `{name}` is not a scalar, skipping");
                None
            }
        })
        .collect()
}

fn value_to_literal(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a `KEY=VALUE` define.
pub fn parse_define(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, content).unwrap();
        path
    }

    fn load(path: &Path) -> BuildConfig {
        load_config(Some(path), None, &LoadOptions::default()).unwrap()
    }

    #[test]
    fn missing_config_returns_defaults() {
        let config = load(Path::new("/nonexistent/.stylechain.yml"));
        assert!(config.variables().is_empty());
        assert_eq!(config.local_ident_name().as_str(), DEFAULT_LOCAL_IDENT_NAME);
        assert_eq!(config.module_policy().name(), "convention");
        assert_eq!(config.math(), MathMode::Always);
        assert!(config.javascript_enabled());
        assert_eq!(config.capture(), ArgumentCapture::Balanced);
        assert_eq!(config.inline_script(), "");
        assert!(config.config_dir().is_none());
    }

    #[test]
    fn empty_file_is_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "\n");
        let config = load(&path);
        assert!(config.variables().is_empty());
        assert_eq!(config.config_dir(), Some(dir.path()));
    }

    #[test]
    fn discovered_in_target_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "variables:\n  gap: 8px\n");
        let config = load_config(None, Some(dir.path()), &LoadOptions::default()).unwrap();
        assert_eq!(config.variables().get("gap"), Some("8px"));
    }

    #[test]
    fn scalar_variables_become_literals() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "variables:\n  '@primary-color': '#1890ff'\n  line-height: 1.5\n  rounded: true\n  list: [1, 2]\n",
        );
        let config = load(&path);
        let vars = config.variables();
        assert_eq!(vars.get("primary-color"), Some("#1890ff"));
        assert_eq!(vars.get("line-height"), Some("1.5"));
        assert_eq!(vars.get("rounded"), Some("true"));
        assert_eq!(vars.get("list"), None);
    }

    #[test]
    fn environment_overlay_and_defines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "variables:\n  primary: blue\n  gap: 4px\nenvironments:\n  production:\n    variables:\n      primary: navy\n",
        );
        let options = LoadOptions {
            environment: Some("production".to_string()),
            defines: vec![("gap".to_string(), "6px".to_string())],
        };
        let config = load_config(Some(&path), None, &options).unwrap();
        assert_eq!(config.variables().get("primary"), Some("navy"));
        assert_eq!(config.variables().get("gap"), Some("6px"));
        assert_eq!(config.environment(), Some("production"));
    }

    #[test]
    fn unknown_environment_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "variables:\n  primary: blue\n");
        let options = LoadOptions {
            environment: Some("staging".to_string()),
            defines: vec![],
        };
        let config = load_config(Some(&path), None, &options).unwrap();
        assert_eq!(config.variables().get("primary"), Some("blue"));
    }

    #[test]
    fn inline_script_is_read_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("env")).unwrap();
        fs::write(dir.path().join("env/prod.js"), "window.ENV = 'prod';").unwrap();
        let path = write_config(
            dir.path(),
            "inline_script: env/base.js\nenvironments:\n  production:\n    inline_script: env/prod.js\n",
        );
        let base = load(&path);
        assert_eq!(base.inline_script(), "");
        let options = LoadOptions {
            environment: Some("production".to_string()),
            defines: vec![],
        };
        let prod = load_config(Some(&path), None, &options).unwrap();
        assert_eq!(prod.inline_script(), "window.ENV = 'prod';");
    }

    #[test]
    fn missing_inline_script_is_empty() {
        assert_eq!(load_inline_script(Path::new("/nonexistent/env.js")), "");
    }

    #[test]
    fn module_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "modules:\n  auto: always\n  local_ident_name: '[name]__[local]'\n  hash_salt: v1\n  export_name: classes\n",
        );
        let config = load(&path);
        assert_eq!(config.module_policy().name(), "always");
        assert_eq!(config.local_ident_name().as_str(), "[name]__[local]");
        assert_eq!(config.hash_salt(), "v1");
        assert_eq!(config.export_name(), "classes");
    }

    #[test]
    fn auto_flag_false_is_never() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "modules:\n  auto: false\n");
        assert_eq!(load(&path).module_policy().name(), "never");
    }

    #[test]
    fn auto_patterns_become_custom_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "modules:\n  auto:\n    - '**/components/**'\n");
        let config = load(&path);
        let policy = config.module_policy();
        assert_eq!(policy.name(), "custom");
        assert!(policy.applies("src/components/card.css"));
        assert!(!policy.applies("src/pages/home.module.css"));
    }

    #[test]
    fn invalid_auto_pattern_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "modules:\n  auto: ['a/{b']\n");
        assert!(load_config(Some(&path), None, &LoadOptions::default()).is_err());
    }

    #[test]
    fn less_inject_targets_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "less:\n  math: parens-division\n  javascript_enabled: false\ninject: extract\ntargets: ['> 1%']\ndeep_selector:\n  capture: first-close\nexclude: ['dist/**']\nhead_scripts: ['https://cdn.example.com/vue.js']\n",
        );
        let config = load(&path);
        assert_eq!(config.math(), MathMode::ParensDivision);
        assert!(!config.javascript_enabled());
        assert_eq!(config.inject(), InjectMode::Extract);
        assert_eq!(config.targets(), &["> 1%".to_string()]);
        assert_eq!(config.capture(), ArgumentCapture::FirstClose);
        assert_eq!(config.excludes(), &["dist/**".to_string()]);
        assert_eq!(config.head_scripts(), &["https://cdn.example.com/vue.js".to_string()]);
    }

    #[test]
    fn malformed_yaml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "variables: [unclosed\n");
        assert!(load_config(Some(&path), None, &LoadOptions::default()).is_err());
    }

    #[test]
    fn summary_reports_policy_and_fragment_size() {
        let config = BuildConfig::default();
        let summary = config.summary();
        assert_eq!(summary["modules"]["auto"], "convention");
        assert_eq!(summary["inline_script_bytes"], 0);
        assert_eq!(summary["less"]["math"], "always");
    }

    #[test]
    fn define_parsing() {
        assert_eq!(
            parse_define("primary=#fff"),
            Ok(("primary".to_string(), "#fff".to_string()))
        );
        assert_eq!(
            parse_define("expr=a=b"),
            Ok(("expr".to_string(), "a=b".to_string()))
        );
        assert!(parse_define("novalue").is_err());
        assert!(parse_define("=x").is_err());
    }
}
