use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::cache::PipelineCache;
use crate::compose::policy::is_component_file;
use crate::compose::stage::Pipeline;
use crate::compose::{Query, SourceFile, StyleLanguage, classify};
use crate::config::BuildConfig;
use crate::edit::{Edit, EditSet};
use crate::parse::rules::scan_rules;
use crate::parse::sfc::style_blocks;
use crate::parse::source::SourceText;
use crate::report::Rewrite;

pub struct NormalizeResult {
    pub rewrites: Vec<Rewrite>,
    pub file_count: usize,
    pub written_count: usize,
}

/// Stylesheet regions of a file: the whole text for `.css`/`.less`, one
/// region per supported `<style>` block for components.
fn style_regions(source: &SourceText) -> Vec<(usize, usize, StyleLanguage)> {
    let path = source.path_str();
    if is_component_file(&path) {
        return style_blocks(source.as_str())
            .into_iter()
            .filter_map(|block| {
                let language = block.language()?;
                Some((block.content_start, block.content_end, language))
            })
            .collect();
    }
    match classify(&SourceFile::new(path)) {
        Some(language) => vec![(0, source.as_str().len(), language)],
        None => Vec::new(),
    }
}

/// Find every selector in `source` the deep-selector normalizer would change.
/// Returns the rewrites (in source order) and the edits that apply them.
pub fn normalize_text(source: &SourceText, config: &BuildConfig) -> (Vec<Rewrite>, EditSet) {
    let path = source.path_str();
    let mut rewrites = Vec::new();
    let mut edits = Vec::new();

    for (start, end, language) in style_regions(source) {
        for mut rule in scan_rules(&source.as_str()[start..end], language) {
            let original = rule.selector.clone();
            if !rule.normalize_in_place(config.capture()) {
                continue;
            }
            let rule_start = start + rule.start;
            let rule_end = start + rule.end;
            rewrites.push(Rewrite {
                path: path.clone(),
                location: source.location(rule_start),
                original,
                normalized: rule.selector.clone(),
                applied: false,
            });
            edits.push(Edit {
                start: rule_start,
                end: rule_end,
                replacement: rule.selector,
            });
        }
    }

    (rewrites, EditSet::from_vec(edits))
}

/// Normalize the given files in parallel. With `write`, changed files are
/// rewritten in place and their rewrites are marked applied.
pub fn run_normalizer(files: &[PathBuf], config: &BuildConfig, write: bool) -> NormalizeResult {
    let wall_start = Instant::now();
    let written = AtomicUsize::new(0);

    let rewrites: Vec<Rewrite> = files
        .par_iter()
        .flat_map(|path| normalize_file(path, config, write, &written))
        .collect();

    let mut sorted = rewrites;
    sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    log::debug!(
        "normalized {} files in {:.0?}, {} rewrites",
        files.len(),
        wall_start.elapsed(),
        sorted.len()
    );

    NormalizeResult {
        rewrites: sorted,
        file_count: files.len(),
        written_count: written.load(Ordering::Relaxed),
    }
}

fn normalize_file(
    path: &Path,
    config: &BuildConfig,
    write: bool,
    written: &AtomicUsize,
) -> Vec<Rewrite> {
    let source = match SourceText::from_path(path) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e:#}");
            return Vec::new();
        }
    };

    let (mut rewrites, edits) = normalize_text(&source, config);
    if !write || edits.is_empty() {
        return rewrites;
    }

    let updated = edits.apply(source.as_str());
    match std::fs::write(path, updated) {
        Ok(()) => {
            written.fetch_add(1, Ordering::Relaxed);
            for rewrite in &mut rewrites {
                rewrite.applied = true;
            }
        }
        Err(e) => log::error!("failed to write {}: {e}", path.display()),
    }
    rewrites
}

/// The pipeline composed for one file, or for one style block of a component.
#[derive(Debug, Clone, Serialize)]
pub struct FilePipeline<'a> {
    pub path: String,
    #[serde(skip_serializing_if = "Query::is_empty")]
    pub query: Query,
    pub pipeline: Arc<Pipeline<'a>>,
}

impl FilePipeline<'_> {
    /// `path` or `path?query`, the way a host names the request.
    pub fn request(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

/// Compose pipelines for a loaded file.
///
/// A component file without an explicit query yields one entry per `<style>`
/// block. An explicit `index=N` query selects block N's content.
pub fn pipelines_for_source<'a>(
    source: &SourceText,
    query: Option<&Query>,
    cache: &PipelineCache<'a>,
) -> Vec<FilePipeline<'a>> {
    let path = source.path_str();
    let text = source.as_str();

    if !is_component_file(&path) {
        let query = query.cloned().unwrap_or_default();
        let file = SourceFile::new(path.clone())
            .with_query(query.clone())
            .with_content(text);
        return vec![FilePipeline {
            path,
            query,
            pipeline: cache.get_or_build(&file),
        }];
    }

    let blocks = style_blocks(text);
    match query {
        Some(query) => {
            let content = query
                .get("index")
                .and_then(|i| i.parse::<usize>().ok())
                .and_then(|i| blocks.get(i))
                .map_or("", |block| block.content(text));
            let file = SourceFile::new(path.clone())
                .with_query(query.clone())
                .with_content(content);
            vec![FilePipeline {
                path,
                query: query.clone(),
                pipeline: cache.get_or_build(&file),
            }]
        }
        None => blocks
            .iter()
            .map(|block| {
                let query = block.query();
                let file = SourceFile::new(path.clone())
                    .with_query(query.clone())
                    .with_content(block.content(text));
                FilePipeline {
                    path: path.clone(),
                    query,
                    pipeline: cache.get_or_build(&file),
                }
            })
            .collect(),
    }
}

/// Compose pipelines for every file in parallel, sorted by request.
pub fn run_pipelines<'a>(files: &[PathBuf], cache: &PipelineCache<'a>) -> Vec<FilePipeline<'a>> {
    let wall_start = Instant::now();

    let mut pipelines: Vec<FilePipeline<'a>> = files
        .par_iter()
        .flat_map(|path| match SourceText::from_path(path) {
            Ok(source) => pipelines_for_source(&source, None, cache),
            Err(e) => {
                log::error!("{e:#}");
                Vec::new()
            }
        })
        .collect();
    pipelines.sort_by_key(|p| p.request());

    let stats = cache.stats();
    log::debug!(
        "composed {} pipelines in {:.0?} (cache hits: {}, misses: {})",
        pipelines.len(),
        wall_start.elapsed(),
        stats.hits,
        stats.misses
    );
    pipelines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::stage::StageKind;
    use crate::selector::ArgumentCapture;
    use std::fs;

    fn source(path: &str, content: &str) -> SourceText {
        SourceText::from_string(PathBuf::from(path), content.to_string())
    }

    #[test]
    fn css_rewrites_with_locations() {
        let src = source("a.css", ".a { }\n.b /deep/ .c { color: red }\n.d :deep(.e) {}\n");
        let (rewrites, edits) = normalize_text(&src, &BuildConfig::default());

        assert_eq!(rewrites.len(), 2);
        assert_eq!(rewrites[0].location.line, 2);
        assert_eq!(rewrites[0].location.column, 0);
        assert_eq!(rewrites[0].normalized, ".b ::v-deep .c");
        assert_eq!(rewrites[1].original, ".d :deep(.e)");
        assert_eq!(rewrites[1].normalized, ".d ::v-deep .e");
        assert_eq!(
            edits.apply(src.as_str()),
            ".a { }\n.b ::v-deep .c { color: red }\n.d ::v-deep .e {}\n"
        );
    }

    #[test]
    fn declarations_are_untouched() {
        let src = source("a.css", ".a { content: \":deep(.x)\"; }\n");
        let (rewrites, edits) = normalize_text(&src, &BuildConfig::default());
        assert!(rewrites.is_empty());
        assert!(edits.is_empty());
    }

    #[test]
    fn component_blocks_are_offset() {
        let text = "<template><div/></template>\n<style scoped lang=\"less\">\n.a :deep(.b) { }\n</style>\n";
        let src = source("App.vue", text);
        let (rewrites, edits) = normalize_text(&src, &BuildConfig::default());

        assert_eq!(rewrites.len(), 1);
        assert_eq!(rewrites[0].location.line, 3);
        assert!(edits.apply(text).contains("\n.a ::v-deep .b { }\n"));
        assert!(edits.apply(text).starts_with("<template><div/></template>"));
    }

    #[test]
    fn unsupported_files_yield_nothing() {
        let src = source("a.scss", ".a /deep/ .b {}");
        assert!(normalize_text(&src, &BuildConfig::default()).0.is_empty());
        let src = source("App.vue", "<style lang=\"scss\">.a /deep/ .b {}</style>");
        assert!(normalize_text(&src, &BuildConfig::default()).0.is_empty());
    }

    #[test]
    fn capture_mode_comes_from_config() {
        let src = source("a.css", ".a:deep(.b:not(.c) .d) {}");
        let balanced = normalize_text(&src, &BuildConfig::default()).0;
        assert_eq!(balanced[0].normalized, ".a::v-deep .b:not(.c) .d");

        let config = BuildConfig::default().with_capture(ArgumentCapture::FirstClose);
        let legacy = normalize_text(&src, &config).0;
        assert_eq!(legacy[0].normalized, ".a::v-deep .b:not(.c .d)");
    }

    #[test]
    fn write_mode_updates_files() {
        let dir = tempfile::tempdir().unwrap();
        let changed = dir.path().join("a.css");
        let clean = dir.path().join("b.css");
        fs::write(&changed, ".x /deep/ .y {}\n").unwrap();
        fs::write(&clean, ".z {}\n").unwrap();

        let files = vec![changed.clone(), clean.clone()];
        let result = run_normalizer(&files, &BuildConfig::default(), true);

        assert_eq!(result.file_count, 2);
        assert_eq!(result.written_count, 1);
        assert!(result.rewrites.iter().all(|r| r.applied));
        assert_eq!(fs::read_to_string(&changed).unwrap(), ".x ::v-deep .y {}\n");
        assert_eq!(fs::read_to_string(&clean).unwrap(), ".z {}\n");

        let again = run_normalizer(&files, &BuildConfig::default(), false);
        assert!(again.rewrites.is_empty());
    }

    #[test]
    fn check_mode_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.less");
        fs::write(&path, ".x :deep(.y) {}\n").unwrap();

        let result = run_normalizer(&[path.clone()], &BuildConfig::default(), false);

        assert_eq!(result.rewrites.len(), 1);
        assert!(!result.rewrites[0].applied);
        assert_eq!(result.written_count, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), ".x :deep(.y) {}\n");
    }

    #[test]
    fn unreadable_file_is_skipped() {
        let result = run_normalizer(
            &[PathBuf::from("/no/such/file.css")],
            &BuildConfig::default(),
            false,
        );
        assert!(result.rewrites.is_empty());
        assert_eq!(result.file_count, 1);
    }

    #[test]
    fn component_pipelines_per_block() {
        let config = BuildConfig::default();
        let cache = PipelineCache::new(&config);
        let text = "<style lang=\"less\" module>.card {}</style>\n<style scoped>.t {}</style>\n<style lang=\"scss\">.s {}</style>";
        let src = source("src/Card.vue", text);

        let pipelines = pipelines_for_source(&src, None, &cache);

        assert_eq!(pipelines.len(), 3);
        assert_eq!(
            pipelines[0].request(),
            "src/Card.vue?vue&type=style&index=0&lang=less&module"
        );
        assert_eq!(pipelines[0].pipeline.len(), 4);
        let scope = pipelines[0].pipeline.scope().unwrap();
        assert!(scope.module_mode);
        assert_eq!(scope.export_name.as_deref(), Some("$style"));
        assert!(scope.exports.contains_key("card"));

        assert_eq!(pipelines[1].pipeline.len(), 3);
        assert!(pipelines[2].pipeline.is_empty());
    }

    #[test]
    fn explicit_query_selects_block() {
        let config = BuildConfig::default();
        let cache = PipelineCache::new(&config);
        let text = "<style>.a {}</style><style module=\"m\">.b {}</style>";
        let src = source("X.vue", text);
        let query = Query::parse("vue&type=style&index=1&module=m");

        let pipelines = pipelines_for_source(&src, Some(&query), &cache);

        assert_eq!(pipelines.len(), 1);
        let scope = pipelines[0].pipeline.scope().unwrap();
        assert_eq!(scope.export_name.as_deref(), Some("m"));
        assert_eq!(scope.exports.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn run_pipelines_sorted_by_request() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.less"), ".b {}").unwrap();
        fs::write(dir.path().join("a.css"), ".a {}").unwrap();
        let files = vec![dir.path().join("b.less"), dir.path().join("a.css")];

        let config = BuildConfig::default();
        let cache = PipelineCache::new(&config);
        let pipelines = run_pipelines(&files, &cache);

        assert_eq!(pipelines.len(), 2);
        assert!(pipelines[0].path.ends_with("a.css"));
        assert!(!pipelines[0].pipeline.kinds().contains(&StageKind::PreprocessorStage));
        assert!(pipelines[1].pipeline.kinds().contains(&StageKind::PreprocessorStage));
    }
}
