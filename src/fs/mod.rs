use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;

use crate::config::BuildConfig;

/// Extensions picked up when walking a directory: the two stylesheet
/// families with a stage chain, plus components whose `<style>` blocks are
/// split out later by `parse::sfc`.
pub const STYLE_EXTENSIONS: &[&str] = &["css", "less", "vue"];

/// Discover stylesheet and component files from the given paths, respecting
/// .gitignore and the config's `exclude` patterns.
pub fn discover_files(paths: &[PathBuf], config: &BuildConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            // Direct file paths bypass extension filtering
            files.push(path.clone());
        } else if path.is_dir() {
            files.extend(walk_directory(path, config)?);
        } else {
            anyhow::bail!("path does not exist: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Walk `dir` for stylesheets and components. A `.vue` file is kept whole
/// here even if none of its blocks turn out to be css or less.
fn walk_directory(dir: &Path, config: &BuildConfig) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(dir);
    builder.hidden(true).git_ignore(true).git_global(true);

    let excludes = config.excludes();
    if !excludes.is_empty() {
        let mut overrides = OverrideBuilder::new(dir);
        for pattern in excludes {
            // ignore crate overrides: prefix with ! to exclude
            overrides
                .add(&format!("!{pattern}"))
                .with_context(|| format!("invalid exclude pattern: {pattern}"))?;
        }
        let overrides = overrides.build().context("failed to build overrides")?;
        builder.overrides(overrides);
    }

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = entry.context("error walking directory")?;
        let path = entry.path();
        if path.is_file() && has_style_extension(path) {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn has_style_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            STYLE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoadOptions, load_config};
    use std::fs;

    fn config_for(dir: &Path) -> BuildConfig {
        load_config(None, Some(dir), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn discovers_style_files_in_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.css"), "").unwrap();
        fs::write(dir.path().join("b.less"), "").unwrap();
        fs::write(dir.path().join("App.vue"), "").unwrap();
        fs::write(dir.path().join("main.js"), "").unwrap();

        let files = discover_files(&[dir.path().to_path_buf()], &config_for(dir.path())).unwrap();

        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| has_style_extension(f)));
    }

    #[test]
    fn direct_file_bypasses_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("theme.pcss");
        fs::write(&file, ".a {}").unwrap();

        let files = discover_files(&[file.clone()], &BuildConfig::default()).unwrap();

        assert_eq!(files, vec![file]);
    }

    #[test]
    fn nonexistent_path_errors() {
        let result = discover_files(&[PathBuf::from("/no/such/path")], &BuildConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn results_are_sorted_and_deduped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("z.css"), "").unwrap();
        fs::write(dir.path().join("a.css"), "").unwrap();
        fs::write(dir.path().join("m.less"), "").unwrap();

        let root = dir.path().to_path_buf();
        let files = discover_files(&[root.clone(), root], &BuildConfig::default()).unwrap();

        assert_eq!(files.len(), 3);
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn excludes_from_config_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("dist/app.css"), "").unwrap();
        fs::write(dir.path().join("src/app.css"), "").unwrap();
        fs::write(dir.path().join(".stylechain.yml"), "exclude:\n  - \"dist/**\"\n").unwrap();

        let files = discover_files(&[dir.path().to_path_buf()], &config_for(dir.path())).unwrap();

        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("src/app.css"));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_style_extension(Path::new("A.CSS")));
        assert!(has_style_extension(Path::new("b.Less")));
        assert!(!has_style_extension(Path::new("c.scss")));
        assert!(!has_style_extension(Path::new("Makefile")));
    }
}
