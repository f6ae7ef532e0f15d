pub mod cache;
pub mod cli;
pub mod compose;
pub mod config;
pub mod edit;
pub mod formatter;
pub mod fs;
pub mod parse;
pub mod report;
pub mod runner;
pub mod selector;

use std::io::{Read, Write};

use anyhow::{Context, Result};

use cache::PipelineCache;
use cli::Args;
use compose::Query;
use config::{LoadOptions, load_config};
use formatter::create_formatter;
use fs::discover_files;
use parse::source::SourceText;
use runner::{normalize_text, pipelines_for_source, run_normalizer, run_pipelines};

/// Run the tool. Returns the exit code: 0 = clean (or rewritten), 1 = deep
/// selectors left to normalize.
pub fn run(args: Args) -> Result<i32> {
    let target_dir = args.paths.first().map(|p| {
        if p.is_file() {
            p.parent().unwrap_or(p)
        } else {
            p.as_path()
        }
    });
    let options = LoadOptions {
        environment: args.env.clone(),
        defines: args.defines.clone(),
    };
    let config_start = std::time::Instant::now();
    let config = load_config(args.config.as_deref(), target_dir, &options)?;

    log::debug!("config loading total: {:.0?}", config_start.elapsed());
    match config.config_dir() {
        Some(dir) => log::debug!("config loaded from: {}", dir.display()),
        None => log::debug!("no config file found"),
    }
    log::debug!(
        "{} global variables, module policy `{}`",
        config.variables().len(),
        config.module_policy().name()
    );

    if args.print_config {
        let summary = serde_json::to_string_pretty(&config.summary())
            .context("failed to serialize config")?;
        println!("{summary}");
        return Ok(0);
    }

    let formatter = create_formatter(&args.format);

    // --stdin: process a single in-memory file
    if let Some(ref display_path) = args.stdin {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("failed to read stdin")?;
        let source = SourceText::from_string(display_path.clone(), input);

        if args.pipeline {
            let query = args.query.as_deref().map(Query::parse);
            let cache = PipelineCache::new(&config);
            formatter.print_pipelines(&pipelines_for_source(&source, query.as_ref(), &cache));
            return Ok(0);
        }

        let (rewrites, edits) = normalize_text(&source, &config);
        if args.write {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(edits.apply(source.as_str()).as_bytes())
                .context("failed to write stdout")?;
            return Ok(0);
        }
        formatter.print_rewrites(&rewrites, 1);
        return Ok(if rewrites.is_empty() { 0 } else { 1 });
    }

    let files = discover_files(&args.paths, &config)?;
    log::debug!("{} files to process", files.len());

    if args.list_target_files {
        for file in &files {
            println!("{}", file.display());
        }
        return Ok(0);
    }

    if args.pipeline {
        let cache = PipelineCache::new(&config);
        formatter.print_pipelines(&run_pipelines(&files, &cache));
        return Ok(0);
    }

    let result = run_normalizer(&files, &config, args.write);
    formatter.print_rewrites(&result.rewrites, result.file_count);
    if args.write {
        log::debug!("rewrote {} files", result.written_count);
    }

    if args.write || result.rewrites.is_empty() {
        Ok(0)
    } else {
        Ok(1)
    }
}
