use std::io::Write;

use crate::compose::stage::Stage;
use crate::formatter::Formatter;
use crate::report::Rewrite;
use crate::runner::FilePipeline;

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_rewrites(&self, rewrites: &[Rewrite], file_count: usize, out: &mut dyn Write) {
        for r in rewrites {
            let _ = writeln!(out, "{r}");
        }
        let applied = rewrites.iter().filter(|r| r.applied).count();
        let selector_word = if rewrites.len() == 1 {
            "selector"
        } else {
            "selectors"
        };
        let file_word = if file_count == 1 { "file" } else { "files" };
        let _ = write!(
            out,
            "\n{file_count} {file_word} inspected, {} deep {selector_word} found",
            rewrites.len(),
        );
        if applied > 0 {
            let _ = write!(out, ", {applied} rewritten");
        }
        let _ = writeln!(out);
    }

    fn format_pipelines(&self, pipelines: &[FilePipeline<'_>], out: &mut dyn Write) {
        for p in pipelines {
            let _ = writeln!(out, "{}", p.request());
            if p.pipeline.is_empty() {
                let _ = writeln!(out, "  (no style stages)");
                continue;
            }
            for (i, stage) in p.pipeline.stages().iter().enumerate() {
                let _ = writeln!(out, "  {}. {stage}", i + 1);
                // Show the declarations the preprocessor prepends.
                if let Stage::Preprocessor(opts) = stage {
                    for line in opts.global_vars.to_less_prelude().lines() {
                        let _ = writeln!(out, "       {line}");
                    }
                }
            }
        }
    }
}
