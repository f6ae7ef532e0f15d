use std::io::Write;

use serde::Serialize;

use crate::formatter::Formatter;
use crate::report::Rewrite;
use crate::runner::FilePipeline;

pub struct JsonFormatter;

#[derive(Serialize)]
struct RewriteOutput<'r> {
    metadata: Metadata,
    rewrites: &'r [Rewrite],
}

#[derive(Serialize)]
struct Metadata {
    files_inspected: usize,
    rewrite_count: usize,
    applied_count: usize,
}

#[derive(Serialize)]
struct PipelineOutput<'p, 'a> {
    pipelines: &'p [FilePipeline<'a>],
}

fn write_json<T: Serialize>(value: &T, out: &mut dyn Write) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let _ = writeln!(out, "{json}");
        }
        Err(e) => log::error!("failed to serialize output: {e}"),
    }
}

impl Formatter for JsonFormatter {
    fn format_rewrites(&self, rewrites: &[Rewrite], file_count: usize, out: &mut dyn Write) {
        let output = RewriteOutput {
            metadata: Metadata {
                files_inspected: file_count,
                rewrite_count: rewrites.len(),
                applied_count: rewrites.iter().filter(|r| r.applied).count(),
            },
            rewrites,
        };
        write_json(&output, out);
    }

    fn format_pipelines(&self, pipelines: &[FilePipeline<'_>], out: &mut dyn Write) {
        write_json(&PipelineOutput { pipelines }, out);
    }
}
