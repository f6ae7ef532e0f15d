pub mod json;
pub mod text;

use std::io::Write;

use crate::report::Rewrite;
use crate::runner::FilePipeline;

pub trait Formatter {
    fn format_rewrites(&self, rewrites: &[Rewrite], file_count: usize, out: &mut dyn Write);

    fn format_pipelines(&self, pipelines: &[FilePipeline<'_>], out: &mut dyn Write);

    fn print_rewrites(&self, rewrites: &[Rewrite], file_count: usize) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.format_rewrites(rewrites, file_count, &mut lock);
    }

    fn print_pipelines(&self, pipelines: &[FilePipeline<'_>]) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        self.format_pipelines(pipelines, &mut lock);
    }
}

pub fn create_formatter(format: &str) -> Box<dyn Formatter> {
    match format {
        "json" => Box::new(json::JsonFormatter),
        // "text" and any unknown value
        _ => Box::new(text::TextFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Location;

    fn sample_rewrites() -> Vec<Rewrite> {
        vec![Rewrite {
            path: "a.css".to_string(),
            location: Location { line: 1, column: 0 },
            original: ".a /deep/ .b".to_string(),
            normalized: ".a ::v-deep .b".to_string(),
            applied: false,
        }]
    }

    #[test]
    fn all_formatters_run_without_panic() {
        let rewrites = sample_rewrites();
        for name in ["text", "json", "anything_else"] {
            let f = create_formatter(name);
            let mut buf = Vec::new();
            f.format_rewrites(&[], 0, &mut buf);
            f.format_rewrites(&rewrites, 1, &mut buf);
            f.format_pipelines(&[], &mut buf);
        }
    }

    #[test]
    fn unknown_format_falls_back_to_text() {
        let mut buf = Vec::new();
        create_formatter("nope").format_rewrites(&sample_rewrites(), 1, &mut buf);
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("a.css:1:0: "));
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        fn rewrite_strategy() -> impl Strategy<Value = Rewrite> {
            (
                "[a-z]{1,10}\\.(css|less|vue)",
                1usize..500,
                0usize..200,
                "\\.[a-z]{1,8} /deep/ \\.[a-z]{1,8}",
                any::<bool>(),
            )
                .prop_map(|(path, line, column, original, applied)| {
                    let normalized = original.replace("/deep/", "::v-deep");
                    Rewrite {
                        path,
                        location: Location { line, column },
                        original,
                        normalized,
                        applied,
                    }
                })
        }

        proptest! {
            #[test]
            fn json_output_is_valid_json(
                rewrites in prop::collection::vec(rewrite_strategy(), 0..10),
                file_count in 0usize..100,
            ) {
                let mut buf = Vec::new();
                create_formatter("json").format_rewrites(&rewrites, file_count, &mut buf);
                let parsed: serde_json::Value =
                    serde_json::from_slice(&buf).unwrap();
                prop_assert_eq!(
                    parsed["metadata"]["rewrite_count"].as_u64().unwrap() as usize,
                    rewrites.len()
                );
                prop_assert_eq!(
                    parsed["rewrites"].as_array().unwrap().len(),
                    rewrites.len()
                );
            }

            #[test]
            fn text_prints_one_line_per_rewrite(
                rewrites in prop::collection::vec(rewrite_strategy(), 0..10),
                file_count in 0usize..100,
            ) {
                let mut buf = Vec::new();
                create_formatter("text").format_rewrites(&rewrites, file_count, &mut buf);
                let out = String::from_utf8(buf).unwrap();
                let listed = out.lines().filter(|l| l.contains(" -> ")).count();
                prop_assert_eq!(listed, rewrites.len());
                let file_word = if file_count == 1 { "file" } else { "files" };
                let expected = format!("{file_count} {file_word} inspected");
                prop_assert!(out.contains(&expected));
            }
        }
    }
}
