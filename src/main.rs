use std::process;

use clap::Parser;

use stylechain::cli::Args;

fn main() {
    let args = Args::parse();
    init_logging(args.debug);
    match stylechain::run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(3);
        }
    }
}

/// `STYLECHAIN_LOG` wins over `--debug`; the default level is `warn`.
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(
        env_logger::Env::new()
            .filter_or("STYLECHAIN_LOG", default_level)
            .write_style("STYLECHAIN_LOG_STYLE"),
    )
    .format_timestamp(None)
    .init();
}
