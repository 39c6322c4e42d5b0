use clap::Parser;
use dtspack::cli::CliArgs;
use dtspack::tracing_config::init_tracing;

fn main() {
    init_tracing();
    let args = CliArgs::parse();

    match dtspack::cli::run(&args) {
        Ok(summary) => {
            if !summary.written.is_empty() {
                eprintln!("wrote {} declaration bundle(s)", summary.written.len());
            }
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}
