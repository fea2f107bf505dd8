//! Headless generator: reads settings from the environment / `.env`,
//! writes one PNG, prints its path.

use tracing_subscriber::EnvFilter;

use thumbnail_generator_lib::{EXIT_MISSING_INPUT, is_missing_input, run};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(e) if is_missing_input(&e) => {
            tracing::error!("{e}. Set THUMBNAIL_SOURCE or choose THUMBNAIL_STYLE=text");
            std::process::exit(EXIT_MISSING_INPUT);
        }
        Err(e) => Err(e),
    }
}
