mod cli;
mod panels;
mod render_thread;
mod run;
mod settings;

use anyhow::Result;

fn main() -> Result<()> {
    let args = cli::parse();
    run::initialise_tracing();
    run::run(args)
}
