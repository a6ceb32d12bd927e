use clap::Parser;

use generate_metadata::args::Args;
use generate_metadata::generator::OpenAiGenerator;
use generate_metadata::processor::Processor;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    let config = args.into_config();

    // One generator and one processor for the whole run
    let generator = OpenAiGenerator::new(&config);
    let mut processor = Processor::new(config, generator);

    processor.run()?;

    Ok(())
}
