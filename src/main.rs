use clap::Parser;
use sheaf::pipeline::{Assembler, Destination};
use sheaf::PipelineError;
use serde_json::Value;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::PathBuf;

/// Generates a PDF from a JSON markup document.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// JSON document: an array whose first element is the metadata map
    input: PathBuf,

    /// Where the PDF is written
    output: PathBuf,

    /// Read the input as a stream of JSON forms (metadata map first) instead
    /// of a single array
    #[arg(long, default_value_t = false)]
    stream: bool,
}

fn main() -> Result<(), PipelineError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("sheaf=info")).init();

    let args = Args::parse();
    let assembler = Assembler::new();
    let destination = Destination::path(&args.output);

    let summary = if args.stream {
        let reader = BufReader::new(File::open(&args.input)?);
        assembler.build_from_reader(reader, destination)?
    } else {
        let document: Value = serde_json::from_str(&fs::read_to_string(&args.input)?)?;
        assembler.build(&document, destination)?
    };

    println!("Generated {} ({} pages)", args.output.display(), summary.pages);
    Ok(())
}
