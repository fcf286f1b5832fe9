//! Command-line front end to the pass catalog and runner.

use anyhow::{anyhow, Result};
use log::debug;
use structopt::StructOpt;
use wasm_passes::pass::{Catalog, PassOptions, PassRunner};
use wasm_passes::Module;

#[derive(Debug, StructOpt)]
#[structopt(name = "wasm-passes", about = "Wasm pass runner.")]
struct Options {
    #[structopt(short, long)]
    debug: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    #[structopt(name = "list-passes", about = "List every registered pass")]
    ListPasses,
    #[structopt(name = "describe", about = "Show the description of a pass")]
    Describe {
        #[structopt(help = "Pass name")]
        name: String,
    },
    #[structopt(name = "pipeline", about = "Build a pipeline and run it over an empty module")]
    Pipeline {
        #[structopt(short = "O", long, default_value = "0", help = "Optimization level")]
        optimize_level: u32,
        #[structopt(short, long, default_value = "0", help = "Shrink level")]
        shrink_level: u32,
        #[structopt(long = "arg", parse(try_from_str = parse_argument), help = "Pass argument, as key=value")]
        arguments: Vec<(String, String)>,
        #[structopt(help = "Passes to run, in order")]
        passes: Vec<String>,
    },
}

fn parse_argument(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", s))?;
    Ok((key.to_owned(), value.to_owned()))
}

fn main() -> Result<()> {
    let opts = Options::from_args();

    let mut logger = env_logger::Builder::from_default_env();
    if opts.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    let _ = logger.try_init();

    let catalog = Catalog::builtin();
    match opts.command {
        Command::ListPasses => {
            for name in catalog.registered_names() {
                println!(
                    "  --{:<24} {}",
                    name,
                    catalog.pass_description(name).unwrap_or("")
                );
            }
        }
        Command::Describe { name } => {
            let description = catalog
                .pass_description(&name)
                .ok_or_else(|| anyhow!("Could not find pass: {}", name))?;
            println!("{}: {}", name, description);
        }
        Command::Pipeline {
            optimize_level,
            shrink_level,
            arguments,
            passes,
        } => {
            let mut options = PassOptions {
                optimize_level,
                shrink_level,
                ..PassOptions::default()
            };
            for (key, value) in &arguments {
                options.set_argument(key, value);
            }
            let mut runner = PassRunner::with_options(catalog, options);
            runner.set_debug(opts.debug);
            for name in &passes {
                runner.add(name)?;
            }
            debug!("Running {} passes", runner.len());
            let mut module = Module::empty();
            runner.run(&mut module)?;
        }
    }

    Ok(())
}
