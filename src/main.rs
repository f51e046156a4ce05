use std::path::PathBuf;

use carrybook::{
    configuration::{RenderConfiguration, Settings},
    error::ContextError,
    extract::StepExtractor,
    pipeline,
    source::PopplerDocument,
    supabase::SupabaseClient,
};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArguments {
    /// JSON file with the fonts, the covers directory and the signature.
    #[arg(
        short = 'c',
        long = "configuration",
        value_name = "json_file",
        default_value = "configuration.json",
        global = true
    )]
    configuration_path: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the steps of a scanned tutorial and upload them.
    Extract {
        /// Directory holding `<carry_name>.pdf`.
        tutorial_directory: PathBuf,
        /// Name of the carry, e.g. giselles.
        carry_name: String,
    },
    /// Generate the social media post of a carry.
    Post {
        /// Directory where the images will be saved.
        output_directory: PathBuf,
        /// Name of the carry, e.g. giselles.
        carry_name: String,
    },
    /// Generate the book of every carry having a tutorial.
    Book {
        #[arg(long = "output-dir", default_value = ".")]
        output_directory: PathBuf,
        #[arg(long = "output-file", default_value = "book.pdf")]
        output_file: String,
    },
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    let settings = Settings::from_environment()?;

    match arguments.command {
        Command::Extract {
            tutorial_directory,
            carry_name,
        } => {
            let pdf_path = tutorial_directory.join(format!("{carry_name}.pdf"));
            let mut source = PopplerDocument::open(&pdf_path)?;
            let mut storage = SupabaseClient::new(settings.clone());
            let mut records = SupabaseClient::new(settings);
            let report = pipeline::publish_tutorial_steps(
                &mut source,
                &carry_name,
                &StepExtractor::default(),
                &mut storage,
                &mut records,
            )?;
            log::info!(
                "Extracted {} steps of {} ({} uploaded, {} skipped)",
                report.produced,
                carry_name,
                report.uploaded,
                report.skipped
            );
        }
        Command::Post {
            output_directory,
            carry_name,
        } => {
            let configuration = RenderConfiguration::from_path(&arguments.configuration_path)?;
            let client = SupabaseClient::new(settings);
            pipeline::generate_post(
                &output_directory,
                &carry_name,
                &configuration,
                &client,
                &client,
            )?;
        }
        Command::Book {
            output_directory,
            output_file,
        } => {
            let configuration = RenderConfiguration::from_path(&arguments.configuration_path)?;
            let client = SupabaseClient::new(settings);
            pipeline::generate_book(
                &output_directory,
                &output_file,
                &configuration,
                &client,
                &client,
            )?;
        }
    }

    Ok(())
}
