//! kindling - turn saved web articles into EPUB e-books

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use url::Url;

use kindling::{
    Delivery, DeliveryPayload, DirectoryDelivery, Error, FileFetcher, FileImages, Fetcher,
    Pipeline, PipelineConfig, Source, inspect_epub, save_epub,
};

#[derive(Parser)]
#[command(name = "kindling")]
#[command(version, about = "Turn saved web articles into EPUB e-books", long_about = None)]
#[command(after_help = "EXAMPLES:
    kindling page.html                                Write <title>.epub here
    kindling page.html --url https://example.com/a    Use the page's original address
    kindling page.html --print                        Show the extracted text
    kindling book.epub --check                        Report package problems")]
struct Cli {
    /// Saved HTML page (or an EPUB with --check)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file or directory [default: current directory]
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Address the page was saved from
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// JSON file with pipeline settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the article text instead of writing an EPUB
    #[arg(long, conflicts_with_all = ["json", "check"])]
    print: bool,

    /// Print the article as JSON instead of writing an EPUB
    #[arg(long, conflicts_with = "check")]
    json: bool,

    /// Inspect an existing EPUB and report problems
    #[arg(long)]
    check: bool,

    /// Log debug details
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = if cli.check {
        check(&cli.input)
    } else {
        convert(&cli)
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            if let Some(Error::Unsupported { .. } | Error::ExtractionFailed | Error::EmptyContent) =
                e.downcast_ref::<Error>()
            {
                eprintln!(
                    "hint: save the page from your browser (\"Save Page As...\", complete) \
                     and convert the saved file"
                );
            }
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let default = if cli.quiet {
        "error"
    } else if cli.verbose {
        "kindling=debug"
    } else {
        "kindling=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn load_config(path: Option<&Path>) -> CliResult<PipelineConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn convert(cli: &Cli) -> CliResult<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    let mut source = Source::file(&cli.input);
    if let Some(url) = &cli.url {
        source = source.with_origin(Url::parse(url)?);
    }

    let pipeline = Pipeline::new(config).with_images(Arc::new(FileImages));
    let raw = FileFetcher.fetch(&source)?;

    if cli.print || cli.json {
        let extracted = pipeline.process(&source, &raw)?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&extracted)?);
        } else {
            let article = &extracted.article;
            println!("{}", article.to_text());
            if let Some(url) = &article.source_url {
                println!("\nSource: {url}");
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let ebook = pipeline.extract(&source, &raw)?;
    let written = match &cli.output {
        Some(path) if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("epub")) => {
            save_epub(&ebook, path)?;
            path.clone()
        }
        Some(dir) => {
            let payload = DeliveryPayload::from_ebook(&ebook, &source.reference())?;
            DirectoryDelivery::new(dir).deliver(&payload)?
        }
        None => {
            let payload = DeliveryPayload::from_ebook(&ebook, &source.reference())?;
            DirectoryDelivery::new(".").deliver(&payload)?
        }
    };

    if !cli.quiet {
        println!("{} -> {}", ebook.metadata.title, written.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn check(path: &Path) -> CliResult<ExitCode> {
    let bytes = std::fs::read(path)?;
    let summary = inspect_epub(&bytes)?;

    println!("File: {}", path.display());
    println!("Title: {}", summary.title.as_deref().unwrap_or("-"));
    println!("Identifier: {}", summary.identifier.as_deref().unwrap_or("-"));
    println!("Language: {}", summary.language.as_deref().unwrap_or("-"));
    println!("Manifest items: {}", summary.manifest.len());
    println!("Spine items: {}", summary.spine.len());

    let problems = summary.problems();
    if problems.is_empty() {
        println!("No problems found");
        Ok(ExitCode::SUCCESS)
    } else {
        for problem in &problems {
            println!("problem: {problem}");
        }
        Ok(ExitCode::FAILURE)
    }
}
