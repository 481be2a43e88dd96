use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mathshot::{tempfiles, Renderer, RendererConfig};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mathshot", version, about = "Render prose with LaTeX formulas as text, PNG or PDF")]
struct Cli {
    /// JSON configuration file; `MATHSHOT_*` variables override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG applies otherwise
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Degrade math to Unicode and print message-sized chunks
    Text {
        /// Input file, stdin when omitted
        input: Option<PathBuf>,
    },
    /// Render a single PNG
    Image {
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Canvas width in pixels
        #[arg(long)]
        width: Option<u32>,
    },
    /// Render a paginated PDF
    Pdf {
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Heading on the first page; pass an empty string for none
        #[arg(long)]
        title: Option<String>,
    },
    /// Render one formula on a fixed preview canvas
    Preview {
        latex: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the formula spans found in the input as JSON lines
    Spans { input: Option<PathBuf> },
}

fn read_input(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display())),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RendererConfig> {
    let mut config = match path {
        Some(path) => RendererConfig::from_json_file(path)?,
        None => RendererConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

fn target(output: Option<PathBuf>, extension: &str) -> anyhow::Result<PathBuf> {
    match output {
        Some(path) => Ok(path),
        None => Ok(tempfiles::output_path(extension)?),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Text { input } => {
            let text = read_input(input.as_deref())?;
            let renderer = Renderer::new(config)?;
            let chunks = renderer.render_text(&text);
            for (i, chunk) in chunks.iter().enumerate() {
                if i > 0 {
                    writeln!(out, "\x0c")?;
                }
                writeln!(out, "{}", chunk)?;
            }
        }
        Command::Image { input, output, width } => {
            let text = read_input(input.as_deref())?;
            if let Some(width) = width {
                config.image.width = width;
            }
            let renderer = Renderer::new(config)?;
            let path = target(output, "png")?;
            if !renderer.render_image_file(&text, &path) {
                bail!("image rendering failed");
            }
            writeln!(out, "{}", path.display())?;
        }
        Command::Pdf { input, output, title } => {
            let text = read_input(input.as_deref())?;
            if let Some(title) = title {
                config.document.title = (!title.is_empty()).then_some(title);
            }
            let renderer = Renderer::new(config)?;
            let path = target(output, "pdf")?;
            if !renderer.render_document(&text, &path) {
                bail!("document rendering failed");
            }
            writeln!(out, "{}", path.display())?;
        }
        Command::Preview { latex, output } => {
            let renderer = Renderer::new(config)?;
            let path = target(output, "png")?;
            if !renderer.render_preview(&latex, &path) {
                bail!("preview rendering failed");
            }
            writeln!(out, "{}", path.display())?;
        }
        Command::Spans { input } => {
            let text = read_input(input.as_deref())?;
            for span in mathshot::extract(&text) {
                writeln!(out, "{}", serde_json::to_string(&span)?)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match cli.verbose {
        0 => {}
        1 => {
            logger.filter_level(log::LevelFilter::Info);
        }
        _ => {
            logger.filter_level(log::LevelFilter::Debug);
        }
    }
    logger.init();

    if let Err(e) = run(cli) {
        eprintln!("mathshot: {:#}", e);
        std::process::exit(1);
    }
}
