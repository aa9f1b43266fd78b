use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use docraster::config::Config;
use docraster::error::{EngineError, EngineResult};
use docraster::render::{RenderEngine, RenderedPage};
use docraster::search::HighlightBox;

#[derive(Debug, Parser)]
#[command(name = "docraster", about = "Document page rendering and search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Render one page to a PNG file.
    Render {
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        scale: Option<f32>,
        #[arg(long, default_value = "page.png")]
        out: PathBuf,
    },
    /// Render a low-resolution thumbnail to a PNG file.
    Thumbnail {
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value = "thumb.png")]
        out: PathBuf,
    },
    /// Search one page and print highlight boxes.
    Find {
        file: PathBuf,
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        scale: Option<f32>,
    },
    /// Print document metadata.
    Info { file: PathBuf },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    let config = Config::load()?;
    let engine = RenderEngine::with_default_backend(config);

    match cli.command {
        Command::Render {
            file,
            page,
            scale,
            out,
        } => {
            let scale = scale.unwrap_or(engine.config().render.default_scale);
            let doc = load_file(&engine, &file).await?;
            let rendered = engine.render_page(doc, page, scale).await?;
            write_png(&rendered, &out)?;
            println!("wrote {}", out.display());
        }
        Command::Thumbnail { file, page, out } => {
            let doc = load_file(&engine, &file).await?;
            let rendered = engine.thumbnail(doc, page).await?;
            write_png(&rendered, &out)?;
            println!("wrote {}", out.display());
        }
        Command::Find {
            file,
            query,
            page,
            scale,
        } => {
            let scale = scale.unwrap_or(1.0);
            let doc = load_file(&engine, &file).await?;
            let boxes = engine.search_page(doc, page, scale, &query).await?;
            if boxes.is_empty() {
                println!("no matches on page {page}");
            }
            for hit in boxes {
                print_highlight(page, &hit);
            }
        }
        Command::Info { file } => {
            let doc = load_file(&engine, &file).await?;
            let info = engine
                .document(doc)
                .ok_or(EngineError::DocumentNotFound(doc))?;
            println!("{}: {} pages (id {})", info.display_name, info.page_count, info.id);
        }
    }

    Ok(())
}

async fn load_file(
    engine: &RenderEngine,
    path: &Path,
) -> EngineResult<docraster::render::DocumentId> {
    let bytes = std::fs::read(path).map_err(|source| {
        EngineError::io_with_context(source, format!("failed to read {}", path.display()))
    })?;
    let display_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let info = engine.load_document(display_name, bytes).await?;
    Ok(info.id)
}

fn write_png(rendered: &RenderedPage, out: &Path) -> EngineResult<()> {
    let image = image::RgbaImage::from_raw(
        rendered.frame.width,
        rendered.frame.height,
        rendered.frame.pixels_to_vec(),
    )
    .ok_or_else(|| EngineError::invalid_argument("rendered frame has inconsistent dimensions"))?;

    image.save(out).map_err(|err| {
        EngineError::invalid_argument(format!("failed to write {}: {err}", out.display()))
    })
}

fn print_highlight(page: u32, hit: &HighlightBox) {
    println!(
        "page {page}: left={:.1} top={:.1} width={:.1} height={:.1}",
        hit.left, hit.top, hit.width, hit.height
    );
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn parses_render_with_defaults() {
        let cli = Cli::try_parse_from(["docraster", "render", "sample.pdf"])
            .expect("render args should parse");

        match cli.command {
            Command::Render {
                file, page, scale, ..
            } => {
                assert_eq!(file.to_string_lossy(), "sample.pdf");
                assert_eq!(page, 1);
                assert!(scale.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_find_with_query_and_page() {
        let cli = Cli::try_parse_from([
            "docraster",
            "find",
            "sample.pdf",
            "hello world",
            "--page",
            "3",
        ])
        .expect("find args should parse");

        match cli.command {
            Command::Find { query, page, .. } => {
                assert_eq!(query, "hello world");
                assert_eq!(page, 3);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_subcommand() {
        assert!(Cli::try_parse_from(["docraster"]).is_err());
    }
}
