use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tilestitch::{RenderConfig, StaticMap, StaticMapRenderer};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "tilestitch")]
#[command(about = "Renders one static map request to an image file", long_about = None)]
struct Args {
    /// Map request JSON (center, zoom, size, markers, lines)
    request: PathBuf,

    /// Output image path (format follows the extension, e.g. .png)
    output: PathBuf,

    /// Render config JSON (tile server, user agent, concurrency, deadline)
    #[arg(long)]
    config: Option<PathBuf>,

    /// TrueType/OpenType font used for marker labels
    #[arg(long)]
    font: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tilestitch::init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RenderConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RenderConfig::default(),
    };
    let map = StaticMap::from_file(&args.request)
        .with_context(|| format!("loading request {}", args.request.display()))?;

    let mut renderer = StaticMapRenderer::new(config)?;
    if let Some(path) = &args.font {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        renderer = renderer.with_font_bytes(bytes)?;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, abandoning render");
            on_interrupt.cancel();
        }
    });

    let result = renderer.render_with_cancel(&map, cancel).await?;
    result
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    let stats = &result.stats;
    println!(
        "wrote {} ({}x{}), {} tiles: {} fetched, {} cached, {} fallback",
        args.output.display(),
        result.width(),
        result.height(),
        stats.distinct_tiles,
        stats.fetched,
        stats.cache_hits,
        stats.fallbacks
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_positional_and_flags() {
        let args = Args::try_parse_from([
            "tilestitch",
            "tokyo.json",
            "tokyo.png",
            "--config",
            "render.json",
            "--font",
            "DejaVuSans.ttf",
        ])
        .unwrap();
        assert_eq!(args.request, PathBuf::from("tokyo.json"));
        assert_eq!(args.output, PathBuf::from("tokyo.png"));
        assert_eq!(args.config, Some(PathBuf::from("render.json")));
        assert_eq!(args.font, Some(PathBuf::from("DejaVuSans.ttf")));
    }

    #[test]
    fn test_optional_flags_default_to_none() {
        let args = Args::try_parse_from(["tilestitch", "map.json", "map.png"]).unwrap();
        assert!(args.config.is_none());
        assert!(args.font.is_none());
    }

    #[test]
    fn test_rejects_bad_invocations() {
        assert!(Args::try_parse_from(["tilestitch", "map.json"]).is_err());
        assert!(Args::try_parse_from(["tilestitch", "map.json", "map.png", "--zoom", "3"]).is_err());
        assert!(Args::try_parse_from(["tilestitch", "map.json", "map.png", "--font"]).is_err());
    }
}
