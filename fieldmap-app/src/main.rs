use anyhow::{anyhow, bail, Context};
use fieldmap::{
    EngineConfig, HttpAnalysisSource, LatLng, LayerKind, LayerOrchestrator, PageDirection,
    SourceConfig,
};
use std::sync::Arc;
use std::time::Duration;

const USAGE: &str = "usage: fieldmap-app <base-url> <plot-id> [--layer KIND] [--back N] \
[--hover LAT,LNG] [--class LABEL] [--config FILE] [--timeout SECS]";

/// Loads one plot from the analysis service and prints the resulting map
/// snapshot as JSON.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fieldmap::init_logging();

    let args = Args::parse(std::env::args().skip(1))?;

    let config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .map_err(|e| anyhow!(e))
            .with_context(|| format!("loading {}", path))?,
        None => EngineConfig::default(),
    };
    let source = HttpAnalysisSource::new(SourceConfig::new(args.base_url.clone()));
    let mut orchestrator =
        LayerOrchestrator::new(Arc::new(source), config).map_err(|e| anyhow!(e))?;

    if let Some(kind) = args.layer {
        orchestrator.select_layer(kind);
    }
    orchestrator.select_plot(args.plot_id.clone());
    settle(&mut orchestrator, args.timeout).await?;

    for _ in 0..args.back {
        orchestrator.page_date(PageDirection::Backward);
        log::info!("paged back to {}", orchestrator.selection().current_end_date);
        settle(&mut orchestrator, args.timeout).await?;
    }

    if let Some(label) = &args.class {
        let percentage = orchestrator
            .snapshot()
            .legend
            .iter()
            .find(|row| row.label == label.as_str())
            .map(|row| f64::from(row.percentage))
            .ok_or_else(|| {
                anyhow!("{} has no class {}", orchestrator.selection().active_layer, label)
            })?;
        orchestrator.select_legend_class(label, percentage);
    }

    if let Some(point) = args.hover {
        orchestrator.hover_coordinate(Some(point));
    }

    let snapshot = serde_json::to_string_pretty(orchestrator.snapshot())?;
    println!("{}", snapshot);
    Ok(())
}

async fn settle(orchestrator: &mut LayerOrchestrator, timeout: Duration) -> anyhow::Result<()> {
    tokio::select! {
        _ = orchestrator.settle() => Ok(()),
        _ = tokio::time::sleep(timeout) => bail!("analysis service did not answer within {:?}", timeout),
        _ = tokio::signal::ctrl_c() => bail!("interrupted"),
    }
}

struct Args {
    base_url: String,
    plot_id: String,
    layer: Option<LayerKind>,
    back: u32,
    hover: Option<LatLng>,
    class: Option<String>,
    config: Option<String>,
    timeout: Duration,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> anyhow::Result<Self> {
        let mut positional = Vec::new();
        let mut parsed = Args {
            base_url: String::new(),
            plot_id: String::new(),
            layer: None,
            back: 0,
            hover: None,
            class: None,
            config: None,
            timeout: Duration::from_secs(60),
        };

        while let Some(arg) = args.next() {
            let mut value = || {
                args.next()
                    .with_context(|| format!("{} needs a value\n{}", arg, USAGE))
            };
            match arg.as_str() {
                "--layer" => parsed.layer = Some(value()?.parse()?),
                "--back" => parsed.back = value()?.parse().context("--back")?,
                "--hover" => {
                    parsed.hover = Some(LatLng::parse(&value()?).map_err(|e| anyhow!(e))?)
                }
                "--class" => parsed.class = Some(value()?),
                "--config" => parsed.config = Some(value()?),
                "--timeout" => {
                    parsed.timeout = Duration::from_secs(value()?.parse().context("--timeout")?)
                }
                "-h" | "--help" => {
                    println!("{}", USAGE);
                    std::process::exit(0);
                }
                _ if arg.starts_with("--") => bail!("unknown option {}\n{}", arg, USAGE),
                _ => positional.push(arg.clone()),
            }
        }

        match <[String; 2]>::try_from(positional) {
            Ok([base_url, plot_id]) => {
                parsed.base_url = base_url;
                parsed.plot_id = plot_id;
                Ok(parsed)
            }
            Err(_) => bail!("{}", USAGE),
        }
    }
}
