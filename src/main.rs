use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};

use tofraw::batch;
use tofraw::container::scanner::{self, RecordHealth};
use tofraw::cursor::ByteCursor;
use tofraw::layout::{ConfidencePacking, LayoutVariant, OutputConfiguration, RgbConvention};
use tofraw::{logger, Config, FrameDecoder, FrameExporter, FrameMetadata, FrameRange, Palette, Recording};

#[derive(Parser)]
#[command(name = "tofraw", about = "Inspect and extract time-of-flight recordings")]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show container header, frame count and first-frame layout
    Info {
        input: PathBuf,
    },
    /// Walk every record, reporting unknown and truncated ones
    Scan {
        input: PathBuf,
        /// List every record
        #[arg(short, long)]
        records: bool,
    },
    /// Print frame metadata
    Metadata {
        input: PathBuf,
        /// Frames: N, N- or N-M
        #[arg(short, long, default_value = "0")]
        frames: FrameRange,
        #[arg(long)]
        json: bool,
    },
    /// Decode frames and write images, point clouds and metadata
    Extract {
        input: PathBuf,
        /// Output directory (default: input path without extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Frames: N, N- or N-M
        #[arg(short, long, default_value = "0-")]
        frames: FrameRange,
        /// JSON file with `decode` / `export` settings
        #[arg(long)]
        config: Option<PathBuf>,
        /// Plane set: depth-ab, depth-ab-confidence, depth-ab-xyz, depth-ab-confidence-xyz
        #[arg(long)]
        output_config: Option<String>,
        /// RGB placement: trailing or reported
        #[arg(long)]
        rgb_layout: Option<String>,
        /// Confidence packing: direct32 or split-halves
        #[arg(long)]
        conf_packing: Option<String>,
        /// WIDTHxHEIGHT for headerless recordings with zero-sized metadata
        #[arg(long)]
        fallback_size: Option<String>,
        /// Depth palette: turbo, jet, gray
        #[arg(long)]
        depth_palette: Option<String>,
        /// Logarithmic AB images
        #[arg(long)]
        log_ab: bool,
        #[arg(long)]
        no_rgb: bool,
        #[arg(long)]
        no_pointcloud: bool,
        /// Decode located frames concurrently (needs the `parallel` feature)
        #[arg(long)]
        parallel: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let rec = Recording::open(&input)?;
            let hdr = rec.header();
            let frames = rec.frame_count()?;

            println!("── ToF recording ────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Size           {} B", rec.len());
            println!("  Header         {}", if hdr.present { "present" } else { "absent (degraded extraction)" });
            println!("  Header size    {} B", hdr.header_size);
            println!("  First record   {}", hdr.first_record_offset);
            println!("  Frames         {frames}");

            if frames > 0 {
                let raw = rec.frame(0)?;
                let md = FrameMetadata::parse(&mut ByteCursor::new(raw.payload))?;
                let variant = LayoutVariant::defaults(&md, raw.location.revision);
                println!("  Revision       {:?}", raw.location.revision);
                println!("  Dimensions     {}x{}", md.width, md.height);
                println!("  Sensor class   {:?}", md.sensor_class());
                println!("  Imager mode    {}", md.imager_mode);
                println!("  Elapsed        {:.3} s", md.elapsed_time());
                println!("  Layout         {:?} / rgb {:?} / confidence {:?}",
                         variant.output, variant.rgb, variant.confidence);
            }
        }

        // ── Scan ─────────────────────────────────────────────────────────────
        Commands::Scan { input, records } => {
            let data = std::fs::read(&input)?;
            let report = scanner::scan(&data)?;
            println!("{}", report.summary());
            if records {
                for r in &report.record_log {
                    let size = r.size.map(|s| s.to_string()).unwrap_or_else(|| "-".into());
                    let health = match &r.health {
                        RecordHealth::Healthy { revision } => format!("frame {revision:?}"),
                        RecordHealth::UnknownMarker { marker } => format!("unknown marker {marker:#010x}"),
                        RecordHealth::TruncatedPayload { declared, available } => {
                            format!("truncated: {declared} B declared, {available} B left")
                        }
                        RecordHealth::TruncatedHeader { available } => {
                            format!("truncated header: {available} B left")
                        }
                    };
                    println!("  @{:<12} {:>10}  {}", r.offset, size, health);
                }
            }
        }

        // ── Metadata ─────────────────────────────────────────────────────────
        Commands::Metadata { input, frames, json } => {
            let rec = Recording::open(&input)?;
            let mut all = Vec::new();
            for (index, raw) in rec.frames().enumerate() {
                if frames.end.is_some_and(|end| index > end) {
                    break;
                }
                let raw = raw?;
                if !frames.contains(index) {
                    continue;
                }
                let md = FrameMetadata::parse(&mut ByteCursor::new(raw.payload))?;
                if json {
                    all.push(serde_json::json!({ "index": index, "revision": raw.location.revision, "metadata": md }));
                } else {
                    md.write_text(std::io::stdout().lock(), index)?;
                    println!();
                }
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&all)?);
            }
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract {
            input, output, frames, config, output_config, rgb_layout, conf_packing,
            fallback_size, depth_palette, log_ab, no_rgb, no_pointcloud, parallel,
        } => {
            let mut cfg = match config {
                Some(path) => Config::load(path)?,
                None => Config::default(),
            };
            if let Some(s) = output_config {
                cfg.decode.layout.output = Some(parse_output_config(&s)?);
            }
            if let Some(s) = rgb_layout {
                cfg.decode.layout.rgb = Some(parse_rgb_layout(&s)?);
            }
            if let Some(s) = conf_packing {
                cfg.decode.layout.confidence = Some(parse_conf_packing(&s)?);
            }
            if let Some(s) = fallback_size {
                cfg.decode.fallback_dimensions = Some(parse_size(&s)?);
            }
            if let Some(s) = depth_palette {
                cfg.export.depth_palette = Palette::from_name(&s).ok_or_else(|| format!("unknown palette '{s}'"))?;
            }
            cfg.export.log_ab |= log_ab;
            cfg.decode.convert_rgb &= !no_rgb;
            cfg.export.write_rgb &= !no_rgb;
            cfg.decode.point_cloud &= !no_pointcloud;
            cfg.export.write_point_cloud &= !no_pointcloud;

            let rec = Recording::open(&input)?;
            let out_dir = output.unwrap_or_else(|| default_output_dir(&input));
            let exporter = FrameExporter::new(&out_dir, FrameExporter::base_name_of(&input), cfg.export.clone());
            let decoder = FrameDecoder::new(cfg.decode.clone());

            let summary = if parallel {
                let (reports, summary) = batch::decode_parallel(&rec, &decoder, frames);
                for r in &reports {
                    exporter.export(r.index, &r.frame)?;
                }
                summary
            } else {
                batch::decode_each(&rec, &decoder, frames, |r| exporter.export(r.index, &r.frame).map(|_| ()))?
            };

            for outcome in summary.outcomes.iter().filter(|o| !o.skipped.is_empty()) {
                for (what, reason) in &outcome.skipped {
                    println!("  frame {:>5}: skipped {what}: {reason}", outcome.index);
                }
            }
            println!("{}", summary.summary());
            println!("Output: {}", out_dir.display());
            if let Some(err) = summary.aborted {
                return Err(err.into());
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn default_output_dir(input: &Path) -> PathBuf {
    input.with_extension("")
}

fn parse_output_config(s: &str) -> Result<OutputConfiguration, String> {
    match s {
        "depth-ab" => Ok(OutputConfiguration::DepthAb),
        "depth-ab-confidence" => Ok(OutputConfiguration::DepthAbConfidence),
        "depth-ab-xyz" => Ok(OutputConfiguration::DepthAbXyz),
        "depth-ab-confidence-xyz" => Ok(OutputConfiguration::DepthAbConfidenceXyz),
        _ => Err(format!("unknown output configuration '{s}'")),
    }
}

fn parse_rgb_layout(s: &str) -> Result<RgbConvention, String> {
    match s {
        "trailing" => Ok(RgbConvention::Trailing),
        "reported" => Ok(RgbConvention::Reported),
        _ => Err(format!("unknown rgb layout '{s}' (trailing, reported)")),
    }
}

fn parse_conf_packing(s: &str) -> Result<ConfidencePacking, String> {
    match s {
        "direct32" => Ok(ConfidencePacking::Direct32),
        "split-halves" => Ok(ConfidencePacking::SplitHalves),
        _ => Err(format!("unknown confidence packing '{s}' (direct32, split-halves)")),
    }
}

fn parse_size(s: &str) -> Result<(u16, u16), String> {
    let (w, h) = s.split_once(['x', 'X']).ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w = w.parse().map_err(|_| format!("bad width in '{s}'"))?;
    let h = h.parse().map_err(|_| format!("bad height in '{s}'"))?;
    Ok((w, h))
}
