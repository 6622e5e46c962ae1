//! Analyze one exercise video: count reps, score form, and write an
//! annotated (and, when ffmpeg is available, compressed) copy.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use repform::config::Config;
use repform::logging;
use repform::pose::MoveNetDetector;
use repform::video::{FfmpegCompressor, OpenCvBackend};
use repform::{AnalysisRequest, VideoAnalyzer};

#[derive(Parser)]
#[command(name = "analyze_video", version = env!("GIT_VERSION"))]
struct Args {
    /// 入力動画
    #[arg(long)]
    input: PathBuf,

    /// 種目ID (例: squats, push-ups)
    #[arg(long, default_value = "squats")]
    exercise: String,

    /// 出力先（省略時は設定の output.dir に生成）
    #[arg(long)]
    output: Option<PathBuf>,

    /// MoveNet ONNX モデル（省略時は設定の model.path）
    #[arg(long)]
    model: Option<PathBuf>,

    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// ffmpeg による圧縮をしない
    #[arg(long)]
    no_compress: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut config = Config::load_or_default(&args.config);
    if args.no_compress {
        config.compression.enabled = false;
    }
    let model_path = args.model.unwrap_or_else(|| config.model.path.clone());

    let backend = OpenCvBackend;
    let mut detector = MoveNetDetector::new(&model_path)?;
    let compressor = FfmpegCompressor::new(&config.compression);

    let mut request = AnalysisRequest::new(&args.input, &args.exercise);
    if let Some(output) = args.output {
        request = request.with_output(output);
    }

    let mut analyzer = VideoAnalyzer::new(&backend, &mut detector, Some(&compressor), &config);
    let outcome = analyzer.analyze(&request);
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
