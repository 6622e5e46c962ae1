use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use repform::analysis::{analyze_frame, analyze_sequence};
use repform::config::Config;
use repform::exercise::{resolve, supported_exercises};
use repform::logging;
use repform::pose::{KeypointIndex, Pose};

const CONFIG_PATH: &str = "config.toml";

#[derive(Parser)]
#[command(name = "repform", version = env!("GIT_VERSION"), about = "Rep counting and form scoring")]
struct Cli {
    /// 設定ファイル
    #[arg(long, default_value = CONFIG_PATH)]
    config: PathBuf,

    /// debug ログを出す
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 対応種目の一覧
    Exercises {
        #[arg(long)]
        json: bool,
    },
    /// 推定済みキーポイント列（JSON）からレップ数とフォームを評価する
    Score {
        #[arg(long)]
        keypoints: PathBuf,
        #[arg(long)]
        exercise: String,
    },
    /// 1フレーム分のキーポイント（JSON）を調べる: 関節角・スクワット局面・骨格線
    Frame {
        #[arg(long)]
        keypoints: PathBuf,
    },
}

/// 1フレーム分のキーポイント。`{x, y, confidence}` 17個か `[x, y, confidence]` 17行
#[derive(Deserialize)]
#[serde(untagged)]
enum FrameInput {
    Pose(Pose),
    Rows([[f32; 3]; KeypointIndex::COUNT]),
}

impl From<FrameInput> for Pose {
    fn from(frame: FrameInput) -> Self {
        match frame {
            FrameInput::Pose(pose) => pose,
            FrameInput::Rows(rows) => Pose::from_rows(&rows),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Exercises { json } => {
            let exercises = supported_exercises();
            if json {
                println!("{}", serde_json::to_string_pretty(&exercises)?);
            } else {
                for e in &exercises {
                    println!(
                        "{:<18} {:<18} {:<5} down > {:>5.1}  up < {:>5.1}",
                        e.id,
                        e.name,
                        e.category.name(),
                        e.down_threshold,
                        e.up_threshold
                    );
                }
            }
        }
        Command::Score { keypoints, exercise } => {
            let content = fs::read_to_string(&keypoints)
                .with_context(|| format!("Failed to read {}", keypoints.display()))?;
            let frames: Vec<FrameInput> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse keypoints {}", keypoints.display()))?;
            let poses: Vec<Pose> = frames.into_iter().map(Pose::from).collect();

            let profile = resolve(&exercise, config.analysis.default_exercise);
            let analysis = analyze_sequence(&profile, &poses, &config.analysis);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
        Command::Frame { keypoints } => {
            let content = fs::read_to_string(&keypoints)
                .with_context(|| format!("Failed to read {}", keypoints.display()))?;
            let frame: FrameInput = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse keypoints {}", keypoints.display()))?;
            let analysis = analyze_frame(&Pose::from(frame), config.analysis.visibility_threshold);
            println!("{}", serde_json::to_string_pretty(&analysis)?);
        }
    }

    Ok(())
}
