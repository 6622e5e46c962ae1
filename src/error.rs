use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// 解析パイプラインのエラー
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// 登録されていない種目ID（通常はデフォルト種目へフォールバックされる）
    #[error("Unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("Cannot read video {}: {reason}", path.display())]
    Input { path: PathBuf, reason: String },

    #[error("Pose estimation failed at frame {frame}: {reason}")]
    Estimation { frame: usize, reason: String },

    #[error("Failed to write output video {}: {reason}", path.display())]
    Output { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// 圧縮失敗（致命的ではない。未圧縮ファイルをそのまま使う）
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Compression tool `{0}` not found")]
    Unavailable(String),

    #[error("Compression timed out after {0:?}")]
    Timeout(Duration),

    #[error("Compression exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Compression IO error: {0}")]
    Io(#[from] std::io::Error),
}
