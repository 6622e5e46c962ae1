use anyhow::{Context, Result};
use opencv::{
    core::{Mat, Size},
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::path::{Path, PathBuf};

use super::{FrameSink, FrameSource, VideoBackend, VideoInfo};
use crate::render::{annotate::draw_overlay, FrameOverlay};

/// OpenCV (videoio / imgproc) による動画バックエンド
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCvBackend;

/// 動画ファイル入力
pub struct OpenCvSource {
    path: PathBuf,
    capture: VideoCapture,
    info: VideoInfo,
}

fn open_capture(path: &Path) -> Result<VideoCapture> {
    let path_str = path
        .to_str()
        .with_context(|| format!("Non UTF-8 video path: {}", path.display()))?;
    let capture = VideoCapture::from_file(path_str, videoio::CAP_ANY)
        .with_context(|| format!("Failed to open video {}", path.display()))?;
    if !capture.is_opened()? {
        anyhow::bail!("Video {} could not be opened", path.display());
    }
    Ok(capture)
}

impl OpenCvSource {
    pub fn open(path: &Path) -> Result<Self> {
        let capture = open_capture(path)?;

        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let frame_count = capture.get(videoio::CAP_PROP_FRAME_COUNT)?;
        if width == 0 || height == 0 {
            anyhow::bail!("Video {} has no decodable frames", path.display());
        }

        let info = VideoInfo {
            fps,
            width,
            height,
            frame_count: (frame_count > 0.0).then_some(frame_count as usize),
        };
        tracing::info!(
            "Video: {}x{} @ {:.2} FPS, {:?} frames",
            width,
            height,
            fps,
            info.frame_count
        );

        Ok(Self {
            path: path.to_path_buf(),
            capture,
            info,
        })
    }
}

impl FrameSource for OpenCvSource {
    type Frame = Mat;

    fn info(&self) -> VideoInfo {
        self.info
    }

    /// フレームを読み込む（BGR形式）
    fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .context("Failed to read frame")?;
        if !ok || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    /// シーク非対応のコンテナもあるので開き直す
    fn rewind(&mut self) -> Result<()> {
        self.capture.release()?;
        self.capture = open_capture(&self.path)?;
        Ok(())
    }
}

/// mp4v で書き出す動画ファイル
pub struct OpenCvSink {
    writer: VideoWriter,
}

impl FrameSink<Mat> for OpenCvSink {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        self.writer.write(frame).context("Failed to write frame")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.release()?;
        Ok(())
    }
}

impl VideoBackend for OpenCvBackend {
    type Frame = Mat;
    type Source = OpenCvSource;
    type Sink = OpenCvSink;

    fn open(&self, path: &Path) -> Result<OpenCvSource> {
        OpenCvSource::open(path)
    }

    fn create(&self, path: &Path, info: &VideoInfo) -> Result<OpenCvSink> {
        let path_str = path
            .to_str()
            .with_context(|| format!("Non UTF-8 output path: {}", path.display()))?;
        let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
        let writer = VideoWriter::new(
            path_str,
            fourcc,
            info.fps,
            Size::new(info.width as i32, info.height as i32),
            true,
        )
        .with_context(|| format!("Failed to create video writer {}", path.display()))?;
        if !writer.is_opened()? {
            anyhow::bail!("Video writer {} could not be opened", path.display());
        }
        Ok(OpenCvSink { writer })
    }

    fn annotate(&self, frame: &mut Mat, overlay: &FrameOverlay) -> Result<()> {
        draw_overlay(frame, overlay)
    }
}
