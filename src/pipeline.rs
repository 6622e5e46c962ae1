//! Two-pass video analysis.
//!
//! Pass 1 estimates a pose per frame, counts reps and caches the keypoints.
//! Form analysis then runs over the cache. Pass 2 rewinds the source and
//! replays the cache (no re-estimation) to draw the annotated output, which is
//! finally handed to the compressor.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

use crate::analysis::{FormAnalyzer, FormQuality, FormReport, RepCounter, RepFormResult};
use crate::config::Config;
use crate::error::{AnalysisError, Result};
use crate::exercise::{resolve, ExerciseProfile};
use crate::pose::{KeypointIndex, Pose, PoseEstimator, PoseFrame};
use crate::render::{FrameOverlay, HudState};
use crate::video::{finalize_output, Compressor, FinalOutput, FrameSink, FrameSource, VideoBackend, VideoInfo};

/// 1本の動画の解析依頼
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub input: PathBuf,
    pub exercise: String,
    /// 未指定なら `output.dir` 以下に生成する
    pub output: Option<PathBuf>,
}

impl AnalysisRequest {
    pub fn new(input: impl Into<PathBuf>, exercise: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            exercise: exercise.into(),
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }
}

/// パス1で推定したキーポイント（パス2はこれを再生する）
#[derive(Debug, Clone, Default)]
pub struct KeypointCache {
    frames: Vec<PoseFrame>,
}

impl KeypointCache {
    pub fn push(&mut self, pose: Pose) {
        let index = self.frames.len();
        self.frames.push(PoseFrame { index, pose });
    }

    pub fn get(&self, index: usize) -> Option<&PoseFrame> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn poses(&self) -> Vec<Pose> {
        self.frames.iter().map(|f| f.pose).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoAnalysisResult {
    pub exercise: &'static str,
    pub exercise_name: &'static str,
    pub output_path: PathBuf,
    pub compressed: bool,
    pub frame_count: usize,
    pub fps: f64,
    pub duration: f64,
    pub total_reps: usize,
    pub rep_timestamps: Vec<usize>,
    pub angle_history: Vec<f32>,
    pub form_score: u32,
    pub form_quality: FormQuality,
    pub form_feedback: Vec<String>,
    pub rep_scores: Vec<f32>,
    pub rep_details: Vec<RepFormResult>,
    pub skipped_windows: usize,
}

/// 成功フラグ付きの結果。失敗時は結果を持たない
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<VideoAnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// パス1の結果
struct FirstPass {
    info: VideoInfo,
    cache: KeypointCache,
    counter: RepCounter,
}

/// 動画解析のオーケストレータ
///
/// コラボレータは呼び出し側が作って参照で渡す。
pub struct VideoAnalyzer<'a, B, E, C> {
    backend: &'a B,
    estimator: &'a mut E,
    compressor: Option<&'a C>,
    config: &'a Config,
}

impl<'a, B, E, C> VideoAnalyzer<'a, B, E, C>
where
    B: VideoBackend,
    E: PoseEstimator<B::Frame>,
    C: Compressor,
{
    pub fn new(backend: &'a B, estimator: &'a mut E, compressor: Option<&'a C>, config: &'a Config) -> Self {
        Self {
            backend,
            estimator,
            compressor,
            config,
        }
    }

    /// 解析を実行し、失敗も構造化して返す
    pub fn analyze(&mut self, request: &AnalysisRequest) -> AnalysisOutcome {
        match self.run(request) {
            Ok(result) => AnalysisOutcome {
                success: true,
                result: Some(result),
                error: None,
            },
            Err(e) => {
                error!("Error processing video {}: {}", request.input.display(), e);
                AnalysisOutcome {
                    success: false,
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn run(&mut self, request: &AnalysisRequest) -> Result<VideoAnalysisResult> {
        let profile = resolve(&request.exercise, self.config.analysis.default_exercise);
        info!(
            "Processing video {} ({}, tracking {})",
            request.input.display(),
            profile.display_name,
            profile.selector.label()
        );

        let input_error = |e: anyhow::Error| AnalysisError::Input {
            path: request.input.clone(),
            reason: format!("{:#}", e),
        };

        let mut source = self.backend.open(&request.input).map_err(input_error)?;
        let first = self.first_pass(&mut source, &profile, &request.input)?;
        let video = first.info;
        let rep_stats = first.counter.stats();
        info!("Detected {} reps at frames {:?}", rep_stats.total_reps, rep_stats.rep_timestamps);

        let analyzer = FormAnalyzer::from_config(profile.exercise, &self.config.analysis);
        let report = analyzer.analyze_video(&first.cache.poses(), &rep_stats.rep_timestamps);
        info!(
            "Form score: {}/100 ({}), feedback: {:?}",
            report.form_score,
            report.quality.name(),
            report.feedback
        );

        let raw_path = match &request.output {
            Some(path) => path.clone(),
            None => generated_output_path(&self.config.output.dir, &request.input, profile.id()),
        };
        if let Some(parent) = raw_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AnalysisError::Output {
                path: raw_path.clone(),
                reason: e.to_string(),
            })?;
        }

        source.rewind().map_err(input_error)?;
        let frame_count = match self.render_pass(&mut source, &first, &profile, &report, &request.input, &raw_path) {
            Ok(n) => n,
            Err(e) => {
                if raw_path.exists() {
                    let _ = fs::remove_file(&raw_path);
                }
                return Err(e);
            }
        };
        info!("Annotated video written: {} ({} frames)", raw_path.display(), frame_count);

        let output = match self.compressor {
            Some(compressor) if self.config.compression.enabled => finalize_output(&raw_path, compressor),
            _ => FinalOutput {
                path: raw_path,
                compressed: false,
            },
        };

        let duration = if video.fps > 0.0 {
            frame_count as f64 / video.fps
        } else {
            0.0
        };

        Ok(VideoAnalysisResult {
            exercise: profile.id(),
            exercise_name: profile.display_name,
            output_path: output.path,
            compressed: output.compressed,
            frame_count,
            fps: video.fps,
            duration,
            total_reps: rep_stats.total_reps,
            rep_timestamps: rep_stats.rep_timestamps,
            angle_history: rep_stats.angle_history,
            form_score: report.form_score,
            form_quality: report.quality,
            form_feedback: report.feedback,
            rep_scores: report.rep_scores,
            rep_details: report.rep_details,
            skipped_windows: report.skipped_windows,
        })
    }

    /// 全フレームの姿勢を推定し、カウントしながらキャッシュする
    fn first_pass(
        &mut self,
        source: &mut B::Source,
        profile: &ExerciseProfile,
        input: &Path,
    ) -> Result<FirstPass> {
        let info = source.info();
        let interval = self.config.analysis.progress_interval.max(1);
        let threshold = self.config.analysis.visibility_threshold;
        let mut cache = KeypointCache::default();
        let mut counter = RepCounter::from_profile(profile);

        while let Some(frame) = source.read().map_err(|e| AnalysisError::Input {
            path: input.to_path_buf(),
            reason: format!("{:#}", e),
        })? {
            let index = cache.len();
            let pose = self
                .estimator
                .estimate(&frame)
                .map_err(|e| AnalysisError::Estimation {
                    frame: index,
                    reason: format!("{:#}", e),
                })?;
            debug!(
                "Frame {}: visible keypoints (>{}): {}/{}, avg score {:.3}",
                index,
                threshold,
                pose.visible_count(threshold),
                KeypointIndex::COUNT,
                pose.average_confidence()
            );

            let angle = profile.selector.measure(&pose);
            if counter.update(angle, index) {
                info!("Rep {} completed at frame {}", counter.count(), index);
            }
            cache.push(pose);

            if (index + 1) % interval == 0 {
                match info.frame_count {
                    Some(total) => debug!("Pass 1: {}/{} frames", index + 1, total),
                    None => debug!("Pass 1: {} frames", index + 1),
                }
            }
        }

        if cache.is_empty() {
            return Err(AnalysisError::Input {
                path: input.to_path_buf(),
                reason: "no decodable frames".to_string(),
            });
        }

        Ok(FirstPass { info, cache, counter })
    }

    /// キャッシュを再生して注釈付き動画を書き出す。書いたフレーム数を返す
    fn render_pass(
        &self,
        source: &mut B::Source,
        first: &FirstPass,
        profile: &ExerciseProfile,
        report: &FormReport,
        input: &Path,
        output: &Path,
    ) -> Result<usize> {
        let video = &first.info;
        let cache = &first.cache;
        let output_error = |e: anyhow::Error| AnalysisError::Output {
            path: output.to_path_buf(),
            reason: format!("{:#}", e),
        };

        let mut sink = self.backend.create(output, video).map_err(output_error)?;
        let mut counter = RepCounter::from_profile(profile);
        let interval = self.config.analysis.progress_interval.max(1);
        let threshold = self.config.analysis.visibility_threshold;
        let mut written = 0;

        while let Some(cached) = cache.get(written) {
            let mut frame = match source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!(
                        "Source ended after {} frames on replay, expected {}",
                        written,
                        cache.len()
                    );
                    break;
                }
                Err(e) => {
                    let _ = sink.finish();
                    return Err(AnalysisError::Input {
                        path: input.to_path_buf(),
                        reason: format!("{:#}", e),
                    });
                }
            };

            let angle = profile.selector.measure(&cached.pose);
            let rep_completed = counter.update(angle, cached.index);
            let form = counter.count().checked_sub(1).and_then(|rep| report.for_rep(rep));
            let hud = HudState {
                rep_count: counter.count(),
                angle,
                state: counter.state(),
                form,
                rep_completed,
            };
            let overlay = FrameOverlay::build(&cached.pose, video.width, video.height, &hud, threshold);

            let drawn = self
                .backend
                .annotate(&mut frame, &overlay)
                .and_then(|_| sink.write(&frame));
            if let Err(e) = drawn {
                let _ = sink.finish();
                return Err(output_error(e));
            }

            written += 1;
            if written % interval == 0 {
                debug!("Pass 2: {}/{} frames", written, cache.len());
            }
        }

        sink.finish().map_err(output_error)?;
        Ok(written)
    }
}

/// `<dir>/<入力名>_<種目>_<unix ミリ秒>.mp4`
pub fn generated_output_path(dir: &Path, input: &Path, exercise: &str) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("video");
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    dir.join(format!("{}_{}_{}.mp4", stem, exercise, millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_output_path() {
        let path = generated_output_path(Path::new("/tmp/out"), Path::new("/videos/set1.mov"), "squats");
        assert_eq!(path.parent(), Some(Path::new("/tmp/out")));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("set1_squats_"));
        assert!(name.ends_with(".mp4"));
    }

    #[test]
    fn test_cache_indices_follow_push_order() {
        let mut cache = KeypointCache::default();
        assert!(cache.is_empty());
        cache.push(Pose::default());
        cache.push(Pose::default());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1).unwrap().index, 1);
        assert!(cache.get(2).is_none());
        assert_eq!(cache.poses().len(), 2);
    }
}
