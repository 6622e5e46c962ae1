//! Weighted rule engine that grades each rep window against its exercise's
//! form checks, then aggregates the per-rep grades into a video report.

use serde::Serialize;
use tracing::{debug, trace};

use super::stats::WindowStats;
use crate::config::AnalysisConfig;
use crate::exercise::{AngleTarget, Exercise, FormCheck, FormRuleSet, Phase};
use crate::pose::{AngleVector, Pose};

pub const NO_REPS_FEEDBACK: &str = "Video too short or no reps detected";
pub const ALL_GOOD_FEEDBACK: &str = "Excellent form! Keep it up!";

/// 1チェックの評価段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Acceptable,
    Poor,
}

/// 動画全体（またはレップ）のフォーム評価
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormQuality {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl FormQuality {
    /// 0-100 のスコアから段階を決める
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => FormQuality::Excellent,
            75..=89 => FormQuality::Good,
            60..=74 => FormQuality::Acceptable,
            _ => FormQuality::Poor,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FormQuality::Excellent => "excellent",
            FormQuality::Good => "good",
            FormQuality::Acceptable => "acceptable",
            FormQuality::Poor => "poor",
        }
    }
}

/// 0.0-1.0 を 0-100 に丸める
pub fn to_percent(score: f32) -> u32 {
    (score * 100.0).round().clamp(0.0, 100.0) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub description: &'static str,
    pub value: f32,
    pub score: f32,
    pub quality: Quality,
    pub feedback: &'static str,
}

/// 1レップ分の評価
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepFormResult {
    /// Σ(weight × score)
    pub rep_score: f32,
    pub checks: Vec<CheckResult>,
}

impl RepFormResult {
    /// オーバーレイ表示用。全体スコアと違い切り捨て
    pub fn percent(&self) -> u32 {
        (self.rep_score * 100.0).clamp(0.0, 100.0) as u32
    }

    /// good 以外のチェックをスコアの低い順に最大 `limit` 件
    pub fn worst_issues(&self, limit: usize) -> Vec<&CheckResult> {
        let mut issues: Vec<&CheckResult> = self
            .checks
            .iter()
            .filter(|c| c.quality != Quality::Good)
            .collect();
        issues.sort_by(|a, b| a.score.total_cmp(&b.score));
        issues.truncate(limit);
        issues
    }
}

/// 動画全体のフォーム評価
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormReport {
    pub form_score: u32,
    pub quality: FormQuality,
    pub feedback: Vec<String>,
    pub rep_scores: Vec<f32>,
    pub rep_details: Vec<RepFormResult>,
    /// レップ窓番号 → `rep_details` の添字（短すぎて捨てた窓は None）
    #[serde(skip)]
    pub window_index: Vec<Option<usize>>,
    pub skipped_windows: usize,
}

impl FormReport {
    fn empty(skipped_windows: usize, window_count: usize) -> Self {
        Self {
            form_score: 0,
            quality: FormQuality::Poor,
            feedback: vec![NO_REPS_FEEDBACK.to_string()],
            rep_scores: Vec::new(),
            rep_details: Vec::new(),
            window_index: vec![None; window_count],
            skipped_windows,
        }
    }

    /// `rep` 番目（0始まり）のレップの評価。捨てた窓なら None
    pub fn for_rep(&self, rep: usize) -> Option<&RepFormResult> {
        let detail = (*self.window_index.get(rep)?)?;
        self.rep_details.get(detail)
    }

    pub fn analyzed_reps(&self) -> usize {
        self.rep_details.len()
    }
}

/// 種目ごとのフォーム解析器（呼び出し間で状態を持たない）
#[derive(Debug, Clone)]
pub struct FormAnalyzer {
    rules: FormRuleSet,
    min_window_frames: usize,
    feedback_ratio: f32,
}

impl FormAnalyzer {
    pub fn new(exercise: Exercise) -> Self {
        Self::with_rules(FormRuleSet::for_exercise(exercise))
    }

    pub fn with_rules(rules: FormRuleSet) -> Self {
        Self {
            rules,
            min_window_frames: 5,
            feedback_ratio: 0.3,
        }
    }

    pub fn from_config(exercise: Exercise, config: &AnalysisConfig) -> Self {
        Self::new(exercise)
            .with_min_window(config.min_window_frames)
            .with_feedback_ratio(config.feedback_ratio)
    }

    pub fn with_min_window(mut self, frames: usize) -> Self {
        self.min_window_frames = frames;
        self
    }

    pub fn with_feedback_ratio(mut self, ratio: f32) -> Self {
        self.feedback_ratio = ratio;
        self
    }

    /// 1レップ窓を評価する。空なら None
    pub fn analyze_rep(&self, frames: &[Pose]) -> Option<RepFormResult> {
        let angles: Vec<AngleVector> = frames.iter().map(AngleVector::from_pose).collect();
        let stats = WindowStats::from_angles(&angles)?;

        let checks: Vec<CheckResult> = self
            .rules
            .checks
            .iter()
            .map(|check| apply_check(check, &stats))
            .collect();
        let rep_score = self
            .rules
            .checks
            .iter()
            .zip(&checks)
            .map(|(check, result)| check.weight * result.score)
            .sum();

        Some(RepFormResult { rep_score, checks })
    }

    /// レップ境界で窓に分けて全体を評価する
    ///
    /// 窓は (前の境界, 境界] で、最初の窓は 0 から。境界が無ければ全体を1窓とする。
    pub fn analyze_video(&self, frames: &[Pose], boundaries: &[usize]) -> FormReport {
        let windows = split_windows(frames.len(), boundaries);

        let mut rep_details = Vec::new();
        let mut window_index = Vec::with_capacity(windows.len());
        let mut skipped = 0;

        for (i, &(start, end)) in windows.iter().enumerate() {
            let window = &frames[start..end];
            if window.len() < self.min_window_frames {
                debug!("Rep window {} too short ({} frames), skipped", i, window.len());
                skipped += 1;
                window_index.push(None);
                continue;
            }
            match self.analyze_rep(window) {
                Some(result) => {
                    window_index.push(Some(rep_details.len()));
                    rep_details.push(result);
                }
                None => {
                    skipped += 1;
                    window_index.push(None);
                }
            }
        }

        if rep_details.is_empty() {
            return FormReport::empty(skipped, window_index.len());
        }

        let rep_scores: Vec<f32> = rep_details.iter().map(|r| r.rep_score).collect();
        let mean = rep_scores.iter().sum::<f32>() / rep_scores.len() as f32;
        let form_score = to_percent(mean);

        FormReport {
            form_score,
            quality: FormQuality::from_score(form_score),
            feedback: self.aggregate_feedback(&rep_details),
            rep_scores,
            rep_details,
            window_index,
            skipped_windows: skipped,
        }
    }

    /// 崩れたレップの割合が `feedback_ratio` を超えたチェックだけを出現順に並べる
    fn aggregate_feedback(&self, reps: &[RepFormResult]) -> Vec<String> {
        // (チェック名, 回数, 最初に出たメッセージ)
        let mut violations: Vec<(&str, usize, &str)> = Vec::new();
        for rep in reps {
            for check in rep.checks.iter().filter(|c| c.quality != Quality::Good) {
                match violations.iter_mut().find(|(name, _, _)| *name == check.name) {
                    Some(entry) => entry.1 += 1,
                    None => violations.push((check.name, 1, check.feedback)),
                }
            }
        }

        let total = reps.len();
        let feedback: Vec<String> = violations
            .into_iter()
            .filter(|&(_, count, _)| count as f32 / total as f32 > self.feedback_ratio)
            .map(|(_, count, message)| format!("{} ({}/{} reps)", message, count, total))
            .collect();

        if feedback.is_empty() {
            vec![ALL_GOOD_FEEDBACK.to_string()]
        } else {
            feedback
        }
    }
}

/// 境界列から半開区間 [start, end) の窓列を作る
fn split_windows(len: usize, boundaries: &[usize]) -> Vec<(usize, usize)> {
    if len == 0 {
        return Vec::new();
    }
    if boundaries.is_empty() {
        return vec![(0, len)];
    }

    let mut windows = Vec::with_capacity(boundaries.len());
    let mut start = 0;
    for &boundary in boundaries {
        let end = (boundary + 1).min(len);
        windows.push((start, end.max(start)));
        start = end.max(start);
    }
    windows
}

/// チェック対象の統計値を取り出す
fn check_value(check: &FormCheck, stats: &WindowStats) -> f32 {
    match check.target {
        AngleTarget::Joint(joint) => {
            let (left, right) = joint.pair();
            let (l, r) = (stats.angle(left), stats.angle(right));
            match check.phase {
                Phase::Symmetry => stats.symmetry(joint),
                Phase::Range | Phase::Mean => (l.mean + r.mean) / 2.0,
                Phase::Min => (l.min + r.min) / 2.0,
                Phase::Max => (l.max + r.max) / 2.0,
            }
        }
        AngleTarget::Single(joint_angle) => {
            let s = stats.angle(joint_angle);
            match check.phase {
                // 片側だけの対象に左右差は無い
                Phase::Symmetry => 0.0,
                Phase::Range | Phase::Mean => s.mean,
                Phase::Min => s.min,
                Phase::Max => s.max,
            }
        }
    }
}

pub fn apply_check(check: &FormCheck, stats: &WindowStats) -> CheckResult {
    let value = check_value(check, stats);
    let (score, quality) = score_value(check, value);
    trace!(
        "{} ({} {:?}): {:.1} -> {:.2} {:?}",
        check.name,
        check.target.name(),
        check.phase,
        value,
        score,
        quality
    );
    let feedback = match quality {
        Quality::Good => check.feedback.good,
        Quality::Acceptable => check.feedback.acceptable,
        Quality::Poor => check.feedback.poor,
    };

    CheckResult {
        name: check.name,
        description: check.description,
        value,
        score,
        quality,
        feedback,
    }
}

/// 値を採点する
///
/// ideal 内は 1.0、acceptable 内は近い ideal 境界への近さで 0.7-1.0、
/// それ以外は 0.3 を上限に 0 へ向かって縮む。
pub fn score_value(check: &FormCheck, value: f32) -> (f32, Quality) {
    let ideal = check.ideal;
    let accept = check.acceptable;

    if ideal.contains(value) {
        return (1.0, Quality::Good);
    }

    if accept.contains(value) {
        let t = if value < ideal.min {
            (value - accept.min) / (ideal.min - accept.min)
        } else {
            (accept.max - value) / (accept.max - ideal.max)
        };
        return (0.7 + 0.3 * t, Quality::Acceptable);
    }

    let score = if value < accept.min {
        if accept.min > 0.0 {
            0.3 * value / accept.min
        } else {
            0.0
        }
    } else {
        let span = 180.0 - accept.max;
        if span > 0.0 {
            0.3 * (180.0 - value) / span
        } else {
            0.0
        }
    };
    (score.clamp(0.0, 1.0), Quality::Poor)
}

/// 推定済みキーポイント列に対してカウントとフォーム解析をまとめて行う
pub fn analyze_sequence(
    profile: &crate::exercise::ExerciseProfile,
    poses: &[Pose],
    config: &AnalysisConfig,
) -> SequenceAnalysis {
    let mut counter = super::RepCounter::from_profile(profile);
    for (i, pose) in poses.iter().enumerate() {
        counter.update(profile.selector.measure(pose), i);
    }
    let analyzer = FormAnalyzer::from_config(profile.exercise, config);
    let report = analyzer.analyze_video(poses, counter.rep_timestamps());

    SequenceAnalysis {
        exercise: profile.id(),
        exercise_name: profile.display_name,
        frame_count: poses.len(),
        reps: counter.stats(),
        form: report,
    }
}

/// `analyze_sequence` の結果
#[derive(Debug, Clone, Serialize)]
pub struct SequenceAnalysis {
    pub exercise: &'static str,
    pub exercise_name: &'static str,
    pub frame_count: usize,
    pub reps: super::RepStats,
    pub form: FormReport,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::{AngleRange, Feedback};
    use crate::pose::angle::tests::place_angle;
    use crate::pose::{Joint, JointAngle};

    fn depth_check(weight: f32) -> FormCheck {
        FormCheck {
            name: "depth",
            description: "Knee angle at bottom",
            target: AngleTarget::Joint(Joint::Knee),
            phase: Phase::Min,
            ideal: AngleRange::new(85.0, 95.0),
            acceptable: AngleRange::new(75.0, 105.0),
            weight,
            feedback: Feedback {
                good: "good depth",
                acceptable: "almost",
                poor: "go deeper",
            },
        }
    }

    /// 左右の膝を同じ角度にした姿勢
    fn knee_pose(degrees: f32) -> Pose {
        let mut pose = Pose::default();
        place_angle(&mut pose, JointAngle::LeftKnee.triple(), [0.3, 0.6], degrees);
        place_angle(&mut pose, JointAngle::RightKnee.triple(), [0.7, 0.6], degrees);
        pose
    }

    fn knee_rules(checks: Vec<FormCheck>) -> FormRuleSet {
        FormRuleSet {
            exercise: Exercise::Squats,
            checks,
        }
    }

    #[test]
    fn test_scoring_tiers() {
        let check = depth_check(1.0);
        assert_eq!(score_value(&check, 90.0), (1.0, Quality::Good));
        assert_eq!(score_value(&check, 85.0), (1.0, Quality::Good));

        let (s, q) = score_value(&check, 75.0);
        assert_eq!(q, Quality::Acceptable);
        assert!((s - 0.7).abs() < 1e-6);
        let (s, _) = score_value(&check, 105.0);
        assert!((s - 0.7).abs() < 1e-6);
        let (s, _) = score_value(&check, 80.0);
        assert!((s - 0.85).abs() < 1e-5);

        let (s, q) = score_value(&check, 37.5);
        assert_eq!(q, Quality::Poor);
        assert!((s - 0.15).abs() < 1e-5);
        let (s, _) = score_value(&check, 142.5);
        assert!((s - 0.15).abs() < 1e-5);
        let (s, _) = score_value(&check, 180.0);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_poor_with_open_ended_acceptable_scores_zero() {
        let mut check = depth_check(1.0);
        check.ideal = AngleRange::new(173.0, 183.0);
        check.acceptable = AngleRange::new(165.0, 185.0);
        assert_eq!(score_value(&check, 186.0), (0.0, Quality::Poor));

        check.ideal = AngleRange::new(5.0, 15.0);
        check.acceptable = AngleRange::new(0.0, 25.0);
        assert_eq!(score_value(&check, -1.0), (0.0, Quality::Poor));
    }

    #[test]
    fn test_ideal_rep_scores_total_weight() {
        let analyzer = FormAnalyzer::with_rules(knee_rules(vec![depth_check(0.4), depth_check(0.6)]));
        let frames = vec![knee_pose(90.0); 6];
        let result = analyzer.analyze_rep(&frames).unwrap();
        assert!((result.rep_score - 1.0).abs() < 1e-5);
        assert!(result.checks.iter().all(|c| c.quality == Quality::Good));
        assert!(result.worst_issues(2).is_empty());
    }

    #[test]
    fn test_worst_issues_sorted() {
        let mut second = depth_check(0.5);
        second.name = "second";
        second.ideal = AngleRange::new(40.0, 50.0);
        second.acceptable = AngleRange::new(30.0, 60.0);
        let mut third = depth_check(0.5);
        third.name = "third";
        third.ideal = AngleRange::new(80.0, 84.0);
        third.acceptable = AngleRange::new(70.0, 88.0);

        let analyzer = FormAnalyzer::with_rules(knee_rules(vec![depth_check(0.5), second, third]));
        let result = analyzer.analyze_rep(&vec![knee_pose(90.0); 6]).unwrap();
        let worst: Vec<_> = result.worst_issues(2).iter().map(|c| c.name).collect();
        assert_eq!(worst, ["second", "third"]);
    }

    #[test]
    fn test_feedback_threshold_is_strict() {
        let analyzer = FormAnalyzer::with_rules(knee_rules(vec![depth_check(1.0)]));
        let good = knee_pose(90.0);
        let bad = knee_pose(60.0);

        // 10レップ中4レップ崩れ → 出る
        let mut frames = Vec::new();
        let mut boundaries = Vec::new();
        for rep in 0..10 {
            let pose = if rep < 4 { bad } else { good };
            frames.extend(std::iter::repeat(pose).take(6));
            boundaries.push(frames.len() - 1);
        }
        let report = analyzer.analyze_video(&frames, &boundaries);
        assert_eq!(report.feedback, vec!["go deeper (4/10 reps)".to_string()]);

        // 10レップ中3レップ → 0.3 ちょうどなので出ない
        let mut frames = Vec::new();
        for rep in 0..10 {
            let pose = if rep < 3 { bad } else { good };
            frames.extend(std::iter::repeat(pose).take(6));
        }
        let report = analyzer.analyze_video(&frames, &boundaries);
        assert_eq!(report.feedback, vec![ALL_GOOD_FEEDBACK.to_string()]);
    }

    #[test]
    fn test_feedback_uses_first_occurrence_message() {
        let analyzer = FormAnalyzer::with_rules(knee_rules(vec![depth_check(1.0)]));
        let mut frames = vec![knee_pose(80.0); 6];
        frames.extend(vec![knee_pose(60.0); 6]);
        let report = analyzer.analyze_video(&frames, &[5, 11]);
        assert_eq!(report.feedback, vec!["almost (2/2 reps)".to_string()]);
    }

    #[test]
    fn test_short_windows_dropped_without_shifting() {
        let analyzer = FormAnalyzer::with_rules(knee_rules(vec![depth_check(1.0)]));
        let mut frames = vec![knee_pose(90.0); 6];
        frames.extend(vec![knee_pose(60.0); 3]);
        frames.extend(vec![knee_pose(80.0); 5]);
        let report = analyzer.analyze_video(&frames, &[5, 8, 13]);

        assert_eq!(report.analyzed_reps(), 2);
        assert_eq!(report.skipped_windows, 1);
        assert_eq!(report.window_index, vec![Some(0), None, Some(1)]);
        assert!(report.for_rep(1).is_none());
        let third = report.for_rep(2).unwrap();
        assert_eq!(third.checks[0].quality, Quality::Acceptable);
        assert!(report.for_rep(3).is_none());
    }

    #[test]
    fn test_exactly_min_window_is_kept() {
        let analyzer = FormAnalyzer::with_rules(knee_rules(vec![depth_check(1.0)]));
        let report = analyzer.analyze_video(&vec![knee_pose(90.0); 5], &[4]);
        assert_eq!(report.analyzed_reps(), 1);
        let report = analyzer.analyze_video(&vec![knee_pose(90.0); 4], &[3]);
        assert_eq!(report.analyzed_reps(), 0);
    }

    #[test]
    fn test_no_valid_windows() {
        let analyzer = FormAnalyzer::new(Exercise::Squats);
        let report = analyzer.analyze_video(&vec![knee_pose(90.0); 3], &[]);
        assert_eq!(report.form_score, 0);
        assert_eq!(report.quality, FormQuality::Poor);
        assert_eq!(report.feedback, vec![NO_REPS_FEEDBACK.to_string()]);
        assert!(report.rep_scores.is_empty());

        let report = analyzer.analyze_video(&[], &[]);
        assert_eq!(report.form_score, 0);
    }

    #[test]
    fn test_no_boundaries_is_one_window() {
        let analyzer = FormAnalyzer::with_rules(knee_rules(vec![depth_check(1.0)]));
        let report = analyzer.analyze_video(&vec![knee_pose(90.0); 20], &[]);
        assert_eq!(report.analyzed_reps(), 1);
        assert_eq!(report.form_score, 100);
        assert_eq!(report.quality, FormQuality::Excellent);
    }

    #[test]
    fn test_overall_score_and_tiers() {
        let analyzer = FormAnalyzer::with_rules(knee_rules(vec![depth_check(1.0)]));
        // 1.0 と 0.76 の平均 → 88
        let mut frames = vec![knee_pose(90.0); 6];
        frames.extend(vec![knee_pose(77.0); 6]);
        let report = analyzer.analyze_video(&frames, &[5, 11]);
        assert_eq!(report.form_score, 88);
        assert_eq!(report.quality, FormQuality::Good);
        assert_eq!(report.rep_scores.len(), 2);

        assert_eq!(FormQuality::from_score(90), FormQuality::Excellent);
        assert_eq!(FormQuality::from_score(89), FormQuality::Good);
        assert_eq!(FormQuality::from_score(75), FormQuality::Good);
        assert_eq!(FormQuality::from_score(74), FormQuality::Acceptable);
        assert_eq!(FormQuality::from_score(60), FormQuality::Acceptable);
        assert_eq!(FormQuality::from_score(59), FormQuality::Poor);
    }

    #[test]
    fn test_single_sided_target() {
        let mut check = depth_check(1.0);
        check.target = AngleTarget::Single(JointAngle::LeftKnee);
        let mut symmetry = depth_check(1.0);
        symmetry.name = "symmetry";
        symmetry.target = AngleTarget::Single(JointAngle::LeftKnee);
        symmetry.phase = Phase::Symmetry;
        symmetry.ideal = AngleRange::new(0.0, 3.0);
        symmetry.acceptable = AngleRange::new(0.0, 8.0);

        let mut pose = Pose::default();
        place_angle(&mut pose, JointAngle::LeftKnee.triple(), [0.3, 0.6], 90.0);
        place_angle(&mut pose, JointAngle::RightKnee.triple(), [0.7, 0.6], 30.0);

        let analyzer = FormAnalyzer::with_rules(knee_rules(vec![check, symmetry]));
        let result = analyzer.analyze_rep(&vec![pose; 6]).unwrap();
        assert!((result.checks[0].value - 90.0).abs() < 0.1);
        assert_eq!(result.checks[0].quality, Quality::Good);
        assert_eq!(result.checks[1].value, 0.0);
        assert_eq!(result.checks[1].quality, Quality::Good);
    }

    #[test]
    fn test_confidence_does_not_change_score() {
        let analyzer = FormAnalyzer::new(Exercise::Squats);
        let confident = vec![knee_pose(92.0); 8];
        let mut faint = confident.clone();
        for pose in faint.iter_mut() {
            for kp in pose.keypoints.iter_mut() {
                kp.confidence = 0.01;
            }
        }
        assert_eq!(
            analyzer.analyze_rep(&confident),
            analyzer.analyze_rep(&faint)
        );
    }

    #[test]
    fn test_analyze_sequence_counts_and_scores() {
        let profile = Exercise::Squats.profile();
        let mut poses = vec![knee_pose(175.0); 6];
        poses.extend(vec![knee_pose(90.0); 6]);
        poses.extend(vec![knee_pose(175.0); 6]);
        poses.extend(vec![knee_pose(90.0); 6]);

        let analysis = analyze_sequence(&profile, &poses, &AnalysisConfig::default());
        assert_eq!(analysis.exercise, "squats");
        assert_eq!(analysis.frame_count, 24);
        assert_eq!(analysis.reps.total_reps, 2);
        assert_eq!(analysis.reps.rep_timestamps, vec![8, 20]);
        assert_eq!(analysis.form.analyzed_reps(), 2);
        assert_eq!(analysis.form.rep_scores.len(), 2);
    }
}
