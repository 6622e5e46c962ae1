//! Backend-independent description of everything drawn on one output frame.
//!
//! The pipeline builds a `FrameOverlay` per frame and hands it to the video
//! backend, which only has to rasterize lines, circles and text.

use crate::analysis::{FormQuality, RepFormResult, RepState};
use crate::pose::Pose;

use super::skeleton::{Rgb, GREEN, ISSUE_COLOR, KEYPOINT_COLOR, ORANGE, RED, SKELETON_CONNECTIONS, YELLOW};

/// これより長いフィードバックは省略する
const MAX_ISSUE_CHARS: usize = 40;
const ISSUE_COLUMN_WIDTH: i32 = 450;
const MAX_ISSUES: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub color: Rgb,
    pub thickness: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub center: (i32, i32),
    pub radius: i32,
    pub color: Rgb,
}

/// 左下基準のテキスト
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub origin: (i32, i32),
    pub scale: f64,
    pub thickness: i32,
    pub color: Rgb,
}

/// 画面中央に出すテキスト。位置は描画側が文字幅から決める
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub text: String,
    pub scale: f64,
    pub thickness: i32,
    pub color: Rgb,
}

/// 1フレーム分の HUD の状態
#[derive(Debug, Clone, Copy)]
pub struct HudState<'a> {
    pub rep_count: usize,
    pub angle: f32,
    pub state: RepState,
    /// 現在のレップのフォーム評価
    pub form: Option<&'a RepFormResult>,
    /// このフレームでレップが完了したか
    pub rep_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameOverlay {
    pub segments: Vec<Segment>,
    pub markers: Vec<Marker>,
    pub texts: Vec<TextLine>,
    pub banner: Option<Banner>,
}

impl FrameOverlay {
    pub fn build(
        pose: &Pose,
        width: u32,
        height: u32,
        hud: &HudState<'_>,
        visibility_threshold: f32,
    ) -> Self {
        let mut overlay = Self::default();

        for (start_idx, end_idx, side) in SKELETON_CONNECTIONS.iter() {
            let start = pose.get(*start_idx);
            let end = pose.get(*end_idx);
            if start.is_visible(visibility_threshold) && end.is_visible(visibility_threshold) {
                overlay.segments.push(Segment {
                    from: start.to_pixel(width, height),
                    to: end.to_pixel(width, height),
                    color: side.color(),
                    thickness: 4,
                });
            }
        }

        for (_, kp) in pose.named() {
            if kp.is_visible(visibility_threshold) {
                overlay.markers.push(Marker {
                    center: kp.to_pixel(width, height),
                    radius: 6,
                    color: KEYPOINT_COLOR,
                });
            }
        }

        overlay.push_text(format!("Reps: {}", hud.rep_count), (20, 50), 1.5, 3, GREEN);
        overlay.push_text(format!("Angle: {:.1}", hud.angle), (20, 100), 1.2, 3, YELLOW);
        overlay.push_text(format!("State: {}", hud.state), (20, 145), 0.8, 2, ORANGE);

        if let Some(form) = hud.form {
            let percent = form.percent();
            let color = quality_color(FormQuality::from_score(percent));
            overlay.push_text(format!("Form: {}%", percent), (20, 190), 1.0, 2, color);

            let x = width as i32 - ISSUE_COLUMN_WIDTH;
            for (i, issue) in form.worst_issues(MAX_ISSUES).iter().enumerate() {
                let y = 50 + 30 * i as i32;
                overlay.push_text(truncate_feedback(issue.feedback), (x, y), 0.6, 2, ISSUE_COLOR);
            }
        }

        if hud.rep_completed {
            let text = match hud.form {
                Some(form) => format!("REP COMPLETE! Score: {}%", form.percent()),
                None => "REP COMPLETE!".to_string(),
            };
            overlay.banner = Some(Banner {
                text,
                scale: 1.5,
                thickness: 4,
                color: GREEN,
            });
        }

        overlay
    }

    fn push_text(&mut self, text: String, origin: (i32, i32), scale: f64, thickness: i32, color: Rgb) {
        self.texts.push(TextLine {
            text,
            origin,
            scale,
            thickness,
            color,
        });
    }

    pub fn has_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|t| t.text.contains(needle))
            || self.banner.as_ref().is_some_and(|b| b.text.contains(needle))
    }
}

pub fn quality_color(quality: FormQuality) -> Rgb {
    match quality {
        FormQuality::Excellent => GREEN,
        FormQuality::Good => YELLOW,
        FormQuality::Acceptable => ORANGE,
        FormQuality::Poor => RED,
    }
}

/// 40文字を超えたら37文字 + "..."
pub fn truncate_feedback(text: &str) -> String {
    if text.chars().count() > MAX_ISSUE_CHARS {
        let head: String = text.chars().take(MAX_ISSUE_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
