use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AnalysisError, Result};
use crate::pose::{AngleSelector, Joint, JointAngle};

/// 登録済みの種目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exercise {
    Pushups,
    BenchPress,
    ShoulderPress,
    Dips,
    TricepExtensions,
    Pullups,
    Rows,
    LatPulldown,
    FacePulls,
    BicepCurls,
    Squats,
    Lunges,
    LegPress,
    Deadlifts,
    Plank,
    Crunches,
    RussianTwists,
    LegRaises,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Push,
    Pull,
    Legs,
    Core,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Push => "push",
            Category::Pull => "pull",
            Category::Legs => "legs",
            Category::Core => "core",
        }
    }
}

/// 登録ID → 種目。表記ゆれのエイリアスも含む（列挙順 = 一覧の表示順）
const REGISTERED_IDS: &[(&str, Exercise)] = &[
    ("pushups", Exercise::Pushups),
    ("push-ups", Exercise::Pushups),
    ("bench_press", Exercise::BenchPress),
    ("shoulder_press", Exercise::ShoulderPress),
    ("dips", Exercise::Dips),
    ("tricep_extensions", Exercise::TricepExtensions),
    ("pullups", Exercise::Pullups),
    ("pull-ups", Exercise::Pullups),
    ("rows", Exercise::Rows),
    ("lat_pulldown", Exercise::LatPulldown),
    ("face_pulls", Exercise::FacePulls),
    ("bicep_curls", Exercise::BicepCurls),
    ("squats", Exercise::Squats),
    ("lunges", Exercise::Lunges),
    ("leg_press", Exercise::LegPress),
    ("deadlifts", Exercise::Deadlifts),
    ("plank", Exercise::Plank),
    ("crunches", Exercise::Crunches),
    ("russian_twists", Exercise::RussianTwists),
    ("leg_raises", Exercise::LegRaises),
];

/// 種目ごとの不変設定
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExerciseProfile {
    pub exercise: Exercise,
    pub display_name: &'static str,
    pub category: Category,
    pub selector: AngleSelector,
    /// この角度を超えたフレームが続くと DOWN へ
    pub down_threshold: f32,
    /// この角度を下回ったフレームが続くとレップ完了
    pub up_threshold: f32,
    pub min_frames_down: u32,
    pub min_frames_up: u32,
}

impl ExerciseProfile {
    pub fn id(&self) -> &'static str {
        self.exercise.id()
    }
}

impl Exercise {
    pub const ALL: [Exercise; 18] = [
        Exercise::Pushups,
        Exercise::BenchPress,
        Exercise::ShoulderPress,
        Exercise::Dips,
        Exercise::TricepExtensions,
        Exercise::Pullups,
        Exercise::Rows,
        Exercise::LatPulldown,
        Exercise::FacePulls,
        Exercise::BicepCurls,
        Exercise::Squats,
        Exercise::Lunges,
        Exercise::LegPress,
        Exercise::Deadlifts,
        Exercise::Plank,
        Exercise::Crunches,
        Exercise::RussianTwists,
        Exercise::LegRaises,
    ];

    /// 正規ID
    pub fn id(self) -> &'static str {
        match self {
            Exercise::Pushups => "pushups",
            Exercise::BenchPress => "bench_press",
            Exercise::ShoulderPress => "shoulder_press",
            Exercise::Dips => "dips",
            Exercise::TricepExtensions => "tricep_extensions",
            Exercise::Pullups => "pullups",
            Exercise::Rows => "rows",
            Exercise::LatPulldown => "lat_pulldown",
            Exercise::FacePulls => "face_pulls",
            Exercise::BicepCurls => "bicep_curls",
            Exercise::Squats => "squats",
            Exercise::Lunges => "lunges",
            Exercise::LegPress => "leg_press",
            Exercise::Deadlifts => "deadlifts",
            Exercise::Plank => "plank",
            Exercise::Crunches => "crunches",
            Exercise::RussianTwists => "russian_twists",
            Exercise::LegRaises => "leg_raises",
        }
    }

    /// 登録IDまたは正規化した表記（大文字小文字・ハイフン/アンダースコア）から引く
    pub fn from_id(id: &str) -> Option<Self> {
        if let Some(&(_, exercise)) = REGISTERED_IDS.iter().find(|(rid, _)| *rid == id) {
            return Some(exercise);
        }
        let normalized = normalize(id);
        REGISTERED_IDS
            .iter()
            .find(|(rid, _)| normalize(rid) == normalized || normalize(rid).replace('_', "") == normalized)
            .map(|&(_, exercise)| exercise)
    }

    pub fn profile(self) -> ExerciseProfile {
        use AngleSelector::{Average, BodyLine, Single};
        use Category::*;

        // (表示名, 分類, 追跡角, down, up, min_down, min_up)
        let (display_name, category, selector, down, up, min_down, min_up) = match self {
            Exercise::Pushups => ("Push-ups", Push, Average(Joint::Elbow), 165.0, 85.0, 3, 3),
            Exercise::BenchPress => ("Bench Press", Push, Average(Joint::Elbow), 165.0, 80.0, 3, 3),
            Exercise::ShoulderPress => {
                ("Shoulder Press", Push, Average(Joint::Elbow), 165.0, 90.0, 3, 3)
            }
            Exercise::Dips => ("Dips", Push, Average(Joint::Elbow), 170.0, 90.0, 3, 3),
            Exercise::TricepExtensions => {
                ("Tricep Extensions", Push, Single(JointAngle::LeftElbow), 170.0, 45.0, 2, 2)
            }
            Exercise::Pullups => ("Pull-ups", Pull, Average(Joint::Elbow), 165.0, 70.0, 3, 3),
            Exercise::Rows => ("Rows", Pull, Average(Joint::Elbow), 170.0, 70.0, 3, 3),
            Exercise::LatPulldown => ("Lat Pulldown", Pull, Average(Joint::Elbow), 170.0, 70.0, 3, 3),
            Exercise::FacePulls => ("Face Pulls", Pull, Average(Joint::Elbow), 160.0, 90.0, 3, 3),
            Exercise::BicepCurls => {
                ("Bicep Curls", Pull, Single(JointAngle::LeftElbow), 165.0, 40.0, 2, 2)
            }
            Exercise::Squats => ("Squats", Legs, Average(Joint::Knee), 170.0, 95.0, 3, 3),
            Exercise::Lunges => ("Lunges", Legs, Single(JointAngle::LeftKnee), 170.0, 90.0, 3, 3),
            Exercise::LegPress => ("Leg Press", Legs, Average(Joint::Knee), 165.0, 90.0, 3, 3),
            Exercise::Deadlifts => ("Deadlifts", Legs, Average(Joint::Hip), 175.0, 60.0, 3, 3),
            // 時間ベースの種目なので実質レップは数えない
            Exercise::Plank => ("Plank", Core, BodyLine, 180.0, 160.0, 30, 30),
            Exercise::Crunches => ("Crunches", Core, Average(Joint::Hip), 85.0, 45.0, 2, 2),
            Exercise::RussianTwists => {
                ("Russian Twists", Core, Average(Joint::Hip), 120.0, 60.0, 2, 2)
            }
            Exercise::LegRaises => ("Leg Raises", Core, BodyLine, 10.0, 90.0, 2, 2),
        };

        ExerciseProfile {
            exercise: self,
            display_name,
            category,
            selector,
            down_threshold: down,
            up_threshold: up,
            min_frames_down: min_down,
            min_frames_up: min_up,
        }
    }
}

fn normalize(id: &str) -> String {
    id.trim().to_ascii_lowercase().replace('-', "_")
}

/// 厳密な検索。未登録IDはエラー
pub fn lookup(id: &str) -> Result<ExerciseProfile> {
    Exercise::from_id(id)
        .map(Exercise::profile)
        .ok_or_else(|| AnalysisError::UnknownExercise(id.to_string()))
}

/// 未登録IDは `fallback` の設定で続行する（警告のみ）
pub fn resolve(id: &str, fallback: Exercise) -> ExerciseProfile {
    match lookup(id) {
        Ok(profile) => profile,
        Err(e) => {
            warn!("{}, defaulting to {}", e, fallback.id());
            fallback.profile()
        }
    }
}

/// 種目一覧の1行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub down_threshold: f32,
    pub up_threshold: f32,
}

/// 登録ID（エイリアス含む）ごとの一覧
pub fn supported_exercises() -> Vec<ExerciseInfo> {
    REGISTERED_IDS
        .iter()
        .map(|&(id, exercise)| {
            let profile = exercise.profile();
            ExerciseInfo {
                id,
                name: profile.display_name,
                category: profile.category,
                down_threshold: profile.down_threshold,
                up_threshold: profile.up_threshold,
            }
        })
        .collect()
}
