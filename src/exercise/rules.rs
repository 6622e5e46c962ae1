//! Per-exercise form rule tables.
//!
//! Each check reads one angle statistic over a rep window and grades it
//! against an ideal range nested inside a wider acceptable range.

use serde::Serialize;

use super::profile::Exercise;
use crate::pose::{Joint, JointAngle};

/// 閉区間 [min, max]（度）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleRange {
    pub min: f32,
    pub max: f32,
}

impl AngleRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn covers(&self, other: &AngleRange) -> bool {
        self.min <= other.min && other.max <= self.max
    }
}

/// チェック対象の角度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleTarget {
    /// 左右ペア（統計値は左右平均）
    Joint(Joint),
    /// 片側のみ
    Single(JointAngle),
}

impl AngleTarget {
    pub fn name(&self) -> &'static str {
        match self {
            AngleTarget::Joint(joint) => joint.name(),
            AngleTarget::Single(joint_angle) => joint_angle.name(),
        }
    }
}

/// レップ窓のどの統計量を使うか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Min,
    Max,
    Mean,
    /// 左右平均の平均値
    Range,
    /// |左平均 - 右平均|
    Symmetry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub good: &'static str,
    pub acceptable: &'static str,
    pub poor: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FormCheck {
    pub name: &'static str,
    pub description: &'static str,
    pub target: AngleTarget,
    pub phase: Phase,
    pub ideal: AngleRange,
    pub acceptable: AngleRange,
    pub weight: f32,
    pub feedback: Feedback,
}

/// 1種目分のチェック（順序はフィードバックの並びに影響する）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormRuleSet {
    pub exercise: Exercise,
    pub checks: Vec<FormCheck>,
}

impl FormRuleSet {
    pub fn for_exercise(exercise: Exercise) -> Self {
        let rules = Self {
            exercise,
            checks: checks_for(exercise).to_vec(),
        };
        debug_assert!(rules.checks.iter().all(|c| c.acceptable.covers(&c.ideal)));
        debug_assert!((rules.total_weight() - 1.0).abs() < 1e-3);
        rules
    }

    pub fn total_weight(&self) -> f32 {
        self.checks.iter().map(|c| c.weight).sum()
    }
}

#[allow(clippy::too_many_arguments)]
const fn check(
    name: &'static str,
    description: &'static str,
    joint: Joint,
    phase: Phase,
    ideal: (f32, f32),
    acceptable: (f32, f32),
    weight: f32,
    feedback: [&'static str; 3],
) -> FormCheck {
    FormCheck {
        name,
        description,
        target: AngleTarget::Joint(joint),
        phase,
        ideal: AngleRange::new(ideal.0, ideal.1),
        acceptable: AngleRange::new(acceptable.0, acceptable.1),
        weight,
        feedback: Feedback {
            good: feedback[0],
            acceptable: feedback[1],
            poor: feedback[2],
        },
    }
}

use Joint::{Elbow, Hip, Knee, Shoulder};
use Phase::{Max, Mean, Min, Range, Symmetry};

const SQUATS: &[FormCheck] = &[
    check(
        "depth",
        "Squat depth (knee angle at bottom)",
        Knee,
        Min,
        (85.0, 95.0),
        (75.0, 105.0),
        0.4,
        [
            "Perfect depth! Thighs parallel to ground.",
            "Good depth, could go slightly deeper for full ROM.",
            "Squat deeper - aim for thighs parallel to ground (90°).",
        ],
    ),
    check(
        "knee_alignment",
        "Knee stability (bilateral symmetry)",
        Knee,
        Symmetry,
        (0.0, 3.0),
        (0.0, 8.0),
        0.3,
        [
            "Excellent knee alignment and symmetry!",
            "Slight knee asymmetry - focus on balanced loading.",
            "Keep knees aligned - push them out over toes, check stance width.",
        ],
    ),
    check(
        "back_neutral",
        "Back position (hip flexion angle)",
        Hip,
        Range,
        (145.0, 165.0),
        (130.0, 175.0),
        0.3,
        [
            "Perfect back position - neutral spine maintained!",
            "Good back position, minor lean is acceptable.",
            "Keep chest up and back straight - avoid excessive forward lean.",
        ],
    ),
];

const PUSHUPS: &[FormCheck] = &[
    check(
        "elbow_depth",
        "Push-up depth (elbow angle at bottom)",
        Elbow,
        Min,
        (80.0, 90.0),
        (70.0, 100.0),
        0.4,
        [
            "Perfect depth - chest near ground!",
            "Good depth, try to reach 90° elbow flexion.",
            "Go deeper - bend elbows to 90° for full ROM.",
        ],
    ),
    check(
        "body_alignment",
        "Straight body (hip extension)",
        Hip,
        Range,
        (170.0, 180.0),
        (160.0, 180.0),
        0.35,
        [
            "Perfect body alignment - straight line maintained!",
            "Good alignment, engage core to prevent hip sag.",
            "Keep hips level - avoid sagging (strengthen core) or piking.",
        ],
    ),
    check(
        "elbow_flare",
        "Elbow position (shoulder angle)",
        Shoulder,
        Range,
        (75.0, 105.0),
        (65.0, 115.0),
        0.25,
        [
            "Perfect elbow position - 45° from body!",
            "Good form, watch elbow flare for shoulder safety.",
            "Keep elbows at 45° from body - avoid excessive flaring (>60°).",
        ],
    ),
];

const BENCH_PRESS: &[FormCheck] = &[
    check(
        "elbow_depth",
        "Bar touches chest (elbow angle)",
        Elbow,
        Min,
        (75.0, 85.0),
        (65.0, 95.0),
        0.5,
        [
            "Perfect depth - bar touches chest!",
            "Good depth, lower bar to chest for full ROM.",
            "Lower the bar to chest - aim for 80° elbow angle.",
        ],
    ),
    check(
        "elbow_extension",
        "Full arm extension at top",
        Elbow,
        Max,
        (165.0, 175.0),
        (155.0, 180.0),
        0.5,
        [
            "Perfect lockout - arms fully extended!",
            "Good extension, lock out elbows at top.",
            "Extend arms fully at top - complete the rep.",
        ],
    ),
];

const SHOULDER_PRESS: &[FormCheck] = &[
    check(
        "press_extension",
        "Full arm extension overhead",
        Elbow,
        Max,
        (170.0, 180.0),
        (160.0, 180.0),
        0.5,
        [
            "Perfect extension - arms fully extended overhead!",
            "Good extension, try to lock out elbows fully.",
            "Extend arms fully overhead - don't stop short of lockout.",
        ],
    ),
    check(
        "back_stability",
        "Neutral spine (hip angle, avoid arching)",
        Hip,
        Range,
        (170.0, 180.0),
        (165.0, 180.0),
        0.5,
        [
            "Perfect posture - neutral spine, no arching!",
            "Good posture, engage core to prevent back arch.",
            "Avoid arching back - engage core, keep torso vertical.",
        ],
    ),
];

const DIPS: &[FormCheck] = &[
    check(
        "dip_depth",
        "Dip depth (elbow angle)",
        Elbow,
        Min,
        (85.0, 95.0),
        (75.0, 105.0),
        0.6,
        [
            "Perfect depth - elbows at 90°!",
            "Good depth, aim for 90° elbow bend.",
            "Go deeper - lower until elbows reach 90°.",
        ],
    ),
    check(
        "arm_extension",
        "Full extension at top",
        Elbow,
        Max,
        (168.0, 178.0),
        (160.0, 180.0),
        0.4,
        [
            "Perfect lockout - arms fully extended!",
            "Good extension, lock out at top.",
            "Extend arms fully at top position.",
        ],
    ),
];

const TRICEP_EXTENSIONS: &[FormCheck] = &[
    check(
        "elbow_flexion",
        "Full elbow flexion (forearm behind head)",
        Elbow,
        Min,
        (40.0, 50.0),
        (30.0, 60.0),
        0.5,
        [
            "Perfect flexion - full tricep stretch!",
            "Good range, lower forearm more behind head.",
            "Lower forearm more - aim for 45° elbow angle.",
        ],
    ),
    check(
        "elbow_extension",
        "Full elbow extension overhead",
        Elbow,
        Max,
        (168.0, 178.0),
        (160.0, 180.0),
        0.5,
        [
            "Perfect extension - arms straight overhead!",
            "Good extension, lock out elbows fully.",
            "Extend arms fully overhead - complete the rep.",
        ],
    ),
];

const PULLUPS: &[FormCheck] = &[
    check(
        "pull_height",
        "Chin over bar (elbow flexion)",
        Elbow,
        Min,
        (65.0, 75.0),
        (55.0, 85.0),
        0.6,
        [
            "Perfect height - chin over bar!",
            "Good pull, get chin higher over bar.",
            "Pull higher - chin must clear the bar.",
        ],
    ),
    check(
        "full_extension",
        "Full arm extension at bottom",
        Elbow,
        Max,
        (163.0, 173.0),
        (155.0, 180.0),
        0.4,
        [
            "Perfect extension - full range of motion!",
            "Good extension, fully extend arms at bottom.",
            "Extend arms fully at bottom - avoid partial reps.",
        ],
    ),
];

const ROWS: &[FormCheck] = &[
    check(
        "row_depth",
        "Elbow pulled back (elbow angle)",
        Elbow,
        Min,
        (65.0, 75.0),
        (55.0, 85.0),
        0.6,
        [
            "Perfect row - elbow pulled back fully!",
            "Good pull, pull elbow further back.",
            "Pull elbow back more - upper arm past torso.",
        ],
    ),
    check(
        "arm_extension",
        "Full arm extension at start",
        Elbow,
        Max,
        (168.0, 178.0),
        (160.0, 180.0),
        0.4,
        [
            "Perfect extension - full range of motion!",
            "Good extension, fully extend arms.",
            "Extend arms fully at start - avoid partial reps.",
        ],
    ),
];

const LAT_PULLDOWN: &[FormCheck] = &[
    check(
        "pulldown_depth",
        "Bar to upper chest (elbow angle)",
        Elbow,
        Min,
        (65.0, 75.0),
        (55.0, 85.0),
        0.6,
        [
            "Perfect pull - bar to upper chest!",
            "Good pull, bring bar lower to chest.",
            "Pull bar to upper chest - full contraction.",
        ],
    ),
    check(
        "full_extension",
        "Full arm extension at top",
        Elbow,
        Max,
        (168.0, 178.0),
        (160.0, 180.0),
        0.4,
        [
            "Perfect extension - full range of motion!",
            "Good extension, fully extend arms at top.",
            "Extend arms fully at top - complete the rep.",
        ],
    ),
];

const FACE_PULLS: &[FormCheck] = &[
    check(
        "pull_depth",
        "Hands to face level (elbow angle)",
        Elbow,
        Min,
        (85.0, 95.0),
        (75.0, 105.0),
        0.6,
        [
            "Perfect pull - hands at face level!",
            "Good pull, bring hands closer to face.",
            "Pull hands to face level - elbows back.",
        ],
    ),
    check(
        "arm_extension",
        "Arms extended forward at start",
        Elbow,
        Max,
        (158.0, 168.0),
        (150.0, 175.0),
        0.4,
        [
            "Perfect starting position - arms extended!",
            "Good extension, extend arms fully forward.",
            "Extend arms fully forward at start.",
        ],
    ),
];

const BICEP_CURLS: &[FormCheck] = &[
    check(
        "curl_depth",
        "Full curl (elbow flexion at peak)",
        Elbow,
        Min,
        (35.0, 45.0),
        (30.0, 55.0),
        0.5,
        [
            "Perfect curl depth - full bicep contraction!",
            "Good curl, try to bring forearm closer to bicep.",
            "Curl higher - aim for full flexion (30-40°) to maximize activation.",
        ],
    ),
    check(
        "elbow_stability",
        "Elbow stays stationary (shoulder stability)",
        Shoulder,
        Range,
        (165.0, 180.0),
        (155.0, 180.0),
        0.5,
        [
            "Perfect elbow position - no swinging, full bicep isolation!",
            "Good form, minor elbow movement - keep elbows pinned.",
            "Keep elbows stationary at sides - no swinging or momentum.",
        ],
    ),
];

const LEG_PRESS: &[FormCheck] = &[
    check(
        "knee_flexion",
        "Knee bend at start position",
        Knee,
        Min,
        (85.0, 95.0),
        (75.0, 105.0),
        0.5,
        [
            "Perfect starting position - 90° knee bend!",
            "Good position, adjust seat for 90° knees.",
            "Adjust starting position - knees should be at 90°.",
        ],
    ),
    check(
        "knee_extension",
        "Full leg extension at top",
        Knee,
        Max,
        (163.0, 173.0),
        (155.0, 180.0),
        0.5,
        [
            "Perfect extension - legs fully extended!",
            "Good extension, extend legs fully.",
            "Extend legs fully - don't stop short of lockout.",
        ],
    ),
];

const DEADLIFTS: &[FormCheck] = &[
    check(
        "hip_hinge",
        "Hip angle at bottom (bent position)",
        Hip,
        Min,
        (55.0, 65.0),
        (45.0, 75.0),
        0.5,
        [
            "Perfect hip hinge - correct starting position!",
            "Good hinge, maintain hip bend at bottom.",
            "Hinge at hips more - maintain neutral spine.",
        ],
    ),
    check(
        "hip_extension",
        "Full hip extension at top (lockout)",
        Hip,
        Max,
        (173.0, 183.0),
        (165.0, 185.0),
        0.5,
        [
            "Perfect lockout - standing tall, hips extended!",
            "Good lockout, drive hips fully forward.",
            "Complete the lockout - stand fully upright.",
        ],
    ),
];

const PLANK: &[FormCheck] = &[check(
    "body_alignment",
    "Straight body line (hip angle)",
    Hip,
    Mean,
    (175.0, 185.0),
    (165.0, 190.0),
    1.0,
    [
        "Perfect plank - straight body line maintained!",
        "Good plank, engage core to prevent sag.",
        "Keep hips level - avoid sagging or piking.",
    ],
)];

const CRUNCHES: &[FormCheck] = &[
    check(
        "trunk_flexion",
        "Trunk flexion (hip angle decrease)",
        Hip,
        Min,
        (40.0, 50.0),
        (30.0, 60.0),
        0.7,
        [
            "Perfect crunch - good trunk flexion!",
            "Good crunch, lift shoulders higher.",
            "Lift shoulders more - focus on trunk flexion.",
        ],
    ),
    check(
        "controlled_descent",
        "Return to starting position",
        Hip,
        Max,
        (80.0, 90.0),
        (70.0, 100.0),
        0.3,
        [
            "Perfect control - good starting position!",
            "Good control, maintain consistent form.",
            "Control the descent - return to starting position.",
        ],
    ),
];

const RUSSIAN_TWISTS: &[FormCheck] = &[check(
    "v_sit_position",
    "V-sit angle (hip angle)",
    Hip,
    Mean,
    (95.0, 115.0),
    (85.0, 125.0),
    1.0,
    [
        "Perfect V-sit position maintained!",
        "Good position, maintain consistent V-sit.",
        "Maintain V-sit position throughout - hips at 90-110°.",
    ],
)];

const LEG_RAISES: &[FormCheck] = &[
    check(
        "leg_height",
        "Legs raised to vertical (hip flexion)",
        Hip,
        Max,
        (85.0, 95.0),
        (75.0, 105.0),
        0.6,
        [
            "Perfect height - legs vertical!",
            "Good height, raise legs higher.",
            "Raise legs to 90° - vertical position.",
        ],
    ),
    check(
        "controlled_lower",
        "Lower legs without touching ground",
        Hip,
        Min,
        (5.0, 15.0),
        (0.0, 25.0),
        0.4,
        [
            "Perfect control - legs near but not touching ground!",
            "Good control, don't rest legs on ground.",
            "Keep legs off ground - maintain tension.",
        ],
    ),
];

const LUNGES: &[FormCheck] = &[
    check(
        "lunge_depth",
        "Knee angle at bottom (front leg)",
        Knee,
        Min,
        (85.0, 95.0),
        (80.0, 105.0),
        0.4,
        [
            "Perfect lunge depth - 90° front knee!",
            "Good depth, aim for 90° front knee bend.",
            "Lower your hips - aim for 90° front knee, shin vertical.",
        ],
    ),
    check(
        "torso_upright",
        "Upright torso (hip angle)",
        Hip,
        Range,
        (165.0, 180.0),
        (155.0, 180.0),
        0.6,
        [
            "Perfect upright posture - chest up!",
            "Good posture, try to stay more vertical.",
            "Keep torso upright - chest up, don't lean forward excessively.",
        ],
    ),
];

/// 種目ごとのチェック表。エイリアスは正規種目の表を共有する
pub fn checks_for(exercise: Exercise) -> &'static [FormCheck] {
    match exercise {
        Exercise::Pushups => PUSHUPS,
        Exercise::BenchPress => BENCH_PRESS,
        Exercise::ShoulderPress => SHOULDER_PRESS,
        Exercise::Dips => DIPS,
        Exercise::TricepExtensions => TRICEP_EXTENSIONS,
        Exercise::Pullups => PULLUPS,
        Exercise::Rows => ROWS,
        Exercise::LatPulldown => LAT_PULLDOWN,
        Exercise::FacePulls => FACE_PULLS,
        Exercise::BicepCurls => BICEP_CURLS,
        Exercise::Squats => SQUATS,
        Exercise::Lunges => LUNGES,
        Exercise::LegPress => LEG_PRESS,
        Exercise::Deadlifts => DEADLIFTS,
        Exercise::Plank => PLANK,
        Exercise::Crunches => CRUNCHES,
        Exercise::RussianTwists => RUSSIAN_TWISTS,
        Exercise::LegRaises => LEG_RAISES,
    }
}
