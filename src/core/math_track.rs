//! 数学轨道判定
//!
//! 修过任一微积分课程 -> Calculus；否则 Pre-Calculus。
//! 没有任何数学课程时同样回落到 Pre-Calculus（学生可以事后修改）。

use crate::core::models::{MathTrack, TranscriptCourse};
use crate::core::patterns::{NormalizedCourse, PatternTables};

/// 数学轨道判定结果，附带命中的课程代码
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathTrackDetection {
    pub track: MathTrack,
    pub calculus_hits: Vec<String>,
    pub pre_calculus_hits: Vec<String>,
}

impl MathTrackDetection {
    /// 没有任何证据，结果来自默认值
    pub fn defaulted(&self) -> bool {
        self.calculus_hits.is_empty() && self.pre_calculus_hits.is_empty()
    }
}

/// 扫描全部课程并记录每门课触发了哪个标志
///
/// 不提前退出，耗时 O(N × 模式数)。
pub fn detect_math_track(courses: &[TranscriptCourse], tables: &PatternTables) -> MathTrackDetection {
    let mut calculus_hits = Vec::new();
    let mut pre_calculus_hits = Vec::new();

    for course in courses {
        let normalized = NormalizedCourse::from(course);
        if tables.calculus.matches(&normalized) {
            calculus_hits.push(normalized.code.clone());
        }
        if tables.pre_calculus.matches(&normalized) {
            pre_calculus_hits.push(normalized.code);
        }
    }

    let track = if !calculus_hits.is_empty() {
        MathTrack::Calculus
    } else {
        MathTrack::PreCalculus
    };

    tracing::debug!(
        course_count = courses.len(),
        ?calculus_hits,
        ?pre_calculus_hits,
        %track,
        "数学课程检测"
    );

    MathTrackDetection {
        track,
        calculus_hits,
        pre_calculus_hits,
    }
}

/// 判定学生的数学轨道
pub fn determine_math_track(courses: &[TranscriptCourse], tables: &PatternTables) -> MathTrack {
    detect_math_track(courses, tables).track
}
