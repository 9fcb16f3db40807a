use serde::{Deserialize, Serialize};

use crate::model::{ReportRecord, TraitRating};

pub const CA_MAX: f64 = 40.0;
pub const EXAM_MAX: f64 = 60.0;

/// WAEC/NECO style grade bands, evaluated highest-first.
const GRADE_BANDS: &[(f64, &str, &str)] = &[
    (75.0, "A1", "EXCELLENT"),
    (70.0, "B2", "VERY GOOD"),
    (65.0, "B3", "GOOD"),
    (60.0, "C4", "CREDIT"),
    (50.0, "C5", "CREDIT"),
    (45.0, "C6", "CREDIT"),
    (40.0, "D7", "PASS"),
    (1.0, "F9", "FAIL"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub total: f64,
    pub grade: String,
    pub remark: String,
}

/// parseFloat-or-zero: non-numeric or missing input counts as 0.
pub fn parse_score(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

pub fn clamp_ca(v: f64) -> f64 {
    v.clamp(0.0, CA_MAX)
}

pub fn clamp_exam(v: f64) -> f64 {
    v.clamp(0.0, EXAM_MAX)
}

/// Pure threshold lookup; first matching band wins. A total below 1
/// (including an all-blank row) grades as "-"/"-".
pub fn compute_grade(ca: f64, exam: f64) -> GradeResult {
    let total = ca + exam;
    for (floor, grade, remark) in GRADE_BANDS {
        if total >= *floor {
            return GradeResult {
                total,
                grade: (*grade).to_string(),
                remark: (*remark).to_string(),
            };
        }
    }
    GradeResult {
        total,
        grade: "-".to_string(),
        remark: "-".to_string(),
    }
}

/// 2-decimal display rounding (the UI's toFixed(2)).
pub fn round_off_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn days_absent(days_open: f64, days_present: f64) -> f64 {
    let d = days_open - days_present;
    if d > 0.0 {
        d
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRow {
    pub name: String,
    pub ca: f64,
    pub exam: f64,
    pub total: f64,
    pub grade: String,
    pub remark: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    pub days_open: f64,
    pub days_present: f64,
    pub days_absent: f64,
}

/// Everything the report sheet re-derives on render. None of this is
/// persisted except total/grade/remark implicitly via the subject scores;
/// average, percentage and grand total are always recomputed here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayModel {
    pub subjects: Vec<SubjectRow>,
    pub grand_total: f64,
    pub average: f64,
    pub percentage: f64,
    pub attendance: AttendanceView,
    pub traits: Vec<TraitRating>,
    pub position: Option<String>,
}

pub fn display_model(record: &ReportRecord) -> DisplayModel {
    let mut subjects: Vec<SubjectRow> = Vec::new();
    let mut grand_total = 0.0_f64;

    for s in &record.subjects {
        // Nameless rows are blank form lines, not subjects.
        if s.name.trim().is_empty() {
            continue;
        }
        let result = compute_grade(s.ca, s.exam);
        grand_total += result.total;
        subjects.push(SubjectRow {
            name: s.name.clone(),
            ca: s.ca,
            exam: s.exam,
            total: result.total,
            grade: result.grade,
            remark: result.remark,
        });
    }

    let count = subjects.len();
    let average = if count > 0 {
        round_off_2_decimals(grand_total / count as f64)
    } else {
        0.0
    };
    // Percentage of the theoretical maximum (100 per subject).
    let percentage = if count > 0 {
        round_off_2_decimals(grand_total / (count as f64 * 100.0) * 100.0)
    } else {
        0.0
    };

    DisplayModel {
        subjects,
        grand_total,
        average,
        percentage,
        attendance: AttendanceView {
            days_open: record.attendance.days_open,
            days_present: record.attendance.days_present,
            days_absent: days_absent(record.attendance.days_open, record.attendance.days_present),
        },
        traits: record.traits.clone(),
        position: record.position.clone(),
    }
}
