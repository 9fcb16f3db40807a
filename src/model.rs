use serde::{Deserialize, Deserializer, Serialize};

use crate::grading::{clamp_ca, clamp_exam, parse_score};

/// Fixed affective trait names; stored records may omit entries but never
/// introduce names outside this list.
pub const AFFECTIVE_TRAITS: &[&str] = &[
    "PUNCTUALITY",
    "CLASS ATTENDANCE",
    "STUDY HABIT",
    "TEAM SPIRIT",
    "RELATIONSHIP WITH OTHERS",
    "SELF CONTROL",
    "NEATNESS",
    "OBEDIENCE",
    "AVERAGE RATING",
];

pub const PSYCHOMOTOR_TRAITS: &[&str] = &[
    "ADAPTATION",
    "PERCEPTION",
    "INITIATIVE",
    "PRECISION",
    "NATURALIZATION",
    "FLUENCY",
    "AVERAGE RATING",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraitGrade {
    A,
    B,
    C,
    D,
    E,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraitCategory {
    Affective,
    Psychomotor,
}

impl TraitCategory {
    pub fn known_names(self) -> &'static [&'static str] {
        match self {
            TraitCategory::Affective => AFFECTIVE_TRAITS,
            TraitCategory::Psychomotor => PSYCHOMOTOR_TRAITS,
        }
    }
}

/// Teacher-assigned rating for one trait; `rating: None` means unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraitRating {
    pub category: TraitCategory,
    pub name: String,
    #[serde(default)]
    pub rating: Option<TraitGrade>,
}

impl TraitRating {
    pub fn is_known(&self) -> bool {
        self.category
            .known_names()
            .iter()
            .any(|n| n.eq_ignore_ascii_case(&self.name))
    }
}

// Score fields arrive from form state, so they may be numbers, numeric
// strings, empty strings or null. Anything unparseable counts as 0.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScore {
    Num(f64),
    Text(String),
    Null,
}

fn de_score<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawScore::deserialize(d)? {
        RawScore::Num(v) => v,
        RawScore::Text(s) => parse_score(&s),
        RawScore::Null => 0.0,
    })
}

fn de_ca<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    de_score(d).map(clamp_ca)
}

fn de_exam<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    de_score(d).map(clamp_exam)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_ca")]
    pub ca: f64,
    #[serde(default, deserialize_with = "de_exam")]
    pub exam: f64,
}

impl SubjectEntry {
    pub fn new(name: &str, ca: f64, exam: f64) -> Self {
        Self {
            name: name.to_string(),
            ca: clamp_ca(ca),
            exam: clamp_exam(exam),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BioData {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "class")]
    pub class_name: String,
    #[serde(default)]
    pub roll: String,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub next_term: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub admission_no: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceData {
    #[serde(default, deserialize_with = "de_score")]
    pub days_open: f64,
    #[serde(default, deserialize_with = "de_score")]
    pub days_present: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comments {
    #[serde(default)]
    pub teacher: String,
    #[serde(default)]
    pub principal: String,
}

/// The unit of persistence: one term report for one student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    #[serde(default)]
    pub bio: BioData,
    #[serde(default)]
    pub attendance: AttendanceData,
    #[serde(default)]
    pub comments: Comments,
    #[serde(default)]
    pub subjects: Vec<SubjectEntry>,
    #[serde(default)]
    pub traits: Vec<TraitRating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl ReportRecord {
    pub fn blank() -> Self {
        Self::default()
    }

    /// Drops trait entries outside the fixed per-category name sets and
    /// clamps negative attendance counts. Score clamping already happened
    /// at decode/construction time.
    pub fn normalize(&mut self) {
        self.traits.retain(TraitRating::is_known);
        if self.attendance.days_open < 0.0 {
            self.attendance.days_open = 0.0;
        }
        if self.attendance.days_present < 0.0 {
            self.attendance.days_present = 0.0;
        }
    }
}

/// One archived report inside a class scope's archive list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub term: String,
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub timestamp: String,
    pub data: ReportRecord,
}

/// Listing row for the archive picker; omits the record body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSummary {
    pub id: String,
    pub name: String,
    pub term: String,
    pub session: String,
    pub timestamp: String,
}

impl ArchiveSummary {
    pub fn of(entry: &ArchiveEntry) -> Self {
        Self {
            id: entry.id.clone(),
            name: entry.name.clone(),
            term: entry.term.clone(),
            session: entry.session.clone(),
            timestamp: entry.timestamp.clone(),
        }
    }
}
