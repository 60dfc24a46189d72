use serde::{Deserialize, Serialize};

pub const GRADE_SLOTS: usize = 3;
pub const MAX_GRADE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub canonical_name: String,
    #[serde(default)]
    pub grades: Vec<Option<f64>>,
    #[serde(default)]
    pub absences: u32,
    #[serde(default)]
    pub extra_points: f64,
    #[serde(default)]
    pub extracted_provisional_average: Option<f64>,
    #[serde(default)]
    pub extracted_partial_average: Option<f64>,
}

impl Course {
    pub fn new(canonical_name: impl Into<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            grades: vec![None; GRADE_SLOTS],
            absences: 0,
            extra_points: 0.0,
            extracted_provisional_average: None,
            extracted_partial_average: None,
        }
    }

    pub fn recorded_grades(&self) -> impl Iterator<Item = f64> + '_ {
        self.grades.iter().take(GRADE_SLOTS).flatten().copied()
    }

    pub fn normalize_grade_slots(&mut self) {
        self.grades.truncate(GRADE_SLOTS);
        while matches!(self.grades.last(), Some(None)) {
            self.grades.pop();
        }
        self.grades.resize(GRADE_SLOTS, None);
    }

    pub fn discard_out_of_range(&mut self) -> Vec<String> {
        let name = self.canonical_name.clone();
        let mut warnings = Vec::new();
        let mut check = |label: &str, slot: &mut Option<f64>| {
            if let Some(value) = *slot
                && !(value.is_finite() && (0.0..=MAX_GRADE).contains(&value))
            {
                warnings.push(format!("{name}: {label} {value} outside 0-10 treated as missing"));
                *slot = None;
            }
        };

        for grade in &mut self.grades {
            check("grade", grade);
        }
        check("provisional average", &mut self.extracted_provisional_average);
        check("partial average", &mut self.extracted_partial_average);
        warnings
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Passed,
    Recovery,
    Failed,
    NoGrades,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Recovery => "recovery",
            Self::Failed => "failed",
            Self::NoGrades => "no_grades",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseResult {
    pub provisional_average: f64,
    pub partial_average: f64,
    pub grades_recorded_count: usize,
    pub required_next_grade: Option<f64>,
    pub status: Status,
    pub minimum_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedCourse {
    #[serde(flatten)]
    pub course: Course,
    pub result: CourseResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub recovery: usize,
    pub failed: usize,
    pub no_grades: usize,
    pub overall_average: f64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderFields {
    pub student_name: Option<String>,
    pub registration_id: Option<String>,
    pub section_id: Option<String>,
    pub period_label: Option<String>,
}

impl HeaderFields {
    pub fn fill_missing(&mut self, other: HeaderFields) {
        if self.student_name.is_none() {
            self.student_name = other.student_name;
        }
        if self.registration_id.is_none() {
            self.registration_id = other.registration_id;
        }
        if self.section_id.is_none() {
            self.section_id = other.section_id;
        }
        if self.period_label.is_none() {
            self.period_label = other.period_label;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.student_name.is_some()
            && self.registration_id.is_some()
            && self.section_id.is_some()
            && self.period_label.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCard {
    pub student_name: Option<String>,
    pub registration_id: Option<String>,
    pub section_id: Option<String>,
    pub period_label: Option<String>,
    pub courses: Vec<GradedCourse>,
    pub summary: ReportSummary,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableScanStats {
    pub lines_scanned: usize,
    pub table_found: bool,
    pub structured_rows: usize,
    pub fallback_rows: usize,
    pub unresolved_names: usize,
    pub duplicates_dropped: usize,
    pub continuation_lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub source_path: String,
    pub source_kind: String,
    pub source_sha256: String,
    pub line_count: usize,
    pub minimum_average: f64,
    pub course_count: usize,
    pub header_complete: bool,
    pub scan: TableScanStats,
    pub warnings: Vec<String>,
}
