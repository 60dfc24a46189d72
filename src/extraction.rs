use anyhow::Result;
use tracing::info;

use crate::grading::{MinimumAverage, grade_course, summarize};
use crate::model::{GradedCourse, ReportCard, TableScanStats};

mod catalog;
mod header;
mod lines;
mod table;

pub use catalog::COURSE_CATALOG;
use catalog::DisciplineCatalog;
use header::{HeaderPatterns, extract_header};
use lines::normalize_lines;
use table::{TablePatterns, parse_table};

#[derive(Debug, Clone)]
pub struct Extraction {
    pub report: ReportCard,
    pub line_count: usize,
    pub header_complete: bool,
    pub scan: TableScanStats,
}

#[derive(Debug)]
pub struct ReportCardExtractor {
    header: HeaderPatterns,
    table: TablePatterns,
    catalog: DisciplineCatalog,
}

impl ReportCardExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            header: HeaderPatterns::compile()?,
            table: TablePatterns::compile()?,
            catalog: DisciplineCatalog::new(),
        })
    }

    pub fn extract(&self, text: &str, minimum: MinimumAverage) -> Extraction {
        let lines = normalize_lines(text);
        let header = extract_header(&lines, &self.header, &self.catalog);
        let scan = parse_table(&lines, &self.table, &self.catalog);

        let courses = scan
            .courses
            .into_iter()
            .map(|course| grade_course(course, minimum))
            .collect::<Vec<GradedCourse>>();
        let summary = summarize(&courses);

        info!(
            lines = lines.len(),
            table_found = scan.stats.table_found,
            courses = courses.len(),
            structured_rows = scan.stats.structured_rows,
            fallback_rows = scan.stats.fallback_rows,
            warnings = scan.warnings.len(),
            "report card extracted"
        );

        let header_complete = header.is_complete();
        Extraction {
            report: ReportCard {
                student_name: header.student_name,
                registration_id: header.registration_id,
                section_id: header.section_id,
                period_label: header.period_label,
                courses,
                summary,
                warnings: scan.warnings,
            },
            line_count: lines.len(),
            header_complete,
            scan: scan.stats,
        }
    }
}
