use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::extraction::catalog::DisciplineCatalog;
use crate::model::{Course, GRADE_SLOTS, MAX_GRADE, TableScanStats};

const SLOT_ABSENCES: usize = 0;
const SLOT_FIRST_GRADE: usize = 1;
const SLOT_PROVISIONAL: usize = 4;
const SLOT_EXTRA_POINTS: usize = 5;
const SLOT_PARTIAL: usize = 6;
const CONTINUATION_SLOTS: usize = 3;
const MIN_FALLBACK_NUMBERS: usize = 2;

const GRADE_CELL: &str = r"\d{1,2}(?:[.,]\d{1,2})?|[-—–]";

#[derive(Debug)]
pub struct TablePatterns {
    header: Regex,
    row: Regex,
}

impl TablePatterns {
    pub fn compile() -> Result<Self> {
        let header = r"(?i)\bdisciplinas?\b|\bfaltas\b|\b[123]\s*[ªaº°]?\s*av\b";
        let row = format!(
            r"^(?P<name>[A-ZÀ-ÖØ-Þ][A-ZÀ-ÖØ-Þ\p{{M}} \-]*?)\s+(?P<absences>\d{{1,3}}|[-—–])\s+(?P<g1>{GRADE_CELL})\s+(?P<g2>{GRADE_CELL})\s+(?P<g3>{GRADE_CELL})(?P<tail>\s+.*)?$"
        );

        Ok(Self {
            header: Regex::new(header).context("failed to compile table header regex")?,
            row: Regex::new(&row).context("failed to compile table row regex")?,
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Cell {
    Number(f64),
    Placeholder,
}

impl Cell {
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim_matches(|c: char| matches!(c, '|' | ';' | ':'));
        if !token.is_empty() && token.chars().all(|c| matches!(c, '-' | '—' | '–')) {
            return Some(Self::Placeholder);
        }
        parse_number(token).map(Self::Number)
    }

    fn value(self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(value),
            Self::Placeholder => None,
        }
    }
}

fn parse_number(token: &str) -> Option<f64> {
    let normalized = token.replace(',', ".");
    let well_formed = normalized.starts_with(|c: char| c.is_ascii_digit())
        && normalized.ends_with(|c: char| c.is_ascii_digit())
        && normalized.chars().all(|c| c.is_ascii_digit() || c == '.')
        && normalized.matches('.').count() <= 1;
    if !well_formed {
        return None;
    }
    normalized.parse::<f64>().ok()
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ScanState {
    #[default]
    Searching,
    InTable,
}

#[derive(Debug, Default)]
pub struct TableScan {
    pub state: ScanState,
    pub courses: Vec<Course>,
    pub stats: TableScanStats,
    pub warnings: Vec<String>,
    consume_next: bool,
}

pub fn parse_table(
    lines: &[String],
    patterns: &TablePatterns,
    catalog: &DisciplineCatalog,
) -> TableScan {
    let mut scan = lines
        .iter()
        .enumerate()
        .fold(TableScan::default(), |scan, (index, line)| {
            let next = lines.get(index + 1).map(String::as_str);
            scan.step(line, next, patterns, catalog)
        });

    for course in &mut scan.courses {
        course.normalize_grade_slots();
    }
    scan
}

impl TableScan {
    fn step(
        mut self,
        line: &str,
        next: Option<&str>,
        patterns: &TablePatterns,
        catalog: &DisciplineCatalog,
    ) -> Self {
        self.stats.lines_scanned += 1;
        if self.consume_next {
            self.consume_next = false;
            return self;
        }

        match self.state {
            ScanState::Searching => {
                if patterns.header.is_match(line) {
                    debug!(line = %line, "grade table header found");
                    self.state = ScanState::InTable;
                    self.stats.table_found = true;
                }
                self
            }
            ScanState::InTable => match patterns.row.captures(line) {
                Some(captures) => self.structured_row(&captures, next, catalog),
                None => self.fallback_row(line, catalog),
            },
        }
    }

    fn structured_row(
        mut self,
        captures: &regex::Captures<'_>,
        next: Option<&str>,
        catalog: &DisciplineCatalog,
    ) -> Self {
        let raw_name = captures.name("name").map(|m| m.as_str().trim()).unwrap_or_default();
        let Some(name) = catalog.resolve(raw_name) else {
            debug!(candidate = %raw_name, "row skipped: not a catalog course");
            self.stats.unresolved_names += 1;
            return self;
        };
        if self.has_course(name) {
            debug!(course = name, "duplicate row dropped");
            self.stats.duplicates_dropped += 1;
            return self;
        }

        let mut cells = ["absences", "g1", "g2", "g3"]
            .iter()
            .map(|group| {
                captures
                    .name(group)
                    .and_then(|m| Cell::parse(m.as_str()))
                    .unwrap_or(Cell::Placeholder)
            })
            .collect::<Vec<Cell>>();

        let mut tail: Vec<Cell> = captures
            .name("tail")
            .map(|m| m.as_str().split_whitespace().filter_map(Cell::parse).collect())
            .unwrap_or_else(Vec::new);
        if tail.is_empty()
            && let Some(continuation) = next.and_then(continuation_cells)
        {
            tail = continuation;
            self.consume_next = true;
            self.stats.continuation_lines += 1;
        }

        let placeholders = cells[SLOT_FIRST_GRADE..]
            .iter()
            .chain(tail.iter())
            .filter(|cell| **cell == Cell::Placeholder)
            .count();
        if placeholders >= 2 && !tail.is_empty() {
            self.warnings.push(format!(
                "{name}: {placeholders} placeholders alongside trailing averages; slots kept in printed order"
            ));
        }

        cells.extend(tail);
        let course = course_from_cells(name, &cells, &mut self.warnings);
        self.stats.structured_rows += 1;
        self.courses.push(course);
        self
    }

    fn fallback_row(mut self, line: &str, catalog: &DisciplineCatalog) -> Self {
        let Some((name, span)) = catalog.leading_entry(line) else {
            return self;
        };
        if self.has_course(name) {
            self.stats.duplicates_dropped += 1;
            return self;
        }

        let remainder = line.split_whitespace().skip(span).collect::<Vec<&str>>();
        if catalog.contains_non_course_token(&remainder.join(" ")) {
            return self;
        }

        let cells = remainder
            .iter()
            .filter_map(|token| Cell::parse(token))
            .collect::<Vec<Cell>>();
        let numbers = cells.iter().filter(|cell| cell.value().is_some()).count();
        if numbers < MIN_FALLBACK_NUMBERS {
            debug!(course = name, numbers, "fallback row skipped: too few numbers");
            return self;
        }

        let course = course_from_cells(name, &cells, &mut self.warnings);
        self.stats.fallback_rows += 1;
        self.courses.push(course);
        self
    }

    fn has_course(&self, name: &str) -> bool {
        self.courses
            .iter()
            .any(|course| course.canonical_name == name)
    }
}

fn continuation_cells(line: &str) -> Option<Vec<Cell>> {
    let cells = line
        .split_whitespace()
        .map(Cell::parse)
        .collect::<Option<Vec<Cell>>>()?;
    let has_number = cells.iter().any(|cell| cell.value().is_some());
    (cells.len() == CONTINUATION_SLOTS && has_number).then_some(cells)
}

fn course_from_cells(name: &str, cells: &[Cell], warnings: &mut Vec<String>) -> Course {
    let slot = |index: usize| cells.get(index).and_then(|cell| cell.value());
    let mut bounded = |index: usize, label: &str| {
        let value = slot(index)?;
        if (0.0..=MAX_GRADE).contains(&value) {
            Some(value)
        } else {
            warnings.push(format!("{name}: {label} {value} outside 0-10 treated as missing"));
            None
        }
    };

    let grades = (0..GRADE_SLOTS)
        .map(|offset| bounded(SLOT_FIRST_GRADE + offset, "grade"))
        .collect::<Vec<Option<f64>>>();
    let extracted_provisional_average = bounded(SLOT_PROVISIONAL, "provisional average");
    let extracted_partial_average = bounded(SLOT_PARTIAL, "partial average");

    Course {
        grades,
        absences: slot(SLOT_ABSENCES)
            .filter(|value| value.fract() == 0.0)
            .map(|value| value as u32)
            .unwrap_or(0),
        extra_points: slot(SLOT_EXTRA_POINTS).unwrap_or(0.0),
        extracted_provisional_average,
        extracted_partial_average,
        ..Course::new(name)
    }
}
