use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::ExtractArgs;
use crate::commands::{emit_json, resolve_minimum};
use crate::extraction::{Extraction, ReportCardExtractor};
use crate::model::ExtractionManifest;
use crate::ocr::{TesseractRecognizer, TextRecognizer};
use crate::util::{now_utc_string, sha256_text, utc_compact_string, write_json_pretty};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let minimum = resolve_minimum(args.minimum_average);

    let (text, source_path, source_kind) = match (&args.text_path, &args.image_path) {
        (Some(path), _) => (read_text(path)?, path, "text"),
        (None, Some(path)) => {
            let recognizer = TesseractRecognizer::new(args.ocr_lang.as_str());
            let text = recognizer
                .recognize(path)
                .with_context(|| format!("OCR failed for {}", path.display()))?;
            (text, path, "ocr")
        }
        (None, None) => bail!("either --text-path or --image-path is required"),
    };

    let extractor = ReportCardExtractor::new()?;
    let extraction = extractor.extract(&text, minimum);
    log_extraction(&extraction);

    emit_json(args.out.as_deref(), &extraction.report)?;

    if let Some(manifest_path) = &args.manifest_path {
        let manifest = ExtractionManifest {
            manifest_version: MANIFEST_VERSION,
            run_id: format!("extract-{}", utc_compact_string(started_ts)),
            generated_at: now_utc_string(),
            source_path: source_path.display().to_string(),
            source_kind: source_kind.to_string(),
            source_sha256: sha256_text(&text),
            line_count: extraction.line_count,
            minimum_average: minimum.value(),
            course_count: extraction.report.courses.len(),
            header_complete: extraction.header_complete,
            scan: extraction.scan.clone(),
            warnings: extraction.report.warnings.clone(),
        };
        write_json_pretty(manifest_path, &manifest)?;
        info!(path = %manifest_path.display(), "wrote extraction manifest");
    }

    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn log_extraction(extraction: &Extraction) {
    let report = &extraction.report;

    if !extraction.scan.table_found {
        warn!("no grade table header found; no courses extracted");
    }
    if !extraction.header_complete {
        warn!(
            student = report.student_name.is_some(),
            registration = report.registration_id.is_some(),
            section = report.section_id.is_some(),
            period = report.period_label.is_some(),
            "header fields incomplete"
        );
    }
    for warning in &report.warnings {
        warn!(warning = %warning, "extraction warning");
    }

    for graded in &report.courses {
        debug!(
            course = %graded.course.canonical_name,
            status = graded.result.status.as_str(),
            partial_average = graded.result.partial_average,
            required_next_grade = ?graded.result.required_next_grade,
            "course graded"
        );
    }

    info!(
        student = %report.student_name.as_deref().unwrap_or_default(),
        period = %report.period_label.as_deref().unwrap_or_default(),
        courses = report.summary.total,
        passed = report.summary.passed,
        recovery = report.summary.recovery,
        failed = report.summary.failed,
        no_grades = report.summary.no_grades,
        overall_average = report.summary.overall_average,
        "extraction completed"
    );
}
