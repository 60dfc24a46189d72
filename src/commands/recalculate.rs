use std::fs;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::RecalculateArgs;
use crate::commands::{emit_json, resolve_minimum};
use crate::extraction::COURSE_CATALOG;
use crate::grading::{recalculate, summarize};
use crate::model::Course;

pub fn run(args: RecalculateArgs) -> Result<()> {
    let minimum = resolve_minimum(args.minimum_average);
    let raw = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse JSON in {}", args.input.display()))?;
    let courses = parse_courses(value)
        .with_context(|| format!("invalid recalculate input {}", args.input.display()))?;

    let graded = recalculate(&courses, minimum);
    let summary = summarize(&graded);
    info!(
        courses = summary.total,
        minimum_average = minimum.value(),
        passed = summary.passed,
        recovery = summary.recovery,
        failed = summary.failed,
        no_grades = summary.no_grades,
        "recalculation completed"
    );

    emit_json(args.out.as_deref(), &graded)
}

fn parse_courses(value: Value) -> Result<Vec<Course>> {
    let Value::Array(items) = value else {
        bail!("recalculate input must be a JSON array of courses");
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut course = serde_json::from_value::<Course>(item)
                .with_context(|| format!("course at index {index} is malformed"))?;
            if !COURSE_CATALOG.contains(&course.canonical_name.as_str()) {
                bail!(
                    "course at index {index} has unknown name {:?}",
                    course.canonical_name
                );
            }
            for warning in course.discard_out_of_range() {
                warn!(index, warning = %warning, "recalculate input value dropped");
            }
            Ok(course)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::grading::{MinimumAverage, grade_course};
    use crate::model::Status;

    #[test]
    fn parses_plain_course_array() {
        let courses = parse_courses(json!([
            {"canonical_name": "MATEMÁTICA", "grades": [8.0, 6.0, null]},
            {"canonical_name": "FILOSOFIA"}
        ]))
        .unwrap();

        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].grades, vec![Some(8.0), Some(6.0), None]);
        assert_eq!(courses[1].absences, 0);
        assert!(courses[1].grades.is_empty());
    }

    #[test]
    fn rejects_non_array_input() {
        let error = parse_courses(json!({"courses": []})).unwrap_err();
        assert!(error.to_string().contains("JSON array"));
    }

    #[test]
    fn reports_index_of_malformed_course() {
        let error = parse_courses(json!([
            {"canonical_name": "GEOGRAFIA"},
            {"grades": [1.0]}
        ]))
        .unwrap_err();
        assert!(error.to_string().contains("index 1"));
    }

    #[test]
    fn rejects_names_outside_the_catalog() {
        let error = parse_courses(json!([
            {"canonical_name": "MATEMÁTICA"},
            {"canonical_name": "SOCIOLOGIA", "grades": [7.0, 7.0, 7.0]}
        ]))
        .unwrap_err();
        assert!(error.to_string().contains("index 1"));
        assert!(error.to_string().contains("SOCIOLOGIA"));
    }

    #[test]
    fn out_of_range_values_become_missing() {
        let courses = parse_courses(json!([{
            "canonical_name": "INGLÊS",
            "grades": [12.0, 8.0, -1.0],
            "extracted_provisional_average": 6.5,
            "extracted_partial_average": 15.0
        }]))
        .unwrap();

        let course = &courses[0];
        assert_eq!(course.grades, vec![None, Some(8.0), None]);
        assert_eq!(course.extracted_provisional_average, Some(6.5));
        assert_eq!(course.extracted_partial_average, None);

        let graded = recalculate(&courses, MinimumAverage::default());
        assert_eq!(graded[0].course.grades, vec![None, Some(8.0), None]);
        assert_eq!(graded[0].result.grades_recorded_count, 1);
        assert!((0.0..=10.0).contains(&graded[0].result.partial_average));
    }

    #[test]
    fn graded_courses_round_back_through_recalculate() {
        let mut course = Course::new("HISTÓRIA");
        course.grades = vec![Some(8.0), Some(6.0), None];
        let graded = grade_course(course, MinimumAverage::default());
        let value = serde_json::to_value(vec![graded.clone()]).unwrap();

        let courses = parse_courses(value).unwrap();
        assert_eq!(courses, vec![graded.course.clone()]);

        let regraded = recalculate(&courses, MinimumAverage::new(9.0).unwrap());
        assert_eq!(regraded[0].result.minimum_average, 9.0);
        assert_eq!(regraded[0].result.status, Status::Recovery);
    }
}
