use crate::model::{
    Course, CourseResult, GRADE_SLOTS, GradedCourse, MAX_GRADE, ReportSummary, Status,
};
use crate::util::round2;

pub const DEFAULT_MINIMUM_AVERAGE: f64 = 7.0;
const RECOVERY_RATIO: f64 = 0.6;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MinimumAverage(f64);

impl MinimumAverage {
    pub fn new(value: f64) -> Option<Self> {
        (value.is_finite() && (0.0..=MAX_GRADE).contains(&value)).then_some(Self(value))
    }

    pub fn or_default(value: Option<f64>) -> Self {
        value.and_then(Self::new).unwrap_or_default()
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for MinimumAverage {
    fn default() -> Self {
        Self(DEFAULT_MINIMUM_AVERAGE)
    }
}

pub fn calculate(course: &Course, minimum: MinimumAverage) -> CourseResult {
    let minimum = minimum.value();
    let recorded = course.recorded_grades().collect::<Vec<f64>>();
    let count = recorded.len();
    let sum = recorded.iter().sum::<f64>();
    let extra_points = course.extra_points.max(0.0);

    let provisional_average = course.extracted_provisional_average.unwrap_or(if count == 0 {
        0.0
    } else {
        sum / count as f64
    });
    let partial_average = course
        .extracted_partial_average
        .unwrap_or((provisional_average + extra_points).min(MAX_GRADE))
        .clamp(0.0, MAX_GRADE);

    let (required_next_grade, status) = match count {
        0 => (Some(minimum), Status::NoGrades),
        GRADE_SLOTS.. => (None, threshold_status(partial_average, minimum)),
        _ => {
            let remaining = (GRADE_SLOTS - count) as f64;
            let needed_total = minimum * GRADE_SLOTS as f64;
            let required = (needed_total - (sum + extra_points)) / remaining;

            let exposed = (required > 0.0 && required <= MAX_GRADE).then(|| round2(required));
            let status = if required > MAX_GRADE {
                Status::Recovery
            } else {
                threshold_status(partial_average, minimum)
            };
            (exposed, status)
        }
    };

    CourseResult {
        provisional_average: round2(provisional_average),
        partial_average: round2(partial_average),
        grades_recorded_count: count,
        required_next_grade,
        status,
        minimum_average: minimum,
    }
}

fn threshold_status(partial_average: f64, minimum: f64) -> Status {
    if partial_average >= minimum {
        Status::Passed
    } else if partial_average >= minimum * RECOVERY_RATIO {
        Status::Recovery
    } else {
        Status::Failed
    }
}

pub fn grade_course(course: Course, minimum: MinimumAverage) -> GradedCourse {
    let result = calculate(&course, minimum);
    GradedCourse { course, result }
}

pub fn recalculate(courses: &[Course], minimum: MinimumAverage) -> Vec<GradedCourse> {
    courses
        .iter()
        .cloned()
        .map(|mut course| {
            course.normalize_grade_slots();
            grade_course(course, minimum)
        })
        .collect()
}

pub fn summarize(courses: &[GradedCourse]) -> ReportSummary {
    let total = courses.len();
    let count_status = |status: Status| {
        courses
            .iter()
            .filter(|graded| graded.result.status == status)
            .count()
    };
    let passed = count_status(Status::Passed);

    let (overall_average, pass_rate) = if total == 0 {
        (0.0, 0.0)
    } else {
        let partial_sum = courses
            .iter()
            .map(|graded| graded.result.partial_average)
            .sum::<f64>();
        (
            round2(partial_sum / total as f64),
            round2(passed as f64 / total as f64 * 100.0),
        )
    };

    ReportSummary {
        total,
        passed,
        recovery: count_status(Status::Recovery),
        failed: count_status(Status::Failed),
        no_grades: count_status(Status::NoGrades),
        overall_average,
        pass_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_with(grades: [Option<f64>; 3], extra_points: f64) -> Course {
        Course {
            grades: grades.to_vec(),
            extra_points,
            ..Course::new("MATEMÁTICA")
        }
    }

    fn minimum(value: f64) -> MinimumAverage {
        MinimumAverage::new(value).unwrap()
    }

    #[test]
    fn two_grades_meeting_minimum_pass() {
        let result = calculate(&course_with([Some(8.0), Some(6.0), None], 0.0), minimum(7.0));

        assert_eq!(result.provisional_average, 7.0);
        assert_eq!(result.partial_average, 7.0);
        assert_eq!(result.grades_recorded_count, 2);
        assert_eq!(result.status, Status::Passed);
        // 21 - 14 leaves exactly 7.0 for the last assessment.
        assert_eq!(result.required_next_grade, Some(7.0));
    }

    #[test]
    fn unreachable_minimum_is_recovery_without_required_grade() {
        let result = calculate(&course_with([Some(2.0), Some(3.0), None], 0.0), minimum(7.0));

        assert_eq!(result.required_next_grade, None);
        assert_eq!(result.status, Status::Recovery);
        assert_eq!(result.provisional_average, 2.5);
    }

    #[test]
    fn no_grades_requires_the_minimum() {
        let result = calculate(&course_with([None, None, None], 0.0), minimum(6.5));

        assert_eq!(result.status, Status::NoGrades);
        assert_eq!(result.required_next_grade, Some(6.5));
        assert_eq!(result.provisional_average, 0.0);
        assert_eq!(result.grades_recorded_count, 0);
    }

    #[test]
    fn extra_points_lift_partial_average_into_recovery() {
        let result = calculate(
            &course_with([Some(5.0), Some(5.0), Some(5.0)], 1.5),
            minimum(7.0),
        );

        assert_eq!(result.provisional_average, 5.0);
        assert_eq!(result.partial_average, 6.5);
        assert_eq!(result.required_next_grade, None);
        assert_eq!(result.status, Status::Recovery);
    }

    #[test]
    fn low_complete_course_fails() {
        let result = calculate(
            &course_with([Some(2.0), Some(3.0), Some(4.0)], 0.0),
            minimum(7.0),
        );
        assert_eq!(result.partial_average, 3.0);
        assert_eq!(result.status, Status::Failed);
    }

    #[test]
    fn zero_is_a_recorded_grade() {
        let result = calculate(&course_with([Some(0.0), None, None], 0.0), minimum(7.0));
        assert_eq!(result.grades_recorded_count, 1);
        assert_eq!(result.status, Status::Recovery);
        assert_eq!(result.required_next_grade, None);
    }

    #[test]
    fn single_grade_reports_split_requirement() {
        let result = calculate(&course_with([Some(9.0), None, None], 0.0), minimum(7.0));
        // (21 - 9) / 2
        assert_eq!(result.required_next_grade, Some(6.0));
        assert_eq!(result.status, Status::Passed);
    }

    #[test]
    fn already_secured_course_hides_required_grade() {
        let result = calculate(&course_with([Some(10.0), Some(10.0), None], 2.0), minimum(7.0));
        assert_eq!(result.required_next_grade, None);
        assert_eq!(result.status, Status::Passed);
    }

    #[test]
    fn partial_average_is_capped_at_ten() {
        for extra in [0.0, 1.0, 4.5, 50.0, 1e9] {
            let result = calculate(
                &course_with([Some(9.5), Some(10.0), Some(9.0)], extra),
                minimum(7.0),
            );
            assert!((0.0..=10.0).contains(&result.partial_average));
        }
    }

    #[test]
    fn extracted_averages_override_computed_ones() {
        let course = Course {
            extracted_provisional_average: Some(6.33),
            extracted_partial_average: Some(6.83),
            ..course_with([Some(6.0), Some(6.5), Some(6.5)], 0.5)
        };

        let result = calculate(&course, minimum(6.0));
        assert_eq!(result.provisional_average, 6.33);
        assert_eq!(result.partial_average, 6.83);
        assert_eq!(result.status, Status::Passed);
    }

    #[test]
    fn complete_courses_never_expose_required_grade() {
        for value in [0.0, 3.5, 7.0, 10.0] {
            let result = calculate(
                &course_with([Some(value), Some(value), Some(value)], 0.0),
                minimum(7.0),
            );
            assert_eq!(result.required_next_grade, None);
        }
    }

    #[test]
    fn minimum_average_falls_back_to_default() {
        assert_eq!(MinimumAverage::or_default(None).value(), 7.0);
        assert_eq!(MinimumAverage::or_default(Some(f64::NAN)).value(), 7.0);
        assert_eq!(MinimumAverage::or_default(Some(11.0)).value(), 7.0);
        assert_eq!(MinimumAverage::or_default(Some(-1.0)).value(), 7.0);
        assert_eq!(MinimumAverage::or_default(Some(0.0)).value(), 0.0);
        assert_eq!(MinimumAverage::or_default(Some(6.5)).value(), 6.5);
    }

    #[test]
    fn recalculate_is_repeatable_across_minimums() {
        let courses = vec![
            course_with([Some(8.0), Some(6.0), None], 0.0),
            course_with([Some(4.0), Some(5.5), Some(6.0)], 1.0),
            course_with([None, None, None], 0.0),
        ];

        let first = recalculate(&courses, minimum(6.0));
        let _ = recalculate(&courses, minimum(9.0));
        let second = recalculate(&courses, minimum(6.0));
        assert_eq!(first, second);
        assert_eq!(first[2].result.required_next_grade, Some(6.0));
    }

    #[test]
    fn recalculate_normalizes_grade_slots() {
        let course = Course {
            grades: vec![Some(7.0), None, Some(8.0), None, Some(1.0)],
            ..Course::new("FILOSOFIA")
        };

        let graded = recalculate(&[course], MinimumAverage::default());
        assert_eq!(graded[0].course.grades, vec![Some(7.0), None, Some(8.0)]);
        assert_eq!(graded[0].result.grades_recorded_count, 2);

        let short = Course {
            grades: vec![Some(7.0)],
            ..Course::new("FILOSOFIA")
        };
        let graded = recalculate(&[short], MinimumAverage::default());
        assert_eq!(graded[0].course.grades, vec![Some(7.0), None, None]);
    }

    #[test]
    fn summary_counts_statuses_and_pass_rate() {
        let courses = recalculate(
            &[
                course_with([Some(9.0), Some(9.0), Some(9.0)], 0.0),
                course_with([Some(5.0), Some(5.0), Some(5.0)], 0.0),
                course_with([Some(1.0), Some(1.0), Some(1.0)], 0.0),
                course_with([None, None, None], 0.0),
            ],
            minimum(7.0),
        );

        let summary = summarize(&courses);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.recovery, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.no_grades, 1);
        assert_eq!(summary.overall_average, 3.75);
        assert_eq!(summary.pass_rate, 25.0);
    }

    #[test]
    fn empty_summary_is_zeroed() {
        assert_eq!(summarize(&[]), ReportSummary::default());
    }
}
