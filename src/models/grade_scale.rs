use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One row of a grade scale: every percentage from `start_grade` (inclusive) up to the
/// next row maps to `gpa`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeScale {
    #[serde(rename = "StartGrade")]
    pub start_grade: f64,
    #[serde(rename = "GPA")]
    pub gpa: f64,
}

impl GradeScale {
    pub fn new(start_grade: f64, gpa: f64) -> Self {
        Self { start_grade, gpa }
    }

    /// The traditional 4-point scale without letter grades.
    pub fn default_scale() -> Vec<GradeScale> {
        vec![
            Self::new(90.0, 4.0),
            Self::new(80.0, 3.0),
            Self::new(70.0, 2.0),
            Self::new(60.0, 1.0),
            Self::new(0.0, 0.0),
        ]
    }

    pub fn eleven_point_scale() -> Vec<GradeScale> {
        let starts = [93.0, 90.0, 87.0, 83.0, 80.0, 77.0, 73.0, 70.0, 67.0, 63.0, 60.0, 0.0];
        Self::descending(&starts)
    }

    pub fn twelve_point_scale() -> Vec<GradeScale> {
        let starts = [
            97.0, 93.0, 90.0, 87.0, 83.0, 80.0, 77.0, 73.0, 70.0, 67.0, 63.0, 60.0, 0.0,
        ];
        Self::descending(&starts)
    }

    /// Mexico: every whole percent from 100 down to 1 maps to itself.
    pub fn mexico_100_point_scale() -> Vec<GradeScale> {
        (0..100)
            .map(|i| {
                let grade = f64::from(100 - i);
                Self::new(grade, grade)
            })
            .collect()
    }

    /// Mexico: every whole percent from 100 down to 1 maps to a tenth of itself.
    pub fn mexico_10_point_scale() -> Vec<GradeScale> {
        (0..100)
            .map(|i| {
                let grade = f64::from(100 - i);
                Self::new(grade, grade / 10.0)
            })
            .collect()
    }

    /// Rows with GPA counting down from `starts.len() - 1` to 0.
    fn descending(starts: &[f64]) -> Vec<GradeScale> {
        let top = starts.len() - 1;
        starts
            .iter()
            .enumerate()
            .map(|(i, start)| Self::new(*start, (top - i) as f64))
            .collect()
    }

    /// Highest start grade first, the order scales are shown and evaluated in.
    pub fn display_order(a: &GradeScale, b: &GradeScale) -> Ordering {
        b.start_grade.total_cmp(&a.start_grade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scale() {
        let scale = GradeScale::default_scale();
        assert_eq!(scale.len(), 5);
        assert_eq!(scale[0], GradeScale::new(90.0, 4.0));
        assert_eq!(scale[4], GradeScale::new(0.0, 0.0));
    }

    #[test]
    fn test_point_scales() {
        let eleven = GradeScale::eleven_point_scale();
        assert_eq!(eleven[0], GradeScale::new(93.0, 11.0));
        assert_eq!(eleven[2], GradeScale::new(87.0, 9.0));
        assert_eq!(eleven[11], GradeScale::new(0.0, 0.0));

        let twelve = GradeScale::twelve_point_scale();
        assert_eq!(twelve[0], GradeScale::new(97.0, 12.0));
        assert_eq!(twelve[12], GradeScale::new(0.0, 0.0));
    }

    #[test]
    fn test_mexico_scales() {
        let hundred = GradeScale::mexico_100_point_scale();
        assert_eq!(hundred.len(), 100);
        assert_eq!(hundred[0], GradeScale::new(100.0, 100.0));
        assert_eq!(hundred[99], GradeScale::new(1.0, 1.0));

        let ten = GradeScale::mexico_10_point_scale();
        assert_eq!(ten[0], GradeScale::new(100.0, 10.0));
        assert_eq!(ten[10], GradeScale::new(90.0, 9.0));
    }

    #[test]
    fn test_display_order() {
        let mut scale = vec![GradeScale::new(0.0, 0.0), GradeScale::new(90.0, 4.0)];
        scale.sort_by(GradeScale::display_order);
        assert_eq!(scale[0].start_grade, 90.0);
    }

    #[test]
    fn test_json_wire_names() {
        let json = serde_json::to_string(&GradeScale::new(90.0, 4.0)).unwrap();
        assert_eq!(json, r#"{"StartGrade":90.0,"GPA":4.0}"#);
    }
}
