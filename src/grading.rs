// src/grading.rs

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A grade band: the lowest percentage that earns `grade`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeBand {
    pub grade: &'static str,
    pub min_percentage: f64,
}

const EXTENDED_BANDS: &[GradeBand] = &[
    GradeBand { grade: "A+", min_percentage: 90.0 },
    GradeBand { grade: "A", min_percentage: 80.0 },
    GradeBand { grade: "B+", min_percentage: 70.0 },
    GradeBand { grade: "B", min_percentage: 60.0 },
    GradeBand { grade: "C+", min_percentage: 50.0 },
    GradeBand { grade: "C", min_percentage: 40.0 },
    GradeBand { grade: "D", min_percentage: 33.0 },
    GradeBand { grade: "F", min_percentage: 0.0 },
];

const COMPACT_BANDS: &[GradeBand] = &[
    GradeBand { grade: "A+", min_percentage: 90.0 },
    GradeBand { grade: "A", min_percentage: 80.0 },
    GradeBand { grade: "B", min_percentage: 70.0 },
    GradeBand { grade: "C", min_percentage: 60.0 },
    GradeBand { grade: "D", min_percentage: 50.0 },
    GradeBand { grade: "F", min_percentage: 0.0 },
];

/// Percentage-to-grade table used by every report.
/// Chosen once through configuration (`GRADE_SCALE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradeScale {
    /// 90/80/70/60/50/40/33, pass at 33%.
    #[default]
    Extended,
    /// 90/80/70/60/50, pass at 50%.
    Compact,
}

impl GradeScale {
    /// Bands ordered from the highest threshold down; the last one is the fail band.
    pub fn bands(&self) -> &'static [GradeBand] {
        match self {
            GradeScale::Extended => EXTENDED_BANDS,
            GradeScale::Compact => COMPACT_BANDS,
        }
    }

    pub fn grade_for(&self, percentage: f64) -> &'static str {
        self.bands()
            .iter()
            .find(|b| percentage >= b.min_percentage)
            .map(|b| b.grade)
            .unwrap_or("F")
    }

    /// Lowest non-failing threshold.
    pub fn pass_percentage(&self) -> f64 {
        let bands = self.bands();
        bands
            .iter()
            .rev()
            .find(|b| b.min_percentage > 0.0)
            .map(|b| b.min_percentage)
            .unwrap_or(0.0)
    }

    pub fn is_pass(&self, percentage: f64) -> bool {
        percentage >= self.pass_percentage()
    }

    /// Marks-range label for each band on a paper out of `full_marks`,
    /// e.g. `"45-50"` for A+ out of 50.
    pub fn band_ranges(&self, full_marks: f64) -> Vec<(&'static str, String)> {
        let bands = self.bands();
        bands
            .iter()
            .enumerate()
            .map(|(i, band)| {
                let low = full_marks * band.min_percentage / 100.0;
                let high = match i {
                    0 => full_marks,
                    _ => full_marks * bands[i - 1].min_percentage / 100.0,
                };
                (band.grade, format!("{}-{}", format_marks(low), format_marks(high)))
            })
            .collect()
    }
}

impl FromStr for GradeScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extended" => Ok(GradeScale::Extended),
            "compact" => Ok(GradeScale::Compact),
            other => Err(format!("unknown grade scale '{}'", other)),
        }
    }
}

impl fmt::Display for GradeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeScale::Extended => write!(f, "extended"),
            GradeScale::Compact => write!(f, "compact"),
        }
    }
}

/// `obtained / total * 100`, `None` when `total` is zero.
pub fn percentage(obtained: f64, total: f64) -> Option<f64> {
    if total > 0.0 {
        Some(obtained / total * 100.0)
    } else {
        None
    }
}

/// Rounds to two decimals for display.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Middle value; mean of the two middle values for an even count.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

fn format_marks(x: f64) -> String {
    let rounded = round2(x);
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{}", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_scale_bands() {
        let scale = GradeScale::Extended;
        assert_eq!(scale.grade_for(100.0), "A+");
        assert_eq!(scale.grade_for(90.0), "A+");
        assert_eq!(scale.grade_for(89.99), "A");
        assert_eq!(scale.grade_for(72.0), "B+");
        assert_eq!(scale.grade_for(45.0), "C");
        assert_eq!(scale.grade_for(33.0), "D");
        assert_eq!(scale.grade_for(32.9), "F");
        assert_eq!(scale.pass_percentage(), 33.0);
    }

    #[test]
    fn compact_scale_bands() {
        let scale = GradeScale::Compact;
        assert_eq!(scale.grade_for(75.0), "B");
        assert_eq!(scale.grade_for(50.0), "D");
        assert_eq!(scale.grade_for(45.0), "F");
        assert_eq!(scale.pass_percentage(), 50.0);
        assert!(!scale.is_pass(49.0));
    }

    #[test]
    fn scale_parses_from_config_strings() {
        assert_eq!("Extended".parse::<GradeScale>(), Ok(GradeScale::Extended));
        assert_eq!(" compact ".parse::<GradeScale>(), Ok(GradeScale::Compact));
        assert!("strict".parse::<GradeScale>().is_err());
    }

    #[test]
    fn median_handles_odd_and_even_counts() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[7.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn band_ranges_follow_full_marks() {
        let ranges = GradeScale::Extended.band_ranges(50.0);
        assert_eq!(ranges[0], ("A+", "45-50".to_string()));
        assert_eq!(ranges[1], ("A", "40-45".to_string()));
        assert_eq!(ranges[6], ("D", "16.5-20".to_string()));
        assert_eq!(ranges[7], ("F", "0-16.5".to_string()));
    }

    #[test]
    fn percentage_of_empty_total_is_none() {
        assert_eq!(percentage(10.0, 0.0), None);
        assert_eq!(percentage(25.0, 50.0), Some(50.0));
    }
}
