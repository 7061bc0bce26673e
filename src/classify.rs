//! Threshold colour scale for AQI means.

use crate::config::ScaleConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScaleError {
    #[error("expected {expected} colors for {breakpoints} breakpoints, got {actual}")]
    ColorCount {
        breakpoints: usize,
        expected: usize,
        actual: usize,
    },
    #[error("expected one legend label per color ({colors}), got {labels}")]
    LabelCount { colors: usize, labels: usize },
    #[error("breakpoints must be finite and strictly ascending")]
    Unordered,
    #[error("fallback color {0} is also used by a bucket")]
    AmbiguousFallback(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub color: String,
    pub label: String,
}

/// Step function from an AQI score to a colour. Bucket `i` covers
/// `[breakpoints[i-1], breakpoints[i])`; the outer buckets are open-ended.
#[derive(Debug, Clone)]
pub struct ThresholdScale {
    breakpoints: Vec<f64>,
    colors: Vec<String>,
    fallback: String,
    labels: Vec<String>,
}

impl ThresholdScale {
    pub fn new(
        breakpoints: Vec<f64>,
        colors: Vec<String>,
        fallback: String,
        labels: Vec<String>,
    ) -> Result<Self, ScaleError> {
        if colors.len() != breakpoints.len() + 1 {
            return Err(ScaleError::ColorCount {
                breakpoints: breakpoints.len(),
                expected: breakpoints.len() + 1,
                actual: colors.len(),
            });
        }
        if labels.len() != colors.len() {
            return Err(ScaleError::LabelCount {
                colors: colors.len(),
                labels: labels.len(),
            });
        }
        if breakpoints.iter().any(|b| !b.is_finite()) || breakpoints.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ScaleError::Unordered);
        }
        if colors.iter().any(|c| c.eq_ignore_ascii_case(&fallback)) {
            return Err(ScaleError::AmbiguousFallback(fallback));
        }

        Ok(Self {
            breakpoints,
            colors,
            fallback,
            labels,
        })
    }

    pub fn from_config(config: &ScaleConfig) -> Result<Self, ScaleError> {
        Self::new(
            config.breakpoints.clone(),
            config.colors.clone(),
            config.fallback.clone(),
            config.labels.clone(),
        )
    }

    /// Bucket index for a score; a score equal to a breakpoint lands in the higher bucket.
    pub fn bucket(&self, score: f64) -> usize {
        self.breakpoints.partition_point(|&b| b <= score)
    }

    pub fn classify(&self, score: f64) -> &str {
        &self.colors[self.bucket(score)]
    }

    /// Colour for an optional score. Missing and NaN scores get the fallback.
    pub fn color_for(&self, score: Option<f64>) -> &str {
        match score {
            Some(s) if !s.is_nan() => self.classify(s),
            _ => &self.fallback,
        }
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.colors
            .iter()
            .zip(&self.labels)
            .map(|(color, label)| LegendEntry {
                color: color.clone(),
                label: label.clone(),
            })
            .collect()
    }
}

impl Default for ThresholdScale {
    fn default() -> Self {
        let config = ScaleConfig::default();
        Self {
            breakpoints: config.breakpoints,
            colors: config.colors,
            fallback: config.fallback,
            labels: config.labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("#00000{}", i)).collect()
    }

    #[test]
    fn test_boundaries_go_to_higher_bucket() {
        let scale = ThresholdScale::default();
        assert_eq!(scale.classify(49.99), "#cbeef3");
        assert_eq!(scale.classify(50.0), "#f49cbb");
        assert_eq!(scale.classify(99.99), "#f49cbb");
        assert_eq!(scale.classify(100.0), "#f26a8d");
        assert_eq!(scale.classify(299.99), "#880d1e");
        assert_eq!(scale.classify(300.0), "#720026");
        assert_eq!(scale.classify(301.0), "#720026");
    }

    #[test]
    fn test_extremes() {
        let scale = ThresholdScale::default();
        assert_eq!(scale.bucket(-5.0), 0);
        assert_eq!(scale.bucket(0.0), 0);
        assert_eq!(scale.bucket(f64::INFINITY), 5);
    }

    #[test]
    fn test_missing_score_uses_fallback() {
        let scale = ThresholdScale::default();
        assert_eq!(scale.color_for(None), "#ccc");
        assert_eq!(scale.color_for(Some(f64::NAN)), "#ccc");
        assert_ne!(scale.color_for(None), scale.classify(0.0));
        assert_eq!(scale.color_for(Some(0.0)), "#cbeef3");
    }

    #[test]
    fn test_legend_pairs_colors_with_labels() {
        let legend = ThresholdScale::default().legend();
        assert_eq!(legend.len(), 6);
        assert_eq!(legend[0].label, "Good (0–50)");
        assert_eq!(legend[5].color, "#720026");
        assert_eq!(legend[5].label, "Hazardous (301+)");
    }

    #[test]
    fn test_default_matches_config() {
        assert!(ThresholdScale::from_config(&ScaleConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_wrong_color_count() {
        let err = ThresholdScale::new(vec![1.0, 2.0], colors(2), "#ccc".into(), vec![String::new(); 2])
            .unwrap_err();
        assert_eq!(
            err,
            ScaleError::ColorCount {
                breakpoints: 2,
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_rejects_unsorted_breakpoints() {
        let err = ThresholdScale::new(vec![2.0, 1.0], colors(3), "#ccc".into(), vec![String::new(); 3])
            .unwrap_err();
        assert_eq!(err, ScaleError::Unordered);

        let err = ThresholdScale::new(vec![1.0, 1.0], colors(3), "#ccc".into(), vec![String::new(); 3])
            .unwrap_err();
        assert_eq!(err, ScaleError::Unordered);
    }

    #[test]
    fn test_rejects_fallback_shared_with_bucket() {
        let err = ThresholdScale::new(vec![1.0], colors(2), "#000001".into(), vec![String::new(); 2])
            .unwrap_err();
        assert_eq!(err, ScaleError::AmbiguousFallback("#000001".to_string()));
    }

    #[test]
    fn test_rejects_label_mismatch() {
        let err = ThresholdScale::new(vec![1.0], colors(2), "#ccc".into(), vec![String::new(); 1])
            .unwrap_err();
        assert_eq!(err, ScaleError::LabelCount { colors: 2, labels: 1 });
    }
}
