//! Labeled image sample size estimation
//!
//! How many labeled images are needed so that each detection class has
//! enough boxes for a target margin of error, using the proportion sample
//! size equation `n = z² p (1 - p) / E²`.

use std::fmt;

use serde::Serialize;

use crate::error::{IngestError, Result};

pub const DEFAULT_CLASS_BOXES: &str = "header:1,body:1,footer:1";
pub const DEFAULT_CONFIDENCE: f64 = 0.95;
pub const DEFAULT_MARGIN: f64 = 0.05;
pub const DEFAULT_BASE_RATE: f64 = 0.5;

/// A detection class and how many boxes of it a typical image carries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassBoxes {
    pub name: String,
    pub boxes_per_image: f64,
}

/// Parse `name:boxes` pairs separated by commas, keeping input order
///
/// Blank chunks are skipped; a repeated name keeps its last value.
pub fn parse_class_boxes(raw: &str) -> Result<Vec<ClassBoxes>> {
    let mut classes: Vec<ClassBoxes> = Vec::new();

    for chunk in raw.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        let (name, value) = chunk.split_once(':').ok_or_else(|| {
            IngestError::InvalidArgument(format!("expected name:value pair, got '{}'", chunk))
        })?;
        let name = name.trim().to_string();
        let boxes_per_image: f64 = value.trim().parse().map_err(|_| {
            IngestError::InvalidArgument(format!("invalid boxes_per_image in '{}'", chunk))
        })?;

        match classes.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.boxes_per_image = boxes_per_image,
            None => classes.push(ClassBoxes { name, boxes_per_image }),
        }
    }

    if classes.is_empty() {
        return Err(IngestError::InvalidArgument(
            "at least one class:value pair is required".to_string(),
        ));
    }
    Ok(classes)
}

/// Accept a fraction in (0, 1) or a percentage in (1, 100)
pub fn normalize_confidence(confidence: f64) -> Result<f64> {
    let c = if confidence > 1.0 {
        if confidence >= 100.0 {
            return Err(IngestError::InvalidArgument(
                "confidence percentage must be less than 100".to_string(),
            ));
        }
        confidence / 100.0
    } else {
        confidence
    };

    if !(c > 0.0 && c < 1.0) {
        return Err(IngestError::InvalidArgument(
            "confidence must be in (0, 1)".to_string(),
        ));
    }
    Ok(c)
}

/// Two-sided z score for a confidence level in (0, 1)
pub fn z_score(confidence: f64) -> Result<f64> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(IngestError::InvalidArgument(
            "confidence must be in (0, 1)".to_string(),
        ));
    }
    Ok(normal_quantile(0.5 + confidence / 2.0))
}

/// Boxes per class needed for margin `margin` at base rate `base_rate`
pub fn required_boxes(z: f64, margin: f64, base_rate: f64) -> Result<f64> {
    check_unit("margin", margin)?;
    check_unit("base_rate", base_rate)?;
    Ok(z * z * base_rate * (1.0 - base_rate) / (margin * margin))
}

/// Worst-case margin achieved by `boxes` labeled boxes
pub fn margin_from_boxes(z: f64, base_rate: f64, boxes: f64) -> Result<f64> {
    if boxes <= 0.0 {
        return Err(IngestError::InvalidArgument("boxes must be positive".to_string()));
    }
    Ok(z * (base_rate * (1.0 - base_rate) / boxes).sqrt())
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(IngestError::InvalidArgument(format!("{} must be in (0, 1)", name)))
    }
}

/// Inverse standard normal CDF (Acklam's rational approximation)
///
/// Relative error below 1.2e-9 over (0, 1). Returns ±infinity at the
/// endpoints and NaN outside [0, 1].
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassEstimate {
    pub name: String,
    pub boxes_per_image: f64,
    pub images_needed: u64,
}

/// Margin achieved per class with the current number of labeled images
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievedMargin {
    pub name: String,
    pub labeled_boxes: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleSizeEstimate {
    pub confidence: f64,
    pub margin: f64,
    pub base_rate: f64,
    pub z: f64,
    pub boxes_per_class: u64,
    pub classes: Vec<ClassEstimate>,
    pub recommended_images: u64,
    pub current_images: Option<u64>,
    pub achieved: Vec<AchievedMargin>,
}

#[derive(Debug, Clone)]
pub struct SampleSizeEstimator {
    pub classes: Vec<ClassBoxes>,
    pub confidence: f64,
    pub margin: f64,
    pub base_rate: f64,
    pub current_images: Option<u64>,
}

impl Default for SampleSizeEstimator {
    fn default() -> Self {
        Self {
            classes: ["header", "body", "footer"]
                .into_iter()
                .map(|name| ClassBoxes {
                    name: name.to_string(),
                    boxes_per_image: 1.0,
                })
                .collect(),
            confidence: DEFAULT_CONFIDENCE,
            margin: DEFAULT_MARGIN,
            base_rate: DEFAULT_BASE_RATE,
            current_images: None,
        }
    }
}

impl SampleSizeEstimator {
    pub fn estimate(&self) -> Result<SampleSizeEstimate> {
        if self.classes.is_empty() {
            return Err(IngestError::InvalidArgument(
                "at least one class is required".to_string(),
            ));
        }

        let confidence = normalize_confidence(self.confidence)?;
        let z = z_score(confidence)?;
        let boxes_needed = required_boxes(z, self.margin, self.base_rate)?;

        let mut classes = Vec::with_capacity(self.classes.len());
        for class in &self.classes {
            if !(class.boxes_per_image > 0.0) {
                return Err(IngestError::InvalidArgument(format!(
                    "boxes_per_image for {} must be positive",
                    class.name
                )));
            }
            classes.push(ClassEstimate {
                name: class.name.clone(),
                boxes_per_image: class.boxes_per_image,
                images_needed: (boxes_needed / class.boxes_per_image).ceil() as u64,
            });
        }

        let recommended_images = classes.iter().map(|c| c.images_needed).max().unwrap_or(0);

        let mut achieved = Vec::new();
        if let Some(images) = self.current_images.filter(|&n| n > 0) {
            for class in &self.classes {
                let labeled_boxes = images as f64 * class.boxes_per_image;
                achieved.push(AchievedMargin {
                    name: class.name.clone(),
                    labeled_boxes,
                    margin: margin_from_boxes(z, self.base_rate, labeled_boxes)?,
                });
            }
        }

        Ok(SampleSizeEstimate {
            confidence,
            margin: self.margin,
            base_rate: self.base_rate,
            z,
            boxes_per_class: boxes_needed.ceil() as u64,
            classes,
            recommended_images,
            current_images: self.current_images,
            achieved,
        })
    }
}

impl fmt::Display for SampleSizeEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Target margin ±{:.1}% at {:.1}% confidence (z={:.2}) with base rate {:.2}",
            self.margin * 100.0,
            self.confidence * 100.0,
            self.z,
            self.base_rate
        )?;
        writeln!(f, "Required boxes per class: {}", self.boxes_per_class)?;
        writeln!(f, "Images needed per class:")?;
        for class in &self.classes {
            writeln!(f, "  - {}: {}", class.name, class.images_needed)?;
        }
        writeln!(f, "Recommended labeled images: {}", self.recommended_images)?;

        if let Some(images) = self.current_images.filter(|_| !self.achieved.is_empty()) {
            writeln!(f)?;
            writeln!(f, "With {} labeled images:", images)?;
            for a in &self.achieved {
                writeln!(
                    f,
                    "  - {}: worst-case margin ±{:.1}% ({} labeled boxes)",
                    a.name,
                    a.margin * 100.0,
                    a.labeled_boxes
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_quantile_reference_points() {
        assert!(normal_quantile(0.5).abs() < 1e-9);
        assert!((normal_quantile(0.975) - 1.959963984540054).abs() < 1e-6);
        assert!((normal_quantile(0.995) - 2.5758293035489).abs() < 1e-6);
        assert!((normal_quantile(0.01) + 2.3263478740408408).abs() < 1e-6);
        assert!(normal_quantile(1.5).is_nan());
    }

    #[test]
    fn test_z_score_95() {
        let z = z_score(0.95).unwrap();
        assert!((z - 1.96).abs() < 0.001);
    }

    #[test]
    fn test_default_estimate() {
        let estimate = SampleSizeEstimator::default().estimate().unwrap();
        assert_eq!(estimate.boxes_per_class, 385);
        assert_eq!(estimate.recommended_images, 385);
        assert_eq!(estimate.classes.len(), 3);
        assert!(estimate.to_string().contains("Recommended labeled images: 385"));
    }

    #[test]
    fn test_boxes_per_image_divides() {
        let estimator = SampleSizeEstimator {
            classes: parse_class_boxes("header:1, body:4").unwrap(),
            ..Default::default()
        };
        let estimate = estimator.estimate().unwrap();
        // 384.15 / 4 rounds up to 97
        assert_eq!(estimate.classes[1].images_needed, 97);
        assert_eq!(estimate.recommended_images, 385);
    }

    #[test]
    fn test_percentage_confidence() {
        assert!((normalize_confidence(95.0).unwrap() - 0.95).abs() < 1e-12);
        assert!(normalize_confidence(100.0).is_err());
        assert!(normalize_confidence(0.0).is_err());
    }

    #[test]
    fn test_achieved_margin() {
        let estimator = SampleSizeEstimator {
            current_images: Some(100),
            ..Default::default()
        };
        let estimate = estimator.estimate().unwrap();
        // 1.96 * sqrt(0.25 / 100)
        assert!((estimate.achieved[0].margin - 0.098).abs() < 0.001);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_class_boxes("header").is_err());
        assert!(parse_class_boxes(" , ").is_err());
        assert!(parse_class_boxes("header:x").is_err());

        let zero = SampleSizeEstimator {
            classes: parse_class_boxes("header:0").unwrap(),
            ..Default::default()
        };
        assert!(zero.estimate().is_err());
    }

    #[test]
    fn test_invalid_margin() {
        let estimator = SampleSizeEstimator {
            margin: 1.5,
            ..Default::default()
        };
        assert!(matches!(estimator.estimate(), Err(IngestError::InvalidArgument(_))));
    }
}
