//! Estimators evaluated on an encoded feature vector.
//!
//! Two families cover what the heart disease models are trained with:
//! standardized logistic regression and binary gradient-boosted trees.

use serde::{Deserialize, Serialize};

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Model parameters, tagged by `kind` in the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    LogisticRegression(LogisticRegression),
    GradientBoosting(GradientBoosting),
}

impl Estimator {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LogisticRegression(_) => "logistic_regression",
            Self::GradientBoosting(_) => "gradient_boosting",
        }
    }

    /// Check parameter shapes against the encoded width.
    ///
    /// # Errors
    /// Returns a description of the first inconsistency.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        match self {
            Self::LogisticRegression(m) => m.validate(n_features),
            Self::GradientBoosting(m) => m.validate(n_features),
        }
    }

    /// Positive-class probability for an encoded row.
    #[must_use]
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        match self {
            Self::LogisticRegression(m) => sigmoid(m.decision_function(x)),
            Self::GradientBoosting(m) => sigmoid(m.raw_score(x)),
        }
    }
}

/// Per-column standardization applied before the linear model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
}

impl LogisticRegression {
    fn validate(&self, n: usize) -> Result<(), String> {
        if self.coefficients.len() != n {
            return Err(format!(
                "expected {n} coefficients, got {}",
                self.coefficients.len()
            ));
        }
        if !all_finite(&self.coefficients) || !self.intercept.is_finite() {
            return Err("coefficients must be finite".into());
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err("scaler length does not match feature_columns".into());
            }
            if !all_finite(&scaler.mean) || !all_finite(&scaler.scale) {
                return Err("scaler parameters must be finite".into());
            }
            if scaler.scale.iter().any(|s| *s == 0.0) {
                return Err("scaler scale must be non-zero".into());
            }
        }
        Ok(())
    }

    fn decision_function(&self, x: &[f64]) -> f64 {
        let dot: f64 = match &self.scaler {
            Some(s) => x
                .iter()
                .zip(&self.coefficients)
                .zip(s.mean.iter().zip(&s.scale))
                .map(|((xi, w), (mu, sd))| w * (xi - mu) / sd)
                .sum(),
            None => x.iter().zip(&self.coefficients).map(|(xi, w)| w * xi).sum(),
        };
        self.intercept + dot
    }
}

/// One node of a regression tree. Splits send `x[feature] <= threshold` left.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Children must point strictly forward, which rules out cycles.
    fn validate(&self, n: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n {
                        return Err(format!("node {i}: feature {feature} out of range"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i}: threshold must be finite"));
                    }
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i}: invalid child {child}"));
                        }
                    }
                }
                Node::Leaf { leaf } if !leaf.is_finite() => {
                    return Err(format!("node {i}: leaf value must be finite"));
                }
                Node::Leaf { .. } => {}
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { leaf } => return leaf,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[feature] <= threshold { left } else { right },
            }
        }
    }
}

/// Binary log-loss gradient boosting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub learning_rate: f64,
    pub init_score: f64,
    pub trees: Vec<Tree>,
}

impl GradientBoosting {
    fn validate(&self, n: usize) -> Result<(), String> {
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err("learning_rate must be positive".into());
        }
        if !self.init_score.is_finite() {
            return Err("init_score must be finite".into());
        }
        if self.trees.is_empty() {
            return Err("gradient boosting model has no trees".into());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            tree.validate(n).map_err(|e| format!("tree {t}: {e}"))?;
        }
        Ok(())
    }

    fn raw_score(&self, x: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.evaluate(x)).sum();
        self.init_score + self.learning_rate * sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_with_scaler() {
        let model = Estimator::LogisticRegression(LogisticRegression {
            coefficients: vec![2.0, -1.0],
            intercept: 0.5,
            scaler: Some(StandardScaler {
                mean: vec![10.0, 0.0],
                scale: vec![5.0, 1.0],
            }),
        });
        model.validate(2).expect("Should validate");

        // z = 0.5 + 2 * (15 - 10) / 5 - 1 * 2.5 = 0.0
        let p = model.predict_proba(&[15.0, 2.5]);
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_logistic_shape_errors() {
        let model = LogisticRegression {
            coefficients: vec![1.0],
            intercept: 0.0,
            scaler: Some(StandardScaler {
                mean: vec![0.0],
                scale: vec![0.0],
            }),
        };
        assert!(model.validate(2).is_err());
        assert!(model.validate(1).unwrap_err().contains("non-zero"));
    }

    #[test]
    fn test_tree_traversal() {
        let json = r#"{
            "kind": "gradient_boosting",
            "learning_rate": 0.5,
            "init_score": -1.0,
            "trees": [
                { "nodes": [
                    { "feature": 0, "threshold": 50.0, "left": 1, "right": 2 },
                    { "leaf": -1.0 },
                    { "leaf": 3.0 }
                ] },
                { "nodes": [ { "leaf": 1.0 } ] }
            ]
        }"#;
        let model: Estimator = serde_json::from_str(json).expect("Should parse");
        model.validate(1).expect("Should validate");
        assert_eq!(model.kind(), "gradient_boosting");

        // -1 + 0.5 * (3 + 1) = 1
        let high = model.predict_proba(&[60.0]);
        assert!((high - sigmoid(1.0)).abs() < 1e-12);
        // -1 + 0.5 * (-1 + 1) = -1, threshold itself goes left
        let low = model.predict_proba(&[50.0]);
        assert!((low - sigmoid(-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_tree_rejects_backward_children() {
        let tree = Tree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 1.0,
                    left: 1,
                    right: 0,
                },
                Node::Leaf { leaf: 0.0 },
            ],
        };
        assert!(tree.validate(1).unwrap_err().contains("invalid child"));
    }

    #[test]
    fn test_sigmoid_saturates_without_nan() {
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
    }
}
