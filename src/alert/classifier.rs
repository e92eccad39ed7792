//! Flood risk classification.
//!
//! The primary path evaluates a trained decision-tree ensemble exported to
//! JSON. Whenever the model is absent or cannot evaluate a feature vector,
//! the discharge threshold rule answers instead with zero confidence. Both
//! paths go through [`RiskClassifier::classify`].
//!
//! # Artifact format
//!
//! ```json
//! {
//!   "n_features": 5,
//!   "classes": [0, 1, 2],
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 4, "threshold": 100000.0, "left": 1, "right": 2 },
//!         { "value": [40.0, 2.0, 0.0] },
//!         { "value": [0.0, 5.0, 30.0] }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Internal nodes send a sample left when `x[feature] <= threshold`. Leaves
//! hold per-class sample counts (or fractions); the forest probability is the
//! mean of the normalised leaf distributions.

use crate::alert::thresholds::classify_discharge;
use crate::config::DischargeThresholds;
use crate::logging::{self, DataSource};
use crate::model::{AssessmentPath, FeatureVector, ModelError, RiskAssessment, RiskLevel};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A trained model that scores feature vectors.
pub trait FloodClassifier {
    /// Class labels with their probabilities, in the model's class order.
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<(i64, f64)>, ModelError>;

    /// Short human-readable description for logs and the readiness report.
    fn describe(&self) -> String;
}

// ============================================================================
// Random forest artifact
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ForestModel {
    n_features: usize,
    classes: Vec<i64>,
    trees: Vec<Tree>,
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize)]
struct Node {
    #[serde(default)]
    feature: Option<usize>,
    #[serde(default)]
    threshold: f64,
    #[serde(default)]
    left: Option<usize>,
    #[serde(default)]
    right: Option<usize>,
    #[serde(default)]
    value: Vec<f64>,
}

impl Node {
    fn children(&self) -> Option<(usize, usize)> {
        match (self.feature, self.left, self.right) {
            (Some(_), Some(l), Some(r)) => Some((l, r)),
            _ => None,
        }
    }
}

impl ForestModel {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ModelError> {
        let model: ForestModel = serde_json::from_str(content)?;
        model.validate()?;
        Ok(model)
    }

    /// Structural checks so evaluation can never index out of range or loop.
    fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() || self.classes.is_empty() {
            return Err(ModelError::EmptyModel);
        }
        if self.n_features != FeatureVector::LEN {
            return Err(ModelError::FeatureCount {
                expected: FeatureVector::LEN,
                found: self.n_features,
            });
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::Malformed(format!("tree {} has no nodes", t)));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node.children() {
                    Some((left, right)) => {
                        let feature = node.feature.unwrap_or(usize::MAX);
                        if feature >= self.n_features {
                            return Err(ModelError::Malformed(format!(
                                "tree {} node {}: feature index {} out of range",
                                t, i, feature
                            )));
                        }
                        // Children always come after their parent, so descent terminates.
                        for child in [left, right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(ModelError::Malformed(format!(
                                    "tree {} node {}: bad child index {}",
                                    t, i, child
                                )));
                            }
                        }
                    }
                    None => {
                        if node.value.len() != self.classes.len() {
                            return Err(ModelError::Malformed(format!(
                                "tree {} leaf {}: {} values for {} classes",
                                t,
                                i,
                                node.value.len(),
                                self.classes.len()
                            )));
                        }
                        let total: f64 = node.value.iter().sum();
                        if !(total > 0.0) || node.value.iter().any(|v| *v < 0.0) {
                            return Err(ModelError::Malformed(format!(
                                "tree {} leaf {}: invalid class weights",
                                t, i
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf<'a>(&self, tree: &'a Tree, x: &[f64]) -> &'a Node {
        let mut index = 0;
        loop {
            let node = &tree.nodes[index];
            match (node.children(), node.feature) {
                (Some((left, right)), Some(feature)) => {
                    index = if x[feature] <= node.threshold { left } else { right };
                }
                _ => return node,
            }
        }
    }
}

impl FloodClassifier for ForestModel {
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<(i64, f64)>, ModelError> {
        let x = features.to_array();
        if let Some(index) = x.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteFeature(index));
        }

        let mut sums = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let leaf = self.leaf(tree, &x);
            let total: f64 = leaf.value.iter().sum();
            for (sum, v) in sums.iter_mut().zip(&leaf.value) {
                *sum += v / total;
            }
        }

        let n = self.trees.len() as f64;
        Ok(self
            .classes
            .iter()
            .zip(sums)
            .map(|(&class, sum)| (class, sum / n))
            .collect())
    }

    fn describe(&self) -> String {
        format!("random forest, {} trees, {} classes", self.trees.len(), self.classes.len())
    }
}

// ============================================================================
// Classifier with fallback
// ============================================================================

pub struct RiskClassifier {
    model: Option<Box<dyn FloodClassifier + Send + Sync>>,
    fallback: DischargeThresholds,
}

impl RiskClassifier {
    pub fn new(model: Option<Box<dyn FloodClassifier + Send + Sync>>, fallback: DischargeThresholds) -> Self {
        RiskClassifier { model, fallback }
    }

    /// Threshold rule only.
    pub fn fallback_only(fallback: DischargeThresholds) -> Self {
        Self::new(None, fallback)
    }

    /// Load the forest artifact; a missing or broken artifact is logged once
    /// and the classifier runs on the threshold rule.
    pub fn load_or_fallback<P: AsRef<Path>>(path: P, fallback: DischargeThresholds) -> Self {
        let path = path.as_ref();
        let subject = path.display().to_string();
        match ForestModel::load(path) {
            Ok(model) => {
                logging::info(DataSource::Model, Some(&subject), &format!("Loaded {}", model.describe()));
                Self::new(Some(Box::new(model)), fallback)
            }
            Err(e) => {
                logging::warn(
                    DataSource::Model,
                    Some(&subject),
                    &format!("Model unavailable ({}); using discharge thresholds", e),
                );
                Self::fallback_only(fallback)
            }
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_description(&self) -> Option<String> {
        self.model.as_ref().map(|m| m.describe())
    }

    pub fn classify(&self, features: &FeatureVector) -> RiskAssessment {
        if let Some(model) = &self.model {
            match model_assessment(model.as_ref(), features) {
                Ok(assessment) => return assessment,
                Err(e) => logging::warn(
                    DataSource::Model,
                    None,
                    &format!("Inference failed ({}); using discharge thresholds", e),
                ),
            }
        }

        RiskAssessment {
            level: classify_discharge(features.discharge_cusecs, self.fallback),
            confidence: 0.0,
            path: AssessmentPath::Fallback,
        }
    }
}

/// Argmax class (lowest class wins ties) and its probability as a percentage.
fn model_assessment(
    model: &(dyn FloodClassifier + Send + Sync),
    features: &FeatureVector,
) -> Result<RiskAssessment, ModelError> {
    let probabilities = model.predict_proba(features)?;

    let mut best: Option<(i64, f64)> = None;
    for (class, p) in probabilities {
        if !p.is_finite() {
            return Err(ModelError::Malformed(format!("class {} probability is not finite", class)));
        }
        best = match best {
            Some((c, bp)) if bp > p || (bp == p && c <= class) => Some((c, bp)),
            _ => Some((class, p)),
        };
    }

    let (class, probability) = best.ok_or(ModelError::EmptyModel)?;
    let level = RiskLevel::from_class(class)
        .ok_or_else(|| ModelError::Malformed(format!("unknown class label {}", class)))?;

    Ok(RiskAssessment {
        level,
        confidence: (probability * 1000.0).round() / 10.0,
        path: AssessmentPath::Model,
    })
}
