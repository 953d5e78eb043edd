// 🌲 Model Loader - tree ensemble classifier read once at startup

use crate::error::PredictionError;
use crate::schema::{schema_mismatch, FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Default artifact location, relative to the working directory
pub const DEFAULT_MODEL_PATH: &str = "model/credit_risk_ensemble.json";

// ============================================================================
// CLASSIFIER SEAM
// ============================================================================

/// Anything that can turn a feature row into a class label.
///
/// Implementations are shared across requests and must be safe to call
/// concurrently.
pub trait Classifier: Send + Sync {
    fn predict(&self, row: &FeatureVector) -> Result<i64, PredictionError>;
}

// ============================================================================
// ARTIFACT FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voting {
    /// Average class scores across trees, then argmax
    #[default]
    Soft,
    /// Each tree votes for its argmax class
    Hard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Walk from the root to a leaf; `value <= threshold` goes left.
    ///
    /// Indexing is checked so a hand-built, unvalidated tree fails the
    /// request instead of panicking.
    fn leaf_scores(&self, values: &[f64; FEATURE_COUNT]) -> Result<&[f64], PredictionError> {
        let mut index = 0;
        // A path can visit each node at most once
        for _ in 0..self.nodes.len() {
            let node = self.nodes.get(index).ok_or_else(|| {
                PredictionError::Inference(format!("tree node index {} out of range", index))
            })?;
            match node {
                Node::Leaf { leaf } => return Ok(leaf),
                Node::Split { feature, threshold, left, right } => {
                    let value = values.get(*feature).ok_or_else(|| {
                        PredictionError::Inference(format!("feature index {} out of range", feature))
                    })?;
                    index = if *value <= *threshold { *left } else { *right };
                }
            }
        }
        Err(PredictionError::Inference("tree path does not reach a leaf".to_string()))
    }

    fn validate(&self, tree_index: usize, class_count: usize) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("tree {} has no nodes", tree_index);
        }

        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { leaf } => {
                    if leaf.len() != class_count {
                        bail!(
                            "tree {} node {}: leaf has {} scores for {} classes",
                            tree_index,
                            i,
                            leaf.len(),
                            class_count
                        );
                    }
                }
                Node::Split { feature, left, right, .. } => {
                    if *feature >= FEATURE_COUNT {
                        bail!("tree {} node {}: feature index {} out of range", tree_index, i, feature);
                    }
                    // Children strictly after their parent: no cycles, traversal terminates
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            bail!("tree {} node {}: invalid child index {}", tree_index, i, child);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Serialized ensemble as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleModel {
    pub name: String,
    pub version: String,
    pub features: Vec<String>,
    pub classes: Vec<i64>,
    #[serde(default)]
    pub voting: Voting,
    pub trees: Vec<Tree>,
}

fn argmax(scores: &[f64]) -> usize {
    // First maximum wins, so ties go to the lowest class index
    let mut best = 0;
    for (i, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = i;
        }
    }
    best
}

impl EnsembleModel {
    /// Check the artifact is usable with this service's feature schema
    pub fn validate(&self) -> Result<()> {
        if let Some(diff) = schema_mismatch(&self.features) {
            bail!("feature schema mismatch: {}", diff);
        }
        if self.classes.is_empty() {
            bail!("model declares no classes");
        }
        if self.trees.is_empty() {
            bail!("model contains no trees");
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i, self.classes.len())?;
        }
        Ok(())
    }

    /// Per-class scores for one row
    pub fn class_scores(&self, row: &FeatureVector) -> Result<Vec<f64>, PredictionError> {
        let values = row.values();
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(PredictionError::Inference(format!(
                "feature '{}' is not a finite number",
                FEATURE_COLUMNS[i]
            )));
        }

        if self.classes.is_empty() || self.trees.is_empty() {
            return Err(PredictionError::Inference("model has no classes or no trees".to_string()));
        }

        let mut totals = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            let scores = tree.leaf_scores(values)?;
            if scores.len() != totals.len() {
                return Err(PredictionError::Inference(format!(
                    "leaf has {} scores for {} classes",
                    scores.len(),
                    totals.len()
                )));
            }
            match self.voting {
                Voting::Soft => {
                    for (total, score) in totals.iter_mut().zip(scores) {
                        *total += score;
                    }
                }
                Voting::Hard => totals[argmax(scores)] += 1.0,
            }
        }

        let n = self.trees.len() as f64;
        Ok(totals.into_iter().map(|t| t / n).collect())
    }
}

impl Classifier for EnsembleModel {
    fn predict(&self, row: &FeatureVector) -> Result<i64, PredictionError> {
        let scores = self.class_scores(row)?;
        // class_scores returns one score per class
        Ok(self.classes[argmax(&scores)])
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// What was loaded, and from where
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub voting: Voting,
    pub tree_count: usize,
    pub classes: Vec<i64>,
    pub sha256: String,
    pub source: String,
    pub loaded_at: DateTime<Utc>,
}

/// Read, parse and validate a model artifact.
///
/// Any failure here means the process cannot serve predictions.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<(EnsembleModel, ModelInfo)> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read model file: {:?}", path))?;

    let model: EnsembleModel = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse model artifact: {:?}", path))?;

    model
        .validate()
        .map_err(|e| anyhow!("Incompatible model artifact {:?}: {}", path, e))?;

    let info = ModelInfo {
        name: model.name.clone(),
        version: model.version.clone(),
        voting: model.voting,
        tree_count: model.trees.len(),
        classes: model.classes.clone(),
        sha256: format!("{:x}", Sha256::digest(&bytes)),
        source: path.display().to_string(),
        loaded_at: Utc::now(),
    };

    Ok((model, info))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column_index;
    use std::path::PathBuf;

    fn feature_names() -> Vec<String> {
        FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    /// Two stumps: one on dti_ratio, one on risk_flag
    fn stump_model(voting: Voting) -> EnsembleModel {
        let dti = column_index("dti_ratio").unwrap();
        let flag = column_index("risk_flag").unwrap();

        EnsembleModel {
            name: "test".to_string(),
            version: "0.0.1".to_string(),
            features: feature_names(),
            classes: vec![0, 1],
            voting,
            trees: vec![
                Tree {
                    nodes: vec![
                        Node::Split { feature: dti, threshold: 3.0, left: 1, right: 2 },
                        Node::Leaf { leaf: vec![0.9, 0.1] },
                        Node::Leaf { leaf: vec![0.3, 0.7] },
                    ],
                },
                Tree {
                    nodes: vec![
                        Node::Split { feature: flag, threshold: 0.5, left: 1, right: 2 },
                        Node::Leaf { leaf: vec![0.6, 0.4] },
                        Node::Leaf { leaf: vec![0.0, 1.0] },
                    ],
                },
            ],
        }
    }

    fn row_with(dti: f64, flag: f64) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        values[column_index("dti_ratio").unwrap()] = dti;
        values[column_index("risk_flag").unwrap()] = flag;
        FeatureVector::from_values(values)
    }

    fn write_temp(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("credit-risk-model-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_soft_voting() {
        let model = stump_model(Voting::Soft);

        assert_eq!(model.predict(&row_with(1.0, 0.0)).unwrap(), 0);
        assert_eq!(model.predict(&row_with(5.0, 1.0)).unwrap(), 1);

        // (0.9 + 0.0) / 2 vs (0.1 + 1.0) / 2
        let scores = model.class_scores(&row_with(1.0, 1.0)).unwrap();
        assert!((scores[0] - 0.45).abs() < 1e-12);
        assert!((scores[1] - 0.55).abs() < 1e-12);
        assert_eq!(model.predict(&row_with(1.0, 1.0)).unwrap(), 1);
    }

    #[test]
    fn test_hard_voting_tie_goes_low() {
        let model = stump_model(Voting::Hard);

        // Tree 1 votes 0, tree 2 votes 1
        assert_eq!(model.predict(&row_with(1.0, 1.0)).unwrap(), 0);
        assert_eq!(model.predict(&row_with(5.0, 1.0)).unwrap(), 1);
    }

    #[test]
    fn test_threshold_is_inclusive_left() {
        let model = stump_model(Voting::Soft);
        let scores = model.class_scores(&row_with(3.0, 0.0)).unwrap();
        assert!((scores[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_feature_fails() {
        let model = stump_model(Voting::Soft);
        let err = model.predict(&row_with(f64::INFINITY, 0.0)).unwrap_err();

        assert!(matches!(err, PredictionError::Inference(_)));
        assert!(err.to_string().contains("dti_ratio"));
    }

    #[test]
    fn test_validate_rejects_schema_drift() {
        let mut model = stump_model(Voting::Soft);
        model.features.swap(0, 1);

        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("feature schema mismatch"));
    }

    #[test]
    fn test_validate_rejects_backward_child() {
        let mut model = stump_model(Voting::Soft);
        model.trees[0].nodes[0] = Node::Split { feature: 0, threshold: 1.0, left: 0, right: 2 };

        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("invalid child index 0"));
    }

    #[test]
    fn test_validate_rejects_bad_leaf_width() {
        let mut model = stump_model(Voting::Soft);
        model.trees[1].nodes[2] = Node::Leaf { leaf: vec![1.0] };

        assert!(model.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_ensemble() {
        let mut model = stump_model(Voting::Soft);
        model.trees.clear();

        assert!(model.validate().unwrap_err().to_string().contains("no trees"));
    }

    #[test]
    fn test_validate_rejects_feature_index_past_schema() {
        let mut model = stump_model(Voting::Soft);
        model.trees[0].nodes[0] = Node::Split { feature: FEATURE_COUNT, threshold: 1.0, left: 1, right: 2 };

        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("feature index 17 out of range"));
    }

    #[test]
    fn test_validate_rejects_child_past_end() {
        let mut model = stump_model(Voting::Soft);
        model.trees[1].nodes[0] = Node::Split { feature: 0, threshold: 1.0, left: 1, right: 3 };

        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("invalid child index 3"));
    }

    #[test]
    fn test_validate_rejects_empty_classes() {
        let mut model = stump_model(Voting::Soft);
        model.classes.clear();

        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("no classes"));
    }

    #[test]
    fn test_unvalidated_model_fails_without_panic() {
        let mut model = stump_model(Voting::Soft);
        model.trees[0].nodes[0] = Node::Split { feature: 0, threshold: 1.0, left: 7, right: 7 };
        let err = model.predict(&row_with(1.0, 0.0)).unwrap_err();
        assert!(err.to_string().contains("node index 7 out of range"));

        let mut model = stump_model(Voting::Soft);
        model.trees[0].nodes[0] = Node::Split { feature: 99, threshold: 1.0, left: 1, right: 2 };
        assert!(model.predict(&row_with(1.0, 0.0)).is_err());

        // Self-loop never reaches a leaf
        let mut model = stump_model(Voting::Soft);
        model.trees[0].nodes[0] = Node::Split { feature: 0, threshold: 1.0, left: 0, right: 0 };
        let err = model.predict(&row_with(1.0, 0.0)).unwrap_err();
        assert!(err.to_string().contains("does not reach a leaf"));

        let mut model = stump_model(Voting::Hard);
        model.classes.clear();
        assert!(matches!(model.predict(&row_with(1.0, 0.0)), Err(PredictionError::Inference(_))));

        let mut model = stump_model(Voting::Hard);
        model.trees[1].nodes[1] = Node::Leaf { leaf: vec![0.2, 0.3, 0.5] };
        let err = model.predict(&row_with(1.0, 0.0)).unwrap_err();
        assert!(err.to_string().contains("3 scores for 2 classes"));
    }

    #[test]
    fn test_load_model_roundtrip_from_disk() {
        let model = stump_model(Voting::Hard);
        let json = serde_json::to_string(&model).unwrap();
        let path = write_temp(&json);

        let (loaded, info) = load_model(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.trees, model.trees);
        assert_eq!(info.tree_count, 2);
        assert_eq!(info.voting, Voting::Hard);
        assert_eq!(info.sha256.len(), 64);
    }

    #[test]
    fn test_load_model_missing_file() {
        let err = load_model("/nonexistent/credit_risk_ensemble.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read model file"));
    }

    #[test]
    fn test_load_model_corrupt_file() {
        let path = write_temp("\u{80}not json");
        let err = load_model(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(err.to_string().contains("Failed to parse model artifact"));
    }

    #[test]
    fn test_load_model_incompatible_artifact() {
        let mut model = stump_model(Voting::Soft);
        model.features.pop();
        let path = write_temp(&serde_json::to_string(&model).unwrap());

        let err = load_model(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(err.to_string().contains("Incompatible model artifact"));
    }

    #[test]
    fn test_bundled_artifact_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_MODEL_PATH);
        let (model, info) = load_model(&path).unwrap();

        assert_eq!(info.name, "credit_risk_ensemble");
        assert_eq!(model.classes, vec![0, 1]);
    }
}
