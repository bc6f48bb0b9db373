//! XGBoost JSON Model - native tree ensemble evaluation
//!
//! Reads the document written by `Booster.save_model("model.json")` and scores
//! rows without an XGBoost runtime. Only identity-link regression objectives
//! are accepted: the CLV model regresses `log1p(CLV)` directly.
//!
//! Per tree, node `i` is a leaf when `left_children[i] == -1`; its value sits in
//! `split_conditions[i]`. Inner nodes go left when `x < split_conditions[i]`
//! and follow `default_left[i]` for missing (NaN) values.

use std::path::Path;

use ndarray::ArrayView1;
use serde::Deserialize;

use super::predictor::Predictor;
use crate::logic::error::{ModelLoadError, PredictionError};
use crate::logic::features::FeatureTable;

/// Objectives whose margin is the prediction itself
const IDENTITY_OBJECTIVES: &[&str] = &[
    "reg:squarederror",
    "reg:pseudohubererror",
    "reg:absoluteerror",
];

// ============================================================================
// ON-DISK DOCUMENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct XgbDocument {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: Objective,
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    num_feature: String,
    #[serde(default)]
    num_target: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Objective {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    #[serde(default)]
    model: Option<GbTreeModel>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    trees: Vec<RawTree>,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
}

/// Older writers emit booleans, newer ones 0/1
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(n) => n != 0,
        }
    }
}

// ============================================================================
// VALIDATED ENSEMBLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_raw(raw: RawTree, tree_idx: usize, num_feature: usize) -> Result<Self, ModelLoadError> {
        let n = raw.left_children.len();
        let corrupt = |msg: String| ModelLoadError::Corrupt(format!("tree {}: {}", tree_idx, msg));

        if n == 0 {
            return Err(corrupt("no nodes".into()));
        }
        if raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || raw.default_left.len() != n
        {
            return Err(corrupt("node arrays have different lengths".into()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (raw.left_children[i], raw.right_children[i]);
            if left == -1 {
                nodes.push(Node::Leaf(raw.split_conditions[i]));
                continue;
            }

            // Children always come after their parent, which also rules out cycles
            let child = |c: i32| -> Result<usize, ModelLoadError> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > i && c < n)
                    .ok_or_else(|| corrupt(format!("node {} has invalid child {}", i, c)))
            };
            let feature = usize::try_from(raw.split_indices[i])
                .ok()
                .filter(|&f| f < num_feature)
                .ok_or_else(|| {
                    corrupt(format!(
                        "node {} splits on feature {} (model has {})",
                        i, raw.split_indices[i], num_feature
                    ))
                })?;

            nodes.push(Node::Split {
                feature,
                threshold: raw.split_conditions[i],
                left: child(left)?,
                right: child(right)?,
                default_left: raw.default_left[i].is_set(),
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, row: &ArrayView1<'_, f32>) -> f32 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row[feature];
                    idx = if x.is_nan() {
                        if default_left { left } else { right }
                    } else if x < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Gradient boosted regression trees loaded from XGBoost JSON
#[derive(Debug, Clone)]
pub struct XgbRegressor {
    base_score: f32,
    num_feature: usize,
    feature_names: Vec<String>,
    trees: Vec<Tree>,
}

impl XgbRegressor {
    pub fn load(path: &Path) -> Result<Self, ModelLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ModelLoadError> {
        let doc: XgbDocument = serde_json::from_str(content)
            .map_err(|e| ModelLoadError::Corrupt(format!("not an XGBoost JSON model: {}", e)))?;
        let learner = doc.learner;

        if !IDENTITY_OBJECTIVES.contains(&learner.objective.name.as_str()) {
            return Err(ModelLoadError::UnsupportedFormat(format!(
                "objective '{}' (expected one of {:?})",
                learner.objective.name, IDENTITY_OBJECTIVES
            )));
        }

        let params = &learner.learner_model_param;
        if let Some(targets) = params.num_target.as_deref() {
            if parse_param::<usize>(targets, "num_target")? != 1 {
                return Err(ModelLoadError::UnsupportedFormat(format!(
                    "multi-target model (num_target = {})",
                    targets
                )));
            }
        }
        let base_score = parse_base_score(&params.base_score)?;
        let num_feature = parse_param::<usize>(&params.num_feature, "num_feature")?;

        if learner.gradient_booster.name != "gbtree" {
            return Err(ModelLoadError::UnsupportedFormat(format!(
                "booster '{}' (only gbtree is supported)",
                learner.gradient_booster.name
            )));
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| ModelLoadError::Corrupt("gbtree without model section".into()))?;

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, raw)| Tree::from_raw(raw, i, num_feature))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "XGBoost model parsed: {} trees, {} features, base_score={}",
            trees.len(),
            num_feature,
            base_score
        );

        Ok(Self {
            base_score,
            num_feature,
            feature_names: learner.feature_names,
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn predict_row(&self, row: &ArrayView1<'_, f32>) -> f32 {
        self.trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.leaf_value(row))
    }
}

impl Predictor for XgbRegressor {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f32>, PredictionError> {
        let width = table.data().ncols();
        if width != self.num_feature {
            return Err(PredictionError::Shape(format!(
                "table has {} columns, model expects {}",
                width, self.num_feature
            )));
        }
        Ok(table.rows().map(|row| self.predict_row(&row)).collect())
    }

    fn backend(&self) -> &'static str {
        "xgboost-json"
    }

    fn expected_features(&self) -> Option<usize> {
        Some(self.num_feature)
    }

    fn feature_names(&self) -> Option<&[String]> {
        if self.feature_names.is_empty() {
            None
        } else {
            Some(&self.feature_names)
        }
    }
}

fn parse_param<T: std::str::FromStr>(raw: &str, name: &str) -> Result<T, ModelLoadError> {
    raw.trim()
        .parse()
        .map_err(|_| ModelLoadError::Corrupt(format!("invalid {} '{}'", name, raw)))
}

/// `"5E-1"` (XGBoost 1.x/2.x) or `"[5E-1]"` (3.x vector form, single target)
fn parse_base_score(raw: &str) -> Result<f32, ModelLoadError> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    parse_param(inner, "base_score")
}
