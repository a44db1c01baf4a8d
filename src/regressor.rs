use std::path::Path;

use serde::Deserialize;
use tract_core::prelude::Tensor;
use tract_onnx::prelude::*;

use crate::aligner::EncodedRow;
use crate::error::ApiError;

/// A fitted model that turns one encoded row into a price.
pub trait Regressor: Send + Sync {
    /// Number of input columns the model was fitted on.
    fn n_features(&self) -> usize;

    fn predict(&self, row: &EncodedRow) -> Result<f32, ApiError>;

    fn kind(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Onnx,
    Forest,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "onnx" => Some(ModelFormat::Onnx),
            "json" => Some(ModelFormat::Forest),
            _ => None,
        }
    }
}

/// ONNX graph executed with tract. Only graphs made of operators tract
/// implements load; tract 0.19 has no `TreeEnsembleRegressor`, so forest
/// exports from skl2onnx go through [`ForestRegressor`] instead.
pub struct OnnxRegressor {
    plan: TypedRunnableModel<TypedModel>,
    width: usize,
}

impl OnnxRegressor {
    /// Loads and optimizes the model for a `[1, width]` f32 input.
    pub fn load(path: &Path, width: usize) -> Result<Self, ApiError> {
        let display = path.display().to_string();
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, width]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| ApiError::artifact(&display, e))?;
        Ok(Self { plan, width })
    }
}

impl Regressor for OnnxRegressor {
    fn n_features(&self) -> usize {
        self.width
    }

    fn predict(&self, row: &EncodedRow) -> Result<f32, ApiError> {
        let input = Tensor::from_shape(&[1, self.width], &row.to_vec())
            .map_err(|e| ApiError::Inference(e.to_string()))?;
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| ApiError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| ApiError::Inference("model produced no outputs".into()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| ApiError::Inference(e.to_string()))?;
        view.iter()
            .next()
            .copied()
            .ok_or_else(|| ApiError::Inference("model produced an empty output".into()))
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

/// One regression tree in scikit-learn's flat array layout.
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

const LEAF: i64 = -1;

impl Tree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err("tree arrays differ in length".into());
        }
        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                if !self.value[node].is_finite() {
                    return Err(format!("leaf {node} has a non-finite value"));
                }
                continue;
            }
            if [left, right].iter().any(|&c| c < 0 || c as usize >= n) {
                return Err(format!("node {node} points outside the tree"));
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {node} splits on unknown feature {feature}"));
            }
        }
        Ok(())
    }

    /// Walks from the root; bounded by the node count so a malformed
    /// tree with a cycle cannot spin forever.
    fn leaf_value(&self, x: &[f32]) -> Option<f64> {
        let mut node = 0usize;
        for _ in 0..self.children_left.len() {
            let left = self.children_left[node];
            if left == LEAF {
                return Some(self.value[node]);
            }
            let feature = self.feature[node] as usize;
            node = if f64::from(x[feature]) <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
        None
    }
}

/// Random forest dumped to JSON; prediction is the mean over trees.
#[derive(Debug, Clone, Deserialize)]
pub struct ForestRegressor {
    n_features: usize,
    trees: Vec<Tree>,
}

impl ForestRegressor {
    pub fn new(n_features: usize, trees: Vec<Tree>) -> Result<Self, String> {
        if n_features == 0 {
            return Err("forest has no input features".into());
        }
        if trees.is_empty() {
            return Err("forest has no trees".into());
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(Self { n_features, trees })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let raw: ForestRegressor = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        Self::new(raw.n_features, raw.trees)
    }

    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let display = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|e| ApiError::artifact(&display, e))?;
        Self::from_json(&bytes).map_err(|e| ApiError::artifact(&display, e))
    }
}

impl Regressor for ForestRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, row: &EncodedRow) -> Result<f32, ApiError> {
        let x = row.to_vec();
        if x.len() != self.n_features {
            return Err(ApiError::Inference(format!(
                "expected {} features, got {}",
                self.n_features,
                x.len()
            )));
        }
        let mut sum = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            sum += tree
                .leaf_value(&x)
                .ok_or_else(|| ApiError::Inference(format!("tree {i} never reached a leaf")))?;
        }
        Ok((sum / self.trees.len() as f64) as f32)
    }

    fn kind(&self) -> &'static str {
        "forest"
    }
}
