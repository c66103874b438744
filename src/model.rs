use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, sync::Arc};

/// A pre-trained regressor with a single-row inference entry point.
pub trait RegressionModel: Send + Sync {
    /// Scores one row. `features` is in the column order of
    /// [`RegressionModel::feature_names`] when the model declares one.
    fn predict(&self, features: &[f64]) -> Result<f64>;

    fn name(&self) -> &str;

    /// Column names the model was fitted on, if the artifact records them.
    fn feature_names(&self) -> Option<&[String]> {
        None
    }
}

// ---------- Random forest (JSON artifact) ----------

/// Flat node arrays, one entry per node. Leaves have `-1` children.
#[derive(Deserialize, Debug, Clone)]
pub struct Tree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

const LEAF: i64 = -1;

impl Tree {
    fn check(&self, idx: usize, n_features: usize) -> Result<()> {
        let n = self.children_left.len();
        if n == 0 {
            bail!("tree {} has no nodes", idx);
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            bail!("tree {} has node arrays of different lengths", idx);
        }
        for node in 0..n {
            let (l, r) = (self.children_left[node], self.children_right[node]);
            if l == LEAF && r == LEAF {
                continue;
            }
            // Children always come after their parent, so walking terminates.
            for c in [l, r] {
                if c <= node as i64 || c >= n as i64 {
                    bail!("tree {} node {} has bad child index {}", idx, node, c);
                }
            }
            let f = self.feature[node];
            if f < 0 || f as usize >= n_features {
                bail!("tree {} node {} splits on unknown feature {}", idx, node, f);
            }
        }
        Ok(())
    }

    fn eval(&self, x: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            let left = self.children_left[node];
            if left == LEAF {
                return self.value[node];
            }
            node = if x[self.feature[node] as usize] <= self.threshold[node] {
                left as usize
            } else {
                self.children_right[node] as usize
            };
        }
    }
}

#[derive(Deserialize)]
struct ForestJson {
    #[serde(default)]
    name: Option<String>,
    feature_names: Vec<String>,
    trees: Vec<Tree>,
}

/// Random-forest regressor: the mean of its trees' leaf values.
pub struct ForestModel {
    name: String,
    feature_names: Vec<String>,
    trees: Vec<Tree>,
}

impl ForestModel {
    pub fn load(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .with_context(|| format!("failed to read model at {}", path.display()))?;
        Self::from_json(&txt).with_context(|| format!("failed to parse model {}", path.display()))
    }

    pub fn from_json(txt: &str) -> Result<Self> {
        let raw: ForestJson = serde_json::from_str(txt)?;
        if raw.trees.is_empty() {
            bail!("forest has no trees");
        }
        if raw.feature_names.is_empty() {
            bail!("forest declares no features");
        }
        for (i, t) in raw.trees.iter().enumerate() {
            t.check(i, raw.feature_names.len())?;
        }
        Ok(Self {
            name: raw.name.unwrap_or_else(|| "random_forest".to_string()),
            feature_names: raw.feature_names,
            trees: raw.trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl RegressionModel for ForestModel {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.feature_names.len() {
            bail!(
                "feature length mismatch: got {}, expected {}",
                features.len(),
                self.feature_names.len()
            );
        }
        let sum: f64 = self.trees.iter().map(|t| t.eval(features)).sum();
        Ok(sum / self.trees.len() as f64)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> Option<&[String]> {
        Some(&self.feature_names)
    }
}

// ---------- TorchScript ----------

#[cfg(feature = "torch")]
pub use torch::TorchModel;

#[cfg(feature = "torch")]
mod torch {
    use anyhow::{bail, Context, Result};
    use std::path::Path;
    use tch::{kind::Kind, CModule, Device, Tensor};

    /// TorchScript regressor taking `[1, in_dim]` and returning one value.
    pub struct TorchModel {
        model: CModule,
        device: Device,
        in_dim: usize,
        name: String,
    }

    impl TorchModel {
        pub fn load(path: &Path, in_dim: usize) -> Result<Self> {
            let device = Device::Cpu;
            let model = CModule::load_on_device(path, device)
                .with_context(|| format!("failed to load TorchScript {}", path.display()))?;

            // Probe output shape with a dummy forward
            let dummy = Tensor::zeros([1, in_dim as i64], (Kind::Float, device));
            let t = model.forward_ts(&[dummy])?;
            if t.numel() != 1 {
                bail!("unexpected model output size: {:?}", t.size());
            }

            Ok(Self {
                model,
                device,
                in_dim,
                name: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "torchscript".to_string()),
            })
        }
    }

    impl super::RegressionModel for TorchModel {
        fn predict(&self, features: &[f64]) -> Result<f64> {
            if features.len() != self.in_dim {
                bail!(
                    "feature length mismatch: got {}, expected {}",
                    features.len(),
                    self.in_dim
                );
            }
            let x: Vec<f32> = features.iter().map(|v| *v as f32).collect();
            let input = Tensor::from_slice(&x)
                .reshape([1, self.in_dim as i64])
                .to_device(self.device);
            let out = self.model.forward_ts(&[input])?;
            Ok(out.reshape([-1]).double_value(&[0]))
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}

/// Picks a loader from the artifact's extension.
#[cfg_attr(not(feature = "torch"), allow(unused_variables))]
pub fn load_model(path: &Path, in_dim: usize) -> Result<Arc<dyn RegressionModel>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "json" => Ok(Arc::new(ForestModel::load(path)?)),
        #[cfg(feature = "torch")]
        "pt" | "ts" => Ok(Arc::new(TorchModel::load(path, in_dim)?)),
        _ => bail!(
            "unsupported model artifact {} (expected .json{})",
            path.display(),
            if cfg!(feature = "torch") { ", .pt or .ts" } else { "" }
        ),
    }
}

// ---------- Process-wide slot ----------

/// The model as loaded at startup. A failed load stays failed for the
/// lifetime of the process.
#[derive(Clone)]
pub enum ModelSlot {
    Ready(Arc<dyn RegressionModel>),
    Unavailable { path: String, reason: String },
}

impl ModelSlot {
    pub fn load(path: &Path, in_dim: usize) -> Self {
        match load_model(path, in_dim) {
            Ok(m) => ModelSlot::Ready(m),
            Err(e) => ModelSlot::Unavailable {
                path: path.display().to_string(),
                reason: format!("{:#}", e),
            },
        }
    }

    pub fn ready(model: impl RegressionModel + 'static) -> Self {
        ModelSlot::Ready(Arc::new(model))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ModelSlot::Ready(_))
    }
}

impl std::fmt::Debug for ModelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSlot::Ready(m) => write!(f, "Ready({})", m.name()),
            ModelSlot::Unavailable { path, reason } => {
                write!(f, "Unavailable({}: {})", path, reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // x0 <= 0.5 ? 1.0 : (x1 <= 10 ? 2.0 : 3.0)
    const TWO_TREES: &str = r#"{
        "feature_names": ["a", "b"],
        "trees": [
            {
                "children_left":  [1, -1, 3, -1, -1],
                "children_right": [2, -1, 4, -1, -1],
                "feature":        [0, -2, 1, -2, -2],
                "threshold":      [0.5, 0, 10.0, 0, 0],
                "value":          [0, 1.0, 0, 2.0, 3.0]
            },
            {
                "children_left":  [-1],
                "children_right": [-1],
                "feature":        [-2],
                "threshold":      [0],
                "value":          [5.0]
            }
        ]
    }"#;

    #[test]
    fn forest_averages_tree_outputs() {
        let m = ForestModel::from_json(TWO_TREES).unwrap();
        assert_eq!(m.n_trees(), 2);
        assert_eq!(m.name(), "random_forest");
        assert_eq!(m.predict(&[0.0, 0.0]).unwrap(), 3.0);
        assert_eq!(m.predict(&[1.0, 5.0]).unwrap(), 3.5);
        assert_eq!(m.predict(&[1.0, 50.0]).unwrap(), 4.0);
    }

    #[test]
    fn forest_rejects_wrong_width() {
        let m = ForestModel::from_json(TWO_TREES).unwrap();
        let err = m.predict(&[1.0]).unwrap_err();
        assert!(err.to_string().contains("feature length mismatch"));
    }

    #[test]
    fn malformed_forests_fail_to_load() {
        assert!(ForestModel::from_json(r#"{"feature_names":["a"],"trees":[]}"#).is_err());
        let backwards = r#"{"feature_names":["a"],"trees":[{
            "children_left":[0],"children_right":[0],"feature":[0],"threshold":[0],"value":[0]}]}"#;
        assert!(ForestModel::from_json(backwards).is_err());
        let bad_feature = r#"{"feature_names":["a"],"trees":[{
            "children_left":[1,-1,-1],"children_right":[2,-1,-1],"feature":[3,-2,-2],
            "threshold":[0,0,0],"value":[0,1,2]}]}"#;
        assert!(ForestModel::from_json(bad_feature).is_err());
        let ragged = r#"{"feature_names":["a"],"trees":[{
            "children_left":[-1],"children_right":[-1,-1],"feature":[-2],"threshold":[0],"value":[1]}]}"#;
        assert!(ForestModel::from_json(ragged).is_err());
        assert!(ForestModel::from_json("not json").is_err());
    }

    #[test]
    fn missing_artifact_leaves_slot_unavailable() {
        let slot = ModelSlot::load(Path::new("/definitely/not/here.json"), 21);
        assert!(!slot.is_ready());
        match slot {
            ModelSlot::Unavailable { path, reason } => {
                assert_eq!(path, "/definitely/not/here.json");
                assert!(reason.contains("failed to read model"), "{reason}");
            }
            ModelSlot::Ready(_) => unreachable!(),
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let slot = ModelSlot::load(Path::new("random_forest_model.pkl"), 21);
        assert!(matches!(slot, ModelSlot::Unavailable { ref reason, .. } if reason.contains("unsupported")));
    }
}
