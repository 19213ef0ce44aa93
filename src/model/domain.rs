//! Domain types for the fitted scaler and classifier.
//!
//! Artefacts are exported from the training environment as JSON and checked
//! on conversion; a runtime type that exists is always shape-consistent.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::common::error::{PloidyError, PloidyResult};

/// Decision threshold on the class-1 probability.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Ordered feature list fixed at training time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    pub fn new(names: Vec<String>) -> PloidyResult<Self> {
        if names.is_empty() {
            return Err(PloidyError::model_missing("trained feature list is empty"));
        }
        for (idx, name) in names.iter().enumerate() {
            if names[..idx].contains(name) {
                return Err(PloidyError::model_missing(format!(
                    "trained feature '{name}' is listed twice"
                )));
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Serialized standardization parameters.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ScalerArtifact {
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Fitted per-feature standardization `(x - mean) / scale`.
#[derive(Clone, Debug)]
pub struct StandardScaler {
    schema: FeatureSchema,
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl TryFrom<ScalerArtifact> for StandardScaler {
    type Error = PloidyError;

    fn try_from(artifact: ScalerArtifact) -> PloidyResult<Self> {
        let n = artifact.feature_names.len();
        if artifact.mean.len() != n || artifact.scale.len() != n {
            return Err(PloidyError::model_missing(format!(
                "scaler has {n} features but {} means and {} scales",
                artifact.mean.len(),
                artifact.scale.len()
            )));
        }
        ensure_finite("scaler mean", &artifact.mean)?;
        ensure_finite("scaler scale", &artifact.scale)?;

        // a zero scale means the feature was constant during fitting
        let scale = artifact
            .scale
            .iter()
            .map(|&s| if s == 0.0 { 1.0 } else { s })
            .collect();

        Ok(Self {
            schema: FeatureSchema::new(artifact.feature_names)?,
            mean: Array1::from_vec(artifact.mean),
            scale: Array1::from_vec(scale),
        })
    }
}

impl StandardScaler {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Standardize a `[rows, features]` matrix with the fitted parameters.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> PloidyResult<Array2<f64>> {
        if x.ncols() != self.schema.len() {
            return Err(PloidyError::internal(format!(
                "scaler expects {} features, got {}",
                self.schema.len(),
                x.ncols()
            )));
        }
        Ok((&x - &self.mean) / &self.scale)
    }
}

/// Hidden-layer activation of a multilayer perceptron.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Identity,
    Logistic,
    Tanh,
    Relu,
}

impl Activation {
    fn apply(self, z: &mut Array2<f64>) {
        match self {
            Activation::Identity => {}
            Activation::Logistic => z.mapv_inplace(sigmoid),
            Activation::Tanh => z.mapv_inplace(f64::tanh),
            Activation::Relu => z.mapv_inplace(|v| v.max(0.0)),
        }
    }
}

/// Serialized dense layer; `weights` is `[n_in][n_out]`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LayerArtifact {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

/// Serialized binary classifier.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClassifierArtifact {
    Mlp {
        #[serde(default)]
        feature_names: Option<Vec<String>>,
        hidden_activation: Activation,
        layers: Vec<LayerArtifact>,
    },
    Logistic {
        #[serde(default)]
        feature_names: Option<Vec<String>>,
        coefficients: Vec<f64>,
        intercept: f64,
    },
}

impl ClassifierArtifact {
    pub fn feature_names(&self) -> Option<&[String]> {
        match self {
            ClassifierArtifact::Mlp { feature_names, .. }
            | ClassifierArtifact::Logistic { feature_names, .. } => feature_names.as_deref(),
        }
    }

    /// Build the runtime classifier, checking every shape.
    pub fn into_classifier(self) -> PloidyResult<Box<dyn Classifier>> {
        match self {
            ClassifierArtifact::Mlp {
                hidden_activation,
                layers,
                ..
            } => Ok(Box::new(MlpClassifier::new(hidden_activation, layers)?)),
            ClassifierArtifact::Logistic {
                coefficients,
                intercept,
                ..
            } => Ok(Box::new(LogisticClassifier::new(coefficients, intercept)?)),
        }
    }
}

/// Fixed binary classifier. Implementations hold no mutable state.
pub trait Classifier: Send + Sync {
    /// Input width.
    fn n_features(&self) -> usize;

    /// Class-1 probability per row of a scaled `[rows, features]` matrix.
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64>;

    /// Hard label per row.
    fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<u8> {
        self.predict_proba(x).iter().map(|&p| label_for(p)).collect()
    }
}

/// Hard label for a class-1 probability.
pub fn label_for(probability: f64) -> u8 {
    u8::from(probability > DECISION_THRESHOLD)
}

#[derive(Clone, Debug)]
struct DenseLayer {
    weights: Array2<f64>,
    biases: Array1<f64>,
}

/// Feed-forward network with a single logistic output unit.
#[derive(Clone, Debug)]
pub struct MlpClassifier {
    activation: Activation,
    layers: Vec<DenseLayer>,
}

impl MlpClassifier {
    pub fn new(activation: Activation, layers: Vec<LayerArtifact>) -> PloidyResult<Self> {
        if layers.is_empty() {
            return Err(PloidyError::model_missing("mlp has no layers"));
        }
        let mut dense = Vec::with_capacity(layers.len());
        let mut expected_in: Option<usize> = None;
        for (idx, layer) in layers.into_iter().enumerate() {
            let n_in = layer.weights.len();
            let n_out = layer.weights.first().map_or(0, Vec::len);
            if n_in == 0 || n_out == 0 {
                return Err(PloidyError::model_missing(format!("mlp layer {idx} is empty")));
            }
            if layer.weights.iter().any(|row| row.len() != n_out) || layer.biases.len() != n_out {
                return Err(PloidyError::model_missing(format!(
                    "mlp layer {idx} is ragged or its biases do not match {n_out} outputs"
                )));
            }
            if let Some(prev) = expected_in {
                if prev != n_in {
                    return Err(PloidyError::model_missing(format!(
                        "mlp layer {idx} expects {n_in} inputs, previous layer yields {prev}"
                    )));
                }
            }
            let flat: Vec<f64> = layer.weights.into_iter().flatten().collect();
            ensure_finite("mlp weights", &flat)?;
            ensure_finite("mlp biases", &layer.biases)?;
            let weights = Array2::from_shape_vec((n_in, n_out), flat)
                .map_err(|e| PloidyError::model_missing(format!("mlp layer {idx}: {e}")))?;
            dense.push(DenseLayer {
                weights,
                biases: Array1::from_vec(layer.biases),
            });
            expected_in = Some(n_out);
        }
        if expected_in != Some(1) {
            return Err(PloidyError::model_missing(
                "mlp output layer must have exactly one unit",
            ));
        }
        Ok(Self {
            activation,
            layers: dense,
        })
    }
}

impl Classifier for MlpClassifier {
    fn n_features(&self) -> usize {
        self.layers[0].weights.nrows()
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let last = self.layers.len() - 1;
        let mut activations = x.to_owned();
        for (idx, layer) in self.layers.iter().enumerate() {
            let mut z = activations.dot(&layer.weights) + &layer.biases;
            if idx == last {
                z.mapv_inplace(sigmoid);
            } else {
                self.activation.apply(&mut z);
            }
            activations = z;
        }
        activations.index_axis_move(Axis(1), 0)
    }
}

/// Linear model with a logistic link.
#[derive(Clone, Debug)]
pub struct LogisticClassifier {
    coefficients: Array1<f64>,
    intercept: f64,
}

impl LogisticClassifier {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> PloidyResult<Self> {
        if coefficients.is_empty() {
            return Err(PloidyError::model_missing("logistic model has no coefficients"));
        }
        ensure_finite("logistic coefficients", &coefficients)?;
        ensure_finite("logistic intercept", &[intercept])?;
        Ok(Self {
            coefficients: Array1::from_vec(coefficients),
            intercept,
        })
    }
}

impl Classifier for LogisticClassifier {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        (x.dot(&self.coefficients) + self.intercept).mapv_into(sigmoid)
    }
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn ensure_finite(what: &str, values: &[f64]) -> PloidyResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(PloidyError::model_missing(format!("{what} contain non-finite values")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn scaler_standardizes_with_fitted_parameters() {
        let scaler = StandardScaler::try_from(ScalerArtifact {
            feature_names: names(2),
            mean: vec![1.0, 10.0],
            scale: vec![2.0, 0.0],
        })
        .unwrap();
        let x = array![[3.0, 12.0], [1.0, 10.0]];
        let out = scaler.transform(x.view()).unwrap();
        assert_eq!(out, array![[1.0, 2.0], [0.0, 0.0]]);
    }

    #[test]
    fn scaler_rejects_mismatched_lengths() {
        let err = StandardScaler::try_from(ScalerArtifact {
            feature_names: names(2),
            mean: vec![0.0],
            scale: vec![1.0, 1.0],
        })
        .unwrap_err();
        assert!(matches!(err, PloidyError::ModelUnavailable(_)));
    }

    #[test]
    fn scaler_rejects_wrong_width_input() {
        let scaler = StandardScaler::try_from(ScalerArtifact {
            feature_names: names(2),
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        })
        .unwrap();
        assert!(scaler.transform(array![[1.0]].view()).is_err());
    }

    #[test]
    fn duplicate_feature_names_are_rejected() {
        assert!(FeatureSchema::new(vec!["a".into(), "a".into()]).is_err());
        assert!(FeatureSchema::new(Vec::new()).is_err());
    }

    #[test]
    fn logistic_probabilities_and_labels() {
        let model = LogisticClassifier::new(vec![1.0, -1.0], 0.0).unwrap();
        let x = array![[2.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let p = model.predict_proba(x.view());
        assert_abs_diff_eq!(p[0], sigmoid(2.0), epsilon = 1e-12);
        assert_abs_diff_eq!(p[2], 0.5, epsilon = 1e-12);
        // 0.5 is not above the threshold
        assert_eq!(model.predict(x.view()), vec![1, 0, 0]);
    }

    #[test]
    fn mlp_forward_pass() {
        let model = MlpClassifier::new(
            Activation::Relu,
            vec![
                LayerArtifact {
                    weights: vec![vec![1.0, -1.0], vec![0.0, 1.0]],
                    biases: vec![0.0, 0.0],
                },
                LayerArtifact {
                    weights: vec![vec![2.0], vec![-3.0]],
                    biases: vec![0.5],
                },
            ],
        )
        .unwrap();
        assert_eq!(model.n_features(), 2);

        // hidden = relu([1, -1]) = [1, 0]; out = 2 + 0.5
        let p = model.predict_proba(array![[1.0, 0.0]].view());
        assert_abs_diff_eq!(p[0], sigmoid(2.5), epsilon = 1e-12);
    }

    #[test]
    fn mlp_rejects_broken_shapes() {
        let chain_mismatch = MlpClassifier::new(
            Activation::Tanh,
            vec![
                LayerArtifact {
                    weights: vec![vec![1.0, 1.0]],
                    biases: vec![0.0, 0.0],
                },
                LayerArtifact {
                    weights: vec![vec![1.0], vec![1.0], vec![1.0]],
                    biases: vec![0.0],
                },
            ],
        );
        assert!(chain_mismatch.is_err());

        let two_outputs = MlpClassifier::new(
            Activation::Tanh,
            vec![LayerArtifact {
                weights: vec![vec![1.0, 1.0]],
                biases: vec![0.0, 0.0],
            }],
        );
        assert!(two_outputs.is_err());
    }

    #[test]
    fn artifact_json_is_tagged_by_kind() {
        let json = r#"{"kind":"logistic","coefficients":[0.5],"intercept":-1.0}"#;
        let artifact: ClassifierArtifact = serde_json::from_str(json).unwrap();
        assert!(artifact.feature_names().is_none());
        let model = artifact.into_classifier().unwrap();
        assert_eq!(model.n_features(), 1);
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_abs_diff_eq!(sigmoid(0.0), 0.5);
    }
}
