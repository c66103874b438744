use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Bound, PredictionError, ValidationError};
use crate::fields::{FieldKind, FieldRegistry};
use crate::model::ModelSlot;
use crate::record::{InputRecord, RecordEntry};

/// How a raw model output becomes the displayed score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreConvention {
    /// Absolute value; the risk score is defined as non-negative.
    #[default]
    NonNegative,
    /// Raw signed model output.
    Signed,
}

impl ScoreConvention {
    pub fn apply(self, raw: f64) -> f64 {
        match self {
            ScoreConvention::NonNegative => raw.abs(),
            ScoreConvention::Signed => raw,
        }
    }
}

impl FromStr for ScoreConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "non_negative" | "nonnegative" | "abs" => Ok(ScoreConvention::NonNegative),
            "signed" | "raw" => Ok(ScoreConvention::Signed),
            other => Err(format!("unknown score convention '{}'", other)),
        }
    }
}

/// Everything one form submission produced.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub record: InputRecord,
    pub raw: f64,
    pub score: f64,
    pub convention: ScoreConvention,
}

/// Builds validated records and scores them with the model loaded at startup.
/// Immutable once constructed; share it behind an `Arc`.
#[derive(Debug)]
pub struct Predictor {
    registry: FieldRegistry,
    model: ModelSlot,
    convention: ScoreConvention,
}

impl Predictor {
    pub fn new(registry: FieldRegistry, model: ModelSlot, convention: ScoreConvention) -> Self {
        Self {
            registry,
            model,
            convention,
        }
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn model(&self) -> &ModelSlot {
        &self.model
    }

    pub fn convention(&self) -> ScoreConvention {
        self.convention
    }

    /// Validates `values` against the registry and lays them out in column
    /// order. The key set must match exactly; values are never clamped.
    pub fn build_record(&self, values: &HashMap<String, f64>) -> Result<InputRecord, ValidationError> {
        if let Some(extra) = values.keys().find(|k| !self.registry.contains(k)) {
            return Err(ValidationError::UnknownField(extra.clone()));
        }

        let mut entries = Vec::with_capacity(self.registry.len());
        for f in self.registry.iter() {
            let value = *values
                .get(&f.name)
                .ok_or_else(|| ValidationError::MissingField(f.name.clone()))?;
            if !value.is_finite() {
                return Err(ValidationError::NotFinite {
                    field: f.name.clone(),
                    value,
                });
            }
            if f.kind == FieldKind::Integer && value.fract() != 0.0 {
                return Err(ValidationError::NotInteger {
                    field: f.name.clone(),
                    value,
                });
            }
            let domain = f.domain();
            if value < domain.min {
                return Err(ValidationError::OutOfRange {
                    field: f.name.clone(),
                    value,
                    bound: Bound::Min,
                    limit: domain.min,
                });
            }
            if value > domain.max {
                return Err(ValidationError::OutOfRange {
                    field: f.name.clone(),
                    value,
                    bound: Bound::Max,
                    limit: domain.max,
                });
            }
            entries.push(RecordEntry {
                name: f.name.clone(),
                kind: f.kind,
                value,
            });
        }
        Ok(InputRecord::from_entries(entries))
    }

    /// Parses text inputs (as posted by the form) and builds the record.
    pub fn build_record_from_form(&self, raw: &HashMap<String, String>) -> Result<InputRecord, ValidationError> {
        let mut values = HashMap::with_capacity(raw.len());
        for (k, v) in raw {
            let parsed = v.trim().parse::<f64>().map_err(|_| ValidationError::InvalidNumber {
                field: k.clone(),
                raw: v.clone(),
            })?;
            values.insert(k.clone(), parsed);
        }
        self.build_record(&values)
    }

    /// The record made of the registry's preloaded values.
    pub fn default_record(&self) -> Result<InputRecord, ValidationError> {
        let values: HashMap<String, f64> = self
            .registry
            .defaults()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        self.build_record(&values)
    }

    /// One synchronous inference call. No retries.
    pub fn predict(&self, record: &InputRecord) -> Result<f64, PredictionError> {
        let model = match &self.model {
            ModelSlot::Ready(m) => m,
            ModelSlot::Unavailable { path, reason } => {
                return Err(PredictionError::ModelUnavailable {
                    path: path.clone(),
                    reason: reason.clone(),
                })
            }
        };

        if let Some(expected) = model.feature_names() {
            let actual = record.names();
            if expected != actual.as_slice() {
                return Err(PredictionError::ShapeMismatch {
                    expected: expected.to_vec(),
                    actual,
                });
            }
        }

        let raw = model
            .predict(&record.features())
            .map_err(|source| PredictionError::Model {
                model: model.name().to_string(),
                source,
            })?;
        if !raw.is_finite() {
            return Err(PredictionError::Model {
                model: model.name().to_string(),
                source: anyhow::anyhow!("non-finite output {}", raw),
            });
        }
        Ok(raw)
    }

    pub fn normalize(&self, raw: f64) -> f64 {
        self.convention.apply(raw)
    }

    /// Runs the default record through the model once. Used at startup so a
    /// model that cannot score our rows is reported before the first request.
    pub fn warmup(&self) -> Result<f64, PredictionError> {
        // Defaults are checked by FieldRegistry::validate, so this only fails
        // on a registry that skipped the self-check.
        let record = self.default_record().map_err(|e| PredictionError::Model {
            model: "warmup".to_string(),
            source: anyhow::anyhow!(e),
        })?;
        self.predict(&record)
    }

    /// Drops the loaded model after a failed warmup. Later calls fail with
    /// `reason` instead of hitting a model known to be broken.
    pub fn mark_unavailable(&mut self, path: String, reason: String) {
        self.model = ModelSlot::Unavailable { path, reason };
    }

    /// build -> predict -> normalize.
    pub fn run(&self, record: InputRecord) -> Result<PredictionOutcome, PredictionError> {
        tracing::debug!("predict {}", record.summary());
        let raw = self.predict(&record)?;
        let score = self.normalize(raw);
        tracing::info!(raw, score, convention = ?self.convention, "prediction ok");
        Ok(PredictionOutcome {
            record,
            raw,
            score,
            convention: self.convention,
        })
    }
}
