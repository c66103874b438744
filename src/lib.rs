//! Collision-risk prediction for satellite conjunction events.
//!
//! [`fields::FieldRegistry`] defines the model's input columns,
//! [`predictor::Predictor`] validates submissions into an
//! [`record::InputRecord`] and scores it with the model loaded at startup,
//! and [`server`] serves the input form.

pub mod config;
pub mod error;
pub mod fields;
pub mod model;
pub mod predictor;
pub mod record;
pub mod server;
pub mod ui;

pub use error::{Bound, ConfigurationError, PredictionError, ValidationError};
pub use fields::{FieldDef, FieldKind, FieldRange, FieldRegistry};
pub use model::{ForestModel, ModelSlot, RegressionModel};
pub use predictor::{PredictionOutcome, Predictor, ScoreConvention};
pub use record::InputRecord;
