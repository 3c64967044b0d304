//! External service integrations.

pub mod backend;

pub use backend::{
    BackendError, PredictionBackend, RestPredictionBackend, StaticPredictionBackend,
};
