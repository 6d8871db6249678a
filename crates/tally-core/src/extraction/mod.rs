//! Four-stage amount extraction: tokenize, normalize, classify, finalize.

pub mod classifier;
pub mod confidence;
pub mod finalizer;
pub mod normalizer;
pub mod pipeline;
pub mod rules;
pub mod tokenizer;

pub use classifier::{ClassifierOptions, ContextClassifier, EXPLICIT_SOURCE};
pub use confidence::{mean_confidence, round_confidence};
pub use finalizer::{build_provenance, Finalizer};
pub use normalizer::{normalize_token, parse_amount, NormalizedToken, Normalizer};
pub use pipeline::AmountPipeline;
pub use rules::{ExtractionMatch, FieldExtractor};
pub use tokenizer::Tokenizer;
