/// Register decoding and classification
///
/// Turns a raw meter message into a typed physical-quantity sample:
///
/// ```text
/// RawMessage ──into_text──▶ payload_text ──▶ decode_registers ──▶ classify
///                            (JSON/Buffer)     "[n1, ..., nk]"      ClassifiedSample
/// ```
///
/// - `types`: RawMessage, NumericRegisterArray, ClassifiedSample
/// - `payload`: inbound envelope normalisation (`data` field, Buffer objects)
/// - `decoder`: bracketed register list grammar
/// - `classifier`: ordered arity/range heuristic rules
/// - `harmonics`: total harmonic distortion from a harmonic series
pub mod classifier;
pub mod decoder;
pub mod harmonics;
pub mod payload;
pub mod types;

pub use classifier::{classify, RULES};
pub use decoder::decode_registers;
pub use harmonics::total_harmonic_distortion;
pub use payload::{is_buffer_shaped, normalize_buffer_data, payload_text};
pub use types::{ClassifiedSample, NumericRegisterArray, RawMessage, ThreePhase};
