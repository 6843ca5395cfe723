//! Embedding generation and vector-field document handling.
//!
//! Raw text reaches the server in two places: the `input` map of an
//! insert-many call and the `queryVector` of a `$vectorSearch` stage. Both
//! are rewritten into generated vectors through a single batched call to the
//! embedding service; the helpers here implement the batching contract, the
//! dotted-path document surgery and the dimension validation that guards
//! every insert.

mod document;
mod error;
mod params;
mod validate;
mod voyage;

pub use document::{delete_dotted_path, set_literal_key, value_at_path};
pub use error::{EmbeddingError, Result};
pub use params::{EmbeddingParameters, InputType, OutputDtype, VoyageModel};
pub use validate::{validate_document_vectors, vector_dimensions, VectorField};
pub use voyage::{EmbeddingService, VoyageClient, VOYAGE_API_BASE_URL};
