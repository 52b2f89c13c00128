// ============================================================
// Layer 3: Domain Layer
// ============================================================
// Plain Rust types that describe what the model consumes and
// produces, independent of any tensor framework.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// The ML layer (Layer 5) speaks these types at its boundary:
// it reports failures as `ModelError`, takes a `Mode` on every
// forward call, and the batcher consumes `TokenPair`s.
//
// Reference: Rust Book §5 (Structs), §6 (Enums), §10 (Traits)

/// Typed failures of the model core
pub mod error;

/// Training vs. inference switch passed down every forward call
pub mod mode;

/// Source/target id sequences and the reserved token ids
pub mod token_pair;

/// Core abstractions (traits) that other layers implement
pub mod traits;

pub use error::{ModelError, Result};
pub use mode::Mode;
pub use token_pair::{SpecialTokens, TokenPair};
pub use traits::{Generation, SequenceGenerator};
