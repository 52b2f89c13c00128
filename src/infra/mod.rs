// ============================================================
// Layer 6: Infrastructure Layer
// ============================================================
// Filesystem concerns that the model itself knows nothing about:
//
//   config_store.rs - TransformerConfig persistence
//                     Writes the architecture as pretty JSON
//                     and validates it again on the way back,
//                     so a hand-edited file fails at load time
//                     instead of halfway through construction.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// Model config saving and loading
pub mod config_store;

pub use config_store::ConfigStore;
