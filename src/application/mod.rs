// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Orchestrates the lower layers for each command-line task:
//
//   inspect_use_case.rs  - build a model, report its parameter
//                          counts and the tensor shapes of one
//                          dummy encode → decode → project pass
//   generate_use_case.rs - build a model and greedy-decode a
//                          source id sequence
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

use anyhow::Result;
use std::path::Path;

use crate::infra::ConfigStore;
use crate::ml::TransformerConfig;

/// Backend the use cases run on: CPU by default, GPU with `--features wgpu`.
#[cfg(not(feature = "wgpu"))]
pub type AppBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type AppBackend = burn::backend::Wgpu;

/// Model summary and dummy-pass shapes
pub mod inspect_use_case;

/// Greedy decoding of one source sequence
pub mod generate_use_case;

/// Use the config saved in `config_dir` when there is one, else `fallback`.
pub fn resolve_config(config_dir: Option<&Path>, fallback: TransformerConfig) -> Result<TransformerConfig> {
    match config_dir {
        Some(dir) => {
            let store  = ConfigStore::new(dir);
            let config = store.load()?;
            tracing::info!("Loaded model config from '{}'", store.path().display());
            Ok(config)
        }
        None => {
            fallback.validate()?;
            Ok(fallback)
        }
    }
}
