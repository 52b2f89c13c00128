// ============================================================
// Layer 1: CLI Commands and Arguments
// ============================================================
// Defines the three subcommands and all their flags:
//
//   init-config - write a model config JSON
//   inspect     - parameter counts and dummy-pass shapes
//   generate    - greedy-decode a comma-separated id list
//
// The architecture flags live in one `ModelArgs` group that is
// flattened into every subcommand.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use seq2seq_transformer::application::generate_use_case::GenerateOptions;
use seq2seq_transformer::domain::SpecialTokens;
use seq2seq_transformer::ml::TransformerConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a model config to <config-dir>/transformer_config.json
    InitConfig(InitConfigArgs),

    /// Print parameter counts and the shapes of one dummy forward pass
    Inspect(InspectArgs),

    /// Greedy-decode a source id sequence with freshly initialised weights
    Generate(GenerateArgs),
}

/// Transformer architecture flags.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Number of distinct source token ids
    #[arg(long, default_value_t = 1000)]
    pub src_vocab_size: usize,

    /// Number of distinct target token ids
    #[arg(long, default_value_t = 1000)]
    pub tgt_vocab_size: usize,

    /// Longest source sequence the positional table covers
    #[arg(long, default_value_t = 64)]
    pub src_seq_len: usize,

    /// Longest target sequence the positional table covers
    #[arg(long, default_value_t = 64)]
    pub tgt_seq_len: usize,

    /// Hidden dimension (d_model in the paper)
    #[arg(long, default_value_t = 512)]
    pub d_model: usize,

    /// Encoder blocks, and decoder blocks
    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Attention heads; d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 2048)]
    pub d_ff: usize,

    /// Dropout probability, only active in training mode
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Added to the standard deviation in every layer norm
    #[arg(long, default_value_t = 1e-6)]
    pub layer_norm_eps: f64,
}

/// The application layer never sees clap types.
impl From<ModelArgs> for TransformerConfig {
    fn from(a: ModelArgs) -> Self {
        TransformerConfig::new(a.src_vocab_size, a.tgt_vocab_size, a.src_seq_len, a.tgt_seq_len)
            .with_d_model(a.d_model)
            .with_num_layers(a.num_layers)
            .with_num_heads(a.num_heads)
            .with_d_ff(a.d_ff)
            .with_dropout(a.dropout)
            .with_layer_norm_eps(a.layer_norm_eps)
    }
}

#[derive(Args, Debug)]
pub struct InitConfigArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Directory to write the config into (created if missing)
    #[arg(long, default_value = "runs/default")]
    pub config_dir: String,

    /// Replace a config that is already there
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Load the architecture from this directory instead of the flags
    #[arg(long)]
    pub config_dir: Option<String>,

    /// Rows in the dummy batch
    #[arg(long, default_value_t = 2)]
    pub batch_size: usize,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Load the architecture from this directory instead of the flags
    #[arg(long)]
    pub config_dir: Option<String>,

    /// Source token ids, e.g. --src 1,57,902,2
    #[arg(long, value_delimiter = ',', required = true)]
    pub src: Vec<u32>,

    /// Stop after this many generated tokens
    #[arg(long, default_value_t = 32)]
    pub max_len: usize,

    /// Seed for parameter initialisation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 0)]
    pub pad: u32,

    #[arg(long, default_value_t = 1)]
    pub bos: u32,

    #[arg(long, default_value_t = 2)]
    pub eos: u32,
}

impl From<&GenerateArgs> for GenerateOptions {
    fn from(a: &GenerateArgs) -> Self {
        GenerateOptions {
            special: SpecialTokens { pad: a.pad, bos: a.bos, eos: a.eos },
            max_len: a.max_len,
            seed:    a.seed,
        }
    }
}
