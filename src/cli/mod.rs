// ============================================================
// Layer 1: CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application); this layer
// only routes and prints.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use commands::{Commands, GenerateArgs, InitConfigArgs, InspectArgs};
use seq2seq_transformer::application::{
    generate_use_case::GenerateUseCase, inspect_use_case::InspectUseCase, resolve_config, AppBackend,
};
use seq2seq_transformer::infra::ConfigStore;
use seq2seq_transformer::ml::TransformerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-transformer",
    version,
    about = "Build, inspect and run an encoder-decoder Transformer."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::InitConfig(args) => run_init_config(args),
            Commands::Inspect(args)    => run_inspect(args),
            Commands::Generate(args)   => run_generate(args),
        }
    }
}

fn run_init_config(args: InitConfigArgs) -> Result<()> {
    let store = ConfigStore::new(&args.config_dir);
    if store.exists() {
        anyhow::ensure!(
            args.force,
            "'{}' already exists, pass --force to replace it",
            store.path().display()
        );
        tracing::warn!("Replacing existing config '{}'", store.path().display());
    }

    let config: TransformerConfig = args.model.into();
    let path = store.save(&config)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let config = resolve_config(args.config_dir.as_deref().map(Path::new), args.model.into())?;
    let report = InspectUseCase::new(config, args.batch_size).execute::<AppBackend>(&Default::default())?;

    println!("Parameters:");
    for (name, count) in &report.parameters {
        println!("  {name:<14} {count:>12}");
    }
    println!("  {:<14} {:>12}", "total", report.total_parameters);

    println!("\nShapes:");
    println!("  src ids        {:?}", report.src_shape);
    println!("  tgt ids        {:?}", report.tgt_shape);
    println!("  encode         {:?}", report.encoder_shape);
    println!("  decode         {:?}", report.decoder_shape);
    println!("  project        {:?}", report.log_probs_shape);

    println!("\nAttention weights:");
    for (block, shapes) in report.attention.iter().enumerate() {
        println!(
            "  block {block:<3} encoder self {:?}  decoder self {:?}  decoder cross {:?}",
            shapes.encoder_self, shapes.decoder_self, shapes.decoder_cross
        );
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let options = (&args).into();
    let config  = resolve_config(args.config_dir.as_deref().map(Path::new), args.model.into())?;

    let generation = GenerateUseCase::new(config, options).execute::<AppBackend>(&args.src, &Default::default())?;

    let ids: Vec<String> = generation.tokens.iter().map(u32::to_string).collect();
    println!("{}", ids.join(","));
    println!("log p = {:.4}", generation.total_log_prob());
    Ok(())
}
