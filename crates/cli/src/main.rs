//! The main entrypoint for nydus-build

use anyhow::{Context, Result};
use clap::Parser;
use fn_error_context::context;
use nydus_builder::{Builder, CheckOptions, CompactOptions};

mod cli;
mod config;

use cli::{Cmd, Opt};
use config::BuildConfig;

#[context("run")]
fn run() -> Result<()> {
    let opt = Opt::parse();

    nydus_builder_utils::initialize_tracing();
    tracing::trace!("starting {}", env!("CARGO_PKG_NAME"));

    let config = BuildConfig::load()?.unwrap_or_default();
    let builder = Builder::new(cli::resolve_binary(opt.nydus_image, config.nydus_image));
    tracing::debug!("Using {}", builder.binary());

    if opt.dry_run {
        println!("{}", cli::dry_run_line(&builder, opt.cmd, &config.create)?);
        return Ok(());
    }

    match opt.cmd {
        Cmd::Create(o) => {
            let opts = o.into_options(&config.create)?;
            builder
                .create(&opts)
                .with_context(|| format!("Building {}", opts.rootfs_path))?;
        }
        Cmd::Compact(o) => {
            let opts = CompactOptions::from(o);
            builder
                .compact(&opts)
                .with_context(|| format!("Compacting {}", opts.bootstrap_path))?;
        }
        Cmd::ChunkdictGenerate(o) => {
            builder
                .generate(&o.into())
                .context("Generating chunk dictionary")?;
        }
        Cmd::Check(o) => {
            let opts = CheckOptions::from(o);
            builder
                .check(&opts)
                .with_context(|| format!("Checking {}", opts.bootstrap_path))?;
        }
    }
    Ok(())
}

fn main() {
    nydus_builder_utils::run_main(run)
}
