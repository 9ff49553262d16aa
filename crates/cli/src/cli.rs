//! CLI argument definitions

use std::io::Read;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use nydus_builder::{BuildOptions, Builder, CheckOptions, CompactOptions, GenerateOptions};

use crate::config::CreateDefaults;

/// Build, compact and deduplicate RAFS images with nydus-image
#[derive(Debug, Parser, PartialEq, Eq)]
#[clap(name = nydus_builder_utils::NAME, version)]
pub(crate) struct Opt {
    /// Path to the nydus-image binary
    #[clap(long, env = "NYDUS_IMAGE", global = true)]
    pub(crate) nydus_image: Option<Utf8PathBuf>,

    /// Print the nydus-image command line instead of running it
    #[clap(long, global = true)]
    pub(crate) dry_run: bool,

    #[clap(subcommand)]
    pub(crate) cmd: Cmd,
}

#[derive(Debug, clap::Subcommand, PartialEq, Eq)]
pub(crate) enum Cmd {
    /// Build the bootstrap and blob for a layer
    Create(CreateOpts),

    /// Compact a bootstrap, removing unused chunks and merging small blobs
    Compact(CompactOpts),

    /// Generate a chunk dictionary from several bootstraps
    #[clap(name = "chunkdict-generate")]
    ChunkdictGenerate(GenerateOpts),

    /// Validate a bootstrap
    Check(CheckOpts),
}

#[derive(Debug, Parser, PartialEq, Eq)]
pub(crate) struct CreateOpts {
    /// Bootstrap of the parent layer
    #[clap(long)]
    pub(crate) parent_bootstrap: Option<Utf8PathBuf>,

    /// Chunk dictionary for deduplication, e.g. bootstrap=/path/dict.boot
    #[clap(long)]
    pub(crate) chunk_dict: Option<String>,

    /// Output path of the bootstrap
    #[clap(long)]
    pub(crate) bootstrap: Utf8PathBuf,

    /// Output path of the blob; may be a fifo
    #[clap(long)]
    pub(crate) blob: Utf8PathBuf,

    /// File to save the JSON result into
    #[clap(long)]
    pub(crate) output_json: Utf8PathBuf,

    /// Whiteout convention of the source [default: oci]
    #[clap(long)]
    pub(crate) whiteout_spec: Option<String>,

    /// RAFS version [default: 6]
    #[clap(long)]
    pub(crate) fs_version: Option<String>,

    /// Compression algorithm
    #[clap(long)]
    pub(crate) compressor: Option<String>,

    /// Chunk size, e.g. 0x100000
    #[clap(long)]
    pub(crate) chunk_size: Option<String>,

    /// Align uncompressed chunks to 4K
    #[clap(long)]
    pub(crate) aligned_chunk: bool,

    /// File with newline separated prefetch patterns, or `-` for stdin
    #[clap(long)]
    pub(crate) prefetch_patterns: Option<Utf8PathBuf>,

    /// Storage backend type
    #[clap(long)]
    pub(crate) backend_type: Option<String>,

    /// Storage backend configuration
    #[clap(long)]
    pub(crate) backend_config: Option<String>,

    /// Root filesystem to build from
    pub(crate) rootfs: Utf8PathBuf,
}

#[derive(Debug, Parser, PartialEq, Eq)]
pub(crate) struct CompactOpts {
    /// Bootstrap to compact
    #[clap(long)]
    pub(crate) bootstrap: Utf8PathBuf,

    /// Local directory for blobs not in the backend, also for output blobs
    #[clap(long)]
    pub(crate) blob_dir: Utf8PathBuf,

    /// Lower bound of used ratio for blobs to be kept (0-99, 0 disables)
    #[clap(long, default_value = "5")]
    pub(crate) min_used_ratio: String,

    /// Upper bound of blob size for blobs to be compacted, in bytes
    #[clap(long, default_value = "10485760")]
    pub(crate) compact_blob_size: String,

    /// Upper bound of compacted blob size, in bytes
    #[clap(long, default_value = "104857600")]
    pub(crate) max_compact_size: String,

    /// Compact only if there are at least this many blobs (0 always compacts)
    #[clap(long, default_value = "32")]
    pub(crate) layers_to_compact: String,

    /// Storage backend type
    #[clap(long)]
    pub(crate) backend_type: String,

    /// Storage backend configuration file
    #[clap(long)]
    pub(crate) backend_config_file: Utf8PathBuf,

    /// File to save the JSON result into
    #[clap(long)]
    pub(crate) output_json: Utf8PathBuf,

    /// Output bootstrap [default: <bootstrap>.compact]
    #[clap(long)]
    pub(crate) output_bootstrap: Option<Utf8PathBuf>,

    /// Chunk dictionary to compact against
    #[clap(long)]
    pub(crate) chunk_dict: Option<String>,
}

#[derive(Debug, Parser, PartialEq, Eq)]
pub(crate) struct GenerateOpts {
    /// Output path of the chunk dictionary bootstrap
    #[clap(long)]
    pub(crate) bootstrap: Utf8PathBuf,

    /// Database for chunk statistics, e.g. sqlite:///path/database.db
    #[clap(long)]
    pub(crate) database: String,

    /// File to save the JSON result into
    #[clap(long)]
    pub(crate) output_json: Utf8PathBuf,

    /// Bootstraps to aggregate
    #[clap(required = true)]
    pub(crate) bootstraps: Vec<Utf8PathBuf>,
}

#[derive(Debug, Parser, PartialEq, Eq)]
pub(crate) struct CheckOpts {
    /// Bootstrap to validate
    #[clap(long)]
    pub(crate) bootstrap: Utf8PathBuf,

    /// Directory hosting the data blobs
    #[clap(long)]
    pub(crate) blob_dir: Option<Utf8PathBuf>,

    /// File to save the JSON result into
    #[clap(long)]
    pub(crate) output_json: Utf8PathBuf,

    /// Print the inode tree while checking
    #[clap(long, short = 'v')]
    pub(crate) verbose: bool,
}

/// Used when neither the command line nor the configuration names a binary.
pub(crate) const DEFAULT_NYDUS_IMAGE: &str = "nydus-image";

/// The binary to run; `--nydus-image` (or `NYDUS_IMAGE`) wins over the
/// configuration file.
pub(crate) fn resolve_binary(
    flag: Option<Utf8PathBuf>,
    config: Option<Utf8PathBuf>,
) -> Utf8PathBuf {
    flag.or(config)
        .unwrap_or_else(|| DEFAULT_NYDUS_IMAGE.into())
}

impl Cmd {
    /// The nydus-image arguments for this subcommand.
    pub(crate) fn args(self, defaults: &CreateDefaults) -> Result<Vec<String>> {
        let args = match self {
            Cmd::Create(o) => o.into_options(defaults)?.args(),
            Cmd::Compact(o) => CompactOptions::from(o).args(),
            Cmd::ChunkdictGenerate(o) => GenerateOptions::from(o).args(),
            Cmd::Check(o) => CheckOptions::from(o).args(),
        };
        Ok(args)
    }
}

/// The line printed by `--dry-run`.
pub(crate) fn dry_run_line(builder: &Builder, cmd: Cmd, defaults: &CreateDefaults) -> Result<String> {
    Ok(builder.command_line(&cmd.args(defaults)?))
}

fn read_prefetch_patterns(path: &Utf8Path) -> Result<String> {
    if path.as_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Reading prefetch patterns from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Reading prefetch patterns from {path}"))
}

impl CreateOpts {
    pub(crate) fn into_options(self, defaults: &CreateDefaults) -> Result<BuildOptions> {
        let prefetch_patterns = match &self.prefetch_patterns {
            Some(p) => read_prefetch_patterns(p)?,
            None => String::new(),
        };
        Ok(BuildOptions {
            parent_bootstrap_path: self.parent_bootstrap,
            chunk_dict: self.chunk_dict,
            bootstrap_path: self.bootstrap,
            rootfs_path: self.rootfs,
            backend_type: self.backend_type,
            backend_config: self.backend_config,
            whiteout_spec: self
                .whiteout_spec
                .or_else(|| defaults.whiteout_spec.clone())
                .unwrap_or_else(|| "oci".into()),
            output_json_path: self.output_json,
            prefetch_patterns,
            blob_path: self.blob,
            aligned_chunk: self.aligned_chunk,
            compressor: self.compressor.or_else(|| defaults.compressor.clone()),
            chunk_size: self.chunk_size.or_else(|| defaults.chunk_size.clone()),
            fs_version: self
                .fs_version
                .or_else(|| defaults.fs_version.clone())
                .unwrap_or_else(|| "6".into()),
        })
    }
}

impl From<CompactOpts> for CompactOptions {
    fn from(o: CompactOpts) -> Self {
        Self {
            chunk_dict: o.chunk_dict,
            bootstrap_path: o.bootstrap,
            output_bootstrap_path: o.output_bootstrap,
            backend_type: o.backend_type,
            backend_config_path: o.backend_config_file,
            output_json_path: o.output_json,
            min_used_ratio: o.min_used_ratio,
            compact_blob_size: o.compact_blob_size,
            max_compact_size: o.max_compact_size,
            layers_to_compact: o.layers_to_compact,
            blobs_dir: o.blob_dir,
        }
    }
}

impl From<GenerateOpts> for GenerateOptions {
    fn from(o: GenerateOpts) -> Self {
        Self {
            bootstrap_paths: o.bootstraps,
            database_path: o.database,
            chunkdict_bootstrap_path: o.bootstrap,
            output_path: o.output_json,
        }
    }
}

impl From<CheckOpts> for CheckOptions {
    fn from(o: CheckOpts) -> Self {
        Self {
            bootstrap_path: o.bootstrap,
            blob_dir: o.blob_dir,
            output_json_path: o.output_json,
            verbose: o.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Opt {
        Opt::try_parse_from(std::iter::once("nydus-build").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_create_defaults() {
        let opt = parse(&[
            "create",
            "--bootstrap",
            "/out/boot",
            "--blob",
            "/out/blob",
            "--output-json",
            "/out.json",
            "/rootfs",
        ]);
        let Cmd::Create(opts) = opt.cmd else {
            panic!("expected create");
        };
        let opts = opts.into_options(&CreateDefaults::default()).unwrap();
        assert_eq!(
            opts.args().join(" "),
            "create --bootstrap /out/boot --log-level warn --whiteout-spec oci --output-json /out.json --blob /out/blob --fs-version 6 /rootfs"
        );
    }

    #[test]
    fn test_create_config_and_flags() {
        let opt = parse(&[
            "--dry-run",
            "create",
            "--bootstrap",
            "/b",
            "--blob",
            "/blob",
            "--output-json",
            "/o.json",
            "--fs-version",
            "5",
            "/rootfs",
        ]);
        assert!(opt.dry_run);
        let Cmd::Create(opts) = opt.cmd else {
            panic!("expected create");
        };
        let defaults = CreateDefaults {
            fs_version: Some("6".into()),
            compressor: Some("zstd".into()),
            ..Default::default()
        };
        let opts = opts.into_options(&defaults).unwrap();
        // The flag wins over the configuration
        assert_eq!(opts.fs_version, "5");
        assert_eq!(opts.compressor.as_deref(), Some("zstd"));
        assert_eq!(opts.whiteout_spec, "oci");
    }

    #[test]
    fn test_compact_defaults() {
        let opt = parse(&[
            "compact",
            "--bootstrap",
            "/boot",
            "--blob-dir",
            "/blobs",
            "--backend-type",
            "registry",
            "--backend-config-file",
            "/backend.json",
            "--output-json",
            "/o.json",
        ]);
        let Cmd::Compact(opts) = opt.cmd else {
            panic!("expected compact");
        };
        let opts = CompactOptions::from(opts);
        assert_eq!(opts.min_used_ratio, "5");
        assert_eq!(opts.layers_to_compact, "32");
        assert_eq!(opts.output_bootstrap_path, None);
    }

    #[test]
    fn test_generate_requires_bootstraps() {
        let r = Opt::try_parse_from([
            "nydus-build",
            "chunkdict-generate",
            "--bootstrap",
            "/cd",
            "--database",
            "/db",
            "--output-json",
            "/o.json",
        ]);
        assert!(r.is_err());

        let opt = parse(&[
            "chunkdict-generate",
            "--bootstrap",
            "/cd",
            "--database",
            "/db",
            "--output-json",
            "/o.json",
            "/a",
            "/b",
        ]);
        let Cmd::ChunkdictGenerate(opts) = opt.cmd else {
            panic!("expected chunkdict-generate");
        };
        let opts = GenerateOptions::from(opts);
        similar_asserts::assert_eq!(
            opts.bootstrap_paths,
            vec![Utf8PathBuf::from("/a"), Utf8PathBuf::from("/b")]
        );
    }

    #[test]
    fn test_nydus_image_flag() {
        let opt = parse(&[
            "check",
            "--nydus-image",
            "/opt/nydus-image",
            "--bootstrap",
            "/boot",
            "--output-json",
            "/o.json",
        ]);
        assert_eq!(opt.nydus_image, Some(Utf8PathBuf::from("/opt/nydus-image")));
    }

    #[test]
    fn test_resolve_binary() {
        let flag = Some(Utf8PathBuf::from("/flag/nydus-image"));
        let config = Some(Utf8PathBuf::from("/config/nydus-image"));
        assert_eq!(resolve_binary(flag, config.clone()).as_str(), "/flag/nydus-image");
        assert_eq!(resolve_binary(None, config).as_str(), "/config/nydus-image");
        assert_eq!(resolve_binary(None, None).as_str(), DEFAULT_NYDUS_IMAGE);
    }

    #[test]
    fn test_dry_run_line() {
        let opt = parse(&[
            "--dry-run",
            "check",
            "--nydus-image",
            "/opt/nydus-image",
            "--bootstrap",
            "/boot",
            "--output-json",
            "/o.json",
        ]);
        assert!(opt.dry_run);
        let builder = Builder::new(resolve_binary(opt.nydus_image, None));
        let line = dry_run_line(&builder, opt.cmd, &CreateDefaults::default()).unwrap();
        assert!(line.starts_with(builder.binary().as_str()));
        assert_eq!(
            line,
            "/opt/nydus-image check --log-level warn --output-json /o.json /boot"
        );
    }

    #[test]
    fn test_dry_run_line_uses_create_defaults() {
        let opt = parse(&[
            "create",
            "--bootstrap",
            "/b",
            "--blob",
            "/blob",
            "--output-json",
            "/o.json",
            "/rootfs",
        ]);
        let defaults = CreateDefaults {
            compressor: Some("lz4_block".into()),
            whiteout_spec: Some("overlayfs".into()),
            ..Default::default()
        };
        let line = dry_run_line(&Builder::new("nydus-image"), opt.cmd, &defaults).unwrap();
        assert_eq!(
            line,
            "nydus-image create --bootstrap /b --log-level warn --whiteout-spec overlayfs \
             --output-json /o.json --blob /blob --fs-version 6 --compressor lz4_block /rootfs"
        );
    }
}
