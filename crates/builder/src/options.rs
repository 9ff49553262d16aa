//! Option structs for each `nydus-image` subcommand, and their translation
//! into argument vectors.

use camino::Utf8PathBuf;

/// Options for `nydus-image create`, which builds the bootstrap and blob for
/// a single layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// Bootstrap of the parent layer, if this layer is stacked on one.
    pub parent_bootstrap_path: Option<Utf8PathBuf>,
    /// Chunk dictionary reference, e.g. `bootstrap=/path/to/dict.boot`.
    pub chunk_dict: Option<String>,
    /// Where to write the generated bootstrap.
    pub bootstrap_path: Utf8PathBuf,
    /// The root filesystem to build from.
    pub rootfs_path: Utf8PathBuf,
    /// Storage backend type. Not forwarded to `create`, which always writes
    /// the blob locally.
    pub backend_type: Option<String>,
    /// Storage backend configuration. Not forwarded to `create`.
    pub backend_config: Option<String>,
    /// Whiteout convention of the source layer, e.g. `oci` or `overlayfs`.
    pub whiteout_spec: String,
    /// Where `nydus-image` writes its JSON result.
    pub output_json_path: Utf8PathBuf,
    /// Newline separated prefetch patterns; sent on standard input.
    pub prefetch_patterns: String,
    /// A regular file or fifo into which `nydus-image` dumps the blob.
    pub blob_path: Utf8PathBuf,
    /// Align uncompressed chunks to 4K.
    pub aligned_chunk: bool,
    /// Compression algorithm, e.g. `zstd` or `lz4_block`.
    pub compressor: Option<String>,
    /// Chunk size, e.g. `0x100000`.
    pub chunk_size: Option<String>,
    /// RAFS filesystem version, `5` or `6`.
    pub fs_version: String,
}

/// Options for `nydus-image compact`.
///
/// The thresholds are passed through as strings; `nydus-image` does the
/// parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompactOptions {
    /// Chunk dictionary reference to compact against.
    pub chunk_dict: Option<String>,
    /// Bootstrap to compact.
    pub bootstrap_path: Utf8PathBuf,
    /// Output bootstrap; `nydus-image` defaults to `<bootstrap>.compact`.
    pub output_bootstrap_path: Option<Utf8PathBuf>,
    /// Storage backend type.
    pub backend_type: String,
    /// Storage backend configuration file.
    pub backend_config_path: Utf8PathBuf,
    /// Where `nydus-image` writes its JSON result.
    pub output_json_path: Utf8PathBuf,
    /// Blobs with a lower used ratio than this (0-99) are rewritten.
    pub min_used_ratio: String,
    /// Blobs smaller than this many bytes are merged.
    pub compact_blob_size: String,
    /// Upper bound of a compacted blob, in bytes.
    pub max_compact_size: String,
    /// Only compact when there are at least this many blobs; 0 means always.
    pub layers_to_compact: String,
    /// Local directory for blobs not present in the backend, and for output.
    pub blobs_dir: Utf8PathBuf,
}

/// Options for `nydus-image chunkdict generate`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Bootstraps to aggregate, in order.
    pub bootstrap_paths: Vec<Utf8PathBuf>,
    /// Database used to collect chunk statistics, e.g. `sqlite:///tmp/db`.
    pub database_path: String,
    /// Where to write the chunk dictionary bootstrap.
    pub chunkdict_bootstrap_path: Utf8PathBuf,
    /// Where `nydus-image` writes its JSON result.
    pub output_path: Utf8PathBuf,
}

/// Options for `nydus-image check`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Bootstrap to validate.
    pub bootstrap_path: Utf8PathBuf,
    /// Local directory hosting the data blobs.
    pub blob_dir: Option<Utf8PathBuf>,
    /// Where `nydus-image` writes its JSON result.
    pub output_json_path: Utf8PathBuf,
    /// Print the inode tree while checking.
    pub verbose: bool,
}

/// Returns the value if it is present and non-empty.
fn set<S: AsRef<str>>(v: &Option<S>) -> Option<&str> {
    v.as_ref().map(AsRef::<str>::as_ref).filter(|s| !s.is_empty())
}

/// Accumulates an argument vector.
#[derive(Debug, Default)]
struct Args(Vec<String>);

impl Args {
    fn arg(&mut self, a: impl Into<String>) -> &mut Self {
        self.0.push(a.into());
        self
    }

    fn flag(&mut self, name: &str, value: impl AsRef<str>) -> &mut Self {
        self.arg(name).arg(value.as_ref())
    }

    fn flag_if_set<S: AsRef<str>>(&mut self, name: &str, value: &Option<S>) -> &mut Self {
        if let Some(v) = set(value) {
            self.flag(name, v);
        }
        self
    }

    fn finish(&mut self) -> Vec<String> {
        std::mem::take(&mut self.0)
    }
}

impl BuildOptions {
    /// The `nydus-image` arguments for this build.
    pub fn args(&self) -> Vec<String> {
        let mut args = Args::default();
        args.arg("create");
        args.flag_if_set("--parent-bootstrap", &self.parent_bootstrap_path);
        if self.aligned_chunk {
            args.arg("--aligned-chunk");
        }
        args.flag_if_set("--chunk-dict", &self.chunk_dict)
            .flag("--bootstrap", &self.bootstrap_path)
            .flag("--log-level", "warn")
            .flag("--whiteout-spec", &self.whiteout_spec)
            .flag("--output-json", &self.output_json_path)
            .flag("--blob", &self.blob_path)
            .flag("--fs-version", &self.fs_version)
            .flag_if_set("--compressor", &self.compressor);
        // The patterns themselves are fed through stdin.
        if !self.prefetch_patterns.is_empty() {
            args.flag("--prefetch-policy", "fs");
        }
        args.flag_if_set("--chunk-size", &self.chunk_size)
            .arg(self.rootfs_path.as_str())
            .finish()
    }
}

impl CompactOptions {
    /// The `nydus-image` arguments for this compaction.
    pub fn args(&self) -> Vec<String> {
        Args::default()
            .arg("compact")
            .flag("--bootstrap", &self.bootstrap_path)
            .flag("--blob-dir", &self.blobs_dir)
            .flag("--min-used-ratio", &self.min_used_ratio)
            .flag("--compact-blob-size", &self.compact_blob_size)
            .flag("--max-compact-size", &self.max_compact_size)
            .flag("--layers-to-compact", &self.layers_to_compact)
            .flag("--backend-type", &self.backend_type)
            .flag("--backend-config-file", &self.backend_config_path)
            .flag("--log-level", "info")
            .flag("--output-json", &self.output_json_path)
            .flag_if_set("--output-bootstrap", &self.output_bootstrap_path)
            .flag_if_set("--chunk-dict", &self.chunk_dict)
            .finish()
    }
}

impl GenerateOptions {
    /// The `nydus-image` arguments for generating this chunk dictionary.
    pub fn args(&self) -> Vec<String> {
        let mut args = Args::default();
        args.arg("chunkdict")
            .arg("generate")
            .flag("--log-level", "warn")
            .flag("--bootstrap", &self.chunkdict_bootstrap_path)
            .flag("--database", &self.database_path)
            .flag("--output-json", &self.output_path);
        for bootstrap in &self.bootstrap_paths {
            args.arg(bootstrap.as_str());
        }
        args.finish()
    }
}

impl CheckOptions {
    /// The `nydus-image` arguments for this check.
    pub fn args(&self) -> Vec<String> {
        let mut args = Args::default();
        args.arg("check")
            .flag("--log-level", "warn")
            .flag("--output-json", &self.output_json_path)
            .flag_if_set("--blob-dir", &self.blob_dir);
        if self.verbose {
            args.arg("--verbose");
        }
        // `--bootstrap` is deprecated for check in favor of the positional.
        args.arg(self.bootstrap_path.as_str()).finish()
    }
}
