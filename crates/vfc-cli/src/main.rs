//! vfc CLI: filter putative 2D matches with vector field consensus.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use vfc::{CorrespondenceSet, EstimationResult, FieldBasis, OutlierDensity, Vfc, VfcConfig};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "vfc")]
#[command(about = "Remove mismatches from 2D point correspondences (vector field consensus)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a set of correspondences and write the estimation result.
    Filter(CliFilterArgs),

    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliFilterArgs {
    /// Input JSON: `{source, target}` point lists or
    /// `{keypoints_1, keypoints_2, matches}` with `[query, train]` pairs.
    #[arg(long)]
    input: PathBuf,

    /// Path to write the estimation result (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Base configuration (JSON); omitted fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Gaussian kernel bandwidth β (normalized coordinates).
    #[arg(long)]
    bandwidth: Option<f64>,

    /// Smoothness weight λ.
    #[arg(long)]
    regularization: Option<f64>,

    /// Number of landmark centers (landmark basis only).
    #[arg(long)]
    landmark_count: Option<usize>,

    /// Posterior threshold for reporting a match as correct.
    #[arg(long)]
    threshold: Option<f64>,

    /// Landmark sampling seed; random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Maximum EM iterations.
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Field basis.
    #[arg(long, value_enum)]
    basis: Option<BasisArg>,

    /// Retained eigenpairs for `--basis low-rank`.
    #[arg(long, default_value = "50")]
    rank: usize,

    /// Use the target bounding box as the outlier area.
    #[arg(long)]
    target_extent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BasisArg {
    Landmarks,
    Full,
    LowRank,
}

impl BasisArg {
    fn to_core(self, rank: usize) -> FieldBasis {
        match self {
            Self::Landmarks => FieldBasis::Landmarks,
            Self::Full => FieldBasis::Full,
            Self::LowRank => FieldBasis::LowRank { rank },
        }
    }
}

impl CliFilterArgs {
    /// Apply command-line overrides on top of `base`.
    fn apply_overrides(&self, base: VfcConfig) -> VfcConfig {
        let mut config = base;
        if let Some(v) = self.bandwidth {
            config.bandwidth = v;
        }
        if let Some(v) = self.regularization {
            config.regularization = v;
        }
        if let Some(v) = self.landmark_count {
            config.landmark_count = Some(v);
        }
        if let Some(v) = self.threshold {
            config.classification_threshold = v;
        }
        if let Some(v) = self.seed {
            config.seed = Some(v);
        }
        if let Some(v) = self.max_iterations {
            config.max_iterations = v;
        }
        if let Some(basis) = self.basis {
            config.basis = basis.to_core(self.rank);
        }
        if self.target_extent {
            config.outlier_density = OutlierDensity::TargetExtent;
        }
        config
    }
}

// ── input / output ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MatchInput {
    Points {
        source: Vec<[f64; 2]>,
        target: Vec<[f64; 2]>,
    },
    Keypoints {
        keypoints_1: Vec<[f64; 2]>,
        keypoints_2: Vec<[f64; 2]>,
        matches: Vec<(usize, usize)>,
    },
}

impl MatchInput {
    fn to_set(&self) -> CliResult<CorrespondenceSet> {
        let set = match self {
            Self::Points { source, target } => CorrespondenceSet::from_points(source, target)?,
            Self::Keypoints {
                keypoints_1,
                keypoints_2,
                matches,
            } => CorrespondenceSet::from_index_pairs(keypoints_1, keypoints_2, matches)?,
        };
        Ok(set)
    }

    /// Surviving `[query, train]` pairs, for keypoint input only.
    fn correct_matches(&self, inliers: &[usize]) -> Option<Vec<(usize, usize)>> {
        match self {
            Self::Points { .. } => None,
            Self::Keypoints { matches, .. } => {
                Some(inliers.iter().map(|&k| matches[k]).collect())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct FilterOutput<'a> {
    #[serde(flatten)]
    result: &'a EstimationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    correct_matches: Option<Vec<(usize, usize)>>,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path, what: &str) -> CliResult<T> {
    let text = std::fs::read_to_string(path).map_err(|e| -> CliError {
        format!("Failed to read {} {}: {}", what, path.display(), e).into()
    })?;
    serde_json::from_str(&text).map_err(|e| -> CliError {
        format!("Failed to parse {} {}: {}", what, path.display(), e).into()
    })
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Filter(args) => run_filter(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

// ── default-config ────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    let json = serde_json::to_string_pretty(&VfcConfig::default())?;
    println!("{}", json);
    Ok(())
}

// ── filter ────────────────────────────────────────────────────────────

fn run_filter(args: &CliFilterArgs) -> CliResult<()> {
    tracing::info!("Loading matches: {}", args.input.display());
    let input: MatchInput = read_json(&args.input, "input")?;
    let set = input.to_set()?;

    let base = match &args.config {
        Some(path) => read_json(path, "config")?,
        None => VfcConfig::default(),
    };
    let config = args.apply_overrides(base);

    let vfc = Vfc::from_correspondences(set).with_config(config)?;
    tracing::info!("Filtering {} correspondences", vfc.len());
    let result = vfc.optimize();

    let correct = Vfc::obtain_correct_match(&result);
    tracing::info!(
        "Kept {}/{} matches after {} iterations (sigma2={:.3e}, gamma={:.3})",
        correct.len(),
        vfc.len(),
        result.diagnostics.iterations,
        result.mixture.sigma2,
        result.mixture.gamma,
    );

    let output = FilterOutput {
        result: &result,
        correct_matches: input.correct_matches(correct),
    };
    let json = serde_json::to_string_pretty(&output)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());

    Ok(())
}
