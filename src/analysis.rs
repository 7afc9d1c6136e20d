use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use snafu::{ResultExt, Snafu};

use batchframe::{load_folder, run_batch, Frame, Task, DEFAULT_PATTERN};

use crate::args::Args;

pub mod charts;
pub mod insights;
pub mod map;
pub mod proposals;
pub mod regions;

#[derive(Debug, Snafu)]
pub enum AnalysisError {
    #[snafu(display("could not create the output directory {}: {source}", path.display()))]
    CreatingSink {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("could not load dataset {name}: {source}"))]
    LoadingDataset {
        source: batchframe::LoadError,
        name: String,
    },
    #[snafu(display("dataset {dataset} is missing the expected column {column}"))]
    MissingColumn { dataset: String, column: String },
    #[snafu(display("could not write report: {source}"))]
    WritingReport { source: batchframe::FrameError },
    #[snafu(display("could not render {}: {source}", path.display()))]
    RenderingArtifact {
        source: std::io::Error,
        path: PathBuf,
    },
    #[snafu(display("could not read proposals under {}: {source}", dir.display()))]
    ReadingProposals {
        source: std::io::Error,
        dir: PathBuf,
    },
    #[snafu(display("could not open config file {path}: {source}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("could not parse config file {path}: {source}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("invalid social-network pattern: {source}"))]
    BadNetworkPattern { source: regex::Error },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

pub mod config_reader {
    use serde::{Deserialize, Serialize};
    use snafu::ResultExt;

    use super::{AnalysisResult, OpeningConfigSnafu, ParsingConfigSnafu};

    /// Optional run settings read from a JSON file. Every field may be
    /// omitted; command-line flags win over file values.
    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    pub struct FileConfig {
        #[serde(rename = "dataDir")]
        pub data_dir: Option<String>,
        #[serde(rename = "outputDirectory")]
        pub output_directory: Option<String>,
        #[serde(rename = "proposalsDir")]
        pub proposals_dir: Option<String>,
        pub workers: Option<usize>,
    }

    pub fn read_config(path: &str) -> AnalysisResult<FileConfig> {
        let contents = std::fs::read_to_string(path).context(OpeningConfigSnafu { path })?;
        serde_json::from_str(&contents).context(ParsingConfigSnafu { path })
    }
}

/// Fully resolved run settings. No global state: the sink path and worker
/// count travel explicitly into everything that needs them.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub proposals_dir: PathBuf,
    pub workers: usize,
}

impl AnalysisConfig {
    pub fn resolve(args: &Args) -> AnalysisResult<AnalysisConfig> {
        let file = match &args.config {
            Some(path) => config_reader::read_config(path)?,
            None => config_reader::FileConfig::default(),
        };
        let data_dir = PathBuf::from(
            args.data_dir
                .clone()
                .or(file.data_dir)
                .unwrap_or_else(|| "./data".to_string()),
        );
        let out_dir = PathBuf::from(
            args.out_dir
                .clone()
                .or(file.output_directory)
                .unwrap_or_else(|| "./output".to_string()),
        );
        let proposals_dir = args
            .proposals_dir
            .clone()
            .or(file.proposals_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("candidatos_propostas_governo").join("SC"));
        let workers = args
            .workers
            .or(file.workers)
            .unwrap_or_else(batchframe::default_workers);
        Ok(AnalysisConfig {
            data_dir,
            out_dir,
            proposals_dir,
            workers,
        })
    }
}

/// The loaded datasets, shared read-only across the report tasks.
struct Datasets {
    candidates: Arc<Frame>,
    assets: Arc<Frame>,
    complementary: Arc<Frame>,
    social: Arc<Frame>,
    coalitions: Arc<Frame>,
}

async fn load_dataset(config: &AnalysisConfig, name: &str) -> AnalysisResult<Arc<Frame>> {
    let frame = load_folder(&config.data_dir.join(name), DEFAULT_PATTERN, config.workers)
        .await
        .context(LoadingDatasetSnafu { name })?;
    info!(
        "dataset {}: {} rows, {} columns",
        name,
        frame.num_rows(),
        frame.columns().len()
    );
    Ok(Arc::new(frame))
}

async fn load_datasets(config: &AnalysisConfig) -> AnalysisResult<Datasets> {
    let datasets = Datasets {
        candidates: load_dataset(config, "candidatos").await?,
        assets: load_dataset(config, "candidatos_bens").await?,
        complementary: load_dataset(config, "candidatos_info_complementar").await?,
        social: load_dataset(config, "candidatos_redes_sociais").await?,
        coalitions: load_dataset(config, "coligacoes").await?,
    };
    // Loaded for parity with the source exports; no report consumes them yet.
    load_dataset(config, "motivo_cassacao").await?;
    load_dataset(config, "vagas").await?;
    Ok(datasets)
}

fn insight_tasks(config: &AnalysisConfig, data: &Datasets) -> Vec<Task<(), AnalysisError>> {
    let out = config.out_dir.clone();
    let mut tasks: Vec<Task<(), AnalysisError>> = Vec::new();
    {
        let candidates = Arc::clone(&data.candidates);
        let assets = Arc::clone(&data.assets);
        let out = out.clone();
        tasks.push(Task::new("media_bens_eleitos", move || {
            insights::elected_mayor_assets(&candidates, &assets, &out)
        }));
    }
    {
        let candidates = Arc::clone(&data.candidates);
        let coalitions = Arc::clone(&data.coalitions);
        let out = out.clone();
        tasks.push(Task::new("coligacoes_eleitos", move || {
            insights::coalition_size_versus_wins(&candidates, &coalitions, &out)
        }));
    }
    {
        let candidates = Arc::clone(&data.candidates);
        let out = out.clone();
        tasks.push(Task::new("maior_partido_por_uf", move || {
            insights::largest_party_per_state(&candidates, &out)
        }));
    }
    {
        let candidates = Arc::clone(&data.candidates);
        let out = out.clone();
        tasks.push(Task::new("distribuicao_partido_regiao", move || {
            insights::party_distribution_by_region(&candidates, &out)
        }));
    }
    {
        let candidates = Arc::clone(&data.candidates);
        let out = out.clone();
        tasks.push(Task::new("partido_dominante_uf", move || {
            insights::dominant_party_major_offices(&candidates, &out)
        }));
    }
    {
        let complementary = Arc::clone(&data.complementary);
        let out = out.clone();
        tasks.push(Task::new("indigenas_quilombolas_regiao", move || {
            insights::indigenous_quilombola_by_region(&complementary, &out)
        }));
    }
    {
        let social = Arc::clone(&data.social);
        let out = out.clone();
        tasks.push(Task::new("rede_social_uf", move || {
            insights::preferred_social_network(&social, &out)
        }));
    }
    {
        let proposals_dir = config.proposals_dir.clone();
        let stopwords = proposals::portuguese_stopwords();
        let out = out.clone();
        tasks.push(Task::new("termos_propostas", move || {
            insights::proposal_term_frequencies(&proposals_dir, &stopwords, &out)
        }));
    }
    {
        tasks.push(Task::new("resultado_eleicoes_mapa", move || {
            insights::election_results_map(&out)
        }));
    }
    tasks
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .expect("progress bar template")
            .progress_chars("█▓▒░"),
    );
    bar
}

/// Runs the whole analysis: bootstrap the sink, load the datasets, then run
/// every report through the worker pool. A failing report is logged and the
/// batch keeps going; the run itself only fails when the sink cannot be
/// created or a dataset directory cannot be scanned at all.
pub async fn run_analysis(config: &AnalysisConfig) -> AnalysisResult<()> {
    fs::create_dir_all(&config.out_dir).context(CreatingSinkSnafu {
        path: config.out_dir.clone(),
    })?;

    let data = load_datasets(config).await?;
    let tasks = insight_tasks(config, &data);

    let bar = progress_bar(tasks.len() as u64);
    bar.set_message("building reports");
    let outcomes = run_batch(tasks, config.workers, |outcome| {
        bar.inc(1);
        if let Err(e) = &outcome.result {
            warn!("report {} failed: {}", outcome.label, e);
        }
    })
    .await;
    bar.finish_with_message("reports complete");

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(
        "{}/{} reports succeeded",
        outcomes.len() - failed,
        outcomes.len()
    );
    Ok(())
}
