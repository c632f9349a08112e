use clap::Parser;
use env_logger::Builder as LogBuilder;
use log::info;
use pwm_bench::dataset::{Dataset, DatasetReader};
use pwm_bench::error::MotifError;
use pwm_bench::eval::{write_frame_tsv, Evaluation, Evaluator};
use pwm_bench::metrics::{Metric, MetricSelection};
use pwm_bench::motif::{read_motifs, MotifFormat};
use pwm_bench::occupancy::Scanner;
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Motif(#[from] MotifError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Parser)]
#[command(
    name = "motif-bench",
    about = "Scores DNA binding motifs against measured binding intensities",
    long_about = "A tool for benchmarking position frequency matrices on binding-intensity data \
                  such as protein-binding microarrays. Every probe is scanned on both strands, \
                  window scores are pooled into a log-occupancy, and the occupancies are compared \
                  with the measured intensities by correlation, AUC or 8-mer metrics.",
    version,
    after_help = "Metrics: ASIS, EXP, LOG, ROC, PR, ROCLOG, PRLOG, MERS, LOGMERS\n\n\
                  Example usage:\n    \
                  motif-bench ASIS probes.txt motif.pcm\n    \
                  motif-bench all probes.txt motif.pcm\n    \
                  ls motifs/*.pcm | motif-bench ROC,PR probes.txt -\n    \
                  motif-bench --format annotated ASIS pbm_dir/ motifs.txt",
    color = clap::ColorChoice::Auto
)]
#[derive(Debug)]
struct Args {
    /// Metric name, comma-separated list of metrics, or `all`
    #[arg(value_name = "METRIC")]
    metric: String,

    /// Dataset file of (sequence, intensity) lines, or a directory of such files
    #[arg(value_name = "DATA")]
    data: PathBuf,

    /// Motif file(s), or `-` to read motif paths from standard input, one per line
    #[arg(value_name = "MOTIF", required = true)]
    motifs: Vec<String>,

    /// Motif file format: plain, meme or annotated
    #[arg(long, default_value = "plain")]
    format: MotifFormat,

    /// Pseudocount blended into every matrix, overriding the format defaults
    #[arg(long)]
    pseudocount: Option<f64>,

    /// Truncate every probe sequence to this many nucleotides
    #[arg(long)]
    trim_length: Option<usize>,

    /// Extension of the dataset files read from a directory (empty for all files)
    #[arg(long, default_value = "txt")]
    extension: String,

    /// Number of scanning threads
    #[arg(long)]
    threads: Option<usize>,

    /// Scan sequences on a single thread
    #[arg(long)]
    sequential: bool,

    /// Write per-probe predictions of the first motif on the first dataset to this TSV file
    #[arg(long, value_name = "PATH")]
    predictions: Option<PathBuf>,
}

fn render(evaluation: &Evaluation) -> Result<String, BenchError> {
    match evaluation {
        Evaluation::Single(value) => Ok(value.to_string()),
        Evaluation::Report(report) => Ok(serde_json::to_string(report)?),
    }
}

/// How results are laid out on stdout
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    /// One record per motif path read from stdin
    Batch,
    /// Motif x dataset table for a single metric
    Matrix(Metric),
    /// One number or one JSON record
    Single,
}

fn is_batch(args: &Args) -> bool {
    args.motifs.len() == 1 && args.motifs[0] == "-"
}

/// Picks the output mode once the number of loaded motifs is known.
///
/// A dataset directory or more than one motif gives the matrix, which only
/// holds a single metric.
fn output_mode(
    args: &Args,
    selection: &MetricSelection,
    model_count: usize,
) -> Result<Mode, BenchError> {
    if is_batch(args) {
        return Ok(Mode::Batch);
    }
    if !args.data.is_dir() && model_count <= 1 {
        return Ok(Mode::Single);
    }
    match selection {
        MetricSelection::Single(metric) => Ok(Mode::Matrix(*metric)),
        MetricSelection::Many(_) => Err(MotifError::invalid_parameter(
            "metric",
            &args.metric,
            "matrix output takes a single metric",
        )
        .into()),
    }
}

/// Checks the options batch mode cannot honour before any file is read.
fn check_batch_args(args: &Args) -> Result<(), BenchError> {
    if args.data.is_dir() {
        return Err(MotifError::invalid_parameter(
            "data",
            args.data.display(),
            "batch mode reads a single dataset file",
        )
        .into());
    }
    if args.predictions.is_some() {
        return Err(MotifError::invalid_parameter(
            "predictions",
            "set",
            "not available in batch mode",
        )
        .into());
    }
    Ok(())
}

fn batch_dataset<'a>(data: &Path, datasets: &'a [Dataset]) -> Result<&'a Dataset, BenchError> {
    match datasets {
        [dataset] => Ok(dataset),
        _ => Err(MotifError::invalid_parameter(
            "data",
            data.display(),
            "batch mode reads a single dataset file",
        )
        .into()),
    }
}

/// Scores every motif path read from `input` against one dataset.
///
/// Writes `<data>\t<motif>\t<record>` per motif; when a file holds several
/// motifs the second field is `<path>:<motif name>`.
fn run_batch<R: BufRead, W: Write>(
    args: &Args,
    evaluator: &Evaluator,
    dataset: &Dataset,
    selection: &MetricSelection,
    input: R,
    out: &mut W,
) -> Result<(), BenchError> {
    for line in input.lines() {
        let line = line?;
        let motif_path = line.trim();
        if motif_path.is_empty() {
            continue;
        }

        let models = read_motifs(motif_path, args.format, args.pseudocount)?;
        let named = models.len() > 1;
        for model in &models {
            let evaluation = evaluator.evaluate_selection(model, dataset, selection)?;
            let motif = if named {
                format!("{}:{}", motif_path, model.name())
            } else {
                motif_path.to_string()
            };
            writeln!(
                out,
                "{}\t{}\t{}",
                args.data.display(),
                motif,
                render(&evaluation)?
            )?;
        }
        out.flush()?;
    }

    Ok(())
}

fn load_datasets(args: &Args) -> Result<Vec<Dataset>, BenchError> {
    let extension = Some(args.extension.clone()).filter(|e| !e.is_empty());
    let reader = DatasetReader::new()
        .with_trim_length(args.trim_length)
        .with_extension(extension);
    Ok(reader.read(&args.data)?)
}

fn run_with<R: BufRead, W: Write>(
    args: &Args,
    evaluator: &Evaluator,
    input: R,
    out: &mut W,
) -> Result<(), BenchError> {
    let selection: MetricSelection = args.metric.parse()?;

    if is_batch(args) {
        check_batch_args(args)?;
        let datasets = load_datasets(args)?;
        let dataset = batch_dataset(&args.data, &datasets)?;
        return run_batch(args, evaluator, dataset, &selection, input, out);
    }

    let datasets = load_datasets(args)?;
    let mut models = Vec::new();
    for path in &args.motifs {
        models.extend(read_motifs(path, args.format, args.pseudocount)?);
    }
    info!(
        "loaded {} motif(s) and {} dataset(s)",
        models.len(),
        datasets.len()
    );
    let mode = output_mode(args, &selection, models.len())?;

    let (model, dataset) = match (models.first(), datasets.first()) {
        (Some(model), Some(dataset)) => (model, dataset),
        _ => return Err(MotifError::empty_input("no motif or no dataset loaded").into()),
    };

    if let Some(path) = &args.predictions {
        let mut df = evaluator.prediction_frame(model, dataset)?;
        write_frame_tsv(&mut df, BufWriter::new(File::create(path)?))?;
        info!("wrote predictions to {}", path.display());
    }

    match mode {
        Mode::Matrix(metric) => {
            let matrix = evaluator.score_matrix(&models, &datasets, metric)?;
            matrix.write_tsv(&mut *out)?;
        }
        Mode::Single | Mode::Batch => {
            let evaluation = evaluator.evaluate_selection(model, dataset, &selection)?;
            writeln!(out, "{}", render(&evaluation)?)?;
        }
    }

    out.flush()?;
    Ok(())
}

fn run(args: &Args) -> Result<(), BenchError> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }
    let scanner = if args.sequential {
        Scanner::sequential()
    } else {
        Scanner::parallel()
    };
    let evaluator = Evaluator::with_scorer(scanner);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    run_with(args, &evaluator, stdin.lock(), &mut out)
}

fn main() {
    let _ = LogBuilder::new()
        .parse_filters(&env::var("RUST_LOG").unwrap_or_default())
        .try_init();

    let start_time = std::time::Instant::now();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("motif-bench: {}", e);
        exit(1);
    }

    info!(
        "Total execution time: {:.4} minutes",
        start_time.elapsed().as_secs_f64() / 60.0
    );
}
