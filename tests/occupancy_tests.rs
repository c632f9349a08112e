use pwm_bench::dataset::Dataset;
use pwm_bench::error::MotifError;
use pwm_bench::motif::{MotifModel, DEFAULT_PSEUDOCOUNT};
use pwm_bench::occupancy::{self, DatasetScorer, Scanner};
use pwm_bench::sequence::Sequence;

fn gata_model() -> MotifModel {
    let rows = vec![
        vec![0.1, 0.1, 0.7, 0.1],
        vec![0.8, 0.05, 0.05, 0.1],
        vec![0.05, 0.05, 0.05, 0.85],
        vec![0.85, 0.05, 0.05, 0.05],
    ];
    MotifModel::new("GATA", &rows, DEFAULT_PSEUDOCOUNT).unwrap()
}

fn uniform_model(len: usize) -> MotifModel {
    MotifModel::new("uniform", &vec![vec![0.25; 4]; len], DEFAULT_PSEUDOCOUNT).unwrap()
}

#[test]
fn test_window_count() {
    let model = gata_model();
    let seq = Sequence::new("ACGGATAAGC").unwrap();
    let scores = occupancy::window_scores(&model, &seq).unwrap();
    assert_eq!(scores.len(), 2 * (10 - 4 + 1));

    // forward windows first, then the reverse strand
    assert!((scores[3] - model.log_score(&seq, 3)).abs() < 1e-12);
    let rc = seq.reverse_complement();
    assert!((scores[7] - model.log_score(&rc, 0)).abs() < 1e-12);

    let exact = Sequence::new("GATA").unwrap();
    assert_eq!(occupancy::window_scores(&model, &exact).unwrap().len(), 2);
}

#[test]
fn test_sequence_shorter_than_motif() {
    let model = gata_model();
    let seq = Sequence::new("GAT").unwrap();
    assert!(matches!(
        occupancy::occupancy(&model, &seq),
        Err(MotifError::SequenceTooShort {
            length: 3,
            motif_length: 4,
            ..
        })
    ));
}

#[test]
fn test_log_sum_exp() {
    assert!((occupancy::log_sum_exp(&[0.0, 0.0]) - 2f64.ln()).abs() < 1e-12);
    assert!((occupancy::log_sum_exp(&[1.0, 2.0, 3.0]) - 3.40760596444438).abs() < 1e-9);

    // large negative log-scores do not underflow
    let pooled = occupancy::log_sum_exp(&[-1000.0, -1000.0]);
    assert!((pooled - (-1000.0 + 2f64.ln())).abs() < 1e-9);

    assert_eq!(occupancy::log_sum_exp(&[]), f64::NEG_INFINITY);
}

#[test]
fn test_log_sum_exp_is_monotonic() {
    let base = vec![-12.0, -8.5, -20.0, -9.25];
    let pooled = occupancy::log_sum_exp(&base);
    for idx in 0..base.len() {
        let mut raised = base.clone();
        raised[idx] += 0.5;
        assert!(occupancy::log_sum_exp(&raised) >= pooled);
    }
    assert!(pooled >= base.iter().cloned().fold(f64::NEG_INFINITY, f64::max));
}

#[test]
fn test_strand_symmetry() {
    let model = gata_model();
    for text in ["ACGGATAAGCTT", "TTATCTTAGGCA", "GATAGATAGATA"] {
        let seq = Sequence::new(text).unwrap();
        let forward = occupancy::occupancy(&model, &seq).unwrap();
        let reverse = occupancy::occupancy(&model, &seq.reverse_complement()).unwrap();
        assert!((forward - reverse).abs() < 1e-9);
    }
}

#[test]
fn test_uniform_model_ignores_content() {
    let model = uniform_model(3);
    let scores: Vec<f64> = ["AAAACCCC", "GGGGTTTT", "ACGTACGT"]
        .iter()
        .map(|s| occupancy::occupancy(&model, &Sequence::new(s).unwrap()).unwrap())
        .collect();

    assert_eq!(scores[0], scores[1]);
    assert_eq!(scores[1], scores[2]);
    let expected = (12f64).ln() + 3.0 * 0.25f64.ln();
    assert!((scores[0] - expected).abs() < 1e-9);
}

#[test]
fn test_scanner_parallel_matches_sequential() {
    let model = gata_model();
    let dataset = Dataset::from_pairs(&[
        ("AGATAAGCTTACGGATCC", 1.0),
        ("CCGTTACGGATCCAGTCA", 2.0),
        ("TTGATAAGATAACCGGTA", 3.0),
        ("ACGTACGTACGTACGTAC", 4.0),
    ])
    .unwrap();

    let parallel = Scanner::parallel().score_dataset(&model, &dataset).unwrap();
    let sequential = Scanner::sequential()
        .score_dataset(&model, &dataset)
        .unwrap();
    assert_eq!(parallel.len(), 4);
    assert_eq!(parallel, sequential);
    assert!(Scanner::default().is_parallel());

    // the GATA-rich probe scores highest
    assert!(parallel[2] > parallel[1]);
    assert!(parallel[2] > parallel[3]);
}

#[test]
fn test_scanner_reports_short_entry() {
    let model = gata_model();
    let dataset = Dataset::from_pairs(&[("ACGTACGT", 1.0), ("ACG", 2.0)]).unwrap();

    for scanner in [Scanner::parallel(), Scanner::sequential()] {
        match scanner.score_dataset(&model, &dataset) {
            Err(MotifError::SequenceTooShort {
                index,
                length,
                motif_length,
            }) => {
                assert_eq!(index, 1);
                assert_eq!(length, 3);
                assert_eq!(motif_length, 4);
            }
            other => panic!("expected SequenceTooShort, got {:?}", other),
        }
    }
}
