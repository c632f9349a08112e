use pwm_bench::error::MotifError;
use pwm_bench::motif::{self, MotifFormat, MotifModel, DEFAULT_PSEUDOCOUNT};
use pwm_bench::occupancy;
use pwm_bench::sequence::Sequence;

const TOLERANCE: f64 = 1e-12;

#[test]
fn test_rows_are_smoothed_distributions() {
    let rows = vec![
        vec![1.0, 0.0, 0.0, 0.0],
        vec![0.0, 0.0, 0.0, 1.0],
        vec![12.0, 2.0, 80.0, 6.0],
    ];
    let model = MotifModel::new("m", &rows, DEFAULT_PSEUDOCOUNT).unwrap();
    assert_eq!(model.len(), 3);
    assert_eq!(model.name(), "m");

    for row in model.matrix().rows() {
        assert!((row.sum() - 1.0).abs() < 1e-9);
        assert!(row.iter().all(|&v| v > 0.0));
    }

    let matrix = model.matrix();
    assert!((matrix[[0, 0]] - 0.9997).abs() < TOLERANCE);
    assert!((matrix[[0, 1]] - 1e-4).abs() < TOLERANCE);
    // counts are normalised before smoothing
    assert!((matrix[[2, 2]] - (0.9996 * 0.8 + 1e-4)).abs() < TOLERANCE);
}

#[test]
fn test_counts_and_probabilities_agree() {
    let counts = MotifModel::new("c", &[vec![10.0, 0.0, 30.0, 0.0]], 1e-3).unwrap();
    let probs = MotifModel::new("p", &[vec![0.25, 0.0, 0.75, 0.0]], 1e-3).unwrap();
    for (a, b) in counts.matrix().iter().zip(probs.matrix().iter()) {
        assert!((a - b).abs() < TOLERANCE);
    }
}

#[test]
fn test_invalid_matrices() {
    let short_row = MotifModel::new("m", &[vec![0.1, 0.2, 0.7]], DEFAULT_PSEUDOCOUNT);
    assert!(matches!(short_row, Err(MotifError::InvalidPwm(_))));

    let empty = MotifModel::new("m", &[], DEFAULT_PSEUDOCOUNT);
    assert!(matches!(empty, Err(MotifError::InvalidPwm(_))));

    let zero_row = MotifModel::new("m", &[vec![0.0; 4]], DEFAULT_PSEUDOCOUNT);
    assert!(matches!(zero_row, Err(MotifError::InvalidPwm(_))));

    let negative = MotifModel::new("m", &[vec![0.5, 0.5, -0.1, 0.1]], DEFAULT_PSEUDOCOUNT);
    assert!(matches!(negative, Err(MotifError::InvalidPwm(_))));

    for pseudocount in [-0.1, 1.5, f64::NAN] {
        assert!(matches!(
            MotifModel::new("m", &[vec![0.25; 4]], pseudocount),
            Err(MotifError::InvalidParameter { .. })
        ));
    }
}

#[test]
fn test_zero_pseudocount() {
    let rows = vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]];
    let model = MotifModel::new("AC", &rows, 0.0).unwrap();
    assert_eq!(model.matrix()[[0, 0]], 1.0);
    assert_eq!(model.matrix()[[0, 1]], 0.0);

    let seq = Sequence::new("GACA").unwrap();
    assert_eq!(model.log_score(&seq, 1), 0.0);
    assert_eq!(model.log_score(&seq, 0), f64::NEG_INFINITY);

    // one matching window keeps the pooled occupancy finite
    assert_eq!(occupancy::occupancy(&model, &seq).unwrap(), 0.0);
    let miss = Sequence::new("GGGG").unwrap();
    assert_eq!(
        occupancy::occupancy(&model, &miss).unwrap(),
        f64::NEG_INFINITY
    );
}

#[test]
fn test_log_score() {
    let rows = vec![vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]];
    let model = MotifModel::new("AC", &rows, DEFAULT_PSEUDOCOUNT).unwrap();

    let seq = Sequence::new("GACA").unwrap();
    assert!((model.log_score(&seq, 1) - 2.0 * 0.9997f64.ln()).abs() < TOLERANCE);
    assert!((model.log_score(&seq, 2) - 2.0 * 1e-4f64.ln()).abs() < TOLERANCE);
    assert!(
        (model.log_score(&seq, 0) - (1e-4f64.ln() + 1e-4f64.ln())).abs() < TOLERANCE
    );
}

#[test]
fn test_parse_plain() {
    let text = ">my motif \n\n1 0 0 0\n0 1 0 0\n";
    let model = motif::parse_plain(text, "fallback", None).unwrap();
    assert_eq!(model.name(), "my motif");
    assert_eq!(model.len(), 2);

    let model = motif::parse_plain("1 2 3 4\n", "fallback", None).unwrap();
    assert_eq!(model.name(), "fallback");

    let err = motif::parse_plain(">x\n0.1 0.2 zero 0.7\n", "x", None);
    assert!(matches!(err, Err(MotifError::InvalidPwm(_))));
}

#[test]
fn test_read_plain_files() {
    let motifs = motif::read_motifs("tests/data/motif.pcm", MotifFormat::Plain, None).unwrap();
    assert_eq!(motifs.len(), 1);
    assert_eq!(motifs[0].name(), "GATA_like");
    assert_eq!(motifs[0].len(), 4);

    let motifs =
        motif::read_motifs("tests/data/headerless.pcm", MotifFormat::Plain, None).unwrap();
    assert_eq!(motifs[0].name(), "headerless");
    assert_eq!(motifs[0].len(), 2);

    let result = motif::read_motifs("tests/data/bad_row.pcm", MotifFormat::Plain, None);
    assert!(matches!(result, Err(MotifError::InvalidPwm(_))));

    // test file does not exist
    let result = motif::read_motifs("tests/data/nonexistent.pcm", MotifFormat::Plain, None);
    assert!(matches!(result, Err(MotifError::Io(_))));
}

#[test]
fn test_read_meme_pseudocounts() {
    let motifs = motif::read_motifs("tests/data/motifs.meme", MotifFormat::Meme, None).unwrap();
    assert_eq!(motifs.len(), 2);
    assert_eq!(motifs[0].name(), "MA0001.1 AGL3");
    assert_eq!(motifs[0].len(), 3);
    assert_eq!(motifs[1].name(), "MA0002.2 RUNX1");
    assert_eq!(motifs[1].len(), 2);

    // the record closed by the next MOTIF line uses 4e-4, the last one 1e-4
    assert!((motifs[0].matrix()[[0, 1]] - 4e-4 / 4.0).abs() < TOLERANCE);
    assert!((motifs[1].matrix()[[0, 1]] - 1e-4 / 4.0).abs() < TOLERANCE);

    let motifs =
        motif::read_motifs("tests/data/motifs.meme", MotifFormat::Meme, Some(0.01)).unwrap();
    assert!((motifs[0].matrix()[[0, 1]] - 0.0025).abs() < TOLERANCE);
    assert!((motifs[1].matrix()[[0, 1]] - 0.0025).abs() < TOLERANCE);
}

#[test]
fn test_parse_meme_errors() {
    let text = "MOTIF x\nletter-probability matrix:\n0.5 0.5 0.0\n";
    assert!(matches!(
        motif::parse_meme(text, None),
        Err(MotifError::InvalidPwm(_))
    ));

    assert!(matches!(
        motif::parse_meme("MEME version 4\n", None),
        Err(MotifError::InvalidFileFormat(_))
    ));
}

#[test]
fn test_read_annotated() {
    let motifs = motif::read_motifs(
        "tests/data/motifs_annotated.txt",
        MotifFormat::Annotated,
        None,
    )
    .unwrap();
    assert_eq!(motifs.len(), 2);
    assert_eq!(motifs[0].name(), "CTCF");
    assert_eq!(motifs[0].len(), 2);
    assert_eq!(motifs[1].name(), "SP1");
    assert_eq!(motifs[1].len(), 3);

    // every annotated record uses the default pseudocount
    assert!((motifs[1].matrix()[[0, 0]] - DEFAULT_PSEUDOCOUNT / 4.0).abs() < TOLERANCE);

    let orphan = motif::parse_annotated("0.1 0.2 0.3 0.4\n", None);
    assert!(matches!(orphan, Err(MotifError::InvalidFileFormat(_))));
}

#[test]
fn test_motif_format_from_str() {
    assert_eq!("plain".parse::<MotifFormat>().unwrap(), MotifFormat::Plain);
    assert_eq!("MEME".parse::<MotifFormat>().unwrap(), MotifFormat::Meme);
    assert_eq!(
        "annotated".parse::<MotifFormat>().unwrap(),
        MotifFormat::Annotated
    );
    assert!("jaspar".parse::<MotifFormat>().is_err());
    assert_eq!(MotifFormat::default().to_string(), "plain");
}
