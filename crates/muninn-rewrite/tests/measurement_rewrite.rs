//! Integration tests for the readout rewriting transforms.
//!
//! Circuits requesting analytic statistics are rewritten to raw counts or
//! sample readout, executed on the statevector simulator, and the
//! reconstructed values are checked against closed-form expectations
//! within shot-noise tolerance.

use muninn_adapter_sim::SimulatorBackend;
use muninn_hal::{Backend, MeasurementOutcome, ShardResult, Shots};
use muninn_ir::{
    Circuit, Observable, PauliTerm, QubitId, QubitSelection, ReadoutTarget, emit,
};
use muninn_rewrite::{
    RewriteError, RewritePlan, measurements_from_counts, measurements_from_samples,
};

const ATOL: f64 = 0.05;
const COUNT_ATOL: f64 = 100.0;

/// Run a rewritten circuit and reconstruct the original measurements.
async fn run_reconstructed(
    circuit: &Circuit,
    plan: &RewritePlan,
    backend: &SimulatorBackend,
    shots: &Shots,
) -> Vec<ShardResult> {
    let job_id = backend.submit(circuit, shots).await.unwrap();
    let raw = backend.wait(&job_id).await.unwrap();
    plan.reconstruct(&raw).unwrap()
}

fn close(a: f64, b: f64, atol: f64) -> bool {
    (a - b).abs() < atol
}

fn kron(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter()
        .flat_map(|x| b.iter().map(move |y| x * y))
        .collect()
}

/// The four-qubit circuit used by the multi-measurement tests:
/// RY(θ) ⊗ RY(θ/2) ⊗ RY(2θ) ⊗ RY(θ).
fn ry_ladder(theta: f64) -> Circuit {
    let mut circuit = Circuit::new("basic_circuit", 4);
    circuit.ry(theta, QubitId(0)).unwrap();
    circuit.ry(theta / 2.0, QubitId(1)).unwrap();
    circuit.ry(2.0 * theta, QubitId(2)).unwrap();
    circuit.ry(theta, QubitId(3)).unwrap();
    circuit
}

fn xx01() -> Observable {
    Observable::Term(
        PauliTerm::x(QubitId(0)).tensor(PauliTerm::x(QubitId(1))).unwrap(),
    )
}

fn xxx012() -> Observable {
    Observable::Term(
        PauliTerm::x(QubitId(0))
            .tensor(PauliTerm::x(QubitId(1)))
            .unwrap()
            .tensor(PauliTerm::x(QubitId(2)))
            .unwrap(),
    )
}

#[tokio::test]
async fn test_measurements_from_counts_multiple_measurements() {
    let theta = 1.9_f64;
    let mut circuit = ry_ladder(theta);
    circuit.expval(xx01()).unwrap();
    circuit.var(PauliTerm::x(QubitId(2))).unwrap();
    circuit.counts(ReadoutTarget::Observable(xxx012())).unwrap();
    circuit
        .probs(QubitSelection::Subset(vec![QubitId(3)]))
        .unwrap();

    let plan = measurements_from_counts(&mut circuit).unwrap();

    // The rewritten listing carries only the raw readout opcode.
    let text = emit::emit(&circuit);
    assert!(!text.contains("expval"));
    assert!(!text.contains("var"));
    assert!(text.contains("counts"));

    let shots = 5000u32;
    let backend = SimulatorBackend::new(4).with_seed(1201);
    let shards =
        run_reconstructed(&circuit, &plan, &backend, &Shots::Single(shots)).await;
    let outcomes = &shards[0].outcomes;

    let expval_expected = theta.sin() * (theta / 2.0).sin();
    let var_expected = 1.0 - (2.0 * theta).sin().powi(2);
    let probs_expected = [
        (theta / 2.0).cos().powi(2),
        (theta / 2.0).sin().powi(2),
    ];

    assert!(close(outcomes[0].as_scalar().unwrap(), expval_expected, ATOL));
    assert!(close(outcomes[1].as_scalar().unwrap(), var_expected, ATOL));

    let probs = outcomes[3].as_vector().unwrap();
    assert!(close(probs[0], probs_expected[0], ATOL));
    assert!(close(probs[1], probs_expected[1], ATOL));

    // Counts over the observable come back bucketed by eigenvalue; the
    // bucket sizes follow shots · (1 ± E)/2 for the three-fold product.
    let product_expval = expval_expected * (2.0 * theta).sin();
    match &outcomes[2] {
        MeasurementOutcome::EigenCounts { eigvals, counts } => {
            assert_eq!(eigvals, &[-1.0, 1.0]);
            let expected_minus = f64::from(shots) * (1.0 - product_expval) / 2.0;
            let expected_plus = f64::from(shots) * (1.0 + product_expval) / 2.0;
            assert!(close(counts[0] as f64, expected_minus, COUNT_ATOL));
            assert!(close(counts[1] as f64, expected_plus, COUNT_ATOL));
            assert_eq!(counts.iter().sum::<u64>(), u64::from(shots));
        }
        other => panic!("expected eigenvalue counts, got {other:?}"),
    }
}

#[tokio::test]
async fn test_measurements_from_samples_multiple_measurements() {
    let theta = 1.9_f64;
    let mut circuit = ry_ladder(theta);
    circuit.expval(xx01()).unwrap();
    circuit.var(PauliTerm::x(QubitId(2))).unwrap();
    circuit.sample(ReadoutTarget::Observable(xxx012())).unwrap();
    circuit
        .probs(QubitSelection::Subset(vec![QubitId(3)]))
        .unwrap();

    let plan = measurements_from_samples(&mut circuit).unwrap();

    let text = emit::emit(&circuit);
    assert!(!text.contains("expval"));
    assert!(!text.contains("var"));
    assert!(text.contains("sample"));

    let shots = 5000u32;
    let backend = SimulatorBackend::new(4).with_seed(1902);
    let shards =
        run_reconstructed(&circuit, &plan, &backend, &Shots::Single(shots)).await;
    let outcomes = &shards[0].outcomes;

    let expval_expected = theta.sin() * (theta / 2.0).sin();
    let var_expected = 1.0 - (2.0 * theta).sin().powi(2);

    assert!(close(outcomes[0].as_scalar().unwrap(), expval_expected, ATOL));
    assert!(close(outcomes[1].as_scalar().unwrap(), var_expected, ATOL));

    let probs = outcomes[3].as_vector().unwrap();
    assert!(close(probs[0], (theta / 2.0).cos().powi(2), ATOL));
    assert!(close(probs[1], (theta / 2.0).sin().powi(2), ATOL));

    // The per-shot eigenvalue sequence preserves shot count, holds only
    // ±1, and its mean tracks the product expectation.
    let product_expval = expval_expected * (2.0 * theta).sin();
    match &outcomes[2] {
        MeasurementOutcome::EigenSamples(eigenvalues) => {
            assert_eq!(eigenvalues.len(), shots as usize);
            assert!(eigenvalues.iter().all(|e| *e == 1.0 || *e == -1.0));
            let mean = eigenvalues.iter().sum::<f64>() / eigenvalues.len() as f64;
            assert!(close(mean, product_expval, ATOL));
        }
        other => panic!("expected eigenvalue samples, got {other:?}"),
    }
}

/// Single analytic measurements through the counts rewrite, mirrored
/// against closed-form results. Circuit: RX(θ) on q0, RX(θ/2) on q1.
#[tokio::test]
async fn test_measurement_from_counts_single_measurement_analytic() {
    let theta = 2.5_f64;
    let shots = Shots::Single(3000);

    let yy01 = Observable::Term(
        PauliTerm::y(QubitId(0)).tensor(PauliTerm::y(QubitId(1))).unwrap(),
    );
    let full_probs = kron(
        &kron(
            &[(theta / 2.0).cos().powi(2), (theta / 2.0).sin().powi(2)],
            &[(theta / 4.0).cos().powi(2), (theta / 4.0).sin().powi(2)],
        ),
        &[1.0, 0.0, 0.0, 0.0],
    );

    let cases: Vec<(muninn_ir::Measurement, Vec<f64>)> = vec![
        (
            muninn_ir::Measurement::Expval(yy01),
            vec![theta.sin() * (theta / 2.0).sin()],
        ),
        (
            muninn_ir::Measurement::Var(Observable::Term(PauliTerm::y(QubitId(1)))),
            vec![1.0 - (theta / 2.0).sin().powi(2)],
        ),
        (
            muninn_ir::Measurement::Probs(QubitSelection::All),
            full_probs,
        ),
        (
            muninn_ir::Measurement::Probs(QubitSelection::Subset(vec![QubitId(1)])),
            vec![(theta / 4.0).cos().powi(2), (theta / 4.0).sin().powi(2)],
        ),
    ];

    for (seed, (measurement, expected)) in cases.into_iter().enumerate() {
        let mut circuit = Circuit::new("single", 4);
        circuit.rx(theta, QubitId(0)).unwrap();
        circuit.rx(theta / 2.0, QubitId(1)).unwrap();
        circuit.measure(measurement).unwrap();

        let plan = measurements_from_counts(&mut circuit).unwrap();

        let text = emit::emit(&circuit);
        assert!(!text.contains("expval"));
        assert!(text.contains("counts"));

        let backend = SimulatorBackend::new(4).with_seed(2500 + seed as u64);
        let shards = run_reconstructed(&circuit, &plan, &backend, &shots).await;

        let values: Vec<f64> = match &shards[0].outcomes[0] {
            MeasurementOutcome::Scalar(v) => vec![*v],
            MeasurementOutcome::Vector(v) => v.clone(),
            other => panic!("unexpected outcome {other:?}"),
        };
        assert_eq!(values.len(), expected.len());
        for (value, want) in values.iter().zip(&expected) {
            assert!(
                close(*value, *want, ATOL),
                "case {seed}: got {value}, want {want}"
            );
        }
    }
}

/// The same analytic cases through the samples rewrite, including shot
/// vectors: one reconstructed shard per entry, in order.
#[tokio::test]
async fn test_measurement_from_samples_single_measurement_analytic() {
    let theta = 2.5_f64;
    let shot_configs = [
        Shots::Single(3000),
        Shots::vector([3000, 4000]).unwrap(),
        Shots::vector([3000, 3500, 4000]).unwrap(),
    ];

    for (config_idx, shots) in shot_configs.iter().enumerate() {
        let mut circuit = Circuit::new("single", 4);
        circuit.rx(theta, QubitId(0)).unwrap();
        circuit.rx(theta / 2.0, QubitId(1)).unwrap();
        circuit
            .expval(
                PauliTerm::y(QubitId(0)).tensor(PauliTerm::y(QubitId(1))).unwrap(),
            )
            .unwrap();

        let plan = measurements_from_samples(&mut circuit).unwrap();

        let text = emit::emit(&circuit);
        assert!(!text.contains("expval"));
        assert!(text.contains("sample"));

        let backend = SimulatorBackend::new(4).with_seed(7000 + config_idx as u64);
        let shards = run_reconstructed(&circuit, &plan, &backend, shots).await;

        assert_eq!(shards.len(), shots.num_shards());
        let expected = theta.sin() * (theta / 2.0).sin();
        for (shard, shard_shots) in shards.iter().zip(shots.shards()) {
            assert_eq!(shard.shots, shard_shots);
            assert!(close(shard.outcomes[0].as_scalar().unwrap(), expected, ATOL));
        }
    }
}

/// Shot vectors through the counts rewrite shard the same way.
#[tokio::test]
async fn test_measurement_from_counts_shot_vector() {
    let theta = 2.5_f64;
    let mut circuit = Circuit::new("sharded", 2);
    circuit.rx(theta, QubitId(0)).unwrap();
    circuit.var(PauliTerm::y(QubitId(0))).unwrap();

    let plan = measurements_from_counts(&mut circuit).unwrap();
    let shots = Shots::vector([3000, 3500, 4000]).unwrap();
    let backend = SimulatorBackend::new(2).with_seed(88);
    let shards = run_reconstructed(&circuit, &plan, &backend, &shots).await;

    assert_eq!(shards.len(), 3);
    let expected = 1.0 - theta.sin().powi(2);
    for shard in &shards {
        assert!(close(shard.outcomes[0].as_scalar().unwrap(), expected, ATOL));
    }
}

/// Counts-request variants through the counts rewrite: full register,
/// explicit subsets, and an observable.
#[tokio::test]
async fn test_measurement_from_counts_with_counts_measurement() {
    let theta = 2.5_f64;
    let shots = 3000u32;

    let targets: Vec<ReadoutTarget> = vec![
        ReadoutTarget::all(),
        ReadoutTarget::Qubits(QubitSelection::Subset(vec![QubitId(2)])),
        ReadoutTarget::Qubits(QubitSelection::Subset(vec![QubitId(2), QubitId(3)])),
        ReadoutTarget::Observable(Observable::Term(PauliTerm::y(QubitId(1)))),
    ];

    for (case, target) in targets.into_iter().enumerate() {
        let mut circuit = Circuit::new("counts_variant", 4);
        circuit.rx(theta, QubitId(0)).unwrap();
        circuit.rx(theta / 2.0, QubitId(1)).unwrap();
        circuit.rx(theta / 3.0, QubitId(2)).unwrap();
        circuit.counts(target.clone()).unwrap();

        let plan = measurements_from_counts(&mut circuit).unwrap();
        let backend = SimulatorBackend::new(4).with_seed(400 + case as u64);
        let shards =
            run_reconstructed(&circuit, &plan, &backend, &Shots::Single(shots)).await;

        // Per-qubit |1⟩ probabilities after the RX ladder.
        let p1 = [
            (theta / 2.0).sin().powi(2),
            (theta / 4.0).sin().powi(2),
            (theta / 6.0).sin().powi(2),
            0.0,
        ];

        match (&target, &shards[0].outcomes[0]) {
            (ReadoutTarget::Observable(_), MeasurementOutcome::EigenCounts { eigvals, counts }) => {
                let expval = -(theta / 2.0).sin();
                assert_eq!(eigvals, &[-1.0, 1.0]);
                let expected_minus = f64::from(shots) * (1.0 - expval) / 2.0;
                assert!(close(counts[0] as f64, expected_minus, COUNT_ATOL));
                assert_eq!(counts.iter().sum::<u64>(), u64::from(shots));
            }
            (ReadoutTarget::Qubits(selection), MeasurementOutcome::Counts(counts)) => {
                let qubits = selection.resolve(4);
                assert_eq!(counts.num_qubits(), qubits.len());
                assert_eq!(counts.total(), u64::from(shots));

                // Marginal expectation per basis state of the subset.
                for (bits, count) in counts.to_bitstring_pairs() {
                    assert_eq!(bits.len(), qubits.len());
                    let mut p = 1.0;
                    for (c, q) in bits.chars().zip(&qubits) {
                        let q = q.0 as usize;
                        p *= if c == '1' { p1[q] } else { 1.0 - p1[q] };
                    }
                    assert!(
                        close(count as f64, f64::from(shots) * p, COUNT_ATOL),
                        "case {case}: state {bits} count {count}"
                    );
                }
            }
            (t, other) => panic!("case {case}: unexpected outcome {other:?} for {t:?}"),
        }
    }
}

/// Sample-request variants through the samples rewrite: full register,
/// subsets, and an observable.
#[tokio::test]
async fn test_measurement_from_samples_with_sample_measurement() {
    let theta = 2.5_f64;
    let shots = 3000u32;

    let targets: Vec<ReadoutTarget> = vec![
        ReadoutTarget::all(),
        ReadoutTarget::Qubits(QubitSelection::Subset(vec![QubitId(0)])),
        ReadoutTarget::Qubits(QubitSelection::Subset(vec![QubitId(1), QubitId(2)])),
        ReadoutTarget::Observable(Observable::Term(
            PauliTerm::y(QubitId(1)).tensor(PauliTerm::y(QubitId(0))).unwrap(),
        )),
    ];

    for (case, target) in targets.into_iter().enumerate() {
        let mut circuit = Circuit::new("sample_variant", 4);
        circuit.rx(theta, QubitId(0)).unwrap();
        circuit.rx(theta / 2.0, QubitId(1)).unwrap();
        circuit.sample(target.clone()).unwrap();

        let plan = measurements_from_samples(&mut circuit).unwrap();
        let backend = SimulatorBackend::new(4).with_seed(600 + case as u64);
        let shards =
            run_reconstructed(&circuit, &plan, &backend, &Shots::Single(shots)).await;

        let p1 = [
            (theta / 2.0).sin().powi(2),
            (theta / 4.0).sin().powi(2),
            0.0,
            0.0,
        ];

        match (&target, &shards[0].outcomes[0]) {
            (ReadoutTarget::Observable(_), MeasurementOutcome::EigenSamples(eigenvalues)) => {
                assert_eq!(eigenvalues.len(), shots as usize);
                let expected = theta.sin() * (theta / 2.0).sin();
                let mean = eigenvalues.iter().sum::<f64>() / eigenvalues.len() as f64;
                assert!(close(mean, expected, ATOL));
            }
            (ReadoutTarget::Qubits(selection), MeasurementOutcome::Samples(samples)) => {
                let qubits = selection.resolve(4);
                assert_eq!(samples.shots(), shots as usize);
                assert_eq!(samples.num_qubits(), qubits.len());

                for (col, q) in qubits.iter().enumerate() {
                    let mean = (0..samples.shots())
                        .map(|s| f64::from(samples.row(s)[col]))
                        .sum::<f64>()
                        / shots as f64;
                    assert!(
                        close(mean, p1[q.0 as usize], ATOL),
                        "case {case}: column {col}"
                    );
                }
            }
            (t, other) => panic!("case {case}: unexpected outcome {other:?} for {t:?}"),
        }
    }
}

#[test]
fn test_measurement_from_counts_raises_not_implemented() {
    let mut circuit = Circuit::new("bad", 4);
    circuit.rx(0.7, QubitId(0)).unwrap();
    circuit.sample(ReadoutTarget::all()).unwrap();

    let err = measurements_from_counts(&mut circuit).unwrap_err();
    match err {
        RewriteError::UnsupportedMeasurement { transform, .. } => {
            assert_eq!(transform, "measurements_from_counts");
        }
        other => panic!("expected unsupported measurement, got {other:?}"),
    }
    assert!(
        err.to_string()
            .contains("not implemented with measurements_from_counts")
    );
}

#[test]
fn test_measurement_from_samples_raises_not_implemented() {
    let mut circuit = Circuit::new("bad", 4);
    circuit.rx(0.7, QubitId(0)).unwrap();
    circuit.counts(ReadoutTarget::all()).unwrap();

    let err = measurements_from_samples(&mut circuit).unwrap_err();
    assert!(
        err.to_string()
            .contains("not implemented with measurements_from_samples")
    );
}

/// Counts and samples paths agree on the same statistics.
#[tokio::test]
async fn test_counts_and_samples_paths_agree() {
    let theta = 1.9_f64;
    let shots = Shots::Single(5000);

    let build = |name: &str| {
        let mut circuit = Circuit::new(name, 4);
        circuit.ry(theta, QubitId(0)).unwrap();
        circuit.ry(theta / 2.0, QubitId(1)).unwrap();
        circuit.expval(xx01()).unwrap();
        circuit
            .probs(QubitSelection::Subset(vec![QubitId(1)]))
            .unwrap();
        circuit
    };

    let mut via_counts = build("via_counts");
    let counts_plan = measurements_from_counts(&mut via_counts).unwrap();
    let mut via_samples = build("via_samples");
    let samples_plan = measurements_from_samples(&mut via_samples).unwrap();

    let backend = SimulatorBackend::new(4).with_seed(5150);
    let counts_shards = run_reconstructed(&via_counts, &counts_plan, &backend, &shots).await;
    let samples_shards =
        run_reconstructed(&via_samples, &samples_plan, &backend, &shots).await;

    let e_counts = counts_shards[0].outcomes[0].as_scalar().unwrap();
    let e_samples = samples_shards[0].outcomes[0].as_scalar().unwrap();
    assert!(close(e_counts, e_samples, 2.0 * ATOL));

    let p_counts = counts_shards[0].outcomes[1].as_vector().unwrap();
    let p_samples = samples_shards[0].outcomes[1].as_vector().unwrap();
    for (a, b) in p_counts.iter().zip(p_samples) {
        assert!(close(*a, *b, 2.0 * ATOL));
    }
}
