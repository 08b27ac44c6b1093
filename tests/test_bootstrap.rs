// tests/test_bootstrap.rs — CPU-oracle bootstrap properties.
//
// CpuBootstrap implements the exact semantics the GPU session must
// reproduce (same streams, same draw order, same accumulation), so every
// property pinned here is a property of the device path too. The
// GPU-vs-CPU agreement itself is checked by the ignored integration
// tests in src/gpu/session.rs.

use bootsample::sample::MISSING;
use bootsample::CpuBootstrap;

#[test]
fn output_length_tracks_sample_count_not_input_length() {
    let mut b = CpuBootstrap::new(250, 4);
    for input_len in [1usize, 5, 100] {
        let input = vec![1.0f32; input_len];
        assert_eq!(b.resample(&input).len(), 250);
    }
}

#[test]
fn identical_parameters_give_identical_call_sequences() {
    let input = [3.0f32, 1.0, 4.0, 1.0, 5.0];
    let mut a = CpuBootstrap::new(500, 42);
    let mut b = CpuBootstrap::new(500, 42);
    // Bit-identical across the whole call sequence, not just one call.
    assert_eq!(a.resample(&input), b.resample(&input));
    assert_eq!(a.resample(&input), b.resample(&input));
    assert_eq!(a.raw_stream_values(500), b.raw_stream_values(500));
}

#[test]
fn streams_persist_and_evolve_across_calls() {
    let input = [1.0f32, 2.0, 3.0];
    let mut b = CpuBootstrap::new(300, 8);
    let first = b.resample(&input);
    let second = b.resample(&input);
    assert_ne!(first, second, "a second call must see evolved streams");

    // Reconfiguring re-derives the streams: the sequence starts over.
    b.set_parameters(300, 8);
    assert_eq!(b.resample(&input), first);
}

#[test]
fn reconfigure_changes_output_length() {
    let mut b = CpuBootstrap::new(100, 1);
    assert_eq!(b.resample(&[1.0, 2.0]).len(), 100);
    b.set_parameters(64, 1);
    assert_eq!(b.resample(&[1.0, 2.0]).len(), 64);
}

#[test]
fn end_to_end_means_stay_in_input_range() {
    let mut b = CpuBootstrap::new(1000, 42);
    let means = b.resample(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(means.len(), 1000);
    for m in &means {
        assert!((1.0..=5.0).contains(m), "mean {m} outside [1, 5]");
    }
    // The grand mean should sit near the population mean (3.0); a wide
    // tolerance keeps this a smoke check, not a statistics test.
    let grand: f32 = means.iter().sum::<f32>() / means.len() as f32;
    assert!((grand - 3.0).abs() < 0.2, "grand mean drifted: {grand}");
}

#[test]
fn all_missing_input_yields_all_sentinels() {
    let mut b = CpuBootstrap::new(40, 2);
    let means = b.resample(&[MISSING; 7]);
    assert_eq!(means.len(), 40);
    assert!(means.iter().all(|m| m.is_nan()));
}

#[test]
fn missing_values_do_not_enter_the_resample() {
    // One valid value: every draw must hit it, so every mean equals it.
    let mut b = CpuBootstrap::new(25, 6);
    let means = b.resample(&[MISSING, 9.25, MISSING]);
    assert!(means.iter().all(|&m| m == 9.25));
}

#[test]
fn raw_stream_values_are_one_draw_per_stream() {
    let mut a = CpuBootstrap::new(10, 0);
    let first = a.raw_stream_values(10);
    // A second diagnostic call advances each stream by one more draw.
    let second = a.raw_stream_values(10);
    assert_ne!(first, second);

    let mut fresh = CpuBootstrap::new(10, 0);
    assert_eq!(fresh.raw_stream_values(10), first);
}
