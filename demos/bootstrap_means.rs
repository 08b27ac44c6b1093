// demos/bootstrap_means.rs — end-to-end GPU bootstrap.
//
//   cargo run --example bootstrap_means
//
// Draws 1000 bootstrapped means of a five-point sample and prints a
// summary, then cross-checks the first raw stream draws against the
// host oracle.

use bootsample::xorwow::XorwowState;
use bootsample::BootstrapSession;

fn main() {
    let input = [1.0f32, 2.0, 3.0, 4.0, 5.0];
    let mut session = match BootstrapSession::new(1000, 42) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to create session: {e}");
            std::process::exit(1);
        }
    };

    let means = match session.resample(&input) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("resample failed: {e}");
            std::process::exit(1);
        }
    };

    let min = means.iter().copied().fold(f32::INFINITY, f32::min);
    let max = means.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let grand = means.iter().sum::<f32>() / means.len() as f32;
    println!("bootstrapped means: n={}", means.len());
    println!("  min={min:.4} max={max:.4} grand mean={grand:.4}");

    // Host/device PRNG cross-check on a fresh session (the resample
    // above advanced the streams of the first one).
    let mut fresh = BootstrapSession::new(10, 0).expect("session");
    let device = fresh.raw_stream_values(10).expect("raw values");
    let host: Vec<u32> = (0..10).map(|i| XorwowState::init(0, i).next_u32()).collect();
    println!(
        "host/device PRNG agreement: {}",
        if device == host { "OK" } else { "MISMATCH" }
    );
}
