// demos/list_devices.rs — operator diagnostics.
//
// Prints every compute platform (backend) and device wgpu can see,
// without creating a session:
//   cargo run --example list_devices

use bootsample::gpu::device::{enumerate_devices, enumerate_platforms};

fn main() {
    let platforms = enumerate_platforms();
    if platforms.is_empty() {
        println!("No compute platforms found.");
        return;
    }

    println!("Platforms:");
    for (i, p) in platforms.iter().enumerate() {
        println!("  {}. {p}", i + 1);
    }

    println!("\nDevices:");
    for (i, d) in enumerate_devices().iter().enumerate() {
        println!("{}. {d}", i + 1);
    }
}
