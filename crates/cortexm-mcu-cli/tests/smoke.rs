use std::path::Path;
use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cortexm-mcu"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run cortexm-mcu")
}

fn write_vector_table(path: &Path, msp: u32, reset: u32) {
    let mut bytes = msp.to_le_bytes().to_vec();
    bytes.extend_from_slice(&reset.to_le_bytes());
    std::fs::write(path, bytes).expect("failed to write image");
}

#[test]
fn boots_raw_image_and_reports_reset_state() {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let image = tmp.path().join("blinky.bin");
    write_vector_table(&image, 0x2000_5000, 0x0000_0201);

    let output = run(&[
        "--machine",
        "stm32f103rb",
        "--image",
        image.to_str().expect("path should be UTF-8"),
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr:\n{stderr}");

    assert!(stdout.contains("stm32f103rb (Cortex-M3 r2p1)"), "{stdout}");
    assert!(stdout.contains("irqs: 96"), "{stdout}");
    assert!(stdout.contains("msp=0x20005000 pc=0x00000200 xpsr=0x01000000"), "{stdout}");
    assert!(stderr.contains("Board: 'stm32f103rb'"), "{stderr}");
    assert!(stderr.contains("Cortex-M3 r2p1 core reset."), "{stderr}");
}

#[test]
fn missing_image_is_fatal() {
    let output = run(&["--machine", "stm32f407vg"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error: guest image must be specified (using --image or --kernel)"),
        "{stderr}"
    );
}

#[test]
fn debugger_launch_needs_no_image() {
    let output = run(&["--gdb", "--cpu", "cortex-m7f"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Cortex-M7F r1p0"), "{stdout}");
}

#[test]
fn unsupported_cpu_is_fatal() {
    let output = run(&["--gdb", "--cpu", "cortex-a9"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unsupported CPU model 'cortex-a9'"), "{stderr}");
}

#[test]
fn unknown_machine_lists_alternatives() {
    let output = run(&["--machine", "stm32f999", "--gdb"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown machine 'stm32f999'"), "{stderr}");
    assert!(stderr.contains("stm32f407vg"), "{stderr}");
}
