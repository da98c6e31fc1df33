use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Feature sets the driver must build with. `None` means default features.
const FEATURE_MATRIX: &[(&str, Option<&str>)] = &[
    ("default", None),
    ("phase-shift", Some("phase-shift")),
    ("pm", Some("pm")),
    ("defmt", Some("defmt")),
    ("phase-shift + pm", Some("phase-shift,pm")),
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking PWM driver builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for (label, features) in FEATURE_MATRIX {
        check_pwm(label, *features)?;
    }

    // Platform crate (no_std, no mocks)
    println!("{}", "  Checking platform crate (no_std)...".cyan());
    let platform_start = Instant::now();

    let platform_output = Command::new("cargo")
        .args(["check", "-p", "platform", "--no-default-features"])
        .output()
        .context("Failed to check platform crate")?;

    if !platform_output.status.success() {
        eprintln!("{}", "  ✗ Platform check failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&platform_output.stderr));
        anyhow::bail!("Platform check failed");
    }

    println!(
        "{}",
        format!(
            "  ✓ Platform check passed in {:.2}s",
            platform_start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();

    // Clippy lints
    println!("{}", "  Running clippy lints...".cyan());
    let clippy_start = Instant::now();

    let clippy_output = Command::new("cargo")
        .args([
            "clippy",
            "--workspace",
            "--all-targets",
            "--features",
            "pwm/phase-shift,pwm/pm",
            "--",
            "-D",
            "warnings",
        ])
        .output()
        .context("Failed to run clippy")?;

    if !clippy_output.status.success() {
        eprintln!("{}", "  ⚠ Clippy warnings found".yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&clippy_output.stderr));
        // Don't fail on clippy warnings, just show them
    } else {
        println!(
            "{}",
            format!(
                "  ✓ Clippy passed in {:.2}s",
                clippy_start.elapsed().as_secs_f64()
            )
            .green()
        );
    }
    println!();

    // Format check
    println!("{}", "  Checking code formatting...".cyan());

    let fmt_output = Command::new("cargo")
        .args(["fmt", "--all", "--check"])
        .output()
        .context("Failed to run cargo fmt")?;

    if !fmt_output.status.success() {
        eprintln!("{}", "  ⚠ Formatting issues found".yellow().bold());
        eprintln!("     Run 'cargo fmt --all' to fix");
    } else {
        println!("{}", "  ✓ Formatting check passed".green());
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

fn check_pwm(label: &str, features: Option<&str>) -> Result<()> {
    println!("{}", format!("  Checking pwm [{label}]...").cyan());
    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.args(["check", "-p", "pwm"]);
    if let Some(features) = features {
        cmd.args(["--features", features]);
    }

    let output = cmd
        .output()
        .with_context(|| format!("Failed to check pwm [{label}]"))?;

    if !output.status.success() {
        eprintln!("{}", format!("  ✗ pwm [{label}] check failed").red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("pwm [{label}] check failed");
    }

    println!(
        "{}",
        format!(
            "  ✓ pwm [{label}] passed in {:.2}s",
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}
