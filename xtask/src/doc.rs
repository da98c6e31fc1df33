use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Crates whose API docs are published.
const DOC_CRATES: &[&str] = &["pwm", "platform"];

/// Gated driver modules are documented too; `defmt` stays off because it
/// only adds derives.
const DOC_FEATURES: &str = "pwm/phase-shift,pwm/pm,pwm/std";

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Building driver documentation...".cyan().bold());
    println!();

    let start = Instant::now();

    let mut cmd = Command::new("cargo");
    cmd.arg("doc").arg("--no-deps");
    for krate in DOC_CRATES {
        cmd.args(["-p", krate]);
    }
    cmd.args(["--features", DOC_FEATURES])
        // Register names in doc comments are linked; a stale one is an error.
        .env("RUSTDOCFLAGS", "-D rustdoc::broken_intra_doc_links");

    if open {
        cmd.arg("--open");
    }

    let output = cmd.output().context("Failed to run cargo doc")?;

    if !output.status.success() {
        eprintln!("{}", "✗ Documentation build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("Documentation build failed");
    }

    println!(
        "{}",
        format!(
            "✓ Docs for {} built in {:.2}s",
            DOC_CRATES.join(", "),
            start.elapsed().as_secs_f64()
        )
        .green()
    );

    if !open {
        println!();
        for krate in DOC_CRATES {
            println!("   {}", format!("target/doc/{krate}/index.html").dimmed());
        }
        println!(
            "   {}",
            "Run 'cargo run -p xtask -- doc --open' to open the driver docs".dimmed()
        );
    }

    println!();

    Ok(())
}
