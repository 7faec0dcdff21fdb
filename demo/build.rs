//! Generates the `*DslExtensions` units for the service traits in `src/`.

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");

    let report = svcwrap::Builder::new().compile()?;
    if !report.is_success() {
        anyhow::bail!(
            "svcwrap failed: {}",
            report
                .aborted
                .iter()
                .chain(&report.write_failures)
                .cloned()
                .collect::<Vec<_>>()
                .join("; ")
        );
    }
    Ok(())
}
