use anyhow::Result;

use crate::CliTest;

#[test]
fn test_build_writes_localized_output() -> Result<()> {
    let test = CliTest::with_project()?;

    let output = test.build_command().output()?;
    assert!(output.status.success(), "{:?}", output);

    let html = test.read_file("dist/X_IQ/mail-welcome/en/index.html")?;
    assert!(html.contains("Hello"), "{html}");
    assert!(html.contains("style="), "{html}");
    // unused selector pruned from the head
    assert!(!html.contains(".unused"), "{html}");

    // base output keeps the raw placeholder
    let base = test.read_file("dist/X_IQ/mail-welcome/index.html")?;
    assert!(base.contains("${{ nav.title }}$"), "{base}");
    Ok(())
}

#[test]
fn test_build_no_base_skips_root_output() -> Result<()> {
    let test = CliTest::with_project()?;

    let output = test.build_command().arg("--no-base").output()?;
    assert!(output.status.success(), "{:?}", output);

    assert!(!test.exists("dist/X_IQ/mail-welcome/index.html"));
    assert!(test.exists("dist/X_IQ/mail-welcome/en/index.html"));
    Ok(())
}

#[test]
fn test_build_explicit_locales_override_discovery() -> Result<()> {
    let test = CliTest::with_project()?;
    test.write_file("vendor/data/es/nav.json", r#"{"title": "Hola"}"#)?;

    let output = test.build_command().args(["--locales", "es"]).output()?;
    assert!(output.status.success(), "{:?}", output);

    assert!(test.exists("dist/X_IQ/mail-welcome/es/index.html"));
    assert!(!test.exists("dist/X_IQ/mail-welcome/en/index.html"));
    Ok(())
}

#[test]
fn test_build_pretty_writes_output_pair() -> Result<()> {
    let test = CliTest::with_project()?;

    let output = test.build_command().arg("--pretty").output()?;
    assert!(output.status.success(), "{:?}", output);

    assert!(test.exists("dist/X_IQ/mail-welcome/en/index.html"));
    let pretty = test.read_file("dist/X_IQ/mail-welcome/en/index.pretty.html")?;
    assert!(pretty.contains("Hello"), "{pretty}");
    Ok(())
}

#[test]
fn test_build_fail_on_missing_exits_nonzero() -> Result<()> {
    let test = CliTest::with_project()?;
    test.write_file("vendor/data/es/nav.json", r#"{"other": "x"}"#)?;

    let output = test.build_command().arg("--fail-on-missing").output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("es"), "{stderr}");

    // the healthy locale still shipped
    assert!(test.exists("dist/X_IQ/mail-welcome/en/index.html"));
    assert!(!test.exists("dist/X_IQ/mail-welcome/es/index.html"));
    Ok(())
}

#[test]
fn test_build_missing_artifact_is_an_error() -> Result<()> {
    let test = CliTest::new()?;

    let output = test
        .command()
        .args(["build", "--category", "X_IQ", "--mail", "nope"])
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error"), "{stderr}");
    Ok(())
}

#[test]
fn test_no_subcommand_prints_help() -> Result<()> {
    let test = CliTest::new()?;

    let output = test.command().output()?;
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"), "{stdout}");
    Ok(())
}
