//! Developer tasks (schema generation, golden results conformance, check docs coverage).
//!
//! Keeping this separate avoids bloating the end-user CLI.

use anyhow::{Context, bail};
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Get the project root (parent of xtask directory).
fn project_root() -> anyhow::Result<PathBuf> {
    let manifest_dir = match std::env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => std::env::current_dir().context("Cannot determine current directory")?,
    };

    // If we're in the xtask directory, go up one level
    if manifest_dir.ends_with("xtask") {
        manifest_dir
            .parent()
            .map(Path::to_path_buf)
            .context("xtask has no parent")
    } else {
        Ok(manifest_dir)
    }
}

fn schemas_dir() -> anyhow::Result<PathBuf> {
    Ok(project_root()?.join("schemas"))
}

/// Golden results documents checked by `conform`.
fn golden_results_dir() -> anyhow::Result<PathBuf> {
    Ok(project_root()?.join("tests").join("fixtures").join("results"))
}

/// Schema definition with its target filename.
struct SchemaSpec {
    filename: &'static str,
    generate: fn() -> schemars::Schema,
}

fn generate_results_schema() -> schemars::Schema {
    schema_for!(imagecert_types::Results)
}

fn generate_config_schema() -> schemars::Schema {
    schema_for!(imagecert_settings::ImagecertConfigV1)
}

fn schema_specs() -> Vec<SchemaSpec> {
    vec![
        SchemaSpec {
            filename: "imagecert.results.v1.json",
            generate: generate_results_schema,
        },
        SchemaSpec {
            filename: "imagecert.config.v1.json",
            generate: generate_config_schema,
        },
    ]
}

/// Serialize a schema to pretty-printed JSON with trailing newline.
fn serialize_schema(schema: &schemars::Schema) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(schema).context("Failed to serialize schema")?;
    json.push('\n');
    Ok(json)
}

/// Emit schemas to the schemas/ directory.
fn emit_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir()?;
    fs::create_dir_all(&dir).context("Failed to create schemas directory")?;

    for spec in schema_specs() {
        let json = serialize_schema(&(spec.generate)())?;
        let path = dir.join(spec.filename);
        fs::write(&path, &json)
            .with_context(|| format!("Failed to write schema to {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("\nSchemas emitted successfully.");
    Ok(())
}

/// Validate that schemas in the repo match what would be generated.
fn validate_schemas() -> anyhow::Result<()> {
    let dir = schemas_dir()?;
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for spec in schema_specs() {
        let path = dir.join(spec.filename);
        if !path.exists() {
            missing.push(spec.filename);
            continue;
        }

        let expected = serialize_schema(&(spec.generate)())?;
        let actual = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if expected != actual {
            mismatched.push(spec.filename);
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        println!("All schemas are up to date.");
        return Ok(());
    }
    if !missing.is_empty() {
        eprintln!("Missing schemas:");
        for name in &missing {
            eprintln!("  - {name}");
        }
    }
    if !mismatched.is_empty() {
        eprintln!("Schemas out of date:");
        for name in &mismatched {
            eprintln!("  - {name}");
        }
    }
    eprintln!("\nRun `cargo xtask emit-schemas` to regenerate.");
    bail!("Schema validation failed")
}

/// Problems in one results document beyond what the schema expresses.
fn results_invariants(value: &serde_json::Value) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = std::collections::BTreeSet::new();

    for bucket in ["passed", "failed", "errors"] {
        let entries = value
            .get(bucket)
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for (i, entry) in entries.iter().enumerate() {
            let name = entry.get("name").and_then(|v| v.as_str()).unwrap_or("");
            if !seen.insert(name.to_string()) {
                errors.push(format!("{bucket}[{i}]: check '{name}' is recorded more than once"));
            }
            let has_error = entry.get("error").is_some_and(|e| !e.is_null());
            if bucket == "errors" && !has_error {
                errors.push(format!("{bucket}[{i}]: '{name}' has no error message"));
            }
            if bucket != "errors" && has_error {
                errors.push(format!("{bucket}[{i}]: '{name}' carries an error message"));
            }
        }
    }

    let count = |bucket: &str| value.get(bucket).and_then(|v| v.as_array()).map_or(0, Vec::len);
    let all_passed = count("passed") > 0 && count("failed") == 0 && count("errors") == 0;
    if value.get("passed_overall").and_then(|v| v.as_bool()) == Some(true) && !all_passed {
        errors.push("passed_overall is true but not every check passed".to_string());
    }
    errors
}

/// Validate golden results documents against the generated results schema.
fn conform() -> anyhow::Result<()> {
    let schema_value = serde_json::to_value(generate_results_schema())
        .context("Failed to convert results schema to JSON")?;
    let compiled = jsonschema::validator_for(&schema_value)
        .map_err(|e| anyhow::anyhow!("Failed to compile schema: {e}"))?;
    println!("✓ imagecert.results.v1 schema compiles");

    let dir = golden_results_dir()?;
    if !dir.exists() {
        bail!("golden results not found at {}", dir.display());
    }

    let mut count = 0;
    let mut errors = Vec::new();
    for entry in WalkDir::new(&dir).sort_by_file_name() {
        let entry = entry.context("Failed to walk golden results")?;
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let label = path.strip_prefix(&dir).unwrap_or(path).display().to_string();
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {label}"))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {label} as JSON"))?;

        for err in compiled.iter_errors(&value) {
            errors.push(format!("{label}: schema validation: {err}"));
        }
        for err in results_invariants(&value) {
            errors.push(format!("{label}: {err}"));
        }
        count += 1;
    }

    if count == 0 {
        bail!("no golden results found in {}", dir.display());
    }
    if errors.is_empty() {
        println!("✓ {count} golden results documents conform");
        Ok(())
    } else {
        for error in &errors {
            eprintln!("  - {error}");
        }
        bail!("Conformance failed with {} errors", errors.len())
    }
}

/// Every registered check documents itself and belongs to a policy.
fn explain_coverage() -> anyhow::Result<()> {
    let registry = imagecert_engine::builtin_registry().context("build check registry")?;
    let mut errors = Vec::new();
    let mut count = 0;

    for check in registry.checks() {
        let name = check.name();
        count += 1;
        if check.metadata().description.trim().is_empty() {
            errors.push(format!("Check '{name}' has empty description"));
        }
        let help = check.help();
        if help.message.trim().is_empty() {
            errors.push(format!("Check '{name}' has empty help message"));
        }
        if help.suggestion.trim().is_empty() {
            errors.push(format!("Check '{name}' has empty suggestion"));
        }
        if registry.policies_of(name).is_empty() {
            errors.push(format!("Check '{name}' belongs to no policy"));
        }
    }

    if errors.is_empty() {
        println!("✓ {count} checks are documented");
        Ok(())
    } else {
        for error in &errors {
            eprintln!("  - {error}");
        }
        bail!("Explain coverage failed with {} errors", errors.len())
    }
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help              Show this message");
    eprintln!("  emit-schemas      Generate JSON schemas from Rust types to schemas/");
    eprintln!("  validate-schemas  Check if schemas/ matches generated output (for CI)");
    eprintln!("  print-schema-ids  Print known schema IDs");
    eprintln!("  conform           Validate tests/fixtures/results/ against the results schema");
    eprintln!("  explain-coverage  Validate every check has a description and remediation");
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "emit-schemas" => emit_schemas(),
        "validate-schemas" => validate_schemas(),
        "conform" => conform(),
        "explain-coverage" => explain_coverage(),
        "print-schema-ids" => {
            println!("{}", imagecert_types::SCHEMA_RESULTS_V1);
            println!("{}", imagecert_settings::defaults::SCHEMA_CONFIG_V1);
            Ok(())
        }
        other => bail!("unknown xtask command: {other}\n\nRun `cargo xtask help` for usage."),
    }
    .context("xtask failed")
}
