use std::env;
use std::path::{Path, PathBuf};

use patchguard_core::SchemaNode;
use patchguard_validate::{PatchError, ValidateOptions, validate};
use serde_json::Value;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let mut patch_path: Option<PathBuf> = None;
    let mut schema_path: Option<PathBuf> = None;
    let mut options = ValidateOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--schema" => {
                schema_path = args.next().map(PathBuf::from);
            }
            "--all" => {
                options.abort_early = false;
            }
            "--allow-unknown" => {
                options.allow_unknown = true;
            }
            _ => {
                if patch_path.is_none() {
                    patch_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let patch_path = patch_path.ok_or("missing patch path")?;
    let schema_path = schema_path.ok_or("missing --schema path")?;

    let patch = load_json(&patch_path)?;
    let schema = SchemaNode::from_json(load_json(&schema_path)?)?;

    let outcome = validate(&patch, &schema, &options);
    match &outcome.error {
        Some(error) => {
            eprintln!("patch validation failed");
            print_error(error, 0);
            std::process::exit(1);
        }
        None => {
            println!(
                "patch validated successfully ({} operations)",
                outcome.value.len()
            );
            println!("{}", serde_json::to_string_pretty(&outcome.value)?);
        }
    }

    Ok(())
}

fn load_json(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let json = serde_json::from_str(&contents)?;
    Ok(json)
}

fn print_error(error: &PatchError, depth: usize) {
    let indent = "  ".repeat(depth);
    eprintln!("{indent}error {}: {}", error.code(), error.message());
    if let Some(path) = error.path() {
        eprintln!("{indent}  at: {path}");
    }
    for nested in error.errors() {
        print_error(nested, depth + 1);
    }
}
