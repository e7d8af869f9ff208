//! docmap CLI
//!
//! Command-line interface for analyzing mappings and validating or
//! coercing documents against them.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use docmap::{coerce_model, load_document, load_mapping, validate_model, Mapping};

#[derive(Parser)]
#[command(name = "docmap")]
#[command(about = "Analyze type mappings and validate documents against them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a mapping and report its compiled field registry
    Analyze {
        /// Mapping file
        mapping: PathBuf,

        /// Output as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Validate a document against a mapping
    Validate {
        /// Mapping file
        mapping: PathBuf,

        /// Document file, or - for stdin
        document: String,

        /// Skip required-field checks (partial documents)
        #[arg(long)]
        suppress_required: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Coerce a document's values into the mapping's canonical forms
    Coerce {
        /// Mapping file
        mapping: PathBuf,

        /// Document file, or - for stdin
        document: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze { mapping, json } => run_analyze(&mapping, json),

        Commands::Validate {
            mapping,
            document,
            suppress_required,
            json,
        } => run_validate(&mapping, &document, suppress_required, json),

        Commands::Coerce {
            mapping,
            document,
            output,
            pretty,
        } => run_coerce(&mapping, &document, output, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load_compiled(mapping_path: &PathBuf) -> Result<Mapping, u8> {
    let definition = load_mapping(mapping_path).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    Mapping::analyze(&definition).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn run_analyze(mapping_path: &PathBuf, json: bool) -> Result<(), u8> {
    let mapping = load_compiled(mapping_path)?;

    if json {
        let fields: Vec<_> = mapping
            .fields()
            .map(|(path, spec)| {
                serde_json::json!({
                    "path": path,
                    "type": spec.field_type.name(),
                    "required": spec.required,
                })
            })
            .collect();
        let output = serde_json::json!({
            "fields": fields,
            "idPath": mapping.id_path(),
            "analyzedFields": mapping.analyzed_fields(),
        });
        println!("{}", output);
    } else {
        for (path, spec) in mapping.fields() {
            let required = if spec.required { " (required)" } else { "" };
            println!("  {}: {}{}", path, spec.field_type, required);
        }
        if let Some(id_path) = mapping.id_path() {
            println!("\nidentity path: {}", id_path);
        }
        let analyzed = mapping.analyzed_fields();
        if !analyzed.is_empty() {
            println!("analyzed fields: {}", analyzed.join(", "));
        }
    }

    Ok(())
}

fn run_validate(
    mapping_path: &PathBuf,
    document: &str,
    suppress_required: bool,
    json: bool,
) -> Result<(), u8> {
    let mapping = load_compiled(mapping_path)?;

    let model = load_document(document).map_err(|e| {
        report_error(json, &format!("loading document: {}", e));
        e.exit_code() as u8
    })?;

    let validation = validate_model(&mapping, &model, suppress_required);

    if validation.is_valid() {
        if json {
            println!(r#"{{"valid":true}}"#);
        } else {
            println!("Valid");
        }
        Ok(())
    } else {
        if json {
            let output = serde_json::json!({
                "valid": false,
                "errors": validation.errors,
            });
            println!("{}", output);
        } else {
            eprintln!("Validation failed:");
            for error in &validation.errors {
                eprintln!("  {}", error);
            }
        }
        Err(1)
    }
}

fn run_coerce(
    mapping_path: &PathBuf,
    document: &str,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<(), u8> {
    let mapping = load_compiled(mapping_path)?;

    let mut model = load_document(document).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    coerce_model(&mapping, &mut model);

    let json_output = if pretty {
        serde_json::to_string_pretty(&model)
    } else {
        serde_json::to_string(&model)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!(r#"{{"valid":false,"error":"{}"}}"#, msg);
    } else {
        eprintln!("Error: {}", msg);
    }
}
