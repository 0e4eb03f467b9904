//! CLI interface and argument parsing
//!
//! A headless host for the prediction pipeline: single predictions from
//! flags or JSON, batch predictions from CSV, and model inspection.

mod render;

use std::io::{Read, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Settings, DEFAULT_MODEL_PATH};
use crate::domain::RawPatientInput;
use crate::{HeartwiseError, PredictionService};

pub use render::render_card;

/// Heartwise - heart disease risk prediction
#[derive(Parser, Debug)]
#[command(name = "heartwise")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the model artifact
    #[arg(short, long, global = true, default_value = DEFAULT_MODEL_PATH, env = "HEARTWISE_MODEL_PATH")]
    pub model: PathBuf,

    /// Load model artifacts that carry no signed manifest
    #[arg(long, global = true, env = "HEARTWISE_ALLOW_UNSIGNED_MODELS")]
    pub allow_unsigned: bool,

    /// Base64 Ed25519 key verifying the model manifest
    #[arg(long, global = true, env = "HEARTWISE_MODEL_PUBKEY_B64", hide_env_values = true)]
    pub pubkey_b64: Option<String>,

    /// File holding the base64 verifying key
    #[arg(long, global = true, env = "HEARTWISE_MODEL_PUBKEY_B64_FILE")]
    pub pubkey_file: Option<PathBuf>,

    /// Log level or filter directive; takes precedence over RUST_LOG
    #[arg(short, long, global = true, env = "HEARTWISE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Predict risk for one patient
    Predict(PredictArgs),

    /// Predict risk for every row of a CSV file; the last line is a summary
    Batch(BatchArgs),

    /// Load and verify the model, then print a summary
    InspectModel,
}

/// Patient fields for `predict`. Defaults match the intake form defaults.
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON file with all eleven fields ("-" for stdin); overrides field flags
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long, default_value_t = 45, allow_negative_numbers = true)]
    pub age: i64,

    /// M or F
    #[arg(long, default_value = "M")]
    pub sex: String,

    /// ATA, NAP, ASY or TA
    #[arg(long, default_value = "ATA")]
    pub chest_pain_type: String,

    /// Resting blood pressure (mmHg)
    #[arg(long, default_value_t = 120, allow_negative_numbers = true)]
    pub resting_bp: i64,

    /// Serum cholesterol (mg/dL)
    #[arg(long, default_value_t = 200, allow_negative_numbers = true)]
    pub cholesterol: i64,

    /// Fasting blood sugar > 120 mg/dL (0 or 1)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub fasting_bs: i64,

    /// Normal, ST or LVH
    #[arg(long, default_value = "Normal")]
    pub resting_ecg: String,

    /// Maximum heart rate achieved
    #[arg(long, default_value_t = 150, allow_negative_numbers = true)]
    pub max_hr: i64,

    /// Y or N
    #[arg(long, default_value = "N")]
    pub exercise_angina: String,

    /// ST depression induced by exercise, in steps of 0.1
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub oldpeak: f64,

    /// Up, Flat or Down
    #[arg(long, default_value = "Up")]
    pub st_slope: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Colour the text card by risk tier
    #[arg(long, conflicts_with = "json")]
    pub color: bool,
}

impl PredictArgs {
    fn raw_input(&self) -> Result<RawPatientInput, HeartwiseError> {
        match &self.input {
            Some(path) if path.as_os_str() == "-" => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                Ok(serde_json::from_str(&buf)?)
            }
            Some(path) => Ok(serde_json::from_slice(&std::fs::read(path)?)?),
            None => Ok(RawPatientInput {
                age: self.age,
                sex: self.sex.clone(),
                chest_pain_type: self.chest_pain_type.clone(),
                resting_bp: self.resting_bp,
                cholesterol: self.cholesterol,
                fasting_bs: self.fasting_bs,
                resting_ecg: self.resting_ecg.clone(),
                max_hr: self.max_hr,
                exercise_angina: self.exercise_angina.clone(),
                oldpeak: self.oldpeak,
                st_slope: self.st_slope.clone(),
            }),
        }
    }
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// CSV file with a header row using the canonical column names
    #[arg(long)]
    pub csv: PathBuf,
}

impl Cli {
    /// Resolve model settings from the global flags.
    ///
    /// # Errors
    /// Returns an error if the verifying key cannot be read.
    pub fn settings(&self) -> Result<Settings, HeartwiseError> {
        Settings::resolve(
            &self.model,
            self.allow_unsigned,
            self.pubkey_b64.as_deref(),
            self.pubkey_file.as_deref(),
        )
    }
}

/// Execute the CLI command, writing results to `out`.
///
/// Returns the process exit code.
///
/// # Errors
/// Returns an error if the model cannot be loaded, or if a single
/// prediction fails.
pub fn execute(cli: &Cli, out: &mut dyn Write) -> Result<i32, HeartwiseError> {
    let settings = cli.settings()?;
    let service = PredictionService::bootstrap(&settings.model_path, &settings.load_options)?;

    match &cli.command {
        Commands::Predict(args) => {
            let raw = args.raw_input()?;
            let result = service.predict_raw(&raw)?;
            if args.json {
                serde_json::to_writer(&mut *out, &result)?;
                writeln!(out)?;
            } else {
                write!(out, "{}", render_card(&result, args.color))?;
            }
            Ok(0)
        }
        Commands::Batch(args) => {
            run_batch(&service, args, out)?;
            Ok(0)
        }
        Commands::InspectModel => {
            serde_json::to_writer_pretty(&mut *out, &service.classifier().summary())?;
            writeln!(out)?;
            Ok(0)
        }
    }
}

fn run_batch(
    service: &PredictionService<crate::adapters::ArtifactClassifier>,
    args: &BatchArgs,
    out: &mut dyn Write,
) -> Result<(), HeartwiseError> {
    let mut reader = csv::Reader::from_path(&args.csv)?;
    let (mut ok, mut failed) = (0usize, 0usize);

    for (i, row) in reader.deserialize::<RawPatientInput>().enumerate() {
        let line = match row
            .map_err(HeartwiseError::from)
            .and_then(|raw| service.predict_raw(&raw))
        {
            Ok(result) => {
                ok += 1;
                serde_json::json!({ "row": i + 1, "result": result })
            }
            Err(e) => {
                failed += 1;
                tracing::warn!("Row {} rejected: {}", i + 1, e);
                serde_json::json!({ "row": i + 1, "error": e.to_string() })
            }
        };
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    }

    serde_json::to_writer(
        &mut *out,
        &serde_json::json!({ "summary": { "scored": ok, "rejected": failed } }),
    )?;
    writeln!(out)?;

    if failed > 0 {
        tracing::warn!("Batch complete: {} scored, {} rejected", ok, failed);
    } else {
        tracing::info!("Batch complete: {} scored", ok);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_predict_defaults() {
        let cli = Cli::parse_from(["heartwise", "predict"]);
        assert_eq!(cli.model, PathBuf::from(DEFAULT_MODEL_PATH));
        let Commands::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        let raw = args.raw_input().expect("raw input");
        assert_eq!(raw, crate::domain::sample_input());
    }

    #[test]
    fn test_cli_parse_negative_oldpeak() {
        let cli = Cli::parse_from(["heartwise", "predict", "--oldpeak", "-1.5", "--sex", "F"]);
        let Commands::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert!((args.oldpeak + 1.5).abs() < f64::EPSILON);
        assert_eq!(args.sex, "F");
    }

    #[test]
    fn test_cli_parse_batch_and_global_flags() {
        let cli = Cli::parse_from([
            "heartwise",
            "batch",
            "--csv",
            "heart.csv",
            "--allow-unsigned",
            "--model",
            "m.json",
        ]);
        assert!(cli.allow_unsigned);
        assert_eq!(cli.model, PathBuf::from("m.json"));
        assert!(matches!(cli.command, Commands::Batch(_)));
    }

    #[test]
    fn test_execute_predict_json() {
        let cli = Cli::parse_from(["heartwise", "predict", "--json"]);
        let mut out = Vec::new();
        let code = execute(&cli, &mut out).expect("Should execute");
        assert_eq!(code, 0);

        let value: serde_json::Value = serde_json::from_slice(&out).expect("json output");
        assert_eq!(value["risk_tier"], "LOW");
    }

    #[test]
    fn test_execute_predict_rejects_invalid_input() {
        let cli = Cli::parse_from(["heartwise", "predict", "--max-hr", "300"]);
        let err = execute(&cli, &mut Vec::new()).expect_err("Should fail");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_execute_missing_model() {
        let cli = Cli::parse_from(["heartwise", "--model", "missing.json", "inspect-model"]);
        let err = execute(&cli, &mut Vec::new()).expect_err("Should fail");
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_execute_batch_reports_bad_rows() {
        let temp = tempfile::tempdir().expect("tempdir");
        let csv_path = temp.path().join("heart.csv");
        std::fs::write(
            &csv_path,
            "Age,Sex,ChestPainType,RestingBP,Cholesterol,FastingBS,RestingECG,MaxHR,ExerciseAngina,Oldpeak,ST_Slope,HeartDisease\n\
             40,M,ATA,140,289,0,Normal,172,N,0,Up,0\n\
             49,F,NAP,160,180,0,Normal,156,N,1,Flat,1\n\
             37,M,XYZ,130,283,0,ST,98,N,0,Up,0\n",
        )
        .expect("write csv");

        let cli = Cli::parse_from([
            "heartwise",
            "batch",
            "--csv",
            csv_path.to_str().expect("utf8 path"),
        ]);
        let mut out = Vec::new();
        execute(&cli, &mut out).expect("Should execute");

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .expect("utf8")
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].get("result").is_some());
        assert!(lines[1].get("result").is_some());
        assert_eq!(lines[2]["row"], 3);
        assert!(lines[2]["error"].as_str().expect("error").contains("XYZ"));
        assert_eq!(lines[3]["summary"]["scored"], 2);
        assert_eq!(lines[3]["summary"]["rejected"], 1);
    }
}
