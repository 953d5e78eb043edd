use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

use credit_risk::{
    load_model, score_csv, ApplicantRecord, Classifier, FeatureDeriver, FormulaSet,
    DEFAULT_MODEL_PATH, FEATURE_COLUMNS,
};

const USAGE: &str = "Usage:
  credit-risk schema
  credit-risk features <record.json> [--legacy] [--json]
  credit-risk score <record.json> [--model <path>] [--legacy]
  credit-risk score-csv <input.csv> [--model <path>] [--legacy]";

struct Options {
    input: Option<PathBuf>,
    model: PathBuf,
    formulas: FormulaSet,
    json: bool,
}

fn parse_options(args: &[String]) -> Result<Options> {
    let mut options = Options {
        input: None,
        model: PathBuf::from(DEFAULT_MODEL_PATH),
        formulas: FormulaSet::Guarded,
        json: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--legacy" => options.formulas = FormulaSet::Legacy,
            "--json" => options.json = true,
            "--model" => {
                let path = iter.next().context("--model needs a path")?;
                options.model = PathBuf::from(path);
            }
            other if other.starts_with("--") => bail!("unknown option {}", other),
            other => {
                if options.input.is_some() {
                    bail!("unexpected argument {}", other);
                }
                options.input = Some(PathBuf::from(other));
            }
        }
    }

    Ok(options)
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let Some(command) = args.get(1) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };
    let options = parse_options(&args[2..])?;

    match command.as_str() {
        "schema" => {
            for (i, column) in FEATURE_COLUMNS.iter().enumerate() {
                println!("{:2}  {}", i, column);
            }
        }
        "features" => run_features(&options)?,
        "score" => run_score(&options)?,
        "score-csv" => run_score_csv(&options)?,
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn read_record(options: &Options) -> Result<ApplicantRecord> {
    let path = options.input.as_ref().context("missing <record.json> argument")?;
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let value: serde_json::Value =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?;

    Ok(FeatureDeriver::new(options.formulas).parse(&value)?)
}

fn run_features(options: &Options) -> Result<()> {
    let record = read_record(options)?;
    let row = FeatureDeriver::new(options.formulas).derive(&record)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&row.to_json())?);
        return Ok(());
    }

    for (name, value) in row.columns() {
        println!("{:<28} {}", name, value);
    }
    Ok(())
}

fn run_score(options: &Options) -> Result<()> {
    let record = read_record(options)?;
    let (model, info) = load_model(&options.model)?;
    println!("✓ Model {} v{} ({} trees)", info.name, info.version, info.tree_count);

    let row = FeatureDeriver::new(options.formulas).derive(&record)?;
    let prediction = model.predict(&row)?;

    println!("{}", serde_json::json!({ "prediction": prediction }));
    Ok(())
}

fn run_score_csv(options: &Options) -> Result<()> {
    let path = options.input.as_ref().context("missing <input.csv> argument")?;
    let file = fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let (model, info) = load_model(&options.model)?;
    eprintln!("✓ Model {} v{} ({} trees)", info.name, info.version, info.tree_count);

    let deriver = FeatureDeriver::new(options.formulas);
    let summary = score_csv(file, io::stdout().lock(), &deriver, &model)?;

    eprintln!("✓ {}", summary.summary());
    Ok(())
}
