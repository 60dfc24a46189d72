use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "boletim",
    version,
    about = "Report-card OCR extraction and grade projection tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    Recalculate(RecalculateArgs),
}

#[derive(Args, Debug, Clone)]
#[command(group(
    ArgGroup::new("source")
        .args(["text_path", "image_path"])
        .required(true)
        .multiple(false)
))]
pub struct ExtractArgs {
    #[arg(long)]
    pub text_path: Option<PathBuf>,

    #[arg(long)]
    pub image_path: Option<PathBuf>,

    #[arg(long, default_value = "por")]
    pub ocr_lang: String,

    #[arg(long)]
    pub minimum_average: Option<f64>,

    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct RecalculateArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub minimum_average: Option<f64>,

    #[arg(long)]
    pub out: Option<PathBuf>,
}
