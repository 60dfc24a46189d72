use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::info;

pub trait TextRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    lang: String,
}

impl TesseractRecognizer {
    pub fn new(lang: impl Into<String>) -> Self {
        Self { lang: lang.into() }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<String> {
        if !image_path.exists() {
            bail!("image not found: {}", image_path.display());
        }
        if !command_available("tesseract") {
            bail!("tesseract is not installed or not on PATH");
        }

        info!(image = %image_path.display(), lang = %self.lang, "running tesseract");
        let output = Command::new("tesseract")
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .with_context(|| format!("failed to execute tesseract for {}", image_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "tesseract returned non-zero exit status for {}: {}",
                image_path.display(),
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).replace('\u{0000}', ""))
    }
}

fn command_available(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedRecognizer(&'static str);

    impl TextRecognizer for CannedRecognizer {
        fn recognize(&self, _image_path: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn recognizers_are_interchangeable_behind_the_trait() {
        let recognizer: Box<dyn TextRecognizer> = Box::new(CannedRecognizer("MATEMÁTICA 0 7,0"));
        let text = recognizer.recognize(Path::new("ignored.png")).unwrap();
        assert_eq!(text, "MATEMÁTICA 0 7,0");
    }

    #[test]
    fn tesseract_rejects_missing_image() {
        let recognizer = TesseractRecognizer::new("por");
        let error = recognizer
            .recognize(Path::new("/nonexistent/boletim.png"))
            .unwrap_err();
        assert!(error.to_string().contains("image not found"));
    }
}
