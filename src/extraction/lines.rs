use unicode_normalization::UnicodeNormalization;

pub fn normalize_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.replace('\u{0000}', ""))
        .map(|line| line.trim().nfc().collect::<String>())
        .filter(|line| !line.is_empty())
        .collect()
}
