use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

pub const COURSE_CATALOG: [&str; 13] = [
    "EMPREENDEDORISMO",
    "FILOSOFIA",
    "GEOGRAFIA",
    "HISTÓRIA",
    "REDAÇÃO",
    "ÉTICA E CIDADANIA",
    "CIÊNCIAS",
    "EDUCAÇÃO FÍSICA",
    "ENSINO DA ARTE",
    "ESPANHOL",
    "INGLÊS",
    "LÍNGUA PORTUGUESA",
    "MATEMÁTICA",
];

const NON_COURSE_TOKENS: &[&str] = &[
    "MEDIA",
    "MEDIAS",
    "SITUACAO",
    "TOTAL",
    "TOTAIS",
    "FALTAS",
    "RESULTADO",
    "PONTOS",
    "EXTRAS",
    "AVALIACAO",
    "AV",
    "FREQUENCIA",
    "BIMESTRE",
    "DISCIPLINA",
    "DISCIPLINAS",
    "PROVISORIA",
    "PARCIAL",
    "APROVADO",
    "REPROVADO",
    "RECUPERACAO",
    "OBSERVACOES",
    "ASSINATURA",
    "III",
    "LLL",
    "NNN",
];

const OCR_CONFUSIONS: &[(&str, &str)] = &[
    ("ED FISICA", "EDUCACAO FISICA"),
    ("EDUC FISICA", "EDUCACAO FISICA"),
    ("EDUCACAO FLSICA", "EDUCACAO FISICA"),
    ("L PORTUGUESA", "LINGUA PORTUGUESA"),
    ("ING LES", "INGLES"),
    ("ENS DA ARTE", "ENSINO DA ARTE"),
];

const FRAGMENT_OVERRIDES: &[(&str, &str)] = &[
    ("EMPREEND", "EMPREENDEDORISMO"),
    ("FILOSOF", "FILOSOFIA"),
    ("GEOGRA", "GEOGRAFIA"),
    ("HISTOR", "HISTÓRIA"),
    ("REDAC", "REDAÇÃO"),
    ("CIDADAN", "ÉTICA E CIDADANIA"),
    ("CIENC", "CIÊNCIAS"),
    ("EDUCAC", "EDUCAÇÃO FÍSICA"),
    ("ENSIN", "ENSINO DA ARTE"),
    ("ESPANH", "ESPANHOL"),
    ("INGLE", "INGLÊS"),
    ("PORTUG", "LÍNGUA PORTUGUESA"),
    ("MATEM", "MATEMÁTICA"),
];

const MIN_CANDIDATE_CHARS: usize = 3;
const MIN_CONTAINED_CHARS: usize = 4;
const MIN_PREFIX_CHARS: usize = 4;
// Shared prefix must cover 70% of the shorter name.
const PREFIX_RATIO_NUM: usize = 7;
const PREFIX_RATIO_DEN: usize = 10;
const MAX_LEADING_TOKENS: usize = 4;

#[derive(Debug, Clone)]
struct CatalogEntry {
    canonical: &'static str,
    normalized: String,
}

#[derive(Debug, Clone)]
pub struct DisciplineCatalog {
    entries: Vec<CatalogEntry>,
}

impl Default for DisciplineCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl DisciplineCatalog {
    pub fn new() -> Self {
        let entries = COURSE_CATALOG
            .iter()
            .map(|&canonical| CatalogEntry {
                canonical,
                normalized: normalize_name(canonical),
            })
            .collect();
        Self { entries }
    }

    pub fn resolve(&self, candidate: &str) -> Option<&'static str> {
        let normalized = normalize_name(candidate);
        if normalized.len() < MIN_CANDIDATE_CHARS {
            return None;
        }

        let substring_hit = self.substring_match(&normalized);
        if has_non_course_token(&normalized) && substring_hit.is_none() {
            return None;
        }

        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.normalized == normalized)
        {
            return Some(entry.canonical);
        }

        substring_hit
            .or_else(|| self.prefix_overlap(&normalized))
            .or_else(|| fragment_override(&normalized))
    }

    pub fn is_course_name(&self, candidate: &str) -> bool {
        self.resolve(candidate).is_some()
    }

    pub fn leading_entry(&self, line: &str) -> Option<(&'static str, usize)> {
        let tokens = line.split_whitespace().collect::<Vec<&str>>();
        let longest = tokens.len().min(MAX_LEADING_TOKENS);

        for span in (1..=longest).rev() {
            let candidate = normalize_name(&tokens[..span].join(" "));
            if let Some(entry) = self
                .entries
                .iter()
                .find(|entry| entry.normalized == candidate)
            {
                return Some((entry.canonical, span));
            }
        }

        None
    }

    pub fn contains_non_course_token(&self, text: &str) -> bool {
        has_non_course_token(&normalize_name(text))
    }

    fn substring_match(&self, normalized: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|entry| {
                normalized.contains(entry.normalized.as_str())
                    || (normalized.len() >= MIN_CONTAINED_CHARS
                        && entry.normalized.starts_with(normalized))
            })
            .map(|entry| entry.canonical)
    }

    fn prefix_overlap(&self, normalized: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let shorter = normalized.len().min(entry.normalized.len());
                if shorter < MIN_PREFIX_CHARS {
                    return None;
                }
                let shared = common_prefix_len(normalized, &entry.normalized);
                (shared * PREFIX_RATIO_DEN >= shorter * PREFIX_RATIO_NUM)
                    .then_some((shared, entry.canonical))
            })
            .max_by_key(|(shared, _)| *shared)
            .map(|(_, canonical)| canonical)
    }
}

fn fragment_override(normalized: &str) -> Option<&'static str> {
    normalized.split(' ').find_map(|token| {
        FRAGMENT_OVERRIDES
            .iter()
            .find(|(fragment, _)| token.starts_with(fragment))
            .map(|(_, canonical)| *canonical)
    })
}

fn has_non_course_token(normalized: &str) -> bool {
    normalized
        .split(' ')
        .any(|token| NON_COURSE_TOKENS.contains(&token))
}

fn common_prefix_len(left: &str, right: &str) -> usize {
    left.bytes()
        .zip(right.bytes())
        .take_while(|(a, b)| a == b)
        .count()
}

pub fn normalize_name(input: &str) -> String {
    let folded = input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_uppercase)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect::<String>();
    let repaired = folded
        .split_whitespace()
        .map(repair_token)
        .collect::<Vec<String>>()
        .join(" ");

    OCR_CONFUSIONS
        .iter()
        .fold(format!(" {repaired} "), |text, (from, to)| {
            text.replace(&format!(" {from} "), &format!(" {to} "))
        })
        .trim()
        .to_string()
}

fn repair_token(token: &str) -> String {
    let has_letter = token.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    if !(has_letter && has_digit) {
        return token.to_string();
    }

    token
        .chars()
        .map(|c| match c {
            '0' => 'O',
            '1' => 'I',
            '5' => 'S',
            other => other,
        })
        .collect()
}
