use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::extraction::catalog::{DisciplineCatalog, normalize_name};
use crate::model::HeaderFields;
use crate::util::normalize_whitespace;

pub const HEADER_WINDOW: usize = 20;
const CAPS_SCAN_WINDOW: usize = 10;
const CAPS_SCAN_TOKENS: (usize, usize) = (2, 8);
const CAPS_SCAN_CHARS: (usize, usize) = (8, 80);
const MAX_CLASS_CODE_CHARS: usize = 8;
const MIN_NAME_CHARS: usize = 3;

const BOILERPLATE_TOKENS: &[&str] = &[
    "ESCOLA",
    "COLEGIO",
    "ESTADUAL",
    "MUNICIPAL",
    "SECRETARIA",
    "GOVERNO",
    "ESTADO",
    "EDUCACAO",
    "EDUCACIONAL",
    "BOLETIM",
    "ESCOLAR",
    "RUA",
    "AVENIDA",
    "BAIRRO",
    "CEP",
    "TELEFONE",
    "INSTITUTO",
    "CENTRO",
    "ENSINO",
    "FUNDAMENTAL",
    "MEDIO",
    "ANO",
    "LETIVO",
    "SERIE",
    "NOME",
    "ALUNO",
    "ALUNA",
    "MATRICULA",
    "TURMA",
    "BIMESTRE",
    "DISCIPLINA",
    "HIPOCRATES",
    "RELATORIO",
    "NOTAS",
    "DESEMPENHO",
];

#[derive(Debug)]
pub struct HeaderPatterns {
    name_label: Regex,
    inline_name: Regex,
    registration_label: Regex,
    inline_registration: Regex,
    class_label: Regex,
    inline_class: Regex,
    period_label: Regex,
    period_marker: Regex,
    inline_period: Regex,
    period_ordinal: Regex,
    bare_period: Regex,
    long_digits: Regex,
    wide_gap: Regex,
}

impl HeaderPatterns {
    pub fn compile() -> Result<Self> {
        Ok(Self {
            name_label: compile(r"(?i)nome\s+d[oa]\s+alun[oa]")?,
            inline_name: compile(
                r"(?i:nome\s+d[oa]\s+alun[oa](?:\s*\(a\))?|alun[oa](?:\s*\(a\))?)\s*:\s*(?P<value>[^\d:]+?)\s*(?:\d|(?i:matr[ií]cula|turma|bimestre)|$)",
            )?,
            registration_label: compile(r"(?i)matr[ií]cula")?,
            inline_registration: compile(
                r"(?i)matr[ií]cula\s*(?:n[º°o]\.?)?\s*[:\-]?\s*(?P<value>\d{3,})",
            )?,
            class_label: compile(r"(?i)\bturma\b")?,
            inline_class: compile(r"(?i)\bturma\s*[:\-]?\s*(?P<value>[0-9a-z][0-9a-z\-]*)")?,
            period_label: compile(r"(?i)\bbimestre\b")?,
            period_marker: compile(r"(?i)(?P<ordinal>\d)\s*[º°ªo]?\s*bimestre")?,
            inline_period: compile(
                r"(?i)\bbimestre\s*[:\-]?\s*(?P<ordinal>\d)\s*[º°ª]?(?:[^\d]|$)",
            )?,
            period_ordinal: compile(r"(?P<ordinal>\d)\s*[º°ª]")?,
            bare_period: compile(r"^(?P<ordinal>\d)\s*[º°ªo]?$")?,
            long_digits: compile(r"\d{4,}")?,
            wide_gap: compile(r"\s{2,}")?,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).with_context(|| format!("failed to compile header regex: {pattern}"))
}

pub struct HeaderContext<'a> {
    pub lines: &'a [String],
    pub patterns: &'a HeaderPatterns,
    pub catalog: &'a DisciplineCatalog,
}

pub type HeaderRule = for<'a> fn(&HeaderContext<'a>) -> Option<HeaderFields>;

struct FieldRules {
    field: &'static str,
    resolved: fn(&HeaderFields) -> bool,
    rules: &'static [(&'static str, HeaderRule)],
}

const FIELD_RULES: &[FieldRules] = &[
    FieldRules {
        field: "student_name",
        resolved: has_student_name,
        rules: &[
            ("label_then_registration_split", name_from_registration_split),
            ("label_then_wide_columns", name_from_wide_columns),
            ("label_then_caps_line", name_from_caps_line),
            ("inline_label", name_from_inline_label),
            ("caps_line_before_registration", name_before_registration_label),
            ("caps_line_scan", name_from_caps_scan),
        ],
    },
    FieldRules {
        field: "registration_id",
        resolved: has_registration_id,
        rules: &[
            ("inline_label", registration_inline),
            ("label_then_next_line", registration_next_line),
        ],
    },
    FieldRules {
        field: "section_id",
        resolved: has_section_id,
        rules: &[
            ("inline_label", class_inline),
            ("label_then_next_line", class_next_line),
        ],
    },
    FieldRules {
        field: "period_label",
        resolved: has_period_label,
        rules: &[
            ("inline_marker", period_inline),
            ("inline_label", period_inline_label),
            ("label_then_next_line", period_next_line),
        ],
    },
];

fn has_student_name(fields: &HeaderFields) -> bool {
    fields.student_name.is_some()
}

fn has_registration_id(fields: &HeaderFields) -> bool {
    fields.registration_id.is_some()
}

fn has_section_id(fields: &HeaderFields) -> bool {
    fields.section_id.is_some()
}

fn has_period_label(fields: &HeaderFields) -> bool {
    fields.period_label.is_some()
}

pub fn extract_header(
    lines: &[String],
    patterns: &HeaderPatterns,
    catalog: &DisciplineCatalog,
) -> HeaderFields {
    let window = &lines[..lines.len().min(HEADER_WINDOW)];
    let context = HeaderContext {
        lines: window,
        patterns,
        catalog,
    };

    let mut fields = HeaderFields::default();
    for field_rules in FIELD_RULES {
        for (rule_name, rule) in field_rules.rules {
            if (field_rules.resolved)(&fields) {
                break;
            }
            if let Some(found) = rule(&context) {
                debug!(field = field_rules.field, rule = rule_name, "header rule matched");
                fields.fill_missing(found);
            }
        }
    }

    fields
}

fn name_label_followers<'a>(context: &'a HeaderContext<'_>) -> impl Iterator<Item = &'a str> + 'a {
    context
        .lines
        .windows(2)
        .filter(move |pair| context.patterns.name_label.is_match(&pair[0]))
        .map(|pair| pair[1].as_str())
}

fn name_from_registration_split(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    name_label_followers(context).find_map(|next| {
        let digits = context.patterns.long_digits.find(next)?;
        let name = accept_name(&next[..digits.start()], context)?;
        let rest = &next[digits.end()..];

        let period = context.patterns.period_marker.captures(rest);
        let class_region = period
            .as_ref()
            .and_then(|captures| captures.get(0))
            .map(|found| &rest[..found.start()])
            .unwrap_or(rest);

        Some(HeaderFields {
            student_name: Some(name),
            registration_id: Some(digits.as_str().to_string()),
            section_id: first_class_code(class_region),
            period_label: period
                .and_then(|captures| captures.name("ordinal"))
                .map(|ordinal| period_from_ordinal(ordinal.as_str())),
        })
    })
}

fn name_from_wide_columns(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    name_label_followers(context).find_map(|next| {
        let columns = context
            .patterns
            .wide_gap
            .split(next)
            .map(str::trim)
            .filter(|column| !column.is_empty())
            .collect::<Vec<&str>>();
        if columns.len() < 4 {
            return None;
        }

        let name = accept_name(columns[0], context)?;
        let registration = columns[1]
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| columns[1].to_string());

        Some(HeaderFields {
            student_name: Some(name),
            registration_id: registration,
            section_id: first_class_code(columns[2]),
            period_label: normalize_period(columns[3], context.patterns),
        })
    })
}

fn name_from_caps_line(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    name_label_followers(context).find_map(|next| {
        if !is_bare_caps_phrase(next) || is_boilerplate(next) {
            return None;
        }
        accept_name(next, context).map(name_only)
    })
}

fn name_from_inline_label(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context.lines.iter().find_map(|line| {
        let captures = context.patterns.inline_name.captures(line)?;
        let value = captures.name("value")?.as_str();
        accept_name(value, context).map(name_only)
    })
}

fn name_before_registration_label(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context.lines.windows(2).find_map(|pair| {
        let (previous, line) = (pair[0].as_str(), pair[1].as_str());
        if !context.patterns.registration_label.is_match(line)
            || context.patterns.name_label.is_match(line)
        {
            return None;
        }
        if !is_bare_caps_phrase(previous) || is_boilerplate(previous) {
            return None;
        }
        accept_name(previous, context).map(name_only)
    })
}

fn name_from_caps_scan(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context
        .lines
        .iter()
        .take(CAPS_SCAN_WINDOW)
        .find_map(|line| {
            let tokens = line.split_whitespace().count();
            let chars = line.chars().count();
            let plausible = (CAPS_SCAN_TOKENS.0..=CAPS_SCAN_TOKENS.1).contains(&tokens)
                && (CAPS_SCAN_CHARS.0..=CAPS_SCAN_CHARS.1).contains(&chars)
                && is_bare_caps_phrase(line)
                && !is_boilerplate(line);
            if !plausible {
                return None;
            }
            accept_name(line, context).map(name_only)
        })
}

fn registration_inline(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context.lines.iter().find_map(|line| {
        let captures = context.patterns.inline_registration.captures(line)?;
        Some(HeaderFields {
            registration_id: Some(captures.name("value")?.as_str().to_string()),
            ..HeaderFields::default()
        })
    })
}

fn registration_next_line(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context.lines.windows(2).find_map(|pair| {
        if !context.patterns.registration_label.is_match(&pair[0]) {
            return None;
        }
        let digits = context.patterns.long_digits.find(&pair[1])?;
        Some(HeaderFields {
            registration_id: Some(digits.as_str().to_string()),
            ..HeaderFields::default()
        })
    })
}

fn class_inline(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context.lines.iter().find_map(|line| {
        let captures = context.patterns.inline_class.captures(line)?;
        let code = accept_class_code(captures.name("value")?.as_str())?;
        Some(HeaderFields {
            section_id: Some(code),
            ..HeaderFields::default()
        })
    })
}

fn class_next_line(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context.lines.windows(2).find_map(|pair| {
        if !context.patterns.class_label.is_match(&pair[0]) {
            return None;
        }
        let next = pair[1].as_str();
        let region = context
            .patterns
            .long_digits
            .find(next)
            .map(|digits| &next[digits.end()..])
            .unwrap_or(next);
        let region = context
            .patterns
            .period_marker
            .find(region)
            .map(|marker| &region[..marker.start()])
            .unwrap_or(region);

        Some(HeaderFields {
            section_id: Some(first_class_code(region)?),
            ..HeaderFields::default()
        })
    })
}

fn period_inline(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context
        .lines
        .iter()
        .find_map(|line| period_from(&context.patterns.period_marker, line))
}

fn period_inline_label(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context
        .lines
        .iter()
        .find_map(|line| period_from(&context.patterns.inline_period, line))
}

fn period_next_line(context: &HeaderContext<'_>) -> Option<HeaderFields> {
    context.lines.windows(2).find_map(|pair| {
        if !context.patterns.period_label.is_match(&pair[0]) {
            return None;
        }
        period_from(&context.patterns.period_ordinal, &pair[1])
            .or_else(|| period_from(&context.patterns.bare_period, &pair[1]))
    })
}

fn period_from(pattern: &Regex, line: &str) -> Option<HeaderFields> {
    let ordinal = pattern.captures(line)?.name("ordinal")?;
    Some(HeaderFields {
        period_label: Some(period_from_ordinal(ordinal.as_str())),
        ..HeaderFields::default()
    })
}

fn name_only(name: String) -> HeaderFields {
    HeaderFields {
        student_name: Some(name),
        ..HeaderFields::default()
    }
}

fn accept_name(candidate: &str, context: &HeaderContext<'_>) -> Option<String> {
    let name = normalize_whitespace(candidate.trim_matches(|c: char| c == '-' || c == '|'));
    let letters_only = name
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '\'');
    if name.chars().count() < MIN_NAME_CHARS || !letters_only {
        return None;
    }
    if context.catalog.is_course_name(&name) {
        debug!(candidate = %name, "name candidate rejected as course name");
        return None;
    }
    Some(name)
}

fn is_bare_caps_phrase(line: &str) -> bool {
    line.chars().any(char::is_alphabetic)
        && line
            .chars()
            .all(|c| c == ' ' || (c.is_alphabetic() && !c.is_lowercase()))
}

fn is_boilerplate(line: &str) -> bool {
    normalize_name(line)
        .split(' ')
        .any(|token| BOILERPLATE_TOKENS.contains(&token))
}

fn accept_class_code(value: &str) -> Option<String> {
    let code = value.trim().to_uppercase();
    let valid = !code.is_empty()
        && code.len() <= MAX_CLASS_CODE_CHARS
        && code.chars().any(|c| c.is_ascii_digit())
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    valid.then_some(code)
}

fn first_class_code(region: &str) -> Option<String> {
    region.split_whitespace().find_map(accept_class_code)
}

fn normalize_period(value: &str, patterns: &HeaderPatterns) -> Option<String> {
    patterns
        .period_marker
        .captures(value)
        .or_else(|| patterns.period_ordinal.captures(value))
        .and_then(|captures| captures.name("ordinal"))
        .map(|ordinal| period_from_ordinal(ordinal.as_str()))
}

fn period_from_ordinal(ordinal: &str) -> String {
    format!("{ordinal}º Bimestre")
}
