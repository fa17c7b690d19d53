//! Structured response contract.
//!
//! The AI must answer with six sections in a fixed order, each introduced by
//! a marker glyph and a fixed title on its own line. The parser treats this as
//! a small line-oriented grammar: a heading line opens a section and the
//! section captures every following line until the next heading or the end
//! of input. Surrounding whitespace, markdown emphasis (`**`, `#`) and a
//! dropped emoji variation selector are tolerated; the glyph and title are not
//! optional.

use crate::error::ExplicaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Context,
    OcrText,
    Explanation,
    PossibleUses,
    Observations,
    Sources,
}

impl Section {
    /// Order mandated by the contract.
    pub const ORDER: [Section; 6] = [
        Self::Context,
        Self::OcrText,
        Self::Explanation,
        Self::PossibleUses,
        Self::Observations,
        Self::Sources,
    ];

    pub fn marker(&self) -> &'static str {
        match self {
            Self::Context => "📌",
            Self::OcrText => "📝",
            Self::Explanation => "📖",
            Self::PossibleUses => "💡",
            Self::Observations => "⚠️",
            Self::Sources => "🔎",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Context => "Contexto da imagem",
            Self::OcrText => "Texto identificado na imagem (OCR)",
            Self::Explanation => "Explicação e interpretação",
            Self::PossibleUses => "Possíveis usos ou aplicações",
            Self::Observations => "Observações relevantes",
            Self::Sources => "Fontes ou referências",
        }
    }

    /// Full heading line as the producer must emit it.
    pub fn heading(&self) -> String {
        format!("{} {}", self.marker(), self.title())
    }

    /// Sentence the producer must write instead of leaving the section empty.
    pub fn fallback(&self) -> Option<&'static str> {
        match self {
            Self::OcrText => Some("Nenhum texto identificado na imagem."),
            Self::PossibleUses => Some("Não aplicável para esta imagem."),
            Self::Observations => Some("Nenhuma observação adicional."),
            Self::Sources => Some("Explicação baseada em conhecimento conceitual."),
            Self::Context | Self::Explanation => None,
        }
    }

    /// Recognise a heading line, returning the section and any text that
    /// follows the title on the same line.
    fn match_heading(line: &str) -> Option<(Section, &str)> {
        let trimmed = line.trim_start_matches(|c: char| c.is_whitespace() || c == '#' || c == '*');
        Self::ORDER.into_iter().find_map(|section| {
            let glyph = section.marker().trim_end_matches('\u{FE0F}');
            let rest = trimmed.strip_prefix(glyph)?;
            let rest = rest
                .trim_start_matches('\u{FE0F}')
                .trim_start_matches(|c: char| c.is_whitespace() || c == '*');
            let after = strip_prefix_ignore_case(rest, section.title())?;
            let after = after.trim_matches(|c: char| c.is_whitespace() || c == '*' || c == ':');
            Some((section, after))
        })
    }
}

fn strip_prefix_ignore_case<'a>(haystack: &'a str, prefix: &str) -> Option<&'a str> {
    let wanted = prefix.chars().count();
    let end = haystack
        .char_indices()
        .nth(wanted)
        .map(|(idx, _)| idx)
        .unwrap_or(haystack.len());
    let candidate = &haystack[..end];
    if candidate.chars().count() == wanted && candidate.to_lowercase() == prefix.to_lowercase() {
        Some(&haystack[end..])
    } else {
        None
    }
}

/// Sections found in an analysis, in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub preamble: String,
    pub sections: Vec<(Section, String)>,
}

impl ParsedResponse {
    pub fn parse(text: &str) -> Self {
        let mut parsed = ParsedResponse::default();
        for line in text.lines() {
            if let Some((section, rest)) = Section::match_heading(line) {
                parsed.sections.push((section, rest.to_string()));
                continue;
            }
            let body = match parsed.sections.last_mut() {
                Some((_, body)) => body,
                None => &mut parsed.preamble,
            };
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(line);
        }
        parsed.preamble = parsed.preamble.trim().to_string();
        for (_, body) in parsed.sections.iter_mut() {
            *body = body.trim().to_string();
        }
        parsed
    }

    /// Body of the first occurrence of `section`.
    pub fn body(&self, section: Section) -> Option<&str> {
        self.sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, body)| body.as_str())
    }

    pub fn missing(&self) -> Vec<Section> {
        Section::ORDER
            .into_iter()
            .filter(|section| self.body(*section).is_none())
            .collect()
    }

    pub fn is_in_order(&self) -> bool {
        let positions: Vec<usize> = self
            .sections
            .iter()
            .filter_map(|(s, _)| Section::ORDER.iter().position(|o| o == s))
            .collect();
        positions.windows(2).all(|pair| pair[0] < pair[1])
    }

    /// Summary derived from the Context section; empty when unavailable.
    pub fn summary(&self) -> String {
        self.body(Section::Context).map(summarize).unwrap_or_default()
    }

    /// Check the response against the contract. Violations are non-fatal for
    /// callers: the analysis text is still delivered as-is.
    pub fn validate(&self) -> Result<(), ExplicaError> {
        let missing = self.missing();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|s| s.title()).collect();
            return Err(ExplicaError::ContractViolation(format!(
                "missing sections: {}",
                names.join(", ")
            )));
        }
        if !self.is_in_order() {
            return Err(ExplicaError::ContractViolation("sections out of order".into()));
        }
        if self.body(Section::Context).is_some_and(str::is_empty) {
            return Err(ExplicaError::ContractViolation("empty context section".into()));
        }
        Ok(())
    }
}

/// Derive the quick summary from an analysis text.
///
/// Returns the first two sentences of the Context section joined by `". "`
/// with a trailing period, or an empty string when the section is absent.
pub fn extract_summary(analysis: &str) -> String {
    ParsedResponse::parse(analysis).summary()
}

fn summarize(context: &str) -> String {
    let flattened = context.split_whitespace().collect::<Vec<_>>().join(" ");
    let sentences: Vec<&str> = flattened
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .take(2)
        .collect();
    let mut summary = sentences.join(". ");
    if !summary.is_empty() && !summary.ends_with('.') {
        summary.push('.');
    }
    summary
}
