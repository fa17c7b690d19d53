//! Prompts sent to the AI gateway.
//!
//! The system prompt is the producer side of the six-section contract parsed
//! by `explica_core::contract`; headings here must match `Section::heading`.

use explica_core::{language_label, DetailLevel};

pub const SYSTEM_PROMPT: &str = "Você é um assistente especializado em análise de imagens. Sua tarefa é analisar imagens enviadas pelo usuário e fornecer uma análise completa, organizada e confiável.

IMPORTANTE: Você DEVE seguir EXATAMENTE este formato na sua resposta:

📌 Contexto da imagem
[Descreva o que a imagem representa, o tipo de conteúdo (print, documento, foto, erro, aviso, interface, etc.) e a situação provável]

📝 Texto identificado na imagem (OCR)
[Extraia TODO o texto visível na imagem, mantendo fidelidade ao texto original. Se não houver texto, informe: \"Nenhum texto identificado na imagem.\"]

📖 Explicação e interpretação
[Explique o conteúdo da imagem e do texto de forma clara, objetiva e acessível. Não faça suposições exageradas.]

💡 Possíveis usos ou aplicações
[Liste possíveis usos profissionais, acadêmicos ou práticos. Se não for aplicável, escreva: \"Não aplicável para esta imagem.\"]

⚠️ Observações relevantes
[Inclua alertas, limitações, pontos de atenção ou erros comuns de interpretação. Se não houver, escreva: \"Nenhuma observação adicional.\"]

🔎 Fontes ou referências
[Cite fontes conhecidas quando aplicável. Não invente links. Se não existirem fontes diretas, informe: \"Explicação baseada em conhecimento conceitual.\"]

REGRAS:
- Sempre responda em português brasileiro
- Mantenha o formato exato com os emojis
- Seja preciso e objetivo
- Não invente informações
- Se o usuário fornecer um contexto ou pergunta específica, priorize essa informação na análise";

/// Verbosity instruction appended to every analysis prompt.
pub fn detail_instruction(level: DetailLevel) -> &'static str {
    match level {
        DetailLevel::Short => "Seja MUITO conciso. Cada seção deve ter no máximo 1-2 frases curtas.",
        DetailLevel::Standard => "Forneça uma análise equilibrada. Cada seção deve ter 2-4 frases.",
        DetailLevel::Detailed => "Forneça uma análise completa e detalhada. Explore cada seção em profundidade com explicações extensas.",
    }
}

/// Which prompt branch a request falls into; first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptBranch {
    FollowUp,
    FocusedAnalysis,
    FullAnalysis,
}

impl PromptBranch {
    pub fn select(user_context: Option<&str>, previous_analysis: Option<&str>) -> Self {
        match (non_blank(user_context), non_blank(previous_analysis)) {
            (_, Some(_)) => Self::FollowUp,
            (Some(_), None) => Self::FocusedAnalysis,
            (None, None) => Self::FullAnalysis,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build the user message for an analysis or follow-up request.
pub fn build_user_message(
    user_context: Option<&str>,
    previous_analysis: Option<&str>,
    level: DetailLevel,
) -> String {
    let instruction = detail_instruction(level);
    let context = non_blank(user_context).map(str::trim).unwrap_or_default();
    match PromptBranch::select(user_context, previous_analysis) {
        PromptBranch::FollowUp => format!(
            "Análise anterior:\n{}\n\nPergunta do usuário: \"{context}\"\n\nResponda a pergunta do usuário baseado na análise anterior e na imagem. Mantenha o mesmo formato estruturado.\n\n{instruction}",
            previous_analysis.unwrap_or_default()
        ),
        PromptBranch::FocusedAnalysis => format!(
            "O usuário quer saber: \"{context}\"\n\nAnalise esta imagem considerando essa solicitação, mas ainda seguindo o formato completo especificado.\n\n{instruction}"
        ),
        PromptBranch::FullAnalysis => {
            format!("Analise esta imagem seguindo o formato especificado.\n\n{instruction}")
        }
    }
}

/// Display name used in the translation prompt; unknown codes pass through.
pub fn language_name(code: &str) -> &str {
    language_label(code).unwrap_or(code)
}

pub fn translation_system_prompt(target_language: &str) -> String {
    format!(
        "You are a literal translation engine.

Translate the provided text into {}.

NON-NEGOTIABLE RULES:
- Translate ONLY what is provided. Do not add, remove, expand, summarize, or paraphrase.
- Preserve formatting exactly: keep the same number of lines and the same line breaks.
- Do not introduce new headings, bullet points, emojis, or extra punctuation.
- If the input is 1 line, the output must be 1 line.
- Output ONLY the translated text (no preamble, no quotes, no explanations).",
        language_name(target_language)
    )
}
