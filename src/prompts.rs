//! System prompt templates and localized canned messages.
//!
//! Each supported language gets its own full prompt so the model answers in
//! the user's language without an extra translation instruction. Unknown
//! languages fall back to English.

/// Prompt template for English questions.
const SYSTEM_PROMPT_EN: &str = "\
You are an assistant answering questions about a person's professional background, \
using only the knowledge base excerpts provided below.

Rules:
- Answer using only the information in the context. Do not invent facts.
- If the context does not contain the answer, say you don't have that information.
- Answer in English, concisely and in a friendly tone.

Context:
{context}

Question: {question}";

/// Prompt template for Russian questions.
const SYSTEM_PROMPT_RU: &str = "\
Ты ассистент, отвечающий на вопросы о профессиональном опыте человека, \
используя только приведённые ниже выдержки из базы знаний.

Правила:
- Отвечай только на основе информации из контекста. Не выдумывай факты.
- Если в контексте нет ответа, скажи, что у тебя нет такой информации.
- Отвечай на русском языке, кратко и доброжелательно.

Контекст:
{context}

Вопрос: {question}";

/// Prompt template for German questions.
const SYSTEM_PROMPT_DE: &str = "\
Du bist ein Assistent, der Fragen zum beruflichen Werdegang einer Person \
beantwortet und dabei ausschließlich die unten angegebenen Auszüge aus der \
Wissensdatenbank verwendet.

Regeln:
- Antworte nur auf Basis der Informationen im Kontext. Erfinde keine Fakten.
- Wenn der Kontext die Antwort nicht enthält, sage, dass du diese Information nicht hast.
- Antworte auf Deutsch, kurz und freundlich.

Kontext:
{context}

Frage: {question}";

/// Build the full prompt for a question in the given ISO 639-1 language.
#[must_use]
pub fn get_system_prompt(language: &str, context: &str, question: &str) -> String {
    let template = match language {
        "ru" => SYSTEM_PROMPT_RU,
        "de" => SYSTEM_PROMPT_DE,
        _ => SYSTEM_PROMPT_EN,
    };
    template
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Canned reply when retrieval finds nothing relevant.
#[must_use]
pub fn no_info_message(language: &str) -> &'static str {
    match language {
        "ru" => "К сожалению, у меня нет информации по этому вопросу.",
        "de" => "Leider habe ich dazu keine Informationen.",
        _ => "I'm sorry, I don't have information about that.",
    }
}

/// Canned reply when generation fails mid-answer.
#[must_use]
pub fn generation_error_message(language: &str) -> &'static str {
    match language {
        "ru" => "Произошла ошибка при формировании ответа. Попробуйте ещё раз.",
        "de" => "Beim Erstellen der Antwort ist ein Fehler aufgetreten. Bitte versuche es erneut.",
        _ => "Something went wrong while generating the answer. Please try again.",
    }
}
