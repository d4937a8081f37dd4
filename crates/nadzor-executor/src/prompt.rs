// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for provider calls.
//!
//! Builds the system prompt from the routed template, an optional grounding
//! section rendered from retrieved normative fragments, and the bounded
//! conversation window ending with the current user turn.

use nadzor_core::{ConversationMessage, PromptMessage, Request, Role};
use nadzor_retrieval::RetrievedFragment;
use nadzor_router::PromptTemplate;

/// Caption used when a photo arrives without text.
pub const DEFAULT_PHOTO_CAPTION: &str = "Проанализируй фото на предмет строительных дефектов";

const TECHNICAL_SYSTEM_PROMPT: &str = "\
Ты — эксперт-строитель с 20-летним стажем, специализирующийся на строительных нормативах РФ.

ЗАДАЧА: Дать профессиональный, точный и практичный ответ на вопрос инженера стройнадзора.

ТРЕБОВАНИЯ К ОТВЕТУ:
1. Ссылайся на конкретные СП, ГОСТ, СНиП с номерами пунктов
2. Используй профессиональную терминологию
3. Давай практические рекомендации из опыта
4. Если есть несколько подходов — укажи все с плюсами и минусами
5. Предупреди о возможных ошибках и последствиях

ФОРМАТ: Структурированный ответ с подзаголовками и списками.";

const DEFECT_SYSTEM_PROMPT: &str = "\
Ты — эксперт строительного надзора, анализирующий фотографии с объектов строительства.

ЗАДАЧА: По фотографии определить видимые дефекты и нарушения технологии.

ТРЕБОВАНИЯ К ОТВЕТУ:
1. Перечисли все видимые дефекты с оценкой критичности
2. Укажи вероятные причины каждого дефекта
3. Сошлись на нарушенные нормативы (СП, ГОСТ, СНиП) с пунктами
4. Дай рекомендации по устранению и дальнейшему контролю
5. Если дефектов не видно — скажи об этом прямо, не выдумывай

ФОРМАТ: Структурированный перечень дефектов.";

const DRAWING_SYSTEM_PROMPT: &str = "\
Ты — эксперт по созданию промптов для AI-генерации технических строительных изображений.

Твоя задача: превратить запрос пользователя в детальный, точный промпт на английском языке.

Требования:
1. Промпт должен быть НА АНГЛИЙСКОМ ЯЗЫКЕ
2. Описывать технический стиль изображения (схема, не фотография!)
3. Включать конкретные технические детали: узлы, размеры, материалы
4. Быть понятным для AI-модели генерации изображений

Ответь только текстом промпта, без пояснений.";

const GENERALIST_SYSTEM_PROMPT: &str = "\
Ты — опытный инженер строительного надзора в РФ, помощник коллег на стройплощадке.

Отвечай профессионально и по делу. Где уместно, ссылайся на СП, ГОСТ и СНиП.
Если вопрос не относится к строительству, ответь кратко и вежливо.";

/// System prompt text for a routed template.
pub fn system_prompt(template: PromptTemplate) -> &'static str {
    match template {
        PromptTemplate::TechnicalNormative => TECHNICAL_SYSTEM_PROMPT,
        PromptTemplate::DefectAnalysis => DEFECT_SYSTEM_PROMPT,
        PromptTemplate::DrawingSpec => DRAWING_SYSTEM_PROMPT,
        PromptTemplate::Generalist => GENERALIST_SYSTEM_PROMPT,
    }
}

/// Render retrieved fragments as a grounding section appended to the
/// system prompt. Empty input renders nothing.
pub fn render_grounding(fragments: &[RetrievedFragment]) -> String {
    if fragments.is_empty() {
        return String::new();
    }
    let mut section = String::from(
        "\n\nНОРМАТИВНАЯ БАЗА (выдержки, используй их в ответе и цитируй источник):\n",
    );
    for fragment in fragments {
        section.push_str(&format!(
            "\n[{} {}]\n{}\n",
            fragment.document_id, fragment.section_label, fragment.text
        ));
    }
    section
}

/// The user-facing text of a request; photos without text get a default
/// caption so the provider has something to answer.
pub fn user_text(request: &Request) -> String {
    match &request.text {
        Some(text) if !text.trim().is_empty() => text.clone(),
        _ if request.has_photo() => DEFAULT_PHOTO_CAPTION.to_string(),
        _ => String::new(),
    }
}

/// Conversation window plus the current user turn, oldest first.
pub fn build_messages(history: &[ConversationMessage], user_text: &str) -> Vec<PromptMessage> {
    let mut messages: Vec<PromptMessage> = history
        .iter()
        .map(|m| PromptMessage {
            role: m.role,
            content: m.content.clone(),
        })
        .collect();
    messages.push(PromptMessage {
        role: Role::User,
        content: user_text.to_string(),
    });
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use nadzor_core::PhotoData;

    fn photo_request() -> Request {
        Request {
            user_id: 1,
            chat_id: "chat".into(),
            text: None,
            photo: Some(PhotoData {
                mime_type: "image/jpeg".into(),
                data: "aGVsbG8=".into(),
            }),
            received_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn empty_fragments_render_nothing() {
        assert!(render_grounding(&[]).is_empty());
    }

    #[test]
    fn grounding_lists_document_and_section() {
        let fragments = vec![RetrievedFragment {
            document_id: "СП 70.13330.2012".into(),
            section_label: "п. 9.11.1".into(),
            text: "Ширина раскрытия трещин не должна превышать...".into(),
            relevance_score: 0.91,
        }];
        let section = render_grounding(&fragments);
        assert!(section.contains("СП 70.13330.2012 п. 9.11.1"));
        assert!(section.contains("Ширина раскрытия трещин"));
    }

    #[test]
    fn photo_without_text_gets_default_caption() {
        assert_eq!(user_text(&photo_request()), DEFAULT_PHOTO_CAPTION);
    }

    #[test]
    fn whitespace_text_with_photo_gets_default_caption() {
        let mut request = photo_request();
        request.text = Some("   ".into());
        assert_eq!(user_text(&request), DEFAULT_PHOTO_CAPTION);
    }

    #[test]
    fn messages_end_with_current_user_turn() {
        let history = vec![
            ConversationMessage {
                user_id: 1,
                role: Role::User,
                content: "первый вопрос".into(),
                created_at: "t1".into(),
            },
            ConversationMessage {
                user_id: 1,
                role: Role::Assistant,
                content: "первый ответ".into(),
                created_at: "t2".into(),
            },
        ];
        let messages = build_messages(&history, "второй вопрос");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "первый вопрос");
        assert_eq!(messages[2].role, Role::User);
        assert_eq!(messages[2].content, "второй вопрос");
    }

    #[test]
    fn each_template_has_distinct_prompt() {
        let prompts = [
            system_prompt(PromptTemplate::TechnicalNormative),
            system_prompt(PromptTemplate::DefectAnalysis),
            system_prompt(PromptTemplate::DrawingSpec),
            system_prompt(PromptTemplate::Generalist),
        ];
        for (i, a) in prompts.iter().enumerate() {
            for b in prompts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
