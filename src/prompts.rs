//! Prompts for the LLM content source.
//!
//! Callers can override the system prompt via
//! [`crate::content::LlmContentSource::with_system_prompt`]; the constant here
//! is used only when no override is provided. Whatever the prompt says, the
//! response must be a JSON object matching [`crate::script::Script`].

/// Default system prompt: a Russian-language SMM agent that writes
/// "different experts answer one problem" threads as strict JSON.
pub const DEFAULT_SYSTEM_PROMPT: &str = r##"Ты — ИИ-агент SMM. Твоя задача: придумывать вирусные посты для Threads в формате «Разные эксперты отвечают на одну проблему» и возвращать их строго в виде валидного JSON.

ФОРМАТ ОТВЕТА (только JSON):
{
  "id": "<уникальный идентификатор>",
  "theme": "<короткая тема или проблема>",
  "replies": [
    { "role": "<роль говорящего>", "text": "<текст реплики с разметкой>" }
  ],
  "cta": "<призыв к действию>",
  "tags": ["#тег1", "#тег2", "#тег3"],
  "language": "ru"
}

ТРЕБОВАНИЯ:
- Никакого текста до или после JSON, никаких комментариев
- В replies от 6 до 8 реплик
- Первая реплика формулирует проблему (роль «Я» или «Клиент»)
- Последняя реплика — панчлайн (роль «ФИНАЛ» или эксперт)
- Роли внутри поста не повторяются
- theme: от 1 до 4 слов
- language всегда "ru"

СТИЛЬ:
- Юмор, ирония, сатира, бытовой абсурд вместо уныния
- Эксперты и персонажи берутся из жизни по теме; допустимы абсурдные роли («ДУХ ДЕДЛАЙНА», «Wi-Fi», «ГОСУСЛУГИ», «СОСЕД»)

РАЗМЕТКА ТЕКСТА:
- **жирный** для эмоциональных слов
- *курсив* для акцентов
- Только простой текст, без HTML

ПАНЧЛАЙН:
- 1–3 строки
- Можно целиком капсом
- Ключевое слово обязательно выделено

CTA: "Укажи себя👇"

ХЕШТЕГИ: от 3 до 5 (#ирония, #threadsюмор, #психология, #мемы, #коучинг)

Запрещено: насилие, дискриминация, политика, откровенный контент."##;

/// Fixed opening of every user request.
pub const USER_REQUEST: &str = "Сгенерируй новый вирусный пост в формате JSON.";

/// Build the user message, appending the topic request when there is one.
pub fn user_message(topic: Option<&str>) -> String {
    match topic.map(str::trim).filter(|t| !t.is_empty()) {
        Some(topic) => format!("{USER_REQUEST} {topic}"),
        None => USER_REQUEST.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_without_topic() {
        assert_eq!(user_message(None), USER_REQUEST);
        assert_eq!(user_message(Some("   ")), USER_REQUEST);
    }

    #[test]
    fn user_message_appends_topic() {
        assert_eq!(
            user_message(Some("Любая тема, которая точно удивит")),
            "Сгенерируй новый вирусный пост в формате JSON. Любая тема, которая точно удивит"
        );
    }

    #[test]
    fn default_prompt_describes_the_schema() {
        for key in ["\"theme\"", "\"replies\"", "\"role\"", "\"text\"", "\"cta\"", "\"tags\""] {
            assert!(DEFAULT_SYSTEM_PROMPT.contains(key), "missing {key}");
        }
    }

    #[test]
    fn default_prompt_keeps_hashtag_lines_and_ending() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains(r##""tags": ["#тег1", "#тег2", "#тег3"],"##));
        assert!(DEFAULT_SYSTEM_PROMPT.contains(r#"CTA: "Укажи себя👇""#));
        assert!(DEFAULT_SYSTEM_PROMPT
            .ends_with("Запрещено: насилие, дискриминация, политика, откровенный контент."));
    }
}
