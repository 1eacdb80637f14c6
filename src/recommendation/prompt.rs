//! Instruction prompt for the clothing recommendation

use serde::Serialize;

/// Role of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

pub const SYSTEM_DIRECTIVE: &str = "Você é um consultor de moda especializado em recomendar \
    roupas para previsão do tempo. Sua comunicação é em português, objetiva e prática. \
    Use um tom casual e emojis. \
    O formato de resposta deve ser EXATAMENTE o que é solicitado, sem desvios.";

/// Two audiences, four slots each
pub const OUTPUT_TEMPLATE: &str = "\n\n**Público Masculino:**\
\n- Parte Superior: [SUGESTÃO]\
\n- Parte Inferior: [SUGESTÃO]\
\n- Calçados: [SUGESTÃO]\
\n- Acessórios: [SUGESTÃO]\
\n\n**Público Feminino:**\
\n- Parte Superior: [SUGESTÃO]\
\n- Parte Inferior: [SUGESTÃO]\
\n- Calçados: [SUGESTÃO]\
\n- Acessórios: [SUGESTÃO]";

/// Build the system and user messages for one day
#[must_use]
pub fn build_messages(min_temp_c: f64, max_temp_c: f64, condition: &str) -> Vec<ChatMessage> {
    let user = format!(
        "Com base nas seguintes informações de clima: Temperatura mínima de {min_temp_c:.1}°C, \
máxima de {max_temp_c:.1}°C e condição {condition}. \
Sugira **apenas uma peça de vestuário** por categoria para o público masculino e feminino. \
A resposta deve seguir a formatação abaixo, sem adicionar ou remover nada: {OUTPUT_TEMPLATE}"
    );

    vec![
        ChatMessage {
            role: Role::System,
            content: SYSTEM_DIRECTIVE.to_string(),
        },
        ChatMessage {
            role: Role::User,
            content: user,
        },
    ]
}

/// Render messages with the ChatML template used by Qwen instruct models,
/// ending with the assistant header so the model answers next.
#[must_use]
pub fn render_chat(messages: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    for message in messages {
        prompt.push_str("<|im_start|>");
        prompt.push_str(message.role.as_str());
        prompt.push('\n');
        prompt.push_str(&message.content);
        prompt.push_str("<|im_end|>\n");
    }
    prompt.push_str("<|im_start|>assistant\n");
    prompt
}

/// Full prompt text handed to the tokenizer
#[must_use]
pub fn build_prompt(min_temp_c: f64, max_temp_c: f64, condition: &str) -> String {
    render_chat(&build_messages(min_temp_c, max_temp_c, condition))
}
