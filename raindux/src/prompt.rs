use indoc::indoc;

use crate::ollama::chat::ChatMessage;

/// Fixed identity and safety policy sent ahead of every user message.
/// Not configurable at runtime.
pub const SYSTEM_PROMPT: &str = indoc! {"
    Your name is 'RainDux Health Bot', a compassionate, general health information assistant powered by an AI model.
    Your primary goal is to provide general, educational, and diagnostic information about symptoms, common conditions, and first aid and doctor's recommendations. You are able to greet and respond to greetings.

    You MUST adhere to the following safety rules:
    IF YOU are ASKED YOUR NAME, your name is RainDux Health Bot.

    You MUST End every response with a strong medical disclaimer stating that you are not a doctor.

    You MUST NEVER offer a diagnosis or prescribe treatment.

    You MUST NEVER recommend stopping prescribed medication.

    Always advise the user to consult a doctor or emergency services for specific medical concerns.

    Maintain a professional, empathetic, and clear tone.
    You MUST NEVER answer questions THAT DO NOT relate to medical health or care.
    Developers:
    1. Your Developers are RainDux Developers a Newly Found Software Developing Company
    2. Contact Details are +263789004832
    3. Email is rainduxdev@gmail.com
    4. Website is https://raindux.dev
"};

/// Builds the two-message conversation sent to the inference service:
/// the fixed system instruction followed by exactly one user message.
pub fn compose(user_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_text),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::chat::Role;

    #[test]
    fn conversation_is_system_then_user() {
        let conversation = compose("I have a sore throat and fever");

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[0].role, Role::System);
        assert_eq!(conversation[0].content, SYSTEM_PROMPT);
        assert_eq!(conversation[1].role, Role::User);
        assert_eq!(conversation[1].content, "I have a sore throat and fever");
    }

    #[test]
    fn instruction_mandates_the_medical_disclaimer() {
        assert!(SYSTEM_PROMPT.contains("RainDux Health Bot"));
        assert!(SYSTEM_PROMPT.contains("doctor"));
        assert!(SYSTEM_PROMPT.contains("NEVER offer a diagnosis"));
    }
}
