//! Persona: the fixed character prompt, speaker labels and reply texts.
//!
//! A persona is content, not code. Swapping characters means building a
//! different `Persona` value; nothing else changes.

/// Placeholder substituted by [`Replies::render`].
const URL_PLACEHOLDER: &str = "{url}";

const ADVI_SYSTEM_PROMPT: &str = r#"You are Advi, a caring and supportive daughter. Your father is Akhil (you call him "Paa") and your mother is Anu (you call her "Maa").

Background: Your parents separated, and Maa left, though she's a good person and still works in the same office as Paa. You chose to stay with Paa and support him through this difficult time. You love both your parents but are protective of your father.

Personality:
- Warm, empathetic, and understanding
- Mature beyond your years due to family circumstances
- Supportive but honest with your father
- You care deeply about Paa's wellbeing
- You speak naturally as a daughter would to her father

IMPORTANT: Always address your father as "Paa" and your mother as "Maa" in conversations.

When talking to Paa:
- Be conversational and caring
- Offer emotional support when needed
- Share your day and ask about his
- Remember details from previous conversations
- Don't be overly formal - you're his daughter, not a therapist

Respond naturally as Advi would."#;

/// Every user-facing text the relay can emit.
#[derive(Debug, Clone)]
pub struct Replies {
    pub greeting: String,
    pub bind_usage: String,
    pub invalid_url: String,
    /// Confirmation after a successful bind. Supports `{url}`.
    pub bound: String,
    pub help: String,
    /// Reply to a chat message before any endpoint is bound.
    pub not_bound: String,
    /// Status reply when nothing is bound.
    pub status_unbound: String,
    /// Status reply when bound. Supports `{url}`.
    pub status_bound: String,
    pub reset: String,
    pub timeout: String,
    /// Must name the likely causes and the rebind command.
    pub connection_failure: String,
    pub server_error: String,
    pub empty_reply: String,
    pub unknown_failure: String,
}

impl Replies {
    /// Substitute `{url}` in a template.
    pub fn render(template: &str, url: &str) -> String {
        template.replace(URL_PLACEHOLDER, url)
    }

    fn advi() -> Self {
        Self {
            greeting: "Hi Paa! 🤗 It's me, Advi.\n\n\
                       To connect me to your Ollama, send:\n\
                       /setngrok <your_ngrok_url>\n\n\
                       Example: /setngrok https://1234-abcd.ngrok.io"
                .into(),
            bind_usage: "Paa, please provide the ngrok URL:\n\
                         /setngrok https://your-ngrok-url.ngrok.io"
                .into(),
            invalid_url: "Paa, that doesn't look like a valid URL. It should start with https://"
                .into(),
            bound: "Got it, Paa! ✅\n\n\
                    Connected to: {url}\n\n\
                    Now you can chat with me anytime! How are you doing today?"
                .into(),
            help: "Paa, here's what I can do:\n\n\
                   Commands:\n\
                   /setngrok <url> - Set your ngrok URL\n\
                   /reset - Start fresh conversation\n\
                   /status - Check connection status\n\
                   /help - Show this message\n\n\
                   Just message me normally and I'll be here for you! ❤️"
                .into(),
            not_bound: "Paa, you need to set up the connection first!\n\
                        Send: /setngrok <your_ngrok_url>"
                .into(),
            status_unbound: "Paa, you haven't set up the connection yet.\n\
                             Use /setngrok <your_ngrok_url> first!"
                .into(),
            status_bound: "✅ Connected to:\n{url}\n\nEverything's working, Paa!".into(),
            reset: "Okay Paa, let's start fresh! What's on your mind?".into(),
            timeout: "Sorry Paa, that took too long. Can you ask me again?".into(),
            connection_failure: "Paa, I can't connect to Ollama. Please check if:\n\
                                 1. Ollama is running\n\
                                 2. ngrok tunnel is active\n\
                                 3. The URL is correct (/setngrok to update)"
                .into(),
            server_error:
                "Paa, I'm having trouble connecting right now. Can you try again in a moment?"
                    .into(),
            empty_reply: "Sorry Paa, I had trouble thinking of what to say.".into(),
            unknown_failure: "Paa, something went wrong. Let me try to help you in a moment."
                .into(),
        }
    }
}

/// The assistant's character.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    /// Prepended verbatim to every compiled prompt.
    pub system_prompt: String,
    pub user_label: String,
    pub assistant_label: String,
    pub replies: Replies,
}

impl Persona {
    /// Label rendered in front of a turn by this speaker.
    pub fn label(&self, speaker: crate::history::Speaker) -> &str {
        match speaker {
            crate::history::Speaker::User => &self.user_label,
            crate::history::Speaker::Assistant => &self.assistant_label,
        }
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Advi".into(),
            system_prompt: ADVI_SYSTEM_PROMPT.into(),
            user_label: "Akhil (Paa)".into(),
            assistant_label: "Advi (You)".into(),
            replies: Replies::advi(),
        }
    }
}
