//! Prompt compilation.

use crate::history::{Speaker, TurnRecord};
use crate::persona::Persona;
use std::fmt::Write;

/// Render persona, context window and the new user input into one prompt.
///
/// Layout, oldest turn first:
///
/// ```text
/// <system prompt>
///
/// <label>: <text>
///
/// <label>: <text>
///
/// <user label>: <new input>
/// <assistant label>:
/// ```
///
/// The trailing assistant label is the cue the model completes. `window`
/// never contains `new_text`; it is recorded only after the reply exists.
pub fn compile(persona: &Persona, window: &[TurnRecord], new_text: &str) -> String {
    let mut prompt = String::with_capacity(
        persona.system_prompt.len()
            + window.iter().map(|t| t.text.len() + 32).sum::<usize>()
            + new_text.len()
            + 64,
    );

    prompt.push_str(&persona.system_prompt);
    prompt.push_str("\n\n");

    for turn in window {
        let _ = write!(prompt, "{}: {}\n\n", persona.label(turn.speaker), turn.text);
    }

    let _ = write!(
        prompt,
        "{}: {}\n{}: ",
        persona.label(Speaker::User),
        new_text,
        persona.label(Speaker::Assistant)
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_persona() -> Persona {
        Persona {
            system_prompt: "You are Tester.".into(),
            user_label: "User".into(),
            assistant_label: "Bot".into(),
            ..Persona::default()
        }
    }

    #[test]
    fn compile_empty_window() {
        let prompt = compile(&tiny_persona(), &[], "hello");
        assert_eq!(prompt, "You are Tester.\n\nUser: hello\nBot: ");
    }

    #[test]
    fn compile_with_window_oldest_first() {
        let window = vec![
            TurnRecord::user("hi"),
            TurnRecord::assistant("hey there"),
        ];
        let prompt = compile(&tiny_persona(), &window, "how are you?");
        assert_eq!(
            prompt,
            "You are Tester.\n\nUser: hi\n\nBot: hey there\n\nUser: how are you?\nBot: "
        );
    }

    #[test]
    fn compile_is_deterministic() {
        let window = vec![TurnRecord::user("a"), TurnRecord::assistant("b")];
        let persona = Persona::default();
        assert_eq!(
            compile(&persona, &window, "c"),
            compile(&persona, &window, "c")
        );
    }

    #[test]
    fn persona_appears_exactly_once() {
        let persona = Persona::default();
        let window = vec![TurnRecord::user("x"); 6];
        let prompt = compile(&persona, &window, "y");
        assert!(prompt.starts_with(&persona.system_prompt));
        assert_eq!(prompt.matches(persona.system_prompt.as_str()).count(), 1);
    }

    #[test]
    fn default_persona_labels() {
        let prompt = compile(&Persona::default(), &[], "hello");
        assert!(prompt.ends_with("\n\nAkhil (Paa): hello\nAdvi (You): "));
    }
}
