//! Keyboard mapping for each experiment phase.
//!
//! Setup: type the participant id, Backspace, Enter to start.
//! Instructions: Space. Trial: F = target present, J = absent.
//! Results: R restarts, E exports. Escape quits anywhere.

use vsearch_core::SearchPhase;
use winit::keyboard::{Key, KeyCode, NamedKey, PhysicalKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Type(String),
    Backspace,
    Submit,
    Proceed,
    Respond(bool),
    Restart,
    Export,
    Quit,
}

const MAX_ID_LEN: usize = 32;

pub fn map_key(phase: SearchPhase, physical: PhysicalKey, logical: &Key) -> Option<Command> {
    if physical == PhysicalKey::Code(KeyCode::Escape) {
        return Some(Command::Quit);
    }

    match phase {
        SearchPhase::Setup => match logical {
            Key::Named(NamedKey::Enter) => Some(Command::Submit),
            Key::Named(NamedKey::Backspace) => Some(Command::Backspace),
            Key::Character(s) => {
                let typed: String = s
                    .chars()
                    .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                    .collect();
                (!typed.is_empty()).then_some(Command::Type(typed))
            }
            _ => None,
        },
        SearchPhase::Instructions => {
            (physical == PhysicalKey::Code(KeyCode::Space)).then_some(Command::Proceed)
        }
        SearchPhase::Results => match physical {
            PhysicalKey::Code(KeyCode::KeyR) => Some(Command::Restart),
            PhysicalKey::Code(KeyCode::KeyE) => Some(Command::Export),
            _ => None,
        },
        // Responses are forwarded in every running phase; the state machine
        // drops the ones that arrive outside a trial.
        SearchPhase::Fixation | SearchPhase::Trial | SearchPhase::Feedback => match physical {
            PhysicalKey::Code(KeyCode::KeyF) => Some(Command::Respond(true)),
            PhysicalKey::Code(KeyCode::KeyJ) => Some(Command::Respond(false)),
            _ => None,
        },
    }
}

/// Applies an edit command to the participant id being typed.
pub fn edit_entry(entry: &mut String, command: &Command) {
    match command {
        Command::Type(s) => {
            for c in s.chars() {
                if entry.chars().count() >= MAX_ID_LEN {
                    break;
                }
                entry.push(c);
            }
        }
        Command::Backspace => {
            entry.pop();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(k: KeyCode) -> PhysicalKey {
        PhysicalKey::Code(k)
    }

    #[test]
    fn trial_keys_map_to_responses() {
        let key = Key::Character("f".into());
        assert_eq!(
            map_key(SearchPhase::Trial, code(KeyCode::KeyF), &key),
            Some(Command::Respond(true))
        );
        let key = Key::Character("j".into());
        assert_eq!(
            map_key(SearchPhase::Feedback, code(KeyCode::KeyJ), &key),
            Some(Command::Respond(false))
        );
    }

    #[test]
    fn setup_letters_are_typed_not_responses() {
        let key = Key::Character("f".into());
        assert_eq!(
            map_key(SearchPhase::Setup, code(KeyCode::KeyF), &key),
            Some(Command::Type("f".into()))
        );
        let key = Key::Character(" ".into());
        assert_eq!(map_key(SearchPhase::Setup, code(KeyCode::Space), &key), None);
        assert_eq!(
            map_key(
                SearchPhase::Setup,
                code(KeyCode::Enter),
                &Key::Named(NamedKey::Enter)
            ),
            Some(Command::Submit)
        );
    }

    #[test]
    fn escape_quits_everywhere() {
        let key = Key::Named(NamedKey::Escape);
        for phase in [SearchPhase::Setup, SearchPhase::Trial, SearchPhase::Results] {
            assert_eq!(
                map_key(phase, code(KeyCode::Escape), &key),
                Some(Command::Quit)
            );
        }
    }

    #[test]
    fn entry_editing() {
        let mut entry = String::new();
        edit_entry(&mut entry, &Command::Type("p4".into()));
        edit_entry(&mut entry, &Command::Type("2".into()));
        edit_entry(&mut entry, &Command::Backspace);
        assert_eq!(entry, "p4");

        edit_entry(&mut entry, &Command::Type("x".repeat(100)));
        assert_eq!(entry.len(), MAX_ID_LEN);
    }
}
