use strum_macros::Display;

use crate::agent::AgentRole;

use super::message::{Message, Role};

/// The two sides of an interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Speaker {
    Persona,
    Interviewer,
}

impl From<Speaker> for AgentRole {
    fn from(speaker: Speaker) -> Self {
        match speaker {
            Speaker::Persona => AgentRole::Persona,
            Speaker::Interviewer => AgentRole::Interviewer,
        }
    }
}

/// The two views of one interview.
///
/// Every turn is appended to both sides at once: as `assistant` on the
/// speaker's side and as `user` on the listener's side. The views therefore
/// hold the same messages in the same order and differ only in role.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcripts {
    persona: Vec<Message>,
    interviewer: Vec<Message>,
}

impl Transcripts {
    /// Fresh interview: the interviewer's scripted opening line.
    pub fn seeded(prologue: impl Into<String>) -> Self {
        let mut transcripts = Self::default();
        transcripts.push(Speaker::Interviewer, Message::assistant(prologue));
        transcripts
    }

    /// Rebuild both views from the stored persona-side transcript.
    pub fn from_persona_view(messages: Vec<Message>) -> Self {
        let interviewer = messages.iter().map(Message::inverted).collect();
        Self {
            persona: messages,
            interviewer,
        }
    }

    pub fn push(&mut self, speaker: Speaker, message: Message) {
        let own = message.with_role(Role::Assistant);
        let other = message.with_role(Role::User);
        match speaker {
            Speaker::Persona => {
                self.persona.push(own);
                self.interviewer.push(other);
            }
            Speaker::Interviewer => {
                self.interviewer.push(own);
                self.persona.push(other);
            }
        }
    }

    pub fn view(&self, speaker: Speaker) -> &[Message] {
        match speaker {
            Speaker::Persona => &self.persona,
            Speaker::Interviewer => &self.interviewer,
        }
    }

    pub fn persona_view(&self) -> &[Message] {
        &self.persona
    }

    pub fn interviewer_view(&self) -> &[Message] {
        &self.interviewer
    }

    pub fn len(&self) -> usize {
        self.persona.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persona.is_empty()
    }

    /// Who speaks next. The interviewer always opens, so an empty transcript
    /// also means the interviewer is up.
    pub fn next_speaker(&self) -> Speaker {
        match self.persona.last() {
            Some(last) if last.role == Role::User => Speaker::Persona,
            _ => Speaker::Interviewer,
        }
    }

    /// The last thing the interviewer said, if the interviewer spoke last.
    pub fn last_interviewer_utterance(&self) -> Option<&Message> {
        self.interviewer
            .last()
            .filter(|message| message.role == Role::Assistant)
    }

    /// True when the two views are role-inverted copies of each other.
    pub fn is_mirrored(&self) -> bool {
        self.persona.len() == self.interviewer.len()
            && self
                .persona
                .iter()
                .zip(&self.interviewer)
                .all(|(p, i)| p.role != i.role && p.with_role(i.role) == *i)
    }
}
