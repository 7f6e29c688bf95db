use crate::conversation::Message;

use super::prompts::Language;

/// True when an interviewer turn closes the interview: its text contains the
/// closing phrase verbatim. Tool calls and their results are not consulted.
pub fn is_closing(text: &str, phrase: &str) -> bool {
    !phrase.is_empty() && text.contains(phrase)
}

#[derive(Debug, Clone, Copy)]
pub struct TerminationDetector {
    phrase: &'static str,
}

impl TerminationDetector {
    pub fn new(language: Language) -> Self {
        Self {
            phrase: language.closing_phrase(),
        }
    }

    pub fn phrase(&self) -> &'static str {
        self.phrase
    }

    pub fn is_terminal(&self, interviewer_turn: &Message) -> bool {
        is_closing(&interviewer_turn.content, self.phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{MessagePart, Role, ToolInvocationResult};
    use atypica_tools::ToolCall;
    use rstest::rstest;

    const ZH: &str = "本次访谈结束，谢谢您的参与！";

    #[rstest]
    #[case("好的，本次访谈结束，谢谢您的参与！", true)]
    #[case("本次访谈结束，谢谢您的参与！\n我会保存总结。", true)]
    #[case("本次访谈结束,谢谢您的参与!", false)]
    #[case("本次访谈结束", false)]
    #[case("", false)]
    fn exact_substring_only(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_closing(text, ZH), expected);
    }

    #[test]
    fn empty_phrase_never_matches() {
        assert!(!is_closing("anything", ""));
    }

    #[test]
    fn tool_results_are_ignored() {
        let detector = TerminationDetector::new(Language::Zh);
        let turn = Message::from_parts(
            Role::Assistant,
            vec![
                MessagePart::ToolInvocation {
                    tool_call: ToolCall {
                        name: "reasoning_thinking".to_string(),
                        parameters: serde_json::json!({}),
                        id: "c1".to_string(),
                    },
                    result: ToolInvocationResult {
                        output: ZH.to_string(),
                        is_error: false,
                    },
                },
                MessagePart::Text {
                    text: "请问您平时喝咖啡吗？".to_string(),
                },
            ],
        );
        assert!(!detector.is_terminal(&turn));
    }

    #[test]
    fn phrase_split_across_steps_still_closes() {
        let detector = TerminationDetector::new(Language::Zh);
        let turn = Message::from_parts(
            Role::Assistant,
            vec![
                MessagePart::Text {
                    text: "本次访谈结束，".to_string(),
                },
                MessagePart::ToolInvocation {
                    tool_call: ToolCall {
                        name: "save_interview_conclusion".to_string(),
                        parameters: serde_json::json!({}),
                        id: "c2".to_string(),
                    },
                    result: ToolInvocationResult {
                        output: "saved".to_string(),
                        is_error: false,
                    },
                },
                MessagePart::Text {
                    text: "谢谢您的参与！".to_string(),
                },
            ],
        );
        assert_eq!(turn.content, ZH);
        assert!(detector.is_terminal(&turn));
    }

    #[test]
    fn english_phrase_is_used_for_english() {
        let detector = TerminationDetector::new(Language::En);
        let turn = Message::assistant("Interview concluded, thank you for participating!");
        assert!(detector.is_terminal(&turn));
    }
}
