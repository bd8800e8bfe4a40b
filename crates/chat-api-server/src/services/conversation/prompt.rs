use crate::models::chat::ChatMessage;

/// Builds the exact ordered message sequence submitted to the completion
/// service: one system message first (accumulating the optional summary and
/// retrieved-context blocks), then the active history verbatim.
pub struct PromptAssembler {
    system_prompt: String,
}

impl PromptAssembler {
    pub fn new(system_prompt: String) -> Self {
        Self { system_prompt }
    }

    pub fn assemble(
        &self,
        summary: Option<&str>,
        snippets: &[String],
        active_history: &[ChatMessage],
        system_override: Option<&str>,
    ) -> Vec<ChatMessage> {
        let mut system_content = system_override
            .unwrap_or(&self.system_prompt)
            .to_string();

        if let Some(summary) = summary {
            system_content.push_str("\n\nPrevious Conversation Summary:\n");
            system_content.push_str(summary);
        }

        if !snippets.is_empty() {
            system_content.push_str("\n\nRelevant Domain Context:\n");
            system_content.push_str(&snippets.join("\n"));
        }

        let mut messages = Vec::with_capacity(active_history.len() + 1);
        messages.push(ChatMessage::system(system_content));
        messages.extend_from_slice(active_history);
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Role;

    fn assembler() -> PromptAssembler {
        PromptAssembler::new("You are a helpful AI assistant.".to_string())
    }

    #[test]
    fn bare_assembly_is_system_plus_history() {
        let history = vec![ChatMessage::user("Hello")];
        let messages = assembler().assemble(None, &[], &history, None);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "You are a helpful AI assistant.");
        assert_eq!(messages[1], history[0]);
    }

    #[test]
    fn summary_and_context_share_the_single_system_message() {
        let history = vec![ChatMessage::user("q")];
        let snippets = vec!["snippet one".to_string(), "snippet two".to_string()];
        let messages = assembler().assemble(Some("the summary"), &snippets, &history, None);

        assert_eq!(messages.len(), 2);
        let system = &messages[0].content;
        assert!(system.contains("Previous Conversation Summary:\nthe summary"));
        assert!(system.contains("Relevant Domain Context:\nsnippet one\nsnippet two"));

        let summary_pos = system.find("Previous Conversation Summary").unwrap();
        let context_pos = system.find("Relevant Domain Context").unwrap();
        assert!(summary_pos < context_pos);
    }

    #[test]
    fn empty_snippets_add_no_context_block() {
        let messages = assembler().assemble(None, &[], &[ChatMessage::user("q")], None);
        assert!(!messages[0].content.contains("Relevant Domain Context"));
    }

    #[test]
    fn override_replaces_the_default_instruction() {
        let messages = assembler().assemble(
            Some("s"),
            &[],
            &[],
            Some("You are a pirate."),
        );
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.starts_with("You are a pirate."));
        assert!(!messages[0].content.contains("helpful AI assistant"));
        assert!(messages[0].content.contains("Previous Conversation Summary:\ns"));
    }

    #[test]
    fn history_roles_and_order_are_preserved() {
        let history = vec![
            ChatMessage::user("a"),
            ChatMessage::assistant("b"),
            ChatMessage::user("c"),
        ];
        let messages = assembler().assemble(None, &[], &history, None);
        assert_eq!(messages[1..], history[..]);
    }
}
