//! messages_list and messages_post tools.
//!
//! Both answer with the contact endpoints' `{success, ...}` envelope.
//! A rejected post is reported as an error result carrying the envelope.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use stash_core::{Envelope, Error, Message, MessageRepository, NewMessage};

use super::json_result;

pub async fn list_impl(messages: &dyn MessageRepository) -> Result<CallToolResult, McpError> {
    let all = messages.list_messages().await?;
    json_result(&Envelope::ok(all))
}

pub async fn post_impl(messages: &dyn MessageRepository, params: NewMessage) -> Result<CallToolResult, McpError> {
    match messages.append_message(params).await {
        Ok(message) => json_result(&Envelope::saved(message)),
        Err(Error::InvalidInput(reason)) => {
            let json = serde_json::to_string_pretty(&Envelope::<Message>::failed(reason))
                .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
            Ok(CallToolResult::error(vec![Content::text(json)]))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::text_of;
    use stash_core::InMemoryMessages;

    fn new_message(name: &str) -> NewMessage {
        NewMessage { name: name.into(), email: format!("{name}@example.com"), message: "Hi!".into() }
    }

    #[tokio::test]
    async fn test_list_empty() {
        let repo = InMemoryMessages::new();
        let result = list_impl(&repo).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_post_then_list() {
        let repo = InMemoryMessages::new();
        let result = post_impl(&repo, new_message("ada")).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "Message saved successfully");
        assert_eq!(value["data"]["name"], "ada");

        post_impl(&repo, new_message("grace")).await.unwrap();
        let listed: Envelope<Vec<Message>> =
            serde_json::from_str(&text_of(&list_impl(&repo).await.unwrap())).unwrap();
        let names: Vec<_> = listed.data.unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["ada", "grace"]);
    }

    #[tokio::test]
    async fn test_post_missing_fields() {
        let repo = InMemoryMessages::new();
        let params = NewMessage { message: String::new(), ..new_message("ada") };

        let result = post_impl(&repo, params).await.unwrap();
        assert_eq!(result.is_error, Some(true));
        let value: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Missing required fields");
        assert!(repo.list_messages().await.unwrap().is_empty());
    }
}
