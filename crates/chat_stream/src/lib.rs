//! chat_stream - Response-streaming contract
//!
//! The model transport behind `ResponseProvider` is a black box to the
//! core: it takes the resolved conversation path as role/content pairs
//! and yields incremental chunks. A well-behaved stream ends after at
//! most one `Done`, and no chunk follows it; consumers must perform their
//! cleanup on every exit path, including error items.

use std::pin::Pin;

use async_trait::async_trait;
use chat_core::ChatMessage;
use futures::Stream;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, StreamError>;

/// One incremental piece of a streamed response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseChunk {
    /// A fragment of the visible answer text.
    Content(String),
    /// A fragment of the model's reasoning text.
    Reasoning(String),
    /// Terminal marker; no chunk follows it.
    Done,
}

pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<ResponseChunk>> + Send>>;

/// Per-request options for a streamed response.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Drop the last context message before sending it to the model.
    pub ignore_last_message: bool,
    /// Extra guidance appended to the context as a system turn.
    pub insert_guidance: Option<String>,
}

#[async_trait]
pub trait ResponseProvider: Send + Sync {
    /// Start generating a response to `messages`.
    ///
    /// Fails on transport errors before any chunk is produced; failures
    /// mid-generation surface as an `Err` item that terminates the stream.
    async fn stream_response(
        &self,
        messages: &[ChatMessage],
        options: StreamOptions,
    ) -> Result<ResponseStream>;
}

/// Apply `StreamOptions` to a context before handing it to a transport.
/// Providers that build a wire request themselves can call this instead
/// of re-implementing the option semantics.
pub fn apply_options(messages: &[ChatMessage], options: &StreamOptions) -> Vec<ChatMessage> {
    let mut context: Vec<ChatMessage> = if options.ignore_last_message {
        messages[..messages.len().saturating_sub(1)].to_vec()
    } else {
        messages.to_vec()
    };
    if let Some(guidance) = &options.insert_guidance {
        context.push(ChatMessage::new(chat_core::Role::System, guidance.clone()));
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::Role;
    use futures::{stream, StreamExt};

    #[tokio::test]
    async fn chunk_stream_terminates_after_done() {
        let mut stream: ResponseStream = Box::pin(stream::iter(vec![
            Ok(ResponseChunk::Content("hel".to_string())),
            Ok(ResponseChunk::Content("lo".to_string())),
            Ok(ResponseChunk::Done),
        ]));

        let mut text = String::new();
        let mut finished = 0;
        while let Some(item) = stream.next().await {
            match item.unwrap() {
                ResponseChunk::Content(t) => text.push_str(&t),
                ResponseChunk::Reasoning(_) => {}
                ResponseChunk::Done => finished += 1,
            }
        }
        assert_eq!(text, "hello");
        assert_eq!(finished, 1);
    }

    #[test]
    fn apply_options_can_drop_last_and_insert_guidance() {
        let messages = vec![
            ChatMessage::new(Role::User, "question"),
            ChatMessage::new(Role::Assistant, "stale draft"),
        ];

        let context = apply_options(
            &messages,
            &StreamOptions {
                ignore_last_message: true,
                insert_guidance: Some("answer briefly".to_string()),
            },
        );
        assert_eq!(context.len(), 2);
        assert_eq!(context[0].content, "question");
        assert_eq!(context[1].role, Role::System);

        let untouched = apply_options(&messages, &StreamOptions::default());
        assert_eq!(untouched, messages);
    }
}
