#![allow(dead_code)]

use async_trait::async_trait;
use lazynote_ai_core::{AiError, AiResult, PromptTransport};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Transport that replays canned replies in order and records every prompt.
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<AiResult<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<AiResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|reply| Ok(reply.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PromptTransport for ScriptedTransport {
    async fn send_prompt(&self, prompt: &str) -> AiResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(AiError::BadResponse {
                    code: 599,
                    message: Some("script exhausted".to_string()),
                })
            })
    }
}
