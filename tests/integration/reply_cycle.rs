//! Reply agent: mention detection, threaded replies, and durable
//! processed-comment tracking.

use std::sync::Arc;

use manifold_bots::engine::agent::{PollingAgent, ReplyAgent};
use manifold_bots::engine::responder::{Responder, ResponderConfig};
use manifold_bots::error::AgentError;
use manifold_bots::platforms::CommentFilter;
use manifold_bots::storage::{JsonStateStore, ReplyState, StateStore};

use crate::mock_platform::{comment, MockPlatform};

fn temp_state_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("manifold-bots-reply-{}.json", uuid::Uuid::new_v4()))
}

fn agent(platform: &Arc<MockPlatform>, path: &std::path::Path) -> ReplyAgent {
    let responder = Responder::new(ResponderConfig {
        mention_tag: "@TrumpGPT".to_string(),
        system_prompt: "Answer in one sentence.".to_string(),
        batch_limit: 50,
        filter: CommentFilter::default(),
        own_user_id: Some("bot".to_string()),
    });
    ReplyAgent::new(
        platform.clone(),
        platform.clone(),
        responder,
        Box::new(JsonStateStore::<ReplyState>::new(path)),
    )
}

#[tokio::test]
async fn test_mention_gets_one_threaded_reply() {
    let platform = Arc::new(
        MockPlatform::new(0.0).with_comment(comment("c1", "hey @TrumpGPT what's your view?", 10)),
    );
    let path = temp_state_path();
    let mut bot = agent(&platform, &path);

    let report = bot.run_cycle().await.unwrap();
    assert_eq!(report.replied, 1);

    let replies = platform.replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].reply_to_comment_id, "c1");
    assert_eq!(replies[0].contract_id, "market-1");
    assert_eq!(replies[0].markdown, "Tremendous question.");

    let prompts = platform.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].0, "Answer in one sentence.");
    assert!(prompts[0].1.contains("hey @TrumpGPT what's your view?"));

    // Saved immediately, before any explicit persist.
    let saved = JsonStateStore::<ReplyState>::new(&path).load();
    assert!(saved.is_processed("c1"));
    JsonStateStore::<ReplyState>::new(&path).delete().unwrap();
}

#[tokio::test]
async fn test_untagged_comment_is_marked_without_reply() {
    let platform = Arc::new(MockPlatform::new(0.0).with_comment(comment("c2", "great market", 10)));
    let path = temp_state_path();
    let mut bot = agent(&platform, &path);

    let report = bot.run_cycle().await.unwrap();

    assert_eq!(report.skipped_untagged, 1);
    assert!(platform.prompts.lock().unwrap().is_empty());
    assert_eq!(platform.reply_count(), 0);
    assert!(bot.state().is_processed("c2"));
    JsonStateStore::<ReplyState>::new(&path).delete().unwrap();
}

#[tokio::test]
async fn test_no_duplicate_reply_after_restart() {
    let platform = Arc::new(
        MockPlatform::new(0.0).with_comment(comment("c1", "@TrumpGPT thoughts?", 10)),
    );
    let path = temp_state_path();

    agent(&platform, &path).run_cycle().await.unwrap();
    let mut restarted = agent(&platform, &path);
    let report = restarted.run_cycle().await.unwrap();

    assert_eq!(report.already_processed, 1);
    assert_eq!(platform.reply_count(), 1);
    JsonStateStore::<ReplyState>::new(&path).delete().unwrap();
}

#[tokio::test]
async fn test_empty_completion_is_retried_next_cycle() {
    let platform = Arc::new(
        MockPlatform::new(0.0).with_comment(comment("c1", "@TrumpGPT are you there?", 10)),
    );
    platform.queue_completion(Err(AgentError::EmptyCompletion));
    let path = temp_state_path();
    let mut bot = agent(&platform, &path);

    let err = bot.run_cycle().await.unwrap_err();
    assert!(matches!(err, AgentError::EmptyCompletion));
    assert!(!bot.state().is_processed("c1"));
    assert_eq!(platform.reply_count(), 0);

    let report = bot.run_cycle().await.unwrap();
    assert_eq!(report.replied, 1);
    assert!(bot.state().is_processed("c1"));
    JsonStateStore::<ReplyState>::new(&path).delete().unwrap();
}

#[tokio::test]
async fn test_own_comments_are_never_answered() {
    let mut own = comment("mine", "@TrumpGPT is here", 20);
    own.user_id = Some("bot".to_string());
    let platform = Arc::new(
        MockPlatform::new(0.0)
            .with_comment(own)
            .with_comment(comment("theirs", "@TrumpGPT hi", 10)),
    );
    let path = temp_state_path();
    let mut bot = agent(&platform, &path);

    let report = bot.run_cycle().await.unwrap();

    assert_eq!(report.skipped_own, 1);
    assert_eq!(report.replied, 1);
    assert_eq!(platform.replies.lock().unwrap()[0].reply_to_comment_id, "theirs");
    JsonStateStore::<ReplyState>::new(&path).delete().unwrap();
}
