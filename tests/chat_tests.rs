// Tests for the text-chat conversation

mod common;

use common::FakeGenerator;
use voice_demo::chat::transcript;
use voice_demo::persona;
use voice_demo::{ChatTurn, Conversation, DemoError, Role};

const FALLBACK: &str = "Sorry, I can't reply right now.";

#[tokio::test]
async fn test_reply_is_appended_after_user_turn() {
    let generator = FakeGenerator::replying("We answer calls around the clock.");
    let mut chat = Conversation::new(generator.clone(), persona::find("assistant"), FALLBACK.to_string());
    let seeded = chat.turns().len();

    let reply = chat.submit("Do you answer at night?").await.unwrap();

    assert_eq!(reply, ChatTurn::agent("We answer calls around the clock."));
    let turns = &chat.turns()[seeded..];
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0], ChatTurn::user("Do you answer at night?"));
    assert_eq!(turns[1].role, Role::Agent);
}

#[tokio::test]
async fn test_failed_request_keeps_user_turn_and_adds_one_fallback() {
    let generator = FakeGenerator::failing(DemoError::Request("HTTP 401".to_string()));
    let mut chat = Conversation::new(generator.clone(), persona::find("assistant"), FALLBACK.to_string());
    let before = chat.turns().to_vec();

    let reply = chat.submit("Hello?").await.unwrap();

    assert_eq!(reply.text, FALLBACK);
    assert_eq!(chat.turns().len(), before.len() + 2);
    assert_eq!(&chat.turns()[..before.len()], before.as_slice());
    assert_eq!(chat.turns()[before.len()], ChatTurn::user("Hello?"));
    assert_eq!(chat.turns()[before.len() + 1], ChatTurn::agent(FALLBACK));
    // Not retried
    assert_eq!(generator.prompts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_each_request_carries_full_history() {
    let generator = FakeGenerator::replying("Sure.");
    let mut chat = Conversation::new(generator.clone(), persona::find("assistant"), FALLBACK.to_string());

    chat.submit("First question").await;
    chat.submit("Second question").await;

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    let (instruction, last) = &prompts[1];
    assert_eq!(instruction, persona::find("assistant").system_instruction);
    assert!(last.contains("User: First question\n"));
    assert!(last.contains("Agent: Sure.\n"));
    assert!(last.ends_with("User: Second question\n"));
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let generator = FakeGenerator::replying("unused");
    let mut chat = Conversation::new(generator.clone(), persona::find("assistant"), FALLBACK.to_string());
    let before = chat.turns().len();

    assert!(chat.submit("   ").await.is_none());
    assert_eq!(chat.turns().len(), before);
    assert!(generator.prompts.lock().unwrap().is_empty());
}

#[test]
fn test_greeting_seeds_history() {
    let persona = persona::find("assistant");
    let chat = Conversation::new(FakeGenerator::replying("x"), persona, FALLBACK.to_string());

    let greeting = persona.greeting.expect("assistant persona greets");
    assert_eq!(chat.turns(), &[ChatTurn::agent(greeting)]);
}

#[test]
fn test_transcript_labels_roles() {
    let text = transcript(&[ChatTurn::agent("Hi"), ChatTurn::user("Hello")]);
    assert_eq!(text, "Agent: Hi\nUser: Hello\n");
}

#[tokio::test]
async fn test_turn_can_complete_outside_the_conversation() {
    let generator = FakeGenerator::replying("Done.");
    let mut chat = Conversation::new(generator.clone(), persona::find("assistant"), FALLBACK.to_string());
    let seeded = chat.turns().len();

    let pending = chat.begin_turn("Book me in").unwrap();
    assert_eq!(chat.turns().last(), Some(&ChatTurn::user("Book me in")));

    let outcome = pending.send().await;
    let reply = chat.finish_turn(outcome);

    assert_eq!(reply, ChatTurn::agent("Done."));
    assert_eq!(chat.turns().len(), seeded + 2);
    assert!(generator.prompts.lock().unwrap()[0].1.ends_with("User: Book me in\n"));
}

#[test]
fn test_failed_outcome_finishes_with_fallback() {
    let mut chat = Conversation::new(FakeGenerator::replying("x"), persona::find("assistant"), FALLBACK.to_string());

    assert!(chat.begin_turn("").is_none());
    let _pending = chat.begin_turn("Hi").unwrap();
    let reply = chat.finish_turn(Err(DemoError::Request("timeout".to_string())));

    assert_eq!(reply, ChatTurn::agent(FALLBACK));
}
