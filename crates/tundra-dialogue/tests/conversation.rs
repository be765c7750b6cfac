//! Whole exchanges driven against a scripted backend and an event log.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tundra_dialogue::{
    ConversationRoster, ConversationTurn, DialogueConfig, DialogueContext, ExchangeOutcome,
    LlmBackend, Orchestrator, ScriptedBackend,
};
use tundra_types::{AgentId, Occupant, Outfit, Position, RoomEventKind, RoomId, frames};
use tundra_world::{Bot, EventLog};

struct Stage {
    log: Arc<EventLog>,
    backend: Arc<ScriptedBackend>,
    orchestrator: Orchestrator,
}

fn stage_with(config: DialogueConfig, backend: ScriptedBackend) -> Stage {
    let log = Arc::new(EventLog::new());
    let backend = Arc::new(backend);
    let ctx = DialogueContext::new(
        config,
        LlmBackend::Scripted(Arc::clone(&backend)),
        Arc::clone(&log) as _,
    )
    .unwrap();
    Stage {
        log,
        backend,
        orchestrator: Orchestrator::new(Arc::new(ctx)),
    }
}

fn stage(replies: &[&str]) -> Stage {
    stage_with(
        DialogueConfig::default(),
        ScriptedBackend::new(replies.iter().map(|r| (*r).to_owned())),
    )
}

fn player_at(x: i32) -> Occupant {
    Occupant {
        id: AgentId::new(),
        nickname: "Rookie".to_owned(),
        room: RoomId(100),
        position: Position::new(x, 100),
        is_bot: false,
    }
}

fn bot_at(name: &str, room: u32, x: i32) -> Arc<Bot> {
    let bot = Arc::new(Bot::new(AgentId::new(), name, Outfit::empty()));
    bot.update(|s| {
        s.room = Some(RoomId(room));
        s.position = Position::new(x, 100);
    });
    bot
}

/// Cadence 5 px from the player, Gary 50 px, Franky 3 px.
fn trio() -> Vec<Arc<Bot>> {
    vec![
        bot_at("Cadence", 100, 105),
        bot_at("Gary", 100, 150),
        bot_at("Franky", 100, 103),
    ]
}

fn models(stage: &Stage) -> Vec<String> {
    stage.backend.requests().into_iter().map(|r| r.model).collect()
}

#[tokio::test(start_paused = true)]
async fn time_query_skips_generation() {
    let stage = stage(&["never used"]);
    let bots = trio();
    let roster = ConversationRoster::enlist(bots.clone());

    let outcome = stage
        .orchestrator
        .converse(
            ConversationTurn::opening("Hey, what's the time?", player_at(100), true),
            roster,
        )
        .await;

    assert!(matches!(outcome, ExchangeOutcome::TimeReported { .. }));
    let lines = stage.log.chat_lines();
    assert_eq!(lines.len(), 1);
    let line = lines.first().unwrap();
    assert!(line.starts_with("It's currently "));
    assert!(line.ends_with("am") || line.ends_with("pm"));
    assert!(stage.backend.requests().is_empty());
    assert!(bots.iter().all(|b| !b.is_talking()));
}

#[tokio::test(start_paused = true)]
async fn nearest_bot_answers_and_follow_ups_stop_at_bound() {
    let stage = stage(&[
        "The ice is thick today.",
        "Thick enough for skating.",
        "Skating sounds nice.",
        "Then let us go skating.",
        "Race you to the rink.",
        "This reply is never requested.",
    ]);
    let bots = trio();
    let roster = ConversationRoster::enlist(bots.clone());

    let outcome = stage
        .orchestrator
        .converse_with_bound(
            ConversationTurn::opening("anyone around?", player_at(100), true),
            roster,
            4,
        )
        .await;

    // One opening reply plus four follow-ups.
    assert_eq!(outcome, ExchangeOutcome::Completed { replies: 5 });
    assert_eq!(
        models(&stage),
        vec!["Franky", "Cadence", "Franky", "Cadence", "Franky"]
    );
    assert_eq!(stage.log.chat_lines().len(), 5);
    assert!(bots.iter().all(|b| !b.is_talking()));
}

#[tokio::test(start_paused = true)]
async fn drawn_bound_limits_follow_ups() {
    let replies: Vec<String> = (0..20).map(|i| format!("Line number {i}.")).collect();
    let stage = stage_with(DialogueConfig::default(), ScriptedBackend::new(replies));

    for _ in 0..5 {
        let outcome = stage
            .orchestrator
            .converse(
                ConversationTurn::opening("anyone around?", player_at(100), false),
                ConversationRoster::enlist(trio()),
            )
            .await;
        let ExchangeOutcome::Completed { replies } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert!((3..=5).contains(&replies), "{replies} replies");
    }
}

#[tokio::test(start_paused = true)]
async fn named_bot_answers_first() {
    let stage = stage(&["Rockets push gas out the back."]);
    let outcome = stage
        .orchestrator
        .converse_with_bound(
            ConversationTurn::opening("Gary, how do rockets work?", player_at(100), true),
            ConversationRoster::enlist(trio()),
            0,
        )
        .await;

    assert_eq!(outcome, ExchangeOutcome::Completed { replies: 1 });
    assert_eq!(models(&stage), vec!["Gary"]);
    let prompt = stage.backend.requests().remove(0).prompt;
    assert!(prompt.contains("Gary the Gadget Guy"));
    assert!(prompt.ends_with("Gary, how do rockets work?"));
}

#[tokio::test(start_paused = true)]
async fn flagged_message_is_dropped() {
    let stage = stage(&["never used"]);
    let bots = trio();
    let outcome = stage
        .orchestrator
        .converse(
            ConversationTurn::opening("you are a b1tch", player_at(100), true),
            ConversationRoster::enlist(bots.clone()),
        )
        .await;

    assert_eq!(outcome, ExchangeOutcome::Rejected);
    assert!(stage.log.events().is_empty());
    assert!(stage.backend.requests().is_empty());
    assert!(bots.iter().all(|b| !b.is_talking()));
}

#[tokio::test(start_paused = true)]
async fn nobody_in_the_room_means_no_exchange() {
    let stage = stage(&["never used"]);
    let outcome = stage
        .orchestrator
        .converse(
            ConversationTurn::opening("hello?", player_at(100), true),
            ConversationRoster::enlist(vec![bot_at("Gary", 200, 100)]),
        )
        .await;
    assert_eq!(outcome, ExchangeOutcome::NoRespondent);
}

#[tokio::test(start_paused = true)]
async fn failed_generation_passes_the_question_on() {
    let stage = stage(&[]);
    stage.backend.push_failure("connection refused");
    stage.backend.push_reply("Sure thing!");

    let outcome = stage
        .orchestrator
        .converse_with_bound(
            ConversationTurn::opening("how do rockets work?", player_at(100), true),
            ConversationRoster::enlist(trio()),
            1,
        )
        .await;

    assert_eq!(outcome, ExchangeOutcome::Completed { replies: 2 });
    let requests = stage.backend.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests.get(1).unwrap().prompt.ends_with("how do rockets work?"));
    assert_eq!(stage.log.chat_lines(), vec!["Sure thing!".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out_to_silence() {
    let config = DialogueConfig {
        generation_timeout_ms: 10_000,
        ..DialogueConfig::default()
    };
    let backend = ScriptedBackend::with_latency(["Too late.".to_owned()], Duration::from_secs(30));
    let stage = stage_with(config, backend);

    let outcome = stage
        .orchestrator
        .converse_with_bound(
            ConversationTurn::opening("anyone?", player_at(100), true),
            ConversationRoster::enlist(trio()),
            0,
        )
        .await;

    assert_eq!(outcome, ExchangeOutcome::Completed { replies: 1 });
    assert!(stage.log.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn greeting_waves_and_emotion_follows_the_lines() {
    let stage = stage(&["Hello there! I am so happy to see you, friend."]);
    let cadence = bot_at("Cadence", 100, 105);

    stage
        .orchestrator
        .converse_with_bound(
            ConversationTurn::opening("hi Cadence", player_at(100), true),
            ConversationRoster::enlist(vec![Arc::clone(&cadence)]),
            0,
        )
        .await;

    assert_eq!(
        stage.log.kinds_for(cadence.id()),
        vec![
            RoomEventKind::Chat {
                text: "Hello there! I am so happy to see you, friend.".to_owned()
            },
            RoomEventKind::Frame { frame: frames::WAVE },
            RoomEventKind::Emote { emote: 1 },
        ]
    );
    assert_eq!(cadence.snapshot().frame, frames::WAVE);
}

#[tokio::test(start_paused = true)]
async fn long_reply_is_spoken_in_chunks() {
    let reply = "The island has a lighthouse, a ski village, a pizza parlor, and a \
                 coffee shop. Most penguins start their day at the coffee shop, then \
                 head up to the mountain for sledding races with their friends.";
    let stage = stage(&[reply]);
    stage
        .orchestrator
        .converse_with_bound(
            ConversationTurn::opening("what is there to do?", player_at(100), true),
            ConversationRoster::enlist(trio()),
            0,
        )
        .await;

    let lines = stage.log.chat_lines();
    assert!(lines.len() >= 2);
    assert!(lines.iter().all(|l| l.chars().count() <= 95));
    assert_eq!(lines.concat().replace(' ', ""), reply.replace(' ', ""));
}

#[tokio::test(start_paused = true)]
async fn rehearsal_emits_nothing() {
    let stage = stage(&["Hello! Happy to help.", "Me too, hi!"]);
    let outcome = stage
        .orchestrator
        .converse_with_bound(
            ConversationTurn::opening("anyone?", player_at(100), false),
            ConversationRoster::enlist(trio()),
            1,
        )
        .await;

    assert_eq!(outcome, ExchangeOutcome::Completed { replies: 2 });
    assert!(stage.log.events().is_empty());
}

#[test]
fn dialogue_section_parses_from_yaml() {
    let yaml = "
model: mistral
per_persona_models: false
generation_timeout_ms: 2500
max_concurrent_generations: 2
params:
  temperature: 0.2
recursion_bound_min: 1
recursion_bound_max: 1
";
    let config: DialogueConfig = serde_yml::from_str(yaml).unwrap();
    assert_eq!(config.model_for("Aunt Arctic"), "mistral");
    assert_eq!(config.generation_timeout(), Duration::from_millis(2500));
    assert_eq!(config.max_concurrent_generations, 2);
    assert!((config.params.temperature - 0.2).abs() < f64::EPSILON);
    assert!((config.params.top_p - 0.9).abs() < f64::EPSILON);
    assert_eq!(config.max_chunk_chars, 95);
}
