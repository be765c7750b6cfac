//! Multi-bot conversations.
//!
//! An exchange starts from a player's chat line. The line is filtered, a
//! respondent is chosen, and the respondent's reply is generated, split
//! into chat-sized chunks, and spoken. The reply then becomes the next
//! line: another participant answers it, and so on until the exchange's
//! follow-up bound is reached or nobody is left to answer.
//!
//! Exchanges run either live (events reach the room, with pauses between
//! chunks) or as a rehearsal (lines are only logged).

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tracing::{info, warn};
use tundra_types::{AgentId, Occupant, RoomEventKind, frames};
use tundra_world::{Bot, announce};

use crate::clock::time_reply;
use crate::context::DialogueContext;
use crate::participants::ConversationRoster;
use crate::splitter::split_sentences;

/// One line of a conversation and who should answer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    /// The line.
    pub text: String,
    /// Who said it; `is_bot` is false for a player.
    pub speaker: Occupant,
    /// Who answers, once chosen.
    pub respondent: Option<AgentId>,
    /// Follow-ups before this one.
    pub depth: u32,
    /// Live exchange (events reach the room) or rehearsal (logged only).
    pub active: bool,
}

impl ConversationTurn {
    /// A player's opening line.
    pub fn opening(text: impl Into<String>, speaker: Occupant, active: bool) -> Self {
        Self {
            text: text.into(),
            speaker,
            respondent: None,
            depth: 0,
            active,
        }
    }
}

/// How an exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The opening line was flagged.
    Rejected,
    /// Nobody could answer the opening line.
    NoRespondent,
    /// The opening line asked for the time and was answered directly.
    TimeReported {
        /// Who told the time.
        respondent: AgentId,
    },
    /// Replies were generated.
    Completed {
        /// Generations performed, the first reply included.
        replies: u32,
    },
}

/// Runs conversations against a shared [`DialogueContext`].
#[derive(Debug, Clone)]
pub struct Orchestrator {
    ctx: Arc<DialogueContext>,
}

impl Orchestrator {
    /// Bind to the shared context.
    pub const fn new(ctx: Arc<DialogueContext>) -> Self {
        Self { ctx }
    }

    /// The shared context.
    pub const fn context(&self) -> &Arc<DialogueContext> {
        &self.ctx
    }

    /// Draw how many follow-ups an exchange may have.
    pub fn draw_bound(&self, rng: &mut impl Rng) -> u32 {
        let config = &self.ctx.config;
        let (low, high) = if config.recursion_bound_min <= config.recursion_bound_max {
            (config.recursion_bound_min, config.recursion_bound_max)
        } else {
            (config.recursion_bound_max, config.recursion_bound_min)
        };
        rng.random_range(low..=high)
    }

    /// Run a whole exchange from `opening` among `roster`.
    ///
    /// The roster is released when the exchange ends, clearing every
    /// participant's talking flag.
    pub async fn converse(&self, opening: ConversationTurn, roster: ConversationRoster) -> ExchangeOutcome {
        let bound = {
            let mut rng = rand::rng();
            self.draw_bound(&mut rng)
        };
        self.converse_with_bound(opening, roster, bound).await
    }

    /// [`Self::converse`] with a fixed follow-up bound.
    pub async fn converse_with_bound(
        &self,
        opening: ConversationTurn,
        roster: ConversationRoster,
        bound: u32,
    ) -> ExchangeOutcome {
        let mut turn = opening;

        if self.ctx.filter.contains_flagged(&turn.text) {
            warn!(player = %turn.speaker.nickname, "message rejected by content filter");
            return ExchangeOutcome::Rejected;
        }

        let Some(mut respondent) = roster.pick_respondent(&turn.speaker, &turn.text, None) else {
            info!(player = %turn.speaker.nickname, "no respondent for message");
            return ExchangeOutcome::NoRespondent;
        };
        turn.respondent = Some(respondent.id());

        if self.ctx.config.is_time_query(&turn.text) {
            self.tell_time(&respondent, turn.active);
            return ExchangeOutcome::TimeReported {
                respondent: respondent.id(),
            };
        }

        let mut replies = 0_u32;
        loop {
            let request =
                self.ctx
                    .request_for(respondent.nickname(), &turn.speaker.nickname, &turn.text);
            let reply = self.ctx.generate(&request).await;
            replies = replies.saturating_add(1);

            self.deliver(&respondent, &reply, turn.active).await;
            respondent.set_talking(false);

            info!(
                bot = respondent.nickname(),
                depth = turn.depth,
                bound,
                "turn finished"
            );
            if turn.depth >= bound {
                break;
            }

            let Some(speaker) = respondent.as_occupant() else {
                info!(bot = respondent.nickname(), "speaker left the room, exchange over");
                break;
            };
            let text = if reply.trim().is_empty() {
                turn.text
            } else {
                reply
            };
            let Some(next) = roster.pick_respondent(&speaker, &text, Some(respondent.id())) else {
                info!(bot = respondent.nickname(), "no one left to answer");
                break;
            };

            turn = ConversationTurn {
                text,
                speaker,
                respondent: Some(next.id()),
                depth: turn.depth.saturating_add(1),
                active: turn.active,
            };
            respondent = next;
        }

        ExchangeOutcome::Completed { replies }
    }

    fn tell_time(&self, bot: &Bot, active: bool) {
        let line = time_reply(Utc::now(), self.ctx.config.time_zone_offset_minutes);
        info!(bot = bot.nickname(), line = %line, "telling the time");
        if active {
            announce(self.ctx.events().as_ref(), bot, RoomEventKind::Chat { text: line });
        }
    }

    /// Speak `reply` chunk by chunk, then show the first emotion it carries.
    async fn deliver(&self, bot: &Bot, reply: &str, active: bool) {
        let config = &self.ctx.config;
        let events = self.ctx.events().as_ref();

        for chunk in split_sentences(reply, config.min_chunk_chars, config.max_chunk_chars) {
            info!(bot = bot.nickname(), line = %chunk, active, "bot says");
            if !active {
                continue;
            }
            let delay = config.chunk_delay(chunk.chars().count());
            let waves = self.has_greeting(&chunk);
            announce(events, bot, RoomEventKind::Chat { text: chunk });
            if waves {
                bot.update(|state| state.frame = frames::WAVE);
                announce(events, bot, RoomEventKind::Frame { frame: frames::WAVE });
            }
            tokio::time::sleep(delay).await;
        }

        if let Some(emotion) = self.ctx.emotions().detect(reply) {
            info!(
                bot = bot.nickname(),
                emotion = %emotion.name,
                keyword = %emotion.keyword,
                emoticon = emotion.emoticon,
                "emotion detected"
            );
            if active {
                announce(events, bot, RoomEventKind::Emote {
                    emote: emotion.emoticon,
                });
            }
        }
    }

    fn has_greeting(&self, chunk: &str) -> bool {
        chunk
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .any(|word| self.ctx.config.greeting_words.contains(&word))
    }
}
