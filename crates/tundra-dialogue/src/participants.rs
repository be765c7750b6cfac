//! Who takes part in a conversation and who answers next.
//!
//! A bot is eligible when it stands in the speaker's room, is not already
//! talking, and has a persona. Large eligible groups are sampled down to a
//! random subset, and the chosen bots are held by a [`ConversationRoster`]
//! that marks them as talking until it is dropped.

use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;
use tundra_types::{AgentId, Occupant};
use tundra_world::Bot;

use crate::personas::PersonaBook;

/// Why a bot was left out of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    /// Not in the speaker's room.
    OtherRoom,
    /// Already in a conversation.
    Talking,
    /// No persona to answer with.
    NoPersona,
}

/// Check whether `bot` may join a conversation started by `speaker`.
pub fn eligibility(bot: &Bot, speaker: &Occupant, personas: &PersonaBook) -> Result<(), Ineligible> {
    let state = bot.snapshot();
    if state.room != Some(speaker.room) {
        Err(Ineligible::OtherRoom)
    } else if state.talking {
        Err(Ineligible::Talking)
    } else if !personas.contains(bot.nickname()) {
        Err(Ineligible::NoPersona)
    } else {
        Ok(())
    }
}

/// The bots in `bots` eligible to answer `speaker`, in the given order.
pub fn eligible_participants<'a>(
    bots: impl IntoIterator<Item = &'a Arc<Bot>>,
    speaker: &Occupant,
    personas: &PersonaBook,
) -> Vec<Arc<Bot>> {
    bots.into_iter()
        .filter(|bot| match eligibility(bot, speaker, personas) {
            Ok(()) => true,
            Err(reason) => {
                debug!(bot = bot.nickname(), ?reason, "bot left out of conversation");
                false
            }
        })
        .cloned()
        .collect()
}

/// Draw the participants of a new exchange.
///
/// With at least `min` eligible bots a random subset of `min..=len` bots is
/// drawn; smaller groups take part whole.
pub fn sample_participants(eligible: &[Arc<Bot>], min: usize, rng: &mut impl Rng) -> Vec<Arc<Bot>> {
    let min = min.max(1);
    if eligible.len() < min {
        return eligible.to_vec();
    }
    let size = rng.random_range(min..=eligible.len());
    eligible.choose_multiple(rng, size).cloned().collect()
}

/// Pick who answers `message` from `speaker`.
///
/// Only candidates in the speaker's room count. A candidate whose name
/// appears as a word of the message wins, the first such candidate in
/// order; otherwise the nearest candidate answers. Returns the index into
/// `candidates`.
pub fn select_respondent(speaker: &Occupant, candidates: &[Occupant], message: &str) -> Option<usize> {
    let words: Vec<String> = message
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let present: Vec<(usize, &Occupant)> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.room == speaker.room && c.id != speaker.id)
        .collect();

    present
        .iter()
        .find(|(_, candidate)| is_mentioned(&candidate.nickname, &words))
        .or_else(|| {
            present.iter().min_by(|(_, a), (_, b)| {
                let da = a.position.distance_to(speaker.position);
                let db = b.position.distance_to(speaker.position);
                da.total_cmp(&db)
            })
        })
        .map(|&(index, _)| index)
}

fn is_mentioned(nickname: &str, words: &[String]) -> bool {
    nickname
        .split_whitespace()
        .map(str::to_lowercase)
        .any(|part| words.contains(&part))
}

/// Bots taking part in one exchange.
///
/// Enlisting marks every bot as talking; dropping the roster clears the
/// flag again, whichever way the exchange ended. A bot enlisted again by a
/// later exchange keeps its flag when this roster drops.
#[derive(Debug)]
pub struct ConversationRoster {
    participants: Vec<Arc<Bot>>,
    claims: Vec<u64>,
}

impl ConversationRoster {
    /// Mark `participants` as talking.
    pub fn enlist(participants: Vec<Arc<Bot>>) -> Self {
        let claims = participants.iter().map(|bot| bot.claim_talking()).collect();
        Self {
            participants,
            claims,
        }
    }

    /// Every participant, in enlistment order.
    pub fn participants(&self) -> &[Arc<Bot>] {
        &self.participants
    }

    /// Look up a participant.
    pub fn get(&self, id: AgentId) -> Option<&Arc<Bot>> {
        self.participants.iter().find(|bot| bot.id() == id)
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether nobody takes part.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Choose who answers `message` from `speaker`, leaving out `except`.
    ///
    /// Participants that have left every room are skipped.
    pub fn pick_respondent(
        &self,
        speaker: &Occupant,
        message: &str,
        except: Option<AgentId>,
    ) -> Option<Arc<Bot>> {
        let (bots, occupants): (Vec<&Arc<Bot>>, Vec<Occupant>) = self
            .participants
            .iter()
            .filter(|bot| Some(bot.id()) != except)
            .filter_map(|bot| bot.as_occupant().map(|occupant| (bot, occupant)))
            .unzip();
        select_respondent(speaker, &occupants, message)
            .and_then(|index| bots.get(index).copied())
            .cloned()
    }
}

impl Drop for ConversationRoster {
    fn drop(&mut self) {
        for (bot, &claim) in self.participants.iter().zip(&self.claims) {
            if !bot.release_talking(claim) {
                debug!(bot = bot.nickname(), "bot joined a newer exchange, keeping it talking");
            }
        }
    }
}
