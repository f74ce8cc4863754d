//! Dialogue Engine — sequenced NPC dialogue for games.
//!
//! Plays authored sequences of lines with optional walks, gestures, voice
//! clips, story progression and chaining, and picks which sequence to play
//! from ordered trigger rules. Rendering, audio and movement stay with the
//! host engine behind the traits in [`core::stage`].

pub mod core;
pub mod schema;
