// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message classification.

use chatledger_core::update::Message;
use chatledger_core::{MessageType, UserId};

/// Type of the first present content field, in priority order:
/// text, audio, video, video_note, voice, animation, document, photo, sticker.
///
/// Animations also carry a `document` field, and documents may carry a
/// `photo` thumbnail, so the order matters.
pub fn classify(msg: &Message) -> MessageType {
    let present = [
        (msg.text.is_some(), MessageType::Text),
        (msg.audio.is_some(), MessageType::Audio),
        (msg.video.is_some(), MessageType::Video),
        (msg.video_note.is_some(), MessageType::VideoNote),
        (msg.voice.is_some(), MessageType::Voice),
        (msg.animation.is_some(), MessageType::Animation),
        (msg.document.is_some(), MessageType::Document),
        (msg.photo.is_some(), MessageType::Photo),
        (msg.sticker.is_some(), MessageType::Sticker),
    ];
    present
        .into_iter()
        .find_map(|(is_present, kind)| is_present.then_some(kind))
        .unwrap_or(MessageType::Other)
}

/// A forward of someone else's message. Self-forwards and origins that are
/// not a user (channels, hidden users) do not count.
pub fn is_external_forward(msg: &Message, author_id: UserId) -> bool {
    msg.forward_origin_user_id()
        .is_some_and(|origin| origin != author_id)
}
