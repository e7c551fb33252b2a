//! Transcript data model.
//!
//! A transcript is an ordered sequence of diarized utterances produced by
//! the external transcription collaborator. The engine never mutates it;
//! `call_start` is always second zero of the recording.

use serde::{Deserialize, Serialize};

/// Who spoke an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Agent,
    Customer,
}

/// One utterance: speaker, text, and its position on the call timeline
/// in seconds from call start.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub speaker: Speaker,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
}

impl Segment {
    pub fn agent(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            speaker: Speaker::Agent,
            text: text.into(),
            start_time,
            end_time,
        }
    }

    pub fn customer(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            speaker: Speaker::Customer,
            text: text.into(),
            start_time,
            end_time,
        }
    }
}

/// A full call transcript, segments in call order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Transcript {
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse a transcript from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Iterate agent segments only, preserving call order.
    pub fn agent_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments
            .iter()
            .filter(|s| s.speaker == Speaker::Agent)
    }
}
