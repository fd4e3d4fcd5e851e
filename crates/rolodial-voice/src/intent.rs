//! Command intents: the three permitted tool invocations and their mapping
//! from tool names and free-text transcripts.

/// A structured command from the voice channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandIntent {
    /// Move to the next contact.
    Advance,
    /// Move to the previous contact.
    Retreat,
    /// Read the current contact aloud and dial it.
    CallCurrent,
}

impl CommandIntent {
    /// The wire name of the tool for live-session configuration.
    pub fn tool_name(&self) -> &'static str {
        match self {
            CommandIntent::Advance => "advance",
            CommandIntent::Retreat => "retreat",
            CommandIntent::CallCurrent => "call-current",
        }
    }

    /// Parse a tool name from the live channel.
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            "advance" => Some(CommandIntent::Advance),
            "retreat" => Some(CommandIntent::Retreat),
            "call-current" => Some(CommandIntent::CallCurrent),
            _ => None,
        }
    }

    /// Map a free-text transcript to an intent. Navigation words win over
    /// "call" so "call the next one" advances instead of dialing.
    pub fn from_transcript(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));
        if has(&["next", "forward", "skip"]) {
            Some(CommandIntent::Advance)
        } else if has(&["previous", "back"]) {
            Some(CommandIntent::Retreat)
        } else if has(&["call", "dial"]) {
            Some(CommandIntent::CallCurrent)
        } else {
            None
        }
    }
}
