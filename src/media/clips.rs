//! The fixed clip catalogue
//!
//! Every clip the avatar can show is named by a [`VideoKey`]. Each key maps
//! to exactly one file (`<key>.mp4`) and one loop flag.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Identifies one pre-recorded clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoKey {
    /// Resting loop shown before a conversation starts
    Idle,
    /// Opening line of a conversation
    Greeting,
    /// Loop shown while speech capture is live
    Listening,
    /// Answer to weather questions
    Weather,
    /// Catch-all answer
    General,
    /// Closing line of a conversation
    Goodbye,
    /// Played when speech capture fails
    Fallback,
    /// Hidden answer for the task prompt
    EasterEgg,
}

impl VideoKey {
    /// Every key, in catalogue order
    pub const ALL: [VideoKey; 8] = [
        VideoKey::Idle,
        VideoKey::Greeting,
        VideoKey::Listening,
        VideoKey::Weather,
        VideoKey::General,
        VideoKey::Goodbye,
        VideoKey::Fallback,
        VideoKey::EasterEgg,
    ];

    /// File stem of the clip resource
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoKey::Idle => "idle",
            VideoKey::Greeting => "greeting",
            VideoKey::Listening => "listening",
            VideoKey::Weather => "weather",
            VideoKey::General => "general",
            VideoKey::Goodbye => "goodbye",
            VideoKey::Fallback => "fallback",
            VideoKey::EasterEgg => "easter_egg",
        }
    }

    /// Looping clips restart forever and never report an end
    pub fn is_looping(&self) -> bool {
        matches!(self, VideoKey::Idle | VideoKey::Listening)
    }

    /// Resolve the clip file inside `video_dir`
    pub fn source_in(&self, video_dir: &Path) -> PathBuf {
        video_dir.join(format!("{}.mp4", self.as_str()))
    }
}

impl std::fmt::Display for VideoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_idle_and_listening_loop() {
        let looping: Vec<_> = VideoKey::ALL.iter().filter(|k| k.is_looping()).collect();
        assert_eq!(looping, vec![&VideoKey::Idle, &VideoKey::Listening]);
    }

    #[test]
    fn test_source_naming() {
        let path = VideoKey::EasterEgg.source_in(Path::new("/videos"));
        assert_eq!(path, PathBuf::from("/videos/easter_egg.mp4"));
    }

    #[test]
    fn test_serialized_name_matches_file_stem() {
        for key in VideoKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
    }
}
