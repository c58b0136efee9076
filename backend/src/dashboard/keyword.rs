//! answer-seeking phrase scan over chat payloads
//!
//! Plain case-insensitive substring match against one configured list,
//! no stemming. The flag is a heuristic for the teacher, not a verdict.

use serde::Deserialize;

use crate::config::CONFIG;

/// client message body, the rest of the JSON is ignored
#[derive(Deserialize)]
struct Payload {
    text: String,
}

pub struct KeywordScanner {
    phrases: Vec<String>,
}

impl KeywordScanner {
    pub fn new(phrases: &[String]) -> Self {
        Self {
            phrases: phrases
                .iter()
                .filter(|x| !x.is_empty())
                .map(|x| x.to_lowercase())
                .collect(),
        }
    }
    pub fn from_config() -> Self {
        Self::new(&CONFIG.dashboard.cheating_phrases)
    }
    pub fn text_hit(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.phrases.iter().any(|phrase| text.contains(phrase))
    }
    /// scan one raw chat payload
    ///
    /// an unparsable payload yields `false`, a missed flag is
    /// preferable to failing the whole dashboard
    pub fn payload_hit(&self, payload: &str) -> bool {
        match serde_json::from_str::<Payload>(payload) {
            Ok(x) => self.text_hit(&x.text),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn scanner() -> KeywordScanner {
        KeywordScanner::new(&[
            "정답 알려".to_owned(),
            "코드 줘".to_owned(),
            "give me the answer".to_owned(),
        ])
    }

    #[test]
    fn phrase_hits() {
        let s = scanner();
        assert!(s.text_hit("그냥 정답 알려줘"));
        assert!(s.text_hit("코드 줘 빨리"));
        assert!(s.text_hit("PLEASE GIVE ME THE ANSWER NOW"));
    }

    #[test]
    fn benign_text_misses() {
        let s = scanner();
        assert!(!s.text_hit("힌트 좀 줘"));
        assert!(!s.text_hit("why does my loop never stop?"));
    }

    #[test]
    fn payload_json() {
        let s = scanner();
        assert!(s.payload_hit(r#"{"text": "정답 알려줘", "context": "for i in range(3):"}"#));
        assert!(!s.payload_hit(r#"{"text": "힌트 좀 줘"}"#));
    }

    #[test]
    fn malformed_payload_fails_closed() {
        let s = scanner();
        assert!(!s.payload_hit("정답 알려줘"));
        assert!(!s.payload_hit(r#"{"message": "정답 알려줘"}"#));
        assert!(!s.payload_hit(""));
    }

    #[test]
    fn empty_phrase_ignored() {
        let s = KeywordScanner::new(&["".to_owned()]);
        assert!(!s.text_hit("anything"));
    }
}
