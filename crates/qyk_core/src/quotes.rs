use std::sync::Arc;

use crate::error::QykError;
use crate::settings::SettingsStore;

pub const CONTENT_NAMESPACE: &str = "qyk_quotes_content";
const KEY_CURSOR: &str = "cursor";

/// Body used when no quote could be fetched.
pub const FALLBACK_QUOTE: &str = "Take a quiet minute and write down one thing on your mind.";

const BUILTIN_QUOTES: &[&str] = &[
    "What made you smile today?",
    "Write one sentence about how you feel right now.",
    "Name something you are grateful for this morning.",
    "What is one thing you want to let go of?",
    "Describe a small win from yesterday.",
    "Who would you like to thank, and why?",
    "What would make today feel complete?",
    "Write down a worry, then one thing you can do about it.",
    "Which moment this week do you want to remember?",
    "What did you learn about yourself recently?",
];

pub trait QuoteSource: Send + Sync {
    fn next_quote(&self) -> Result<String, QykError>;
}

/// Rotates through a fixed list of prompts. The position is persisted so
/// every reminder shows the next one, across restarts.
pub struct QuoteRepository {
    settings: Arc<dyn SettingsStore>,
    quotes: Vec<String>,
}

impl QuoteRepository {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self::with_quotes(
            settings,
            BUILTIN_QUOTES.iter().map(|quote| quote.to_string()).collect(),
        )
    }

    pub fn with_quotes(settings: Arc<dyn SettingsStore>, quotes: Vec<String>) -> Self {
        Self { settings, quotes }
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl QuoteSource for QuoteRepository {
    fn next_quote(&self) -> Result<String, QykError> {
        if self.quotes.is_empty() {
            return Err(QykError::Content("no quotes configured".to_string()));
        }
        let len = self.quotes.len();
        let cursor = self
            .settings
            .get_int(CONTENT_NAMESPACE, KEY_CURSOR)
            .and_then(|value| usize::try_from(value).ok())
            .unwrap_or(0)
            % len;
        let next = ((cursor + 1) % len) as i64;
        if let Err(err) = self.settings.put(CONTENT_NAMESPACE, KEY_CURSOR, next.into()) {
            // The quote is still usable; the same one shows again next time.
            tracing::warn!(%err, "unable to persist quote cursor");
        }
        Ok(self.quotes[cursor].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;

    #[test]
    fn rotates_and_wraps() {
        let settings = Arc::new(MemorySettings::new());
        let repo = QuoteRepository::with_quotes(
            settings.clone(),
            vec!["a".into(), "b".into(), "c".into()],
        );
        let seen: Vec<String> = (0..4).map(|_| repo.next_quote().unwrap()).collect();
        assert_eq!(seen, ["a", "b", "c", "a"]);

        // A fresh repository over the same settings continues the rotation.
        let again = QuoteRepository::with_quotes(settings, vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(again.next_quote().unwrap(), "b");
    }

    #[test]
    fn empty_repository_reports_missing_content() {
        let repo = QuoteRepository::with_quotes(Arc::new(MemorySettings::new()), Vec::new());
        assert!(matches!(repo.next_quote(), Err(QykError::Content(_))));
    }

    #[test]
    fn builtin_list_is_not_empty() {
        let repo = QuoteRepository::new(Arc::new(MemorySettings::new()));
        assert!(!repo.is_empty());
        assert!(!repo.next_quote().unwrap().is_empty());
    }
}
