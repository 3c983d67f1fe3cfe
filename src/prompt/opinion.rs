use super::{display_city, headline_phrase, weather_phrase, PromptBuilder, PromptPair};
use crate::context::LiveContext;
use crate::strategy::Strategy;

/// Hot take on a topic, opened with a conversational phrase.
#[derive(Debug, Clone)]
pub struct OpinionPrompt {
    opener: String,
}

impl OpinionPrompt {
    pub fn new(opener: impl Into<String>) -> Self {
        Self {
            opener: opener.into(),
        }
    }
}

impl PromptBuilder for OpinionPrompt {
    fn strategy(&self) -> Strategy {
        Strategy::Opinion
    }

    fn build(
        &self,
        seed: &str,
        location: &str,
        persona: &str,
        context: Option<&LiveContext>,
    ) -> PromptPair {
        let system = format!(
            "You are a witty local (\u{201c}{persona}\u{201d}) sharing a hot take. \
             Start with the provided opener, mention the real news headline casually, \
             and keep it under 2 lines with one emoji."
        );

        let topic = format!(
            "the latest in {city}: {headline} Give a hot take on {seed}, \
             tie it to that headline, and mention it's {weather} out.",
            city = display_city(context, location),
            headline = headline_phrase(context, location),
            weather = weather_phrase(context),
        );

        PromptPair {
            system,
            user: format!("{} {}", self.opener.trim(), topic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Lookup;

    #[test]
    fn user_message_starts_with_opener() {
        let pair = OpinionPrompt::new("Hot take:").build(
            "pineapple on pizza",
            "Chicago, IL",
            "deep-dish loyalist",
            None,
        );

        assert!(pair.user.starts_with("Hot take: "));
        assert!(pair.user.contains("pineapple on pizza"));
        assert!(pair.user.contains("No trending news in Chicago."));
        assert!(pair.system.contains("deep-dish loyalist"));
        assert!(pair.system.contains("hot take"));
    }

    #[test]
    fn real_headline_is_quoted_into_topic() {
        let context = LiveContext {
            headline: Lookup::Found("Bears sign new quarterback".into()),
            ..LiveContext::default()
        };
        let pair = OpinionPrompt::new("PSA:").build(
            "brunch lines",
            "Chicago, IL",
            "sports fan",
            Some(&context),
        );
        assert!(pair.user.contains("Bears sign new quarterback"));
        assert!(pair.user.contains("unknown weather"));
    }
}
