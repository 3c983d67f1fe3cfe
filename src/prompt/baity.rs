use super::{display_city, headline_phrase, weather_phrase, PromptBuilder, PromptPair};
use crate::context::LiveContext;
use crate::strategy::Strategy;

/// Cheeky two-line hook modelled on one reference caption.
#[derive(Debug, Clone)]
pub struct BaityPrompt {
    reference: String,
}

impl BaityPrompt {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

impl PromptBuilder for BaityPrompt {
    fn strategy(&self) -> Strategy {
        Strategy::Baity
    }

    fn build(
        &self,
        seed: &str,
        location: &str,
        persona: &str,
        context: Option<&LiveContext>,
    ) -> PromptPair {
        let system = format!(
            "You are posting as \u{201c}{persona}\u{201d}. \
             Here\u{2019}s a style example: {reference}. \
             Write an original, cheeky 2-line caption: \
             weave in weather or news naturally, one emoji max, no hashtags.",
            reference = self.reference,
        );

        let user = format!(
            "You're {persona} hanging out in {city} ({location}). \
             It's {weather} today and everyone is talking about: {headline} \
             Riff on this hook without copying it: {seed}. \
             Make people stop scrolling.",
            city = display_city(context, location),
            weather = weather_phrase(context),
            headline = headline_phrase(context, location),
        );

        PromptPair { system, user }
    }
}
