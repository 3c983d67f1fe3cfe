//! Strategy-specific prompt construction.
//!
//! Builders are pure: anything random (the reference caption, the opener,
//! today's date) is drawn by the caller and stored in the builder value, so a
//! given builder always produces the same [`PromptPair`] for the same inputs.

mod baity;
mod event;
mod opinion;

use serde::Serialize;

use crate::context::{city_of, LiveContext};
use crate::strategy::Strategy;

pub use baity::BaityPrompt;
pub use event::EventPrompt;
pub use opinion::OpinionPrompt;

pub(crate) const UNKNOWN_WEATHER: &str = "unknown weather";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

pub trait PromptBuilder: Send + Sync {
    fn strategy(&self) -> Strategy;

    fn build(
        &self,
        seed: &str,
        location: &str,
        persona: &str,
        context: Option<&LiveContext>,
    ) -> PromptPair;
}

/// Weather wording for prompts, or the placeholder when the lookup failed.
pub(crate) fn weather_phrase(context: Option<&LiveContext>) -> &str {
    context
        .and_then(|context| context.weather.found())
        .map(|weather| weather.description.as_str())
        .filter(|description| !description.is_empty())
        .unwrap_or(UNKNOWN_WEATHER)
}

/// Headline for prompts, or the "no trending news" placeholder for `city`.
pub(crate) fn headline_phrase(context: Option<&LiveContext>, location: &str) -> String {
    match context.and_then(|context| context.headline.found()) {
        Some(headline) => headline.clone(),
        None => format!("No trending news in {}.", display_city(context, location)),
    }
}

/// The resolved city name when weather knew it, otherwise the location prefix.
pub(crate) fn display_city<'a>(context: Option<&'a LiveContext>, location: &'a str) -> &'a str {
    context
        .and_then(|context| context.weather.found())
        .map(|weather| weather.city.as_str())
        .filter(|city| !city.is_empty())
        .unwrap_or_else(|| city_of(location))
}
