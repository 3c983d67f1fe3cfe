use time::macros::format_description;
use time::{Date, Duration};

use super::{PromptBuilder, PromptPair};
use crate::context::{city_of, LiveContext, NearbyEvent};
use crate::strategy::Strategy;

/// Casual heads-up about something happening nearby.
#[derive(Debug, Clone)]
pub struct EventPrompt {
    today: Date,
}

impl EventPrompt {
    pub fn new(today: Date) -> Self {
        Self { today }
    }

    fn announce(&self, event: &NearbyEvent, seed: &str, location: &str, persona: &str) -> String {
        let city = if event.city.is_empty() {
            city_of(location)
        } else {
            event.city.as_str()
        };
        let place = if event.venue.trim().is_empty() {
            city.to_string()
        } else {
            format!("{} in {}", event.venue.trim(), city)
        };
        let when = event
            .start_date()
            .map(|date| relative_day(date, self.today))
            .unwrap_or_else(|| "soon".to_string());

        format!(
            "As {persona}, tell your friends that {title} is happening at {place} {when}. \
             Keep the energy of this topic: {seed}.",
            title = event.title.trim(),
        )
    }
}

impl PromptBuilder for EventPrompt {
    fn strategy(&self) -> Strategy {
        Strategy::Event
    }

    fn build(
        &self,
        seed: &str,
        location: &str,
        persona: &str,
        context: Option<&LiveContext>,
    ) -> PromptPair {
        let system = format!(
            "You are \u{201c}{persona}\u{201d} telling friends about a real event. \
             Name the event, city & when (today/tomorrow) in a smooth 2-line post \
             with one emoji. It must not sound like an ad."
        );

        let event = context
            .and_then(|context| context.event.found())
            .filter(|event| !event.title.trim().is_empty());

        let user = match event {
            Some(event) => self.announce(event, seed, location, persona),
            None => format!(
                "As {persona}, suggest a fun {seed} plan in {city} for today or tomorrow. \
                 Make it sound like a real local thing worth showing up for.",
                city = city_of(location),
            ),
        };

        PromptPair { system, user }
    }
}

/// "today", "tomorrow", or a spelled-out day for anything further out.
/// Events that started before `today` are still running, so they read as today.
pub fn relative_day(date: Date, today: Date) -> String {
    if date <= today {
        return "today".to_string();
    }
    if Some(date) == today.checked_add(Duration::days(1)) {
        return "tomorrow".to_string();
    }

    date.format(format_description!(
        "on [weekday], [month repr:long] [day padding:none]"
    ))
    .unwrap_or_else(|_| format!("on {date}"))
}
