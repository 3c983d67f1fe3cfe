use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::completion::{CompletionClient, SamplingConfig};
use crate::config::ConfigManager;
use crate::context::{self, ContextEnricher};
use crate::error::CaptionError;
use crate::normalize::CaptionNormalizer;
use crate::prompt::{BaityPrompt, EventPrompt, OpinionPrompt, PromptBuilder, PromptPair};
use crate::seeds::SeedPool;
use crate::strategy::Strategy;
use crate::usage::UsageTracker;

pub const MISSING_FIELDS: &str = "Both location and description are required";

/// Body of a caption request. Missing fields deserialize as empty strings so
/// validation reports them the same way as blank ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionRequest {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

impl CaptionRequest {
    pub fn new(location: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            description: description.into(),
        }
    }

    /// Trimmed `(location, description)`, both non-empty.
    pub fn validated(&self) -> Result<(&str, &str), CaptionError> {
        let location = self.location.trim();
        let description = self.description.trim();
        if location.is_empty() || description.is_empty() {
            return Err(CaptionError::InvalidInput(MISSING_FIELDS.to_string()));
        }
        Ok((location, description))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionResult {
    pub caption: String,
    pub caption_type: Strategy,
}

/// Everything drawn before the first await of a request.
struct Draw {
    seed: String,
    builder: Box<dyn PromptBuilder>,
    sampling: SamplingConfig,
}

pub struct CaptionOrchestrator {
    seeds: Arc<SeedPool>,
    tracker: UsageTracker,
    enricher: Arc<dyn ContextEnricher>,
    completion: Arc<dyn CompletionClient>,
    normalizer: CaptionNormalizer,
    config: ConfigManager,
    rng: Mutex<StdRng>,
}

impl CaptionOrchestrator {
    pub fn new(
        seeds: SeedPool,
        enricher: Arc<dyn ContextEnricher>,
        completion: Arc<dyn CompletionClient>,
        config: ConfigManager,
    ) -> Self {
        Self {
            seeds: Arc::new(seeds),
            tracker: UsageTracker::new(),
            enricher,
            completion,
            normalizer: CaptionNormalizer::new(),
            config,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Replaces the entropy-seeded generator with a deterministic one.
    pub fn with_rng_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn tracker(&self) -> &UsageTracker {
        &self.tracker
    }

    pub fn seeds(&self) -> &SeedPool {
        &self.seeds
    }

    /// Picks a strategy uniformly at random and generates with it.
    pub async fn generate(&self, request: &CaptionRequest) -> Result<CaptionResult, CaptionError> {
        request.validated()?;
        let strategy = Strategy::choose(&mut *self.rng());
        self.generate_with(request, strategy).await
    }

    pub async fn generate_with(
        &self,
        request: &CaptionRequest,
        strategy: Strategy,
    ) -> Result<CaptionResult, CaptionError> {
        let (prompt, sampling) = self.prepare(request, strategy).await?;

        info!(
            strategy = strategy.as_str(),
            temperature = sampling.temperature,
            backend = self.completion.name(),
            "Requesting caption"
        );

        let raw = self
            .completion
            .complete(&prompt, &sampling)
            .await
            .inspect_err(|err| error!(strategy = strategy.as_str(), "Completion failed: {err}"))?;

        let caption = self.normalizer.normalize(&raw);
        if caption.is_empty() {
            warn!(
                strategy = strategy.as_str(),
                raw_len = raw.len(),
                "Caption was empty after normalization"
            );
        }

        Ok(CaptionResult {
            caption,
            caption_type: strategy,
        })
    }

    /// Runs the pipeline up to prompt construction without calling the
    /// completion backend. The drawn seed is still marked as used.
    pub async fn preview_prompt(
        &self,
        request: &CaptionRequest,
        strategy: Strategy,
    ) -> Result<PromptPair, CaptionError> {
        self.prepare(request, strategy)
            .await
            .map(|(prompt, _sampling)| prompt)
    }

    async fn prepare(
        &self,
        request: &CaptionRequest,
        strategy: Strategy,
    ) -> Result<(PromptPair, SamplingConfig), CaptionError> {
        let (location, persona) = request.validated()?;
        let Draw {
            seed,
            builder,
            sampling,
        } = self.draw(strategy)?;

        debug!(strategy = strategy.as_str(), seed = %seed, "Drew seed");

        let live = context::gather(self.enricher.as_ref(), strategy, location).await;
        let prompt = builder.build(&seed, location, persona, Some(&live));
        Ok((prompt, sampling))
    }

    fn draw(&self, strategy: Strategy) -> Result<Draw, CaptionError> {
        let completion = self.config.get().completion;
        let mut rng = self.rng();

        let seed = self
            .tracker
            .pick_seed(strategy, self.pool_for(strategy), &mut *rng)?;
        let builder = self.builder_for(strategy, &mut *rng)?;
        let sampling = SamplingConfig::draw(&completion, &mut *rng);

        Ok(Draw {
            seed,
            builder,
            sampling,
        })
    }

    fn pool_for(&self, strategy: Strategy) -> &[String] {
        match strategy {
            Strategy::Baity => self.seeds.baity(),
            Strategy::Opinion | Strategy::Event => self.seeds.opinion(),
        }
    }

    fn builder_for(
        &self,
        strategy: Strategy,
        rng: &mut StdRng,
    ) -> Result<Box<dyn PromptBuilder>, CaptionError> {
        let builder: Box<dyn PromptBuilder> = match strategy {
            Strategy::Baity => {
                let reference = self
                    .seeds
                    .references()
                    .choose(rng)
                    .ok_or(CaptionError::InvalidPool(strategy))?;
                Box::new(BaityPrompt::new(reference.as_str()))
            }
            Strategy::Opinion => {
                let opener = self
                    .seeds
                    .openers()
                    .choose(rng)
                    .ok_or(CaptionError::InvalidPool(strategy))?;
                Box::new(OpinionPrompt::new(opener.as_str()))
            }
            Strategy::Event => Box::new(EventPrompt::new(local_today())),
        };
        Ok(builder)
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn local_today() -> time::Date {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .date()
}
