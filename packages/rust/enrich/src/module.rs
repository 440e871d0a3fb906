//! The enrichment module contract and the ordered module chain.

use async_trait::async_trait;
use dealscout_shared::{
    AppConfig, CompanyRecord, CompanyUpdate, ModuleConfig, Result, read_api_key,
};
use tracing::{info, warn};

use crate::ai::AiClient;
use crate::http::PageFetcher;
use crate::providers::{
    AboutScraper, AiClassifier, DomainNormalizer, EcommerceDetector, EmailFinder, IndustryTagger,
    LinkedInFinder, NewsFinder, OwnerFinder, RevenueEstimator, TrafficEstimator,
};
use crate::search::SearchClient;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A single-purpose provider that proposes field updates for one company.
///
/// Implementations read the record they are given and return only the fields
/// they learned something about. An empty update means "nothing to add" and is
/// the expected answer when a prerequisite field or API key is missing.
/// Errors are reserved for real failures (network, malformed responses); the
/// chain logs them and moves on to the next module.
#[async_trait]
pub trait EnrichmentModule: Send + Sync {
    /// Stable module name used in logs and toggles.
    fn name(&self) -> &str;

    /// Propose updates for `record`.
    async fn enrich(&self, record: &CompanyRecord) -> Result<CompanyUpdate>;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Shared construction inputs for every module: the runtime config plus the
/// clients built from it. Search and AI clients are `None` when their API key
/// is not set.
#[derive(Clone)]
pub struct ModuleContext {
    pub config: ModuleConfig,
    pub fetcher: PageFetcher,
    pub search: Option<SearchClient>,
    pub ai: Option<AiClient>,
}

impl ModuleContext {
    /// Build the shared clients for `config`, reading API keys from the environment.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        let module_config = ModuleConfig::from(config);
        let fetcher = PageFetcher::new(&module_config)?;

        let search = match read_api_key(&config.search.api_key_env) {
            Some(key) => Some(SearchClient::new(
                &key,
                &config.search.base_url,
                &module_config,
            )?),
            None => {
                warn!(
                    env = %config.search.api_key_env,
                    "search API key not set, search-backed modules will contribute nothing"
                );
                None
            }
        };

        let ai = match read_api_key(&config.ai.api_key_env) {
            Some(key) => Some(AiClient::new(&key, &config.ai)?),
            None => {
                warn!(
                    env = %config.ai.api_key_env,
                    "AI API key not set, AI-backed modules will contribute nothing"
                );
                None
            }
        };

        Ok(Self {
            config: module_config,
            fetcher,
            search,
            ai,
        })
    }
}

/// A module the registry can build from the shared [`ModuleContext`].
pub trait FromContext: EnrichmentModule + Sized + 'static {
    fn from_context(ctx: &ModuleContext) -> Self;
}

impl FromContext for DomainNormalizer {
    fn from_context(_ctx: &ModuleContext) -> Self {
        DomainNormalizer
    }
}

impl FromContext for AboutScraper {
    fn from_context(ctx: &ModuleContext) -> Self {
        AboutScraper::new(ctx.fetcher.clone())
    }
}

impl FromContext for LinkedInFinder {
    fn from_context(ctx: &ModuleContext) -> Self {
        LinkedInFinder::new(ctx.search.clone())
    }
}

impl FromContext for EcommerceDetector {
    fn from_context(ctx: &ModuleContext) -> Self {
        EcommerceDetector::new(ctx.fetcher.clone())
    }
}

impl FromContext for TrafficEstimator {
    fn from_context(ctx: &ModuleContext) -> Self {
        TrafficEstimator::new(ctx.fetcher.clone())
    }
}

impl FromContext for IndustryTagger {
    fn from_context(_ctx: &ModuleContext) -> Self {
        IndustryTagger
    }
}

impl FromContext for NewsFinder {
    fn from_context(ctx: &ModuleContext) -> Self {
        NewsFinder::new(ctx.search.clone())
    }
}

impl FromContext for AiClassifier {
    fn from_context(ctx: &ModuleContext) -> Self {
        AiClassifier::new(ctx.ai.clone())
    }
}

impl FromContext for OwnerFinder {
    fn from_context(ctx: &ModuleContext) -> Self {
        OwnerFinder::new(ctx.search.clone(), ctx.ai.clone())
    }
}

impl FromContext for EmailFinder {
    fn from_context(ctx: &ModuleContext) -> Self {
        EmailFinder::new(ctx.fetcher.clone())
    }
}

impl FromContext for RevenueEstimator {
    fn from_context(_ctx: &ModuleContext) -> Self {
        RevenueEstimator
    }
}

/// Build the enrichment chain in execution order, honoring the module toggles.
///
/// Later modules depend on fields produced by earlier ones (the AI classifier
/// needs the scraped description, the email finder prefers the owner name), so
/// the order here is significant.
pub fn build_modules(config: &AppConfig) -> Result<Vec<Box<dyn EnrichmentModule>>> {
    let ctx = ModuleContext::from_app_config(config)?;
    Ok(register_chain(&ctx))
}

/// Register every enabled module from `ctx`, in chain order.
pub fn register_chain(ctx: &ModuleContext) -> Vec<Box<dyn EnrichmentModule>> {
    fn push<M: FromContext>(
        modules: &mut Vec<Box<dyn EnrichmentModule>>,
        ctx: &ModuleContext,
        enabled: bool,
    ) {
        if enabled {
            modules.push(Box::new(M::from_context(ctx)));
        }
    }

    let toggles = &ctx.config.toggles;
    let mut modules: Vec<Box<dyn EnrichmentModule>> = Vec::new();
    push::<DomainNormalizer>(&mut modules, ctx, toggles.domain);
    push::<AboutScraper>(&mut modules, ctx, toggles.about);
    push::<LinkedInFinder>(&mut modules, ctx, toggles.linkedin_finder);
    push::<EcommerceDetector>(&mut modules, ctx, toggles.ecommerce);
    push::<TrafficEstimator>(&mut modules, ctx, toggles.traffic);
    push::<IndustryTagger>(&mut modules, ctx, toggles.industry);
    push::<NewsFinder>(&mut modules, ctx, toggles.news_finder);
    push::<AiClassifier>(&mut modules, ctx, toggles.ai_classifier);
    push::<OwnerFinder>(&mut modules, ctx, toggles.owner_finder);
    push::<EmailFinder>(&mut modules, ctx, toggles.email_finder);
    push::<RevenueEstimator>(&mut modules, ctx, toggles.revenue);

    info!(
        modules = ?modules.iter().map(|m| m.name()).collect::<Vec<_>>(),
        "enrichment chain ready"
    );
    modules
}
