//! DrifterBuilder - collaborator のワイヤリング
//!
//! # Fail-fast 設計
//! - 必須の collaborator が足りなければ build() 時に BuildError を返す
//! - auto-generate を有効にしたなら ConfigGenerator も必須
//! - Clock / Notifier は省略時に SystemClock / TracingNotifier

use std::sync::Arc;

use crate::app::context::RunSettings;
use crate::app::drifter::Drifter;
use crate::impls::TracingNotifier;
use crate::ports::{
    Checkout, Clock, ConfigGenerator, ConfigParser, Notifier, PlanQuery, ResultCache,
    SystemClock, TerraformOps,
};

/// BuildError は Drifter 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing collaborators: {0:?}. These are required but were not provided.")]
    MissingCollaborators(Vec<&'static str>),
}

/// # 使用例
/// ```ignore
/// let drifter = DrifterBuilder::new(settings)
///     .checkout(GitCheckout::new(token))
///     .config_parser(AtlantisRepoConfigParser)
///     .plan_query(plan_client)
///     .terraform(TerraformCli::default())
///     .cache(FileResultCache::new(dir))
///     .build()?;
/// ```
pub struct DrifterBuilder {
    settings: RunSettings,
    checkout: Option<Arc<dyn Checkout>>,
    config_parser: Option<Arc<dyn ConfigParser>>,
    config_generator: Option<Arc<dyn ConfigGenerator>>,
    plan_query: Option<Arc<dyn PlanQuery>>,
    terraform: Option<Arc<dyn TerraformOps>>,
    cache: Option<Arc<dyn ResultCache>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
}

impl DrifterBuilder {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            settings,
            checkout: None,
            config_parser: None,
            config_generator: None,
            plan_query: None,
            terraform: None,
            cache: None,
            notifier: None,
            clock: None,
        }
    }

    pub fn checkout(mut self, checkout: impl Checkout + 'static) -> Self {
        self.checkout = Some(Arc::new(checkout));
        self
    }

    pub fn config_parser(mut self, parser: impl ConfigParser + 'static) -> Self {
        self.config_parser = Some(Arc::new(parser));
        self
    }

    pub fn config_generator(mut self, generator: impl ConfigGenerator + 'static) -> Self {
        self.config_generator = Some(Arc::new(generator));
        self
    }

    pub fn plan_query(mut self, plan_query: impl PlanQuery + 'static) -> Self {
        self.plan_query = Some(Arc::new(plan_query));
        self
    }

    pub fn terraform(mut self, terraform: impl TerraformOps + 'static) -> Self {
        self.terraform = Some(Arc::new(terraform));
        self
    }

    pub fn cache(mut self, cache: impl ResultCache + 'static) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Shared-handle variants, for callers (tests) that keep their own reference.
    pub fn shared_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn shared_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn shared_plan_query(mut self, plan_query: Arc<dyn PlanQuery>) -> Self {
        self.plan_query = Some(plan_query);
        self
    }

    pub fn shared_terraform(mut self, terraform: Arc<dyn TerraformOps>) -> Self {
        self.terraform = Some(terraform);
        self
    }

    pub fn shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn shared_config_generator(mut self, generator: Arc<dyn ConfigGenerator>) -> Self {
        self.config_generator = Some(generator);
        self
    }

    pub fn build(self) -> Result<Drifter, BuildError> {
        let mut missing = Vec::new();
        if self.checkout.is_none() {
            missing.push("checkout");
        }
        if self.config_parser.is_none() {
            missing.push("config_parser");
        }
        if self.plan_query.is_none() {
            missing.push("plan_query");
        }
        if self.terraform.is_none() {
            missing.push("terraform");
        }
        if self.cache.is_none() {
            missing.push("cache");
        }
        if self.settings.auto_generate_config && self.config_generator.is_none() {
            missing.push("config_generator");
        }

        match (
            self.checkout,
            self.config_parser,
            self.plan_query,
            self.terraform,
            self.cache,
        ) {
            (Some(checkout), Some(config_parser), Some(plan_query), Some(terraform), Some(cache))
                if missing.is_empty() =>
            {
                Ok(Drifter {
                    settings: self.settings,
                    checkout,
                    config_parser,
                    config_generator: self.config_generator,
                    plan_query,
                    terraform,
                    cache,
                    notifier: self
                        .notifier
                        .unwrap_or_else(|| Arc::new(TracingNotifier)),
                    clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                })
            }
            _ => Err(BuildError::MissingCollaborators(missing)),
        }
    }
}
