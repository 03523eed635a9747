use anyhow::Context;
use std::sync::Arc;

use crate::module::{InitCtx, Module};

/// Module registry. Modules are initialized and mounted in registration order.
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get all registered modules in registration order
    pub fn modules(&self) -> impl Iterator<Item = &Arc<dyn Module>> {
        self.modules.iter()
    }

    /// Initialize every module
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::sync::Mutex;

    struct TestModule {
        name: &'static str,
        events: Arc<Mutex<Vec<&'static str>>>,
        fail_init: bool,
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            if self.fail_init {
                anyhow::bail!("boom");
            }
            self.events.lock().unwrap().push(self.name);
            Ok(())
        }
    }

    fn module(
        name: &'static str,
        events: &Arc<Mutex<Vec<&'static str>>>,
        fail_init: bool,
    ) -> Arc<dyn Module> {
        Arc::new(TestModule {
            name,
            events: events.clone(),
            fail_init,
        })
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert_eq!(registry.modules().count(), 0);
    }

    #[tokio::test]
    async fn test_modules_init_in_registration_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(module("players", &events, false));
        registry.register(module("books", &events, false));

        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };
        registry.init_modules(&ctx).await.unwrap();

        assert_eq!(*events.lock().unwrap(), vec!["players", "books"]);
        let names: Vec<_> = registry.modules().map(|module| module.name()).collect();
        assert_eq!(names, vec!["players", "books"]);
    }

    #[tokio::test]
    async fn test_init_failure_names_module() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(module("rankings", &events, true));
        registry.register(module("points", &events, false));

        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
        };

        let err = registry.init_modules(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to initialize module 'rankings'");
        assert!(events.lock().unwrap().is_empty());
    }
}
