//! Platform-keyed report sources

use crate::adapters::traits::ReportSource;
use crate::domain::{CampexError, Platform, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each supported platform to the source of its report data
#[derive(Clone, Default)]
pub struct ReportSourceRegistry {
    sources: HashMap<Platform, Arc<dyn ReportSource>>,
}

impl ReportSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` for `platform`, replacing any earlier one
    pub fn register(mut self, platform: Platform, source: Arc<dyn ReportSource>) -> Self {
        self.sources.insert(platform, source);
        self
    }

    /// Registers `source` for every known platform
    pub fn with_all(mut self, source: Arc<dyn ReportSource>) -> Self {
        for platform in Platform::ALL {
            self.sources.insert(platform, source.clone());
        }
        self
    }

    /// # Errors
    ///
    /// Returns [`CampexError::Generation`] when no source serves `platform`.
    pub fn get(&self, platform: Platform) -> Result<Arc<dyn ReportSource>> {
        self.sources.get(&platform).cloned().ok_or_else(|| {
            CampexError::Generation(format!("No report source registered for platform {platform}"))
        })
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.sources.keys().copied().collect();
        platforms.sort_by_key(|p| p.as_str());
        platforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::traits::ReportSource;
    use crate::domain::{Campaign, EventRow, OrganizationContext, PerformanceRow};
    use async_trait::async_trait;

    struct Empty;

    #[async_trait]
    impl ReportSource for Empty {
        async fn performance(
            &self,
            _context: &OrganizationContext,
            _campaign: &Campaign,
        ) -> Result<Vec<PerformanceRow>> {
            Ok(Vec::new())
        }

        async fn events(
            &self,
            _context: &OrganizationContext,
            _campaign: &Campaign,
        ) -> Result<Vec<EventRow>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_unknown_platform_is_generation_error() {
        let registry = ReportSourceRegistry::new().register(Platform::Meta, Arc::new(Empty));
        assert!(registry.get(Platform::Meta).is_ok());
        assert!(matches!(
            registry.get(Platform::TikTok),
            Err(CampexError::Generation(_))
        ));
    }

    #[test]
    fn test_with_all_covers_every_platform() {
        let registry = ReportSourceRegistry::new().with_all(Arc::new(Empty));
        assert_eq!(registry.platforms().len(), Platform::ALL.len());
    }
}
