use std::{borrow::Cow, sync::Arc};
use tracing::{debug, error, info, warn};

use crate::any::{self, downcast, TypeInfo};

/// Service locator owned by the host.
///
/// Built at startup and cheap to clone. Services stored here are the ones the host manages
/// itself; they reach the backend through [`crate::RegistryBuilder::cross_wire`].
#[derive(Clone, Default)]
pub struct HostServices {
    map: Arc<any::Map>,
}

impl HostServices {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with<T: Send + Sync + 'static>(mut self, service: T) -> Self {
        self.insert(service);
        self
    }

    #[inline]
    pub fn insert<T: Send + Sync + 'static>(&mut self, service: T) {
        self.insert_arc(Arc::new(service));
    }

    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, service: Arc<T>) {
        let type_info = TypeInfo::of::<T>();
        if Arc::make_mut(&mut self.map).insert(type_info, service).is_some() {
            debug!(service = type_info.name, "Host service replaced");
        }
    }

    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let instance = self.map.get(&TypeInfo::of::<T>()).cloned()?;
        downcast(instance).ok()
    }

    #[inline]
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeInfo::of::<T>())
    }
}

/// Host logging facility. Creates [`Logger`]s that write through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggerFactory {
    application: Cow<'static, str>,
}

impl LoggerFactory {
    #[inline]
    #[must_use]
    pub fn new(application: impl Into<Cow<'static, str>>) -> Self {
        Self {
            application: application.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }

    #[inline]
    #[must_use]
    pub fn create_logger(&self, category: impl Into<Cow<'static, str>>) -> Logger {
        Logger {
            application: self.application.clone(),
            category: category.into(),
        }
    }

    /// Creates a logger categorized by the short name of `T`.
    #[inline]
    #[must_use]
    pub fn logger_for<T: ?Sized + 'static>(&self) -> Logger {
        self.create_logger(TypeInfo::of::<T>().short_name())
    }
}

#[derive(Debug, Clone)]
pub struct Logger {
    application: Cow<'static, str>,
    category: Cow<'static, str>,
}

impl Logger {
    #[inline]
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn debug(&self, message: &str) {
        debug!(application = %self.application, category = %self.category, "{message}");
    }

    pub fn info(&self, message: &str) {
        info!(application = %self.application, category = %self.category, "{message}");
    }

    pub fn warn(&self, message: &str) {
        warn!(application = %self.application, category = %self.category, "{message}");
    }

    pub fn error(&self, message: &str) {
        error!(application = %self.application, category = %self.category, "{message}");
    }
}
