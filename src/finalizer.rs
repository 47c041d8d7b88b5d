use std::{marker::PhantomData, sync::Arc};

use crate::any::{downcast, Instance, TypeInfo};

/// Releases a scoped or singleton dependency when its owner ends.
///
/// An error or a panic doesn't stop the teardown: it's logged as a [`crate::DisposalAnomaly`].
pub trait Finalizer<Dep>: Clone + 'static {
    #[allow(clippy::missing_errors_doc)]
    fn finalize(&mut self, dependency: Arc<Dep>) -> Result<(), anyhow::Error>;
}

impl<F, Dep, Err> Finalizer<Dep> for F
where
    F: FnMut(Arc<Dep>) -> Result<(), Err> + Clone + 'static,
    Err: Into<anyhow::Error>,
{
    #[inline]
    fn finalize(&mut self, dependency: Arc<Dep>) -> Result<(), anyhow::Error> {
        self(dependency).map_err(Into::into)
    }
}

pub(crate) trait ErasedFinalizer: Send + Sync {
    fn finalize(&self, dependency: Instance) -> Result<(), anyhow::Error>;
}

pub(crate) type BoxedFinalizer = Arc<dyn ErasedFinalizer>;

struct FinalizerFn<Fin, Dep> {
    finalizer: Fin,
    _dep: PhantomData<fn(Dep)>,
}

impl<Fin, Dep> ErasedFinalizer for FinalizerFn<Fin, Dep>
where
    Fin: Finalizer<Dep> + Send + Sync,
    Dep: Send + Sync + 'static,
{
    fn finalize(&self, dependency: Instance) -> Result<(), anyhow::Error> {
        let dependency = downcast::<Dep>(dependency)
            .map_err(|actual| anyhow::anyhow!("Finalizer of `{}` got an instance of {actual:?}", TypeInfo::of::<Dep>()))?;
        self.finalizer.clone().finalize(dependency)
    }
}

#[must_use]
pub(crate) fn boxed_finalizer<Dep, Fin>(finalizer: Fin) -> BoxedFinalizer
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep> + Send + Sync,
{
    Arc::new(FinalizerFn {
        finalizer,
        _dep: PhantomData,
    })
}

#[cfg(test)]
mod tests {
    use super::{boxed_finalizer, Finalizer};
    use crate::any::Instance;

    use std::{
        convert::Infallible,
        sync::{
            atomic::{AtomicU8, Ordering},
            Arc,
        },
    };

    #[test]
    fn test_boxed_finalizer() {
        let call_count = Arc::new(AtomicU8::new(0));
        let finalizer = boxed_finalizer({
            let call_count = call_count.clone();
            move |value: Arc<u8>| {
                call_count.fetch_add(*value, Ordering::SeqCst);
                Ok::<_, Infallible>(())
            }
        });

        finalizer.finalize(Arc::new(2u8)).unwrap();
        finalizer.finalize(Arc::new(3u8)).unwrap();

        assert_eq!(call_count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_boxed_finalizer_incorrect_type() {
        let finalizer = boxed_finalizer(|_: Arc<u8>| Ok::<_, Infallible>(()));
        let instance: Instance = Arc::new("not u8");

        assert!(finalizer.finalize(instance).is_err());
    }

    #[test]
    #[allow(dead_code)]
    fn test_finalizer_impls() {
        fn finalizer<Dep, F: Finalizer<Dep>>(_f: F) {}
        fn finalizer_with_dep<Dep: 'static>() {
            finalizer(|_: Arc<Dep>| Ok::<_, anyhow::Error>(()));
        }
    }
}
