use std::{marker::PhantomData, sync::Arc};
use tracing::debug;

use crate::{
    any::Instance,
    dependency_resolver::DependencyResolver,
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    resolver::Resolver,
};

pub trait Instantiator<Deps>: Clone + 'static
where
    Deps: DependencyResolver,
{
    type Provides: Send + Sync + 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&mut self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;
}

pub(crate) trait ErasedInstantiator: Send + Sync {
    fn instantiate(&self, resolver: &Resolver<'_>) -> Result<Instance, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;
}

pub(crate) type BoxedInstantiator = Arc<dyn ErasedInstantiator>;

struct InstantiatorFn<Inst, Deps> {
    instantiator: Inst,
    _deps: PhantomData<fn() -> Deps>,
}

impl<Inst, Deps> ErasedInstantiator for InstantiatorFn<Inst, Deps>
where
    Inst: Instantiator<Deps> + Send + Sync,
    Deps: DependencyResolver,
{
    fn instantiate(&self, resolver: &Resolver<'_>) -> Result<Instance, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>> {
        let dependencies = match Deps::resolve(resolver) {
            Ok(dependencies) => dependencies,
            Err(err) => return Err(InstantiatorErrorKind::Deps(err.into())),
        };
        let dependency = match self.instantiator.clone().instantiate(dependencies) {
            Ok(dependency) => dependency,
            Err(err) => return Err(InstantiatorErrorKind::Factory(err.into())),
        };

        debug!("Instantiated");

        Ok(Arc::new(dependency))
    }
}

#[must_use]
pub(crate) fn boxed_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedInstantiator
where
    Inst: Instantiator<Deps> + Send + Sync,
    Deps: DependencyResolver + 'static,
{
    Arc::new(InstantiatorFn {
        instantiator,
        _deps: PhantomData,
    })
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: FnMut($($ty,)*) -> Result<Response, Err> + Clone + 'static,
            Response: Send + Sync + 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver, )*
        {
            type Provides = Response;
            type Error = Err;

            fn instantiate(&mut self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, Self::Error> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);

/// Wrapper to create an instantiator that just returns passed value.
/// It can be used when the value was created outside the backend.
#[inline]
#[must_use]
pub fn instance<T>(val: T) -> impl Instantiator<(), Provides = T, Error = InstantiateErrorKind> + Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    move || Ok(val.clone())
}

/// Creates a `Box<dyn Trait>` from a value, optionally including supertraits.
///
/// Resolution works with concrete types, so services exposed as a trait are registered
/// under their boxed trait object type.
///
/// # Syntax
/// ```text
/// boxed!(value; Trait [+ SuperTrait1 [+ SuperTrait2 ...]])
/// ```
///
/// # Examples
/// ```rust
/// use scopewire::boxed;
///
/// trait UserService {}
///
/// struct AspNetUserService;
///
/// impl UserService for AspNetUserService {}
///
/// let service: Box<dyn UserService + Send + Sync> = boxed!(AspNetUserService; UserService + Send + Sync);
/// ```
#[macro_export]
macro_rules! boxed {
    ($val:expr ; $trait:tt $($super_traits:tt)*) => {{
        Box::new($val) as Box<dyn $r#trait $($super_traits)*>
    }};
}

#[cfg(test)]
mod tests {
    use super::{DependencyResolver, InstantiateErrorKind, Instantiator};

    #[test]
    #[allow(dead_code)]
    fn test_factory_helper() {
        fn resolver<Deps: DependencyResolver, F: Instantiator<Deps>>(_f: F) {}
        fn resolver_with_dep<Deps: DependencyResolver>() {
            resolver(|| Ok::<_, InstantiateErrorKind>(()));
            resolver(|| Ok::<_, anyhow::Error>(1u8));
        }
    }
}
