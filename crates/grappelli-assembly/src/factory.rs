//! # Typed Factories
//!
//! Bridges plain Rust functions into the engine's erased invocables. A
//! factory's parameter types declare its dependency sites: `Arc<T>` is a
//! required dependency on `T`, `Option<Arc<T>>` an optional one. The same
//! derivation covers constructors, fallible constructors, provider methods
//! and member setters, up to eight dependency parameters.

use std::sync::Arc;

use grappelli_core::descriptor::Declared;
use grappelli_core::provider::Value;

/// A factory parameter type that knows its dependency site and how to build
/// itself from the resolved slot.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use grappelli_assembly::FromResolved;
///
/// let required = <Arc<String> as FromResolved>::declared();
/// let optional = <Option<Arc<String>> as FromResolved>::declared();
/// assert!(required.is_shared());
/// assert!(optional.is_shared());
/// ```
pub trait FromResolved: Sized + Send + Sync + 'static {
	/// The dependency site this parameter declares.
	fn declared() -> Declared;

	/// Builds the parameter from its resolved slot. `None` means an optional
	/// dependency that nothing provides.
	fn from_resolved(slot: Option<&Value>) -> anyhow::Result<Self>;
}

impl<T: Send + Sync + 'static> FromResolved for Arc<T> {
	fn declared() -> Declared {
		Declared::value::<T>().shared()
	}

	fn from_resolved(slot: Option<&Value>) -> anyhow::Result<Self> {
		let value = slot.ok_or_else(|| {
			anyhow::anyhow!(
				"required argument of type {} was not supplied",
				std::any::type_name::<T>()
			)
		})?;
		value
			.clone()
			.downcast::<T>()
			.map_err(|_| anyhow::anyhow!("argument does not hold a {}", std::any::type_name::<T>()))
	}
}

impl<T: Send + Sync + 'static> FromResolved for Option<Arc<T>> {
	fn declared() -> Declared {
		Declared::value::<T>().shared().optional()
	}

	fn from_resolved(slot: Option<&Value>) -> anyhow::Result<Self> {
		match slot {
			None => Ok(None),
			Some(value) => value.clone().downcast::<T>().map(Some).map_err(|_| {
				anyhow::anyhow!("argument does not hold a {}", std::any::type_name::<T>())
			}),
		}
	}
}

/// A function usable as a bean factory. Implemented for `Fn` taking up to
/// eight [`FromResolved`] parameters and returning the bean value.
pub trait BeanFunction<Args>: Send + Sync + 'static {
	type Output: Send + Sync + 'static;

	/// Dependency sites derived from the parameter types, in order.
	fn declared_sites() -> Vec<Declared>;

	/// Invokes the function against resolved argument slots.
	fn call(&self, args: &[Option<Value>]) -> anyhow::Result<Self::Output>;
}

/// A bean factory that can fail. Implemented for `Fn` returning
/// `Result<T, E>` for any error convertible into [`anyhow::Error`].
pub trait FallibleBeanFunction<Args>: Send + Sync + 'static {
	type Output: Send + Sync + 'static;

	fn declared_sites() -> Vec<Declared>;

	fn call(&self, args: &[Option<Value>]) -> anyhow::Result<Self::Output>;
}

/// A member setter: runs against the instance under construction with its own
/// resolved dependencies.
pub trait SetterFunction<Receiver, Args>: Send + Sync + 'static {
	fn declared_sites() -> Vec<Declared>;

	fn apply(&self, receiver: &mut Receiver, args: &[Option<Value>]) -> anyhow::Result<()>;
}

macro_rules! impl_typed_functions {
	($($param:ident),*) => {
		#[allow(non_snake_case)]
		impl<Func, Out, $($param,)*> BeanFunction<($($param,)*)> for Func
		where
			Func: Fn($($param),*) -> Out + Send + Sync + 'static,
			Out: Send + Sync + 'static,
			$($param: FromResolved,)*
		{
			type Output = Out;

			fn declared_sites() -> Vec<Declared> {
				vec![$($param::declared()),*]
			}

			fn call(&self, args: &[Option<Value>]) -> anyhow::Result<Out> {
				let [$($param,)*] = args else {
					anyhow::bail!("factory received {} argument slot(s)", args.len());
				};
				Ok(self($($param::from_resolved($param.as_ref())?),*))
			}
		}

		#[allow(non_snake_case)]
		impl<Func, Out, Err, $($param,)*> FallibleBeanFunction<($($param,)*)> for Func
		where
			Func: Fn($($param),*) -> Result<Out, Err> + Send + Sync + 'static,
			Out: Send + Sync + 'static,
			Err: Into<anyhow::Error>,
			$($param: FromResolved,)*
		{
			type Output = Out;

			fn declared_sites() -> Vec<Declared> {
				vec![$($param::declared()),*]
			}

			fn call(&self, args: &[Option<Value>]) -> anyhow::Result<Out> {
				let [$($param,)*] = args else {
					anyhow::bail!("factory received {} argument slot(s)", args.len());
				};
				self($($param::from_resolved($param.as_ref())?),*).map_err(Into::into)
			}
		}

		#[allow(non_snake_case)]
		impl<Func, Receiver, $($param,)*> SetterFunction<Receiver, ($($param,)*)> for Func
		where
			Func: Fn(&mut Receiver, $($param),*) + Send + Sync + 'static,
			Receiver: Send + Sync + 'static,
			$($param: FromResolved,)*
		{
			fn declared_sites() -> Vec<Declared> {
				vec![$($param::declared()),*]
			}

			fn apply(&self, receiver: &mut Receiver, args: &[Option<Value>]) -> anyhow::Result<()> {
				let [$($param,)*] = args else {
					anyhow::bail!("setter received {} argument slot(s)", args.len());
				};
				self(receiver, $($param::from_resolved($param.as_ref())?),*);
				Ok(())
			}
		}
	};
}

impl_typed_functions!();
impl_typed_functions!(A1);
impl_typed_functions!(A1, A2);
impl_typed_functions!(A1, A2, A3);
impl_typed_functions!(A1, A2, A3, A4);
impl_typed_functions!(A1, A2, A3, A4, A5);
impl_typed_functions!(A1, A2, A3, A4, A5, A6);
impl_typed_functions!(A1, A2, A3, A4, A5, A6, A7);
impl_typed_functions!(A1, A2, A3, A4, A5, A6, A7, A8);
