//! Values flowing through a chain: entities, invocation outcomes and the
//! asynchronous containers the unwrapping stages resolve.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use crate::error::RestError;
use crate::response::RestResponse;

/// A type-erased value together with its type identity.
pub struct Entity {
    value: Box<dyn Any + Send>,
    type_id: TypeId,
    type_name: &'static str,
}

impl Entity {
    /// Wraps a value.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wraps an already boxed value, whose concrete type is read from the box.
    pub fn from_boxed(value: Box<dyn Any + Send>, type_name: &'static str) -> Self {
        let type_id = (*value).type_id();
        Self {
            value,
            type_id,
            type_name,
        }
    }

    /// The `TypeId` of the wrapped value.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The type name of the wrapped value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The lookup key of the wrapped value's type.
    pub fn type_key(&self) -> TypeKey {
        TypeKey {
            id: self.type_id,
            name: self.type_name,
        }
    }

    /// Returns true if the value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrows the value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    /// Mutably borrows the value as `T`.
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut()
    }

    /// Takes the value out as `T`, handing the entity back on mismatch.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let Self {
            value,
            type_id,
            type_name,
        } = self;
        value.downcast::<T>().map(|v| *v).map_err(|value| Self {
            value,
            type_id,
            type_name,
        })
    }

    /// Unwraps into the boxed value.
    pub fn into_inner(self) -> Box<dyn Any + Send> {
        self.value
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A stable identifier for a type, used to look up sub-resource chains.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// The key for `T`.
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The type name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl std::hash::Hash for TypeKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// An object returned by a locator method, to be routed further.
///
/// Lookup keys are tried in order: the concrete type first, then whatever
/// was added with [`SubResource::implements`] (interfaces, then supertypes),
/// exactly as registered.
pub struct SubResource {
    instance: Arc<dyn Any + Send + Sync>,
    lookup: Vec<TypeKey>,
}

impl SubResource {
    /// Wraps a sub-resource instance keyed by its concrete type.
    pub fn new<T: Any + Send + Sync>(instance: T) -> Self {
        Self {
            instance: Arc::new(instance),
            lookup: vec![TypeKey::of::<T>()],
        }
    }

    /// Adds a fallback lookup key.
    #[must_use]
    pub fn implements(mut self, key: TypeKey) -> Self {
        self.lookup.push(key);
        self
    }

    /// Lookup keys in priority order.
    pub fn lookup_keys(&self) -> &[TypeKey] {
        &self.lookup
    }

    /// The instance, shared with the sub-resource chain.
    pub fn instance(&self) -> &Arc<dyn Any + Send + Sync> {
        &self.instance
    }
}

impl fmt::Debug for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubResource")
            .field("lookup", &self.lookup)
            .finish_non_exhaustive()
    }
}

/// What a resource method produced.
pub enum Returned {
    /// No entity (`void`).
    Empty,
    /// A plain value to be written.
    Entity(Entity),
    /// A complete response description.
    Response(RestResponse),
    /// A future producing the eventual outcome.
    Future(BoxFuture<'static, Outcome>),
    /// A callback-completed promise producing the eventual outcome.
    Deferred(Deferred),
    /// An object to route the remaining path against.
    SubResource(SubResource),
}

impl fmt::Debug for Returned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Entity(e) => f.debug_tuple("Entity").field(e).finish(),
            Self::Response(r) => f.debug_tuple("Response").field(r).finish(),
            Self::Future(_) => f.write_str("Future(..)"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::SubResource(s) => f.debug_tuple("SubResource").field(s).finish(),
        }
    }
}

/// Tagged result of invoking application code.
///
/// `ErrorResponse` is the structured "this error already is a response"
/// branch; `Fault` goes through exception mapping.
#[derive(Debug)]
pub enum Outcome {
    /// Normal return.
    Success(Returned),
    /// An error that is answered with this response verbatim.
    ErrorResponse(RestResponse),
    /// An error for exception mapping.
    Fault(RestError),
}

impl Outcome {
    /// Returns a plain value.
    pub fn ok<T: Any + Send>(value: T) -> Self {
        Self::Success(Returned::Entity(Entity::new(value)))
    }

    /// Returns nothing.
    pub fn empty() -> Self {
        Self::Success(Returned::Empty)
    }

    /// Returns a full response.
    pub fn response(response: RestResponse) -> Self {
        Self::Success(Returned::Response(response))
    }

    /// Returns a future resolving to the outcome.
    pub fn future<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Outcome> + Send + 'static,
    {
        Self::Success(Returned::Future(Box::pin(future)))
    }

    /// Returns a promise completed later through its [`Completer`].
    pub fn deferred(deferred: Deferred) -> Self {
        Self::Success(Returned::Deferred(deferred))
    }

    /// Returns a sub-resource for further routing.
    pub fn sub_resource(sub: SubResource) -> Self {
        Self::Success(Returned::SubResource(sub))
    }

    /// Fails with an error for exception mapping.
    pub fn fault(error: RestError) -> Self {
        Self::Fault(error)
    }
}

impl<T: Any + Send, E: std::error::Error + Send + Sync + 'static> From<Result<T, E>> for Outcome {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(error) => Self::Fault(RestError::application(error)),
        }
    }
}

type Callback = Box<dyn FnOnce(Outcome) + Send>;

enum DeferredState {
    Waiting,
    Listening(Callback),
    Completed(Outcome),
    Done,
}

/// A single-value promise completed by callback rather than polled.
///
/// # Example
///
/// ```
/// use hermes_core::{Deferred, Outcome};
///
/// let (deferred, completer) = Deferred::new();
/// completer.complete(Outcome::ok(5_u32));
/// deferred.on_complete(|outcome| assert!(matches!(outcome, Outcome::Success(_))));
/// ```
pub struct Deferred {
    state: Arc<Mutex<DeferredState>>,
}

/// The completing half of a [`Deferred`].
///
/// Dropping it without completing yields an internal error.
pub struct Completer {
    state: Option<Arc<Mutex<DeferredState>>>,
}

impl Deferred {
    /// Creates a pending promise and its completer.
    pub fn new() -> (Self, Completer) {
        let state = Arc::new(Mutex::new(DeferredState::Waiting));
        (
            Self {
                state: state.clone(),
            },
            Completer { state: Some(state) },
        )
    }

    /// Registers the completion listener; runs it at once if already
    /// completed, otherwise on the completer's thread.
    pub fn on_complete(self, callback: impl FnOnce(Outcome) + Send + 'static) {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, DeferredState::Done) {
            DeferredState::Completed(outcome) => {
                drop(state);
                callback(outcome);
            }
            DeferredState::Waiting => *state = DeferredState::Listening(Box::new(callback)),
            other => *state = other,
        }
    }
}

impl Completer {
    /// Completes the promise.
    pub fn complete(mut self, outcome: Outcome) {
        self.fire(outcome);
    }

    fn fire(&mut self, outcome: Outcome) {
        let Some(state) = self.state.take() else {
            return;
        };
        let mut guard = state.lock();
        match std::mem::replace(&mut *guard, DeferredState::Done) {
            DeferredState::Listening(callback) => {
                drop(guard);
                callback(outcome);
            }
            DeferredState::Waiting => *guard = DeferredState::Completed(outcome),
            other => *guard = other,
        }
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if self.state.is_some() {
            self.fire(Outcome::Fault(RestError::internal(
                "deferred result dropped without completion",
            )));
        }
    }
}

/// Converted parameter values for one invocation, addressed by slot.
pub struct Arguments<'a> {
    instance: Option<&'a Arc<dyn Any + Send + Sync>>,
    slots: &'a mut [Option<Box<dyn Any + Send>>],
}

impl<'a> Arguments<'a> {
    /// Creates an argument view.
    pub fn new(
        instance: Option<&'a Arc<dyn Any + Send + Sync>>,
        slots: &'a mut [Option<Box<dyn Any + Send>>],
    ) -> Self {
        Self { instance, slots }
    }

    /// The resource instance as `T`.
    pub fn instance<T: Any>(&self) -> Option<&T> {
        self.instance.and_then(|i| i.downcast_ref::<T>())
    }

    /// The resource instance as `T`, or an internal error.
    pub fn require_instance<T: Any>(&self) -> Result<&T, RestError> {
        self.instance::<T>().ok_or_else(|| {
            RestError::internal(format!(
                "resource instance is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Borrows slot `index` as `T`.
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref()?.downcast_ref()
    }

    /// Moves slot `index` out as `T`.
    pub fn take<T: Any>(&mut self, index: usize) -> Result<T, RestError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| RestError::internal(format!("no parameter slot {index}")))?;
        let value = slot
            .take()
            .ok_or_else(|| RestError::internal(format!("parameter slot {index} is empty")))?;
        match value.downcast::<T>() {
            Ok(v) => Ok(*v),
            Err(original) => {
                *slot = Some(original);
                Err(RestError::internal(format!(
                    "parameter slot {index} is not a {}",
                    std::any::type_name::<T>()
                )))
            }
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
