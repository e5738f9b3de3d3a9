//! Declaring resources and assembling their handler chains.
//!
//! An application is a set of [`ResourceClass`]es, each a path prefix plus
//! [`ResourceMethod`]s, and sub-resource classes reachable through locator
//! methods. [`ApplicationBuilder::build`] turns the declarations into
//! immutable [`RuntimeResource`]s and a [`Dispatcher`].

use std::any::Any;
use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use hermes_core::{
    chain, Arguments, DeploymentBuilder, DispatchSettings, ErrorCategory, Executors,
    HandlerChain, LocatableResource, Outcome, ResourceRoutes, RestError, RestHandler,
    RestResponse, RuntimeResource, Serialisers, TypeKey,
};
use hermes_router::{PathTemplate, TemplateError};
use http::Method;
use mime::Mime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Handle;

use crate::bean::{BeanFactory, Singleton};
use crate::dispatcher::Dispatcher;
use crate::interceptor::{Interceptors, RequestFilter, ResponseFilter};
use crate::param::{
    Defaulted, HeaderParam, NamedPathParam, Optional, ParameterConverter, ParameterExtractor,
    QueryParam, Required,
};
use crate::stages::{
    BlockingHandler, DeferredResultHandler, ExceptionHandler, FixedProducesHandler, FnInvoker,
    FutureResultHandler, InputHandler, InstanceHandler, InvocationHandler, Invoker,
    MediaTypeRoutingHandler, ParameterHandler, RequestDeserializeHandler, RequestFilterHandler,
    ResourceLocatorHandler, ResponseFilterHandler, ResponseHandler, ResponseWriterHandler,
    RoutingHandler, VariableProducesHandler,
};

/// Errors detected while assembling an application.
#[derive(Error, Debug)]
pub enum DeploymentError {
    /// A path template could not be parsed.
    #[error("invalid path template: {0}")]
    InvalidTemplate(#[from] TemplateError),

    /// Two methods share method, path and media types, so no request could
    /// ever choose between them.
    #[error("ambiguous resource methods for {method} {path}")]
    Ambiguous {
        /// The HTTP method.
        method: Method,
        /// The full path template.
        path: String,
    },
}

struct ParamSpec {
    index: usize,
    name: String,
    extractor: Arc<dyn ParameterExtractor>,
    converter: Arc<dyn ParameterConverter>,
}

/// One resource method: its HTTP method, path, media types, parameters and
/// the code to invoke.
///
/// Parameters are stored in slots numbered in declaration order; the
/// invoker reads them back from [`Arguments`] by the same index.
///
/// # Example
///
/// ```
/// use hermes_core::Outcome;
/// use hermes_handlers::ResourceMethod;
///
/// let get = ResourceMethod::get(|mut args| {
///     let id: u64 = args.take(0)?;
///     Ok(Outcome::ok(format!("widget {id}")))
/// })
/// .path("/{id}")
/// .path_param::<u64>("id")
/// .produces(mime::TEXT_PLAIN);
/// # let _ = get;
/// ```
pub struct ResourceMethod {
    http_method: Option<Method>,
    path: String,
    name: Option<String>,
    consumes: Vec<Mime>,
    produces: Vec<Mime>,
    params: Vec<ParamSpec>,
    body: Option<(usize, TypeKey)>,
    blocking: Option<bool>,
    invoker: Arc<dyn Invoker>,
    slots: usize,
}

impl fmt::Debug for ResourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceMethod")
            .field("method", &self.http_method)
            .field("path", &self.path)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl ResourceMethod {
    /// A method answering `method` requests.
    pub fn new<F>(method: Method, f: F) -> Self
    where
        F: Fn(Arguments<'_>) -> Result<Outcome, RestError> + Send + Sync + 'static,
    {
        Self::with_invoker(Some(method), Arc::new(FnInvoker::new(f)))
    }

    /// A sub-resource locator: matches any method on a path prefix and
    /// returns the object the rest of the path is routed against.
    pub fn locator<F>(f: F) -> Self
    where
        F: Fn(Arguments<'_>) -> Result<Outcome, RestError> + Send + Sync + 'static,
    {
        Self::with_invoker(None, Arc::new(FnInvoker::new(f)))
    }

    /// A method backed by any [`Invoker`]; `None` makes it a locator.
    pub fn with_invoker(method: Option<Method>, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            http_method: method,
            path: String::new(),
            name: None,
            consumes: Vec::new(),
            produces: Vec::new(),
            params: Vec::new(),
            body: None,
            blocking: None,
            invoker,
            slots: 0,
        }
    }

    /// A GET method.
    pub fn get<F>(f: F) -> Self
    where
        F: Fn(Arguments<'_>) -> Result<Outcome, RestError> + Send + Sync + 'static,
    {
        Self::new(Method::GET, f)
    }

    /// A POST method.
    pub fn post<F>(f: F) -> Self
    where
        F: Fn(Arguments<'_>) -> Result<Outcome, RestError> + Send + Sync + 'static,
    {
        Self::new(Method::POST, f)
    }

    /// A PUT method.
    pub fn put<F>(f: F) -> Self
    where
        F: Fn(Arguments<'_>) -> Result<Outcome, RestError> + Send + Sync + 'static,
    {
        Self::new(Method::PUT, f)
    }

    /// A DELETE method.
    pub fn delete<F>(f: F) -> Self
    where
        F: Fn(Arguments<'_>) -> Result<Outcome, RestError> + Send + Sync + 'static,
    {
        Self::new(Method::DELETE, f)
    }

    /// Path template relative to the class path.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Diagnostic name; defaults to `Class::METHOD path`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a consumed media type.
    #[must_use]
    pub fn consumes(mut self, media_type: Mime) -> Self {
        self.consumes.push(media_type);
        self
    }

    /// Adds a produced media type.
    #[must_use]
    pub fn produces(mut self, media_type: Mime) -> Self {
        self.produces.push(media_type);
        self
    }

    /// Runs the method on the blocking executor, or explicitly not.
    #[must_use]
    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = Some(blocking);
        self
    }

    /// Adds a parameter with a custom extractor and converter.
    #[must_use]
    pub fn param(
        mut self,
        name: impl Into<String>,
        extractor: Arc<dyn ParameterExtractor>,
        converter: Arc<dyn ParameterConverter>,
    ) -> Self {
        self.params.push(ParamSpec {
            index: self.slots,
            name: name.into(),
            extractor,
            converter,
        });
        self.slots += 1;
        self
    }

    /// A required path parameter, looked up by name through enclosing
    /// resources too.
    #[must_use]
    pub fn path_param<T>(self, name: &str) -> Self
    where
        T: FromStr + Send + 'static,
        T::Err: Display,
    {
        self.param(
            name,
            Arc::new(NamedPathParam::new(name)),
            Arc::new(Required::<T>::new()),
        )
    }

    /// A required query parameter.
    #[must_use]
    pub fn query_param<T>(self, name: &str) -> Self
    where
        T: FromStr + Send + 'static,
        T::Err: Display,
    {
        self.param(
            name,
            Arc::new(QueryParam::new(name)),
            Arc::new(Required::<T>::new()),
        )
    }

    /// An optional query parameter, stored as `Option<T>`.
    #[must_use]
    pub fn optional_query<T>(self, name: &str) -> Self
    where
        T: FromStr + Send + 'static,
        T::Err: Display,
    {
        self.param(
            name,
            Arc::new(QueryParam::new(name)),
            Arc::new(Optional::<T>::new()),
        )
    }

    /// A query parameter with a default value.
    #[must_use]
    pub fn query_param_or<T>(self, name: &str, default: &str) -> Self
    where
        T: FromStr + Send + 'static,
        T::Err: Display,
    {
        self.param(
            name,
            Arc::new(QueryParam::new(name)),
            Arc::new(Defaulted::<T>::new(default)),
        )
    }

    /// An optional header, stored as `Option<T>`.
    #[must_use]
    pub fn header_param<T>(self, name: &str) -> Self
    where
        T: FromStr + Send + 'static,
        T::Err: Display,
    {
        self.param(
            name,
            Arc::new(HeaderParam::new(name)),
            Arc::new(Optional::<T>::new()),
        )
    }

    /// The request body, decoded as `T` by a registered reader.
    #[must_use]
    pub fn body<T: Any + Send>(mut self) -> Self {
        self.body = Some((self.slots, TypeKey::of::<T>()));
        self.slots += 1;
        self
    }

    fn is_locator(&self) -> bool {
        self.http_method.is_none()
    }
}

/// A group of resource methods under a common path and instance factory.
pub struct ResourceClass {
    name: String,
    path: String,
    factory: Option<Arc<dyn BeanFactory>>,
    methods: Vec<ResourceMethod>,
}

impl fmt::Debug for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClass")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

impl ResourceClass {
    /// A class mounted at `path`. Sub-resource classes usually use `""`.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            factory: None,
            methods: Vec::new(),
        }
    }

    /// Creates instances with `factory`.
    #[must_use]
    pub fn factory(mut self, factory: Arc<dyn BeanFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Shares `instance` across requests.
    #[must_use]
    pub fn singleton<T: Any + Send + Sync>(self, instance: T) -> Self {
        self.factory(Arc::new(Singleton::new(instance)))
    }

    /// Adds a method.
    #[must_use]
    pub fn method(mut self, method: ResourceMethod) -> Self {
        self.methods.push(method);
        self
    }
}

/// Assembles resources, codecs, mappers and filters into a [`Dispatcher`].
///
/// # Example
///
/// ```
/// use hermes_core::Outcome;
/// use hermes_handlers::{ApplicationBuilder, ResourceClass, ResourceMethod};
///
/// let dispatcher = ApplicationBuilder::new()
///     .resource(
///         ResourceClass::new("Hello", "/hello")
///             .method(ResourceMethod::get(|_| Ok(Outcome::ok("hello")))),
///     )
///     .build()
///     .unwrap();
/// assert!(dispatcher.routes().knows("/hello"));
/// ```
#[derive(Default)]
pub struct ApplicationBuilder {
    deployment: DeploymentBuilder,
    interceptors: Interceptors,
    resources: Vec<ResourceClass>,
    sub_resources: Vec<(TypeKey, ResourceClass)>,
}

impl fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("resources", &self.resources)
            .field("sub_resources", &self.sub_resources.len())
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

impl ApplicationBuilder {
    /// An empty application with the default codecs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root resource class.
    #[must_use]
    pub fn resource(mut self, class: ResourceClass) -> Self {
        self.resources.push(class);
        self
    }

    /// Registers the routes of sub-resources of type `T`.
    #[must_use]
    pub fn sub_resource<T: Any + ?Sized>(self, class: ResourceClass) -> Self {
        self.sub_resource_for(TypeKey::of::<T>(), class)
    }

    /// Registers the routes of sub-resources found under `key`.
    #[must_use]
    pub fn sub_resource_for(mut self, key: TypeKey, class: ResourceClass) -> Self {
        self.sub_resources.push((key, class));
        self
    }

    /// Adds a post-match request filter.
    #[must_use]
    pub fn request_filter(mut self, priority: i32, filter: Arc<dyn RequestFilter>) -> Self {
        self.interceptors.add_request_filter(priority, filter);
        self
    }

    /// Adds a pre-match request filter.
    #[must_use]
    pub fn pre_match_filter(mut self, priority: i32, filter: Arc<dyn RequestFilter>) -> Self {
        self.interceptors.add_pre_match_filter(priority, filter);
        self
    }

    /// Adds a response filter.
    #[must_use]
    pub fn response_filter(mut self, priority: i32, filter: Arc<dyn ResponseFilter>) -> Self {
        self.interceptors.add_response_filter(priority, filter);
        self
    }

    /// Maps application errors of type `E`.
    #[must_use]
    pub fn exception_mapper<E, F>(mut self, f: F) -> Self
    where
        E: std::error::Error + 'static,
        F: Fn(&E) -> RestResponse + Send + Sync + 'static,
    {
        self.deployment.exception_mappers_mut().register::<E, F>(f);
        self
    }

    /// Maps every error of `category`.
    #[must_use]
    pub fn category_mapper<F>(mut self, category: ErrorCategory, f: F) -> Self
    where
        F: Fn(&RestError) -> RestResponse + Send + Sync + 'static,
    {
        self.deployment
            .exception_mappers_mut()
            .register_category(category, f);
        self
    }

    /// Registers JSON reading and writing for `T`.
    #[must_use]
    pub fn register_json<T>(mut self) -> Self
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        self.deployment.serialisers_mut().register_json::<T>();
        self
    }

    /// Mutable access to the codec registry.
    pub fn serialisers_mut(&mut self) -> &mut Serialisers {
        self.deployment.serialisers_mut()
    }

    /// Sets limits and defaults.
    #[must_use]
    pub fn settings(mut self, settings: DispatchSettings) -> Self {
        self.deployment = self.deployment.settings(settings);
        self
    }

    /// Uses the given executors.
    #[must_use]
    pub fn executors(mut self, executors: Executors) -> Self {
        self.deployment = self.deployment.executors(executors);
        self
    }

    /// Spawns body reads and async results on `handle`.
    #[must_use]
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.deployment = self.deployment.runtime(handle);
        self
    }

    /// Builds every chain and the dispatcher.
    pub fn build(self) -> Result<Dispatcher, DeploymentError> {
        let Self {
            mut deployment,
            interceptors,
            resources,
            sub_resources,
        } = self;
        let settings = *deployment.current_settings();
        let assembler = Assembler::new(&interceptors, settings);

        let mut root = Vec::new();
        for class in resources {
            assembler.class(&class, Level::Root, &mut root)?;
        }
        let routes = Arc::new(assembler.routes(root)?);

        for (key, class) in sub_resources {
            let mut built = Vec::new();
            assembler.class(&class, Level::Sub, &mut built)?;
            deployment
                .locators_mut()
                .register(LocatableResource::new(key, assembler.routes(built)?));
        }

        interceptors.register_shutdown(deployment.shutdown_hooks());
        let mut entry: Vec<Arc<dyn RestHandler>> = interceptors
            .pre_match_filters()
            .map(|f| Arc::new(RequestFilterHandler::new(Arc::clone(f))) as Arc<dyn RestHandler>)
            .collect();
        entry.push(Arc::new(RoutingHandler::new(Arc::clone(&routes))));
        let entry = assembler.entry(entry);

        let deployment = Arc::new(deployment.build());
        tracing::info!(
            locators = deployment.locators().len(),
            pre_match = interceptors.has_pre_match(),
            "Application deployed"
        );
        Ok(Dispatcher::new(
            deployment,
            routes,
            entry,
            interceptors.has_pre_match(),
        ))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Level {
    Root,
    Sub,
}

struct Built {
    method: Option<Method>,
    template: String,
    resource: Arc<RuntimeResource>,
}

/// Turns declarations into runtime resources sharing one abort chain.
struct Assembler<'a> {
    interceptors: &'a Interceptors,
    settings: DispatchSettings,
    abort_chain: HandlerChain,
}

impl<'a> Assembler<'a> {
    fn new(interceptors: &'a Interceptors, settings: DispatchSettings) -> Self {
        let mut abort: Vec<Arc<dyn RestHandler>> =
            vec![Arc::new(ExceptionHandler), Arc::new(ResponseHandler)];
        abort.extend(response_filters(interceptors));
        abort.push(Arc::new(ResponseWriterHandler));
        Self {
            interceptors,
            settings,
            abort_chain: chain(abort),
        }
    }

    fn entry(&self, handlers: Vec<Arc<dyn RestHandler>>) -> Arc<RuntimeResource> {
        Arc::new(
            RuntimeResource::builder("entry", Method::GET, "/")
                .chain(chain(handlers))
                .abort_chain(self.abort_chain.clone())
                .build(),
        )
    }

    fn class(
        &self,
        class: &ResourceClass,
        level: Level,
        out: &mut Vec<Built>,
    ) -> Result<(), DeploymentError> {
        for method in &class.methods {
            out.push(self.method(class, method, level)?);
        }
        Ok(())
    }

    fn method(
        &self,
        class: &ResourceClass,
        method: &ResourceMethod,
        level: Level,
    ) -> Result<Built, DeploymentError> {
        let template = join_paths(&class.path, &method.path);
        let parsed = PathTemplate::parse(&template)?;
        let names: Vec<String> = parsed.param_names().map(String::from).collect();
        let blocking = method.blocking.unwrap_or(self.settings.default_blocking);

        let mut handlers: Vec<Arc<dyn RestHandler>> = Vec::new();
        if level == Level::Root {
            handlers.extend(
                self.interceptors
                    .request_filters()
                    .map(|f| Arc::new(RequestFilterHandler::new(Arc::clone(f))) as Arc<dyn RestHandler>),
            );
        }
        if let Some((index, type_key)) = method.body {
            handlers.push(Arc::new(InputHandler));
            handlers.push(Arc::new(RequestDeserializeHandler::new(index, type_key)));
        }
        for param in &method.params {
            handlers.push(Arc::new(ParameterHandler::new(
                param.index,
                param.name.as_str(),
                Arc::clone(&param.extractor),
                Arc::clone(&param.converter),
            )));
        }
        if blocking {
            handlers.push(Arc::new(BlockingHandler));
        }
        if let (Some(factory), Level::Root) = (&class.factory, level) {
            handlers.push(Arc::new(InstanceHandler::new(Arc::clone(factory))));
        }
        handlers.push(Arc::new(InvocationHandler::new(Arc::clone(&method.invoker))));
        handlers.push(Arc::new(FutureResultHandler));
        handlers.push(Arc::new(DeferredResultHandler));
        if method.is_locator() {
            handlers.push(Arc::new(ResourceLocatorHandler));
        }
        match method.produces.as_slice() {
            [] => {}
            [single] if !hermes_core::media::is_wildcard(single) => {
                handlers.push(Arc::new(FixedProducesHandler::new(single.clone())));
            }
            several => handlers.push(Arc::new(VariableProducesHandler::new(several.to_vec()))),
        }
        handlers.push(Arc::new(ResponseHandler));
        handlers.extend(response_filters(self.interceptors));
        handlers.push(Arc::new(ResponseWriterHandler));

        let http_method = method.http_method.clone();
        let name = method.name.clone().unwrap_or_else(|| {
            let verb = http_method.as_ref().map_or("LOCATOR", Method::as_str);
            format!("{}::{verb} {template}", class.name)
        });
        tracing::debug!(resource = %name, handlers = handlers.len(), "Assembled resource chain");

        let resource = RuntimeResource::builder(
            name,
            http_method.clone().unwrap_or(Method::GET),
            template.clone(),
        )
        .path_params(names)
        .consumes(method.consumes.clone())
        .produces(method.produces.clone())
        .parameter_count(method.slots)
        .blocking(blocking)
        .chain(chain(handlers))
        .abort_chain(self.abort_chain.clone())
        .build();

        Ok(Built {
            method: http_method,
            template,
            resource: Arc::new(resource),
        })
    }

    /// Builds a route table, merging methods that share method and path
    /// behind a media type router.
    fn routes(&self, built: Vec<Built>) -> Result<ResourceRoutes, DeploymentError> {
        let mut routes = ResourceRoutes::new();
        let mut groups: Vec<(Method, String, Vec<Arc<RuntimeResource>>)> = Vec::new();

        for entry in built {
            match entry.method {
                None => routes.insert_locator(&entry.template, entry.resource)?,
                Some(method) => {
                    match groups
                        .iter_mut()
                        .find(|(m, t, _)| *m == method && *t == entry.template)
                    {
                        Some((_, _, members)) => members.push(entry.resource),
                        None => groups.push((method, entry.template, vec![entry.resource])),
                    }
                }
            }
        }

        for (method, template, members) in groups {
            let resource = match <[_; 1]>::try_from(members) {
                Ok([single]) => single,
                Err(members) => self.media_type_router(&method, &template, members)?,
            };
            routes.insert(method, &template, resource)?;
        }
        Ok(routes)
    }

    fn media_type_router(
        &self,
        method: &Method,
        template: &str,
        members: Vec<Arc<RuntimeResource>>,
    ) -> Result<Arc<RuntimeResource>, DeploymentError> {
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                if a.consumes() == b.consumes() && a.produces() == b.produces() {
                    return Err(DeploymentError::Ambiguous {
                        method: method.clone(),
                        path: template.to_string(),
                    });
                }
            }
        }
        let names = members
            .first()
            .map(|r| r.path_param_names().to_vec())
            .unwrap_or_default();
        tracing::debug!(%method, template, candidates = members.len(), "Media type routing");
        Ok(Arc::new(
            RuntimeResource::builder(format!("{method} {template}"), method.clone(), template)
                .path_params(names)
                .chain(chain(vec![Arc::new(MediaTypeRoutingHandler::new(members))]))
                .abort_chain(self.abort_chain.clone())
                .build(),
        ))
    }
}

fn response_filters(interceptors: &Interceptors) -> impl Iterator<Item = Arc<dyn RestHandler>> + '_ {
    interceptors
        .response_filters()
        .map(|f| Arc::new(ResponseFilterHandler::new(Arc::clone(f))) as Arc<dyn RestHandler>)
}

/// Joins a class path and a method path into one template.
fn join_paths(class: &str, method: &str) -> String {
    let class = class.trim_end_matches('/');
    let method = method.trim_matches('/');
    let mut joined = String::with_capacity(class.len() + method.len() + 2);
    if !class.is_empty() {
        if !class.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(class);
    }
    if !method.is_empty() {
        joined.push('/');
        joined.push_str(method);
    }
    if joined.is_empty() {
        joined.push('/');
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/widgets", "/{id}"), "/widgets/{id}");
        assert_eq!(join_paths("/widgets/", "{id}/"), "/widgets/{id}");
        assert_eq!(join_paths("widgets", ""), "/widgets");
        assert_eq!(join_paths("", ""), "/");
        assert_eq!(join_paths("", "/history"), "/history");
    }

    #[test]
    fn test_slots_follow_declaration_order() {
        let method = ResourceMethod::post(|_| Ok(Outcome::empty()))
            .path_param::<u64>("id")
            .body::<String>()
            .optional_query::<u32>("limit");
        assert_eq!(method.slots, 3);
        assert_eq!(method.body.map(|(index, _)| index), Some(1));
        assert_eq!(method.params[1].index, 2);
    }

    #[test]
    fn test_ambiguous_methods_rejected() {
        let result = ApplicationBuilder::new()
            .resource(
                ResourceClass::new("Dup", "/dup")
                    .method(ResourceMethod::get(|_| Ok(Outcome::empty())))
                    .method(ResourceMethod::get(|_| Ok(Outcome::empty()))),
            )
            .build();
        assert!(matches!(result, Err(DeploymentError::Ambiguous { .. })));
    }

    #[test]
    fn test_invalid_template_rejected() {
        let result = ApplicationBuilder::new()
            .resource(
                ResourceClass::new("Bad", "/bad/{")
                    .method(ResourceMethod::get(|_| Ok(Outcome::empty()))),
            )
            .build();
        assert!(matches!(result, Err(DeploymentError::InvalidTemplate(_))));
    }

    #[test]
    fn test_locator_and_sub_resource_registered() {
        struct History;
        let dispatcher = ApplicationBuilder::new()
            .resource(ResourceClass::new("Widgets", "/widgets").method(
                ResourceMethod::locator(|_| Ok(Outcome::empty())).path("/{id}"),
            ))
            .sub_resource::<History>(
                ResourceClass::new("History", "")
                    .method(ResourceMethod::get(|_| Ok(Outcome::empty())).path("/history")),
            )
            .build()
            .unwrap();
        assert!(dispatcher.routes().knows("/widgets/1/history"));
        assert!(dispatcher
            .deployment()
            .locators()
            .get(&TypeKey::of::<History>())
            .is_some());
    }
}
