//! Routing inside the chain: late path matching and media type
//! disambiguation.

use std::fmt;
use std::sync::Arc;

use hermes_core::media::{self, MatchScore};
use hermes_core::{
    allow_header, RequestContext, ResourceRoutes, RestError, RestHandler, RestResponse,
    RouteLookup, RuntimeResource,
};
use http::header;
use mime::Mime;

/// Applies a route lookup to the context: enters the matched resource,
/// answers OPTIONS, or fails with 404/405.
pub(crate) fn enter_route(ctx: &mut RequestContext, lookup: RouteLookup) -> Result<(), RestError> {
    match lookup {
        RouteLookup::Found {
            target,
            values,
            remaining,
        } => {
            ctx.enter_resource(target, values, remaining);
            Ok(())
        }
        RouteLookup::Options { allow } => {
            let mut response = RestResponse::ok();
            if let Some(value) = allow_header(&allow) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            ctx.abort_with(response);
            Ok(())
        }
        RouteLookup::MethodNotAllowed { allow } => Err(RestError::MethodNotAllowed { allow }),
        RouteLookup::NotFound => Err(RestError::not_found(format!(
            "no resource for {} {}",
            ctx.method(),
            ctx.path()
        ))),
    }
}

/// Enters the matched resource.
///
/// Uses the lookup the dispatcher already made when there is one. Otherwise
/// the request is matched now, after pre-match filters had their chance to
/// rewrite method and path.
pub struct RoutingHandler {
    routes: Arc<ResourceRoutes>,
}

impl RoutingHandler {
    /// Routes against `routes`.
    pub fn new(routes: Arc<ResourceRoutes>) -> Self {
        Self { routes }
    }
}

impl fmt::Debug for RoutingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingHandler").finish_non_exhaustive()
    }
}

impl RestHandler for RoutingHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let lookup = match ctx.extensions_mut().remove::<RouteLookup>() {
            Some(lookup) => lookup,
            None => self.routes.lookup(ctx.method(), ctx.path()),
        };
        enter_route(ctx, lookup)
    }

    fn name(&self) -> &'static str {
        "routing"
    }
}

/// Chooses among resources sharing a method and path by `Content-Type`,
/// then `Accept`, and restarts on the winner.
///
/// Without a `Content-Type`, resources consuming anything are preferred.
/// Ties on `Accept` go to the earliest registration.
pub struct MediaTypeRoutingHandler {
    candidates: Vec<Arc<RuntimeResource>>,
}

impl MediaTypeRoutingHandler {
    /// Chooses among `candidates`, in registration order.
    pub fn new(candidates: Vec<Arc<RuntimeResource>>) -> Self {
        Self { candidates }
    }

    fn by_content_type(&self, content_type: Option<&Mime>) -> Vec<&Arc<RuntimeResource>> {
        let open = |r: &&Arc<RuntimeResource>| {
            r.consumes().is_empty() || r.consumes().iter().any(media::is_wildcard)
        };
        match content_type {
            Some(content_type) => {
                let specific: Vec<_> = self
                    .candidates
                    .iter()
                    .filter(|r| {
                        r.consumes().iter().any(|c| {
                            !media::is_wildcard(c) && media::is_compatible(c, content_type)
                        })
                    })
                    .collect();
                if !specific.is_empty() {
                    return specific;
                }
                self.candidates
                    .iter()
                    .filter(open)
                    .filter(|r| media::consumes(r.consumes(), content_type))
                    .collect()
            }
            None => {
                let open: Vec<_> = self.candidates.iter().filter(open).collect();
                if open.is_empty() {
                    self.candidates.iter().collect()
                } else {
                    open
                }
            }
        }
    }
}

impl fmt::Debug for MediaTypeRoutingHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.candidates.iter().map(|r| r.name()))
            .finish()
    }
}

impl RestHandler for MediaTypeRoutingHandler {
    fn handle(&self, ctx: &mut RequestContext) -> Result<(), RestError> {
        let content_type = media::content_type_of(ctx.headers());
        let eligible = self.by_content_type(content_type.as_ref());
        if eligible.is_empty() {
            return Err(RestError::unsupported_media_type(
                content_type.map(|m| m.to_string()),
            ));
        }

        let accept = media::accept_of(ctx.headers());
        let mut best: Option<(MatchScore, &Arc<RuntimeResource>)> = None;
        for candidate in eligible {
            let Some(score) = media::best_score(&accept, candidate.produces()) else {
                continue;
            };
            if best.as_ref().map_or(true, |(current, _)| score > *current) {
                best = Some((score, candidate));
            }
        }
        let (_, chosen) = best.ok_or_else(|| {
            RestError::not_acceptable("no candidate produces an acceptable media type")
        })?;

        tracing::trace!(resource = chosen.name(), "Media type routing chose resource");
        ctx.restart(Arc::clone(chosen));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "media_type_routing"
    }
}
