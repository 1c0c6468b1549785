use crate::{
    routes::{HandlerInternal, Method, Parameters, RawPayload, RouteOutput},
    ErrorPayload, Handler,
};
use std::collections::HashMap;
use tracing::{debug, trace};

/// The fixed name of the proxy handler.
pub const PROXY_METHOD: &str = "rpc.proxy";

/// Prefix reserved for protocol-internal methods.
const RESERVED_PREFIX: &str = "rpc.";

/// Method table of a service.
///
/// A regular registry maps names to methods. A proxy registry holds a single
/// optional [`PROXY_METHOD`] entry that receives every call, whatever its
/// name.
///
/// Analogous to the inner table of axum's `Router`.
#[derive(Debug, Clone)]
pub(crate) enum Registry {
    /// Name to method table.
    Methods(HashMap<String, Method>),
    /// Every call goes to the proxy handler.
    Proxy(Option<Method>),
}

impl Default for Registry {
    fn default() -> Self {
        Self::Methods(HashMap::new())
    }
}

impl Registry {
    /// Create an empty proxy registry.
    pub(crate) const fn proxy() -> Self {
        Self::Proxy(None)
    }

    /// True if this is a proxy registry.
    pub(crate) const fn is_proxy(&self) -> bool {
        matches!(self, Self::Proxy(_))
    }

    fn insert(&mut self, name: String, method: Method) {
        match self {
            Self::Methods(methods) => {
                if methods.insert(name, method).is_some() {
                    debug!("method replaced");
                }
            }
            Self::Proxy(_) => debug!(%name, "ignoring method registration in proxy mode"),
        }
    }

    /// Register a handler. Replaces an existing method of the same name.
    /// Ignored in proxy mode.
    pub(crate) fn register<H, T>(&mut self, name: impl Into<String>, handler: H)
    where
        H: Handler<T>,
        T: Send + 'static,
    {
        self.insert(name.into(), Method::Ready(handler.into_route()));
    }

    /// Register a name with no handler. Ignored in proxy mode.
    pub(crate) fn register_unbound(&mut self, name: impl Into<String>) {
        self.insert(name.into(), Method::Unbound);
    }

    /// Set the proxy handler. Ignored unless in proxy mode.
    pub(crate) fn register_proxy<H, T>(&mut self, handler: H)
    where
        H: Handler<T>,
        T: Send + 'static,
    {
        match self {
            Self::Proxy(slot) => *slot = Some(Method::Ready(handler.into_route())),
            Self::Methods(_) => debug!("ignoring proxy registration outside proxy mode"),
        }
    }

    /// Look up the method serving `name`.
    fn lookup(&self, name: &str) -> Result<&Method, ErrorPayload> {
        if name.trim().is_empty() {
            return Err(ErrorPayload::invalid_request().with_detail("method name is invalid"));
        }

        let method = match self {
            Self::Methods(methods) => {
                if is_reserved(name) {
                    return Err(ErrorPayload::invalid_request()
                        .with_detail("method cannot match the pattern rpc.*"));
                }
                methods.get(name)
            }
            Self::Proxy(proxy) => proxy.as_ref(),
        };
        method.ok_or_else(ErrorPayload::method_not_found)
    }

    /// Dispatch a call. `params.method()` is the name the client asked for.
    pub(crate) async fn call(&self, params: Parameters) -> RouteOutput {
        match self.lookup(params.method()) {
            Ok(method) => {
                trace!(proxy = self.is_proxy(), "dispatching");
                method.call(params).await
            }
            Err(err) => Ok(RawPayload::from(err)),
        }
    }
}

/// True if `name` starts with the reserved `rpc.` prefix, in any case.
fn is_reserved(name: &str) -> bool {
    name.get(..RESERVED_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(RESERVED_PREFIX))
}
