//! Request interceptors.
//!
//! Interceptors observe or mutate a bound request before it reaches the
//! executor. They cannot short-circuit a call. Registered interceptors are
//! folded with `and_then` into one, applied left to right; an empty
//! registration composes to a no-op.

use std::sync::Arc;

use crate::http::Request;

pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: &mut Request);

    /// Run `self`, then `next`.
    fn and_then<I>(self, next: I) -> AndThen<Self, I>
    where
        Self: Sized,
        I: RequestInterceptor,
    {
        AndThen {
            first: self,
            second: next,
        }
    }
}

impl<I: RequestInterceptor + ?Sized> RequestInterceptor for Arc<I> {
    fn intercept(&self, request: &mut Request) {
        (**self).intercept(request)
    }
}

/// Sequential composition of two interceptors.
pub struct AndThen<A, B> {
    first: A,
    second: B,
}

impl<A: RequestInterceptor, B: RequestInterceptor> RequestInterceptor for AndThen<A, B> {
    fn intercept(&self, request: &mut Request) {
        self.first.intercept(request);
        self.second.intercept(request);
    }
}

/// Leaves the request untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInterceptor;

impl RequestInterceptor for NoopInterceptor {
    fn intercept(&self, _request: &mut Request) {}
}

/// Adapts a closure into an interceptor.
pub struct FnInterceptor<F>(F);

pub fn interceptor_fn<F>(f: F) -> FnInterceptor<F>
where
    F: Fn(&mut Request) + Send + Sync,
{
    FnInterceptor(f)
}

impl<F> RequestInterceptor for FnInterceptor<F>
where
    F: Fn(&mut Request) + Send + Sync,
{
    fn intercept(&self, request: &mut Request) {
        (self.0)(request)
    }
}

/// Fold `interceptors` in registration order.
pub fn compose(interceptors: Vec<Arc<dyn RequestInterceptor>>) -> Arc<dyn RequestInterceptor> {
    interceptors
        .into_iter()
        .reduce(|first, second| Arc::new(first.and_then(second)) as Arc<dyn RequestInterceptor>)
        .unwrap_or_else(|| Arc::new(NoopInterceptor) as Arc<dyn RequestInterceptor>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Body, HttpMethod};

    fn request() -> Request {
        Request {
            method: HttpMethod::Get,
            uri: "http://localhost:3000/items".to_string(),
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    fn append(tag: &'static str) -> Arc<dyn RequestInterceptor> {
        Arc::new(interceptor_fn(move |req: &mut Request| {
            req.headers.push(("x-order".to_string(), tag.to_string()));
        }))
    }

    #[test]
    fn empty_composition_is_noop() {
        let mut req = request();
        compose(Vec::new()).intercept(&mut req);
        assert!(req.headers.is_empty());
        assert_eq!(req.uri, "http://localhost:3000/items");
    }

    #[test]
    fn composition_runs_in_registration_order() {
        let mut req = request();
        compose(vec![append("a"), append("b"), append("c")]).intercept(&mut req);
        let order: Vec<&str> = req.headers.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn later_interceptor_sees_earlier_mutation() {
        let mut req = request();
        let rewrite = interceptor_fn(|req: &mut Request| req.uri.push_str("?v=2"));
        let stamp = interceptor_fn(|req: &mut Request| {
            let uri = req.uri.clone();
            req.set_header("x-uri", uri);
        });
        rewrite.and_then(stamp).intercept(&mut req);
        assert_eq!(req.header("x-uri"), Some("http://localhost:3000/items?v=2"));
    }
}
