//! The callback contract for streamed token delivery.
//!
//! The engine drives one exchange and reports progress through an
//! [`ExchangeHooks`] implementation: a role announcement when the stream
//! opens (or changes role), one call per content fragment, and exactly one
//! call on the failure path. All hooks run synchronously inside the read
//! loop, so they must not block for long.

use crate::Error;

/// Caller-supplied hooks invoked during one streaming exchange.
pub trait ExchangeHooks {
    /// Called when the stream announces a role distinct from the last one
    /// observed. Servers may re-announce the same role on many chunks;
    /// treat this as idempotent rather than a strict transition count.
    fn on_role_changed(&mut self, role: &str);

    /// Called once per content fragment, in arrival order.
    fn on_token(&mut self, token: &str);

    /// Called exactly once when the exchange fails, with the failure that
    /// the returned outcome will carry.
    fn on_error(&mut self, error: &Error);
}

/// Hooks built from three closures, for callers that prefer function
/// values over a trait implementation.
pub struct HookFns<R, T, E>
where
    R: FnMut(&str),
    T: FnMut(&str),
    E: FnMut(&Error),
{
    role_changed: R,
    token: T,
    error: E,
}

impl<R, T, E> HookFns<R, T, E>
where
    R: FnMut(&str),
    T: FnMut(&str),
    E: FnMut(&Error),
{
    /// Create hooks from three closures.
    pub fn new(role_changed: R, token: T, error: E) -> Self {
        Self {
            role_changed,
            token,
            error,
        }
    }
}

impl<R, T, E> ExchangeHooks for HookFns<R, T, E>
where
    R: FnMut(&str),
    T: FnMut(&str),
    E: FnMut(&Error),
{
    fn on_role_changed(&mut self, role: &str) {
        (self.role_changed)(role);
    }

    fn on_token(&mut self, token: &str) {
        (self.token)(token);
    }

    fn on_error(&mut self, error: &Error) {
        (self.error)(error);
    }
}

/// Hooks that discard everything.
#[derive(Debug, Default)]
pub struct NullHooks;

impl ExchangeHooks for NullHooks {
    fn on_role_changed(&mut self, _: &str) {}

    fn on_token(&mut self, _: &str) {}

    fn on_error(&mut self, _: &Error) {}
}
