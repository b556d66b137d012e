//! DNS resolution, with Happy-Eyeballs-style address interleaving and an explicit timeout
//! distinguished from user cancellation.

use std::{
    collections::HashMap as StdHashMap,
    fmt,
    future::Future,
    net::{IpAddr, SocketAddr},
    pin::Pin,
    sync::{Arc, LazyLock},
    time::Duration,
};

use hickory_resolver::{
    TokioResolver,
    config::{LookupIpStrategy, ResolverConfig},
    name_server::TokioConnectionProvider,
};
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, Error, Result};

/// A domain name awaiting resolution.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct Name {
    host: Box<str>,
}

impl Name {
    /// Creates a new name from a string slice.
    pub fn new(host: impl AsRef<str>) -> Self {
        Self {
            host: host.as_ref().into(),
        }
    }

    /// Views the hostname as a string slice.
    pub fn as_str(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.host, f)
    }
}

/// A resolved, ordered list of addresses.
pub type Addrs = Vec<SocketAddr>;

/// The future a [`Resolve`] implementation returns.
pub type Resolving = Pin<Box<dyn Future<Output = std::result::Result<Addrs, BoxError>> + Send>>;

/// Pluggable DNS resolution.
///
/// Implementations are assumed always ready: there is no `poll_ready` step, since a resolver
/// trait object can't expose an associated `Future` type — both the future and its contained
/// addresses are boxed instead.
pub trait Resolve: Send + Sync {
    /// Resolves `name` to zero or more socket addresses (port left as `0`; the caller fills
    /// in the request's actual port).
    fn resolve(&self, name: Name) -> Resolving;
}

/// Interleaves IPv6 and IPv4 addresses (v6 first) in the style of RFC 8305's Happy Eyeballs,
/// so a caller iterating and trying addresses in order prefers the more modern family first
/// but doesn't starve the other.
fn happy_eyeballs_order(addrs: Vec<IpAddr>) -> Vec<IpAddr> {
    let (mut v6, mut v4): (Vec<_>, Vec<_>) = addrs.into_iter().partition(IpAddr::is_ipv6);
    v6.reverse();
    v4.reverse();
    let mut ordered = Vec::with_capacity(v6.len() + v4.len());
    loop {
        match (v6.pop(), v4.pop()) {
            (None, None) => break,
            (Some(a), None) => ordered.push(a),
            (None, Some(a)) => ordered.push(a),
            (Some(a), Some(b)) => {
                ordered.push(a);
                ordered.push(b);
            }
        }
    }
    ordered
}

/// Resolves `name` through `resolver`, applying `timeout` and racing it against `cancel`.
///
/// Returns [`crate::error::ErrorKind::Cancelled`] if `cancel` fires first, or
/// [`crate::error::ErrorKind::Dns`] (constructed via [`Error::timeout`] semantics but tagged
/// as a DNS failure) if the timeout elapses first — the two are surfaced as distinct error
/// kinds so retry policy can tell "the user gave up" from "the network was slow".
pub async fn resolve_with_timeout(
    resolver: &dyn Resolve,
    name: Name,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Addrs> {
    let host_for_error = name.to_string();
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::cancelled()),
        result = tokio::time::timeout(timeout, resolver.resolve(name)) => {
            match result {
                Ok(Ok(addrs)) => Ok(addrs),
                Ok(Err(source)) => Err(Error::dns(format!("failed to resolve {host_for_error}: {source}"))),
                Err(_elapsed) => Err(Error::dns(format!("timed out resolving {host_for_error} after {timeout:?}"))),
            }
        }
    }
}

/// Default DNS timeout applied by [`resolve_with_timeout`] when the caller has none configured.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// A resolver backed by [`hickory_resolver`]'s Tokio runtime integration.
///
/// A lazily-initialized, process-wide resolver that prefers the system's
/// `/etc/resolv.conf`-derived configuration and falls back to built-in defaults.
/// `LookupIpStrategy::Ipv4AndIpv6` is forced so both address families are available for
/// Happy-Eyeballs ordering.
#[derive(Clone)]
pub struct HickoryDnsResolver {
    resolver: &'static LazyLock<TokioResolver>,
}

impl Default for HickoryDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl HickoryDnsResolver {
    /// Creates a resolver using the system DNS configuration, or built-in defaults if that
    /// configuration cannot be read.
    pub fn new() -> Self {
        static RESOLVER: LazyLock<TokioResolver> = LazyLock::new(|| {
            let mut builder = match TokioResolver::builder_tokio() {
                Ok(builder) => builder,
                Err(_err) => TokioResolver::builder_with_config(
                    ResolverConfig::default(),
                    TokioConnectionProvider::default(),
                ),
            };
            builder.options_mut().ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
            builder.build()
        });
        Self {
            resolver: &RESOLVER,
        }
    }
}

impl Resolve for HickoryDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        Box::pin(async move {
            let lookup = resolver.resolver.lookup_ip(name.as_str()).await?;
            let ips: Vec<IpAddr> = lookup.into_iter().collect();
            let ordered = happy_eyeballs_order(ips);
            let addrs = ordered.into_iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            Ok(addrs)
        })
    }
}

/// A resolver that answers fixed overrides before falling back to an inner resolver.
///
/// Useful for tests and for pinning a hostname to a known address without touching system
/// DNS configuration.
pub struct DnsResolverWithOverrides {
    inner: Arc<dyn Resolve>,
    overrides: StdHashMap<String, Addrs>,
}

impl DnsResolverWithOverrides {
    /// Creates a resolver falling back to `inner` for any hostname not present in `overrides`.
    pub fn new(inner: Arc<dyn Resolve>, overrides: StdHashMap<String, Addrs>) -> Self {
        Self { inner, overrides }
    }
}

impl Resolve for DnsResolverWithOverrides {
    fn resolve(&self, name: Name) -> Resolving {
        if let Some(addrs) = self.overrides.get(name.as_str()) {
            let addrs = addrs.clone();
            return Box::pin(async move { Ok(addrs) });
        }
        self.inner.resolve(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverResolver;
    impl Resolve for NeverResolver {
        fn resolve(&self, _name: Name) -> Resolving {
            Box::pin(std::future::pending())
        }
    }

    struct FixedResolver(Vec<SocketAddr>);
    impl Resolve for FixedResolver {
        fn resolve(&self, _name: Name) -> Resolving {
            let addrs = self.0.clone();
            Box::pin(async move { Ok(addrs) })
        }
    }

    #[tokio::test]
    async fn cancellation_wins_over_dns_timeout() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = resolve_with_timeout(
            &NeverResolver,
            Name::new("example.test"),
            Duration::from_secs(30),
            &cancel,
        )
        .await;
        assert!(result.unwrap_err().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn dns_timeout_fires_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let result = resolve_with_timeout(
            &NeverResolver,
            Name::new("example.test"),
            Duration::from_millis(50),
            &cancel,
        )
        .await;
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn overrides_short_circuit_inner_resolver() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let mut overrides = StdHashMap::new();
        overrides.insert("pinned.test".to_string(), vec![addr]);
        let resolver = DnsResolverWithOverrides::new(Arc::new(NeverResolver), overrides);
        let resolved = resolver.resolve(Name::new("pinned.test")).await;
        assert_eq!(resolved.unwrap(), vec![addr]);
    }

    #[tokio::test]
    async fn happy_eyeballs_orders_v6_before_v4() {
        let v4: IpAddr = "10.0.0.1".parse().unwrap();
        let v6: IpAddr = "::1".parse().unwrap();
        let ordered = happy_eyeballs_order(vec![v4, v6]);
        assert_eq!(ordered, vec![v6, v4]);
    }

    #[tokio::test]
    async fn fixed_resolver_returns_configured_addrs() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let resolver = FixedResolver(vec![addr]);
        let result = resolver.resolve(Name::new("x")).await.unwrap();
        assert_eq!(result, vec![addr]);
    }
}
