//! In-memory request/response substrate.
//!
//! [`MemNetwork`] routes each expressed request to the longest registered
//! prefix, enforces the request lifetime as a timeout, and serializes all
//! producer callbacks on one dispatch lock, matching the single-threaded
//! callback ordering the engine assumes. It backs the integration tests and
//! the CLI loopback mode; binding to a real forwarder is an external concern.
//!
//! Faults can be injected per name prefix to exercise nack and timeout paths.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use difs_core::Name;

use crate::error::{Result, WireError};
use crate::face::{Face, ProducerHandler};
use crate::packet::{Data, Interest};

/// What an injected fault does to a matching request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// The request expires with a timeout.
    Timeout,
    /// The request is nacked.
    Nack,
}

struct Fault {
    prefix: Name,
    action: FaultAction,
    remaining: usize,
}

struct Route {
    prefix: Name,
    handler: Arc<dyn ProducerHandler>,
}

/// An in-process hub connecting every [`MemFace`] handed out by [`MemNetwork::face`].
pub struct MemNetwork {
    routes: Mutex<Vec<Route>>,
    faults: Mutex<Vec<Fault>>,
    log: Mutex<Vec<Name>>,
    dispatch: tokio::sync::Mutex<()>,
}

impl MemNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routes: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
            dispatch: tokio::sync::Mutex::new(()),
        })
    }

    /// A new endpoint attached to this network.
    pub fn face(self: &Arc<Self>) -> MemFace {
        MemFace {
            net: Arc::clone(self),
        }
    }

    /// Makes the next `times` requests matching `prefix` fail with `action`.
    pub fn inject_fault(&self, prefix: Name, action: FaultAction, times: usize) {
        self.faults.lock().push(Fault {
            prefix,
            action,
            remaining: times,
        });
    }

    /// Every name expressed through this network, in order.
    pub fn expressed(&self) -> Vec<Name> {
        self.log.lock().clone()
    }

    /// Number of expressed names matching `prefix`.
    pub fn expressed_matching(&self, prefix: &Name) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|name| prefix.is_prefix_of(name))
            .count()
    }

    fn consume_fault(&self, name: &Name) -> Option<FaultAction> {
        let mut faults = self.faults.lock();
        for fault in faults.iter_mut() {
            if fault.remaining > 0 && fault.prefix.is_prefix_of(name) {
                fault.remaining -= 1;
                return Some(fault.action);
            }
        }
        None
    }

    fn lookup(&self, name: &Name) -> Option<(Name, Arc<dyn ProducerHandler>)> {
        let routes = self.routes.lock();
        routes
            .iter()
            .filter(|route| route.prefix.is_prefix_of(name))
            .max_by_key(|route| route.prefix.len())
            .map(|route| (route.prefix.clone(), Arc::clone(&route.handler)))
    }
}

/// An endpoint on a [`MemNetwork`].
pub struct MemFace {
    net: Arc<MemNetwork>,
}

#[async_trait]
impl Face for MemFace {
    async fn express(&self, interest: Interest) -> Result<Data> {
        let name = interest.name.clone();
        self.net.log.lock().push(name.clone());

        if let Some(action) = self.net.consume_fault(&name) {
            debug!(name = %name, ?action, "injected fault");
            return Err(match action {
                FaultAction::Timeout => WireError::Timeout {
                    name: name.to_uri(),
                    lifetime_ms: interest.lifetime.as_millis() as u64,
                },
                FaultAction::Nack => WireError::Nack {
                    name: name.to_uri(),
                },
            });
        }

        let Some((prefix, handler)) = self.net.lookup(&name) else {
            debug!(name = %name, "no route");
            return Err(WireError::Nack {
                name: name.to_uri(),
            });
        };

        let dispatch = &self.net.dispatch;
        let served = tokio::time::timeout(interest.lifetime, async {
            let _guard = dispatch.lock().await;
            handler.on_interest(&prefix, &interest).await
        })
        .await;

        match served {
            Ok(Some(data)) => Ok(data),
            Ok(None) => Err(WireError::Nack {
                name: name.to_uri(),
            }),
            Err(_) => Err(WireError::Timeout {
                name: name.to_uri(),
                lifetime_ms: interest.lifetime.as_millis() as u64,
            }),
        }
    }

    async fn register(&self, prefix: Name, handler: Arc<dyn ProducerHandler>) -> Result<()> {
        let mut routes = self.net.routes.lock();
        if routes.iter().any(|route| route.prefix == prefix) {
            return Err(WireError::Registration {
                prefix: prefix.to_uri(),
                reason: "prefix already registered".to_string(),
            });
        }
        debug!(prefix = %prefix, "registered producer");
        routes.push(Route { prefix, handler });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct EchoProducer;

    #[async_trait]
    impl ProducerHandler for EchoProducer {
        async fn on_interest(&self, _prefix: &Name, interest: &Interest) -> Option<Data> {
            Some(Data::new(interest.name.clone(), b"echo".to_vec()))
        }
    }

    struct SilentProducer;

    #[async_trait]
    impl ProducerHandler for SilentProducer {
        async fn on_interest(&self, _prefix: &Name, _interest: &Interest) -> Option<Data> {
            None
        }
    }

    #[tokio::test]
    async fn test_express_round_trip() {
        let net = MemNetwork::new();
        let face = net.face();
        face.register(Name::parse("/a").unwrap(), Arc::new(EchoProducer))
            .await
            .unwrap();

        let data = face
            .express(Interest::new(Name::parse("/a/b").unwrap()))
            .await
            .unwrap();
        assert_eq!(data.content, b"echo");
        assert_eq!(net.expressed().len(), 1);
    }

    #[tokio::test]
    async fn test_no_route_nacks() {
        let net = MemNetwork::new();
        let face = net.face();
        let err = face
            .express(Interest::new(Name::parse("/nowhere").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::Nack { .. }));
    }

    #[tokio::test]
    async fn test_silent_producer_nacks() {
        let net = MemNetwork::new();
        let face = net.face();
        face.register(Name::parse("/quiet").unwrap(), Arc::new(SilentProducer))
            .await
            .unwrap();
        let err = face
            .express(Interest::new(Name::parse("/quiet/x").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::Nack { .. }));
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        struct Tagged(&'static [u8]);

        #[async_trait]
        impl ProducerHandler for Tagged {
            async fn on_interest(&self, _prefix: &Name, interest: &Interest) -> Option<Data> {
                Some(Data::new(interest.name.clone(), self.0.to_vec()))
            }
        }

        let net = MemNetwork::new();
        let face = net.face();
        face.register(Name::parse("/a").unwrap(), Arc::new(Tagged(b"short")))
            .await
            .unwrap();
        face.register(Name::parse("/a/b").unwrap(), Arc::new(Tagged(b"long")))
            .await
            .unwrap();

        let data = face
            .express(Interest::new(Name::parse("/a/b/c").unwrap()))
            .await
            .unwrap();
        assert_eq!(data.content, b"long");

        let data = face
            .express(Interest::new(Name::parse("/a/x").unwrap()))
            .await
            .unwrap();
        assert_eq!(data.content, b"short");
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let net = MemNetwork::new();
        let face = net.face();
        let prefix = Name::parse("/a").unwrap();
        face.register(prefix.clone(), Arc::new(EchoProducer))
            .await
            .unwrap();
        let err = face
            .register(prefix, Arc::new(EchoProducer))
            .await
            .unwrap_err();
        assert!(matches!(err, WireError::Registration { .. }));
    }

    #[tokio::test]
    async fn test_fault_injection_consumed() {
        let net = MemNetwork::new();
        let face = net.face();
        let prefix = Name::parse("/a").unwrap();
        face.register(prefix.clone(), Arc::new(EchoProducer))
            .await
            .unwrap();
        net.inject_fault(prefix.clone(), FaultAction::Timeout, 2);

        for _ in 0..2 {
            let err = face
                .express(Interest::new(Name::parse("/a/b").unwrap()))
                .await
                .unwrap_err();
            assert!(matches!(err, WireError::Timeout { .. }));
        }

        // Fault budget spent; requests go through again.
        let data = face
            .express(Interest::new(Name::parse("/a/b").unwrap()))
            .await
            .unwrap();
        assert_eq!(data.content, b"echo");
        assert_eq!(net.expressed_matching(&prefix), 3);
    }

    #[tokio::test]
    async fn test_slow_producer_times_out() {
        struct SlowProducer;

        #[async_trait]
        impl ProducerHandler for SlowProducer {
            async fn on_interest(&self, _prefix: &Name, interest: &Interest) -> Option<Data> {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Some(Data::new(interest.name.clone(), Vec::new()))
            }
        }

        let net = MemNetwork::new();
        let face = net.face();
        face.register(Name::parse("/slow").unwrap(), Arc::new(SlowProducer))
            .await
            .unwrap();

        let interest = Interest::new(Name::parse("/slow/x").unwrap())
            .with_lifetime(Duration::from_millis(20));
        let err = face.express(interest).await.unwrap_err();
        assert!(matches!(err, WireError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_is_serialized() {
        struct Reentrant {
            busy: AtomicBool,
            overlaps: AtomicUsize,
        }

        #[async_trait]
        impl ProducerHandler for Reentrant {
            async fn on_interest(&self, _prefix: &Name, interest: &Interest) -> Option<Data> {
                if self.busy.swap(true, Ordering::SeqCst) {
                    self.overlaps.fetch_add(1, Ordering::SeqCst);
                }
                tokio::task::yield_now().await;
                self.busy.store(false, Ordering::SeqCst);
                Some(Data::new(interest.name.clone(), Vec::new()))
            }
        }

        let net = MemNetwork::new();
        let face = Arc::new(net.face());
        let producer = Arc::new(Reentrant {
            busy: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
        });
        face.register(Name::parse("/p").unwrap(), producer.clone())
            .await
            .unwrap();

        let mut tasks = Vec::new();
        for i in 0..16u64 {
            let face = Arc::clone(&face);
            tasks.push(tokio::spawn(async move {
                let name = Name::parse("/p").unwrap().append_segment(i);
                face.express(Interest::new(name)).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(producer.overlaps.load(Ordering::SeqCst), 0);
    }
}
