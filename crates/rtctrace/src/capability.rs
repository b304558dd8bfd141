//! Capability registry and prober
//!
//! A [`CapabilityRegistry`] maps binding names (`RTCPeerConnection`,
//! `webkitRTCPeerConnection`, ...) to peer connection factories. The
//! composition root owns it and hands it to
//! [`crate::interception::Instrumentation::setup`], which rebinds the
//! resolved name to a traced factory.

use crate::peer::PeerConnectionFactory;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The capability found by [`CapabilityRegistry::probe`]
#[derive(Clone)]
pub struct ResolvedCapability {
    /// Binding name the factory was found under
    pub binding: String,
    /// Factory currently bound under that name
    pub factory: Arc<dyn PeerConnectionFactory>,
}

impl std::fmt::Debug for ResolvedCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCapability")
            .field("binding", &self.binding)
            .field("instrumented", &self.factory.is_instrumented())
            .finish()
    }
}

/// Named peer connection constructors available to the application
#[derive(Default)]
pub struct CapabilityRegistry {
    bindings: RwLock<HashMap<String, Arc<dyn PeerConnectionFactory>>>,
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `factory` under `name`, returning the previous binding
    pub fn bind(
        &self,
        name: impl Into<String>,
        factory: Arc<dyn PeerConnectionFactory>,
    ) -> Option<Arc<dyn PeerConnectionFactory>> {
        let name = name.into();
        debug!("Binding capability {}", name);
        self.bindings.write().insert(name, factory)
    }

    /// Factory bound under `name`
    pub fn get(&self, name: &str) -> Option<Arc<dyn PeerConnectionFactory>> {
        self.bindings.read().get(name).cloned()
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.read().contains_key(name)
    }

    /// Resolve the first candidate that is bound
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityAbsent`] naming every candidate when none
    /// is bound.
    pub fn probe<S: AsRef<str>>(&self, candidates: &[S]) -> Result<ResolvedCapability> {
        let bindings = self.bindings.read();
        resolve(&bindings, candidates)
    }

    /// Probe `candidates` and replace the resolved factory with `wrap(factory)`
    ///
    /// The probe and the rebinding happen under one write lock. A factory that
    /// already reports [`PeerConnectionFactory::is_instrumented`] is returned
    /// unchanged, so repeated calls never stack wrappers. On error the
    /// registry is left untouched.
    pub fn instrument<S, F>(&self, candidates: &[S], wrap: F) -> Result<ResolvedCapability>
    where
        S: AsRef<str>,
        F: FnOnce(Arc<dyn PeerConnectionFactory>) -> Arc<dyn PeerConnectionFactory>,
    {
        let mut bindings = self.bindings.write();
        let resolved = resolve(&bindings, candidates)?;

        if resolved.factory.is_instrumented() {
            debug!("Capability {} already instrumented", resolved.binding);
            return Ok(resolved);
        }

        let wrapped = wrap(resolved.factory);
        bindings.insert(resolved.binding.clone(), Arc::clone(&wrapped));
        info!("Instrumented capability {}", resolved.binding);

        Ok(ResolvedCapability {
            binding: resolved.binding,
            factory: wrapped,
        })
    }
}

fn resolve<S: AsRef<str>>(
    bindings: &HashMap<String, Arc<dyn PeerConnectionFactory>>,
    candidates: &[S],
) -> Result<ResolvedCapability> {
    for candidate in candidates {
        if let Some(factory) = bindings.get(candidate.as_ref()) {
            return Ok(ResolvedCapability {
                binding: candidate.as_ref().to_string(),
                factory: Arc::clone(factory),
            });
        }
    }

    let names: Vec<&str> = candidates.iter().map(|c| c.as_ref()).collect();
    error!("No peer connection capability among {:?}", names);
    Err(Error::CapabilityAbsent(names.join(", ")))
}
