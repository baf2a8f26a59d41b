use anyhow::{Context, Result};
use log::info;
use provwiz_backend::{Host, HostInfoOps, InventoryOps, SmartProxy};
use provwiz_error::SetupError;

/// Records the wizard binds the provisioner to. Both are created by earlier
/// installer steps, never by the wizard itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningContext {
    pub fqdn: String,
    pub proxy: SmartProxy,
    pub host: Host,
}

/// Detect this machine's FQDN and check both preconditions for it.
pub fn run<B, H>(backend: &B, host_info: &H) -> Result<ProvisioningContext>
where
    B: InventoryOps + ?Sized,
    H: HostInfoOps + ?Sized,
{
    let fqdn = host_info
        .fqdn()
        .context("failed to determine this host's FQDN")?;
    check(backend, &fqdn)
}

/// Look up the smart proxy and host registered for `fqdn`.
///
/// Read-only: nothing is created on the backend, whatever the outcome.
pub fn check<B>(backend: &B, fqdn: &str) -> Result<ProvisioningContext>
where
    B: InventoryOps + ?Sized,
{
    info!("🧪 Preflight checks for {}", fqdn);

    // The smart proxy registers itself when the foreman_proxy module runs.
    let proxy = backend
        .find_proxy_by_hostname(fqdn)
        .map_err(SetupError::from)
        .with_context(|| format!("failed to look up smart proxy for {fqdn}"))?
        .ok_or_else(|| SetupError::ProxyNotFound {
            fqdn: fqdn.to_string(),
        })?;

    // The host record comes from the installer steps that precede the wizard.
    let host = backend
        .find_host_by_hostname(fqdn)
        .map_err(SetupError::from)
        .with_context(|| format!("failed to look up host {fqdn}"))?
        .ok_or_else(|| SetupError::HostNotFound {
            fqdn: fqdn.to_string(),
        })?;

    info!(
        "✅ Preflight complete (proxy #{} {}, host #{})",
        proxy.id, proxy.name, host.id
    );
    Ok(ProvisioningContext {
        fqdn: fqdn.to_string(),
        proxy,
        host,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use provwiz_backend::{FakeBackend, Operation, StaticHostInfo};

    const FQDN: &str = "foreman.example.org";

    #[test]
    fn missing_proxy_is_reported_first() {
        let backend = FakeBackend::new();
        let err = check(&backend, FQDN).unwrap_err();
        match err.downcast_ref::<SetupError>() {
            Some(SetupError::ProxyNotFound { fqdn }) => assert_eq!(fqdn, FQDN),
            other => panic!("unexpected error: {other:?}"),
        }
        // The host lookup never happens once the proxy is missing.
        assert!(!backend.has_operation(|op| matches!(op, Operation::FindHost { .. })));
    }

    #[test]
    fn missing_host_is_reported() {
        let backend = FakeBackend::new();
        backend.add_proxy(FQDN);
        let err = check(&backend, FQDN).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::HostNotFound { .. })
        ));
        assert_eq!(err.to_string(), format!("Host not found for {FQDN}"));
    }

    #[test]
    fn resolves_context_through_host_info() {
        let backend = FakeBackend::new();
        let proxy = backend.add_proxy(FQDN);
        let host = backend.add_host(FQDN);

        let ctx = run(&backend, &StaticHostInfo(FQDN.to_string())).unwrap();
        assert_eq!(ctx.proxy, proxy);
        assert_eq!(ctx.host, host);
        assert!(!backend.has_operation(Operation::is_mutation));
    }

    #[test]
    fn proxy_for_other_host_does_not_count() {
        let backend = FakeBackend::new();
        backend.add_proxy("proxy.example.org");
        backend.add_host(FQDN);
        assert!(check(&backend, FQDN).is_err());
    }
}
