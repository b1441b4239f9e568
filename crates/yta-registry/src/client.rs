//! File-backed service registry: register, list, unregister, and health-check
//! downstream services.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;
use yta_models::{RegisteredService, ServiceRegistration};

use crate::error::{RegistryError, RegistryResult};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RegistryClient {
    registry_dir: PathBuf,
    http: reqwest::Client,
}

impl RegistryClient {
    pub async fn new(registry_dir: impl Into<PathBuf>) -> RegistryResult<Self> {
        let registry_dir = registry_dir.into();
        tokio::fs::create_dir_all(&registry_dir).await?;
        let http = reqwest::Client::builder()
            .timeout(HEALTH_CHECK_TIMEOUT)
            .build()
            .expect("reqwest client builds with a static timeout");
        Ok(Self { registry_dir, http })
    }

    fn service_path(&self, service_name: &str) -> PathBuf {
        self.registry_dir.join(format!("{service_name}.json"))
    }

    pub async fn register(
        &self,
        registration: ServiceRegistration,
    ) -> RegistryResult<RegisteredService> {
        let service = RegisteredService::from_registration(registration);
        let path = self.service_path(&service.service_name);
        let rendered = serde_json::to_string_pretty(&service)?;
        tokio::fs::write(&path, rendered).await?;
        Ok(service)
    }

    pub async fn list(&self) -> RegistryResult<Vec<RegisteredService>> {
        let mut services = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.registry_dir).await?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable registry file");
                    continue;
                }
            };
            match serde_json::from_str::<RegisteredService>(&raw) {
                Ok(service) => services.push(service),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping malformed registry file");
                }
            }
        }
        services.sort_by(|a, b| a.service_name.cmp(&b.service_name));
        Ok(services)
    }

    pub async fn unregister(&self, service_name: &str) -> RegistryResult<()> {
        let path = self.service_path(service_name);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|_| RegistryError::NotFound(service_name.to_string()))
    }

    pub async fn get(&self, service_name: &str) -> RegistryResult<RegisteredService> {
        let path = self.service_path(service_name);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| RegistryError::NotFound(service_name.to_string()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Probe a registered service's health endpoint with a 5s timeout.
    pub async fn health_check(&self, service: &RegisteredService) -> bool {
        match self.http.get(service.health_url()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(service = %service.service_name, error = %e, "health check failed");
                false
            }
        }
    }

    /// Probe `service_name`'s health and persist the result on `is_healthy`
    /// / `last_health_check`. No automatic eviction happens here or anywhere
    /// else in this crate; a service only ever leaves the registry via
    /// `unregister`.
    pub async fn refresh_health(&self, service_name: &str) -> RegistryResult<RegisteredService> {
        let mut service = self.get(service_name).await?;
        service.is_healthy = self.health_check(&service).await;
        service.last_health_check = Some(chrono::Utc::now());
        let path = self.service_path(service_name);
        let rendered = serde_json::to_string_pretty(&service)?;
        tokio::fs::write(&path, rendered).await?;
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn registration(name: &str, port: u16) -> ServiceRegistration {
        ServiceRegistration {
            service_name: name.to_string(),
            host: "127.0.0.1".to_string(),
            port,
            health_path: "/health".to_string(),
            description: None,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn register_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let client = RegistryClient::new(dir.path()).await.unwrap();
        client.register(registration("download", 8002)).await.unwrap();
        client.register(registration("metadata", 8001)).await.unwrap();

        let services = client.list().await.unwrap();
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].service_name, "download");
        assert_eq!(services[1].service_name, "metadata");
    }

    #[tokio::test]
    async fn unregister_missing_service_errors() {
        let dir = tempfile::tempdir().unwrap();
        let client = RegistryClient::new(dir.path()).await.unwrap();
        let err = client.unregister("ghost").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_skips_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let client = RegistryClient::new(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("bad.json"), b"not json").await.unwrap();
        client.register(registration("download", 8002)).await.unwrap();

        let services = client.list().await.unwrap();
        assert_eq!(services.len(), 1);
    }

    #[tokio::test]
    async fn health_check_reflects_probe_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = RegistryClient::new(dir.path()).await.unwrap();
        let uri = server.uri();
        let parsed: url::Url = uri.parse().unwrap();
        let service = client
            .register(ServiceRegistration {
                service_name: "metadata".to_string(),
                host: parsed.host_str().unwrap().to_string(),
                port: parsed.port().unwrap(),
                health_path: "/health".to_string(),
                description: None,
                tags: vec![],
            })
            .await
            .unwrap();

        assert!(client.health_check(&service).await);
    }

    #[tokio::test]
    async fn get_missing_service_errors() {
        let dir = tempfile::tempdir().unwrap();
        let client = RegistryClient::new(dir.path()).await.unwrap();
        let err = client.get("ghost").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn refresh_health_persists_probe_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let client = RegistryClient::new(dir.path()).await.unwrap();
        client
            .register(registration("unreachable", 1))
            .await
            .unwrap();

        let refreshed = client.refresh_health("unreachable").await.unwrap();
        assert!(!refreshed.is_healthy);
        assert!(refreshed.last_health_check.is_some());

        let reloaded = client.get("unreachable").await.unwrap();
        assert!(!reloaded.is_healthy);
    }
}
