//! Service registry record (C3).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Registration request submitted by a cooperating service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ServiceRegistration {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub health_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A registered service as persisted, one file per `service_name`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RegisteredService {
    pub service_name: String,
    pub host: String,
    pub port: u16,
    pub health_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,
    pub is_healthy: bool,
}

impl RegisteredService {
    pub fn from_registration(reg: ServiceRegistration) -> Self {
        Self {
            service_name: reg.service_name,
            host: reg.host,
            port: reg.port,
            health_path: reg.health_path,
            description: reg.description,
            tags: reg.tags,
            registered_at: Utc::now(),
            last_health_check: None,
            is_healthy: true,
        }
    }

    pub fn health_url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.health_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_url_is_assembled_from_parts() {
        let svc = RegisteredService::from_registration(ServiceRegistration {
            service_name: "download".into(),
            host: "127.0.0.1".into(),
            port: 8002,
            health_path: "/health".into(),
            description: None,
            tags: vec![],
        });
        assert_eq!(svc.health_url(), "http://127.0.0.1:8002/health");
        assert!(svc.is_healthy);
    }
}
