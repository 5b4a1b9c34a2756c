use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Health Reporting
// ============================================================================
//
// Each collaborator reports a `ComponentHealth`; `SystemHealth` folds them.
// The store is the only component whose loss makes the service unhealthy on
// its own terms, but the fold itself is generic: any unhealthy component
// makes the system unhealthy, any degraded one makes it degraded.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
        }
    }

    pub fn healthy(name: impl Into<String>) -> Self {
        Self::new(name, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
    pub checked_at: DateTime<Utc>,
}

impl SystemHealth {
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let unhealthy: Vec<&str> = components
            .iter()
            .filter(|c| c.status.is_unhealthy())
            .map(|c| c.name.as_str())
            .collect();
        let degraded: Vec<&str> = components
            .iter()
            .filter(|c| !c.status.is_healthy() && !c.status.is_unhealthy())
            .map(|c| c.name.as_str())
            .collect();

        let status = if !unhealthy.is_empty() {
            HealthStatus::Unhealthy(format!("unhealthy: {}", unhealthy.join(", ")))
        } else if !degraded.is_empty() {
            HealthStatus::Degraded(format!("degraded: {}", degraded.join(", ")))
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            components,
            checked_at: Utc::now(),
        }
    }

    /// Whether the service can take traffic
    pub fn is_available(&self) -> bool {
        !self.status.is_unhealthy()
    }
}
