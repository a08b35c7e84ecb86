//! Reconciler for maintaining desired license state.
//!
//! This module implements the lifecycle operations that converge a user's
//! actual license assignments (Microsoft Graph) to the declared desired
//! state, plus the config-driven drivers used by the CLI. Actual state is
//! fetched fresh on every operation; nothing is cached between calls.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{LicenseConfig, UserLicenseConfig};
use crate::diff::{DeltaEngine, UserLicenseDiff};
use crate::error::{O365Error, ReconcileError, Result};
use crate::graph::{LicenseApi, LicenseAssignment};
use crate::retry::RetryPolicy;

/// Reconciler for user license assignments.
pub struct LicenseReconciler<'a, A: LicenseApi> {
    /// Graph API collaborator.
    api: &'a A,
    /// Delta engine.
    delta_engine: DeltaEngine,
    /// Retry policy for fetches and the create mutation.
    retry: RetryPolicy,
}

/// Result of a config-wide reconciliation run.
#[derive(Debug, serde::Serialize)]
pub struct ReconciliationResult {
    /// Whether reconciliation succeeded for every user.
    pub success: bool,
    /// Number of users whose licenses were assigned from scratch.
    pub created: usize,
    /// Number of users whose assignments were converged.
    pub updated: usize,
    /// Number of users already matching the declaration.
    pub unchanged: usize,
    /// Number of users whose assignments were torn down.
    pub deleted: usize,
    /// Errors encountered.
    pub errors: Vec<String>,
}

/// Report of drift detection across the configuration.
#[derive(Debug, serde::Serialize)]
pub struct DriftReport {
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
    /// Total number of users in the configuration.
    pub total_users: usize,
    /// Per-user differences (including converged users).
    pub diffs: Vec<UserLicenseDiff>,
    /// Users declared in config but absent from the tenant.
    pub missing_users: Vec<String>,
}

impl<'a, A: LicenseApi> LicenseReconciler<'a, A> {
    /// Creates a new reconciler with the default retry policy.
    #[must_use]
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            delta_engine: DeltaEngine::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetches a user's current assignments under the retry policy.
    async fn fetch_actual(&self, user_principal_name: &str) -> Result<Vec<LicenseAssignment>> {
        let api = self.api;
        self.retry
            .run(|| async move { api.get_license_details(user_principal_name).await })
            .await
    }

    /// Creates a managed license assignment for a user.
    ///
    /// Every declared license becomes an add; no removals are issued. The
    /// mutation is wrapped in the bounded retry policy. On success the
    /// resource identity (the user principal name) is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the mutation never succeeds within the deadline
    /// or fails terminally.
    pub async fn create(&self, desired: &UserLicenseConfig) -> Result<String> {
        let upn = desired.user_principal_name.as_str();
        info!("Creating license assignment for {upn}");

        let assignments = desired.to_assignments();
        let delta = self.delta_engine.delta_for_create(&assignments);
        let delta_ref = &delta;

        let api = self.api;
        self.retry
            .run(|| async move { api.assign_licenses(upn, delta_ref).await })
            .await?;

        info!("Created license assignment for {upn}");
        Ok(desired.user_principal_name.clone())
    }

    /// Reads a user's current assignments, projected into the desired-state
    /// shape so callers can diff against their declaration.
    ///
    /// Returns `Ok(None)` when the user no longer exists: the resource was
    /// deleted outside this tool, and the caller should drop its identity.
    ///
    /// # Errors
    ///
    /// Returns any non-not-found fetch failure after retries.
    pub async fn read(&self, user_principal_name: &str) -> Result<Option<UserLicenseConfig>> {
        debug!("Reading license assignment for {user_principal_name}");

        match self.fetch_actual(user_principal_name).await {
            Ok(assignments) => Ok(Some(UserLicenseConfig::from_assignments(
                user_principal_name,
                &assignments,
            ))),
            Err(e) if e.is_not_found() => {
                warn!("User {user_principal_name} no longer exists, clearing identity");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Converges a user's assignments to the desired state.
    ///
    /// The user principal name is the immutable resource identity: if
    /// `desired` names a different user than `resource_id`, the update is
    /// rejected before any API call. Otherwise the remove list is the set
    /// difference (actual minus desired, by SKU id), the add list is the
    /// entire desired set, and both are applied in one mutation. That final
    /// mutation is a single attempt, not wrapped in the retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::ImmutableField`] on an identity change
    /// attempt, or any fetch/mutation failure.
    pub async fn update(&self, resource_id: &str, desired: &UserLicenseConfig) -> Result<()> {
        if desired.user_principal_name != resource_id {
            return Err(O365Error::Reconcile(ReconcileError::ImmutableField));
        }

        info!("Updating license assignment for {resource_id}");

        let actual = self.fetch_actual(resource_id).await?;
        let delta = self
            .delta_engine
            .delta_for_update(&desired.to_assignments(), &actual);

        self.api.assign_licenses(resource_id, &delta).await?;

        info!("Updated license assignment for {resource_id}: {delta}");
        Ok(())
    }

    /// Tears down every license currently assigned to a user.
    ///
    /// The mutation is a single attempt, not wrapped in the retry policy.
    ///
    /// # Errors
    ///
    /// Returns any fetch or mutation failure.
    pub async fn delete(&self, user_principal_name: &str) -> Result<()> {
        info!("Deleting license assignment for {user_principal_name}");

        let actual = self.fetch_actual(user_principal_name).await?;
        let delta = self.delta_engine.delta_for_delete(&actual);

        self.api.assign_licenses(user_principal_name, &delta).await?;

        info!(
            "Removed {} license(s) from {user_principal_name}",
            delta.remove_licenses.len()
        );
        Ok(())
    }

    /// Imports an existing assignment into management.
    ///
    /// Fetches the user's current assignments in a single attempt (no retry)
    /// and returns them in the desired-state document shape.
    ///
    /// # Errors
    ///
    /// Returns any fetch failure, including not-found.
    pub async fn import(&self, user_principal_name: &str) -> Result<UserLicenseConfig> {
        info!("Importing license assignment for {user_principal_name}");

        let assignments = self.api.get_license_details(user_principal_name).await?;
        Ok(UserLicenseConfig::from_assignments(
            user_principal_name,
            &assignments,
        ))
    }

    /// Reconciles every user in the configuration, continuing past
    /// individual failures.
    ///
    /// # Errors
    ///
    /// Individual user failures are collected into the result rather than
    /// returned; only infrastructure-level failures propagate.
    pub async fn apply_all(&self, config: &LicenseConfig) -> Result<ReconciliationResult> {
        info!(
            "Reconciling {} user(s) for tenant {}",
            config.users.len(),
            config.tenant.name
        );

        let mut result = ReconciliationResult::empty();

        for user in &config.users {
            let upn = user.user_principal_name.as_str();

            match self.apply_user(user).await {
                Ok(UserOutcome::Created) => result.created += 1,
                Ok(UserOutcome::Updated) => result.updated += 1,
                Ok(UserOutcome::Unchanged) => result.unchanged += 1,
                Err(e) => {
                    let wrapped = ReconcileError::UserReconcileFailed {
                        user_principal_name: upn.to_string(),
                        reason: e.to_string(),
                    };
                    warn!("{wrapped}");
                    result.errors.push(wrapped.to_string());
                }
            }
        }

        result.success = result.errors.is_empty();
        Ok(result)
    }

    /// Reconciles a single user and reports what was done.
    async fn apply_user(&self, user: &UserLicenseConfig) -> Result<UserOutcome> {
        let upn = user.user_principal_name.as_str();

        let Some(current) = self.read(upn).await? else {
            return Err(O365Error::Graph(crate::error::GraphError::ResourceNotFound {
                code: String::from("Request_ResourceNotFound"),
                message: format!("User {upn} does not exist in the tenant"),
            }));
        };

        if current.licenses.is_empty() && !user.licenses.is_empty() {
            self.create(user).await?;
            return Ok(UserOutcome::Created);
        }

        let diff = self.delta_engine.diff(
            upn,
            &user.to_assignments(),
            &current.to_assignments(),
        );

        if !diff.has_changes() {
            debug!("User {upn} already converged");
            return Ok(UserOutcome::Unchanged);
        }

        self.update(upn, user).await?;
        Ok(UserOutcome::Updated)
    }

    /// Checks for drift without applying changes.
    ///
    /// # Errors
    ///
    /// Returns an error if any fetch fails for a reason other than the user
    /// being absent.
    pub async fn check_drift(&self, config: &LicenseConfig) -> Result<DriftReport> {
        info!("Checking drift for tenant {}", config.tenant.name);

        let mut diffs = Vec::new();
        let mut missing_users = Vec::new();

        for user in &config.users {
            let upn = user.user_principal_name.as_str();

            match self.read(upn).await? {
                Some(current) => {
                    diffs.push(self.delta_engine.diff(
                        upn,
                        &user.to_assignments(),
                        &current.to_assignments(),
                    ));
                }
                None => missing_users.push(upn.to_string()),
            }
        }

        Ok(DriftReport {
            checked_at: Utc::now(),
            total_users: config.users.len(),
            diffs,
            missing_users,
        })
    }

    /// Removes every managed license assignment in the configuration,
    /// continuing past individual failures.
    ///
    /// # Errors
    ///
    /// Individual user failures are collected into the result rather than
    /// returned; only infrastructure-level failures propagate.
    pub async fn destroy_all(&self, config: &LicenseConfig) -> Result<ReconciliationResult> {
        info!(
            "Destroying license assignments for {} user(s)",
            config.users.len()
        );

        let mut result = ReconciliationResult::empty();

        for user in &config.users {
            let upn = user.user_principal_name.as_str();

            match self.delete(upn).await {
                Ok(()) => result.deleted += 1,
                Err(e) => {
                    let wrapped = ReconcileError::UserReconcileFailed {
                        user_principal_name: upn.to_string(),
                        reason: e.to_string(),
                    };
                    warn!("{wrapped}");
                    result.errors.push(wrapped.to_string());
                }
            }
        }

        result.success = result.errors.is_empty();
        Ok(result)
    }
}

/// Outcome of reconciling one user.
enum UserOutcome {
    Created,
    Updated,
    Unchanged,
}

impl ReconciliationResult {
    /// An empty (all-zero) result.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            success: false,
            created: 0,
            updated: 0,
            unchanged: 0,
            deleted: 0,
            errors: Vec::new(),
        }
    }
}

impl DriftReport {
    /// Returns true if any user has drifted or gone missing.
    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.missing_users.is_empty() || self.diffs.iter().any(UserLicenseDiff::has_changes)
    }

    /// Returns true if the state is converged (no drift).
    #[must_use]
    pub fn is_converged(&self) -> bool {
        !self.has_drift()
    }

    /// Returns the names of users requiring changes.
    #[must_use]
    pub fn drifted_users(&self) -> Vec<&str> {
        self.diffs
            .iter()
            .filter(|d| d.has_changes())
            .map(|d| d.user_principal_name.as_str())
            .collect()
    }
}

impl std::fmt::Display for DriftReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_drift() {
            writeln!(f, "Drift detected:")?;
            for user in self.drifted_users() {
                writeln!(f, "  - {user}")?;
            }
            for user in &self.missing_users {
                writeln!(f, "  - {user} (missing from tenant)")?;
            }
        } else {
            write!(f, "No drift detected - state is converged")?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.success { "successful" } else { "failed" };
        writeln!(f, "Reconciliation {status}:")?;
        writeln!(f, "  Created: {}", self.created)?;
        writeln!(f, "  Updated: {}", self.updated)?;
        writeln!(f, "  Deleted: {}", self.deleted)?;
        writeln!(f, "  Unchanged: {}", self.unchanged)?;

        if !self.errors.is_empty() {
            writeln!(f, "  Errors:")?;
            for error in &self.errors {
                writeln!(f, "    - {error}")?;
            }
        }

        Ok(())
    }
}
