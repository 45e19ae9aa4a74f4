//! Provisioning sequencer
//!
//! Runs the bootstrap phases strictly in order against a [`ControlPlane`].
//! Every create is preceded by an existence check, so a partially
//! provisioned organization can be re-run from the start.

use crate::action::{Action, ActionOutcome, ActionType, ApplyResult};
use crate::error::{CloudError, Result};
use crate::provider::{BucketSpec, ControlPlane, OidcProviderSpec, Probe, RegistrySpec};
use crate::wait::{WaitOutcome, WaitStrategy, retry_call};
use seedflow_core::{
    BootstrapConfig, ENVIRONMENT_ROLES, ENVIRONMENT_SERVICES, Environment, ExportReport,
    GITHUB_OIDC_ISSUER, OrgPolicy, SHARED_PROJECT_ROLES, SHARED_SERVICES, STATE_BUCKET_ROLE,
    WORKLOAD_IDENTITY_USER_ROLE, attribute_mapping, principal_set,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Bootstrap phases in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    CreateProjects,
    LinkBilling,
    SharedProject,
    ServiceAccounts,
    WorkloadIdentity,
    ArtifactRegistry,
    Environments,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::CreateProjects,
        Phase::LinkBilling,
        Phase::SharedProject,
        Phase::ServiceAccounts,
        Phase::WorkloadIdentity,
        Phase::ArtifactRegistry,
        Phase::Environments,
    ];

    /// ID used by `--skip`
    pub fn id(&self) -> &'static str {
        match self {
            Phase::CreateProjects => "projects",
            Phase::LinkBilling => "billing",
            Phase::SharedProject => "shared",
            Phase::ServiceAccounts => "service-accounts",
            Phase::WorkloadIdentity => "workload-identity",
            Phase::ArtifactRegistry => "registry",
            Phase::Environments => "environments",
        }
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Phase::CreateProjects => "プロジェクト作成",
            Phase::LinkBilling => "請求先アカウント紐付け",
            Phase::SharedProject => "共有プロジェクト設定",
            Phase::ServiceAccounts => "サービスアカウント作成",
            Phase::WorkloadIdentity => "Workload Identity 連携",
            Phase::ArtifactRegistry => "Artifact Registry 設定",
            Phase::Environments => "環境ごとの権限付与",
        }
    }

    pub fn from_id(id: &str) -> Option<Phase> {
        Phase::ALL.into_iter().find(|p| p.id() == id)
    }

    /// Parse a comma separated list of phase ids
    pub fn parse_list(list: &str) -> std::result::Result<Vec<Phase>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|id| {
                Phase::from_id(id).ok_or_else(|| {
                    format!(
                        "不明なフェーズです: {} (利用可能: {})",
                        id,
                        Phase::ALL
                            .iter()
                            .map(|p| p.id())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                })
            })
            .collect()
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Receives progress notifications while the sequence runs
pub trait StepObserver {
    fn phase_started(&mut self, _phase: Phase) {}

    fn phase_skipped(&mut self, _phase: Phase) {}

    /// `failures` counts failed actions inside the phase
    fn phase_finished(&mut self, _phase: Phase, _failures: usize) {}

    fn action_finished(&mut self, _action: &Action, _outcome: &ActionOutcome) {}

    fn waiting(&mut self, _reason: &str, _strategy: &WaitStrategy) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl StepObserver for NoopObserver {}

#[derive(Debug, Clone, Default)]
pub struct SequenceOptions {
    /// Phases to leave out
    pub skip: Vec<Phase>,
    /// Record failures and keep going instead of halting
    pub continue_on_error: bool,
}

/// Outcome of a run, including one that halted part way
#[derive(Debug)]
pub struct BootstrapOutcome {
    /// Canonical pool name as returned by the control plane
    pub pool_name: Option<String>,
    pub result: ApplyResult,
    /// Phases that ran without any failed action
    pub completed_phases: Vec<Phase>,
    pub report: ExportReport,
    /// Set when a failure stopped the run
    pub halted: Option<CloudError>,
}

impl BootstrapOutcome {
    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Turn a halted run into its error
    pub fn into_result(self) -> Result<Self> {
        match self.halted {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

struct RunContext<'o> {
    result: ApplyResult,
    pool_name: Option<String>,
    /// Service accounts or the pool were created during this run
    fresh_identities: bool,
    observer: &'o mut dyn StepObserver,
}

pub struct Sequencer<'a, C: ControlPlane + ?Sized> {
    config: &'a BootstrapConfig,
    plane: &'a C,
    wait: WaitStrategy,
    options: SequenceOptions,
}

impl<'a, C: ControlPlane + ?Sized> Sequencer<'a, C> {
    pub fn new(config: &'a BootstrapConfig, plane: &'a C) -> Self {
        Self {
            config,
            plane,
            wait: WaitStrategy::from_settings(&config.wait),
            options: SequenceOptions::default(),
        }
    }

    pub fn with_wait(mut self, wait: WaitStrategy) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_options(mut self, options: SequenceOptions) -> Self {
        self.options = options;
        self
    }

    /// Run every phase in order and build the export report.
    ///
    /// A halted run still returns what it got done so far; check
    /// [`BootstrapOutcome::halted`].
    pub async fn run(&self, observer: &mut dyn StepObserver) -> BootstrapOutcome {
        let start = Instant::now();
        let mut ctx = RunContext {
            result: ApplyResult::new(),
            pool_name: None,
            fresh_identities: false,
            observer,
        };
        let mut completed_phases = Vec::new();
        let mut halted = None;

        info!(
            plane = self.plane.name(),
            shared = %self.config.projects.shared,
            "Starting bootstrap"
        );

        for phase in Phase::ALL {
            if self.options.skip.contains(&phase) {
                info!(phase = %phase, "Skipping phase");
                ctx.observer.phase_skipped(phase);
                continue;
            }

            ctx.observer.phase_started(phase);
            let failed_before = ctx.result.failed.len();

            let step = match phase {
                Phase::CreateProjects => self.create_projects(&mut ctx).await,
                Phase::LinkBilling => self.link_billing(&mut ctx).await,
                Phase::SharedProject => self.shared_project(&mut ctx).await,
                Phase::ServiceAccounts => self.service_accounts(&mut ctx).await,
                Phase::WorkloadIdentity => self.workload_identity(&mut ctx).await,
                Phase::ArtifactRegistry => self.artifact_registry(&mut ctx).await,
                Phase::Environments => self.environments(&mut ctx).await,
            };

            // 中断したフェーズも失敗件数つきで通知する
            let failures = ctx.result.failed.len() - failed_before;
            if failures == 0 && step.is_ok() {
                completed_phases.push(phase);
            }
            ctx.observer.phase_finished(phase, failures);

            if let Err(e) = step {
                warn!(phase = %phase, "Bootstrap halted");
                halted = Some(e);
                break;
            }
        }

        // workload-identity を飛ばした場合もレポート用にプール名だけは読む
        if halted.is_none()
            && ctx.pool_name.is_none()
            && self.options.skip.contains(&Phase::WorkloadIdentity)
        {
            let shared = &self.config.projects.shared;
            match self
                .plane
                .describe_pool(shared, &self.config.identity_pool)
                .await
            {
                Ok(name) => ctx.pool_name = Some(name),
                Err(e) => warn!("Could not read identity pool name: {}", e),
            }
        }

        ctx.result.duration_ms = start.elapsed().as_millis() as u64;
        let report = ExportReport::build(self.config, ctx.pool_name.as_deref());

        info!(summary = %ctx.result.summary(), "Bootstrap finished");
        BootstrapOutcome {
            pool_name: ctx.pool_name,
            result: ctx.result,
            completed_phases,
            report,
            halted,
        }
    }

    // ========== Phases ==========

    async fn create_projects(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let mut created = Vec::new();

        for project_id in self.config.projects.all() {
            let action = Action::new(
                Phase::CreateProjects,
                ActionType::Create,
                "project",
                project_id,
                format!("プロジェクト {} を作成", project_id),
            );
            let was_created = self
                .ensure(
                    ctx,
                    action,
                    self.plane.project_exists(project_id),
                    self.plane.create_project(project_id, &self.config.folder_id),
                )
                .await?;
            if was_created {
                created.push(Probe::Project(project_id.to_string()));
            }
        }

        self.wait(ctx, Phase::CreateProjects, "プロジェクトの作成を待機", &created)
            .await
    }

    async fn link_billing(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        for project_id in self.config.projects.all() {
            let action = Action::new(
                Phase::LinkBilling,
                ActionType::Link,
                "billing",
                project_id,
                format!(
                    "{} を請求先アカウント {} に紐付け",
                    project_id, self.config.billing_account
                ),
            );
            self.perform(
                ctx,
                action,
                self.plane
                    .link_billing(project_id, &self.config.billing_account),
            )
            .await?;
        }
        Ok(())
    }

    async fn shared_project(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let shared = &self.config.projects.shared;
        let bucket = &self.config.state_bucket;

        self.perform(
            ctx,
            Action::new(
                Phase::SharedProject,
                ActionType::Configure,
                "active-project",
                shared,
                format!("アクティブプロジェクトを {} に切り替え", shared),
            ),
            self.plane.set_active_project(shared),
        )
        .await?;

        self.perform(
            ctx,
            Action::new(
                Phase::SharedProject,
                ActionType::Enable,
                "services",
                shared,
                format!("{} で API を {} 件有効化", shared, SHARED_SERVICES.len()),
            ),
            self.plane.enable_services(shared, SHARED_SERVICES),
        )
        .await?;

        let spec = BucketSpec {
            name: bucket.clone(),
            location: self.config.region.clone(),
            uniform_access: true,
        };
        self.ensure(
            ctx,
            Action::new(
                Phase::SharedProject,
                ActionType::Create,
                "bucket",
                bucket,
                format!("state バケット gs://{} を作成", bucket),
            ),
            self.plane.bucket_exists(bucket),
            self.plane.create_bucket(shared, &spec),
        )
        .await?;

        // 既存バケットでもバージョニングは必ず有効化する
        self.perform(
            ctx,
            Action::new(
                Phase::SharedProject,
                ActionType::Configure,
                "bucket-versioning",
                bucket,
                format!("gs://{} のバージョニングを有効化", bucket),
            ),
            self.plane.enable_bucket_versioning(bucket),
        )
        .await?;

        Ok(())
    }

    async fn service_accounts(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let accounts = self.config.service_account_list();
        let mut created = Vec::new();

        for account in &accounts {
            let email = account.email();
            let was_created = self
                .ensure(
                    ctx,
                    Action::new(
                        Phase::ServiceAccounts,
                        ActionType::Create,
                        "service-account",
                        &email,
                        format!("サービスアカウント {} を作成", email),
                    ),
                    self.plane.service_account_exists(account),
                    self.plane.create_service_account(account),
                )
                .await?;
            if was_created {
                created.push(Probe::ServiceAccount(account.clone()));
            }
        }
        ctx.fresh_identities |= !created.is_empty();

        self.wait(
            ctx,
            Phase::ServiceAccounts,
            "サービスアカウントの伝播を待機",
            &created,
        )
        .await?;

        let plane = self.plane;
        let bucket = self.config.state_bucket.as_str();
        for account in &accounts {
            let member = account.member();
            let member = member.as_str();
            self.grant(
                ctx,
                Action::new(
                    Phase::ServiceAccounts,
                    ActionType::Grant,
                    "bucket-binding",
                    format!("{}:{}", bucket, account.email()),
                    format!("{} に gs://{} の {} を付与", account.email(), bucket, STATE_BUCKET_ROLE),
                ),
                move || plane.grant_bucket_role(bucket, member, STATE_BUCKET_ROLE),
            )
            .await?;
        }

        Ok(())
    }

    async fn workload_identity(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let shared = &self.config.projects.shared;
        let pool_id = &self.config.identity_pool;
        let condition = self.config.repository_condition();

        let pool_created = self
            .ensure(
                ctx,
                Action::new(
                    Phase::WorkloadIdentity,
                    ActionType::Create,
                    "identity-pool",
                    pool_id,
                    format!("Workload Identity プール {} を作成", pool_id),
                ),
                self.plane.pool_exists(shared, pool_id),
                self.plane.create_pool(shared, pool_id, "GitHub Actions"),
            )
            .await?;
        ctx.fresh_identities |= pool_created;

        let provider = OidcProviderSpec {
            provider_id: self.config.identity_provider.clone(),
            pool_id: pool_id.clone(),
            display_name: "GitHub".to_string(),
            issuer_uri: GITHUB_OIDC_ISSUER.to_string(),
            attribute_mapping: attribute_mapping(),
            attribute_condition: condition.expression(),
        };
        self.ensure(
            ctx,
            Action::new(
                Phase::WorkloadIdentity,
                ActionType::Create,
                "identity-provider",
                &provider.provider_id,
                format!(
                    "OIDC プロバイダー {} を作成 ({})",
                    provider.provider_id, provider.attribute_condition
                ),
            ),
            self.plane
                .provider_exists(shared, pool_id, &provider.provider_id),
            self.plane.create_oidc_provider(shared, &provider),
        )
        .await?;

        // プール名はローカルで組み立てず、必ず問い合わせ結果を使う
        let query = Action::new(
            Phase::WorkloadIdentity,
            ActionType::Query,
            "identity-pool",
            pool_id,
            format!("プール {} のリソース名を取得", pool_id),
        );
        match self.plane.describe_pool(shared, pool_id).await {
            Ok(name) => {
                debug!(pool_name = %name, "Resolved identity pool name");
                self.record(ctx, query, ActionOutcome::Done);
                ctx.pool_name = Some(name);
            }
            Err(e) => self.fail(ctx, query, e)?,
        }

        if pool_created {
            let probe = Probe::Pool {
                project_id: shared.clone(),
                pool_id: pool_id.clone(),
            };
            self.wait(
                ctx,
                Phase::WorkloadIdentity,
                "プールの伝播を待機",
                std::slice::from_ref(&probe),
            )
            .await?;
        }

        let pool_name = ctx.pool_name.clone();
        for account in self.config.service_account_list() {
            let action = Action::new(
                Phase::WorkloadIdentity,
                ActionType::Grant,
                "workload-identity-binding",
                account.email(),
                format!(
                    "{} に {} を付与 (repository {}/*)",
                    account.email(),
                    WORKLOAD_IDENTITY_USER_ROLE,
                    condition.organization()
                ),
            );
            match &pool_name {
                Some(pool_name) => {
                    let plane = self.plane;
                    let account = &account;
                    let member = principal_set(pool_name, condition.organization());
                    let member = member.as_str();
                    self.grant(ctx, action, move || {
                        plane.grant_service_account_role(
                            account,
                            member,
                            WORKLOAD_IDENTITY_USER_ROLE,
                        )
                    })
                    .await?;
                }
                None => {
                    let description = action.description.clone();
                    self.fail(ctx, action, CloudError::PoolNameUnavailable(description))?;
                }
            }
        }

        Ok(())
    }

    async fn artifact_registry(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        let shared = &self.config.projects.shared;
        let spec = RegistrySpec {
            name: self.config.registry.clone(),
            location: self.config.region.clone(),
            format: "docker".to_string(),
            description: "Container images".to_string(),
        };

        self.ensure(
            ctx,
            Action::new(
                Phase::ArtifactRegistry,
                ActionType::Create,
                "registry",
                &spec.name,
                format!("Artifact Registry {} を作成", self.config.registry_path()),
            ),
            self.plane
                .registry_exists(shared, &spec.location, &spec.name),
            self.plane.create_registry(shared, &spec),
        )
        .await?;

        for account in self.config.service_account_list() {
            let member = account.member();
            for role in SHARED_PROJECT_ROLES {
                self.perform(
                    ctx,
                    Action::new(
                        Phase::ArtifactRegistry,
                        ActionType::Grant,
                        "project-binding",
                        format!("{}:{}:{}", shared, account.email(), role),
                        format!("{} に {} の {} を付与", account.email(), shared, role),
                    ),
                    self.plane.grant_project_role(shared, &member, role),
                )
                .await?;
            }
        }

        Ok(())
    }

    async fn environments(&self, ctx: &mut RunContext<'_>) -> Result<()> {
        for env in Environment::ALL {
            self.environment(ctx, env).await?;
        }
        Ok(())
    }

    async fn environment(&self, ctx: &mut RunContext<'_>, env: Environment) -> Result<()> {
        let project_id = self.config.projects.for_env(env);

        self.perform(
            ctx,
            Action::new(
                Phase::Environments,
                ActionType::Enable,
                "services",
                project_id,
                format!(
                    "{} で API を {} 件有効化",
                    project_id,
                    ENVIRONMENT_SERVICES.len()
                ),
            ),
            self.plane.enable_services(project_id, ENVIRONMENT_SERVICES),
        )
        .await?;

        let probe = Probe::Services {
            project_id: project_id.to_string(),
            services: ENVIRONMENT_SERVICES.iter().map(|s| s.to_string()).collect(),
        };
        self.wait(
            ctx,
            Phase::Environments,
            &format!("{} の API 有効化を待機", project_id),
            std::slice::from_ref(&probe),
        )
        .await?;

        let account = self.config.service_account(env);
        let member = account.member();
        for role in ENVIRONMENT_ROLES {
            self.perform(
                ctx,
                Action::new(
                    Phase::Environments,
                    ActionType::Grant,
                    "project-binding",
                    format!("{}:{}:{}", project_id, account.email(), role),
                    format!("{} に {} の {} を付与", account.email(), project_id, role),
                ),
                self.plane.grant_project_role(project_id, &member, role),
            )
            .await?;
        }

        let policy = OrgPolicy::allow_all_members(project_id);
        self.perform(
            ctx,
            Action::new(
                Phase::Environments,
                ActionType::Configure,
                "org-policy",
                &policy.name,
                format!("{} で任意のメンバーへのロール付与を許可", project_id),
            ),
            self.plane.set_org_policy(&policy),
        )
        .await?;

        Ok(())
    }

    // ========== Helpers ==========

    /// Check for existence, create if absent. Returns whether a create happened.
    async fn ensure<E, F>(
        &self,
        ctx: &mut RunContext<'_>,
        action: Action,
        exists: E,
        create: F,
    ) -> Result<bool>
    where
        E: Future<Output = Result<bool>>,
        F: Future<Output = Result<()>>,
    {
        match exists.await {
            Ok(true) => {
                debug!(action = %action.id, "Resource already exists");
                self.record(ctx, action, ActionOutcome::Skipped("既に存在します".to_string()));
                Ok(false)
            }
            Ok(false) => self.perform(ctx, action, create).await,
            Err(e) => {
                self.fail(ctx, action, e)?;
                Ok(false)
            }
        }
    }

    /// Run a single call and record its outcome. Returns whether it succeeded.
    async fn perform<F>(&self, ctx: &mut RunContext<'_>, action: Action, call: F) -> Result<bool>
    where
        F: Future<Output = Result<()>>,
    {
        debug!(action = %action.id, "{}", action.description);
        match call.await {
            Ok(()) => {
                self.record(ctx, action, ActionOutcome::Done);
                Ok(true)
            }
            Err(e) => {
                self.fail(ctx, action, e)?;
                Ok(false)
            }
        }
    }

    /// Grant that may depend on identities created earlier in this run.
    ///
    /// IAM rejects bindings for a new service account or pool until it has
    /// propagated, which a describe call does not reveal. In poll mode such
    /// grants are retried with backoff.
    async fn grant<F, Fut>(
        &self,
        ctx: &mut RunContext<'_>,
        action: Action,
        call: F,
    ) -> Result<bool>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        match &self.wait {
            WaitStrategy::Poll(retry) if ctx.fresh_identities => {
                debug!(action = %action.id, "{}", action.description);
                match retry_call(retry, &action.id, call).await {
                    Ok(()) => {
                        self.record(ctx, action, ActionOutcome::Done);
                        Ok(true)
                    }
                    Err(e) => {
                        self.fail(ctx, action, e)?;
                        Ok(false)
                    }
                }
            }
            _ => self.perform(ctx, action, call()).await,
        }
    }

    async fn wait(
        &self,
        ctx: &mut RunContext<'_>,
        phase: Phase,
        reason: &str,
        probes: &[Probe],
    ) -> Result<()> {
        // 何も作成していなければ待つ必要はない
        if probes.is_empty() || self.wait == WaitStrategy::Disabled {
            return Ok(());
        }

        ctx.observer.waiting(reason, &self.wait);
        match self.wait.wait_for(self.plane, probes).await {
            Ok(WaitOutcome::Ready { attempts }) => {
                debug!(reason, attempts, "Propagation confirmed");
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => {
                let action = Action::new(phase, ActionType::Wait, "propagation", reason, reason);
                self.fail(ctx, action, e)
            }
        }
    }

    fn record(&self, ctx: &mut RunContext<'_>, action: Action, outcome: ActionOutcome) {
        ctx.observer.action_finished(&action, &outcome);
        ctx.result.record(action, outcome);
    }

    /// Record a failure; halts unless `continue_on_error` is set
    fn fail(&self, ctx: &mut RunContext<'_>, action: Action, error: CloudError) -> Result<()> {
        let message = error.to_string();
        warn!(action = %action.id, "{}", message);

        let description = action.description.clone();
        self.record(ctx, action, ActionOutcome::Failed(message.clone()));

        if self.options.continue_on_error {
            Ok(())
        } else {
            Err(CloudError::StepFailed {
                action: description,
                message,
            })
        }
    }
}
