//! Seeding engine
//!
//! Creates an Organization Config's groups, sub-channels and members on a
//! tenant server through its admin API. Every step is idempotent: a conflict
//! on create is resolved by looking the existing entity up and reusing it, so
//! a re-deploy converges on the same remote state.
//!
//! Seeding is best-effort. Each entity's result is recorded in the run's
//! [`SeedReport`]; a failure never stops the remaining entities.
//!
//! Order: groups (with default-channel cleanup), sub-channels, members (with
//! group membership, teacher elevation and channel auto-join), then noise
//! cleanup across every channel touched.

mod cleanup;
mod context;

pub use context::RunContext;

use tenantry_core::models::{EntityKind, Member, OrganizationConfig, Outcome, SeedReport};
use tenantry_core::{normalize_handle, SeedingConfig};

use crate::admin_api::{AdminApiClient, ChannelPatch, ChannelType, NewUser, TEAM_ADMIN_ROLES};
use crate::error::AdminApiError;

/// Channel every new team starts with; kept and relabelled.
pub const TOWN_SQUARE: &str = "town-square";
/// Channel every new team starts with; archived.
pub const OFF_TOPIC: &str = "off-topic";

#[derive(Clone, Debug)]
pub struct SeedingEngine {
    config: SeedingConfig,
}

impl SeedingEngine {
    pub fn new(config: SeedingConfig) -> Self {
        Self { config }
    }

    /// Seed `org` into the server behind the authenticated `api` client.
    #[tracing::instrument(skip_all, fields(base_url = %api.base_url()))]
    pub async fn seed(&self, api: &AdminApiClient, org: &OrganizationConfig) -> SeedReport {
        let mut ctx = RunContext::new();

        tracing::info!(
            groups = org.groups.len(),
            sub_channels = org.sub_channels.len(),
            members = org.members.len(),
            "Seeding tenant server"
        );

        self.seed_groups(api, org, &mut ctx).await;
        if org.has_sub_channels() {
            self.seed_sub_channels(api, org, &mut ctx).await;
        }
        for member in &org.members {
            self.seed_member(api, org, member, &mut ctx).await;
        }

        let cleanup = cleanup::remove_system_posts(
            api,
            ctx.channels(),
            self.config.cleanup_page_size,
            self.config.cleanup_max_concurrency,
        )
        .await;
        ctx.report.merge(cleanup);

        let report = ctx.into_report();
        tracing::info!(
            groups = report.succeeded(EntityKind::Group),
            members = report.succeeded(EntityKind::Member),
            member_failures = report.failed(EntityKind::Member),
            failures = report.total_failures(),
            "Seeding finished"
        );
        report
    }

    async fn seed_groups(&self, api: &AdminApiClient, org: &OrganizationConfig, ctx: &mut RunContext) {
        for group in &org.groups {
            let code = group.code.trim();
            let handle = normalize_handle(code);
            if handle.is_empty() {
                tracing::warn!(group = %code, "Group code has no usable handle, skipping");
                ctx.report.record(
                    EntityKind::Group,
                    code,
                    Outcome::Skipped("code yields an empty handle".to_string()),
                );
                continue;
            }

            let resolved = match api.create_team(&handle, group.label()).await {
                Ok(team) => Ok((team.id, Outcome::Created)),
                Err(e) if e.is_conflict() => api
                    .get_team_by_name(&handle)
                    .await
                    .map(|team| (team.id, Outcome::Reused)),
                Err(e) => Err(e),
            };

            match resolved {
                Ok((team_id, outcome)) => {
                    tracing::debug!(group = %code, team_id = %team_id, ?outcome, "Group ready");
                    ctx.record_group(code, team_id.clone());
                    ctx.report.record(EntityKind::Group, code, outcome);
                    self.tidy_default_channels(api, code, &team_id, ctx).await;
                }
                Err(e) => {
                    tracing::warn!(group = %code, error = %e, "Failed to create group");
                    ctx.report
                        .record(EntityKind::Group, code, Outcome::Failed(e.to_string()));
                }
            }
        }
    }

    /// Archive off-topic and relabel town-square. Cosmetic; failures are recorded only.
    async fn tidy_default_channels(
        &self,
        api: &AdminApiClient,
        group_code: &str,
        team_id: &str,
        ctx: &mut RunContext,
    ) {
        let key = format!("{}/{}", group_code, TOWN_SQUARE);
        match api.get_channel_by_name(team_id, TOWN_SQUARE).await {
            Ok(channel) => {
                ctx.record_channel(key.clone(), channel.id.clone());

                let patch = ChannelPatch {
                    display_name: self.config.town_square_display_name.as_deref(),
                    header: self.config.town_square_header.as_deref(),
                };
                let outcome = if patch.is_empty() {
                    Outcome::Skipped("no relabel configured".to_string())
                } else {
                    match api.patch_channel(&channel.id, &patch).await {
                        Ok(_) => Outcome::Updated,
                        Err(e) => {
                            tracing::warn!(group = %group_code, error = %e, "Failed to relabel default channel");
                            Outcome::Failed(e.to_string())
                        }
                    }
                };
                ctx.report.record(EntityKind::DefaultChannel, key, outcome);
            }
            Err(e) => {
                tracing::warn!(group = %group_code, error = %e, "Default channel not found");
                ctx.report
                    .record(EntityKind::DefaultChannel, key, Outcome::Failed(e.to_string()));
            }
        }

        if !self.config.archive_off_topic {
            return;
        }

        let key = format!("{}/{}", group_code, OFF_TOPIC);
        let outcome = match api.get_channel_by_name(team_id, OFF_TOPIC).await {
            Ok(channel) => match api.archive_channel(&channel.id).await {
                Ok(()) => Outcome::Updated,
                Err(e) => {
                    tracing::warn!(group = %group_code, error = %e, "Failed to archive default channel");
                    Outcome::Failed(e.to_string())
                }
            },
            // Archived channels are not returned by name.
            Err(e) if e.is_not_found() => Outcome::Skipped("already archived".to_string()),
            Err(e) => Outcome::Failed(e.to_string()),
        };
        ctx.report.record(EntityKind::DefaultChannel, key, outcome);
    }

    async fn seed_sub_channels(
        &self,
        api: &AdminApiClient,
        org: &OrganizationConfig,
        ctx: &mut RunContext,
    ) {
        for group in &org.groups {
            let group_code = group.code.trim();
            let Some(team_id) = ctx.group_id(group_code).map(str::to_string) else {
                for channel in &org.sub_channels {
                    ctx.report.record(
                        EntityKind::SubChannel,
                        format!("{}/{}", group_code, channel.code.trim()),
                        Outcome::Skipped("group was not provisioned".to_string()),
                    );
                }
                continue;
            };

            for channel in &org.sub_channels {
                let channel_code = channel.code.trim();
                let key = format!("{}/{}", group_code, channel_code);
                let handle = normalize_handle(channel_code);
                if handle.is_empty() {
                    ctx.report.record(
                        EntityKind::SubChannel,
                        key,
                        Outcome::Skipped("code yields an empty handle".to_string()),
                    );
                    continue;
                }

                let channel_type = if channel.is_restricted() {
                    ChannelType::Private
                } else {
                    ChannelType::Open
                };

                let resolved = match api
                    .create_channel(&team_id, &handle, channel.label(), channel_type)
                    .await
                {
                    Ok(created) => Ok((created.id, Outcome::Created)),
                    Err(e) if e.is_conflict() => api
                        .get_channel_by_name(&team_id, &handle)
                        .await
                        .map(|existing| (existing.id, Outcome::Reused)),
                    Err(e) => Err(e),
                };

                match resolved {
                    Ok((channel_id, outcome)) => {
                        ctx.record_sub_channel(group_code, channel_code, channel_id);
                        ctx.report.record(EntityKind::SubChannel, key, outcome);
                    }
                    Err(e) => {
                        tracing::warn!(channel = %key, error = %e, "Failed to create sub-channel");
                        ctx.report
                            .record(EntityKind::SubChannel, key, Outcome::Failed(e.to_string()));
                    }
                }
            }
        }
    }

    async fn seed_member(
        &self,
        api: &AdminApiClient,
        org: &OrganizationConfig,
        member: &Member,
        ctx: &mut RunContext,
    ) {
        let key = member.display_key().to_string();

        let user_id = match self.resolve_member(api, member).await {
            Ok((user_id, outcome)) => {
                ctx.report.record(EntityKind::Member, &key, outcome);
                user_id
            }
            Err(e) => {
                tracing::warn!(member = %key, error = %e, "Failed to create member, skipping");
                ctx.report
                    .record(EntityKind::Member, &key, Outcome::Failed(e.to_string()));
                return;
            }
        };

        let Some(group_code) = member.group() else {
            return;
        };
        let Some(team_id) = ctx.group_id(group_code).map(str::to_string) else {
            ctx.report.record(
                EntityKind::GroupMembership,
                format!("{}@{}", key, group_code),
                Outcome::Skipped("group was not provisioned".to_string()),
            );
            return;
        };

        let membership = match api.add_team_member(&team_id, &user_id).await {
            Ok(()) => Outcome::Created,
            Err(e) if e.is_conflict() => Outcome::Reused,
            Err(e) => {
                tracing::warn!(member = %key, group = %group_code, error = %e, "Failed to add member to group");
                Outcome::Failed(e.to_string())
            }
        };
        ctx.report.record(
            EntityKind::GroupMembership,
            format!("{}@{}", key, group_code),
            membership,
        );

        if member.is_teacher() {
            let outcome = match api
                .update_team_member_roles(&team_id, &user_id, TEAM_ADMIN_ROLES)
                .await
            {
                Ok(()) => Outcome::Updated,
                Err(e) => {
                    tracing::warn!(member = %key, group = %group_code, error = %e, "Failed to elevate teacher");
                    Outcome::Failed(e.to_string())
                }
            };
            ctx.report.record(
                EntityKind::GroupRole,
                format!("{}@{}", key, group_code),
                outcome,
            );
        }

        if self.config.auto_join_channels && org.has_sub_channels() {
            self.join_sub_channels(api, org, member, group_code, &user_id, ctx)
                .await;
        }
    }

    /// Create the member's account, or find it by email when it already exists.
    async fn resolve_member(
        &self,
        api: &AdminApiClient,
        member: &Member,
    ) -> Result<(String, Outcome), AdminApiError> {
        let username = normalize_handle(member.username_source());
        let account = NewUser {
            email: member.email.trim(),
            username: &username,
            password: &member.password,
            first_name: member.full_name.trim(),
        };

        match api.create_user(&account).await {
            Ok(user) => Ok((user.id, Outcome::Created)),
            Err(e) if e.is_conflict() => api
                .get_user_by_email(member.email.trim())
                .await
                .map(|user| (user.id, Outcome::Reused)),
            Err(e) => Err(e),
        }
    }

    async fn join_sub_channels(
        &self,
        api: &AdminApiClient,
        org: &OrganizationConfig,
        member: &Member,
        group_code: &str,
        user_id: &str,
        ctx: &mut RunContext,
    ) {
        for channel in &org.sub_channels {
            let channel_code = channel.code.trim();
            let key = format!("{}@{}/{}", member.display_key(), group_code, channel_code);

            if !self
                .config
                .join_policy
                .admits(channel_code, channel.is_restricted(), &member.role)
            {
                ctx.report.record(
                    EntityKind::ChannelMembership,
                    key,
                    Outcome::Skipped(format!("role \"{}\" not admitted", member.role.trim())),
                );
                continue;
            }

            let Some(channel_id) = ctx
                .sub_channel_id(group_code, channel_code)
                .map(str::to_string)
            else {
                ctx.report.record(
                    EntityKind::ChannelMembership,
                    key,
                    Outcome::Skipped("sub-channel was not provisioned".to_string()),
                );
                continue;
            };

            let outcome = match api.add_channel_member(&channel_id, user_id).await {
                Ok(()) => Outcome::Created,
                Err(e) if e.is_conflict() => Outcome::Reused,
                Err(e) => {
                    tracing::warn!(membership = %key, error = %e, "Failed to join sub-channel");
                    Outcome::Failed(e.to_string())
                }
            };
            ctx.report.record(EntityKind::ChannelMembership, key, outcome);
        }
    }
}
