//! Project team reads.

use crate::provider::{FallbackResolver, ProviderHandle};
use crate::resilience::ResilienceStack;
use crate::types::{Team, TeamMembers, TeamsList};
use crate::Result;
use std::sync::Arc;

pub struct TeamsApi {
    stack: Arc<ResilienceStack>,
    provider: ProviderHandle,
    fallback: Arc<FallbackResolver>,
}

impl TeamsApi {
    pub(crate) fn new(
        stack: Arc<ResilienceStack>,
        provider: ProviderHandle,
        fallback: Arc<FallbackResolver>,
    ) -> Self {
        Self {
            stack,
            provider,
            fallback,
        }
    }

    pub async fn list(&self) -> Result<TeamsList> {
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "list_teams",
            "",
            move |p| async move { p.list_teams().await },
        )
        .await
    }

    pub async fn get(&self, team_id: impl Into<String>) -> Result<Team> {
        let team_id = team_id.into();
        let target = team_id.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "get_team",
            &target,
            move |p| {
                let team_id = team_id.clone();
                async move { p.get_team(team_id).await }
            },
        )
        .await
    }

    pub async fn members(&self, team_id: impl Into<String>) -> Result<TeamMembers> {
        let team_id = team_id.into();
        let target = team_id.clone();
        super::call(
            &self.stack,
            &self.provider,
            Some(&self.fallback),
            "list_team_members",
            &target,
            move |p| {
                let team_id = team_id.clone();
                async move { p.list_team_members(team_id).await }
            },
        )
        .await
    }
}
