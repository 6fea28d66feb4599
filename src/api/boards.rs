//! Board reads and column/settings updates.

use crate::provider::ProviderHandle;
use crate::resilience::ResilienceStack;
use crate::types::{Board, BoardSettings, BoardsList};
use crate::Result;
use std::sync::Arc;

pub struct BoardsApi {
    stack: Arc<ResilienceStack>,
    provider: ProviderHandle,
}

impl BoardsApi {
    pub(crate) fn new(stack: Arc<ResilienceStack>, provider: ProviderHandle) -> Self {
        Self { stack, provider }
    }

    pub async fn list(&self) -> Result<BoardsList> {
        super::call(
            &self.stack,
            &self.provider,
            None,
            "list_boards",
            "",
            move |p| async move { p.list_boards().await },
        )
        .await
    }

    pub async fn get(&self, board_id: impl Into<String>) -> Result<Board> {
        let board_id = board_id.into();
        super::call(
            &self.stack,
            &self.provider,
            None,
            "get_board",
            &board_id.clone(),
            move |p| {
                let board_id = board_id.clone();
                async move { p.get_board(board_id).await }
            },
        )
        .await
    }

    pub async fn update_settings(
        &self,
        board_id: impl Into<String>,
        settings: BoardSettings,
    ) -> Result<Board> {
        let board_id = board_id.into();
        super::call(
            &self.stack,
            &self.provider,
            None,
            "update_board_settings",
            &board_id.clone(),
            move |p| {
                let board_id = board_id.clone();
                let settings = settings.clone();
                async move { p.update_board_settings(board_id, settings).await }
            },
        )
        .await
    }
}
