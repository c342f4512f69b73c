//! Token-ID Minting Engine
//!
//! Walks the level schedule from the slot after the ledger's last minted
//! token up to the supply's high-water mark. Every slot's id is the content
//! address of `"{level} {number}"`. The whole range is inserted as one
//! batch, so a failed run leaves the ledger untouched and can be retried.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use explorer_core::{mint_seed, MintPosition, Token, TokenSchedule, TOKEN_TYPE_RBT};

use crate::context::SyncContext;
use crate::error::{MintError, MintResult};

/// Source of the highest slot that may be minted
#[async_trait]
pub trait SupplySource: Send + Sync {
    async fn high_water_mark(&self) -> MintResult<MintPosition>;
}

/// Fixed high-water mark taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct StaticSupply(pub MintPosition);

#[async_trait]
impl SupplySource for StaticSupply {
    async fn high_water_mark(&self) -> MintResult<MintPosition> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReport {
    pub minted: usize,
    pub first: Option<MintPosition>,
    pub last: Option<MintPosition>,
    /// The schedule has no slot left after this run
    pub exhausted: bool,
}

pub struct TokenMinter {
    ctx: SyncContext,
    schedule: TokenSchedule,
    supply: Arc<dyn SupplySource>,
    token_type: String,
    running: Mutex<()>,
}

impl TokenMinter {
    pub fn new(ctx: SyncContext, schedule: TokenSchedule, supply: Arc<dyn SupplySource>) -> Self {
        Self {
            ctx,
            schedule,
            supply,
            token_type: TOKEN_TYPE_RBT.to_string(),
            running: Mutex::new(()),
        }
    }

    pub fn schedule(&self) -> &TokenSchedule {
        &self.schedule
    }

    /// Mint up to the supply's current high-water mark
    pub async fn mint_pending(&self) -> MintResult<MintReport> {
        let target = self.supply.high_water_mark().await?;
        self.mint_until(target).await
    }

    /// Mint every unminted slot up to and including `target`
    pub async fn mint_until(&self, target: MintPosition) -> MintResult<MintReport> {
        let _running = self.running.lock().await;

        let start = match self.ctx.store.latest_minted(&self.token_type).await? {
            Some(last) => last.next_number(),
            None => MintPosition::origin(),
        };

        let mut cursor = self.schedule.normalize(start);
        let mut tokens = Vec::new();

        while let Some(position) = cursor {
            if position > target {
                break;
            }
            let token_id = self
                .ctx
                .oracle
                .hash_str(&mint_seed(position))
                .await
                .map_err(|source| MintError::Hash { position, source })?;
            debug!(token_id = %token_id, level = position.level, number = position.number, "Slot hashed");

            tokens.push(Token::minted(token_id, position));
            cursor = self.schedule.advance(position);
        }

        let report = MintReport {
            minted: tokens.len(),
            first: tokens.first().map(Token::position),
            last: tokens.last().map(Token::position),
            exhausted: cursor.is_none(),
        };

        if report.exhausted {
            info!(last = ?report.last, "Token schedule exhausted");
        }

        if tokens.is_empty() {
            debug!(high_water_mark = %target, "Nothing to mint");
            return Ok(report);
        }

        self.ctx.store.insert_tokens(&tokens).await?;

        info!(
            count = report.minted,
            first = ?report.first,
            last = ?report.last,
            "Tokens minted"
        );

        Ok(report)
    }
}
