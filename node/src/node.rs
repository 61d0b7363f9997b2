//! Node assembly: config → engine → running service.

use std::sync::Arc;

use agora_governance::{BlockClock, CallContext, GovernanceEngine, RewardHook, TreasuryLedger};
use agora_store::{MetaStore, StoreError};
use agora_store_lmdb::LmdbMetaStore;
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::service::{GovernanceHandle, GovernanceService};
use crate::shutdown::{ShutdownController, ShutdownReason};
use crate::NodeError;

/// An Agora governance node.
///
/// Restores the engine from `data_dir` when a snapshot exists, otherwise
/// builds a fresh one from the config's params, genesis voters and veto
/// council. [`start`](Self::start) spawns the governance service;
/// [`stop`](Self::stop) signals it, waits for it to persist and returns the
/// final engine.
pub struct AgoraNode {
    config: NodeConfig,
    clock: Arc<dyn BlockClock>,
    shutdown: Arc<ShutdownController>,
    store: Option<Arc<dyn MetaStore + Send + Sync>>,
    service: Option<GovernanceService>,
    handle: GovernanceHandle,
    task: Option<JoinHandle<Result<GovernanceEngine, NodeError>>>,
}

impl AgoraNode {
    pub fn new(
        config: NodeConfig,
        clock: Arc<dyn BlockClock>,
        treasury: Box<dyn TreasuryLedger + Send>,
    ) -> Result<Self, NodeError> {
        config.validate()?;

        let store: Option<Arc<dyn MetaStore + Send + Sync>> = match &config.data_dir {
            Some(dir) => Some(Arc::new(
                LmdbMetaStore::open(dir).map_err(StoreError::from)?,
            )),
            None => None,
        };

        let restored = match &store {
            Some(store) => GovernanceEngine::restore(store.as_ref())?,
            None => None,
        };
        let engine = match restored {
            Some(engine) => {
                tracing::info!(
                    proposals = engine.stats().proposal_count,
                    "governance state restored from snapshot"
                );
                engine
            }
            None => Self::genesis_engine(&config)?,
        };

        let (mut service, handle) =
            GovernanceService::new(engine, Arc::clone(&clock), treasury, config.inbox_capacity);
        if let Some(store) = &store {
            service = service.with_store(Arc::clone(store));
        }

        Ok(Self {
            config,
            clock,
            shutdown: Arc::new(ShutdownController::new()),
            store,
            service: Some(service),
            handle,
            task: None,
        })
    }

    /// Build a fresh engine from the config's genesis section.
    fn genesis_engine(config: &NodeConfig) -> Result<GovernanceEngine, NodeError> {
        let mut engine = GovernanceEngine::new(
            config.owner.clone(),
            config.treasury_account.clone(),
            config.params.to_params(),
        )?;
        let ctx = CallContext::new(config.owner.clone(), config.start_block);
        for voter in &config.genesis {
            engine.initialize(&ctx, &voter.identity, u128::from(voter.power), voter.reputation)?;
        }
        if !config.veto_council.is_empty() {
            engine.set_veto_council(&ctx, config.veto_council.clone())?;
        }
        tracing::info!(
            voters = config.genesis.len(),
            total_power = engine.stats().total_voting_power,
            "governance engine created from genesis"
        );
        Ok(engine)
    }

    /// Install a reward hook. Only effective before [`start`](Self::start).
    pub fn with_reward_hook(mut self, hook: Box<dyn RewardHook + Send>) -> Self {
        self.service = self.service.take().map(|s| s.with_reward_hook(hook));
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn BlockClock> {
        &self.clock
    }

    pub fn handle(&self) -> GovernanceHandle {
        self.handle.clone()
    }

    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_persistent(&self) -> bool {
        self.store.is_some()
    }

    /// Spawn the governance service.
    pub fn start(&mut self) -> Result<(), NodeError> {
        let service = self.service.take().ok_or(NodeError::AlreadyStarted)?;
        let shutdown_rx = self.shutdown.subscribe();
        self.task = Some(tokio::spawn(service.run(shutdown_rx)));
        tracing::info!(
            block = %self.clock.current_block(),
            persistent = self.is_persistent(),
            "Agora node started"
        );
        Ok(())
    }

    /// Signal shutdown and wait for the service to persist and exit.
    /// Returns the final engine, or `None` if the node was never started.
    pub async fn stop(&mut self) -> Result<Option<GovernanceEngine>, NodeError> {
        self.shutdown.trigger(ShutdownReason::Requested);
        let Some(task) = self.task.take() else {
            return Ok(None);
        };
        let engine = task
            .await
            .map_err(|e| NodeError::Task(e.to_string()))??;
        tracing::info!("Agora node stopped");
        Ok(Some(engine))
    }
}
