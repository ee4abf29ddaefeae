//! The Engine: one Operator per object type sharing a decode pool.
//!
//! The engine is fail-fast. The first error any Operator reports ends
//! [`Engine::run`], and so does any Operator stopping.

use std::sync::Arc;

use icingadb_configsync_core::ObjectType;
use icingadb_configsync_store::{ConfigStore, RelationalStore};
use icingadb_configsync_sync::{
    DecodePool, ErrorSink, HaNotifier, Operator, OperatorHandle, Supervisor, SyncError,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// A configured, not yet started engine.
pub struct Engine {
    config: EngineConfig,
    object_types: Vec<ObjectType>,
    config_store: Arc<dyn ConfigStore>,
    relational_store: Arc<dyn RelationalStore>,
    ha: Arc<HaNotifier>,
}

impl Engine {
    /// Create an engine. Fails if `config` is invalid.
    pub fn new(
        config: EngineConfig,
        config_store: Arc<dyn ConfigStore>,
        relational_store: Arc<dyn RelationalStore>,
        ha: Arc<HaNotifier>,
    ) -> Result<Self> {
        config.validate()?;
        let object_types = config.resolve_object_types()?;
        Ok(Self {
            config,
            object_types,
            config_store,
            relational_store,
            ha,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start the decode pool and every Operator.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> RunningEngine {
        let sync = &self.config.sync;
        let (decoder, decode_pool) = DecodePool::spawn(sync.decode_workers, sync.channel_capacity);
        let (errors, error_rx) = ErrorSink::channel();
        let supervisor = Supervisor {
            config_store: self.config_store,
            relational_store: self.relational_store,
            decoder,
            errors,
        };

        let mut operators = JoinSet::new();
        let mut handles = Vec::with_capacity(self.object_types.len());
        for object_type in self.object_types {
            let (operator, handle) = Operator::new(object_type, supervisor.clone(), sync.clone());
            let listener = self.ha.register_notification_listener();
            operators.spawn(async move {
                operator.run(listener).await;
                object_type.name
            });
            handles.push(handle);
        }
        tracing::info!(
            operators = handles.len(),
            decode_workers = decode_pool.size(),
            "engine started"
        );

        RunningEngine {
            handles,
            operators,
            errors: error_rx,
            decode_pool,
        }
    }

    /// Start and wait for the first error or the first Operator to stop.
    pub async fn run(self) -> Result<()> {
        self.start().wait().await
    }
}

/// A started engine.
pub struct RunningEngine {
    handles: Vec<OperatorHandle>,
    operators: JoinSet<&'static str>,
    errors: mpsc::UnboundedReceiver<SyncError>,
    decode_pool: DecodePool,
}

impl RunningEngine {
    /// The Operator syncing `object_type`.
    pub fn handle(&self, object_type: &str) -> Option<&OperatorHandle> {
        self.handles.iter().find(|h| h.object_type() == object_type)
    }

    pub fn handles(&self) -> &[OperatorHandle] {
        &self.handles
    }

    /// Wait for the first reported error or the first Operator to stop,
    /// then stop everything.
    pub async fn wait(mut self) -> Result<()> {
        let result = tokio::select! {
            biased;
            Some(err) = self.errors.recv() => Err(EngineError::Sync(err)),
            joined = self.operators.join_next() => match joined {
                Some(Ok(name)) => {
                    tracing::info!(object_type = name, "operator stopped");
                    Ok(())
                }
                Some(Err(e)) => Err(EngineError::Task(e.to_string())),
                None => Ok(()),
            },
        };
        self.shutdown().await;
        result
    }

    async fn shutdown(self) {
        let RunningEngine {
            handles,
            mut operators,
            errors,
            decode_pool,
        } = self;
        operators.abort_all();
        while operators.join_next().await.is_some() {}
        drop((handles, errors));
        decode_pool.shutdown().await;
        tracing::info!("engine stopped");
    }
}
