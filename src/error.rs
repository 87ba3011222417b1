use thiserror::Error;

#[derive(Debug, Error)]
pub enum EcsError {
    #[error("entity '{entity}' already has a component named '{component}'")]
    DuplicateComponent { entity: String, component: String },
}

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("model instantiation for '{name}' did not finish: {source}")]
    Instantiate {
        name: String,
        #[source]
        source: tokio::task::JoinError,
    },
    #[error("assembling '{name}' failed: {source}")]
    Assemble {
        name: String,
        #[source]
        source: EcsError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Ecs(#[from] EcsError),
}
