pub mod dispatcher;
pub mod error;
pub mod events;
pub mod ingest;
pub mod inventory;
pub mod model;
pub mod repo_materializer;
pub mod sanitize;
pub mod uri;
pub mod workspace;
