mod api;
mod core;
mod infra;
mod models;

use axum::{routing::post, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::api::admin::bootstrap_index;
use crate::api::query::handle_query;
use crate::core::pipeline::QueryPipeline;
use crate::core::refiner::SqlRefiner;
use crate::core::retriever::Retriever;
use crate::infra::config::{Config, SchemaSource};
use crate::infra::embedding::{Embedder, FastEmbedder};
use crate::infra::ollama::{LlmClient, OllamaClient};
use crate::infra::pinecone::{PineconeClient, VectorIndex};
use crate::infra::schema::SchemaResolver;

pub mod ax_state {
    use super::*;
    pub struct AppState {
        pub config: Config,
        pub pipeline: QueryPipeline,
        pub embedder: Arc<dyn Embedder>,
        pub index: Arc<dyn VectorIndex>,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let db = infra::db::init_db(&config.database_url).await?;

    // 进程级单例：嵌入模型与外部服务客户端只初始化一次，显式注入各组件
    let embedder: Arc<dyn Embedder> = Arc::new(FastEmbedder::new()?);
    let index: Arc<dyn VectorIndex> = Arc::new(PineconeClient::new(
        config.pinecone_api_key.clone(),
        config.pinecone_index_host.clone(),
    ));
    let llm: Arc<dyn LlmClient> = Arc::new(OllamaClient::new(
        config.ollama_api_url.clone(),
        config.ollama_timeout_secs,
    )?);

    let schema = match config.schema_source {
        SchemaSource::Catalog => SchemaResolver::from_catalog_file(&config.tables_file)?,
        SchemaSource::Live => SchemaResolver::live(db.clone()),
    };

    let retriever = Retriever::new(
        embedder.clone(),
        index.clone(),
        config.pinecone_index_name.clone(),
        config.similarity_min_score,
    );
    let refiner = SqlRefiner::new(llm, config.ollama_model.clone());
    let pipeline = QueryPipeline::new(retriever, schema, refiner, db);

    let state = Arc::new(ax_state::AppState {
        config: config.clone(),
        pipeline,
        embedder,
        index,
    });

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let app = Router::new()
        .route("/api/query", post(handle_query))
        .route("/api/index/bootstrap", post(bootstrap_index))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_addr.parse()?;
    println!("🚀 Text2SQL Backend 运行在 http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
