pub mod config;
pub mod db;
pub mod embedding;
pub mod ollama;
pub mod pinecone;
pub mod schema;
