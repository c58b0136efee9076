use std::pin::Pin;

use tikv_jemallocator::Jemalloc;

pub mod config;
pub mod controller;
pub mod dashboard;
pub mod endpoint;
pub mod entity;
pub mod macro_tool;
pub mod server;
pub mod util;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// response stream for server-streaming endpoints
pub type TonicStream<T> =
    Pin<Box<dyn futures::Stream<Item = Result<T, tonic::Status>> + Send + 'static>>;

#[tokio::main]
async fn main() {
    let guard = server::OtelGuard::new().unwrap();
    let server = server::Server::new().await.unwrap();
    guard.with(server.start()).await;
}
