//! The `ferry` server: a static file server and a forward proxy sharing one
//! connection engine from [`ferry_http`].
//!
//! ```no_run
//! use ferry_server::{FileHandler, Server};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::builder()
//!         .address("127.0.0.1:8000".parse().unwrap())
//!         .handler(FileHandler::new("./public"))
//!         .build()
//!         .unwrap();
//!     server.start().await
//! }
//! ```

pub mod body;
pub mod cli;
pub mod config;
pub mod file;
pub mod logging;
pub mod proxy;
pub mod server;

pub use body::{BoxError, ResponseBody};
pub use config::{ConfigError, Mode, ServerConfig};
pub use file::FileHandler;
pub use proxy::{AllowAll, Authorizer, ProxyHandler};
pub use server::{Server, ServerBuildError, ServerBuilder};
