mod server;

pub use server::{DEFAULT_DATABASE_URL, FileConfig, MIN_SECRET_LEN, ServerConfig};
