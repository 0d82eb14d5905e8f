mod hls;
mod range;
mod respond;
mod server;
mod stream;

pub use server::{start_server, AppState};
