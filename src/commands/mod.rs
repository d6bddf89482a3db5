pub mod relay;
pub mod watch;
