mod create_user;
mod init;
mod seed;

pub use create_user::cmd_create_user;
pub use init::cmd_init;
pub use seed::{cmd_seed, seed_demo_data};
